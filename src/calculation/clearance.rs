//! Clearance gating for settlements.

use crate::config::ClearanceConfig;
use crate::error::{EngineError, EngineResult};
use crate::models::{ClearanceKind, ClearanceStatus, Clearances};

/// Clearance kinds in check order.
pub const CLEARANCE_KINDS: [ClearanceKind; 3] = [
    ClearanceKind::Assets,
    ClearanceKind::Vehicles,
    ClearanceKind::Cards,
];

fn is_blocking(kind: ClearanceKind, config: &ClearanceConfig) -> bool {
    match kind {
        ClearanceKind::Assets => config.assets_blocking,
        ClearanceKind::Vehicles => config.vehicles_blocking,
        ClearanceKind::Cards => config.cards_blocking,
    }
}

/// Blocking clearances still `PENDING`.
pub fn pending_blocking_clearances(
    clearances: &Clearances,
    config: &ClearanceConfig,
) -> Vec<ClearanceKind> {
    CLEARANCE_KINDS
        .into_iter()
        .filter(|kind| is_blocking(*kind, config))
        .filter(|kind| clearances.get(*kind) == ClearanceStatus::Pending)
        .collect()
}

/// Fails with [`EngineError::ClearancePending`] while any blocking clearance
/// is pending.
pub fn check_clearance_gate(
    user_id: &str,
    clearances: &Clearances,
    config: &ClearanceConfig,
) -> EngineResult<()> {
    let pending = pending_blocking_clearances(clearances, config);
    if pending.is_empty() {
        Ok(())
    } else {
        Err(EngineError::ClearancePending {
            user_id: user_id.to_string(),
            pending: pending.iter().map(|k| k.as_str().to_string()).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ClearanceConfig {
        ClearanceConfig {
            assets_blocking: true,
            vehicles_blocking: true,
            cards_blocking: false,
        }
    }

    #[test]
    fn test_non_blocking_pending_is_ignored() {
        let mut clearances = Clearances::default();
        clearances.set(ClearanceKind::Assets, ClearanceStatus::Cleared);
        clearances.set(ClearanceKind::Vehicles, ClearanceStatus::NotApplicable);
        assert!(check_clearance_gate("emp_001", &clearances, &config()).is_ok());
    }

    #[test]
    fn test_pending_blocking_clearance_reported() {
        let mut clearances = Clearances::default();
        clearances.set(ClearanceKind::Assets, ClearanceStatus::Cleared);
        match check_clearance_gate("emp_001", &clearances, &config()) {
            Err(EngineError::ClearancePending { pending, .. }) => {
                assert_eq!(pending, vec!["vehicles".to_string()]);
            }
            other => panic!("Expected ClearancePending, got {:?}", other),
        }
    }
}
