//! In-memory position registry shared by every instance of a replay.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use meanrev_core::domain::{OwnerTag, PositionId};
use meanrev_core::error::ExecutionError;
use meanrev_core::venue::{PositionRegistry, RegisteredPosition};

/// Cheap to clone; clones see the same positions.
#[derive(Debug, Clone, Default)]
pub struct SharedRegistry {
    inner: Arc<RwLock<HashMap<PositionId, RegisteredPosition>>>,
}

impl SharedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, position: RegisteredPosition) {
        self.inner.write().insert(position.id.clone(), position);
    }

    pub fn remove(&self, id: &PositionId) -> Option<RegisteredPosition> {
        self.inner.write().remove(id)
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Sum of committed risk percent across an owner's open positions.
    pub fn committed_risk(&self, owner: &OwnerTag) -> f64 {
        self.inner
            .read()
            .values()
            .filter(|p| &p.owner == owner)
            .map(|p| p.risk_percent)
            .sum()
    }
}

impl PositionRegistry for SharedRegistry {
    fn open_positions(&self, owner: &OwnerTag) -> Result<Vec<RegisteredPosition>, ExecutionError> {
        let mut positions: Vec<_> = self
            .inner
            .read()
            .values()
            .filter(|p| &p.owner == owner)
            .cloned()
            .collect();
        positions.sort_by(|a, b| a.id.0.cmp(&b.id.0));
        Ok(positions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meanrev_core::domain::Direction;

    fn entry(id: &str, owner: &str, risk: f64) -> RegisteredPosition {
        RegisteredPosition {
            id: PositionId::new(id),
            owner: OwnerTag::new(owner),
            instrument: "EURUSD".into(),
            direction: Direction::Long,
            volume: 0.1,
            risk_percent: risk,
        }
    }

    #[test]
    fn positions_are_filtered_by_owner() {
        let registry = SharedRegistry::new();
        registry.register(entry("1", "alpha", 1.0));
        registry.register(entry("2", "beta", 2.0));
        registry.register(entry("3", "alpha", 0.5));

        let alpha = registry.open_positions(&OwnerTag::new("alpha")).unwrap();
        assert_eq!(alpha.len(), 2);
        assert_eq!(alpha[0].id, PositionId::new("1"));
        assert!((registry.committed_risk(&OwnerTag::new("alpha")) - 1.5).abs() < 1e-12);
    }

    #[test]
    fn clones_share_state() {
        let registry = SharedRegistry::new();
        let view = registry.clone();
        registry.register(entry("1", "alpha", 1.0));
        assert_eq!(view.len(), 1);
        assert!(view.remove(&PositionId::new("1")).is_some());
        assert!(registry.is_empty());
    }
}
