//! Engine lifecycle state.

/// Lifecycle of a cache engine or adapter.
///
/// Transitions only move forward: `Active -> Disposing -> Disposed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lifecycle {
    #[default]
    Active,
    Disposing,
    Disposed,
}

impl Lifecycle {
    pub fn is_active(self) -> bool {
        matches!(self, Lifecycle::Active)
    }
}
