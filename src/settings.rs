use serde::{Deserialize, Serialize};

/// Settings that influence how nodes are constructed.
///
/// Passed explicitly wherever they matter, so that two discretisations with different settings
/// can coexist in the same process.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscretisationSettings {
    /// When enabled, evaluation masks handed to state vector constructors are never trusted and
    /// always recomputed from the slices.
    pub debug_mode: bool,
}

impl DiscretisationSettings {
    pub fn debug() -> Self {
        Self { debug_mode: true }
    }
}
