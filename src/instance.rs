use serde::{Deserialize, Serialize};

use crate::registry::MAX_PARAMS;

/// Flat runtime form of one effect placement, as handed to the stack compiler.
///
/// Parameter slots only mean something relative to the referenced effect
/// type; slots past the type's parameter count are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectInstance {
    #[serde(rename = "type")]
    pub type_id: u32,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub params: [f32; MAX_PARAMS],
}

fn default_enabled() -> bool {
    true
}

impl EffectInstance {
    pub fn new(type_id: u32, label: impl Into<String>) -> Self {
        Self {
            type_id,
            enabled: true,
            label: label.into(),
            params: [0.0; MAX_PARAMS],
        }
    }

    /// Copy up to `MAX_PARAMS` values into the leading slots; remaining slots are zeroed.
    pub fn with_params(mut self, values: &[f32]) -> Self {
        self.params = [0.0; MAX_PARAMS];
        for (slot, v) in self.params.iter_mut().zip(values) {
            *slot = *v;
        }
        self
    }

    pub fn set_param(&mut self, index: usize, value: f32) -> bool {
        match self.params.get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }
}
