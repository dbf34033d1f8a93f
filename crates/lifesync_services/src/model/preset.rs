use lifesync_protocol::{Record, RecordMeta};
use serde::{Deserialize, Serialize};

fn enabled_by_default() -> bool {
    true
}

/// A template from which one daily task is generated every day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preset {
    /// Identity and timestamps.
    #[serde(flatten)]
    pub meta: RecordMeta,
    /// Title copied into generated daily tasks.
    pub title: String,
    /// Disabled presets generate nothing.
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    /// Display and generation order.
    #[serde(default)]
    pub order: u32,
}

impl Preset {
    /// Creates an enabled preset.
    pub fn new(title: String, order: u32, now_ms: i64) -> Self {
        Self {
            meta: RecordMeta::new(Self::ID_PREFIX, now_ms),
            title,
            enabled: true,
            order,
        }
    }
}

/// A partial preset update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PresetPatch {
    /// New title.
    pub title: Option<String>,
    /// Enable or disable.
    pub enabled: Option<bool>,
    /// New order.
    pub order: Option<u32>,
}

impl PresetPatch {
    pub(crate) fn apply(self, preset: &mut Preset) {
        if let Some(title) = self.title {
            preset.title = title;
        }
        if let Some(enabled) = self.enabled {
            preset.enabled = enabled;
        }
        if let Some(order) = self.order {
            preset.order = order;
        }
    }
}
