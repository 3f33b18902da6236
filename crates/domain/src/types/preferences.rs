//! Notification preference payloads

use serde::{Deserialize, Serialize};

/// Per-user notification preferences.
///
/// The backend owns the schema; channel toggles are kept as an open map so
/// new event types do not require a client release.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotificationPreferences {
    #[serde(flatten)]
    pub settings: serde_json::Map<String, serde_json::Value>,
}

impl NotificationPreferences {
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.settings.get(key).and_then(serde_json::Value::as_bool)
    }
}
