//! Layered destination settings: installation-wide defaults merged with
//! per-feed overrides.

use serde::{Deserialize, Deserializer, Serialize};

use crate::domain::{BotCredential, DestinationTarget};

/// Installation-wide integration settings, as kept by the settings store.
///
/// Field names follow the stored record (`bot_token`, `chat_id`,
/// `message_thread_id`, `status`).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalSettings {
    #[serde(rename = "bot_token", default)]
    pub credential: BotCredential,

    #[serde(default)]
    pub chat_id: String,

    #[serde(
        rename = "message_thread_id",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub thread_id: Option<String>,

    /// Set only by a successful save-and-verify; never derived on read.
    #[serde(rename = "status", default, deserialize_with = "lenient_bool")]
    pub configured: bool,
}

impl GlobalSettings {
    pub fn target(&self) -> DestinationTarget {
        DestinationTarget::new(self.chat_id.clone(), self.thread_id.clone())
    }
}

/// Per-feed destination overrides. Blank values mean "use the global one".
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedOverrides {
    #[serde(default)]
    pub custom_chat_id: Option<String>,
    #[serde(default)]
    pub custom_thread_id: Option<String>,
}

/// Settings actually used for one delivery attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EffectiveSettings {
    pub credential: BotCredential,
    pub target: DestinationTarget,
    pub configured: bool,
}

/// Merge global settings with feed overrides.
///
/// Chat id and thread id are handled independently: a non-blank override
/// replaces the global value (trimmed), anything else keeps the global value
/// verbatim.
pub fn resolve(global: &GlobalSettings, overrides: &FeedOverrides) -> EffectiveSettings {
    let chat_id = override_or(overrides.custom_chat_id.as_deref())
        .unwrap_or_else(|| global.chat_id.clone());
    let thread_id =
        override_or(overrides.custom_thread_id.as_deref()).or_else(|| global.thread_id.clone());

    EffectiveSettings {
        credential: global.credential.clone(),
        target: DestinationTarget { chat_id, thread_id },
        configured: global.configured,
    }
}

/// True when a delivery can be attempted at all. Thread id plays no part.
pub fn is_ready(settings: &EffectiveSettings) -> bool {
    !settings.credential.is_empty() && !settings.target.chat_id.is_empty()
}

fn override_or(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Stored status flags have been written as `true`, `"1"`, `""` and `null`.
fn lenient_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let v = serde_json::Value::deserialize(deserializer)?;
    Ok(match v {
        serde_json::Value::Bool(b) => b,
        serde_json::Value::Number(n) => n.as_i64().is_some_and(|n| n != 0),
        serde_json::Value::String(s) => {
            matches!(s.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
        }
        _ => false,
    })
}
