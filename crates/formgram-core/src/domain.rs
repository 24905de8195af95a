use std::fmt;

use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Bot token issued by @BotFather.
///
/// Opaque to this crate: it is only ever placed in the request path. `Debug`
/// never prints the value.
pub struct BotCredential(Secret<String>);

impl BotCredential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Secret::new(token.into()))
    }

    pub fn empty() -> Self {
        Self::new(String::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.expose_secret().is_empty()
    }

    /// Raw token, for building the request path only.
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    /// Copy with surrounding whitespace removed (used when persisting).
    pub fn trimmed(&self) -> Self {
        Self::new(self.expose().trim())
    }
}

impl Clone for BotCredential {
    fn clone(&self) -> Self {
        Self::new(self.expose())
    }
}

impl Default for BotCredential {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for BotCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            f.write_str("BotCredential(<empty>)")
        } else {
            f.write_str("BotCredential([REDACTED])")
        }
    }
}

impl PartialEq for BotCredential {
    fn eq(&self, other: &Self) -> bool {
        self.expose() == other.expose()
    }
}

impl Eq for BotCredential {}

impl Serialize for BotCredential {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.expose())
    }
}

impl<'de> Deserialize<'de> for BotCredential {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(Self::new(raw.unwrap_or_default()))
    }
}

/// Where a message goes: a chat (channel, group or user) and optionally a
/// forum topic inside it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationTarget {
    pub chat_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
}

impl DestinationTarget {
    pub fn new(chat_id: impl Into<String>, thread_id: Option<String>) -> Self {
        Self {
            chat_id: chat_id.into(),
            thread_id,
        }
    }

    /// Thread id only when it carries a value; blank ids count as unset.
    pub fn thread(&self) -> Option<&str> {
        self.thread_id.as_deref().filter(|t| !t.trim().is_empty())
    }
}

/// Message id returned by the Bot API, kept as text since callers only
/// report it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemoteMessageId(pub String);

impl fmt::Display for RemoteMessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
