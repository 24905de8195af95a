use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{domain::RemoteMessageId, errors::Error};

/// Error code used for failures detected locally (no remote `error_code`).
pub const LOCAL_ERROR_CODE: i64 = 300;

/// Description used when the remote body does not follow the envelope contract.
pub const UNKNOWN_REMOTE_ERROR: &str = "Unknown API error from Telegram";

/// How Telegram should interpret message text (`parse_mode`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatMode {
    /// Literal text. Composed text is sanitized before sending.
    #[default]
    None,
    Html,
    Markdown,
    #[serde(rename = "markdownv2")]
    MarkdownV2,
}

impl FormatMode {
    /// Value sent as `parse_mode`.
    pub fn as_api_str(self) -> &'static str {
        match self {
            FormatMode::None => "none",
            FormatMode::Html => "HTML",
            FormatMode::Markdown => "Markdown",
            FormatMode::MarkdownV2 => "MarkdownV2",
        }
    }
}

impl FromStr for FormatMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "none" => Ok(FormatMode::None),
            "html" => Ok(FormatMode::Html),
            "markdown" => Ok(FormatMode::Markdown),
            "markdownv2" => Ok(FormatMode::MarkdownV2),
            other => Err(Error::Config(format!("unknown parse mode: {other}"))),
        }
    }
}

/// Bot API methods used by the dispatcher.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApiMethod {
    GetMe,
    SendMessage,
}

impl ApiMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            ApiMethod::GetMe => "getMe",
            ApiMethod::SendMessage => "sendMessage",
        }
    }
}

/// One outbound Bot API call: a method plus query parameters.
///
/// Parameter values are stored already percent-encoded; transports append
/// them to the URL as-is.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiRequest {
    pub method: ApiMethod,
    pub params: Vec<(&'static str, String)>,
}

impl ApiRequest {
    pub fn new(method: ApiMethod) -> Self {
        Self {
            method,
            params: Vec::new(),
        }
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn has_param(&self, key: &str) -> bool {
        self.param(key).is_some()
    }

    /// `k=v&k=v`, or empty when there are no parameters.
    pub fn query_string(&self) -> String {
        self.params
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&")
    }
}

/// Why a delivery attempt failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    MissingCredential,
    MissingMessage,
    TransportError,
    RemoteRejected,
    MalformedResponse,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DeliverySuccess {
    /// `result.message_id`; absent for calls like `getMe`.
    pub message_id: Option<RemoteMessageId>,
    pub result: serde_json::Value,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DeliveryFailure {
    pub kind: FailureKind,
    pub code: i64,
    pub description: String,
    /// Decoded response body, when there was one.
    pub raw_body: Option<serde_json::Value>,
}

impl DeliveryFailure {
    pub fn local(kind: FailureKind, description: impl Into<String>) -> Self {
        Self {
            kind,
            code: LOCAL_ERROR_CODE,
            description: description.into(),
            raw_body: None,
        }
    }
}

impl fmt::Display for DeliveryFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description)
    }
}

/// Outcome of exactly one Bot API call.
#[derive(Clone, Debug, PartialEq)]
pub enum DeliveryResult {
    Success(DeliverySuccess),
    Failure(DeliveryFailure),
}

impl DeliveryResult {
    pub fn is_success(&self) -> bool {
        matches!(self, DeliveryResult::Success(_))
    }

    pub fn failure(&self) -> Option<&DeliveryFailure> {
        match self {
            DeliveryResult::Failure(f) => Some(f),
            DeliveryResult::Success(_) => None,
        }
    }

    pub fn message_id(&self) -> Option<&RemoteMessageId> {
        match self {
            DeliveryResult::Success(s) => s.message_id.as_ref(),
            DeliveryResult::Failure(_) => None,
        }
    }
}
