use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{
    delivery::{
        port::BotApiTransport,
        types::{
            ApiMethod, ApiRequest, DeliveryFailure, DeliveryResult, DeliverySuccess, FailureKind,
            FormatMode, UNKNOWN_REMOTE_ERROR,
        },
    },
    domain::{BotCredential, DestinationTarget, RemoteMessageId},
    formatting::sanitize_plain_text,
    settings::EffectiveSettings,
    utils::truncate_text,
};

/// Longest body excerpt kept when the response is not JSON.
const RAW_BODY_EXCERPT: usize = 500;

/// Bot API client bound to one credential and destination.
///
/// Sends take `&self` and setters take `&mut self`, so a binding cannot change
/// under an in-flight call. Concurrent deliveries should each use their own
/// client (cloning is cheap; the transport is shared).
#[derive(Clone)]
pub struct DeliveryClient {
    transport: Arc<dyn BotApiTransport>,
    credential: BotCredential,
    target: DestinationTarget,
    format_mode: FormatMode,
}

impl std::fmt::Debug for DeliveryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeliveryClient")
            .field("credential", &self.credential)
            .field("target", &self.target)
            .field("format_mode", &self.format_mode)
            .finish_non_exhaustive()
    }
}

impl DeliveryClient {
    pub fn new(transport: Arc<dyn BotApiTransport>, credential: BotCredential) -> Self {
        Self {
            transport,
            credential,
            target: DestinationTarget::default(),
            format_mode: FormatMode::None,
        }
    }

    /// Client bound to the credential and target of resolved settings.
    pub fn for_settings(transport: Arc<dyn BotApiTransport>, settings: &EffectiveSettings) -> Self {
        Self::new(transport, settings.credential.clone()).with_target(settings.target.clone())
    }

    pub fn with_target(mut self, target: DestinationTarget) -> Self {
        self.target = target;
        self
    }

    pub fn with_format_mode(mut self, mode: FormatMode) -> Self {
        self.format_mode = mode;
        self
    }

    /// Rebind credential and, when given, chat and thread ids. A new chat id
    /// replaces the whole target, so a thread from the previous chat is
    /// dropped unless one is passed along with it. Reachability is not
    /// checked.
    pub fn configure(
        &mut self,
        credential: BotCredential,
        chat_id: Option<&str>,
        thread_id: Option<&str>,
    ) {
        self.credential = credential;
        if let Some(chat_id) = chat_id {
            self.target = DestinationTarget::new(chat_id, thread_id.map(str::to_string));
        } else if let Some(thread_id) = thread_id {
            self.target.thread_id = Some(thread_id.to_string());
        }
    }

    pub fn set_format_mode(&mut self, mode: FormatMode) {
        self.format_mode = mode;
    }

    pub fn format_mode(&self) -> FormatMode {
        self.format_mode
    }

    pub fn target(&self) -> &DestinationTarget {
        &self.target
    }

    /// Verify the credential with `getMe`. Sends no message.
    pub async fn check_liveness(&self) -> DeliveryResult {
        if self.credential.is_empty() {
            return DeliveryResult::Failure(DeliveryFailure::local(
                FailureKind::MissingCredential,
                "Token is required",
            ));
        }
        self.call(ApiRequest::new(ApiMethod::GetMe)).await
    }

    /// Send `text` to the bound target.
    ///
    /// `mode_override` wins over the client's configured format mode. Empty
    /// text or an empty credential fail without touching the network.
    pub async fn send_message(&self, text: &str, mode_override: Option<FormatMode>) -> DeliveryResult {
        if text.is_empty() {
            return DeliveryResult::Failure(DeliveryFailure::local(
                FailureKind::MissingMessage,
                "Message is required",
            ));
        }
        if self.credential.is_empty() {
            return DeliveryResult::Failure(DeliveryFailure::local(
                FailureKind::MissingCredential,
                "Token is required",
            ));
        }

        let mode = mode_override.unwrap_or(self.format_mode);
        let request = self.build_send_request(text, mode);
        let result = self.call(request).await;

        match &result {
            DeliveryResult::Success(s) => info!(
                chat_id = %self.target.chat_id,
                thread_id = ?self.target.thread(),
                message_id = ?s.message_id.as_ref().map(|m| m.0.as_str()),
                "telegram message delivered"
            ),
            DeliveryResult::Failure(f) => warn!(
                chat_id = %self.target.chat_id,
                kind = ?f.kind,
                code = f.code,
                description = %f.description,
                "telegram message not delivered"
            ),
        }
        result
    }

    /// Build the `sendMessage` request. `message_thread_id` is present only
    /// when a non-blank thread id is bound; Telegram routes on its presence.
    pub fn build_send_request(&self, text: &str, mode: FormatMode) -> ApiRequest {
        let text = match mode {
            FormatMode::None => sanitize_plain_text(text),
            _ => text.to_string(),
        };

        let mut request = ApiRequest::new(ApiMethod::SendMessage);
        request
            .params
            .push(("chat_id", urlencoding::encode(&self.target.chat_id).into_owned()));
        request.params.push(("parse_mode", mode.as_api_str().to_string()));
        request
            .params
            .push(("text", urlencoding::encode(&text).into_owned()));
        if let Some(thread_id) = self.target.thread() {
            request
                .params
                .push(("message_thread_id", urlencoding::encode(thread_id).into_owned()));
        }
        request
    }

    async fn call(&self, request: ApiRequest) -> DeliveryResult {
        debug!(method = request.method.as_str(), "calling bot api");
        match self.transport.get(&self.credential, &request).await {
            Ok(body) => classify_envelope(&body),
            Err(e) => DeliveryResult::Failure(DeliveryFailure::local(
                FailureKind::TransportError,
                e.to_string(),
            )),
        }
    }
}

/// Classify a Bot API response body.
///
/// `{ok:true,result}` is a success; `{ok:false,error_code,description}` is a
/// remote rejection; anything without `ok` (including invalid JSON) is a
/// malformed response.
pub fn classify_envelope(body: &str) -> DeliveryResult {
    let value: Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(_) => {
            return DeliveryResult::Failure(DeliveryFailure {
                raw_body: Some(Value::String(truncate_text(body, RAW_BODY_EXCERPT))),
                ..DeliveryFailure::local(FailureKind::MalformedResponse, UNKNOWN_REMOTE_ERROR)
            });
        }
    };

    let Some(ok) = value.get("ok") else {
        return DeliveryResult::Failure(DeliveryFailure {
            raw_body: Some(value),
            ..DeliveryFailure::local(FailureKind::MalformedResponse, UNKNOWN_REMOTE_ERROR)
        });
    };

    if is_truthy(ok) {
        let result = value.get("result").cloned().unwrap_or(Value::Null);
        let message_id = result.get("message_id").and_then(|id| match id {
            Value::Number(n) => Some(RemoteMessageId(n.to_string())),
            Value::String(s) => Some(RemoteMessageId(s.clone())),
            _ => None,
        });
        return DeliveryResult::Success(DeliverySuccess { message_id, result });
    }

    let code = value
        .get("error_code")
        .and_then(Value::as_i64)
        .unwrap_or(crate::delivery::types::LOCAL_ERROR_CODE);
    let description = value
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or(UNKNOWN_REMOTE_ERROR)
        .to_string();

    DeliveryResult::Failure(DeliveryFailure {
        kind: FailureKind::RemoteRejected,
        code,
        description,
        raw_body: Some(value),
    })
}

fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty() && s != "0",
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        Value::Null => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::testing::StubTransport;

    fn client(stub: &Arc<StubTransport>, token: &str) -> DeliveryClient {
        DeliveryClient::new(stub.clone(), BotCredential::new(token))
            .with_target(DestinationTarget::new("@chan", None))
    }

    #[tokio::test]
    async fn empty_text_fails_without_transport() {
        let stub = StubTransport::replying(r#"{"ok":true,"result":{"message_id":1}}"#);
        let res = client(&stub, "123:abc").send_message("", None).await;
        let f = res.failure().unwrap();
        assert_eq!(f.kind, FailureKind::MissingMessage);
        assert_eq!(stub.call_count(), 0);
    }

    #[tokio::test]
    async fn empty_credential_fails_without_transport() {
        let stub = StubTransport::replying(r#"{"ok":true,"result":{"message_id":1}}"#);
        let c = client(&stub, "");

        let res = c.send_message("hello", None).await;
        assert_eq!(res.failure().unwrap().kind, FailureKind::MissingCredential);

        let res = c.check_liveness().await;
        assert_eq!(res.failure().unwrap().kind, FailureKind::MissingCredential);
        assert_eq!(stub.call_count(), 0);
    }

    #[tokio::test]
    async fn ok_envelope_is_success_with_message_id() {
        let stub = StubTransport::replying(r#"{"ok":true,"result":{"message_id":42}}"#);
        let res = client(&stub, "123:abc").send_message("hello", None).await;
        assert!(res.is_success());
        assert_eq!(res.message_id(), Some(&RemoteMessageId("42".to_string())));

        let calls = stub.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "123:abc");
        assert_eq!(calls[0].1.method, ApiMethod::SendMessage);
    }

    #[tokio::test]
    async fn rejected_envelope_keeps_code_and_description() {
        let stub =
            StubTransport::replying(r#"{"ok":false,"error_code":403,"description":"Forbidden"}"#);
        let res = client(&stub, "123:abc").send_message("hello", None).await;
        let f = res.failure().unwrap();
        assert_eq!(f.kind, FailureKind::RemoteRejected);
        assert_eq!(f.code, 403);
        assert_eq!(f.description, "Forbidden");
        assert_eq!(f.raw_body.as_ref().unwrap()["error_code"], 403);
    }

    #[tokio::test]
    async fn body_without_ok_is_malformed() {
        for body in ["{}", "not json", "[1,2]", r#"{"result":{"message_id":1}}"#] {
            let stub = StubTransport::replying(body);
            let res = client(&stub, "123:abc").send_message("hello", None).await;
            let f = res.failure().unwrap();
            assert_eq!(f.kind, FailureKind::MalformedResponse, "body={body}");
            assert_eq!(f.description, UNKNOWN_REMOTE_ERROR);
            assert!(f.raw_body.is_some());
        }
    }

    #[tokio::test]
    async fn transport_errors_become_failures() {
        let stub = StubTransport::failing("connection refused");
        let res = client(&stub, "123:abc").send_message("hello", None).await;
        let f = res.failure().unwrap();
        assert_eq!(f.kind, FailureKind::TransportError);
        assert!(f.description.contains("connection refused"));
    }

    #[tokio::test]
    async fn liveness_calls_get_me_without_params() {
        let stub = StubTransport::replying(r#"{"ok":true,"result":{"id":1,"is_bot":true}}"#);
        let res = client(&stub, "123:abc").check_liveness().await;
        assert!(res.is_success());
        assert_eq!(res.message_id(), None);
        let calls = stub.calls();
        assert_eq!(calls[0].1.method, ApiMethod::GetMe);
        assert!(calls[0].1.params.is_empty());
    }

    #[test]
    fn thread_param_present_only_when_set() {
        let stub = StubTransport::replying("{}");
        let mut c = client(&stub, "t");

        let req = c.build_send_request("hi", FormatMode::None);
        assert!(!req.has_param("message_thread_id"));

        c.configure(BotCredential::new("t"), None, Some(""));
        let req = c.build_send_request("hi", FormatMode::None);
        assert!(!req.has_param("message_thread_id"));

        c.configure(BotCredential::new("t"), None, Some("77"));
        let req = c.build_send_request("hi", FormatMode::None);
        assert_eq!(req.param("message_thread_id"), Some("77"));
        assert_eq!(req.param("chat_id"), Some("%40chan"));
    }

    #[test]
    fn rebinding_chat_drops_previous_thread() {
        let stub = StubTransport::replying("{}");
        let mut c = client(&stub, "t");
        c.configure(BotCredential::new("t"), Some("@a"), Some("5"));
        assert_eq!(c.target().thread(), Some("5"));

        c.configure(BotCredential::new("t2"), Some("@b"), None);
        assert_eq!(c.target(), &DestinationTarget::new("@b", None));
        let req = c.build_send_request("hi", FormatMode::None);
        assert_eq!(req.param("chat_id"), Some("%40b"));
        assert!(!req.has_param("message_thread_id"));

        c.configure(BotCredential::new("t2"), Some("@c"), Some("9"));
        assert_eq!(c.target(), &DestinationTarget::new("@c", Some("9".to_string())));
    }

    #[test]
    fn plain_mode_sanitizes_and_encodes_text() {
        let stub = StubTransport::replying("{}");
        let c = client(&stub, "t");
        let req = c.build_send_request("<b>Hi</b> &amp; bye\n   x  ", FormatMode::None);
        assert_eq!(req.param("parse_mode"), Some("none"));
        assert_eq!(req.param("text"), Some("Hi%20%26%20bye%0Ax"));
    }

    #[test]
    fn rich_mode_passes_markup_through() {
        let stub = StubTransport::replying("{}");
        let c = client(&stub, "t").with_format_mode(FormatMode::Html);
        let req = c.build_send_request("<b>Hi</b>", c.format_mode());
        assert_eq!(req.param("parse_mode"), Some("HTML"));
        assert_eq!(req.param("text"), Some("%3Cb%3EHi%3C%2Fb%3E"));
    }

    #[tokio::test]
    async fn override_mode_wins_over_configured_mode() {
        let stub = StubTransport::replying(r#"{"ok":true,"result":{"message_id":"9"}}"#);
        let mut c = client(&stub, "t");
        c.set_format_mode(FormatMode::Html);
        let res = c.send_message("<i>x</i>", Some(FormatMode::None)).await;
        assert_eq!(res.message_id(), Some(&RemoteMessageId("9".to_string())));
        let calls = stub.calls();
        assert_eq!(calls[0].1.param("parse_mode"), Some("none"));
        assert_eq!(calls[0].1.param("text"), Some("x"));
    }
}
