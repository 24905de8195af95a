//! Telegram Bot API transport (reqwest).
//!
//! Implements the `formgram-core` transport port: one GET per call to
//! `<api_base>/bot<token>/<method>?<query>`.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use formgram_core::{
    config::Config,
    delivery::{port::BotApiTransport, types::ApiRequest},
    domain::BotCredential,
    errors::Error,
    Result,
};

#[derive(Clone, Debug)]
pub struct HttpTransport {
    api_base: String,
    http: reqwest::Client,
}

impl HttpTransport {
    pub fn new(api_base: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("http client build failed: {e}")))?;
        Ok(Self {
            api_base: api_base.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        Self::new(cfg.api_base.clone(), cfg.http_timeout)
    }

    // Contains the token: never log the result.
    fn url(&self, credential: &BotCredential, request: &ApiRequest) -> String {
        let mut url = format!(
            "{}/bot{}/{}",
            self.api_base,
            credential.expose(),
            request.method.as_str()
        );
        let query = request.query_string();
        if !query.is_empty() {
            url.push('?');
            url.push_str(&query);
        }
        url
    }
}

#[async_trait]
impl BotApiTransport for HttpTransport {
    async fn get(&self, credential: &BotCredential, request: &ApiRequest) -> Result<String> {
        let resp = self
            .http
            .get(self.url(credential, request))
            .send()
            .await
            .map_err(|e| Error::Transport(format!("telegram request error: {}", e.without_url())))?;

        // The Bot API answers errors with a JSON envelope and a 4xx status;
        // the body is classified by the caller either way.
        let status = resp.status();
        debug!(method = request.method.as_str(), %status, "bot api responded");

        resp.text()
            .await
            .map_err(|e| Error::Transport(format!("telegram body error: {}", e.without_url())))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use mockito::Matcher;

    use super::*;
    use formgram_core::{
        delivery::{client::DeliveryClient, types::FailureKind},
        domain::{DestinationTarget, RemoteMessageId},
    };

    fn client(transport: HttpTransport, thread: Option<&str>) -> DeliveryClient {
        DeliveryClient::new(Arc::new(transport), BotCredential::new("123:abc"))
            .with_target(DestinationTarget::new("@chan", thread.map(str::to_string)))
    }

    #[tokio::test]
    async fn send_message_is_a_get_with_query_params() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/bot123:abc/sendMessage")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("chat_id".into(), "@chan".into()),
                Matcher::UrlEncoded("parse_mode".into(), "none".into()),
                Matcher::UrlEncoded("text".into(), "Name: Ada & co\nDone".into()),
                Matcher::UrlEncoded("message_thread_id".into(), "5".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"ok":true,"result":{"message_id":42}}"#)
            .create_async()
            .await;

        let transport = HttpTransport::new(server.url(), Duration::from_secs(5)).unwrap();
        let res = client(transport, Some("5"))
            .send_message("<b>Name:</b> Ada &amp; co\n   Done", None)
            .await;

        mock.assert_async().await;
        assert_eq!(res.message_id(), Some(&RemoteMessageId("42".to_string())));
    }

    #[tokio::test]
    async fn error_status_still_yields_envelope() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/bot123:abc/sendMessage")
            .match_query(Matcher::Any)
            .with_status(403)
            .with_header("content-type", "application/json")
            .with_body(r#"{"ok":false,"error_code":403,"description":"Forbidden: bot was kicked"}"#)
            .create_async()
            .await;

        let transport = HttpTransport::new(server.url(), Duration::from_secs(5)).unwrap();
        let res = client(transport, None).send_message("hi", None).await;

        mock.assert_async().await;
        let f = res.failure().unwrap();
        assert_eq!(f.kind, FailureKind::RemoteRejected);
        assert_eq!(f.code, 403);
        assert_eq!(f.description, "Forbidden: bot was kicked");
    }

    #[tokio::test]
    async fn get_me_has_no_query() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/bot123:abc/getMe")
            .with_status(200)
            .with_body(r#"{"ok":true,"result":{"id":1,"is_bot":true}}"#)
            .create_async()
            .await;

        let transport = HttpTransport::new(format!("{}/", server.url()), Duration::from_secs(5))
            .unwrap();
        let res = client(transport, None).check_liveness().await;

        mock.assert_async().await;
        assert!(res.is_success());
    }

    #[tokio::test]
    async fn html_body_is_malformed() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/bot123:abc/sendMessage")
            .match_query(Matcher::Any)
            .with_status(502)
            .with_body("<html>Bad Gateway</html>")
            .create_async()
            .await;

        let transport = HttpTransport::new(server.url(), Duration::from_secs(5)).unwrap();
        let res = client(transport, None).send_message("hi", None).await;
        assert_eq!(res.failure().unwrap().kind, FailureKind::MalformedResponse);
    }

    #[tokio::test]
    async fn connection_errors_are_captured_without_token() {
        let transport = HttpTransport::new("http://127.0.0.1:1", Duration::from_secs(2)).unwrap();
        let res = client(transport, None).send_message("hi", None).await;
        let f = res.failure().unwrap();
        assert_eq!(f.kind, FailureKind::TransportError);
        assert!(!f.description.contains("123:abc"));
    }
}
