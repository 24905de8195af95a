use async_trait::async_trait;

use crate::{delivery::types::ApiRequest, domain::BotCredential, Result};

/// Transport port for the Bot API.
///
/// Implementations issue one HTTPS GET to `<base>/bot<credential>/<method>`
/// with the request's query string and return the raw response body, whatever
/// the HTTP status. Network, TLS and timeout problems are returned as
/// `Error::Transport`.
#[async_trait]
pub trait BotApiTransport: Send + Sync {
    async fn get(&self, credential: &BotCredential, request: &ApiRequest) -> Result<String>;
}
