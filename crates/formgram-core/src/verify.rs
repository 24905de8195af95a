//! Settings-page flows: save-and-verify, disconnect, status.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    delivery::{client::DeliveryClient, port::BotApiTransport, types::DeliveryResult},
    domain::BotCredential,
    ports::SettingsStore,
    settings::GlobalSettings,
    Result,
};

/// Values submitted from the settings screen.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SettingsInput {
    #[serde(default)]
    pub bot_token: BotCredential,
    #[serde(default)]
    pub chat_id: String,
    #[serde(default)]
    pub message_thread_id: String,
    /// Optional test message sent after the credential is verified.
    #[serde(default)]
    pub message: String,
}

/// Response for the settings screen: a message plus an HTTP-style status.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SaveOutcome {
    pub message: String,
    /// Whether the stored integration is now marked configured.
    pub configured: bool,
    /// 200 saved, 400 credential rejected, 423 saved but test message failed.
    pub status_code: u16,
}

impl SaveOutcome {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct IntegrationStatus {
    /// A credential passed the liveness check on the last save.
    pub configured: bool,
    /// Credential and default chat are both present.
    pub ready: bool,
}

/// Persist settings, marking them configured only after `getMe` succeeds.
///
/// A failing test message does not unmark the credential: `configured`
/// tracks credential liveness, and the response reports the failed delivery
/// with status 423.
pub async fn save_and_verify(
    store: &dyn SettingsStore,
    transport: Arc<dyn BotApiTransport>,
    input: &SettingsInput,
) -> Result<SaveOutcome> {
    let raw = GlobalSettings {
        credential: input.bot_token.clone(),
        chat_id: input.chat_id.clone(),
        thread_id: non_blank(&input.message_thread_id),
        configured: false,
    };

    if input.bot_token.trimmed().is_empty() || input.chat_id.trim().is_empty() {
        store.save(&raw)?;
        info!("settings saved without credential verification");
        return Ok(SaveOutcome {
            message: "Your settings have been updated".to_string(),
            configured: false,
            status_code: 200,
        });
    }

    let verified = GlobalSettings {
        credential: input.bot_token.trimmed(),
        chat_id: input.chat_id.trim().to_string(),
        thread_id: non_blank(input.message_thread_id.trim()),
        configured: true,
    };

    let mut client = DeliveryClient::new(transport, verified.credential.clone());
    if let DeliveryResult::Failure(f) = client.check_liveness().await {
        warn!(kind = ?f.kind, code = f.code, "credential verification failed");
        store.save(&raw)?;
        return Ok(SaveOutcome {
            message: f.description,
            configured: false,
            status_code: 400,
        });
    }

    let mut message =
        "Your Telegram API key has been verified and successfully set".to_string();
    let mut status_code = 200;

    if !input.message.is_empty() {
        client = client.with_target(verified.target());
        if let DeliveryResult::Failure(f) = client.send_message(&input.message, None).await {
            message = format!(
                "Your API key is valid, but the message could not be sent. Error: {}",
                f.description
            );
            status_code = 423;
        }
    }

    store.save(&verified)?;
    info!(status_code, "settings saved after credential verification");

    Ok(SaveOutcome {
        message,
        configured: true,
        status_code,
    })
}

/// Forget the credential and default destination.
pub fn disconnect(store: &dyn SettingsStore) -> Result<()> {
    store.save(&GlobalSettings::default())?;
    info!("integration disconnected");
    Ok(())
}

pub fn integration_status(store: &dyn SettingsStore) -> Result<IntegrationStatus> {
    let s = store.load()?;
    Ok(IntegrationStatus {
        configured: s.configured,
        ready: !s.credential.is_empty() && !s.chat_id.is_empty(),
    })
}

fn non_blank(s: &str) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}
