//! Per-submission feed evaluation: resolve settings, deliver, report.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    delivery::{
        client::DeliveryClient,
        port::BotApiTransport,
        types::{DeliveryFailure, DeliveryResult, FailureKind, FormatMode},
    },
    domain::RemoteMessageId,
    ports::{ResultSink, SettingsStore},
    settings::{is_ready, resolve, FeedOverrides},
    Result,
};

/// Processed values of one feed for one submission. Template merge tags are
/// already replaced by the host.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedRecord {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub send_message: String,
    #[serde(default)]
    pub custom_chat_id: Option<String>,
    #[serde(default)]
    pub message_thread_id: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl FeedRecord {
    pub fn overrides(&self) -> FeedOverrides {
        FeedOverrides {
            custom_chat_id: self.custom_chat_id.clone(),
            custom_thread_id: self.message_thread_id.clone(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedStatus {
    Success,
    Failed,
}

/// What the result sink receives after a delivery attempt.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FeedReport {
    pub feed: String,
    pub status: FeedStatus,
    pub note: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<RemoteMessageId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_kind: Option<FailureKind>,
}

impl FeedReport {
    fn from_result(feed: &FeedRecord, result: &DeliveryResult) -> Self {
        match result {
            DeliveryResult::Success(s) => Self {
                feed: feed.name.clone(),
                status: FeedStatus::Success,
                note: format!(
                    "Telegram feed sent successfully. Message ID: {}",
                    s.message_id.as_ref().map(|m| m.0.as_str()).unwrap_or_default()
                ),
                message_id: s.message_id.clone(),
                failure_kind: None,
            },
            DeliveryResult::Failure(f) => Self {
                feed: feed.name.clone(),
                status: FeedStatus::Failed,
                note: f.description.clone(),
                message_id: None,
                failure_kind: Some(f.kind),
            },
        }
    }
}

/// Why a feed did nothing. None of these are reported to the sink.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    Disabled,
    EmptyMessage,
    NotConfigured,
    NotReady,
}

#[derive(Clone, Debug, PartialEq)]
pub enum NotifyOutcome {
    Skipped(SkipReason),
    Delivered(Option<RemoteMessageId>),
    Failed(DeliveryFailure),
}

/// Evaluates feeds against the current global settings.
///
/// Settings are loaded on every call; nothing is cached between submissions.
#[derive(Clone)]
pub struct FeedNotifier {
    store: Arc<dyn SettingsStore>,
    transport: Arc<dyn BotApiTransport>,
    sink: Arc<dyn ResultSink>,
    format_mode: FormatMode,
}

impl FeedNotifier {
    pub fn new(
        store: Arc<dyn SettingsStore>,
        transport: Arc<dyn BotApiTransport>,
        sink: Arc<dyn ResultSink>,
    ) -> Self {
        Self {
            store,
            transport,
            sink,
            format_mode: FormatMode::None,
        }
    }

    pub fn with_format_mode(mut self, mode: FormatMode) -> Self {
        self.format_mode = mode;
        self
    }

    /// Deliver one feed.
    ///
    /// Disabled feeds, empty messages and unconfigured integrations are
    /// skipped silently. Delivery failures are reported to the sink and
    /// returned as `NotifyOutcome::Failed`; only a settings store failure is an
    /// `Err`.
    pub async fn notify(&self, feed: &FeedRecord) -> Result<NotifyOutcome> {
        if !feed.enabled {
            return Ok(self.skip(feed, SkipReason::Disabled));
        }
        if feed.send_message.is_empty() {
            return Ok(self.skip(feed, SkipReason::EmptyMessage));
        }

        let global = self.store.load()?;
        if !global.configured {
            return Ok(self.skip(feed, SkipReason::NotConfigured));
        }

        let settings = resolve(&global, &feed.overrides());
        if !is_ready(&settings) {
            return Ok(self.skip(feed, SkipReason::NotReady));
        }

        let client = DeliveryClient::for_settings(self.transport.clone(), &settings)
            .with_format_mode(self.format_mode);
        let result = client.send_message(&feed.send_message, None).await;

        let report = FeedReport::from_result(feed, &result);
        if let Err(e) = self.sink.report(&report) {
            warn!(feed = %feed.name, "failed to report feed result: {e}");
        }
        info!(feed = %feed.name, status = ?report.status, "feed processed");

        Ok(match result {
            DeliveryResult::Success(s) => NotifyOutcome::Delivered(s.message_id),
            DeliveryResult::Failure(f) => NotifyOutcome::Failed(f),
        })
    }

    /// Deliver every feed attached to a submission. A failing feed does not
    /// stop the others.
    pub async fn notify_all(&self, feeds: &[FeedRecord]) -> Vec<Result<NotifyOutcome>> {
        let mut out = Vec::with_capacity(feeds.len());
        for feed in feeds {
            out.push(self.notify(feed).await);
        }
        out
    }

    fn skip(&self, feed: &FeedRecord, reason: SkipReason) -> NotifyOutcome {
        debug!(feed = %feed.name, ?reason, "feed skipped");
        NotifyOutcome::Skipped(reason)
    }
}
