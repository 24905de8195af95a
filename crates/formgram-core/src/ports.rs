use crate::{feed::FeedReport, settings::GlobalSettings, Result};

/// Hexagonal port for the host's settings storage.
///
/// The dispatcher only reads through this, except for the explicit
/// save-and-verify and disconnect flows.
pub trait SettingsStore: Send + Sync {
    /// Stored settings, or defaults when nothing was saved yet.
    fn load(&self) -> Result<GlobalSettings>;
    fn save(&self, settings: &GlobalSettings) -> Result<()>;
}

/// Hexagonal port for the host's integration result channel (activity log,
/// admin notices, ...). Receives one report per delivery attempt.
pub trait ResultSink: Send + Sync {
    fn report(&self, report: &FeedReport) -> Result<()>;
}
