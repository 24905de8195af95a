//! Host-side adapter: wires config, settings store, result sink and the Bot
//! API transport, and exposes the settings and notify flows on the command
//! line.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context;
use clap::{Parser, Subcommand};

use formgram_core::{
    config::Config,
    domain::BotCredential,
    feed::{FeedNotifier, FeedRecord, NotifyOutcome},
    ports::{ResultSink, SettingsStore},
    store::JsonFileSettingsStore,
    utils::ActivityLog,
    verify::{disconnect, integration_status, save_and_verify, SettingsInput},
};
use formgram_telegram::HttpTransport;

#[derive(Debug, Parser)]
#[command(name = "formgram", about = "Form submission → Telegram notifications")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show whether the integration is configured.
    Status,
    /// Verify the bot token with getMe and save the settings.
    Verify {
        #[arg(long, env = "FORMGRAM_BOT_TOKEN", hide_env_values = true, default_value = "")]
        bot_token: String,
        #[arg(long, env = "FORMGRAM_CHAT_ID", default_value = "")]
        chat_id: String,
        #[arg(long, env = "FORMGRAM_THREAD_ID", default_value = "")]
        thread_id: String,
        /// Optional test message sent to the saved chat.
        message: Vec<String>,
    },
    /// Forget the bot token and default chat.
    Disconnect,
    /// Deliver the feeds in a JSON file (one feed object or an array).
    Notify { feed_file: PathBuf },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    formgram_core::logging::init("formgram")?;

    let cfg = Config::from_env()?;
    let store: Arc<dyn SettingsStore> = Arc::new(JsonFileSettingsStore::new(&cfg.settings_file));

    match cli.command {
        Command::Status => {
            let status = integration_status(store.as_ref())?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        Command::Verify {
            bot_token,
            chat_id,
            thread_id,
            message,
        } => {
            let input = SettingsInput {
                bot_token: BotCredential::new(bot_token),
                chat_id,
                message_thread_id: thread_id,
                message: message.join(" "),
            };
            let transport = Arc::new(HttpTransport::from_config(&cfg)?);
            let outcome = save_and_verify(store.as_ref(), transport, &input).await?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            if !outcome.is_success() {
                std::process::exit(1);
            }
        }
        Command::Disconnect => {
            disconnect(store.as_ref())?;
            println!("disconnected");
        }
        Command::Notify { feed_file } => {
            let feeds = read_feeds(&feed_file)?;

            let transport = Arc::new(HttpTransport::from_config(&cfg)?);
            let sink: Arc<dyn ResultSink> = Arc::new(ActivityLog::new(
                &cfg.activity_log_path,
                cfg.activity_log_json,
            ));
            let notifier = FeedNotifier::new(store, transport, sink)
                .with_format_mode(cfg.default_parse_mode);

            for (feed, outcome) in feeds.iter().zip(notifier.notify_all(&feeds).await) {
                match outcome? {
                    NotifyOutcome::Delivered(id) => println!(
                        "{}: delivered ({})",
                        feed.name,
                        id.map(|m| m.0).unwrap_or_default()
                    ),
                    NotifyOutcome::Failed(f) => println!("{}: failed ({})", feed.name, f),
                    NotifyOutcome::Skipped(reason) => println!("{}: skipped ({reason:?})", feed.name),
                }
            }
        }
    }

    Ok(())
}

fn read_feeds(path: &Path) -> anyhow::Result<Vec<FeedRecord>> {
    let txt = std::fs::read_to_string(path)
        .with_context(|| format!("reading feed file {}", path.display()))?;
    let value: serde_json::Value =
        serde_json::from_str(&txt).with_context(|| format!("parsing {}", path.display()))?;
    let feeds = if value.is_array() {
        serde_json::from_value(value)?
    } else {
        vec![serde_json::from_value(value)?]
    };
    Ok(feeds)
}
