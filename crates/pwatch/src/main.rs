use std::sync::Arc;

use anyhow::Context;
use chrono::Local;
use tokio_util::sync::CancellationToken;

use pwatch_core::{config::Config, timer::TokioTimer, watcher::PresenceWatcher};
use pwatch_slack::SlackClient;
use pwatch_whatsapp::WhatsAppMessenger;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pwatch_core::logging::init("pwatch")?;

    let once = std::env::args().skip(1).any(|a| a == "--once");

    let cfg = match Config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration, not starting");
            return Err(e.into());
        }
    };
    if cfg.recipients.is_empty() {
        tracing::warn!("WHATSAPP_TO is empty; notifications will be skipped");
    }

    let slack = Arc::new(
        SlackClient::new(
            cfg.slack_bot_token.clone(),
            cfg.slack_api_base.clone(),
            cfg.http_timeout,
        )
        .context("building slack client")?,
    );
    let messenger = Arc::new(
        WhatsAppMessenger::new(
            cfg.whatsapp_token.clone(),
            &cfg.whatsapp_api_base,
            &cfg.whatsapp_api_version,
            &cfg.whatsapp_phone_id,
            cfg.http_timeout,
        )
        .context("building whatsapp client")?,
    );

    let mut watcher = PresenceWatcher::start(
        &cfg,
        slack.clone(),
        slack.as_ref(),
        messenger,
        Arc::new(TokioTimer),
    )
    .await
    .context("starting presence watcher")?;

    if once {
        let outcome = watcher.tick(Local::now()).await;
        tracing::info!(?outcome, "single check finished");
        return Ok(());
    }

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("received ctrl-c, shutting down");
                on_signal.cancel();
            }
            Err(e) => tracing::warn!(error = %e, "cannot listen for ctrl-c"),
        }
    });

    watcher.run(cancel).await;
    Ok(())
}
