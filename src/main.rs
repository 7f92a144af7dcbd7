use std::sync::Arc;

use futures::StreamExt;

use storebot::campaigns::dispatcher::{Dispatcher, DispatcherDeps};
use storebot::campaigns::CampaignStore;
use storebot::channels::{ChannelAdapter, ChannelEvent, ConsoleChannel};
use storebot::config::WorkerConfig;
use storebot::contacts::ContactDirectory;
use storebot::events::{ChannelState, DomainEvent, EventBus};
use storebot::notify::spawn_notifier;
use storebot::promo::FilePromo;
use storebot::router::MessageRouter;
use storebot::store::{LibSqlStore, Store};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing; with STOREBOT_LOG_DIR set, logs also roll into
    // daily files there. The guard must outlive main.
    let env_filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    };
    let _log_guard = match std::env::var("STOREBOT_LOG_DIR") {
        Ok(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "storebot.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(env_filter())
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false)
                .init();
            Some(guard)
        }
        Err(_) => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter())
                .with_target(false)
                .init();
            None
        }
    };

    let config = WorkerConfig::from_env();

    eprintln!("🤖 storebot v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Database: {}", config.db_path);
    eprintln!("   Promo doc: {}", config.promo_path);
    eprintln!(
        "   Dispatch: every {:?}, {:?} between sends",
        config.dispatcher.cycle_interval, config.dispatcher.send_delay
    );

    // ── Storage ─────────────────────────────────────────────────────────
    let store: Arc<dyn Store> = Arc::new(
        LibSqlStore::new_local(std::path::Path::new(&config.db_path))
            .await
            .unwrap_or_else(|e| {
                eprintln!("Error: failed to open database at {}: {}", config.db_path, e);
                std::process::exit(1);
            }),
    );

    // ── Core components ─────────────────────────────────────────────────
    let bus = EventBus::new();
    let directory = Arc::new(ContactDirectory::new(
        Arc::clone(&store),
        bus.clone(),
        config.history_limit,
    ));
    let campaigns = Arc::new(CampaignStore::new(Arc::clone(&store)));
    let promo = Arc::new(FilePromo::new(&config.promo_path));
    let router = MessageRouter::new(
        Arc::clone(&directory),
        Arc::clone(&store),
        bus.clone(),
        promo,
    );

    // ── Management notifier ─────────────────────────────────────────────
    if let Some(url) = &config.management_url {
        eprintln!("   Management: notifying {url}");
        let _notifier = spawn_notifier(&bus, url.clone());
    } else {
        eprintln!("   Management: no URL set, events stay in-process");
    }

    // ── Channel session ─────────────────────────────────────────────────
    let channel: Arc<dyn ChannelAdapter> = Arc::new(ConsoleChannel::new());
    eprintln!("   Channel: {}\n", channel.name());

    let mut events = channel.start().await?;

    // ── Campaign dispatcher ─────────────────────────────────────────────
    let dispatcher = Arc::new(Dispatcher::new(
        config.dispatcher.clone(),
        DispatcherDeps {
            campaigns: Arc::clone(&campaigns),
            directory: Arc::clone(&directory),
            channel: Arc::clone(&channel),
            bus: bus.clone(),
        },
    ));
    let dispatcher_handle = Arc::clone(&dispatcher).spawn();

    // ── Channel event loop ──────────────────────────────────────────────
    while let Some(event) = events.next().await {
        match event {
            ChannelEvent::Paired { challenge } => {
                tracing::info!("Pairing challenge issued");
                bus.publish(DomainEvent::ChannelState {
                    state: ChannelState::AwaitingPairing,
                    detail: challenge,
                });
            }
            ChannelEvent::SessionReady => {
                tracing::info!("Channel session ready");
                bus.publish(DomainEvent::ChannelState {
                    state: ChannelState::Ready,
                    detail: String::new(),
                });
            }
            ChannelEvent::SessionLost { reason } => {
                tracing::warn!("Channel session lost: {}", reason);
                bus.publish(DomainEvent::ChannelState {
                    state: ChannelState::Disconnected,
                    detail: reason,
                });
            }
            ChannelEvent::Inbound {
                sender_id,
                text,
                display_name,
            } => {
                // One reply per inbound message; a failure on one message
                // never takes the loop down.
                match router.handle_inbound(&sender_id, &text, &display_name).await {
                    Ok(reply) => {
                        if let Err(e) = channel.send(&sender_id, &reply).await {
                            tracing::warn!(sender_id = %sender_id, "Reply send failed: {}", e);
                        }
                    }
                    Err(e) => {
                        tracing::error!(sender_id = %sender_id, "Inbound handling failed: {}", e);
                    }
                }
            }
        }
    }

    tracing::info!("Channel stream ended, shutting down");
    dispatcher_handle.stop().await;

    Ok(())
}
