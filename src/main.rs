mod actor_framework;
mod api;
mod app_system;
mod cache;
mod cart;
mod config;
mod domain;
mod error;
mod feed;
mod notifier;
mod view;

#[cfg(test)]
mod mock_framework;

use std::num::NonZeroU32;
use std::sync::Arc;

use clap::Parser;
use eyre::{eyre, WrapErr};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn, Instrument};

use crate::api::{HttpStatusApi, StatusApi};
use crate::app_system::{setup_tracing, OrderSystem, SuppressedKind, Suppressor, SystemDeps};
use crate::cache::{JsonFileStore, OrderStore};
use crate::cart::CartStore;
use crate::config::{CartCommand, Cli, Commands, Config};
use crate::domain::{OrderId, OrderStatus};
use crate::feed::{FeedEvent, WsConnector};
use crate::notifier::{CommandAudio, CommandNotification, Notifier};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    setup_tracing();
    let cli = Cli::parse();
    let suppressor = Suppressor::new();

    match cli.command.unwrap_or(Commands::Dashboard) {
        Commands::Dashboard => run_dashboard(cli.config, suppressor).await,
        Commands::SetStatus { id, status } => {
            let span = tracing::info_span!("set_status", order_id = id, new_status = %status);
            set_status(cli.config, suppressor, OrderId(id), status)
                .instrument(span)
                .await
        }
        Commands::Cart { action } => run_cart(cli.config, suppressor, action).await,
    }
}

async fn run_dashboard(config: Config, suppressor: Suppressor) -> eyre::Result<()> {
    info!(feed_url = %config.feed_url, data_dir = %config.data_dir.display(), "Starting dashboard");

    let notifier = Notifier::new(
        Arc::new(CommandNotification::default()),
        Arc::new(CommandAudio::new(config.audio_player.clone(), config.notify_sound.clone())),
        suppressor.clone(),
    );
    let system = OrderSystem::start(SystemDeps {
        store: Arc::new(JsonFileStore::new(&config.data_dir, suppressor.clone())),
        connector: Arc::new(WsConnector::new(config.feed_url.clone())),
        notifier: Arc::new(notifier),
        api: Arc::new(HttpStatusApi::new(config.api_base.clone())),
        suppressor,
        tick: config.tick(),
    })
    .await;

    let mut views = system.views.clone();
    let mut events = system.feed_client.subscribe();
    let mut shown = None;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
            event = events.recv() => match event {
                Ok(FeedEvent::Connected) => info!("Order feed online"),
                Ok(FeedEvent::Disconnected) => warn!("Order feed offline, reconnecting"),
                Ok(FeedEvent::OrderReceived(order)) => println!("New order #{} received", order.id),
                Err(RecvError::Lagged(skipped)) => debug!(skipped, "Feed announcements skipped"),
                Err(RecvError::Closed) => {
                    warn!("Order feed stopped");
                    break;
                }
            },
            changed = views.changed() => {
                if changed.is_err() {
                    warn!("View ticker stopped");
                    break;
                }
                let view = views.borrow_and_update().clone();
                let layout = view.layout();
                if shown.as_ref() != Some(&layout) {
                    println!("{view}");
                    shown = Some(layout);
                }
            }
        }
    }

    system.shutdown().await.wrap_err("dashboard did not shut down cleanly")
}

async fn set_status(
    config: Config,
    suppressor: Suppressor,
    id: OrderId,
    status: OrderStatus,
) -> eyre::Result<()> {
    let api = HttpStatusApi::new(config.api_base);
    if let Err(e) = api.update_status(id, status).await {
        suppressor.report(SuppressedKind::StatusUpdate, &e);
        println!("Order #{id} unchanged");
        return Ok(());
    }

    let store = JsonFileStore::new(&config.data_dir, suppressor);
    let orders = store.load().await;
    let updated = cache::apply_status(&orders, id, status);
    if updated != orders {
        store.save(&updated).await.wrap_err("failed to record status locally")?;
    }

    println!("Order #{id} is now {}", status.label());
    Ok(())
}

async fn run_cart(config: Config, suppressor: Suppressor, action: CartCommand) -> eyre::Result<()> {
    let store = CartStore::new(&config.data_dir, suppressor);
    let mut cart = store.load().await;
    let edits = !matches!(action, CartCommand::Show);

    match action {
        CartCommand::Show => {}
        CartCommand::Add { product_name, unit_price, qty } => {
            let qty = NonZeroU32::new(qty).ok_or_else(|| eyre!("quantity must be at least 1"))?;
            cart.add(product_name, qty, unit_price);
        }
        CartCommand::Inc { index } => cart.increment(index),
        CartCommand::Dec { index } => cart.decrement(index),
        CartCommand::Remove { index } => cart.remove(index),
        CartCommand::Clear => cart.clear(),
    }

    if edits {
        store.save(&cart).await.wrap_err("failed to save cart")?;
    }

    if cart.is_empty() {
        println!("Cart is empty");
    }
    for (index, line) in cart.lines().iter().enumerate() {
        println!("[{index}] {} x {} ${}", line.qty, line.product_name, line.subtotal);
    }
    println!("Total: ${}", cart.total());
    Ok(())
}
