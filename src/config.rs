use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;

use crate::domain::OrderStatus;

#[derive(Debug, Parser)]
#[command(name = "order_dashboard")]
#[command(about = "Live order dashboard for the restaurant kitchen")]
#[command(version)]
pub struct Cli {
    #[clap(flatten)]
    pub config: Config,
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Settings shared by every subcommand.
#[derive(Debug, Clone, Args)]
pub struct Config {
    /// WebSocket URL of the live order feed
    #[arg(long, env = "ORDER_FEED_URL", default_value = "ws://127.0.0.1:8000/ws/orders/")]
    pub feed_url: String,
    /// Base URL of the order API used for status changes
    #[arg(long, env = "ORDER_API_BASE", default_value = "http://127.0.0.1:8000")]
    pub api_base: String,
    /// Directory holding pedidos.json and cart.json
    #[arg(long, env = "ORDER_DATA_DIR", default_value = ".")]
    pub data_dir: PathBuf,
    /// Sound file played on every new order
    #[arg(long, env = "ORDER_NOTIFY_SOUND")]
    pub notify_sound: Option<PathBuf>,
    /// Program used to play the notification sound (e.g. paplay, afplay)
    #[arg(long, env = "ORDER_AUDIO_PLAYER")]
    pub audio_player: Option<String>,
    /// Dashboard refresh period in milliseconds
    #[arg(long, env = "ORDER_TICK_MS", default_value_t = 1_000, value_parser = clap::value_parser!(u64).range(1..))]
    pub tick_ms: u64,
}

impl Config {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the live dashboard (default)
    Dashboard,
    /// Ask the backend to change an order's status, then record it locally
    SetStatus {
        /// Order id
        id: u64,
        /// NEW, IN_PROGRESS, READY or DELIVERED
        #[arg(value_parser = parse_status)]
        status: OrderStatus,
    },
    /// Inspect or edit the local shopping cart
    Cart {
        #[command(subcommand)]
        action: CartCommand,
    },
}

#[derive(Debug, Subcommand)]
pub enum CartCommand {
    /// Print the cart lines and total
    Show,
    /// Add a product to the cart
    Add {
        product_name: String,
        unit_price: Decimal,
        #[arg(short = 'q', long = "qty", default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
        qty: u32,
    },
    /// Increase the quantity of the line at INDEX
    Inc { index: usize },
    /// Decrease the quantity of the line at INDEX, never below one
    Dec { index: usize },
    /// Remove the line at INDEX
    Remove { index: usize },
    /// Empty the cart
    Clear,
}

fn parse_status(raw: &str) -> Result<OrderStatus, String> {
    raw.parse()
}
