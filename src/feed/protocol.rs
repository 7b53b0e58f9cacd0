use serde::Deserialize;

use crate::domain::{Order, OrderId};
use crate::error::FeedError;

/// A text frame from the order feed, discriminated by its `type` field.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedMessage {
    NewOrder {
        #[serde(default)]
        order: Option<Order>,
        /// The backend broadcast that only announces an id carries this instead of `order`.
        #[serde(default)]
        order_id: Option<OrderId>,
    },
    #[serde(other)]
    Other,
}

impl FeedMessage {
    pub fn decode(text: &str) -> Result<Self, FeedError> {
        Ok(serde_json::from_str(text)?)
    }

    /// The order to merge, if this frame is one the dashboard acts on.
    pub fn into_new_order(self) -> Option<Order> {
        match self {
            FeedMessage::NewOrder { order, .. } => order,
            FeedMessage::Other => None,
        }
    }
}
