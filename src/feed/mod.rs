//! Live order feed: a single reconnecting connection that broadcasts new orders.

pub mod backoff;
pub mod connector;
pub mod protocol;
pub mod service;

pub use connector::{Connection, Connector, WsConnector};
pub use service::{ConnectionState, FeedClient, FeedEvent, FeedService};
