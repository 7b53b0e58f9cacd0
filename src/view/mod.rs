//! Order view model: countdowns, colours and status grouping for the dashboard.

pub mod model;
pub mod ticker;

pub use model::*;
pub use ticker::ViewTicker;
