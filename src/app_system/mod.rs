//! System orchestration: wiring, the event pipeline, effects and shutdown.

pub mod dashboard;
pub mod effects;
pub mod order_system;
pub mod suppressed;
pub mod tracing;

pub use dashboard::*;
pub use effects::*;
pub use order_system::*;
pub use suppressed::*;
pub use self::tracing::*;
