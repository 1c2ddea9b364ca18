//! Composition helpers that integrate pipelines with blocking code and
//! message channels.

mod blocking;
mod channel;
pub mod runtime;

pub use blocking::{blocking, BlockingStage};
pub use channel::{read_channel, read_merge, read_stage};
