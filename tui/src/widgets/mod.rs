//! Widgets
//!
//! Board pieces drawn into compositor layers.

pub mod queue_slot;
pub mod text_block;

pub use queue_slot::{Arrival, QueueSlot};
pub use text_block::{TextBlock, TextBlockState};
