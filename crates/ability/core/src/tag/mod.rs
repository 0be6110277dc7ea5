//! Tag bookkeeping for cooldowns, timed statuses and ability-owned markers.
pub mod container;

pub use container::{TagChange, TagContainer, TagSnapshot};
