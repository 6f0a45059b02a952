pub mod classifier;
pub mod color;
pub mod events;
pub mod tracker;
