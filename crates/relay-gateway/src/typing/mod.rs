//! Ephemeral typing state

mod tracker;

pub use tracker::TypingTracker;
