//! Wire protocol
//!
//! An explicit dispatch table: every inbound event is a `ClientEvent`
//! variant, every outbound payload a `ServerEvent` variant. Handlers are
//! functions of (state, event) and never touch raw frames.

mod events;

pub use events::{ClientEvent, ServerEvent};
