//! Message dispatch

mod message_dispatcher;

pub use message_dispatcher::MessageDispatcher;
