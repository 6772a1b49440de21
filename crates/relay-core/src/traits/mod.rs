//! Store traits (ports) consumed by the coordinator

mod stores;

pub use stores::{ConversationStore, MessageStore, StoreResult, UserStore};
