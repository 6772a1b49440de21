//! Room membership and fan-out

mod broker;

pub use broker::RoomBroker;
