//! Realtime change notifications over Phoenix channels.

pub mod channel;
pub mod messages;

pub use channel::RealtimeChannel;
pub use messages::{parse_message, ChannelMessage, PhoenixFrame};
