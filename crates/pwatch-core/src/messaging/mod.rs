//! Outbound notifications: the messaging port and the fan-out dispatcher.

pub mod dispatch;
pub mod port;
pub mod types;
