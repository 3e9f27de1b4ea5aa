//! サーバー通信

pub mod channel;
pub mod server;
