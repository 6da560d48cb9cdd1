pub mod channel;
pub mod client;
pub mod config;
pub mod invoke;
pub mod shared;
