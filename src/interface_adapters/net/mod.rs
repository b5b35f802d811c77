// Network adapter for streaming WebSocket clients.

pub mod client;

pub use client::ws_handler;
