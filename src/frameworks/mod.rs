// Frameworks: configuration, server bootstrap and the built-in physics engine.

pub mod config;
pub mod engine;
pub mod server;
