// Interface adapters: wire protocol, HTTP control routes and WebSocket handling.

pub mod handlers;
pub mod http;
pub mod net;
pub mod protocol;
pub mod router;
pub mod routes;
pub mod state;
