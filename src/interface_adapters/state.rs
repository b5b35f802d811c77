use crate::use_cases::SessionHandle;

#[derive(Debug, Clone)]
pub struct AppState {
    // The single simulation session shared by HTTP and WebSocket clients.
    pub session: SessionHandle,
    // Per-client queue of encoded snapshots; a full queue gets the client pruned.
    pub frame_capacity: usize,
}
