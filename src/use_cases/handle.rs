// Control surface for the session task, shared by every adapter.

use super::session::{Session, session_task};
use super::types::{
    ClientId, LoopState, Reply, SessionCommand, SessionSettings, SessionStatus, SnapshotEncoder,
};
use crate::domain::{BodySpec, ConstraintSpec, PhysicsEngine, SimError, TemplateReport, Vec3};
use axum::extract::ws::Utf8Bytes;
use serde_json::{Map, Value};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::info;

#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    state_rx: watch::Receiver<LoopState>,
}

impl SessionHandle {
    /// Spawns the session task around `engine` and returns its handle.
    pub fn spawn<E: PhysicsEngine>(
        engine: E,
        settings: SessionSettings,
        encoder: SnapshotEncoder,
    ) -> Self {
        let (commands, commands_rx) = mpsc::channel(settings.command_capacity);
        let (state_tx, state_rx) = watch::channel(LoopState::Stopped);
        let session = Session::new(engine, encoder, state_tx);
        info!(
            tick_interval_ms = settings.tick_interval.as_millis() as u64,
            "spawning simulation session"
        );
        tokio::spawn(session_task(session, commands_rx, settings));
        Self { commands, state_rx }
    }

    /// Receiver of loop state changes. Closed once the session shuts down.
    pub fn subscribe_state(&self) -> watch::Receiver<LoopState> {
        self.state_rx.clone()
    }

    pub fn state(&self) -> LoopState {
        *self.state_rx.borrow()
    }

    pub async fn attach(
        &self,
        client: ClientId,
        frames: mpsc::Sender<Utf8Bytes>,
    ) -> Result<(), SimError> {
        self.send(SessionCommand::Attach { client, frames }).await
    }

    pub async fn detach(&self, client: ClientId) -> Result<(), SimError> {
        self.send(SessionCommand::Detach { client }).await
    }

    pub async fn apply_force(&self, body_id: String, force: Vec3) -> Result<(), SimError> {
        self.send(SessionCommand::ApplyForce { body_id, force }).await
    }

    pub async fn set_position(&self, body_id: String, position: Vec3) -> Result<(), SimError> {
        self.send(SessionCommand::SetPosition { body_id, position }).await
    }

    pub async fn set_velocity(&self, body_id: String, velocity: Vec3) -> Result<(), SimError> {
        self.send(SessionCommand::SetVelocity { body_id, velocity }).await
    }

    pub async fn pause(&self) -> Result<LoopState, SimError> {
        self.request(|reply| SessionCommand::Pause { reply }).await
    }

    pub async fn resume(&self) -> Result<LoopState, SimError> {
        self.request(|reply| SessionCommand::Resume { reply }).await
    }

    pub async fn reset(&self) -> Result<LoopState, SimError> {
        self.request(|reply| SessionCommand::Reset { reply }).await
    }

    /// Returns the gravity now in effect.
    pub async fn set_gravity(&self, gravity: Vec3) -> Result<Vec3, SimError> {
        self.request(|reply| SessionCommand::SetGravity { gravity, reply }).await
    }

    pub async fn add_body(&self, spec: BodySpec) -> Result<String, SimError> {
        self.request(|reply| SessionCommand::AddBody { spec, reply }).await
    }

    /// Returns the ids of constraints removed along with the body.
    pub async fn remove_body(&self, body_id: String) -> Result<Vec<String>, SimError> {
        self.request(|reply| SessionCommand::RemoveBody { body_id, reply }).await
    }

    pub async fn add_constraint(&self, spec: ConstraintSpec) -> Result<String, SimError> {
        self.request(|reply| SessionCommand::AddConstraint { spec, reply }).await
    }

    pub async fn load_template(
        &self,
        name: String,
        params: Map<String, Value>,
    ) -> Result<TemplateReport, SimError> {
        self.request(|reply| SessionCommand::LoadTemplate {
            name,
            params,
            reply,
        })
        .await
    }

    pub async fn status(&self) -> Result<SessionStatus, SimError> {
        self.request(|reply| SessionCommand::Status { reply }).await
    }

    pub async fn shutdown(&self) {
        let _ = self.commands.send(SessionCommand::Shutdown).await;
    }

    async fn send(&self, command: SessionCommand) -> Result<(), SimError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| SimError::SessionClosed)
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(Reply<T>) -> SessionCommand,
    ) -> Result<T, SimError> {
        let (reply, rx) = oneshot::channel();
        self.send(command(reply)).await?;
        rx.await.map_err(|_| SimError::SessionClosed)?
    }
}
