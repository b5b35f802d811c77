// The session actor: owns the registry, steps the engine and publishes snapshots.

use super::broadcast::{Broadcaster, PruneReason};
use super::types::{LoopState, SessionCommand, SessionSettings, SessionStatus, SnapshotEncoder};
use crate::domain::templates::load_template;
use crate::domain::{EntityRegistry, PhysicsEngine, SimError, Snapshot};
use std::ops::ControlFlow;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, info, warn};

const LOG_THROTTLE: Duration = Duration::from_secs(2);
/// Weight of the newest sample in the smoothed tick rate.
const FPS_SMOOTHING: f64 = 0.1;

#[derive(Debug, Default)]
struct FpsMeter {
    last: Option<Instant>,
    fps: f64,
}

impl FpsMeter {
    fn record(&mut self, now: Instant) -> f64 {
        if let Some(prev) = self.last {
            let dt = now.saturating_duration_since(prev).as_secs_f64();
            if dt > 0.0 {
                let sample = 1.0 / dt;
                self.fps = if self.fps == 0.0 {
                    sample
                } else {
                    self.fps + FPS_SMOOTHING * (sample - self.fps)
                };
            }
        }
        self.last = Some(now);
        self.fps
    }

    fn restart(&mut self) {
        *self = Self::default();
    }
}

fn should_log(last: &mut Option<Instant>) -> bool {
    let now = Instant::now();
    match last {
        Some(at) if now.saturating_duration_since(*at) < LOG_THROTTLE => false,
        _ => {
            *last = Some(now);
            true
        }
    }
}

pub struct Session<E> {
    registry: EntityRegistry<E>,
    broadcaster: Broadcaster,
    state: LoopState,
    state_tx: watch::Sender<LoopState>,
    tick: u64,
    fps: FpsMeter,
    last_step_warn: Option<Instant>,
    last_read_warn: Option<Instant>,
}

impl<E: PhysicsEngine> Session<E> {
    pub fn new(engine: E, encoder: SnapshotEncoder, state_tx: watch::Sender<LoopState>) -> Self {
        state_tx.send_replace(LoopState::Stopped);
        Self {
            registry: EntityRegistry::new(engine),
            broadcaster: Broadcaster::new(encoder),
            state: LoopState::Stopped,
            state_tx,
            tick: 0,
            fps: FpsMeter::default(),
            last_step_warn: None,
            last_read_warn: None,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn registry(&self) -> &EntityRegistry<E> {
        &self.registry
    }

    fn set_state(&mut self, next: LoopState) {
        if self.state == next {
            return;
        }
        info!(from = self.state.as_str(), to = next.as_str(), "session state changed");
        self.state = next;
        if next != LoopState::Running {
            self.fps.restart();
        }
        self.state_tx.send_replace(next);
    }

    fn status(&self) -> SessionStatus {
        SessionStatus {
            state: self.state,
            tick: self.tick,
            body_count: self.registry.body_count(),
            constraint_count: self.registry.constraint_count(),
            clients: self.broadcaster.len(),
            simulation_time: self.registry.simulation_time(),
        }
    }

    /// Applies one command to completion. Breaks on shutdown.
    pub fn handle_command(&mut self, command: SessionCommand) -> ControlFlow<()> {
        match command {
            SessionCommand::Attach { client, frames } => {
                self.broadcaster.attach(client, frames);
                debug!(client = client.0, clients = self.broadcaster.len(), "client attached");
                if self.state == LoopState::Stopped {
                    self.set_state(LoopState::Running);
                }
            }
            SessionCommand::Detach { client } => {
                if self.broadcaster.detach(client) {
                    debug!(client = client.0, clients = self.broadcaster.len(), "client detached");
                }
                if self.broadcaster.is_empty() && self.state != LoopState::Stopped {
                    self.set_state(LoopState::Stopped);
                }
            }
            SessionCommand::ApplyForce { body_id, force } => {
                let result = self.registry.apply_force(&body_id, force);
                log_kinematic("apply_force", &body_id, result);
            }
            SessionCommand::SetPosition { body_id, position } => {
                let result = self.registry.set_position(&body_id, position);
                log_kinematic("set_position", &body_id, result);
            }
            SessionCommand::SetVelocity { body_id, velocity } => {
                let result = self.registry.set_velocity(&body_id, velocity);
                log_kinematic("set_velocity", &body_id, result);
            }
            // A stopped loop has no clients to serve; only attach starts it.
            SessionCommand::Pause { reply } => {
                if self.state == LoopState::Running {
                    self.set_state(LoopState::Paused);
                }
                let _ = reply.send(Ok(self.state));
            }
            SessionCommand::Resume { reply } => {
                if self.state == LoopState::Paused {
                    self.set_state(LoopState::Running);
                }
                let _ = reply.send(Ok(self.state));
            }
            SessionCommand::Reset { reply } => {
                self.registry.reset();
                self.tick = 0;
                self.fps.restart();
                info!(state = self.state.as_str(), "session reset");
                let _ = reply.send(Ok(self.state));
            }
            SessionCommand::SetGravity { gravity, reply } => {
                let result = self.registry.set_gravity(gravity);
                if result.is_ok() {
                    info!(?gravity, "gravity changed");
                }
                let _ = reply.send(result.map(|()| self.registry.gravity()));
            }
            SessionCommand::AddBody { spec, reply } => {
                let _ = reply.send(self.registry.create_body(spec));
            }
            SessionCommand::RemoveBody { body_id, reply } => {
                let _ = reply.send(self.registry.remove_body(&body_id));
            }
            SessionCommand::AddConstraint { spec, reply } => {
                let _ = reply.send(self.registry.create_constraint(spec));
            }
            SessionCommand::LoadTemplate {
                name,
                params,
                reply,
            } => {
                let _ = reply.send(load_template(&mut self.registry, &name, &params));
            }
            SessionCommand::Status { reply } => {
                let _ = reply.send(Ok(self.status()));
            }
            SessionCommand::Shutdown => return ControlFlow::Break(()),
        }
        ControlFlow::Continue(())
    }

    /// Runs one tick while running: step, capture, publish.
    ///
    /// Returns the published snapshot's tick number, if any.
    pub fn tick(&mut self, now: Instant) -> Option<u64> {
        if self.state != LoopState::Running {
            return None;
        }
        if self.broadcaster.is_empty() {
            info!("no clients attached; stopping session loop");
            self.set_state(LoopState::Stopped);
            return None;
        }

        if let Err(err) = self.registry.step() {
            if should_log(&mut self.last_step_warn) {
                warn!(error = %err, tick = self.tick, "engine step failed; tick skipped");
            }
            return None;
        }

        self.tick += 1;
        let fps = self.fps.record(now);
        let (snapshot, unreadable) = Snapshot::capture(&self.registry, self.tick, fps);
        if !unreadable.is_empty() && should_log(&mut self.last_read_warn) {
            for (body_id, err) in &unreadable {
                warn!(body_id = %body_id, error = %err, "body omitted from snapshot");
            }
        }

        match self.broadcaster.publish(&snapshot) {
            Ok(report) => {
                for (client, reason) in &report.pruned {
                    match reason {
                        PruneReason::Closed => debug!(client = client.0, "pruned closed client"),
                        PruneReason::Lagging => {
                            info!(client = client.0, "pruned client that fell behind")
                        }
                    }
                }
            }
            Err(err) => warn!(error = %err, tick = self.tick, "failed to encode snapshot"),
        }
        Some(self.tick)
    }

    /// Releases every client channel after the state channel closes.
    fn shutdown(self) {
        let Session {
            state_tx,
            mut broadcaster,
            ..
        } = self;
        // Close the state channel first so clients can tell shutdown from pruning.
        drop(state_tx);
        let clients = broadcaster.len();
        broadcaster.clear();
        info!(clients, "session shut down");
    }
}

fn log_kinematic(command: &'static str, body_id: &str, result: Result<bool, SimError>) {
    match result {
        Ok(true) => {}
        Ok(false) => debug!(command, body_id, "kinematic command for unknown body ignored"),
        Err(err) => debug!(command, body_id, error = %err, "kinematic command rejected"),
    }
}

/// Drives the session: commands are handled as they arrive, ticks fire on a
/// fixed cadence measured from the start of the previous tick.
pub async fn session_task<E: PhysicsEngine>(
    mut session: Session<E>,
    mut commands: mpsc::Receiver<SessionCommand>,
    settings: SessionSettings,
) {
    let mut next_tick = Instant::now();

    loop {
        let running = session.state() == LoopState::Running;
        let deadline = if running {
            next_tick
        } else {
            Instant::now() + settings.paused_poll
        };

        tokio::select! {
            command = commands.recv() => {
                let Some(command) = command else {
                    debug!("all session handles dropped");
                    break;
                };
                if session.handle_command(command).is_break() {
                    break;
                }
                if !running && session.state() == LoopState::Running {
                    next_tick = Instant::now();
                }
            }
            _ = tokio::time::sleep_until(deadline) => {
                if running {
                    let started = Instant::now();
                    session.tick(started);
                    next_tick = started + settings.tick_interval;
                }
            }
        }
    }

    session.shutdown();
}
