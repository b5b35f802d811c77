// Parses client text frames and dispatches them to the session.

use crate::domain::entities::finite_vec;
use crate::domain::{BodySpec, ConstraintSpec, SimError};
use crate::interface_adapters::protocol::{ClientMessage, ServerMessage, template_catalog};
use crate::use_cases::SessionHandle;
use serde_json::Value;

#[derive(Debug)]
pub enum ParseError {
    /// The frame is not a JSON object.
    InvalidJson(String),
    /// Well-formed JSON the session cannot accept.
    Rejected(SimError),
}

pub fn parse_client_message(text: &str) -> Result<ClientMessage, ParseError> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| ParseError::InvalidJson(e.to_string()))?;
    if !value.is_object() {
        return Err(ParseError::InvalidJson("expected a JSON object".into()));
    }

    match value.get("type").and_then(Value::as_str) {
        None => Err(ParseError::Rejected(SimError::UnknownCommand {
            command: "<missing type>".into(),
        })),
        Some(kind) if !ClientMessage::KNOWN_TYPES.contains(&kind) => {
            Err(ParseError::Rejected(SimError::UnknownCommand {
                command: kind.to_string(),
            }))
        }
        Some(_) => serde_json::from_value(value)
            .map_err(|e| ParseError::Rejected(SimError::invalid("message", e.to_string()))),
    }
}

/// Applies one client command. Returns the reply for the issuing client, if any.
pub async fn dispatch(
    session: &SessionHandle,
    message: ClientMessage,
) -> Result<Option<ServerMessage>, SimError> {
    match message {
        // Kinematic commands are fire-and-forget; unknown bodies are ignored by the session.
        ClientMessage::ApplyForce { body_id, force } => {
            finite_vec("force", force)?;
            session.apply_force(body_id, force).await?;
            Ok(None)
        }
        ClientMessage::SetPosition { body_id, position } => {
            finite_vec("position", position)?;
            session.set_position(body_id, position).await?;
            Ok(None)
        }
        ClientMessage::SetVelocity { body_id, velocity } => {
            finite_vec("velocity", velocity)?;
            session.set_velocity(body_id, velocity).await?;
            Ok(None)
        }
        ClientMessage::Pause => {
            let state = session.pause().await?;
            Ok(Some(ack_state("pause", state.as_str())))
        }
        ClientMessage::Resume => {
            let state = session.resume().await?;
            Ok(Some(ack_state("resume", state.as_str())))
        }
        ClientMessage::Reset => {
            let state = session.reset().await?;
            Ok(Some(ack_state("reset", state.as_str())))
        }
        ClientMessage::SetGravity { gravity } => {
            finite_vec("gravity", gravity)?;
            let gravity = session.set_gravity(gravity).await?;
            Ok(Some(ServerMessage::Ack {
                command: "set_gravity",
                id: None,
                state: None,
                gravity: Some(gravity),
            }))
        }
        ClientMessage::AddBody { body } => {
            let id = session.add_body(BodySpec::try_from(body)?).await?;
            Ok(Some(ack_id("add_body", id)))
        }
        ClientMessage::RemoveBody { body_id } => {
            session.remove_body(body_id.clone()).await?;
            Ok(Some(ack_id("remove_body", body_id)))
        }
        ClientMessage::AddConstraint { constraint } => {
            let id = session
                .add_constraint(ConstraintSpec::try_from(constraint)?)
                .await?;
            Ok(Some(ack_id("add_constraint", id)))
        }
        ClientMessage::LoadTemplate {
            template,
            parameters,
        } => {
            let report = session.load_template(template, parameters).await?;
            Ok(Some(ServerMessage::template_loaded(report)))
        }
        ClientMessage::ListTemplates => Ok(Some(ServerMessage::Templates {
            templates: template_catalog(),
        })),
    }
}

fn ack_state(command: &'static str, state: &'static str) -> ServerMessage {
    ServerMessage::Ack {
        command,
        id: None,
        state: Some(state),
        gravity: None,
    }
}

fn ack_id(command: &'static str, id: String) -> ServerMessage {
    ServerMessage::Ack {
        command,
        id: Some(id),
        state: None,
        gravity: None,
    }
}
