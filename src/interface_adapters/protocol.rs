// Wire protocol DTOs and conversions for WebSocket and HTTP messages.

use crate::domain::templates::params::{ParamKind, ParamSpec, ParamValue};
use crate::domain::{
    BodySpec, ConstraintKind, ConstraintSpec, Metadata, Shape, SimError, Snapshot, Template,
    TemplateReport, Vec3,
};
use crate::domain::entities::Quat;
use crate::use_cases::SessionStatus;
use axum::extract::ws::Utf8Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// Messages the client sends to the server over the WebSocket.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    ApplyForce {
        body_id: String,
        #[serde(default)]
        force: Vec3,
    },
    SetPosition {
        body_id: String,
        #[serde(default)]
        position: Vec3,
    },
    SetVelocity {
        body_id: String,
        #[serde(default)]
        velocity: Vec3,
    },
    Pause,
    Resume,
    Reset,
    #[serde(alias = "gravity")]
    SetGravity {
        #[serde(alias = "value")]
        gravity: Vec3,
    },
    AddBody {
        body: BodySpecDto,
    },
    RemoveBody {
        body_id: String,
    },
    AddConstraint {
        constraint: ConstraintSpecDto,
    },
    LoadTemplate {
        #[serde(alias = "name")]
        template: String,
        #[serde(default, alias = "params")]
        parameters: Map<String, Value>,
    },
    ListTemplates,
}

impl ClientMessage {
    /// Every accepted `type` discriminator.
    pub const KNOWN_TYPES: &'static [&'static str] = &[
        "apply_force",
        "set_position",
        "set_velocity",
        "pause",
        "resume",
        "reset",
        "set_gravity",
        "gravity",
        "add_body",
        "remove_body",
        "add_constraint",
        "load_template",
        "list_templates",
    ];
}

/// Body creation payload shared by the WebSocket and HTTP surfaces.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BodySpecDto {
    pub id: Option<String>,
    #[serde(rename = "type", alias = "shape")]
    pub shape: Option<String>,
    pub radius: Option<f64>,
    pub size: Option<Vec3>,
    pub height: Option<f64>,
    pub mass: Option<f64>,
    pub position: Option<Vec3>,
    pub velocity: Option<Vec3>,
    pub metadata: Option<Metadata>,
}

impl TryFrom<BodySpecDto> for BodySpec {
    type Error = SimError;

    fn try_from(dto: BodySpecDto) -> Result<Self, Self::Error> {
        let shape = match dto.shape.as_deref().unwrap_or("sphere") {
            "sphere" => Shape::Sphere {
                radius: dto.radius.unwrap_or(1.0),
            },
            "box" => Shape::Box {
                size: dto.size.unwrap_or([1.0, 1.0, 1.0]),
            },
            "cylinder" => Shape::Cylinder {
                radius: dto.radius.unwrap_or(0.5),
                height: dto.height.unwrap_or(1.0),
            },
            other => {
                return Err(SimError::invalid(
                    "type",
                    format!("unsupported body type '{other}'"),
                ));
            }
        };
        let spec = BodySpec {
            id: dto.id,
            shape,
            mass: dto.mass.unwrap_or(1.0),
            position: dto.position.unwrap_or([0.0; 3]),
            velocity: dto.velocity,
            metadata: dto.metadata.unwrap_or_default(),
        };
        spec.validate()?;
        Ok(spec)
    }
}

/// Constraint creation payload shared by the WebSocket and HTTP surfaces.
#[derive(Debug, Clone, Deserialize)]
pub struct ConstraintSpecDto {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub body_a: String,
    pub body_b: String,
    pub stiffness: Option<f64>,
    pub damping: Option<f64>,
    pub rest_length: Option<f64>,
    pub distance: Option<f64>,
    pub metadata: Option<Metadata>,
}

impl TryFrom<ConstraintSpecDto> for ConstraintSpec {
    type Error = SimError;

    fn try_from(dto: ConstraintSpecDto) -> Result<Self, Self::Error> {
        let rest_length = dto.rest_length.unwrap_or(1.0);
        let kind = match dto.kind.as_deref().unwrap_or("spring") {
            "spring" => ConstraintKind::Spring {
                stiffness: dto.stiffness.unwrap_or(100.0),
                damping: dto.damping.unwrap_or(1.0),
                rest_length,
            },
            "distance" => ConstraintKind::Distance {
                distance: dto.distance.unwrap_or(rest_length),
            },
            other => {
                return Err(SimError::invalid(
                    "type",
                    format!("unsupported constraint type '{other}'"),
                ));
            }
        };
        let spec = ConstraintSpec {
            id: dto.id,
            kind,
            body_a: dto.body_a,
            body_b: dto.body_b,
            metadata: dto.metadata.unwrap_or_default(),
        };
        spec.validate()?;
        Ok(spec)
    }
}

/// Messages the server sends to one client over the WebSocket.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    // Current loop state; sent on connect and on every change.
    SessionState {
        state: &'static str,
    },
    Ack {
        command: &'static str,
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        state: Option<&'static str>,
        #[serde(skip_serializing_if = "Option::is_none")]
        gravity: Option<Vec3>,
    },
    TemplateLoaded {
        template: &'static str,
        body_ids: Vec<String>,
        constraint_ids: Vec<String>,
    },
    Templates {
        templates: Vec<TemplateDto>,
    },
    Error {
        kind: &'static str,
        reason: String,
    },
}

impl ServerMessage {
    pub fn error(err: &SimError) -> Self {
        ServerMessage::Error {
            kind: err.kind(),
            reason: err.to_string(),
        }
    }

    pub fn template_loaded(report: TemplateReport) -> Self {
        ServerMessage::TemplateLoaded {
            template: report.template.name(),
            body_ids: report.bodies,
            constraint_ids: report.constraints,
        }
    }
}

/// Snapshot of the simulation sent to every client on each tick.
#[derive(Debug, Serialize)]
pub struct PhysicsUpdateDto<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub tick: u64,
    pub timestamp: f64,
    pub bodies: Vec<BodyStateDto<'a>>,
    pub metrics: MetricsDto,
}

#[derive(Debug, Serialize)]
pub struct BodyStateDto<'a> {
    pub id: &'a str,
    pub position: Vec3,
    pub rotation: Quat,
    pub velocity: Vec3,
    pub metadata: &'a Metadata,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsDto {
    pub fps: f64,
    pub body_count: usize,
    pub constraint_count: usize,
    pub simulation_time: f64,
}

impl<'a> From<&'a Snapshot> for PhysicsUpdateDto<'a> {
    fn from(snapshot: &'a Snapshot) -> Self {
        Self {
            kind: "physics_update",
            tick: snapshot.tick,
            timestamp: snapshot.timestamp,
            bodies: snapshot
                .bodies
                .iter()
                .map(|body| BodyStateDto {
                    id: &body.id,
                    position: body.position,
                    rotation: body.rotation,
                    velocity: body.velocity,
                    metadata: &body.metadata,
                })
                .collect(),
            metrics: MetricsDto {
                fps: snapshot.metrics.fps,
                body_count: snapshot.metrics.body_count,
                constraint_count: snapshot.metrics.constraint_count,
                simulation_time: snapshot.metrics.simulation_time,
            },
        }
    }
}

/// Serializes a snapshot once; the bytes are shared by every client.
pub fn encode_snapshot(snapshot: &Snapshot) -> Result<Utf8Bytes, serde_json::Error> {
    serde_json::to_string(&PhysicsUpdateDto::from(snapshot)).map(Utf8Bytes::from)
}

#[derive(Debug, Clone, Serialize)]
pub struct TemplateDto {
    pub name: &'static str,
    pub category: &'static str,
    pub description: &'static str,
    pub parameters: Vec<ParamDto>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParamDto {
    pub name: &'static str,
    pub kind: &'static str,
    pub default: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub min_exclusive: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<&'static [&'static str]>,
    pub description: &'static str,
}

impl From<&ParamSpec> for ParamDto {
    fn from(spec: &ParamSpec) -> Self {
        let (kind, min, max, min_exclusive, options) = match spec.kind {
            ParamKind::Number { min, max } => (
                "number",
                min.map(|l| l.value),
                max.map(|l| l.value),
                min.is_some_and(|l| !l.inclusive),
                None,
            ),
            ParamKind::Integer { min, max } => {
                ("integer", Some(min as f64), Some(max as f64), false, None)
            }
            ParamKind::Interval => ("interval", None, None, false, None),
            ParamKind::Choice(options) => ("choice", None, None, false, Some(options)),
        };
        let default = match spec.default {
            ParamValue::Number(v) => json!(v),
            ParamValue::Integer(v) => json!(v),
            ParamValue::Interval(v) => json!(v),
            ParamValue::Choice(v) => json!(v),
        };
        Self {
            name: spec.name,
            kind,
            default,
            min,
            max,
            min_exclusive,
            options,
            description: spec.doc,
        }
    }
}

impl From<Template> for TemplateDto {
    fn from(template: Template) -> Self {
        Self {
            name: template.name(),
            category: template.category(),
            description: template.description(),
            parameters: template.schema().iter().map(ParamDto::from).collect(),
        }
    }
}

/// The full template catalog with parameter schemas.
pub fn template_catalog() -> Vec<TemplateDto> {
    Template::ALL.into_iter().map(TemplateDto::from).collect()
}

// HTTP response bodies.

#[derive(Debug, Serialize)]
pub struct ControlResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub state: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct GravityRequest {
    #[serde(alias = "value")]
    pub gravity: Vec3,
}

#[derive(Debug, Serialize)]
pub struct GravityResponse {
    pub status: &'static str,
    pub gravity: Vec3,
}

#[derive(Debug, Serialize)]
pub struct AddBodyResponse {
    pub status: &'static str,
    pub body_id: String,
}

#[derive(Debug, Serialize)]
pub struct RemoveBodyResponse {
    pub status: &'static str,
    pub message: String,
    pub removed_constraints: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct AddConstraintResponse {
    pub status: &'static str,
    pub constraint_id: String,
}

#[derive(Debug, Serialize)]
pub struct LoadPresetResponse {
    pub status: &'static str,
    pub message: String,
    pub body_ids: Vec<String>,
    pub constraint_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub state: &'static str,
    pub tick: u64,
    pub body_count: usize,
    pub constraint_count: usize,
    pub clients: usize,
    pub simulation_time: f64,
}

impl From<SessionStatus> for StatusResponse {
    fn from(status: SessionStatus) -> Self {
        Self {
            state: status.state.as_str(),
            tick: status.tick,
            body_count: status.body_count,
            constraint_count: status.constraint_count,
            clients: status.clients,
            simulation_time: status.simulation_time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BodyState, Metrics};
    use std::sync::Arc;

    #[test]
    fn when_snapshot_is_encoded_then_wire_shape_uses_camel_case_metrics() {
        let snapshot = Snapshot {
            tick: 3,
            timestamp: 12.5,
            bodies: vec![BodyState {
                id: "atom".into(),
                position: [1.0, 2.0, 3.0],
                rotation: [0.0, 0.0, 0.0, 1.0],
                velocity: [0.0; 3],
                metadata: Arc::new(json!({ "color": "#FFFFFF" }).as_object().cloned().unwrap()),
            }],
            metrics: Metrics {
                fps: 59.5,
                body_count: 1,
                constraint_count: 0,
                simulation_time: 0.25,
            },
        };

        let encoded = encode_snapshot(&snapshot).unwrap();
        let value: Value = serde_json::from_str(encoded.as_str()).unwrap();

        assert_eq!(value["type"], "physics_update");
        assert_eq!(value["tick"], 3);
        assert_eq!(value["bodies"][0]["id"], "atom");
        assert_eq!(value["bodies"][0]["rotation"], json!([0.0, 0.0, 0.0, 1.0]));
        assert_eq!(value["bodies"][0]["metadata"]["color"], "#FFFFFF");
        assert_eq!(value["metrics"]["bodyCount"], 1);
        assert_eq!(value["metrics"]["constraintCount"], 0);
        assert_eq!(value["metrics"]["simulationTime"], 0.25);
    }

    #[test]
    fn when_body_dto_omits_fields_then_defaults_apply() {
        let dto: BodySpecDto = serde_json::from_value(json!({})).unwrap();
        let spec = BodySpec::try_from(dto).unwrap();
        assert_eq!(spec.shape, Shape::Sphere { radius: 1.0 });
        assert_eq!(spec.mass, 1.0);
        assert_eq!(spec.position, [0.0; 3]);
        assert!(spec.id.is_none());
    }

    #[test]
    fn when_body_dto_has_unknown_type_then_invalid_parameter() {
        let dto: BodySpecDto = serde_json::from_value(json!({ "type": "torus" })).unwrap();
        let err = BodySpec::try_from(dto).unwrap_err();
        assert_eq!(err.kind(), "InvalidParameter");
    }

    #[test]
    fn when_distance_constraint_omits_distance_then_rest_length_is_used() {
        let dto: ConstraintSpecDto = serde_json::from_value(json!({
            "type": "distance", "body_a": "a", "body_b": "b", "rest_length": 2.5
        }))
        .unwrap();
        let spec = ConstraintSpec::try_from(dto).unwrap();
        assert_eq!(spec.kind, ConstraintKind::Distance { distance: 2.5 });
    }

    #[test]
    fn when_load_template_uses_short_field_names_then_aliases_apply() {
        let msg: ClientMessage = serde_json::from_value(json!({
            "type": "load_template", "name": "pendulum", "params": { "length": 3.0 }
        }))
        .unwrap();
        let ClientMessage::LoadTemplate {
            template,
            parameters,
        } = msg
        else {
            panic!("expected load_template");
        };
        assert_eq!(template, "pendulum");
        assert_eq!(parameters["length"], 3.0);
    }

    #[test]
    fn when_error_is_serialized_then_kind_and_reason_are_present() {
        let msg = ServerMessage::error(&SimError::UnknownCommand {
            command: "fly".into(),
        });
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "error");
        assert_eq!(value["kind"], "UnknownCommand");
        assert_eq!(value["reason"], "unknown command 'fly'");
    }

    #[test]
    fn when_catalog_is_listed_then_every_template_has_a_schema() {
        let catalog = template_catalog();
        assert_eq!(catalog.len(), Template::ALL.len());
        let surface = catalog
            .iter()
            .find(|t| t.name == "parametric_surface")
            .unwrap();
        let resolution = surface
            .parameters
            .iter()
            .find(|p| p.name == "resolution")
            .unwrap();
        assert_eq!(resolution.kind, "integer");
        assert_eq!(resolution.default, json!(20));
        assert_eq!(resolution.max, Some(64.0));
    }
}
