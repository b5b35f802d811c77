use crate::interface_adapters::handlers::{
    add_body, add_constraint, load_preset, pause, remove_body, reset, resume, set_gravity, status,
    templates,
};
use crate::interface_adapters::net::ws_handler;
use crate::interface_adapters::state::AppState;
use axum::{
    Router,
    routing::{get, post},
};

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/api/physics/reset", post(reset))
        .route("/api/physics/pause", post(pause))
        .route("/api/physics/resume", post(resume))
        .route("/api/physics/gravity", post(set_gravity))
        .route("/api/physics/add_body", post(add_body))
        .route("/api/physics/remove_body/{body_id}", post(remove_body))
        .route("/api/physics/add_constraint", post(add_constraint))
        .route("/api/physics/load_preset/{preset_name}", post(load_preset))
        .route("/api/physics/templates", get(templates))
        .route("/api/physics/status", get(status))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::test_support::RecordingEngine;
    use crate::interface_adapters::protocol::encode_snapshot;
    use crate::use_cases::{SessionHandle, SessionSettings};
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use std::time::Duration;
    use tower::ServiceExt;

    fn build_test_app() -> Router {
        let session = SessionHandle::spawn(
            RecordingEngine::new(),
            SessionSettings {
                command_capacity: 32,
                tick_interval: Duration::from_millis(10),
                paused_poll: Duration::from_millis(100),
            },
            encode_snapshot,
        );
        app(AppState {
            session,
            frame_capacity: 8,
        })
    }

    fn post_json(uri: &str, body: &'static str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body))
            .expect("expected request to build")
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("expected response body");
        serde_json::from_slice(&body).expect("expected json body")
    }

    #[tokio::test]
    async fn when_body_is_added_then_returns_its_id_and_status_counts_it() {
        let app = build_test_app();

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/physics/add_body",
                r#"{"id":"crate","type":"box","size":[1,2,1],"mass":3}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let payload = json_body(response).await;
        assert_eq!(payload["status"], "success");
        assert_eq!(payload["body_id"], "crate");

        let request = Request::builder()
            .uri("/api/physics/status")
            .body(Body::empty())
            .expect("expected request to build");
        let payload = json_body(app.oneshot(request).await.unwrap()).await;
        assert_eq!(payload["bodyCount"], 1);
        assert_eq!(payload["state"], "stopped");
    }

    #[tokio::test]
    async fn when_gravity_is_posted_then_returns_the_vector_in_effect() {
        let app = build_test_app();

        let response = app
            .oneshot(post_json("/api/physics/gravity", r#"{"gravity":[0,-1.62,0]}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let payload = json_body(response).await;
        assert_eq!(payload["status"], "success");
        assert_eq!(payload["gravity"], serde_json::json!([0.0, -1.62, 0.0]));
    }

    #[tokio::test]
    async fn when_gravity_vector_is_malformed_then_returns_400() {
        let app = build_test_app();

        let response = app
            .oneshot(post_json("/api/physics/gravity", r#"{"value":[0,"down",0]}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["kind"], "InvalidParameter");
    }

    #[tokio::test]
    async fn when_body_id_is_duplicated_then_returns_409_with_kind() {
        let app = build_test_app();
        let body = r#"{"id":"twin"}"#;

        app.clone()
            .oneshot(post_json("/api/physics/add_body", body))
            .await
            .unwrap();
        let response = app
            .oneshot(post_json("/api/physics/add_body", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CONFLICT);
        let payload = json_body(response).await;
        assert_eq!(payload["kind"], "DuplicateEntity");
        assert_eq!(payload["error"], "entity 'twin' already exists");
    }

    #[tokio::test]
    async fn when_removed_body_does_not_exist_then_returns_404() {
        let app = build_test_app();

        let response = app
            .oneshot(post_json("/api/physics/remove_body/ghost", ""))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["kind"], "NotFound");
    }

    #[tokio::test]
    async fn when_constraint_references_missing_body_then_returns_404() {
        let app = build_test_app();

        let response = app
            .oneshot(post_json(
                "/api/physics/add_constraint",
                r#"{"body_a":"a","body_b":"b"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["kind"], "UnknownBody");
    }

    #[tokio::test]
    async fn when_body_payload_is_malformed_then_returns_400_invalid_parameter() {
        let app = build_test_app();

        let response = app
            .oneshot(post_json("/api/physics/add_body", r#"{"mass":"heavy"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["kind"], "InvalidParameter");
    }

    #[tokio::test]
    async fn when_preset_is_loaded_without_body_then_defaults_apply() {
        let app = build_test_app();

        let response = app
            .oneshot(post_json("/api/physics/load_preset/pendulum", ""))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let payload = json_body(response).await;
        assert_eq!(
            payload["body_ids"],
            serde_json::json!(["pendulum_anchor", "pendulum_bob"])
        );
        assert_eq!(payload["constraint_ids"], serde_json::json!(["pendulum_rod"]));
    }

    #[tokio::test]
    async fn when_preset_parameter_is_out_of_range_then_returns_400() {
        let app = build_test_app();

        let response = app
            .oneshot(post_json(
                "/api/physics/load_preset/dna_helix",
                r#"{"base_pairs":0}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["kind"], "InvalidParameter");
    }

    #[tokio::test]
    async fn when_preset_is_unknown_then_returns_404() {
        let app = build_test_app();

        let response = app
            .oneshot(post_json("/api/physics/load_preset/klein_bottle", ""))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["kind"], "UnknownTemplate");
    }

    #[tokio::test]
    async fn when_pause_is_posted_then_state_is_reported() {
        let app = build_test_app();

        let response = app
            .oneshot(post_json("/api/physics/pause", ""))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let payload = json_body(response).await;
        assert_eq!(payload["message"], "Simulation paused");
        assert_eq!(payload["state"], "stopped");
    }

    #[tokio::test]
    async fn when_templates_are_listed_then_all_ten_are_present() {
        let app = build_test_app();

        let request = Request::builder()
            .uri("/api/physics/templates")
            .body(Body::empty())
            .expect("expected request to build");
        let payload = json_body(app.oneshot(request).await.unwrap()).await;

        assert_eq!(payload["templates"].as_array().unwrap().len(), 10);
    }

    #[tokio::test]
    async fn when_control_route_is_called_with_get_then_returns_405() {
        let app = build_test_app();

        let request = Request::builder()
            .method("GET")
            .uri("/api/physics/reset")
            .body(Body::empty())
            .expect("expected request to build");

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
