//! # Módulo Web — Superfície HTTP do Pipeline
//!
//! Servidor **Axum** + página **Maud**, equivalente HTTP do subcomando
//! `ask`.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │ Browser (fetch + JSON)                                   │
//! ├──────────────────────────────────────────────────────────┤
//! │ Axum Router (este módulo)                                │
//! │  ├── GET  /                   → formulário HTML          │
//! │  ├── POST /processar_pergunta → frame | falha (JSON)     │
//! │  └── GET  /status             → recursos + limiares      │
//! ├──────────────────────────────────────────────────────────┤
//! │ tower-http: CORS permissivo + TraceLayer                 │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Submódulos
//!
//! | Módulo | Responsabilidade |
//! |--------|------------------|
//! | [`state`] | Estado compartilhado (`AppState`) |
//! | [`handlers`] | Handlers Axum para cada rota |
//! | [`templates`] | Página Maud |

pub mod handlers;
pub mod state;
pub mod templates;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use state::AppState;

/// Cria o router Axum com todas as rotas da aplicação.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/processar_pergunta", post(handlers::process_question))
        .route("/status", get(handlers::status))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use chrono::NaiveDate;
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::config::Settings;
    use crate::nlu::annotator::HeuristicAnnotator;
    use crate::nlu::date::FixedClock;
    use crate::orchestrator::Orchestrator;
    use crate::resources::Resources;

    fn app() -> Router {
        let settings = Settings::with_resources_dir(Path::new(env!("CARGO_MANIFEST_DIR")).join("resources"));
        let resources = Arc::new(Resources::load(&settings).unwrap());
        let orchestrator = Orchestrator::new(
            resources,
            Arc::new(HeuristicAnnotator::new()),
            Arc::new(FixedClock(NaiveDate::from_ymd_opt(2024, 3, 10).unwrap())),
            &settings,
        );
        create_router(AppState::new(orchestrator, settings))
    }

    fn post_json(body: &str) -> Request<Body> {
        Request::post("/processar_pergunta")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn answers_closing_price_question() {
        let response = app()
            .oneshot(post_json(
                r#"{"pergunta": "Qual foi o preço de fechamento da VALE3 em 05/03/2024?"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = json_body(response).await;
        assert_eq!(json["templateId"], "Template 1A");
        assert_eq!(json["placeholders"]["ENTITY"], "VALE3");
        assert_eq!(json["placeholders"]["DATE"], "2024-03-05");
        assert_eq!(json["placeholders"]["DESIRED_VALUE"], "preco_fechamento");
        assert!(json["debugInfo"]["traceId"].is_string());
    }

    #[tokio::test]
    async fn missing_question_is_bad_request() {
        let response = app().oneshot(post_json(r#"{"pergunta": "   "}"#)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = json_body(response).await;
        assert!(json["error"].as_str().unwrap().contains("pergunta"));

        let response = app().oneshot(post_json("{}")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn malformed_body_is_bad_request() {
        let response = app().oneshot(post_json("não é json")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = json_body(response).await;
        assert!(json["details"].is_string());
    }

    #[tokio::test]
    async fn unrelated_question_reports_failure() {
        let response = app()
            .oneshot(post_json(r#"{"pergunta": "Como fazer um bolo de chocolate?"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = json_body(response).await;
        assert!(json["error"].is_string());
        assert!(json.get("templateId").is_none());
    }

    #[tokio::test]
    async fn status_reports_resources_and_thresholds() {
        let response = app()
            .oneshot(Request::get("/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert!(json["synonymKeys"].as_u64().unwrap() >= 5);
        assert!(json["exemplars"].as_u64().unwrap() >= 4);
        assert_eq!(json["templateThreshold"], 0.65);
    }

    #[tokio::test]
    async fn index_serves_form() {
        let response = app()
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let page = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(page.contains("question-form"));
    }
}
