//! # Handlers HTTP
//!
//! | Handler | Método | Rota | Retorno |
//! |---------|--------|------|---------|
//! | `index` | GET | `/` | HTML completo (Maud) |
//! | `process_question` | POST | `/processar_pergunta` | JSON: frame (200) ou falha (400) |
//! | `status` | GET | `/status` | JSON: contagem de recursos e limiares |
//!
//! O pipeline é síncrono e pode chamar um processo externo de análise
//! linguística, por isso roda em `spawn_blocking`.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::state::AppState;
use super::templates;
use crate::config::Settings;
use crate::error::FailureReport;
use crate::resources::{ResourceSummary, Resources};

/// Corpo de `POST /processar_pergunta`.
#[derive(Debug, Deserialize)]
pub struct QuestionRequest {
    #[serde(default)]
    pub pergunta: Option<String>,
}

/// Resposta de `/status` e do subcomando `check`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    #[serde(flatten)]
    pub resources: ResourceSummary,
    pub template_threshold: f64,
    pub synonym_threshold: f64,
    pub strict_entities: bool,
}

impl StatusResponse {
    pub fn new(resources: &Resources, settings: &Settings) -> Self {
        Self {
            resources: resources.summary(),
            template_threshold: settings.template_threshold,
            synonym_threshold: settings.synonym_threshold,
            strict_entities: settings.strict_entities,
        }
    }
}

/// Converte um template Maud em resposta HTML do Axum.
fn markup_to_html(m: maud::Markup) -> Html<String> {
    Html(m.into_string())
}

fn bad_request(report: FailureReport) -> Response {
    (StatusCode::BAD_REQUEST, Json(report)).into_response()
}

/// GET `/`
pub async fn index(State(state): State<AppState>) -> Html<String> {
    markup_to_html(templates::index_page(&state.orchestrator.resources().summary()))
}

/// GET `/status`
pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse::new(state.orchestrator.resources(), &state.settings))
}

/// POST `/processar_pergunta`
///
/// Corpo inválido ou sem `pergunta` também devolve 400 com o documento de
/// falha, no mesmo formato das falhas do pipeline.
pub async fn process_question(
    State(state): State<AppState>,
    body: Result<Json<QuestionRequest>, JsonRejection>,
) -> Response {
    let question = match body {
        Ok(Json(QuestionRequest {
            pergunta: Some(question),
        })) if !question.trim().is_empty() => question,
        Ok(_) => {
            return bad_request(FailureReport::new(
                "pergunta não fornecida no corpo JSON",
                None,
            ))
        }
        Err(rejection) => {
            tracing::warn!(error = %rejection, "Corpo da requisição rejeitado");
            return bad_request(FailureReport::new(
                "corpo JSON inválido",
                Some(rejection.body_text()),
            ));
        }
    };

    let orchestrator = state.orchestrator.clone();
    let outcome = tokio::task::spawn_blocking(move || orchestrator.run(&question)).await;

    match outcome {
        Ok(Ok(frame)) => (StatusCode::OK, Json(frame)).into_response(),
        Ok(Err(failure)) => bad_request(FailureReport::from(&failure)),
        Err(join_err) => {
            tracing::error!(error = %join_err, "Tarefa do pipeline abortou");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(FailureReport::new(
                    "erro interno ao processar a pergunta",
                    Some(join_err.to_string()),
                )),
            )
                .into_response()
        }
    }
}
