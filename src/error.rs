//! # Taxonomia de Erros
//!
//! | Tipo | Quando | Efeito |
//! |------|--------|--------|
//! | [`ConfigError`] | Arquivo de recurso ausente, ilegível ou inválido | Aborta a inicialização |
//! | [`PipelineFailure`] | Pergunta vazia, não compreendida ou com placeholder obrigatório faltando | Documento de falha por pergunta |
//! | [`Degradation`] | Valor obtido por caminho de fallback | Só aparece no trace de depuração |
//!
//! Falhas por pergunta nunca escapam como pânico: o orquestrador as
//! converte em [`FailureReport`], o documento JSON `{error, details}`.

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::core::frame::PlaceholderKey;
use crate::orchestrator::Stage;

/// Limite de caracteres do campo `details` no documento de falha.
const MAX_DETAILS_CHARS: usize = 500;

/// Erro de configuração: fatal na inicialização.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("arquivo de recurso '{name}' não encontrado (procurado em: {})", display_paths(.searched))]
    Missing { name: String, searched: Vec<PathBuf> },

    #[error("falha ao ler {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("conteúdo inválido em {}: {reason}", .path.display())]
    Invalid { path: PathBuf, reason: String },

    #[error("limiar '{name}' fora de [0, 1]: {value}")]
    Threshold { name: &'static str, value: f64 },
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Falha terminal no processamento de uma pergunta.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PipelineFailure {
    #[error("pergunta vazia")]
    EmptyQuestion,

    /// Nenhum exemplar atingiu o limiar de similaridade.
    #[error("pergunta não compreendida (melhor score {best_score:.3} abaixo do limiar)")]
    NotUnderstood { best_score: f64 },

    /// Placeholders exigidos pelo template não foram resolvidos.
    #[error("não foi possível resolver {} para o {template_id}", display_keys(.missing))]
    Unresolved {
        template_id: String,
        missing: Vec<PlaceholderKey>,
        reason: Option<String>,
    },
}

fn display_keys(keys: &[PlaceholderKey]) -> String {
    keys.iter()
        .map(|k| k.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

impl PipelineFailure {
    /// Estágio do pipeline em que a falha ocorreu.
    pub fn stage(&self) -> Stage {
        match self {
            PipelineFailure::EmptyQuestion => Stage::Start,
            PipelineFailure::NotUnderstood { .. } => Stage::TemplateSelected,
            PipelineFailure::Unresolved { .. } => Stage::Validated,
        }
    }

    fn details(&self) -> Option<String> {
        match self {
            PipelineFailure::EmptyQuestion => None,
            PipelineFailure::NotUnderstood { best_score } => Some(format!(
                "estágio {}; reformule a pergunta (score {:.3})",
                self.stage(),
                best_score
            )),
            PipelineFailure::Unresolved { missing, reason, .. } => {
                let mut text = format!("estágio {}; faltando: {}", self.stage(), display_keys(missing));
                if let Some(reason) = reason {
                    text.push_str("; ");
                    text.push_str(reason);
                }
                Some(text)
            }
        }
    }
}

/// Resolução que só teve sucesso por um caminho de fallback.
#[derive(Debug, Clone, Error, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Degradation {
    #[error("entidade '{text}' não resolvida no gazetteer, usado texto bruto")]
    RawEntityText { text: String },

    #[error("nenhuma métrica explícita, usada a métrica padrão '{key}'")]
    DefaultMetric { key: String },
}

/// Documento JSON de falha: `{"error": ..., "details": ...}`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FailureReport {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl FailureReport {
    pub fn new(error: impl Into<String>, details: Option<String>) -> Self {
        Self {
            error: error.into(),
            details: details.map(|d| truncate_chars(&d, MAX_DETAILS_CHARS)),
        }
    }
}

impl From<&PipelineFailure> for FailureReport {
    fn from(failure: &PipelineFailure) -> Self {
        FailureReport::new(failure.to_string(), failure.details())
    }
}

impl From<&ConfigError> for FailureReport {
    fn from(err: &ConfigError) -> Self {
        FailureReport::new("erro de configuração", Some(err.to_string()))
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unresolved_names_missing_keys() {
        let failure = PipelineFailure::Unresolved {
            template_id: "Template 1A".into(),
            missing: vec![PlaceholderKey::Entity],
            reason: None,
        };
        assert!(failure.to_string().contains("ENTITY"));
        assert_eq!(failure.stage(), Stage::Validated);

        let report = FailureReport::from(&failure);
        assert!(report.details.unwrap().contains("faltando: ENTITY"));
    }

    #[test]
    fn details_are_truncated() {
        let report = FailureReport::new("x", Some("ç".repeat(800)));
        assert_eq!(report.details.unwrap().chars().count(), MAX_DETAILS_CHARS);
    }

    #[test]
    fn report_omits_absent_details() {
        let json = serde_json::to_value(FailureReport::from(&PipelineFailure::EmptyQuestion)).unwrap();
        assert_eq!(json, serde_json::json!({ "error": "pergunta vazia" }));
    }

    #[test]
    fn degradation_serializes_with_kind_tag() {
        let json = serde_json::to_value(Degradation::DefaultMetric { key: "preco_fechamento".into() })
            .unwrap();
        assert_eq!(json["kind"], "default_metric");
        assert_eq!(json["key"], "preco_fechamento");
    }
}
