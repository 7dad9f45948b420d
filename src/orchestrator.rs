//! # Orquestrador — O Pipeline de Compreensão
//!
//! O [`Orchestrator`] sequencia os componentes de [`crate::nlu`] e define o
//! contrato de término: ou um [`SemanticFrame`] completo, ou uma
//! [`PipelineFailure`] tipada. Nunca um frame parcial.
//!
//! ## Máquina de Estados
//!
//! ```text
//! Start ──▶ Analyzed ──▶ DateExtracted ──▶ TemplateSelected ──▶ FrameBuilt ──▶ Validated ──▶ Succeeded
//!   │                                          │                                  │
//!   └── pergunta vazia ──────────┐             └── nenhum template ≥ limiar ──┐   └── placeholder obrigatório ausente
//!                                ▼                                            ▼            ▼
//!                              Failed ◀──────────────────────────────────── Failed ◀──── Failed
//! ```
//!
//! Cada transição é síncrona. Falhas não são repetidas.
//!
//! ## Concorrência
//!
//! O orquestrador só lê estado imutável (`Arc<Resources>`), então uma
//! instância é compartilhada entre threads: o lote usa `rayon` e o servidor
//! web usa `spawn_blocking`.

use std::fmt;
use std::sync::Arc;

use rayon::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use crate::config::Settings;
use crate::core::frame::{DebugTrace, PlaceholderKey, SemanticFrame};
use crate::core::normalizer::normalize;
use crate::core::templates::{requirements_for, EntityKind};
use crate::error::PipelineFailure;
use crate::nlu::annotator::Annotator;
use crate::nlu::date::{self, Clock};
use crate::nlu::frame_builder::{FrameBuilder, FrameInput};
use crate::nlu::gazetteer::EntityOutcome;
use crate::nlu::matcher::{TemplateMatch, TemplateMatcher};
use crate::resources::Resources;

/// Estados do pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Stage {
    Start,
    Analyzed,
    DateExtracted,
    TemplateSelected,
    FrameBuilt,
    Validated,
    Succeeded,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Orquestrador do pipeline de compreensão de perguntas.
pub struct Orchestrator {
    /// Dicionários carregados na inicialização (somente leitura).
    resources: Arc<Resources>,
    /// Analisador linguístico.
    annotator: Arc<dyn Annotator>,
    /// Relógio para datas relativas.
    clock: Arc<dyn Clock>,
    matcher: TemplateMatcher,
    builder: FrameBuilder,
}

impl Orchestrator {
    pub fn new(
        resources: Arc<Resources>,
        annotator: Arc<dyn Annotator>,
        clock: Arc<dyn Clock>,
        settings: &Settings,
    ) -> Self {
        Self {
            resources,
            annotator,
            clock,
            matcher: TemplateMatcher::new(settings.template_threshold),
            builder: FrameBuilder::new(settings.synonym_threshold, settings.strict_entities),
        }
    }

    pub fn resources(&self) -> &Resources {
        &self.resources
    }

    /// Processa uma pergunta do início ao fim.
    pub fn run(&self, question: &str) -> Result<SemanticFrame, PipelineFailure> {
        let trace_id = Uuid::new_v4();
        let result = self.run_stages(trace_id, question);
        match &result {
            Ok(frame) => tracing::info!(
                trace_id = %trace_id,
                template = %frame.template_id,
                placeholders = frame.placeholders.len(),
                "Pergunta compreendida"
            ),
            Err(failure) => tracing::error!(
                trace_id = %trace_id,
                stage = %failure.stage(),
                state = %Stage::Failed,
                error = %failure,
                "Falha no pipeline"
            ),
        }
        result
    }

    fn run_stages(&self, trace_id: Uuid, question: &str) -> Result<SemanticFrame, PipelineFailure> {
        let mut stages = vec![Stage::Start];
        let question = question.trim();
        if question.is_empty() {
            return Err(PipelineFailure::EmptyQuestion);
        }
        let normalized = normalize(question);

        let annotation = self.annotator.annotate(question);
        stages.push(Stage::Analyzed);
        tracing::debug!(trace_id = %trace_id, entities = annotation.entities.len(), tokens = annotation.tokens.len(), "Pergunta analisada");

        let extracted = date::extract(question, self.clock.as_ref());
        stages.push(Stage::DateExtracted);

        let (template_id, score) = match self.matcher.select(&normalized, &self.resources.corpus) {
            TemplateMatch::Selected { template_id, score, .. } => (template_id, score),
            TemplateMatch::NotUnderstood { best_score } => {
                return Err(PipelineFailure::NotUnderstood { best_score });
            }
        };
        stages.push(Stage::TemplateSelected);

        let requirement = requirements_for(&template_id);
        if requirement.is_none() {
            tracing::warn!(template = %template_id, "Template sem tabela de requisitos, nada é obrigatório");
        }
        let required: Vec<PlaceholderKey> = requirement.map(|r| r.required.to_vec()).unwrap_or_default();
        let entity_kind = requirement.map(|r| r.entity).unwrap_or(EntityKind::Company);

        let input = FrameInput {
            normalized_question: &normalized,
            annotation: &annotation,
            date: extracted.as_ref(),
            entity_kind,
        };
        let built = self
            .builder
            .build(&input, &self.resources.synonyms, &self.resources.gazetteer);
        stages.push(Stage::FrameBuilt);
        tracing::debug!(trace_id = %trace_id, metric = ?built.metric, entity = ?built.entity, "Placeholders montados");

        let missing: Vec<PlaceholderKey> = required
            .iter()
            .copied()
            .filter(|key| !built.placeholders.contains_key(key))
            .collect();
        if !missing.is_empty() {
            let reason = match &built.entity {
                EntityOutcome::InstrumentUnavailable { label, probed } if missing.contains(&PlaceholderKey::Entity) => {
                    Some(format!(
                        "nenhum ticker derivável de '{}' (testados: {})",
                        label,
                        probed.join(", ")
                    ))
                }
                _ => None,
            };
            return Err(PipelineFailure::Unresolved {
                template_id,
                missing,
                reason,
            });
        }
        stages.push(Stage::Validated);
        stages.push(Stage::Succeeded);

        let entity_source = match &built.entity {
            EntityOutcome::Resolved { source, .. } => Some(source.clone()),
            _ => None,
        };
        let found = built.placeholders.keys().copied().collect();

        Ok(SemanticFrame {
            template_id,
            placeholders: built.placeholders,
            debug_info: DebugTrace {
                trace_id,
                question: question.to_string(),
                normalized_question: normalized,
                annotation,
                extracted_date: extracted.map(|d| d.iso()),
                template_score: score,
                required,
                found,
                entity_source,
                degradations: built.degradations,
                stages,
            },
        })
    }

    /// Processa várias perguntas em paralelo, preservando a ordem de entrada.
    pub fn run_batch(&self, questions: &[String]) -> Vec<Result<SemanticFrame, PipelineFailure>> {
        tracing::info!(count = questions.len(), "Processando lote");
        questions.par_iter().map(|q| self.run(q)).collect()
    }
}
