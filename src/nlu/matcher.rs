//! # Seletor de Template (Intenção da Pergunta)
//!
//! Compara a pergunta com um corpus de perguntas-exemplo e escolhe o
//! template do exemplo mais parecido.
//!
//! ## Formato do Corpus
//!
//! ```text
//! Template 1A - Qual foi o preço de fechamento da #ENTIDADE# em #DATA#?
//! Template 2A;Qual o código de negociação da #ENTIDADE#?
//! ```
//!
//! O delimitador ` - ` tem precedência; sem ele, usa-se `;`. Linhas sem
//! nenhum dos dois são ignoradas com aviso.
//!
//! ## Estratégia
//!
//! ```text
//! pergunta normalizada
//!   └── para cada exemplo (já normalizado no carregamento):
//!       └── score = ratio(pergunta, exemplo)
//!           → guarda o máximo (estritamente maior: o primeiro vence empates)
//! máximo ≥ limiar (0.65)?  sim → template do exemplo
//!                          não → "pergunta não compreendida"
//! ```

use serde::Serialize;

use crate::core::normalizer::normalize;
use crate::core::similarity::ratio;

/// Limiar padrão de similaridade para aceitar um template.
pub const DEFAULT_TEMPLATE_THRESHOLD: f64 = 0.65;

/// Uma pergunta-exemplo do corpus.
#[derive(Clone, Debug, PartialEq)]
pub struct Exemplar {
    pub template_id: String,
    pub question: String,
    normalized: String,
}

/// Corpus ordenado de exemplos.
#[derive(Debug, Default)]
pub struct ExemplarCorpus {
    exemplars: Vec<Exemplar>,
}

impl ExemplarCorpus {
    pub fn parse(content: &str, source: &str) -> Self {
        let mut exemplars = Vec::new();
        for (line_no, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((template_id, question)) = split_exemplar(line) else {
                tracing::warn!(source, line = line_no + 1, content = line, "Linha do corpus sem delimitador, ignorada");
                continue;
            };
            let (template_id, question) = (template_id.trim(), question.trim());
            let normalized = normalize(question);
            if template_id.is_empty() || normalized.is_empty() {
                tracing::warn!(source, line = line_no + 1, "Linha do corpus incompleta, ignorada");
                continue;
            }
            exemplars.push(Exemplar {
                template_id: template_id.to_string(),
                question: question.to_string(),
                normalized,
            });
        }
        tracing::info!(source, exemplars = exemplars.len(), "Corpus de exemplos carregado");
        Self { exemplars }
    }

    pub fn len(&self) -> usize {
        self.exemplars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exemplars.is_empty()
    }

    pub fn exemplars(&self) -> &[Exemplar] {
        &self.exemplars
    }
}

/// Separa `id - pergunta` ou `id;pergunta` no delimitador que vier primeiro.
fn split_exemplar(line: &str) -> Option<(&str, &str)> {
    let dash = line.find(" - ").map(|at| (at, " - ".len()));
    let semicolon = line.find(';').map(|at| (at, 1));
    let (at, width) = [dash, semicolon].into_iter().flatten().min_by_key(|(at, _)| *at)?;
    Some((&line[..at], &line[at + width..]))
}

/// Resultado da seleção de template.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TemplateMatch {
    Selected {
        template_id: String,
        score: f64,
        exemplar: String,
    },
    NotUnderstood {
        best_score: f64,
    },
}

/// Seletor de template por similaridade de strings.
pub struct TemplateMatcher {
    threshold: f64,
}

impl TemplateMatcher {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// Seleciona o template para uma pergunta já normalizada.
    pub fn select(&self, normalized_question: &str, corpus: &ExemplarCorpus) -> TemplateMatch {
        let mut best: Option<&Exemplar> = None;
        let mut best_score = 0.0;

        for exemplar in corpus.exemplars() {
            let score = ratio(normalized_question, &exemplar.normalized);
            tracing::debug!(template = %exemplar.template_id, score, "Comparando exemplo");
            if best.is_none() || score > best_score {
                best_score = score;
                best = Some(exemplar);
            }
        }

        match best {
            Some(exemplar) if best_score >= self.threshold => {
                tracing::info!(template = %exemplar.template_id, score = best_score, "Template selecionado");
                TemplateMatch::Selected {
                    template_id: exemplar.template_id.clone(),
                    score: best_score,
                    exemplar: exemplar.question.clone(),
                }
            }
            _ => {
                tracing::warn!(best_score, threshold = self.threshold, "Nenhum template acima do limiar");
                TemplateMatch::NotUnderstood { best_score }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CORPUS: &str = "\
Template 1A - Qual foi o preço de fechamento da #ENTIDADE# em #DATA#?
Template 2A;Qual o código de negociação da empresa #ENTIDADE#?
linha quebrada sem delimitador
Template 3A - Qual a ação do setor #SETOR# com maior volume?
";

    fn corpus() -> ExemplarCorpus {
        ExemplarCorpus::parse(CORPUS, "test")
    }

    #[test]
    fn parses_both_delimiters_and_skips_bad_lines() {
        let c = corpus();
        assert_eq!(c.len(), 3);
        assert_eq!(c.exemplars()[1].template_id, "Template 2A");
        assert_eq!(c.exemplars()[1].question, "Qual o código de negociação da empresa #ENTIDADE#?");
    }

    #[test]
    fn dash_delimiter_takes_precedence_over_semicolon() {
        let c = ExemplarCorpus::parse("Template 1A - preço; fechamento", "test");
        assert_eq!(c.exemplars()[0].template_id, "Template 1A");
        assert_eq!(c.exemplars()[0].question, "preço; fechamento");
    }

    #[test]
    fn earliest_delimiter_wins() {
        let c = ExemplarCorpus::parse("Template 2A;Qual o código - ticker da #ENTIDADE#?", "test");
        assert_eq!(c.exemplars()[0].template_id, "Template 2A");
        assert_eq!(c.exemplars()[0].question, "Qual o código - ticker da #ENTIDADE#?");
    }

    #[test]
    fn overlapping_question_selects_template() {
        let matcher = TemplateMatcher::new(DEFAULT_TEMPLATE_THRESHOLD);
        let q = normalize("Qual foi o preço de fechamento da VALE3 em 05/03/2024?");
        match matcher.select(&q, &corpus()) {
            TemplateMatch::Selected { template_id, score, .. } => {
                assert_eq!(template_id, "Template 1A");
                assert!(score >= DEFAULT_TEMPLATE_THRESHOLD, "score {score}");
            }
            other => panic!("expected Selected, got {other:?}"),
        }
    }

    #[test]
    fn unrelated_question_is_not_understood() {
        let matcher = TemplateMatcher::new(DEFAULT_TEMPLATE_THRESHOLD);
        let q = normalize("receita de bolo de cenoura");
        assert!(matches!(
            matcher.select(&q, &corpus()),
            TemplateMatch::NotUnderstood { best_score } if best_score < DEFAULT_TEMPLATE_THRESHOLD
        ));
    }

    #[test]
    fn ties_keep_first_exemplar() {
        let c = ExemplarCorpus::parse("T1 - mesma pergunta\nT2 - mesma pergunta", "test");
        let matcher = TemplateMatcher::new(0.5);
        assert!(matches!(
            matcher.select("mesma pergunta", &c),
            TemplateMatch::Selected { template_id, .. } if template_id == "T1"
        ));
    }

    #[test]
    fn empty_corpus_is_not_understood() {
        let matcher = TemplateMatcher::new(0.65);
        assert_eq!(
            matcher.select("qualquer", &ExemplarCorpus::default()),
            TemplateMatch::NotUnderstood { best_score: 0.0 }
        );
    }
}
