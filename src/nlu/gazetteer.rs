//! # Gazetteer de Empresas
//!
//! Resolve a menção a uma empresa ("Vale", "Petrobras S.A.", "ITUB4") para
//! um identificador canônico.
//!
//! ## Rótulo vs Instrumento
//!
//! Cada valor do mapa é classificado em:
//!
//! | Valor | Classe | Saída |
//! |-------|--------|-------|
//! | `"VALE_LABEL"` (sufixo `_LABEL`) | rótulo | `VALE` |
//! | `"VALE3"` (formato de ticker) | instrumento | `VALE3` |
//! | `"VALE"` (qualquer outro) | rótulo | `VALE` |
//!
//! ## Política de Resolução
//!
//! ```text
//! candidatos (já ordenados por prioridade NER)
//!   └── para cada candidato:
//!       ├── 1. chave exata (maiúsculas)       → achou? para aqui
//!       └── 2. chave normalizada (sem S.A.…)  → achou? para aqui
//!
//! rótulo + template que exige ticker:
//!   ├── a chave casada tem formato de ticker → ela é o instrumento
//!   └── senão testa BASE+3, BASE+4, BASE+5, BASE+6, BASE+11
//!       (BASE = rótulo normalizado, depois a chave casada)
//! ```
//!
//! Toda chave também é indexada pela sua forma normalizada, de modo que
//! "Itaú Unibanco S.A." encontra a entrada `"ITAU UNIBANCO"`.
//!
//! O primeiro candidato com acerto encerra a busca, mesmo que a derivação
//! de ticker falhe depois.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::normalizer::normalize_key;
use crate::core::templates::EntityKind;
use crate::nlu::annotator::NamedEntity;

/// Prioridade dos rótulos NER; rótulos fora da lista vêm depois.
const NER_PRIORITY: &[&str] = &[
    "ORG", "PRODUCT", "WORK_OF_ART", "GPE", "LOC", "PER", "PERSON", "MISC",
];

const LABEL_SUFFIX: &str = "_LABEL";

/// Sufixos de classe testados na derivação de ticker, em ordem.
const ORDINARY_SUFFIXES: &[&str] = &["3"];
const PREFERRED_SUFFIXES: &[&str] = &["4", "5", "6"];
const UNIT_SUFFIXES: &[&str] = &["11"];

static TICKER_SHAPE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z0-9]{4}[0-9]{1,2}$").unwrap());

/// Conteúdo do gazetteer estruturalmente inválido.
#[derive(Debug, Error)]
pub enum GazetteerError {
    #[error("JSON inválido: {0}")]
    Json(#[from] serde_json::Error),

    #[error("o gazetteer deve ser um objeto JSON")]
    NotAnObject,

    #[error("lista vazia ou não textual na chave '{key}'")]
    EmptyList { key: String },

    #[error("valor de tipo inesperado na chave '{key}': {found}")]
    UnexpectedValue { key: String, found: String },
}

/// Classe da ação mencionada na pergunta.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ShareClass {
    /// Ordinária (`ON`).
    Ordinary,
    /// Preferencial (`PN`).
    Preferred,
}

impl ShareClass {
    pub fn code(&self) -> &'static str {
        match self {
            ShareClass::Ordinary => "ON",
            ShareClass::Preferred => "PN",
        }
    }

    fn suffixes(&self) -> &'static [&'static str] {
        match self {
            ShareClass::Ordinary => ORDINARY_SUFFIXES,
            ShareClass::Preferred => PREFERRED_SUFFIXES,
        }
    }
}

/// Valor canônico classificado.
#[derive(Clone, Debug, PartialEq)]
pub enum CanonicalValue {
    Instrument(String),
    Label(String),
}

impl CanonicalValue {
    pub fn classify(raw: &str) -> Self {
        let trimmed = raw.trim();
        let cut = trimmed.len().saturating_sub(LABEL_SUFFIX.len());
        if trimmed.is_char_boundary(cut) && trimmed[cut..].eq_ignore_ascii_case(LABEL_SUFFIX) {
            return CanonicalValue::Label(trimmed[..cut].to_string());
        }
        let upper = trimmed.to_uppercase();
        if TICKER_SHAPE_RE.is_match(&upper) {
            CanonicalValue::Instrument(upper)
        } else {
            CanonicalValue::Label(trimmed.to_string())
        }
    }
}

/// Como a entidade foi casada com o gazetteer.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchVia {
    Exact,
    Normalized,
    DerivedInstrument,
}

/// Origem de um `ENTITY` resolvido, para o trace de depuração.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitySource {
    pub entity: String,
    pub label: String,
    pub matched_key: String,
    pub via: MatchVia,
}

/// Resultado da resolução de entidade.
#[derive(Clone, Debug, PartialEq)]
pub enum EntityOutcome {
    Resolved { value: String, source: EntitySource },
    /// Nenhum candidato casou; o texto do primeiro candidato é o fallback.
    RawText { text: String },
    /// O candidato casou com um rótulo, mas nenhum ticker pôde ser derivado.
    InstrumentUnavailable { label: String, probed: Vec<String> },
    NotFound,
}

/// Mapa chave → valor canônico, com chaves em maiúsculas.
#[derive(Debug, Default)]
pub struct Gazetteer {
    entries: HashMap<String, String>,
    /// `normalize_key(chave)` → chave original, quando diferem.
    normalized: HashMap<String, String>,
}

impl Gazetteer {
    /// Interpreta o JSON do gazetteer.
    ///
    /// Cada valor é uma string ou uma lista cujo primeiro elemento é o
    /// identificador autoritativo. Qualquer outra forma é erro estrutural.
    pub fn from_json(content: &str) -> Result<Self, GazetteerError> {
        let Value::Object(map) = serde_json::from_str::<Value>(content)? else {
            return Err(GazetteerError::NotAnObject);
        };

        let mut entries = HashMap::with_capacity(map.len());
        for (key, value) in map {
            let canonical = match &value {
                Value::String(s) => s.clone(),
                Value::Array(items) => match items.first() {
                    Some(Value::String(s)) => s.clone(),
                    _ => return Err(GazetteerError::EmptyList { key }),
                },
                other => {
                    return Err(GazetteerError::UnexpectedValue {
                        found: other.to_string(),
                        key,
                    })
                }
            };
            let key = key.trim().to_uppercase();
            if key.is_empty() || canonical.trim().is_empty() {
                tracing::warn!(key = %key, "Entrada vazia no gazetteer, ignorada");
                continue;
            }
            entries.insert(key, canonical.trim().to_string());
        }
        Ok(Self::with_entries(entries))
    }

    #[cfg(test)]
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        Self::with_entries(
            pairs
                .iter()
                .map(|(k, v)| (k.to_uppercase(), v.to_string()))
                .collect(),
        )
    }

    /// Indexa a forma normalizada de cada chave. Uma chave literal tem
    /// precedência sobre um alias normalizado igual a ela; entre aliases
    /// que colidem, vence a menor chave original.
    fn with_entries(entries: HashMap<String, String>) -> Self {
        let mut keys: Vec<&String> = entries.keys().collect();
        keys.sort();

        let mut normalized = HashMap::new();
        for key in keys {
            let Some(alias) = normalize_key(key) else {
                continue;
            };
            if alias != *key && !entries.contains_key(&alias) {
                normalized.entry(alias).or_insert_with(|| key.clone());
            }
        }
        Self { entries, normalized }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn lookup(&self, key: &str) -> Option<CanonicalValue> {
        self.entries.get(key).map(|raw| CanonicalValue::classify(raw))
    }

    /// Busca pela chave normalizada; devolve a chave original casada.
    fn lookup_normalized(&self, key: &str) -> Option<(String, CanonicalValue)> {
        let original = match self.normalized.get(key) {
            Some(original) => original.as_str(),
            None => key,
        };
        self.lookup(original).map(|value| (original.to_string(), value))
    }

    /// Resolve candidatos já ordenados por prioridade (ver [`rank_entities`]).
    ///
    /// `share_class`, quando presente, restringe os sufixos testados na
    /// derivação de ticker.
    pub fn resolve(
        &self,
        candidates: &[NamedEntity],
        wanted: EntityKind,
        share_class: Option<ShareClass>,
    ) -> EntityOutcome {
        let mut first_text: Option<String> = None;

        for candidate in candidates {
            let text = clean_entity_text(&candidate.text);
            if text.is_empty() || text.chars().all(|c| c.is_ascii_digit()) {
                continue;
            }
            first_text.get_or_insert_with(|| text.to_string());

            let exact = text.to_uppercase();
            let hit = match self.lookup(&exact) {
                Some(value) => Some((exact, value, MatchVia::Exact)),
                None => normalize_key(text)
                    .and_then(|key| self.lookup_normalized(&key))
                    .map(|(key, value)| (key, value, MatchVia::Normalized)),
            };
            let Some((matched_key, value, via)) = hit else {
                tracing::debug!(entity = %text, label = %candidate.label, "Entidade sem correspondência no gazetteer");
                continue;
            };

            let source = EntitySource {
                entity: text.to_string(),
                label: candidate.label.clone(),
                matched_key,
                via,
            };
            return match value {
                CanonicalValue::Instrument(ticker) => {
                    tracing::info!(entity = %text, ticker = %ticker, "Entidade resolvida para ticker");
                    EntityOutcome::Resolved { value: ticker, source }
                }
                CanonicalValue::Label(label) if wanted == EntityKind::Instrument => {
                    // Mapas "PETR4" → "PETROBRAS": a própria chave é o ticker
                    if TICKER_SHAPE_RE.is_match(&source.matched_key) {
                        tracing::info!(entity = %text, ticker = %source.matched_key, label = %label, "Chave do gazetteer usada como ticker");
                        let ticker = source.matched_key.clone();
                        return EntityOutcome::Resolved { value: ticker, source };
                    }
                    self.derive_instrument(&label, source, share_class)
                }
                CanonicalValue::Label(label) => {
                    tracing::info!(entity = %text, label = %label, "Entidade resolvida para rótulo");
                    EntityOutcome::Resolved { value: label, source }
                }
            };
        }

        match first_text {
            Some(text) => {
                tracing::warn!(entity = %text, "Nenhuma entidade resolvida, usando texto bruto");
                EntityOutcome::RawText { text }
            }
            None => EntityOutcome::NotFound,
        }
    }

    /// Testa sufixos de classe sobre o rótulo normalizado e a chave casada.
    fn derive_instrument(
        &self,
        label: &str,
        source: EntitySource,
        share_class: Option<ShareClass>,
    ) -> EntityOutcome {
        let suffixes: Vec<&str> = match share_class {
            Some(class) => class.suffixes().to_vec(),
            None => ORDINARY_SUFFIXES
                .iter()
                .chain(PREFERRED_SUFFIXES)
                .chain(UNIT_SUFFIXES)
                .copied()
                .collect(),
        };

        let mut bases: Vec<String> = Vec::new();
        for base in [normalize_key(label), normalize_key(&source.matched_key)]
            .into_iter()
            .flatten()
        {
            if !bases.contains(&base) {
                bases.push(base);
            }
        }

        let mut probed = Vec::new();
        for base in &bases {
            for suffix in &suffixes {
                let key = format!("{base}{suffix}");
                if let Some(CanonicalValue::Instrument(ticker)) = self.lookup(&key) {
                    tracing::info!(label = %label, ticker = %ticker, "Ticker derivado do rótulo");
                    return EntityOutcome::Resolved {
                        value: ticker,
                        source: EntitySource {
                            via: MatchVia::DerivedInstrument,
                            matched_key: key,
                            ..source
                        },
                    };
                }
                probed.push(key);
            }
        }

        tracing::error!(label = %label, probed = ?probed, "Nenhum ticker derivável do rótulo");
        EntityOutcome::InstrumentUnavailable {
            label: label.to_string(),
            probed,
        }
    }
}

/// Ordena entidades pela prioridade do rótulo NER, preservando a ordem de
/// aparição dentro do mesmo rótulo.
pub fn rank_entities(entities: &[NamedEntity]) -> Vec<NamedEntity> {
    let mut ranked = entities.to_vec();
    ranked.sort_by_key(|e| {
        NER_PRIORITY
            .iter()
            .position(|p| p.eq_ignore_ascii_case(&e.label))
            .unwrap_or(NER_PRIORITY.len())
    });
    ranked
}

fn clean_entity_text(text: &str) -> &str {
    text.trim().trim_matches(['?', '.', '!', ',', ';']).trim()
}
