//! # Frame Semântico
//!
//! O [`SemanticFrame`] é o contrato entre a compreensão de perguntas e o
//! gerador de consultas SPARQL: um id de template mais um mapa de
//! placeholders preenchidos.
//!
//! ```json
//! {
//!   "templateId": "Template 1A",
//!   "placeholders": { "ENTITY": "VALE3", "DATE": "2024-03-05", "DESIRED_VALUE": "preco_fechamento" },
//!   "debugInfo": { ... }
//! }
//! ```
//!
//! `debugInfo` é apenas diagnóstico; nenhum consumidor deve depender dele.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use uuid::Uuid;

use crate::error::Degradation;
use crate::nlu::annotator::Annotation;
use crate::nlu::gazetteer::EntitySource;
use crate::orchestrator::Stage;

/// Conjunto fechado de placeholders.
///
/// A ordem das variantes define a ordem de serialização do mapa.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlaceholderKey {
    Entity,
    Date,
    DesiredValue,
    ShareClass,
    Sector,
}

impl PlaceholderKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaceholderKey::Entity => "ENTITY",
            PlaceholderKey::Date => "DATE",
            PlaceholderKey::DesiredValue => "DESIRED_VALUE",
            PlaceholderKey::ShareClass => "SHARE_CLASS",
            PlaceholderKey::Sector => "SECTOR",
        }
    }
}

impl fmt::Display for PlaceholderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mapa placeholder → valor canônico.
pub type Placeholders = BTreeMap<PlaceholderKey, String>;

/// Registro de diagnóstico de uma execução bem-sucedida.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugTrace {
    pub trace_id: Uuid,
    pub question: String,
    pub normalized_question: String,
    pub annotation: Annotation,
    pub extracted_date: Option<String>,
    pub template_score: f64,
    pub required: Vec<PlaceholderKey>,
    pub found: Vec<PlaceholderKey>,
    /// Como o `ENTITY` foi obtido (chave exata, normalizada, derivada).
    pub entity_source: Option<EntitySource>,
    pub degradations: Vec<Degradation>,
    pub stages: Vec<Stage>,
}

/// Resultado de sucesso do pipeline. Imutável depois de construído.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SemanticFrame {
    pub template_id: String,
    pub placeholders: Placeholders,
    pub debug_info: DebugTrace,
}

impl SemanticFrame {
    pub fn get(&self, key: PlaceholderKey) -> Option<&str> {
        self.placeholders.get(&key).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_keys_serialize_as_upper_snake() {
        let mut map = Placeholders::new();
        map.insert(PlaceholderKey::DesiredValue, "preco_fechamento".into());
        map.insert(PlaceholderKey::Entity, "VALE3".into());

        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"ENTITY":"VALE3","DESIRED_VALUE":"preco_fechamento"}"#);
    }

    #[test]
    fn display_matches_wire_name() {
        assert_eq!(PlaceholderKey::ShareClass.to_string(), "SHARE_CLASS");
    }
}
