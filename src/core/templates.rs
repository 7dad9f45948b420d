//! # Requisitos por Template
//!
//! Tabela estática de quais placeholders cada template exige e que tipo de
//! entidade ele espera:
//!
//! | Template | Obrigatórios | Entidade |
//! |----------|--------------|----------|
//! | `Template 1A` | ENTITY, DATE, DESIRED_VALUE | ticker (instrumento) |
//! | `Template 1B` | ENTITY, DATE, DESIRED_VALUE | ticker (instrumento) |
//! | `Template 2A` | ENTITY, DESIRED_VALUE | empresa (rótulo) |
//! | `Template 3A` | SECTOR, DESIRED_VALUE | — |
//!
//! Templates fora da tabela não exigem nada.

use super::frame::PlaceholderKey;

/// Que tipo de identificador o template espera em `ENTITY`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityKind {
    /// Código de negociação (ex.: `VALE3`).
    Instrument,
    /// Identidade da empresa (rótulo).
    Company,
    /// O template não usa entidade.
    NotUsed,
}

#[derive(Debug, PartialEq)]
pub struct TemplateRequirement {
    pub template_id: &'static str,
    pub required: &'static [PlaceholderKey],
    pub entity: EntityKind,
}

const REQUIREMENTS: &[TemplateRequirement] = &[
    TemplateRequirement {
        template_id: "Template 1A",
        required: &[PlaceholderKey::Entity, PlaceholderKey::Date, PlaceholderKey::DesiredValue],
        entity: EntityKind::Instrument,
    },
    TemplateRequirement {
        template_id: "Template 1B",
        required: &[PlaceholderKey::Entity, PlaceholderKey::Date, PlaceholderKey::DesiredValue],
        entity: EntityKind::Instrument,
    },
    TemplateRequirement {
        template_id: "Template 2A",
        required: &[PlaceholderKey::Entity, PlaceholderKey::DesiredValue],
        entity: EntityKind::Company,
    },
    TemplateRequirement {
        template_id: "Template 3A",
        required: &[PlaceholderKey::Sector, PlaceholderKey::DesiredValue],
        entity: EntityKind::NotUsed,
    },
];

/// Busca os requisitos de um template, ignorando caixa e espaços extras.
pub fn requirements_for(template_id: &str) -> Option<&'static TemplateRequirement> {
    let wanted = template_id.split_whitespace().collect::<Vec<_>>().join(" ");
    REQUIREMENTS
        .iter()
        .find(|req| req.template_id.eq_ignore_ascii_case(&wanted))
}
