//! # Módulo Core — Tipos e Funções Puras do Domínio
//!
//! Blocos sem estado usados por todo o pipeline:
//!
//! - [`normalizer`] — normalização de texto e de chaves do gazetteer
//! - [`similarity`] — razão Ratcliff/Obershelp entre strings
//! - [`frame`] — [`SemanticFrame`], [`PlaceholderKey`] e o trace de depuração
//! - [`templates`] — tabela de requisitos por template

/// Normalização de texto para comparação.
pub mod normalizer;

/// Similaridade de strings.
pub mod similarity;

/// Frame semântico e placeholders.
pub mod frame;

/// Requisitos de placeholders por template.
pub mod templates;
