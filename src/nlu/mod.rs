//! # NLU — Compreensão de Perguntas sobre o Mercado de Ações
//!
//! Componentes que transformam uma pergunta em português num mapa de
//! placeholders. Cada um é isolado e testável com dados de fixture; o
//! sequenciamento fica no [`crate::orchestrator`].
//!
//! ## Fluxo
//!
//! ```text
//! Pergunta
//!   ├── annotator     → entidades NER + tokens com dependências
//!   ├── date          → data explícita ou relativa
//!   ├── matcher       → template mais parecido no corpus
//!   └── frame_builder → placeholders
//!         ├── gazetteer → ENTITY
//!         └── synonyms  → DESIRED_VALUE
//! ```
//!
//! ## Sub-módulos
//!
//! | Módulo | Responsabilidade |
//! |--------|-----------------|
//! | [`annotator`] | Análise linguística (heurística ou processo externo) |
//! | [`synonyms`] | Dicionário de sinônimos de métricas |
//! | [`gazetteer`] | Resolução de empresas e tickers |
//! | [`date`] | Extração de datas com relógio injetável |
//! | [`matcher`] | Seleção de template por similaridade |
//! | [`frame_builder`] | Montagem dos placeholders |

/// Sub-módulo do analisador linguístico.
pub mod annotator;

/// Sub-módulo de extração de datas.
pub mod date;

/// Sub-módulo de montagem de placeholders.
pub mod frame_builder;

/// Sub-módulo do gazetteer de empresas.
pub mod gazetteer;

/// Sub-módulo de seleção de template.
pub mod matcher;

/// Sub-módulo do dicionário de sinônimos.
pub mod synonyms;
