//! # Estado da Aplicação Web
//!
//! Diferente de um chat com modelo carregado em background, aqui tudo o que
//! o servidor precisa já existe antes do `bind`: os recursos são carregados
//! (ou a inicialização falha) e o orquestrador é montado uma única vez.
//!
//! ```text
//! main()
//!   ├── Resources::load()  ── falha → processo encerra
//!   ├── Orchestrator::new()
//!   └── AppState { orchestrator, settings }
//!         ↓ clonado por requisição (só Arcs)
//!       handlers
//! ```

use std::sync::Arc;

use crate::config::Settings;
use crate::orchestrator::Orchestrator;

/// Estado compartilhado da aplicação Axum.
#[derive(Clone)]
pub struct AppState {
    /// Pipeline pronto; somente leitura, pode atender requisições em paralelo.
    pub orchestrator: Arc<Orchestrator>,
    /// Configuração efetiva, exposta em `/status`.
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(orchestrator: Orchestrator, settings: Settings) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            settings: Arc::new(settings),
        }
    }
}
