//! # Natural2SPARQL — Compreensão de Perguntas sobre Ações
//!
//! **Ponto de entrada** do pipeline que transforma uma pergunta em português
//! sobre o mercado de ações num *frame semântico*: o template de consulta
//! escolhido e os valores dos seus placeholders.
//!
//! ## Subcomandos
//!
//! ```text
//! natural2sparql ask <PERGUNTA...>   → um documento JSON no stdout; saída 0/1
//! natural2sparql batch <ARQUIVO>     → uma linha JSON por pergunta
//! natural2sparql serve               → servidor HTTP (Axum)
//! natural2sparql check               → resumo dos recursos carregados
//! ```
//!
//! ## Fluxo de Inicialização
//!
//! ```text
//! main()
//!   ├── Configura tracing (stderr)
//!   ├── Lê flags/variáveis de ambiente (clap)
//!   ├── Resources::load()    ── ConfigError → JSON de falha, saída 1
//!   ├── Escolhe o analisador (comando externo ou heurístico)
//!   └── Executa o subcomando
//! ```
//!
//! O stdout é reservado ao documento JSON; logs vão para o stderr.
//!
//! ```bash
//! RUST_LOG=debug natural2sparql ask "Qual foi o preço de fechamento da VALE3 em 05/03/2024?"
//! ```

/// Módulo `config` — flags e variáveis de ambiente.
mod config;

/// Módulo `core` — normalização, similaridade, frame e tabela de templates.
mod core;

/// Módulo `error` — erros de configuração e falhas do pipeline.
mod error;

/// Módulo `nlu` — componentes de compreensão da pergunta.
mod nlu;

/// Módulo `orchestrator` — máquina de estados do pipeline.
mod orchestrator;

/// Módulo `resources` — carga dos dicionários.
mod resources;

/// Módulo `web` — servidor HTTP.
mod web;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use crate::config::Settings;
use crate::error::FailureReport;
use crate::nlu::annotator::{Annotator, CommandAnnotator, HeuristicAnnotator};
use crate::nlu::date::SystemClock;
use crate::orchestrator::Orchestrator;
use crate::resources::Resources;
use crate::web::handlers::StatusResponse;
use crate::web::state::AppState;

#[derive(Parser, Debug)]
#[command(name = "natural2sparql", version, about = "Compreensão de perguntas sobre o mercado de ações")]
struct Cli {
    #[command(flatten)]
    settings: Settings,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Processa uma pergunta e imprime o frame (ou a falha) em JSON
    Ask {
        /// Palavras da pergunta, unidas por um espaço
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },

    /// Processa um arquivo com uma pergunta por linha
    Batch {
        /// Arquivo de perguntas (linhas vazias e iniciadas por `#` são ignoradas)
        file: PathBuf,
    },

    /// Inicia o servidor HTTP em `--bind-addr`
    Serve,

    /// Carrega os recursos e imprime um resumo
    Check,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let resources = match Resources::load(&cli.settings) {
        Ok(resources) => Arc::new(resources),
        Err(err) => {
            tracing::error!(error = %err, "Falha ao carregar recursos");
            print_json(&FailureReport::from(&err));
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(summary = ?resources.summary(), "Recursos carregados");

    match run(cli, resources) {
        Ok(code) => code,
        Err(err) => {
            tracing::error!(error = ?err, "Execução interrompida");
            print_json(&FailureReport::new("erro de execução", Some(format!("{err:#}"))));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli, resources: Arc<Resources>) -> Result<ExitCode> {
    let Cli { settings, command } = cli;

    let orchestrator = Orchestrator::new(
        resources,
        select_annotator(&settings),
        Arc::new(SystemClock),
        &settings,
    );

    match command {
        Command::Ask { question } => {
            let question = question.join(" ");
            Ok(match orchestrator.run(&question) {
                Ok(frame) => {
                    print_json(&frame);
                    ExitCode::SUCCESS
                }
                Err(failure) => {
                    print_json(&FailureReport::from(&failure));
                    ExitCode::FAILURE
                }
            })
        }
        Command::Batch { file } => run_batch(&orchestrator, &file),
        Command::Serve => {
            let bind_addr = settings.bind_addr.clone();
            let runtime = tokio::runtime::Runtime::new().context("falha ao criar o runtime tokio")?;
            runtime.block_on(serve(AppState::new(orchestrator, settings), &bind_addr))?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Check => {
            print_json(&StatusResponse::new(orchestrator.resources(), &settings));
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Analisador externo se configurado, senão o heurístico embutido.
fn select_annotator(settings: &Settings) -> Arc<dyn Annotator> {
    match settings.annotator_command.as_deref().and_then(CommandAnnotator::new) {
        Some(command) => {
            tracing::info!(command = ?settings.annotator_command, "Usando analisador externo");
            Arc::new(command)
        }
        None => Arc::new(HeuristicAnnotator::new()),
    }
}

fn run_batch(orchestrator: &Orchestrator, file: &Path) -> Result<ExitCode> {
    let content = resources::read_text(file)
        .with_context(|| format!("falha ao ler perguntas de {}", file.display()))?;
    let questions: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect();

    let results = orchestrator.run_batch(&questions);
    let failures = results.iter().filter(|r| r.is_err()).count();

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for result in &results {
        let line = match result {
            Ok(frame) => serde_json::to_string(frame),
            Err(failure) => serde_json::to_string(&FailureReport::from(failure)),
        }
        .context("falha ao serializar resultado")?;
        writeln!(out, "{line}").context("falha ao escrever no stdout")?;
    }

    tracing::info!(total = results.len(), failures, "Lote concluído");
    Ok(if failures == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn serve(state: AppState, bind_addr: &str) -> Result<()> {
    let app = web::create_router(state);
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("falha ao escutar em {bind_addr}"))?;
    tracing::info!("🚀 Servidor em http://{}", bind_addr);
    axum::serve(listener, app).await.context("servidor HTTP encerrou com erro")?;
    Ok(())
}

/// Imprime um documento JSON no stdout.
fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(err) => tracing::error!(error = %err, "Falha ao serializar JSON"),
    }
}
