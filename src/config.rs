//! # Configuração
//!
//! Parâmetros do pipeline, lidos de flags de linha de comando ou variáveis
//! de ambiente (flags têm precedência):
//!
//! | Flag | Variável | Padrão |
//! |------|----------|--------|
//! | `--resources-dir` | `N2S_RESOURCES_DIR` | `resources` |
//! | `--synonyms-file` | `N2S_SYNONYMS_FILE` | `resultado_similaridade.txt` |
//! | `--corpus-file` | `N2S_CORPUS_FILE` | `perguntas_de_interesse.txt` |
//! | `--gazetteer-file` | `N2S_GAZETTEER_FILE` | `empresa_nome_map.json` |
//! | `--template-threshold` | `N2S_TEMPLATE_THRESHOLD` | `0.65` |
//! | `--synonym-threshold` | `N2S_SYNONYM_THRESHOLD` | `0.70` |
//! | `--strict-entities` | `N2S_STRICT_ENTITIES` | desligado |
//! | `--annotator-command` | `N2S_ANNOTATOR_COMMAND` | analisador heurístico |
//! | `--bind-addr` | `N2S_BIND_ADDR` | `0.0.0.0:3000` |
//!
//! Nomes de arquivo relativos são procurados primeiro em `resources_dir` e
//! depois no diretório corrente.

use std::path::{Path, PathBuf};

use clap::Args;

use crate::error::ConfigError;

#[derive(Args, Debug, Clone)]
pub struct Settings {
    /// Diretório dos arquivos de recurso
    #[arg(long, env = "N2S_RESOURCES_DIR", default_value = "resources", global = true)]
    pub resources_dir: PathBuf,

    /// Dicionário de sinônimos de métricas
    #[arg(long, env = "N2S_SYNONYMS_FILE", default_value = "resultado_similaridade.txt", global = true)]
    pub synonyms_file: PathBuf,

    /// Corpus de perguntas-exemplo por template
    #[arg(long, env = "N2S_CORPUS_FILE", default_value = "perguntas_de_interesse.txt", global = true)]
    pub corpus_file: PathBuf,

    /// Mapa JSON empresa/ticker → identificador canônico
    #[arg(long, env = "N2S_GAZETTEER_FILE", default_value = "empresa_nome_map.json", global = true)]
    pub gazetteer_file: PathBuf,

    /// Similaridade mínima para aceitar um template
    #[arg(long, env = "N2S_TEMPLATE_THRESHOLD", default_value_t = 0.65, global = true)]
    pub template_threshold: f64,

    /// Similaridade mínima para aceitar um sinônimo de métrica
    #[arg(long, env = "N2S_SYNONYM_THRESHOLD", default_value_t = 0.70, global = true)]
    pub synonym_threshold: f64,

    /// Não usa o texto bruto da entidade quando o gazetteer não a resolve
    #[arg(long, env = "N2S_STRICT_ENTITIES", global = true)]
    pub strict_entities: bool,

    /// Comando externo de análise linguística (recebe a pergunta como último argumento)
    #[arg(long, env = "N2S_ANNOTATOR_COMMAND", global = true)]
    pub annotator_command: Option<String>,

    /// Endereço de escuta do subcomando `serve`
    #[arg(long, env = "N2S_BIND_ADDR", default_value = "0.0.0.0:3000", global = true)]
    pub bind_addr: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            resources_dir: PathBuf::from("resources"),
            synonyms_file: PathBuf::from("resultado_similaridade.txt"),
            corpus_file: PathBuf::from("perguntas_de_interesse.txt"),
            gazetteer_file: PathBuf::from("empresa_nome_map.json"),
            template_threshold: 0.65,
            synonym_threshold: 0.70,
            strict_entities: false,
            annotator_command: None,
            bind_addr: "0.0.0.0:3000".to_string(),
        }
    }
}

impl Settings {
    /// Configuração padrão apontando para outro diretório de recursos.
    pub fn with_resources_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            resources_dir: dir.into(),
            ..Self::default()
        }
    }

    /// Limiares devem estar em `[0, 1]`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("template_threshold", self.template_threshold),
            ("synonym_threshold", self.synonym_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Threshold { name, value });
            }
        }
        Ok(())
    }

    /// Localiza um arquivo de recurso.
    pub fn locate(&self, file: &Path) -> Result<PathBuf, ConfigError> {
        if file.is_absolute() {
            return if file.is_file() {
                Ok(file.to_path_buf())
            } else {
                Err(ConfigError::Missing {
                    name: file.display().to_string(),
                    searched: vec![file.to_path_buf()],
                })
            };
        }

        let primary = self.resources_dir.join(file);
        if primary.is_file() {
            return Ok(primary);
        }
        if file.is_file() {
            tracing::warn!(
                file = %file.display(),
                resources_dir = %self.resources_dir.display(),
                "Recurso ausente no diretório de recursos, usando o diretório corrente"
            );
            return Ok(file.to_path_buf());
        }
        Err(ConfigError::Missing {
            name: file.display().to_string(),
            searched: vec![primary, file.to_path_buf()],
        })
    }
}
