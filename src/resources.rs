//! # Recursos — Carregamento dos Dicionários
//!
//! Carrega, uma única vez na inicialização, os três arquivos que o pipeline
//! consulta:
//!
//! | Recurso | Arquivo padrão | Formato |
//! |---------|----------------|---------|
//! | Sinônimos | `resultado_similaridade.txt` | `chave = [('sinônimo', peso), ...]` |
//! | Corpus | `perguntas_de_interesse.txt` | `Template 1A - pergunta` |
//! | Gazetteer | `empresa_nome_map.json` | `{"CHAVE": "VALOR"}` |
//!
//! ## Codificação
//!
//! Arquivos são lidos como UTF-8; se não forem UTF-8 válido, são decodificados
//! como Latin-1 (planilhas exportadas no Windows). O BOM é removido.
//!
//! ## Falhas
//!
//! Qualquer falha aqui é [`ConfigError`] e aborta a inicialização: o
//! pipeline nunca roda com configuração parcial. Depois de carregados, os
//! recursos são somente leitura e compartilhados via `Arc`.

use std::path::Path;

use serde::Serialize;

use crate::config::Settings;
use crate::error::ConfigError;
use crate::nlu::gazetteer::Gazetteer;
use crate::nlu::matcher::ExemplarCorpus;
use crate::nlu::synonyms::SynonymDictionary;

const BOM: char = '\u{FEFF}';

/// Dicionários carregados, imutáveis.
#[derive(Debug)]
pub struct Resources {
    pub synonyms: SynonymDictionary,
    pub corpus: ExemplarCorpus,
    pub gazetteer: Gazetteer,
}

/// Resumo para `/status` e para o subcomando `check`.
#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSummary {
    pub synonym_keys: usize,
    pub exemplars: usize,
    pub gazetteer_entries: usize,
}

impl Resources {
    /// Localiza e carrega os três recursos.
    ///
    /// # Erros
    ///
    /// [`ConfigError`] se algum arquivo faltar, não puder ser lido, ou se
    /// o corpus não tiver nenhum exemplo válido ou o gazetteer for JSON
    /// inválido.
    pub fn load(settings: &Settings) -> Result<Self, ConfigError> {
        settings.validate()?;

        let synonyms_path = settings.locate(&settings.synonyms_file)?;
        let corpus_path = settings.locate(&settings.corpus_file)?;
        let gazetteer_path = settings.locate(&settings.gazetteer_file)?;

        let synonyms = SynonymDictionary::parse(
            &read_text(&synonyms_path)?,
            &synonyms_path.display().to_string(),
        );

        let corpus = ExemplarCorpus::parse(&read_text(&corpus_path)?, &corpus_path.display().to_string());
        if corpus.is_empty() {
            return Err(ConfigError::Invalid {
                path: corpus_path,
                reason: "nenhum exemplo válido no corpus".to_string(),
            });
        }

        let gazetteer = Gazetteer::from_json(&read_text(&gazetteer_path)?).map_err(|err| {
            ConfigError::Invalid {
                path: gazetteer_path.clone(),
                reason: err.to_string(),
            }
        })?;
        if gazetteer.is_empty() {
            tracing::warn!(path = %gazetteer_path.display(), "Gazetteer vazio: entidades só serão resolvidas por texto bruto");
        } else {
            tracing::info!(path = %gazetteer_path.display(), entries = gazetteer.len(), "Gazetteer carregado");
        }

        Ok(Self {
            synonyms,
            corpus,
            gazetteer,
        })
    }

    pub fn summary(&self) -> ResourceSummary {
        ResourceSummary {
            synonym_keys: self.synonyms.len(),
            exemplars: self.corpus.len(),
            gazetteer_entries: self.gazetteer.len(),
        }
    }
}

/// Lê um arquivo de texto: UTF-8, senão Latin-1; remove o BOM.
pub fn read_text(path: &Path) -> Result<String, ConfigError> {
    let bytes = std::fs::read(path).map_err(|source| ConfigError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;
    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => {
            tracing::warn!(path = %path.display(), "Arquivo não é UTF-8, decodificando como Latin-1");
            decode_latin1(err.as_bytes())
        }
    };
    Ok(text.strip_prefix(BOM).map(str::to_string).unwrap_or(text))
}

/// Latin-1 mapeia cada byte ao code point de mesmo valor.
fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn loads_bundled_resources() {
        let settings = Settings::with_resources_dir(Path::new(env!("CARGO_MANIFEST_DIR")).join("resources"));
        let resources = Resources::load(&settings).unwrap();
        let summary = resources.summary();
        assert!(summary.synonym_keys >= 5);
        assert!(summary.exemplars >= 4);
        assert!(summary.gazetteer_entries >= 5);
        assert!(resources.synonyms.contains_key("preco_fechamento"));
    }

    #[test]
    fn latin1_fallback_and_bom() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("s.txt");
        // "preço" em Latin-1
        std::fs::write(&path, b"pre\xe7o").unwrap();
        assert_eq!(read_text(&path).unwrap(), "preço");

        std::fs::write(&path, "\u{FEFF}abc".as_bytes()).unwrap();
        assert_eq!(read_text(&path).unwrap(), "abc");
    }

    #[test]
    fn missing_resource_is_config_error() {
        let dir = TempDir::new().unwrap();
        let err = Resources::load(&Settings::with_resources_dir(dir.path())).unwrap_err();
        assert!(matches!(err, ConfigError::Missing { .. }));
    }

    #[test]
    fn empty_corpus_is_config_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("resultado_similaridade.txt"), "preco_fechamento = [('fechamento', 0.9)]").unwrap();
        std::fs::write(dir.path().join("perguntas_de_interesse.txt"), "# nada aqui\nlinha ruim\n").unwrap();
        std::fs::write(dir.path().join("empresa_nome_map.json"), "{}").unwrap();

        let err = Resources::load(&Settings::with_resources_dir(dir.path())).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn invalid_gazetteer_is_config_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("resultado_similaridade.txt"), "").unwrap();
        std::fs::write(dir.path().join("perguntas_de_interesse.txt"), "Template 1A - qual o preço").unwrap();
        std::fs::write(dir.path().join("empresa_nome_map.json"), r#"{"VALE": 3}"#).unwrap();

        let err = Resources::load(&Settings::with_resources_dir(dir.path())).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn empty_gazetteer_still_loads() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("resultado_similaridade.txt"), "preco_fechamento = [('fechamento', 0.9)]").unwrap();
        std::fs::write(dir.path().join("perguntas_de_interesse.txt"), "Template 1A - qual o preço").unwrap();
        std::fs::write(dir.path().join("empresa_nome_map.json"), "{}").unwrap();

        let resources = Resources::load(&Settings::with_resources_dir(dir.path())).unwrap();
        assert!(resources.gazetteer.is_empty());
        assert_eq!(resources.summary().gazetteer_entries, 0);
    }
}
