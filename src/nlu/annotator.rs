//! # Analisador Linguístico
//!
//! O pipeline consome apenas dois produtos da análise linguística:
//!
//! - **Entidades nomeadas** (`texto`, `rótulo NER`) — candidatas a `ENTITY`
//! - **Tokens com dependências** — frases sujeito/objeto usadas como
//!   fallback na resolução de `DESIRED_VALUE`
//!
//! Esses produtos chegam pelo trait [`Annotator`]. Há duas implementações:
//!
//! | Implementação | Estratégia |
//! |---------------|------------|
//! | [`HeuristicAnnotator`] | Regex + heurísticas para PT-BR (padrão) |
//! | [`CommandAnnotator`] | Processo externo que imprime a anotação em JSON |
//!
//! ## Heurísticas do `HeuristicAnnotator`
//!
//! | Padrão | Rótulo | Exemplo |
//! |--------|--------|---------|
//! | Ticker `AAAA9` / `AAAA99` | `ORG` | `VALE3`, `TAEE11` |
//! | Sigla em maiúsculas | `ORG` | `PETROBRAS`, `CEMIG` |
//! | Sequência capitalizada | `MISC` | `Vale`, `Banco do Brasil` |
//!
//! A análise de dependências é rasa: o primeiro verbo vira `ROOT` e cada
//! sequência nominal contígua pendura-se nele como `nsubj` (antes do verbo)
//! ou `obj`/`obl` (depois dele).
//!
//! ```text
//! Qual  foi   o    preço  de   fechamento  da   VALE3  em   05/03/2024
//! PRON  AUX   DET  NOUN   ADP  NOUN        ADP  PROPN  ADP  NUM
//!       ROOT  det  obj    case nmod        case nmod   case nmod
//! ```

use std::collections::HashSet;
use std::process::Command;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Entidade nomeada reconhecida no texto.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NamedEntity {
    pub text: String,
    pub label: String,
}

impl NamedEntity {
    pub fn new(text: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            label: label.into(),
        }
    }
}

/// Token com informação morfossintática.
///
/// `head` é o índice do token pai; a raiz aponta para si mesma.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DependencyToken {
    pub text: String,
    pub lemma: String,
    pub pos: String,
    pub dep: String,
    pub head: usize,
}

/// Saída da análise linguística de uma pergunta.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    #[serde(default)]
    pub entities: Vec<NamedEntity>,
    #[serde(default)]
    pub tokens: Vec<DependencyToken>,
}

impl Annotation {
    /// Texto da subárvore de `index`, na ordem original dos tokens.
    pub fn subtree_text(&self, index: usize) -> String {
        let mut members = vec![false; self.tokens.len()];
        if index >= self.tokens.len() {
            return String::new();
        }
        members[index] = true;
        // Propaga até estabilizar; cabeças inválidas são ignoradas.
        let mut changed = true;
        while changed {
            changed = false;
            for (i, token) in self.tokens.iter().enumerate() {
                if !members[i] && token.head != i && members.get(token.head).copied().unwrap_or(false) {
                    members[i] = true;
                    changed = true;
                }
            }
        }
        self.tokens
            .iter()
            .zip(members)
            .filter_map(|(token, member)| member.then_some(token.text.as_str()))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Capacidade de análise linguística.
pub trait Annotator: Send + Sync {
    fn annotate(&self, text: &str) -> Annotation;
}

/// Palavras que nunca iniciam uma entidade capitalizada.
const LEADING_STOPWORDS: &[&str] = &[
    "qual", "quais", "quanto", "quantos", "quantas", "como", "onde", "quando", "que", "quem",
    "o", "a", "os", "as", "um", "uma", "me", "mostre", "informe", "diga", "de", "do", "da",
    "em", "no", "na", "para", "por", "e", "foi", "é", "era", "hoje", "ontem", "setor",
    "preço", "preco", "cotação", "cotacao", "volume", "valor",
];

/// Siglas em maiúsculas que não são empresas.
const NON_ENTITY_ACRONYMS: &[&str] = &["ON", "PN", "PNA", "PNB", "SA", "UNT", "B3", "HJ"];

const DETERMINERS: &[&str] = &["o", "a", "os", "as", "um", "uma", "uns", "umas"];

const ADPOSITIONS: &[&str] = &[
    "de", "do", "da", "dos", "das", "em", "no", "na", "nos", "nas", "para", "por", "pelo",
    "pela", "ao", "à", "aos", "às", "com", "sobre", "entre", "até",
];

const PRONOUNS: &[&str] = &[
    "qual", "quais", "quanto", "quantos", "quantas", "que", "quem", "me", "eu", "você",
];

const VERBS: &[&str] = &[
    "foi", "é", "era", "são", "eram", "foram", "está", "estava", "esteve", "será", "seria",
    "fechou", "abriu", "negociou", "negociada", "ficou", "custa", "custou", "teve", "tem",
    "tinha", "atingiu", "registrou", "mostre", "informe", "diga", "possui", "pertence",
];

/// Analisador heurístico para perguntas do mercado de ações em PT-BR.
pub struct HeuristicAnnotator {
    /// Códigos de negociação (`VALE3`, `TAEE11`).
    ticker_re: Regex,
    /// Palavras inteiramente em maiúsculas, com 2+ letras.
    acronym_re: Regex,
    /// Sequências capitalizadas, incluindo conectivos `de/do/da/dos/das`.
    capitalized_re: Regex,
    /// Tokens para a análise rasa (datas inteiras são um token só).
    token_re: Regex,
}

impl HeuristicAnnotator {
    pub fn new() -> Self {
        Self {
            ticker_re: Regex::new(r"\b[A-Za-z]{4}[0-9]{1,2}\b").unwrap(),
            acronym_re: Regex::new(r"\b[A-ZÁÀÂÃÉÊÍÓÔÕÚÇ]{2,}\b").unwrap(),
            capitalized_re: Regex::new(
                r"\b[A-ZÁÀÂÃÉÈÊÍÏÓÔÕÖÚÇ][a-záàâãéèêíïóôõöúçüñ]+(?:\s+(?:(?:de|do|da|dos|das)\s+)?[A-ZÁÀÂÃÉÈÊÍÏÓÔÕÖÚÇ][a-záàâãéèêíïóôõöúçüñ]+)*",
            )
            .unwrap(),
            token_re: Regex::new(r"[\p{L}\p{N}_]+(?:[/.\-][\p{L}\p{N}]+)*").unwrap(),
        }
    }

    fn entities(&self, text: &str) -> Vec<NamedEntity> {
        let mut found: Vec<(usize, NamedEntity)> = Vec::new();

        for m in self.ticker_re.find_iter(text) {
            if m.as_str().chars().take(4).all(|c| c.is_ascii_uppercase()) {
                found.push((m.start(), NamedEntity::new(m.as_str(), "ORG")));
            }
        }

        for m in self.acronym_re.find_iter(text) {
            if !NON_ENTITY_ACRONYMS.contains(&m.as_str()) {
                found.push((m.start(), NamedEntity::new(m.as_str(), "ORG")));
            }
        }

        for m in self.capitalized_re.find_iter(text) {
            // Remove interrogativos e palavras funcionais do início
            let words: Vec<&str> = m.as_str().split_whitespace().collect();
            let skip = words
                .iter()
                .take_while(|w| LEADING_STOPWORDS.contains(&w.to_lowercase().as_str()))
                .count();
            if skip == words.len() {
                continue;
            }
            let kept = &words[skip..];
            let offset = m.as_str().find(kept[0]).unwrap_or(0);
            found.push((m.start() + offset, NamedEntity::new(kept.join(" "), "MISC")));
        }

        found.sort_by_key(|(start, _)| *start);

        let mut seen = HashSet::new();
        found
            .into_iter()
            .filter_map(|(_, entity)| {
                let text = entity
                    .text
                    .trim_end_matches(['?', '.', '!', ',', ';'])
                    .trim()
                    .to_string();
                if text.is_empty() || text.chars().all(|c| c.is_ascii_digit()) {
                    return None;
                }
                seen.insert(text.to_lowercase())
                    .then(|| NamedEntity::new(text, entity.label))
            })
            .collect()
    }

    fn tokens(&self, text: &str) -> Vec<DependencyToken> {
        let words: Vec<&str> = self.token_re.find_iter(text).map(|m| m.as_str()).collect();
        let pos: Vec<&'static str> = words
            .iter()
            .enumerate()
            .map(|(i, w)| part_of_speech(w, i == 0, &self.ticker_re))
            .collect();

        let root = pos
            .iter()
            .position(|p| *p == "VERB" || *p == "AUX")
            .or_else(|| pos.iter().position(|p| *p == "NOUN" || *p == "PROPN"));

        let mut tokens: Vec<DependencyToken> = words
            .iter()
            .zip(&pos)
            .enumerate()
            .map(|(i, (w, p))| DependencyToken {
                text: (*w).to_string(),
                lemma: w.to_lowercase(),
                pos: (*p).to_string(),
                dep: "dep".to_string(),
                head: root.unwrap_or(i),
            })
            .collect();

        let Some(root) = root else {
            return tokens;
        };
        tokens[root].dep = "ROOT".to_string();
        tokens[root].head = root;

        // Cada sequência nominal contígua vira um sintagma com núcleo próprio
        let mut chunks_after_root = 0;
        let mut i = 0;
        while i < tokens.len() {
            if i == root || !is_nominal(&tokens[i].pos) {
                i += 1;
                continue;
            }
            let start = i;
            while i < tokens.len() && i != root && is_nominal(&tokens[i].pos) {
                i += 1;
            }
            let chunk = start..i;
            let Some(head) = chunk.clone().find(|&k| matches!(tokens[k].pos.as_str(), "NOUN" | "PROPN" | "NUM")) else {
                continue;
            };

            tokens[head].head = root;
            tokens[head].dep = if head < root {
                "nsubj".to_string()
            } else {
                chunks_after_root += 1;
                if chunks_after_root == 1 { "obj" } else { "obl" }.to_string()
            };
            for k in chunk {
                if k == head {
                    continue;
                }
                tokens[k].head = head;
                tokens[k].dep = match tokens[k].pos.as_str() {
                    "DET" => "det",
                    "ADP" => "case",
                    _ => "nmod",
                }
                .to_string();
            }
        }

        tokens
    }
}

impl Default for HeuristicAnnotator {
    fn default() -> Self {
        Self::new()
    }
}

impl Annotator for HeuristicAnnotator {
    fn annotate(&self, text: &str) -> Annotation {
        Annotation {
            entities: self.entities(text),
            tokens: self.tokens(text),
        }
    }
}

fn is_nominal(pos: &str) -> bool {
    matches!(pos, "DET" | "ADP" | "NOUN" | "PROPN" | "NUM")
}

fn part_of_speech(word: &str, sentence_start: bool, ticker_re: &Regex) -> &'static str {
    let lower = word.to_lowercase();
    if word.chars().all(|c| c.is_ascii_digit() || "/.-".contains(c)) {
        return "NUM";
    }
    if DETERMINERS.contains(&lower.as_str()) {
        return "DET";
    }
    if ADPOSITIONS.contains(&lower.as_str()) {
        return "ADP";
    }
    if PRONOUNS.contains(&lower.as_str()) {
        return "PRON";
    }
    if ticker_re.is_match(word) {
        return "PROPN";
    }
    let capitalized = word.chars().next().is_some_and(char::is_uppercase);
    if VERBS.contains(&lower.as_str()) && !(capitalized && !sentence_start) {
        return if matches!(lower.as_str(), "foi" | "é" | "era" | "são" | "eram" | "foram" | "está" | "estava" | "será" | "seria") {
            "AUX"
        } else {
            "VERB"
        };
    }
    if capitalized && !sentence_start {
        return "PROPN";
    }
    "NOUN"
}

/// Analisador externo: executa um comando com o texto como último argumento
/// e lê a anotação JSON da saída padrão.
///
/// Qualquer falha resulta em anotação vazia; entidades ausentes aparecem
/// depois como placeholders não resolvidos.
pub struct CommandAnnotator {
    program: String,
    args: Vec<String>,
}

impl CommandAnnotator {
    /// `command_line` é dividido em espaços: programa + argumentos fixos.
    pub fn new(command_line: &str) -> Option<Self> {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
        })
    }

    fn run(&self, text: &str) -> anyhow::Result<Annotation> {
        use anyhow::Context;

        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(text)
            .output()
            .with_context(|| format!("Falha ao executar analisador '{}'", self.program))?;
        if !output.status.success() {
            anyhow::bail!(
                "analisador terminou com {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        serde_json::from_slice(&output.stdout).context("Saída do analisador não é uma anotação JSON")
    }
}

impl Annotator for CommandAnnotator {
    fn annotate(&self, text: &str) -> Annotation {
        match self.run(text) {
            Ok(annotation) => annotation,
            Err(e) => {
                tracing::error!(error = %e, program = %self.program, "Falha no analisador externo");
                Annotation::default()
            }
        }
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    /// Analisador de teste com saída fixa.
    pub struct FixedAnnotator(pub Annotation);

    impl FixedAnnotator {
        pub fn with_entities(entities: &[(&str, &str)]) -> Self {
            Self(Annotation {
                entities: entities
                    .iter()
                    .map(|(text, label)| NamedEntity::new(*text, *label))
                    .collect(),
                tokens: Vec::new(),
            })
        }
    }

    impl Annotator for FixedAnnotator {
        fn annotate(&self, _text: &str) -> Annotation {
            self.0.clone()
        }
    }

    fn texts(entities: &[NamedEntity]) -> Vec<&str> {
        entities.iter().map(|e| e.text.as_str()).collect()
    }

    #[test]
    fn ticker_is_org() {
        let ann = HeuristicAnnotator::new().annotate("Qual foi o preço de fechamento da VALE3 em 05/03/2024?");
        assert_eq!(ann.entities, vec![NamedEntity::new("VALE3", "ORG")]);
    }

    #[test]
    fn capitalized_sequence_skips_interrogative() {
        let ann = HeuristicAnnotator::new().annotate("Qual o código de negociação do Banco do Brasil?");
        assert_eq!(texts(&ann.entities), vec!["Banco do Brasil"]);
        assert_eq!(ann.entities[0].label, "MISC");
    }

    #[test]
    fn acronyms_are_org_but_share_classes_are_not() {
        let ann = HeuristicAnnotator::new().annotate("preço da ação PN da PETROBRAS");
        assert_eq!(ann.entities, vec![NamedEntity::new("PETROBRAS", "ORG")]);
    }

    #[test]
    fn entities_are_deduplicated_in_order() {
        let ann = HeuristicAnnotator::new().annotate("Qual a cotação de Vale e ITUB4 ou Vale");
        assert_eq!(texts(&ann.entities), vec!["Vale", "ITUB4"]);
    }

    #[test]
    fn root_is_first_verb_and_chunks_hang_from_it() {
        let ann = HeuristicAnnotator::new().annotate("Qual foi o preço de fechamento da VALE3 em 05/03/2024?");
        let root = ann.tokens.iter().position(|t| t.dep == "ROOT").unwrap();
        assert_eq!(ann.tokens[root].text, "foi");

        let obj = ann.tokens.iter().position(|t| t.dep == "obj").unwrap();
        assert_eq!(ann.tokens[obj].text, "preço");
        assert_eq!(ann.tokens[obj].head, root);
        assert_eq!(
            ann.subtree_text(obj),
            "o preço de fechamento da VALE3 em 05/03/2024"
        );
    }

    #[test]
    fn subject_before_root() {
        let ann = HeuristicAnnotator::new().annotate("o volume da PETR4 foi quanto");
        let subj = ann.tokens.iter().position(|t| t.dep == "nsubj" && t.pos == "NOUN").unwrap();
        assert_eq!(ann.subtree_text(subj), "o volume da PETR4");
    }

    #[test]
    fn command_annotator_requires_program() {
        assert!(CommandAnnotator::new("   ").is_none());
        let ann = CommandAnnotator::new("analisador --json").unwrap();
        assert_eq!(ann.program, "analisador");
        assert_eq!(ann.args, vec!["--json"]);
    }

    #[test]
    fn command_annotator_degrades_to_empty() {
        let ann = CommandAnnotator::new("/nonexistent/n2s-analyzer").unwrap();
        assert_eq!(ann.annotate("qualquer coisa"), Annotation::default());
    }

    #[test]
    fn annotation_json_defaults_missing_fields() {
        let ann: Annotation =
            serde_json::from_str(r#"{"entities":[{"text":"Vale","label":"ORG"}]}"#).unwrap();
        assert_eq!(ann.entities.len(), 1);
        assert!(ann.tokens.is_empty());
    }
}
