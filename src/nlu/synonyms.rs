//! # Dicionário de Sinônimos de Métricas
//!
//! Mapeia expressões livres ("preço de abertura", "quanto abriu") para a
//! chave canônica da propriedade na ontologia (`preco_abertura`).
//!
//! ## Formatos de Linha
//!
//! ```text
//! # comentário
//! preco_abertura = [('preço de abertura', 0.95), ('abertura', 0.80)]
//! cotação de fechamento;preco_fechamento
//! ```
//!
//! O primeiro formato é o principal. O segundo (`sinônimo;chave`) acrescenta
//! uma variante de peso `1.0` à chave. Linhas malformadas são ignoradas com
//! aviso; nenhuma linha ruim aborta o carregamento.
//!
//! ## Resolução
//!
//! A frase é normalizada e comparada (Ratcliff/Obershelp) com cada chave e
//! cada variante, na ordem de carregamento. Vence o **primeiro** candidato
//! com o maior score; abaixo do limiar, não há resolução.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::core::normalizer::normalize;
use crate::core::similarity::ratio;

static ENTRY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*([\w]+)\s*=\s*\[(.*)\]\s*$").unwrap());

static PAIR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"\(\s*(?:'((?:[^'\\]|\\.)*)'|"((?:[^"\\]|\\.)*)")\s*,\s*([^\s\)]+)\s*\)"#,
    )
    .unwrap()
});

/// Uma forma de superfície de uma métrica.
#[derive(Clone, Debug, PartialEq)]
pub struct Variant {
    pub surface: String,
    pub normalized: String,
    pub weight: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SynonymEntry {
    /// Chave canônica em minúsculas (ex.: `preco_fechamento`).
    pub key: String,
    pub variants: Vec<Variant>,
}

/// Resultado de uma resolução aproximada.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SynonymMatch {
    pub key: String,
    /// Texto que produziu o melhor score (chave ou variante).
    pub matched: String,
    pub score: f64,
}

/// Dicionário imutável após o carregamento.
#[derive(Debug, Default)]
pub struct SynonymDictionary {
    entries: Vec<SynonymEntry>,
    index: HashMap<String, usize>,
}

impl SynonymDictionary {
    /// Interpreta o conteúdo de um arquivo de sinônimos.
    ///
    /// `source` só é usado nas mensagens de log.
    pub fn parse(content: &str, source: &str) -> Self {
        let mut dict = Self::default();

        for (line_no, raw) in content.lines().enumerate() {
            let line_no = line_no + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some(caps) = ENTRY_RE.captures(line) {
                let key = caps[1].to_lowercase();
                let variants = parse_variants(&caps[2], source, line_no);
                if variants.is_empty() {
                    tracing::warn!(source, line = line_no, key = %key, "Chave sem variantes válidas, ignorada");
                    continue;
                }
                dict.insert(key, variants, source, line_no);
            } else if let Some((surface, key)) = line.split_once(';') {
                let key = key.trim().to_lowercase();
                let surface = surface.trim();
                if key.is_empty() || surface.is_empty() {
                    tracing::warn!(source, line = line_no, "Linha 'sinônimo;chave' incompleta, ignorada");
                    continue;
                }
                dict.append_variant(key, surface);
            } else {
                tracing::warn!(source, line = line_no, content = line, "Linha malformada, ignorada");
            }
        }

        if dict.is_empty() {
            tracing::error!(source, "Dicionário de sinônimos vazio: nenhuma métrica será resolvida");
        } else {
            tracing::info!(source, keys = dict.len(), "Dicionário de sinônimos carregado");
        }
        dict
    }

    /// Chave repetida: substitui a anterior mantendo sua posição.
    fn insert(&mut self, key: String, variants: Vec<Variant>, source: &str, line_no: usize) {
        match self.index.get(&key) {
            Some(&pos) => {
                tracing::warn!(source, line = line_no, key = %key, "Chave duplicada, a última definição prevalece");
                self.entries[pos].variants = variants;
            }
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push(SynonymEntry { key, variants });
            }
        }
    }

    fn append_variant(&mut self, key: String, surface: &str) {
        let variant = Variant {
            surface: surface.to_string(),
            normalized: normalize(surface),
            weight: 1.0,
        };
        match self.index.get(&key) {
            Some(&pos) => self.entries[pos].variants.push(variant),
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push(SynonymEntry {
                    key,
                    variants: vec![variant],
                });
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Verifica se a chave canônica existe (sem diferenciar caixa).
    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(&key.to_lowercase())
    }

    pub fn entries(&self) -> &[SynonymEntry] {
        &self.entries
    }

    /// Resolve uma frase livre para a chave canônica mais parecida.
    ///
    /// Retorna `None` para frase vazia ou quando o melhor score fica abaixo
    /// de `threshold`.
    pub fn resolve(&self, phrase: &str, threshold: f64) -> Option<SynonymMatch> {
        let normalized = normalize(phrase);
        if normalized.is_empty() {
            return None;
        }

        let mut best: Option<SynonymMatch> = None;
        let mut best_score = -1.0;

        for entry in &self.entries {
            let candidates = std::iter::once(entry.key.as_str())
                .chain(entry.variants.iter().map(|v| v.normalized.as_str()));
            for candidate in candidates {
                let score = ratio(&normalized, candidate);
                tracing::debug!(phrase = %normalized, candidate, score, "Comparando sinônimo");
                if score > best_score {
                    best_score = score;
                    best = Some(SynonymMatch {
                        key: entry.key.clone(),
                        matched: candidate.to_string(),
                        score,
                    });
                }
            }
        }

        let best = best?;
        if best.score >= threshold {
            tracing::info!(phrase = %normalized, key = %best.key, score = best.score, "Métrica resolvida por similaridade");
            Some(best)
        } else {
            tracing::debug!(phrase = %normalized, score = best.score, threshold, "Nenhuma métrica acima do limiar");
            None
        }
    }
}

fn parse_variants(list: &str, source: &str, line_no: usize) -> Vec<Variant> {
    let mut variants = Vec::new();
    for caps in PAIR_RE.captures_iter(list) {
        let surface = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map(|m| unescape(m.as_str()))
            .unwrap_or_default();
        let weight_text = &caps[3];

        match weight_text.parse::<f64>() {
            Ok(weight) if (0.0..=1.0).contains(&weight) => {
                let normalized = normalize(&surface);
                if normalized.is_empty() {
                    tracing::warn!(source, line = line_no, "Variante vazia após normalização, ignorada");
                    continue;
                }
                variants.push(Variant {
                    surface,
                    normalized,
                    weight,
                });
            }
            _ => {
                tracing::warn!(source, line = line_no, weight = weight_text, "Peso inválido, variante ignorada");
            }
        }
    }
    variants
}

/// Remove escapes `\'`, `\"` e `\\`.
fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}
