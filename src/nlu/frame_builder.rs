//! # Montagem do Mapa de Placeholders
//!
//! Combina a anotação linguística, a data extraída, o gazetteer e o
//! dicionário de sinônimos num mapa `PlaceholderKey → valor`.
//!
//! | Placeholder | Fonte |
//! |-------------|-------|
//! | `DATE` | data extraída, quando houver |
//! | `ENTITY` | entidades NER ordenadas por prioridade → gazetteer |
//! | `DESIRED_VALUE` | palavras-chave → sinônimos aproximados → métrica padrão |
//! | `SHARE_CLASS` | `ordinária`/`ON` → `ON`; `preferencial`/`PN` → `PN` |
//! | `SECTOR` | setores conhecidos, senão as palavras após "setor de" |
//!
//! ## Resolução de `DESIRED_VALUE`
//!
//! ```text
//! 1. Tabela de palavras-chave, em ordem de prioridade, sobre a pergunta
//!    normalizada ("abertura" → preco_abertura, "volume" → volume_total_negociado…)
//! 2. Fragmentos das frases sujeito/objeto da análise de dependências,
//!    sem entidades, sem a data, sem artigos/preposições nas bordas;
//!    o mais longo é tentado primeiro no dicionário de sinônimos
//! 3. "preço"/"cotação"/"valor" → preco_fechamento (degradado)
//! ```
//!
//! Toda chave precisa existir no dicionário; uma palavra-chave cuja chave
//! não existe é descartada com erro no log.
//!
//! Nada aqui falha: cada campo é opcional. Quem decide o que é obrigatório
//! é o orquestrador.

use regex::Regex;
use serde::Serialize;

use crate::core::frame::{PlaceholderKey, Placeholders};
use crate::core::normalizer::normalize;
use crate::core::templates::EntityKind;
use crate::error::Degradation;
use crate::nlu::annotator::Annotation;
use crate::nlu::date::ExtractedDate;
use crate::nlu::gazetteer::{rank_entities, EntityOutcome, Gazetteer, ShareClass};
use crate::nlu::synonyms::SynonymDictionary;

/// Palavras-chave de métricas, em ordem de prioridade (texto normalizado).
const METRIC_KEYWORDS: &[(&str, &[&str])] = &[
    ("preco_abertura", &["preco de abertura", "abertura", "abriu"]),
    ("preco_fechamento", &["preco de fechamento", "fechamento", "fechou"]),
    ("preco_maximo", &["preco maximo", "maximo", "maxima"]),
    ("preco_minimo", &["preco minimo", "minimo", "minima"]),
    ("preco_medio", &["preco medio", "medio", "media"]),
    ("codigo", &["codigo de negociacao", "codigo", "ticker", "negociacao"]),
    ("volume_total_negociado", &["volume total negociado", "volume"]),
    ("quantidade_negociada", &["quantidade negociada", "quantidade"]),
    ("total_negocios", &["numero de negocios", "total de negocios", "negocios"]),
];

/// Métrica usada quando só há menção genérica a preço.
const DEFAULT_METRIC: (&str, &[&str]) = ("preco_fechamento", &["preco", "cotacao", "valor"]);

/// Setores conhecidos: variantes normalizadas → nome canônico.
const KNOWN_SECTORS: &[(&[&str], &str)] = &[
    (&["bancario", "bancaria", "bancos", "financeiro", "financeira"], "Financeiro"),
    (&["energia eletrica", "eletrico", "eletrica", "energia"], "Energia Elétrica"),
    (&["petroleo e gas", "oleo e gas", "petroleo"], "Petróleo, Gás e Biocombustíveis"),
    (&["mineracao"], "Mineração"),
    (&["siderurgia", "metalurgia"], "Siderurgia e Metalurgia"),
    (&["saude"], "Saúde"),
    (&["varejo", "comercio"], "Comércio"),
    (&["telecomunicacoes", "telecom"], "Telecomunicações"),
    (&["construcao civil", "construcao"], "Construção Civil"),
    (&["tecnologia da informacao", "tecnologia"], "Tecnologia da Informação"),
    (&["saneamento"], "Saneamento"),
    (&["agronegocio", "agropecuaria"], "Agropecuária"),
];

/// Relações de dependência cujas subárvores viram fragmentos candidatos.
const PHRASE_DEPS: &[&str] = &["nsubj", "nsubj:pass", "obj", "dobj", "iobj", "obl", "pobj", "attr"];

/// Artigos e preposições aparados das bordas dos fragmentos.
const EDGE_WORDS: &[&str] = &[
    "o", "a", "os", "as", "um", "uma", "de", "do", "da", "dos", "das", "em", "no", "na", "nos",
    "nas", "para", "por", "pelo", "pela", "ao", "aos", "com", "e", "qual", "quais",
];

/// Palavras que encerram o nome livre de um setor.
const SECTOR_STOPWORDS: &[&str] = &[
    "com", "que", "em", "no", "na", "nos", "nas", "para", "por", "qual", "quais", "hoje",
    "ontem", "maior", "menor", "tem", "teve", "foi",
];

const MAX_SECTOR_WORDS: usize = 4;

/// Como `DESIRED_VALUE` foi obtido.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricVia {
    Keyword,
    Synonym,
    Default,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MetricResolution {
    pub key: String,
    pub matched: String,
    pub via: MetricVia,
}

/// Entrada de uma montagem.
pub struct FrameInput<'a> {
    pub normalized_question: &'a str,
    pub annotation: &'a Annotation,
    pub date: Option<&'a ExtractedDate>,
    pub entity_kind: EntityKind,
}

/// Saída de uma montagem: placeholders e diagnóstico.
#[derive(Debug)]
pub struct BuiltFrame {
    pub placeholders: Placeholders,
    pub entity: EntityOutcome,
    pub metric: Option<MetricResolution>,
    pub degradations: Vec<Degradation>,
}

struct KeywordRule {
    key: &'static str,
    pattern: Regex,
}

/// Montador de placeholders; regexes compiladas uma vez.
pub struct FrameBuilder {
    metric_rules: Vec<KeywordRule>,
    default_metric: KeywordRule,
    sector_rules: Vec<KeywordRule>,
    ordinary_re: Regex,
    preferred_re: Regex,
    sector_mention_re: Regex,
    sector_tail_re: Regex,
    synonym_threshold: f64,
    strict_entities: bool,
}

impl FrameBuilder {
    pub fn new(synonym_threshold: f64, strict_entities: bool) -> Self {
        Self {
            metric_rules: METRIC_KEYWORDS
                .iter()
                .map(|(key, phrases)| KeywordRule::new(*key, phrases))
                .collect(),
            default_metric: KeywordRule::new(DEFAULT_METRIC.0, DEFAULT_METRIC.1),
            sector_rules: KNOWN_SECTORS
                .iter()
                .map(|(phrases, name)| KeywordRule::new(*name, phrases))
                .collect(),
            ordinary_re: Regex::new(r"\b(ordinarias?|on)\b").unwrap(),
            preferred_re: Regex::new(r"\b(preferenciais|preferencial|pn|pna|pnb)\b").unwrap(),
            sector_mention_re: Regex::new(r"\bsetor(es)?\b").unwrap(),
            sector_tail_re: Regex::new(r"\bsetor(?:es)?\s+(?:de|do|da|dos|das)\s+(.+)$").unwrap(),
            synonym_threshold,
            strict_entities,
        }
    }

    pub fn build(
        &self,
        input: &FrameInput<'_>,
        synonyms: &SynonymDictionary,
        gazetteer: &Gazetteer,
    ) -> BuiltFrame {
        let mut placeholders = Placeholders::new();
        let mut degradations = Vec::new();
        let text = input.normalized_question;

        if let Some(date) = input.date {
            placeholders.insert(PlaceholderKey::Date, date.iso());
        }

        let share_class = self.share_class(text);
        if let Some(class) = share_class {
            placeholders.insert(PlaceholderKey::ShareClass, class.code().to_string());
        }

        if let Some(sector) = self.sector(text) {
            placeholders.insert(PlaceholderKey::Sector, sector);
        }

        let wanted = match input.entity_kind {
            EntityKind::NotUsed => EntityKind::Company,
            kind => kind,
        };
        let ranked = rank_entities(&input.annotation.entities);
        let entity = gazetteer.resolve(&ranked, wanted, share_class);
        match &entity {
            EntityOutcome::Resolved { value, .. } => {
                placeholders.insert(PlaceholderKey::Entity, value.clone());
            }
            EntityOutcome::RawText { text } if !self.strict_entities => {
                placeholders.insert(PlaceholderKey::Entity, text.clone());
                degradations.push(Degradation::RawEntityText { text: text.clone() });
            }
            _ => {}
        }

        let metric = self.desired_value(input, synonyms);
        if let Some(metric) = &metric {
            if metric.via == MetricVia::Default {
                tracing::warn!(key = %metric.key, "Usando métrica padrão");
                degradations.push(Degradation::DefaultMetric { key: metric.key.clone() });
            }
            placeholders.insert(PlaceholderKey::DesiredValue, metric.key.clone());
        }

        BuiltFrame {
            placeholders,
            entity,
            metric,
            degradations,
        }
    }

    fn share_class(&self, text: &str) -> Option<ShareClass> {
        if self.ordinary_re.is_match(text) {
            Some(ShareClass::Ordinary)
        } else if self.preferred_re.is_match(text) {
            Some(ShareClass::Preferred)
        } else {
            None
        }
    }

    fn sector(&self, text: &str) -> Option<String> {
        let mention = self.sector_mention_re.find(text)?;
        let after = &text[mention.start()..];

        if let Some(rule) = self.sector_rules.iter().find(|r| r.pattern.is_match(after)) {
            return Some(rule.key.to_string());
        }

        let tail = self.sector_tail_re.captures(after)?;
        let words: Vec<&str> = tail[1]
            .split_whitespace()
            .take_while(|w| !SECTOR_STOPWORDS.contains(w))
            .take(MAX_SECTOR_WORDS)
            .collect();
        (!words.is_empty()).then(|| words.join(" "))
    }

    fn desired_value(&self, input: &FrameInput<'_>, synonyms: &SynonymDictionary) -> Option<MetricResolution> {
        let text = input.normalized_question;

        for rule in &self.metric_rules {
            let Some(m) = rule.pattern.find(text) else {
                continue;
            };
            if synonyms.contains_key(rule.key) {
                tracing::info!(key = rule.key, keyword = m.as_str(), "Métrica resolvida por palavra-chave");
                return Some(MetricResolution {
                    key: rule.key.to_string(),
                    matched: m.as_str().to_string(),
                    via: MetricVia::Keyword,
                });
            }
            tracing::error!(key = rule.key, keyword = m.as_str(), "Chave de métrica ausente do dicionário, descartada");
        }

        for fragment in candidate_fragments(input) {
            if let Some(found) = synonyms.resolve(&fragment, self.synonym_threshold) {
                return Some(MetricResolution {
                    key: found.key,
                    matched: fragment,
                    via: MetricVia::Synonym,
                });
            }
        }

        let m = self.default_metric.pattern.find(text)?;
        if !synonyms.contains_key(self.default_metric.key) {
            tracing::error!(key = self.default_metric.key, "Métrica padrão ausente do dicionário");
            return None;
        }
        Some(MetricResolution {
            key: self.default_metric.key.to_string(),
            matched: m.as_str().to_string(),
            via: MetricVia::Default,
        })
    }
}

impl KeywordRule {
    fn new(key: &'static str, phrases: &[&str]) -> Self {
        let alternatives = phrases
            .iter()
            .map(|p| regex::escape(p))
            .collect::<Vec<_>>()
            .join("|");
        Self {
            key,
            pattern: Regex::new(&format!(r"\b(?:{alternatives})\b")).unwrap(),
        }
    }
}

/// Fragmentos das frases sujeito/objeto, do mais longo ao mais curto.
fn candidate_fragments(input: &FrameInput<'_>) -> Vec<String> {
    let mut removals: Vec<String> = input
        .annotation
        .entities
        .iter()
        .map(|e| normalize(&e.text))
        .chain(input.date.map(|d| normalize(&d.matched)))
        .filter(|r| !r.is_empty())
        .collect();
    // Remove primeiro os trechos mais longos
    removals.sort_by_key(|r| std::cmp::Reverse(r.chars().count()));

    let mut fragments: Vec<String> = Vec::new();
    for (i, token) in input.annotation.tokens.iter().enumerate() {
        if !PHRASE_DEPS.contains(&token.dep.as_str()) {
            continue;
        }
        let mut pieces = vec![normalize(&input.annotation.subtree_text(i))];
        for removal in &removals {
            pieces = pieces
                .iter()
                .flat_map(|p| p.split(removal.as_str()).map(str::to_string).collect::<Vec<_>>())
                .collect();
        }
        for piece in pieces {
            let trimmed = trim_edge_words(&piece);
            if !trimmed.is_empty() && !fragments.contains(&trimmed) {
                fragments.push(trimmed);
            }
        }
    }

    fragments.sort_by_key(|f| std::cmp::Reverse(f.chars().count()));
    fragments
}

fn trim_edge_words(piece: &str) -> String {
    let words: Vec<&str> = piece.split_whitespace().collect();
    let start = words.iter().position(|w| !EDGE_WORDS.contains(w));
    let end = words.iter().rposition(|w| !EDGE_WORDS.contains(w));
    match (start, end) {
        (Some(s), Some(e)) => words[s..=e].join(" "),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nlu::annotator::{Annotator, DependencyToken, HeuristicAnnotator, NamedEntity};
    use crate::nlu::date::{extract, FixedClock};
    use chrono::NaiveDate;

    const SYNONYMS: &str = "\
preco_abertura = [('preço de abertura', 0.9)]
preco_fechamento = [('preço de fechamento', 0.95), ('cotação final', 0.8)]
preco_medio = [('preço médio', 0.9)]
codigo = [('código de negociação', 0.9)]
volume_total_negociado = [('volume negociado', 0.9)]
";

    fn synonyms() -> SynonymDictionary {
        SynonymDictionary::parse(SYNONYMS, "test")
    }

    fn gazetteer() -> Gazetteer {
        Gazetteer::from_pairs(&[("VALE", "VALE"), ("VALE3", "VALE3"), ("PETROBRAS", "PETR_LABEL"), ("PETR4", "PETR4")])
    }

    fn build(question: &str, kind: EntityKind) -> BuiltFrame {
        build_with(&FrameBuilder::new(0.70, false), question, kind)
    }

    fn build_with(builder: &FrameBuilder, question: &str, kind: EntityKind) -> BuiltFrame {
        let annotation = HeuristicAnnotator::new().annotate(question);
        let clock = FixedClock(NaiveDate::from_ymd_opt(2024, 3, 10).unwrap());
        let date = extract(question, &clock);
        let normalized = normalize(question);
        let input = FrameInput {
            normalized_question: &normalized,
            annotation: &annotation,
            date: date.as_ref(),
            entity_kind: kind,
        };
        builder.build(&input, &synonyms(), &gazetteer())
    }

    fn get(frame: &BuiltFrame, key: PlaceholderKey) -> Option<&str> {
        frame.placeholders.get(&key).map(String::as_str)
    }

    #[test]
    fn full_instrument_question() {
        let frame = build("Qual foi o preço de fechamento da VALE3 em 05/03/2024?", EntityKind::Instrument);
        assert_eq!(get(&frame, PlaceholderKey::Date), Some("2024-03-05"));
        assert_eq!(get(&frame, PlaceholderKey::Entity), Some("VALE3"));
        assert_eq!(get(&frame, PlaceholderKey::DesiredValue), Some("preco_fechamento"));
        assert_eq!(frame.metric.unwrap().via, MetricVia::Keyword);
        assert!(frame.degradations.is_empty());
    }

    #[test]
    fn keyword_priority_order() {
        // "abertura" precede "volume" na tabela
        let frame = build("volume e abertura da VALE3 hoje", EntityKind::Instrument);
        assert_eq!(get(&frame, PlaceholderKey::DesiredValue), Some("preco_abertura"));
    }

    #[test]
    fn keyword_with_missing_key_is_discarded() {
        // preco_maximo não existe no dicionário; cai para a métrica padrão
        let frame = build("Qual o preço máximo da VALE3 hoje?", EntityKind::Instrument);
        let metric = frame.metric.unwrap();
        assert_eq!(metric.key, "preco_fechamento");
        assert_eq!(metric.via, MetricVia::Default);
        assert_eq!(
            frame.degradations,
            vec![Degradation::DefaultMetric { key: "preco_fechamento".into() }]
        );
    }

    #[test]
    fn fuzzy_fallback_uses_phrase_fragments() {
        let annotation = Annotation {
            entities: vec![NamedEntity::new("VALE3", "ORG")],
            tokens: vec![
                token("Qual", "PRON", "dep", 1),
                token("foi", "AUX", "ROOT", 1),
                token("a", "DET", "det", 3),
                token("cotação", "NOUN", "obj", 1),
                token("final", "ADJ", "amod", 3),
                token("da", "ADP", "case", 6),
                token("VALE3", "PROPN", "nmod", 3),
            ],
        };
        let normalized = normalize("Qual foi a cotação final da VALE3");
        let input = FrameInput {
            normalized_question: &normalized,
            annotation: &annotation,
            date: None,
            entity_kind: EntityKind::Instrument,
        };
        let frame = FrameBuilder::new(0.70, false).build(&input, &synonyms(), &gazetteer());
        let metric = frame.metric.unwrap();
        assert_eq!(metric.key, "preco_fechamento");
        assert_eq!(metric.via, MetricVia::Synonym);
        assert_eq!(metric.matched, "cotacao final");
    }

    #[test]
    fn fragments_strip_entity_date_and_edge_words() {
        let question = "Qual foi o preço de fechamento da VALE3 em 05/03/2024?";
        let annotation = HeuristicAnnotator::new().annotate(question);
        let clock = FixedClock(NaiveDate::from_ymd_opt(2024, 3, 10).unwrap());
        let date = extract(question, &clock);
        let normalized = normalize(question);
        let input = FrameInput {
            normalized_question: &normalized,
            annotation: &annotation,
            date: date.as_ref(),
            entity_kind: EntityKind::Instrument,
        };
        assert_eq!(candidate_fragments(&input), vec!["preco de fechamento".to_string()]);
    }

    #[test]
    fn raw_entity_text_is_degraded() {
        let frame = build("Qual o preço de abertura da Acme hoje?", EntityKind::Instrument);
        assert_eq!(get(&frame, PlaceholderKey::Entity), Some("Acme"));
        assert_eq!(frame.degradations, vec![Degradation::RawEntityText { text: "Acme".into() }]);
    }

    #[test]
    fn strict_entities_drop_raw_text() {
        let builder = FrameBuilder::new(0.70, true);
        let frame = build_with(&builder, "Qual o preço de abertura da Acme hoje?", EntityKind::Instrument);
        assert_eq!(get(&frame, PlaceholderKey::Entity), None);
        assert!(matches!(frame.entity, EntityOutcome::RawText { .. }));
    }

    #[test]
    fn company_label_for_identity_templates() {
        let frame = build("Qual o código de negociação da Vale?", EntityKind::Company);
        assert_eq!(get(&frame, PlaceholderKey::Entity), Some("VALE"));
        assert_eq!(get(&frame, PlaceholderKey::DesiredValue), Some("codigo"));
        assert_eq!(get(&frame, PlaceholderKey::Date), None);
    }

    #[test]
    fn share_class_detection() {
        let on = build("preço das ações ordinárias da Vale hoje", EntityKind::Instrument);
        assert_eq!(get(&on, PlaceholderKey::ShareClass), Some("ON"));
        assert_eq!(get(&on, PlaceholderKey::Entity), Some("VALE3"));

        let pn = build("preço da Petrobras PN hoje", EntityKind::Instrument);
        assert_eq!(get(&pn, PlaceholderKey::ShareClass), Some("PN"));
        assert_eq!(get(&pn, PlaceholderKey::Entity), Some("PETR4"));
    }

    #[test]
    fn known_sector() {
        let frame = build("Qual ação do setor bancário teve maior volume?", EntityKind::NotUsed);
        assert_eq!(get(&frame, PlaceholderKey::Sector), Some("Financeiro"));
        assert_eq!(get(&frame, PlaceholderKey::DesiredValue), Some("volume_total_negociado"));
    }

    #[test]
    fn free_sector_name() {
        let frame = build("Qual ação do setor de papel e celulose com maior volume?", EntityKind::NotUsed);
        assert_eq!(get(&frame, PlaceholderKey::Sector), Some("papel e celulose"));
    }

    #[test]
    fn no_sector_without_mention() {
        let frame = build("preço da energia da VALE3 hoje", EntityKind::Instrument);
        assert_eq!(get(&frame, PlaceholderKey::Sector), None);
    }

    #[test]
    fn trims_edge_words() {
        assert_eq!(trim_edge_words("o preco de fechamento da"), "preco de fechamento");
        assert_eq!(trim_edge_words("da em"), "");
    }

    fn token(text: &str, pos: &str, dep: &str, head: usize) -> DependencyToken {
        DependencyToken {
            text: text.into(),
            lemma: text.to_lowercase(),
            pos: pos.into(),
            dep: dep.into(),
            head,
        }
    }
}
