//! # Normalização de Texto
//!
//! Toda comparação aproximada do pipeline (templates, sinônimos, gazetteer)
//! acontece sobre texto **normalizado**. Este módulo concentra as duas
//! formas de normalização usadas:
//!
//! | Função | Uso | Exemplo |
//! |--------|-----|---------|
//! | [`normalize()`] | Perguntas, exemplares, sinônimos | `"Preço de Abertura?"` → `"preco de abertura"` |
//! | [`normalize_key()`] | Chaves do gazetteer | `"Vale S.A."` → `"VALE"` |
//!
//! ## Etapas de `normalize()`
//!
//! ```text
//! "  Ação\tPN — Preço?  "
//!   ├── 1. trim + lowercase           → "ação\tpn — preço?"
//!   ├── 2. remove controle/separador  → "açãopn — preço?"   (o espaço ' ' é mantido)
//!   ├── 3. NFD + remove diacríticos   → "acaopn — preco?"
//!   ├── 4. remove não-palavra (exceto espaço e hífen)
//!   ├── 5. colapsa espaços
//!   └── 6. apara hífens e espaços das bordas
//! ```
//!
//! A função é total: qualquer `&str` produz uma string, possivelmente vazia.

use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Caracteres que não são palavra, espaço ou hífen.
static NON_WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s-]").unwrap());

/// Tokens societários e de classe removidos das chaves do gazetteer.
static CORPORATE_TOKENS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(S\.?A\.?|S/?A|CIA\.?|COMPANHIA|LTDA\.?|ON|PN|N[12]|PREF\.?|ORD\.?|NM|ED|EJ|MA|HOLDING|PARTICIPACOES|PART)\b",
    )
    .unwrap()
});

/// Qualquer caractere fora de `\w`.
static NON_KEY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w]").unwrap());

/// Normaliza texto livre para comparação aproximada.
///
/// Idempotente: `normalize(&normalize(s)) == normalize(s)`.
pub fn normalize(text: &str) -> String {
    let lowered = text.trim().to_lowercase();

    let visible: String = lowered.chars().filter(|&c| !is_invisible(c)).collect();
    let plain = strip_diacritics(&visible);
    let cleaned = NON_WORD_RE.replace_all(&plain, "");

    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .trim_matches(|c: char| c == '-' || c.is_whitespace())
        .to_string()
}

/// Decompõe em NFD e descarta as marcas combinantes (acentos, cedilha, til).
pub fn strip_diacritics(text: &str) -> String {
    text.nfd().filter(|&c| !is_combining_mark(c)).collect()
}

/// Chave secundária do gazetteer: maiúsculas, sem acentos, sem sufixos
/// societários (`S.A.`, `LTDA`, `ON`, `PN`...) e sem caracteres não-palavra.
///
/// Retorna `None` quando nada sobra.
pub fn normalize_key(text: &str) -> Option<String> {
    let upper = strip_diacritics(&text.trim().to_uppercase());
    let without_suffixes = CORPORATE_TOKENS_RE.replace_all(&upper, "");
    let key = NON_KEY_RE.replace_all(&without_suffixes, "").to_string();
    (!key.is_empty()).then_some(key)
}

/// Controle, separadores (exceto o espaço ASCII), formatação e uso privado.
fn is_invisible(c: char) -> bool {
    if c == ' ' {
        return false;
    }
    c.is_control() || c.is_whitespace() || is_format_char(c) || is_private_use(c)
}

/// Subconjunto da categoria Unicode `Cf` encontrado em texto colado de
/// navegadores e planilhas.
fn is_format_char(c: char) -> bool {
    matches!(
        c,
        '\u{00AD}'
            | '\u{061C}'
            | '\u{180E}'
            | '\u{200B}'..='\u{200F}'
            | '\u{202A}'..='\u{202E}'
            | '\u{2060}'..='\u{2064}'
            | '\u{FEFF}'
    )
}

fn is_private_use(c: char) -> bool {
    matches!(
        c,
        '\u{E000}'..='\u{F8FF}' | '\u{F0000}'..='\u{FFFFD}' | '\u{100000}'..='\u{10FFFD}'
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn lowercases_and_strips_accents() {
        assert_eq!(normalize("Preço de Abertura"), "preco de abertura");
        assert_eq!(normalize("Ação"), normalize("Acao"));
    }

    #[test]
    fn removes_punctuation_but_keeps_hyphen_and_underscore() {
        assert_eq!(normalize("Qual o preço?!"), "qual o preco");
        assert_eq!(normalize("ex-dividendo"), "ex-dividendo");
        assert_eq!(normalize("preco_fechamento"), "preco_fechamento");
        assert_eq!(normalize("#ENTIDADE#"), "entidade");
    }

    #[test]
    fn collapses_whitespace_and_trims_hyphens() {
        assert_eq!(normalize("  muito    espaço  "), "muito espaco");
        assert_eq!(normalize("- volume -"), "volume");
    }

    #[test]
    fn drops_control_and_format_characters() {
        assert_eq!(normalize("pre\u{200B}ço"), "preco");
        assert_eq!(normalize("a\tb"), "ab");
        assert_eq!(normalize("a\u{00A0}b"), "ab");
        assert_eq!(normalize("\u{FEFF}volume"), "volume");
    }

    #[test]
    fn empty_input_yields_empty() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   "), "");
        assert_eq!(normalize("?!."), "");
    }

    #[test]
    fn is_idempotent() {
        let samples = [
            "Qual foi o preço de fechamento da VALE3 em 05/03/2024?",
            "  -Ação- ",
            "a - - b",
            "Cotação\u{00A0}Média — ÚLTIMA",
            "- -x- -",
            "İstanbul ﬁnanças",
        ];
        for s in samples {
            let once = normalize(s);
            assert_eq!(normalize(&once), once, "not idempotent for {:?}", s);
        }
    }

    proptest! {
        #[test]
        fn normalize_is_idempotent_and_canonical(s in "[a-zA-ZÀ-ÿ0-9 _?!.,/#\t\u{00A0}\u{200B}-]{0,48}") {
            let once = normalize(&s);
            prop_assert_eq!(normalize(&once), once.clone());
            prop_assert!(!once.contains("  "));
            prop_assert_eq!(once.trim_matches([' ', '-']), once.as_str());
            prop_assert!(!once.chars().any(char::is_uppercase));
        }
    }

    #[test]
    fn key_strips_corporate_suffixes() {
        assert_eq!(normalize_key("Vale S.A.").as_deref(), Some("VALE"));
        assert_eq!(normalize_key("Petróleo Brasileiro S/A").as_deref(), Some("PETROLEOBRASILEIRO"));
        assert_eq!(normalize_key("Itaú Unibanco Holding").as_deref(), Some("ITAUUNIBANCO"));
        assert_eq!(normalize_key("GERDAU PN").as_deref(), Some("GERDAU"));
    }

    #[test]
    fn key_keeps_tickers_intact() {
        assert_eq!(normalize_key("vale3").as_deref(), Some("VALE3"));
        assert_eq!(normalize_key("petr4").as_deref(), Some("PETR4"));
    }

    #[test]
    fn key_of_only_suffixes_is_none() {
        assert_eq!(normalize_key("S.A."), None);
        assert_eq!(normalize_key("  "), None);
    }
}
