//! # Extração de Datas
//!
//! Reconhece datas explícitas e relativas em perguntas:
//!
//! | Forma | Exemplo | Resultado |
//! |-------|---------|-----------|
//! | dia-mês-ano | `05/03/2024`, `5.3.2024`, `05 - 03 - 2024` | `2024-03-05` |
//! | ano-mês-dia | `2024-03-05`, `2024/3/5` | `2024-03-05` |
//! | relativa | `hoje`, `hj`, `ontem` | relógio injetado |
//!
//! Se as duas formas explícitas aparecem, vence a que começa antes no texto
//! (dia-mês-ano em empate). Uma data explícita inválida (`31/02/2024`) não
//! cai para as palavras relativas: o resultado é "sem data".

use std::sync::LazyLock;

use chrono::{Datelike, Local, NaiveDate};
use regex::{Captures, Regex};
use serde::Serialize;

use crate::core::normalizer::normalize;

/// Menor ano aceito.
pub const MIN_YEAR: i32 = 1900;
/// Anos aceitos além do ano corrente.
pub const YEAR_SLACK: i32 = 5;

static DMY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,2})\s*[/.-]\s*(\d{1,2})\s*[/.-]\s*(\d{4})\b").unwrap()
});
static YMD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{4})\s*[/.-]\s*(\d{1,2})\s*[/.-]\s*(\d{1,2})\b").unwrap()
});
static TODAY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(hoje|hj)\b").unwrap());
static YESTERDAY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bontem\b").unwrap());

/// Fonte da data corrente.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Relógio do sistema, no fuso local.
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Relógio fixo, para testes e reprocessamento.
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DateSource {
    Explicit,
    Relative,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedDate {
    pub date: NaiveDate,
    /// Trecho da pergunta que originou a data.
    pub matched: String,
    pub source: DateSource,
}

impl ExtractedDate {
    /// `YYYY-MM-DD`.
    pub fn iso(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }
}

enum Order {
    DayMonthYear,
    YearMonthDay,
}

/// Extrai a data de uma pergunta.
pub fn extract(text: &str, clock: &dyn Clock) -> Option<ExtractedDate> {
    let today = clock.today();

    let dmy = DMY_RE.captures(text);
    let ymd = YMD_RE.captures(text);
    let explicit = match (dmy, ymd) {
        (Some(d), Some(y)) => {
            if start_of(&y) < start_of(&d) {
                Some((y, Order::YearMonthDay))
            } else {
                Some((d, Order::DayMonthYear))
            }
        }
        (Some(d), None) => Some((d, Order::DayMonthYear)),
        (None, Some(y)) => Some((y, Order::YearMonthDay)),
        (None, None) => None,
    };

    if let Some((caps, order)) = explicit {
        let matched = caps[0].to_string();
        let (day, month, year) = match order {
            Order::DayMonthYear => (&caps[1], &caps[2], &caps[3]),
            Order::YearMonthDay => (&caps[3], &caps[2], &caps[1]),
        };
        return match validate(day, month, year, today.year()) {
            Some(date) => {
                tracing::info!(date = %date, matched = %matched, "Data explícita extraída");
                Some(ExtractedDate {
                    date,
                    matched,
                    source: DateSource::Explicit,
                })
            }
            None => {
                tracing::warn!(matched = %matched, "Data explícita inválida, ignorada");
                None
            }
        };
    }

    let normalized = normalize(text);
    if let Some(m) = TODAY_RE.find(&normalized) {
        return Some(ExtractedDate {
            date: today,
            matched: m.as_str().to_string(),
            source: DateSource::Relative,
        });
    }
    if let Some(m) = YESTERDAY_RE.find(&normalized) {
        return today.pred_opt().map(|date| ExtractedDate {
            date,
            matched: m.as_str().to_string(),
            source: DateSource::Relative,
        });
    }
    None
}

fn start_of(caps: &Captures<'_>) -> usize {
    caps.get(0).map(|m| m.start()).unwrap_or(usize::MAX)
}

fn validate(day: &str, month: &str, year: &str, current_year: i32) -> Option<NaiveDate> {
    let day: u32 = day.parse().ok()?;
    let month: u32 = month.parse().ok()?;
    let year: i32 = year.parse().ok()?;

    if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return None;
    }
    if !(MIN_YEAR..=current_year + YEAR_SLACK).contains(&year) {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}
