// src/extractors/quiz.rs

// --- Imports ---
use crate::extractors::table::parse_table;
use crate::utils::error::ExtractError;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::ElementRef;
use serde::Serialize;

// --- Column Headers ---
const TITLE_HEADER: &str = "Title";
const DUE_DATE_HEADER: &str = "Due date";
const MARK_HEADER: &str = "Your Mark";
const WEIGHT_HEADER: &str = "Weight";

const REQUIRED_HEADERS: [&str; 4] = [TITLE_HEADER, DUE_DATE_HEADER, MARK_HEADER, WEIGHT_HEADER];

// --- Date Formats ---
// Tried in order; slash dates read month first.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %I:%M %p",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %I:%M %p",
    "%d %B %Y %H:%M",
    "%d %b %Y %H:%M",
    "%d %B %Y %I:%M %p",
    "%d %b %Y %I:%M %p",
    "%A %d %B %Y %H:%M",
    "%a %d %b %Y %H:%M",
    "%B %d %Y %H:%M",
    "%b %d %Y %H:%M",
    "%B %d %Y %I:%M %p",
    "%b %d %Y %I:%M %p",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d %B %Y",
    "%d %b %Y",
    "%A %d %B %Y",
    "%a %d %b %Y",
    "%B %d %Y",
    "%b %d %Y",
];

// --- Regex Patterns for Date Normalisation (Lazy Static) ---
static ORDINAL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})(?:st|nd|rd|th)\b").expect("Failed to compile ORDINAL_RE")
});

static MERIDIEM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d)\s*([ap])\.?m\.?(?:\s|$)").expect("Failed to compile MERIDIEM_RE")
});

static FILLER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s+(?:at|by)\s+|,").expect("Failed to compile FILLER_RE")
});

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s+").expect("Failed to compile WHITESPACE_RE")
});

// --- Data Structures ---
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuizRecord {
    pub title: String,
    pub due_date: Option<NaiveDateTime>, // Absent when the cell is blank
    pub mark: String,                    // Verbatim: may be blank, a number or a grade
    pub weight: f64,
}

/// Converts the quiz table of a subject page into typed records.
///
/// Fails if any of `Title`, `Due date`, `Your Mark` or `Weight` is missing from
/// the header row, or if a row is too short to carry one of them.
pub fn extract_quizzes(table: ElementRef) -> Result<Vec<QuizRecord>, ExtractError> {
    let records = parse_table(table)?;

    if let Some(missing) = REQUIRED_HEADERS
        .into_iter()
        .find(|required| !records.headers().iter().any(|h| h == required))
    {
        tracing::warn!("Quiz table headers were {:?}", records.headers());
        return Err(ExtractError::MissingHeader(missing.to_string()));
    }

    let mut quizzes = Vec::new();
    for (index, record) in records.enumerate() {
        let row = index + 1;
        let cell = |field: &str| {
            record.get(field).ok_or_else(|| ExtractError::MissingField {
                row,
                field: field.to_string(),
            })
        };

        let due_text = cell(DUE_DATE_HEADER)?;
        let due_date = if due_text.is_empty() {
            None
        } else {
            Some(parse_due_date(due_text)?)
        };

        let weight_text = cell(WEIGHT_HEADER)?;
        let weight = weight_text
            .parse::<f64>()
            .map_err(|_| ExtractError::InvalidNumber {
                field: WEIGHT_HEADER.to_string(),
                value: weight_text.to_string(),
            })?;

        quizzes.push(QuizRecord {
            title: cell(TITLE_HEADER)?.to_string(),
            due_date,
            mark: cell(MARK_HEADER)?.to_string(),
            weight,
        });
    }

    tracing::debug!("Extracted {} quizzes", quizzes.len());
    Ok(quizzes)
}

/// Parses a free-text date such as `2016-05-01`, `1st May 2016, 5:00pm` or
/// `05/01/2016 17:00`. A date without a time means midnight.
pub fn parse_due_date(text: &str) -> Result<NaiveDateTime, ExtractError> {
    let trimmed = text.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.naive_local());
    }

    let cleaned = ORDINAL_RE.replace_all(trimmed, "$1");
    let cleaned = FILLER_RE.replace_all(&cleaned, " ");
    let cleaned = MERIDIEM_RE.replace_all(&cleaned, "$1 ${2}m ");
    let cleaned = WHITESPACE_RE.replace_all(cleaned.trim(), " ");

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(&cleaned, format) {
            return Ok(dt);
        }
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(&cleaned, format) {
            return Ok(date.and_time(chrono::NaiveTime::MIN));
        }
    }

    Err(ExtractError::InvalidDate(text.to_string()))
}

// --- Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use scraper::{Html, Selector};

    fn quizzes_from(html: &str) -> Result<Vec<QuizRecord>, ExtractError> {
        let document = Html::parse_document(html);
        let selector = Selector::parse("table").unwrap();
        let table = document.select(&selector).next().unwrap();
        extract_quizzes(table)
    }

    fn date(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, min, 0).unwrap()
    }

    const QUIZ_TABLE: &str = r#"
        <table>
          <tr><th>Title</th><th>Due date</th><th>Your Mark</th><th>Weight</th></tr>
          <tr><td>Quiz 1</td><td>2016-05-01</td><td>8/10</td><td>5</td></tr>
          <tr><td>Quiz 2</td><td>  </td><td></td><td>2.5</td></tr>
          <tr><td>Final</td><td>2016-06-10 09:30</td><td>HD</td><td> 40 </td></tr>
        </table>
    "#;

    #[test]
    fn test_quiz_rows_are_typed() {
        let quizzes = quizzes_from(QUIZ_TABLE).unwrap();

        assert_eq!(quizzes.len(), 3);
        assert_eq!(quizzes[0].title, "Quiz 1");
        assert_eq!(quizzes[0].due_date, Some(date(2016, 5, 1, 0, 0)));
        assert_eq!(quizzes[0].mark, "8/10");
        assert_eq!(quizzes[0].weight, 5.0);

        assert_eq!(quizzes[1].due_date, None, "Blank due date is absent, not an error");
        assert_eq!(quizzes[1].mark, "");
        assert_eq!(quizzes[1].weight, 2.5);

        assert_eq!(quizzes[2].due_date, Some(date(2016, 6, 10, 9, 30)));
        assert_eq!(quizzes[2].mark, "HD");
        assert_eq!(quizzes[2].weight, 40.0);
    }

    #[test]
    fn test_missing_header_signals_layout_change() {
        let html = r#"<table>
            <tr><th>Title</th><th>Due</th><th>Your Mark</th><th>Weight</th></tr>
        </table>"#;

        match quizzes_from(html) {
            Err(ExtractError::MissingHeader(header)) => assert_eq!(header, "Due date"),
            other => panic!("expected missing header, got {:?}", other),
        }
    }

    #[test]
    fn test_non_numeric_weight_fails() {
        let html = r#"<table>
            <tr><th>Title</th><th>Due date</th><th>Your Mark</th><th>Weight</th></tr>
            <tr><td>Quiz 1</td><td></td><td></td><td>ten</td></tr>
        </table>"#;

        assert!(matches!(
            quizzes_from(html),
            Err(ExtractError::InvalidNumber { ref value, .. }) if value == "ten"
        ));
    }

    #[test]
    fn test_short_row_is_malformed() {
        let html = r#"<table>
            <tr><th>Title</th><th>Due date</th><th>Your Mark</th><th>Weight</th></tr>
            <tr><td>Quiz 1</td><td></td></tr>
        </table>"#;

        assert!(matches!(
            quizzes_from(html),
            Err(ExtractError::MissingField { row: 1, ref field }) if field == "Weight"
        ));
    }

    #[test]
    fn test_free_text_dates() {
        assert_eq!(parse_due_date("2016-05-01").unwrap(), date(2016, 5, 1, 0, 0));
        assert_eq!(parse_due_date("1st May 2016").unwrap(), date(2016, 5, 1, 0, 0));
        assert_eq!(parse_due_date("1 May 2016, 5:00pm").unwrap(), date(2016, 5, 1, 17, 0));
        assert_eq!(parse_due_date("Sunday 1 May 2016 at 23:59").unwrap(), date(2016, 5, 1, 23, 59));
        assert_eq!(parse_due_date("05/01/2016 17:00").unwrap(), date(2016, 5, 1, 17, 0));
        assert_eq!(parse_due_date("May 1, 2016").unwrap(), date(2016, 5, 1, 0, 0));
        assert_eq!(parse_due_date("2016-05-01T08:15:00+08:00").unwrap(), date(2016, 5, 1, 8, 15));
        assert!(matches!(parse_due_date("next week"), Err(ExtractError::InvalidDate(_))));
    }
}
