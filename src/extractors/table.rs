// src/extractors/table.rs
use crate::extractors::text_of;
use crate::utils::error::ExtractError;
use once_cell::sync::Lazy;
use scraper::{element_ref::Select, ElementRef, Selector};

static ROW_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("tr").expect("Failed to compile ROW_SELECTOR")
});

static HEADER_CELL_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("th").expect("Failed to compile HEADER_CELL_SELECTOR")
});

static CELL_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("td").expect("Failed to compile CELL_SELECTOR")
});

/// One data row keyed by header text, in header order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record(Vec<(String, String)>);

impl Record {
    /// Cell text for `header`. With duplicate headers the rightmost cell wins.
    pub fn get(&self, header: &str) -> Option<&str> {
        self.0
            .iter()
            .rev()
            .find(|(key, _)| key == header)
            .map(|(_, value)| value.as_str())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(key, _)| key.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Lazily pairs each data row of a table with its header row.
///
/// Cells are paired with headers by position. A row whose cell count differs
/// from the header count yields only as many pairs as the shorter of the two;
/// the record is never padded.
pub struct Records<'a> {
    headers: Vec<String>,
    rows: Select<'a, 'static>,
}

impl<'a> Records<'a> {
    pub fn headers(&self) -> &[String] {
        &self.headers
    }
}

impl<'a> Iterator for Records<'a> {
    type Item = Record;

    fn next(&mut self) -> Option<Record> {
        let row = self.rows.next()?;
        let cells = row.select(&CELL_SELECTOR).map(text_of);
        Some(Record(self.headers.iter().cloned().zip(cells).collect()))
    }
}

/// Reads the first `tr` of `table` as `th` headers and every later `tr` as `td` data.
pub fn parse_table(table: ElementRef<'_>) -> Result<Records<'_>, ExtractError> {
    let mut rows = table.select(&ROW_SELECTOR);
    let header = rows
        .next()
        .ok_or_else(|| ExtractError::MissingStructure("table has no header row".to_string()))?;
    let headers: Vec<String> = header.select(&HEADER_CELL_SELECTOR).map(text_of).collect();

    tracing::trace!("Table headers: {:?}", headers);
    Ok(Records { headers, rows })
}
