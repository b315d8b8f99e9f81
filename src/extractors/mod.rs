// src/extractors/mod.rs
pub mod classes;
pub mod quiz;
pub mod table;

use scraper::ElementRef;

// Re-export key extraction types for convenience
pub use classes::{extract_sessions, ClassSession};
pub use quiz::{extract_quizzes, QuizRecord};
pub use table::{parse_table, Record, Records};

/// Text content of an element with surrounding whitespace removed.
pub(crate) fn text_of(element: ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}
