// src/storage/calendar.rs
use chrono::{DateTime, Utc};
use icalendar::{Calendar, Component, Event, EventLike};

use crate::extractors::QuizRecord;

/// Renders quizzes with a due date as an iCalendar document, one event each.
///
/// Events are floating local times (no `TZID`), matching the portal's unzoned dates.
pub fn quizzes_as_ics(quizzes: &[QuizRecord], subject: &str, stamp: DateTime<Utc>) -> String {
    let mut calendar = Calendar::new();

    for (index, quiz) in quizzes.iter().enumerate() {
        let Some(due) = quiz.due_date else {
            tracing::debug!("Skipping '{}': no due date", quiz.title);
            continue;
        };

        let uid = format!(
            "{}-{}-{}@timetable-extractor",
            uid_part(subject),
            index,
            due.format("%Y%m%dT%H%M%S")
        );
        let event = Event::new()
            .uid(&uid)
            .timestamp(stamp)
            .starts(due)
            .summary(&format!("{} - {}", subject, quiz.title))
            .done();
        calendar.push(event);
    }

    calendar.to_string()
}

// Subject names may contain spaces and punctuation
fn uid_part(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect()
}
