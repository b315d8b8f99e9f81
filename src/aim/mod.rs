// src/aim/mod.rs
use std::fmt;

use once_cell::sync::Lazy;
use scraper::Selector;

use crate::extractors::{extract_quizzes, QuizRecord};
use crate::portal::{Browser, Navigator};
use crate::utils::error::{ExtractError, PortalError};

pub const DEFAULT_BASE_URL: &str = "http://aim02.curtin.edu.au/";

// --- Login form fields ---
const SUBJECT_FIELD: &str = "SubjectName";
const COMMAND_FIELD: &str = "Command";
const STUDENT_ID_FIELD: &str = "StudentID";
const PASSWORD_FIELD: &str = "Password";

const SHOW_SUBJECT_COMMAND: &str = "ShowSubjectPage";

static TABLE_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("table").expect("Failed to compile TABLE_SELECTOR")
});

#[derive(Clone)]
pub struct Credentials {
    pub student_id: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("student_id", &self.student_id)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Subjects offered by the quiz site's subject drop-down.
pub fn subject_names<B: Browser>(navigator: &mut Navigator<B>, base_url: &str) -> Result<Vec<String>, PortalError> {
    navigator.open(base_url, &[])?;
    Ok(navigator.form()?.options(SUBJECT_FIELD)?.to_vec())
}

/// Logs in for one subject and reads its quiz table.
pub fn fetch_quizzes<B: Browser>(
    navigator: &mut Navigator<B>,
    base_url: &str,
    subject: &str,
    credentials: &Credentials,
) -> Result<Vec<QuizRecord>, PortalError> {
    tracing::info!("Fetching quizzes for {} as {}", subject, credentials.student_id);
    navigator.open(base_url, &[])?;

    let form = navigator.form_mut()?;
    form.set(SUBJECT_FIELD, subject)?;
    form.set(COMMAND_FIELD, SHOW_SUBJECT_COMMAND)?;
    form.set(STUDENT_ID_FIELD, &credentials.student_id)?;
    form.set(PASSWORD_FIELD, &credentials.password)?;

    let page = navigator.post_form()?;
    let table = page
        .select(&TABLE_SELECTOR)
        .next()
        .ok_or_else(|| ExtractError::MissingStructure("subject page has no quiz table".to_string()))?;

    Ok(extract_quizzes(table)?)
}
