// src/utils/error.rs
use thiserror::Error;

// Define specific error types for different parts of the application
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Network request failed: {0}")]
    Network(#[from] reqwest::Error), // Automatically convert reqwest errors

    #[error("HTTP error {0} for {1}")]
    Http(reqwest::StatusCode, String), // e.g., 404 Not Found, 500 from the portal

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Invalid header value: {0}")]
    InvalidHeader(String),

    #[error("No page has been loaded yet")]
    NoPage,

    #[error("Cannot navigate back: history is empty")]
    NoHistory,

    #[error("Failed to dump page: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Required table header missing: {0}")]
    MissingHeader(String),

    #[error("Row {row} has no value for '{field}'")]
    MissingField { row: usize, field: String },

    #[error("Expected markup not found: {0}")]
    MissingStructure(String),

    #[error("Value '{value}' for '{field}' is not a number")]
    InvalidNumber { field: String, value: String },

    #[error("Unrecognised date: {0}")]
    InvalidDate(String),

    #[error("Unrecognised time of day: {0}")]
    InvalidTime(String),
}

#[derive(Error, Debug)]
pub enum PortalError {
    #[error("Page has no form")]
    FormNotFound,

    #[error("Submit control '{requested}' not found (available: {available:?})")]
    FormControlNotFound {
        requested: String,
        available: Vec<String>,
    },

    #[error("Form has no field named '{0}'")]
    UnknownField(String),

    #[error("'{value}' is not an option of '{field}' (options: {options:?})")]
    InvalidOption {
        field: String,
        value: String,
        options: Vec<String>,
    },

    #[error("Study period '{0}' is not offered by the timetable filter")]
    InvalidStudyPeriod(String),

    #[error("Transport failed: {0}")]
    Transport(#[from] TransportError),

    #[error("Extraction failed: {0}")]
    Extract(#[from] ExtractError),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error), // Automatically convert IO errors

    #[error("Portal interaction failed: {0}")]
    Portal(#[from] PortalError),

    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Transport failed: {0}")]
    Transport(#[from] TransportError),
}
