// src/portal/mod.rs
pub mod client;
pub mod navigator;
pub mod page;

// Re-export key session types for convenience
pub use client::{Browser, HttpBrowser};
pub use navigator::{Navigator, Scope};
pub use page::{Form, Page};
