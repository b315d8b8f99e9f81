// src/utils/page_dump.rs
use std::fs;
use std::path::{Path, PathBuf};

use crate::utils::error::TransportError;

/// Writes every page the session loads into a directory, numbered in load order,
/// so a failed traversal can be replayed by eye.
#[derive(Debug)]
pub struct PageDump {
    dir: PathBuf,
    next: usize,
}

impl PageDump {
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self, TransportError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir, next: 0 })
    }

    /// Saves a page body with its URL and fetch time in a leading HTML comment.
    pub fn save(&mut self, url: &str, body: &str) -> Result<PathBuf, TransportError> {
        let path = self.dir.join(format!("{:03}.html", self.next));
        self.next += 1;

        let mut content = String::with_capacity(body.len() + 128);
        content.push_str(&format!(
            "<!-- url: {} fetched: {} -->\n",
            url.replace("--", "- -"),
            chrono::Local::now().to_rfc3339()
        ));
        content.push_str(body);

        fs::write(&path, content)?;
        tracing::debug!("Saved page {} to {}", url, path.display());
        Ok(path)
    }
}
