//! Citation records shown under chat replies.

use serde::Serialize;

use crate::services::Chunk;

/// A curated reference to a retrieved chunk. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Source {
    file: String,
    page: String,
    text: String,
}

impl Source {
    pub fn new(file: impl Into<String>, page: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            page: page.into(),
            text: text.into(),
        }
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn page(&self) -> &str {
        &self.page
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Sources for `chunks`, without duplicates, in first-seen order.
    pub fn curate(chunks: &[Chunk]) -> Vec<Self> {
        let mut curated: Vec<Self> = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let source = Self::from(chunk);
            if !curated.contains(&source) {
                curated.push(source);
            }
        }
        curated
    }
}

impl From<&Chunk> for Source {
    fn from(chunk: &Chunk) -> Self {
        Self::new(
            chunk.doc.file_name.clone(),
            chunk.page.clone().unwrap_or_else(|| "-".to_string()),
            chunk.text.clone(),
        )
    }
}
