use text_splitter::{ChunkConfig, TextSplitter};

use crate::types::{AppError, Result};

/// Character-based recursive splitter: prefers paragraph, then sentence, then
/// word boundaries, and falls back to splitting inside words only when a
/// single word exceeds `chunk_size`.
pub struct TextChunker {
    splitter: TextSplitter<text_splitter::Characters>,
}

impl TextChunker {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        let config = ChunkConfig::new(chunk_size)
            .with_overlap(chunk_overlap)
            .map_err(|e| AppError::Configuration(format!("Invalid chunking settings: {}", e)))?;

        Ok(Self {
            splitter: TextSplitter::new(config),
        })
    }

    pub fn chunk(&self, text: &str) -> Vec<String> {
        self.splitter
            .chunks(text)
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(String::from)
            .collect()
    }
}
