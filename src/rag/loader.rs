//! PDF corpus discovery and text extraction.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::types::{AppError, Result};

/// Extracted text of one source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    /// Path the text came from, as recorded in chunk metadata.
    pub source: String,
    pub text: String,
}

impl SourceDocument {
    pub fn new(source: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            text: text.into(),
        }
    }
}

/// Outcome of loading a directory.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub documents: Vec<SourceDocument>,
    /// Files that could not be read, with the reason.
    pub skipped: Vec<(PathBuf, String)>,
}

/// Result of walking a data directory.
#[derive(Debug, Default)]
pub struct PdfDiscovery {
    /// `*.pdf` files, sorted by path.
    pub pdfs: Vec<PathBuf>,
    /// Entries the walk could not read (permissions, symlink loops).
    pub unreadable: Vec<(PathBuf, String)>,
}

/// Walk `dir` for `*.pdf` files, recording entries that cannot be read.
pub fn discover_pdfs(dir: &Path) -> Result<PdfDiscovery> {
    if !dir.is_dir() {
        return Err(AppError::InvalidInput(format!(
            "Data directory not found: {}",
            dir.display()
        )));
    }

    let mut discovery = PdfDiscovery::default();
    for entry in WalkDir::new(dir).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let path = e.path().unwrap_or(dir).to_path_buf();
                tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable entry");
                discovery.unreadable.push((path, e.to_string()));
                continue;
            }
        };
        let is_pdf = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
        if entry.file_type().is_file() && is_pdf {
            discovery.pdfs.push(entry.into_path());
        }
    }
    discovery.pdfs.sort();
    Ok(discovery)
}

/// Extract the text of one PDF off the async runtime.
pub async fn load_pdf(path: &Path) -> Result<SourceDocument> {
    let owned = path.to_path_buf();
    let text = tokio::task::spawn_blocking(move || {
        pdf_extract::extract_text(&owned).map_err(|e| e.to_string())
    })
    .await
    // pdf-extract panics on some malformed files
    .map_err(|e| AppError::Internal(format!("PDF extraction aborted: {}", e)))?
    .map_err(|e| AppError::Internal(format!("PDF extraction failed: {}", e)))?;

    Ok(SourceDocument::new(path.display().to_string(), text))
}

/// Load every PDF under `dir`. Unreadable files are skipped with a warning.
pub async fn load_directory(dir: &Path) -> Result<LoadReport> {
    let discovery = discover_pdfs(dir)?;
    let mut report = LoadReport {
        skipped: discovery.unreadable,
        ..LoadReport::default()
    };

    for path in discovery.pdfs {
        match load_pdf(&path).await {
            Ok(doc) if doc.text.trim().is_empty() => {
                tracing::warn!(path = %path.display(), "PDF has no extractable text, skipping");
                report.skipped.push((path, "no extractable text".to_string()));
            }
            Ok(doc) => {
                tracing::debug!(path = %path.display(), chars = doc.text.len(), "Loaded PDF");
                report.documents.push(doc);
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable PDF");
                report.skipped.push((path, e.to_string()));
            }
        }
    }

    Ok(report)
}
