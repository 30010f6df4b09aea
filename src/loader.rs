//! PDF loading: one [`PageRecord`] per page, in page-tree order.

use std::io::ErrorKind;
use std::path::Path;

use lopdf::Document;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::LoadError;

/// Text extracted from a single PDF page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRecord {
    /// Path of the source document as given by the caller.
    pub source_path: String,
    /// Zero-based page position.
    pub page_index: usize,
    /// Extracted page text.
    pub text: String,
}

/// Reads `path` and extracts the text of every page.
pub fn load_pdf(path: &Path) -> Result<Vec<PageRecord>, LoadError> {
    info!("loading PDF {}", path.display());
    let bytes = std::fs::read(path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => LoadError::NotFound(path.to_path_buf()),
        _ => LoadError::Io {
            path: path.to_path_buf(),
            source,
        },
    })?;
    let document = Document::load_mem(&bytes).map_err(|err| LoadError::CorruptDocument {
        path: path.to_path_buf(),
        reason: err.to_string(),
    })?;

    let source_path = path.display().to_string();
    // get_pages is keyed by 1-based page number, so iteration follows page order.
    let pages = document.get_pages();
    let mut records = Vec::with_capacity(pages.len());
    for (page_index, page_number) in pages.keys().copied().enumerate() {
        let text =
            document
                .extract_text(&[page_number])
                .map_err(|err| LoadError::CorruptDocument {
                    path: path.to_path_buf(),
                    reason: format!("page {page_number}: {err}"),
                })?;
        debug!(page = page_number, chars = text.chars().count(), "extracted page text");
        records.push(PageRecord {
            source_path: source_path.clone(),
            page_index,
            text,
        });
    }
    info!("loaded {} page(s) from {}", records.len(), source_path);
    Ok(records)
}
