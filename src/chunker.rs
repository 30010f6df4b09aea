//! Recursive separator chunking with a fixed character overlap.
//!
//! Page text is first cut into *units* along the coarsest separator that works
//! (paragraph, then line, then word, then raw characters). Units are then packed
//! greedily into chunks; every chunk after the first on a page starts with the
//! last `overlap` characters of its predecessor.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ChunkError;
use crate::loader::PageRecord;

/// Default maximum chunk length in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;
/// Default number of characters shared by adjacent chunks.
pub const DEFAULT_CHUNK_OVERLAP: usize = 150;

/// Boundary used to split oversized text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Separator {
    /// Split after every occurrence of the literal (kept on the left piece).
    Literal(String),
    /// Split into raw character windows.
    Character,
}

impl Separator {
    /// Paragraph, line, word, character.
    pub fn default_hierarchy() -> Vec<Separator> {
        vec![
            Separator::Literal("\n\n".to_string()),
            Separator::Literal("\n".to_string()),
            Separator::Literal(" ".to_string()),
            Separator::Character,
        ]
    }
}

/// Chunking parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkConfig {
    /// Maximum chunk length in characters.
    pub chunk_size: usize,
    /// Characters shared between adjacent chunks of a page.
    pub overlap: usize,
    /// Separators tried from coarsest to finest.
    pub separators: Vec<Separator>,
}

impl ChunkConfig {
    /// Builds a validated config with the default separator hierarchy.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self, ChunkError> {
        let config = Self {
            chunk_size,
            overlap,
            separators: Separator::default_hierarchy(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks `chunk_size > overlap >= 0` and that no separator is empty.
    pub fn validate(&self) -> Result<(), ChunkError> {
        if self.chunk_size == 0 {
            return Err(ChunkError::InvalidConfig(
                "chunk_size must be positive".to_string(),
            ));
        }
        if self.overlap >= self.chunk_size {
            return Err(ChunkError::InvalidConfig(format!(
                "overlap {} must be smaller than chunk_size {}",
                self.overlap, self.chunk_size
            )));
        }
        if self
            .separators
            .iter()
            .any(|sep| matches!(sep, Separator::Literal(s) if s.is_empty()))
        {
            return Err(ChunkError::InvalidConfig(
                "separators must not be empty strings".to_string(),
            ));
        }
        Ok(())
    }

    // Units this long always fit behind a full overlap prefix.
    fn unit_budget(&self) -> usize {
        self.chunk_size - self.overlap
    }
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
            separators: Separator::default_hierarchy(),
        }
    }
}

/// A chunk of page text ready for embedding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// Chunk body.
    pub text: String,
    /// Source document path.
    pub source_path: String,
    /// Page the chunk was cut from.
    pub page_index: usize,
    /// Position of the chunk within the whole document.
    pub chunk_index: usize,
    /// First character offset inside the page text.
    pub char_start: usize,
    /// One past the last character offset inside the page text.
    pub char_end: usize,
}

/// A slice of a single text, addressed by character offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSpan {
    pub text: String,
    pub start: usize,
    pub end: usize,
}

/// Splits every page and numbers the chunks in document order.
pub fn split_pages(
    pages: &[PageRecord],
    config: &ChunkConfig,
) -> Result<Vec<ChunkRecord>, ChunkError> {
    config.validate()?;
    let mut chunks = Vec::new();
    for page in pages {
        if page.text.trim().is_empty() {
            debug!(page = page.page_index, "skipping page without text");
            continue;
        }
        for span in split_text(&page.text, config) {
            chunks.push(ChunkRecord {
                text: span.text,
                source_path: page.source_path.clone(),
                page_index: page.page_index,
                chunk_index: chunks.len(),
                char_start: span.start,
                char_end: span.end,
            });
        }
    }
    info!(
        "split {} page(s) into {} chunk(s) (size {}, overlap {})",
        pages.len(),
        chunks.len(),
        config.chunk_size,
        config.overlap
    );
    Ok(chunks)
}

/// Splits one text into overlapping spans. `config` is assumed valid.
pub fn split_text(text: &str, config: &ChunkConfig) -> Vec<TextSpan> {
    let mut units = Vec::new();
    split_units(text, &config.separators, config.unit_budget(), &mut units);

    let chars: Vec<char> = text.chars().collect();
    let span = |start: usize, end: usize| TextSpan {
        text: chars[start..end].iter().collect(),
        start,
        end,
    };

    let mut spans = Vec::new();
    let mut units = units.into_iter().map(|u| u.chars().count()).peekable();
    let mut pos = 0usize;
    let mut next_start = 0usize;
    while let Some(unit_len) = units.next() {
        // An indivisible unit that cannot sit behind the overlap stands alone.
        let start = if pos - next_start + unit_len > config.chunk_size {
            pos
        } else {
            next_start
        };
        let mut end = pos + unit_len;
        while let Some(&next_len) = units.peek() {
            if end - start + next_len > config.chunk_size {
                break;
            }
            units.next();
            end += next_len;
        }
        spans.push(span(start, end));
        pos = end;
        next_start = end - config.overlap.min(end - start);
    }
    spans
}

fn split_units<'a>(text: &'a str, separators: &[Separator], budget: usize, out: &mut Vec<&'a str>) {
    if text.is_empty() {
        return;
    }
    if text.chars().count() <= budget {
        out.push(text);
        return;
    }
    let Some((separator, finer)) = separators.split_first() else {
        out.push(text);
        return;
    };
    match separator {
        Separator::Character => {
            let mut rest = text;
            while !rest.is_empty() {
                let cut = rest
                    .char_indices()
                    .nth(budget)
                    .map_or(rest.len(), |(idx, _)| idx);
                let (head, tail) = rest.split_at(cut);
                out.push(head);
                rest = tail;
            }
        }
        Separator::Literal(sep) => {
            for piece in text.split_inclusive(sep.as_str()) {
                split_units(piece, finer, budget, out);
            }
        }
    }
}
