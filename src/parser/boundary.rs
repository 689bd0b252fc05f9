use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::tables::BLOCK_KEYWORDS;

static KEYWORD_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    BLOCK_KEYWORDS
        .iter()
        .map(|kw| Regex::new(&format!(r"(?i)\b{}\b", regex::escape(kw))).unwrap())
        .collect()
});

pub const DEFAULT_DELIMITER: &str = "---";

/// Gate applied to the text in front of a candidate delimiter.
#[derive(Debug, Clone)]
pub struct BoundaryConfig {
    /// Minimum length in characters.
    pub min_length: usize,
    /// Minimum number of distinct keywords present.
    pub min_keywords: usize,
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        Self {
            min_length: 100,
            min_keywords: 2,
        }
    }
}

/// Whether `content` looks like a complete spell entry: long enough and
/// mentioning enough spell keywords (whole word, any case).
pub fn is_valid_block(content: &str, config: &BoundaryConfig) -> bool {
    if content.chars().count() < config.min_length {
        return false;
    }
    let mut hits = 0;
    for re in KEYWORD_RES.iter() {
        if re.is_match(content) {
            hits += 1;
            if hits >= config.min_keywords {
                return true;
            }
        }
    }
    hits >= config.min_keywords
}

/// Offset of the first delimiter that closes a valid spell block. Candidates
/// whose preceding text fails the gate are skipped, and the scan resumes just
/// past them.
pub fn find_block_end(buffer: &str, delimiter: &str, config: &BoundaryConfig) -> Option<usize> {
    let step = delimiter.chars().next()?.len_utf8();
    let mut start = 0;
    while start < buffer.len() {
        let pos = start + buffer[start..].find(delimiter)?;
        if is_valid_block(&buffer[..pos], config) {
            return Some(pos);
        }
        debug!("Skipping delimiter at offset {} (preceding text is not a spell block)", pos);
        start = pos + step;
    }
    None
}

/// Split on every delimiter, dropping whitespace-only pieces.
pub fn split_blocks<'a>(buffer: &'a str, delimiter: &str) -> Vec<&'a str> {
    if delimiter.is_empty() {
        return if buffer.trim().is_empty() { Vec::new() } else { vec![buffer] };
    }
    buffer
        .split(delimiter)
        .filter(|b| !b.trim().is_empty())
        .collect()
}

/// Split only at delimiters accepted by [`find_block_end`]. Whatever is left
/// when no further boundary is found becomes the final block.
pub fn split_detected<'a>(buffer: &'a str, delimiter: &str, config: &BoundaryConfig) -> Vec<&'a str> {
    let mut blocks = Vec::new();
    let mut rest = buffer;
    while let Some(end) = find_block_end(rest, delimiter, config) {
        blocks.push(&rest[..end]);
        rest = &rest[end + delimiter.len()..];
    }
    if !rest.trim().is_empty() {
        blocks.push(rest);
    }
    blocks
}
