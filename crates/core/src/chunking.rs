use crate::error::IngestError;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CHUNK_MAX_CHARS: usize = 200;
pub const DEFAULT_CHUNK_OVERLAP_CHARS: usize = 20;

/// Overlap budget that maps to one carried sentence in [`OverlapMode::SentenceCount`].
const CHARS_PER_CARRIED_SENTENCE: usize = 50;
const SENTENCE_BOUNDARY: &str = r"[.!?]\s+";

/// How continuity between neighbouring chunks is approximated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapMode {
    /// Carry `overlap_chars / 50` trailing sentences (at least one when overlap is non-zero).
    #[default]
    SentenceCount,
    /// Carry as many trailing sentences as fit in `overlap_chars`.
    Characters,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingConfig {
    pub max_chars: usize,
    pub overlap_chars: usize,
    #[serde(default)]
    pub overlap_mode: OverlapMode,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chars: DEFAULT_CHUNK_MAX_CHARS,
            overlap_chars: DEFAULT_CHUNK_OVERLAP_CHARS,
            overlap_mode: OverlapMode::default(),
        }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<(), IngestError> {
        if self.max_chars == 0 {
            return Err(IngestError::InvalidChunkConfig(
                "max_chars must be greater than zero".to_string(),
            ));
        }
        if self.overlap_chars >= self.max_chars {
            return Err(IngestError::InvalidChunkConfig(format!(
                "overlap_chars {} must be smaller than max_chars {}",
                self.overlap_chars, self.max_chars
            )));
        }
        Ok(())
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Splits after `.`, `!` or `?` followed by whitespace. Blank pieces are dropped.
pub fn split_sentences(text: &str) -> Result<Vec<&str>, IngestError> {
    let boundary = Regex::new(SENTENCE_BOUNDARY)?;
    let mut sentences = Vec::new();
    let mut start = 0;

    for found in boundary.find_iter(text) {
        // the terminator is a single ASCII byte and stays with its sentence
        let sentence = text[start..found.start() + 1].trim();
        if !sentence.is_empty() {
            sentences.push(sentence);
        }
        start = found.end();
    }

    let tail = text[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }

    Ok(sentences)
}

/// Splits `text` into sentence-aligned chunks of at most `max_chars` characters.
///
/// A chunk only exceeds the limit when it is a single word longer than the
/// limit. Sentences longer than the limit are split on word boundaries and
/// emitted in place, so chunk order always follows the source text.
pub fn chunk_text(text: &str, config: &ChunkingConfig) -> Result<Vec<String>, IngestError> {
    config.validate()?;

    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    // sentence lengths plus one separator each
    let mut current_size = 0usize;

    for sentence in split_sentences(text)? {
        let length = char_len(sentence);

        if length > config.max_chars {
            if !current.is_empty() {
                chunks.push(current.join(" "));
                current.clear();
                current_size = 0;
            }
            chunks.extend(split_words(sentence, config.max_chars));
            continue;
        }

        if current.is_empty() || current_size + length + 1 <= config.max_chars {
            current.push(sentence);
            current_size += length + 1;
            continue;
        }

        chunks.push(current.join(" "));

        let mut seed = carried_sentences(&current, config);
        let mut seed_size: usize = seed.iter().map(|carried| char_len(carried) + 1).sum();
        while !seed.is_empty() && seed_size + length + 1 > config.max_chars {
            seed_size -= char_len(seed.remove(0)) + 1;
        }

        seed.push(sentence);
        current = seed;
        current_size = seed_size + length + 1;
    }

    if !current.is_empty() {
        chunks.push(current.join(" "));
    }

    Ok(chunks)
}

fn carried_sentences<'a>(closed: &[&'a str], config: &ChunkingConfig) -> Vec<&'a str> {
    if config.overlap_chars == 0 {
        return Vec::new();
    }

    match config.overlap_mode {
        OverlapMode::SentenceCount => {
            let count = (config.overlap_chars / CHARS_PER_CARRIED_SENTENCE).max(1);
            closed[closed.len().saturating_sub(count)..].to_vec()
        }
        OverlapMode::Characters => {
            let mut carried = Vec::new();
            let mut size = 0;
            for sentence in closed.iter().rev() {
                let length = char_len(sentence) + 1;
                if size + length > config.overlap_chars {
                    break;
                }
                size += length;
                carried.push(*sentence);
            }
            carried.reverse();
            carried
        }
    }
}

/// Greedy word packing for a sentence that does not fit in one chunk.
fn split_words(sentence: &str, max_chars: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut size = 0usize;

    for word in sentence.split_whitespace() {
        let length = char_len(word);
        if !current.is_empty() && size + 1 + length > max_chars {
            pieces.push(current.join(" "));
            current.clear();
        }

        size = if current.is_empty() {
            length
        } else {
            size + 1 + length
        };
        current.push(word);
    }

    if !current.is_empty() {
        pieces.push(current.join(" "));
    }

    pieces
}
