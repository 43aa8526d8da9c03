//! Block descriptor: the ordered (sequence, fps) list queued for one preload/playback cycle
//!
//! Descriptors arrive from the experiment control side in several shapes:
//! - JSON: `[["seqs/a.txt", 10], ["seqs/b.txt", 5]]`
//! - Python tuple list: `[('seqs/a.txt', 10), ("seqs/b.txt", 5)]`
//! - an array of character codes (MATLAB char arrays) holding either of the above
//!
//! Backslashes inside references are kept literally (Windows paths).

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::error::BlockInfoError;

/// `('path', 10)` / `("path", 10)` entries of a Python-style tuple list
static TUPLE_ENTRY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\(\s*(?:'([^']*)'|"([^"]*)")\s*,\s*(-?\d+)\s*,?\s*\)"#)
        .expect("tuple entry regex is valid")
});

/// One sequence of a block and the rate it is played at
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(String, u32)", into = "(String, u32)")]
pub struct BlockEntry {
    pub sequence: String,
    pub fps: u32,
}

impl From<(String, u32)> for BlockEntry {
    fn from((sequence, fps): (String, u32)) -> Self {
        Self { sequence, fps }
    }
}

impl From<BlockEntry> for (String, u32) {
    fn from(e: BlockEntry) -> Self {
        (e.sequence, e.fps)
    }
}

/// Ordered list of sequences for one block
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockInfo {
    entries: Vec<BlockEntry>,
}

impl BlockInfo {
    pub fn new(entries: Vec<BlockEntry>) -> Self {
        Self { entries }
    }

    /// Convenience constructor from `(reference, fps)` pairs
    pub fn from_pairs<S: Into<String>>(pairs: impl IntoIterator<Item = (S, u32)>) -> Self {
        Self {
            entries: pairs
                .into_iter()
                .map(|(s, fps)| BlockEntry { sequence: s.into(), fps })
                .collect(),
        }
    }

    pub fn entries(&self) -> &[BlockEntry] {
        &self.entries
    }

    pub fn get(&self, idx: usize) -> Option<&BlockEntry> {
        self.entries.get(idx)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BlockEntry> {
        self.entries.iter()
    }

    /// Parse a descriptor given as JSON or as a Python-style tuple list
    pub fn parse(text: &str) -> Result<Self, BlockInfoError> {
        let text = text.trim();

        if let Ok(pairs) = serde_json::from_str::<Vec<(String, i64)>>(text) {
            return Self::validated(pairs);
        }

        Self::validated(parse_tuple_list(text)?)
    }

    /// Decode a character-code array, then [`parse`](Self::parse) it
    pub fn from_char_codes(codes: &[f64]) -> Result<Self, BlockInfoError> {
        let text = codes
            .iter()
            .map(|&c| {
                if c.fract() != 0.0 || c < 0.0 {
                    return Err(BlockInfoError::CharCode(c));
                }
                char::from_u32(c as u32).ok_or(BlockInfoError::CharCode(c))
            })
            .collect::<Result<String, _>>()?;
        Self::parse(&text)
    }

    fn validated(pairs: Vec<(String, i64)>) -> Result<Self, BlockInfoError> {
        let entries = pairs
            .into_iter()
            .map(|(sequence, fps)| {
                if fps <= 0 || fps > u32::MAX as i64 {
                    return Err(BlockInfoError::InvalidFps { reference: sequence, fps });
                }
                Ok(BlockEntry { sequence, fps: fps as u32 })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { entries })
    }
}

/// Parse `[('a', 1), ("b", 2)]`, rejecting anything between entries except separators
fn parse_tuple_list(text: &str) -> Result<Vec<(String, i64)>, BlockInfoError> {
    let inner = text
        .strip_prefix('[')
        .and_then(|t| t.strip_suffix(']'))
        .ok_or_else(|| BlockInfoError::Malformed(text.to_string()))?;

    let is_separator = |gap: &str| gap.chars().all(|c| c == ',' || c.is_whitespace());

    let mut pairs = Vec::new();
    let mut last_end = 0;
    for caps in TUPLE_ENTRY.captures_iter(inner) {
        let whole = caps.get(0).ok_or_else(|| BlockInfoError::Malformed(text.to_string()))?;
        if !is_separator(&inner[last_end..whole.start()]) {
            return Err(BlockInfoError::Malformed(text.to_string()));
        }
        last_end = whole.end();

        let reference = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();
        let fps = caps[3]
            .parse::<i64>()
            .map_err(|_| BlockInfoError::Malformed(text.to_string()))?;
        pairs.push((reference, fps));
    }

    if !is_separator(&inner[last_end..]) {
        return Err(BlockInfoError::Malformed(text.to_string()));
    }
    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json() {
        let b = BlockInfo::parse(r#"[["seqs/a.txt", 10], ["seqs/b.txt", 5]]"#).unwrap();
        assert_eq!(b.len(), 2);
        assert_eq!(b.entries()[1], BlockEntry { sequence: "seqs/b.txt".into(), fps: 5 });
    }

    #[test]
    fn test_parse_python_tuples() {
        let b = BlockInfo::parse(r#"[('C:\data\a.txt', 10), ("b.txt", 25),]"#).unwrap();
        assert_eq!(
            b,
            BlockInfo::from_pairs([(r"C:\data\a.txt", 10), ("b.txt", 25)])
        );
    }

    #[test]
    fn test_parse_empty_list() {
        assert!(BlockInfo::parse("[]").unwrap().is_empty());
    }

    #[test]
    fn test_reject_non_positive_fps() {
        let err = BlockInfo::parse(r#"[("a.txt", 0)]"#).unwrap_err();
        assert!(matches!(err, BlockInfoError::InvalidFps { fps: 0, .. }));
    }

    #[test]
    fn test_reject_garbage() {
        assert!(BlockInfo::parse("seqs/a.txt").is_err());
        assert!(BlockInfo::parse(r#"[("a.txt", 10) junk]"#).is_err());
        assert!(BlockInfo::parse(r#"[("a.txt", 10.5)]"#).is_err());
    }

    #[test]
    fn test_from_char_codes() {
        let codes: Vec<f64> = "[('a.txt', 10)]".chars().map(|c| c as u32 as f64).collect();
        let b = BlockInfo::from_char_codes(&codes).unwrap();
        assert_eq!(b, BlockInfo::from_pairs([("a.txt", 10)]));

        assert!(matches!(
            BlockInfo::from_char_codes(&[91.5]),
            Err(BlockInfoError::CharCode(_))
        ));
    }

    #[test]
    fn test_serde_as_pairs() {
        let b = BlockInfo::from_pairs([("a.txt", 10)]);
        assert_eq!(serde_json::to_string(&b).unwrap(), r#"[["a.txt",10]]"#);
    }
}
