// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Line-aware digit-run extraction
//!
//! Lines containing letters are skipped unless they also carry a volumetric
//! unit marker (`m3` / `m³`), since the unit usually sits right beside the
//! counter digits. Every maximal digit run of a surviving line is a candidate.

use regex::Regex;
use std::sync::OnceLock;

/// A digit run found in normalized text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub digits: String,
    /// Zero-based line number in the text
    pub line_index: usize,
    /// Char offset of the first digit within the whole text
    pub offset: usize,
}

impl Candidate {
    /// Length in chars (digits are ASCII, so also bytes)
    pub fn len(&self) -> usize {
        self.digits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.digits.is_empty()
    }

    /// Char offset one past the last digit
    pub fn end(&self) -> usize {
        self.offset + self.len()
    }
}

fn digit_run_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[0-9]+").unwrap())
}

fn unit_marker_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)m[3³]").unwrap())
}

/// Whether `text` contains `m3` or `m³`, any case
pub fn contains_unit_marker(text: &str) -> bool {
    unit_marker_regex().is_match(text)
}

/// Whether a line survives the letter filter
pub fn is_candidate_line(line: &str) -> bool {
    !line.chars().any(char::is_alphabetic) || contains_unit_marker(line)
}

/// Extract every digit run from the surviving lines, in scan order
pub fn extract_candidates(normalized: &str) -> Vec<Candidate> {
    let mut candidates = Vec::new();
    let mut line_start = 0usize;

    for (line_index, line) in normalized.split('\n').enumerate() {
        if is_candidate_line(line) {
            for m in digit_run_regex().find_iter(line) {
                let char_start = line[..m.start()].chars().count();
                candidates.push(Candidate {
                    digits: m.as_str().to_string(),
                    line_index,
                    offset: line_start + char_start,
                });
            }
        }
        line_start += line.chars().count() + 1;
    }

    candidates
}

/// First candidate of exactly five digits, else the first of exactly four
pub fn exact_length_match(candidates: &[Candidate]) -> Option<&Candidate> {
    candidates
        .iter()
        .find(|c| c.len() == 5)
        .or_else(|| candidates.iter().find(|c| c.len() == 4))
}
