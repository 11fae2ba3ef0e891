// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Candidate scoring and selection
//!
//! Two additive scorers with independent weight scales:
//! - fine: ranks digit runs inside one recognized text using their context
//! - coarse: ranks the per-variant readings against each other
//!
//! Both break ties by first occurrence.

use tracing::debug;

use super::extractor::{contains_unit_marker, exact_length_match, Candidate};

/// Chars of context taken on each side of a candidate
pub const CONTEXT_WINDOW: usize = 20;

/// Upper bound of a plausible meter value
pub const MAX_READING_VALUE: u64 = 9_999_999;

const BRACKET_GLYPHS: &[char] = &['□', '■', '[', ']'];

const TECHNICAL_KEYWORDS: &[&str] = &["mm", "bar", "pn", "dn", "kg", "mpa", "cert", "no"];

const BRAND_NAMES: &[&str] = &[
    "sensus",
    "itron",
    "elster",
    "kamstrup",
    "zenner",
    "diehl",
    "apator",
    "maddalena",
    "honeywell",
    "arad",
];

fn parse_value(digits: &str) -> Option<u64> {
    digits.parse().ok()
}

fn is_plausible_value(value: Option<u64>) -> bool {
    matches!(value, Some(v) if v > 0 && v <= MAX_READING_VALUE)
}

/// Text a candidate is scored against
///
/// `raw` and `normalized` have the same char count, so candidate offsets
/// index both.
pub struct ScoringContext {
    raw: Vec<char>,
    normalized: Vec<char>,
}

impl ScoringContext {
    pub fn new(raw: &str, normalized: &str) -> Self {
        Self {
            raw: raw.chars().collect(),
            normalized: normalized.chars().collect(),
        }
    }

    /// Lowercased raw text within `CONTEXT_WINDOW` chars of the candidate
    fn window(&self, candidate: &Candidate) -> String {
        let start = candidate.offset.saturating_sub(CONTEXT_WINDOW);
        let end = (candidate.end() + CONTEXT_WINDOW).min(self.raw.len());
        if start >= end {
            return String::new();
        }
        self.raw[start..end].iter().collect::<String>().to_lowercase()
    }

    /// Whitespace-delimited raw token holding the candidate
    fn token(&self, candidate: &Candidate) -> String {
        let len = self.raw.len();
        let mut start = candidate.offset.min(len);
        while start > 0 && !self.raw[start - 1].is_whitespace() {
            start -= 1;
        }
        let mut end = candidate.end().min(len);
        while end < len && !self.raw[end].is_whitespace() {
            end += 1;
        }
        self.raw[start..end].iter().collect()
    }

    fn neighbor_is_alphabetic(&self, candidate: &Candidate) -> bool {
        let before = candidate
            .offset
            .checked_sub(1)
            .and_then(|i| self.normalized.get(i));
        let after = self.normalized.get(candidate.end());
        before.is_some_and(|c| c.is_alphabetic()) || after.is_some_and(|c| c.is_alphabetic())
    }

    fn occupies_whole_line(&self, candidate: &Candidate) -> bool {
        let len = self.normalized.len();
        let mut start = candidate.offset.min(len);
        while start > 0 && self.normalized[start - 1] != '\n' {
            start -= 1;
        }
        let mut end = candidate.end().min(len);
        while end < len && self.normalized[end] != '\n' {
            end += 1;
        }
        let line: String = self.normalized[start..end].iter().collect();
        line.trim() == candidate.digits
    }
}

/// Context-aware score of one candidate within its recognized text
pub fn fine_score(candidate: &Candidate, ctx: &ScoringContext) -> i32 {
    let digits = candidate.digits.as_str();
    let value = parse_value(digits);
    let window = ctx.window(candidate);
    let mut score = 0;

    score += match candidate.len() {
        6 | 7 => 100,
        5 => 80,
        4 => 60,
        3 => 20,
        n if n >= 8 => -30,
        _ => 0,
    };

    if contains_unit_marker(&window) {
        score += 50;
    }
    if window.contains(BRACKET_GLYPHS) {
        score += 40;
    }
    if ctx.token(candidate).contains(|c: char| c == '-' || c == '.') {
        score -= 80;
    }
    if ctx.neighbor_is_alphabetic(candidate) {
        score -= 30;
    }
    if TECHNICAL_KEYWORDS.iter().any(|k| window.contains(*k)) {
        score -= 40;
    }
    if matches!(value, Some(v) if (2000..=2030).contains(&v)) {
        score -= 60;
    }
    if BRAND_NAMES.iter().any(|b| window.contains(*b)) {
        score += 10;
    }

    if is_plausible_value(value) {
        score += 15;
    } else if value == Some(0) && candidate.len() > 3 {
        score += 5;
    }

    if ctx.occupies_whole_line(candidate) {
        score += 30;
    }
    if digits.starts_with("000") && candidate.len() >= 6 {
        score += 35;
    }

    score
}

/// Highest fine score wins; ties keep the earliest candidate
pub fn select_by_score<'a>(candidates: &'a [Candidate], ctx: &ScoringContext) -> Option<&'a Candidate> {
    let mut best: Option<(&Candidate, i32)> = None;
    for candidate in candidates {
        let score = fine_score(candidate, ctx);
        debug!("Candidate {} scored {}", candidate.digits, score);
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((candidate, score));
        }
    }
    best.map(|(c, _)| c)
}

/// Pick the reading of one recognized text
///
/// An exact 5-digit (then 4-digit) run wins outright; otherwise fine scoring
/// decides. Returns `None` when no candidate exists.
pub fn select_candidate<'a>(
    candidates: &'a [Candidate],
    raw: &str,
    normalized: &str,
) -> Option<&'a Candidate> {
    if let Some(exact) = exact_length_match(candidates) {
        return Some(exact);
    }
    select_by_score(candidates, &ScoringContext::new(raw, normalized))
}

/// Context-free score of a per-variant reading
pub fn coarse_score(reading: &str) -> i32 {
    let len = reading.chars().count();
    let mut score = 0;

    if len >= 6 {
        score += 50;
    } else if len >= 4 {
        score += 30;
    } else if len >= 3 {
        score += 10;
    }

    if is_plausible_value(parse_value(reading)) {
        score += 25;
    }
    if !reading.starts_with("20") && !reading.contains("2024") {
        score += 15;
    }

    score
}

/// Index of the winning per-variant reading
///
/// The first 5-digit reading wins, then the first 4-digit one; otherwise the
/// highest coarse score. Empty readings never win. `None` when all are empty.
pub fn select_best_variant<S: AsRef<str>>(readings: &[S]) -> Option<usize> {
    let lens: Vec<usize> = readings.iter().map(|r| r.as_ref().chars().count()).collect();

    if let Some(i) = lens.iter().position(|&l| l == 5) {
        return Some(i);
    }
    if let Some(i) = lens.iter().position(|&l| l == 4) {
        return Some(i);
    }

    let mut best: Option<(usize, i32)> = None;
    for (i, reading) in readings.iter().enumerate() {
        let reading = reading.as_ref();
        if reading.is_empty() {
            continue;
        }
        let score = coarse_score(reading);
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((i, score));
        }
    }
    best.map(|(i, _)| i)
}
