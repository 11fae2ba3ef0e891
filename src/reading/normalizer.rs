// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Look-alike character correction for recognized text

/// Letter forms commonly misread in place of digits
const SUBSTITUTIONS: &[(char, char)] = &[
    ('O', '0'),
    ('o', '0'),
    ('D', '0'),
    ('I', '1'),
    ('l', '1'),
    ('S', '5'),
    ('s', '5'),
    ('Z', '2'),
    ('B', '8'),
];

/// Replace look-alike letters with digits
///
/// A one-to-one character map: the output has the same number of chars as the
/// input, so char offsets are shared between raw and normalized text.
pub fn normalize(text: &str) -> String {
    text.chars().map(substitute).collect()
}

fn substitute(c: char) -> char {
    SUBSTITUTIONS
        .iter()
        .find(|(from, _)| *from == c)
        .map(|(_, to)| *to)
        .unwrap_or(c)
}
