//! Case folding and diacritic removal over decoded units.
//!
//! Normalization never rewrites the source buffer. It produces a parallel
//! mapping: one normalized codepoint per retained unit plus the original
//! byte span that unit covers. Elided combining marks extend the span of the
//! unit before them, so highlight spans always bracket the marks.

use std::ops::Range;

use crate::config::TrigramConfig;
use crate::decode::{DecodedUnit, SENTINEL};

/// Normalization strategy, fixed per tokenizer instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Normalizer {
    /// `case_sensitive 1`: codepoints pass through untouched.
    Exact,
    /// Default: ASCII `A-Z` fold to `a-z`.
    #[default]
    FoldCase,
    /// `remove_diacritics 1`: fold case, reduce precomposed letters to their
    /// base letter and elide combining marks.
    FoldCaseStripDiacritics,
}

impl Normalizer {
    #[must_use]
    pub const fn for_config(config: TrigramConfig) -> Self {
        if config.strips_diacritics() {
            Self::FoldCaseStripDiacritics
        } else if config.folds_case() {
            Self::FoldCase
        } else {
            Self::Exact
        }
    }

    #[must_use]
    pub const fn folds_case(self) -> bool {
        !matches!(self, Self::Exact)
    }

    #[must_use]
    pub const fn strips_diacritics(self) -> bool {
        matches!(self, Self::FoldCaseStripDiacritics)
    }

    /// Normalize a single codepoint. Combining marks are not elided here;
    /// see [`Normalizer::elides`].
    #[must_use]
    pub fn fold(self, codepoint: u32) -> u32 {
        match self {
            Self::Exact => codepoint,
            Self::FoldCase => fold_ascii(codepoint),
            Self::FoldCaseStripDiacritics => fold_ascii(strip_diacritic(codepoint)),
        }
    }

    /// Whether `codepoint` is a combining mark this strategy removes.
    #[must_use]
    pub fn elides(self, codepoint: u32) -> bool {
        self.strips_diacritics() && is_combining_mark(codepoint)
    }

    /// Normalize a decoded unit sequence.
    #[must_use]
    pub fn normalize(self, units: &[DecodedUnit]) -> Normalized {
        let mut out = Normalized::with_capacity(units.len());

        for unit in units {
            let span = unit.byte_offset..unit.end();
            if self.elides(unit.codepoint) {
                if let Some(prev) = out.spans.last_mut() {
                    prev.end = span.end;
                } else {
                    // A mark with nothing to attach to stays as an opaque unit.
                    out.push(SENTINEL, span);
                }
                continue;
            }
            out.push(self.fold(unit.codepoint), span);
        }

        out
    }
}

/// Normalized codepoints with the original byte span of each.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Normalized {
    codepoints: Vec<u32>,
    spans: Vec<Range<usize>>,
}

impl Normalized {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            codepoints: Vec::with_capacity(capacity),
            spans: Vec::with_capacity(capacity),
        }
    }

    fn push(&mut self, codepoint: u32, span: Range<usize>) {
        self.codepoints.push(codepoint);
        self.spans.push(span);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.codepoints.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.codepoints.is_empty()
    }

    #[must_use]
    pub fn codepoints(&self) -> &[u32] {
        &self.codepoints
    }

    /// Original byte span per normalized codepoint, parallel to
    /// [`Normalized::codepoints`].
    #[must_use]
    pub fn spans(&self) -> &[Range<usize>] {
        &self.spans
    }
}

fn fold_ascii(codepoint: u32) -> u32 {
    if (u32::from(b'A')..=u32::from(b'Z')).contains(&codepoint) {
        codepoint + 0x20
    } else {
        codepoint
    }
}

/// Combining diacritical mark blocks (all general category Mn or Me).
///
/// U+0300..U+036F Combining Diacritical Marks, U+1AB0..U+1AFF Extended,
/// U+1DC0..U+1DFF Supplement, U+20D0..U+20FF for Symbols, U+FE20..U+FE2F
/// Half Marks.
#[must_use]
pub fn is_combining_mark(codepoint: u32) -> bool {
    matches!(
        codepoint,
        0x0300..=0x036F | 0x1AB0..=0x1AFF | 0x1DC0..=0x1DFF | 0x20D0..=0x20FF | 0xFE20..=0xFE2F
    )
}

/// Reduce a precomposed Latin letter to its base letter, keeping its case.
///
/// Covers the Latin-1 Supplement and Latin Extended-A blocks. Ligatures
/// and letters without a single-letter base (`Æ`, `ß`, `Þ`, `Œ`) pass through.
#[must_use]
pub fn strip_diacritic(codepoint: u32) -> u32 {
    let Some(ch) = char::from_u32(codepoint) else {
        return codepoint;
    };
    let base = match ch {
        '\u{00C0}'..='\u{00C5}' | '\u{00E0}'..='\u{00E5}' | '\u{0100}'..='\u{0105}' => 'A',
        '\u{00C7}' | '\u{00E7}' | '\u{0106}'..='\u{010D}' => 'C',
        '\u{010E}'..='\u{0111}' => 'D',
        '\u{00C8}'..='\u{00CB}' | '\u{00E8}'..='\u{00EB}' | '\u{0112}'..='\u{011B}' => 'E',
        '\u{011C}'..='\u{0123}' => 'G',
        '\u{0124}'..='\u{0127}' => 'H',
        '\u{00CC}'..='\u{00CF}' | '\u{00EC}'..='\u{00EF}' | '\u{0128}'..='\u{0131}' => 'I',
        '\u{0134}' | '\u{0135}' => 'J',
        '\u{0136}' | '\u{0137}' => 'K',
        '\u{0139}'..='\u{0142}' => 'L',
        '\u{00D1}' | '\u{00F1}' | '\u{0143}'..='\u{0148}' => 'N',
        '\u{00D2}'..='\u{00D6}'
        | '\u{00D8}'
        | '\u{00F2}'..='\u{00F6}'
        | '\u{00F8}'
        | '\u{014C}'..='\u{0151}' => 'O',
        '\u{0154}'..='\u{0159}' => 'R',
        '\u{015A}'..='\u{0161}' => 'S',
        '\u{0162}'..='\u{0167}' => 'T',
        '\u{00D9}'..='\u{00DC}' | '\u{00F9}'..='\u{00FC}' | '\u{0168}'..='\u{0173}' => 'U',
        '\u{0174}' | '\u{0175}' => 'W',
        '\u{00DD}' | '\u{00FD}' | '\u{00FF}' | '\u{0176}'..='\u{0178}' => 'Y',
        '\u{0179}'..='\u{017E}' => 'Z',
        _ => return codepoint,
    };
    let base = if ch.is_uppercase() {
        base
    } else {
        base.to_ascii_lowercase()
    };
    u32::from(base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::decode;

    fn cps(text: &str) -> Vec<u32> {
        text.chars().map(u32::from).collect()
    }

    fn run(normalizer: Normalizer, text: &str) -> Normalized {
        normalizer.normalize(&decode(text.as_bytes()))
    }

    #[test]
    fn test_for_config() {
        let exact = TrigramConfig::new(true, false).unwrap();
        let fold = TrigramConfig::default();
        let strip = TrigramConfig::new(false, true).unwrap();
        assert_eq!(Normalizer::for_config(exact), Normalizer::Exact);
        assert_eq!(Normalizer::for_config(fold), Normalizer::FoldCase);
        assert_eq!(
            Normalizer::for_config(strip),
            Normalizer::FoldCaseStripDiacritics
        );
    }

    #[test]
    fn test_ascii_fold_only() {
        let out = run(Normalizer::FoldCase, "AbC\u{00C9}\u{0416}");
        // Only ASCII letters fold; É and Ж are untouched.
        assert_eq!(out.codepoints(), cps("abc\u{00C9}\u{0416}").as_slice());
    }

    #[test]
    fn test_exact_keeps_case() {
        let out = run(Normalizer::Exact, "AbC");
        assert_eq!(out.codepoints(), cps("AbC").as_slice());
    }

    #[test]
    fn test_thai_unaffected() {
        let text = "กรุงเทพ";
        let out = run(Normalizer::FoldCaseStripDiacritics, text);
        assert_eq!(out.codepoints(), cps(text).as_slice());
    }

    #[test]
    fn test_precomposed_reduced_in_place() {
        let out = run(Normalizer::FoldCaseStripDiacritics, "b\u{00E3}c");
        assert_eq!(out.codepoints(), cps("bac").as_slice());
        assert_eq!(out.spans(), &[0..1, 1..3, 3..4]);
    }

    #[test]
    fn test_precomposed_uppercase_folds() {
        let out = run(Normalizer::FoldCaseStripDiacritics, "\u{00C3}\u{0160}");
        assert_eq!(out.codepoints(), cps("as").as_slice());
    }

    #[test]
    fn test_combining_mark_merged_into_previous_span() {
        let out = run(Normalizer::FoldCaseStripDiacritics, "abc\u{0303}d");
        assert_eq!(out.codepoints(), cps("abcd").as_slice());
        assert_eq!(out.spans(), &[0..1, 1..2, 2..5, 5..6]);
    }

    #[test]
    fn test_consecutive_marks_all_merge() {
        let out = run(Normalizer::FoldCaseStripDiacritics, "a\u{0301}\u{0323}b");
        assert_eq!(out.codepoints(), cps("ab").as_slice());
        assert_eq!(out.spans(), &[0..5, 5..6]);
    }

    #[test]
    fn test_leading_mark_is_opaque_unit() {
        let out = run(Normalizer::FoldCaseStripDiacritics, "\u{0303}abc\u{0303}");
        assert_eq!(out.codepoints(), &[SENTINEL, 0x61, 0x62, 0x63]);
        assert_eq!(out.spans(), &[0..2, 2..3, 3..4, 4..7]);
    }

    #[test]
    fn test_marks_kept_without_stripping() {
        let out = run(Normalizer::FoldCase, "a\u{0303}");
        assert_eq!(out.codepoints(), &[0x61, 0x0303]);
    }

    #[test]
    fn test_sentinel_passes_through() {
        let out = Normalizer::FoldCaseStripDiacritics.normalize(&decode(&[0x41, 0xC0, 0xAF]));
        assert_eq!(out.codepoints(), &[0x61, SENTINEL]);
    }

    #[test]
    fn test_strip_diacritic_table() {
        assert_eq!(strip_diacritic(0x00E9), u32::from('e')); // é
        assert_eq!(strip_diacritic(0x00FC), u32::from('u')); // ü
        assert_eq!(strip_diacritic(0x00D1), u32::from('N')); // Ñ
        assert_eq!(strip_diacritic(0x0141), u32::from('L')); // Ł
        assert_eq!(strip_diacritic(0x0142), u32::from('l')); // ł
        assert_eq!(strip_diacritic(0x017E), u32::from('z')); // ž
        assert_eq!(strip_diacritic(0x00C6), 0x00C6); // Æ unchanged
        assert_eq!(strip_diacritic(u32::from('q')), u32::from('q'));
        assert_eq!(strip_diacritic(SENTINEL), SENTINEL);
    }

    #[test]
    fn test_is_combining_mark() {
        assert!(is_combining_mark(0x0303));
        assert!(is_combining_mark(0x20D7));
        assert!(!is_combining_mark(u32::from('a')));
        assert!(!is_combining_mark(0x0E38)); // Thai sara u is outside the fixed set
    }
}
