//! The `better_trigram` tokenizer.
//!
//! Text flows through three stages: bytes are decoded into units, units are
//! normalized per configuration, and a window of three normalized codepoints
//! slides across the result. Each token reports the original byte span of
//! its three units, so highlighting always brackets the unfolded source text.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::TrigramConfig;
use crate::decode::{SENTINEL, decode};
use crate::error::{Result, TrigramError};
use crate::normalize::{Normalized, Normalizer};

/// Name the tokenizer registers under in `tokenize=` options.
pub const TOKENIZER_NAME: &str = "better_trigram";

/// Three consecutive normalized codepoints.
///
/// Equality and ordering look only at the codepoints, never at offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Trigram([u32; 3]);

impl Trigram {
    #[must_use]
    pub const fn new(codepoints: [u32; 3]) -> Self {
        Self(codepoints)
    }

    /// Build a trigram from the first three `chars` of `text`.
    #[must_use]
    pub fn from_chars(text: &str) -> Option<Self> {
        let mut chars = text.chars().map(u32::from);
        Some(Self([chars.next()?, chars.next()?, chars.next()?]))
    }

    #[must_use]
    pub const fn codepoints(&self) -> [u32; 3] {
        self.0
    }

    /// True when any member is the malformed-input sentinel. Opaque
    /// trigrams are indexed but can never be produced from a query string.
    #[must_use]
    pub fn is_opaque(&self) -> bool {
        self.0.contains(&SENTINEL)
    }

    /// UTF-8 bytes of the token text, sentinel rendered as U+FFFD.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }
}

impl fmt::Display for Trigram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &cp in &self.0 {
            let ch = char::from_u32(cp).unwrap_or(char::REPLACEMENT_CHARACTER);
            write!(f, "{ch}")?;
        }
        Ok(())
    }
}

/// A token emitted by the tokenizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    /// The normalized codepoint triple.
    pub text: Trigram,
    /// Byte offset of the first source byte of the first unit.
    pub start: usize,
    /// Exclusive end of the third unit's source bytes, elided marks included.
    pub end: usize,
}

/// Why the host is asking for tokens.
///
/// Mirrors the FTS5 tokenize flags. The trigram stream is identical for
/// every reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TokenizeReason {
    /// Indexing a row being inserted or deleted.
    #[default]
    Document,
    /// Tokenizing a MATCH query term.
    Query,
    /// Tokenizing a prefix query term.
    Prefix,
    /// Auxiliary function (e.g. `highlight()`) re-tokenizing stored text.
    Aux,
}

/// Tokenizer lifecycle: create from arguments, tokenize, destroy.
pub trait Tokenizer: Send + Sync + fmt::Debug {
    /// Construct from the `key value` arguments following the tokenizer name.
    fn create(args: &[&str]) -> Result<Self>
    where
        Self: Sized;

    /// Registered tokenizer name.
    fn name(&self) -> &'static str;

    /// Configuration this instance was created with.
    fn config(&self) -> TrigramConfig;

    /// Tokenize raw bytes. Never fails; malformed input is recovered.
    fn tokenize(&self, text: &[u8], reason: TokenizeReason) -> Vec<Token>;

    /// Release the instance.
    fn destroy(self)
    where
        Self: Sized,
    {
    }
}

/// Trigram tokenizer with optional ASCII case folding and diacritic removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BetterTrigramTokenizer {
    config: TrigramConfig,
    normalizer: Normalizer,
}

impl BetterTrigramTokenizer {
    #[must_use]
    pub const fn new(config: TrigramConfig) -> Self {
        Self {
            config,
            normalizer: Normalizer::for_config(config),
        }
    }

    #[must_use]
    pub const fn normalizer(&self) -> Normalizer {
        self.normalizer
    }

    /// Decode and normalize `text` without windowing.
    #[must_use]
    pub fn normalize(&self, text: &[u8]) -> Normalized {
        self.normalizer.normalize(&decode(text))
    }
}

impl Tokenizer for BetterTrigramTokenizer {
    fn create(args: &[&str]) -> Result<Self> {
        let config = TrigramConfig::from_args(args)?;
        debug!(
            tokenizer = TOKENIZER_NAME,
            ?config,
            "better_trigram: tokenizer created"
        );
        Ok(Self::new(config))
    }

    fn name(&self) -> &'static str {
        TOKENIZER_NAME
    }

    fn config(&self) -> TrigramConfig {
        self.config
    }

    fn tokenize(&self, text: &[u8], _reason: TokenizeReason) -> Vec<Token> {
        trigram_tokens(&self.normalize(text))
    }
}

/// Slide a three-unit window over normalized text.
#[must_use]
pub fn trigram_tokens(normalized: &Normalized) -> Vec<Token> {
    let codepoints = normalized.codepoints();
    let spans = normalized.spans();
    codepoints
        .windows(3)
        .zip(spans.windows(3))
        .map(|(cps, spans)| Token {
            text: Trigram([cps[0], cps[1], cps[2]]),
            start: spans[0].start,
            end: spans[2].end,
        })
        .collect()
}

/// Trigrams of a normalized codepoint run, in order.
pub fn trigrams_of(codepoints: &[u32]) -> impl Iterator<Item = Trigram> + '_ {
    codepoints
        .windows(3)
        .map(|w| Trigram([w[0], w[1], w[2]]))
}

/// Create a tokenizer by registered name with its argument list.
pub fn create_tokenizer(name: &str, args: &[&str]) -> Result<Box<dyn Tokenizer>> {
    if name.eq_ignore_ascii_case(TOKENIZER_NAME) {
        return Ok(Box::new(BetterTrigramTokenizer::create(args)?));
    }
    Err(TrigramError::UnknownTokenizer {
        name: name.to_owned(),
    })
}

/// Render the phrase a query term tokenizes to, e.g. `"abc" + "bcd"`.
///
/// A term too short to produce any trigram renders as the empty phrase `""`.
#[must_use]
pub fn render_query_expr(tokenizer: &dyn Tokenizer, term: &str) -> String {
    let tokens = tokenizer.tokenize(term.as_bytes(), TokenizeReason::Query);
    if tokens.is_empty() {
        return "\"\"".to_owned();
    }
    tokens
        .iter()
        .map(|t| format!("\"{}\"", t.text.to_string().replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(" + ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn folding() -> BetterTrigramTokenizer {
        BetterTrigramTokenizer::default()
    }

    fn stripping() -> BetterTrigramTokenizer {
        BetterTrigramTokenizer::create(&["remove_diacritics", "1"]).unwrap()
    }

    fn texts(tokens: &[Token]) -> Vec<String> {
        tokens.iter().map(|t| t.text.to_string()).collect()
    }

    #[test]
    fn test_basic_windows() {
        let tokens = folding().tokenize(b"abcde", TokenizeReason::Document);
        assert_eq!(texts(&tokens), vec!["abc", "bcd", "cde"]);
        assert_eq!((tokens[1].start, tokens[1].end), (1, 4));
    }

    #[test]
    fn test_short_inputs_yield_nothing() {
        for text in ["", "a", "ab", "\u{00E9}\u{00E9}"] {
            assert!(
                folding()
                    .tokenize(text.as_bytes(), TokenizeReason::Query)
                    .is_empty()
            );
        }
    }

    #[test]
    fn test_elision_can_make_input_short() {
        // Five codepoints but only two normalized units.
        let text = "a\u{0303}\u{0301}b\u{0303}";
        assert!(
            stripping()
                .tokenize(text.as_bytes(), TokenizeReason::Document)
                .is_empty()
        );
    }

    #[test]
    fn test_case_folding() {
        let tokens = folding().tokenize(b"ABCd", TokenizeReason::Document);
        assert_eq!(texts(&tokens), vec!["abc", "bcd"]);

        let exact = BetterTrigramTokenizer::create(&["case_sensitive", "1"]).unwrap();
        let tokens = exact.tokenize(b"ABCd", TokenizeReason::Document);
        assert_eq!(texts(&tokens), vec!["ABC", "BCd"]);
    }

    #[test]
    fn test_multibyte_codepoint_windows() {
        let text = "กรุงเทพ";
        let tokens = folding().tokenize(text.as_bytes(), TokenizeReason::Document);
        assert_eq!(tokens.len(), text.chars().count() - 2);
        assert_eq!(tokens[0].text.to_string(), "กรุ");
        assert_eq!((tokens[0].start, tokens[0].end), (0, 9));
    }

    #[test]
    fn test_astral_codepoints() {
        let tokens = folding().tokenize("a🎵b".as_bytes(), TokenizeReason::Document);
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].end, 6);
    }

    #[test]
    fn test_span_includes_trailing_mark() {
        let text = "abc\u{0303}d";
        let tokens = stripping().tokenize(text.as_bytes(), TokenizeReason::Document);
        assert_eq!(texts(&tokens), vec!["abc", "bcd"]);
        assert_eq!(&text[tokens[0].start..tokens[0].end], "abc\u{0303}");
    }

    #[test]
    fn test_precomposed_and_decomposed_agree() {
        let pre = stripping().tokenize("\u{00E3}bc".as_bytes(), TokenizeReason::Document);
        let de = stripping().tokenize("a\u{0303}bc".as_bytes(), TokenizeReason::Document);
        assert_eq!(pre[0].text, de[0].text);
        assert_eq!(pre[0].text.to_string(), "abc");
        assert_eq!((pre[0].start, pre[0].end), (0, 4));
        assert_eq!((de[0].start, de[0].end), (0, 5));
    }

    #[test]
    fn test_malformed_bytes_are_opaque() {
        let tokens = folding().tokenize(&[b'a', 0xC0, 0xAF, b'b', b'c'], TokenizeReason::Document);
        assert_eq!(tokens.len(), 2);
        assert!(tokens[0].text.is_opaque());
        assert_eq!(tokens[0].text.to_string(), "a\u{FFFD}b");
        assert_eq!((tokens[1].start, tokens[1].end), (1, 5));
    }

    #[test]
    fn test_reason_does_not_change_output() {
        let tok = stripping();
        let text = "Ab\u{0303}cdef".as_bytes();
        let doc = tok.tokenize(text, TokenizeReason::Document);
        for reason in [TokenizeReason::Query, TokenizeReason::Prefix, TokenizeReason::Aux] {
            assert_eq!(tok.tokenize(text, reason), doc);
        }
    }

    #[test]
    fn test_create_tokenizer_by_name() {
        let tok = create_tokenizer("Better_Trigram", &["case_sensitive", "1"]).unwrap();
        assert_eq!(tok.name(), "better_trigram");
        assert!(tok.config().case_sensitive());

        let err = create_tokenizer("porter", &[]).unwrap_err();
        assert!(matches!(err, TrigramError::UnknownTokenizer { .. }));
    }

    #[test]
    fn test_create_rejects_bad_arguments() {
        let err =
            create_tokenizer(TOKENIZER_NAME, &["case_sensitive", "1", "remove_diacritics", "1"])
                .unwrap_err();
        assert!(err.is_constructor_error());
        assert!(create_tokenizer(TOKENIZER_NAME, &["remove_diacritics", "2"]).is_err());
    }

    #[test]
    fn test_destroy() {
        let tok = BetterTrigramTokenizer::create(&[]).unwrap();
        tok.destroy();
    }

    #[test]
    fn test_render_query_expr() {
        let tok = folding();
        assert_eq!(render_query_expr(&tok, "ABCD"), "\"abc\" + \"bcd\"");
        assert_eq!(render_query_expr(&tok, "ab"), "\"\"");
        assert_eq!(render_query_expr(&tok, "a\"b"), "\"a\"\"b\"");
    }

    #[test]
    fn test_trigram_helpers() {
        let tri = Trigram::from_chars("xyz").unwrap();
        assert_eq!(tri.to_bytes(), b"xyz");
        assert!(!tri.is_opaque());
        assert!(Trigram::from_chars("xy").is_none());
        assert_eq!(trigrams_of(&[1, 2, 3, 4]).count(), 2);
    }

    proptest! {
        #[test]
        fn prop_short_input_produces_no_tokens(chars in proptest::collection::vec(any::<char>(), 0..3)) {
            let text: String = chars.into_iter().collect();
            prop_assert!(folding().tokenize(text.as_bytes(), TokenizeReason::Query).is_empty());
            prop_assert!(stripping().tokenize(text.as_bytes(), TokenizeReason::Query).is_empty());
        }

        #[test]
        fn prop_spans_on_unit_boundaries(bytes in proptest::collection::vec(any::<u8>(), 0..48)) {
            let units = decode(&bytes);
            let starts: Vec<usize> = units.iter().map(|u| u.byte_offset).collect();
            let ends: Vec<usize> = units.iter().map(|u| u.end()).collect();
            for token in stripping().tokenize(&bytes, TokenizeReason::Document) {
                prop_assert!(token.start < token.end);
                prop_assert!(token.end <= bytes.len());
                prop_assert!(starts.contains(&token.start));
                prop_assert!(ends.contains(&token.end));
            }
        }

        #[test]
        fn prop_token_count_without_elision(text in "\\PC{0,24}") {
            let units = text.chars().count();
            let tokens = folding().tokenize(text.as_bytes(), TokenizeReason::Document);
            prop_assert_eq!(tokens.len(), units.saturating_sub(2));
        }
    }
}
