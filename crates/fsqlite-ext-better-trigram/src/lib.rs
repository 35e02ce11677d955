//! `better_trigram`: a codepoint trigram tokenizer for FTS5-style tables.
//!
//! Provides:
//!
//! 1. **Total UTF-8 decoding** ([`decode`]): every byte lands in exactly one
//!    unit; malformed, overlong and truncated sequences become an opaque
//!    sentinel instead of an error.
//!
//! 2. **Normalization with offset mapping** ([`normalize`]): optional ASCII
//!    case folding and diacritic removal. Elided combining marks extend the
//!    byte span of the preceding character, so highlights bracket them.
//!
//! 3. **The tokenizer** ([`tokenizer`]): overlapping three-codepoint tokens
//!    with byte-exact spans into the original text.
//!
//! 4. **LIKE/GLOB planning** ([`pattern`], [`planner`]): literal runs of a
//!    pattern become required trigrams for an index probe, or the pattern is
//!    reported as needing a full scan.
//!
//! 5. **A host table** ([`table`]) that stores rows, answers MATCH queries,
//!    confirms LIKE/GLOB candidates and renders `highlight()`.
//!
//! Tokenizer arguments follow the `tokenize=` option:
//! `tokenize='better_trigram case_sensitive 0 remove_diacritics 1'`.

pub mod config;
pub mod decode;
pub mod error;
pub mod normalize;
pub mod pattern;
pub mod planner;
pub mod table;
pub mod tokenizer;

pub use config::{ConfigError, TrigramConfig};
pub use error::{ErrorCode, Result, TrigramError};
pub use pattern::{Pattern, PatternKind, Segment};
pub use planner::{PatternPlanner, PlanDirective};
pub use table::{Detail, Predicate, QueryError, TrigramTable};
pub use tokenizer::{
    BetterTrigramTokenizer, Token, TokenizeReason, Tokenizer, Trigram, create_tokenizer,
    render_query_expr,
};

#[must_use]
pub const fn extension_name() -> &'static str {
    "better-trigram"
}
