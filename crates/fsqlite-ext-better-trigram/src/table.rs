//! In-memory full-text table driven by the `better_trigram` tokenizer.
//!
//! This is the host side of the tokenizer contract: it stores rows, keeps a
//! trigram inverted index over them, answers MATCH queries, confirms
//! LIKE/GLOB candidates, renders `highlight()` output and reports query
//! plans through [`PatternPlanner::best_index`].

use std::collections::BTreeMap;
use std::ops::Range;

use roaring::RoaringBitmap;
use rustc_hash::FxHashMap;
use thiserror::Error;
use tracing::debug;

use crate::config::{TrigramConfig, parse_tokenize_spec, unquote};
use crate::error::{Result, TrigramError};
use crate::pattern::{Pattern, PatternKind};
use crate::planner::{ConstraintOp, IndexConstraint, IndexInfo, PatternPlanner};
use crate::tokenizer::{
    TOKENIZER_NAME, Token, TokenizeReason, Tokenizer, Trigram, create_tokenizer,
};

// ---------------------------------------------------------------------------
// MATCH query parsing
// ---------------------------------------------------------------------------

/// MATCH expression errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("empty query")]
    Empty,

    #[error("unterminated string")]
    UnclosedPhrase,

    #[error("incomplete AND")]
    DanglingAnd,

    #[error("unsupported operator {operator}")]
    Unsupported { operator: String },
}

/// Split a MATCH expression into phrase strings.
///
/// Supported: barewords, `"quoted phrases"` (with `""` as an embedded
/// quote), implicit AND between adjacent phrases and an explicit `AND`.
/// Each phrase is later tokenized as a whole, so `"abc def"` requires the
/// trigrams spanning the space as well.
pub fn parse_match_query(query: &str) -> std::result::Result<Vec<String>, QueryError> {
    let mut phrases = Vec::new();
    let mut chars = query.chars().peekable();
    let mut pending_and = false;

    while let Some(&ch) = chars.peek() {
        if ch.is_whitespace() {
            let _ = chars.next();
            continue;
        }

        if ch == '"' {
            let _ = chars.next();
            let mut phrase = String::new();
            loop {
                match chars.next() {
                    None => return Err(QueryError::UnclosedPhrase),
                    Some('"') if chars.peek() == Some(&'"') => {
                        let _ = chars.next();
                        phrase.push('"');
                    }
                    Some('"') => break,
                    Some(c) => phrase.push(c),
                }
            }
            phrases.push(phrase);
            pending_and = false;
            continue;
        }

        let mut word = String::new();
        while let Some(&c) = chars.peek() {
            if c.is_whitespace() || c == '"' {
                break;
            }
            word.push(c);
            let _ = chars.next();
        }

        match word.as_str() {
            "AND" => {
                if phrases.is_empty() || pending_and {
                    return Err(QueryError::DanglingAnd);
                }
                pending_and = true;
            }
            "OR" | "NOT" => return Err(QueryError::Unsupported { operator: word }),
            _ => {
                phrases.push(word);
                pending_and = false;
            }
        }
    }

    if pending_and {
        return Err(QueryError::DanglingAnd);
    }
    if phrases.is_empty() {
        return Err(QueryError::Empty);
    }
    Ok(phrases)
}

// ---------------------------------------------------------------------------
// Table options
// ---------------------------------------------------------------------------

/// How much positional information the index keeps, as FTS5 `detail=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Detail {
    /// Document, column and token position.
    #[default]
    Full,
    /// Document and column. Phrases are verified by re-tokenizing.
    Column,
    /// Document only.
    None,
}

impl Detail {
    /// Parse a `detail=` value. Any unambiguous prefix of `none`, `full` or
    /// `columns` is accepted, ignoring ASCII case.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        const NAMES: [(&str, Detail); 3] = [
            ("none", Detail::None),
            ("full", Detail::Full),
            ("columns", Detail::Column),
        ];
        if value.is_empty() {
            return None;
        }
        let mut hits = NAMES.iter().filter(|(name, _)| {
            name.get(..value.len())
                .is_some_and(|prefix| prefix.eq_ignore_ascii_case(value))
        });
        let &(_, detail) = hits.next()?;
        if hits.next().is_some() {
            return None;
        }
        Some(detail)
    }
}

// ---------------------------------------------------------------------------
// Inverted index
// ---------------------------------------------------------------------------

/// Trigram postings over internal document numbers.
#[derive(Debug, Default, PartialEq)]
struct TrigramIndex {
    detail: Detail,
    /// trigram -> documents containing it in any column.
    docs: FxHashMap<Trigram, RoaringBitmap>,
    /// (trigram, column) -> documents. Empty under `detail=none`.
    column_docs: FxHashMap<(Trigram, u32), RoaringBitmap>,
    /// (trigram, docno) -> (column, token position). Only `detail=full`.
    positions: FxHashMap<(Trigram, u32), Vec<(u32, u32)>>,
    /// Every stored document, including those without tokens.
    all_docs: RoaringBitmap,
}

impl TrigramIndex {
    fn new(detail: Detail) -> Self {
        Self {
            detail,
            ..Self::default()
        }
    }

    fn add(&mut self, docno: u32, column: u32, tokens: &[Token]) {
        #[allow(clippy::cast_possible_truncation)]
        for (pos, token) in tokens.iter().enumerate() {
            self.docs.entry(token.text).or_default().insert(docno);
            if self.detail != Detail::None {
                self.column_docs
                    .entry((token.text, column))
                    .or_default()
                    .insert(docno);
            }
            if self.detail == Detail::Full {
                self.positions
                    .entry((token.text, docno))
                    .or_default()
                    .push((column, pos as u32));
            }
        }
    }

    fn remove(&mut self, docno: u32, column: u32, tokens: &[Token]) {
        for token in tokens {
            self.positions.remove(&(token.text, docno));
            remove_from(&mut self.column_docs, &(token.text, column), docno);
            remove_from(&mut self.docs, &token.text, docno);
        }
    }

    /// Documents with `trigram` in `column`. Under `detail=none` the column
    /// is unknown and any column counts.
    fn column_postings(&self, trigram: &Trigram, column: u32) -> Option<&RoaringBitmap> {
        if self.detail == Detail::None {
            self.docs.get(trigram)
        } else {
            self.column_docs.get(&(*trigram, column))
        }
    }

    /// Whether `phrase` occurs at consecutive positions of one column.
    fn phrase_at_positions(&self, docno: u32, phrase: &[Trigram]) -> bool {
        let Some((first, rest)) = phrase.split_first() else {
            return false;
        };
        let Some(starts) = self.positions.get(&(*first, docno)) else {
            return false;
        };
        starts.iter().any(|&(column, start)| {
            rest.iter().zip(1_u32..).all(|(trigram, offset)| {
                start.checked_add(offset).is_some_and(|pos| {
                    self.positions
                        .get(&(*trigram, docno))
                        .is_some_and(|p| p.contains(&(column, pos)))
                })
            })
        })
    }
}

fn remove_from<K: std::hash::Hash + Eq>(
    map: &mut FxHashMap<K, RoaringBitmap>,
    key: &K,
    docno: u32,
) {
    if let Some(bitmap) = map.get_mut(key) {
        bitmap.remove(docno);
        if bitmap.is_empty() {
            map.remove(key);
        }
    }
}

/// Start offsets of every occurrence of `phrase` in a token stream.
fn phrase_hits<'a>(tokens: &'a [Token], phrase: &'a [Trigram]) -> impl Iterator<Item = usize> + 'a {
    let len = phrase.len().max(1);
    tokens
        .windows(len)
        .enumerate()
        .filter(move |(_, window)| {
            !phrase.is_empty() && window.iter().zip(phrase).all(|(t, p)| t.text == *p)
        })
        .map(|(i, _)| i)
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

/// A WHERE-clause term against a [`TrigramTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Predicate<'a> {
    /// `tbl MATCH query` over all columns.
    Match(&'a str),
    /// `column LIKE pattern [ESCAPE escape]`; `None` pattern is SQL NULL.
    Like {
        column: &'a str,
        pattern: Option<&'a str>,
        escape: Option<char>,
    },
    /// `column GLOB pattern`; `None` pattern is SQL NULL.
    Glob {
        column: &'a str,
        pattern: Option<&'a str>,
    },
}

impl<'a> Predicate<'a> {
    #[must_use]
    pub const fn like(column: &'a str, pattern: Option<&'a str>) -> Self {
        Self::Like {
            column,
            pattern,
            escape: None,
        }
    }

    #[must_use]
    pub const fn glob(column: &'a str, pattern: Option<&'a str>) -> Self {
        Self::Glob { column, pattern }
    }
}

#[derive(Debug, Clone)]
struct StoredRow {
    docno: u32,
    values: Vec<Option<Vec<u8>>>,
}

impl StoredRow {
    fn value(&self, column: usize) -> Option<&[u8]> {
        self.values.get(column)?.as_deref()
    }
}

/// A full-text table over the `better_trigram` tokenizer.
#[derive(Debug)]
pub struct TrigramTable {
    name: String,
    columns: Vec<String>,
    tokenizer: Box<dyn Tokenizer>,
    planner: PatternPlanner,
    index: TrigramIndex,
    rows: BTreeMap<i64, StoredRow>,
    docno_rowid: FxHashMap<u32, i64>,
    next_docno: u32,
}

impl TrigramTable {
    /// `CREATE VIRTUAL TABLE name USING fts5(args...)`.
    ///
    /// Arguments without `=` are column names. Options: `tokenize=` (default
    /// `better_trigram`) and `detail=` (default `full`).
    pub fn create(name: &str, args: &[&str]) -> Result<Self> {
        let mut columns = Vec::new();
        let mut tokenize = None;
        let mut detail = Detail::default();

        for arg in args {
            let arg = arg.trim();
            let Some((key, value)) = arg.split_once('=') else {
                columns.push(arg.to_owned());
                continue;
            };
            let key = key.trim();
            if key.eq_ignore_ascii_case("tokenize") {
                tokenize = Some(value);
            } else if key.eq_ignore_ascii_case("detail") {
                let value = unquote(value);
                detail = Detail::parse(value).ok_or_else(|| TrigramError::MalformedDetail {
                    value: value.to_owned(),
                })?;
            } else {
                return Err(TrigramError::UnrecognizedOption {
                    key: key.to_owned(),
                });
            }
        }

        if columns.is_empty() {
            return Err(TrigramError::NoColumns {
                table: name.to_owned(),
            });
        }

        let (tokenizer_name, tokenizer_args) = match tokenize {
            Some(spec) => parse_tokenize_spec(spec).unwrap_or(("", Vec::new())),
            None => (TOKENIZER_NAME, Vec::new()),
        };
        let tokenizer = create_tokenizer(tokenizer_name, &tokenizer_args)?;
        let planner = PatternPlanner::new(tokenizer.config());

        debug!(
            table = name,
            columns = columns.len(),
            ?detail,
            config = ?tokenizer.config(),
            "better_trigram: created table"
        );

        Ok(Self {
            name: name.to_owned(),
            columns,
            tokenizer,
            planner,
            index: TrigramIndex::new(detail),
            rows: BTreeMap::new(),
            docno_rowid: FxHashMap::default(),
            next_docno: 0,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub const fn detail(&self) -> Detail {
        self.index.detail
    }

    #[must_use]
    pub fn config(&self) -> TrigramConfig {
        self.tokenizer.config()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Resolve a column name, ignoring ASCII case.
    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
            .ok_or_else(|| TrigramError::NoSuchColumn {
                name: name.to_owned(),
            })
    }

    /// Stored bytes of one column, `None` for NULL or a missing row.
    #[must_use]
    pub fn value(&self, rowid: i64, column: usize) -> Option<&[u8]> {
        self.rows.get(&rowid)?.value(column)
    }

    /// Insert a row. Missing trailing values are NULL; `rowid` `None`
    /// assigns one past the largest rowid in use.
    pub fn insert(&mut self, rowid: Option<i64>, values: &[Option<&[u8]>]) -> Result<i64> {
        if values.len() > self.columns.len() {
            return Err(TrigramError::TooManyValues {
                count: self.columns.len(),
                supplied: values.len(),
            });
        }

        let rowid = match rowid {
            Some(rowid) => rowid,
            None => self
                .rows
                .last_key_value()
                .map_or(1, |(&last, _)| last.saturating_add(1)),
        };
        if self.rows.contains_key(&rowid) {
            return Err(TrigramError::RowidExists { rowid });
        }

        let docno = self.next_docno;
        self.next_docno = docno.checked_add(1).ok_or(TrigramError::IndexFull)?;

        let mut stored: Vec<Option<Vec<u8>>> =
            values.iter().map(|v| v.map(<[u8]>::to_vec)).collect();
        stored.resize(self.columns.len(), None);
        let row = StoredRow {
            docno,
            values: stored,
        };

        let token_count = index_row(&mut self.index, self.tokenizer.as_ref(), &row);
        self.docno_rowid.insert(docno, rowid);
        self.rows.insert(rowid, row);

        debug!(
            rowid,
            cols = values.len(),
            tokens = token_count,
            "better_trigram: indexed row"
        );
        Ok(rowid)
    }

    /// Insert with values addressed by column name, as
    /// `INSERT INTO t(rowid, a12) VALUES(...)`.
    pub fn insert_named(&mut self, rowid: Option<i64>, values: &[(&str, Option<&[u8]>)]) -> Result<i64> {
        let mut row: Vec<Option<&[u8]>> = vec![None; self.columns.len()];
        for &(name, value) in values {
            row[self.column_index(name)?] = value;
        }
        self.insert(rowid, &row)
    }

    /// Delete a row. Returns whether it existed.
    pub fn delete(&mut self, rowid: i64) -> bool {
        let Some(row) = self.rows.remove(&rowid) else {
            return false;
        };
        #[allow(clippy::cast_possible_truncation)]
        for (column, value) in row.values.iter().enumerate() {
            if let Some(value) = value {
                let tokens = self.tokenizer.tokenize(value, TokenizeReason::Document);
                self.index.remove(row.docno, column as u32, &tokens);
            }
        }
        self.index.all_docs.remove(row.docno);
        self.docno_rowid.remove(&row.docno);
        debug!(rowid, "better_trigram: removed row");
        true
    }

    /// Rowids satisfying every predicate, in ascending order.
    ///
    /// A NULL LIKE/GLOB pattern matches no row. LIKE/GLOB constraints are
    /// narrowed through the index when the planner allows it and always
    /// confirmed against the stored text.
    pub fn select(&self, predicates: &[Predicate<'_>]) -> Result<Vec<i64>> {
        let mut candidates = self.index.all_docs.clone();
        let mut phrases: Vec<Vec<Trigram>> = Vec::new();
        let mut filters: Vec<(usize, Pattern)> = Vec::new();

        for predicate in predicates {
            let (kind, column, pattern, escape) = match *predicate {
                Predicate::Match(query) => {
                    for text in parse_match_query(query)? {
                        let phrase = self.query_trigrams(&text);
                        if phrase.is_empty() {
                            return Ok(Vec::new());
                        }
                        for trigram in &phrase {
                            intersect(&mut candidates, self.index.docs.get(trigram));
                        }
                        phrases.push(phrase);
                    }
                    continue;
                }
                Predicate::Like {
                    column,
                    pattern,
                    escape,
                } => (PatternKind::Like, column, pattern, escape),
                Predicate::Glob { column, pattern } => (PatternKind::Glob, column, pattern, None),
            };

            let column = self.column_index(column)?;
            let Some(pattern) = pattern else {
                return Ok(Vec::new());
            };
            let pattern = Pattern::parse(kind, pattern, escape);
            let plan = self.planner.plan(&pattern, column);
            if plan.usable {
                #[allow(clippy::cast_possible_truncation)]
                for trigram in &plan.required_trigrams {
                    intersect(
                        &mut candidates,
                        self.index.column_postings(trigram, column as u32),
                    );
                }
            }
            filters.push((column, pattern));
        }

        let mut rowids = Vec::new();
        for docno in &candidates {
            let Some(&rowid) = self.docno_rowid.get(&docno) else {
                continue;
            };
            let Some(row) = self.rows.get(&rowid) else {
                continue;
            };
            let matched = phrases.iter().all(|p| self.row_has_phrase(row, p))
                && filters
                    .iter()
                    .all(|(column, pattern)| row.value(*column).is_some_and(|v| pattern.matches_bytes(v)));
            if matched {
                rowids.push(rowid);
            }
        }
        rowids.sort_unstable();
        Ok(rowids)
    }

    /// `highlight(tbl, column, open, close)` for one row under `query`.
    ///
    /// Every phrase occurrence covers the bytes from its first trigram's
    /// start to its last trigram's end. Overlapping or touching ranges merge
    /// into one bracketed region. Returns `None` for a NULL value or a
    /// missing row.
    pub fn highlight(
        &self,
        rowid: i64,
        column: usize,
        query: &str,
        open: &str,
        close: &str,
    ) -> Result<Option<String>> {
        if column >= self.columns.len() {
            return Err(TrigramError::ColumnIndex {
                index: column,
                count: self.columns.len(),
            });
        }
        let phrases: Vec<Vec<Trigram>> = parse_match_query(query)?
            .iter()
            .map(|text| self.query_trigrams(text))
            .collect();
        let Some(text) = self.value(rowid, column) else {
            return Ok(None);
        };

        let tokens = self.tokenizer.tokenize(text, TokenizeReason::Aux);
        let mut ranges: Vec<Range<usize>> = Vec::new();
        for phrase in &phrases {
            for i in phrase_hits(&tokens, phrase) {
                ranges.push(tokens[i].start..tokens[i + phrase.len() - 1].end);
            }
        }
        ranges.sort_by_key(|r| (r.start, r.end));

        let mut merged: Vec<Range<usize>> = Vec::with_capacity(ranges.len());
        for range in ranges {
            match merged.last_mut() {
                Some(last) if range.start <= last.end => last.end = last.end.max(range.end),
                _ => merged.push(range),
            }
        }

        let mut out = Vec::with_capacity(text.len() + merged.len() * (open.len() + close.len()));
        let mut last_end = 0;
        for range in merged {
            out.extend_from_slice(&text[last_end..range.start]);
            out.extend_from_slice(open.as_bytes());
            out.extend_from_slice(&text[range.clone()]);
            out.extend_from_slice(close.as_bytes());
            last_end = range.end;
        }
        out.extend_from_slice(&text[last_end..]);
        Ok(Some(String::from_utf8_lossy(&out).into_owned()))
    }

    /// `EXPLAIN QUERY PLAN` detail line for a query with these predicates.
    pub fn explain(&self, predicates: &[Predicate<'_>]) -> Result<String> {
        #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        let hidden_column = self.columns.len() as i32;
        let mut constraints = Vec::with_capacity(predicates.len());
        for predicate in predicates {
            let constraint = match *predicate {
                Predicate::Match(query) => {
                    IndexConstraint::new(hidden_column, ConstraintOp::Match, Some(query))
                }
                Predicate::Like {
                    column,
                    pattern,
                    escape,
                } => {
                    let mut c = IndexConstraint::new(self.column_i32(column)?, ConstraintOp::Like, pattern);
                    c.escape = escape;
                    c
                }
                Predicate::Glob { column, pattern } => {
                    IndexConstraint::new(self.column_i32(column)?, ConstraintOp::Glob, pattern)
                }
            };
            constraints.push(constraint);
        }

        let mut info = IndexInfo::new(constraints);
        self.planner.best_index(&mut info);
        Ok(info.explain(&self.name))
    }

    /// `INSERT INTO t(t) VALUES('integrity-check')`: rebuild the index from
    /// stored content and compare.
    pub fn integrity_check(&self) -> Result<()> {
        let mut rebuilt = TrigramIndex::new(self.index.detail);
        for (&rowid, row) in &self.rows {
            if self.docno_rowid.get(&row.docno) != Some(&rowid) {
                return Err(TrigramError::integrity(format!(
                    "rowid {rowid} has no document mapping"
                )));
            }
            index_row(&mut rebuilt, self.tokenizer.as_ref(), row);
        }
        if self.docno_rowid.len() != self.rows.len() {
            return Err(TrigramError::integrity("stale document mappings"));
        }
        if rebuilt != self.index {
            return Err(TrigramError::integrity("index does not match content"));
        }
        Ok(())
    }

    fn column_i32(&self, name: &str) -> Result<i32> {
        let index = self.column_index(name)?;
        i32::try_from(index).map_err(|_| TrigramError::ColumnIndex {
            index,
            count: self.columns.len(),
        })
    }

    fn query_trigrams(&self, text: &str) -> Vec<Trigram> {
        self.tokenizer
            .tokenize(text.as_bytes(), TokenizeReason::Query)
            .iter()
            .map(|t| t.text)
            .collect()
    }

    fn row_has_phrase(&self, row: &StoredRow, phrase: &[Trigram]) -> bool {
        if self.index.detail == Detail::Full {
            return self.index.phrase_at_positions(row.docno, phrase);
        }
        row.values.iter().flatten().any(|value| {
            let tokens = self.tokenizer.tokenize(value, TokenizeReason::Aux);
            phrase_hits(&tokens, phrase).next().is_some()
        })
    }
}

/// Tokenize and index every non-NULL column of `row`. Returns the token
/// count.
fn index_row(index: &mut TrigramIndex, tokenizer: &dyn Tokenizer, row: &StoredRow) -> usize {
    let mut count = 0;
    #[allow(clippy::cast_possible_truncation)]
    for (column, value) in row.values.iter().enumerate() {
        if let Some(value) = value {
            let tokens = tokenizer.tokenize(value, TokenizeReason::Document);
            count += tokens.len();
            index.add(row.docno, column as u32, &tokens);
        }
    }
    index.all_docs.insert(row.docno);
    count
}

fn intersect(candidates: &mut RoaringBitmap, postings: Option<&RoaringBitmap>) {
    match postings {
        Some(postings) => *candidates &= postings,
        None => candidates.clear(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(args: &[&str]) -> TrigramTable {
        TrigramTable::create("t1", args).unwrap()
    }

    fn put(t: &mut TrigramTable, text: &str) -> i64 {
        t.insert(None, &[Some(text.as_bytes())]).unwrap()
    }

    #[test]
    fn test_parse_match_query() {
        assert_eq!(parse_match_query("abc ghi").unwrap(), vec!["abc", "ghi"]);
        assert_eq!(
            parse_match_query("abc AND cde").unwrap(),
            vec!["abc", "cde"]
        );
        assert_eq!(
            parse_match_query("\"abc def\" x\"\"y").unwrap(),
            vec!["abc def", "x", "", "y"]
        );
        assert_eq!(
            parse_match_query("\"say \"\"hi\"\"\"").unwrap(),
            vec!["say \"hi\""]
        );
        assert_eq!(parse_match_query("   "), Err(QueryError::Empty));
        assert_eq!(parse_match_query("\"abc"), Err(QueryError::UnclosedPhrase));
        assert_eq!(parse_match_query("abc AND"), Err(QueryError::DanglingAnd));
        assert_eq!(parse_match_query("AND abc"), Err(QueryError::DanglingAnd));
        assert!(matches!(
            parse_match_query("abc OR def"),
            Err(QueryError::Unsupported { .. })
        ));
    }

    #[test]
    fn test_detail_parse() {
        assert_eq!(Detail::parse("full"), Some(Detail::Full));
        assert_eq!(Detail::parse("col"), Some(Detail::Column));
        assert_eq!(Detail::parse("columns"), Some(Detail::Column));
        assert_eq!(Detail::parse("NONE"), Some(Detail::None));
        assert_eq!(Detail::parse("n"), Some(Detail::None));
        assert_eq!(Detail::parse(""), None);
        assert_eq!(Detail::parse("fully"), None);
    }

    #[test]
    fn test_create_options() {
        let t = table(&["y", "tokenize = 'better_trigram case_sensitive 1'", "detail=none"]);
        assert_eq!(t.columns(), &["y".to_owned()]);
        assert!(t.config().case_sensitive());
        assert_eq!(t.detail(), Detail::None);
        assert_eq!(t.name(), "t1");

        let err = TrigramTable::create("t", &["y", "tokenize=porter"]).unwrap_err();
        assert!(matches!(err, TrigramError::UnknownTokenizer { .. }));

        let err = TrigramTable::create("t", &["y", "prefix=2"]).unwrap_err();
        assert!(matches!(err, TrigramError::UnrecognizedOption { .. }));

        let err = TrigramTable::create("t", &["y", "detail=bogus"]).unwrap_err();
        assert!(matches!(err, TrigramError::MalformedDetail { .. }));

        let err = TrigramTable::create("t", &["tokenize=better_trigram"]).unwrap_err();
        assert!(matches!(err, TrigramError::NoColumns { .. }));

        let err = TrigramTable::create(
            "t",
            &["y", "tokenize='better_trigram case_sensitive 1 remove_diacritics 1'"],
        )
        .unwrap_err();
        assert!(err.to_string().contains("error in tokenizer constructor"));
    }

    #[test]
    fn test_insert_rowids() {
        let mut t = table(&["a", "b"]);
        assert_eq!(put(&mut t, "abc"), 1);
        assert_eq!(t.insert(Some(10), &[None, Some(b"xyz")]).unwrap(), 10);
        assert_eq!(put(&mut t, "def"), 11);
        assert_eq!(t.len(), 3);
        assert!(matches!(
            t.insert(Some(10), &[]),
            Err(TrigramError::RowidExists { rowid: 10 })
        ));
        assert!(matches!(
            t.insert(None, &[None, None, None]),
            Err(TrigramError::TooManyValues { .. })
        ));
        assert_eq!(t.value(10, 1), Some(&b"xyz"[..]));
        assert_eq!(t.value(10, 0), None);
    }

    #[test]
    fn test_match_phrase_positions() {
        for detail in ["detail=full", "detail=column", "detail=none"] {
            let mut t = table(&["a", detail]);
            put(&mut t, "abcde");
            put(&mut t, "abc bcd cde");
            assert_eq!(t.select(&[Predicate::Match("abcde")]).unwrap(), vec![1], "{detail}");
            assert_eq!(
                t.select(&[Predicate::Match("bcd cde")]).unwrap(),
                vec![1, 2],
                "{detail}"
            );
        }
    }

    #[test]
    fn test_phrase_does_not_span_columns() {
        let mut t = table(&["a", "b"]);
        t.insert(None, &[Some(b"xxabc"), Some(b"defyy")]).unwrap();
        assert!(t.select(&[Predicate::Match("abcdef")]).unwrap().is_empty());
        assert_eq!(t.select(&[Predicate::Match("abc def")]).unwrap(), vec![1]);
    }

    #[test]
    fn test_short_match_term_matches_nothing() {
        let mut t = table(&["a"]);
        put(&mut t, "abc");
        assert!(t.select(&[Predicate::Match("ab")]).unwrap().is_empty());

        put(&mut t, "\u{0}bc def");
        assert!(t.select(&[Predicate::Match("c def")]).unwrap().is_empty());
        assert_eq!(t.select(&[Predicate::Match("\"c def\"")]).unwrap(), vec![2]);
    }

    #[test]
    fn test_like_candidates_confirmed() {
        let mut t = table(&["c1", "detail=none"]);
        t.insert(Some(1), &[Some(b"abc_____xyx_yxz")]).unwrap();
        t.insert(Some(2), &[Some(b"abc_____xyxz")]).unwrap();
        t.insert(Some(3), &[Some(b"ac_____xyxz")]).unwrap();
        assert_eq!(
            t.select(&[Predicate::like("c1", Some("abc%xyxz"))]).unwrap(),
            vec![2]
        );
    }

    #[test]
    fn test_like_column_scoped() {
        let mut t = table(&["a", "b"]);
        t.insert(None, &[Some(b"needle"), None]).unwrap();
        t.insert(None, &[None, Some(b"needle")]).unwrap();
        assert_eq!(
            t.select(&[Predicate::like("b", Some("%needle%"))]).unwrap(),
            vec![2]
        );
    }

    #[test]
    fn test_null_pattern() {
        let mut t = table(&["y"]);
        put(&mut t, "abcdef");
        assert!(t.select(&[Predicate::like("y", None)]).unwrap().is_empty());
        assert!(t.select(&[Predicate::glob("y", None)]).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_column() {
        let t = table(&["y"]);
        assert!(matches!(
            t.select(&[Predicate::like("z", Some("%a%"))]),
            Err(TrigramError::NoSuchColumn { .. })
        ));
    }

    #[test]
    fn test_like_with_escape() {
        let mut t = table(&["y"]);
        put(&mut t, "100% sure");
        put(&mut t, "1000 sure");
        let hits = t
            .select(&[Predicate::Like {
                column: "y",
                pattern: Some("%00\\% s%"),
                escape: Some('\\'),
            }])
            .unwrap();
        assert_eq!(hits, vec![1]);
    }

    #[test]
    fn test_highlight_merges_spans() {
        let mut t = table(&["y"]);
        put(&mut t, "abcdefghijklm");
        let h = |q: &str| t.highlight(1, 0, q, "(", ")").unwrap().unwrap();
        assert_eq!(h("abc ghi"), "(abc)def(ghi)jklm");
        assert_eq!(h("def ghi"), "abc(defghi)jklm");
        assert_eq!(h("efg ghi"), "abcd(efghi)jklm");
        assert_eq!(h("zzz"), "abcdefghijklm");
    }

    #[test]
    fn test_highlight_edges() {
        let mut t = table(&["a", "b"]);
        t.insert(None, &[Some(b"abc"), None]).unwrap();
        assert_eq!(t.highlight(1, 1, "abc", "[", "]").unwrap(), None);
        assert_eq!(t.highlight(9, 0, "abc", "[", "]").unwrap(), None);
        assert!(matches!(
            t.highlight(1, 2, "abc", "[", "]"),
            Err(TrigramError::ColumnIndex { index: 2, count: 2 })
        ));
        assert!(matches!(
            t.highlight(1, 0, "\"abc", "[", "]"),
            Err(TrigramError::Query(QueryError::UnclosedPhrase))
        ));
    }

    #[test]
    fn test_delete_and_integrity() {
        for detail in ["detail=full", "detail=col", "detail=none"] {
            let mut t = table(&["a", "b", detail]);
            put(&mut t, "abcdef");
            t.insert(None, &[Some(b"xyzabc"), Some(b"abcabc")]).unwrap();
            t.integrity_check().unwrap();

            assert!(t.delete(1));
            assert!(!t.delete(1));
            t.integrity_check().unwrap();
            assert_eq!(t.select(&[Predicate::Match("abc")]).unwrap(), vec![2]);
            assert!(t.select(&[Predicate::Match("def")]).unwrap().is_empty());
        }
    }

    #[test]
    fn test_explain() {
        let mut t = table(&["z"]);
        put(&mut t, "ABCD");
        let plan = t.explain(&[Predicate::like("z", Some("%abc%"))]).unwrap();
        assert_eq!(plan, "SCAN t1 VIRTUAL TABLE INDEX 0:L0");
        let plan = t.explain(&[Predicate::like("z", Some("??"))]).unwrap();
        assert_eq!(plan, "SCAN t1 VIRTUAL TABLE INDEX 0:");
        let plan = t.explain(&[Predicate::Match("abc")]).unwrap();
        assert_eq!(plan, "SCAN t1 VIRTUAL TABLE INDEX 0:M");
    }

    #[test]
    fn test_insert_named() {
        let mut t = table(&["a0", "a1", "a2"]);
        t.insert_named(Some(111), &[("A2", Some(b"thats a tricky case"))])
            .unwrap();
        assert_eq!(t.value(111, 2), Some(&b"thats a tricky case"[..]));
        assert!(t.insert_named(None, &[("nope", None)]).is_err());
    }
}
