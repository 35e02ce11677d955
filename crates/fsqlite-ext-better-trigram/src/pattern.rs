//! LIKE and GLOB pattern parsing and exact matching.
//!
//! A pattern is parsed once into [`Segment`]s by a small state machine. The
//! planner reads the literal runs to pick index trigrams; the matcher walks
//! the same segments to confirm candidate rows.

use crate::decode::decode;

/// Which SQL operator a pattern belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatternKind {
    /// `%` any sequence, `_` any one character, optional ESCAPE, ASCII
    /// case-insensitive.
    Like,
    /// `*`, `?` and `[...]` classes, case-sensitive.
    Glob,
}

impl PatternKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Like => "LIKE",
            Self::Glob => "GLOB",
        }
    }
}

/// A bracket expression: inclusive codepoint ranges, optionally negated.
///
/// Single members are stored as one-element ranges. A class with no
/// members that is not negated matches nothing; unterminated classes parse
/// to exactly that.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CharClass {
    pub ranges: Vec<(char, char)>,
    pub negated: bool,
}

impl CharClass {
    /// A class no character satisfies.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            ranges: Vec::new(),
            negated: false,
        }
    }

    #[must_use]
    pub fn contains(&self, codepoint: u32) -> bool {
        let seen = self
            .ranges
            .iter()
            .any(|&(lo, hi)| (u32::from(lo)..=u32::from(hi)).contains(&codepoint));
        seen != self.negated
    }
}

/// One parsed element of a pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// A maximal run of literal characters.
    Literal(Vec<char>),
    /// `_` or `?`.
    AnyChar,
    /// `%` or `*`.
    AnySeq,
    /// `[...]` or `[^...]` (GLOB only).
    CharClass(CharClass),
}

/// A parsed LIKE or GLOB pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    kind: PatternKind,
    segments: Vec<Segment>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LikeState {
    Text,
    Escaped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GlobState {
    Text,
    /// Just after `[`: `^` negates, `]` is a member.
    ClassOpen,
    /// Just after `[^`: `]` is a member.
    ClassOpenNegated,
    /// Inside the class. `prior` is the last single member, which may start
    /// a range.
    ClassBody { prior: Option<char> },
}

#[derive(Debug, Default)]
struct SegmentBuilder {
    segments: Vec<Segment>,
}

impl SegmentBuilder {
    fn literal(&mut self, ch: char) {
        if let Some(Segment::Literal(run)) = self.segments.last_mut() {
            run.push(ch);
        } else {
            self.segments.push(Segment::Literal(vec![ch]));
        }
    }

    fn push(&mut self, segment: Segment) {
        self.segments.push(segment);
    }

    fn finish(self) -> Vec<Segment> {
        self.segments
    }
}

impl Pattern {
    #[must_use]
    pub fn parse(kind: PatternKind, pattern: &str, escape: Option<char>) -> Self {
        match kind {
            PatternKind::Like => Self::like(pattern, escape),
            PatternKind::Glob => Self::glob(pattern),
        }
    }

    /// Parse a LIKE pattern. The escape character, when given, makes the
    /// following character literal; it takes precedence over `%` and `_`.
    #[must_use]
    pub fn like(pattern: &str, escape: Option<char>) -> Self {
        let mut out = SegmentBuilder::default();
        let mut state = LikeState::Text;

        for ch in pattern.chars() {
            state = match state {
                LikeState::Text if Some(ch) == escape => LikeState::Escaped,
                LikeState::Text => {
                    match ch {
                        '%' => out.push(Segment::AnySeq),
                        '_' => out.push(Segment::AnyChar),
                        _ => out.literal(ch),
                    }
                    LikeState::Text
                }
                LikeState::Escaped => {
                    out.literal(ch);
                    LikeState::Text
                }
            };
        }

        if state == LikeState::Escaped {
            // Dangling escape: nothing can match.
            out.push(Segment::CharClass(CharClass::empty()));
        }

        Self {
            kind: PatternKind::Like,
            segments: out.finish(),
        }
    }

    /// Parse a GLOB pattern with SQLite bracket-expression rules.
    #[must_use]
    pub fn glob(pattern: &str) -> Self {
        let chars: Vec<char> = pattern.chars().collect();
        let mut out = SegmentBuilder::default();
        let mut class = CharClass::default();
        let mut state = GlobState::Text;
        let mut i = 0;

        while let Some(&ch) = chars.get(i) {
            i += 1;
            state = match state {
                GlobState::Text => match ch {
                    '*' => {
                        out.push(Segment::AnySeq);
                        GlobState::Text
                    }
                    '?' => {
                        out.push(Segment::AnyChar);
                        GlobState::Text
                    }
                    '[' => {
                        class = CharClass::default();
                        GlobState::ClassOpen
                    }
                    _ => {
                        out.literal(ch);
                        GlobState::Text
                    }
                },
                GlobState::ClassOpen if ch == '^' => {
                    class.negated = true;
                    GlobState::ClassOpenNegated
                }
                GlobState::ClassOpen | GlobState::ClassOpenNegated if ch == ']' => {
                    class.ranges.push((']', ']'));
                    GlobState::ClassBody { prior: None }
                }
                GlobState::ClassOpen | GlobState::ClassOpenNegated => {
                    class_member(&mut class, &chars, &mut i, ch, None)
                }
                GlobState::ClassBody { .. } if ch == ']' => {
                    out.push(Segment::CharClass(std::mem::take(&mut class)));
                    GlobState::Text
                }
                GlobState::ClassBody { prior } => {
                    class_member(&mut class, &chars, &mut i, ch, prior)
                }
            };
        }

        if state != GlobState::Text {
            out.push(Segment::CharClass(CharClass::empty()));
        }

        Self {
            kind: PatternKind::Glob,
            segments: out.finish(),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> PatternKind {
        self.kind
    }

    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Match against already-decoded codepoints.
    ///
    /// The malformed-input sentinel never equals a literal but is consumed
    /// by `_`, `?`, `%`, `*` and negated classes like any other unit.
    #[must_use]
    pub fn matches(&self, text: &[u32]) -> bool {
        let steps = self.steps();
        let mut p = 0;
        let mut t = 0;
        // Resume point after the last AnySeq: (step after it, text index).
        let mut backtrack: Option<(usize, usize)> = None;

        while t < text.len() {
            match steps.get(p) {
                Some(Step::AnySeq) => {
                    p += 1;
                    backtrack = Some((p, t));
                    continue;
                }
                Some(step) if self.step_accepts(step, text[t]) => {
                    p += 1;
                    t += 1;
                    continue;
                }
                _ => {}
            }
            let Some((resume, from)) = backtrack else {
                return false;
            };
            p = resume;
            t = from + 1;
            backtrack = Some((resume, t));
        }

        steps[p..].iter().all(|s| matches!(s, Step::AnySeq))
    }

    /// Decode `text` and match it.
    #[must_use]
    pub fn matches_bytes(&self, text: &[u8]) -> bool {
        let codepoints: Vec<u32> = decode(text).iter().map(|u| u.codepoint).collect();
        self.matches(&codepoints)
    }

    fn steps(&self) -> Vec<Step<'_>> {
        let mut steps = Vec::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(run) => steps.extend(run.iter().map(|&c| Step::Char(c))),
                Segment::AnyChar => steps.push(Step::AnyChar),
                Segment::AnySeq => steps.push(Step::AnySeq),
                Segment::CharClass(class) => steps.push(Step::Class(class)),
            }
        }
        steps
    }

    fn step_accepts(&self, step: &Step<'_>, codepoint: u32) -> bool {
        match *step {
            Step::Char(c) => match self.kind {
                PatternKind::Glob => u32::from(c) == codepoint,
                PatternKind::Like => ascii_fold(u32::from(c)) == ascii_fold(codepoint),
            },
            Step::AnyChar => true,
            Step::Class(class) => class.contains(codepoint),
            Step::AnySeq => false,
        }
    }
}

/// Handle one member character inside a bracket expression.
///
/// `-` forms a range when a prior single member exists and the next
/// character is neither `]` nor the end of the pattern; otherwise it is a
/// literal member.
fn class_member(
    class: &mut CharClass,
    chars: &[char],
    i: &mut usize,
    ch: char,
    prior: Option<char>,
) -> GlobState {
    if ch == '-' {
        if let (Some(lo), Some(&hi)) = (prior, chars.get(*i)) {
            if hi != ']' {
                *i += 1;
                // The prior member was pushed as a singleton; widen it.
                class.ranges.pop();
                class.ranges.push((lo, hi));
                return GlobState::ClassBody { prior: None };
            }
        }
    }
    class.ranges.push((ch, ch));
    GlobState::ClassBody { prior: Some(ch) }
}

#[derive(Debug, Clone, Copy)]
enum Step<'a> {
    Char(char),
    AnyChar,
    AnySeq,
    Class(&'a CharClass),
}

fn ascii_fold(codepoint: u32) -> u32 {
    if (u32::from(b'A')..=u32::from(b'Z')).contains(&codepoint) {
        codepoint + 0x20
    } else {
        codepoint
    }
}
