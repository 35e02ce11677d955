//! LIKE/GLOB query planning against the trigram index.
//!
//! A pattern is usable for an index probe when at least one literal run
//! normalizes to three or more units. Every row matching the pattern
//! contains every trigram of every such run, so the probe returns a
//! candidate superset the caller confirms with [`Pattern::matches`].
//!
//! [`Pattern::matches`]: crate::pattern::Pattern::matches

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::config::TrigramConfig;
use crate::normalize::Normalizer;
use crate::pattern::{Pattern, PatternKind, Segment};
use crate::tokenizer::{Trigram, trigrams_of};

// ---------------------------------------------------------------------------
// Query planner types
// ---------------------------------------------------------------------------

/// Comparison operator for an index constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstraintOp {
    Match,
    Like,
    Glob,
}

/// A single constraint from the WHERE clause that the planner is considering.
#[derive(Debug, Clone)]
pub struct IndexConstraint {
    /// Column index (0-based; `-1` for rowid, column count for the hidden
    /// table-named column).
    pub column: i32,
    /// The comparison operator.
    pub op: ConstraintOp,
    /// Whether the planner considers this constraint usable.
    pub usable: bool,
    /// Right-hand operand, when it is a constant known at plan time.
    pub rhs: Option<String>,
    /// ESCAPE character of a LIKE constraint.
    pub escape: Option<char>,
}

impl IndexConstraint {
    #[must_use]
    pub fn new(column: i32, op: ConstraintOp, rhs: Option<&str>) -> Self {
        Self {
            column,
            op,
            usable: true,
            rhs: rhs.map(str::to_owned),
            escape: None,
        }
    }
}

/// Per-constraint usage information set by `best_index`.
#[derive(Debug, Clone, Default)]
pub struct IndexConstraintUsage {
    /// 1-based index into the filter arguments; 0 leaves the constraint to
    /// the host.
    pub argv_index: i32,
    /// If `true`, the host need not re-check this constraint.
    pub omit: bool,
}

/// Information exchanged between the host planner and the table during
/// index selection.
#[derive(Debug, Clone)]
pub struct IndexInfo {
    pub constraints: Vec<IndexConstraint>,
    pub constraint_usage: Vec<IndexConstraintUsage>,
    /// Always 0; the strategy is carried entirely by `idx_str`.
    pub idx_num: i32,
    /// Concatenated index tags, e.g. `L0G1`.
    pub idx_str: Option<String>,
    pub estimated_cost: f64,
    pub estimated_rows: i64,
}

impl IndexInfo {
    #[must_use]
    pub fn new(constraints: Vec<IndexConstraint>) -> Self {
        let usage_len = constraints.len();
        Self {
            constraints,
            constraint_usage: vec![IndexConstraintUsage::default(); usage_len],
            idx_num: 0,
            idx_str: None,
            estimated_cost: FULL_SCAN_COST,
            estimated_rows: 1_000_000,
        }
    }

    /// Query-plan line for a scan of `table` with this index choice.
    #[must_use]
    pub fn explain(&self, table: &str) -> String {
        format!(
            "SCAN {table} VIRTUAL TABLE INDEX {}:{}",
            self.idx_num,
            self.idx_str.as_deref().unwrap_or("")
        )
    }
}

const FULL_SCAN_COST: f64 = 1_000_000.0;
const INDEX_PROBE_COST: f64 = 100.0;
const MATCH_COST: f64 = 10.0;

// ---------------------------------------------------------------------------
// Plan directives
// ---------------------------------------------------------------------------

/// Outcome of planning one LIKE/GLOB constraint.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlanDirective {
    /// Whether an index probe beats a full scan.
    pub usable: bool,
    /// Trigrams every matching row must contain.
    pub required_trigrams: BTreeSet<Trigram>,
    /// `L<col>` or `G<col>` when usable, empty otherwise.
    pub index_tag: String,
}

impl PlanDirective {
    /// Directive for a pattern that must be evaluated against every row.
    #[must_use]
    pub fn full_scan() -> Self {
        Self::default()
    }
}

/// Plans LIKE/GLOB constraints for one table's tokenizer configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PatternPlanner {
    config: TrigramConfig,
    normalizer: Normalizer,
}

impl PatternPlanner {
    #[must_use]
    pub const fn new(config: TrigramConfig) -> Self {
        Self {
            config,
            normalizer: Normalizer::for_config(config),
        }
    }

    /// Plan a parsed pattern against `column`.
    #[must_use]
    pub fn plan(&self, pattern: &Pattern, column: usize) -> PlanDirective {
        let kind = pattern.kind();

        // LIKE ignores ASCII case; a case-sensitive index would drop rows.
        if kind == PatternKind::Like && !self.config.folds_case() {
            debug!(
                op = kind.as_str(),
                column, "better_trigram: LIKE on case-sensitive index, full scan"
            );
            return PlanDirective::full_scan();
        }

        let required_trigrams = self.required_trigrams(pattern);
        if required_trigrams.is_empty() {
            debug!(
                op = kind.as_str(),
                column, "better_trigram: no literal trigram, full scan"
            );
            return PlanDirective::full_scan();
        }

        let prefix = match kind {
            PatternKind::Like => 'L',
            PatternKind::Glob => 'G',
        };
        let directive = PlanDirective {
            usable: true,
            required_trigrams,
            index_tag: format!("{prefix}{column}"),
        };
        debug!(
            op = kind.as_str(),
            column,
            trigrams = directive.required_trigrams.len(),
            tag = %directive.index_tag,
            "better_trigram: index probe planned"
        );
        directive
    }

    /// Parse and plan in one step. A NULL pattern has no plan: the
    /// constraint is false for every row.
    #[must_use]
    pub fn plan_text(
        &self,
        kind: PatternKind,
        pattern: Option<&str>,
        escape: Option<char>,
        column: usize,
    ) -> Option<PlanDirective> {
        pattern.map(|p| self.plan(&Pattern::parse(kind, p, escape), column))
    }

    /// Normalized trigrams of every literal run of three or more units.
    fn required_trigrams(&self, pattern: &Pattern) -> BTreeSet<Trigram> {
        let mut trigrams = BTreeSet::new();
        let mut run: Vec<u32> = Vec::new();

        for segment in pattern.segments() {
            match segment {
                Segment::Literal(chars) => {
                    for &ch in chars {
                        let cp = u32::from(ch);
                        if self.normalizer.elides(cp) {
                            // Merged into the preceding unit; with none in
                            // the run it belongs to an unknown character.
                            continue;
                        }
                        run.push(self.normalizer.fold(cp));
                    }
                }
                Segment::AnyChar | Segment::AnySeq | Segment::CharClass(_) => {
                    flush_run(&mut run, &mut trigrams);
                }
            }
        }
        flush_run(&mut run, &mut trigrams);
        trigrams
    }

    /// Choose an index strategy for the usable constraints in `info`.
    ///
    /// MATCH constraints are always consumed (tag `M`). LIKE and GLOB
    /// constraints are consumed when their pattern is known and plannable
    /// (tags `L<col>`, `G<col>`); the host still confirms those rows.
    pub fn best_index(&self, info: &mut IndexInfo) {
        let mut idx_str = String::new();
        let mut argv_index = 0;
        let mut has_match = false;
        let mut has_probe = false;

        for (i, constraint) in info.constraints.iter().enumerate() {
            if !constraint.usable {
                continue;
            }
            match constraint.op {
                ConstraintOp::Match => {
                    argv_index += 1;
                    if let Some(usage) = info.constraint_usage.get_mut(i) {
                        *usage = IndexConstraintUsage {
                            argv_index,
                            omit: true,
                        };
                    }
                    idx_str.push('M');
                    has_match = true;
                }
                ConstraintOp::Like | ConstraintOp::Glob => {
                    let (Some(rhs), Ok(column)) =
                        (constraint.rhs.as_deref(), usize::try_from(constraint.column))
                    else {
                        continue;
                    };
                    let kind = if constraint.op == ConstraintOp::Like {
                        PatternKind::Like
                    } else {
                        PatternKind::Glob
                    };
                    let plan = self.plan(&Pattern::parse(kind, rhs, constraint.escape), column);
                    if !plan.usable {
                        continue;
                    }
                    argv_index += 1;
                    if let Some(usage) = info.constraint_usage.get_mut(i) {
                        *usage = IndexConstraintUsage {
                            argv_index,
                            omit: false,
                        };
                    }
                    idx_str.push_str(&plan.index_tag);
                    has_probe = true;
                }
            }
        }

        info.idx_num = 0;
        info.idx_str = (!idx_str.is_empty()).then_some(idx_str);
        if has_match {
            info.estimated_cost = MATCH_COST;
            info.estimated_rows = 10;
        } else if has_probe {
            info.estimated_cost = INDEX_PROBE_COST;
            info.estimated_rows = 100;
        } else {
            info.estimated_cost = FULL_SCAN_COST;
            info.estimated_rows = 1_000_000;
        }
    }
}

fn flush_run(run: &mut Vec<u32>, trigrams: &mut BTreeSet<Trigram>) {
    if run.len() >= 3 {
        trace!(units = run.len(), "better_trigram: literal run");
        trigrams.extend(trigrams_of(run));
    }
    run.clear();
}
