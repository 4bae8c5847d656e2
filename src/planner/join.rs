//! Join and predicate restructuring
//!
//! A SELECT over several relations becomes an explicit sequence:
//!
//! ```text
//! load each relation → per-relation filters → joins (left to right)
//!   → remaining filters → group/order/limit → one retrieval per column
//!   → result table → DISTINCT
//! ```
//!
//! WHERE conjuncts that only mention one relation are applied to that
//! relation before joining, unless an outer join would then see rows the
//! WHERE clause removes.

use tracing::{debug, trace};

use crate::planner::error::{PlanError, PlanResult};
use crate::planner::expr::{Translated, Translator};
use crate::planner::label::Label;
use crate::sql::{BinaryOp, Expr, Ident, JoinConstraint, JoinKind, Query, Select, TableRef};

/// Constraint of comma-separated FROM items
static NO_CONSTRAINT: JoinConstraint = JoinConstraint::None;

/// One relation of the FROM clause, in source order
struct Source<'q> {
    relation: &'q TableRef,
    /// How the relation joins those before it; `None` for the first
    join: Option<(JoinKind, &'q JoinConstraint)>,
    alias: &'q Ident,
    /// Whether filters may run before the joins
    pushable: bool,
}

impl Translator<'_> {
    pub(crate) fn join_select(&self, select: &Select, query: &Query) -> PlanResult<Translated> {
        let sources = sources(select)?;
        let mut plan = self.plan();

        // Load
        let mut labels = Vec::with_capacity(sources.len());
        for source in &sources {
            let alias = self.identifier(source.alias);
            let parts = match source.relation {
                TableRef::Table { name, .. } => Label::text(format!(
                    "Load table {} and store as alias {}",
                    self.table_name(name),
                    alias
                )),
                TableRef::Derived { subquery, .. } => {
                    let (rows, sub_plan) = self.query(subquery)?;
                    plan.add_plan(sub_plan);
                    Label::text("Store")
                        .chain(rows)
                        .with_suffix(format!("as alias {}", alias))
                }
            };
            labels.push(Label::step(plan.add_step(parts.into_parts())));
        }

        // Per-relation filters
        let mut remaining = Vec::new();
        if let Some(selection) = &select.selection {
            for conjunct in selection.conjuncts() {
                match single_source(conjunct, &sources) {
                    Some(idx) if sources[idx].pushable => {
                        trace!(alias = %sources[idx].alias.value, "pushing filter below join");
                        let (cond, cond_plan) = self.expr(conjunct)?;
                        plan.add_plan(cond_plan);
                        let parts = Label::text("Filter")
                            .chain(labels[idx].clone())
                            .with_suffix(":")
                            .chain(cond);
                        labels[idx] = Label::step(plan.add_step(parts.into_parts()));
                    }
                    _ => remaining.push(conjunct),
                }
            }
        }
        debug!(
            pushed = select
                .selection
                .as_ref()
                .map_or(0, |s| s.conjuncts().len() - remaining.len()),
            remaining = remaining.len(),
            "split WHERE conjuncts"
        );

        // Joins
        let mut labels = labels.into_iter();
        let mut current = match labels.next() {
            Some(first) => first,
            None => return Err(PlanError::InvalidPlan("join without relations".to_string())),
        };
        for (source, right) in sources.iter().skip(1).zip(labels) {
            let (kind, constraint) = match source.join {
                Some(join) => join,
                None => (JoinKind::Cross, &NO_CONSTRAINT),
            };
            let verb = match kind {
                JoinKind::Inner | JoinKind::Cross => "Join",
                JoinKind::Left => "Left outer join",
                JoinKind::Right => "Right outer join",
                JoinKind::Full => "Full outer join",
            };
            let mut parts = Label::text(verb)
                .chain(current)
                .with_suffix("with")
                .chain(right);
            match constraint {
                JoinConstraint::On(cond) => {
                    let (cond, cond_plan) = self.join_condition(cond)?;
                    plan.add_plan(cond_plan);
                    parts = parts.with_suffix("- condition:").chain(cond);
                }
                JoinConstraint::None => {
                    parts = parts.with_suffix("- condition: none (all combinations of rows)");
                }
                JoinConstraint::Using(_) => {
                    return Err(PlanError::MalformedJoinCondition(
                        "USING instead of an equality".to_string(),
                    ))
                }
                JoinConstraint::Natural => {
                    return Err(PlanError::MalformedJoinCondition(
                        "NATURAL instead of an equality".to_string(),
                    ))
                }
            }
            current = Label::step(plan.add_step(parts.into_parts()));
        }

        // Filters spanning relations
        for conjunct in remaining {
            let (cond, cond_plan) = self.expr(conjunct)?;
            plan.add_plan(cond_plan);
            let parts = Label::text("Filter")
                .chain(current)
                .with_suffix(":")
                .chain(cond);
            current = Label::step(plan.add_step(parts.into_parts()));
        }

        current = self.grouping(select, current, &mut plan, true)?;
        current = self.order_and_limit(query, current, &mut plan, true)?;

        // One retrieval per output column
        let mut columns = Vec::with_capacity(select.projection.len());
        for item in &select.projection {
            let (label, item_plan) = self.select_item(item)?;
            plan.add_plan(item_plan);
            let parts = Label::text("Retrieve")
                .chain(label)
                .with_suffix("from")
                .chain(current.clone());
            columns.push(Label::step(plan.add_step(parts.into_parts())));
        }
        let parts = Label::text("Create table with columns for").chain(Label::list(columns));
        let mut result = Label::step(plan.add_step(parts.into_parts()));

        if select.distinct {
            result = self.distinct(result, &mut plan);
        }

        Ok((result, plan))
    }

    /// Equality, or AND-chain of equalities, rendered inline
    fn join_condition(&self, cond: &Expr) -> PlanResult<Translated> {
        let mut plan = self.plan();
        let mut equalities = Vec::new();
        for conjunct in cond.conjuncts() {
            match without_parens(conjunct) {
                Expr::Binary {
                    left,
                    op: BinaryOp::Eq,
                    right,
                } => {
                    let (left, left_plan) = self.expr(left)?;
                    let (right, right_plan) = self.expr(right)?;
                    plan.add_plan(left_plan);
                    plan.add_plan(right_plan);
                    equalities.push(left.with_suffix("equals").chain(right));
                }
                other => {
                    return Err(PlanError::MalformedJoinCondition(format!(
                        "expected an equality, found {}",
                        other.kind()
                    )))
                }
            }
        }
        Ok((Label::list(equalities), plan))
    }
}

/// Flatten FROM items and their joins, resolving aliases and deciding
/// which relations may be filtered before joining
fn sources(select: &Select) -> PlanResult<Vec<Source<'_>>> {
    let mut sources = Vec::with_capacity(select.relation_count());
    for (idx, item) in select.from.iter().enumerate() {
        let join = if idx == 0 {
            None
        } else {
            Some((JoinKind::Cross, &NO_CONSTRAINT))
        };
        sources.push(source(&item.relation, join)?);
        for join in &item.joins {
            sources.push(source(&join.relation, Some((join.kind, &join.constraint)))?);
        }
    }

    // The null-supplying side of an outer join must not be filtered early
    for idx in 0..sources.len() {
        let join = sources[idx].join;
        match join {
            Some((JoinKind::Left, _)) => sources[idx].pushable = false,
            Some((JoinKind::Right, _)) => {
                for earlier in &mut sources[..idx] {
                    earlier.pushable = false;
                }
            }
            Some((JoinKind::Full, _)) => {
                for source in &mut sources[..=idx] {
                    source.pushable = false;
                }
            }
            _ => {}
        }
    }

    Ok(sources)
}

fn source<'q>(
    relation: &'q TableRef,
    join: Option<(JoinKind, &'q JoinConstraint)>,
) -> PlanResult<Source<'q>> {
    let alias = match relation.alias().or_else(|| relation.table_name()) {
        Some(alias) => alias,
        None => return Err(PlanError::unsupported("derived table without alias")),
    };
    Ok(Source {
        relation,
        join,
        alias,
        pushable: true,
    })
}

/// Index of the only relation `expr` mentions, if every column is
/// qualified with the same relation
fn single_source(expr: &Expr, sources: &[Source<'_>]) -> Option<usize> {
    let mut found = None;
    for column in expr.columns() {
        let qualifier = column.table.as_ref()?;
        let idx = sources.iter().position(|s| same_name(s.alias, qualifier))?;
        match found {
            None => found = Some(idx),
            Some(prev) if prev == idx => {}
            Some(_) => return None,
        }
    }
    found
}

/// Unquoted names match case-insensitively
fn same_name(a: &Ident, b: &Ident) -> bool {
    a.matches(&b.value, a.quoted || b.quoted)
}

fn without_parens(mut expr: &Expr) -> &Expr {
    while let Expr::Nested(inner) = expr {
        expr = inner;
    }
    expr
}
