//! Query translation
//!
//! Single-table SELECT blocks follow a linear pipeline:
//!
//! ```text
//! FROM → WHERE → GROUP BY → HAVING → ORDER BY → OFFSET → LIMIT → columns → DISTINCT
//! ```
//!
//! Each present clause adds one step consuming the previous step's result.
//! SELECT blocks over several relations are routed to the join path.

use tracing::{debug, trace};

use crate::planner::error::PlanResult;
use crate::planner::expr::{Translated, Translator};
use crate::planner::label::Label;
use crate::planner::plan::Plan;
use crate::sql::{Expr, Query, QueryBody, Select, SelectItem, SetOperator, TableRef};

/// Input named by clauses of a SELECT without FROM
const SINGLE_ROW: &str = "a single row";

impl Translator<'_> {
    /// Translate a full query; the label refers to its last step
    pub(crate) fn query(&self, query: &Query) -> PlanResult<Translated> {
        match &query.body {
            QueryBody::Select(select) if select.relation_count() > 1 => {
                debug!(
                    relations = select.relation_count(),
                    "routing to join path"
                );
                self.join_select(select, query)
            }
            QueryBody::Select(select) => {
                trace!("routing to single-table path");
                self.single_select(select, query)
            }
            QueryBody::SetOperation {
                op,
                all,
                left,
                right,
            } => {
                let (label, mut plan) = self.set_operation(*op, *all, left, right)?;
                let label = self.order_and_limit(query, label, &mut plan, false)?;
                Ok((label, plan))
            }
        }
    }

    fn single_select(&self, select: &Select, query: &Query) -> PlanResult<Translated> {
        let mut plan = self.plan();

        let mut input = match select.from.first() {
            Some(item) => Some(self.load(&item.relation, &mut plan)?),
            None => None,
        };

        if let Some(selection) = &select.selection {
            let (cond, cond_plan) = self.expr(selection)?;
            plan.add_plan(cond_plan);
            let parts = Label::text("Filter")
                .chain(single_row_or(input))
                .with_suffix("using condition:")
                .chain(cond);
            input = Some(Label::step(plan.add_step(parts.into_parts())));
        }

        let grouped = select.has_grouping() || query.has_row_modifiers();
        if grouped {
            let label = self.grouping(select, single_row_or(input), &mut plan, false)?;
            input = Some(self.order_and_limit(query, label, &mut plan, false)?);
        }

        let mut columns = Vec::with_capacity(select.projection.len());
        for item in &select.projection {
            let (label, item_plan) = self.select_item(item)?;
            plan.add_plan(item_plan);
            columns.push(label);
        }
        let mut parts = Label::text("Create table with columns").chain(Label::list(columns));
        if let Some(input) = input {
            parts = parts.with_suffix("from").chain(input);
        }
        let mut result = Label::step(plan.add_step(parts.into_parts()));

        if select.distinct {
            result = self.distinct(result, &mut plan);
        }

        Ok((result, plan))
    }

    /// Load the single FROM relation of a non-join SELECT
    fn load(&self, relation: &TableRef, plan: &mut Plan) -> PlanResult<Label> {
        match relation {
            TableRef::Table { name, alias } => {
                let mut parts =
                    Label::text(format!("Load data for table {}", self.table_name(name)));
                if let Some(alias) = alias {
                    parts = parts.with_suffix(format!("(aka. {})", self.identifier(alias)));
                }
                Ok(Label::step(plan.add_step(parts.into_parts())))
            }
            TableRef::Derived { subquery, alias } => {
                let (label, sub_plan) = self.query(subquery)?;
                plan.add_plan(sub_plan);
                Ok(match alias {
                    Some(alias) => label.with_suffix(format!("(aka. {})", self.identifier(alias))),
                    None => label,
                })
            }
        }
    }

    /// GROUP BY and HAVING steps
    pub(crate) fn grouping(
        &self,
        select: &Select,
        mut input: Label,
        plan: &mut Plan,
        strip: bool,
    ) -> PlanResult<Label> {
        if !select.group_by.is_empty() {
            let mut keys = Vec::with_capacity(select.group_by.len());
            for key in &select.group_by {
                let (label, key_plan) = self.expr(&unqualified(key, strip))?;
                plan.add_plan(key_plan);
                keys.push(label);
            }
            let parts = Label::text("Group rows from")
                .chain(input)
                .with_suffix("using")
                .chain(Label::list(keys));
            input = Label::step(plan.add_step(parts.into_parts()));
        }

        if let Some(having) = &select.having {
            let (cond, cond_plan) = self.expr(&unqualified(having, strip))?;
            plan.add_plan(cond_plan);
            let parts = Label::text("Filter groups from")
                .chain(input)
                .with_suffix("using condition:")
                .chain(cond);
            input = Label::step(plan.add_step(parts.into_parts()));
        }

        Ok(input)
    }

    /// ORDER BY, OFFSET and LIMIT steps
    pub(crate) fn order_and_limit(
        &self,
        query: &Query,
        mut input: Label,
        plan: &mut Plan,
        strip: bool,
    ) -> PlanResult<Label> {
        if !query.order_by.is_empty() {
            let mut keys = Vec::with_capacity(query.order_by.len());
            for item in &query.order_by {
                let (label, key_plan) = self.expr(&unqualified(&item.expr, strip))?;
                plan.add_plan(key_plan);
                let direction = if item.descending {
                    "(descending)"
                } else {
                    "(ascending)"
                };
                keys.push(label.with_suffix(direction));
            }
            let parts = Label::text("Order rows from")
                .chain(input)
                .with_suffix("using")
                .chain(Label::list(keys));
            input = Label::step(plan.add_step(parts.into_parts()));
        }

        if let Some(offset) = &query.offset {
            let (count, count_plan) = self.expr(&unqualified(offset, strip))?;
            plan.add_plan(count_plan);
            let parts = Label::text("Skip the first")
                .chain(count)
                .with_suffix("rows from")
                .chain(input);
            input = Label::step(plan.add_step(parts.into_parts()));
        }

        if let Some(limit) = &query.limit {
            let (count, count_plan) = self.expr(&unqualified(limit, strip))?;
            plan.add_plan(count_plan);
            let parts = Label::text("Keep only")
                .chain(count)
                .with_suffix("rows from")
                .chain(input);
            input = Label::step(plan.add_step(parts.into_parts()));
        }

        Ok(input)
    }

    /// Label of one output column
    pub(crate) fn select_item(&self, item: &SelectItem) -> PlanResult<Translated> {
        match item {
            SelectItem::Expr { expr, alias } => {
                let (label, plan) = self.expr(expr)?;
                let label = match alias {
                    Some(alias) => label.with_suffix(format!("(aka. {})", self.identifier(alias))),
                    None => label,
                };
                Ok((label, plan))
            }
            SelectItem::Wildcard => Ok((Label::text("all columns"), self.plan())),
            SelectItem::QualifiedWildcard(table) => Ok((
                Label::text(format!("all columns of {}", self.identifier(table))),
                self.plan(),
            )),
        }
    }

    pub(crate) fn distinct(&self, input: Label, plan: &mut Plan) -> Label {
        let parts = Label::text("Only keep unique rows from").chain(input);
        Label::step(plan.add_step(parts.into_parts()))
    }

    fn set_operation(
        &self,
        op: SetOperator,
        all: bool,
        left: &Query,
        right: &Query,
    ) -> PlanResult<Translated> {
        let (left, mut plan) = self.query(left)?;
        let (right, right_plan) = self.query(right)?;
        plan.add_plan(right_plan);

        let duplicates = if all {
            "(keep duplicates)"
        } else {
            "(remove duplicates)"
        };
        let parts = match op {
            SetOperator::Union => Label::text("Combine rows from")
                .chain(left)
                .with_suffix("and")
                .chain(right),
            SetOperator::Intersect => Label::text("Intersect rows from")
                .chain(left)
                .with_suffix("with")
                .chain(right),
            SetOperator::Except => Label::text("Remove from")
                .chain(left)
                .with_suffix("all rows that appear in")
                .chain(right),
        }
        .with_suffix(duplicates);

        let id = plan.add_step(parts.into_parts());
        Ok((Label::step(id), plan))
    }
}

fn single_row_or(input: Option<Label>) -> Label {
    input.unwrap_or_else(|| Label::text(SINGLE_ROW))
}

/// Column qualifiers are meaningless once relations are joined
fn unqualified(expr: &Expr, strip: bool) -> Expr {
    if strip {
        expr.without_qualifiers()
    } else {
        expr.clone()
    }
}
