//! Expression translation
//!
//! Every expression translates into a `(Label, Plan)` pair: the label
//! names the value for the consuming step, the plan holds the steps
//! that compute it. Children are translated first and their plans merged
//! before the parent adds its own step, so references only point back.

use std::sync::Arc;

use crate::config::PlannerConfig;
use crate::planner::error::{PlanError, PlanResult};
use crate::planner::label::Label;
use crate::planner::plan::Plan;
use crate::planner::step::{Part, StepCounter};
use crate::sql::{BinaryOp, ColumnRef, Expr, FunctionCall, Ident, Literal, UnaryOp};

/// Leading phrase of every boolean check step
pub const CHECK_IF: &str = "Check if";

/// Result of translating a node
pub(crate) type Translated = (Label, Plan);

/// Translates one query; lives for a single planning session
pub(crate) struct Translator<'a> {
    pub(crate) config: &'a PlannerConfig,
    counter: Arc<StepCounter>,
}

impl<'a> Translator<'a> {
    pub(crate) fn new(config: &'a PlannerConfig, counter: Arc<StepCounter>) -> Self {
        Self { config, counter }
    }

    /// Empty plan in this session
    pub(crate) fn plan(&self) -> Plan {
        Plan::new(Arc::clone(&self.counter))
    }

    /// Identifier as shown in steps
    pub(crate) fn identifier(&self, ident: &Ident) -> String {
        let name = if self.config.case_sensitive {
            ident.value.clone()
        } else {
            ident.value.to_lowercase()
        };
        if self.config.quote_identifiers || ident.quoted {
            format!("'{}'", name)
        } else {
            name
        }
    }

    /// Column as shown in steps: `col`, `col in t`, `col in t in schema s`
    pub(crate) fn column(&self, col: &ColumnRef) -> String {
        let mut out = self.identifier(&col.name);
        if let Some(table) = &col.table {
            out.push_str(" in ");
            out.push_str(&self.identifier(table));
        }
        if let Some(schema) = &col.schema {
            out.push_str(" in schema ");
            out.push_str(&self.identifier(schema));
        }
        out
    }

    /// Possibly schema-qualified table name as shown in steps
    pub(crate) fn table_name(&self, name: &[Ident]) -> String {
        match name.split_last() {
            Some((table, [])) => self.identifier(table),
            Some((table, qualifiers)) => {
                let qualifiers: Vec<String> =
                    qualifiers.iter().map(|q| self.identifier(q)).collect();
                format!(
                    "{} in schema {}",
                    self.identifier(table),
                    qualifiers.join(".")
                )
            }
            None => String::new(),
        }
    }

    /// Translate an expression
    pub(crate) fn expr(&self, expr: &Expr) -> PlanResult<Translated> {
        match expr {
            Expr::Column(col) => Ok((Label::text(self.column(col)), self.plan())),
            Expr::Literal(lit) => Ok((Label::text(literal(lit)), self.plan())),
            Expr::Binary { left, op, right } => {
                let (left, mut plan) = self.expr(left)?;
                let (right, right_plan) = self.expr(right)?;
                plan.add_plan(right_plan);

                let mut parts = left.into_parts();
                parts.push(Part::text(binary_phrase(*op)));
                parts.extend(right.into_parts());

                if op.is_arithmetic() {
                    Ok((Label::from(parts), plan))
                } else {
                    Ok(self.check(plan, parts))
                }
            }
            Expr::Unary { op, expr } => {
                let (operand, plan) = self.expr(expr)?;
                match op {
                    UnaryOp::Not => {
                        let mut parts = operand.into_parts();
                        parts.push(Part::text("is false"));
                        Ok(self.check(plan, parts))
                    }
                    UnaryOp::Neg => Ok((operand.with_prefix("-"), plan)),
                    UnaryOp::Plus => Ok((operand, plan)),
                }
            }
            Expr::Is {
                expr,
                value,
                negated,
            } => {
                let (operand, plan) = self.expr(expr)?;
                let mut parts = operand.into_parts();
                parts.push(Part::text(if *negated { "is not" } else { "is" }));
                parts.push(Part::text(literal(value)));
                Ok(self.check(plan, parts))
            }
            Expr::Between {
                expr,
                low,
                high,
                negated,
            } => {
                let (operand, mut plan) = self.expr(expr)?;
                let (low, low_plan) = self.expr(low)?;
                let (high, high_plan) = self.expr(high)?;
                plan.add_plan(low_plan);
                plan.add_plan(high_plan);

                let mut parts = operand.into_parts();
                parts.push(Part::text(if *negated {
                    "is not between"
                } else {
                    "is between"
                }));
                parts.extend(low.into_parts());
                parts.push(Part::text("and"));
                parts.extend(high.into_parts());
                Ok(self.check(plan, parts))
            }
            Expr::InList {
                expr,
                list,
                negated,
            } => {
                let (operand, mut plan) = self.expr(expr)?;
                let mut items = Vec::with_capacity(list.len());
                for item in list {
                    let (label, item_plan) = self.expr(item)?;
                    plan.add_plan(item_plan);
                    items.push(label);
                }

                let mut parts = operand.into_parts();
                parts.push(Part::text(if *negated {
                    "is not one of"
                } else {
                    "is one of"
                }));
                parts.extend(Label::comma_list(items).into_parts());
                Ok(self.check(plan, parts))
            }
            Expr::InSubquery {
                expr,
                subquery,
                negated,
            } => {
                let (operand, mut plan) = self.expr(expr)?;
                let (rows, sub_plan) = self.query(subquery)?;
                plan.add_plan(sub_plan);

                let mut parts = operand.into_parts();
                parts.push(Part::text(if *negated {
                    "does not appear in"
                } else {
                    "appears in"
                }));
                parts.extend(rows.into_parts());
                Ok(self.check(plan, parts))
            }
            Expr::Exists { subquery, negated } => {
                let (rows, plan) = self.query(subquery)?;
                let mut parts = rows.into_parts();
                parts.push(Part::text(if *negated {
                    "contains no rows"
                } else {
                    "contains at least one row"
                }));
                Ok(self.check(plan, parts))
            }
            Expr::Subquery(query) => self.query(query),
            Expr::Like {
                expr,
                pattern,
                negated,
                case_insensitive,
            } => {
                let (operand, mut plan) = self.expr(expr)?;
                let (pattern, pattern_plan) = self.expr(pattern)?;
                plan.add_plan(pattern_plan);

                let verb = match (*negated, *case_insensitive) {
                    (false, false) => "matches",
                    (true, false) => "does not match",
                    (false, true) => "matches (ignoring case)",
                    (true, true) => "does not match (ignoring case)",
                };
                let mut parts = operand.into_parts();
                parts.push(Part::text(verb));
                parts.extend(pattern.into_parts());
                Ok(self.check(plan, parts))
            }
            Expr::Function(func) => self.function(func),
            Expr::Nested(inner) => {
                let (label, plan) = self.expr(inner)?;
                match inner.as_ref() {
                    Expr::Binary { op, .. } if op.is_arithmetic() => {
                        Ok((label.parenthesized(), plan))
                    }
                    _ => Ok((label, plan)),
                }
            }
            Expr::Wildcard => Err(PlanError::unsupported(expr.kind())),
        }
    }

    /// Add a `Check if ...` step and label it
    fn check(&self, mut plan: Plan, body: Vec<Part>) -> Translated {
        let mut parts = Vec::with_capacity(body.len() + 1);
        parts.push(Part::text(CHECK_IF));
        parts.extend(body);
        let id = plan.add_step(parts);
        (Label::step(id), plan)
    }

    /// Aggregates and the supported scalar functions render inline
    fn function(&self, func: &FunctionCall) -> PlanResult<Translated> {
        let name = func.name.to_ascii_lowercase();
        let distinct = if func.distinct { " distinct" } else { "" };

        if name == "count" && matches!(func.args.as_slice(), [Expr::Wildcard]) {
            return Ok((Label::text("number of rows"), self.plan()));
        }

        let (lead, trail) = match (name.as_str(), func.args.len()) {
            ("count", 1) => (format!("number of{} non-null values in", distinct), None),
            ("sum", 1) => (format!("sum of{}", distinct), None),
            ("avg", 1) => (format!("average of{}", distinct), None),
            ("min", 1) => (format!("minimum of{}", distinct), None),
            ("max", 1) => (format!("maximum of{}", distinct), None),
            ("lower", 1) => ("lowercase version of".to_string(), None),
            ("upper", 1) => ("uppercase version of".to_string(), None),
            ("length" | "char_length" | "len", 1) => ("length of".to_string(), None),
            ("abs", 1) => ("absolute value of".to_string(), None),
            ("round", 1) => (String::new(), Some("rounded to an integer")),
            ("round", 2) => (String::new(), Some("rounded to")),
            _ => return Err(PlanError::unsupported(format!("function {}", func.name))),
        };

        let mut plan = self.plan();
        let mut args = Vec::with_capacity(func.args.len());
        for arg in &func.args {
            let (label, arg_plan) = self.expr(arg)?;
            plan.add_plan(arg_plan);
            args.push(label);
        }
        let mut args = args.into_iter();

        let mut parts = Vec::new();
        if !lead.is_empty() {
            parts.push(Part::text(lead));
        }
        if let Some(first) = args.next() {
            parts.extend(first.into_parts());
        }
        if let Some(trail) = trail {
            parts.push(Part::text(trail));
        }
        if let Some(digits) = args.next() {
            parts.extend(digits.into_parts());
            parts.push(Part::text("decimal places"));
        }
        Ok((Label::from(parts), plan))
    }
}

/// Literal as shown in steps
pub(crate) fn literal(lit: &Literal) -> String {
    match lit {
        Literal::Null => "unknown".to_string(),
        Literal::Boolean(true) => "true".to_string(),
        Literal::Boolean(false) => "false".to_string(),
        Literal::Number(n) => n.clone(),
        Literal::String(s) => {
            let has_letters = s.chars().any(char::is_alphabetic);
            let has_upper = s.chars().any(char::is_uppercase);
            if has_letters && !has_upper {
                format!("'{}' (all lowercase)", s)
            } else {
                format!("'{}'", s)
            }
        }
    }
}

fn binary_phrase(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Plus => "plus",
        BinaryOp::Minus => "minus",
        BinaryOp::Multiply => "times",
        BinaryOp::Divide => "divided by",
        BinaryOp::Modulo => "modulo",
        BinaryOp::Concat => "concatenated with",
        BinaryOp::Eq => "equals",
        BinaryOp::NotEq => "is not equal to",
        BinaryOp::Lt => "is less than",
        BinaryOp::LtEq => "is less than or equal to",
        BinaryOp::Gt => "is greater than",
        BinaryOp::GtEq => "is greater or equal to",
        BinaryOp::And => "and",
        BinaryOp::Or => "or",
    }
}
