//! Plan simplification
//!
//! Rules that rewrite finished plans into shorter ones. Rules only splice
//! and remove steps; surviving steps keep their identifiers.

use tracing::{debug, trace};

use crate::planner::expr::CHECK_IF;
use crate::planner::plan::Plan;
use crate::planner::step::{Part, StepId};

/// Simplification rule trait
pub trait PlanRule: Send + Sync {
    /// Rule name for debugging
    fn name(&self) -> &'static str;

    /// Rewrite the plan in place, returning the number of rewrites
    fn apply(&self, plan: &mut Plan) -> usize;
}

/// Inline `Check if ...` steps used by exactly one other step.
///
/// `Check if a equals 1` referenced by `Filter t using condition: <ref>`
/// becomes `Filter t using condition: a equals 1`.
pub struct InlineChecks;

impl PlanRule for InlineChecks {
    fn name(&self) -> &'static str {
        "inline_checks"
    }

    fn apply(&self, plan: &mut Plan) -> usize {
        let counts = plan.step_ref_counts();
        let candidates: Vec<StepId> = plan
            .iter()
            .filter(|(id, step)| step.starts_with(CHECK_IF) && counts.get(id) == Some(&1))
            .map(|(id, _)| id)
            .collect();

        let mut inlined = 0;
        for target in candidates {
            let consumer = plan
                .iter()
                .find(|(_, step)| step.refs().any(|r| r == target))
                .map(|(id, step)| (id, step.starts_with(CHECK_IF)));
            let Some((consumer, consumer_is_check)) = consumer else {
                continue;
            };
            let Some(removed) = plan.remove(target) else {
                continue;
            };

            let mut body: Vec<Part> = removed.parts().iter().skip(1).cloned().collect();

            if let Some(step) = plan.get_mut(consumer) {
                let parts = step.parts_mut();
                if let Some(pos) = parts.iter().position(|p| *p == Part::Ref(target)) {
                    let grouped = if consumer_is_check {
                        has_connective(&body)
                    } else {
                        has_list(parts)
                    };
                    if grouped {
                        body.insert(0, Part::text("("));
                        body.push(Part::text(")"));
                    }
                    parts.splice(pos..=pos, body);
                    trace!(step = %target, into = %consumer, "inlined check");
                    inlined += 1;
                }
            }
        }
        inlined
    }
}

/// Whether the parts chain conditions with `and`/`or`
fn has_connective(parts: &[Part]) -> bool {
    parts
        .iter()
        .any(|p| matches!(p.as_text(), Some("and") | Some("or")))
}

/// Whether the parts hold an `a and b` or `a, b, and c` list
fn has_list(parts: &[Part]) -> bool {
    parts
        .iter()
        .any(|p| matches!(p.as_text(), Some(",") | Some("and")))
}

/// Applies rules until none of them rewrites anything
pub struct Simplifier {
    rules: Vec<Box<dyn PlanRule>>,
}

impl Default for Simplifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Simplifier {
    /// Create a simplifier with the default rules
    pub fn new() -> Self {
        Self {
            rules: vec![Box::new(InlineChecks)],
        }
    }

    /// Create a simplifier with custom rules
    pub fn with_rules(rules: Vec<Box<dyn PlanRule>>) -> Self {
        Self { rules }
    }

    /// Simplify to a fixed point
    pub fn simplify(&self, plan: &mut Plan) {
        let before = plan.len();
        let mut rounds = 0;
        loop {
            rounds += 1;
            let mut rewrites = 0;
            for rule in &self.rules {
                let applied = rule.apply(plan);
                if applied > 0 {
                    trace!(rule = rule.name(), rewrites = applied, round = rounds, "applied rule");
                }
                rewrites += applied;
            }
            if rewrites == 0 {
                break;
            }
        }
        debug!(rounds, before, after = plan.len(), "simplified plan");
    }

    /// Get the names of all rules
    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }
}
