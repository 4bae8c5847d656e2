//! Plan rendering
//!
//! Turns steps into numbered natural-language sentences.

use std::collections::HashMap;

use crate::planner::error::{PlanError, PlanResult};
use crate::planner::plan::Plan;
use crate::planner::step::{Part, Step, StepId};

/// Format a plan as text, one numbered step per line
pub struct PlanText;

impl PlanText {
    /// Format `plan` numbering from `offset + 1`, each line preceded by
    /// `prefix` (e.g. a comment marker) when it is non-empty
    pub fn format(plan: &Plan, prefix: &str, offset: usize) -> PlanResult<String> {
        let lines = plan.steps(offset)?;
        let lines: Vec<String> = if prefix.is_empty() {
            lines
        } else {
            lines
                .into_iter()
                .map(|line| format!("{} {}", prefix, line))
                .collect()
        };
        Ok(lines.join("\n"))
    }
}

/// Render one step as `"<number>. <sentence>."`.
///
/// `positions` maps identifiers to display numbers; a reference must
/// resolve to a number below `number`.
pub(crate) fn render_line(
    step: &Step,
    number: usize,
    positions: &HashMap<StepId, usize>,
) -> PlanResult<String> {
    let mut sentence = String::new();
    for part in step.parts() {
        let fragment = match part {
            Part::Text(text) => text.clone(),
            Part::Ref(id) => match positions.get(id) {
                Some(&pos) if pos < number => format!("results of Step {}", pos),
                _ => return Err(PlanError::UnresolvedReference { step: *id }),
            },
        };
        push_fragment(&mut sentence, &fragment);
    }

    let sentence = sentence.trim_end();
    if sentence.ends_with('.') {
        Ok(format!("{}. {}", number, sentence))
    } else {
        Ok(format!("{}. {}.", number, sentence))
    }
}

/// Append with a single separating space, except after an opening
/// parenthesis or before closing punctuation. A leading-dot number such
/// as `.5` is a value, not punctuation.
fn push_fragment(out: &mut String, fragment: &str) {
    let mut chars = fragment.chars();
    let attaches = match chars.next() {
        None => return,
        Some(',' | ':' | ';' | ')') => true,
        Some('.') => !chars.next().is_some_and(|c| c.is_ascii_digit()),
        Some(_) => false,
    };
    if !out.is_empty() && !attaches && !out.ends_with('(') {
        out.push(' ');
    }
    out.push_str(fragment);
}
