//! Step store
//!
//! A `Plan` is an ordered list of steps, each tagged with the identifier
//! it received at creation. Steps only ever refer to identifiers handed
//! out earlier, so merging child plans in translation order keeps every
//! reference pointing backwards.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::planner::error::{PlanError, PlanResult};
use crate::planner::render;
use crate::planner::step::{Part, Step, StepCounter, StepId};

/// Ordered collection of uniquely identified steps
#[derive(Debug, Clone)]
pub struct Plan {
    counter: Arc<StepCounter>,
    steps: Vec<(StepId, Step)>,
}

impl Plan {
    /// Empty plan drawing identifiers from `counter`
    pub fn new(counter: Arc<StepCounter>) -> Self {
        Self {
            counter,
            steps: Vec::new(),
        }
    }

    /// Empty plan with a counter of its own
    pub fn session() -> Self {
        Self::new(Arc::new(StepCounter::new()))
    }

    /// Empty plan sharing this plan's counter
    pub fn child(&self) -> Self {
        Self::new(Arc::clone(&self.counter))
    }

    pub fn counter(&self) -> &Arc<StepCounter> {
        &self.counter
    }

    /// Append a step and return its identifier
    pub fn add_step(&mut self, parts: Vec<Part>) -> StepId {
        let id = self.counter.next_id();
        self.steps.push((id, Step::new(parts)));
        id
    }

    /// Insert a text-only step in front of all others.
    ///
    /// Used for setup instructions decided after the body is planned.
    pub fn prepend_step(&mut self, text: impl Into<String>) -> StepId {
        let id = self.counter.next_id();
        self.steps.insert(0, (id, Step::text(text)));
        id
    }

    /// Append all steps of `other`, keeping their identifiers
    pub fn add_plan(&mut self, other: Plan) {
        debug_assert!(
            Arc::ptr_eq(&self.counter, &other.counter),
            "merged plans must share a step counter"
        );
        self.steps.extend(other.steps);
    }

    /// Insert a copy of `text` after every step
    pub fn intersperse_step(&mut self, text: &str) {
        let original = std::mem::take(&mut self.steps);
        self.steps.reserve(original.len() * 2);
        for entry in original {
            self.steps.push(entry);
            let id = self.counter.next_id();
            self.steps.push((id, Step::text(text)));
        }
    }

    /// Render every step as `"<n>. <sentence>."`, numbering from `offset + 1`
    pub fn steps(&self, offset: usize) -> PlanResult<Vec<String>> {
        let positions = self.positions(offset);
        self.steps
            .iter()
            .enumerate()
            .map(|(idx, (_, step))| render::render_line(step, offset + idx + 1, &positions))
            .collect()
    }

    /// How often each step is referenced by other steps of this plan.
    ///
    /// Every step has an entry, unreferenced ones with count zero.
    pub fn step_ref_counts(&self) -> BTreeMap<StepId, usize> {
        let mut counts: BTreeMap<StepId, usize> =
            self.steps.iter().map(|(id, _)| (*id, 0)).collect();
        for (_, step) in &self.steps {
            for target in step.refs() {
                *counts.entry(target).or_insert(0) += 1;
            }
        }
        counts
    }

    /// Check that every reference points to an earlier step of this plan
    pub fn validate(&self) -> PlanResult<()> {
        let positions = self.positions(0);
        for (idx, (_, step)) in self.steps.iter().enumerate() {
            for target in step.refs() {
                match positions.get(&target) {
                    Some(&pos) if pos < idx + 1 => {}
                    _ => return Err(PlanError::UnresolvedReference { step: target }),
                }
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (StepId, &Step)> {
        self.steps.iter().map(|(id, step)| (*id, step))
    }

    pub fn get(&self, id: StepId) -> Option<&Step> {
        self.steps.iter().find(|(sid, _)| *sid == id).map(|(_, s)| s)
    }

    pub fn last_step_id(&self) -> Option<StepId> {
        self.steps.last().map(|(id, _)| *id)
    }

    pub(crate) fn get_mut(&mut self, id: StepId) -> Option<&mut Step> {
        self.steps
            .iter_mut()
            .find(|(sid, _)| *sid == id)
            .map(|(_, s)| s)
    }

    pub(crate) fn remove(&mut self, id: StepId) -> Option<Step> {
        let idx = self.steps.iter().position(|(sid, _)| *sid == id)?;
        Some(self.steps.remove(idx).1)
    }

    /// Identifier to 1-based display position
    fn positions(&self, offset: usize) -> HashMap<StepId, usize> {
        self.steps
            .iter()
            .enumerate()
            .map(|(idx, (id, _))| (*id, offset + idx + 1))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_step_and_render() {
        let mut plan = Plan::session();
        let load = plan.add_step(vec![Part::text("Load data for table Person")]);
        plan.add_step(vec![Part::text("Keep only 5 rows from"), Part::Ref(load)]);

        assert_eq!(
            plan.steps(0).unwrap(),
            vec![
                "1. Load data for table Person.",
                "2. Keep only 5 rows from results of Step 1.",
            ]
        );
    }

    #[test]
    fn test_render_with_offset() {
        let mut plan = Plan::session();
        let load = plan.add_step(vec![Part::text("Load data for table t")]);
        plan.add_step(vec![Part::text("Only keep unique rows from"), Part::Ref(load)]);

        let lines = plan.steps(3).unwrap();
        assert_eq!(lines[0], "4. Load data for table t.");
        assert_eq!(lines[1], "5. Only keep unique rows from results of Step 4.");
    }

    #[test]
    fn test_add_plan_preserves_identifiers() {
        let mut parent = Plan::session();
        let mut child = parent.child();
        let inner = child.add_step(vec![Part::text("Load data for table t")]);
        parent.add_plan(child);
        let outer = parent.add_step(vec![Part::text("Use"), Part::Ref(inner)]);

        let ids: Vec<StepId> = parent.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![inner, outer]);
        assert!(parent.validate().is_ok());
    }

    #[test]
    fn test_prepend_step_renders_first() {
        let mut plan = Plan::session();
        let load = plan.add_step(vec![Part::text("Load data for table t")]);
        plan.add_step(vec![Part::text("Write to 'result.csv' the"), Part::Ref(load)]);
        plan.prepend_step("Import pandas library");

        let lines = plan.steps(0).unwrap();
        assert_eq!(lines[0], "1. Import pandas library.");
        assert_eq!(lines[2], "3. Write to 'result.csv' the results of Step 2.");
    }

    #[test]
    fn test_intersperse_doubles_steps() {
        let mut plan = Plan::session();
        let a = plan.add_step(vec![Part::text("Load data for table t")]);
        plan.add_step(vec![Part::text("Only keep unique rows from"), Part::Ref(a)]);
        plan.intersperse_step("Print progress");

        let lines = plan.steps(0).unwrap();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[1], "2. Print progress.");
        assert_eq!(lines[2], "3. Only keep unique rows from results of Step 1.");
        assert_eq!(lines[3], "4. Print progress.");
    }

    #[test]
    fn test_missing_reference_is_reported() {
        let mut other = Plan::session();
        let foreign = other.add_step(vec![Part::text("Load data for table t")]);

        let mut plan = Plan::session();
        plan.add_step(vec![Part::text("Use"), Part::Ref(foreign)]);

        assert_eq!(
            plan.steps(0),
            Err(PlanError::UnresolvedReference { step: foreign })
        );
        assert!(plan.validate().is_err());
    }

    #[test]
    fn test_ref_counts() {
        let mut plan = Plan::session();
        let a = plan.add_step(vec![Part::text("A")]);
        let b = plan.add_step(vec![Part::text("B"), Part::Ref(a)]);
        let c = plan.add_step(vec![Part::Ref(a), Part::Ref(b)]);

        let counts = plan.step_ref_counts();
        assert_eq!(counts[&a], 2);
        assert_eq!(counts[&b], 1);
        assert_eq!(counts[&c], 0);
    }
}
