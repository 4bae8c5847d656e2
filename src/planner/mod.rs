//! Natural-language query planner
//!
//! Translates a SQL query into an ordered list of referenceable
//! natural-language steps.
//!
//! ## Pipeline
//!
//! ```text
//! query text
//!   → Parser::parse_one() → Query
//!   → Translator (expressions, SELECT pipeline, joins) → (Label, Plan)
//!   → "Write to <sink>" step
//!   → Simplifier::simplify() → Plan (checks inlined)
//!   → prologue / interspersed steps
//!   → Plan::steps() → ["1. ...", "2. ...", ...]
//! ```
//!
//! ## Example
//!
//! ```
//! use nlplan::{NlPlanner, PlannerConfig};
//!
//! let planner = NlPlanner::new(PlannerConfig::default());
//! let plan = planner.plan("SELECT name FROM Person WHERE age > 30").unwrap();
//! let steps = plan.steps(0).unwrap();
//! assert_eq!(steps[0], "1. Load data for table Person.");
//! ```

pub mod error;
pub mod expr;
pub mod join;
pub mod label;
pub mod plan;
pub mod render;
pub mod select;
pub mod simplify;
pub mod step;

pub use error::{PlanError, PlanResult};
pub use expr::CHECK_IF;
pub use label::Label;
pub use plan::Plan;
pub use render::PlanText;
pub use simplify::{InlineChecks, PlanRule, Simplifier};
pub use step::{Part, Step, StepCounter, StepId};

use std::sync::Arc;

use tracing::debug;

use crate::config::PlannerConfig;
use crate::sql::{Parser, Query};
use expr::Translator;

/// Translates queries into plans.
///
/// Holds only read-only configuration; each call plans with a fresh step
/// counter, so one planner can serve many threads.
pub struct NlPlanner {
    config: PlannerConfig,
    simplifier: Simplifier,
}

impl NlPlanner {
    pub fn new(config: PlannerConfig) -> Self {
        Self {
            config,
            simplifier: Simplifier::new(),
        }
    }

    /// Use custom simplification rules
    pub fn with_simplifier(mut self, simplifier: Simplifier) -> Self {
        self.simplifier = simplifier;
        self
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Plan a single SQL query
    pub fn plan(&self, query_text: &str) -> PlanResult<Plan> {
        debug!(dialect = %self.config.dialect, "planning query");
        let query = Parser::parse_one(query_text, self.config.dialect)?;
        self.plan_query(&query)
    }

    /// Plan an already parsed query
    pub fn plan_query(&self, query: &Query) -> PlanResult<Plan> {
        let translator = Translator::new(&self.config, Arc::new(StepCounter::new()));
        let (label, mut plan) = translator.query(query)?;

        let write = Label::text(format!("Write to {} the", self.config.output_sink)).chain(label);
        plan.add_step(write.into_parts());

        if self.config.simplify {
            self.simplifier.simplify(&mut plan);
        }
        for step in self.config.prologue.iter().rev() {
            plan.prepend_step(step.clone());
        }
        if let Some(step) = &self.config.intersperse {
            plan.intersperse_step(step);
        }

        plan.validate()?;
        debug!(steps = plan.len(), "planned query");
        Ok(plan)
    }
}
