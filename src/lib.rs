//! nlplan - Translate SQL queries into natural-language processing plans
//!
//! Features:
//! - Numbered, referenceable steps ("results of Step 3")
//! - Per-table filters pushed below joins
//! - Simplification of single-use checks

pub mod config;
pub mod planner;
pub mod sql;

pub use config::{ConfigError, PlannerConfig, SqlDialect};
pub use planner::{NlPlanner, Plan, PlanError, PlanResult, PlanText};
