//! Steps and step identifiers

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifier assigned to a step when it is created.
///
/// Identifiers are unique within a planning session and never reused.
/// They are unrelated to the number a step is displayed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StepId(u64);

impl StepId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Source of step identifiers for one planning session.
///
/// Shared by every plan of a session so merged plans never collide.
#[derive(Debug, Default)]
pub struct StepCounter {
    next: AtomicU64,
}

impl StepCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand out the next identifier
    pub fn next_id(&self) -> StepId {
        StepId(self.next.fetch_add(1, Ordering::Relaxed))
    }

    /// Number of identifiers handed out so far
    pub fn issued(&self) -> u64 {
        self.next.load(Ordering::Relaxed)
    }
}

/// Fragment of a step: literal text or a reference to an earlier step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    Text(String),
    Ref(StepId),
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text(text.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Part::Text(text) => Some(text),
            Part::Ref(_) => None,
        }
    }
}

impl From<StepId> for Part {
    fn from(id: StepId) -> Self {
        Part::Ref(id)
    }
}

impl From<&str> for Part {
    fn from(text: &str) -> Self {
        Part::Text(text.to_string())
    }
}

impl From<String> for Part {
    fn from(text: String) -> Self {
        Part::Text(text)
    }
}

/// One natural-language instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    parts: Vec<Part>,
}

impl Step {
    pub fn new(parts: Vec<Part>) -> Self {
        Self { parts }
    }

    /// Step made of a single text fragment
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            parts: vec![Part::Text(text.into())],
        }
    }

    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    pub(crate) fn parts_mut(&mut self) -> &mut Vec<Part> {
        &mut self.parts
    }

    /// Steps this step refers to, in order of appearance
    pub fn refs(&self) -> impl Iterator<Item = StepId> + '_ {
        self.parts.iter().filter_map(|part| match part {
            Part::Ref(id) => Some(*id),
            Part::Text(_) => None,
        })
    }

    /// Whether the first part is exactly `phrase`
    pub fn starts_with(&self, phrase: &str) -> bool {
        matches!(self.parts.first(), Some(Part::Text(text)) if text == phrase)
    }
}
