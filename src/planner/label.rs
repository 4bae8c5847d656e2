//! Labels: handles to translated expressions

use crate::planner::step::{Part, StepId};

/// How a translated expression is referred to by later steps.
///
/// Either inline text (a column, a literal, arithmetic over those) or a
/// reference to the step that computes the value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Label(Vec<Part>);

impl Label {
    pub fn text(text: impl Into<String>) -> Self {
        Label(vec![Part::Text(text.into())])
    }

    pub fn step(id: StepId) -> Self {
        Label(vec![Part::Ref(id)])
    }

    pub fn parts(&self) -> &[Part] {
        &self.0
    }

    pub fn into_parts(self) -> Vec<Part> {
        self.0
    }

    /// Referenced step, if the label is exactly one reference
    pub fn as_step(&self) -> Option<StepId> {
        match self.0.as_slice() {
            [Part::Ref(id)] => Some(*id),
            _ => None,
        }
    }

    /// Append a text fragment
    pub fn with_suffix(mut self, text: impl Into<String>) -> Self {
        self.0.push(Part::Text(text.into()));
        self
    }

    /// Append another label's parts
    pub fn chain(mut self, other: Label) -> Self {
        self.0.extend(other.0);
        self
    }

    /// Prefix the label, gluing onto leading text when there is some
    pub fn with_prefix(mut self, prefix: &str) -> Self {
        match self.0.first_mut() {
            Some(Part::Text(text)) => text.insert_str(0, prefix),
            _ => self.0.insert(0, Part::text(prefix)),
        }
        self
    }

    /// Wrap the label in parentheses
    pub fn parenthesized(self) -> Self {
        let mut parts = Vec::with_capacity(self.0.len() + 2);
        parts.push(Part::text("("));
        parts.extend(self.0);
        parts.push(Part::text(")"));
        Label(parts)
    }

    /// Join labels: `a`, `a and b`, `a, b, and c`
    pub fn list(labels: Vec<Label>) -> Self {
        let count = labels.len();
        let mut parts = Vec::new();
        for (idx, label) in labels.into_iter().enumerate() {
            if idx > 0 {
                if count > 2 {
                    parts.push(Part::text(","));
                }
                if idx == count - 1 {
                    parts.push(Part::text("and"));
                }
            }
            parts.extend(label.0);
        }
        Label(parts)
    }

    /// Join labels with commas only: `a, b, c`
    pub fn comma_list(labels: Vec<Label>) -> Self {
        let mut parts = Vec::new();
        for (idx, label) in labels.into_iter().enumerate() {
            if idx > 0 {
                parts.push(Part::text(","));
            }
            parts.extend(label.0);
        }
        Label(parts)
    }
}

impl From<Vec<Part>> for Label {
    fn from(parts: Vec<Part>) -> Self {
        Label(parts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(label: &Label) -> Vec<&str> {
        label.parts().iter().filter_map(Part::as_text).collect()
    }

    #[test]
    fn test_list_phrasing() {
        let two = Label::list(vec![Label::text("a"), Label::text("b")]);
        assert_eq!(texts(&two), vec!["a", "and", "b"]);

        let three = Label::list(vec![Label::text("a"), Label::text("b"), Label::text("c")]);
        assert_eq!(texts(&three), vec!["a", ",", "b", ",", "and", "c"]);
    }

    #[test]
    fn test_prefix_glues_onto_text() {
        assert_eq!(Label::text("x").with_prefix("-"), Label::text("-x"));
    }
}
