use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentifierError {
    #[error("{kind} identifier accepts at most {max} segments, got {found}: {segments:?}")]
    TooManySegments {
        kind: &'static str,
        max: usize,
        found: usize,
        segments: Vec<String>,
    },

    #[error("{kind} identifier must name at least one segment")]
    Missing { kind: &'static str },

    #[error("{kind} identifier contains an empty segment: {segments:?}")]
    EmptySegment {
        kind: &'static str,
        segments: Vec<String>,
    },
}
