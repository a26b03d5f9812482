//! Filter errors
//!
//! Failures raised while building criteria or resolving a filtered lookup.
//! They travel inside `anyhow::Error`; use `downcast_ref::<FilterError>()`
//! to tell them apart.

/// Errors produced by the filter subsystem
#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    /// The raw filter block does not have the expected list/map shape
    #[error("invalid filter block: {0}")]
    InvalidBlock(String),

    /// A filter name outside the supported set
    #[error("filter '{0}' not supported")]
    UnsupportedFilter(String),

    /// A filter name set twice on the same definition
    #[error("filter '{0}' already defined")]
    DuplicateFilter(String),

    /// Mutually exclusive filters were both requested
    #[error("filters '{0}' and '{1}' cannot be used together")]
    ConflictingFilters(String, String),

    /// A regular expression in the criteria does not compile
    #[error("invalid {filter} expression '{expression}': {reason}")]
    InvalidRegex {
        filter: String,
        expression: String,
        reason: String,
    },

    /// A filter on an attribute the entity kind does not carry
    #[error("filter '{filter}' is not applicable to {item_type}")]
    NotApplicable { filter: String, item_type: String },

    /// Malformed date expression (bad or missing operator)
    #[error("invalid date expression '{0}'")]
    InvalidDateExpression(String),

    /// A date string that no known format accepts
    #[error("error parsing date '{input}': {reason}")]
    DateParse { input: String, reason: String },

    #[error("no {label} found with given criteria ({explanation})")]
    NoMatch { label: String, explanation: String },

    #[error("more than one {label} found by given criteria: [{}]", .names.join(", "))]
    MultipleMatches { label: String, names: Vec<String> },

    /// Network narrowing left nothing of the wanted kind
    #[error("no {0} found")]
    NoNetworkOfType(String),
}
