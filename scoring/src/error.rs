use thiserror::Error;

/// Raised when an assessment input cannot be scored.
///
/// This is the only error the scorer produces; the UI shows its message
/// to the user as-is.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

impl ValidationError {
    pub fn invalid(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    /// Name of the offending field.
    pub fn field(&self) -> &str {
        match self {
            Self::MissingField(field) => field,
            Self::InvalidValue { field, .. } => field,
        }
    }
}

/// Raised at startup when a rule set is inconsistent.
#[derive(Debug, Error)]
pub enum RuleSetError {
    #[error("Rule set '{0}' declares no fields")]
    NoFields(String),

    #[error("Invalid field name '{0}': expected snake_case")]
    InvalidFieldName(String),

    #[error("Duplicate field '{0}'")]
    DuplicateField(String),

    #[error("Field '{field}' has an invalid domain: {reason}")]
    InvalidDomain { field: String, reason: String },

    #[error("Field '{field}' has an invalid default: {reason}")]
    InvalidDefault { field: String, reason: String },

    #[error("Field '{field}' has inverted impact bands ({medium_above} > {high_above})")]
    InvalidImpactBands {
        field: String,
        medium_above: f64,
        high_above: f64,
    },

    #[error("Rule '{rule}' references unknown field '{field}'")]
    UnknownField { rule: String, field: String },

    #[error("Rule '{rule}' cannot be applied to field '{field}': {reason}")]
    IncompatibleRule {
        rule: String,
        field: String,
        reason: String,
    },

    #[error("Rule '{rule}' has invalid points {points}")]
    InvalidPoints { rule: String, points: f64 },

    #[error("Rule set '{0}' can produce a non-finite score")]
    UnboundedScore(String),

    #[error("Cut points must be strictly ascending within (0, 100], got {medium}, {high}, {critical}")]
    InvalidCutPoints { medium: f64, high: f64, critical: f64 },

    #[error("Failed to read rule set {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse rule set: {0}")]
    Parse(#[from] serde_yml::Error),
}
