pub mod rule_based;

pub use rule_based::*;

use crate::{
    error::ValidationError,
    model::{AssessmentInput, FieldSpec, RiskAssessment},
    rule_set::CutPoints,
};

/// A pure scoring model behind the HTTP surface.
pub trait Scorer: Send + Sync {
    fn name(&self) -> String;

    /// Fields the UI has to collect, in display order.
    fn fields(&self) -> Vec<FieldSpec>;

    fn cut_points(&self) -> CutPoints;

    fn assess(&self, input: &AssessmentInput) -> Result<RiskAssessment, ValidationError>;
}
