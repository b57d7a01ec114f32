use tracing::{debug, info};

use crate::{
    error::{RuleSetError, ValidationError},
    model::{AssessmentInput, FactorBreakdown, Feature, FieldSpec, RiskAssessment, TriggeredRule},
    rule_set::{CutPoints, RuleSet},
    scorers::Scorer,
};

pub const MIN_SCORE: f64 = 0.0;
pub const MAX_SCORE: f64 = 100.0;

/// Scores inputs with a validated [`RuleSet`].
///
/// Rule contributions are summed in declaration order, rounded to two
/// decimals and clamped to `MIN_SCORE..=MAX_SCORE`, then bucketed by the
/// rule set's cut points.
#[derive(Debug, Clone)]
pub struct RuleBasedScorer {
    rule_set: RuleSet,
}

impl RuleBasedScorer {
    pub fn new(rule_set: RuleSet) -> Result<Self, RuleSetError> {
        rule_set.validate()?;
        info!(
            rule_set = %rule_set.name,
            fields = rule_set.fields.len(),
            rules = rule_set.rules.len(),
            "Initializing new RuleBasedScorer"
        );
        Ok(Self { rule_set })
    }

    pub fn rule_set(&self) -> &RuleSet {
        &self.rule_set
    }

    /// Resolves every declared field, in declaration order.
    pub fn extract_features(&self, input: &AssessmentInput) -> Result<Vec<Feature>, ValidationError> {
        for name in input.values.keys() {
            if self.rule_set.field(name).is_none() {
                debug!(field = %name, "Ignoring undeclared input field");
            }
        }

        self.rule_set
            .fields
            .iter()
            .map(|spec| {
                Ok(Feature {
                    name: spec.name.clone(),
                    value: spec.resolve_input(input.values.get(&spec.name))?,
                })
            })
            .collect()
    }

    /// Applies the rules in order. Returns the bounded score and the rules
    /// that added points.
    pub fn score_features(&self, features: &[Feature]) -> (f64, Vec<TriggeredRule>) {
        let mut total = 0.0;
        let mut triggered = Vec::new();

        for rule in &self.rule_set.rules {
            let Some(feature) = features.iter().find(|f| f.name == rule.feature()) else {
                continue;
            };
            let points = rule.evaluate(&feature.value);
            total += points;
            if points != 0.0 {
                triggered.push(TriggeredRule {
                    name: rule.name().to_string(),
                    points,
                });
            }
        }

        (bounded(total), triggered)
    }

    fn factor_breakdown(&self, features: &[Feature]) -> Vec<FactorBreakdown> {
        self.rule_set
            .fields
            .iter()
            .zip(features)
            .filter_map(|(spec, feature)| {
                let bands = spec.impact?;
                let numeric = feature.value.as_f64()?;
                Some(FactorBreakdown {
                    name: spec.name.clone(),
                    label: spec.label.clone(),
                    value: feature.value.clone(),
                    display_value: spec.display_value(&feature.value),
                    impact: bands.impact(numeric),
                })
            })
            .collect()
    }
}

/// Rounds to two decimals and clamps into `MIN_SCORE..=MAX_SCORE`.
/// Infinities clamp to the nearer bound and NaN maps to `MIN_SCORE`.
pub fn bounded(total: f64) -> f64 {
    if total.is_nan() {
        return MIN_SCORE;
    }
    ((total * 100.0).round() / 100.0).clamp(MIN_SCORE, MAX_SCORE)
}

impl Scorer for RuleBasedScorer {
    fn name(&self) -> String {
        self.rule_set.name.clone()
    }

    fn fields(&self) -> Vec<FieldSpec> {
        self.rule_set.fields.clone()
    }

    fn cut_points(&self) -> CutPoints {
        self.rule_set.cut_points
    }

    fn assess(&self, input: &AssessmentInput) -> Result<RiskAssessment, ValidationError> {
        let features = self.extract_features(input)?;
        let (score, triggered) = self.score_features(&features);
        let level = self.rule_set.cut_points.level_for(score);
        let factors = self.factor_breakdown(&features);

        debug!(score, %level, triggered = triggered.len(), "Scored assessment");

        Ok(RiskAssessment {
            customer_id: input.customer_id(),
            inputs: features,
            score,
            level,
            triggered,
            factors,
            recommendation: level.recommendation().to_string(),
        })
    }
}
