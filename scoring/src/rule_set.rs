use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, fs, path::Path, sync::LazyLock};

use crate::{
    error::RuleSetError,
    model::{CUSTOMER_ID_FIELD, FeatureValue, FieldDomain, FieldSpec, RiskLevel},
};

static FIELD_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9_]*$").expect("field name pattern is valid"));

/// One scoring rule. Rules are applied in declaration order and their
/// contributions are summed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Rule {
    /// `points_per_unit * value`
    Weighted {
        name: String,
        feature: String,
        points_per_unit: f64,
    },
    /// `points` when `value > above`
    Threshold {
        name: String,
        feature: String,
        above: f64,
        points: f64,
    },
    /// `points` when a choice field equals `equals`
    Match {
        name: String,
        feature: String,
        equals: String,
        points: f64,
    },
}

impl Rule {
    pub fn weighted(name: impl Into<String>, feature: impl Into<String>, points_per_unit: f64) -> Self {
        Rule::Weighted {
            name: name.into(),
            feature: feature.into(),
            points_per_unit,
        }
    }

    pub fn threshold(name: impl Into<String>, feature: impl Into<String>, above: f64, points: f64) -> Self {
        Rule::Threshold {
            name: name.into(),
            feature: feature.into(),
            above,
            points,
        }
    }

    pub fn matching(
        name: impl Into<String>,
        feature: impl Into<String>,
        equals: impl Into<String>,
        points: f64,
    ) -> Self {
        Rule::Match {
            name: name.into(),
            feature: feature.into(),
            equals: equals.into(),
            points,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Rule::Weighted { name, .. } | Rule::Threshold { name, .. } | Rule::Match { name, .. } => name,
        }
    }

    pub fn feature(&self) -> &str {
        match self {
            Rule::Weighted { feature, .. } | Rule::Threshold { feature, .. } | Rule::Match { feature, .. } => {
                feature
            }
        }
    }

    fn points(&self) -> f64 {
        match self {
            Rule::Weighted { points_per_unit, .. } => *points_per_unit,
            Rule::Threshold { points, .. } | Rule::Match { points, .. } => *points,
        }
    }

    /// Largest absolute contribution this rule can make over `domain`.
    fn max_contribution(&self, domain: &FieldDomain) -> f64 {
        match self {
            Rule::Weighted { points_per_unit, .. } => points_per_unit * domain.magnitude(),
            Rule::Threshold { points, .. } | Rule::Match { points, .. } => *points,
        }
    }

    /// Contribution of this rule for the feature's value.
    pub fn evaluate(&self, value: &FeatureValue) -> f64 {
        match self {
            Rule::Weighted { points_per_unit, .. } => {
                value.as_f64().map(|v| v * points_per_unit).unwrap_or(0.0)
            }
            Rule::Threshold { above, points, .. } => match value.as_f64() {
                Some(v) if v > *above => *points,
                _ => 0.0,
            },
            Rule::Match { equals, points, .. } => match value.as_str() {
                Some(v) if v == equals => *points,
                _ => 0.0,
            },
        }
    }
}

/// Score boundaries between risk levels, each inclusive on the lower side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CutPoints {
    pub medium: f64,
    pub high: f64,
    pub critical: f64,
}

impl Default for CutPoints {
    fn default() -> Self {
        Self {
            medium: 25.0,
            high: 50.0,
            critical: 75.0,
        }
    }
}

impl CutPoints {
    pub fn level_for(&self, score: f64) -> RiskLevel {
        if score >= self.critical {
            RiskLevel::Critical
        } else if score >= self.high {
            RiskLevel::High
        } else if score >= self.medium {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    /// Score range `[lower, upper)` covered by a level.
    pub fn range_of(&self, level: RiskLevel) -> (f64, f64) {
        match level {
            RiskLevel::Low => (0.0, self.medium),
            RiskLevel::Medium => (self.medium, self.high),
            RiskLevel::High => (self.high, self.critical),
            RiskLevel::Critical => (self.critical, 100.0),
        }
    }

    fn validate(&self) -> Result<(), RuleSetError> {
        let ascending = 0.0 < self.medium && self.medium < self.high && self.high < self.critical;
        if !ascending || !(self.critical <= 100.0) {
            return Err(RuleSetError::InvalidCutPoints {
                medium: self.medium,
                high: self.high,
                critical: self.critical,
            });
        }
        Ok(())
    }
}

/// Declarative description of one scoring model: the input fields, the
/// ordered rules over them and the level cut points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub fields: Vec<FieldSpec>,
    #[serde(default)]
    pub rules: Vec<Rule>,
    #[serde(default)]
    pub cut_points: CutPoints,
}

impl RuleSet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            fields: Vec::new(),
            rules: Vec::new(),
            cut_points: CutPoints::default(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_cut_points(mut self, medium: f64, high: f64, critical: f64) -> Self {
        self.cut_points = CutPoints { medium, high, critical };
        self
    }

    pub fn add_field(&mut self, field: FieldSpec) {
        self.fields.push(field);
    }

    pub fn add_rule(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, RuleSetError> {
        Ok(serde_yml::from_str(yaml)?)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, RuleSetError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| RuleSetError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&contents)
    }

    /// Checks that the rule set can only ever produce bounded, monotonic
    /// scores: known fields, sane domains, non-negative points and
    /// contributions whose sum stays finite.
    pub fn validate(&self) -> Result<(), RuleSetError> {
        if self.fields.is_empty() {
            return Err(RuleSetError::NoFields(self.name.clone()));
        }

        let mut seen = HashSet::new();
        for field in &self.fields {
            if !FIELD_NAME.is_match(&field.name) || field.name == CUSTOMER_ID_FIELD {
                return Err(RuleSetError::InvalidFieldName(field.name.clone()));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(RuleSetError::DuplicateField(field.name.clone()));
            }
            validate_domain(field)?;
            validate_default(field)?;
            if let Some(bands) = &field.impact {
                if !(bands.medium_above <= bands.high_above) {
                    return Err(RuleSetError::InvalidImpactBands {
                        field: field.name.clone(),
                        medium_above: bands.medium_above,
                        high_above: bands.high_above,
                    });
                }
            }
        }

        let mut worst_case: f64 = 0.0;
        for rule in &self.rules {
            let field = self.field(rule.feature()).ok_or_else(|| RuleSetError::UnknownField {
                rule: rule.name().to_string(),
                field: rule.feature().to_string(),
            })?;

            let points = rule.points();
            if !points.is_finite() || points < 0.0 {
                return Err(RuleSetError::InvalidPoints {
                    rule: rule.name().to_string(),
                    points,
                });
            }

            let incompatible = |reason: String| RuleSetError::IncompatibleRule {
                rule: rule.name().to_string(),
                field: field.name.clone(),
                reason,
            };
            match (rule, &field.domain) {
                (Rule::Weighted { .. } | Rule::Threshold { .. }, domain) if !domain.is_numeric() => {
                    return Err(incompatible("numeric rule on a choice field".to_string()));
                }
                (Rule::Threshold { above, .. }, _) if !above.is_finite() => {
                    return Err(incompatible(format!("threshold {} is not finite", above)));
                }
                (Rule::Match { equals, .. }, FieldDomain::Choice { options }) => {
                    if !options.contains(equals) {
                        return Err(incompatible(format!("'{}' is not an option", equals)));
                    }
                }
                (Rule::Match { .. }, _) => {
                    return Err(incompatible("match rule on a non-choice field".to_string()));
                }
                _ => {}
            }

            let bound = rule.max_contribution(&field.domain);
            if !bound.is_finite() {
                return Err(incompatible(format!("contribution overflows over the domain ({})", bound)));
            }
            worst_case += bound;
        }

        if !worst_case.is_finite() {
            return Err(RuleSetError::UnboundedScore(self.name.clone()));
        }

        self.cut_points.validate()
    }
}

fn validate_domain(field: &FieldSpec) -> Result<(), RuleSetError> {
    let reason = match &field.domain {
        FieldDomain::Integer { min, max } if min > max => Some(format!("min {} > max {}", min, max)),
        FieldDomain::Number { min, max, step, .. } => {
            if !min.is_finite() || !max.is_finite() {
                Some("bounds must be finite".to_string())
            } else if min > max {
                Some(format!("min {} > max {}", min, max))
            } else if !step.is_finite() || *step <= 0.0 {
                Some(format!("step {} must be positive", step))
            } else {
                None
            }
        }
        FieldDomain::Choice { options } => {
            let unique: HashSet<&String> = options.iter().collect();
            if options.is_empty() {
                Some("no options".to_string())
            } else if unique.len() != options.len() {
                Some("duplicate options".to_string())
            } else if options.iter().any(|o| o.trim().is_empty() || o.trim() != o) {
                Some("options must be non-blank and trimmed".to_string())
            } else {
                None
            }
        }
        _ => None,
    };

    match reason {
        Some(reason) => Err(RuleSetError::InvalidDomain {
            field: field.name.clone(),
            reason,
        }),
        None => Ok(()),
    }
}

fn validate_default(field: &FieldSpec) -> Result<(), RuleSetError> {
    let Some(raw) = &field.default else {
        return Ok(());
    };
    let invalid = |reason: String| RuleSetError::InvalidDefault {
        field: field.name.clone(),
        reason,
    };
    match field.domain.parse(&field.name, raw) {
        Ok(Some(value)) if field.domain.contains(&value) => Ok(()),
        Ok(Some(value)) => Err(invalid(format!("{} is outside the domain", value))),
        Ok(None) => Err(invalid("default is blank".to_string())),
        Err(e) => Err(invalid(e.to_string())),
    }
}
