use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::{
    collections::{BTreeMap, HashMap},
    fmt,
};
use strum_macros::{Display as EnumDisplay, EnumIter};

use crate::error::ValidationError;

/// Form key carrying the free-text customer identifier.
pub const CUSTOMER_ID_FIELD: &str = "customer_id";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum FeatureValue {
    #[serde(rename = "integer")]
    Int(i64),
    #[serde(rename = "number")]
    Double(f64),
    #[serde(rename = "string")]
    String(String),
    #[serde(rename = "boolean")]
    Bool(bool),
}

impl FeatureValue {
    /// Numeric view used by weighted and threshold rules. Flags count as 0/1.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FeatureValue::Int(v) => Some(*v as f64),
            FeatureValue::Double(v) => Some(*v),
            FeatureValue::Bool(v) => Some(if *v { 1.0 } else { 0.0 }),
            FeatureValue::String(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FeatureValue::String(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureValue::Int(v) => write!(f, "{}", v),
            FeatureValue::Double(v) => write!(f, "{}", v),
            FeatureValue::String(v) => write!(f, "{}", v),
            FeatureValue::Bool(v) => write!(f, "{}", v),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub name: String,
    pub value: FeatureValue,
}

fn default_step() -> f64 {
    1.0
}

fn default_required() -> bool {
    true
}

/// Valid values for one input field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldDomain {
    Integer {
        min: i64,
        max: i64,
    },
    Number {
        min: f64,
        max: f64,
        #[serde(default = "default_step")]
        step: f64,
        /// Render the value as a percentage of 1.0.
        #[serde(default)]
        percent: bool,
    },
    Flag,
    Choice {
        options: Vec<String>,
    },
}

enum Numeric {
    Int(i64),
    Float(f64),
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}

fn parse_numeric(field: &str, raw: &JsonValue) -> Result<Option<Numeric>, ValidationError> {
    let numeric = match raw {
        JsonValue::Null => return Ok(None),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => Numeric::Int(i),
            None => Numeric::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        JsonValue::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return Ok(None);
            }
            if let Ok(i) = s.parse::<i64>() {
                Numeric::Int(i)
            } else if let Ok(f) = s.parse::<f64>() {
                Numeric::Float(f)
            } else {
                return Err(ValidationError::invalid(field, format!("'{}' is not a number", s)));
            }
        }
        other => {
            return Err(ValidationError::invalid(
                field,
                format!("expected a number, got {}", json_kind(other)),
            ));
        }
    };

    if let Numeric::Float(f) = numeric {
        if !f.is_finite() {
            return Err(ValidationError::invalid(field, "must be a finite number"));
        }
    }
    Ok(Some(numeric))
}

impl FieldDomain {
    /// Whether weighted and threshold rules may read this field.
    pub fn is_numeric(&self) -> bool {
        !matches!(self, FieldDomain::Choice { .. })
    }

    /// Lowest value of the domain, used when no default is declared.
    pub fn floor(&self) -> FeatureValue {
        match self {
            FieldDomain::Integer { min, .. } => FeatureValue::Int(*min),
            FieldDomain::Number { min, .. } => FeatureValue::Double(*min),
            FieldDomain::Flag => FeatureValue::Bool(false),
            FieldDomain::Choice { options } => {
                FeatureValue::String(options.first().cloned().unwrap_or_default())
            }
        }
    }

    /// Largest absolute numeric value the domain admits. Choices have none.
    pub fn magnitude(&self) -> f64 {
        match self {
            FieldDomain::Integer { min, max } => min.unsigned_abs().max(max.unsigned_abs()) as f64,
            FieldDomain::Number { min, max, .. } => min.abs().max(max.abs()),
            FieldDomain::Flag => 1.0,
            FieldDomain::Choice { .. } => 0.0,
        }
    }

    /// Checks a value against the domain without clamping.
    pub fn contains(&self, value: &FeatureValue) -> bool {
        match (self, value) {
            (FieldDomain::Integer { min, max }, FeatureValue::Int(v)) => v >= min && v <= max,
            (FieldDomain::Number { min, max, .. }, FeatureValue::Double(v)) => v >= min && v <= max,
            (FieldDomain::Flag, FeatureValue::Bool(_)) => true,
            (FieldDomain::Choice { options }, FeatureValue::String(v)) => options.contains(v),
            _ => false,
        }
    }

    /// Parses a raw input value. `Ok(None)` means the value is absent
    /// (null or blank).
    pub fn parse(&self, field: &str, raw: &JsonValue) -> Result<Option<FeatureValue>, ValidationError> {
        match self {
            FieldDomain::Integer { .. } => match parse_numeric(field, raw)? {
                None => Ok(None),
                Some(Numeric::Int(i)) => Ok(Some(FeatureValue::Int(i))),
                Some(Numeric::Float(f)) if f.fract() == 0.0 => Ok(Some(FeatureValue::Int(f as i64))),
                Some(Numeric::Float(f)) => Err(ValidationError::invalid(
                    field,
                    format!("expected a whole number, got {}", f),
                )),
            },
            FieldDomain::Number { .. } => match parse_numeric(field, raw)? {
                None => Ok(None),
                Some(Numeric::Int(i)) => Ok(Some(FeatureValue::Double(i as f64))),
                Some(Numeric::Float(f)) => Ok(Some(FeatureValue::Double(f))),
            },
            FieldDomain::Flag => match raw {
                JsonValue::Null => Ok(None),
                JsonValue::Bool(b) => Ok(Some(FeatureValue::Bool(*b))),
                JsonValue::Number(n) => match n.as_i64() {
                    Some(0) => Ok(Some(FeatureValue::Bool(false))),
                    Some(1) => Ok(Some(FeatureValue::Bool(true))),
                    _ => Err(ValidationError::invalid(field, format!("expected 0 or 1, got {}", n))),
                },
                JsonValue::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                    "" => Ok(None),
                    "true" | "on" | "yes" | "1" => Ok(Some(FeatureValue::Bool(true))),
                    "false" | "off" | "no" | "0" => Ok(Some(FeatureValue::Bool(false))),
                    other => Err(ValidationError::invalid(field, format!("'{}' is not a yes/no value", other))),
                },
                other => Err(ValidationError::invalid(
                    field,
                    format!("expected a boolean, got {}", json_kind(other)),
                )),
            },
            FieldDomain::Choice { options } => match raw {
                JsonValue::Null => Ok(None),
                JsonValue::String(s) if s.trim().is_empty() => Ok(None),
                JsonValue::String(s) => {
                    let s = s.trim();
                    if options.iter().any(|o| o == s) {
                        Ok(Some(FeatureValue::String(s.to_string())))
                    } else {
                        Err(ValidationError::invalid(
                            field,
                            format!("'{}' is not one of {}", s, options.join(", ")),
                        ))
                    }
                }
                other => Err(ValidationError::invalid(
                    field,
                    format!("expected one of {}, got {}", options.join(", "), json_kind(other)),
                )),
            },
        }
    }

    /// Pulls numeric values back into the domain bounds.
    pub fn clamp(&self, field: &str, value: FeatureValue) -> FeatureValue {
        let clamped = match (self, &value) {
            (FieldDomain::Integer { min, max }, FeatureValue::Int(v)) => FeatureValue::Int((*v).clamp(*min, *max)),
            (FieldDomain::Number { min, max, .. }, FeatureValue::Double(v)) => {
                FeatureValue::Double(v.clamp(*min, *max))
            }
            _ => return value,
        };
        if clamped != value {
            tracing::debug!(field, from = %value, to = %clamped, "Clamped out-of-range input");
        }
        clamped
    }

    /// Parse followed by clamp.
    pub fn resolve(&self, field: &str, raw: &JsonValue) -> Result<Option<FeatureValue>, ValidationError> {
        Ok(self.parse(field, raw)?.map(|value| self.clamp(field, value)))
    }
}

/// Cut-offs turning a single factor's value into a Low/Medium/High impact.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImpactBands {
    pub medium_above: f64,
    pub high_above: f64,
}

impl ImpactBands {
    pub fn impact(&self, value: f64) -> FactorImpact {
        if value > self.high_above {
            FactorImpact::High
        } else if value > self.medium_above {
            FactorImpact::Medium
        } else {
            FactorImpact::Low
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub label: String,
    #[serde(default)]
    pub help: String,
    pub domain: FieldDomain,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<JsonValue>,
    #[serde(default = "default_required")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impact: Option<ImpactBands>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, label: impl Into<String>, domain: FieldDomain) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            help: String::new(),
            domain,
            default: None,
            required: true,
            impact: None,
        }
    }

    pub fn integer(name: impl Into<String>, label: impl Into<String>, min: i64, max: i64) -> Self {
        Self::new(name, label, FieldDomain::Integer { min, max })
    }

    pub fn number(name: impl Into<String>, label: impl Into<String>, min: f64, max: f64, step: f64) -> Self {
        Self::new(
            name,
            label,
            FieldDomain::Number {
                min,
                max,
                step,
                percent: false,
            },
        )
    }

    pub fn flag(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(name, label, FieldDomain::Flag)
    }

    pub fn choice(name: impl Into<String>, label: impl Into<String>, options: &[&str]) -> Self {
        Self::new(
            name,
            label,
            FieldDomain::Choice {
                options: options.iter().map(|o| o.to_string()).collect(),
            },
        )
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = help.into();
        self
    }

    pub fn with_impact(mut self, medium_above: f64, high_above: f64) -> Self {
        self.impact = Some(ImpactBands {
            medium_above,
            high_above,
        });
        self
    }

    pub fn with_default(mut self, default: impl Into<JsonValue>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Absent values fall back to the default instead of failing.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn as_percent(mut self) -> Self {
        if let FieldDomain::Number { percent, .. } = &mut self.domain {
            *percent = true;
        }
        self
    }

    pub fn default_value(&self) -> FeatureValue {
        self.default
            .as_ref()
            .and_then(|raw| self.domain.resolve(&self.name, raw).ok().flatten())
            .unwrap_or_else(|| self.domain.floor())
    }

    /// Resolves this field from the raw input map entry.
    pub fn resolve_input(&self, raw: Option<&JsonValue>) -> Result<FeatureValue, ValidationError> {
        let parsed = match raw {
            Some(raw) => self.domain.resolve(&self.name, raw)?,
            None => None,
        };
        match parsed {
            Some(value) => Ok(value),
            None if self.required => Err(ValidationError::MissingField(self.name.clone())),
            None => Ok(self.default_value()),
        }
    }

    pub fn display_value(&self, value: &FeatureValue) -> String {
        match (&self.domain, value) {
            (FieldDomain::Number { percent: true, .. }, FeatureValue::Double(v)) => {
                format!("{:.0}%", v * 100.0)
            }
            (_, FeatureValue::Bool(true)) => "Yes".to_string(),
            (_, FeatureValue::Bool(false)) => "No".to_string(),
            (_, value) => value.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumDisplay)]
pub enum FactorImpact {
    Low,
    Medium,
    High,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, EnumDisplay, EnumIter,
)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn color(&self) -> &'static str {
        match self {
            RiskLevel::Critical => "#FF4B4B",
            RiskLevel::High => "#FFA500",
            RiskLevel::Medium => "#FFD700",
            RiskLevel::Low => "#4CAF50",
        }
    }

    pub fn recommendation(&self) -> &'static str {
        match self {
            RiskLevel::Critical => "Immediate intervention - Offer payment holiday or loan restructuring",
            RiskLevel::High => "Priority contact - Propose debt consolidation plan",
            RiskLevel::Medium => "Schedule check-in call - Offer financial counseling",
            RiskLevel::Low => "Continue standard monitoring",
        }
    }

    pub fn headline(&self) -> &'static str {
        match self {
            RiskLevel::Critical => "CRITICAL RISK",
            RiskLevel::High => "HIGH RISK",
            RiskLevel::Medium => "MEDIUM RISK",
            RiskLevel::Low => "LOW RISK",
        }
    }

    pub fn summary(&self) -> &'static str {
        match self {
            RiskLevel::Critical => "Immediate action required",
            RiskLevel::High => "Priority intervention",
            RiskLevel::Medium => "Proactive engagement",
            RiskLevel::Low => "Standard monitoring",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggeredRule {
    pub name: String,
    pub points: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorBreakdown {
    pub name: String,
    pub label: String,
    pub value: FeatureValue,
    pub display_value: String,
    pub impact: FactorImpact,
}

/// Result of scoring one input. Built per request and never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub customer_id: Option<String>,
    pub inputs: Vec<Feature>,
    /// Always within 0..=100.
    pub score: f64,
    pub level: RiskLevel,
    pub triggered: Vec<TriggeredRule>,
    pub factors: Vec<FactorBreakdown>,
    pub recommendation: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssessmentInput {
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub values: BTreeMap<String, JsonValue>,
}

impl AssessmentInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_customer_id(mut self, customer_id: impl Into<String>) -> Self {
        self.customer_id = Some(customer_id.into());
        self
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    /// Builds an input from urlencoded form fields, where every value is text.
    pub fn from_form(mut form: HashMap<String, String>) -> Self {
        let customer_id = form.remove(CUSTOMER_ID_FIELD);
        Self {
            customer_id,
            values: form
                .into_iter()
                .map(|(name, value)| (name, JsonValue::String(value)))
                .collect(),
        }
    }

    /// Trimmed customer id, `None` when blank.
    pub fn customer_id(&self) -> Option<String> {
        self.customer_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn days() -> FieldDomain {
        FieldDomain::Integer { min: 0, max: 30 }
    }

    fn ratio() -> FieldDomain {
        FieldDomain::Number {
            min: 0.0,
            max: 1.0,
            step: 0.05,
            percent: true,
        }
    }

    #[test]
    fn test_integer_accepts_numbers_and_numeric_strings() {
        assert_eq!(days().resolve("d", &json!(7)).unwrap(), Some(FeatureValue::Int(7)));
        assert_eq!(days().resolve("d", &json!(" 12 ")).unwrap(), Some(FeatureValue::Int(12)));
        assert_eq!(days().resolve("d", &json!(4.0)).unwrap(), Some(FeatureValue::Int(4)));
    }

    #[test]
    fn test_integer_rejects_fractions_and_text() {
        assert!(matches!(
            days().resolve("d", &json!(2.5)),
            Err(ValidationError::InvalidValue { .. })
        ));
        assert!(matches!(
            days().resolve("d", &json!("abc")),
            Err(ValidationError::InvalidValue { .. })
        ));
        assert!(matches!(
            days().resolve("d", &json!(true)),
            Err(ValidationError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        assert_eq!(days().resolve("d", &json!(45)).unwrap(), Some(FeatureValue::Int(30)));
        assert_eq!(days().resolve("d", &json!(-3)).unwrap(), Some(FeatureValue::Int(0)));
        assert_eq!(ratio().resolve("r", &json!(1.7)).unwrap(), Some(FeatureValue::Double(1.0)));
        assert_eq!(ratio().resolve("r", &json!("-0.2")).unwrap(), Some(FeatureValue::Double(0.0)));
    }

    #[test]
    fn test_non_finite_numbers_are_rejected() {
        assert!(ratio().resolve("r", &json!("NaN")).is_err());
        assert!(ratio().resolve("r", &json!("inf")).is_err());
    }

    #[test]
    fn test_blank_and_null_are_absent() {
        assert_eq!(days().resolve("d", &json!("  ")).unwrap(), None);
        assert_eq!(ratio().resolve("r", &JsonValue::Null).unwrap(), None);
        assert_eq!(FieldDomain::Flag.resolve("f", &json!("")).unwrap(), None);
    }

    #[test]
    fn test_flag_parsing() {
        let flag = FieldDomain::Flag;
        assert_eq!(flag.resolve("f", &json!(true)).unwrap(), Some(FeatureValue::Bool(true)));
        assert_eq!(flag.resolve("f", &json!("on")).unwrap(), Some(FeatureValue::Bool(true)));
        assert_eq!(flag.resolve("f", &json!("No")).unwrap(), Some(FeatureValue::Bool(false)));
        assert_eq!(flag.resolve("f", &json!(0)).unwrap(), Some(FeatureValue::Bool(false)));
        assert!(flag.resolve("f", &json!(2)).is_err());
        assert!(flag.resolve("f", &json!("maybe")).is_err());
    }

    #[test]
    fn test_choice_must_be_an_option() {
        let choice = FieldDomain::Choice {
            options: vec!["salaried".to_string(), "self_employed".to_string()],
        };
        assert_eq!(
            choice.resolve("c", &json!("salaried")).unwrap(),
            Some(FeatureValue::String("salaried".to_string()))
        );
        let err = choice.resolve("c", &json!("retired")).unwrap_err();
        assert_eq!(err.field(), "c");
        assert!(choice.resolve("c", &json!(3)).is_err());
    }

    #[test]
    fn test_required_field_missing_is_an_error() {
        let spec = FieldSpec::integer("salary_delay_days", "Salary Delay (days)", 0, 30);
        assert_eq!(
            spec.resolve_input(None),
            Err(ValidationError::MissingField("salary_delay_days".to_string()))
        );
        assert_eq!(
            spec.resolve_input(Some(&json!(""))),
            Err(ValidationError::MissingField("salary_delay_days".to_string()))
        );
    }

    #[test]
    fn test_optional_field_falls_back_to_default() {
        let spec = FieldSpec::integer("atm", "ATM", 0, 20).with_default(4).optional();
        assert_eq!(spec.resolve_input(None).unwrap(), FeatureValue::Int(4));

        let no_default = FieldSpec::number("r", "R", 0.1, 1.0, 0.1).optional();
        assert_eq!(no_default.resolve_input(None).unwrap(), FeatureValue::Double(0.1));
    }

    #[test]
    fn test_display_value() {
        let pct = FieldSpec::number("savings_drop_pct", "Savings", 0.0, 1.0, 0.05).as_percent();
        assert_eq!(pct.display_value(&FeatureValue::Double(0.35)), "35%");
        let flag = FieldSpec::flag("f", "F");
        assert_eq!(flag.display_value(&FeatureValue::Bool(true)), "Yes");
        let days = FieldSpec::integer("d", "D", 0, 30);
        assert_eq!(days.display_value(&FeatureValue::Int(9)), "9");
    }

    #[test]
    fn test_impact_bands_are_strict() {
        let bands = ImpactBands {
            medium_above: 7.0,
            high_above: 15.0,
        };
        assert_eq!(bands.impact(7.0), FactorImpact::Low);
        assert_eq!(bands.impact(8.0), FactorImpact::Medium);
        assert_eq!(bands.impact(15.0), FactorImpact::Medium);
        assert_eq!(bands.impact(16.0), FactorImpact::High);
    }

    #[test]
    fn test_feature_value_wire_format() {
        let json = serde_json::to_value(FeatureValue::Double(0.5)).unwrap();
        assert_eq!(json, json!({"type": "number", "value": 0.5}));
        let back: FeatureValue = serde_json::from_value(json!({"type": "integer", "value": 3})).unwrap();
        assert_eq!(back, FeatureValue::Int(3));
    }

    #[test]
    fn test_from_form_splits_customer_id() {
        let mut form = HashMap::new();
        form.insert("customer_id".to_string(), "  CUST_001 ".to_string());
        form.insert("salary_delay_days".to_string(), "3".to_string());
        let input = AssessmentInput::from_form(form);
        assert_eq!(input.customer_id(), Some("CUST_001".to_string()));
        assert_eq!(input.values.get("salary_delay_days"), Some(&json!("3")));
        assert!(!input.values.contains_key("customer_id"));
    }
}
