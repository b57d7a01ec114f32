use scoring::{
    error::ValidationError,
    model::{AssessmentInput, FactorImpact, FeatureValue, FieldSpec, RiskLevel},
    rule_set::{Rule, RuleSet},
    scorers::{bounded, RuleBasedScorer, Scorer, MAX_SCORE, MIN_SCORE},
};

const CARD_RULES: &str = r#"
name: card_utilization
description: Card payment behaviour
fields:
  - name: payment_delay_count
    label: Late payments (last 12 months)
    domain: { type: integer, min: 0, max: 12 }
    impact: { medium_above: 1, high_above: 3 }
  - name: utilization_ratio
    label: Credit utilization
    domain: { type: number, min: 0.0, max: 1.0, step: 0.05, percent: true }
    impact: { medium_above: 0.5, high_above: 0.8 }
rules:
  - kind: weighted
    name: Late payments
    feature: payment_delay_count
    points_per_unit: 6
  - kind: weighted
    name: Utilization
    feature: utilization_ratio
    points_per_unit: 30
  - kind: threshold
    name: Near credit limit
    feature: utilization_ratio
    above: 0.8
    points: 10
"#;

fn card_scorer() -> RuleBasedScorer {
    RuleBasedScorer::new(RuleSet::from_yaml_str(CARD_RULES).unwrap()).unwrap()
}

fn card_input(delays: i64, utilization: f64) -> AssessmentInput {
    AssessmentInput::new()
        .with("payment_delay_count", delays)
        .with("utilization_ratio", utilization)
}

fn mixed_scorer() -> RuleBasedScorer {
    let mut rule_set = RuleSet::new("mixed");
    rule_set.add_field(FieldSpec::integer("missed_payments", "Missed payments", 0, 10).with_impact(0.0, 2.0));
    rule_set.add_field(FieldSpec::flag("has_overdraft", "Overdraft").with_default(false).optional());
    rule_set.add_field(FieldSpec::choice(
        "employment",
        "Employment",
        &["salaried", "self_employed", "gig"],
    ));
    rule_set.add_rule(Rule::weighted("Missed payments", "missed_payments", 5.0));
    rule_set.add_rule(Rule::threshold("Repeated misses", "missed_payments", 3.0, 20.0));
    rule_set.add_rule(Rule::weighted("Overdraft", "has_overdraft", 15.0));
    rule_set.add_rule(Rule::matching("Gig income", "employment", "gig", 10.0));
    RuleBasedScorer::new(rule_set).unwrap()
}

#[test]
fn test_low_example() {
    let assessment = card_scorer().assess(&card_input(0, 0.1)).unwrap();
    assert_eq!(assessment.score, 3.0);
    assert_eq!(assessment.level, RiskLevel::Low);
    assert_eq!(assessment.recommendation, "Continue standard monitoring");
}

#[test]
fn test_high_example() {
    let assessment = card_scorer().assess(&card_input(5, 0.9)).unwrap();
    assert_eq!(assessment.score, 67.0);
    assert_eq!(assessment.level, RiskLevel::High);
    let names: Vec<&str> = assessment.triggered.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Late payments", "Utilization", "Near credit limit"]);
}

#[test]
fn test_deterministic() {
    let scorer = card_scorer();
    for (delays, utilization) in [(0, 0.0), (3, 0.45), (7, 0.85), (12, 1.0)] {
        let first = scorer.assess(&card_input(delays, utilization)).unwrap();
        let second = scorer.assess(&card_input(delays, utilization)).unwrap();
        assert_eq!(first, second);
    }
}

#[test]
fn test_score_within_bounds() {
    let scorer = card_scorer();
    for delays in [-5, 0, 4, 12, 100] {
        for utilization in [-1.0, 0.0, 0.5, 0.95, 3.0] {
            let score = scorer.assess(&card_input(delays, utilization)).unwrap().score;
            assert!(
                (MIN_SCORE..=MAX_SCORE).contains(&score),
                "score {} out of bounds for ({}, {})",
                score,
                delays,
                utilization
            );
        }
    }
}

#[test]
fn test_monotonic_in_each_input() {
    let scorer = card_scorer();
    for utilization in [0.0, 0.3, 0.8, 1.0] {
        let mut previous = MIN_SCORE;
        for delays in 0..=12 {
            let score = scorer.assess(&card_input(delays, utilization)).unwrap().score;
            assert!(score >= previous, "score dropped at delays={}", delays);
            previous = score;
        }
    }
    for delays in [0, 4, 12] {
        let mut previous = MIN_SCORE;
        for step in 0..=20 {
            let utilization = step as f64 * 0.05;
            let score = scorer.assess(&card_input(delays, utilization)).unwrap().score;
            assert!(score >= previous, "score dropped at utilization={}", utilization);
            previous = score;
        }
    }
}

#[test]
fn test_missing_field_is_a_validation_error() {
    let input = AssessmentInput::new().with("utilization_ratio", 0.4);
    assert_eq!(
        card_scorer().assess(&input),
        Err(ValidationError::MissingField("payment_delay_count".to_string()))
    );
}

#[test]
fn test_invalid_value_is_a_validation_error() {
    let input = card_input(0, 0.1).with("payment_delay_count", "several");
    let err = card_scorer().assess(&input).unwrap_err();
    assert!(matches!(err, ValidationError::InvalidValue { ref field, .. } if field == "payment_delay_count"));
}

#[test]
fn test_out_of_range_inputs_are_clamped() {
    let assessment = card_scorer().assess(&card_input(40, 1.5)).unwrap();
    assert_eq!(assessment.inputs[0].value, FeatureValue::Int(12));
    assert_eq!(assessment.inputs[1].value, FeatureValue::Double(1.0));
    assert_eq!(assessment.score, 100.0);
    assert_eq!(assessment.level, RiskLevel::Critical);
}

#[test]
fn test_form_strings_are_accepted() {
    let input = AssessmentInput::new()
        .with_customer_id("CUST_042")
        .with("payment_delay_count", "5")
        .with("utilization_ratio", "0.9");
    let assessment = card_scorer().assess(&input).unwrap();
    assert_eq!(assessment.customer_id.as_deref(), Some("CUST_042"));
    assert_eq!(assessment.score, 67.0);
}

#[test]
fn test_undeclared_inputs_are_ignored() {
    let input = card_input(0, 0.1).with("favourite_colour", "blue");
    assert_eq!(card_scorer().assess(&input).unwrap().score, 3.0);
}

#[test]
fn test_factor_breakdown() {
    let assessment = card_scorer().assess(&card_input(2, 0.85)).unwrap();
    assert_eq!(assessment.factors.len(), 2);
    assert_eq!(assessment.factors[0].impact, FactorImpact::Medium);
    assert_eq!(assessment.factors[1].impact, FactorImpact::High);
    assert_eq!(assessment.factors[1].display_value, "85%");
}

#[test]
fn test_flag_choice_and_optional_fields() {
    let scorer = mixed_scorer();

    let calm = AssessmentInput::new()
        .with("missed_payments", 0)
        .with("employment", "salaried");
    let assessment = scorer.assess(&calm).unwrap();
    assert_eq!(assessment.score, 0.0);
    assert!(assessment.triggered.is_empty());
    assert_eq!(assessment.inputs[1].value, FeatureValue::Bool(false));

    let stressed = AssessmentInput::new()
        .with("missed_payments", 4)
        .with("has_overdraft", "yes")
        .with("employment", "gig");
    let assessment = scorer.assess(&stressed).unwrap();
    // 4 * 5 + 20 + 15 + 10
    assert_eq!(assessment.score, 65.0);
    assert_eq!(assessment.level, RiskLevel::High);
    assert_eq!(assessment.triggered.len(), 4);
    // only fields with impact bands are broken down
    assert_eq!(assessment.factors.len(), 1);
    assert_eq!(assessment.factors[0].impact, FactorImpact::High);
}

#[test]
fn test_unknown_choice_is_rejected() {
    let input = AssessmentInput::new()
        .with("missed_payments", 1)
        .with("employment", "astronaut");
    assert!(matches!(
        mixed_scorer().assess(&input),
        Err(ValidationError::InvalidValue { .. })
    ));
}

#[test]
fn test_scorer_exposes_rule_set() {
    let scorer = card_scorer();
    assert_eq!(scorer.name(), "card_utilization");
    assert_eq!(scorer.fields().len(), 2);
    assert_eq!(scorer.cut_points().critical, 75.0);
    assert_eq!(scorer.rule_set().rules.len(), 3);
}

#[test]
fn test_non_finite_totals_stay_in_bounds() {
    assert_eq!(bounded(f64::NAN), MIN_SCORE);
    assert_eq!(bounded(f64::INFINITY), MAX_SCORE);
    assert_eq!(bounded(f64::NEG_INFINITY), MIN_SCORE);
    assert_eq!(bounded(1e308), MAX_SCORE);
    assert_eq!(bounded(42.004), 42.0);
}
