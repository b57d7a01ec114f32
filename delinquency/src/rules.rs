use anyhow::Context;
use common::config::ScoringConfig;
use scoring::{
    model::FieldSpec,
    rule_set::{Rule, RuleSet},
    scorers::RuleBasedScorer,
};

pub const RULE_SET_NAME: &str = "pre_delinquency";

/// The seven behavioural indicators of the prototype, each scored linearly.
pub fn pre_delinquency_rule_set() -> RuleSet {
    let mut rule_set = RuleSet::new(RULE_SET_NAME)
        .with_description("Early warning indicators of loan delinquency")
        .with_cut_points(25.0, 50.0, 75.0);

    rule_set.add_field(
        FieldSpec::integer("salary_delay_days", "Salary Delay (days)", 0, 30)
            .with_help("Number of days salary is delayed")
            .with_default(0)
            .with_impact(7.0, 15.0),
    );
    rule_set.add_field(
        FieldSpec::number("savings_drop_pct", "Savings Decline (%)", 0.0, 1.0, 0.05)
            .as_percent()
            .with_help("Percentage drop in savings balance")
            .with_default(0.0)
            .with_impact(0.2, 0.5),
    );
    rule_set.add_field(
        FieldSpec::integer("utility_payment_delay_days", "Utility Payment Delay (days)", 0, 30)
            .with_help("Days late on utility payments")
            .with_default(0)
            .with_impact(7.0, 15.0),
    );
    rule_set.add_field(
        FieldSpec::number("discretionary_spend_drop_pct", "Discretionary Spending Drop (%)", 0.0, 1.0, 0.05)
            .as_percent()
            .with_help("Reduction in non-essential spending")
            .with_default(0.0)
            .with_impact(0.2, 0.5),
    );
    rule_set.add_field(
        FieldSpec::integer("atm_withdrawal_increase", "ATM Withdrawal Increase", 0, 20)
            .with_help("Increase in ATM withdrawal frequency")
            .with_default(0)
            .with_impact(5.0, 10.0),
    );
    rule_set.add_field(
        FieldSpec::integer("upi_lending_txn_count", "UPI Lending App Transactions", 0, 10)
            .with_help("Transactions with lending apps")
            .with_default(0)
            .with_impact(2.0, 5.0),
    );
    rule_set.add_field(
        FieldSpec::integer("failed_autodebit_count", "Failed Auto-debit Count", 0, 5)
            .with_help("Number of failed automatic payments")
            .with_default(0)
            .with_impact(0.0, 2.0),
    );

    rule_set.add_rule(Rule::weighted("Salary delay", "salary_delay_days", 3.0));
    rule_set.add_rule(Rule::weighted("Savings drop", "savings_drop_pct", 40.0));
    rule_set.add_rule(Rule::weighted("Utility delay", "utility_payment_delay_days", 2.0));
    rule_set.add_rule(Rule::weighted("Spending drop", "discretionary_spend_drop_pct", 20.0));
    rule_set.add_rule(Rule::weighted("ATM increase", "atm_withdrawal_increase", 2.0));
    rule_set.add_rule(Rule::weighted("Lending apps", "upi_lending_txn_count", 5.0));
    rule_set.add_rule(Rule::weighted("Failed debits", "failed_autodebit_count", 8.0));

    rule_set
}

pub fn get_rule_based_scorer() -> anyhow::Result<RuleBasedScorer> {
    RuleBasedScorer::new(pre_delinquency_rule_set()).context("Built-in pre-delinquency rule set is invalid")
}

/// Uses `scoring.rules_file` when configured, the built-in rule set otherwise.
pub fn build_scorer(config: &ScoringConfig) -> anyhow::Result<RuleBasedScorer> {
    match &config.rules_file {
        Some(path) => {
            tracing::info!(path = %path, "Loading rule set from file");
            let rule_set = RuleSet::from_yaml_file(path)
                .with_context(|| format!("Failed to load rule set from {}", path))?;
            RuleBasedScorer::new(rule_set).with_context(|| format!("Rule set in {} is invalid", path))
        }
        None => get_rule_based_scorer(),
    }
}
