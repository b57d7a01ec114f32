pub mod rules;

pub use rules::{build_scorer, get_rule_based_scorer, pre_delinquency_rule_set};
