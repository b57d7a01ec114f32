pub mod error;
pub mod executable_utils;
pub mod model;
pub mod page;
pub mod rule_set;
pub mod scorers;
