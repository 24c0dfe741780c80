//! FM-003: Named-parameter extraction from query text.
//!
//! A parameter is a colon followed by one or more word characters (`:id`,
//! `:start_date`). There is no escaping: `x::int` yields `int`.

use super::types::Parameter;
use indexmap::IndexSet;
use regex::Regex;
use std::sync::LazyLock;

static PARAM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r":(\w+)").expect("parameter pattern compiles"));

/// Extract placeholders, deduplicated by name in order of first appearance.
pub fn extract_parameters(text: &str) -> Vec<Parameter> {
    let names: IndexSet<&str> = PARAM_RE
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .collect();
    names.into_iter().map(Parameter::new).collect()
}
