//! `${var}` substitution in step parameters.

use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::Value;

use super::{Scenario, ScenarioError};

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder pattern is valid")
});

/// Replace every `${var}` in the scenario's string parameters and labels.
///
/// All placeholders are checked before anything is replaced, so an
/// unknown variable is reported before any request is sent.
///
/// # Errors
///
/// Returns [`ScenarioError::UnknownVariables`] listing every placeholder
/// with no value in `vars`.
pub fn substitute(
    scenario: &Scenario,
    vars: &HashMap<String, String>,
) -> Result<Scenario, ScenarioError> {
    let mut missing = BTreeSet::new();
    for step in &scenario.steps {
        collect_missing(&step.label, vars, &mut missing);
        for value in step.params.values() {
            walk_strings(value, &mut |s| collect_missing(s, vars, &mut missing));
        }
    }

    if !missing.is_empty() {
        return Err(ScenarioError::UnknownVariables {
            scenario: scenario.name.clone(),
            names: missing.into_iter().collect(),
        });
    }

    let mut resolved = scenario.clone();
    for step in &mut resolved.steps {
        step.label = replace(&step.label, vars);
        for value in step.params.values_mut() {
            replace_in_value(value, vars);
        }
    }
    Ok(resolved)
}

/// Names of all placeholders used by the scenario.
#[must_use]
pub fn placeholders(scenario: &Scenario) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    let empty = HashMap::new();
    for step in &scenario.steps {
        collect_missing(&step.label, &empty, &mut names);
        for value in step.params.values() {
            walk_strings(value, &mut |s| collect_missing(s, &empty, &mut names));
        }
    }
    names
}

fn collect_missing(s: &str, vars: &HashMap<String, String>, missing: &mut BTreeSet<String>) {
    for caps in PLACEHOLDER.captures_iter(s) {
        let name = &caps[1];
        if !vars.contains_key(name) {
            missing.insert(name.to_string());
        }
    }
}

fn replace(s: &str, vars: &HashMap<String, String>) -> String {
    PLACEHOLDER
        .replace_all(s, |caps: &Captures<'_>| {
            vars.get(&caps[1]).cloned().unwrap_or_default()
        })
        .into_owned()
}

fn walk_strings<F: FnMut(&str)>(value: &Value, f: &mut F) {
    match value {
        Value::String(s) => f(s),
        Value::Array(items) => items.iter().for_each(|v| walk_strings(v, f)),
        Value::Object(map) => map.values().for_each(|v| walk_strings(v, f)),
        _ => {}
    }
}

fn replace_in_value(value: &mut Value, vars: &HashMap<String, String>) {
    match value {
        Value::String(s) => *s = replace(s, vars),
        Value::Array(items) => items.iter_mut().for_each(|v| replace_in_value(v, vars)),
        Value::Object(map) => map.values_mut().for_each(|v| replace_in_value(v, vars)),
        _ => {}
    }
}
