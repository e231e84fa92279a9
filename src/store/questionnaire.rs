use std::collections::BTreeMap;

use serde_json::Value;

use super::{KeyValueStore, StoreError};

pub const QUESTIONNAIRE_KEY: &str = "questionnaireAnswers";
pub const DEFAULT_RISK_LEVEL: &str = "Moderate";

const RISK_KEYS: [&str; 2] = ["Risk Tolerance", "risk_tolerance"];

pub fn questionnaire_answers<S>(store: &S) -> Result<BTreeMap<String, Value>, StoreError>
where
    S: KeyValueStore + ?Sized,
{
    match store.get(QUESTIONNAIRE_KEY)? {
        Some(raw) if !raw.trim().is_empty() => Ok(serde_json::from_str(&raw)?),
        _ => Ok(BTreeMap::new()),
    }
}

/// Replaces the stored answers wholesale.
pub fn save_questionnaire_answers<S>(
    store: &mut S,
    answers: &BTreeMap<String, Value>,
) -> Result<(), StoreError>
where
    S: KeyValueStore + ?Sized,
{
    store.set(QUESTIONNAIRE_KEY, serde_json::to_string(answers)?)
}

pub fn risk_level<S>(store: &S) -> Result<String, StoreError>
where
    S: KeyValueStore + ?Sized,
{
    let answers = questionnaire_answers(store)?;
    let level = RISK_KEYS
        .iter()
        .filter_map(|key| answers.get(*key))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|level| !level.is_empty())
        .unwrap_or(DEFAULT_RISK_LEVEL);
    Ok(level.to_string())
}
