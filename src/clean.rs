// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Removes the fields named by `insights_signature_exclude` from a deep
//! copy of a play, before it is serialized and digested.

use crate::{
    error::{PlaybookError, Result},
    value::Value,
};

/// Top-level keys that may contain an exclusion target.
const VARIABLE_FIELDS: &[&str] = &["hosts", "vars"];

/// Remove the fields named by `vars/insights_signature_exclude` from a deep
/// copy of `play`. `play` itself is left untouched.
pub fn clean_play(play: &Value) -> Result<Value> {
    let mapping = play
        .as_mapping()
        .ok_or_else(|| PlaybookError::Precondition("play is not a mapping".to_string()))?;

    let exclude = mapping
        .get("vars")
        .and_then(Value::as_mapping)
        .and_then(|vars| vars.get("insights_signature_exclude"))
        .and_then(Value::as_str)
        .ok_or_else(|| {
            PlaybookError::Precondition(
                "The play does not have the key 'vars/insights_signature_exclude', cannot \
                 exclude dynamic fields."
                    .to_string(),
            )
        })?
        .to_string();

    let mut result = play.clone();

    for field in exclude.split(',') {
        let elements: Vec<&str> = field.split('/').filter(|s| !s.is_empty()).collect();
        if elements.len() != 1 && elements.len() != 2 {
            return Err(PlaybookError::Precondition(format!(
                "Variable field '{field}' is too deep or shallow, only one or two levels are \
                 allowed."
            )));
        }
        if !VARIABLE_FIELDS.contains(&elements[0]) {
            return Err(PlaybookError::Precondition(format!(
                "Variable field '{field}' cannot be excluded."
            )));
        }

        let result_map = result.as_mapping_mut().expect("play is a mapping");
        if elements.len() == 1 {
            if result_map.shift_remove(elements[0]).is_none() {
                return Err(PlaybookError::Precondition(format!(
                    "Variable field '{field}' is not present in the play."
                )));
            }
        } else {
            let nested = result_map
                .get_mut(elements[0])
                .and_then(Value::as_mapping_mut)
                .ok_or_else(|| {
                    PlaybookError::Precondition(format!(
                        "Variable field '{field}' is not present in the play."
                    ))
                })?;
            if nested.shift_remove(elements[1]).is_none() {
                return Err(PlaybookError::Precondition(format!(
                    "Variable field '{field}' is not present in the play."
                )));
            }
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    fn sample_play() -> Value {
        let mut vars = IndexMap::new();
        vars.insert(
            "insights_signature_exclude".to_string(),
            Value::String("/hosts,/vars/insights_signature".to_string()),
        );
        vars.insert(
            "insights_signature".to_string(),
            Value::String("abc".to_string()),
        );

        let mut play = IndexMap::new();
        play.insert("name".to_string(), Value::String("demo".to_string()));
        play.insert("hosts".to_string(), Value::String("all".to_string()));
        play.insert("vars".to_string(), Value::Mapping(vars));
        play.insert("tasks".to_string(), Value::Sequence(vec![]));
        Value::Mapping(play)
    }

    #[test]
    fn removes_named_fields_and_keeps_directive() {
        let play = sample_play();
        let cleaned = clean_play(&play).unwrap();
        let map = cleaned.as_mapping().unwrap();
        assert!(!map.contains_key("hosts"));
        let vars = map.get("vars").unwrap().as_mapping().unwrap();
        assert!(!vars.contains_key("insights_signature"));
        assert!(vars.contains_key("insights_signature_exclude"));
    }

    #[test]
    fn is_idempotent_and_non_mutating() {
        let play = sample_play();
        let once = clean_play(&play).unwrap();
        let twice = clean_play(&once).unwrap_err();
        // Re-cleaning a cleaned play fails because 'hosts' is already gone,
        // demonstrating the original `play` was never mutated by the first call.
        assert!(matches!(twice, PlaybookError::Precondition(_)));
        assert!(play.as_mapping().unwrap().contains_key("hosts"));
    }

    #[test]
    fn rejects_missing_vars() {
        let mut play = IndexMap::new();
        play.insert("name".to_string(), Value::String("demo".to_string()));
        let err = clean_play(&Value::Mapping(play)).unwrap_err();
        assert!(matches!(err, PlaybookError::Precondition(_)));
    }

    #[test]
    fn rejects_too_deep_path() {
        let mut vars = IndexMap::new();
        vars.insert(
            "insights_signature_exclude".to_string(),
            Value::String("/vars/a/b".to_string()),
        );
        let mut play = IndexMap::new();
        play.insert("vars".to_string(), Value::Mapping(vars));
        let err = clean_play(&Value::Mapping(play)).unwrap_err();
        assert!(matches!(err, PlaybookError::Precondition(_)));
    }

    #[test]
    fn rejects_forbidden_top_segment() {
        let mut vars = IndexMap::new();
        vars.insert(
            "insights_signature_exclude".to_string(),
            Value::String("/tasks".to_string()),
        );
        let mut play = IndexMap::new();
        play.insert("vars".to_string(), Value::Mapping(vars));
        play.insert("tasks".to_string(), Value::Sequence(vec![]));
        let err = clean_play(&Value::Mapping(play)).unwrap_err();
        assert!(matches!(err, PlaybookError::Precondition(_)));
    }
}
