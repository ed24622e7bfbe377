// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Parses playbook text into an ordered sequence of ordered mappings.
//!
//! Built directly on `yaml_rust`'s event stream rather than its `YamlLoader`
//! convenience API, so the scalar resolver in [`crate::resolver`] can be
//! consulted per plain scalar instead of `yaml_rust`'s own (slightly
//! different) YAML 1.1 resolution.

use {
    crate::{resolver::resolve_plain_scalar, value::Value},
    indexmap::IndexMap,
    std::fmt,
    yaml_rust::{
        parser::{Event, EventReceiver, Parser},
        scanner::TScalarStyle,
    },
};

#[derive(Debug)]
pub struct YamlParseError(pub String);

impl fmt::Display for YamlParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for YamlParseError {}

enum Frame {
    Sequence(Vec<Value>),
    Mapping(IndexMap<String, Value>, Option<String>),
}

#[derive(Default)]
struct Builder {
    stack: Vec<Frame>,
    root: Option<Value>,
    error: Option<String>,
}

impl Builder {
    fn insert(&mut self, value: Value) {
        if self.error.is_some() {
            return;
        }
        match self.stack.last_mut() {
            None => self.root = Some(value),
            Some(Frame::Sequence(items)) => items.push(value),
            Some(Frame::Mapping(map, pending_key)) => match pending_key.take() {
                None => match value {
                    Value::String(key) => *pending_key = Some(key),
                    other => {
                        self.error = Some(format!(
                            "mapping keys must be strings, got {other:?}"
                        ));
                    }
                },
                Some(key) => {
                    map.insert(key, value);
                }
            },
        }
    }
}

impl EventReceiver for Builder {
    fn on_event(&mut self, ev: Event) {
        match ev {
            Event::SequenceStart(_) => self.stack.push(Frame::Sequence(Vec::new())),
            Event::SequenceEnd => {
                if let Some(Frame::Sequence(items)) = self.stack.pop() {
                    self.insert(Value::Sequence(items));
                }
            }
            Event::MappingStart(_) => self.stack.push(Frame::Mapping(IndexMap::new(), None)),
            Event::MappingEnd => {
                if let Some(Frame::Mapping(map, pending_key)) = self.stack.pop() {
                    if pending_key.is_some() {
                        self.error = Some("mapping ended with a dangling key".to_string());
                    }
                    self.insert(Value::Mapping(map));
                }
            }
            Event::Scalar(text, style, _, _) => {
                let value = if style == TScalarStyle::Plain {
                    resolve_plain_scalar(&text)
                } else {
                    Value::String(text)
                };
                self.insert(value);
            }
            Event::Alias(_) => {
                self.error = Some("YAML anchors/aliases are not supported".to_string());
            }
            Event::Nothing
            | Event::StreamStart
            | Event::StreamEnd
            | Event::DocumentStart
            | Event::DocumentEnd => {}
        }
    }
}

/// Parse arbitrary YAML text into a single [`Value`].
pub fn parse_value(text: &str) -> Result<Value, YamlParseError> {
    let mut builder = Builder::default();
    let mut parser = Parser::new(text.chars());
    parser
        .load(&mut builder, false)
        .map_err(|e| YamlParseError(e.to_string()))?;

    if let Some(err) = builder.error {
        return Err(YamlParseError(err));
    }

    builder
        .root
        .ok_or_else(|| YamlParseError("document contained no value".to_string()))
}

/// Parse a full playbook: a top-level sequence of plays (mappings).
pub fn parse_playbook(text: &str) -> Result<Vec<Value>, YamlParseError> {
    match parse_value(text)? {
        Value::Sequence(items) => Ok(items),
        other => Err(YamlParseError(format!(
            "playbook must be a top-level sequence, got {other:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    #[test]
    fn parses_two_plays_preserving_order() {
        let raw = indoc! {"
            ---
            - name: first dictionary
              key: value
            - name: second dictionary
              key: value
        "};
        let plays = parse_playbook(raw).unwrap();
        assert_eq!(plays.len(), 2);
        let first = plays[0].as_mapping().unwrap();
        let keys: Vec<&str> = first.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["name", "key"]);
    }

    #[test]
    fn integers_and_floats_in_sequences() {
        let plays = parse_playbook("- [1, 2, 3]").unwrap();
        assert_eq!(
            plays[0],
            Value::Sequence(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
        );
        let plays = parse_playbook("- [1.0, 2.0, 3.0]").unwrap();
        assert_eq!(
            plays[0],
            Value::Sequence(vec![Value::Float(1.0), Value::Float(2.0), Value::Float(3.0)])
        );
    }

    #[test]
    fn bool_and_string_tokens() {
        let raw = indoc! {"
            - bool: [true, True, TRUE]
              string: [y, yes, Yes, YES, on, On, ON]
        "};
        let plays = parse_playbook(raw).unwrap();
        let map = plays[0].as_mapping().unwrap();
        assert_eq!(
            map["bool"],
            Value::Sequence(vec![Value::Bool(true), Value::Bool(true), Value::Bool(true)])
        );
        let strings = map["string"].as_sequence().unwrap();
        for (s, expected) in strings.iter().zip(["y", "yes", "Yes", "YES", "on", "On", "ON"]) {
            assert_eq!(s, &Value::String(expected.to_string()));
        }
    }

    #[test]
    fn empty_document_is_not_a_playbook() {
        assert!(parse_playbook("").is_err() || parse_playbook("").unwrap().is_empty());
    }
}
