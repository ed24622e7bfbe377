// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Custom scalar resolution rules layered on top of default YAML 1.1-style
//! resolution. These exist to match a reference verifier's overrides on
//! `SafeConstructor.construct_yaml_bool` / `construct_yaml_int`: plain
//! scalars are checked against a stricter bool grammar and a stricter int
//! grammar before falling back to the default float/null/string resolution.

use crate::value::Value;

/// Resolve a plain (unquoted) scalar token into its runtime value.
///
/// Quoted scalars must not be passed here; callers resolve those directly
/// to `Value::String` without consulting this function.
pub fn resolve_plain_scalar(token: &str) -> Value {
    if let Some(b) = resolve_bool(token) {
        return Value::Bool(b);
    }
    if let Some(i) = resolve_int(token) {
        return Value::Int(i);
    }
    if let Some(f) = resolve_float(token) {
        return Value::Float(f);
    }
    if is_null(token) {
        return Value::Null;
    }
    Value::String(token.to_string())
}

/// Boolean resolves only for the exact case-folded tokens `true`/`false`.
/// YAML 1.1 tokens like `y`, `yes`, `on` (and their capitalizations) are
/// deliberately left as strings.
fn resolve_bool(token: &str) -> Option<bool> {
    match token.to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// Integer resolution with the two overrides from the reference
/// implementation:
/// - a colon anywhere in the token blocks integer resolution entirely
///   (guards against YAML 1.1 sexagesimal `H:MM:SS` tokens like `1:30:00`).
/// - tokens with an (optionally signed) `0b`/`0o`/`0x` prefix are parsed via
///   their base; everything else is parsed as plain base-10.
fn resolve_int(token: &str) -> Option<i64> {
    if token.is_empty() || token.contains(':') {
        return None;
    }

    let (sign, unsigned) = match token.strip_prefix('-') {
        Some(rest) => (-1i64, rest),
        None => (1i64, token.strip_prefix('+').unwrap_or(token)),
    };

    if unsigned.is_empty() {
        return None;
    }

    if let Some(digits) = unsigned.strip_prefix("0b") {
        return parse_radix(digits, 2).map(|v| sign * v);
    }
    if let Some(digits) = unsigned.strip_prefix("0o") {
        return parse_radix(digits, 8).map(|v| sign * v);
    }
    if let Some(digits) = unsigned.strip_prefix("0x") {
        return parse_radix(digits, 16).map(|v| sign * v);
    }

    if !unsigned.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    unsigned.parse::<i64>().ok().map(|v| sign * v)
}

fn parse_radix(digits: &str, radix: u32) -> Option<i64> {
    if digits.is_empty() {
        return None;
    }
    i64::from_str_radix(digits, radix).ok()
}

fn resolve_float(token: &str) -> Option<f64> {
    match token.to_ascii_lowercase().as_str() {
        ".nan" => return Some(f64::NAN),
        ".inf" | "+.inf" => return Some(f64::INFINITY),
        "-.inf" => return Some(f64::NEG_INFINITY),
        _ => {}
    }
    if !looks_like_float(token) {
        return None;
    }
    token.parse::<f64>().ok()
}

/// Heuristic gate so integer-shaped tokens (and arbitrary words) are never
/// misread as floats by `str::parse`, which is more permissive than YAML.
/// YAML 1.1's default float grammar requires a literal `.` (the `.inf`/
/// `.nan` forms are handled separately, before this gate runs); a
/// bare-exponent token like `1e3` has no decimal point and must stay a
/// string.
fn looks_like_float(token: &str) -> bool {
    let has_digit = token.bytes().any(|b| b.is_ascii_digit());
    let has_dot = token.contains('.');
    let plausible_chars = token
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'-' | b'+' | b'e' | b'E'));
    has_digit && has_dot && plausible_chars
}

fn is_null(token: &str) -> bool {
    matches!(token, "~" | "null" | "Null" | "NULL" | "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_only_true_false() {
        assert_eq!(resolve_plain_scalar("true"), Value::Bool(true));
        assert_eq!(resolve_plain_scalar("True"), Value::Bool(true));
        assert_eq!(resolve_plain_scalar("TRUE"), Value::Bool(true));
        assert_eq!(resolve_plain_scalar("false"), Value::Bool(false));
        assert_eq!(resolve_plain_scalar("y"), Value::String("y".into()));
        assert_eq!(resolve_plain_scalar("yes"), Value::String("yes".into()));
        assert_eq!(resolve_plain_scalar("On"), Value::String("On".into()));
    }

    #[test]
    fn colon_blocks_int() {
        assert_eq!(resolve_plain_scalar("12:34"), Value::String("12:34".into()));
        assert_eq!(
            resolve_plain_scalar("1:30:00"),
            Value::String("1:30:00".into())
        );
    }

    #[test]
    fn base_prefixes() {
        assert_eq!(resolve_plain_scalar("0x1F"), Value::Int(31));
        assert_eq!(resolve_plain_scalar("0o17"), Value::Int(15));
        assert_eq!(resolve_plain_scalar("0b101"), Value::Int(5));
        assert_eq!(resolve_plain_scalar("-0x10"), Value::Int(-16));
    }

    #[test]
    fn plain_decimal() {
        assert_eq!(resolve_plain_scalar("37"), Value::Int(37));
        assert_eq!(resolve_plain_scalar("-0"), Value::Int(0));
    }

    #[test]
    fn floats() {
        assert_eq!(resolve_plain_scalar("17.93233901"), Value::Float(17.93233901));
        assert_eq!(resolve_plain_scalar("1.0"), Value::Float(1.0));
        assert_eq!(resolve_plain_scalar("1.5e3"), Value::Float(1500.0));
    }

    #[test]
    fn bare_exponent_without_dot_stays_string() {
        assert_eq!(resolve_plain_scalar("1e3"), Value::String("1e3".into()));
    }

    #[test]
    fn nulls() {
        assert_eq!(resolve_plain_scalar("~"), Value::Null);
        assert_eq!(resolve_plain_scalar("null"), Value::Null);
    }
}
