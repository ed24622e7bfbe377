// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The canonical, byte-exact textual serializer. Signature stability
//! depends entirely on this producing identical output to the reference
//! implementation's `ordereddict`-shaped renderer; every rule here must be
//! reproduced exactly, not "close enough".

use crate::value::Value;

/// Serialize a value into its canonical single-line textual form (no
/// trailing newline).
pub fn serialize(value: &Value) -> String {
    let mut out = String::new();
    write_value(value, &mut out);
    out
}

fn write_value(value: &Value, out: &mut String) {
    match value {
        Value::Mapping(map) => write_mapping(map, out),
        Value::Sequence(items) => write_sequence(items, out),
        Value::Int(i) => out.push_str(&i.to_string()),
        Value::Float(f) => out.push_str(&format_float(*f)),
        Value::String(s) => write_string(s, out),
        Value::Null => out.push_str("None"),
        Value::Bool(b) => out.push_str(if *b { "True" } else { "False" }),
    }
}

fn write_mapping(map: &indexmap::IndexMap<String, Value>, out: &mut String) {
    if map.is_empty() {
        out.push_str("ordereddict()");
        return;
    }
    out.push_str("ordereddict([");
    for (i, (key, value)) in map.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push_str("('");
        out.push_str(key);
        out.push_str("', ");
        write_value(value, out);
        out.push(')');
    }
    out.push_str("])");
}

fn write_sequence(items: &[Value], out: &mut String) {
    out.push('[');
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        write_value(item, out);
    }
    out.push(']');
}

/// Matches the reference runtime's `str(float)`/`repr(float)` textual form:
/// shortest round-trip digits, fixed notation with a trailing `.0` for
/// integral values, switching to scientific notation (lowercase `e`,
/// explicit sign, zero-padded to at least two exponent digits) once the
/// decimal point would fall more than 16 places after, or 4 or more places
/// before, the first significant digit.
fn format_float(f: f64) -> String {
    if f.is_nan() {
        return "nan".to_string();
    }
    if f.is_infinite() {
        return if f < 0.0 { "-inf" } else { "inf" }.to_string();
    }
    if f == 0.0 {
        return if f.is_sign_negative() { "-0.0" } else { "0.0" }.to_string();
    }

    let negative = f.is_sign_negative();
    let (digits, exponent) = shortest_digits(f.abs());
    let body = if exponent <= -5 || exponent >= 16 {
        format_scientific(&digits, exponent)
    } else {
        format_fixed(&digits, exponent)
    };
    if negative {
        format!("-{body}")
    } else {
        body
    }
}

/// Returns the shortest round-trip significant digits (no sign, no decimal
/// point, no trailing zeros) of `value`, and the power of ten `exponent`
/// such that `value == 0.<digits> * 10^(exponent + 1)`. Relies on Rust's
/// `LowerExp` formatter already producing shortest round-trip digits, same
/// as the reference runtime's float formatter.
fn shortest_digits(value: f64) -> (String, i32) {
    let sci = format!("{value:e}");
    let (mantissa, exp) = sci.split_once('e').expect("LowerExp always emits 'e'");
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let exponent: i32 = exp.parse().expect("LowerExp exponent is an integer");
    (digits, exponent)
}

fn format_fixed(digits: &str, exponent: i32) -> String {
    let decimal_point = exponent + 1;
    if decimal_point <= 0 {
        format!("0.{}{digits}", "0".repeat((-decimal_point) as usize))
    } else if decimal_point as usize >= digits.len() {
        format!(
            "{digits}{}.0",
            "0".repeat(decimal_point as usize - digits.len())
        )
    } else {
        let (whole, frac) = digits.split_at(decimal_point as usize);
        format!("{whole}.{frac}")
    }
}

fn format_scientific(digits: &str, exponent: i32) -> String {
    let mantissa = if digits.len() > 1 {
        format!("{}.{}", &digits[..1], &digits[1..])
    } else {
        digits.to_string()
    };
    format!("{mantissa}e{exponent:+03}")
}

fn write_string(value: &str, out: &mut String) {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '\t' => escaped.push_str("\\t"),
            '\u{200b}' => escaped.push_str("\\u200b"),
            '\u{200c}' => escaped.push_str("\\u200c"),
            '\u{200d}' => escaped.push_str("\\u200d"),
            other => escaped.push(other),
        }
    }

    let has_single = escaped.contains('\'');
    let has_double = escaped.contains('"');

    let quote = if has_single && !has_double { '"' } else { '\'' };
    if quote == '\'' && has_single {
        escaped = escaped.replace('\'', "\\'");
    }

    out.push(quote);
    out.push_str(&escaped);
    out.push(quote);
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    fn map(pairs: &[(&str, Value)]) -> Value {
        let mut m = IndexMap::new();
        for (k, v) in pairs {
            m.insert(k.to_string(), v.clone());
        }
        Value::Mapping(m)
    }

    #[test]
    fn s1_single_key() {
        let v = map(&[("a", Value::String("a".into()))]);
        assert_eq!(serialize(&v), "ordereddict([('a', 'a')])");
    }

    #[test]
    fn s2_list_value() {
        let v = map(&[(
            "a",
            Value::Sequence(vec![Value::String("a1".into()), Value::String("a2".into())]),
        )]);
        assert_eq!(serialize(&v), "ordereddict([('a', ['a1', 'a2'])])");
    }

    #[test]
    fn s3_numbers() {
        let v = map(&[
            ("integer", Value::Int(37)),
            ("float", Value::Float(17.93233901)),
        ]);
        assert_eq!(
            serialize(&v),
            "ordereddict([('integer', 37), ('float', 17.93233901)])"
        );
    }

    #[test]
    fn s4_single_quote_switches_to_double() {
        assert_eq!(
            serialize(&Value::String("single'quote".into())),
            "\"single'quote\""
        );
    }

    #[test]
    fn s5_both_quotes_escape_single() {
        assert_eq!(
            serialize(&Value::String("both\"'quotes".into())),
            "'both\"\\'quotes'"
        );
    }

    #[test]
    fn s6_newline_escape() {
        assert_eq!(serialize(&Value::String("new\nline".into())), "'new\\nline'");
    }

    #[test]
    fn s7_zero_width_joiner() {
        assert_eq!(
            serialize(&Value::String("A\u{200d}B".into())),
            "'A\\u200dB'"
        );
    }

    #[test]
    fn s8_empty_mapping() {
        assert_eq!(serialize(&Value::Mapping(IndexMap::new())), "ordereddict()");
    }

    #[test]
    fn s9_null() {
        let v = map(&[("a", Value::Null)]);
        assert_eq!(serialize(&v), "ordereddict([('a', None)])");
    }

    #[test]
    fn double_quote_only_stays_single() {
        assert_eq!(
            serialize(&Value::String("double\"quote".into())),
            "'double\"quote'"
        );
    }

    #[test]
    fn backslash_and_tab() {
        assert_eq!(serialize(&Value::String("\\backslash".into())), "'\\\\backslash'");
        assert_eq!(serialize(&Value::String("tab\tchar".into())), "'tab\\tchar'");
    }

    #[test]
    fn no_quote_needed() {
        assert_eq!(serialize(&Value::String("no quote".into())), "'no quote'");
    }

    #[test]
    fn empty_sequence() {
        assert_eq!(serialize(&Value::Sequence(vec![])), "[]");
    }

    #[test]
    fn determinism() {
        let v = map(&[("a", Value::String("a".into()))]);
        assert_eq!(serialize(&v), serialize(&v));
    }

    #[test]
    fn integral_float_keeps_trailing_dot_zero() {
        assert_eq!(format_float(1.0), "1.0");
        assert_eq!(format_float(-2.0), "-2.0");
        assert_eq!(format_float(100.0), "100.0");
    }

    #[test]
    fn large_magnitude_float_uses_scientific_notation() {
        assert_eq!(format_float(1e20), "1e+20");
        assert_eq!(format_float(1e15), "1000000000000000.0");
        assert_eq!(format_float(1e16), "1e+16");
    }

    #[test]
    fn small_magnitude_float_uses_scientific_notation() {
        assert_eq!(format_float(1e-5), "1e-05");
        assert_eq!(format_float(1e-4), "0.0001");
    }

    #[test]
    fn negative_small_float() {
        assert_eq!(format_float(-1e-5), "-1e-05");
    }
}
