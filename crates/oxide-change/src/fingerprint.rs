//! Configuration fingerprints.
//!
//! A fingerprint identifies a change's configuration so the execution engine
//! can tell whether an already applied declaration was edited afterwards.
//! It hashes the kind plus every declared field, sorted by name, in a
//! canonical text encoding, so it does not depend on the order fields were
//! populated in.

use std::fmt::Write;

use sha2::{Digest, Sha256};

use crate::value::FieldValue;

/// Version prefix of the fingerprint format.
pub const FINGERPRINT_VERSION: u32 = 1;

/// Computes the fingerprint of a change configuration.
#[must_use]
pub fn fingerprint(kind: &str, fields: &[(&str, FieldValue)]) -> String {
    let mut sorted: Vec<&(&str, FieldValue)> = fields.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let mut canonical = String::new();
    encode_text(kind, &mut canonical);
    canonical.push('\n');
    for (name, value) in sorted {
        canonical.push_str(name);
        canonical.push('=');
        encode(value, &mut canonical);
        canonical.push(';');
    }
    digest(&canonical)
}

/// Combines the fingerprints of an ordered sequence of changes.
#[must_use]
pub fn combine<'a>(fingerprints: impl IntoIterator<Item = &'a str>) -> String {
    let joined: Vec<&str> = fingerprints.into_iter().collect();
    digest(&joined.join("\n"))
}

fn digest(canonical: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    format!("{FINGERPRINT_VERSION}:{}", hex::encode(hasher.finalize()))
}

/// Writes the canonical encoding of a value.
///
/// Integral floats are written as integers so `5` and `5.0` agree; text is
/// always quoted so `"5"` and `5` do not.
pub fn encode(value: &FieldValue, out: &mut String) {
    match value {
        FieldValue::Null => out.push_str("null"),
        FieldValue::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        FieldValue::Integer(i) => {
            let _ = write!(out, "{i}");
        }
        FieldValue::Float(f) => encode_float(*f, out),
        FieldValue::Text(s) => encode_text(s, out),
        FieldValue::List(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                encode(item, out);
            }
            out.push(']');
        }
        FieldValue::Map(entries) => {
            out.push('{');
            for (i, (key, item)) in entries.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                encode_text(key, out);
                out.push(':');
                encode(item, out);
            }
            out.push('}');
        }
    }
}

fn encode_float(f: f64, out: &mut String) {
    // 2^53: beyond this not every integer is representable.
    const EXACT_LIMIT: f64 = 9_007_199_254_740_992.0;
    if f == 0.0 && f.is_sign_negative() {
        // Renders as -0 in SQL, so it must not collide with 0.
        out.push_str("-0");
    } else if f.is_finite() && f.fract() == 0.0 && f.abs() < EXACT_LIMIT {
        #[allow(clippy::cast_possible_truncation)]
        let integral = f as i64;
        let _ = write!(out, "{integral}");
    } else {
        let _ = write!(out, "{f:?}");
    }
}

fn encode_text(s: &str, out: &mut String) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(out, "\\u{{{:04x}}}", u32::from(c));
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn canonical(value: &FieldValue) -> String {
        let mut out = String::new();
        encode(value, &mut out);
        out
    }

    #[test]
    fn test_field_order_does_not_matter() {
        let a = fingerprint(
            "add-column",
            &[("table_name", "users".into()), ("schema_name", "app".into())],
        );
        let b = fingerprint(
            "add-column",
            &[("schema_name", "app".into()), ("table_name", "users".into())],
        );
        assert_eq!(a, b);
        assert!(a.starts_with("1:"));
        assert_eq!(a.len(), 2 + 64);
    }

    #[test]
    fn test_kind_is_part_of_fingerprint() {
        let fields = [("table_name", FieldValue::from("users"))];
        assert_ne!(
            fingerprint("drop-table", &fields),
            fingerprint("create-table", &fields)
        );
    }

    #[test]
    fn test_numbers_are_canonicalized() {
        assert_eq!(canonical(&FieldValue::Float(5.0)), canonical(&FieldValue::Integer(5)));
        assert_eq!(canonical(&FieldValue::Float(0.5)), "0.5");
        assert_ne!(canonical(&FieldValue::from("5")), canonical(&FieldValue::Integer(5)));
    }

    #[test]
    fn test_negative_zero_is_distinct() {
        assert_eq!(canonical(&FieldValue::Float(-0.0)), "-0");
        assert_eq!(canonical(&FieldValue::Float(0.0)), canonical(&FieldValue::Integer(0)));
        assert_ne!(
            canonical(&FieldValue::Float(-0.0)),
            canonical(&FieldValue::Integer(0))
        );
    }

    #[test]
    fn test_strings_are_escaped() {
        assert_eq!(canonical(&FieldValue::from("a\"b\\c\n")), r#""a\"b\\c\n""#);
        // Without escaping these two would encode identically.
        let one = fingerprint("sql", &[("sql", "a;b=\"c\"".into())]);
        let two = fingerprint("sql", &[("sql", "a".into()), ("b", "c".into())]);
        assert_ne!(one, two);
    }

    #[test]
    fn test_nested_records_are_ordered() {
        let a = FieldValue::record([("name", "id"), ("type", "int")]);
        let b = FieldValue::record([("type", "int"), ("name", "id")]);
        assert_eq!(canonical(&a), canonical(&b));
        assert_eq!(canonical(&a), r#"{"name":"id","type":"int"}"#);
    }

    #[test]
    fn test_combine_is_order_sensitive() {
        assert_ne!(combine(["1:a", "1:b"]), combine(["1:b", "1:a"]));
    }

    proptest! {
        #[test]
        fn prop_permutation_invariant(
            table in "[a-z_]{1,12}",
            column in "[a-z_]{1,12}",
            nullable in any::<bool>(),
        ) {
            let forward = [
                ("table_name", FieldValue::from(table.as_str())),
                ("column_name", FieldValue::from(column.as_str())),
                ("nullable", FieldValue::Bool(nullable)),
            ];
            let mut backward = forward.clone();
            backward.reverse();
            prop_assert_eq!(
                fingerprint("k", &forward),
                fingerprint("k", &backward)
            );
        }

        #[test]
        fn prop_distinct_values_distinct_fingerprints(a in ".{0,16}", b in ".{0,16}") {
            prop_assume!(a != b);
            prop_assert_ne!(
                fingerprint("k", &[("f", FieldValue::from(a.as_str()))]),
                fingerprint("k", &[("f", FieldValue::from(b.as_str()))])
            );
        }
    }
}
