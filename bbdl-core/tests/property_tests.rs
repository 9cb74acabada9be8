//! Property tests for codec and decoder invariants.
//!
//! 1. Null policy: sentinels are null in any casing/padding, integers never are
//! 2. Bulk decoding never panics and never yields non-list, non-null output
//! 3. Response decoding never panics on arbitrary data lines
//! 4. Merge keeps columns unique and is a no-op with an empty result

use bbdl_core::codec::bulk::to_list;
use bbdl_core::codec::scalar::{to_bool, to_number, to_str};
use bbdl_core::codec::{is_null_str, FieldType, Value, NULL_SENTINELS};
use bbdl_core::response::decode;
use bbdl_core::{Codec, CsvFieldCatalog, FieldInfo, RequestResult};
use proptest::prelude::*;

fn catalog() -> CsvFieldCatalog {
    let rows = [
        ("PX_LAST", "Price"),
        ("NAME", "Long Character"),
        ("MATURITY", "Date"),
        ("CALL_SCHEDULE", "Bulk Format"),
    ];
    CsvFieldCatalog::from_fields(rows.iter().map(|(m, t)| FieldInfo {
        mnemonic: m.to_string(),
        category: "Test".into(),
        type_name: t.to_string(),
    }))
}

fn arb_sentinel() -> impl Strategy<Value = String> {
    (
        prop::sample::select(NULL_SENTINELS.to_vec()),
        any::<bool>(),
        " {0,3}",
        " {0,3}",
    )
        .prop_map(|(s, lower, pre, post)| {
            let s = if lower { s.to_lowercase() } else { s.to_string() };
            format!("{pre}{s}{post}")
        })
}

// ── 1. Null policy ───────────────────────────────────────────────────

proptest! {
    #[test]
    fn sentinels_are_null_everywhere(raw in arb_sentinel()) {
        prop_assert!(is_null_str(&raw));
        prop_assert_eq!(to_number(&raw), Value::Null);
        prop_assert_eq!(to_str(&raw), Value::Null);
        prop_assert_eq!(to_bool(&raw), Value::Bool(false));
    }

    #[test]
    fn integers_are_never_null(n in any::<i64>()) {
        let v = to_number(&n.to_string());
        prop_assert_eq!(&v, &Value::Int(n));
        prop_assert!(!v.is_null());
    }

    #[test]
    fn thousands_separators_are_accepted(n in 1_000i64..1_000_000_000) {
        let s = n.to_string();
        let mut grouped = String::new();
        for (i, c) in s.chars().enumerate() {
            if i > 0 && (s.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(c);
        }
        prop_assert_eq!(to_number(&grouped), Value::Int(n));
    }
}

// ── 2. Bulk decoding ─────────────────────────────────────────────────

proptest! {
    #[test]
    fn bulk_never_panics(raw in "[;|0-9A-Za-z/.]{0,40}") {
        match to_list(&raw) {
            Value::Null | Value::List(_) => {}
            other => prop_assert!(false, "unexpected bulk output {:?}", other),
        }
    }

    #[test]
    fn bulk_one_dimension_numbers(values in prop::collection::vec(-1_000_000i64..1_000_000, 1..8)) {
        let mut raw = format!(";1;{};", values.len());
        for v in &values {
            raw.push_str(&format!("3;{v};"));
        }
        let expected: Vec<Value> = values.iter().map(|v| Value::Int(*v)).collect();
        prop_assert_eq!(to_list(&raw), Value::List(expected));
    }
}

// ── 3. Response decoding ─────────────────────────────────────────────

proptest! {
    #[test]
    fn data_lines_never_fail_decoding(lines in prop::collection::vec("[A-Za-z0-9 .;/|-]{0,60}", 0..10)) {
        let mut text = String::from("START-OF-FIELDS\nPX_LAST\nNAME\nMATURITY\nCALL_SCHEDULE\nEND-OF-FIELDS\nSTART-OF-DATA\n");
        for line in &lines {
            text.push_str(line);
            text.push('\n');
        }
        text.push_str("END-OF-DATA\n");

        let cat = catalog();
        let result = decode(text.as_bytes(), &Codec::new(&cat), '|');
        prop_assert!(result.is_ok());
        let result = result.unwrap();
        prop_assert!(result.data.len() + result.errors.len() <= lines.len());
    }
}

// ── 4. Merge ─────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn merged_columns_stay_unique(
        a in prop::collection::vec("[A-D]{1,2}", 0..12),
        b in prop::collection::vec("[A-D]{1,2}", 0..12),
    ) {
        let mut left = RequestResult::new();
        for name in &a {
            left.push_column(name, FieldType::Str);
        }
        let mut right = RequestResult::new();
        for name in &b {
            right.push_column(name, FieldType::Float);
        }
        let before: Vec<String> = left.columns().iter().map(|c| c.name.clone()).collect();

        left.extend(RequestResult::new());
        let same: Vec<String> = left.columns().iter().map(|c| c.name.clone()).collect();
        prop_assert_eq!(&same, &before);

        left.extend(right);
        let mut names: Vec<&str> = left.columns().iter().map(|c| c.name.as_str()).collect();
        let total = names.len();
        names.sort_unstable();
        names.dedup();
        prop_assert_eq!(names.len(), total);
        // first-seen order and type are kept
        for (col, name) in left.columns().iter().zip(&before) {
            prop_assert_eq!(&col.name, name);
            prop_assert_eq!(col.field_type, FieldType::Str);
        }
    }
}
