//! Encode a request, answer it synthetically, decode the answer.

use bbdl_core::codec::Value;
use bbdl_core::request::{build, render};
use bbdl_core::response::{decode, decode_file, read_header};
use bbdl_core::{Codec, CsvFieldCatalog, FieldType, Identifier, Options};
use chrono::NaiveDate;
use std::io::BufReader;
use std::path::PathBuf;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn catalog() -> CsvFieldCatalog {
    CsvFieldCatalog::from_file(&fixture("fields.csv")).unwrap()
}

/// Replace the request's data block with reply lines.
fn answer(request: &str, lines: &[&str]) -> String {
    let start = request.find("START-OF-DATA\n").unwrap() + "START-OF-DATA\n".len();
    let end = request.find("END-OF-DATA\n").unwrap();
    let mut out = request[..start].to_string();
    for line in lines {
        out.push_str(line);
        out.push('\n');
    }
    out.push_str(&request[end..]);
    out
}

#[test]
fn request_header_reads_back() {
    let dir = tempfile::tempdir().unwrap();
    let fields = ["ID_BB_GLOBAL", "NAME", "PX_LAST"];
    let ids = [Identifier::ticker("ibm us equity")];
    let path = build(&ids, &fields, &dir.path().join("fprp00.req"), &Options::default()).unwrap();

    let header = read_header(BufReader::new(std::fs::File::open(path).unwrap())).unwrap();
    assert!(!header.is_history);
    assert_eq!(header.fields, fields);

    let history = Options {
        begdate: NaiveDate::from_ymd_opt(2024, 1, 2),
        enddate: NaiveDate::from_ymd_opt(2024, 1, 31),
        ..Default::default()
    };
    let text = render(&ids, &fields, &history).unwrap();
    assert!(read_header(text.as_bytes()).unwrap().is_history);
}

#[test]
fn string_fields_survive_round_trip() {
    let cat = catalog();
    let fields = ["ID_BB_GLOBAL", "PARSEKYABLE_DES", "NAME"];
    let ids = [
        Identifier::ticker("IBM US Equity"),
        Identifier::typed("459200101", "CUSIP"),
    ];
    let request = render(&ids, &fields, &Options::default()).unwrap();
    let reply = answer(
        &request,
        &[
            "IBM US Equity|0|3|BBG000BLNNH6|IBM US Equity|INTL BUSINESS MACHINES CORP|",
            "459200101|0|3|BBG000BLNNH6|IBM US Equity|INTL BUSINESS MACHINES CORP|",
        ],
    );

    let result = decode(reply.as_bytes(), &Codec::new(&cat), '|').unwrap();
    assert_eq!(result.data.len(), 2);
    assert!(result.errors.is_empty());
    for (row, id) in result.data.iter().zip(["IBM US Equity", "459200101"]) {
        assert_eq!(row.identifier.as_deref(), Some(id));
        assert_eq!(row.retcode, Some(0));
        assert_eq!(row.nfields, Some(3));
        assert_eq!(row.get("ID_BB_GLOBAL"), Some(&Value::Str("BBG000BLNNH6".into())));
        assert_eq!(row.get("PARSEKYABLE_DES"), Some(&Value::Str("IBM US Equity".into())));
        assert_eq!(
            row.get("NAME"),
            Some(&Value::Str("INTL BUSINESS MACHINES CORP".into()))
        );
    }
}

#[test]
fn mixed_success_and_rejection() {
    let result = decode_file(&fixture("reference.out"), &Codec::new(&catalog()), '|').unwrap();
    assert_eq!(result.data.len(), 2);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].identifier, "ZZZZZZ Equity");
    assert_eq!(result.errors[0].retcode, "10");

    let ibm = &result.data[0];
    assert_eq!(ibm.get("PX_LAST"), Some(&Value::Float(187.5)));
    assert_eq!(ibm.get("CNTRY_OF_DOMICILE"), Some(&Value::Str("US".into())));
    assert_eq!(ibm.get("MATURITY"), Some(&Value::Null));
    assert_eq!(ibm.get("CALL_SCHEDULE"), Some(&Value::Null));

    let tsla = &result.data[1];
    let Some(Value::List(calls)) = tsla.get("CALL_SCHEDULE") else {
        panic!("expected call schedule list, got {:?}", tsla.get("CALL_SCHEDULE"));
    };
    assert_eq!(calls.len(), 2);
    assert_eq!(
        calls[0],
        Value::Record(vec![
            (
                "Call Date".into(),
                Value::Date(NaiveDate::from_ymd_opt(2024, 8, 15).unwrap())
            ),
            ("Call Price".into(), Value::Int(100)),
        ])
    );
    assert_eq!(result.column_type("CALL_SCHEDULE"), Some(FieldType::Bulk));
}

#[test]
fn positional_bulk_without_mappings() {
    let cat = catalog();
    let codec = Codec::new(&cat).with_custom_mappings(false);
    let result = decode_file(&fixture("reference.out"), &codec, '|').unwrap();
    let Some(Value::List(calls)) = result.data[1].get("CALL_SCHEDULE") else {
        panic!("expected call schedule list");
    };
    assert_eq!(
        calls[1],
        Value::Tuple(vec![
            Value::Date(NaiveDate::from_ymd_opt(2025, 8, 15).unwrap()),
            Value::Float(99.5),
        ])
    );
}

#[test]
fn history_and_reference_chunks_merge() {
    let cat = catalog();
    let codec = Codec::new(&cat);
    let ids = [Identifier::ticker("IBM US Equity")];

    let hist_opts = Options {
        begdate: NaiveDate::from_ymd_opt(2024, 1, 2),
        enddate: NaiveDate::from_ymd_opt(2024, 1, 4),
        ..Default::default()
    };
    let hist = answer(
        &render(&ids, &["PX_LAST"], &hist_opts).unwrap(),
        &[
            "IBM US Equity|0|1|20240102|160.10|",
            "IBM US Equity|0|1|20240103|161.20|",
            "IBM US Equity|0|1|20240104|162.30|",
        ],
    );
    let mut merged = decode(hist.as_bytes(), &codec, '|').unwrap();
    let px = merged.data[0].get("PX_LAST").and_then(Value::as_list).unwrap();
    assert_eq!(px.len(), 3);
    let dates = merged.data[0].get("DATE").and_then(Value::as_list).unwrap();
    assert_eq!(dates[2], Value::Date(NaiveDate::from_ymd_opt(2024, 1, 4).unwrap()));

    let reference = answer(
        &render(&ids, &["NAME"], &Options::default()).unwrap(),
        &["IBM US Equity|0|1|INTL BUSINESS MACHINES CORP|"],
    );
    merged.extend(decode(reference.as_bytes(), &codec, '|').unwrap());
    assert_eq!(merged.data.len(), 2);

    merged.unwrap_single_element_lists();
    assert_eq!(merged.data[0].get("PX_LAST"), Some(&Value::Float(160.1)));
    assert_eq!(
        merged.data[0].get("DATE"),
        Some(&Value::Date(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()))
    );
    assert_eq!(
        merged.data[1].get("NAME"),
        Some(&Value::Str("INTL BUSINESS MACHINES CORP".into()))
    );

    let names: Vec<&str> = merged.columns().iter().map(|c| c.name.as_str()).collect();
    assert_eq!(
        names,
        ["IDENTIFIER", "RETCODE", "NFIELDS", "DATE", "PX_LAST", "NAME"]
    );
}
