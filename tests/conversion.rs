use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr};

use scylla_cql::frame::response::result::{ColumnType, CqlValue, Row};
use scylla_cql::frame::value::{
    CqlDate, CqlDecimal, CqlDuration, CqlTime, CqlTimestamp, CqlTimeuuid, CqlVarint,
};
use scylla_gateway::db::ResultSet;
use scylla_gateway::marshal::{Coercion, Marshaler};
use scylla_gateway::{GatewayError, GenericValue, Number};
use serde_json::json;
use uuid::Uuid;

fn m() -> Marshaler {
    Marshaler::default()
}

fn generic(v: &CqlValue) -> GenericValue {
    m().to_generic("c", v).expect("value should cross the boundary")
}

#[test]
fn scalars_round_trip_through_native() {
    let cases = vec![
        CqlValue::Int(42),
        CqlValue::BigInt(-7_000_000_000),
        CqlValue::SmallInt(-3),
        CqlValue::TinyInt(9),
        CqlValue::Double(2.5),
        CqlValue::Float(0.25),
        CqlValue::Text("hello".into()),
        CqlValue::Ascii("plain ascii".into()),
        CqlValue::Boolean(true),
        CqlValue::Blob(vec![0, 1, 2, 0xff]),
        CqlValue::Varint(CqlVarint::from_signed_bytes_be(vec![0x01, 0x00])),
    ];
    let marshaler = m();
    for v in cases {
        let g = generic(&v);
        let native = marshaler.to_native(&g, None).unwrap().unwrap();
        assert_eq!(generic(&native), g, "round trip of {v:?}");
    }
}

#[test]
fn typed_scalars_round_trip_to_the_same_native_value() {
    let cases = vec![
        (CqlValue::Int(42), ColumnType::Int),
        (CqlValue::SmallInt(-3), ColumnType::SmallInt),
        (CqlValue::TinyInt(9), ColumnType::TinyInt),
        (CqlValue::Float(0.25), ColumnType::Float),
        (CqlValue::Ascii("abc".into()), ColumnType::Ascii),
        (CqlValue::Blob(vec![1, 2, 3]), ColumnType::Blob),
        (
            CqlValue::Uuid(Uuid::parse_str("5a1c3f2e-8d4b-4c1a-9e2f-0b6d7c8e9f10").unwrap()),
            ColumnType::Uuid,
        ),
        (
            CqlValue::Inet(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 7))),
            ColumnType::Inet,
        ),
        (CqlValue::Timestamp(CqlTimestamp(1_394_360_430_000)), ColumnType::Timestamp),
        (CqlValue::Time(CqlTime(3_723_000_000_000)), ColumnType::Time),
    ];
    let marshaler = m();
    for (v, ty) in cases {
        let g = generic(&v);
        let native = marshaler.to_native(&g, Some(&ty)).unwrap().unwrap();
        assert_eq!(native, v, "typed round trip of {g:?}");
    }
}

#[test]
fn numbers_keep_precision() {
    assert_eq!(generic(&CqlValue::BigInt(i64::MAX)), GenericValue::int(i64::MAX));

    let big: Vec<u8> = vec![0x01, 0, 0, 0, 0, 0, 0, 0, 0];
    assert_eq!(
        generic(&CqlValue::Varint(CqlVarint::from_signed_bytes_be(big))),
        GenericValue::Number(Number::Big("18446744073709551616".into()))
    );

    // 12345 * 10^-2
    let decimal = CqlDecimal::from_signed_be_bytes_and_exponent(vec![0x30, 0x39], 2);
    assert_eq!(
        generic(&CqlValue::Decimal(decimal)),
        GenericValue::Number(Number::Big("123.45".into()))
    );
}

#[test]
fn decimal_text_binds_exactly() {
    let native = m()
        .to_native(
            &GenericValue::Number(Number::Big("123.45".into())),
            Some(&ColumnType::Decimal),
        )
        .unwrap()
        .unwrap();
    assert_eq!(generic(&native), GenericValue::Number(Number::Big("123.45".into())));
}

#[test]
fn non_finite_floats_are_dropped() {
    assert_eq!(m().to_generic("c", &CqlValue::Double(f64::NAN)), None);
    assert_eq!(m().to_generic("c", &CqlValue::Float(f32::INFINITY)), None);
}

#[test]
fn temporals_use_the_configured_pattern() {
    assert_eq!(
        generic(&CqlValue::Timestamp(CqlTimestamp(1_394_360_430_000))),
        GenericValue::string("09-03-2014 10:20:30")
    );
    // 2014-03-09 is 16138 days after the epoch
    assert_eq!(
        generic(&CqlValue::Date(CqlDate((1u32 << 31) + 16_138))),
        GenericValue::string("09-03-2014 00:00:00")
    );
    assert_eq!(
        generic(&CqlValue::Time(CqlTime(3_723_000_000_000))),
        GenericValue::string("01:02:03")
    );

    let iso = Marshaler::new("%Y-%m-%dT%H:%M:%S", vec![Coercion::Timestamp]);
    assert_eq!(
        iso.to_generic("c", &CqlValue::Timestamp(CqlTimestamp(0))),
        Some(GenericValue::string("1970-01-01T00:00:00"))
    );
}

#[test]
fn identifiers_render_as_dashed_lowercase_hex() {
    let u = Uuid::parse_str("5A1C3F2E-8D4B-4C1A-9E2F-0B6D7C8E9F10").unwrap();
    assert_eq!(
        generic(&CqlValue::Uuid(u)),
        GenericValue::string("5a1c3f2e-8d4b-4c1a-9e2f-0b6d7c8e9f10")
    );
    let tu = Uuid::parse_str("8e14e760-7fa8-11eb-bc66-000000000001").unwrap();
    assert_eq!(
        generic(&CqlValue::Timeuuid(CqlTimeuuid::from(tu))),
        GenericValue::string("8e14e760-7fa8-11eb-bc66-000000000001")
    );
}

#[test]
fn collections_recurse() {
    let nested = CqlValue::List(vec![
        CqlValue::Set(vec![CqlValue::Int(1), CqlValue::Int(2)]),
        CqlValue::List(vec![CqlValue::Double(f64::NAN), CqlValue::Int(3)]),
    ]);
    assert_eq!(
        serde_json::to_value(generic(&nested)).unwrap(),
        json!([[1, 2], [3]])
    );

    let map = CqlValue::Map(vec![
        (CqlValue::Int(1), CqlValue::Text("one".into())),
        (CqlValue::Int(2), CqlValue::List(vec![CqlValue::Boolean(false)])),
    ]);
    assert_eq!(
        serde_json::to_value(generic(&map)).unwrap(),
        json!({"1": "one", "2": [false]})
    );

    let tuple = CqlValue::Tuple(vec![Some(CqlValue::Int(1)), None]);
    assert_eq!(serde_json::to_value(generic(&tuple)).unwrap(), json!([1, null]));

    let udt = CqlValue::UserDefinedType {
        keyspace: "ks".into(),
        type_name: "address".into(),
        fields: vec![
            ("street".into(), Some(CqlValue::Text("Main".into()))),
            ("zip".into(), None),
        ],
    };
    assert_eq!(
        serde_json::to_value(generic(&udt)).unwrap(),
        json!({"street": "Main", "zip": null})
    );
}

#[test]
fn inet_and_duration_render_as_text() {
    assert_eq!(
        generic(&CqlValue::Inet(IpAddr::V4(Ipv4Addr::LOCALHOST))),
        GenericValue::string("127.0.0.1")
    );
    let d = CqlDuration {
        months: 1,
        days: 2,
        nanoseconds: 3,
    };
    assert_eq!(generic(&CqlValue::Duration(d)), GenericValue::string("1mo2d3ns"));
}

#[test]
fn rows_keep_nulls_and_skip_absent_cells() {
    let result = ResultSet::new(
        vec!["id".into(), "name".into(), "missing".into()],
        vec![Row {
            columns: vec![Some(CqlValue::Int(1)), None],
        }],
    );
    let rows = m().marshal_rows(&result);
    let mut expected = BTreeMap::new();
    expected.insert("id".to_string(), GenericValue::int(1));
    expected.insert("name".to_string(), GenericValue::Null);
    assert_eq!(rows, vec![expected]);

    let skipping = m().with_skip_null_columns(true).marshal_rows(&result);
    assert_eq!(skipping[0].len(), 1);
}

#[test]
fn row_marshaling_is_idempotent() {
    let cols = vec!["a".to_string(), "b".to_string(), "c".to_string(), "d".to_string()];
    let row = Row {
        columns: vec![
            Some(CqlValue::Int(5)),
            Some(CqlValue::Text("x".into())),
            Some(CqlValue::Boolean(false)),
            Some(CqlValue::Blob(vec![9, 8])),
        ],
    };
    let types = [ColumnType::Int, ColumnType::Text, ColumnType::Boolean, ColumnType::Blob];
    let marshaler = m();
    let first = marshaler.marshal_row(&cols, &row);

    let rebuilt = Row {
        columns: cols
            .iter()
            .zip(types.iter())
            .map(|(c, ty)| marshaler.to_native(&first[c], Some(ty)).unwrap())
            .collect(),
    };
    assert_eq!(marshaler.marshal_row(&cols, &rebuilt), first);
}

#[test]
fn coercion_chain_prefers_uuid_then_timestamp_then_text() {
    let marshaler = m();
    let uuid = "5a1c3f2e-8d4b-4c1a-9e2f-0b6d7c8e9f10";
    assert!(matches!(marshaler.coerce_untyped(uuid), CqlValue::Uuid(_)));
    assert_eq!(
        marshaler.coerce_untyped("09-03-2014 10:20:30"),
        CqlValue::Timestamp(CqlTimestamp(1_394_360_430_000))
    );
    assert_eq!(marshaler.coerce_untyped("hello"), CqlValue::Text("hello".into()));

    let no_coercion = Marshaler::new("%d-%m-%Y %H:%M:%S", Vec::new());
    assert_eq!(no_coercion.coerce_untyped(uuid), CqlValue::Text(uuid.into()));

    let timestamp_only = Marshaler::new("%d-%m-%Y %H:%M:%S", vec![Coercion::Timestamp]);
    assert_eq!(timestamp_only.coerce_untyped(uuid), CqlValue::Text(uuid.into()));
}

#[test]
fn textual_slots_pass_strings_through() {
    let uuid = "5a1c3f2e-8d4b-4c1a-9e2f-0b6d7c8e9f10";
    let native = m()
        .to_native(&GenericValue::string(uuid), Some(&ColumnType::Text))
        .unwrap();
    assert_eq!(native, Some(CqlValue::Text(uuid.into())));
}

#[test]
fn typed_collections_bind_with_element_hints() {
    let marshaler = m();
    let list = GenericValue::List(vec![GenericValue::int(1), GenericValue::int(2)]);
    let native = marshaler
        .to_native(&list, Some(&ColumnType::Set(Box::new(ColumnType::Int))))
        .unwrap();
    assert_eq!(
        native,
        Some(CqlValue::Set(vec![CqlValue::Int(1), CqlValue::Int(2)]))
    );

    let mut entries = BTreeMap::new();
    entries.insert("7".to_string(), GenericValue::string("seven"));
    let native = marshaler
        .to_native(
            &GenericValue::Map(entries),
            Some(&ColumnType::Map(
                Box::new(ColumnType::Int),
                Box::new(ColumnType::Text),
            )),
        )
        .unwrap();
    assert_eq!(
        native,
        Some(CqlValue::Map(vec![(CqlValue::Int(7), CqlValue::Text("seven".into()))]))
    );
}

#[test]
fn values_that_do_not_fit_are_bind_errors() {
    let marshaler = m();
    let err = marshaler
        .to_native(&GenericValue::int(300), Some(&ColumnType::TinyInt))
        .unwrap_err();
    assert!(matches!(err, GatewayError::Bind(_)));

    let err = marshaler
        .to_native(&GenericValue::string("nope"), Some(&ColumnType::Uuid))
        .unwrap_err();
    assert!(matches!(err, GatewayError::Bind(_)));

    let err = marshaler
        .to_native(
            &GenericValue::List(vec![GenericValue::Null]),
            Some(&ColumnType::List(Box::new(ColumnType::Int))),
        )
        .unwrap_err();
    assert!(matches!(err, GatewayError::Bind(_)));

    assert_eq!(marshaler.to_native(&GenericValue::Null, Some(&ColumnType::Int)).unwrap(), None);
}

#[test]
fn large_integral_floats_are_never_clamped() {
    let marshaler = m();
    let huge = GenericValue::float(1e20);

    let err = marshaler
        .to_native(&huge, Some(&ColumnType::BigInt))
        .unwrap_err();
    assert!(matches!(err, GatewayError::Bind(ref msg) if msg.contains("out of range")), "{err}");
    let err = marshaler
        .to_native(&GenericValue::float(-1e19), Some(&ColumnType::Counter))
        .unwrap_err();
    assert!(matches!(err, GatewayError::Bind(_)));

    let varint = marshaler
        .to_native(&huge, Some(&ColumnType::Varint))
        .unwrap()
        .unwrap();
    assert_eq!(
        generic(&varint),
        GenericValue::Number(Number::Big("100000000000000000000".into()))
    );

    let decimal = marshaler
        .to_native(&huge, Some(&ColumnType::Decimal))
        .unwrap()
        .unwrap();
    assert_eq!(
        generic(&decimal),
        GenericValue::Number(Number::Big("100000000000000000000".into()))
    );

    assert_eq!(
        marshaler
            .to_native(&GenericValue::float(4096.0), Some(&ColumnType::BigInt))
            .unwrap(),
        Some(CqlValue::BigInt(4096))
    );
}
