//! Conversion between driver-native `CqlValue`s and `GenericValue`s.
//!
//! `to_generic` is total: every cell either becomes exactly one value or is
//! dropped with a `warn!` diagnostic. `to_native` goes the other way when
//! binding parameters and uses the placeholder's declared type when the
//! backend exposes one. Untyped strings run through the ordered coercion chain.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::net::IpAddr;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use num_bigint::BigInt;
use scylla_cql::frame::response::result::{ColumnType, CqlValue, Row as CqlRow};
use scylla_cql::frame::value::{
    Counter, CqlDate, CqlDecimal, CqlDuration, CqlTime, CqlTimestamp, CqlTimeuuid, CqlVarint,
};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::config::{DEFAULT_DATE_FORMAT, GatewayConfig};
use crate::db::ResultSet;
use crate::error::{GatewayError, GatewayResult};
use crate::schema::{GenericValue, Number, Row};

/// `CqlDate` counts days with the epoch at 2^31.
const DATE_EPOCH_OFFSET: i64 = 1 << 31;

/// One attempt in the string coercion chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Coercion {
    Uuid,
    Timestamp,
}

#[derive(Debug, Clone)]
pub struct Marshaler {
    date_format: String,
    coercion: Vec<Coercion>,
    skip_null_columns: bool,
}

impl Default for Marshaler {
    fn default() -> Self {
        Self {
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            coercion: vec![Coercion::Uuid, Coercion::Timestamp],
            skip_null_columns: false,
        }
    }
}

impl Marshaler {
    pub fn new(date_format: impl Into<String>, coercion: Vec<Coercion>) -> Self {
        Self {
            date_format: date_format.into(),
            coercion,
            skip_null_columns: false,
        }
    }

    pub fn from_config(config: &GatewayConfig) -> Self {
        Self {
            date_format: config.date_format.clone(),
            coercion: config.coercion.clone(),
            skip_null_columns: config.skip_null_columns,
        }
    }

    pub fn with_skip_null_columns(mut self, skip: bool) -> Self {
        self.skip_null_columns = skip;
        self
    }

    pub fn date_format(&self) -> &str {
        &self.date_format
    }

    // ---------------------------------------------------------------------
    // native -> generic
    // ---------------------------------------------------------------------

    /// Convert one cell. `None` means the value could not cross the boundary
    /// and the column must be dropped.
    pub fn to_generic(&self, column: &str, value: &CqlValue) -> Option<GenericValue> {
        let out = match value {
            CqlValue::Empty => GenericValue::Null,

            CqlValue::TinyInt(i) => GenericValue::int(i64::from(*i)),
            CqlValue::SmallInt(i) => GenericValue::int(i64::from(*i)),
            CqlValue::Int(i) => GenericValue::int(i64::from(*i)),
            CqlValue::BigInt(i) => GenericValue::int(*i),
            CqlValue::Counter(Counter(i)) => GenericValue::int(*i),
            CqlValue::Float(f) => return finite(column, f64::from(*f)),
            CqlValue::Double(f) => return finite(column, *f),
            CqlValue::Varint(v) => varint_to_generic(v),
            CqlValue::Decimal(d) => {
                let (bytes, scale) = d.as_signed_be_bytes_slice_and_exponent();
                GenericValue::Number(Number::Big(decimal_text(
                    &BigInt::from_signed_bytes_be(bytes),
                    scale,
                )))
            }

            CqlValue::Boolean(b) => GenericValue::Bool(*b),

            CqlValue::Ascii(s) | CqlValue::Text(s) => GenericValue::String(s.clone()),

            CqlValue::Timestamp(CqlTimestamp(ms)) => match DateTime::from_timestamp_millis(*ms) {
                Some(dt) => GenericValue::String(self.format_datetime(&dt.naive_utc())),
                None => return dropped(column, "timestamp out of range"),
            },
            CqlValue::Date(CqlDate(days)) => match date_from_days(*days) {
                Some(date) => GenericValue::String(self.format_datetime(&date.and_time(NaiveTime::MIN))),
                None => return dropped(column, "date out of range"),
            },
            CqlValue::Time(CqlTime(nanos)) => match time_from_nanos(*nanos) {
                Some(t) => GenericValue::String(t.format("%H:%M:%S%.f").to_string()),
                None => return dropped(column, "time out of range"),
            },

            CqlValue::Uuid(u) => GenericValue::String(u.to_string()),
            CqlValue::Timeuuid(u) => GenericValue::String(u.to_string()),

            CqlValue::Blob(bytes) => GenericValue::Binary(bytes.clone()),

            CqlValue::List(items) | CqlValue::Set(items) => GenericValue::List(
                items
                    .iter()
                    .filter_map(|item| self.to_generic(column, item))
                    .collect(),
            ),
            CqlValue::Tuple(items) => GenericValue::List(
                items
                    .iter()
                    .filter_map(|item| match item {
                        Some(v) => self.to_generic(column, v),
                        None => Some(GenericValue::Null),
                    })
                    .collect(),
            ),

            CqlValue::Map(entries) => {
                let mut out = BTreeMap::new();
                for (k, v) in entries {
                    let Some(key) = self.to_generic(column, k) else {
                        continue;
                    };
                    if let Some(val) = self.to_generic(column, v) {
                        out.insert(key.to_key_string(), val);
                    }
                }
                GenericValue::Map(out)
            }
            CqlValue::UserDefinedType { fields, .. } => {
                let mut out = BTreeMap::new();
                for (name, v) in fields {
                    let val = match v {
                        Some(v) => self.to_generic(column, v),
                        None => Some(GenericValue::Null),
                    };
                    if let Some(val) = val {
                        out.insert(name.clone(), val);
                    }
                }
                GenericValue::Map(out)
            }

            CqlValue::Inet(addr) => GenericValue::String(addr.to_string()),
            CqlValue::Duration(d) => GenericValue::String(duration_literal(d)),
        };
        Some(out)
    }

    /// Marshal one row. Cells missing from the row are skipped; null cells
    /// become `Null` unless `skip_null_columns` is set.
    pub fn marshal_row(&self, col_names: &[String], row: &CqlRow) -> Row {
        let mut out = Row::new();
        for (i, name) in col_names.iter().enumerate() {
            match row.columns.get(i) {
                None => continue,
                Some(None) => {
                    if !self.skip_null_columns {
                        out.insert(name.clone(), GenericValue::Null);
                    }
                }
                Some(Some(v)) => {
                    if let Some(val) = self.to_generic(name, v) {
                        out.insert(name.clone(), val);
                    }
                }
            }
        }
        out
    }

    pub fn marshal_rows(&self, result: &ResultSet) -> Vec<Row> {
        result
            .rows
            .iter()
            .map(|row| self.marshal_row(&result.col_names, row))
            .collect()
    }

    fn format_datetime(&self, dt: &NaiveDateTime) -> String {
        let mut s = String::new();
        if write!(s, "{}", dt.format(&self.date_format)).is_err() {
            warn!(pattern = %self.date_format, "invalid date pattern; using RFC 3339");
            return dt.and_utc().to_rfc3339();
        }
        s
    }

    // ---------------------------------------------------------------------
    // generic -> native
    // ---------------------------------------------------------------------

    /// Convert a parameter for binding. `Ok(None)` binds null.
    pub fn to_native(
        &self,
        value: &GenericValue,
        hint: Option<&ColumnType>,
    ) -> GatewayResult<Option<CqlValue>> {
        let out = match value {
            GenericValue::Null => return Ok(None),
            GenericValue::Bool(b) => match hint {
                None | Some(ColumnType::Boolean) => CqlValue::Boolean(*b),
                Some(ColumnType::Text) => CqlValue::Text(b.to_string()),
                Some(ColumnType::Ascii) => CqlValue::Ascii(b.to_string()),
                Some(other) => return Err(mismatch(value, other)),
            },
            GenericValue::Number(n) => self.number_to_native(n, hint)?,
            GenericValue::String(s) => self.string_to_native(s, hint)?,
            GenericValue::Binary(bytes) => match hint {
                None | Some(ColumnType::Blob) => CqlValue::Blob(bytes.clone()),
                Some(other) => return Err(mismatch(value, other)),
            },
            GenericValue::List(items) => match hint {
                None => CqlValue::List(self.collection_elements(items, None)?),
                Some(ColumnType::List(inner)) => {
                    CqlValue::List(self.collection_elements(items, Some(inner.as_ref()))?)
                }
                Some(ColumnType::Set(inner)) => {
                    CqlValue::Set(self.collection_elements(items, Some(inner.as_ref()))?)
                }
                Some(ColumnType::Tuple(types)) => {
                    if items.len() > types.len() {
                        return Err(GatewayError::Bind(format!(
                            "tuple of {} elements given {} values",
                            types.len(),
                            items.len()
                        )));
                    }
                    let mut out = Vec::with_capacity(types.len());
                    for (i, ty) in types.iter().enumerate() {
                        match items.get(i) {
                            Some(item) => out.push(self.to_native(item, Some(ty))?),
                            None => out.push(None),
                        }
                    }
                    CqlValue::Tuple(out)
                }
                Some(other) => return Err(mismatch(value, other)),
            },
            GenericValue::Map(entries) => match hint {
                None => {
                    let mut out = Vec::with_capacity(entries.len());
                    for (k, v) in entries {
                        let val = self.to_native(v, None)?.ok_or_else(|| null_in_collection(k))?;
                        out.push((CqlValue::Text(k.clone()), val));
                    }
                    CqlValue::Map(out)
                }
                Some(ColumnType::Map(key_type, value_type)) => {
                    let mut out = Vec::with_capacity(entries.len());
                    for (k, v) in entries {
                        let key = self.string_to_native(k, Some(key_type.as_ref()))?;
                        let val = self
                            .to_native(v, Some(value_type.as_ref()))?
                            .ok_or_else(|| null_in_collection(k))?;
                        out.push((key, val));
                    }
                    CqlValue::Map(out)
                }
                Some(ColumnType::UserDefinedType {
                    type_name,
                    keyspace,
                    field_types,
                }) => {
                    let mut fields = Vec::with_capacity(field_types.len());
                    for (name, ty) in field_types {
                        let v = match entries.get(name) {
                            Some(v) => self.to_native(v, Some(ty))?,
                            None => None,
                        };
                        fields.push((name.clone(), v));
                    }
                    CqlValue::UserDefinedType {
                        keyspace: keyspace.clone(),
                        type_name: type_name.clone(),
                        fields,
                    }
                }
                Some(other) => return Err(mismatch(value, other)),
            },
        };
        Ok(Some(out))
    }

    /// Convert a whole parameter tuple, pairing each value with its slot type
    /// when known.
    pub fn bind_tuple(
        &self,
        values: &[GenericValue],
        types: &[ColumnType],
    ) -> GatewayResult<Vec<Option<CqlValue>>> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| self.to_native(v, types.get(i)))
            .collect()
    }

    fn collection_elements(
        &self,
        items: &[GenericValue],
        inner: Option<&ColumnType>,
    ) -> GatewayResult<Vec<CqlValue>> {
        items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                self.to_native(item, inner)?
                    .ok_or_else(|| null_in_collection(&i.to_string()))
            })
            .collect()
    }

    fn number_to_native(&self, n: &Number, hint: Option<&ColumnType>) -> GatewayResult<CqlValue> {
        let Some(hint) = hint else {
            return Ok(match n {
                Number::Int(i) => CqlValue::BigInt(*i),
                Number::Float(f) => CqlValue::Double(*f),
                Number::Big(s) => big_to_native(s)?,
            });
        };
        match n {
            Number::Int(i) => int_to_native(*i, hint),
            Number::Float(f) => match hint {
                ColumnType::Double => Ok(CqlValue::Double(*f)),
                ColumnType::Float => Ok(CqlValue::Float(*f as f32)),
                ColumnType::Decimal => decimal_from_text(&f.to_string()),
                ColumnType::Text => Ok(CqlValue::Text(f.to_string())),
                ColumnType::Ascii => Ok(CqlValue::Ascii(f.to_string())),
                ColumnType::Varint if is_integral(*f) => format!("{f:.0}")
                    .parse::<BigInt>()
                    .map(|b| CqlValue::Varint(CqlVarint::from_signed_bytes_be(b.to_signed_bytes_be())))
                    .map_err(|e| GatewayError::Bind(format!("{f} is not an integer: {e}"))),
                // i64::MAX as f64 rounds up to 2^63, hence the strict upper bound
                other if is_integral(*f) && *f >= i64::MIN as f64 && *f < i64::MAX as f64 => {
                    int_to_native(*f as i64, other)
                }
                other if is_integral(*f) => Err(GatewayError::Bind(format!(
                    "{f} is out of range for {other:?}"
                ))),
                other => Err(GatewayError::Bind(format!(
                    "cannot bind {f} to a {other:?} placeholder"
                ))),
            },
            Number::Big(s) => self.parse_number_for(s, hint),
        }
    }

    fn string_to_native(&self, s: &str, hint: Option<&ColumnType>) -> GatewayResult<CqlValue> {
        let Some(hint) = hint else {
            return Ok(self.coerce_untyped(s));
        };
        match hint {
            ColumnType::Text => Ok(CqlValue::Text(s.to_string())),
            ColumnType::Ascii => Ok(CqlValue::Ascii(s.to_string())),
            ColumnType::Uuid => Ok(CqlValue::Uuid(parse_uuid(s)?)),
            ColumnType::Timeuuid => Ok(CqlValue::Timeuuid(CqlTimeuuid::from(parse_uuid(s)?))),
            ColumnType::Timestamp => self
                .parse_timestamp(s)
                .or_else(|| s.trim().parse::<i64>().ok())
                .map(|ms| CqlValue::Timestamp(CqlTimestamp(ms)))
                .ok_or_else(|| GatewayError::Bind(format!("'{s}' is not a timestamp"))),
            ColumnType::Date => self
                .parse_date(s)
                .map(|d| CqlValue::Date(days_from_date(d)))
                .ok_or_else(|| GatewayError::Bind(format!("'{s}' is not a date"))),
            ColumnType::Time => parse_time(s)
                .map(CqlValue::Time)
                .ok_or_else(|| GatewayError::Bind(format!("'{s}' is not a time of day"))),
            ColumnType::Inet => s
                .trim()
                .parse::<IpAddr>()
                .map(CqlValue::Inet)
                .map_err(|e| GatewayError::Bind(format!("'{s}' is not an address: {e}"))),
            ColumnType::Boolean => match s.trim().to_ascii_lowercase().as_str() {
                "true" => Ok(CqlValue::Boolean(true)),
                "false" => Ok(CqlValue::Boolean(false)),
                _ => Err(GatewayError::Bind(format!("'{s}' is not a boolean"))),
            },
            ColumnType::Blob => B64
                .decode(s.as_bytes())
                .map(CqlValue::Blob)
                .map_err(|e| GatewayError::Bind(format!("blob is not base64: {e}"))),
            ColumnType::TinyInt
            | ColumnType::SmallInt
            | ColumnType::Int
            | ColumnType::BigInt
            | ColumnType::Counter
            | ColumnType::Float
            | ColumnType::Double
            | ColumnType::Varint
            | ColumnType::Decimal => self.parse_number_for(s, hint),
            other => Err(GatewayError::Bind(format!(
                "cannot bind a string to a {other:?} placeholder"
            ))),
        }
    }

    /// Run the coercion chain; the first attempt that parses wins, otherwise
    /// the string binds as text.
    pub fn coerce_untyped(&self, s: &str) -> CqlValue {
        for attempt in &self.coercion {
            match attempt {
                Coercion::Uuid => {
                    if let Ok(u) = Uuid::parse_str(s) {
                        return CqlValue::Uuid(u);
                    }
                }
                Coercion::Timestamp => {
                    if let Some(ms) = self.parse_timestamp(s) {
                        return CqlValue::Timestamp(CqlTimestamp(ms));
                    }
                }
            }
        }
        CqlValue::Text(s.to_string())
    }

    /// Parse with the configured pattern; a date-only pattern yields midnight UTC.
    pub fn parse_timestamp(&self, s: &str) -> Option<i64> {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, &self.date_format) {
            return Some(dt.and_utc().timestamp_millis());
        }
        NaiveDate::parse_from_str(s, &self.date_format)
            .ok()
            .map(|d| d.and_time(NaiveTime::MIN).and_utc().timestamp_millis())
    }

    fn parse_date(&self, s: &str) -> Option<NaiveDate> {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, &self.date_format) {
            return Some(dt.date());
        }
        NaiveDate::parse_from_str(s, &self.date_format)
            .or_else(|_| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d"))
            .ok()
    }

    fn parse_number_for(&self, s: &str, hint: &ColumnType) -> GatewayResult<CqlValue> {
        let t = s.trim();
        match hint {
            ColumnType::Varint => t
                .parse::<BigInt>()
                .map(|b| CqlValue::Varint(CqlVarint::from_signed_bytes_be(b.to_signed_bytes_be())))
                .map_err(|e| GatewayError::Bind(format!("'{s}' is not an integer: {e}"))),
            ColumnType::Decimal => decimal_from_text(t),
            ColumnType::Float => t
                .parse::<f32>()
                .map(CqlValue::Float)
                .map_err(|e| GatewayError::Bind(format!("'{s}' is not a float: {e}"))),
            ColumnType::Double => t
                .parse::<f64>()
                .map(CqlValue::Double)
                .map_err(|e| GatewayError::Bind(format!("'{s}' is not a double: {e}"))),
            ColumnType::Text => Ok(CqlValue::Text(s.to_string())),
            ColumnType::Ascii => Ok(CqlValue::Ascii(s.to_string())),
            other => {
                let i = t
                    .parse::<i64>()
                    .map_err(|e| GatewayError::Bind(format!("'{s}' is not an integer: {e}")))?;
                int_to_native(i, other)
            }
        }
    }
}

fn finite(column: &str, f: f64) -> Option<GenericValue> {
    if f.is_finite() {
        Some(GenericValue::float(f))
    } else {
        dropped(column, "non-finite floating point value")
    }
}

fn dropped(column: &str, reason: &str) -> Option<GenericValue> {
    warn!(%column, reason, "could not add value of column");
    None
}

fn mismatch(value: &GenericValue, hint: &ColumnType) -> GatewayError {
    GatewayError::Bind(format!(
        "cannot bind a {} to a {:?} placeholder",
        value.type_name(),
        hint
    ))
}

fn null_in_collection(at: &str) -> GatewayError {
    GatewayError::Bind(format!("collections cannot contain null (at '{at}')"))
}

fn int_to_native(i: i64, hint: &ColumnType) -> GatewayResult<CqlValue> {
    let out_of_range = |ty: &str| GatewayError::Bind(format!("{i} is out of range for {ty}"));
    Ok(match hint {
        ColumnType::BigInt => CqlValue::BigInt(i),
        ColumnType::Int => CqlValue::Int(i32::try_from(i).map_err(|_| out_of_range("int"))?),
        ColumnType::SmallInt => {
            CqlValue::SmallInt(i16::try_from(i).map_err(|_| out_of_range("smallint"))?)
        }
        ColumnType::TinyInt => {
            CqlValue::TinyInt(i8::try_from(i).map_err(|_| out_of_range("tinyint"))?)
        }
        ColumnType::Counter => CqlValue::Counter(Counter(i)),
        ColumnType::Double => CqlValue::Double(i as f64),
        ColumnType::Float => CqlValue::Float(i as f32),
        ColumnType::Varint => {
            CqlValue::Varint(CqlVarint::from_signed_bytes_be(BigInt::from(i).to_signed_bytes_be()))
        }
        ColumnType::Decimal => CqlValue::Decimal(CqlDecimal::from_signed_be_bytes_and_exponent(
            BigInt::from(i).to_signed_bytes_be(),
            0,
        )),
        ColumnType::Timestamp => CqlValue::Timestamp(CqlTimestamp(i)),
        ColumnType::Text => CqlValue::Text(i.to_string()),
        ColumnType::Ascii => CqlValue::Ascii(i.to_string()),
        other => {
            return Err(GatewayError::Bind(format!(
                "cannot bind a number to a {other:?} placeholder"
            )));
        }
    })
}

fn is_integral(f: f64) -> bool {
    f.is_finite() && f.fract() == 0.0
}

fn big_to_native(s: &str) -> GatewayResult<CqlValue> {
    match s.trim().parse::<BigInt>() {
        Ok(b) => Ok(CqlValue::Varint(CqlVarint::from_signed_bytes_be(b.to_signed_bytes_be()))),
        Err(_) => decimal_from_text(s),
    }
}

fn varint_to_generic(v: &CqlVarint) -> GenericValue {
    let big = BigInt::from_signed_bytes_be(v.as_signed_bytes_be_slice());
    match i64::try_from(&big) {
        Ok(i) => GenericValue::int(i),
        Err(_) => GenericValue::Number(Number::Big(big.to_string())),
    }
}

/// Exact decimal text of `unscaled * 10^-scale`.
pub(crate) fn decimal_text(unscaled: &BigInt, scale: i32) -> String {
    let raw = unscaled.to_string();
    let (sign, digits) = match raw.strip_prefix('-') {
        Some(d) => ("-", d.to_string()),
        None => ("", raw),
    };
    if scale <= 0 {
        let zeros = if digits == "0" { 0 } else { scale.unsigned_abs() as usize };
        return format!("{sign}{digits}{}", "0".repeat(zeros));
    }
    let scale = scale as usize;
    let padded = if digits.len() <= scale {
        format!("{}{}", "0".repeat(scale - digits.len() + 1), digits)
    } else {
        digits
    };
    let (int_part, frac_part) = padded.split_at(padded.len() - scale);
    format!("{sign}{int_part}.{frac_part}")
}

/// Parse `[-+]digits[.digits][e[-+]digits]` into `(unscaled, scale)`.
pub(crate) fn parse_decimal(text: &str) -> Option<(BigInt, i32)> {
    let t = text.trim();
    let (mantissa, exponent) = match t.find(['e', 'E']) {
        Some(pos) => (&t[..pos], t[pos + 1..].parse::<i32>().ok()?),
        None => (t, 0),
    };
    let (int_part, frac_part) = match mantissa.split_once('.') {
        Some((i, f)) => (i, f),
        None => (mantissa, ""),
    };
    if !frac_part.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let digits = format!("{int_part}{frac_part}");
    if digits.is_empty() || digits == "-" || digits == "+" {
        return None;
    }
    let unscaled = digits.parse::<BigInt>().ok()?;
    let scale = i32::try_from(frac_part.len()).ok()?.checked_sub(exponent)?;
    Some((unscaled, scale))
}

fn decimal_from_text(text: &str) -> GatewayResult<CqlValue> {
    let (unscaled, scale) =
        parse_decimal(text).ok_or_else(|| GatewayError::Bind(format!("'{text}' is not a decimal")))?;
    Ok(CqlValue::Decimal(CqlDecimal::from_signed_be_bytes_and_exponent(
        unscaled.to_signed_bytes_be(),
        scale,
    )))
}

fn parse_uuid(s: &str) -> GatewayResult<Uuid> {
    Uuid::parse_str(s.trim()).map_err(|e| GatewayError::Bind(format!("'{s}' is not a uuid: {e}")))
}

fn date_from_days(days: u32) -> Option<NaiveDate> {
    let offset = i64::from(days) - DATE_EPOCH_OFFSET;
    NaiveDate::from_ymd_opt(1970, 1, 1)?.checked_add_signed(chrono::Duration::try_days(offset)?)
}

fn days_from_date(date: NaiveDate) -> CqlDate {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or(NaiveDate::MIN);
    let offset = date.signed_duration_since(epoch).num_days();
    CqlDate((offset + DATE_EPOCH_OFFSET) as u32)
}

fn time_from_nanos(nanos: i64) -> Option<NaiveTime> {
    if nanos < 0 {
        return None;
    }
    let secs = u32::try_from(nanos / 1_000_000_000).ok()?;
    let frac = (nanos % 1_000_000_000) as u32;
    NaiveTime::from_num_seconds_from_midnight_opt(secs, frac)
}

fn parse_time(s: &str) -> Option<CqlTime> {
    let t = NaiveTime::parse_from_str(s.trim(), "%H:%M:%S%.f").ok()?;
    let nanos = i64::from(t.num_seconds_from_midnight()) * 1_000_000_000 + i64::from(t.nanosecond());
    Some(CqlTime(nanos))
}

/// CQL duration literal, e.g. `1mo2d3ns`.
fn duration_literal(d: &CqlDuration) -> String {
    let negative = d.months < 0 || d.days < 0 || d.nanoseconds < 0;
    let mut out = String::new();
    if negative {
        out.push('-');
    }
    if d.months != 0 {
        let _ = write!(out, "{}mo", d.months.unsigned_abs());
    }
    if d.days != 0 {
        let _ = write!(out, "{}d", d.days.unsigned_abs());
    }
    if d.nanoseconds != 0 {
        let _ = write!(out, "{}ns", d.nanoseconds.unsigned_abs());
    }
    if out.is_empty() || out == "-" {
        return "0s".to_string();
    }
    out
}
