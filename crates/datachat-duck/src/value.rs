//! DuckDB value to JSON conversion

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, SecondsFormat};
use duckdb::types::{TimeUnit, Value, ValueRef};
use serde_json::{Map, Number, Value as Json};

/// Convert a single DuckDB cell into JSON.
///
/// Numbers stay numbers (decimals are widened to `f64`), temporal types are
/// rendered as ISO-8601 strings, lists and arrays become JSON arrays, structs
/// and maps become JSON objects.
pub fn value_to_json(value: ValueRef<'_>) -> Json {
    match value {
        ValueRef::Text(s) => Json::String(String::from_utf8_lossy(s).to_string()),
        ValueRef::Blob(b) => Json::String(format!("<blob {} bytes>", b.len())),
        other => owned_to_json(Value::from(other)),
    }
}

/// Like [`value_to_json`], for `TIMESTAMP WITH TIME ZONE` columns: the
/// instant is rendered in UTC with an explicit `Z`.
pub fn timestamp_tz_to_json(value: ValueRef<'_>) -> Json {
    match value {
        ValueRef::Timestamp(unit, v) => DateTime::from_timestamp_micros(to_micros(unit, v))
            .map(|ts| Json::String(ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)))
            .unwrap_or(Json::Null),
        other => value_to_json(other),
    }
}

fn owned_to_json(value: Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Boolean(b) => Json::Bool(b),
        Value::TinyInt(i) => Json::from(i),
        Value::SmallInt(i) => Json::from(i),
        Value::Int(i) => Json::from(i),
        Value::BigInt(i) => Json::from(i),
        Value::HugeInt(i) => i64::try_from(i)
            .map(Json::from)
            .unwrap_or_else(|_| Json::String(i.to_string())),
        Value::UHugeInt(i) => u64::try_from(i)
            .map(Json::from)
            .unwrap_or_else(|_| Json::String(i.to_string())),
        Value::UTinyInt(i) => Json::from(i),
        Value::USmallInt(i) => Json::from(i),
        Value::UInt(i) => Json::from(i),
        Value::UBigInt(i) => Json::from(i),
        Value::Float(f) => float(f as f64),
        Value::Double(f) => float(f),
        Value::Decimal(d) => {
            let text = d.to_string();
            text.parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Json::Number)
                .unwrap_or(Json::String(text))
        }
        Value::Text(s) | Value::Enum(s) => Json::String(s),
        Value::Blob(b) => Json::String(format!("<blob {} bytes>", b.len())),
        Value::Geometry(b) => Json::String(format!("<geometry {} bytes>", b.len())),
        Value::Date32(days) => NaiveDate::from_ymd_opt(1970, 1, 1)
            .and_then(|epoch| epoch.checked_add_signed(Duration::days(days as i64)))
            .map(|d| Json::String(d.format("%Y-%m-%d").to_string()))
            .unwrap_or(Json::Null),
        Value::Timestamp(unit, v) => DateTime::from_timestamp_micros(to_micros(unit, v))
            .map(|ts| Json::String(ts.naive_utc().format("%Y-%m-%dT%H:%M:%S%.f").to_string()))
            .unwrap_or(Json::Null),
        Value::Time64(unit, v) => time_of_day(unit, v),
        Value::Interval { months, days, nanos } => Json::String(interval(months, days, nanos)),
        Value::List(items) | Value::Array(items) => {
            Json::Array(items.into_iter().map(owned_to_json).collect())
        }
        Value::Struct(fields) => Json::Object(
            fields
                .iter()
                .map(|(name, v)| (name.clone(), owned_to_json(v.clone())))
                .collect(),
        ),
        Value::Map(entries) => {
            let mut obj = Map::new();
            for (key, v) in entries.iter() {
                obj.insert(map_key(key.clone()), owned_to_json(v.clone()));
            }
            Json::Object(obj)
        }
        Value::Union(inner) => owned_to_json(*inner),
        other => Json::String(format!("{other:?}")),
    }
}

fn float(f: f64) -> Json {
    Number::from_f64(f).map(Json::Number).unwrap_or(Json::Null)
}

/// JSON object keys are strings; non-text map keys use their JSON rendering.
fn map_key(key: Value) -> String {
    match owned_to_json(key) {
        Json::String(s) => s,
        other => other.to_string(),
    }
}

fn to_micros(unit: TimeUnit, v: i64) -> i64 {
    match unit {
        TimeUnit::Second => v.saturating_mul(1_000_000),
        TimeUnit::Millisecond => v.saturating_mul(1_000),
        TimeUnit::Microsecond => v,
        TimeUnit::Nanosecond => v / 1_000,
    }
}

fn time_of_day(unit: TimeUnit, v: i64) -> Json {
    let nanos = match unit {
        TimeUnit::Second => v.saturating_mul(1_000_000_000),
        TimeUnit::Millisecond => v.saturating_mul(1_000_000),
        TimeUnit::Microsecond => v.saturating_mul(1_000),
        TimeUnit::Nanosecond => v,
    };
    let secs = u32::try_from(nanos.div_euclid(1_000_000_000)).ok();
    let frac = nanos.rem_euclid(1_000_000_000) as u32;

    secs.and_then(|secs| NaiveTime::from_num_seconds_from_midnight_opt(secs, frac))
        .map(|t| Json::String(t.format("%H:%M:%S%.f").to_string()))
        .unwrap_or(Json::Null)
}

/// ISO-8601 duration, e.g. `P1M2DT3.5S`; `PT0S` when empty.
fn interval(months: i32, days: i32, nanos: i64) -> String {
    let mut out = String::from("P");
    if months != 0 {
        out.push_str(&format!("{months}M"));
    }
    if days != 0 {
        out.push_str(&format!("{days}D"));
    }
    if nanos != 0 {
        let sign = if nanos < 0 { "-" } else { "" };
        let abs = nanos.unsigned_abs();
        let (secs, frac) = (abs / 1_000_000_000, abs % 1_000_000_000);
        if frac == 0 {
            out.push_str(&format!("T{sign}{secs}S"));
        } else {
            let frac = format!("{frac:09}");
            out.push_str(&format!("T{sign}{secs}.{}S", frac.trim_end_matches('0')));
        }
    }

    if out == "P" {
        out.push_str("T0S");
    }
    out
}
