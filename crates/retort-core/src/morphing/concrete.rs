//! Scalar and date/time providers
//!
//! Under strict coercion a scalar loader accepts only its own category
//! (`int` refuses `bool`, `float` takes `int` and `float`). Without strict
//! coercion the loaders convert the way a dynamic language would: numeric
//! strings become numbers, numbers become strings and so on. Dumpers of
//! plain scalars return the value unchanged.

use crate::morphing::{DumpError, Dumper, DumperRequest, LoadError, LoadErrorKind, Loader, LoaderRequest};
use crate::provider::{Mediator, ProvideError, ProvideResult, Provider};
use crate::types::{Origin, Prim};
use crate::value::Value;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone, Utc};

/// Skip unless the requested type is one of `prims`
fn match_prim(mediator: &Mediator<'_>, ty: &crate::types::TypeExpr, prims: &[Prim]) -> ProvideResult<Prim> {
    match mediator.normalize(ty)?.origin() {
        Origin::Prim(prim) if prims.contains(prim) => Ok(*prim),
        _ => Err(ProvideError::skip()),
    }
}

fn match_origin(mediator: &Mediator<'_>, ty: &crate::types::TypeExpr, expected: &Origin) -> ProvideResult<()> {
    if mediator.normalize(ty)?.origin() == expected {
        Ok(())
    } else {
        Err(ProvideError::skip())
    }
}

/// `Any` passes values through both ways
#[derive(Debug, Clone, Default)]
pub struct AnyProvider;

impl Provider for AnyProvider {
    fn provide_loader(&self, mediator: &Mediator<'_>, request: &LoaderRequest) -> ProvideResult<Loader> {
        match_origin(mediator, request.last_type(), &Origin::Any)?;
        Ok(Loader::as_is())
    }

    fn provide_dumper(&self, mediator: &Mediator<'_>, request: &DumperRequest) -> ProvideResult<Dumper> {
        match_origin(mediator, request.last_type(), &Origin::Any)?;
        Ok(Dumper::as_is())
    }
}

#[derive(Debug, Clone, Default)]
pub struct NoneProvider;

impl Provider for NoneProvider {
    fn provide_loader(&self, mediator: &Mediator<'_>, request: &LoaderRequest) -> ProvideResult<Loader> {
        match_origin(mediator, request.last_type(), &Origin::None)?;
        Ok(Loader::new(|data| match data {
            Value::None => Ok(Value::None),
            other => Err(LoadError::type_error("None", other)),
        }))
    }

    fn provide_dumper(&self, mediator: &Mediator<'_>, request: &DumperRequest) -> ProvideResult<Dumper> {
        match_origin(mediator, request.last_type(), &Origin::None)?;
        Ok(Dumper::as_is())
    }
}

#[derive(Debug, Clone, Default)]
pub struct IntProvider;

fn int_strict(data: &Value) -> Result<Value, LoadError> {
    match data {
        Value::Int(_) => Ok(data.clone()),
        other => Err(LoadError::type_error("int", other)),
    }
}

fn int_lax(data: &Value) -> Result<Value, LoadError> {
    match data {
        Value::Int(_) => Ok(data.clone()),
        Value::Bool(b) => Ok(Value::Int(i64::from(*b))),
        Value::Float(f) if f.is_finite() && f.abs() < i64::MAX as f64 => Ok(Value::Int(f.trunc() as i64)),
        Value::Float(_) => Err(LoadError::value_error("Float cannot be represented as int", data)),
        Value::Str(s) => s
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| LoadError::value_error("Bad string format", data)),
        other => Err(LoadError::type_error("int", other)),
    }
}

impl Provider for IntProvider {
    fn provide_loader(&self, mediator: &Mediator<'_>, request: &LoaderRequest) -> ProvideResult<Loader> {
        match_prim(mediator, request.last_type(), &[Prim::Int])?;
        Ok(if request.strict_coercion {
            Loader::new(int_strict)
        } else {
            Loader::new(int_lax)
        })
    }

    fn provide_dumper(&self, mediator: &Mediator<'_>, request: &DumperRequest) -> ProvideResult<Dumper> {
        match_prim(mediator, request.last_type(), &[Prim::Int])?;
        Ok(Dumper::as_is())
    }
}

#[derive(Debug, Clone, Default)]
pub struct FloatProvider;

fn float_strict(data: &Value) -> Result<Value, LoadError> {
    match data {
        Value::Float(_) => Ok(data.clone()),
        Value::Int(i) => Ok(Value::Float(*i as f64)),
        other => Err(LoadError::type_error("float", other)),
    }
}

fn float_lax(data: &Value) -> Result<Value, LoadError> {
    match data {
        Value::Bool(b) => Ok(Value::Float(if *b { 1.0 } else { 0.0 })),
        Value::Str(s) => s
            .trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| LoadError::value_error("Bad string format", data)),
        other => float_strict(other),
    }
}

impl Provider for FloatProvider {
    fn provide_loader(&self, mediator: &Mediator<'_>, request: &LoaderRequest) -> ProvideResult<Loader> {
        match_prim(mediator, request.last_type(), &[Prim::Float])?;
        Ok(if request.strict_coercion {
            Loader::new(float_strict)
        } else {
            Loader::new(float_lax)
        })
    }

    fn provide_dumper(&self, mediator: &Mediator<'_>, request: &DumperRequest) -> ProvideResult<Dumper> {
        match_prim(mediator, request.last_type(), &[Prim::Float])?;
        Ok(Dumper::as_is())
    }
}

#[derive(Debug, Clone, Default)]
pub struct StrProvider;

fn str_lax(data: &Value) -> Result<Value, LoadError> {
    match data {
        Value::Str(_) => Ok(data.clone()),
        Value::Int(_) | Value::Float(_) | Value::Bool(_) => Ok(Value::Str(data.to_string())),
        other => Err(LoadError::type_error("str", other)),
    }
}

impl Provider for StrProvider {
    fn provide_loader(&self, mediator: &Mediator<'_>, request: &LoaderRequest) -> ProvideResult<Loader> {
        match_prim(mediator, request.last_type(), &[Prim::Str])?;
        if request.strict_coercion {
            Ok(Loader::new(|data| match data {
                Value::Str(_) => Ok(data.clone()),
                other => Err(LoadError::type_error("str", other)),
            }))
        } else {
            Ok(Loader::new(str_lax))
        }
    }

    fn provide_dumper(&self, mediator: &Mediator<'_>, request: &DumperRequest) -> ProvideResult<Dumper> {
        match_prim(mediator, request.last_type(), &[Prim::Str])?;
        Ok(Dumper::as_is())
    }
}

#[derive(Debug, Clone, Default)]
pub struct BoolProvider;

fn bool_lax(data: &Value) -> Result<Value, LoadError> {
    match data {
        Value::Bool(_) => Ok(data.clone()),
        Value::Int(i) => Ok(Value::Bool(*i != 0)),
        Value::Str(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(Value::Bool(true)),
            "false" | "0" => Ok(Value::Bool(false)),
            _ => Err(LoadError::value_error("Bad string format", data)),
        },
        other => Err(LoadError::type_error("bool", other)),
    }
}

impl Provider for BoolProvider {
    fn provide_loader(&self, mediator: &Mediator<'_>, request: &LoaderRequest) -> ProvideResult<Loader> {
        match_prim(mediator, request.last_type(), &[Prim::Bool])?;
        if request.strict_coercion {
            Ok(Loader::new(|data| match data {
                Value::Bool(_) => Ok(data.clone()),
                other => Err(LoadError::type_error("bool", other)),
            }))
        } else {
            Ok(Loader::new(bool_lax))
        }
    }

    fn provide_dumper(&self, mediator: &Mediator<'_>, request: &DumperRequest) -> ProvideResult<Dumper> {
        match_prim(mediator, request.last_type(), &[Prim::Bool])?;
        Ok(Dumper::as_is())
    }
}

/// `bytes` and `bytearray` as base64 strings
#[derive(Debug, Clone, Default)]
pub struct BytesBase64Provider;

impl Provider for BytesBase64Provider {
    fn provide_loader(&self, mediator: &Mediator<'_>, request: &LoaderRequest) -> ProvideResult<Loader> {
        match_prim(mediator, request.last_type(), &[Prim::Bytes, Prim::ByteArray])?;
        Ok(Loader::new(|data| match data {
            Value::Str(encoded) => STANDARD
                .decode(encoded)
                .map(Value::Bytes)
                .map_err(|_| LoadError::value_error("Bad base64 string", data)),
            other => Err(LoadError::type_error("str", other)),
        }))
    }

    fn provide_dumper(&self, mediator: &Mediator<'_>, request: &DumperRequest) -> ProvideResult<Dumper> {
        match_prim(mediator, request.last_type(), &[Prim::Bytes, Prim::ByteArray])?;
        Ok(Dumper::new(|value| match value {
            Value::Bytes(bytes) => Ok(Value::Str(STANDARD.encode(bytes))),
            other => Err(DumpError::type_error("bytes", other.type_name())),
        }))
    }
}

const NAIVE_DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

pub(crate) fn parse_iso_datetime(s: &str) -> Option<Value> {
    if let Ok(aware) = DateTime::parse_from_rfc3339(s) {
        return Some(Value::DateTime(aware));
    }
    if let Some(utc) = s.strip_suffix('Z').or_else(|| s.strip_suffix('z')) {
        return parse_iso_datetime(&format!("{}+00:00", utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%:z"] {
        if let Ok(aware) = DateTime::parse_from_str(s, format) {
            return Some(Value::DateTime(aware));
        }
    }
    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(Value::NaiveDateTime(naive));
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(Value::NaiveDateTime)
}

pub(crate) fn format_naive_datetime(dt: &NaiveDateTime) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string()
}

/// `datetime` as ISO 8601 strings, aware when the input carries an offset
#[derive(Debug, Clone, Default)]
pub struct DatetimeIsoProvider;

impl Provider for DatetimeIsoProvider {
    fn provide_loader(&self, mediator: &Mediator<'_>, request: &LoaderRequest) -> ProvideResult<Loader> {
        match_prim(mediator, request.last_type(), &[Prim::DateTime])?;
        Ok(Loader::new(|data| match data {
            Value::Str(s) => {
                parse_iso_datetime(s).ok_or_else(|| LoadError::value_error("Invalid isoformat string", data))
            }
            other => Err(LoadError::type_error("str", other)),
        }))
    }

    fn provide_dumper(&self, mediator: &Mediator<'_>, request: &DumperRequest) -> ProvideResult<Dumper> {
        match_prim(mediator, request.last_type(), &[Prim::DateTime])?;
        Ok(Dumper::new(|value| match value {
            Value::DateTime(dt) => Ok(Value::Str(dt.to_rfc3339())),
            Value::NaiveDateTime(dt) => Ok(Value::Str(format_naive_datetime(dt))),
            other => Err(DumpError::type_error("datetime", other.type_name())),
        }))
    }
}

#[derive(Debug, Clone, Default)]
pub struct DateProvider;

impl Provider for DateProvider {
    fn provide_loader(&self, mediator: &Mediator<'_>, request: &LoaderRequest) -> ProvideResult<Loader> {
        match_prim(mediator, request.last_type(), &[Prim::Date])?;
        Ok(Loader::new(|data| match data {
            Value::Str(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map(Value::Date)
                .map_err(|_| LoadError::value_error("Invalid isoformat string", data)),
            other => Err(LoadError::type_error("str", other)),
        }))
    }

    fn provide_dumper(&self, mediator: &Mediator<'_>, request: &DumperRequest) -> ProvideResult<Dumper> {
        match_prim(mediator, request.last_type(), &[Prim::Date])?;
        Ok(Dumper::new(|value| match value {
            Value::Date(date) => Ok(Value::Str(date.format("%Y-%m-%d").to_string())),
            other => Err(DumpError::type_error("date", other.type_name())),
        }))
    }
}

#[derive(Debug, Clone, Default)]
pub struct TimeProvider;

impl Provider for TimeProvider {
    fn provide_loader(&self, mediator: &Mediator<'_>, request: &LoaderRequest) -> ProvideResult<Loader> {
        match_prim(mediator, request.last_type(), &[Prim::Time])?;
        Ok(Loader::new(|data| match data {
            Value::Str(s) => NaiveTime::parse_from_str(s, "%H:%M:%S%.f")
                .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
                .map(Value::Time)
                .map_err(|_| LoadError::value_error("Invalid isoformat string", data)),
            other => Err(LoadError::type_error("str", other)),
        }))
    }

    fn provide_dumper(&self, mediator: &Mediator<'_>, request: &DumperRequest) -> ProvideResult<Dumper> {
        match_prim(mediator, request.last_type(), &[Prim::Time])?;
        Ok(Dumper::new(|value| match value {
            Value::Time(time) => Ok(Value::Str(time.format("%H:%M:%S%.f").to_string())),
            other => Err(DumpError::type_error("time", other.type_name())),
        }))
    }
}

/// `datetime` through an explicit `strftime`-style format
#[derive(Debug, Clone)]
pub struct DatetimeFormatProvider {
    format: String,
}

impl DatetimeFormatProvider {
    pub fn new(format: impl Into<String>) -> Self {
        DatetimeFormatProvider { format: format.into() }
    }
}

impl Provider for DatetimeFormatProvider {
    fn provide_loader(&self, mediator: &Mediator<'_>, request: &LoaderRequest) -> ProvideResult<Loader> {
        match_prim(mediator, request.last_type(), &[Prim::DateTime])?;
        let format = self.format.clone();
        Ok(Loader::new(move |data| {
            let Value::Str(s) = data else {
                return Err(LoadError::type_error("str", data));
            };
            DateTime::parse_from_str(s, &format)
                .map(Value::DateTime)
                .or_else(|_| NaiveDateTime::parse_from_str(s, &format).map(Value::NaiveDateTime))
                .map_err(|_| {
                    LoadError::new(LoadErrorKind::FormatMismatch {
                        format: format.clone(),
                        input_value: data.clone(),
                    })
                })
        }))
    }

    fn provide_dumper(&self, mediator: &Mediator<'_>, request: &DumperRequest) -> ProvideResult<Dumper> {
        match_prim(mediator, request.last_type(), &[Prim::DateTime])?;
        let format = self.format.clone();
        Ok(Dumper::new(move |value| match value {
            Value::DateTime(dt) => Ok(Value::Str(dt.format(&format).to_string())),
            Value::NaiveDateTime(dt) => Ok(Value::Str(dt.format(&format).to_string())),
            other => Err(DumpError::type_error("datetime", other.type_name())),
        }))
    }
}

/// `datetime` as a UNIX timestamp, loaded in a fixed time zone
#[derive(Debug, Clone)]
pub struct DatetimeTimestampProvider {
    tz: FixedOffset,
}

impl Default for DatetimeTimestampProvider {
    fn default() -> Self {
        DatetimeTimestampProvider { tz: Utc.fix() }
    }
}

impl DatetimeTimestampProvider {
    pub fn new(tz: FixedOffset) -> Self {
        DatetimeTimestampProvider { tz }
    }
}

fn timestamp_to_datetime(tz: FixedOffset, data: &Value) -> Result<Value, LoadError> {
    let (secs, nanos) = match data {
        Value::Int(secs) => (*secs, 0),
        Value::Float(ts) if ts.is_finite() => {
            let secs = ts.floor();
            (secs as i64, ((ts - secs) * 1e9).round().min(999_999_999.0) as u32)
        }
        Value::Float(_) => return Err(LoadError::value_error("Timestamp is not a finite number", data)),
        other => return Err(LoadError::type_error("int or float", other)),
    };
    DateTime::from_timestamp(secs, nanos)
        .map(|utc| Value::DateTime(utc.with_timezone(&tz)))
        .ok_or_else(|| {
            LoadError::new(LoadErrorKind::OutOfRange {
                min: None,
                max: None,
                input_value: data.clone(),
            })
        })
}

impl Provider for DatetimeTimestampProvider {
    fn provide_loader(&self, mediator: &Mediator<'_>, request: &LoaderRequest) -> ProvideResult<Loader> {
        match_prim(mediator, request.last_type(), &[Prim::DateTime])?;
        let tz = self.tz;
        Ok(Loader::new(move |data| timestamp_to_datetime(tz, data)))
    }

    fn provide_dumper(&self, mediator: &Mediator<'_>, request: &DumperRequest) -> ProvideResult<Dumper> {
        match_prim(mediator, request.last_type(), &[Prim::DateTime])?;
        let tz = self.tz;
        Ok(Dumper::new(move |value| {
            let utc = match value {
                Value::DateTime(dt) => dt.with_timezone(&Utc),
                Value::NaiveDateTime(dt) => match tz.from_local_datetime(dt).single() {
                    Some(local) => local.with_timezone(&Utc),
                    None => return Err(DumpError::msg(format!("ambiguous local time {}", dt))),
                },
                other => return Err(DumpError::type_error("datetime", other.type_name())),
            };
            let ts = utc.timestamp() as f64 + f64::from(utc.timestamp_subsec_nanos()) / 1e9;
            Ok(Value::Float(ts))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::LocStack;
    use crate::morphing::DebugTrail;
    use crate::provider::Recipe;
    use crate::types::{Namespace, TypeExpr};
    use std::sync::Arc;

    fn recipe() -> Recipe {
        vec![
            Arc::new(IntProvider),
            Arc::new(FloatProvider),
            Arc::new(StrProvider),
            Arc::new(BoolProvider),
            Arc::new(BytesBase64Provider),
            Arc::new(DatetimeIsoProvider),
            Arc::new(DateProvider),
            Arc::new(TimeProvider),
        ]
    }

    fn load(ty: TypeExpr, strict: bool, data: Value) -> Result<Value, LoadError> {
        let recipe = recipe();
        let ns = Namespace::new();
        let mediator = Mediator::new(&recipe, &ns);
        let loader = mediator
            .provide(&LoaderRequest::new(LocStack::from_type(ty), strict, DebugTrail::All))
            .unwrap();
        loader.call(&data)
    }

    fn dump(ty: TypeExpr, value: Value) -> Result<Value, DumpError> {
        let recipe = recipe();
        let ns = Namespace::new();
        let mediator = Mediator::new(&recipe, &ns);
        let dumper = mediator
            .provide(&DumperRequest::new(LocStack::from_type(ty), DebugTrail::All))
            .unwrap();
        dumper.call(&value)
    }

    #[test]
    fn test_strict_int_rejects_bool() {
        let err = load(TypeExpr::int(), true, Value::Bool(true)).unwrap_err();
        assert!(matches!(err.kind, LoadErrorKind::Type { ref expected, .. } if expected == "int"));
        assert_eq!(load(TypeExpr::int(), true, Value::Int(3)).unwrap(), Value::Int(3));
    }

    #[test]
    fn test_lax_int() {
        assert_eq!(load(TypeExpr::int(), false, Value::str("12")).unwrap(), Value::Int(12));
        assert_eq!(load(TypeExpr::int(), false, Value::Float(3.7)).unwrap(), Value::Int(3));
        assert_eq!(load(TypeExpr::int(), false, Value::Bool(true)).unwrap(), Value::Int(1));
        let err = load(TypeExpr::int(), false, Value::str("x")).unwrap_err();
        assert!(matches!(err.kind, LoadErrorKind::Value { .. }));
    }

    #[test]
    fn test_float_accepts_int() {
        assert_eq!(load(TypeExpr::float(), true, Value::Int(2)).unwrap(), Value::Float(2.0));
        assert!(load(TypeExpr::float(), true, Value::str("2.5")).is_err());
        assert_eq!(load(TypeExpr::float(), false, Value::str("2.5")).unwrap(), Value::Float(2.5));
    }

    #[test]
    fn test_str_coercion() {
        assert!(load(TypeExpr::str(), true, Value::Int(1)).is_err());
        assert_eq!(load(TypeExpr::str(), false, Value::Int(1)).unwrap(), Value::str("1"));
    }

    #[test]
    fn test_bool_coercion() {
        assert!(load(TypeExpr::bool(), true, Value::Int(1)).is_err());
        assert_eq!(load(TypeExpr::bool(), false, Value::str("False")).unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_bytes_base64() {
        let loaded = load(TypeExpr::bytes(), true, Value::str("aGVsbG8=")).unwrap();
        assert_eq!(loaded, Value::Bytes(b"hello".to_vec()));
        assert_eq!(dump(TypeExpr::bytes(), loaded).unwrap(), Value::str("aGVsbG8="));
        assert!(load(TypeExpr::bytes(), true, Value::str("***")).is_err());
    }

    #[test]
    fn test_datetime_iso_round_trip() {
        for text in ["2023-05-14T00:06:33+00:00", "2023-05-20T15:58:23", "2023-05-20T15:58:23.250000"] {
            let loaded = load(TypeExpr::datetime(), true, Value::str(text)).unwrap();
            assert_eq!(dump(TypeExpr::datetime(), loaded).unwrap(), Value::str(text.replace("250000", "250")));
        }
        let aware = load(TypeExpr::datetime(), true, Value::str("2023-05-14T00:06:33Z")).unwrap();
        assert!(matches!(aware, Value::DateTime(_)));
    }

    #[test]
    fn test_datetime_rejects_garbage() {
        let err = load(TypeExpr::datetime(), true, Value::str("yesterday")).unwrap_err();
        assert!(matches!(err.kind, LoadErrorKind::Value { .. }));
        let err = load(TypeExpr::datetime(), true, Value::Int(5)).unwrap_err();
        assert!(matches!(err.kind, LoadErrorKind::Type { .. }));
    }

    #[test]
    fn test_date_and_time() {
        let date = load(TypeExpr::date(), true, Value::str("2024-02-29")).unwrap();
        assert_eq!(dump(TypeExpr::date(), date).unwrap(), Value::str("2024-02-29"));
        let time = load(TypeExpr::time(), true, Value::str("12:30")).unwrap();
        assert_eq!(dump(TypeExpr::time(), time).unwrap(), Value::str("12:30:00"));
    }

    #[test]
    fn test_datetime_by_format() {
        let recipe: Recipe = vec![Arc::new(DatetimeFormatProvider::new("%d.%m.%Y %H:%M"))];
        let ns = Namespace::new();
        let mediator = Mediator::new(&recipe, &ns);
        let request = LoaderRequest::new(LocStack::from_type(TypeExpr::datetime()), true, DebugTrail::All);
        let loader = mediator.provide(&request).unwrap();
        let loaded = loader.call(&Value::str("14.05.2023 10:20")).unwrap();
        assert!(matches!(loaded, Value::NaiveDateTime(_)));
        let err = loader.call(&Value::str("2023-05-14")).unwrap_err();
        assert!(matches!(err.kind, LoadErrorKind::FormatMismatch { .. }));

        let dumper = mediator
            .provide(&DumperRequest::new(LocStack::from_type(TypeExpr::datetime()), DebugTrail::All))
            .unwrap();
        assert_eq!(dumper.call(&loaded).unwrap(), Value::str("14.05.2023 10:20"));
    }

    #[test]
    fn test_datetime_by_timestamp() {
        let provider = DatetimeTimestampProvider::default();
        let loaded = timestamp_to_datetime(provider.tz, &Value::Int(1_684_022_793)).unwrap();
        let Value::DateTime(dt) = &loaded else {
            panic!("expected aware datetime");
        };
        assert_eq!(dt.to_rfc3339(), "2023-05-14T00:06:33+00:00");
        assert!(timestamp_to_datetime(provider.tz, &Value::str("1")).is_err());
    }
}
