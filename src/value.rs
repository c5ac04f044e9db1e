//! `Value`, `StringValue` and `AttributeItem` — the leaf grammar of a
//! `LogicalExpression`. Pure data; see `eval` and `simplify` for semantics.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::error::LoadError;
use crate::fragment::FragmentPath;

/// `{CLAIM: name} | {GLOBAL: token} | {REFERENCE: name}`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum AttributeItem {
	Claim(String),
	Global(GlobalToken),
	Reference(String),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum GlobalToken {
	LocalNow,
	UtcNow,
	ClientNow,
	Anonymous,
}

impl GlobalToken {
	pub fn as_str(self) -> &'static str {
		match self {
			GlobalToken::LocalNow => "LOCALNOW",
			GlobalToken::UtcNow => "UTCNOW",
			GlobalToken::ClientNow => "CLIENTNOW",
			GlobalToken::Anonymous => "ANONYMOUS",
		}
	}

	fn parse(s: &str) -> Result<Self, LoadError> {
		match s {
			"LOCALNOW" => Ok(GlobalToken::LocalNow),
			"UTCNOW" => Ok(GlobalToken::UtcNow),
			"CLIENTNOW" => Ok(GlobalToken::ClientNow),
			"ANONYMOUS" => Ok(GlobalToken::Anonymous),
			other => Err(LoadError::InvalidAttributeItem(format!(
				"unknown GLOBAL token {other}"
			))),
		}
	}
}

impl AttributeItem {
	pub fn from_json(v: &Json) -> Result<Self, LoadError> {
		let obj = v.as_object().ok_or_else(|| {
			LoadError::InvalidAttributeItem("attribute item must be an object".to_string())
		})?;
		if obj.len() != 1 {
			return Err(LoadError::InvalidAttributeItem(
				"attribute item must have exactly one of CLAIM|GLOBAL|REFERENCE".to_string(),
			));
		}
		let (key, val) = obj.iter().next().expect("len checked above");
		let s = val.as_str().ok_or_else(|| {
			LoadError::InvalidAttributeItem(format!("{key} value must be a string"))
		})?;
		match key.as_str() {
			"CLAIM" => Ok(AttributeItem::Claim(s.to_string())),
			"GLOBAL" => Ok(AttributeItem::Global(GlobalToken::parse(s)?)),
			"REFERENCE" => Ok(AttributeItem::Reference(s.to_string())),
			other => Err(LoadError::InvalidAttributeItem(format!(
				"unknown attribute item key {other}"
			))),
		}
	}

	pub fn to_json(&self) -> Json {
		match self {
			AttributeItem::Claim(name) => serde_json::json!({ "CLAIM": name }),
			AttributeItem::Global(token) => serde_json::json!({ "GLOBAL": token.as_str() }),
			AttributeItem::Reference(name) => serde_json::json!({ "REFERENCE": name }),
		}
	}
}

impl<'de> Deserialize<'de> for AttributeItem {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: serde::Deserializer<'de>,
	{
		let v = Json::deserialize(deserializer)?;
		AttributeItem::from_json(&v).map_err(serde::de::Error::custom)
	}
}

impl Serialize for AttributeItem {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: serde::Serializer,
	{
		self.to_json().serialize(serializer)
	}
}

/// Cast kinds wrapping an inner `Value`, forcing interpretation as a target
/// type: `$strCast | $numCast | $boolCast | $timeCast | $dateTimeCast | $hexCast`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CastKind {
	Str,
	Num,
	Bool,
	Time,
	DateTime,
	Hex,
}

impl CastKind {
	fn wire_key(self) -> &'static str {
		match self {
			CastKind::Str => "$strCast",
			CastKind::Num => "$numCast",
			CastKind::Bool => "$boolCast",
			CastKind::Time => "$timeCast",
			CastKind::DateTime => "$dateTimeCast",
			CastKind::Hex => "$hexCast",
		}
	}
}

/// One of the four date components a `$year`/`$month`/`$dayOfMonth`/`$dayOfWeek`
/// literal carries.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DateComponent {
	Year(i32),
	Month(u32),
	DayOfMonth(u32),
	DayOfWeek(u32),
}

/// Time-of-day, validated on parse: hours 0-23, minutes/seconds 0-59.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct TimeOfDay {
	seconds_of_day: u32,
}

impl TimeOfDay {
	pub fn from_hms(h: u32, m: u32, s: u32) -> Result<Self, LoadError> {
		if h > 23 || m > 59 || s > 59 {
			return Err(LoadError::InvalidTime(format!("{h:02}:{m:02}:{s:02}")));
		}
		Ok(TimeOfDay {
			seconds_of_day: h * 3600 + m * 60 + s,
		})
	}

	pub fn from_seconds_of_day(seconds: u32) -> Self {
		TimeOfDay {
			seconds_of_day: seconds % 86400,
		}
	}

	pub fn seconds_of_day(self) -> u32 {
		self.seconds_of_day
	}

	pub fn parse(s: &str) -> Result<Self, LoadError> {
		let parts: Vec<&str> = s.split(':').collect();
		let bad = || LoadError::InvalidTime(s.to_string());
		match parts.as_slice() {
			[h, m] => {
				let h: u32 = h.parse().map_err(|_| bad())?;
				let m: u32 = m.parse().map_err(|_| bad())?;
				Self::from_hms(h, m, 0)
			},
			[h, m, s] => {
				let h: u32 = h.parse().map_err(|_| bad())?;
				let m: u32 = m.parse().map_err(|_| bad())?;
				let s: u32 = s.parse().map_err(|_| bad())?;
				Self::from_hms(h, m, s)
			},
			_ => Err(bad()),
		}
	}
}

impl fmt::Display for TimeOfDay {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let h = self.seconds_of_day / 3600;
		let m = (self.seconds_of_day % 3600) / 60;
		let s = self.seconds_of_day % 60;
		write!(f, "{h:02}:{m:02}:{s:02}")
	}
}

/// A hex literal, normalized to its shortest uppercase `16#[0-9A-F]+` form.
/// Ordering compares by arbitrary-precision unsigned integer value, which
/// for a leading-zero-stripped equal-radix digit string is just (length,
/// then lexicographic) comparison.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct HexValue {
	digits: String,
}

impl HexValue {
	pub fn parse(s: &str) -> Result<Self, LoadError> {
		let rest = s
			.strip_prefix("16#")
			.ok_or_else(|| LoadError::InvalidHex(s.to_string()))?;
		if rest.is_empty() || !rest.chars().all(|c| c.is_ascii_hexdigit()) {
			return Err(LoadError::InvalidHex(s.to_string()));
		}
		Ok(Self::from_digits(rest))
	}

	pub fn from_digits(digits: &str) -> Self {
		let upper = digits.to_ascii_uppercase();
		let trimmed = upper.trim_start_matches('0');
		let normalized = if trimmed.is_empty() { "0" } else { trimmed };
		HexValue {
			digits: normalized.to_string(),
		}
	}

	pub fn digits(&self) -> &str {
		&self.digits
	}

	pub fn as_f64(&self) -> f64 {
		u128::from_str_radix(&self.digits, 16)
			.map(|v| v as f64)
			.unwrap_or(f64::INFINITY)
	}
}

impl fmt::Display for HexValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "16#{}", self.digits)
	}
}

impl PartialOrd for HexValue {
	fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
		Some(self.cmp(other))
	}
}

impl Ord for HexValue {
	fn cmp(&self, other: &Self) -> std::cmp::Ordering {
		self
			.digits
			.len()
			.cmp(&other.digits.len())
			.then_with(|| self.digits.cmp(&other.digits))
	}
}

/// The full `Value` union. Exactly one variant is populated by construction.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
	Str(String),
	Num(f64),
	Bool(bool),
	DateTime(chrono::DateTime<chrono::Utc>),
	Time(TimeOfDay),
	DateComponent(DateComponent),
	Hex(HexValue),
	/// An opaque model-field reference, e.g. `$sm#id`.
	Field(String),
	Attribute(AttributeItem),
	Cast(CastKind, Box<Value>),
}

impl Value {
	/// True if this value is a literal: not a field, not an attribute, and
	/// not a cast wrapping a field.
	pub fn is_literal(&self) -> bool {
		!self.contains_field()
	}

	pub fn contains_field(&self) -> bool {
		match self {
			Value::Field(_) => true,
			Value::Cast(_, inner) => inner.contains_field(),
			_ => false,
		}
	}

	pub fn from_json(v: &Json) -> Result<Self, LoadError> {
		let obj = v
			.as_object()
			.ok_or_else(|| LoadError::InvalidValue("value must be an object".to_string()))?;
		if obj.len() != 1 {
			return Err(LoadError::InvalidValue(
				"value must have exactly one $-key".to_string(),
			));
		}
		let (key, val) = obj.iter().next().expect("len checked above");
		match key.as_str() {
			"$strVal" => Ok(Value::Str(expect_str(val)?)),
			"$numVal" => Ok(Value::Num(expect_num(val)?)),
			"$boolean" => Ok(Value::Bool(expect_bool(val)?)),
			"$dateTimeVal" => {
				let s = expect_str(val)?;
				let dt = chrono::DateTime::parse_from_rfc3339(&s)
					.map_err(|_| LoadError::InvalidDateTime(s.clone()))?;
				Ok(Value::DateTime(dt.with_timezone(&chrono::Utc)))
			},
			"$timeVal" => Ok(Value::Time(TimeOfDay::parse(&expect_str(val)?)?)),
			"$hexVal" => Ok(Value::Hex(HexValue::parse(&expect_str(val)?)?)),
			"$year" => Ok(Value::DateComponent(DateComponent::Year(
				expect_num(val)? as i32,
			))),
			"$month" => Ok(Value::DateComponent(DateComponent::Month(
				expect_num(val)? as u32,
			))),
			"$dayOfMonth" => Ok(Value::DateComponent(DateComponent::DayOfMonth(
				expect_num(val)? as u32,
			))),
			"$dayOfWeek" => Ok(Value::DateComponent(DateComponent::DayOfWeek(
				expect_num(val)? as u32,
			))),
			"$field" => {
				let s = expect_str(val)?;
				FragmentPath::parse(&s).map_err(|_| LoadError::InvalidField(s.clone()))?;
				Ok(Value::Field(s))
			},
			"$attribute" => Ok(Value::Attribute(AttributeItem::from_json(val)?)),
			"$strCast" => Ok(Value::Cast(CastKind::Str, Box::new(Value::from_json(val)?))),
			"$numCast" => Ok(Value::Cast(CastKind::Num, Box::new(Value::from_json(val)?))),
			"$boolCast" => Ok(Value::Cast(CastKind::Bool, Box::new(Value::from_json(val)?))),
			"$timeCast" => Ok(Value::Cast(CastKind::Time, Box::new(Value::from_json(val)?))),
			"$dateTimeCast" => Ok(Value::Cast(
				CastKind::DateTime,
				Box::new(Value::from_json(val)?),
			)),
			"$hexCast" => Ok(Value::Cast(CastKind::Hex, Box::new(Value::from_json(val)?))),
			other => Err(LoadError::InvalidValue(format!("unknown value key {other}"))),
		}
	}

	pub fn to_json(&self) -> Json {
		match self {
			Value::Str(s) => serde_json::json!({ "$strVal": s }),
			Value::Num(n) => serde_json::json!({ "$numVal": n }),
			Value::Bool(b) => serde_json::json!({ "$boolean": b }),
			Value::DateTime(dt) => serde_json::json!({ "$dateTimeVal": dt.to_rfc3339() }),
			Value::Time(t) => serde_json::json!({ "$timeVal": t.to_string() }),
			Value::DateComponent(DateComponent::Year(y)) => serde_json::json!({ "$year": y }),
			Value::DateComponent(DateComponent::Month(m)) => serde_json::json!({ "$month": m }),
			Value::DateComponent(DateComponent::DayOfMonth(d)) => {
				serde_json::json!({ "$dayOfMonth": d })
			},
			Value::DateComponent(DateComponent::DayOfWeek(d)) => {
				serde_json::json!({ "$dayOfWeek": d })
			},
			Value::Hex(h) => serde_json::json!({ "$hexVal": h.to_string() }),
			Value::Field(path) => serde_json::json!({ "$field": path }),
			Value::Attribute(attr) => serde_json::json!({ "$attribute": attr.to_json() }),
			Value::Cast(kind, inner) => serde_json::json!({ kind.wire_key(): inner.to_json() }),
		}
	}
}

impl<'de> Deserialize<'de> for Value {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: serde::Deserializer<'de>,
	{
		let v = Json::deserialize(deserializer)?;
		Value::from_json(&v).map_err(serde::de::Error::custom)
	}
}

impl Serialize for Value {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: serde::Serializer,
	{
		self.to_json().serialize(serializer)
	}
}

/// A `Value` known at parse time to be string-typed: literal, field,
/// attribute, or a `$strCast`-wrapped value.
#[derive(Clone, Debug, PartialEq)]
pub struct StringValue(pub Value);

impl StringValue {
	pub fn from_value(v: Value) -> Result<Self, LoadError> {
		if Self::is_string_typed(&v) {
			Ok(StringValue(v))
		} else {
			Err(LoadError::InvalidValue(format!(
				"expected a string-typed value, got {v:?}"
			)))
		}
	}

	fn is_string_typed(v: &Value) -> bool {
		matches!(
			v,
			Value::Str(_) | Value::Field(_) | Value::Attribute(_) | Value::Cast(CastKind::Str, _)
		)
	}

	pub fn from_json(v: &Json) -> Result<Self, LoadError> {
		Self::from_value(Value::from_json(v)?)
	}

	pub fn to_json(&self) -> Json {
		self.0.to_json()
	}
}

impl<'de> Deserialize<'de> for StringValue {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: serde::Deserializer<'de>,
	{
		let v = Value::deserialize(deserializer)?;
		StringValue::from_value(v).map_err(serde::de::Error::custom)
	}
}

impl Serialize for StringValue {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: serde::Serializer,
	{
		self.0.serialize(serializer)
	}
}

fn expect_str(v: &Json) -> Result<String, LoadError> {
	v.as_str()
		.map(str::to_string)
		.ok_or_else(|| LoadError::InvalidValue(format!("expected string, got {v}")))
}

fn expect_num(v: &Json) -> Result<f64, LoadError> {
	v.as_f64()
		.ok_or_else(|| LoadError::InvalidValue(format!("expected number, got {v}")))
}

fn expect_bool(v: &Json) -> Result<bool, LoadError> {
	v.as_bool()
		.ok_or_else(|| LoadError::InvalidValue(format!("expected bool, got {v}")))
}
