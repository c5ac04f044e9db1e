//! `LogicalExpression` — the tagged tree evaluated by `eval` and reduced by
//! `simplify`. Pure data; see those modules for semantics.

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::error::LoadError;
use crate::value::{StringValue, Value};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CompareOp {
	Eq,
	Ne,
	Gt,
	Ge,
	Lt,
	Le,
}

impl CompareOp {
	fn wire_key(self) -> &'static str {
		match self {
			CompareOp::Eq => "$eq",
			CompareOp::Ne => "$ne",
			CompareOp::Gt => "$gt",
			CompareOp::Ge => "$ge",
			CompareOp::Lt => "$lt",
			CompareOp::Le => "$le",
		}
	}
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum StringOp {
	Regex,
	Contains,
	StartsWith,
	EndsWith,
}

impl StringOp {
	fn wire_key(self) -> &'static str {
		match self {
			StringOp::Regex => "$regex",
			StringOp::Contains => "$contains",
			StringOp::StartsWith => "$starts-with",
			StringOp::EndsWith => "$ends-with",
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub enum LogicalExpression {
	Boolean(bool),
	And(Vec<LogicalExpression>),
	Or(Vec<LogicalExpression>),
	Not(Box<LogicalExpression>),
	Compare(CompareOp, Value, Value),
	StringPred(StringOp, StringValue, StringValue),
}

impl LogicalExpression {
	pub fn and(children: Vec<LogicalExpression>) -> Self {
		LogicalExpression::And(children)
	}

	pub fn or(children: Vec<LogicalExpression>) -> Self {
		LogicalExpression::Or(children)
	}

	pub fn eq(l: Value, r: Value) -> Self {
		LogicalExpression::Compare(CompareOp::Eq, l, r)
	}

	pub fn from_json(v: &Json) -> Result<Self, LoadError> {
		let obj = v.as_object().ok_or_else(|| {
			LoadError::Malformed("logical expression must be an object".to_string())
		})?;
		if obj.len() != 1 {
			return Err(LoadError::Malformed(
				"logical expression must have exactly one $-key".to_string(),
			));
		}
		let (key, val) = obj.iter().next().expect("len checked above");
		match key.as_str() {
			"$boolean" => Ok(LogicalExpression::Boolean(val.as_bool().ok_or_else(|| {
				LoadError::Malformed("$boolean value must be a bool".to_string())
			})?)),
			"$and" => Ok(LogicalExpression::And(parse_list(val, "$and")?)),
			"$or" => Ok(LogicalExpression::Or(parse_list(val, "$or")?)),
			"$not" => Ok(LogicalExpression::Not(Box::new(
				LogicalExpression::from_json(val)?,
			))),
			"$eq" => parse_compare(CompareOp::Eq, val),
			"$ne" => parse_compare(CompareOp::Ne, val),
			"$gt" => parse_compare(CompareOp::Gt, val),
			"$ge" => parse_compare(CompareOp::Ge, val),
			"$lt" => parse_compare(CompareOp::Lt, val),
			"$le" => parse_compare(CompareOp::Le, val),
			"$regex" => parse_string_pred(StringOp::Regex, val),
			"$contains" => parse_string_pred(StringOp::Contains, val),
			"$starts-with" => parse_string_pred(StringOp::StartsWith, val),
			"$ends-with" => parse_string_pred(StringOp::EndsWith, val),
			other => Err(LoadError::Malformed(format!(
				"unknown logical expression key {other}"
			))),
		}
	}

	pub fn to_json(&self) -> Json {
		match self {
			LogicalExpression::Boolean(b) => serde_json::json!({ "$boolean": b }),
			LogicalExpression::And(children) => {
				serde_json::json!({ "$and": children.iter().map(Self::to_json).collect::<Vec<_>>() })
			},
			LogicalExpression::Or(children) => {
				serde_json::json!({ "$or": children.iter().map(Self::to_json).collect::<Vec<_>>() })
			},
			LogicalExpression::Not(child) => serde_json::json!({ "$not": child.to_json() }),
			LogicalExpression::Compare(op, l, r) => {
				serde_json::json!({ op.wire_key(): [l.to_json(), r.to_json()] })
			},
			LogicalExpression::StringPred(op, l, r) => {
				serde_json::json!({ op.wire_key(): [l.to_json(), r.to_json()] })
			},
		}
	}
}

fn parse_list(val: &Json, key: &'static str) -> Result<Vec<LogicalExpression>, LoadError> {
	let arr = val
		.as_array()
		.ok_or_else(|| LoadError::Malformed(format!("{key} value must be an array")))?;
	if arr.len() < 2 {
		return Err(LoadError::EmptyExpressionList(key));
	}
	arr.iter().map(LogicalExpression::from_json).collect()
}

fn parse_pair(val: &Json) -> Result<(Json, Json), LoadError> {
	let arr = val
		.as_array()
		.ok_or_else(|| LoadError::Malformed("operator value must be a 2-element array".to_string()))?;
	if arr.len() != 2 {
		return Err(LoadError::Malformed(
			"operator value must have exactly two operands".to_string(),
		));
	}
	Ok((arr[0].clone(), arr[1].clone()))
}

fn parse_compare(op: CompareOp, val: &Json) -> Result<LogicalExpression, LoadError> {
	let (l, r) = parse_pair(val)?;
	Ok(LogicalExpression::Compare(
		op,
		Value::from_json(&l)?,
		Value::from_json(&r)?,
	))
}

fn parse_string_pred(op: StringOp, val: &Json) -> Result<LogicalExpression, LoadError> {
	let (l, r) = parse_pair(val)?;
	Ok(LogicalExpression::StringPred(
		op,
		StringValue::from_json(&l)?,
		StringValue::from_json(&r)?,
	))
}

impl<'de> Deserialize<'de> for LogicalExpression {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: serde::Deserializer<'de>,
	{
		let v = Json::deserialize(deserializer)?;
		LogicalExpression::from_json(&v).map_err(serde::de::Error::custom)
	}
}

impl Serialize for LogicalExpression {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: serde::Serializer,
	{
		self.to_json().serialize(serializer)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn rejects_singleton_and() {
		let json = serde_json::json!({ "$and": [{ "$boolean": true }] });
		assert!(LogicalExpression::from_json(&json).is_err());
	}

	#[test]
	fn round_trips_nested_expression() {
		let le = LogicalExpression::And(vec![
			LogicalExpression::Boolean(true),
			LogicalExpression::Compare(CompareOp::Eq, Value::Num(1.0), Value::Field("$sm#id".into())),
		]);
		let json = le.to_json();
		let parsed = LogicalExpression::from_json(&json).unwrap();
		assert_eq!(le, parsed);
	}
}
