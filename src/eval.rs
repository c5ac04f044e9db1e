//! Full evaluation of a `LogicalExpression` against a claim set.
//!
//! Only claims are resolvable here: a `Value::Field` (a model-data
//! reference) always resolves to `Resolved::Missing`, since this layer has
//! no access to model data. `simplify` is what lets field-bearing
//! subexpressions survive as residuals instead of evaluating them here.

use std::cmp::Ordering;

use regex::Regex;

use crate::claims::{format_num, ClaimScalar, Claims};
use crate::logical::{CompareOp, LogicalExpression, StringOp};
use crate::value::{CastKind, DateComponent, GlobalToken, HexValue, TimeOfDay, Value};

/// A `Value` resolved to a concrete runtime scalar, or `Missing` when it
/// referenced a field, an unresolved claim, or a `REFERENCE` attribute.
#[derive(Clone, Debug, PartialEq)]
pub enum Resolved {
	Str(String),
	Num(f64),
	Bool(bool),
	DateTime(chrono::DateTime<chrono::Utc>),
	Time(TimeOfDay),
	Hex(HexValue),
	Missing,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Kind {
	Str,
	Num,
	Bool,
	DateTime,
	Time,
	Hex,
}

fn kind_of(r: &Resolved) -> Option<Kind> {
	match r {
		Resolved::Str(_) => Some(Kind::Str),
		Resolved::Num(_) => Some(Kind::Num),
		Resolved::Bool(_) => Some(Kind::Bool),
		Resolved::DateTime(_) => Some(Kind::DateTime),
		Resolved::Time(_) => Some(Kind::Time),
		Resolved::Hex(_) => Some(Kind::Hex),
		Resolved::Missing => None,
	}
}

fn date_component_value(dc: DateComponent) -> f64 {
	match dc {
		DateComponent::Year(y) => y as f64,
		DateComponent::Month(m) => m as f64,
		DateComponent::DayOfMonth(d) => d as f64,
		DateComponent::DayOfWeek(d) => d as f64,
	}
}

pub fn resolve_value(v: &Value, claims: &Claims) -> Resolved {
	match v {
		Value::Str(s) => Resolved::Str(s.clone()),
		Value::Num(n) => Resolved::Num(*n),
		Value::Bool(b) => Resolved::Bool(*b),
		Value::DateTime(dt) => Resolved::DateTime(*dt),
		Value::Time(t) => Resolved::Time(*t),
		Value::DateComponent(dc) => Resolved::Num(date_component_value(*dc)),
		Value::Hex(h) => Resolved::Hex(h.clone()),
		Value::Field(_) => Resolved::Missing,
		Value::Attribute(attr) => resolve_attribute(attr, claims),
		Value::Cast(kind, inner) => apply_cast(*kind, resolve_value(inner, claims)),
	}
}

fn resolve_attribute(attr: &crate::value::AttributeItem, claims: &Claims) -> Resolved {
	use crate::value::AttributeItem;
	match attr {
		AttributeItem::Claim(name) => claim_scalar_to_resolved(claims.resolve(name)),
		// Time tokens are not read from a system clock here: an earlier
		// middleware lifts them into the claims bag under their own name.
		AttributeItem::Global(token @ (GlobalToken::LocalNow | GlobalToken::UtcNow | GlobalToken::ClientNow)) => {
			claim_scalar_to_resolved(claims.resolve(token.as_str()))
		},
		AttributeItem::Global(GlobalToken::Anonymous) => Resolved::Str("ANONYMOUS".to_string()),
		// Fails closed: this layer cannot resolve a reference to another
		// model entity.
		AttributeItem::Reference(_) => Resolved::Missing,
	}
}

fn claim_scalar_to_resolved(scalar: ClaimScalar) -> Resolved {
	match scalar {
		ClaimScalar::Str(s) => Resolved::Str(s),
		ClaimScalar::Num(n) => Resolved::Num(n),
		ClaimScalar::Bool(b) => Resolved::Bool(b),
		ClaimScalar::Missing => Resolved::Missing,
	}
}

/// Folds a resolved scalar back into a concrete `Value` literal, for a
/// partial-evaluation residual where this side no longer needs to carry an
/// unresolved attribute/claim reference. An unresolvable attribute reifies
/// to the empty string, matching `stringify`'s treatment of `Missing`.
pub fn reify(r: &Resolved) -> Value {
	match r {
		Resolved::Str(s) => Value::Str(s.clone()),
		Resolved::Num(n) => Value::Num(*n),
		Resolved::Bool(b) => Value::Bool(*b),
		Resolved::DateTime(dt) => Value::DateTime(*dt),
		Resolved::Time(t) => Value::Time(*t),
		Resolved::Hex(h) => Value::Hex(h.clone()),
		Resolved::Missing => Value::Str(String::new()),
	}
}

pub fn stringify(r: &Resolved) -> String {
	match r {
		Resolved::Str(s) => s.clone(),
		Resolved::Num(n) => format_num(*n),
		Resolved::Bool(b) => b.to_string(),
		Resolved::DateTime(dt) => dt.to_rfc3339(),
		Resolved::Time(t) => t.to_string(),
		Resolved::Hex(h) => h.to_string(),
		Resolved::Missing => String::new(),
	}
}

/// Applies an explicit cast to an already-resolved value. An impossible
/// cast (e.g. `$timeCast` of a non-time-shaped string) resolves to
/// `Missing`, which makes every comparison against it fail.
pub fn apply_cast(kind: CastKind, inner: Resolved) -> Resolved {
	match kind {
		CastKind::Str => Resolved::Str(stringify(&inner)),
		CastKind::Num => match inner {
			Resolved::Num(n) => Resolved::Num(n),
			Resolved::Bool(b) => Resolved::Num(if b { 1.0 } else { 0.0 }),
			Resolved::Hex(h) => Resolved::Num(h.as_f64()),
			Resolved::Str(s) => s.parse::<f64>().map(Resolved::Num).unwrap_or(Resolved::Missing),
			_ => Resolved::Missing,
		},
		CastKind::Bool => match inner {
			Resolved::Bool(b) => Resolved::Bool(b),
			Resolved::Num(n) => Resolved::Bool(n != 0.0),
			Resolved::Str(s) => match s.to_ascii_lowercase().as_str() {
				"true" => Resolved::Bool(true),
				"false" => Resolved::Bool(false),
				_ => Resolved::Missing,
			},
			_ => Resolved::Missing,
		},
		CastKind::Time => match inner {
			Resolved::Time(t) => Resolved::Time(t),
			Resolved::Str(s) => TimeOfDay::parse(&s).map(Resolved::Time).unwrap_or(Resolved::Missing),
			_ => Resolved::Missing,
		},
		CastKind::DateTime => match inner {
			Resolved::DateTime(dt) => Resolved::DateTime(dt),
			Resolved::Str(s) => chrono::DateTime::parse_from_rfc3339(&s)
				.map(|dt| Resolved::DateTime(dt.with_timezone(&chrono::Utc)))
				.unwrap_or(Resolved::Missing),
			_ => Resolved::Missing,
		},
		CastKind::Hex => match inner {
			Resolved::Hex(h) => Resolved::Hex(h),
			Resolved::Str(s) => HexValue::parse(&s).map(Resolved::Hex).unwrap_or(Resolved::Missing),
			Resolved::Num(n) if n >= 0.0 && n.fract() == 0.0 => Resolved::Hex(HexValue::from_digits(&format!("{:X}", n as u128))),
			_ => Resolved::Missing,
		},
	}
}

fn ordering(l: &Resolved, r: &Resolved) -> Option<Ordering> {
	if kind_of(l)? != kind_of(r)? {
		return None;
	}
	match (l, r) {
		(Resolved::Num(a), Resolved::Num(b)) => a.partial_cmp(b),
		(Resolved::DateTime(a), Resolved::DateTime(b)) => Some(a.cmp(b)),
		(Resolved::Time(a), Resolved::Time(b)) => Some(a.seconds_of_day().cmp(&b.seconds_of_day())),
		(Resolved::Hex(a), Resolved::Hex(b)) => Some(a.cmp(b)),
		(Resolved::Bool(a), Resolved::Bool(b)) => Some(a.cmp(b)),
		(Resolved::Str(a), Resolved::Str(b)) => Some(a.cmp(b)),
		_ => None,
	}
}

/// Dispatches a comparison on the operands' common comparable kind. `Ne`
/// between incomparable sides (including either side `Missing`) is `true`:
/// they are certainly not equal.
pub fn compare(op: CompareOp, l: &Resolved, r: &Resolved) -> bool {
	let ord = ordering(l, r);
	match op {
		CompareOp::Eq => ord == Some(Ordering::Equal),
		CompareOp::Ne => ord != Some(Ordering::Equal),
		CompareOp::Gt => ord == Some(Ordering::Greater),
		CompareOp::Ge => matches!(ord, Some(Ordering::Greater) | Some(Ordering::Equal)),
		CompareOp::Lt => ord == Some(Ordering::Less),
		CompareOp::Le => matches!(ord, Some(Ordering::Less) | Some(Ordering::Equal)),
	}
}

fn eval_string_pred(op: StringOp, l: &Resolved, r: &Resolved) -> bool {
	let subject = stringify(l);
	let operand = stringify(r);
	match op {
		StringOp::Regex => Regex::new(&operand).map(|re| re.is_match(&subject)).unwrap_or(false),
		StringOp::Contains => subject.contains(&operand),
		StringOp::StartsWith => subject.starts_with(&operand),
		StringOp::EndsWith => subject.ends_with(&operand),
	}
}

pub fn eval(le: &LogicalExpression, claims: &Claims) -> bool {
	match le {
		LogicalExpression::Boolean(b) => *b,
		LogicalExpression::And(children) => children.iter().all(|c| eval(c, claims)),
		LogicalExpression::Or(children) => children.iter().any(|c| eval(c, claims)),
		LogicalExpression::Not(inner) => !eval(inner, claims),
		LogicalExpression::Compare(op, l, r) => compare(*op, &resolve_value(l, claims), &resolve_value(r, claims)),
		LogicalExpression::StringPred(op, l, r) => {
			eval_string_pred(*op, &resolve_value(&l.0, claims), &resolve_value(&r.0, claims))
		},
	}
}
