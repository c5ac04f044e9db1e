//! Partial evaluation: reduces the claim-resolvable parts of a
//! `LogicalExpression` to `Boolean` literals while leaving any
//! field-referencing subterm intact as a residual for a downstream query
//! builder to turn into SQL.
//!
//! The returned `bool` is `isPureBoolean`: `true` means the whole
//! expression folded away and the `LogicalExpression` it's paired with is
//! always `Boolean(_)` — there is no residual left to push down.

use crate::eval;
use crate::logical::LogicalExpression;
use crate::value::{CastKind, Value};
use crate::{claims::Claims, value::StringValue};

#[derive(Copy, Clone, Debug)]
pub struct SimplifyOptions {
	/// When a comparison pits a field against a claim/literal of a known
	/// kind, wrap the field side in the matching `$xCast` so a downstream
	/// SQL builder knows what coercion to apply.
	pub implicit_casts: bool,
}

impl Default for SimplifyOptions {
	fn default() -> Self {
		SimplifyOptions { implicit_casts: true }
	}
}

fn literal_kind(v: &Value) -> Option<CastKind> {
	match v {
		Value::Str(_) => Some(CastKind::Str),
		Value::Num(_) => Some(CastKind::Num),
		Value::Bool(_) => Some(CastKind::Bool),
		Value::DateTime(_) => Some(CastKind::DateTime),
		Value::Time(_) => Some(CastKind::Time),
		Value::Hex(_) => Some(CastKind::Hex),
		Value::DateComponent(_) => Some(CastKind::Num),
		_ => None,
	}
}

fn wrap_cast(v: Value, kind: CastKind) -> Value {
	if matches!(&v, Value::Cast(k, _) if *k == kind) {
		v
	} else {
		Value::Cast(kind, Box::new(v))
	}
}

fn apply_implicit_cast(l: Value, r: Value) -> (Value, Value) {
	let lk = literal_kind(&l);
	let rk = literal_kind(&r);
	let l = if l.contains_field() {
		match rk {
			Some(k) => wrap_cast(l, k),
			None => l,
		}
	} else {
		l
	};
	let r = if r.contains_field() {
		match lk {
			Some(k) => wrap_cast(r, k),
			None => r,
		}
	} else {
		r
	};
	(l, r)
}

/// Resolves `v` to a concrete literal when it carries no `$field`, leaving a
/// field-bearing side untouched. This is what lets a residual like
/// `{CLAIM:"tenant"} = $field` fold the claim side down to e.g. `"acme"`
/// instead of surviving as an unevaluated attribute reference.
fn reify_if_fieldless(v: &Value, claims: &Claims) -> Value {
	if v.contains_field() {
		v.clone()
	} else {
		eval::reify(&eval::resolve_value(v, claims))
	}
}

fn simplify_compare(
	op: crate::logical::CompareOp,
	l: &Value,
	r: &Value,
	claims: &Claims,
	opts: SimplifyOptions,
) -> (LogicalExpression, bool) {
	if !l.contains_field() && !r.contains_field() {
		let result = eval::eval(&LogicalExpression::Compare(op, l.clone(), r.clone()), claims);
		return (LogicalExpression::Boolean(result), true);
	}
	let l = reify_if_fieldless(l, claims);
	let r = reify_if_fieldless(r, claims);
	let (nl, nr) = if opts.implicit_casts {
		apply_implicit_cast(l, r)
	} else {
		(l, r)
	};
	(LogicalExpression::Compare(op, nl, nr), false)
}

fn simplify_string_pred(
	op: crate::logical::StringOp,
	l: &StringValue,
	r: &StringValue,
	claims: &Claims,
	opts: SimplifyOptions,
) -> (LogicalExpression, bool) {
	if !l.0.contains_field() && !r.0.contains_field() {
		let result = eval::eval(
			&LogicalExpression::StringPred(op, l.clone(), r.clone()),
			claims,
		);
		return (LogicalExpression::Boolean(result), true);
	}
	let l = StringValue(reify_if_fieldless(&l.0, claims));
	let r = StringValue(reify_if_fieldless(&r.0, claims));
	if opts.implicit_casts {
		let wrap = |sv: StringValue| -> StringValue {
			if sv.0.contains_field() {
				StringValue(wrap_cast(sv.0, CastKind::Str))
			} else {
				sv
			}
		};
		(LogicalExpression::StringPred(op, wrap(l), wrap(r)), false)
	} else {
		(LogicalExpression::StringPred(op, l, r), false)
	}
}

fn simplify_and(children: &[LogicalExpression], claims: &Claims, opts: SimplifyOptions) -> (LogicalExpression, bool) {
	let mut kept = Vec::new();
	for child in children {
		let (s, _) = simplify(child, claims, opts);
		match s {
			LogicalExpression::Boolean(false) => return (LogicalExpression::Boolean(false), true),
			LogicalExpression::Boolean(true) => continue,
			other => kept.push(other),
		}
	}
	match kept.len() {
		0 => (LogicalExpression::Boolean(true), true),
		1 => {
			let only = kept.into_iter().next().expect("len checked above");
			(only, false)
		},
		_ => (LogicalExpression::And(kept), false),
	}
}

fn simplify_or(children: &[LogicalExpression], claims: &Claims, opts: SimplifyOptions) -> (LogicalExpression, bool) {
	let mut kept = Vec::new();
	for child in children {
		let (s, _) = simplify(child, claims, opts);
		match s {
			LogicalExpression::Boolean(true) => return (LogicalExpression::Boolean(true), true),
			LogicalExpression::Boolean(false) => continue,
			other => kept.push(other),
		}
	}
	match kept.len() {
		0 => (LogicalExpression::Boolean(false), true),
		1 => {
			let only = kept.into_iter().next().expect("len checked above");
			(only, false)
		},
		_ => (LogicalExpression::Or(kept), false),
	}
}

pub fn simplify(le: &LogicalExpression, claims: &Claims, opts: SimplifyOptions) -> (LogicalExpression, bool) {
	match le {
		LogicalExpression::Boolean(b) => (LogicalExpression::Boolean(*b), true),
		LogicalExpression::And(children) => simplify_and(children, claims, opts),
		LogicalExpression::Or(children) => simplify_or(children, claims, opts),
		LogicalExpression::Not(inner) => {
			let (s, _) = simplify(inner, claims, opts);
			match s {
				LogicalExpression::Boolean(b) => (LogicalExpression::Boolean(!b), true),
				other => (LogicalExpression::Not(Box::new(other)), false),
			}
		},
		LogicalExpression::Compare(op, l, r) => simplify_compare(*op, l, r, claims, opts),
		LogicalExpression::StringPred(op, l, r) => simplify_string_pred(*op, l, r, claims, opts),
	}
}
