//! Caller claims: the per-request attribute bag the engine reads from.
//!
//! Claim providers upstream of this engine sometimes wrap a scalar in a
//! single-element array (a quirk of some OIDC token exchange paths). The
//! unwrap happens once here, at the resolution boundary, rather than being
//! scattered across every predicate that touches a claim value.

use std::collections::HashMap;

/// A resolved, normalized claim value: one of the kinds the evaluator can
/// compare or print. Unlike `serde_json::Value` this already has the
/// single-element-array unwrap applied.
#[derive(Clone, Debug, PartialEq)]
pub enum ClaimScalar {
	Str(String),
	Num(f64),
	Bool(bool),
	/// Key absent, or present but not representable (e.g. an object/empty
	/// array). Resolves to the empty string everywhere a string is needed.
	Missing,
}

impl ClaimScalar {
	pub fn sprint(&self) -> String {
		match self {
			ClaimScalar::Str(s) => s.clone(),
			ClaimScalar::Num(n) => format_num(*n),
			ClaimScalar::Bool(b) => b.to_string(),
			ClaimScalar::Missing => String::new(),
		}
	}
}

pub(crate) fn format_num(n: f64) -> String {
	if n.fract() == 0.0 && n.abs() < 1e15 {
		format!("{}", n as i64)
	} else {
		n.to_string()
	}
}

/// `EvalInput`'s claim bag: `(method, path, claims)` triples carry this.
/// Includes upstream-provided time tokens (`UTCNOW`, `LOCALNOW`, `CLIENTNOW`)
/// and any other OIDC-derived claims, flattened to one level.
#[derive(Clone, Debug, Default)]
pub struct Claims(pub HashMap<String, serde_json::Value>);

impl Claims {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn contains(&self, key: &str) -> bool {
		self.0.contains_key(key)
	}

	/// Resolve a claim by key, unwrapping a single-element array container
	/// to its sole scalar. Returns `ClaimScalar::Missing` if the key is
	/// absent or the value isn't representable as a scalar.
	pub fn resolve(&self, key: &str) -> ClaimScalar {
		match self.0.get(key) {
			Some(v) => scalar_of(v),
			None => ClaimScalar::Missing,
		}
	}
}

impl FromIterator<(String, serde_json::Value)> for Claims {
	fn from_iter<T: IntoIterator<Item = (String, serde_json::Value)>>(iter: T) -> Self {
		Claims(iter.into_iter().collect())
	}
}

fn scalar_of(v: &serde_json::Value) -> ClaimScalar {
	match v {
		serde_json::Value::Array(a) if a.len() == 1 => scalar_of(&a[0]),
		serde_json::Value::String(s) => ClaimScalar::Str(s.clone()),
		serde_json::Value::Number(n) => n.as_f64().map(ClaimScalar::Num).unwrap_or(ClaimScalar::Missing),
		serde_json::Value::Bool(b) => ClaimScalar::Bool(*b),
		_ => ClaimScalar::Missing,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn unwraps_single_element_array() {
		let claims: Claims = [("role".to_string(), serde_json::json!(["admin"]))]
			.into_iter()
			.collect();
		assert_eq!(claims.resolve("role"), ClaimScalar::Str("admin".to_string()));
	}

	#[test]
	fn leaves_multi_element_array_unresolved() {
		let claims: Claims = [("role".to_string(), serde_json::json!(["admin", "user"]))]
			.into_iter()
			.collect();
		assert_eq!(claims.resolve("role"), ClaimScalar::Missing);
	}

	#[test]
	fn missing_key_is_missing() {
		let claims = Claims::new();
		assert_eq!(claims.resolve("nope"), ClaimScalar::Missing);
	}
}
