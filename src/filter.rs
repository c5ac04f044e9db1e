//! `QueryFilter`: the per-request residual a materialized rule's formula
//! and fragment filters reduce to once claims are folded away. A
//! downstream query builder turns the residual `LogicalExpression`s (which
//! may still reference model fields) into SQL predicates.

use std::collections::BTreeMap;

use crate::claims::Claims;
use crate::logical::LogicalExpression;
use crate::rule::MaterializedRule;
use crate::simplify::{simplify, SimplifyOptions};

/// A stored fragment key (e.g. `"$sme#value[]"`) matches a queried fragment
/// (e.g. `"$sme#value[3]"`) when the stored key contains an empty `[]`
/// index trailer and the queried key's prefix up to its own `[` equals the
/// stored key's prefix, and its suffix after the matching `]` equals the
/// stored key's suffix. The literal `"[]"` entry (empty prefix and suffix)
/// matches every fragment.
fn fragment_key_matches(stored: &str, queried: &str) -> bool {
	if stored == queried {
		return true;
	}
	let Some(bracket_at) = stored.find("[]") else {
		return false;
	};
	let prefix = &stored[..bracket_at];
	let suffix = &stored[bracket_at + 2..];
	queried.starts_with(prefix) && queried.ends_with(suffix) && queried.len() >= prefix.len() + suffix.len()
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryFilter {
	/// The rule's top-level formula, claim-folded. `None` means the formula
	/// folded away to `true` (no restriction).
	pub formula: Option<LogicalExpression>,
	/// Fragment path (`$scope#field[index].sub` wire form) -> claim-folded
	/// condition. Looked up via `entries_for`, which also matches `[]`
	/// index-wildcard keys.
	pub filters: BTreeMap<String, LogicalExpression>,
}

impl QueryFilter {
	pub fn new() -> Self {
		Self::default()
	}

	/// Builds the residual filter for one matched rule: simplifies the
	/// formula and every fragment condition against `claims`.
	pub fn from_rule(rule: &MaterializedRule, claims: &Claims, opts: SimplifyOptions) -> Self {
		let (formula, pure) = simplify(&rule.formula, claims, opts);
		let formula = if pure && formula == LogicalExpression::Boolean(true) {
			None
		} else {
			Some(formula)
		};

		let mut filters = BTreeMap::new();
		for f in &rule.filters {
			let (condition, pure) = simplify(&f.condition, claims, opts);
			if pure && condition == LogicalExpression::Boolean(true) {
				continue;
			}
			match filters.remove(&f.fragment) {
				Some(existing) => {
					filters.insert(f.fragment.clone(), and_merge(Some(existing), Some(condition)));
				},
				None => {
					filters.insert(f.fragment.clone(), condition);
				},
			}
		}

		QueryFilter { formula, filters }
	}

	/// Residual conditions that apply to `fragment`: an exact match plus
	/// anything stored under a `[]` index-wildcard key whose prefix/suffix
	/// cover it.
	pub fn entries_for(&self, fragment: &str) -> Vec<&LogicalExpression> {
		self
			.filters
			.iter()
			.filter(|(k, _)| fragment_key_matches(k, fragment))
			.map(|(_, v)| v)
			.collect()
	}

	/// AND-merges `other` into `self`, re-simplifying the combined
	/// per-fragment conditions so an already-resolved side collapses away.
	pub fn merge_and(&mut self, other: QueryFilter, claims: &Claims, opts: SimplifyOptions) {
		self.formula = Some(and_merge(self.formula.take(), other.formula));
		if let Some(LogicalExpression::Boolean(true)) = self.formula {
			self.formula = None;
		}

		for (fragment, condition) in other.filters {
			let merged = match self.filters.remove(&fragment) {
				Some(existing) => and_merge(Some(existing), Some(condition)),
				None => condition,
			};
			let (simplified, pure) = simplify(&merged, claims, opts);
			if pure && simplified == LogicalExpression::Boolean(true) {
				continue;
			}
			self.filters.insert(fragment, simplified);
		}
	}
}

fn and_merge(a: Option<LogicalExpression>, b: Option<LogicalExpression>) -> LogicalExpression {
	match (a, b) {
		(Some(x), Some(y)) => LogicalExpression::And(vec![x, y]),
		(Some(x), None) => x,
		(None, Some(y)) => y,
		(None, None) => LogicalExpression::Boolean(true),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::acl::{Access, Right};
	use crate::logical::CompareOp;
	use crate::object::ObjectItem;
	use crate::rule::Filter;
	use crate::value::Value;

	fn rule_with(formula: LogicalExpression, filters: Vec<Filter>) -> MaterializedRule {
		MaterializedRule {
			acl: crate::acl::Acl {
				access: Access::Allow,
				rights: vec![Right::Read],
				attributes: Vec::new(),
				use_attributes: None,
			},
			objects: vec![ObjectItem::Route("/submodels/*".to_string())],
			formula,
			filters,
			description: None,
		}
	}

	#[test]
	fn literal_wildcard_fragment_matches_any_key() {
		let mut qf = QueryFilter::new();
		qf.filters.insert("[]".to_string(), LogicalExpression::Boolean(false));
		assert_eq!(qf.entries_for("$sm#id").len(), 1);
		assert_eq!(qf.entries_for("anything#else").len(), 1);
	}

	#[test]
	fn indexed_wildcard_fragment_matches_by_prefix_and_suffix() {
		let mut qf = QueryFilter::new();
		qf
			.filters
			.insert("$sme#value[]".to_string(), LogicalExpression::Boolean(false));
		assert_eq!(qf.entries_for("$sme#value[3]").len(), 1);
		assert_eq!(qf.entries_for("$sme#other[3]").len(), 0);
	}

	#[test]
	fn from_rule_ands_together_two_filters_sharing_a_fragment_key() {
		let rule = rule_with(
			LogicalExpression::Boolean(true),
			vec![
				Filter {
					fragment: "$sme#value".to_string(),
					condition: LogicalExpression::Compare(CompareOp::Eq, Value::Field("$sme#value".to_string()), Value::Num(1.0)),
				},
				Filter {
					fragment: "$sme#value".to_string(),
					condition: LogicalExpression::Compare(CompareOp::Ne, Value::Field("$sme#value".to_string()), Value::Num(2.0)),
				},
			],
		);
		let qf = QueryFilter::from_rule(&rule, &Claims::new(), SimplifyOptions::default());
		assert!(matches!(
			qf.filters.get("$sme#value"),
			Some(LogicalExpression::And(children)) if children.len() == 2
		));
	}

	#[test]
	fn from_rule_drops_fully_resolved_true_formula() {
		let rule = rule_with(LogicalExpression::Boolean(true), Vec::new());
		let qf = QueryFilter::from_rule(&rule, &Claims::new(), SimplifyOptions::default());
		assert!(qf.formula.is_none());
	}

	#[test]
	fn from_rule_keeps_residual_formula() {
		let rule = rule_with(
			LogicalExpression::Compare(CompareOp::Eq, Value::Field("$sm#id".to_string()), Value::Str("x".to_string())),
			Vec::new(),
		);
		let qf = QueryFilter::from_rule(&rule, &Claims::new(), SimplifyOptions::default());
		assert!(qf.formula.is_some());
	}

	#[test]
	fn merge_and_combines_and_resimplifies() {
		let mut a = QueryFilter::new();
		a.filters.insert(
			"$sme#value".to_string(),
			LogicalExpression::Compare(CompareOp::Eq, Value::Field("$sme#value".to_string()), Value::Num(1.0)),
		);
		let mut b = QueryFilter::new();
		b.filters.insert("$sme#value".to_string(), LogicalExpression::Boolean(true));

		a.merge_and(b, &Claims::new(), SimplifyOptions::default());
		// Boolean(true) ANDed in and re-simplified away; the field residual remains alone.
		assert!(matches!(
			a.filters.get("$sme#value"),
			Some(LogicalExpression::Compare(..))
		));
	}
}
