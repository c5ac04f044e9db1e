//! Attribute-gate evaluation: does the caller's claim set satisfy an ACL's
//! `ATTRIBUTES` list?
//!
//! Every item in the list must hold (AND-reduction); an empty list never
//! holds — an ACL with no attribute gate authorizes nobody. Rule authors
//! state `{"GLOBAL": "ANONYMOUS"}` explicitly to admit unauthenticated
//! callers.

use crate::claims::Claims;
use crate::value::{AttributeItem, GlobalToken};

fn attr_satisfied(item: &AttributeItem, claims: &Claims) -> bool {
	match item {
		AttributeItem::Claim(name) => claims.contains(name),
		AttributeItem::Global(GlobalToken::Anonymous) => true,
		// Time tokens (LOCALNOW/UTCNOW/CLIENTNOW) are always resolvable
		// values, not subject assertions; they never gate.
		AttributeItem::Global(_) => true,
		// A REFERENCE points at another model entity this layer has no
		// access to resolve; treat unresolved as not satisfied.
		AttributeItem::Reference(_) => false,
	}
}

pub fn attrs_satisfied(items: &[AttributeItem], claims: &Claims) -> bool {
	if items.is_empty() {
		return false;
	}
	items.iter().all(|item| attr_satisfied(item, claims))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn empty_attribute_list_never_satisfied() {
		assert!(!attrs_satisfied(&[], &Claims::new()));
	}

	#[test]
	fn anonymous_global_always_satisfied() {
		let items = vec![AttributeItem::Global(GlobalToken::Anonymous)];
		assert!(attrs_satisfied(&items, &Claims::new()));
	}

	#[test]
	fn claim_requires_presence() {
		let items = vec![AttributeItem::Claim("role".to_string())];
		assert!(!attrs_satisfied(&items, &Claims::new()));
		let claims: Claims = [("role".to_string(), serde_json::json!("admin"))].into_iter().collect();
		assert!(attrs_satisfied(&items, &claims));
	}

	#[test]
	fn reference_fails_closed() {
		let items = vec![AttributeItem::Reference("someEntity".to_string())];
		assert!(!attrs_satisfied(&items, &Claims::new()));
	}

	#[test]
	fn all_items_must_hold() {
		let items = vec![
			AttributeItem::Claim("role".to_string()),
			AttributeItem::Reference("x".to_string()),
		];
		let claims: Claims = [("role".to_string(), serde_json::json!("admin"))].into_iter().collect();
		assert!(!attrs_satisfied(&items, &claims));
	}
}
