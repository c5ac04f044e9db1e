//! The model store and the authorizer that evaluates requests against it.
//!
//! `ModelStore` holds the current `Model` behind a reader/writer guard so a
//! reload swaps the whole model in one atomic pointer write; concurrent
//! readers never observe a half-updated rule set.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::acl::{Access, Right};
use crate::attrs::attrs_satisfied;
use crate::claims::Claims;
use crate::filter::QueryFilter;
use crate::logical::LogicalExpression;
use crate::matcher::match_objects;
use crate::rights::{fallback_right, required_rights};
use crate::rule::Model;
use crate::simplify::SimplifyOptions;

/// One request to authorize: the method and path identify the resource and
/// the rights it needs; `claims` is the caller's resolved attribute bag.
#[derive(Clone, Debug)]
pub struct EvalInput {
	pub method: String,
	pub path: String,
	pub claims: Claims,
}

#[derive(Clone, Debug)]
pub struct AuthorizerOptions {
	/// Stripped from `EvalInput::path` before route matching.
	pub base_path: String,
	/// Forwarded to `simplify`: wrap field comparisons in an inferred cast.
	pub implicit_casts: bool,
	/// When the route table has no entry for a path, fall back to the
	/// method's natural right (`rights::fallback_right`) instead of failing
	/// the request outright.
	pub fallback_rights_mapping: bool,
}

impl Default for AuthorizerOptions {
	fn default() -> Self {
		AuthorizerOptions {
			base_path: String::new(),
			implicit_casts: true,
			fallback_rights_mapping: false,
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct AuthorizationDecision {
	pub allow: bool,
	pub reason: &'static str,
	pub filter: Option<QueryFilter>,
}

impl AuthorizationDecision {
	fn deny(reason: &'static str) -> Self {
		AuthorizationDecision {
			allow: false,
			reason,
			filter: None,
		}
	}
}

/// Holds the current `Model` behind a `parking_lot::RwLock<Arc<_>>`: readers
/// clone the `Arc` under a brief read lock and evaluate against their own
/// snapshot; a reload takes the write lock only long enough to swap the
/// pointer.
#[derive(Default)]
pub struct ModelStore {
	inner: RwLock<Arc<Model>>,
}

impl ModelStore {
	pub fn new(model: Model) -> Self {
		ModelStore {
			inner: RwLock::new(Arc::new(model)),
		}
	}

	pub fn get(&self) -> Arc<Model> {
		self.inner.read().clone()
	}

	pub fn set(&self, model: Model) {
		*self.inner.write() = Arc::new(model);
	}
}

fn rights_satisfied(rule_rights: &[Right], required: &[Right]) -> bool {
	rule_rights.contains(&Right::All) || required.iter().any(|r| rule_rights.contains(r))
}

/// Evaluates `input` against the store's current model: first-match-wins
/// over `MaterializedRule`s in document order. On an `ALLOW` match, the
/// returned decision carries a `QueryFilter` built from the matching
/// rule's formula, the residual from object expansion, and its fragment
/// filters, for a downstream query layer to apply.
pub fn authorize_with_filter(
	store: &ModelStore,
	input: &EvalInput,
	opts: &AuthorizerOptions,
) -> AuthorizationDecision {
	tracing::trace!(method = %input.method, path = %input.path, "authorizing request");
	let model = store.get();
	let required = match required_rights(&input.method, &input.path, &opts.base_path) {
		Some((rights, _pattern)) => rights,
		None if opts.fallback_rights_mapping => match fallback_right(&input.method) {
			Some(rights) => rights,
			None => {
				tracing::debug!(method = %input.method, path = %input.path, "no route mapping, fallback has no default either");
				return AuthorizationDecision::deny("no route mapping");
			},
		},
		None => {
			tracing::debug!(method = %input.method, path = %input.path, "no route mapping");
			return AuthorizationDecision::deny("no route mapping");
		},
	};

	let simplify_opts = SimplifyOptions {
		implicit_casts: opts.implicit_casts,
	};

	for rule in model.rules() {
		if !rights_satisfied(&rule.acl.rights, required) {
			continue;
		}
		let object_match = match_objects(&rule.objects, &input.path);
		if !object_match.access {
			continue;
		}
		if !attrs_satisfied(&rule.acl.attributes, &input.claims) {
			continue;
		}

		let mut filter = QueryFilter::from_rule(rule, &input.claims, simplify_opts);
		if filter.formula == Some(LogicalExpression::Boolean(false)) {
			continue;
		}

		if rule.acl.access == Access::Disabled {
			tracing::debug!(method = %input.method, path = %input.path, "rule matched but disabled");
			return AuthorizationDecision::deny("rule matched but disabled");
		}

		if let Some(le) = object_match.le {
			filter.formula = Some(match filter.formula.take() {
				Some(existing) => LogicalExpression::And(vec![existing, le]),
				None => le,
			});
		}

		tracing::trace!(method = %input.method, path = %input.path, "allowed by rule");
		return AuthorizationDecision {
			allow: true,
			reason: "ALLOW by rule",
			filter: Some(filter),
		};
	}

	tracing::debug!(method = %input.method, path = %input.path, "no matching rule");
	AuthorizationDecision::deny("no matching rule")
}
