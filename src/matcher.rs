//! Object matching: does a rule's `objects` list cover the resource a
//! request addresses, and if so, what residual filter (if any) narrows it?
//!
//! `ROUTE` items match the raw path under the ACL wildcard dialect and, on
//! match, grant unconditional access. `DESCRIPTOR`/`IDENTIFIABLE`/`REFERABLE`
//! items expand a scoped domain reference against a static table of
//! collection/item route templates: a request for the exact item needs no
//! residual, while a request for the collection gets an equality filter
//! narrowing it to the referenced id. Filters from multiple objects combine
//! into a disjunction; an unconditional match from any object short-circuits
//! the scan.

use percent_encoding::percent_decode_str;
use regex::Regex;

use crate::logical::{CompareOp, LogicalExpression};
use crate::object::{IdRef, ObjectItem};
use crate::pattern::{acl_regex, ant_regex, normalize_path};
use crate::value::Value;

/// The `(access, le)` pair `match_objects` returns: `le` is the residual
/// equality filter a collection-level match needs, `None` for an exact
/// item-level match or a plain `ROUTE` match.
#[derive(Clone, Debug, PartialEq)]
pub struct MatchResult {
	pub access: bool,
	pub le: Option<LogicalExpression>,
}

enum Outcome {
	NoMatch,
	/// Matches with no filter: callers short-circuit on this.
	Unconditional,
	Filtered(LogicalExpression),
}

struct ScopeRoutes {
	collection: &'static str,
	item: &'static str,
}

/// Collection/item route templates for the scopes `DESCRIPTOR` and
/// `IDENTIFIABLE` objects address. Mirrors the route table in `rights`.
fn scope_routes(scope: &str) -> Option<ScopeRoutes> {
	match scope {
		"$aasdesc" => Some(ScopeRoutes {
			collection: "/shell-descriptors",
			item: "/shell-descriptors/*",
		}),
		"$smdesc" => Some(ScopeRoutes {
			collection: "/submodel-descriptors",
			item: "/submodel-descriptors/*",
		}),
		"$aas" => Some(ScopeRoutes {
			collection: "/shells",
			item: "/shells/*",
		}),
		"$sm" => Some(ScopeRoutes {
			collection: "/submodels",
			item: "/submodels/*",
		}),
		"$cd" => Some(ScopeRoutes {
			collection: "/concept-descriptions",
			item: "/concept-descriptions/*",
		}),
		_ => None,
	}
}

/// Matches a user-authored `ROUTE` object pattern (ACL dialect: `*` spans
/// segments).
fn matches_acl_route(pattern: &str, path: &str) -> bool {
	acl_regex(pattern).is_match(&normalize_path(path))
}

/// Matches one of the static scope-table route templates (ANT dialect:
/// `*` stays within one segment).
fn matches_template(pattern: &str, path: &str) -> bool {
	ant_regex(pattern).is_match(&normalize_path(path))
}

/// Matches `path` against a single-`*` item template and, on a match,
/// percent-decodes the captured segment.
fn item_id_capture(template: &str, path: &str) -> Option<String> {
	let escaped = regex::escape(template).replace(r"\*", "([^/]+)");
	let re = Regex::new(&format!("^{escaped}$")).expect("item template always compiles");
	let caps = re.captures(&normalize_path(path))?;
	Some(percent_decode_str(caps.get(1)?.as_str()).decode_utf8_lossy().into_owned())
}

fn descriptor_or_identifiable(scope: &str, id: &IdRef, path: &str) -> Outcome {
	let Some(routes) = scope_routes(scope) else {
		return Outcome::NoMatch;
	};

	if id.is_all() {
		return if matches_template(routes.item, path) || matches_template(routes.collection, path) {
			Outcome::Unconditional
		} else {
			Outcome::NoMatch
		};
	}

	let IdRef::Concrete(concrete) = id else {
		unreachable!("is_all() covers the wildcard case");
	};
	if let Some(actual) = item_id_capture(routes.item, path) {
		if &actual == concrete {
			return Outcome::Unconditional;
		}
	}
	if matches_template(routes.collection, path) {
		let field = format!("{scope}#id");
		return Outcome::Filtered(LogicalExpression::Compare(
			CompareOp::Eq,
			Value::Field(field),
			Value::Str(concrete.clone()),
		));
	}
	Outcome::NoMatch
}

const SME_COLLECTION: &str = "/submodels/*/submodel-elements";

fn sme_item_capture(path: &str) -> Option<(String, String)> {
	let re = Regex::new(r"^/submodels/([^/]+)/submodel-elements/(.+)$").expect("fixed pattern always compiles");
	let caps = re.captures(&normalize_path(path))?;
	let sm_id = percent_decode_str(caps.get(1)?.as_str()).decode_utf8_lossy().into_owned();
	let rest = caps.get(2)?.as_str();
	let id_short_path = rest
		.split('/')
		.map(|seg| percent_decode_str(seg).decode_utf8_lossy().into_owned())
		.collect::<Vec<_>>()
		.join(".");
	Some((sm_id, id_short_path))
}

/// `REFERABLE(scope=$sme, id, idShortPath)`: `id` is the owning submodel's
/// identifier, `idShortPath` addresses the element within it. An exact
/// element route needs no residual; the submodel-elements collection route
/// gets an equality filter on the submodel id and, when `idShortPath` is a
/// concrete (non-wildcard) path, on the element's last idShort segment.
fn referable(id: &IdRef, id_short_path: &str, path: &str) -> Outcome {
	if let Some((sm_id, actual_path)) = sme_item_capture(path) {
		let sm_ok = match id {
			IdRef::Wildcard => true,
			IdRef::Concrete(c) => c == &sm_id,
		};
		if sm_ok && acl_regex(id_short_path).is_match(&actual_path) {
			return Outcome::Unconditional;
		}
	}

	if matches_template(SME_COLLECTION, path) {
		let mut clauses = Vec::new();
		if let IdRef::Concrete(c) = id {
			clauses.push(LogicalExpression::Compare(
				CompareOp::Eq,
				Value::Field("$sm#id".to_string()),
				Value::Str(c.clone()),
			));
		}
		if !id_short_path.contains('*') {
			let last_segment = id_short_path.rsplit('.').next().unwrap_or(id_short_path);
			clauses.push(LogicalExpression::Compare(
				CompareOp::Eq,
				Value::Field("$sme#idShort".to_string()),
				Value::Str(last_segment.to_string()),
			));
		}
		return match clauses.len() {
			0 => Outcome::Unconditional,
			1 => Outcome::Filtered(clauses.into_iter().next().expect("len checked")),
			_ => Outcome::Filtered(LogicalExpression::And(clauses)),
		};
	}
	Outcome::NoMatch
}

fn object_outcome(item: &ObjectItem, path: &str) -> Outcome {
	match item {
		ObjectItem::Route(pattern) => {
			if matches_acl_route(pattern, path) {
				Outcome::Unconditional
			} else {
				Outcome::NoMatch
			}
		},
		ObjectItem::Identifiable { scope, id } | ObjectItem::Descriptor { scope, id } => {
			descriptor_or_identifiable(scope, id, path)
		},
		ObjectItem::Referable { id, id_short_path, .. } => referable(id, id_short_path, path),
		// Not addressed by the route-expansion table: a FRAGMENT object names
		// a filter-composition path, not a route.
		ObjectItem::Fragment(_) => Outcome::NoMatch,
	}
}

/// Evaluates every item in `objects` against `path` before returning, so
/// per-route filters from different objects accumulate into a disjunction.
/// An item that matches with no filter short-circuits with `(true, none)`.
pub fn match_objects(objects: &[ObjectItem], path: &str) -> MatchResult {
	let mut filters = Vec::new();
	for item in objects {
		match object_outcome(item, path) {
			Outcome::Unconditional => {
				return MatchResult { access: true, le: None };
			},
			Outcome::Filtered(le) => filters.push(le),
			Outcome::NoMatch => {},
		}
	}
	match filters.len() {
		0 => MatchResult { access: false, le: None },
		1 => MatchResult {
			access: true,
			le: Some(filters.into_iter().next().expect("len checked")),
		},
		_ => MatchResult {
			access: true,
			le: Some(LogicalExpression::Or(filters)),
		},
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn route_pattern_matches_acl_dialect_wildcard() {
		let objects = vec![ObjectItem::Route("/shells/*".to_string())];
		let result = match_objects(&objects, "/shells/urn:abc:123");
		assert_eq!(result, MatchResult { access: true, le: None });
	}

	#[test]
	fn identifiable_exact_item_needs_no_residual() {
		let objects = vec![ObjectItem::Identifiable {
			scope: "$aas".to_string(),
			id: IdRef::Concrete("urn:aas1".to_string()),
		}];
		let result = match_objects(&objects, "/shells/urn:aas1");
		assert_eq!(result, MatchResult { access: true, le: None });
	}

	#[test]
	fn identifiable_concrete_id_does_not_match_a_different_item_id() {
		let objects = vec![ObjectItem::Identifiable {
			scope: "$aas".to_string(),
			id: IdRef::Concrete("urn:aas1".to_string()),
		}];
		let result = match_objects(&objects, "/shells/urn:aas2");
		assert_eq!(result, MatchResult { access: false, le: None });
	}

	#[test]
	fn descriptor_wildcard_matches_collection_and_item_unconditionally() {
		let objects = vec![ObjectItem::Descriptor {
			scope: "$aasdesc".to_string(),
			id: IdRef::Wildcard,
		}];
		assert_eq!(
			match_objects(&objects, "/shell-descriptors/anything"),
			MatchResult { access: true, le: None }
		);
		assert_eq!(
			match_objects(&objects, "/shell-descriptors"),
			MatchResult { access: true, le: None }
		);
	}

	#[test]
	fn descriptor_concrete_id_against_collection_route_gets_a_residual_filter() {
		let objects = vec![ObjectItem::Descriptor {
			scope: "$aasdesc".to_string(),
			id: IdRef::Concrete("urn:X".to_string()),
		}];
		let result = match_objects(&objects, "/shell-descriptors");
		assert!(result.access);
		assert_eq!(
			result.le,
			Some(LogicalExpression::Compare(
				CompareOp::Eq,
				Value::Field("$aasdesc#id".to_string()),
				Value::Str("urn:X".to_string()),
			))
		);
	}

	#[test]
	fn descriptor_concrete_id_against_matching_item_route_has_no_residual() {
		let objects = vec![ObjectItem::Descriptor {
			scope: "$aasdesc".to_string(),
			id: IdRef::Concrete("urn:X".to_string()),
		}];
		let result = match_objects(&objects, "/shell-descriptors/urn%3AX");
		assert_eq!(result, MatchResult { access: true, le: None });
	}

	#[test]
	fn referable_matches_submodel_id_and_idshortpath() {
		let objects = vec![ObjectItem::Referable {
			scope: "$sme".to_string(),
			id: IdRef::Concrete("urn:sm1".to_string()),
			id_short_path: "a.b.*".to_string(),
		}];
		assert_eq!(
			match_objects(&objects, "/submodels/urn:sm1/submodel-elements/a/b/c"),
			MatchResult { access: true, le: None }
		);
		assert_eq!(
			match_objects(&objects, "/submodels/urn:sm2/submodel-elements/a/b/c"),
			MatchResult { access: false, le: None }
		);
	}

	#[test]
	fn referable_collection_route_filters_on_submodel_id_and_last_idshort_segment() {
		let objects = vec![ObjectItem::Referable {
			scope: "$sme".to_string(),
			id: IdRef::Concrete("urn:sm1".to_string()),
			id_short_path: "a.b.c".to_string(),
		}];
		let result = match_objects(&objects, "/submodels/urn:sm1/submodel-elements");
		assert!(result.access);
		assert!(matches!(result.le, Some(LogicalExpression::And(_))));
	}

	#[test]
	fn object_with_no_matching_scope_shape_is_false() {
		let objects = vec![ObjectItem::Identifiable {
			scope: "$sm".to_string(),
			id: IdRef::Wildcard,
		}];
		let result = match_objects(&objects, "/shells/urn:aas1");
		assert_eq!(result, MatchResult { access: false, le: None });
	}

	#[test]
	fn multiple_filtered_objects_combine_into_an_or() {
		let objects = vec![
			ObjectItem::Descriptor {
				scope: "$aasdesc".to_string(),
				id: IdRef::Concrete("urn:a".to_string()),
			},
			ObjectItem::Descriptor {
				scope: "$aasdesc".to_string(),
				id: IdRef::Concrete("urn:b".to_string()),
			},
		];
		let result = match_objects(&objects, "/shell-descriptors");
		assert!(result.access);
		assert!(matches!(result.le, Some(LogicalExpression::Or(ref v)) if v.len() == 2));
	}
}
