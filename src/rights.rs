//! The static route table mapping an HTTP method + path to the rights a
//! request needs, used to pick the `required_rights` an authorization
//! check tests an ACL against.

use crate::acl::Right;
use crate::pattern::{ant_regex, normalize_path};

struct RouteRule {
	method: &'static str,
	pattern: &'static str,
	rights: &'static [Right],
}

const READ: &[Right] = &[Right::Read];
const CREATE: &[Right] = &[Right::Create];
const UPDATE: &[Right] = &[Right::Update];
const DELETE: &[Right] = &[Right::Delete];
const EXECUTE: &[Right] = &[Right::Execute];

/// Route shapes for the Asset Administration Shell repository/registry
/// APIs: shell and submodel descriptors, shells, submodels and their
/// elements, concept descriptions.
const ROUTES: &[RouteRule] = &[
	RouteRule {
		method: "GET",
		pattern: "/shell-descriptors",
		rights: READ,
	},
	RouteRule {
		method: "GET",
		pattern: "/shell-descriptors/*",
		rights: READ,
	},
	RouteRule {
		method: "POST",
		pattern: "/shell-descriptors",
		rights: CREATE,
	},
	RouteRule {
		method: "PUT",
		pattern: "/shell-descriptors/*",
		rights: UPDATE,
	},
	RouteRule {
		method: "DELETE",
		pattern: "/shell-descriptors/*",
		rights: DELETE,
	},
	RouteRule {
		method: "GET",
		pattern: "/submodel-descriptors",
		rights: READ,
	},
	RouteRule {
		method: "GET",
		pattern: "/submodel-descriptors/*",
		rights: READ,
	},
	RouteRule {
		method: "POST",
		pattern: "/submodel-descriptors",
		rights: CREATE,
	},
	RouteRule {
		method: "PUT",
		pattern: "/submodel-descriptors/*",
		rights: UPDATE,
	},
	RouteRule {
		method: "DELETE",
		pattern: "/submodel-descriptors/*",
		rights: DELETE,
	},
	RouteRule {
		method: "GET",
		pattern: "/shells",
		rights: READ,
	},
	RouteRule {
		method: "GET",
		pattern: "/shells/*",
		rights: READ,
	},
	RouteRule {
		method: "POST",
		pattern: "/shells",
		rights: CREATE,
	},
	RouteRule {
		method: "PUT",
		pattern: "/shells/*",
		rights: UPDATE,
	},
	RouteRule {
		method: "DELETE",
		pattern: "/shells/*",
		rights: DELETE,
	},
	RouteRule {
		method: "GET",
		pattern: "/submodels",
		rights: READ,
	},
	RouteRule {
		method: "GET",
		pattern: "/submodels/*",
		rights: READ,
	},
	RouteRule {
		method: "POST",
		pattern: "/submodels",
		rights: CREATE,
	},
	RouteRule {
		method: "PUT",
		pattern: "/submodels/*",
		rights: UPDATE,
	},
	RouteRule {
		method: "DELETE",
		pattern: "/submodels/*",
		rights: DELETE,
	},
	RouteRule {
		method: "GET",
		pattern: "/submodels/*/submodel-elements/**",
		rights: READ,
	},
	// More specific than the generic submodel-elements write rules below;
	// must come first since `required_rights` takes the first match.
	RouteRule {
		method: "POST",
		pattern: "/submodels/*/submodel-elements/**/invoke",
		rights: EXECUTE,
	},
	RouteRule {
		method: "POST",
		pattern: "/submodels/*/submodel-elements/**",
		rights: CREATE,
	},
	RouteRule {
		method: "PUT",
		pattern: "/submodels/*/submodel-elements/**",
		rights: UPDATE,
	},
	RouteRule {
		method: "DELETE",
		pattern: "/submodels/*/submodel-elements/**",
		rights: DELETE,
	},
	RouteRule {
		method: "GET",
		pattern: "/concept-descriptions",
		rights: READ,
	},
	RouteRule {
		method: "GET",
		pattern: "/concept-descriptions/*",
		rights: READ,
	},
	RouteRule {
		method: "POST",
		pattern: "/concept-descriptions",
		rights: CREATE,
	},
	RouteRule {
		method: "PUT",
		pattern: "/concept-descriptions/*",
		rights: UPDATE,
	},
	RouteRule {
		method: "DELETE",
		pattern: "/concept-descriptions/*",
		rights: DELETE,
	},
];

/// Maps `(method, path)` to the rights required for that request, after
/// stripping `base_path` and normalizing. Returns the matched rule's
/// canonical ANT pattern alongside the rights, for diagnostics and for the
/// object matcher to key on.
pub fn required_rights(method: &str, path: &str, base_path: &str) -> Option<(&'static [Right], String)> {
	let stripped = path.strip_prefix(base_path).unwrap_or(path);
	let normalized = normalize_path(stripped);
	ROUTES
		.iter()
		.find(|r| r.method.eq_ignore_ascii_case(method) && ant_regex(r.pattern).is_match(&normalized))
		.map(|r| (r.rights, r.pattern.to_string()))
}

/// The default right for a method with no route-table entry: `GET` reads,
/// `POST` creates, `PUT`/`PATCH` update, `DELETE` deletes. Any other method
/// has no sensible default.
pub fn fallback_right(method: &str) -> Option<&'static [Right]> {
	if method.eq_ignore_ascii_case("GET") {
		Some(READ)
	} else if method.eq_ignore_ascii_case("POST") {
		Some(CREATE)
	} else if method.eq_ignore_ascii_case("PUT") || method.eq_ignore_ascii_case("PATCH") {
		Some(UPDATE)
	} else if method.eq_ignore_ascii_case("DELETE") {
		Some(DELETE)
	} else {
		None
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn matches_submodel_element_write_with_execute_override() {
		let (rights, pattern) = required_rights("POST", "/submodels/urn:sm1/submodel-elements/a.b/invoke", "").unwrap();
		assert_eq!(rights, EXECUTE);
		assert_eq!(pattern, "/submodels/*/submodel-elements/**/invoke");
	}

	#[test]
	fn strips_base_path_before_matching() {
		let (rights, _) = required_rights("GET", "/api/v1/shells", "/api/v1").unwrap();
		assert_eq!(rights, READ);
	}

	#[test]
	fn unknown_route_is_none() {
		assert!(required_rights("GET", "/nonexistent", "").is_none());
	}

	#[test]
	fn fallback_right_maps_each_method_to_its_default() {
		assert_eq!(fallback_right("GET"), Some(READ));
		assert_eq!(fallback_right("POST"), Some(CREATE));
		assert_eq!(fallback_right("PUT"), Some(UPDATE));
		assert_eq!(fallback_right("PATCH"), Some(UPDATE));
		assert_eq!(fallback_right("DELETE"), Some(DELETE));
		assert_eq!(fallback_right("OPTIONS"), None);
	}
}
