//! End-to-end authorization scenarios driven through the public API: load a
//! document, authorize a request, check the decision and residual filter.

use abac_engine::{AuthorizerOptions, Claims, EvalInput, LogicalExpression, ModelStore};

fn store_for(document: serde_json::Value) -> ModelStore {
	let model = abac_engine::load(document.to_string().as_bytes()).expect("document loads");
	ModelStore::new(model)
}

fn input(method: &str, path: &str, claims: Claims) -> EvalInput {
	EvalInput {
		method: method.to_string(),
		path: path.to_string(),
		claims,
	}
}

#[test]
fn anonymous_can_read_shell_descriptors() {
	let store = store_for(serde_json::json!({
		"AllAccessPermissionRules": {
			"rules": [{
				"acl": { "access": "ALLOW", "rights": ["READ"], "attributes": [{ "GLOBAL": "ANONYMOUS" }] },
				"objects": [{ "DESCRIPTOR": { "scope": "$aasdesc", "id": "*" } }],
				"formula": { "$boolean": true },
			}],
		}
	}));

	let decision = abac_engine::store::authorize_with_filter(
		&store,
		&input("GET", "/shell-descriptors/urn:aas:1", Claims::new()),
		&AuthorizerOptions::default(),
	);

	assert!(decision.allow);
	assert_eq!(decision.reason, "ALLOW by rule");
	assert!(decision.filter.unwrap().formula.is_none());
}

#[test]
fn claim_gated_read_leaves_a_residual_filter_on_the_owner_field() {
	let store = store_for(serde_json::json!({
		"AllAccessPermissionRules": {
			"rules": [{
				"acl": { "access": "ALLOW", "rights": ["READ"], "attributes": [{ "CLAIM": "sub" }] },
				"objects": [{ "IDENTIFIABLE": { "scope": "$sm", "id": "*" } }],
				"formula": { "$eq": [{ "$field": "$sm#owner" }, { "$attribute": { "CLAIM": "sub" } }] },
			}],
		}
	}));

	let mut claims = Claims::new();
	claims.0.insert("sub".to_string(), serde_json::json!("alice"));

	let decision = abac_engine::store::authorize_with_filter(
		&store,
		&input("GET", "/submodels/urn:sm:1", claims),
		&AuthorizerOptions::default(),
	);

	assert!(decision.allow);
	let filter = decision.filter.unwrap();
	// The claim side folds to a literal, but the field side survives as a
	// residual comparison a downstream query layer still has to apply.
	match filter.formula {
		Some(LogicalExpression::Compare(..)) => {},
		other => panic!("expected a residual compare, got {other:?}"),
	}
}

#[test]
fn descriptor_expansion_wildcard_id_matches_any_concrete_request() {
	let store = store_for(serde_json::json!({
		"AllAccessPermissionRules": {
			"rules": [{
				"acl": { "access": "ALLOW", "rights": ["READ"], "attributes": [{ "GLOBAL": "ANONYMOUS" }] },
				"objects": [{ "DESCRIPTOR": { "scope": "$smdesc", "id": "*" } }],
				"formula": { "$boolean": true },
			}],
		}
	}));

	for id in ["urn:sm:1", "urn:sm:2", "anything-at-all"] {
		let decision = abac_engine::store::authorize_with_filter(
			&store,
			&input("GET", &format!("/submodel-descriptors/{id}"), Claims::new()),
			&AuthorizerOptions::default(),
		);
		assert!(decision.allow, "expected wildcard descriptor to match {id}");
	}
}

#[test]
fn descriptor_expansion_concrete_id_rejects_other_ids() {
	let store = store_for(serde_json::json!({
		"AllAccessPermissionRules": {
			"rules": [{
				"acl": { "access": "ALLOW", "rights": ["READ"], "attributes": [{ "GLOBAL": "ANONYMOUS" }] },
				"objects": [{ "DESCRIPTOR": { "scope": "$aasdesc", "id": "urn:aas:known" } }],
				"formula": { "$boolean": true },
			}],
		}
	}));

	let matched = abac_engine::store::authorize_with_filter(
		&store,
		&input("GET", "/shell-descriptors/urn:aas:known", Claims::new()),
		&AuthorizerOptions::default(),
	);
	assert!(matched.allow);
	assert!(matched.filter.unwrap().formula.is_none());

	let unmatched = abac_engine::store::authorize_with_filter(
		&store,
		&input("GET", "/shell-descriptors/urn:aas:other", Claims::new()),
		&AuthorizerOptions::default(),
	);
	assert!(!unmatched.allow);
	assert_eq!(unmatched.reason, "no matching rule");
}

#[test]
fn descriptor_expansion_concrete_id_against_collection_route_gets_a_residual_filter() {
	let store = store_for(serde_json::json!({
		"AllAccessPermissionRules": {
			"rules": [{
				"acl": { "access": "ALLOW", "rights": ["READ"], "attributes": [{ "GLOBAL": "ANONYMOUS" }] },
				"objects": [{ "DESCRIPTOR": { "scope": "$aasdesc", "id": "urn:aas:known" } }],
				"formula": { "$boolean": true },
			}],
		}
	}));

	let decision = abac_engine::store::authorize_with_filter(
		&store,
		&input("GET", "/shell-descriptors", Claims::new()),
		&AuthorizerOptions::default(),
	);
	assert!(decision.allow);
	match decision.filter.unwrap().formula {
		Some(LogicalExpression::Compare(..)) => {},
		other => panic!("expected a residual equality filter, got {other:?}"),
	}
}

#[test]
fn disabled_rule_denies_regardless_of_rights_or_attributes() {
	let store = store_for(serde_json::json!({
		"AllAccessPermissionRules": {
			"rules": [{
				"acl": { "access": "DISABLED", "rights": ["ALL"], "attributes": [{ "GLOBAL": "ANONYMOUS" }] },
				"objects": [{ "ROUTE": "/shells/*" }],
				"formula": { "$boolean": true },
			}],
		}
	}));

	let decision = abac_engine::store::authorize_with_filter(
		&store,
		&input("GET", "/shells/urn:aas:1", Claims::new()),
		&AuthorizerOptions::default(),
	);
	assert!(!decision.allow);
	assert_eq!(decision.reason, "rule matched but disabled");
}

#[test]
fn first_match_wins_skips_a_later_broader_rule() {
	let store = store_for(serde_json::json!({
		"AllAccessPermissionRules": {
			"rules": [
				{
					"acl": { "access": "DISABLED", "rights": ["READ"], "attributes": [{ "GLOBAL": "ANONYMOUS" }] },
					"objects": [{ "ROUTE": "/shells/*" }],
					"formula": { "$boolean": true },
				},
				{
					"acl": { "access": "ALLOW", "rights": ["ALL"], "attributes": [{ "GLOBAL": "ANONYMOUS" }] },
					"objects": [{ "ROUTE": "/shells/*" }],
					"formula": { "$boolean": true },
				},
			],
		}
	}));

	// The first rule matches object+rights+attributes and is DISABLED, so
	// the request is denied even though a later rule would have allowed it.
	let decision = abac_engine::store::authorize_with_filter(
		&store,
		&input("GET", "/shells/urn:aas:1", Claims::new()),
		&AuthorizerOptions::default(),
	);
	assert!(!decision.allow);
	assert_eq!(decision.reason, "rule matched but disabled");
}

#[test]
fn reload_swaps_the_whole_model_atomically() {
	let store = store_for(serde_json::json!({
		"AllAccessPermissionRules": { "rules": [] }
	}));
	let deny = abac_engine::store::authorize_with_filter(
		&store,
		&input("GET", "/shells/urn:aas:1", Claims::new()),
		&AuthorizerOptions::default(),
	);
	assert_eq!(deny.reason, "no matching rule");

	let reloaded = abac_engine::load(
		serde_json::json!({
			"AllAccessPermissionRules": {
				"rules": [{
					"acl": { "access": "ALLOW", "rights": ["READ"], "attributes": [{ "GLOBAL": "ANONYMOUS" }] },
					"objects": [{ "ROUTE": "/shells/*" }],
					"formula": { "$boolean": true },
				}],
			}
		})
		.to_string()
		.as_bytes(),
	)
	.unwrap();
	store.set(reloaded);

	let allow = abac_engine::store::authorize_with_filter(
		&store,
		&input("GET", "/shells/urn:aas:1", Claims::new()),
		&AuthorizerOptions::default(),
	);
	assert!(allow.allow);
}

#[test]
fn referable_element_route_and_collection_route_both_resolve() {
	let store = store_for(serde_json::json!({
		"AllAccessPermissionRules": {
			"rules": [{
				"acl": { "access": "ALLOW", "rights": ["READ"], "attributes": [{ "GLOBAL": "ANONYMOUS" }] },
				"objects": [{ "REFERABLE": { "scope": "$sme", "id": "urn:sm:1", "idShortPath": "a.b.c" } }],
				"formula": { "$boolean": true },
			}],
		}
	}));

	let exact = abac_engine::store::authorize_with_filter(
		&store,
		&input("GET", "/submodels/urn:sm:1/submodel-elements/a/b/c", Claims::new()),
		&AuthorizerOptions::default(),
	);
	assert!(exact.allow);
	assert!(exact.filter.unwrap().formula.is_none());

	let collection = abac_engine::store::authorize_with_filter(
		&store,
		&input("GET", "/submodels/urn:sm:1/submodel-elements", Claims::new()),
		&AuthorizerOptions::default(),
	);
	assert!(collection.allow);
	assert!(collection.filter.unwrap().formula.is_some());
}
