//! Loads a rule document into a `Model`: resolves every `use*` reference,
//! checks for duplicate/empty definition names, and expands `DEFOBJECTS`
//! chains with cycle detection.

use std::collections::HashMap;

use crate::acl::Acl;
use crate::error::LoadError;
use crate::logical::LogicalExpression;
use crate::object::ObjectItem;
use crate::rule::{
	AclSource, Filter, FormulaSource, MaterializedRule, NamedAcl, NamedAttributes, NamedFormula, NamedObjects,
	ObjectsSpec, RuleDocument, RuleWire,
};
use crate::value::AttributeItem;

struct DefinitionIndex {
	acls: HashMap<String, Acl>,
	attributes: HashMap<String, Vec<AttributeItem>>,
	formulas: HashMap<String, LogicalExpression>,
	objects: HashMap<String, ObjectsSpec>,
}

fn index_by_name<T: Clone>(
	kind: &'static str,
	entries: &[(String, T)],
) -> Result<HashMap<String, T>, LoadError> {
	let mut map = HashMap::with_capacity(entries.len());
	for (name, value) in entries {
		if name.is_empty() {
			return Err(LoadError::EmptyName { kind });
		}
		if map.insert(name.clone(), value.clone()).is_some() {
			return Err(LoadError::DuplicateDefinition {
				kind,
				name: name.clone(),
			});
		}
	}
	Ok(map)
}

impl DefinitionIndex {
	fn build(doc: &RuleDocument) -> Result<Self, LoadError> {
		let acl_entries: Vec<(String, Acl)> = doc
			.def_acls
			.iter()
			.map(|NamedAcl { name, acl }| (name.clone(), acl.clone()))
			.collect();
		let attr_entries: Vec<(String, Vec<AttributeItem>)> = doc
			.def_attributes
			.iter()
			.map(|NamedAttributes { name, attributes }| (name.clone(), attributes.clone()))
			.collect();
		let formula_entries: Vec<(String, LogicalExpression)> = doc
			.def_formulas
			.iter()
			.map(|NamedFormula { name, formula }| (name.clone(), formula.clone()))
			.collect();
		let object_entries: Vec<(String, ObjectsSpec)> = doc
			.def_objects
			.iter()
			.map(|NamedObjects { name, objects }| (name.clone(), objects.clone()))
			.collect();

		Ok(DefinitionIndex {
			acls: index_by_name("DEFACLS", &acl_entries)?,
			attributes: index_by_name("DEFATTRIBUTES", &attr_entries)?,
			formulas: index_by_name("DEFFORMULAS", &formula_entries)?,
			objects: index_by_name("DEFOBJECTS", &object_entries)?,
		})
	}

	fn acl(&self, name: &str) -> Result<&Acl, LoadError> {
		self.acls.get(name).ok_or_else(|| LoadError::UnknownReference {
			kind: "DEFACLS",
			name: name.to_string(),
		})
	}

	fn attributes(&self, name: &str) -> Result<&[AttributeItem], LoadError> {
		self
			.attributes
			.get(name)
			.map(Vec::as_slice)
			.ok_or_else(|| LoadError::UnknownReference {
				kind: "DEFATTRIBUTES",
				name: name.to_string(),
			})
	}

	fn formula(&self, name: &str) -> Result<&LogicalExpression, LoadError> {
		self.formulas.get(name).ok_or_else(|| LoadError::UnknownReference {
			kind: "DEFFORMULAS",
			name: name.to_string(),
		})
	}

	/// Expands a `DEFOBJECTS` reference to its flat item list: the entry's own
	/// inline items followed by each of its `USEOBJECTS` names' expansions, in
	/// order. Follows chains with a DFS seen-set, rejecting cycles.
	fn resolve_objects(&self, name: &str, visiting: &mut Vec<String>) -> Result<Vec<ObjectItem>, LoadError> {
		if visiting.iter().any(|n| n == name) {
			visiting.push(name.to_string());
			return Err(LoadError::CycleInObjects(visiting.join(" -> ")));
		}
		let spec = self.objects.get(name).ok_or_else(|| LoadError::UnknownReference {
			kind: "DEFOBJECTS",
			name: name.to_string(),
		})?;
		visiting.push(name.to_string());
		let mut result = spec.inline.clone();
		for next in &spec.use_objects {
			match self.resolve_objects(next, visiting) {
				Ok(items) => result.extend(items),
				Err(e) => {
					visiting.pop();
					return Err(e);
				},
			}
		}
		visiting.pop();
		Ok(result)
	}
}

fn resolve_acl(index: &DefinitionIndex, source: &AclSource) -> Result<Acl, LoadError> {
	let acl = match source {
		AclSource::Inline(acl) => acl.clone(),
		AclSource::UseAcl(name) => index.acl(name)?.clone(),
	};
	let mut attributes = acl.attributes;
	if let Some(name) = &acl.use_attributes {
		attributes.extend(index.attributes(name)?.iter().cloned());
	}
	Ok(Acl {
		access: acl.access,
		rights: acl.rights,
		attributes,
		use_attributes: None,
	})
}

/// Resolves a rule's (or `DEFOBJECTS` entry's) `objects`/`useObjects` pair:
/// the inline items followed by each referenced group's expansion.
fn resolve_objects(index: &DefinitionIndex, spec: &ObjectsSpec) -> Result<Vec<ObjectItem>, LoadError> {
	let mut result = spec.inline.clone();
	for name in &spec.use_objects {
		let mut visiting = Vec::new();
		result.extend(index.resolve_objects(name, &mut visiting)?);
	}
	Ok(result)
}

fn resolve_formula(index: &DefinitionIndex, source: &FormulaSource) -> Result<LogicalExpression, LoadError> {
	match source {
		FormulaSource::Inline(le) => Ok(le.clone()),
		FormulaSource::UseFormula(name) => index.formula(name).cloned(),
	}
}

fn materialize_rule(index: &DefinitionIndex, wire: &RuleWire) -> Result<MaterializedRule, LoadError> {
	let acl = resolve_acl(index, &wire.acl)?;
	let objects = resolve_objects(index, &wire.objects)?;
	let formula = resolve_formula(index, &wire.formula)?;
	let filters = wire
		.filters
		.iter()
		.map(|f| {
			Ok(Filter {
				fragment: f.fragment.clone(),
				condition: resolve_formula(index, &f.condition)?,
			})
		})
		.collect::<Result<Vec<_>, LoadError>>()?;
	Ok(MaterializedRule {
		acl,
		objects,
		formula,
		filters,
		description: wire.description.clone(),
	})
}

/// Parses and fully materializes a rule document. Rule order in the
/// document is preserved: the authorizer evaluates first-match-wins over
/// `model.rules()` in that order.
pub fn load(bytes: &[u8]) -> Result<crate::rule::Model, LoadError> {
	let doc: RuleDocument = serde_json::from_slice(bytes).map_err(|e| {
		tracing::warn!(error = %e, "rule document failed to parse");
		LoadError::Malformed(e.to_string())
	})?;
	let index = DefinitionIndex::build(&doc).inspect_err(|e| {
		tracing::warn!(error = %e, "rule document failed definition indexing");
	})?;
	let rules = doc
		.rules
		.iter()
		.map(|wire| materialize_rule(&index, wire))
		.collect::<Result<Vec<_>, LoadError>>()
		.inspect_err(|e| {
			tracing::warn!(error = %e, "rule materialization failed");
		})?;
	tracing::debug!(rule_count = rules.len(), "loaded rule document");
	Ok(crate::rule::Model::new(rules))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::acl::{Access, Right};

	fn doc_json(def_objects: serde_json::Value, rule_objects: serde_json::Value) -> Vec<u8> {
		serde_json::json!({
			"AllAccessPermissionRules": {
				"DEFACLS": [],
				"DEFATTRIBUTES": [],
				"DEFFORMULAS": [],
				"DEFOBJECTS": def_objects,
				"rules": [{
					"acl": { "access": "ALLOW", "rights": ["READ"], "attributes": [] },
					"objects": rule_objects.get("objects").cloned().unwrap_or(serde_json::json!([])),
					"USEOBJECTS": rule_objects.get("USEOBJECTS").cloned().unwrap_or(serde_json::json!([])),
					"formula": { "$boolean": true },
				}],
			}
		})
		.to_string()
		.into_bytes()
	}

	#[test]
	fn detects_cycle_in_useobjects_chain() {
		let bytes = doc_json(
			serde_json::json!([
				{ "name": "a", "USEOBJECTS": ["b"] },
				{ "name": "b", "USEOBJECTS": ["a"] },
			]),
			serde_json::json!({ "USEOBJECTS": ["a"] }),
		);
		let err = load(&bytes).unwrap_err();
		assert!(matches!(err, LoadError::CycleInObjects(_)));
	}

	#[test]
	fn resolves_chain_of_useobjects() {
		let bytes = doc_json(
			serde_json::json!([
				{ "name": "a", "objects": [{ "ROUTE": "/shells/*" }] },
				{ "name": "b", "USEOBJECTS": ["a"] },
			]),
			serde_json::json!({ "USEOBJECTS": ["b"] }),
		);
		let model = load(&bytes).unwrap();
		assert_eq!(model.rules().len(), 1);
		assert_eq!(
			model.rules()[0].objects,
			vec![ObjectItem::Route("/shells/*".to_string())]
		);
	}

	#[test]
	fn inline_objects_and_useobjects_both_contribute() {
		let bytes = doc_json(
			serde_json::json!([{ "name": "a", "objects": [{ "ROUTE": "/submodels/*" }] }]),
			serde_json::json!({ "objects": [{ "ROUTE": "/shells/*" }], "USEOBJECTS": ["a"] }),
		);
		let model = load(&bytes).unwrap();
		assert_eq!(
			model.rules()[0].objects,
			vec![
				ObjectItem::Route("/shells/*".to_string()),
				ObjectItem::Route("/submodels/*".to_string()),
			]
		);
	}

	#[test]
	fn rejects_duplicate_definition_names() {
		let bytes = serde_json::json!({
			"AllAccessPermissionRules": {
				"DEFACLS": [
					{ "name": "dup", "acl": { "access": "ALLOW", "rights": ["READ"], "attributes": [] } },
					{ "name": "dup", "acl": { "access": "DISABLED", "rights": ["ALL"], "attributes": [] } },
				],
				"rules": [],
			}
		})
		.to_string()
		.into_bytes();
		assert!(matches!(
			load(&bytes),
			Err(LoadError::DuplicateDefinition { kind: "DEFACLS", .. })
		));
	}

	#[test]
	fn resolves_use_acl_and_use_attributes() {
		let bytes = serde_json::json!({
			"AllAccessPermissionRules": {
				"DEFACLS": [{
					"name": "reader",
					"acl": { "access": "ALLOW", "rights": ["READ"], "useAttributes": "attrs1" },
				}],
				"DEFATTRIBUTES": [{
					"name": "attrs1",
					"attributes": [{ "GLOBAL": "ANONYMOUS" }],
				}],
				"DEFOBJECTS": [],
				"rules": [{
					"useAcl": "reader",
					"objects": [{ "ROUTE": "/shells/*" }],
					"formula": { "$boolean": true },
				}],
			}
		})
		.to_string()
		.into_bytes();
		let model = load(&bytes).unwrap();
		let acl = &model.rules()[0].acl;
		assert_eq!(acl.access, Access::Allow);
		assert_eq!(acl.rights, vec![Right::Read]);
		assert_eq!(acl.attributes.len(), 1);
		assert_eq!(acl.use_attributes, None);
	}

	#[test]
	fn inline_attributes_and_use_attributes_concatenate() {
		let bytes = serde_json::json!({
			"AllAccessPermissionRules": {
				"DEFATTRIBUTES": [{
					"name": "attrs1",
					"attributes": [{ "GLOBAL": "ANONYMOUS" }],
				}],
				"rules": [{
					"acl": {
						"access": "ALLOW",
						"rights": ["READ"],
						"attributes": [{ "CLAIM": "sub" }],
						"useAttributes": "attrs1",
					},
					"objects": [{ "ROUTE": "/shells/*" }],
					"formula": { "$boolean": true },
				}],
			}
		})
		.to_string()
		.into_bytes();
		let model = load(&bytes).unwrap();
		assert_eq!(model.rules()[0].acl.attributes.len(), 2);
	}
}
