//! Wire-level rule document grammar, and the materialized forms the loader
//! (`loader` module) reduces it to.
//!
//! A `RuleDocument` carries four definition tables (`DEFACLS`,
//! `DEFATTRIBUTES`, `DEFFORMULAS`, `DEFOBJECTS`) plus an ordered rule list.
//! Every `use*` reference a rule or a filter carries is resolved away by
//! materialization; a `MaterializedRule` is always fully inline.

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::acl::Acl;
use crate::error::LoadError;
use crate::logical::LogicalExpression;
use crate::object::ObjectItem;
use crate::value::AttributeItem;

#[derive(Clone, Debug, PartialEq)]
pub struct NamedAcl {
	pub name: String,
	pub acl: Acl,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NamedAttributes {
	pub name: String,
	pub attributes: Vec<AttributeItem>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NamedFormula {
	pub name: String,
	pub formula: LogicalExpression,
}

/// `objects` and `useObjects` are not mutually exclusive: both may be empty,
/// or both may contribute. The resolved list is `inline` followed by each
/// `useObjects` name's expansion, in order (see `loader::resolve_objects`).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ObjectsSpec {
	pub inline: Vec<ObjectItem>,
	pub use_objects: Vec<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NamedObjects {
	pub name: String,
	pub objects: ObjectsSpec,
}

#[derive(Clone, Debug, PartialEq)]
pub enum AclSource {
	Inline(Acl),
	UseAcl(String),
}

#[derive(Clone, Debug, PartialEq)]
pub enum FormulaSource {
	Inline(LogicalExpression),
	UseFormula(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct FilterWire {
	pub fragment: String,
	pub condition: FormulaSource,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RuleWire {
	pub acl: AclSource,
	pub objects: ObjectsSpec,
	pub formula: FormulaSource,
	pub filters: Vec<FilterWire>,
	pub description: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RuleDocument {
	pub def_acls: Vec<NamedAcl>,
	pub def_attributes: Vec<NamedAttributes>,
	pub def_formulas: Vec<NamedFormula>,
	pub def_objects: Vec<NamedObjects>,
	pub rules: Vec<RuleWire>,
}

/// A rule after every `use*` reference has been resolved to its inline
/// definition. The authorizer only ever evaluates `MaterializedRule`s.
#[derive(Clone, Debug, PartialEq)]
pub struct MaterializedRule {
	pub acl: Acl,
	pub objects: Vec<ObjectItem>,
	pub formula: LogicalExpression,
	pub filters: Vec<Filter>,
	pub description: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Filter {
	pub fragment: String,
	pub condition: LogicalExpression,
}

/// A loaded, materialized rule set, in document order. First match wins, so
/// order is load-bearing and preserved end to end.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Model {
	rules: Vec<MaterializedRule>,
}

impl Model {
	pub fn new(rules: Vec<MaterializedRule>) -> Self {
		Model { rules }
	}

	pub fn rules(&self) -> &[MaterializedRule] {
		&self.rules
	}
}

fn obj<'a>(v: &'a Json, what: &'static str) -> Result<&'a serde_json::Map<String, Json>, LoadError> {
	v
		.as_object()
		.ok_or_else(|| LoadError::Malformed(format!("{what} must be an object")))
}

fn str_field(o: &serde_json::Map<String, Json>, key: &'static str) -> Result<String, LoadError> {
	o
		.get(key)
		.and_then(Json::as_str)
		.map(str::to_string)
		.ok_or_else(|| LoadError::Malformed(format!("missing string field {key}")))
}

impl NamedAcl {
	fn from_json(v: &Json) -> Result<Self, LoadError> {
		let o = obj(v, "DEFACLS entry")?;
		Ok(NamedAcl {
			name: str_field(o, "name")?,
			acl: Acl::from_json(
				o
					.get("acl")
					.ok_or_else(|| LoadError::Malformed("DEFACLS entry missing acl".to_string()))?,
			)?,
		})
	}

	fn to_json(&self) -> Json {
		serde_json::json!({ "name": self.name, "acl": self.acl.to_json() })
	}
}

impl NamedAttributes {
	fn from_json(v: &Json) -> Result<Self, LoadError> {
		let o = obj(v, "DEFATTRIBUTES entry")?;
		let attrs = o
			.get("attributes")
			.and_then(Json::as_array)
			.ok_or_else(|| LoadError::Malformed("DEFATTRIBUTES entry missing attributes".to_string()))?;
		Ok(NamedAttributes {
			name: str_field(o, "name")?,
			attributes: attrs.iter().map(AttributeItem::from_json).collect::<Result<_, _>>()?,
		})
	}

	fn to_json(&self) -> Json {
		serde_json::json!({
			"name": self.name,
			"attributes": self.attributes.iter().map(AttributeItem::to_json).collect::<Vec<_>>(),
		})
	}
}

impl NamedFormula {
	fn from_json(v: &Json) -> Result<Self, LoadError> {
		let o = obj(v, "DEFFORMULAS entry")?;
		Ok(NamedFormula {
			name: str_field(o, "name")?,
			formula: LogicalExpression::from_json(
				o
					.get("formula")
					.ok_or_else(|| LoadError::Malformed("DEFFORMULAS entry missing formula".to_string()))?,
			)?,
		})
	}

	fn to_json(&self) -> Json {
		serde_json::json!({ "name": self.name, "formula": self.formula.to_json() })
	}
}

impl NamedObjects {
	fn from_json(v: &Json) -> Result<Self, LoadError> {
		let o = obj(v, "DEFOBJECTS entry")?;
		let name = str_field(o, "name")?;
		let objects = parse_objects_spec(o, "DEFOBJECTS entry")?;
		Ok(NamedObjects { name, objects })
	}

	fn to_json(&self) -> Json {
		let mut map = serde_json::Map::new();
		map.insert("name".to_string(), Json::String(self.name.clone()));
		objects_spec_into(&self.objects, &mut map);
		Json::Object(map)
	}
}

/// `objects` and `USEOBJECTS` are independent, optional fields: either, both,
/// or neither may be present. Neither present resolves to an empty list.
fn parse_objects_spec(o: &serde_json::Map<String, Json>, what: &'static str) -> Result<ObjectsSpec, LoadError> {
	let inline = match o.get("objects") {
		Some(arr) => arr
			.as_array()
			.ok_or_else(|| LoadError::Malformed(format!("{what} objects must be an array")))?
			.iter()
			.map(ObjectItem::from_json)
			.collect::<Result<_, _>>()?,
		None => Vec::new(),
	};
	let use_objects = match o.get("USEOBJECTS") {
		Some(arr) => arr
			.as_array()
			.ok_or_else(|| LoadError::Malformed(format!("{what} USEOBJECTS must be an array")))?
			.iter()
			.map(|n| {
				n
					.as_str()
					.map(str::to_string)
					.ok_or_else(|| LoadError::Malformed(format!("{what} USEOBJECTS entries must be strings")))
			})
			.collect::<Result<_, _>>()?,
		None => Vec::new(),
	};
	Ok(ObjectsSpec { inline, use_objects })
}

fn objects_spec_into(spec: &ObjectsSpec, map: &mut serde_json::Map<String, Json>) {
	if !spec.inline.is_empty() {
		map.insert(
			"objects".to_string(),
			Json::Array(spec.inline.iter().map(ObjectItem::to_json).collect()),
		);
	}
	if !spec.use_objects.is_empty() {
		map.insert(
			"USEOBJECTS".to_string(),
			Json::Array(spec.use_objects.iter().cloned().map(Json::String).collect()),
		);
	}
}

fn parse_acl_source(o: &serde_json::Map<String, Json>, index: usize) -> Result<AclSource, LoadError> {
	let inline = o.get("acl");
	let use_acl = o.get("useAcl");
	match (inline, use_acl) {
		(Some(v), None) => Ok(AclSource::Inline(Acl::from_json(v)?)),
		(None, Some(name)) => Ok(AclSource::UseAcl(
			name
				.as_str()
				.ok_or_else(|| LoadError::Malformed("useAcl must be a string".to_string()))?
				.to_string(),
		)),
		_ => Err(LoadError::AclXor { index }),
	}
}

fn parse_formula_source_rule(o: &serde_json::Map<String, Json>, index: usize) -> Result<FormulaSource, LoadError> {
	let inline = o.get("formula");
	let use_formula = o.get("useFormula");
	match (inline, use_formula) {
		(Some(v), None) => Ok(FormulaSource::Inline(LogicalExpression::from_json(v)?)),
		(None, Some(name)) => Ok(FormulaSource::UseFormula(
			name
				.as_str()
				.ok_or_else(|| LoadError::Malformed("useFormula must be a string".to_string()))?
				.to_string(),
		)),
		_ => Err(LoadError::FormulaXor { index }),
	}
}

fn parse_formula_source_filter(
	o: &serde_json::Map<String, Json>,
	rule_index: usize,
	filter_index: usize,
) -> Result<FormulaSource, LoadError> {
	let inline = o.get("condition");
	let use_formula = o.get("useFormula");
	match (inline, use_formula) {
		(Some(v), None) => Ok(FormulaSource::Inline(LogicalExpression::from_json(v)?)),
		(None, Some(name)) => Ok(FormulaSource::UseFormula(
			name
				.as_str()
				.ok_or_else(|| LoadError::Malformed("useFormula must be a string".to_string()))?
				.to_string(),
		)),
		_ => Err(LoadError::FilterXor {
			rule_index,
			filter_index,
		}),
	}
}

impl FilterWire {
	fn from_json(v: &Json, rule_index: usize, filter_index: usize) -> Result<Self, LoadError> {
		let o = obj(v, "filter")?;
		let fragment = o
			.get("fragment")
			.and_then(Json::as_str)
			.map(str::to_string)
			.ok_or_else(|| LoadError::FilterMissingFragment {
				rule_index,
				filter_index,
			})?;
		if fragment.is_empty() {
			return Err(LoadError::FilterMissingFragment {
				rule_index,
				filter_index,
			});
		}
		Ok(FilterWire {
			fragment,
			condition: parse_formula_source_filter(o, rule_index, filter_index)?,
		})
	}

	fn to_json(&self) -> Json {
		let mut map = serde_json::Map::new();
		map.insert("fragment".to_string(), Json::String(self.fragment.clone()));
		match &self.condition {
			FormulaSource::Inline(le) => {
				map.insert("condition".to_string(), le.to_json());
			},
			FormulaSource::UseFormula(name) => {
				map.insert("useFormula".to_string(), Json::String(name.clone()));
			},
		}
		Json::Object(map)
	}
}

/// Parses the filter list: the current `filterList` array plus a legacy
/// singular `filter` object, concatenated in that order.
fn parse_filters(o: &serde_json::Map<String, Json>, rule_index: usize) -> Result<Vec<FilterWire>, LoadError> {
	let mut filters = match o.get("filterList") {
		Some(arr) => arr
			.as_array()
			.ok_or_else(|| LoadError::Malformed("filterList must be an array".to_string()))?
			.iter()
			.enumerate()
			.map(|(i, f)| FilterWire::from_json(f, rule_index, i))
			.collect::<Result<Vec<_>, _>>()?,
		None => Vec::new(),
	};
	if let Some(legacy) = o.get("filter") {
		filters.push(FilterWire::from_json(legacy, rule_index, filters.len())?);
	}
	Ok(filters)
}

impl RuleWire {
	fn from_json(v: &Json, index: usize) -> Result<Self, LoadError> {
		let o = obj(v, "rule")?;
		let acl = parse_acl_source(o, index)?;
		let objects = parse_objects_spec(o, "rule")?;
		let formula = parse_formula_source_rule(o, index)?;
		let filters = parse_filters(o, index)?;
		// Tolerated but ignored: a human-facing description carries no
		// evaluation semantics.
		let description = o.get("description").and_then(Json::as_str).map(str::to_string);
		Ok(RuleWire {
			acl,
			objects,
			formula,
			filters,
			description,
		})
	}

	fn to_json(&self) -> Json {
		let mut map = serde_json::Map::new();
		match &self.acl {
			AclSource::Inline(acl) => {
				map.insert("acl".to_string(), acl.to_json());
			},
			AclSource::UseAcl(name) => {
				map.insert("useAcl".to_string(), Json::String(name.clone()));
			},
		}
		objects_spec_into(&self.objects, &mut map);
		match &self.formula {
			FormulaSource::Inline(le) => {
				map.insert("formula".to_string(), le.to_json());
			},
			FormulaSource::UseFormula(name) => {
				map.insert("useFormula".to_string(), Json::String(name.clone()));
			},
		}
		if !self.filters.is_empty() {
			map.insert(
				"filterList".to_string(),
				Json::Array(self.filters.iter().map(FilterWire::to_json).collect()),
			);
		}
		if let Some(d) = &self.description {
			map.insert("description".to_string(), Json::String(d.clone()));
		}
		Json::Object(map)
	}
}

impl RuleDocument {
	pub fn from_json(v: &Json) -> Result<Self, LoadError> {
		let root = obj(v, "rule document")?;
		let envelope = obj(
			root
				.get("AllAccessPermissionRules")
				.ok_or_else(|| LoadError::Malformed("missing AllAccessPermissionRules envelope".to_string()))?,
			"AllAccessPermissionRules",
		)?;

		let def_acls = match envelope.get("DEFACLS") {
			Some(arr) => parse_array(arr, "DEFACLS", NamedAcl::from_json)?,
			None => Vec::new(),
		};
		let def_attributes = match envelope.get("DEFATTRIBUTES") {
			Some(arr) => parse_array(arr, "DEFATTRIBUTES", NamedAttributes::from_json)?,
			None => Vec::new(),
		};
		let def_formulas = match envelope.get("DEFFORMULAS") {
			Some(arr) => parse_array(arr, "DEFFORMULAS", NamedFormula::from_json)?,
			None => Vec::new(),
		};
		let def_objects = match envelope.get("DEFOBJECTS") {
			Some(arr) => parse_array(arr, "DEFOBJECTS", NamedObjects::from_json)?,
			None => Vec::new(),
		};
		let rules_json = envelope
			.get("rules")
			.and_then(Json::as_array)
			.ok_or_else(|| LoadError::Malformed("missing rules array".to_string()))?;
		let rules = rules_json
			.iter()
			.enumerate()
			.map(|(i, r)| RuleWire::from_json(r, i))
			.collect::<Result<_, _>>()?;

		Ok(RuleDocument {
			def_acls,
			def_attributes,
			def_formulas,
			def_objects,
			rules,
		})
	}

	pub fn to_json(&self) -> Json {
		serde_json::json!({
			"AllAccessPermissionRules": {
				"DEFACLS": self.def_acls.iter().map(NamedAcl::to_json).collect::<Vec<_>>(),
				"DEFATTRIBUTES": self.def_attributes.iter().map(NamedAttributes::to_json).collect::<Vec<_>>(),
				"DEFFORMULAS": self.def_formulas.iter().map(NamedFormula::to_json).collect::<Vec<_>>(),
				"DEFOBJECTS": self.def_objects.iter().map(NamedObjects::to_json).collect::<Vec<_>>(),
				"rules": self.rules.iter().map(RuleWire::to_json).collect::<Vec<_>>(),
			}
		})
	}
}

fn parse_array<T>(v: &Json, key: &'static str, f: impl Fn(&Json) -> Result<T, LoadError>) -> Result<Vec<T>, LoadError> {
	v
		.as_array()
		.ok_or_else(|| LoadError::Malformed(format!("{key} must be an array")))?
		.iter()
		.map(f)
		.collect()
}

impl<'de> Deserialize<'de> for RuleDocument {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: serde::Deserializer<'de>,
	{
		let v = Json::deserialize(deserializer)?;
		RuleDocument::from_json(&v).map_err(serde::de::Error::custom)
	}
}

impl Serialize for RuleDocument {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: serde::Serializer,
	{
		self.to_json().serialize(serializer)
	}
}
