//! `Acl` — the rights/attribute-gate pair a rule (or a `DEFACLS` definition)
//! carries. `attributes` and `useAttributes` are not mutually exclusive: a
//! materialized rule's attribute list is the inline items followed by the
//! resolved `useAttributes` group (see `loader::resolve_acl`).

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::error::LoadError;
use crate::value::AttributeItem;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Right {
	Create,
	Read,
	Update,
	Delete,
	Execute,
	View,
	Tree,
	All,
}

impl Right {
	fn wire_key(self) -> &'static str {
		match self {
			Right::Create => "CREATE",
			Right::Read => "READ",
			Right::Update => "UPDATE",
			Right::Delete => "DELETE",
			Right::Execute => "EXECUTE",
			Right::View => "VIEW",
			Right::Tree => "TREE",
			Right::All => "ALL",
		}
	}

	fn parse(s: &str) -> Result<Self, LoadError> {
		match s {
			"CREATE" => Ok(Right::Create),
			"READ" => Ok(Right::Read),
			"UPDATE" => Ok(Right::Update),
			"DELETE" => Ok(Right::Delete),
			"EXECUTE" => Ok(Right::Execute),
			"VIEW" => Ok(Right::View),
			"TREE" => Ok(Right::Tree),
			"ALL" => Ok(Right::All),
			other => Err(LoadError::Malformed(format!("unknown right {other}"))),
		}
	}
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Access {
	Allow,
	Disabled,
}

impl Access {
	fn wire_key(self) -> &'static str {
		match self {
			Access::Allow => "ALLOW",
			Access::Disabled => "DISABLED",
		}
	}

	fn parse(s: &str) -> Result<Self, LoadError> {
		match s {
			"ALLOW" => Ok(Access::Allow),
			"DISABLED" => Ok(Access::Disabled),
			other => Err(LoadError::Malformed(format!("unknown access value {other}"))),
		}
	}
}

/// An `Acl` as it appears inline on a rule or inside a `DEFACLS` entry.
/// `attributes` is always present (possibly empty); `useAttributes` is an
/// optional name whose resolved group is concatenated after it.
/// Materialization (`loader::resolve_acl`) resolves `useAttributes` away, so
/// a `MaterializedRule`'s acl always carries `useAttributes: None`.
#[derive(Clone, Debug, PartialEq)]
pub struct Acl {
	pub access: Access,
	pub rights: Vec<Right>,
	pub attributes: Vec<AttributeItem>,
	pub use_attributes: Option<String>,
}

impl Acl {
	pub fn from_json(v: &Json) -> Result<Self, LoadError> {
		let o = v
			.as_object()
			.ok_or_else(|| LoadError::Malformed("acl must be an object".to_string()))?;
		let access = o
			.get("access")
			.and_then(Json::as_str)
			.ok_or_else(|| LoadError::Malformed("acl missing access".to_string()))
			.and_then(Access::parse)?;
		let rights = o
			.get("rights")
			.and_then(Json::as_array)
			.ok_or_else(|| LoadError::Malformed("acl missing rights".to_string()))?
			.iter()
			.map(|r| {
				r
					.as_str()
					.ok_or_else(|| LoadError::Malformed("rights entries must be strings".to_string()))
					.and_then(Right::parse)
			})
			.collect::<Result<Vec<_>, _>>()?;

		let attributes = match o.get("attributes") {
			Some(arr) => arr
				.as_array()
				.ok_or_else(|| LoadError::Malformed("attributes must be an array".to_string()))?
				.iter()
				.map(AttributeItem::from_json)
				.collect::<Result<Vec<_>, _>>()?,
			None => Vec::new(),
		};
		let use_attributes = match o.get("useAttributes") {
			Some(name) => Some(
				name
					.as_str()
					.ok_or_else(|| LoadError::Malformed("useAttributes must be a string".to_string()))?
					.to_string(),
			),
			None => None,
		};

		Ok(Acl {
			access,
			rights,
			attributes,
			use_attributes,
		})
	}

	pub fn to_json(&self) -> Json {
		let mut map = serde_json::Map::new();
		map.insert("access".to_string(), Json::String(self.access.wire_key().to_string()));
		map.insert(
			"rights".to_string(),
			Json::Array(
				self
					.rights
					.iter()
					.map(|r| Json::String(r.wire_key().to_string()))
					.collect(),
			),
		);
		if !self.attributes.is_empty() {
			map.insert(
				"attributes".to_string(),
				Json::Array(self.attributes.iter().map(AttributeItem::to_json).collect()),
			);
		}
		if let Some(name) = &self.use_attributes {
			map.insert("useAttributes".to_string(), Json::String(name.clone()));
		}
		Json::Object(map)
	}
}

impl<'de> Deserialize<'de> for Acl {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: serde::Deserializer<'de>,
	{
		let v = Json::deserialize(deserializer)?;
		Acl::from_json(&v).map_err(serde::de::Error::custom)
	}
}

impl Serialize for Acl {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: serde::Serializer,
	{
		self.to_json().serialize(serializer)
	}
}
