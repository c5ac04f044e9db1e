//! `ObjectItem` — the grammar the object matcher (`matcher` module) expands
//! against a request path.

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::error::LoadError;

/// An identifier that is either concrete or the wildcard marker (`"*"` on
/// the wire, matching any value of that scope).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum IdRef {
	Concrete(String),
	Wildcard,
}

impl IdRef {
	pub fn is_all(&self) -> bool {
		matches!(self, IdRef::Wildcard)
	}

	fn from_json(v: &Json) -> Result<Self, LoadError> {
		// Both `{"isAll": true}` and the literal wildcard string `"*"` are
		// accepted; concrete ids are plain strings.
		if let Some(obj) = v.as_object() {
			let is_all = obj
				.get("isAll")
				.and_then(Json::as_bool)
				.ok_or_else(|| LoadError::InvalidObjectItem("id object must have isAll".to_string()))?;
			return if is_all {
				Ok(IdRef::Wildcard)
			} else {
				Err(LoadError::InvalidObjectItem(
					"id object with isAll=false is not meaningful".to_string(),
				))
			};
		}
		let s = v
			.as_str()
			.ok_or_else(|| LoadError::InvalidObjectItem("id must be a string or isAll object".to_string()))?;
		Ok(if s == "*" {
			IdRef::Wildcard
		} else {
			IdRef::Concrete(s.to_string())
		})
	}

	fn to_json(&self) -> Json {
		match self {
			IdRef::Concrete(s) => Json::String(s.clone()),
			IdRef::Wildcard => serde_json::json!({ "isAll": true }),
		}
	}
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ObjectItem {
	Route(String),
	Identifiable {
		scope: String,
		id: IdRef,
	},
	/// `scope` is always `$sme`. `id` is the owning submodel's identifier
	/// (concrete or wildcard); `id_short_path` addresses the element within it.
	Referable {
		scope: String,
		id: IdRef,
		id_short_path: String,
	},
	Descriptor {
		scope: String,
		id: IdRef,
	},
	Fragment(String),
}

impl ObjectItem {
	pub fn from_json(v: &Json) -> Result<Self, LoadError> {
		let obj = v
			.as_object()
			.ok_or_else(|| LoadError::InvalidObjectItem("object item must be an object".to_string()))?;
		if obj.len() != 1 {
			return Err(LoadError::InvalidObjectItem(
				"object item must have exactly one of ROUTE|IDENTIFIABLE|REFERABLE|DESCRIPTOR|FRAGMENT"
					.to_string(),
			));
		}
		let (key, val) = obj.iter().next().expect("len checked above");
		match key.as_str() {
			"ROUTE" => Ok(ObjectItem::Route(
				val
					.as_str()
					.ok_or_else(|| LoadError::InvalidObjectItem("ROUTE value must be a string".to_string()))?
					.to_string(),
			)),
			"IDENTIFIABLE" => {
				let o = val_obj(val, "IDENTIFIABLE")?;
				Ok(ObjectItem::Identifiable {
					scope: field_str(o, "scope")?,
					id: IdRef::from_json(field(o, "id")?)?,
				})
			},
			"REFERABLE" => {
				let o = val_obj(val, "REFERABLE")?;
				Ok(ObjectItem::Referable {
					scope: field_str(o, "scope")?,
					id: IdRef::from_json(field(o, "id")?)?,
					id_short_path: field_str(o, "idShortPath")?,
				})
			},
			"DESCRIPTOR" => {
				let o = val_obj(val, "DESCRIPTOR")?;
				Ok(ObjectItem::Descriptor {
					scope: field_str(o, "scope")?,
					id: IdRef::from_json(field(o, "id")?)?,
				})
			},
			"FRAGMENT" => Ok(ObjectItem::Fragment(
				val
					.as_str()
					.ok_or_else(|| LoadError::InvalidObjectItem("FRAGMENT value must be a string".to_string()))?
					.to_string(),
			)),
			other => Err(LoadError::InvalidObjectItem(format!(
				"unknown object item key {other}"
			))),
		}
	}

	pub fn to_json(&self) -> Json {
		match self {
			ObjectItem::Route(p) => serde_json::json!({ "ROUTE": p }),
			ObjectItem::Identifiable { scope, id } => {
				serde_json::json!({ "IDENTIFIABLE": { "scope": scope, "id": id.to_json() } })
			},
			ObjectItem::Referable {
				scope,
				id,
				id_short_path,
			} => {
				serde_json::json!({ "REFERABLE": { "scope": scope, "id": id.to_json(), "idShortPath": id_short_path } })
			},
			ObjectItem::Descriptor { scope, id } => {
				serde_json::json!({ "DESCRIPTOR": { "scope": scope, "id": id.to_json() } })
			},
			ObjectItem::Fragment(path) => serde_json::json!({ "FRAGMENT": path }),
		}
	}
}

fn val_obj<'a>(v: &'a Json, key: &'static str) -> Result<&'a serde_json::Map<String, Json>, LoadError> {
	v
		.as_object()
		.ok_or_else(|| LoadError::InvalidObjectItem(format!("{key} value must be an object")))
}

fn field<'a>(o: &'a serde_json::Map<String, Json>, name: &'static str) -> Result<&'a Json, LoadError> {
	o
		.get(name)
		.ok_or_else(|| LoadError::InvalidObjectItem(format!("missing field {name}")))
}

fn field_str(o: &serde_json::Map<String, Json>, name: &'static str) -> Result<String, LoadError> {
	field(o, name)?
		.as_str()
		.map(str::to_string)
		.ok_or_else(|| LoadError::InvalidObjectItem(format!("field {name} must be a string")))
}

impl<'de> Deserialize<'de> for ObjectItem {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: serde::Deserializer<'de>,
	{
		let v = Json::deserialize(deserializer)?;
		ObjectItem::from_json(&v).map_err(serde::de::Error::custom)
	}
}

impl Serialize for ObjectItem {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: serde::Serializer,
	{
		self.to_json().serialize(serializer)
	}
}
