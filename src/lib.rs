//! Attribute-based access control engine for the Asset Administration Shell
//! repository/registry APIs: loads a rule document, materializes every
//! `USE*` reference, and authorizes `(method, path, claims)` requests
//! against it, producing a residual `QueryFilter` for data the ACL alone
//! doesn't fully decide.

pub mod acl;
pub mod attrs;
pub mod claims;
pub mod error;
pub mod eval;
pub mod filter;
pub mod fragment;
pub mod loader;
pub mod logical;
pub mod matcher;
pub mod object;
pub mod pattern;
pub mod rights;
pub mod rule;
pub mod simplify;
pub mod store;
pub mod value;

pub use acl::{Access, Acl, Right};
pub use claims::{ClaimScalar, Claims};
pub use error::LoadError;
pub use filter::QueryFilter;
pub use fragment::{FragmentPath, PathSegment};
pub use logical::{CompareOp, LogicalExpression, StringOp};
pub use object::{IdRef, ObjectItem};
pub use rule::{Filter, MaterializedRule, Model};
pub use store::{AuthorizationDecision, AuthorizerOptions, EvalInput, ModelStore};
pub use value::{AttributeItem, CastKind, DateComponent, GlobalToken, HexValue, StringValue, TimeOfDay, Value};

/// Parses and materializes a rule document in one call.
pub fn load(document: &[u8]) -> Result<Model, LoadError> {
	loader::load(document)
}
