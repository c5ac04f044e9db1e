//! Error types for the rule-document loading and materialization path.
//!
//! Evaluation and simplification are total functions and never return an
//! error (see `eval` and `simplify`); only loading a document can fail.

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum LoadError {
	#[error("malformed rule document: {0}")]
	Malformed(String),

	#[error("rule {index}: exactly one of acl/useAcl must be set")]
	AclXor { index: usize },

	#[error("rule {index}: exactly one of formula/useFormula must be set")]
	FormulaXor { index: usize },

	#[error("rule {rule_index}, filter {filter_index}: exactly one of condition/useFormula must be set")]
	FilterXor {
		rule_index: usize,
		filter_index: usize,
	},

	#[error("rule {rule_index}, filter {filter_index}: fragment is required")]
	FilterMissingFragment {
		rule_index: usize,
		filter_index: usize,
	},

	#[error("unknown {kind} reference: {name}")]
	UnknownReference { kind: &'static str, name: String },

	#[error("cycle in useObjects: {0}")]
	CycleInObjects(String),

	#[error("duplicate {kind} definition: {name}")]
	DuplicateDefinition { kind: &'static str, name: String },

	#[error("empty {kind} definition name")]
	EmptyName { kind: &'static str },

	#[error("invalid hex literal: {0}")]
	InvalidHex(String),

	#[error("invalid time literal: {0}")]
	InvalidTime(String),

	#[error("invalid date-time literal: {0}")]
	InvalidDateTime(String),

	#[error("invalid field reference: {0}")]
	InvalidField(String),

	#[error("invalid attribute item: {0}")]
	InvalidAttributeItem(String),

	#[error("invalid object item: {0}")]
	InvalidObjectItem(String),

	#[error("invalid value: {0}")]
	InvalidValue(String),

	#[error("logical expression list must have at least two children: {0}")]
	EmptyExpressionList(&'static str),
}

impl serde::de::Error for LoadError {
	fn custom<T: std::fmt::Display>(msg: T) -> Self {
		LoadError::Malformed(msg.to_string())
	}
}
