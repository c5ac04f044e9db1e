//! `FragmentPath` — the `$scope#field[index].sub` addressing grammar a
//! filter's `FRAGMENT` carries, and a `QueryFilter`'s per-fragment map keys
//! on (see `filter` module).

use std::fmt;

use crate::error::LoadError;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PathSegment {
	Index(usize),
	Field(String),
}

/// A parsed fragment path: `$scope#field[0].sub.path`. Round-trips through
/// `Display` back to its original wire form.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FragmentPath {
	pub scope: String,
	pub field: String,
	pub segments: Vec<PathSegment>,
}

impl FragmentPath {
	pub fn parse(s: &str) -> Result<Self, LoadError> {
		let bad = || LoadError::Malformed(format!("invalid fragment path: {s}"));
		let (scope, rest) = s.split_once('#').ok_or_else(bad)?;
		if !scope.starts_with('$') || scope.len() < 2 {
			return Err(bad());
		}

		let field_end = rest
			.find(['[', '.'])
			.unwrap_or(rest.len());
		let field = &rest[..field_end];
		if field.is_empty() {
			return Err(bad());
		}
		let mut cursor = &rest[field_end..];
		let mut segments = Vec::new();
		while !cursor.is_empty() {
			if let Some(stripped) = cursor.strip_prefix('[') {
				let close = stripped.find(']').ok_or_else(bad)?;
				let idx: usize = stripped[..close].parse().map_err(|_| bad())?;
				segments.push(PathSegment::Index(idx));
				cursor = &stripped[close + 1..];
			} else if let Some(stripped) = cursor.strip_prefix('.') {
				let next_boundary = stripped.find(['[', '.']).unwrap_or(stripped.len());
				let name = &stripped[..next_boundary];
				if name.is_empty() {
					return Err(bad());
				}
				segments.push(PathSegment::Field(name.to_string()));
				cursor = &stripped[next_boundary..];
			} else {
				return Err(bad());
			}
		}

		Ok(FragmentPath {
			scope: scope.to_string(),
			field: field.to_string(),
			segments,
		})
	}
}

impl fmt::Display for FragmentPath {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}#{}", self.scope, self.field)?;
		for seg in &self.segments {
			match seg {
				PathSegment::Index(i) => write!(f, "[{i}]")?,
				PathSegment::Field(name) => write!(f, ".{name}")?,
			}
		}
		Ok(())
	}
}
