//! Resource identifiers
//!
//! Azure Resource Manager addresses every resource with a hierarchical path
//! such as `/subscriptions/{id}/resourceGroups/{name}/providers/Microsoft.Web/sites/{name}`.
//! Each identifier type in this module declares its path template as an
//! ordered list of [`Segment`]s; parsing and formatting are driven entirely by
//! that template.
//!
//! # Module Structure
//!
//! - [`web`] - App Service identifiers (sites, slots, plans, environments)
//! - [`identity`] - Managed identity identifiers

pub mod identity;
pub mod web;

pub use identity::UserAssignedIdentityId;
pub use web::{AppServiceEnvironmentId, FunctionAppId, FunctionAppSlotId, ServicePlanId};

use thiserror::Error;

/// One segment of an identifier template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    /// A literal keyword that must appear verbatim (e.g. `resourceGroups`)
    Static(&'static str),
    /// A user-supplied value, named for error messages
    Value(&'static str),
}

/// Errors raised while parsing an identifier
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IdParseError {
    #[error("parsing {kind} ID {input:?}: ID was empty")]
    Empty { kind: &'static str, input: String },

    #[error("parsing {kind} ID {input:?}: ID must start with '/'")]
    MissingLeadingSlash { kind: &'static str, input: String },

    #[error("parsing {kind} ID {input:?}: expected {expected} segments but got {actual}")]
    SegmentCount {
        kind: &'static str,
        input: String,
        expected: usize,
        actual: usize,
    },

    #[error("parsing {kind} ID {input:?}: expected the literal segment {expected:?} at position {position} but got {actual:?}")]
    UnexpectedLiteral {
        kind: &'static str,
        input: String,
        position: usize,
        expected: &'static str,
        actual: String,
    },

    #[error("parsing {kind} ID {input:?}: the segment {name:?} was empty")]
    EmptyValue {
        kind: &'static str,
        input: String,
        name: &'static str,
    },
}

/// A typed, hierarchical resource identifier
///
/// Implementors only describe their template and how to move values in and
/// out; [`ResourceId::id`], [`ResourceId::parse`] and
/// [`ResourceId::parse_insensitively`] are shared.
pub trait ResourceId: Sized {
    /// Human readable kind used in error messages, e.g. `Function App Slot`
    const KIND: &'static str;

    /// The path template, in order
    fn segments() -> &'static [Segment];

    /// Build the identifier from the [`Segment::Value`] entries, in template order
    fn from_values(values: Vec<String>) -> Self;

    /// The [`Segment::Value`] entries, in template order
    fn values(&self) -> Vec<&str>;

    /// Canonical path string
    fn id(&self) -> String {
        let mut values = self.values().into_iter();
        let mut out = String::new();
        for segment in Self::segments() {
            out.push('/');
            match segment {
                Segment::Static(literal) => out.push_str(literal),
                Segment::Value(_) => out.push_str(values.next().unwrap_or_default()),
            }
        }
        out
    }

    /// Parse a canonical path; literal segments are matched case-sensitively
    fn parse(input: &str) -> Result<Self, IdParseError> {
        parse_segments::<Self>(input, false).map(Self::from_values)
    }

    /// Parse a path whose literal segments may have been re-cased by the API
    fn parse_insensitively(input: &str) -> Result<Self, IdParseError> {
        parse_segments::<Self>(input, true).map(Self::from_values)
    }
}

fn parse_segments<T: ResourceId>(input: &str, insensitive: bool) -> Result<Vec<String>, IdParseError> {
    let kind = T::KIND;
    if input.is_empty() {
        return Err(IdParseError::Empty {
            kind,
            input: input.to_string(),
        });
    }
    let Some(rest) = input.strip_prefix('/') else {
        return Err(IdParseError::MissingLeadingSlash {
            kind,
            input: input.to_string(),
        });
    };

    let parts: Vec<&str> = rest.split('/').collect();
    let template = T::segments();
    if parts.len() != template.len() {
        return Err(IdParseError::SegmentCount {
            kind,
            input: input.to_string(),
            expected: template.len(),
            actual: parts.len(),
        });
    }

    let mut values = Vec::new();
    for (position, (segment, part)) in template.iter().zip(parts).enumerate() {
        match segment {
            Segment::Static(literal) => {
                let matches = if insensitive {
                    literal.eq_ignore_ascii_case(part)
                } else {
                    *literal == part
                };
                if !matches {
                    return Err(IdParseError::UnexpectedLiteral {
                        kind,
                        input: input.to_string(),
                        position,
                        expected: literal,
                        actual: part.to_string(),
                    });
                }
            }
            Segment::Value(name) => {
                if part.is_empty() {
                    return Err(IdParseError::EmptyValue {
                        kind,
                        input: input.to_string(),
                        name,
                    });
                }
                values.push(part.to_string());
            }
        }
    }

    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_leading_slash_is_rejected() {
        let err = FunctionAppId::parse("subscriptions/s/resourceGroups/rg/providers/Microsoft.Web/sites/app")
            .unwrap_err();
        assert!(matches!(err, IdParseError::MissingLeadingSlash { .. }));
    }

    #[test]
    fn test_empty_input_is_rejected() {
        assert!(matches!(
            FunctionAppId::parse(""),
            Err(IdParseError::Empty { .. })
        ));
    }

    #[test]
    fn test_empty_value_segment_is_rejected() {
        let err = FunctionAppId::parse("/subscriptions//resourceGroups/rg/providers/Microsoft.Web/sites/app")
            .unwrap_err();
        assert_eq!(
            err,
            IdParseError::EmptyValue {
                kind: "Function App",
                input: "/subscriptions//resourceGroups/rg/providers/Microsoft.Web/sites/app".to_string(),
                name: "subscription_id",
            }
        );
    }

    #[test]
    fn test_trailing_slash_changes_segment_count() {
        let err = FunctionAppId::parse("/subscriptions/s/resourceGroups/rg/providers/Microsoft.Web/sites/app/")
            .unwrap_err();
        assert!(matches!(err, IdParseError::SegmentCount { expected: 8, actual: 9, .. }));
    }
}
