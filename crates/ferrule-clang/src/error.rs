//! Error types for the importer.
//!
//! Errors never abort the traversal: they surface as unsupported items
//! interleaved with successful ones, or cause the offending declaration to be
//! dropped. The variants here are the taxonomy those outcomes are derived
//! from.

use miette::Diagnostic;
use thiserror::Error;

/// Well-known key under which the offending type spelling is carried, so
/// upstream tooling can surface it without parsing the message.
pub const TYPE_STATUS_PAYLOAD_URL: &str =
    "type.googleapis.com/devtools.rust.cc_interop.rs_binding_from_cc.type";

/// Result type for importer operations.
pub type Result<T> = std::result::Result<T, ImportError>;

/// Reasons a declaration or one of its parts cannot be imported.
#[derive(Error, Diagnostic, Debug, Clone, PartialEq, Eq)]
pub enum ImportError {
    /// A C++ type the type mapper cannot translate.
    #[error("Unsupported type '{spelling}'")]
    #[diagnostic(code(ferrule::unsupported_type))]
    UnsupportedType { spelling: String },

    /// A declaration form outside the supported subset (nested records,
    /// unions, templates, namespace contents, by-value passing of records
    /// that are not passable in registers).
    #[error("{message}")]
    #[diagnostic(code(ferrule::unsupported_construct))]
    UnsupportedConstruct { message: String },

    /// An empty or otherwise untranslatable declaration name.
    #[error("Cannot translate name for field '{name}'")]
    #[diagnostic(code(ferrule::unresolvable_name))]
    UnresolvableName { name: String },

    /// The record lacks a complete definition, so no layout exists.
    #[error("No layout available without a complete definition")]
    #[diagnostic(code(ferrule::layout_unavailable))]
    LayoutUnavailable,
}

impl ImportError {
    pub fn unsupported_type(spelling: impl Into<String>) -> Self {
        Self::UnsupportedType {
            spelling: spelling.into(),
        }
    }

    pub fn unsupported_construct(message: impl Into<String>) -> Self {
        Self::UnsupportedConstruct {
            message: message.into(),
        }
    }

    /// The payload carried for unsupported types, keyed by
    /// [`TYPE_STATUS_PAYLOAD_URL`].
    pub fn payload(&self) -> Option<(&'static str, &str)> {
        match self {
            ImportError::UnsupportedType { spelling } => {
                Some((TYPE_STATUS_PAYLOAD_URL, spelling))
            }
            _ => None,
        }
    }
}
