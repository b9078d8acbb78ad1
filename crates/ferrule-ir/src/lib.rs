//! Language-neutral intermediate representation for C++ header bindings.
//!
//! The IR is an ordered sequence of [`Item`]s describing the importable
//! declarations of one translation unit, with types already mapped to their
//! dual-sided form ([`MappedType`]). It is a plain value: no references into
//! parser state survive, and it serializes with serde for the downstream
//! binding generator.

mod item;
mod label;
mod types;

pub use item::{
    AccessSpecifier, Comment, Field, Func, FuncParam, Identifier, InstanceMethodMetadata, Item,
    MemberFuncMetadata, Record, ReferenceQualification, SourceLoc, SpecialMemberDefinition,
    SpecialMemberFunc, TypeAlias, UnqualifiedIdentifier, UnsupportedItem,
};
pub use label::{HeaderName, Label};
pub use types::{CcType, DeclId, Lifetime, LifetimeId, MappedType, RsType};

use serde::{Deserialize, Serialize};

/// The complete IR of one translation unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ir {
    /// Public headers of the current target, in configuration order.
    pub used_headers: Vec<HeaderName>,
    /// Build label the bindings are generated for.
    pub current_target: Label,
    /// Items in deterministic source order.
    pub items: Vec<Item>,
}

impl Ir {
    pub fn new(current_target: Label) -> Self {
        Self {
            used_headers: Vec::new(),
            current_target,
            items: Vec::new(),
        }
    }

    /// Iterate over all record items.
    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.items.iter().filter_map(|item| match item {
            Item::Record(record) => Some(record),
            _ => None,
        })
    }

    /// Iterate over all function items.
    pub fn functions(&self) -> impl Iterator<Item = &Func> {
        self.items.iter().filter_map(|item| match item {
            Item::Func(func) => Some(func),
            _ => None,
        })
    }

    /// Iterate over all unsupported items.
    pub fn unsupported_items(&self) -> impl Iterator<Item = &UnsupportedItem> {
        self.items.iter().filter_map(|item| match item {
            Item::Unsupported(unsupported) => Some(unsupported),
            _ => None,
        })
    }
}
