//! IR items and their payloads.

use crate::label::Label;
use crate::types::{DeclId, Lifetime, MappedType};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An ordinary (non-special) declaration name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identifier(String);

impl Identifier {
    pub fn new(ident: impl Into<String>) -> Self {
        let ident = ident.into();
        debug_assert!(!ident.is_empty(), "identifiers must be non-empty");
        Self(ident)
    }

    pub fn ident(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A function name: an ordinary identifier, or a constructor/destructor
/// sentinel. Sentinels cannot collide with user functions that happen to be
/// called "constructor".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnqualifiedIdentifier {
    Identifier(Identifier),
    Constructor,
    Destructor,
}

/// C++ member access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessSpecifier {
    Public,
    Protected,
    Private,
}

/// How a special member function is defined, if at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecialMemberDefinition {
    /// Implicitly defined or explicitly defaulted, and trivially generated.
    Trivial,
    /// User-defined, or defaulted but not trivially generated.
    Nontrivial,
    /// Explicitly or implicitly deleted; the member is not callable.
    Deleted,
}

/// A copy constructor, move constructor or destructor of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialMemberFunc {
    pub definition: SpecialMemberDefinition,
    pub access: AccessSpecifier,
}

/// Source position of a declaration; `./` filename prefixes are stripped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLoc {
    pub filename: String,
    pub line: u32,
    pub column: u32,
}

/// Reference qualification of an instance method (`&`, `&&`, or none).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceQualification {
    LValue,
    RValue,
    Unqualified,
}

/// Facts about an instance method beyond its signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceMethodMetadata {
    pub reference: ReferenceQualification,
    pub is_const: bool,
    pub is_virtual: bool,
}

/// Facts identifying a function as a member of a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberFuncMetadata {
    pub record_id: DeclId,
    /// `None` for static member functions.
    pub instance_method_metadata: Option<InstanceMethodMetadata>,
}

/// A function parameter. Instance methods carry a leading synthetic `__this`
/// parameter; unnamed parameters become `__param_0`, `__param_1`, …
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuncParam {
    #[serde(rename = "type")]
    pub type_: MappedType,
    pub identifier: Identifier,
}

/// An importable function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Func {
    pub name: UnqualifiedIdentifier,
    pub owning_target: Label,
    pub doc_comment: Option<String>,
    pub mangled_name: String,
    pub return_type: MappedType,
    pub params: Vec<FuncParam>,
    /// Sorted by lifetime name.
    pub lifetime_params: Vec<Lifetime>,
    pub is_inline: bool,
    pub member_func_metadata: Option<MemberFuncMetadata>,
    pub source_loc: SourceLoc,
}

/// A record field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub identifier: Identifier,
    pub doc_comment: Option<String>,
    #[serde(rename = "type")]
    pub type_: MappedType,
    pub access: AccessSpecifier,
    /// Offset from the start of the record, in bits.
    pub offset: u64,
}

/// An importable struct or class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub identifier: Identifier,
    pub id: DeclId,
    pub owning_target: Label,
    pub doc_comment: Option<String>,
    /// In declaration order, offsets strictly matching the platform layout.
    pub fields: Vec<Field>,
    /// Size in bytes.
    pub size: u64,
    /// Alignment in bytes.
    pub alignment: u64,
    pub copy_constructor: SpecialMemberFunc,
    pub move_constructor: SpecialMemberFunc,
    pub destructor: SpecialMemberFunc,
    /// Whether the record is passable in registers per the platform ABI.
    /// Independent of whether the copy constructor is trivial.
    pub is_trivial_abi: bool,
    pub is_final: bool,
}

/// An importable type alias.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeAlias {
    pub identifier: Identifier,
    pub id: DeclId,
    pub owning_target: Label,
    pub underlying_type: MappedType,
}

/// A comment not attached to any imported declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub text: String,
}

/// Emitted in place of a declaration that could not be imported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsupportedItem {
    /// Qualified name of the offending declaration.
    pub name: String,
    pub message: String,
    pub source_loc: SourceLoc,
}

/// One element of the emitted IR sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Item {
    Func(Func),
    Record(Record),
    TypeAlias(TypeAlias),
    Comment(Comment),
    Unsupported(UnsupportedItem),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_serialization_shape() {
        let item = Item::Comment(Comment {
            text: "hello".to_string(),
        });
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["comment"]["text"], "hello");
    }

    #[test]
    fn test_special_member_serialization() {
        let func = SpecialMemberFunc {
            definition: SpecialMemberDefinition::Trivial,
            access: AccessSpecifier::Public,
        };
        let json = serde_json::to_value(func).unwrap();
        assert_eq!(json["definition"], "trivial");
        assert_eq!(json["access"], "public");
    }
}
