//! Declaration-name translation.
//!
//! Constructors and destructors become sentinels rather than strings, so they
//! can never collide with user functions that happen to be called
//! "constructor". Unnamed parameters get synthesized `__param_<index>` names
//! so downstream code generation is total.

use crate::ast::{Decl, DeclName, FieldDecl, ParamDecl};
use ferrule_ir::{Identifier, UnqualifiedIdentifier};

/// Translate an ordinary declaration name. `None` for empty names and for
/// special names (operators, conversion functions).
pub fn translated_identifier(decl: &Decl) -> Option<Identifier> {
    match &decl.name {
        DeclName::Identifier(name) if !name.is_empty() => Some(Identifier::new(name.clone())),
        _ => None,
    }
}

/// Translate a function name, mapping constructors and destructors to their
/// sentinels. `None` drops the declaration (operators and other special
/// names are not supported).
pub fn translated_unqualified_name(decl: &Decl) -> Option<UnqualifiedIdentifier> {
    match &decl.name {
        DeclName::Identifier(_) => {
            translated_identifier(decl).map(UnqualifiedIdentifier::Identifier)
        }
        DeclName::Constructor => Some(UnqualifiedIdentifier::Constructor),
        DeclName::Destructor => Some(UnqualifiedIdentifier::Destructor),
        DeclName::Other(_) => None,
    }
}

/// The identifier of a parameter, synthesizing `__param_<index>` for unnamed
/// ones.
pub fn param_identifier(param: &ParamDecl, index: usize) -> Identifier {
    if param.name.is_empty() {
        Identifier::new(format!("__param_{index}"))
    } else {
        Identifier::new(param.name.clone())
    }
}

/// The identifier of a field; `None` for unnamed fields.
pub fn field_identifier(field: &FieldDecl) -> Option<Identifier> {
    if field.name.is_empty() {
        None
    } else {
        Some(Identifier::new(field.name.clone()))
    }
}
