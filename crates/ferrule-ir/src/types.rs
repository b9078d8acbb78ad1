//! Dual-sided type representation.
//!
//! A [`MappedType`] pairs the C++ view and the target-language view of the
//! same abstract type. The two sides are constructed together and stay
//! structurally parallel: both are non-pointers, or both are pointers with
//! parallel pointees, and their type-parameter arity always matches.

use serde::{Deserialize, Serialize};

/// Opaque integer identifying a canonical declaration within one translation
/// unit. Any injective mapping from canonical declarations suffices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeclId(pub u64);

/// Stable identifier of a lifetime within one translation unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LifetimeId(pub u32);

/// A named lifetime parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lifetime {
    pub name: String,
    pub id: LifetimeId,
}

/// The C++ side of a mapped type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CcType {
    /// Type name, or `"*"` / `"&"` for pointers and references.
    pub name: String,
    /// Whether the type is const-qualified on the C++ side.
    pub is_const: bool,
    pub type_params: Vec<CcType>,
    /// Set iff the type refers to an imported declaration.
    pub decl_id: Option<DeclId>,
}

/// The target-language side of a mapped type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RsType {
    /// Type name, or `"*mut"` / `"*const"` / `"&mut"` / `"&"` for wrappers.
    pub name: String,
    /// Lifetimes applying to this layer, outermost first.
    pub lifetime_args: Vec<LifetimeId>,
    pub type_params: Vec<RsType>,
    /// Set iff the type refers to an imported declaration.
    pub decl_id: Option<DeclId>,
}

/// Paired C++-side and target-side descriptions of one abstract type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappedType {
    pub cc_type: CcType,
    pub rs_type: RsType,
}

impl MappedType {
    /// A leaf type with no parameters and no declaration reference.
    pub fn simple(rs_name: impl Into<String>, cc_name: impl Into<String>) -> Self {
        Self {
            cc_type: CcType {
                name: cc_name.into(),
                is_const: false,
                type_params: Vec::new(),
                decl_id: None,
            },
            rs_type: RsType {
                name: rs_name.into(),
                lifetime_args: Vec::new(),
                type_params: Vec::new(),
                decl_id: None,
            },
        }
    }

    /// The void type.
    pub fn void_() -> Self {
        Self::simple("()", "void")
    }

    /// A reference to an imported declaration, carrying the same id on both
    /// sides.
    pub fn with_decl_id(name: impl Into<String>, decl_id: DeclId) -> Self {
        let name = name.into();
        Self {
            cc_type: CcType {
                name: name.clone(),
                is_const: false,
                type_params: Vec::new(),
                decl_id: Some(decl_id),
            },
            rs_type: RsType {
                name,
                lifetime_args: Vec::new(),
                type_params: Vec::new(),
                decl_id: Some(decl_id),
            },
        }
    }

    /// A pointer wrapping `pointee`. The target side spells `*const` for
    /// const pointees and `*mut` otherwise. `nullable` applies to this layer
    /// only and is currently not encoded in the representation.
    pub fn pointer_to(pointee: MappedType, lifetime: Option<LifetimeId>, _nullable: bool) -> Self {
        let rs_name = if pointee.cc_type.is_const {
            "*const"
        } else {
            "*mut"
        };
        Self::wrap(pointee, "*", rs_name, lifetime)
    }

    /// An lvalue reference wrapping `pointee`; non-nullable by contract.
    pub fn lvalue_reference_to(pointee: MappedType, lifetime: Option<LifetimeId>) -> Self {
        let rs_name = if pointee.cc_type.is_const {
            "&"
        } else {
            "&mut"
        };
        Self::wrap(pointee, "&", rs_name, lifetime)
    }

    fn wrap(
        pointee: MappedType,
        cc_name: &str,
        rs_name: &str,
        lifetime: Option<LifetimeId>,
    ) -> Self {
        Self {
            cc_type: CcType {
                name: cc_name.to_string(),
                is_const: false,
                type_params: vec![pointee.cc_type],
                decl_id: None,
            },
            rs_type: RsType {
                name: rs_name.to_string(),
                lifetime_args: lifetime.into_iter().collect(),
                type_params: vec![pointee.rs_type],
                decl_id: None,
            },
        }
    }

    /// Whether this is the void type.
    pub fn is_void(&self) -> bool {
        self.rs_type.name == "()"
    }
}
