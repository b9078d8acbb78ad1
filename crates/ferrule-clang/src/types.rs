//! Translation of C++ types into their dual-sided mapped form.

use crate::ast::{BuiltinKind, DeclIdx, QualType, TypeKind};
use crate::context::AstContext;
use crate::error::{ImportError, Result};
use crate::names;
use ferrule_ir::{DeclId, LifetimeId, MappedType};
use rustc_hash::FxHashSet;

/// The fixed table of C++ standard types with a dedicated target-language
/// equivalent. These spellings are handled before anything else and are never
/// desugared, so e.g. `size_t` stays `usize` instead of decaying to its
/// underlying integer.
pub fn well_known_rs_name(spelling: &str) -> Option<&'static str> {
    let rs_name = match spelling {
        "ptrdiff_t" | "intptr_t" | "std::ptrdiff_t" | "std::intptr_t" => "isize",
        "size_t" | "uintptr_t" | "std::size_t" | "std::uintptr_t" => "usize",

        "int8_t" | "std::int8_t" => "i8",
        "int16_t" | "std::int16_t" => "i16",
        "int32_t" | "std::int32_t" => "i32",
        "int64_t" | "std::int64_t" => "i64",

        "uint8_t" | "std::uint8_t" => "u8",
        "uint16_t" | "std::uint16_t" => "u16",
        "uint32_t" | "std::uint32_t" => "u32",
        "uint64_t" | "std::uint64_t" => "u64",

        // char32_t and wchar_t cannot map to the target's char type, which
        // only holds valid scalar values.
        "char16_t" => "u16",
        "char32_t" => "u32",
        "wchar_t" => "i32",
        _ => return None,
    };
    Some(rs_name)
}

/// Maps qualified C++ types to [`MappedType`]s, resolving record and typedef
/// references against the set of declarations imported so far.
pub struct TypeMapper<'a> {
    ctx: &'a AstContext,
    /// Canonical indices of type declarations known to the importer.
    known_type_decls: &'a FxHashSet<DeclIdx>,
}

impl<'a> TypeMapper<'a> {
    pub fn new(
        ctx: &'a AstContext,
        known_type_decls: &'a FxHashSet<DeclIdx>,
    ) -> Self {
        Self {
            ctx,
            known_type_decls,
        }
    }

    /// Translate `ty`. `lifetimes`, when present, is consumed from the back
    /// as pointer/reference layers are peeled, so the annotation tool's
    /// outermost-last order lines up with the peeling order. `nullable`
    /// applies to the outermost pointer only; inner recursions are
    /// non-nullable.
    pub fn map(
        &self,
        ty: &QualType,
        mut lifetimes: Option<Vec<LifetimeId>>,
        nullable: bool,
    ) -> Result<MappedType> {
        let tu = self.ctx.translation_unit();
        // Qualifiers are handled separately, so the lookup spelling drops
        // them.
        let type_string = tu.unqualified_type_spelling(ty);

        let mut mapped: Option<MappedType> = None;
        if let Some(rs_name) = well_known_rs_name(&type_string) {
            mapped = Some(MappedType::simple(rs_name, type_string.clone()));
        } else {
            match &ty.kind {
                TypeKind::Pointer(pointee) => {
                    let lifetime = pop_lifetime(&mut lifetimes);
                    if let Ok(pointee) = self.map(pointee, lifetimes.take(), false) {
                        mapped = Some(MappedType::pointer_to(pointee, lifetime, nullable));
                    }
                }
                TypeKind::LValueReference(pointee) => {
                    let lifetime = pop_lifetime(&mut lifetimes);
                    if let Ok(pointee) = self.map(pointee, lifetimes.take(), false) {
                        mapped = Some(MappedType::lvalue_reference_to(pointee, lifetime));
                    }
                }
                // Rvalue references have no target-side representation.
                TypeKind::RValueReference(_) => {}
                TypeKind::Builtin(builtin) => match builtin {
                    BuiltinKind::Bool => mapped = Some(MappedType::simple("bool", "bool")),
                    BuiltinKind::Float => mapped = Some(MappedType::simple("f32", "float")),
                    BuiltinKind::Double => mapped = Some(MappedType::simple("f64", "double")),
                    BuiltinKind::Void => mapped = Some(MappedType::void_()),
                    _ if builtin.is_integer() => {
                        if let Some(size @ (8 | 16 | 32 | 64)) = builtin.bit_width() {
                            let sign = if builtin.is_signed_integer() { 'i' } else { 'u' };
                            mapped = Some(MappedType::simple(
                                format!("{sign}{size}"),
                                type_string.clone(),
                            ));
                        }
                    }
                    _ => {}
                },
                TypeKind::Record(decl) => {
                    let canonical = self.ctx.canonical(*decl);
                    if self.known_type_decls.contains(&canonical) {
                        mapped = self.decl_reference(canonical);
                    }
                }
                TypeKind::Typedef(decl) => {
                    let canonical = self.ctx.canonical(*decl);
                    if self.known_type_decls.contains(&canonical) {
                        mapped = self.decl_reference(canonical);
                    }
                }
            }
        }

        let mut mapped = mapped.ok_or_else(|| ImportError::unsupported_type(type_string))?;
        // Propagate cv-qualification into the C++ side only; volatile has no
        // target-side meaning and is ignored.
        mapped.cc_type.is_const = ty.is_const;
        Ok(mapped)
    }

    fn decl_reference(&self, canonical: DeclIdx) -> Option<MappedType> {
        let identifier = names::translated_identifier(self.ctx.decl(canonical))?;
        let decl_id: DeclId = self.ctx.decl_id(canonical);
        Some(MappedType::with_decl_id(identifier.ident(), decl_id))
    }
}

fn pop_lifetime(lifetimes: &mut Option<Vec<LifetimeId>>) -> Option<LifetimeId> {
    lifetimes.as_mut().map(|stack| {
        stack
            .pop()
            .expect("lifetime annotations must cover every pointer layer")
    })
}
