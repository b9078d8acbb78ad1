//! Itanium name mangling for the supported declaration subset.
//!
//! Constructors and destructors mangle as their complete-object variants
//! (`C1`/`D1`): those construct or destroy the entire object, which is what a
//! caller of the binding wants. The base (`C2`/`D2`) and deleting (`D0`)
//! variants are never emitted.

use crate::ast::{BuiltinKind, DeclIdx, DeclKind, DeclName, QualType, TranslationUnit, TypeKind};

/// Produce the platform mangled name of a function declaration.
pub fn mangled_name(tu: &TranslationUnit, idx: DeclIdx) -> String {
    let decl = tu.decl(idx);
    let DeclKind::Function(function) = &decl.kind else {
        // Only functions carry mangled names in the IR.
        return match &decl.name {
            DeclName::Identifier(name) | DeclName::Other(name) => name.clone(),
            _ => String::new(),
        };
    };

    let mut out = String::from("_Z");
    let enclosing = match &function.method {
        Some(method) => {
            out.push('N');
            if method.is_const && method.is_instance {
                out.push('K');
            }
            let record = canonical(tu, method.record);
            push_source_name(&mut out, record_name(tu, record));
            match &decl.name {
                DeclName::Constructor => out.push_str("C1"),
                DeclName::Destructor => out.push_str("D1"),
                DeclName::Identifier(name) | DeclName::Other(name) => {
                    push_source_name(&mut out, name);
                }
            }
            out.push('E');
            Some(record)
        }
        None => {
            match &decl.name {
                DeclName::Identifier(name) | DeclName::Other(name) => {
                    push_source_name(&mut out, name);
                }
                // Free constructors/destructors do not exist.
                DeclName::Constructor | DeclName::Destructor => {}
            }
            None
        }
    };

    if function.params.is_empty() {
        out.push('v');
    } else {
        for param in &function.params {
            mangle_type(&mut out, tu, &param.ty, enclosing);
        }
    }
    out
}

fn push_source_name(out: &mut String, name: &str) {
    out.push_str(&name.len().to_string());
    out.push_str(name);
}

fn record_name<'a>(tu: &'a TranslationUnit, idx: DeclIdx) -> &'a str {
    match &tu.decl(idx).name {
        DeclName::Identifier(name) => name,
        _ => "",
    }
}

fn canonical(tu: &TranslationUnit, idx: DeclIdx) -> DeclIdx {
    tu.decl(idx).canonical.unwrap_or(idx)
}

/// Mangle one type. Top-level cv-qualifiers of by-value types are ignored,
/// as the ABI requires; qualifiers under pointers and references are not.
fn mangle_type(out: &mut String, tu: &TranslationUnit, ty: &QualType, enclosing: Option<DeclIdx>) {
    match &ty.kind {
        TypeKind::Builtin(builtin) => out.push_str(builtin_code(*builtin)),
        TypeKind::Pointer(pointee) => {
            out.push('P');
            mangle_pointee(out, tu, pointee, enclosing);
        }
        TypeKind::LValueReference(pointee) => {
            out.push('R');
            mangle_pointee(out, tu, pointee, enclosing);
        }
        TypeKind::RValueReference(pointee) => {
            out.push('O');
            mangle_pointee(out, tu, pointee, enclosing);
        }
        TypeKind::Record(decl) => {
            let record = canonical(tu, *decl);
            if enclosing == Some(record) {
                // The enclosing class of a member function is always the
                // first substitution candidate.
                out.push_str("S_");
            } else {
                push_source_name(out, record_name(tu, record));
            }
        }
        TypeKind::Typedef(decl) => {
            // Mangling is over the canonical type, so typedefs desugar here
            // even though the importer never desugars them elsewhere.
            if let DeclKind::Typedef(typedef) = &tu.decl(*decl).kind {
                mangle_type(out, tu, &typedef.underlying, enclosing);
            }
        }
    }
}

fn mangle_pointee(
    out: &mut String,
    tu: &TranslationUnit,
    pointee: &QualType,
    enclosing: Option<DeclIdx>,
) {
    if pointee.is_const {
        out.push('K');
    }
    mangle_type(out, tu, pointee, enclosing);
}

fn builtin_code(builtin: BuiltinKind) -> &'static str {
    match builtin {
        BuiltinKind::Void => "v",
        BuiltinKind::Bool => "b",
        BuiltinKind::Char => "c",
        BuiltinKind::SChar => "a",
        BuiltinKind::UChar => "h",
        BuiltinKind::Short => "s",
        BuiltinKind::UShort => "t",
        BuiltinKind::Int => "i",
        BuiltinKind::UInt => "j",
        BuiltinKind::Long => "l",
        BuiltinKind::ULong => "m",
        BuiltinKind::LongLong => "x",
        BuiltinKind::ULongLong => "y",
        BuiltinKind::Char16 => "Ds",
        BuiltinKind::Char32 => "Di",
        BuiltinKind::WChar => "w",
        BuiltinKind::Float => "f",
        BuiltinKind::Double => "d",
        BuiltinKind::Int128 => "n",
        BuiltinKind::UInt128 => "o",
    }
}
