//! C++ AST lowering into the binding IR.
//!
//! This crate consumes a Clang-like view of a parsed translation unit and
//! produces the language-neutral IR consumed by downstream binding
//! generation:
//!
//! ```text
//! C++ headers → front-end → AST (this crate's input) → IR items
//! ```
//!
//! The traversal decides which declarations are importable, translates their
//! types into dual-sided mapped form, computes ABI-relevant record facts,
//! merges free-floating comments in source order, and emits a deterministic
//! item sequence. Errors are IR values (unsupported items), never aborts.

pub mod ast;
mod comments;
mod context;
mod error;
mod importer;
mod layout;
mod mangle;
mod members;
mod names;
mod types;

pub use comments::{format_raw_comment, CommentManager};
pub use context::{AstContext, RecordSpecialMembers, SpecialMemberInfo};
pub use error::{ImportError, Result, TYPE_STATUS_PAYLOAD_URL};
pub use importer::{import_translation_unit, ImportOptions};
pub use layout::RecordLayout;
pub use mangle::mangled_name;
pub use types::{well_known_rs_name, TypeMapper};

use ast::TranslationUnit;
use ferrule_ir::Ir;

/// Lower a translation unit into IR in one call. Builds the parser-service
/// context and runs the importer over it.
pub fn import_cc_ast(tu: TranslationUnit, options: ImportOptions) -> Ir {
    let ctx = AstContext::new(tu);
    import_translation_unit(&ctx, options)
}
