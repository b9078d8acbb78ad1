//! Traversal of a translation unit and lowering into IR items.
//!
//! The driver walks declarations in the parser's depth-first order,
//! deduplicates them by canonical identity (namespaces excepted, since they
//! reopen), interleaves the comment manager, and dispatches one importer per
//! declaration kind. Items accumulate per canonical declaration and are
//! flattened at the end by a deterministic source-order sort.

use crate::ast::{
    Access, CtorKind, DeclIdx, DeclKind, DeclName, FunctionDecl, Loc, QualType, RecordDecl,
    RefQualifier, TagKind, TypeKind,
};
use crate::comments::{format_raw_comment, CommentManager};
use crate::context::AstContext;
use crate::error::{ImportError, Result};
use crate::members;
use crate::names;
use crate::types::{well_known_rs_name, TypeMapper};
use ferrule_ir::{
    Comment, Field, Func, FuncParam, HeaderName, Identifier, InstanceMethodMetadata, Ir, Item,
    Label, Lifetime, LifetimeId, MappedType, MemberFuncMetadata, Record, ReferenceQualification,
    TypeAlias, UnsupportedItem,
};
use rustc_hash::{FxHashMap, FxHashSet};
use std::cmp::Ordering;
use tracing::{debug, warn};

/// Configuration handed over by the driver.
#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Appended to `Ir::used_headers` in order.
    pub public_headers: Vec<HeaderName>,
    /// Determines the owning target of each header.
    pub headers_to_targets: FxHashMap<HeaderName, Label>,
    /// Declarations owned by other targets are not imported as functions.
    pub current_target: Label,
}

impl ImportOptions {
    pub fn new(current_target: Label) -> Self {
        Self {
            public_headers: Vec::new(),
            headers_to_targets: FxHashMap::default(),
            current_target,
        }
    }

    pub fn with_public_header(mut self, header: HeaderName) -> Self {
        self.public_headers.push(header);
        self
    }

    pub fn with_header_target(mut self, header: HeaderName, target: Label) -> Self {
        self.headers_to_targets.insert(header, target);
        self
    }
}

/// Lower a translation unit into IR.
pub fn import_translation_unit(ctx: &AstContext, options: ImportOptions) -> Ir {
    Importer::new(ctx, options).import()
}

/// Items registered for one canonical declaration, with the keys the emitter
/// sorts by.
#[derive(Debug)]
struct SeenDecl {
    begin: Loc,
    local_order: u8,
    items: Vec<Item>,
}

struct Importer<'a> {
    ctx: &'a AstContext,
    options: ImportOptions,
    seen_decls: FxHashMap<DeclIdx, SeenDecl>,
    /// Canonical indices of type declarations that may be referenced by
    /// other types. Monotonic except for the retraction when a record's
    /// field import fails.
    known_type_decls: FxHashSet<DeclIdx>,
    comments: CommentManager<'a>,
    ir: Ir,
}

impl<'a> Importer<'a> {
    fn new(ctx: &'a AstContext, options: ImportOptions) -> Self {
        let ir = Ir::new(options.current_target.clone());
        Self {
            ctx,
            options,
            seen_decls: FxHashMap::default(),
            known_type_decls: FxHashSet::default(),
            comments: CommentManager::new(ctx),
            ir,
        }
    }

    fn import(mut self) -> Ir {
        self.ir.used_headers = self.options.public_headers.clone();
        let roots = self.ctx.translation_unit().roots.clone();
        for root in roots {
            self.traverse_decl(root);
        }
        // Emit comments after the last declaration.
        self.comments.flush();
        self.emit_items();
        self.ir
    }

    fn traverse_decl(&mut self, idx: DeclIdx) {
        let ctx = self.ctx;
        let decl = ctx.decl(idx);
        let canonical = ctx.canonical(idx);

        // Namespaces reopen and typically contain new declarations each
        // time, so they are exempt from deduplication.
        if self.seen_decls.contains_key(&canonical) && !decl.is_namespace() {
            return;
        }

        if let Some(parent) = decl.parent {
            if ctx.decl(parent).is_namespace() {
                self.push_unsupported(
                    idx,
                    ImportError::unsupported_construct(
                        "Items contained in namespaces are not supported yet",
                    )
                    .to_string(),
                    decl.begin,
                );
                return;
            }
        }

        // Emit all comments in the current file before the declaration.
        self.comments.visit_decl(decl);

        match &decl.kind {
            DeclKind::Function(_) => self.import_function(idx),
            DeclKind::Record(_) => self.import_record(idx),
            DeclKind::Typedef(_) => self.import_typedef(idx),
            DeclKind::Namespace => {}
        }

        for child in decl.children.clone() {
            self.traverse_decl(child);
        }
    }

    // ----- Functions -----

    fn import_function(&mut self, idx: DeclIdx) {
        let ctx = self.ctx;
        let tu = ctx.translation_unit();
        let decl = ctx.decl(idx);
        let Some(function) = decl.as_function() else {
            return;
        };
        if !self.is_from_current_target(idx) {
            return;
        }
        if function.is_deleted {
            return;
        }

        let lifetimes = function.lifetimes.clone();
        let mut all_lifetimes: FxHashSet<LifetimeId> = FxHashSet::default();
        let mut params: Vec<FuncParam> = Vec::new();
        let mut success = true;

        // Non-static member functions receive an implicit `this` parameter.
        if let Some(method) = &function.method {
            if method.is_instance {
                let this_lifetimes = lifetimes.as_ref().and_then(|l| l.this_lifetimes.clone());
                if let Some(this_lifetimes) = &this_lifetimes {
                    all_lifetimes.extend(this_lifetimes.iter().copied());
                }
                let mut class_type = QualType::record(method.record);
                class_type.is_const = method.is_const;
                let this_type = class_type.ptr();
                match self.map_type(&this_type, this_lifetimes, false) {
                    Ok(mapped) => params.push(FuncParam {
                        type_: mapped,
                        identifier: Identifier::new("__this"),
                    }),
                    Err(error) => {
                        self.push_unsupported(idx, error.to_string(), decl.begin);
                        success = false;
                    }
                }
            }
        }

        if let Some(lifetimes) = &lifetimes {
            assert_eq!(
                lifetimes.param_lifetimes.len(),
                function.params.len(),
                "lifetime annotations must cover every parameter"
            );
        }
        for (i, param) in function.params.iter().enumerate() {
            let param_lifetimes = lifetimes.as_ref().map(|l| l.param_lifetimes[i].clone());
            if let Some(param_lifetimes) = &param_lifetimes {
                all_lifetimes.extend(param_lifetimes.iter().copied());
            }
            let mapped = match self.map_type(&param.ty, param_lifetimes, true) {
                Ok(mapped) => mapped,
                Err(_) => {
                    self.push_unsupported(
                        idx,
                        format!(
                            "Parameter type '{}' is not supported",
                            tu.type_spelling(&param.ty)
                        ),
                        param.begin,
                    );
                    success = false;
                    continue;
                }
            };

            // Records that are not passable in registers have a different
            // by-value representation, which is not supported.
            if let TypeKind::Record(record) = &param.ty.kind {
                if !ctx.can_pass_in_registers(*record) {
                    self.push_unsupported(
                        idx,
                        format!(
                            "Non-trivial_abi type '{}' is not supported by value as a parameter",
                            tu.type_spelling(&param.ty)
                        ),
                        param.begin,
                    );
                    success = false;
                }
            }

            params.push(FuncParam {
                type_: mapped,
                identifier: names::param_identifier(param, i),
            });
        }

        if let TypeKind::Record(record) = &function.return_type.kind {
            if !ctx.can_pass_in_registers(*record) {
                self.push_unsupported(
                    idx,
                    format!(
                        "Non-trivial_abi type '{}' is not supported by value as a return type",
                        tu.type_spelling(&function.return_type)
                    ),
                    decl.begin,
                );
                success = false;
            }
        }

        let return_lifetimes = lifetimes.as_ref().map(|l| l.return_lifetimes.clone());
        if let Some(return_lifetimes) = &return_lifetimes {
            all_lifetimes.extend(return_lifetimes.iter().copied());
        }
        let return_type = match self.map_type(&function.return_type, return_lifetimes, true) {
            Ok(mapped) => Some(mapped),
            Err(_) => {
                self.push_unsupported(
                    idx,
                    format!(
                        "Return type '{}' is not supported",
                        tu.type_spelling(&function.return_type)
                    ),
                    decl.begin,
                );
                success = false;
                None
            }
        };

        let mut member_func_metadata = None;
        if let Some(method) = &function.method {
            match method.access {
                Access::Public => {}
                // Protected members are treated like private ones for now:
                // dropped without an unsupported item.
                Access::Protected | Access::Private => return,
            }
            let instance_method_metadata = method.is_instance.then(|| InstanceMethodMetadata {
                reference: match method.ref_qualifier {
                    RefQualifier::LValue => ReferenceQualification::LValue,
                    RefQualifier::RValue => ReferenceQualification::RValue,
                    RefQualifier::None => ReferenceQualification::Unqualified,
                },
                is_const: method.is_const,
                is_virtual: method.is_virtual,
            });
            member_func_metadata = Some(MemberFuncMetadata {
                record_id: ctx.decl_id(method.record),
                instance_method_metadata,
            });
        }

        let mut lifetime_params: Vec<Lifetime> = all_lifetimes
            .into_iter()
            .map(|id| {
                let name = ctx
                    .lifetime_name(id)
                    .expect("lifetime must be registered in the symbol table");
                Lifetime {
                    name: name.to_string(),
                    id,
                }
            })
            .collect();
        lifetime_params.sort_by(|a, b| a.name.cmp(&b.name));

        let translated_name = names::translated_unqualified_name(decl);
        if success {
            if let (Some(name), Some(return_type)) = (translated_name, return_type) {
                let func = Func {
                    name,
                    owning_target: self.owning_target(idx),
                    doc_comment: ctx.doc_comment_at(decl.begin),
                    mangled_name: ctx.mangled_name(idx),
                    return_type,
                    params,
                    lifetime_params,
                    is_inline: function.is_inline,
                    member_func_metadata,
                    source_loc: ctx.source_loc(decl.begin),
                };
                self.push_item(idx, Item::Func(func));
            }
        }
    }

    // ----- Records -----

    fn import_record(&mut self, idx: DeclIdx) {
        let ctx = self.ctx;
        let decl = ctx.decl(idx);
        if let Some(parent) = decl.parent {
            let parent_decl = ctx.decl(parent);
            if parent_decl.as_function().is_some() {
                return;
            }
            if parent_decl.as_record().is_some() {
                self.push_unsupported(
                    idx,
                    ImportError::unsupported_construct("Nested classes are not supported yet")
                        .to_string(),
                    decl.begin,
                );
                return;
            }
        }
        let Some(record) = decl.as_record() else {
            return;
        };
        if record.tag == TagKind::Union {
            self.push_unsupported(
                idx,
                ImportError::unsupported_construct("Unions are not supported yet").to_string(),
                decl.begin,
            );
            return;
        }

        // Without a complete definition there is nothing to lay out.
        let Some(def_idx) = ctx.definition_of(idx) else {
            debug!(name = ?decl.name, "skipping record without a complete definition");
            return;
        };
        let def_decl = ctx.decl(def_idx);
        let Some(def_record) = def_decl.as_record() else {
            return;
        };
        if def_record.is_template {
            self.push_unsupported(
                idx,
                ImportError::unsupported_construct("Class templates are not supported yet")
                    .to_string(),
                decl.begin,
            );
            return;
        }

        // The front-end has generated the implicit members; their facts are
        // queried below when the special members are classified.
        let default_access = members::default_access(def_record.tag);
        let Some(record_name) = names::translated_identifier(def_decl) else {
            return;
        };

        // Provisionally mark the record as known so fields whose type
        // contains the record itself can be imported.
        let canonical = ctx.canonical(idx);
        self.known_type_decls.insert(canonical);
        let Some(fields) = self.import_fields(idx, def_record, default_access) else {
            // A field failed to import, so the record is not known after
            // all.
            self.known_type_decls.remove(&canonical);
            return;
        };

        let layout = match ctx.record_layout(idx) {
            Ok(layout) => layout,
            Err(error) => {
                debug!(name = ?decl.name, %error, "skipping record without a layout");
                self.known_type_decls.remove(&canonical);
                return;
            }
        };
        let Some(special) = ctx.special_members(idx) else {
            self.known_type_decls.remove(&canonical);
            return;
        };

        let record_item = Record {
            identifier: record_name,
            id: ctx.decl_id(idx),
            owning_target: self.owning_target(idx),
            doc_comment: ctx.doc_comment_at(def_decl.begin),
            fields,
            size: layout.size,
            alignment: layout.alignment,
            copy_constructor: members::special_member_func(
                &special.copy_constructor,
                default_access,
            ),
            move_constructor: members::special_member_func(
                &special.move_constructor,
                default_access,
            ),
            destructor: members::special_member_func(&special.destructor, default_access),
            is_trivial_abi: ctx.can_pass_in_registers(idx),
            is_final: def_record.is_effectively_final,
        };
        self.push_item(idx, Item::Record(record_item));
    }

    fn import_fields(
        &mut self,
        record_idx: DeclIdx,
        record: &RecordDecl,
        default_access: Access,
    ) -> Option<Vec<Field>> {
        let ctx = self.ctx;
        let tu = ctx.translation_unit();
        let mut fields = Vec::with_capacity(record.fields.len());
        for field in &record.fields {
            let mapped = match self.map_type(&field.ty, None, true) {
                Ok(mapped) => mapped,
                Err(_) => {
                    self.push_unsupported(
                        record_idx,
                        format!(
                            "Field type '{}' is not supported",
                            tu.type_spelling(&field.ty)
                        ),
                        field.begin,
                    );
                    return None;
                }
            };
            let Some(identifier) = names::field_identifier(field) else {
                self.push_unsupported(
                    record_idx,
                    ImportError::UnresolvableName {
                        name: field.name.clone(),
                    }
                    .to_string(),
                    field.begin,
                );
                return None;
            };
            fields.push(Field {
                identifier,
                doc_comment: ctx.doc_comment_at(field.begin),
                type_: mapped,
                access: members::translate_access(field.access.unwrap_or(default_access)),
                offset: 0,
            });
        }
        // Once every field type resolved, the layout is computable; fill in
        // the offsets from it.
        let layout = ctx.record_layout(record_idx).ok()?;
        for (field, offset) in fields.iter_mut().zip(&layout.field_offsets) {
            field.offset = *offset;
        }
        Some(fields)
    }

    // ----- Type aliases -----

    fn import_typedef(&mut self, idx: DeclIdx) {
        let ctx = self.ctx;
        let decl = ctx.decl(idx);
        if let Some(parent) = decl.parent {
            let parent_decl = ctx.decl(parent);
            if parent_decl.as_function().is_some() {
                return;
            }
            if parent_decl.as_record().is_some() {
                self.push_unsupported(
                    idx,
                    ImportError::unsupported_construct(
                        "Typedefs nested in classes are not supported yet",
                    )
                    .to_string(),
                    decl.begin,
                );
                return;
            }
        }
        let DeclKind::Typedef(typedef) = &decl.kind else {
            return;
        };

        // Spellings in the well-known table are absorbed by the type mapper;
        // no alias item is emitted for them.
        if let DeclName::Identifier(name) = &decl.name {
            if well_known_rs_name(name).is_some() {
                return;
            }
        }

        let Some(identifier) = names::translated_identifier(decl) else {
            warn!("couldn't get identifier for typedef");
            return;
        };
        match self.map_type(&typedef.underlying, None, true) {
            Ok(underlying_type) => {
                let canonical = ctx.canonical(idx);
                self.known_type_decls.insert(canonical);
                self.push_item(
                    idx,
                    Item::TypeAlias(TypeAlias {
                        identifier,
                        id: ctx.decl_id(idx),
                        owning_target: self.owning_target(idx),
                        underlying_type,
                    }),
                );
            }
            Err(error) => {
                self.push_unsupported(idx, error.to_string(), decl.begin);
            }
        }
    }

    // ----- Shared machinery -----

    fn map_type(
        &self,
        ty: &QualType,
        lifetimes: Option<Vec<LifetimeId>>,
        nullable: bool,
    ) -> Result<MappedType> {
        TypeMapper::new(self.ctx, &self.known_type_decls).map(ty, lifetimes, nullable)
    }

    /// The build target owning a declaration: walk the include chain outward
    /// until a header mapped to a target is found.
    fn owning_target(&self, idx: DeclIdx) -> Label {
        let ctx = self.ctx;
        let mut loc = ctx.decl(idx).begin;
        while loc.is_valid() && !ctx.is_in_system_header(loc) {
            let file = loc.file;
            let Some(filename) = ctx.file_name(file) else {
                return Label::from("//:builtin");
            };
            let filename = filename.strip_prefix("./").unwrap_or(filename);
            if let Some(target) = self
                .options
                .headers_to_targets
                .get(&HeaderName::new(filename))
            {
                return target.clone();
            }
            loc = ctx.include_loc(file).unwrap_or(Loc::INVALID);
        }
        // Headers in the compiler's resource directory have no target of
        // their own yet.
        Label::from("//:virtual_clang_resource_dir_target")
    }

    fn is_from_current_target(&self, idx: DeclIdx) -> bool {
        self.owning_target(idx) == self.options.current_target
    }

    fn push_unsupported(&mut self, idx: DeclIdx, message: String, loc: Loc) {
        // Only declarations of the current target report unsupported items.
        if !self.is_from_current_target(idx) {
            return;
        }
        let name = qualified_name_for_errors(self.ctx, idx);
        let source_loc = self.ctx.source_loc(loc);
        self.push_item(
            idx,
            Item::Unsupported(UnsupportedItem {
                name,
                message,
                source_loc,
            }),
        );
    }

    fn push_item(&mut self, idx: DeclIdx, item: Item) {
        let ctx = self.ctx;
        let canonical = ctx.canonical(idx);
        self.seen_decls
            .entry(canonical)
            .or_insert_with(|| SeenDecl {
                begin: ctx.decl(canonical).begin,
                local_order: local_order(ctx, canonical),
                items: Vec::new(),
            })
            .items
            .push(item);
    }

    /// Flatten the per-declaration item lists plus the floating comments
    /// into `ir.items`, ordered by source position with a per-declaration
    /// tiebreak. The map's own iteration order is arbitrary, hence the
    /// explicit stable sort.
    fn emit_items(&mut self) {
        let ctx = self.ctx;
        let mut items: Vec<(Loc, u8, Item)> = Vec::new();
        for seen in self.seen_decls.values() {
            for item in &seen.items {
                items.push((seen.begin, seen.local_order, item.clone()));
            }
        }
        for comment in self.comments.floating_comments() {
            items.push((
                comment.begin,
                0,
                Item::Comment(Comment {
                    text: format_raw_comment(&comment.text),
                }),
            ));
        }

        items.sort_by(|a, b| {
            let (aloc, bloc) = (a.0, b.0);
            if !aloc.is_valid() || !bloc.is_valid() {
                // Items with invalid locations sort before valid ones.
                return match (aloc.is_valid(), bloc.is_valid()) {
                    (false, true) => Ordering::Less,
                    (true, false) => Ordering::Greater,
                    _ => Ordering::Equal,
                };
            }
            if ctx.is_before_in_translation_unit(aloc, bloc) {
                Ordering::Less
            } else if ctx.is_before_in_translation_unit(bloc, aloc) {
                Ordering::Greater
            } else {
                a.1.cmp(&b.1)
            }
        });

        self.ir.items.extend(items.into_iter().map(|(_, _, item)| item));
    }
}

/// The intra-declaration tiebreak for items sharing a source position:
/// comments and top-level records first, nested record shells after, then
/// default/copy/move/other constructors, then destructors, then everything
/// else.
fn local_order(ctx: &AstContext, idx: DeclIdx) -> u8 {
    let decl = ctx.decl(idx);
    match &decl.kind {
        DeclKind::Record(_) => {
            let nested = decl
                .parent
                .is_some_and(|parent| ctx.decl(parent).as_record().is_some());
            u8::from(nested)
        }
        DeclKind::Function(FunctionDecl { ctor_kind, .. }) => {
            if decl.name == DeclName::Destructor {
                6
            } else {
                match ctor_kind {
                    Some(CtorKind::Default) => 2,
                    Some(CtorKind::Copy) => 3,
                    Some(CtorKind::Move) => 4,
                    Some(CtorKind::Other) => 5,
                    None => 7,
                }
            }
        }
        _ => 7,
    }
}

/// The qualified name reported in unsupported items.
fn qualified_name_for_errors(ctx: &AstContext, idx: DeclIdx) -> String {
    let decl = ctx.decl(idx);
    let class_name = decl
        .as_function()
        .and_then(|f| f.method.as_ref())
        .map(|m| match &ctx.decl(m.record).name {
            DeclName::Identifier(name) => name.clone(),
            _ => "unnamed".to_string(),
        });
    let base = match &decl.name {
        DeclName::Identifier(name) | DeclName::Other(name) if !name.is_empty() => name.clone(),
        DeclName::Constructor => match &class_name {
            Some(class_name) => format!("{class_name}::{class_name}"),
            None => "unnamed".to_string(),
        },
        DeclName::Destructor => match &class_name {
            Some(class_name) => format!("{class_name}::~{class_name}"),
            None => "unnamed".to_string(),
        },
        _ => "unnamed".to_string(),
    };
    if decl.qualifier.is_empty() {
        base
    } else {
        format!("{}::{}", decl.qualifier.join("::"), base)
    }
}
