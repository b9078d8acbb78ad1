//! Parser services over a parsed translation unit.
//!
//! [`AstContext`] is the narrow interface the importer consumes: canonical
//! declaration identity, definition lookup, record layout, special-member
//! facts derived per the C++ rules, the passable-in-registers ABI predicate,
//! raw-comment attachment and source-manager queries. Everything here is a
//! pure function of the AST, computed once at construction.

use crate::ast::{
    Access, CtorKind, Decl, DeclIdx, DeclKind, DeclName, FileId, FunctionDecl, Loc, QualType,
    RawComment, RecordDecl, SourceFile, TranslationUnit, TypeKind,
};
use crate::comments::format_raw_comment;
use crate::error::ImportError;
use crate::layout::{self, RecordLayout};
use ferrule_ir::{DeclId, SourceLoc};
use rustc_hash::{FxHashMap, FxHashSet};

/// Raw facts about one special member function, as the front-end reports
/// them. `access` is `None` when the member is implicit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecialMemberInfo {
    pub user_declared: bool,
    /// Explicitly deleted, or implicitly deleted per the C++ rules
    /// (suppressed by another user-declared constructor/destructor, or by a
    /// member whose corresponding special member is deleted).
    pub deleted: bool,
    pub defaulted: bool,
    /// Whether the member is trivially generated.
    pub trivial: bool,
    pub access: Option<Access>,
}

/// The three special members the importer classifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordSpecialMembers {
    pub copy_constructor: SpecialMemberInfo,
    pub move_constructor: SpecialMemberInfo,
    pub destructor: SpecialMemberInfo,
}

#[derive(Debug)]
pub struct AstContext {
    tu: TranslationUnit,
    /// canonical record -> its complete definition, if any.
    definitions: FxHashMap<DeclIdx, DeclIdx>,
    /// canonical record -> layout; absent when no layout can be computed.
    layouts: FxHashMap<DeclIdx, RecordLayout>,
    /// canonical record -> derived special-member facts.
    special_members: FxHashMap<DeclIdx, RecordSpecialMembers>,
    /// canonical record -> passable-in-registers per the platform ABI.
    pass_in_registers: FxHashMap<DeclIdx, bool>,
}

impl AstContext {
    pub fn new(tu: TranslationUnit) -> Self {
        let mut definitions = FxHashMap::default();
        for (idx, decl) in tu.decls() {
            if let DeclKind::Record(record) = &decl.kind {
                if record.is_complete_definition {
                    definitions.insert(canonical_of(&tu, idx), idx);
                }
            }
        }

        let mut ctx = Self {
            tu,
            definitions,
            layouts: FxHashMap::default(),
            special_members: FxHashMap::default(),
            pass_in_registers: FxHashMap::default(),
        };
        ctx.compute_layouts();
        ctx.compute_special_members();
        ctx
    }

    pub fn translation_unit(&self) -> &TranslationUnit {
        &self.tu
    }

    pub fn decl(&self, idx: DeclIdx) -> &Decl {
        self.tu.decl(idx)
    }

    /// The canonical declaration of a redeclaration chain.
    pub fn canonical(&self, idx: DeclIdx) -> DeclIdx {
        canonical_of(&self.tu, idx)
    }

    /// The opaque IR identity of a declaration; injective on canonical
    /// declarations within the translation unit.
    pub fn decl_id(&self, idx: DeclIdx) -> DeclId {
        DeclId(u64::from(self.canonical(idx).0))
    }

    /// The complete definition of a record, if the translation unit has one.
    pub fn definition_of(&self, idx: DeclIdx) -> Option<DeclIdx> {
        self.definitions.get(&self.canonical(idx)).copied()
    }

    pub fn record_layout(&self, idx: DeclIdx) -> Result<&RecordLayout, ImportError> {
        self.layouts
            .get(&self.canonical(idx))
            .ok_or(ImportError::LayoutUnavailable)
    }

    /// Special-member facts of a record. The front-end has already generated
    /// the implicit members these facts describe.
    pub fn special_members(&self, idx: DeclIdx) -> Option<&RecordSpecialMembers> {
        self.special_members.get(&self.canonical(idx))
    }

    /// Whether the record may be passed by value in registers. Distinct from
    /// copy-constructor triviality: the trivial-abi attribute forces this on.
    pub fn can_pass_in_registers(&self, idx: DeclIdx) -> bool {
        self.pass_in_registers
            .get(&self.canonical(idx))
            .copied()
            .unwrap_or(false)
    }

    pub fn mangled_name(&self, idx: DeclIdx) -> String {
        crate::mangle::mangled_name(&self.tu, idx)
    }

    pub fn lifetime_name(&self, id: ferrule_ir::LifetimeId) -> Option<&str> {
        self.tu.lifetime_names.get(&id).map(String::as_str)
    }

    // ----- Source manager -----

    pub fn file(&self, id: FileId) -> &SourceFile {
        &self.tu.files[id.0 as usize]
    }

    pub fn file_name(&self, id: FileId) -> Option<&str> {
        self.file(id).name.as_deref()
    }

    pub fn is_in_system_header(&self, loc: Loc) -> bool {
        loc.is_valid() && self.file(loc.file).is_system_header
    }

    pub fn include_loc(&self, id: FileId) -> Option<Loc> {
        self.file(id).include_loc
    }

    pub fn is_before_in_translation_unit(&self, a: Loc, b: Loc) -> bool {
        a < b
    }

    /// Convert a location to its IR form, stripping a leading `./` from the
    /// filename.
    pub fn source_loc(&self, loc: Loc) -> SourceLoc {
        let filename = if loc.is_valid() {
            self.file_name(loc.file).unwrap_or("")
        } else {
            ""
        };
        let filename = filename.strip_prefix("./").unwrap_or(filename);
        SourceLoc {
            filename: filename.to_string(),
            line: loc.line,
            column: loc.column,
        }
    }

    // ----- Comments -----

    pub fn comments_in_file(&self, id: FileId) -> &[RawComment] {
        &self.file(id).comments
    }

    /// The raw comment attached to a declaration beginning at `begin`: the
    /// comment ending on the line immediately above it in the same file.
    pub fn attached_comment_at(&self, begin: Loc) -> Option<&RawComment> {
        if !begin.is_valid() || begin.line == 0 {
            return None;
        }
        self.comments_in_file(begin.file)
            .iter()
            .find(|comment| comment.end.line + 1 == begin.line)
    }

    /// The formatted doc comment for a declaration beginning at `begin`.
    pub fn doc_comment_at(&self, begin: Loc) -> Option<String> {
        self.attached_comment_at(begin)
            .map(|comment| format_raw_comment(&comment.text))
    }

    // ----- Derived record facts -----

    fn compute_layouts(&mut self) {
        let canonicals: Vec<DeclIdx> = self.definitions.keys().copied().collect();
        let mut visiting = FxHashSet::default();
        for canonical in canonicals {
            self.layout_of(canonical, &mut visiting);
        }
    }

    fn layout_of(
        &mut self,
        canonical: DeclIdx,
        visiting: &mut FxHashSet<DeclIdx>,
    ) -> Option<RecordLayout> {
        if let Some(layout) = self.layouts.get(&canonical) {
            return Some(layout.clone());
        }
        // A record cannot contain itself by value.
        if !visiting.insert(canonical) {
            return None;
        }
        let fields = self
            .definitions
            .get(&canonical)
            .copied()
            .and_then(|def| match &self.tu.decl(def).kind {
                DeclKind::Record(record) => Some(record.fields.clone()),
                _ => None,
            });
        let layout = fields.and_then(|fields| {
            let mut resolved = Vec::with_capacity(fields.len());
            for field in &fields {
                resolved.push(self.size_and_alignment(&field.ty, visiting)?);
            }
            let mut resolved = resolved.into_iter();
            layout::compute(&fields, |_| resolved.next())
        });
        visiting.remove(&canonical);
        if let Some(layout) = layout.clone() {
            self.layouts.insert(canonical, layout);
        }
        layout
    }

    fn size_and_alignment(
        &mut self,
        ty: &QualType,
        visiting: &mut FxHashSet<DeclIdx>,
    ) -> Option<(u64, u64)> {
        match &ty.kind {
            TypeKind::Builtin(builtin) => {
                let bytes = u64::from(builtin.bit_width()?) / 8;
                Some((bytes, bytes))
            }
            TypeKind::Pointer(_) | TypeKind::LValueReference(_) | TypeKind::RValueReference(_) => {
                Some((8, 8))
            }
            TypeKind::Record(decl) => {
                let canonical = self.canonical(*decl);
                let layout = self.layout_of(canonical, visiting)?;
                Some((layout.size, layout.alignment))
            }
            TypeKind::Typedef(decl) => {
                let underlying = match &self.tu.decl(*decl).kind {
                    DeclKind::Typedef(typedef) => typedef.underlying.clone(),
                    _ => return None,
                };
                self.size_and_alignment(&underlying, visiting)
            }
        }
    }

    fn compute_special_members(&mut self) {
        let canonicals: Vec<DeclIdx> = self.definitions.keys().copied().collect();
        let mut visiting = FxHashSet::default();
        for canonical in canonicals {
            self.special_members_of(canonical, &mut visiting);
        }
        for (&canonical, members) in &self.special_members {
            let has_attr = self
                .definitions
                .get(&canonical)
                .and_then(|def| self.tu.decl(*def).as_record())
                .is_some_and(|record| record.has_trivial_abi_attr);
            let copy = members.copy_constructor;
            let move_ = members.move_constructor;
            let dtor = members.destructor;
            let register_passable = ((copy.trivial && !copy.deleted)
                || (move_.trivial && !move_.deleted))
                && dtor.trivial
                && !dtor.deleted;
            self.pass_in_registers
                .insert(canonical, has_attr || register_passable);
        }
    }

    fn special_members_of(
        &mut self,
        canonical: DeclIdx,
        visiting: &mut FxHashSet<DeclIdx>,
    ) -> RecordSpecialMembers {
        if let Some(members) = self.special_members.get(&canonical) {
            return *members;
        }
        if !visiting.insert(canonical) {
            return all_trivial();
        }
        let members = match self.definitions.get(&canonical).copied() {
            Some(def) => self.derive_special_members(def, visiting),
            None => all_trivial(),
        };
        visiting.remove(&canonical);
        self.special_members.insert(canonical, members);
        members
    }

    fn derive_special_members(
        &mut self,
        def: DeclIdx,
        visiting: &mut FxHashSet<DeclIdx>,
    ) -> RecordSpecialMembers {
        let decl = self.tu.decl(def).clone();
        let record = match &decl.kind {
            DeclKind::Record(record) => record.clone(),
            _ => return all_trivial(),
        };

        let mut copy_decl = None;
        let mut move_decl = None;
        let mut dtor_decl = None;
        let mut has_virtual_method = false;
        for &child in &decl.children {
            let child_decl = self.tu.decl(child);
            let Some(function) = child_decl.as_function() else {
                continue;
            };
            if function.method.as_ref().is_some_and(|m| m.is_virtual) {
                has_virtual_method = true;
            }
            match (&child_decl.name, function.ctor_kind) {
                (DeclName::Constructor, Some(CtorKind::Copy)) => {
                    copy_decl = Some(function.clone());
                }
                (DeclName::Constructor, Some(CtorKind::Move)) => {
                    move_decl = Some(function.clone());
                }
                (DeclName::Destructor, _) => dtor_decl = Some(function.clone()),
                _ => {}
            }
        }

        let members = self.member_facts(&record, visiting);

        let copy_constructor = self.classify_raw(
            copy_decl.as_ref(),
            move_decl.is_some(),
            has_virtual_method,
            members.copy,
        );
        let move_constructor = self.classify_raw(
            move_decl.as_ref(),
            copy_decl.is_some() || dtor_decl.is_some(),
            has_virtual_method,
            members.move_,
        );
        let destructor = {
            let virtual_dtor = dtor_decl
                .as_ref()
                .and_then(|d| d.method.as_ref())
                .is_some_and(|m| m.is_virtual);
            self.classify_raw(dtor_decl.as_ref(), false, virtual_dtor, members.dtor)
        };

        RecordSpecialMembers {
            copy_constructor,
            move_constructor,
            destructor,
        }
    }

    /// Derive the facts for one special member from its user declaration (if
    /// any), whether another user declaration suppresses the implicit one,
    /// whether triviality is ruled out structurally, and the member-wise
    /// facts of the record's fields.
    fn classify_raw(
        &self,
        user: Option<&FunctionDecl>,
        suppressed: bool,
        structurally_nontrivial: bool,
        member: MemberFacts,
    ) -> SpecialMemberInfo {
        match user {
            Some(function) => {
                let deleted = function.is_deleted || (function.is_defaulted && member.deleted);
                SpecialMemberInfo {
                    user_declared: true,
                    deleted,
                    defaulted: function.is_defaulted,
                    trivial: function.is_defaulted
                        && !deleted
                        && !structurally_nontrivial
                        && !member.nontrivial,
                    access: function.method.as_ref().map(|m| m.access),
                }
            }
            None => {
                let deleted = suppressed || member.deleted;
                SpecialMemberInfo {
                    user_declared: false,
                    deleted,
                    defaulted: false,
                    trivial: !deleted && !structurally_nontrivial && !member.nontrivial,
                    access: None,
                }
            }
        }
    }

    fn member_facts(
        &mut self,
        record: &RecordDecl,
        visiting: &mut FxHashSet<DeclIdx>,
    ) -> AllMemberFacts {
        let mut facts = AllMemberFacts::default();
        for field in &record.fields {
            let Some(field_record) = self.by_value_record(&field.ty) else {
                continue;
            };
            let member = self.special_members_of(field_record, visiting);
            facts.copy.absorb(member.copy_constructor);
            facts.move_.absorb(member.move_constructor);
            facts.dtor.absorb(member.destructor);
        }
        facts
    }

    /// The canonical record a type holds by value, looking through typedefs
    /// but not through pointers or references.
    fn by_value_record(&self, ty: &QualType) -> Option<DeclIdx> {
        match &ty.kind {
            TypeKind::Record(decl) => Some(self.canonical(*decl)),
            TypeKind::Typedef(decl) => match &self.tu.decl(*decl).kind {
                DeclKind::Typedef(typedef) => self.by_value_record(&typedef.underlying),
                _ => None,
            },
            _ => None,
        }
    }
}

fn canonical_of(tu: &TranslationUnit, idx: DeclIdx) -> DeclIdx {
    tu.decl(idx).canonical.unwrap_or(idx)
}

fn all_trivial() -> RecordSpecialMembers {
    let trivial = SpecialMemberInfo {
        user_declared: false,
        deleted: false,
        defaulted: false,
        trivial: true,
        access: None,
    };
    RecordSpecialMembers {
        copy_constructor: trivial,
        move_constructor: trivial,
        destructor: trivial,
    }
}

/// Member-wise facts aggregated over a record's by-value fields, per special
/// member.
#[derive(Debug, Clone, Copy, Default)]
struct MemberFacts {
    deleted: bool,
    nontrivial: bool,
}

impl MemberFacts {
    fn absorb(&mut self, member: SpecialMemberInfo) {
        self.deleted |= member.deleted;
        self.nontrivial |= !member.trivial && !member.deleted;
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct AllMemberFacts {
    copy: MemberFacts,
    move_: MemberFacts,
    dtor: MemberFacts,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{FieldDecl, MethodInfo, ParamDecl, RefQualifier, TagKind};

    fn loc(file: FileId, line: u32) -> Loc {
        Loc::new(file, line, 1)
    }

    /// Build a record definition with the given user-declared special
    /// members attached as children.
    fn record_with_members(
        members: impl FnOnce(&mut TranslationUnit, DeclIdx, FileId),
    ) -> AstContext {
        let mut tu = TranslationUnit::new();
        let file = tu.add_file(SourceFile::named("a.h"));
        let record = tu.add_root(Decl::new(
            DeclName::Identifier("S".to_string()),
            DeclKind::Record(RecordDecl::definition(TagKind::Struct, Vec::new())),
            loc(file, 1),
        ));
        members(&mut tu, record, file);
        AstContext::new(tu)
    }

    fn method_info(record: DeclIdx) -> MethodInfo {
        MethodInfo {
            record,
            is_instance: true,
            access: Access::Public,
            is_const: false,
            is_virtual: false,
            ref_qualifier: RefQualifier::None,
        }
    }

    fn add_copy_ctor(
        tu: &mut TranslationUnit,
        record: DeclIdx,
        file: FileId,
        configure: impl FnOnce(&mut FunctionDecl),
    ) {
        let param_ty = QualType::record(record).const_().lvalue_ref();
        let mut function =
            FunctionDecl::new(QualType::void_(), vec![ParamDecl::new("", param_ty)]);
        function.ctor_kind = Some(CtorKind::Copy);
        function.method = Some(method_info(record));
        configure(&mut function);
        let ctor = tu.add_decl(Decl::new(
            DeclName::Constructor,
            DeclKind::Function(function),
            loc(file, 2),
        ));
        tu.attach_child(record, ctor);
    }

    #[test]
    fn test_implicit_members_are_trivial() {
        let ctx = record_with_members(|_, _, _| {});
        let members = ctx.special_members(DeclIdx(0)).unwrap();
        assert!(members.copy_constructor.trivial);
        assert!(!members.copy_constructor.user_declared);
        assert!(members.move_constructor.trivial);
        assert!(members.destructor.trivial);
        assert!(ctx.can_pass_in_registers(DeclIdx(0)));
    }

    #[test]
    fn test_defaulted_copy_is_trivial() {
        let ctx = record_with_members(|tu, record, file| {
            add_copy_ctor(tu, record, file, |f| f.is_defaulted = true);
        });
        let copy = ctx.special_members(DeclIdx(0)).unwrap().copy_constructor;
        assert!(copy.user_declared);
        assert!(copy.trivial);
        assert!(!copy.deleted);
    }

    #[test]
    fn test_user_defined_copy_is_nontrivial_and_suppresses_move() {
        let ctx = record_with_members(|tu, record, file| {
            add_copy_ctor(tu, record, file, |f| f.has_body = true);
        });
        let members = ctx.special_members(DeclIdx(0)).unwrap();
        assert!(!members.copy_constructor.trivial);
        assert!(!members.copy_constructor.deleted);
        // A user-declared copy constructor deletes the implicit move.
        assert!(members.move_constructor.deleted);
        assert!(!ctx.can_pass_in_registers(DeclIdx(0)));
    }

    #[test]
    fn test_deleted_copy_ctor() {
        let ctx = record_with_members(|tu, record, file| {
            add_copy_ctor(tu, record, file, |f| f.is_deleted = true);
        });
        let copy = ctx.special_members(DeclIdx(0)).unwrap().copy_constructor;
        assert!(copy.deleted);
        assert!(!copy.trivial);
    }

    #[test]
    fn test_trivial_abi_attribute_forces_register_passing() {
        let mut tu = TranslationUnit::new();
        let file = tu.add_file(SourceFile::named("a.h"));
        let record = tu.add_root(Decl::new(
            DeclName::Identifier("N".to_string()),
            DeclKind::Record(
                RecordDecl::definition(TagKind::Struct, Vec::new()).with_trivial_abi_attr(),
            ),
            loc(file, 1),
        ));
        // User-defined copy constructor: nontrivial, but the attribute wins.
        let param_ty = QualType::record(record).const_().lvalue_ref();
        let mut function =
            FunctionDecl::new(QualType::void_(), vec![ParamDecl::new("", param_ty)]);
        function.ctor_kind = Some(CtorKind::Copy);
        function.has_body = true;
        function.method = Some(method_info(record));
        let ctor = tu.add_decl(Decl::new(
            DeclName::Constructor,
            DeclKind::Function(function),
            loc(file, 2),
        ));
        tu.attach_child(record, ctor);

        let ctx = AstContext::new(tu);
        assert!(ctx.can_pass_in_registers(record));
        assert!(!ctx.special_members(record).unwrap().copy_constructor.trivial);
    }

    #[test]
    fn test_member_with_nontrivial_copy_propagates() {
        let mut tu = TranslationUnit::new();
        let file = tu.add_file(SourceFile::named("a.h"));
        let inner = tu.add_root(Decl::new(
            DeclName::Identifier("Inner".to_string()),
            DeclKind::Record(RecordDecl::definition(TagKind::Struct, Vec::new())),
            loc(file, 1),
        ));
        let param_ty = QualType::record(inner).const_().lvalue_ref();
        let mut function =
            FunctionDecl::new(QualType::void_(), vec![ParamDecl::new("", param_ty)]);
        function.ctor_kind = Some(CtorKind::Copy);
        function.has_body = true;
        function.method = Some(method_info(inner));
        let ctor = tu.add_decl(Decl::new(
            DeclName::Constructor,
            DeclKind::Function(function),
            loc(file, 2),
        ));
        tu.attach_child(inner, ctor);

        let outer = tu.add_root(Decl::new(
            DeclName::Identifier("Outer".to_string()),
            DeclKind::Record(RecordDecl::definition(
                TagKind::Struct,
                vec![FieldDecl::new("x", QualType::record(inner))],
            )),
            loc(file, 5),
        ));

        let ctx = AstContext::new(tu);
        let copy = ctx.special_members(outer).unwrap().copy_constructor;
        assert!(!copy.user_declared);
        assert!(!copy.deleted);
        assert!(!copy.trivial);
    }

    #[test]
    fn test_nested_record_layout() {
        let mut tu = TranslationUnit::new();
        let file = tu.add_file(SourceFile::named("a.h"));
        let inner = tu.add_root(Decl::new(
            DeclName::Identifier("Inner".to_string()),
            DeclKind::Record(RecordDecl::definition(
                TagKind::Struct,
                vec![
                    FieldDecl::new("a", QualType::double()),
                    FieldDecl::new("b", QualType::int()),
                ],
            )),
            loc(file, 1),
        ));
        let outer = tu.add_root(Decl::new(
            DeclName::Identifier("Outer".to_string()),
            DeclKind::Record(RecordDecl::definition(
                TagKind::Struct,
                vec![
                    FieldDecl::new("c", QualType::builtin(crate::ast::BuiltinKind::Char)),
                    FieldDecl::new("inner", QualType::record(inner)),
                ],
            )),
            loc(file, 5),
        ));
        let ctx = AstContext::new(tu);
        let layout = ctx.record_layout(outer).unwrap();
        assert_eq!(layout.field_offsets, vec![0, 64]);
        assert_eq!(layout.size, 24);
        assert_eq!(layout.alignment, 8);
    }

    #[test]
    fn test_layout_unavailable_for_forward_declaration() {
        let mut tu = TranslationUnit::new();
        let file = tu.add_file(SourceFile::named("a.h"));
        let fwd = tu.add_root(Decl::new(
            DeclName::Identifier("Fwd".to_string()),
            DeclKind::Record(RecordDecl::forward(TagKind::Struct)),
            loc(file, 1),
        ));
        let ctx = AstContext::new(tu);
        assert_eq!(
            ctx.record_layout(fwd).unwrap_err(),
            ImportError::LayoutUnavailable
        );
    }

    #[test]
    fn test_canonical_identity_spans_redeclarations() {
        let mut tu = TranslationUnit::new();
        let file = tu.add_file(SourceFile::named("a.h"));
        let first = tu.add_root(Decl::new(
            DeclName::Identifier("S".to_string()),
            DeclKind::Record(RecordDecl::forward(TagKind::Struct)),
            loc(file, 1),
        ));
        let second = tu.add_root(
            Decl::new(
                DeclName::Identifier("S".to_string()),
                DeclKind::Record(RecordDecl::definition(TagKind::Struct, Vec::new())),
                loc(file, 2),
            )
            .with_canonical(first),
        );
        let ctx = AstContext::new(tu);
        assert_eq!(ctx.canonical(second), first);
        assert_eq!(ctx.decl_id(second), ctx.decl_id(first));
        assert_eq!(ctx.definition_of(first), Some(second));
    }
}
