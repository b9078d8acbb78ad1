//! Clang-like AST representation.
//!
//! This module provides the simplified view of a parsed C++ translation unit
//! that the importer works with. It carries exactly the facts the lowering
//! needs: declarations with canonical identity, qualified types, source
//! locations that are totally ordered within the translation unit, raw
//! comments per file, and lifetime annotations.

use ferrule_ir::LifetimeId;
use rustc_hash::FxHashMap;

/// Index of a source file within the translation unit. The index doubles as
/// the file's rank in translation-unit order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(pub u32);

impl FileId {
    pub const INVALID: FileId = FileId(u32::MAX);

    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

/// A source location. Locations compare in translation-unit order: by file
/// rank first, then line, then column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Loc {
    pub file: FileId,
    pub line: u32,
    pub column: u32,
}

impl Loc {
    pub const INVALID: Loc = Loc {
        file: FileId::INVALID,
        line: 0,
        column: 0,
    };

    pub fn new(file: FileId, line: u32, column: u32) -> Self {
        Self { file, line, column }
    }

    pub fn is_valid(self) -> bool {
        self.file.is_valid()
    }
}

/// Index of a declaration in the translation unit's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeclIdx(pub u32);

/// C++ access specifier for class members.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    Protected,
    Private,
}

/// C++ constructor kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CtorKind {
    /// Default constructor
    Default,
    /// Copy constructor (takes const T&)
    Copy,
    /// Move constructor (takes T&&)
    Move,
    /// Other constructor (parameterized, converting, etc.)
    Other,
}

/// Reference qualification of a member function (`&`, `&&`, or none).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefQualifier {
    None,
    LValue,
    RValue,
}

/// Tag kind of a record declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    Struct,
    Class,
    Union,
}

/// A declaration name as reported by the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclName {
    /// An ordinary identifier; may be empty for unnamed declarations.
    Identifier(String),
    Constructor,
    Destructor,
    /// Operators, conversion functions and other special names.
    Other(String),
}

/// Builtin (non-user-defined, non-compound) types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinKind {
    Void,
    Bool,
    Char,
    SChar,
    UChar,
    Short,
    UShort,
    Int,
    UInt,
    Long,
    ULong,
    LongLong,
    ULongLong,
    Char16,
    Char32,
    WChar,
    Float,
    Double,
    Int128,
    UInt128,
}

impl BuiltinKind {
    /// The canonical C++ spelling of this builtin.
    pub fn spelling(self) -> &'static str {
        match self {
            BuiltinKind::Void => "void",
            BuiltinKind::Bool => "bool",
            BuiltinKind::Char => "char",
            BuiltinKind::SChar => "signed char",
            BuiltinKind::UChar => "unsigned char",
            BuiltinKind::Short => "short",
            BuiltinKind::UShort => "unsigned short",
            BuiltinKind::Int => "int",
            BuiltinKind::UInt => "unsigned int",
            BuiltinKind::Long => "long",
            BuiltinKind::ULong => "unsigned long",
            BuiltinKind::LongLong => "long long",
            BuiltinKind::ULongLong => "unsigned long long",
            BuiltinKind::Char16 => "char16_t",
            BuiltinKind::Char32 => "char32_t",
            BuiltinKind::WChar => "wchar_t",
            BuiltinKind::Float => "float",
            BuiltinKind::Double => "double",
            BuiltinKind::Int128 => "__int128",
            BuiltinKind::UInt128 => "unsigned __int128",
        }
    }

    /// Whether this is an integer type in the C++ sense (includes `bool` and
    /// the character types).
    pub fn is_integer(self) -> bool {
        !matches!(
            self,
            BuiltinKind::Void | BuiltinKind::Float | BuiltinKind::Double
        )
    }

    pub fn is_signed_integer(self) -> bool {
        matches!(
            self,
            BuiltinKind::Char
                | BuiltinKind::SChar
                | BuiltinKind::Short
                | BuiltinKind::Int
                | BuiltinKind::Long
                | BuiltinKind::LongLong
                | BuiltinKind::WChar
                | BuiltinKind::Int128
        )
    }

    /// Bit width under the LP64 data model. `None` for `void`.
    pub fn bit_width(self) -> Option<u32> {
        match self {
            BuiltinKind::Void => None,
            BuiltinKind::Bool | BuiltinKind::Char | BuiltinKind::SChar | BuiltinKind::UChar => {
                Some(8)
            }
            BuiltinKind::Short | BuiltinKind::UShort | BuiltinKind::Char16 => Some(16),
            BuiltinKind::Int
            | BuiltinKind::UInt
            | BuiltinKind::Char32
            | BuiltinKind::WChar
            | BuiltinKind::Float => Some(32),
            BuiltinKind::Long
            | BuiltinKind::ULong
            | BuiltinKind::LongLong
            | BuiltinKind::ULongLong
            | BuiltinKind::Double => Some(64),
            BuiltinKind::Int128 | BuiltinKind::UInt128 => Some(128),
        }
    }
}

/// Shape of a qualified type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeKind {
    Builtin(BuiltinKind),
    /// Pointer type: T*
    Pointer(Box<QualType>),
    /// Lvalue reference type: T&
    LValueReference(Box<QualType>),
    /// Rvalue reference type: T&&
    RValueReference(Box<QualType>),
    /// Reference to a struct/class declaration (any redeclaration).
    Record(DeclIdx),
    /// Reference to a typedef declaration; never desugared here.
    Typedef(DeclIdx),
}

/// A C++ type with cv-qualifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualType {
    pub kind: TypeKind,
    pub is_const: bool,
    pub is_volatile: bool,
}

impl QualType {
    pub fn builtin(kind: BuiltinKind) -> Self {
        Self {
            kind: TypeKind::Builtin(kind),
            is_const: false,
            is_volatile: false,
        }
    }

    pub fn void_() -> Self {
        Self::builtin(BuiltinKind::Void)
    }

    pub fn bool_() -> Self {
        Self::builtin(BuiltinKind::Bool)
    }

    pub fn int() -> Self {
        Self::builtin(BuiltinKind::Int)
    }

    pub fn float() -> Self {
        Self::builtin(BuiltinKind::Float)
    }

    pub fn double() -> Self {
        Self::builtin(BuiltinKind::Double)
    }

    pub fn record(decl: DeclIdx) -> Self {
        Self {
            kind: TypeKind::Record(decl),
            is_const: false,
            is_volatile: false,
        }
    }

    pub fn typedef(decl: DeclIdx) -> Self {
        Self {
            kind: TypeKind::Typedef(decl),
            is_const: false,
            is_volatile: false,
        }
    }

    /// Create a pointer to this type.
    pub fn ptr(self) -> Self {
        Self {
            kind: TypeKind::Pointer(Box::new(self)),
            is_const: false,
            is_volatile: false,
        }
    }

    /// Create an lvalue reference to this type.
    pub fn lvalue_ref(self) -> Self {
        Self {
            kind: TypeKind::LValueReference(Box::new(self)),
            is_const: false,
            is_volatile: false,
        }
    }

    /// Create an rvalue reference to this type.
    pub fn rvalue_ref(self) -> Self {
        Self {
            kind: TypeKind::RValueReference(Box::new(self)),
            is_const: false,
            is_volatile: false,
        }
    }

    /// Const-qualify this type.
    pub fn const_(mut self) -> Self {
        self.is_const = true;
        self
    }
}

/// A function parameter declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamDecl {
    /// Empty for unnamed parameters.
    pub name: String,
    pub ty: QualType,
    pub begin: Loc,
}

impl ParamDecl {
    pub fn new(name: impl Into<String>, ty: QualType) -> Self {
        Self {
            name: name.into(),
            ty,
            begin: Loc::INVALID,
        }
    }

    pub fn with_begin(mut self, begin: Loc) -> Self {
        self.begin = begin;
        self
    }
}

/// Lifetime annotations of one function, as produced by the annotation tool.
/// Each list covers the pointer/reference layers of one type, outermost last.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FunctionLifetimes {
    pub this_lifetimes: Option<Vec<LifetimeId>>,
    /// One list per declared parameter.
    pub param_lifetimes: Vec<Vec<LifetimeId>>,
    pub return_lifetimes: Vec<LifetimeId>,
}

/// Facts identifying a function declaration as a class member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodInfo {
    /// The record this method belongs to.
    pub record: DeclIdx,
    /// False for static member functions.
    pub is_instance: bool,
    pub access: Access,
    pub is_const: bool,
    pub is_virtual: bool,
    pub ref_qualifier: RefQualifier,
}

/// A function declaration/definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDecl {
    pub return_type: QualType,
    pub params: Vec<ParamDecl>,
    pub is_inline: bool,
    pub is_deleted: bool,
    pub is_defaulted: bool,
    pub has_body: bool,
    /// Set for constructors only.
    pub ctor_kind: Option<CtorKind>,
    /// Set for member functions only.
    pub method: Option<MethodInfo>,
    pub lifetimes: Option<FunctionLifetimes>,
}

impl FunctionDecl {
    pub fn new(return_type: QualType, params: Vec<ParamDecl>) -> Self {
        Self {
            return_type,
            params,
            is_inline: false,
            is_deleted: false,
            is_defaulted: false,
            has_body: false,
            ctor_kind: None,
            method: None,
            lifetimes: None,
        }
    }
}

/// A non-static data member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDecl {
    /// Empty for unnamed fields.
    pub name: String,
    pub ty: QualType,
    /// None when the field precedes any access-specifier section.
    pub access: Option<Access>,
    pub begin: Loc,
}

impl FieldDecl {
    pub fn new(name: impl Into<String>, ty: QualType) -> Self {
        Self {
            name: name.into(),
            ty,
            access: None,
            begin: Loc::INVALID,
        }
    }

    pub fn with_access(mut self, access: Access) -> Self {
        self.access = Some(access);
        self
    }

    pub fn with_begin(mut self, begin: Loc) -> Self {
        self.begin = begin;
        self
    }
}

/// A struct/class/union declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordDecl {
    pub tag: TagKind,
    /// Whether this declaration is the complete definition.
    pub is_complete_definition: bool,
    /// Whether the record is described by a class template or is a template
    /// specialization.
    pub is_template: bool,
    /// Whether the record carries the trivial-abi attribute.
    pub has_trivial_abi_attr: bool,
    pub is_effectively_final: bool,
    /// Fields of the definition, in declaration order.
    pub fields: Vec<FieldDecl>,
}

impl RecordDecl {
    pub fn definition(tag: TagKind, fields: Vec<FieldDecl>) -> Self {
        Self {
            tag,
            is_complete_definition: true,
            is_template: false,
            has_trivial_abi_attr: false,
            is_effectively_final: false,
            fields,
        }
    }

    pub fn forward(tag: TagKind) -> Self {
        Self {
            tag,
            is_complete_definition: false,
            is_template: false,
            has_trivial_abi_attr: false,
            is_effectively_final: false,
            fields: Vec::new(),
        }
    }

    pub fn with_trivial_abi_attr(mut self) -> Self {
        self.has_trivial_abi_attr = true;
        self
    }

    pub fn with_final(mut self) -> Self {
        self.is_effectively_final = true;
        self
    }

    pub fn with_template(mut self) -> Self {
        self.is_template = true;
        self
    }
}

/// A typedef or alias declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedefDecl {
    pub underlying: QualType,
}

/// Kinds of declarations the importer cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclKind {
    Namespace,
    Function(FunctionDecl),
    Record(RecordDecl),
    Typedef(TypedefDecl),
}

/// A declaration in the translation unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decl {
    pub name: DeclName,
    /// Enclosing namespace path, outermost first.
    pub qualifier: Vec<String>,
    pub begin: Loc,
    pub end: Loc,
    /// The canonical declaration for redeclaration chains; `None` means this
    /// declaration is its own canonical.
    pub canonical: Option<DeclIdx>,
    /// The declaration context; `None` at translation-unit scope.
    pub parent: Option<DeclIdx>,
    /// Child declarations in source order (member functions, nested records,
    /// nested typedefs, namespace contents).
    pub children: Vec<DeclIdx>,
    pub kind: DeclKind,
}

impl Decl {
    pub fn new(name: DeclName, kind: DeclKind, begin: Loc) -> Self {
        Self {
            name,
            qualifier: Vec::new(),
            begin,
            end: begin,
            canonical: None,
            parent: None,
            children: Vec::new(),
            kind,
        }
    }

    pub fn with_end(mut self, end: Loc) -> Self {
        self.end = end;
        self
    }

    pub fn with_canonical(mut self, canonical: DeclIdx) -> Self {
        self.canonical = Some(canonical);
        self
    }

    pub fn with_qualifier(mut self, qualifier: Vec<String>) -> Self {
        self.qualifier = qualifier;
        self
    }

    pub fn as_function(&self) -> Option<&FunctionDecl> {
        match &self.kind {
            DeclKind::Function(function) => Some(function),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&RecordDecl> {
        match &self.kind {
            DeclKind::Record(record) => Some(record),
            _ => None,
        }
    }

    pub fn is_namespace(&self) -> bool {
        matches!(self.kind, DeclKind::Namespace)
    }
}

/// A raw comment as lexed from a source file, markers included. Consecutive
/// line comments are merged into a single raw comment by the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawComment {
    pub text: String,
    pub begin: Loc,
    pub end: Loc,
}

/// A source file participating in the translation unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// None for builtin buffers (e.g. command-line definitions).
    pub name: Option<String>,
    pub is_system_header: bool,
    /// Location of the `#include` that pulled this file in.
    pub include_loc: Option<Loc>,
    /// Raw comments in source order.
    pub comments: Vec<RawComment>,
}

impl SourceFile {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            is_system_header: false,
            include_loc: None,
            comments: Vec::new(),
        }
    }

    pub fn system(name: impl Into<String>) -> Self {
        Self {
            is_system_header: true,
            ..Self::named(name)
        }
    }

    pub fn builtin() -> Self {
        Self {
            name: None,
            is_system_header: false,
            include_loc: None,
            comments: Vec::new(),
        }
    }

    pub fn with_include_loc(mut self, include_loc: Loc) -> Self {
        self.include_loc = Some(include_loc);
        self
    }
}

/// A parsed translation unit: files in translation-unit order, a declaration
/// arena, the top-level declarations in traversal order, and the lifetime
/// symbol table.
#[derive(Debug, Default)]
pub struct TranslationUnit {
    pub files: Vec<SourceFile>,
    decls: Vec<Decl>,
    pub roots: Vec<DeclIdx>,
    pub lifetime_names: FxHashMap<LifetimeId, String>,
}

impl TranslationUnit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&mut self, file: SourceFile) -> FileId {
        let id = FileId(self.files.len() as u32);
        self.files.push(file);
        id
    }

    /// Add a declaration to the arena without rooting it.
    pub fn add_decl(&mut self, decl: Decl) -> DeclIdx {
        let idx = DeclIdx(self.decls.len() as u32);
        self.decls.push(decl);
        idx
    }

    /// Add a top-level declaration.
    pub fn add_root(&mut self, decl: Decl) -> DeclIdx {
        let idx = self.add_decl(decl);
        self.roots.push(idx);
        idx
    }

    /// Record `child` as a member of `parent`'s declaration context.
    pub fn attach_child(&mut self, parent: DeclIdx, child: DeclIdx) {
        self.decls[child.0 as usize].parent = Some(parent);
        self.decls[parent.0 as usize].children.push(child);
    }

    pub fn add_comment(&mut self, file: FileId, comment: RawComment) {
        self.files[file.0 as usize].comments.push(comment);
    }

    pub fn name_lifetime(&mut self, id: LifetimeId, name: impl Into<String>) {
        self.lifetime_names.insert(id, name.into());
    }

    pub fn decl(&self, idx: DeclIdx) -> &Decl {
        &self.decls[idx.0 as usize]
    }

    pub fn decl_mut(&mut self, idx: DeclIdx) -> &mut Decl {
        &mut self.decls[idx.0 as usize]
    }

    pub fn decl_count(&self) -> usize {
        self.decls.len()
    }

    pub fn decls(&self) -> impl Iterator<Item = (DeclIdx, &Decl)> {
        self.decls
            .iter()
            .enumerate()
            .map(|(i, decl)| (DeclIdx(i as u32), decl))
    }

    /// The spelling of `ty` including qualifiers, e.g. `const int *`.
    pub fn type_spelling(&self, ty: &QualType) -> String {
        self.spell(ty, false)
    }

    /// The spelling of `ty` with the outermost cv-qualifiers dropped. Inner
    /// qualifiers are retained, so `const int *` keeps its pointee constness.
    pub fn unqualified_type_spelling(&self, ty: &QualType) -> String {
        self.spell(ty, true)
    }

    fn spell(&self, ty: &QualType, skip_outer_qualifiers: bool) -> String {
        let core = match &ty.kind {
            TypeKind::Builtin(builtin) => builtin.spelling().to_string(),
            TypeKind::Pointer(pointee) => format!("{} *", self.spell(pointee, false)),
            TypeKind::LValueReference(pointee) => format!("{} &", self.spell(pointee, false)),
            TypeKind::RValueReference(pointee) => format!("{} &&", self.spell(pointee, false)),
            TypeKind::Record(decl) | TypeKind::Typedef(decl) => {
                match &self.decl(*decl).name {
                    DeclName::Identifier(name) if !name.is_empty() => name.clone(),
                    _ => "(anonymous)".to_string(),
                }
            }
        };
        if ty.is_const && !skip_outer_qualifiers {
            match ty.kind {
                // Pointers spell their own constness on the right.
                TypeKind::Pointer(_)
                | TypeKind::LValueReference(_)
                | TypeKind::RValueReference(_) => format!("{core}const"),
                _ => format!("const {core}"),
            }
        } else {
            core
        }
    }
}
