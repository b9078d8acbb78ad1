//! Classification of special member functions.

use crate::ast::{Access, TagKind};
use crate::context::SpecialMemberInfo;
use ferrule_ir::{AccessSpecifier, SpecialMemberDefinition, SpecialMemberFunc};

/// The access members get when they precede any access-specifier section.
pub fn default_access(tag: TagKind) -> Access {
    match tag {
        TagKind::Struct | TagKind::Union => Access::Public,
        TagKind::Class => Access::Private,
    }
}

pub fn translate_access(access: Access) -> AccessSpecifier {
    match access {
        Access::Public => AccessSpecifier::Public,
        Access::Protected => AccessSpecifier::Protected,
        Access::Private => AccessSpecifier::Private,
    }
}

/// Classify one special member from the front-end's raw facts. Implicit
/// members take the record's default access.
pub fn special_member_func(info: &SpecialMemberInfo, default: Access) -> SpecialMemberFunc {
    let definition = if info.deleted {
        SpecialMemberDefinition::Deleted
    } else if (!info.user_declared || info.defaulted) && info.trivial {
        SpecialMemberDefinition::Trivial
    } else {
        SpecialMemberDefinition::Nontrivial
    };
    SpecialMemberFunc {
        definition,
        access: translate_access(info.access.unwrap_or(default)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info() -> SpecialMemberInfo {
        SpecialMemberInfo {
            user_declared: false,
            deleted: false,
            defaulted: false,
            trivial: true,
            access: None,
        }
    }

    #[test]
    fn test_implicit_trivial() {
        let func = special_member_func(&info(), Access::Public);
        assert_eq!(func.definition, SpecialMemberDefinition::Trivial);
        assert_eq!(func.access, AccessSpecifier::Public);
    }

    #[test]
    fn test_implicit_takes_default_access() {
        // Implicit members on a class fall into the private default section.
        let func = special_member_func(&info(), default_access(TagKind::Class));
        assert_eq!(func.access, AccessSpecifier::Private);
    }

    #[test]
    fn test_deleted_wins_over_trivial() {
        let mut raw = info();
        raw.deleted = true;
        let func = special_member_func(&raw, Access::Public);
        assert_eq!(func.definition, SpecialMemberDefinition::Deleted);
    }

    #[test]
    fn test_user_defined_is_nontrivial() {
        let mut raw = info();
        raw.user_declared = true;
        raw.trivial = false;
        raw.access = Some(Access::Public);
        let func = special_member_func(&raw, Access::Private);
        assert_eq!(func.definition, SpecialMemberDefinition::Nontrivial);
        assert_eq!(func.access, AccessSpecifier::Public);
    }

    #[test]
    fn test_defaulted_trivial_keeps_declared_access() {
        let mut raw = info();
        raw.user_declared = true;
        raw.defaulted = true;
        raw.access = Some(Access::Private);
        let func = special_member_func(&raw, Access::Public);
        assert_eq!(func.definition, SpecialMemberDefinition::Trivial);
        assert_eq!(func.access, AccessSpecifier::Private);
    }
}
