//! Record layout computation.
//!
//! Implements the C-compatible layout rules under the LP64 data model: each
//! field is placed at the next offset aligned to its natural alignment, the
//! record's alignment is the maximum field alignment, and the record's size
//! is rounded up to a multiple of its alignment. Empty records occupy one
//! byte.

use crate::ast::{FieldDecl, QualType};

/// Layout facts of one record definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordLayout {
    /// Total size in bytes.
    pub size: u64,
    /// Alignment in bytes.
    pub alignment: u64,
    /// Offset of each field in bits, in declaration order.
    pub field_offsets: Vec<u64>,
}

/// Compute the layout of a record from its fields. `resolve` supplies
/// `(size, alignment)` in bytes for a field type; returning `None` marks the
/// type as layout-less (e.g. an incomplete record) and fails the whole
/// computation.
pub fn compute(
    fields: &[FieldDecl],
    mut resolve: impl FnMut(&QualType) -> Option<(u64, u64)>,
) -> Option<RecordLayout> {
    let mut offset_bits: u64 = 0;
    let mut max_alignment: u64 = 1;
    let mut field_offsets = Vec::with_capacity(fields.len());

    for field in fields {
        let (size, alignment) = resolve(&field.ty)?;
        let alignment_bits = alignment * 8;
        offset_bits = round_up(offset_bits, alignment_bits.max(8));
        field_offsets.push(offset_bits);
        offset_bits += size * 8;
        max_alignment = max_alignment.max(alignment);
    }

    let size = (round_up(offset_bits, max_alignment * 8) / 8).max(1);
    Some(RecordLayout {
        size,
        alignment: max_alignment,
        field_offsets,
    })
}

fn round_up(value: u64, multiple: u64) -> u64 {
    value.div_ceil(multiple) * multiple
}
