//! Raw-comment formatting and the comment manager.
//!
//! The comment manager produces the comments that are NOT attached to any
//! imported declaration, in source order, so the emitter can interleave them
//! with items. Doc comments attached to declarations are not emitted
//! separately; they travel in the owning item's `doc_comment` field.

use crate::ast::{Decl, FileId, RawComment};
use crate::context::AstContext;

/// Strip comment markers and decoration from a raw comment.
///
/// For line comments (`///`, `//!`, `//`) each line loses its marker and one
/// leading space. For block comments (`/** */`, `/* */`) continuation lines
/// lose their leading whitespace and one `*` decoration. A line that uses
/// `*` as a bullet therefore loses the bullet and keeps the space after it,
/// and the space before the closing `*/` survives; both quirks are accepted
/// behavior.
pub fn format_raw_comment(text: &str) -> String {
    let text = text.trim_end_matches('\n');
    if let Some(block) = text.strip_prefix("/*") {
        let block = block.strip_prefix('*').unwrap_or(block);
        let block = block.strip_suffix("*/").unwrap_or(block);
        let mut lines = Vec::new();
        for (i, line) in block.split('\n').enumerate() {
            if i == 0 {
                lines.push(line.strip_prefix(' ').unwrap_or(line).to_string());
            } else {
                let trimmed = line.trim_start();
                let stripped = trimmed.strip_prefix('*').unwrap_or(trimmed);
                lines.push(stripped.to_string());
            }
        }
        lines.join("\n")
    } else {
        let mut lines = Vec::new();
        for line in text.split('\n') {
            let trimmed = line.trim_start();
            let stripped = trimmed
                .strip_prefix("///")
                .or_else(|| trimmed.strip_prefix("//!"))
                .or_else(|| trimmed.strip_prefix("//"))
                .unwrap_or(trimmed);
            lines.push(stripped.strip_prefix(' ').unwrap_or(stripped).to_string());
        }
        lines.join("\n")
    }
}

/// Per-file iterator over raw comments, yielding the top-level ones.
#[derive(Debug)]
pub struct CommentManager<'a> {
    ctx: &'a AstContext,
    current_file: Option<FileId>,
    /// Index of the next unvisited comment in the current file.
    next_comment: usize,
    floating: Vec<&'a RawComment>,
}

impl<'a> CommentManager<'a> {
    pub fn new(ctx: &'a AstContext) -> Self {
        Self {
            ctx,
            current_file: None,
            next_comment: 0,
            floating: Vec::new(),
        }
    }

    /// Advance past a declaration: emit every comment of the current file
    /// that begins before it (except its own doc comment), then skip the
    /// comments inside its extent. Namespace extents are not skipped, since
    /// their contents are visited as declarations of their own.
    pub fn visit_decl(&mut self, decl: &Decl) {
        let begin = decl.begin;
        // Virtual declarations have no usable file.
        if !begin.is_valid() {
            return;
        }
        // Source locations of different files are not comparable by `<`, so
        // flush the previous file's remainder when the file changes.
        if self.current_file != Some(begin.file) {
            self.flush();
            self.current_file = Some(begin.file);
            self.next_comment = 0;
        }

        let comments = self.ctx.comments_in_file(begin.file);
        let doc_comment = self.ctx.attached_comment_at(begin);
        while self.next_comment < comments.len() && comments[self.next_comment].begin < begin {
            let comment = &comments[self.next_comment];
            let is_doc = doc_comment.is_some_and(|doc| doc.begin == comment.begin);
            if !is_doc {
                self.floating.push(comment);
            }
            self.next_comment += 1;
        }

        if !decl.is_namespace() {
            while self.next_comment < comments.len()
                && comments[self.next_comment].begin < decl.end
            {
                self.next_comment += 1;
            }
        }
    }

    /// Emit the remaining comments of the current file. Called at the end of
    /// the translation unit and when moving to a new file.
    pub fn flush(&mut self) {
        if let Some(file) = self.current_file {
            let comments = self.ctx.comments_in_file(file);
            while self.next_comment < comments.len() {
                self.floating.push(&comments[self.next_comment]);
                self.next_comment += 1;
            }
        }
    }

    /// The collected top-level comments, in source order.
    pub fn floating_comments(&self) -> &[&'a RawComment] {
        &self.floating
    }
}
