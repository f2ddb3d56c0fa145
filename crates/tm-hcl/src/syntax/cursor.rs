//! Character cursor with line and column tracking.

use crate::ast::SourceRange;
use crate::error::HclError;

use super::is_ident_continue;

pub(crate) struct Cursor<'a> {
    file: &'a str,
    source: &'a str,
    offset: usize,
    line: u32,
    column: u32,
}

impl<'a> Cursor<'a> {
    pub(crate) const fn new(file: &'a str, source: &'a str) -> Self {
        Self {
            file,
            source,
            offset: 0,
            line: 1,
            column: 1,
        }
    }

    pub(crate) fn rest(&self) -> &'a str {
        self.source.get(self.offset..).unwrap_or_default()
    }

    pub(crate) const fn offset(&self) -> usize {
        self.offset
    }

    pub(crate) fn slice_from(&self, start: usize) -> &'a str {
        self.source.get(start..self.offset).unwrap_or_default()
    }

    pub(crate) fn slice(&self, start: usize, end: usize) -> &'a str {
        self.source.get(start..end).unwrap_or_default()
    }

    pub(crate) fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    pub(crate) fn peek_second(&self) -> Option<char> {
        self.rest().chars().nth(1)
    }

    pub(crate) fn starts_with(&self, prefix: &str) -> bool {
        self.rest().starts_with(prefix)
    }

    pub(crate) fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.offset += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    pub(crate) fn bump_str(&mut self, text: &str) {
        for _ in text.chars() {
            self.bump();
        }
    }

    pub(crate) fn range(&self) -> SourceRange {
        SourceRange::new(self.file, self.line, self.column)
    }

    pub(crate) fn error(&self, message: &str) -> HclError {
        HclError::Syntax {
            file: self.file.to_owned(),
            line: self.line,
            column: self.column,
            message: message.to_owned(),
        }
    }

    pub(crate) fn identifier(&mut self) -> String {
        let start = self.offset;
        while self.peek().is_some_and(is_ident_continue) {
            self.bump();
        }
        self.slice_from(start).to_owned()
    }

    pub(crate) fn skip_inline_space(&mut self) {
        while matches!(self.peek(), Some(' ' | '\t' | '\r')) {
            self.bump();
        }
    }

    /// Skips whitespace, newlines, and comments.
    pub(crate) fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(' ' | '\t' | '\r' | '\n') => {
                    self.bump();
                }
                Some('#') => self.skip_line(),
                Some('/') if self.peek_second() == Some('/') => self.skip_line(),
                Some('/') if self.peek_second() == Some('*') => {
                    self.bump_str("/*");
                    while !self.starts_with("*/") && self.bump().is_some() {}
                    self.bump_str("*/");
                }
                _ => return,
            }
        }
    }

    pub(crate) fn skip_line(&mut self) {
        while self.peek().is_some_and(|c| c != '\n') {
            self.bump();
        }
    }
}
