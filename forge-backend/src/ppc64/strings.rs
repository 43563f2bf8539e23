//! Read-Only String Pool
//!
//! Deduplicating pool for string literals. Each distinct string gets one
//! `.LC{n}` label in `.rodata`; repeated interning of the same contents
//! returns the existing label.

use crate::buffer::AsmBuffer;

/// Pool of interned string literals
#[derive(Debug, Default)]
pub struct StringPool {
    entries: Vec<(String, String)>,
    next_label: u32,
}

impl StringPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a string, returning its `.LC{n}` label
    pub fn intern(&mut self, contents: &str) -> String {
        if let Some((label, _)) = self.entries.iter().find(|(_, s)| s == contents) {
            return label.clone();
        }
        let label = format!(".LC{}", self.next_label);
        self.next_label += 1;
        self.entries.push((label.clone(), contents.to_string()));
        label
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Emit the pool into the data stream as `.string` directives
    pub fn emit(&self, buf: &mut AsmBuffer) {
        if self.entries.is_empty() {
            return;
        }
        buf.ins(".section \".rodata\"");
        for (label, contents) in &self.entries {
            buf.label(label);
            buf.ins(format!(".string \"{}\"", escape(contents)));
        }
    }

    pub fn reset(&mut self) {
        self.entries.clear();
        self.next_label = 0;
    }
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_intern_assigns_sequential_labels() {
        let mut pool = StringPool::new();
        assert_eq!(pool.intern("hello"), ".LC0");
        assert_eq!(pool.intern("world"), ".LC1");
    }

    #[test]
    fn test_intern_deduplicates() {
        let mut pool = StringPool::new();
        let a = pool.intern("shared");
        let b = pool.intern("shared");
        assert_eq!(a, b);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_emit_escapes_specials() {
        let mut pool = StringPool::new();
        pool.intern("a\n\"b\"\t\\c");
        let mut buf = AsmBuffer::new();
        pool.emit(&mut buf);
        assert_eq!(
            buf.as_str(),
            "\t.section \".rodata\"\n.LC0:\n\t.string \"a\\n\\\"b\\\"\\t\\\\c\"\n"
        );
    }

    #[test]
    fn test_emit_empty_pool_writes_nothing() {
        let pool = StringPool::new();
        let mut buf = AsmBuffer::new();
        pool.emit(&mut buf);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_reset_restarts_numbering() {
        let mut pool = StringPool::new();
        pool.intern("x");
        pool.reset();
        assert!(pool.is_empty());
        assert_eq!(pool.intern("y"), ".LC0");
    }
}
