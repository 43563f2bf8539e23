//! Assembly Text Buffers
//!
//! The append-only text buffers the backend writes into. Each backend
//! instance owns two: a code stream and a data stream, concatenated when
//! output is detached.

/// Append-only growable assembly text buffer
#[derive(Debug, Default)]
pub struct AsmBuffer {
    text: String,
}

impl AsmBuffer {
    pub fn new() -> Self {
        Self {
            text: String::with_capacity(4096),
        }
    }

    /// Append one instruction or directive line, indented
    pub fn ins(&mut self, line: impl AsRef<str>) {
        self.text.push('\t');
        self.text.push_str(line.as_ref());
        self.text.push('\n');
    }

    /// Append a label definition line
    pub fn label(&mut self, label: impl AsRef<str>) {
        self.text.push_str(label.as_ref());
        self.text.push(':');
        self.text.push('\n');
    }

    /// Append a line verbatim
    pub fn raw(&mut self, line: impl AsRef<str>) {
        self.text.push_str(line.as_ref());
        self.text.push('\n');
    }

    /// Append an empty line
    pub fn blank(&mut self) {
        self.text.push('\n');
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Number of machine instruction lines (indented, not a directive)
    pub fn instruction_count(&self) -> usize {
        self.text
            .lines()
            .filter(|l| {
                let Some(body) = l.strip_prefix('\t') else {
                    return false;
                };
                !body.starts_with('.') && !body.starts_with('#') && !body.is_empty()
            })
            .count()
    }

    /// Detach the buffer contents, leaving this buffer empty
    pub fn take(&mut self) -> String {
        std::mem::take(&mut self.text)
    }

    pub fn clear(&mut self) {
        self.text.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ins_and_label_formatting() {
        let mut buf = AsmBuffer::new();
        buf.label(".L_f_0");
        buf.ins("li 3,42");
        buf.ins(".align 2");
        assert_eq!(buf.as_str(), ".L_f_0:\n\tli 3,42\n\t.align 2\n");
    }

    #[test]
    fn test_instruction_count_skips_directives_and_labels() {
        let mut buf = AsmBuffer::new();
        buf.raw(".abiversion 1");
        buf.ins(".section \".text\"");
        buf.label("main");
        buf.ins("mflr 0");
        buf.ins("std 0,16(1)");
        assert_eq!(buf.instruction_count(), 2);
    }

    #[test]
    fn test_take_empties_buffer() {
        let mut buf = AsmBuffer::new();
        buf.ins("blr");
        let text = buf.take();
        assert_eq!(text, "\tblr\n");
        assert!(buf.is_empty());
    }
}
