//! Streaming XML token writer (spec §4.4.2).
//!
//! Pretty-printed by default (4-space indent, LF). Empty elements render
//! as `<x/>`. The prologue is opt-in at construction.

use crate::error::{XmlError, XmlErrorKind};

/// Formatting options for [`XmlWriter`].
#[derive(Debug, Clone, Copy)]
pub struct WriteOptions {
    prologue: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self { prologue: false }
    }
}

impl WriteOptions {
    /// No `<?xml ...?>` prologue (the default).
    pub const fn no_prologue() -> Self {
        Self { prologue: false }
    }

    /// Emit `<?xml version="1.0"?>` before the root element.
    pub const fn with_prologue() -> Self {
        Self { prologue: true }
    }
}

struct OpenElement {
    name: String,
    attrs_closed: bool,
    wrote_child: bool,
}

/// A push-based XML writer.
pub struct XmlWriter {
    out: String,
    stack: Vec<OpenElement>,
    wrote_root: bool,
}

impl XmlWriter {
    /// A new writer with the given formatting options.
    pub fn new(options: WriteOptions) -> Self {
        let mut out = String::new();
        if options.prologue {
            out.push_str("<?xml version=\"1.0\"?>\n");
        }
        Self {
            out,
            stack: Vec::new(),
            wrote_root: false,
        }
    }

    /// Consume the writer and return the rendered document text.
    pub fn finish(self) -> String {
        self.out
    }

    fn depth(&self) -> usize {
        self.stack.len()
    }

    fn newline_indent(&mut self) {
        self.out.push('\n');
        for _ in 0..self.depth() {
            self.out.push_str("    ");
        }
    }

    fn close_start_tag_if_open(&mut self) {
        if let Some(top) = self.stack.last_mut() {
            if !top.attrs_closed {
                self.out.push('>');
                top.attrs_closed = true;
            }
        }
    }

    /// Begin an element with the given qualified name text (already
    /// prefixed by the caller if namespaced).
    pub fn begin_element(&mut self, name: &str) -> Result<(), XmlError> {
        self.close_start_tag_if_open();
        if let Some(top) = self.stack.last_mut() {
            top.wrote_child = true;
        }
        if !self.stack.is_empty() || self.wrote_root {
            self.newline_indent();
        }
        self.out.push('<');
        self.out.push_str(name);
        self.stack.push(OpenElement {
            name: name.to_string(),
            attrs_closed: false,
            wrote_child: false,
        });
        self.wrote_root = true;
        Ok(())
    }

    /// Write an attribute on the currently-open start tag. Must be called
    /// before any child element or text is written.
    pub fn attribute(&mut self, name: &str, value: &str) -> Result<(), XmlError> {
        match self.stack.last_mut() {
            Some(top) if !top.attrs_closed => {
                self.out.push(' ');
                self.out.push_str(name);
                self.out.push_str("=\"");
                escape_into(&mut self.out, value, true);
                self.out.push('"');
                Ok(())
            }
            _ => Err(XmlError::ser(XmlErrorKind::ProgrammerError {
                message: "attribute() called after a child element or text was written",
            })),
        }
    }

    /// End the current element, closing it as `<x/>` if nothing was
    /// written inside it.
    pub fn end_element(&mut self) -> Result<(), XmlError> {
        let top = self
            .stack
            .pop()
            .ok_or_else(|| XmlError::ser(XmlErrorKind::ProgrammerError {
                message: "end_element without a matching begin_element",
            }))?;
        if !top.attrs_closed {
            self.out.push_str("/>");
        } else {
            if top.wrote_child {
                self.newline_indent();
            }
            self.out.push_str("</");
            self.out.push_str(&top.name);
            self.out.push('>');
        }
        Ok(())
    }

    /// Write a text node, applying the line-ending-safe escaping rules.
    pub fn text(&mut self, value: &str) -> Result<(), XmlError> {
        self.close_start_tag_if_open();
        escape_into(&mut self.out, value, false);
        Ok(())
    }
}

fn escape_into(out: &mut String, value: &str, is_attribute: bool) {
    for c in value.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' if is_attribute => out.push_str("&quot;"),
            '\r' => out.push_str("&#xD;"),
            '\n' => out.push_str("&#xA;"),
            '\u{85}' => out.push_str("&#x85;"),
            '\u{2028}' => out.push_str("&#x2028;"),
            c => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_element_self_closes() {
        let mut w = XmlWriter::new(WriteOptions::no_prologue());
        w.begin_element("a").unwrap();
        w.end_element().unwrap();
        assert_eq!(w.finish(), "<a/>");
    }

    #[test]
    fn nested_elements_are_pretty_printed() {
        let mut w = XmlWriter::new(WriteOptions::no_prologue());
        w.begin_element("a").unwrap();
        w.begin_element("b").unwrap();
        w.text("x").unwrap();
        w.end_element().unwrap();
        w.end_element().unwrap();
        assert_eq!(w.finish(), "<a>\n    <b>x</b>\n</a>");
    }

    #[test]
    fn attributes_render_in_insertion_order() {
        let mut w = XmlWriter::new(WriteOptions::no_prologue());
        w.begin_element("a").unwrap();
        w.attribute("x", "1").unwrap();
        w.attribute("y", "2").unwrap();
        w.end_element().unwrap();
        assert_eq!(w.finish(), r#"<a x="1" y="2"/>"#);
    }

    #[test]
    fn attribute_after_text_is_an_error() {
        let mut w = XmlWriter::new(WriteOptions::no_prologue());
        w.begin_element("a").unwrap();
        w.text("x").unwrap();
        assert!(w.attribute("y", "2").is_err());
    }

    #[test]
    fn line_endings_become_numeric_character_references() {
        let mut w = XmlWriter::new(WriteOptions::no_prologue());
        w.begin_element("a").unwrap();
        w.text("x\r\ny").unwrap();
        w.end_element().unwrap();
        assert_eq!(w.finish(), "<a>x&#xD;&#xA;y</a>");
    }
}
