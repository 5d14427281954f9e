//! Streaming XML token reader (spec §4.4.1), built on `quick-xml`'s
//! low-level event scanner.
//!
//! Namespace resolution, depth tracking, entity rejection, and the
//! whitespace-suppression rule are implemented here rather than delegated
//! to `quick-xml`'s own `NsReader`, so the emitted [`XmlToken`] stream
//! matches the token model exactly.

use std::collections::VecDeque;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader as QuickReader;

use crate::error::{XmlError, XmlErrorKind};

/// A local name, optionally namespace-prefixed, with its namespace URI
/// resolved at parse time by walking the element stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualifiedName {
    /// The unprefixed local name.
    pub local: String,
    /// The namespace prefix in the source document, if any.
    pub prefix: Option<String>,
    /// The namespace URI the prefix (or default namespace) resolved to.
    pub uri: Option<String>,
}

impl QualifiedName {
    fn unqualified(local: impl Into<String>) -> Self {
        Self {
            local: local.into(),
            prefix: None,
            uri: None,
        }
    }
}

/// One lexical unit of the XML token stream (spec §3).
#[derive(Debug, Clone, PartialEq)]
pub enum XmlToken {
    /// A start tag (or the start half of a self-closing tag).
    BeginElement {
        /// Nesting depth; the document root is depth 1.
        depth: usize,
        /// The element's qualified name.
        name: QualifiedName,
        /// Non-namespace attributes, in document order.
        attributes: Vec<(QualifiedName, String)>,
        /// `xmlns`/`xmlns:*` declarations made on this element.
        ns_declarations: Vec<(Option<String>, String)>,
    },
    /// An end tag (or the end half of a self-closing tag).
    EndElement {
        /// Matches the depth of its `BeginElement`.
        depth: usize,
        /// The element's qualified name.
        name: QualifiedName,
    },
    /// A run of text (including CDATA) with no intervening elements.
    Text {
        /// Depth of the enclosing element.
        depth: usize,
        /// The literal, unescaped text.
        value: String,
    },
}

struct Frame {
    depth: usize,
    local: String,
    prefix: Option<String>,
    saw_child: bool,
    text_buf: String,
}

/// A single-pass XML tokenizer over a borrowed byte slice.
pub struct XmlReader<'de> {
    inner: QuickReader<&'de [u8]>,
    raw_buf: Vec<u8>,
    frames: Vec<Frame>,
    ns_env: Vec<Vec<(Option<String>, String)>>,
    pending: VecDeque<XmlToken>,
    last_token: Option<XmlToken>,
    eof: bool,
}

impl<'de> XmlReader<'de> {
    /// Build a reader over a UTF-8 XML document.
    pub fn new(input: &'de [u8]) -> Self {
        // quick-xml defaults to untrimmed text events; the
        // whitespace-suppression rule is applied here, not by the scanner.
        let inner = QuickReader::from_reader(input);
        Self {
            inner,
            raw_buf: Vec::new(),
            frames: Vec::new(),
            ns_env: Vec::new(),
            pending: VecDeque::new(),
            last_token: None,
            eof: false,
        }
    }

    /// The token most recently returned by [`XmlReader::next_token`].
    /// Unaffected by [`XmlReader::peek`].
    pub fn last_token(&self) -> Option<&XmlToken> {
        self.last_token.as_ref()
    }

    /// Pull the next token, consuming it. `Ok(None)` at end of document.
    pub fn next_token(&mut self) -> Result<Option<XmlToken>, XmlError> {
        self.fill_until(1)?;
        let tok = self.pending.pop_front();
        if let Some(tok) = &tok {
            self.last_token = Some(tok.clone());
        }
        Ok(tok)
    }

    /// Borrow the `k`-th upcoming token (0-based) without consuming it. Two
    /// calls with the same `k` return equal tokens.
    pub fn peek(&mut self, k: usize) -> Result<Option<&XmlToken>, XmlError> {
        self.fill_until(k + 1)?;
        Ok(self.pending.get(k))
    }

    /// Advance, consuming tokens, until one matches `predicate`; returns
    /// that token without consuming it (it remains for the next
    /// [`XmlReader::next_token`] call), or `None` at end of document.
    pub fn seek(
        &mut self,
        mut predicate: impl FnMut(&XmlToken) -> bool,
    ) -> Result<Option<XmlToken>, XmlError> {
        loop {
            match self.peek(0)? {
                Some(tok) if predicate(tok) => return Ok(Some(tok.clone())),
                Some(_) => {
                    self.next_token()?;
                }
                None => return Ok(None),
            }
        }
    }

    /// A bounded reader scoped to the element whose `BeginElement` at
    /// `open_depth` has already been consumed (the `CHILD` start variant:
    /// the subtree begins inside the open element, so an empty element
    /// yields an immediately-exhausted subtree).
    pub fn subtree(&mut self, open_depth: usize) -> XmlSubtreeReader<'_, 'de> {
        XmlSubtreeReader {
            reader: self,
            base_depth: open_depth,
            closed: false,
        }
    }

    fn fill_until(&mut self, count: usize) -> Result<(), XmlError> {
        while self.pending.len() < count && !self.eof {
            self.pump()?;
        }
        Ok(())
    }

    fn pump(&mut self) -> Result<(), XmlError> {
        self.raw_buf.clear();
        let event = self.inner.read_event_into(&mut self.raw_buf)?;
        match event {
            Event::Start(e) => self.handle_start(&e, false)?,
            Event::Empty(e) => self.handle_start(&e, true)?,
            Event::End(_) => self.handle_end_frame()?,
            Event::Text(e) => {
                let text = e
                    .unescape()
                    .map_err(|_| XmlError::de(XmlErrorKind::InvalidReference))?;
                self.push_text(text.into_owned());
            }
            Event::CData(e) => {
                let text = std::str::from_utf8(e.as_ref())
                    .map_err(|_| {
                        XmlError::de(XmlErrorKind::Malformed {
                            message: String::from("CDATA section is not valid UTF-8"),
                        })
                    })?
                    .to_owned();
                self.push_text(text);
            }
            Event::DocType(_) => return Err(XmlError::de(XmlErrorKind::InvalidReference)),
            Event::Decl(_) | Event::PI(_) | Event::Comment(_) => {}
            Event::Eof => self.eof = true,
        }
        Ok(())
    }

    fn push_text(&mut self, text: String) {
        if let Some(frame) = self.frames.last_mut() {
            frame.text_buf.push_str(&text);
        }
    }

    fn handle_start(&mut self, e: &BytesStart<'_>, self_closing: bool) -> Result<(), XmlError> {
        let (local, prefix) = split_name(e.name().as_ref());

        let mut ns_decls = Vec::new();
        let mut attributes = Vec::new();
        for attr in e.attributes() {
            let attr = attr.map_err(|err| {
                XmlError::de(XmlErrorKind::Malformed {
                    message: err.to_string(),
                })
            })?;
            let value = attr
                .unescape_value()
                .map_err(|_| XmlError::de(XmlErrorKind::InvalidReference))?
                .into_owned();
            let key = attr.key.as_ref();
            if key == b"xmlns" {
                ns_decls.push((None, value));
            } else if let Some(rest) = key.strip_prefix(b"xmlns:") {
                ns_decls.push((
                    Some(String::from_utf8_lossy(rest).into_owned()),
                    value,
                ));
            } else {
                let (a_local, a_prefix) = split_name(key);
                attributes.push((QualifiedName::unqualified(a_local), value));
                let _ = a_prefix;
            }
        }

        let flushed = self.frames.last_mut().and_then(|parent| {
            parent.saw_child = true;
            take_flushed(parent)
        });
        if let Some(tok) = flushed {
            self.pending.push_back(tok);
        }

        self.ns_env.push(ns_decls.clone());
        let depth = self.frames.len() + 1;
        let uri = self.resolve_uri(prefix.as_deref());
        let name = QualifiedName {
            local: local.clone(),
            prefix: prefix.clone(),
            uri,
        };
        let attributes = attributes
            .into_iter()
            .map(|(mut qn, v)| {
                qn.uri = self.resolve_uri(qn.prefix.as_deref());
                (qn, v)
            })
            .collect();

        self.pending.push_back(XmlToken::BeginElement {
            depth,
            name,
            attributes,
            ns_declarations: ns_decls,
        });
        self.frames.push(Frame {
            depth,
            local,
            prefix,
            saw_child: false,
            text_buf: String::new(),
        });

        if self_closing {
            self.handle_end_frame()?;
        }
        Ok(())
    }

    fn handle_end_frame(&mut self) -> Result<(), XmlError> {
        let frame = self
            .frames
            .pop()
            .ok_or_else(|| XmlError::de(XmlErrorKind::MismatchedEndElement))?;
        let uri = self.resolve_uri(frame.prefix.as_deref());
        self.ns_env.pop();

        if !frame.text_buf.is_empty() {
            if frame.saw_child {
                if !frame.text_buf.trim().is_empty() {
                    self.pending.push_back(XmlToken::Text {
                        depth: frame.depth,
                        value: frame.text_buf.clone(),
                    });
                }
            } else {
                self.pending.push_back(XmlToken::Text {
                    depth: frame.depth,
                    value: frame.text_buf.clone(),
                });
            }
        }

        self.pending.push_back(XmlToken::EndElement {
            depth: frame.depth,
            name: QualifiedName {
                local: frame.local,
                prefix: frame.prefix,
                uri,
            },
        });
        Ok(())
    }

    fn resolve_uri(&self, prefix: Option<&str>) -> Option<String> {
        for layer in self.ns_env.iter().rev() {
            if let Some((_, uri)) = layer.iter().find(|(p, _)| p.as_deref() == prefix) {
                return Some(uri.clone());
            }
        }
        None
    }
}

/// Called when a parent frame is about to gain a child: a pending text run
/// is either emitted now (it has non-whitespace content) or discarded
/// (pure whitespace adjacent to a child element, per the suppression rule).
fn take_flushed(frame: &mut Frame) -> Option<XmlToken> {
    if frame.text_buf.trim().is_empty() {
        frame.text_buf.clear();
        None
    } else {
        let depth = frame.depth;
        let value = core::mem::take(&mut frame.text_buf);
        Some(XmlToken::Text { depth, value })
    }
}

fn split_name(raw: &[u8]) -> (String, Option<String>) {
    let s = String::from_utf8_lossy(raw);
    match s.split_once(':') {
        Some((prefix, local)) => (local.to_string(), Some(prefix.to_string())),
        None => (s.into_owned(), None),
    }
}

/// A bounded reader scoped to one element's children (spec §4.4.1
/// "Subtree reader", `CHILD` start variant).
pub struct XmlSubtreeReader<'a, 'de> {
    reader: &'a mut XmlReader<'de>,
    base_depth: usize,
    closed: bool,
}

impl<'a, 'de> XmlSubtreeReader<'a, 'de> {
    /// Pull the next token scoped to this subtree; `Ok(None)` once the
    /// matching `EndElement` has been consumed.
    pub fn next_token(&mut self) -> Result<Option<XmlToken>, XmlError> {
        if self.closed {
            return Ok(None);
        }
        match self.reader.next_token()? {
            Some(XmlToken::EndElement { depth, .. }) if depth == self.base_depth => {
                self.closed = true;
                Ok(None)
            }
            Some(tok) => Ok(Some(tok)),
            None => {
                self.closed = true;
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_tokens(input: &str) -> Vec<XmlToken> {
        let mut reader = XmlReader::new(input.as_bytes());
        let mut out = Vec::new();
        while let Some(tok) = reader.next_token().unwrap() {
            out.push(tok);
        }
        out
    }

    #[test]
    fn depth_tracks_nesting() {
        let toks = all_tokens("<a><b>x</b></a>");
        let depths: Vec<usize> = toks
            .iter()
            .map(|t| match t {
                XmlToken::BeginElement { depth, .. }
                | XmlToken::EndElement { depth, .. }
                | XmlToken::Text { depth, .. } => *depth,
            })
            .collect();
        assert_eq!(depths, [1, 2, 2, 2, 1]);
    }

    #[test]
    fn self_closing_emits_begin_and_end() {
        let toks = all_tokens("<a><b/></a>");
        assert!(matches!(toks[1], XmlToken::BeginElement { depth: 2, .. }));
        assert!(matches!(toks[2], XmlToken::EndElement { depth: 2, .. }));
    }

    #[test]
    fn whitespace_between_children_is_suppressed() {
        let toks = all_tokens("<a>\n  <b>x</b>\n  <c>y</c>\n</a>");
        let texts: Vec<&str> = toks
            .iter()
            .filter_map(|t| match t {
                XmlToken::Text { value, .. } => Some(value.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(texts, ["x", "y"]);
    }

    #[test]
    fn whitespace_only_leaf_is_preserved() {
        let toks = all_tokens("<a>   </a>");
        assert!(matches!(&toks[1], XmlToken::Text { value, .. } if value == "   "));
    }

    #[test]
    fn entity_reference_is_fatal() {
        let mut reader = XmlReader::new(b"<a>&xxe;</a>");
        let mut saw_error = false;
        loop {
            match reader.next_token() {
                Ok(Some(_)) => continue,
                Ok(None) => break,
                Err(e) => {
                    assert!(matches!(e.kind(), XmlErrorKind::InvalidReference));
                    saw_error = true;
                    break;
                }
            }
        }
        assert!(saw_error);
    }

    #[test]
    fn doctype_is_fatal() {
        let input = b"<!DOCTYPE a [<!ENTITY xxe SYSTEM \"file:///etc/passwd\">]><a>&xxe;</a>";
        let mut reader = XmlReader::new(input);
        let err = loop {
            match reader.next_token() {
                Ok(Some(_)) => continue,
                Ok(None) => panic!("expected InvalidReference"),
                Err(e) => break e,
            }
        };
        assert!(matches!(err.kind(), XmlErrorKind::InvalidReference));
    }

    #[test]
    fn namespace_prefix_resolves_via_ancestor_declaration() {
        let toks = all_tokens(r#"<a xmlns:ns="urn:x"><ns:b>v</ns:b></a>"#);
        match &toks[1] {
            XmlToken::BeginElement { name, .. } => {
                assert_eq!(name.prefix.as_deref(), Some("ns"));
                assert_eq!(name.uri.as_deref(), Some("urn:x"));
            }
            other => panic!("unexpected token {other:?}"),
        }
    }

    #[test]
    fn peek_is_stable_and_does_not_move_last_token() {
        let mut reader = XmlReader::new(b"<a>x</a>");
        let first = reader.peek(0).unwrap().cloned();
        let second = reader.peek(0).unwrap().cloned();
        assert_eq!(first, second);
        assert!(reader.last_token().is_none());
    }

    #[test]
    fn subtree_scopes_to_matching_end_element() {
        let mut reader = XmlReader::new(b"<a><b>1</b><c>2</c></a>");
        assert!(matches!(
            reader.next_token().unwrap(),
            Some(XmlToken::BeginElement { depth: 1, .. })
        ));
        let mut sub = reader.subtree(1);
        let mut seen = Vec::new();
        while let Some(tok) = sub.next_token().unwrap() {
            seen.push(tok);
        }
        assert_eq!(seen.len(), 6); // b,1,/b,c,2,/c
    }
}
