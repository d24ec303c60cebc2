//! Forward-only, namespace-aware token cursor over `quick_xml::NsReader`.
//!
//! Every routine that receives a [`StartTag`] consumes the element through
//! its matching end tag before returning, so after any call the cursor sits
//! on whatever follows: the next sibling or the parent's close.

use crate::errors::AtomError;
use crate::extensions::ExtensionElement;
use crate::names::NS_XML;
use quick_xml::NsReader;
use quick_xml::Writer;
use quick_xml::events::{BytesCData, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::name::ResolveResult;
use std::io::BufRead;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TagAttribute {
    pub(crate) namespace: Option<String>,
    pub(crate) prefix: Option<String>,
    pub(crate) local_name: String,
    pub(crate) qname: String,
    pub(crate) value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StartTag {
    pub(crate) namespace: Option<String>,
    pub(crate) prefix: Option<String>,
    pub(crate) local_name: String,
    pub(crate) qname: String,
    pub(crate) attributes: Vec<TagAttribute>,
    /// `xmlns` / `xmlns:p` declarations made on this tag.
    pub(crate) declarations: Vec<(String, String)>,
    /// Self-closing: there is no end tag to consume.
    pub(crate) empty: bool,
}

#[derive(Debug)]
enum Token {
    Start(StartTag),
    End,
    Text(String),
    CData(String),
    Comment(String),
    Eof,
}

pub(crate) struct XmlCursor<R> {
    reader: NsReader<R>,
    buf: Vec<u8>,
}

impl<R: BufRead> XmlCursor<R> {
    pub(crate) fn new(input: R) -> Self {
        Self {
            reader: NsReader::from_reader(input),
            buf: Vec::new(),
        }
    }

    /// Advances to the document element. `None` for a document without one.
    pub(crate) fn move_to_start_element(&mut self) -> Result<Option<StartTag>, AtomError> {
        loop {
            match self.next_token()? {
                Token::Start(tag) => return Ok(Some(tag)),
                Token::Eof | Token::End => return Ok(None),
                Token::Text(_) | Token::CData(_) | Token::Comment(_) => {}
            }
        }
    }

    /// Next child element of `parent`, skipping character data. Returns
    /// `None` once the parent's end tag has been consumed.
    pub(crate) fn next_child(&mut self, parent: &StartTag) -> Result<Option<StartTag>, AtomError> {
        if parent.empty {
            return Ok(None);
        }
        loop {
            match self.next_token()? {
                Token::Start(tag) => return Ok(Some(tag)),
                Token::End => return Ok(None),
                Token::Text(_) | Token::CData(_) | Token::Comment(_) => {}
                Token::Eof => return Err(AtomError::UnexpectedEof(parent.qname.clone())),
            }
        }
    }

    /// Decoded character data of `tag`. Nested elements are skipped.
    pub(crate) fn read_text(&mut self, tag: &StartTag) -> Result<String, AtomError> {
        let mut text = String::new();
        if tag.empty {
            return Ok(text);
        }
        loop {
            match self.next_token()? {
                Token::Text(t) | Token::CData(t) => text.push_str(&t),
                Token::Start(child) => self.skip(&child)?,
                Token::Comment(_) => {}
                Token::End => return Ok(text),
                Token::Eof => return Err(AtomError::UnexpectedEof(tag.qname.clone())),
            }
        }
    }

    /// Consumes `tag` and everything inside it.
    pub(crate) fn skip(&mut self, tag: &StartTag) -> Result<(), AtomError> {
        if tag.empty {
            return Ok(());
        }
        let mut depth = 0usize;
        loop {
            match self.next_token()? {
                Token::Start(child) if !child.empty => depth += 1,
                Token::End if depth == 0 => return Ok(()),
                Token::End => depth -= 1,
                Token::Eof => return Err(AtomError::UnexpectedEof(tag.qname.clone())),
                _ => {}
            }
        }
    }

    /// Markup between the tags of `tag`, re-serialized. Each top-level
    /// element declares the namespaces it inherited from outside the body.
    pub(crate) fn read_inner_markup(&mut self, tag: &StartTag) -> Result<String, AtomError> {
        let mut out = Writer::new(Vec::new());
        if tag.empty {
            return into_string(out);
        }
        loop {
            match self.next_token()? {
                Token::Start(child) => {
                    let markup = self.capture_markup(&child)?;
                    out.get_mut().extend_from_slice(&markup);
                }
                Token::End => return into_string(out),
                Token::Text(text) => out.write_event(Event::Text(BytesText::new(&text)))?,
                Token::CData(text) => out.write_event(Event::CData(BytesCData::new(text)))?,
                Token::Comment(text) => {
                    out.write_event(Event::Comment(BytesText::from_escaped(text)))?
                }
                Token::Eof => return Err(AtomError::UnexpectedEof(tag.qname.clone())),
            }
        }
    }

    /// Captures `tag` as an extension element. Namespaces the subtree relies
    /// on from its ancestors are declared on the captured copy.
    pub(crate) fn capture_element(&mut self, tag: &StartTag) -> Result<ExtensionElement, AtomError> {
        let markup = self.capture_markup(tag)?;
        Ok(ExtensionElement {
            namespace: tag.namespace.clone(),
            prefix: tag.prefix.clone(),
            local_name: tag.local_name.clone(),
            attributes: tag
                .attributes
                .iter()
                .map(|a| (a.qname.clone(), a.value.clone()))
                .collect(),
            markup: String::from_utf8(markup).map_err(|e| AtomError::Serialization(e.to_string()))?,
        })
    }

    /// Outer markup of `tag`, self-contained with respect to namespaces.
    fn capture_markup(&mut self, tag: &StartTag) -> Result<Vec<u8>, AtomError> {
        let mut scope: Vec<String> = tag.declarations.iter().map(|(name, _)| name.clone()).collect();
        let mut free = Vec::new();
        note_bindings(tag, &scope, &mut free);

        let mut inner = Writer::new(Vec::new());
        self.copy_inner(tag, &mut inner, &mut scope, &mut free)?;

        let mut out = Writer::new(Vec::new());
        let start = bytes_start(tag, &free);
        if tag.empty {
            out.write_event(Event::Empty(start))?;
        } else {
            out.write_event(Event::Start(start))?;
            out.get_mut().extend_from_slice(&inner.into_inner());
            out.write_event(Event::End(BytesEnd::new(tag.qname.as_str())))?;
        }
        Ok(out.into_inner())
    }

    /// Copies the content of `tag`. `scope` holds the declarations made
    /// inside the captured fragment; bindings used but not declared there are
    /// collected into `free`.
    fn copy_inner(
        &mut self,
        tag: &StartTag,
        out: &mut Writer<Vec<u8>>,
        scope: &mut Vec<String>,
        free: &mut Vec<(String, String)>,
    ) -> Result<(), AtomError> {
        if tag.empty {
            return Ok(());
        }
        let mut open: Vec<(String, usize)> = Vec::new();
        loop {
            match self.next_token()? {
                Token::Start(child) => {
                    let mark = scope.len();
                    scope.extend(child.declarations.iter().map(|(name, _)| name.clone()));
                    note_bindings(&child, scope, free);
                    let start = bytes_start(&child, &[]);
                    if child.empty {
                        out.write_event(Event::Empty(start))?;
                        scope.truncate(mark);
                    } else {
                        out.write_event(Event::Start(start))?;
                        open.push((child.qname, mark));
                    }
                }
                Token::End => match open.pop() {
                    Some((name, mark)) => {
                        scope.truncate(mark);
                        out.write_event(Event::End(BytesEnd::new(name)))?
                    }
                    None => return Ok(()),
                },
                Token::Text(text) => out.write_event(Event::Text(BytesText::new(&text)))?,
                Token::CData(text) => out.write_event(Event::CData(BytesCData::new(text)))?,
                Token::Comment(text) => {
                    out.write_event(Event::Comment(BytesText::from_escaped(text)))?
                }
                Token::Eof => return Err(AtomError::UnexpectedEof(tag.qname.clone())),
            }
        }
    }

    fn next_token(&mut self) -> Result<Token, AtomError> {
        loop {
            self.buf.clear();
            let (resolved, event) = self.reader.read_resolved_event_into(&mut self.buf)?;
            let namespace = namespace_uri(resolved);
            let token = match event {
                Event::Start(e) => Token::Start(start_tag(&self.reader, namespace, &e, false)?),
                Event::Empty(e) => Token::Start(start_tag(&self.reader, namespace, &e, true)?),
                Event::End(_) => Token::End,
                Event::Text(e) => Token::Text(e.unescape()?.into_owned()),
                Event::CData(e) => Token::CData(String::from_utf8_lossy(&e).into_owned()),
                Event::Comment(e) => Token::Comment(String::from_utf8_lossy(&e).into_owned()),
                Event::Eof => Token::Eof,
                _ => continue,
            };
            return Ok(token);
        }
    }
}

fn namespace_uri(resolved: ResolveResult<'_>) -> Option<String> {
    match resolved {
        ResolveResult::Bound(ns) => Some(String::from_utf8_lossy(ns.as_ref()).into_owned()),
        _ => None,
    }
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

fn start_tag<R>(
    reader: &NsReader<R>,
    namespace: Option<String>,
    e: &BytesStart<'_>,
    empty: bool,
) -> Result<StartTag, AtomError> {
    let name = e.name();
    let mut attributes = Vec::new();
    let mut declarations = Vec::new();

    for attr in e.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let key = attr.key;
        let qname = lossy(key.as_ref());
        let value = attr.unescape_value()?.into_owned();

        let prefix = key.prefix().map(|p| lossy(p.as_ref()));
        if key.as_ref() == b"xmlns" || prefix.as_deref() == Some("xmlns") {
            declarations.push((qname, value));
            continue;
        }

        let namespace = if prefix.as_deref() == Some("xml") {
            Some(NS_XML.to_string())
        } else {
            let (resolved, _) = reader.resolve_attribute(key);
            namespace_uri(resolved)
        };
        attributes.push(TagAttribute {
            namespace,
            prefix,
            local_name: lossy(key.local_name().as_ref()),
            qname,
            value,
        });
    }

    Ok(StartTag {
        namespace,
        prefix: name.prefix().map(|p| lossy(p.as_ref())),
        local_name: lossy(name.local_name().as_ref()),
        qname: lossy(name.as_ref()),
        attributes,
        declarations,
        empty,
    })
}

/// Records the namespace bindings `tag` uses that are neither declared in
/// `scope` nor already in `free`. The `xml` prefix is always bound.
fn note_bindings(tag: &StartTag, scope: &[String], free: &mut Vec<(String, String)>) {
    let element = (tag.prefix.as_deref(), tag.namespace.as_deref());
    let attributes = tag
        .attributes
        .iter()
        .filter(|a| a.prefix.is_some())
        .map(|a| (a.prefix.as_deref(), a.namespace.as_deref()));

    for (prefix, namespace) in std::iter::once(element).chain(attributes) {
        let Some(namespace) = namespace else {
            continue;
        };
        if prefix == Some("xml") {
            continue;
        }
        let declaration = match prefix {
            Some(prefix) => format!("xmlns:{prefix}"),
            None => "xmlns".to_string(),
        };
        if scope.contains(&declaration) || free.iter().any(|(name, _)| *name == declaration) {
            continue;
        }
        free.push((declaration, namespace.to_string()));
    }
}

/// Rebuilds a start tag: its own declarations, then `extra`, then attributes.
fn bytes_start<'a>(tag: &'a StartTag, extra: &[(String, String)]) -> BytesStart<'a> {
    let mut start = BytesStart::new(tag.qname.as_str());
    for (name, value) in tag.declarations.iter().chain(extra) {
        start.push_attribute((name.as_str(), value.as_str()));
    }
    for attr in &tag.attributes {
        start.push_attribute((attr.qname.as_str(), attr.value.as_str()));
    }
    start
}

fn into_string(out: Writer<Vec<u8>>) -> Result<String, AtomError> {
    String::from_utf8(out.into_inner()).map_err(|e| AtomError::Serialization(e.to_string()))
}
