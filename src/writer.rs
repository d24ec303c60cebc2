//! XML output for the element tree.
//!
//! Each node writes its own typed attributes, then `xml:base` / `xml:lang`,
//! then extension attributes; its body follows, then extension elements in
//! document order. Text and HTML bodies are escaped. XHTML bodies and
//! captured extension markup go out unescaped.

use crate::errors::AtomError;
use crate::extensions::{Extension, ExtensionList};
use crate::model::{AtomNode, CommonAttributes};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::io::Write;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Indent nested elements by this many spaces. `None` writes compact XML.
    pub indent: Option<usize>,
}

impl WriteOptions {
    pub fn pretty() -> Self {
        Self { indent: Some(2) }
    }
}

/// Event-level writer handed to every node, including typed extensions.
pub struct AtomWriter<'a> {
    inner: Writer<&'a mut dyn Write>,
}

impl<'a> AtomWriter<'a> {
    pub fn new(out: &'a mut dyn Write, options: &WriteOptions) -> Self {
        let inner = match options.indent {
            Some(width) => Writer::new_with_indent(out, b' ', width),
            None => Writer::new(out),
        };
        Self { inner }
    }

    pub fn declaration(&mut self) -> Result<(), AtomError> {
        self.event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
    }

    pub fn start(&mut self, start: BytesStart<'_>) -> Result<(), AtomError> {
        self.event(Event::Start(start))
    }

    pub fn empty(&mut self, start: BytesStart<'_>) -> Result<(), AtomError> {
        self.event(Event::Empty(start))
    }

    pub fn end(&mut self, name: &str) -> Result<(), AtomError> {
        self.event(Event::End(BytesEnd::new(name)))
    }

    /// Escaped character data.
    pub fn text(&mut self, text: &str) -> Result<(), AtomError> {
        self.event(Event::Text(BytesText::new(text)))
    }

    /// Markup written as-is. The caller is responsible for well-formedness.
    pub fn raw(&mut self, markup: &str) -> Result<(), AtomError> {
        self.event(Event::Text(BytesText::from_escaped(markup)))
    }

    /// `<name>text</name>`
    pub fn text_element(&mut self, name: &str, text: &str) -> Result<(), AtomError> {
        self.start(BytesStart::new(name))?;
        self.text(text)?;
        self.end(name)
    }

    fn event(&mut self, event: Event<'_>) -> Result<(), AtomError> {
        self.inner.write_event(event)?;
        Ok(())
    }
}

/// Serialization hooks of a tree node. `save_element` drives them.
pub(crate) trait XmlPersist: AtomNode {
    fn write_attributes(&self, _start: &mut BytesStart<'_>) {}

    /// False when the element has nothing between its tags apart from
    /// extension elements.
    fn has_body(&self) -> bool {
        true
    }

    fn write_content(&self, _w: &mut AtomWriter<'_>) -> Result<(), AtomError> {
        Ok(())
    }

    /// Written after the extension elements.
    fn write_trailing(&self, _w: &mut AtomWriter<'_>) -> Result<(), AtomError> {
        Ok(())
    }
}

/// Writes `node` unconditionally, with `declarations` as its first attributes.
pub(crate) fn save_element<N: XmlPersist + ?Sized>(
    w: &mut AtomWriter<'_>,
    node: &N,
    declarations: &[(&str, &str)],
) -> Result<(), AtomError> {
    let name = node.xml_name();
    let mut start = BytesStart::new(name);
    for &declaration in declarations {
        start.push_attribute(declaration);
    }
    node.write_attributes(&mut start);
    write_common_attributes(&mut start, node.common());

    let extensions = node.common().extensions();
    if !node.has_body() && !extensions.has_elements() {
        return w.empty(start);
    }
    w.start(start)?;
    node.write_content(w)?;
    write_extension_elements(w, extensions)?;
    node.write_trailing(w)?;
    w.end(name)
}

/// Writes `node` only when it has something worth persisting.
pub(crate) fn save_node<N: XmlPersist>(w: &mut AtomWriter<'_>, node: &N) -> Result<(), AtomError> {
    if node.should_be_persisted() {
        save_element(w, node, &[])?;
    }
    Ok(())
}

pub(crate) fn save_optional<N: XmlPersist>(
    w: &mut AtomWriter<'_>,
    node: Option<&N>,
) -> Result<(), AtomError> {
    match node {
        Some(node) => save_node(w, node),
        None => Ok(()),
    }
}

pub(crate) fn push_opt(start: &mut BytesStart<'_>, name: &str, value: Option<&str>) {
    if let Some(value) = value {
        start.push_attribute((name, value));
    }
}

fn has_attribute(start: &BytesStart<'_>, name: &str) -> bool {
    matches!(start.try_get_attribute(name), Ok(Some(_)))
}

fn write_common_attributes(start: &mut BytesStart<'_>, common: &CommonAttributes) {
    push_opt(start, "xml:base", common.base().map(|b| b.as_str()));
    push_opt(start, "xml:lang", common.language());

    for attr in common.extensions().attributes() {
        if let (Some(prefix), Some(namespace)) = (attr.prefix.as_deref(), attr.namespace.as_deref())
        {
            let declaration = format!("xmlns:{prefix}");
            if prefix != "xml" && !has_attribute(start, &declaration) {
                start.push_attribute((declaration.as_str(), namespace));
            }
        }
        let name = attr.qualified_name();
        if !has_attribute(start, &name) {
            start.push_attribute((name.as_str(), attr.value.as_str()));
        }
    }
}

fn write_extension_elements(w: &mut AtomWriter<'_>, list: &ExtensionList) -> Result<(), AtomError> {
    for extension in list.elements() {
        match extension {
            Extension::Element(element) => w.raw(&element.markup)?,
            Extension::Typed(typed) => typed.save(w)?,
            Extension::Attribute(_) => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(f: impl FnOnce(&mut AtomWriter<'_>) -> Result<(), AtomError>) -> String {
        let mut out = Vec::new();
        {
            let mut w = AtomWriter::new(&mut out, &WriteOptions::default());
            f(&mut w).unwrap();
        }
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_text_is_escaped_and_raw_is_not() {
        let xml = render(|w| {
            w.start(BytesStart::new("a"))?;
            w.text("1 < 2 & 3")?;
            w.raw("<b>bold</b>")?;
            w.end("a")
        });
        assert_eq!(xml, "<a>1 &lt; 2 &amp; 3<b>bold</b></a>");
    }

    #[test]
    fn test_text_element() {
        let xml = render(|w| w.text_element("name", "Ann"));
        assert_eq!(xml, "<name>Ann</name>");
    }

    #[test]
    fn test_indentation() {
        let mut out = Vec::new();
        {
            let mut w = AtomWriter::new(&mut out, &WriteOptions::pretty());
            w.start(BytesStart::new("feed")).unwrap();
            w.text_element("id", "urn:1").unwrap();
            w.end("feed").unwrap();
        }
        let xml = String::from_utf8(out).unwrap();
        assert_eq!(xml, "<feed>\n  <id>urn:1</id>\n</feed>");
    }
}
