//! Owned element tree built from `quick-xml` events.
//!
//! Attribute values and text are stored undecoded. Entity references are only
//! resolved when a value is read, so a bad reference fails the record that
//! reads it instead of the whole document.
//!
//! Like ElementTree's `.text`, an element keeps only the text that precedes
//! its first child element.

use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::NsReader;

use crate::error::{ExtractError, XmlValueError};

/// Deepest element nesting accepted by [`parse_document`].
pub const MAX_DEPTH: usize = 1024;

#[derive(Debug)]
pub struct XmlElement {
    namespace: Option<String>,
    name: String,
    attributes: Vec<(String, String)>,
    raw_text: String,
    children: Vec<XmlElement>,
}

impl XmlElement {
    /// Resolved namespace URI, if the element is bound to one.
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn is(&self, namespace: Option<&str>, name: &str) -> bool {
        self.name == name && self.namespace() == namespace
    }

    /// Decoded value of the attribute with the given local name.
    pub fn attr(&self, name: &str) -> Result<Option<String>, XmlValueError> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, raw)| unescape(raw))
            .transpose()
    }

    /// Decoded text leading up to the first child element.
    pub fn text(&self) -> Result<String, XmlValueError> {
        unescape(&self.raw_text)
    }

    /// First direct child matching `namespace` and `name`.
    pub fn child(&self, namespace: Option<&str>, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.is(namespace, name))
    }

    pub fn children_named<'a, 'q>(
        &'a self,
        namespace: Option<&'q str>,
        name: &'q str,
    ) -> impl Iterator<Item = &'a XmlElement> + 'q
    where
        'a: 'q,
    {
        self.children.iter().filter(move |c| c.is(namespace, name))
    }

    /// First direct child named `name` whose attribute `attr` decodes to `value`.
    pub fn child_where(
        &self,
        namespace: Option<&str>,
        name: &str,
        attr: &str,
        value: &str,
    ) -> Option<&XmlElement> {
        self.children
            .iter()
            .filter(|c| c.is(namespace, name))
            .find(|c| matches!(c.attr(attr), Ok(Some(v)) if v == value))
    }

    /// Every matching element below this one, in document (pre-)order.
    /// The element itself is never included.
    pub fn descendants_named(&self, namespace: Option<&str>, name: &str) -> Vec<&XmlElement> {
        let mut found = Vec::new();
        let mut pending: Vec<&XmlElement> = self.children.iter().rev().collect();
        while let Some(node) = pending.pop() {
            if node.is(namespace, name) {
                found.push(node);
            }
            pending.extend(node.children.iter().rev());
        }
        found
    }

    /// Text is only kept until the first child element is attached.
    fn leading_text(&mut self) -> Option<&mut String> {
        self.children.is_empty().then_some(&mut self.raw_text)
    }
}

impl Drop for XmlElement {
    // flatten the subtree so dropping a deep tree does not recurse
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

/// Parse a whole document into its root element. `origin` names the document
/// in error messages.
pub fn parse_document(origin: &str, text: &str) -> Result<XmlElement, ExtractError> {
    let mut reader = NsReader::from_str(text);
    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        let (resolved, event) = match reader.read_resolved_event() {
            Ok((resolved, event)) => (resolve_namespace(origin, resolved)?, event),
            Err(err) => return Err(ExtractError::parse(origin, err)),
        };
        match event {
            Event::Start(ref e) => {
                if stack.len() >= MAX_DEPTH {
                    return Err(ExtractError::parse(
                        origin,
                        format!("elements nested deeper than {MAX_DEPTH} levels"),
                    ));
                }
                stack.push(new_element(origin, resolved, e)?);
            }
            Event::Empty(ref e) => {
                let element = new_element(origin, resolved, e)?;
                attach(origin, &mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| ExtractError::parse(origin, "closing tag without an open element"))?;
                attach(origin, &mut stack, &mut root, element)?;
            }
            Event::Text(ref e) => {
                if let Some(text) = stack.last_mut().and_then(XmlElement::leading_text) {
                    text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Event::CData(ref e) => {
                if let Some(text) = stack.last_mut().and_then(XmlElement::leading_text) {
                    // literal content; re-escape so lazy decoding restores it as-is
                    let literal = String::from_utf8_lossy(e.as_ref()).replace('&', "&amp;");
                    text.push_str(&literal);
                }
            }
            Event::GeneralRef(ref e) => {
                if let Some(text) = stack.last_mut().and_then(XmlElement::leading_text) {
                    text.push('&');
                    text.push_str(&String::from_utf8_lossy(e.as_ref()));
                    text.push(';');
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(ExtractError::parse(
            origin,
            format!("unexpected end of document inside <{}>", open.name),
        ));
    }
    root.ok_or_else(|| ExtractError::parse(origin, "document has no root element"))
}

fn resolve_namespace(
    origin: &str,
    resolved: ResolveResult<'_>,
) -> Result<Option<String>, ExtractError> {
    match resolved {
        ResolveResult::Bound(ns) => Ok(Some(String::from_utf8_lossy(ns.0).into_owned())),
        ResolveResult::Unbound => Ok(None),
        ResolveResult::Unknown(prefix) => Err(ExtractError::parse(
            origin,
            format!("unbound prefix `{}`", String::from_utf8_lossy(&prefix)),
        )),
    }
}

fn new_element(
    origin: &str,
    namespace: Option<String>,
    start: &BytesStart<'_>,
) -> Result<XmlElement, ExtractError> {
    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|err| ExtractError::parse(origin, err))?;
        let key = attr.key.as_ref();
        if key == b"xmlns" || key.starts_with(b"xmlns:") {
            continue;
        }
        attributes.push((
            String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned(),
            String::from_utf8_lossy(&attr.value).into_owned(),
        ));
    }
    Ok(XmlElement {
        namespace,
        name: String::from_utf8_lossy(start.local_name().as_ref()).into_owned(),
        attributes,
        raw_text: String::new(),
        children: Vec::new(),
    })
}

fn attach(
    origin: &str,
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> Result<(), ExtractError> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => return Err(ExtractError::parse(origin, "multiple root elements")),
    }
    Ok(())
}

/// Resolve the predefined XML entities and numeric character references.
pub fn unescape(raw: &str) -> Result<String, XmlValueError> {
    if !raw.contains('&') {
        return Ok(raw.to_string());
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    let mut offset = 0;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        let end = after
            .find(';')
            .ok_or(XmlValueError::UnterminatedEntity(offset + amp))?;
        out.push(resolve_entity(&after[..end])?);
        let consumed = amp + end + 2;
        offset += consumed;
        rest = &rest[consumed..];
    }
    out.push_str(rest);
    Ok(out)
}

fn resolve_entity(entity: &str) -> Result<char, XmlValueError> {
    let code = match entity {
        "amp" => return Ok('&'),
        "lt" => return Ok('<'),
        "gt" => return Ok('>'),
        "quot" => return Ok('"'),
        "apos" => return Ok('\''),
        _ => {
            if let Some(hex) = entity.strip_prefix("#x") {
                u32::from_str_radix(hex, 16).ok()
            } else if let Some(dec) = entity.strip_prefix('#') {
                dec.parse::<u32>().ok()
            } else {
                return Err(XmlValueError::UnknownEntity(entity.to_string()));
            }
        }
    };
    code.and_then(char::from_u32)
        .ok_or_else(|| XmlValueError::InvalidCharRef(entity.to_string()))
}
