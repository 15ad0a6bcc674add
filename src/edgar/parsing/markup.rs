use log::debug;
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::{IngestError, Result};

/// Local part of a qualified tag name: everything after the last colon.
pub fn local_name(tag: &str) -> &str {
    tag.rsplit(':').next().unwrap_or(tag)
}

/// Minimal element tree. Names keep whatever prefix the filer used;
/// attributes are not retained.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    pub name: String,
    text: String,
    pub children: Vec<Element>,
}

impl Element {
    fn new(name: String) -> Self {
        Element {
            name,
            ..Default::default()
        }
    }

    pub fn local_name(&self) -> &str {
        local_name(&self.name)
    }

    /// Character data directly inside this element, or `None` when there is
    /// none apart from whitespace.
    pub fn text(&self) -> Option<&str> {
        if self.text.trim().is_empty() {
            None
        } else {
            Some(&self.text)
        }
    }

    pub fn child(&self, local: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.local_name() == local)
    }

    pub fn children_named<'a>(&'a self, local: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.local_name() == local)
    }

    pub fn child_text(&self, local: &str) -> Option<&str> {
        self.child(local).and_then(Element::text)
    }

    /// Depth-first search including `self`.
    pub fn find(&self, local: &str) -> Option<&Element> {
        if self.local_name() == local {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(local))
    }
}

/// Parse a document and return its root element.
pub fn parse_document(xml: &str) -> Result<Element> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event()? {
            Event::Start(start) => {
                let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
                if stack.is_empty() && root.is_some() {
                    return Err(IngestError::MalformedDocument(format!(
                        "second root element <{}>",
                        name
                    )));
                }
                stack.push(Element::new(name));
            }
            Event::Empty(empty) => {
                let element =
                    Element::new(String::from_utf8_lossy(empty.name().as_ref()).into_owned());
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let element = stack.pop().ok_or_else(|| {
                    IngestError::MalformedDocument("unbalanced closing tag".to_string())
                })?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(raw) => {
                // undeclared entities such as `&nbsp;` are kept verbatim
                let text = match raw.unescape() {
                    Ok(text) => text.into_owned(),
                    Err(e) => {
                        debug!("Keeping raw text: {}", e);
                        String::from_utf8_lossy(&raw).into_owned()
                    }
                };
                match stack.last_mut() {
                    Some(current) => current.text.push_str(&text),
                    None if text.trim().is_empty() => {}
                    None => {
                        return Err(IngestError::MalformedDocument(
                            "text outside the root element".to_string(),
                        ))
                    }
                }
            }
            Event::CData(data) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(IngestError::MalformedDocument(format!(
            "unexpected end of document inside <{}>",
            open.name
        )));
    }
    root.ok_or_else(|| IngestError::MalformedDocument("document has no root element".to_string()))
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => {
            return Err(IngestError::MalformedDocument(format!(
                "second root element <{}>",
                element.name
            )))
        }
    }
    Ok(())
}
