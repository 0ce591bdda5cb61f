//! A small arena-backed element tree for flat export documents.
//!
//! Manifests, component exports and emitted backup documents are shallow
//! and read many times by name, so they are parsed once into an
//! [`XmlTree`] and queried by local (namespace-stripped) element name.
//! Element nodes live in one `Vec` and refer to each other by index; no node
//! owns another.

use quick_xml::Reader;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesStart, Event};

use crate::error::{Error, Result};
use crate::util::{local_name, resolve_entity};

/// Index of an element in an [`XmlTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementId(u32);

impl ElementId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
struct Element {
    name: String,
    attrs: Vec<(String, String)>,
    text: String,
    parent: Option<ElementId>,
    children: Vec<ElementId>,
}

/// Parsed XML document.
#[derive(Debug, Clone)]
pub struct XmlTree {
    elements: Vec<Element>,
}

impl XmlTree {
    /// Parse a document. The first element becomes the root.
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(false);

        let mut elements: Vec<Element> = Vec::new();
        let mut stack: Vec<ElementId> = Vec::new();

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    let id = push_element(&mut elements, &stack, &e);
                    stack.push(id);
                }
                Ok(Event::Empty(e)) => {
                    push_element(&mut elements, &stack, &e);
                }
                Ok(Event::End(_)) => {
                    stack.pop();
                }
                Ok(Event::Text(e)) => {
                    if let Some(&top) = stack.last() {
                        let raw = String::from_utf8_lossy(e.as_ref());
                        elements[top.index()].text.push_str(&raw);
                    }
                }
                Ok(Event::CData(e)) => {
                    if let Some(&top) = stack.last() {
                        let raw = String::from_utf8_lossy(e.as_ref());
                        elements[top.index()].text.push_str(&raw);
                    }
                }
                Ok(Event::GeneralRef(e)) => {
                    if let Some(&top) = stack.last() {
                        let entity = String::from_utf8_lossy(e.as_ref());
                        if let Some(resolved) = resolve_entity(&entity) {
                            elements[top.index()].text.push_str(&resolved);
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(Error::Xml(e)),
                _ => {}
            }
        }

        if elements.is_empty() {
            return Err(Error::InvalidExport("document has no root element".into()));
        }
        for element in &mut elements {
            let trimmed = element.text.trim();
            if trimmed.len() != element.text.len() {
                element.text = trimmed.to_string();
            }
        }
        Ok(Self { elements })
    }

    /// The document element.
    pub fn root(&self) -> Node<'_> {
        Node {
            tree: self,
            id: ElementId(0),
        }
    }

    /// Iterate all elements in document order.
    pub fn iter(&self) -> impl Iterator<Item = Node<'_>> {
        (0..self.elements.len()).map(move |i| Node {
            tree: self,
            id: ElementId(i as u32),
        })
    }

    /// First element with the given local name, in document order.
    pub fn find(&self, name: &str) -> Option<Node<'_>> {
        self.iter().find(|n| n.name() == name)
    }

    /// All elements with the given local name, in document order.
    pub fn find_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = Node<'a>> + 'a {
        self.iter().filter(move |n| n.name() == name)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

fn push_element(elements: &mut Vec<Element>, stack: &[ElementId], e: &BytesStart<'_>) -> ElementId {
    let id = ElementId(elements.len() as u32);
    let parent = stack.last().copied();
    let name = String::from_utf8_lossy(local_name(e.name().as_ref())).into_owned();
    let attrs = e
        .attributes()
        .flatten()
        .map(|attr| {
            let key = String::from_utf8_lossy(local_name(attr.key.as_ref())).into_owned();
            (key, attribute_value(&attr))
        })
        .collect();
    elements.push(Element {
        name,
        attrs,
        text: String::new(),
        parent,
        children: Vec::new(),
    });
    if let Some(parent) = parent {
        elements[parent.index()].children.push(id);
    }
    id
}

/// Decode and unescape an attribute value, keeping the raw text when it
/// contains references quick-xml does not know.
pub fn attribute_value(attr: &Attribute<'_>) -> String {
    let raw = String::from_utf8_lossy(attr.value.as_ref());
    match quick_xml::escape::unescape(&raw) {
        Ok(value) => value.into_owned(),
        Err(_) => raw.into_owned(),
    }
}

/// Borrowed view of one element.
#[derive(Clone, Copy)]
pub struct Node<'a> {
    tree: &'a XmlTree,
    id: ElementId,
}

impl std::fmt::Debug for Node<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("name", &self.name())
            .field("id", &self.id)
            .finish()
    }
}

impl<'a> Node<'a> {
    fn element(&self) -> &'a Element {
        &self.tree.elements[self.id.index()]
    }

    pub fn id(&self) -> ElementId {
        self.id
    }

    /// Local element name.
    pub fn name(&self) -> &'a str {
        &self.element().name
    }

    /// Trimmed text content directly inside this element.
    pub fn text(&self) -> &'a str {
        &self.element().text
    }

    /// Attribute value by local name.
    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.element()
            .attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn attrs(&self) -> impl Iterator<Item = (&'a str, &'a str)> + use<'a> {
        self.element().attrs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn parent(&self) -> Option<Node<'a>> {
        self.element().parent.map(|id| Node { tree: self.tree, id })
    }

    pub fn children(&self) -> impl Iterator<Item = Node<'a>> + use<'a> {
        let tree = self.tree;
        self.element().children.iter().map(move |&id| Node { tree, id })
    }

    /// First direct child with the given local name.
    pub fn child(&self, name: &str) -> Option<Node<'a>> {
        self.children().find(|c| c.name() == name)
    }

    /// Direct children with the given local name.
    pub fn children_named<'n>(&self, name: &'n str) -> impl Iterator<Item = Node<'a>> + use<'a, 'n> {
        self.children().filter(move |c| c.name() == name)
    }

    /// Text of the first direct child with the given name, if non-empty.
    pub fn child_text(&self, name: &str) -> Option<&'a str> {
        self.child(name).map(|c| c.text()).filter(|t| !t.is_empty())
    }

    /// All descendants in document order, excluding this element.
    pub fn descendants(&self) -> impl Iterator<Item = Node<'a>> + use<'a> {
        let tree = self.tree;
        let mut stack: Vec<ElementId> = self.element().children.iter().rev().copied().collect();
        std::iter::from_fn(move || {
            let id = stack.pop()?;
            stack.extend(tree.elements[id.index()].children.iter().rev().copied());
            Some(Node { tree, id })
        })
    }

    /// First descendant with the given local name.
    pub fn find(&self, name: &str) -> Option<Node<'a>> {
        self.descendants().find(|n| n.name() == name)
    }

    /// Number of descendants with the given local name.
    pub fn count(&self, name: &str) -> usize {
        self.descendants().filter(|n| n.name() == name).count()
    }
}
