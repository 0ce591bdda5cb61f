//! Minimal indented XML writer for backup documents.

use std::borrow::Cow;
use std::fmt;

use crate::util::{escape_xml, first_invalid_xml_char, sanitize_xml_text};

/// Moodle's marker for a NULL column value.
pub const NULL: &str = "$@NULL@$";

/// A value that cannot be written into an XML 1.0 document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderError {
    pub element: String,
    pub ch: char,
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "character U+{:04X} in <{}> is not allowed in XML 1.0",
            self.ch as u32, self.element
        )
    }
}

impl std::error::Error for RenderError {}

/// Builds one document as a string.
///
/// Text is escaped on the way in. The first character XML cannot carry is
/// remembered and reported by [`XmlWriter::finish`]; writing continues so
/// callers need not check every call. A lenient writer drops such
/// characters instead.
pub struct XmlWriter {
    out: String,
    open: Vec<String>,
    invalid: Option<RenderError>,
    lenient: bool,
}

impl XmlWriter {
    pub fn new() -> Self {
        let mut out = String::with_capacity(1024);
        out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        Self {
            out,
            open: Vec::new(),
            invalid: None,
            lenient: false,
        }
    }

    /// A writer that strips characters XML 1.0 cannot carry.
    pub fn lenient() -> Self {
        Self {
            lenient: true,
            ..Self::new()
        }
    }

    fn indent(&mut self) {
        for _ in 0..self.open.len() {
            self.out.push_str("  ");
        }
    }

    fn check<'v>(&mut self, element: &str, value: &'v str) -> Cow<'v, str> {
        if self.lenient {
            return sanitize_xml_text(value);
        }
        if self.invalid.is_none()
            && let Some(ch) = first_invalid_xml_char(value)
        {
            self.invalid = Some(RenderError {
                element: element.to_string(),
                ch,
            });
        }
        Cow::Borrowed(value)
    }

    fn push_attrs(&mut self, name: &str, attrs: &[(&str, &str)]) {
        for (key, value) in attrs {
            let value = self.check(name, value);
            self.out.push_str(&format!(" {}=\"{}\"", key, escape_xml(&value)));
        }
    }

    /// Open `<name attrs...>` on its own line.
    pub fn start(&mut self, name: &str, attrs: &[(&str, &str)]) -> &mut Self {
        self.indent();
        self.out.push('<');
        self.out.push_str(name);
        self.push_attrs(name, attrs);
        self.out.push_str(">\n");
        self.open.push(name.to_string());
        self
    }

    /// Close the innermost open element.
    pub fn end(&mut self) -> &mut Self {
        if let Some(name) = self.open.pop() {
            self.indent();
            self.out.push_str(&format!("</{}>\n", name));
        }
        self
    }

    /// `<name>text</name>`; empty text gives `<name></name>`.
    pub fn element(&mut self, name: &str, text: impl fmt::Display) -> &mut Self {
        let text = text.to_string();
        let text = self.check(name, &text).into_owned();
        self.indent();
        self.out
            .push_str(&format!("<{}>{}</{}>\n", name, escape_xml(&text), name));
        self
    }

    /// Element with attributes and text content.
    pub fn element_with(&mut self, name: &str, attrs: &[(&str, &str)], text: &str) -> &mut Self {
        let text = self.check(name, text);
        self.indent();
        self.out.push('<');
        self.out.push_str(name);
        self.push_attrs(name, attrs);
        self.out
            .push_str(&format!(">{}</{}>\n", escape_xml(&text), name));
        self
    }

    /// `<name>$@NULL@$</name>`
    pub fn null(&mut self, name: &str) -> &mut Self {
        self.element(name, NULL)
    }

    /// `<name></name>`
    pub fn empty(&mut self, name: &str) -> &mut Self {
        self.element(name, "")
    }

    /// Write every `(name, value)` pair as a simple element.
    pub fn fields(&mut self, fields: &[(&str, &str)]) -> &mut Self {
        for (name, value) in fields {
            self.element(name, value);
        }
        self
    }

    /// Close anything still open and return the document.
    pub fn finish(mut self) -> Result<String, RenderError> {
        while !self.open.is_empty() {
            self.end();
        }
        match self.invalid {
            Some(err) => Err(err),
            None => Ok(self.out),
        }
    }
}

impl Default for XmlWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// A document whose root holds only empty child containers.
pub fn skeleton(root: &str, children: &[&str]) -> String {
    let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    if children.is_empty() {
        out.push_str(&format!("<{}>\n</{}>\n", root, root));
        return out;
    }
    out.push_str(&format!("<{}>\n", root));
    for child in children {
        out.push_str(&format!("  <{}>\n  </{}>\n", child, child));
    }
    out.push_str(&format!("</{}>\n", root));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_output() {
        let mut w = XmlWriter::new();
        w.start("section", &[("id", "2")])
            .element("number", 1)
            .element("name", "Q&A <Übung>")
            .null("itemid")
            .end();
        let xml = w.finish().unwrap();
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<section id=\"2\">\n"));
        assert!(xml.contains("  <name>Q&amp;A &lt;Übung&gt;</name>\n"));
        assert!(xml.contains("<itemid>$@NULL@$</itemid>"));
        assert!(xml.ends_with("</section>\n"));
    }

    #[test]
    fn test_invalid_char_reported() {
        let mut w = XmlWriter::new();
        w.start("activity", &[]).element("name", "bad\u{1}title");
        let err = w.finish().unwrap_err();
        assert_eq!(err.element, "name");
        assert_eq!(err.ch, '\u{1}');
    }

    #[test]
    fn test_lenient_strips() {
        let mut w = XmlWriter::lenient();
        w.start("activity", &[("title", "a\u{0}b")]).element("name", "bad\u{1}title");
        let xml = w.finish().unwrap();
        assert!(xml.contains("<activity title=\"ab\">"));
        assert!(xml.contains("<name>badtitle</name>"));
    }

    #[test]
    fn test_skeleton() {
        let xml = skeleton("roles", &["role_overrides", "role_assignments"]);
        assert!(xml.contains("<roles>\n  <role_overrides>\n  </role_overrides>\n"));
        assert_eq!(skeleton("logs", &[]), "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<logs>\n</logs>\n");
    }
}
