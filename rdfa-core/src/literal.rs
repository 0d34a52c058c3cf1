use std::collections::BTreeMap;

use crate::attributes::Attribute;

/// Accumulates the text of `@property` elements.
///
/// Plain literals nest: each property element pushes a buffer, and when an
/// inner one finishes its text is folded into the buffer beneath it. At most
/// one XML literal is captured at a time; while it is open, descendant
/// markup is serialized into it instead of being processed.
#[derive(Debug, Default)]
pub struct LiteralCollector {
    plain: Vec<String>,
    xml: Option<String>,
    xml_depth: usize,
    implicit_close: bool,
    /// Namespace declarations of every open element, outermost first.
    namespaces: Vec<Vec<(String, String)>>,
}

impl LiteralCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start_collecting(&mut self) {
        self.plain.push(String::new());
    }

    pub fn start_collecting_xml(&mut self) {
        self.xml = Some(String::new());
        self.xml_depth = 0;
    }

    pub fn is_collecting(&self) -> bool {
        !self.plain.is_empty() || self.xml.is_some()
    }

    /// True while inside markup that belongs to an XML literal.
    pub fn is_collecting_xml(&self) -> bool {
        self.xml.is_some() && self.xml_depth > 0
    }

    /// Finishes the innermost capture.
    pub fn stop_collecting(&mut self) -> String {
        if let Some(xml) = self.xml.take() {
            self.xml_depth = 0;
            return xml;
        }

        let collected = self.plain.pop().unwrap_or_default();
        if let Some(outer) = self.plain.last_mut() {
            outer.push_str(&collected);
        }
        collected
    }

    pub fn text(&mut self, text: &str) {
        if let Some(xml) = &mut self.xml {
            escape_into(text, xml);
        }
        if let Some(plain) = self.plain.last_mut() {
            plain.push_str(text);
        }
        self.implicit_close = false;
    }

    /// Records an element start. Returns true if the element was captured
    /// into an XML literal and must not be processed further.
    ///
    /// An unprefixed element in a namespace it does not declare itself (as
    /// HTML elements are) is recorded as declaring it as the default.
    pub fn collect_start_element(
        &mut self,
        namespace_uri: &str,
        qualified_name: &str,
        attributes: &[Attribute],
    ) -> bool {
        let mut declared: Vec<_> = attributes
            .iter()
            .filter_map(|attr| namespace_declaration(&attr.name, &attr.value))
            .collect();
        let explicit = declared.len();
        let declares_default = declared.iter().any(|(prefix, _)| prefix.is_empty());
        if !namespace_uri.is_empty() && !qualified_name.contains(':') && !declares_default {
            declared.push((String::new(), namespace_uri.to_string()));
        }
        self.namespaces.push(declared);

        let captured = match &mut self.xml {
            Some(xml) => {
                xml.push('<');
                xml.push_str(qualified_name);
                for attr in attributes {
                    push_attribute(xml, &attr.name, &attr.value);
                }

                if self.xml_depth == 0 {
                    let local = self
                        .namespaces
                        .last()
                        .map(|declared| &declared[..explicit])
                        .unwrap_or_default();
                    for (prefix, namespace) in inherited_namespaces(&self.namespaces) {
                        if local.iter().any(|(p, _)| *p == prefix) {
                            continue;
                        }
                        let name = if prefix.is_empty() {
                            "xmlns".to_string()
                        } else {
                            format!("xmlns:{prefix}")
                        };
                        push_attribute(xml, &name, &namespace);
                    }
                }

                xml.push('>');
                self.xml_depth += 1;
                true
            }
            None => false,
        };

        self.implicit_close = true;
        captured
    }

    /// Records an element end. Returns true if the element belonged to an
    /// XML literal.
    pub fn collect_close_element(&mut self, qualified_name: &str) -> bool {
        self.namespaces.pop();

        let captured = match &mut self.xml {
            Some(xml) if self.xml_depth > 0 => {
                if self.implicit_close {
                    xml.pop();
                    xml.push_str("/>");
                } else {
                    xml.push_str("</");
                    xml.push_str(qualified_name);
                    xml.push('>');
                }
                self.xml_depth -= 1;
                true
            }
            _ => false,
        };

        self.implicit_close = false;
        captured
    }
}

fn namespace_declaration(name: &str, value: &str) -> Option<(String, String)> {
    if name == "xmlns" {
        Some((String::new(), value.to_string()))
    } else {
        name.strip_prefix("xmlns:")
            .map(|prefix| (prefix.to_string(), value.to_string()))
    }
}

/// In-scope declarations from all open elements, inner ones shadowing outer
/// ones, ordered by prefix with the default namespace first.
fn inherited_namespaces(stack: &[Vec<(String, String)>]) -> BTreeMap<String, String> {
    let mut in_scope = BTreeMap::new();
    for (prefix, namespace) in stack.iter().flatten() {
        in_scope.insert(prefix.clone(), namespace.clone());
    }
    in_scope
}

fn push_attribute(xml: &mut String, name: &str, value: &str) {
    xml.push(' ');
    xml.push_str(name);
    xml.push_str("=\"");
    escape_into(value, xml);
    xml.push('"');
}

pub(crate) fn escape_into(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
}
