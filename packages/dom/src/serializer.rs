use crate::entities::{escape_attribute, escape_text};
use crate::node::{is_raw_text, is_void, NodeData};
use crate::{Dom, NodeId};

/// Serialize a whole document: doctype, then the `<html>` element and any
/// top-level comments, with no added whitespace.
pub fn serialize(dom: &Dom) -> String {
    serialize_children(dom, dom.root())
}

/// `outerHTML` of a single node
pub fn serialize_node(dom: &Dom, id: NodeId) -> String {
    let mut out = String::new();
    write_node(dom, id, &mut out);
    out
}

/// `innerHTML` of a node
pub fn serialize_children(dom: &Dom, id: NodeId) -> String {
    let mut out = String::new();
    for child in dom.children(id) {
        write_node(dom, *child, &mut out);
    }
    out
}

fn write_node(dom: &Dom, id: NodeId, out: &mut String) {
    let Some(data) = dom.data(id) else {
        return;
    };

    match data {
        NodeData::Document => {
            for child in dom.children(id) {
                write_node(dom, *child, out);
            }
        }
        NodeData::Doctype { name } => {
            out.push_str("<!DOCTYPE ");
            out.push_str(name);
            out.push('>');
        }
        NodeData::Comment(text) => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
        NodeData::Text(text) => {
            let raw_parent = dom
                .parent(id)
                .and_then(|parent| dom.element(parent))
                .is_some_and(|parent| is_raw_text(&parent.tag));
            if raw_parent {
                out.push_str(text);
            } else {
                escape_text(text, out);
            }
        }
        NodeData::Element(element) => {
            out.push('<');
            out.push_str(&element.tag);
            for attr in &element.attributes {
                out.push(' ');
                out.push_str(&attr.name);
                out.push_str("=\"");
                escape_attribute(&attr.value, out);
                out.push('"');
            }
            out.push('>');

            if is_void(&element.tag) {
                return;
            }

            for child in dom.children(id) {
                write_node(dom, *child, out);
            }

            out.push_str("</");
            out.push_str(&element.tag);
            out.push('>');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_attribute_is_written_with_empty_value() {
        let dom = Dom::parse("<input disabled>");
        let body = dom.body().unwrap();
        assert_eq!(dom.inner_html(body), "<input disabled=\"\">");
    }

    #[test]
    fn test_built_tree_serializes() {
        let mut dom = Dom::parse("");
        let body = dom.body().unwrap();
        let section = dom.create_element("section");
        dom.set_attribute(section, "data-note", "say \"hi\"").unwrap();
        let text = dom.create_text("a < b");
        dom.append_child(section, text).unwrap();
        dom.append_child(body, section).unwrap();

        assert_eq!(
            serialize(&dom),
            "<!DOCTYPE html><html><head></head><body><section data-note=\"say &quot;hi&quot;\">a &lt; b</section></body></html>"
        );
    }

    #[test]
    fn test_style_content_not_escaped() {
        let dom = Dom::parse("<style>a > b { color: red; }</style>");
        assert!(serialize(&dom).contains("<style>a > b { color: red; }</style>"));
    }
}
