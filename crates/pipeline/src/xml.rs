//! XML rendering of document trees.

use ecf_mapping::{Document, Node, Section};

use crate::collaborator::DocumentEncoder;
use crate::error::CollaboratorError;

const DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// Renders a [`Document`] as XML under its variant's root element.
///
/// Sections become elements in layout order, list entries become repeated
/// elements named after the entry tag, and absent nodes are skipped.
#[derive(Debug, Clone, Copy)]
pub struct XmlEncoder {
    declaration: bool,
}

impl Default for XmlEncoder {
    fn default() -> Self {
        XmlEncoder { declaration: true }
    }
}

impl XmlEncoder {
    /// Encoder that omits the `<?xml ...?>` prolog.
    pub fn without_declaration() -> Self {
        XmlEncoder { declaration: false }
    }
}

impl DocumentEncoder for XmlEncoder {
    fn encode(&self, document: &Document) -> Result<String, CollaboratorError> {
        let mut out = String::new();
        if self.declaration {
            out.push_str(DECLARATION);
        }
        let root = document.variant.root_tag();
        open(&mut out, root)?;
        write_section(&mut out, &document.root)?;
        close(&mut out, root);
        Ok(out)
    }
}

fn write_section(out: &mut String, section: &Section) -> Result<(), CollaboratorError> {
    for (tag, node) in section.entries() {
        write_node(out, tag, node)?;
    }
    Ok(())
}

fn write_node(out: &mut String, tag: &str, node: &Node) -> Result<(), CollaboratorError> {
    match node {
        Node::Absent => {}
        Node::Scalar(value) => {
            open(out, tag)?;
            escape_into(out, &value.as_text());
            close(out, tag);
        }
        Node::List(entries) => {
            for entry in entries {
                write_node(out, tag, entry)?;
            }
        }
        Node::Section(section) => {
            open(out, tag)?;
            write_section(out, section)?;
            close(out, tag);
        }
    }
    Ok(())
}

fn open(out: &mut String, tag: &str) -> Result<(), CollaboratorError> {
    if !is_element_name(tag) {
        return Err(CollaboratorError::InvalidInput {
            message: format!("'{}' is not a valid XML element name", tag),
        });
    }
    out.push('<');
    out.push_str(tag);
    out.push('>');
    Ok(())
}

fn close(out: &mut String, tag: &str) {
    out.push_str("</");
    out.push_str(tag);
    out.push('>');
}

fn is_element_name(tag: &str) -> bool {
    let mut chars = tag.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

fn escape_into(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other => out.push(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ecf_mapping::{build_full, DocumentVariant, FlatRecord, Scalar};

    fn rec(fields: &[(&str, &str)]) -> FlatRecord {
        FlatRecord::from_fields(fields.iter().map(|(k, v)| (*k, Scalar::text(*v))))
    }

    fn encode(document: &Document) -> String {
        XmlEncoder::without_declaration().encode(document).unwrap()
    }

    #[test]
    fn nested_sections_render_in_layout_order() {
        let doc = build_full(&rec(&[
            ("Version", "1.0"),
            ("TipoeCF", "31"),
            ("ENCF", "E310000000001"),
        ]))
        .unwrap();
        assert_eq!(
            encode(&doc),
            "<ECF><Encabezado><Version>1.0</Version><IdDoc><TipoeCF>31</TipoeCF>\
             <eNCF>E310000000001</eNCF></IdDoc></Encabezado></ECF>"
        );
    }

    #[test]
    fn list_entries_become_repeated_elements() {
        let doc = build_full(&rec(&[
            ("TelefonoEmisor[1]", "809-000-0001"),
            ("TelefonoEmisor[2]", "809-000-0002"),
        ]))
        .unwrap();
        assert_eq!(
            encode(&doc),
            "<ECF><Encabezado><Emisor><TablaTelefonoEmisor>\
             <TelefonoEmisor>809-000-0001</TelefonoEmisor>\
             <TelefonoEmisor>809-000-0002</TelefonoEmisor>\
             </TablaTelefonoEmisor></Emisor></Encabezado></ECF>"
        );
    }

    #[test]
    fn text_is_escaped() {
        let doc = build_full(&rec(&[("RazonSocialEmisor", "Pérez & Hijos <SRL>")])).unwrap();
        assert!(encode(&doc)
            .contains("<RazonSocialEmisor>Pérez &amp; Hijos &lt;SRL&gt;</RazonSocialEmisor>"));
    }

    #[test]
    fn declaration_is_emitted_by_default() {
        let doc = build_full(&rec(&[("Version", "1.0")])).unwrap();
        let xml = XmlEncoder::default().encode(&doc).unwrap();
        assert!(xml.starts_with(DECLARATION));
        assert!(xml.ends_with("</ECF>"));
    }

    #[test]
    fn invalid_element_names_are_refused() {
        let mut root = Section::new();
        root.push("Bad Tag", Node::Scalar(Scalar::text("x")));
        let doc = Document {
            variant: DocumentVariant::Full,
            root,
        };
        let err = XmlEncoder::default().encode(&doc).unwrap_err();
        assert!(matches!(err, CollaboratorError::InvalidInput { .. }));
    }

    #[test]
    fn float_amounts_render_like_the_source_wrote_them() {
        let mut root = Section::new();
        root.push(
            "MontoTotal",
            Node::Scalar(Scalar::Number(serde_json::Number::from_f64(1180.0).unwrap())),
        );
        root.push(
            "TotalITBIS",
            Node::Scalar(Scalar::Number(serde_json::Number::from_f64(180.5).unwrap())),
        );
        let doc = Document {
            variant: DocumentVariant::Full,
            root,
        };
        assert_eq!(
            encode(&doc),
            "<ECF><MontoTotal>1180</MontoTotal><TotalITBIS>180.5</TotalITBIS></ECF>"
        );
    }

    #[test]
    fn abbreviated_documents_use_their_own_root() {
        let mut root = Section::new();
        root.push("Version", Node::Scalar(Scalar::text("1.0")));
        let doc = Document {
            variant: DocumentVariant::Abbreviated,
            root,
        };
        assert_eq!(encode(&doc), "<RFCE><Version>1.0</Version></RFCE>");
    }
}
