//! Document parsing and serialization.
//!
//! XML artifacts load into an [`xmltree`] tree and serialize back behind a
//! fixed, self-controlled declaration (the emitter never writes its own),
//! so the declaration text and the per-artifact encoding swap stay
//! deterministic. TOML artifacts go through [`toml`] (the
//! format-preserving `toml_edit` document model).

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;
use xmltree::{Element, EmitterConfig};

pub mod mutate;
pub mod query;
pub mod toml;

/// Declaration re-applied on every XML serialization.
pub const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>";

/// Comment marker prefixed to every audit trail entry.
pub const MARKER: &str = "HYDROGENERATED: ";

/// Declared encoding written into the XML declaration.
///
/// `Latin1` is the externally imposed requirement of the consuming
/// runtime for the carbon/port artifact; it swaps the declaration only,
/// the bytes on disk stay UTF-8.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Utf8,
    Latin1,
}

/// A parsed XML artifact.
#[derive(Debug, Clone)]
pub struct XmlDocument {
    pub root: Element,
}

/// Parse an XML artifact from disk.
///
/// Callers must treat an `Err` as "abort this mutation" — never proceed
/// against an empty or partial document.
pub fn parse_xml(path: &Path) -> Result<XmlDocument> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading XML artifact '{}'", path.display()))?;
    let root = Element::parse(raw.as_bytes())
        .with_context(|| format!("parsing XML artifact '{}'", path.display()))?;
    Ok(XmlDocument { root })
}

impl XmlDocument {
    /// Serialize to text with the fixed declaration and 4-space indentation.
    pub fn serialize(&self) -> Result<String> {
        let mut buf = Vec::new();
        let config = EmitterConfig::new()
            .write_document_declaration(false)
            .perform_indent(true)
            .indent_string("    ");
        self.root
            .write_with_config(&mut buf, config)
            .context("serializing XML document")?;
        let body = String::from_utf8(buf).context("serialized XML is not valid UTF-8")?;
        Ok(format!("{}\n{}\n", XML_DECLARATION, body))
    }

    /// Serialize and write back to `path`, applying the declared encoding.
    pub fn write(&self, path: &Path, encoding: Encoding) -> Result<()> {
        let mut text = self.serialize()?;
        if encoding == Encoding::Latin1 {
            text = text.replace("encoding=\"UTF-8\"", "encoding=\"ISO-8859-1\"");
        }
        fs::write(path, text)
            .with_context(|| format!("writing XML artifact '{}'", path.display()))
    }
}

/// Strip the leading `<?xml ... ?>` declaration so documents can be
/// concatenated or substring-addressed by callers that need raw text.
pub fn remove_declaration(xml: &str) -> &str {
    let trimmed = xml.trim_start();
    if trimmed.starts_with("<?xml") {
        if let Some(end) = trimmed.find("?>") {
            return trimmed[end + 2..].trim_start_matches(['\n', '\r']);
        }
    }
    xml
}

/// Serialize a single element on one line, exactly as it stands.
///
/// This is the form captured into the prior-value audit comment.
pub fn serialize_element_compact(elem: &Element) -> Result<String> {
    let mut buf = Vec::new();
    let config = EmitterConfig::new()
        .write_document_declaration(false)
        .perform_indent(false);
    elem.write_with_config(&mut buf, config)
        .context("serializing XML element")?;
    String::from_utf8(buf).context("serialized XML element is not valid UTF-8")
}

/// Build an element with text content, the workhorse of the constructors.
pub fn text_element(name: &str, text: &str) -> Element {
    let mut elem = Element::new(name);
    elem.children.push(xmltree::XMLNode::Text(text.to_string()));
    elem
}

/// Build an element carrying attributes and text content.
pub fn attr_text_element(name: &str, attrs: &[(&str, &str)], text: &str) -> Element {
    let mut elem = text_element(name, text);
    for (k, v) in attrs {
        elem.attributes.insert((*k).to_string(), (*v).to_string());
    }
    elem
}

/// Parse an XML snippet into a single element, for tests and fixtures.
pub fn parse_element(raw: &str) -> Result<Element> {
    match Element::parse(raw.as_bytes()) {
        Ok(elem) => Ok(elem),
        Err(err) => bail!("parsing XML snippet: {}", err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Server>
    <!-- stock comment -->
    <AuthManager>
        <ServerURL>https://localhost:9443/services/</ServerURL>
        <Username>admin</Username>
    </AuthManager>
    <Ports>
        <Offset>0</Offset>
    </Ports>
</Server>
"#;

    fn structurally_equal(a: &Element, b: &Element) -> bool {
        if a.name != b.name || a.attributes != b.attributes {
            return false;
        }
        let text_a = a.get_text().unwrap_or_default();
        let text_b = b.get_text().unwrap_or_default();
        if text_a.trim() != text_b.trim() {
            return false;
        }
        let children_a: Vec<_> = a.children.iter().filter_map(|n| n.as_element()).collect();
        let children_b: Vec<_> = b.children.iter().filter_map(|n| n.as_element()).collect();
        children_a.len() == children_b.len()
            && children_a
                .iter()
                .zip(children_b.iter())
                .all(|(x, y)| structurally_equal(x, y))
    }

    #[test]
    fn round_trip_is_structurally_stable() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("sample.xml");
        std::fs::write(&path, SAMPLE).unwrap();

        let doc = parse_xml(&path).unwrap();
        let serialized = doc.serialize().unwrap();
        assert!(serialized.starts_with(XML_DECLARATION));

        let reparsed = Element::parse(serialized.as_bytes()).unwrap();
        assert!(structurally_equal(&doc.root, &reparsed));
    }

    #[test]
    fn remove_declaration_strips_leading_prolog_only() {
        let doc = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<Server/>\n";
        assert_eq!(remove_declaration(doc), "<Server/>\n");
        assert_eq!(remove_declaration("<Server/>"), "<Server/>");
    }

    #[test]
    fn latin1_write_swaps_declaration_only() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("carbon.xml");
        std::fs::write(&path, SAMPLE).unwrap();

        let doc = parse_xml(&path).unwrap();
        doc.write(&path, Encoding::Latin1).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?>"));
        assert!(!written.contains("UTF-8"));
        assert!(written.contains("<ServerURL>"));
    }

    #[test]
    fn compact_serialization_is_single_line() {
        let elem = parse_element("<Ports>\n    <Offset>0</Offset>\n</Ports>").unwrap();
        let compact = serialize_element_compact(&elem).unwrap();
        assert!(!compact.contains('\n'));
        assert!(compact.contains("<Offset>0</Offset>"));
    }

    #[test]
    fn parse_failure_names_the_artifact() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("broken.xml");
        std::fs::write(&path, "<Server><Unclosed></Server>").unwrap();

        let err = parse_xml(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("broken.xml"));
    }
}
