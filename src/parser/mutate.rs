//! Comment-preserving mutation primitives over parsed XML trees.
//!
//! Every mutation is a pure tree operation: prior content is captured as
//! a [`XMLNode::Comment`] sibling, never spliced into serialized text.
//! The audit scheme is two comments per replacement — the exact prior
//! serialized form, then a short `HYDROGENERATED:` description — placed
//! immediately before the replacement node. This trail is the sole undo
//! path the product ships with.
//!
//! An address that resolves to nothing is a logged skip, not an error:
//! the document is returned untouched and the caller's recipe continues.

use anyhow::{bail, Result};
use tracing::warn;
use xmltree::{Element, XMLNode};

use super::query::{self, XmlQuery};
use super::{serialize_element_compact, XmlDocument, MARKER};

/// What a mutation did to the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    Applied,
    /// The address resolved to zero nodes; nothing was changed.
    SkippedNotFound,
}

fn marker_comment(desc: &str) -> XMLNode {
    XMLNode::Comment(format!("{}{}", MARKER, desc))
}

/// Replace the addressed element's value, keeping its tag and attributes.
///
/// Splices `[prior-value comment, marker comment, new element]` in place
/// of the target. Re-application re-derives the prior-value comment from
/// the current value, so repeated runs are stable modulo the evolving
/// comment.
pub fn replace_value(
    doc: &mut XmlDocument,
    expr: &str,
    new_text: &str,
    desc: &str,
) -> Result<MutationOutcome> {
    let query = XmlQuery::parse(expr)?;
    let Some(loc) = query::resolve(&doc.root, &query) else {
        warn!(address = expr, "address not found, mutation skipped");
        return Ok(MutationOutcome::SkippedNotFound);
    };
    let Some(target) = query::node_at(&doc.root, &loc) else {
        bail!("stale node location for '{}'", expr);
    };
    let prior = serialize_element_compact(target)?;
    let mut replacement = Element::new(&target.name);
    replacement.attributes = target.attributes.clone();
    replacement
        .children
        .push(XMLNode::Text(new_text.to_string()));

    let (children, index) = query::sibling_slot(&mut doc.root, &loc)?;
    children.splice(
        index..=index,
        [
            XMLNode::Comment(prior),
            marker_comment(desc),
            XMLNode::Element(replacement),
        ],
    );
    Ok(MutationOutcome::Applied)
}

/// Replace the addressed element with a constructed substructure.
pub fn replace_element(
    doc: &mut XmlDocument,
    expr: &str,
    replacement: Element,
    desc: &str,
) -> Result<MutationOutcome> {
    let query = XmlQuery::parse(expr)?;
    let Some(loc) = query::resolve(&doc.root, &query) else {
        warn!(address = expr, "address not found, mutation skipped");
        return Ok(MutationOutcome::SkippedNotFound);
    };
    let Some(target) = query::node_at(&doc.root, &loc) else {
        bail!("stale node location for '{}'", expr);
    };
    let prior = serialize_element_compact(target)?;

    let (children, index) = query::sibling_slot(&mut doc.root, &loc)?;
    children.splice(
        index..=index,
        [
            XMLNode::Comment(prior),
            marker_comment(desc),
            XMLNode::Element(replacement),
        ],
    );
    Ok(MutationOutcome::Applied)
}

/// Insert a constructed element immediately after the addressed anchor.
///
/// The anchor is left untouched; `desc` controls whether a marker
/// comment precedes the insertion (batch inserts mark only their first
/// element).
pub fn insert_after(
    doc: &mut XmlDocument,
    expr: &str,
    new_elem: Element,
    desc: Option<&str>,
) -> Result<MutationOutcome> {
    let query = XmlQuery::parse(expr)?;
    let Some(loc) = query::resolve(&doc.root, &query) else {
        warn!(address = expr, "anchor not found, insertion skipped");
        return Ok(MutationOutcome::SkippedNotFound);
    };
    let (children, index) = query::sibling_slot(&mut doc.root, &loc)?;
    let mut insertion = Vec::with_capacity(2);
    if let Some(desc) = desc {
        insertion.push(marker_comment(desc));
    }
    insertion.push(XMLNode::Element(new_elem));
    children.splice(index + 1..index + 1, insertion);
    Ok(MutationOutcome::Applied)
}

/// Append a constructed element as the last child of the addressed
/// container, preceded by a marker comment.
pub fn append_child(
    doc: &mut XmlDocument,
    expr: &str,
    new_elem: Element,
    desc: &str,
) -> Result<MutationOutcome> {
    let query = XmlQuery::parse(expr)?;
    let Some(loc) = query::resolve(&doc.root, &query) else {
        warn!(address = expr, "container not found, append skipped");
        return Ok(MutationOutcome::SkippedNotFound);
    };
    let container = query::element_at_mut(&mut doc.root, &loc)?;
    container.children.push(marker_comment(desc));
    container.children.push(XMLNode::Element(new_elem));
    Ok(MutationOutcome::Applied)
}

/// Comment the addressed element out entirely, leaving no replacement.
pub fn comment_out(doc: &mut XmlDocument, expr: &str) -> Result<MutationOutcome> {
    let query = XmlQuery::parse(expr)?;
    let Some(loc) = query::resolve(&doc.root, &query) else {
        warn!(address = expr, "address not found, comment-out skipped");
        return Ok(MutationOutcome::SkippedNotFound);
    };
    let Some(target) = query::node_at(&doc.root, &loc) else {
        bail!("stale node location for '{}'", expr);
    };
    let prior = serialize_element_compact(target)?;

    let (children, index) = query::sibling_slot(&mut doc.root, &loc)?;
    children.splice(index..=index, [XMLNode::Comment(prior)]);
    Ok(MutationOutcome::Applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_element;

    fn doc(raw: &str) -> XmlDocument {
        XmlDocument {
            root: parse_element(raw).unwrap(),
        }
    }

    fn comments_of(elem: &Element) -> Vec<String> {
        elem.children
            .iter()
            .filter_map(|n| match n {
                XMLNode::Comment(c) => Some(c.clone()),
                _ => None,
            })
            .collect()
    }

    const AUTH: &str = r#"<Server>
    <AuthManager>
        <ServerURL>https://localhost:9443/services/</ServerURL>
        <Username>admin</Username>
    </AuthManager>
</Server>"#;

    #[test]
    fn replace_value_keeps_prior_as_comment_before_new_element() {
        let mut doc = doc(AUTH);
        let outcome = replace_value(
            &mut doc,
            "AuthManager/ServerURL",
            "https://km:9444/services/",
            "server url changed",
        )
        .unwrap();
        assert_eq!(outcome, MutationOutcome::Applied);

        let auth = doc.root.get_child("AuthManager").unwrap();
        let comments = comments_of(auth);
        assert_eq!(comments.len(), 2);
        assert_eq!(
            comments[0],
            "<ServerURL>https://localhost:9443/services/</ServerURL>"
        );
        assert_eq!(comments[1], "HYDROGENERATED: server url changed");

        // prior comment, marker, then the replacement, in that order
        let kinds: Vec<&str> = auth
            .children
            .iter()
            .map(|n| match n {
                XMLNode::Comment(_) => "comment",
                XMLNode::Element(e) if e.name == "ServerURL" => "serverurl",
                XMLNode::Element(_) => "element",
                _ => "other",
            })
            .collect();
        let first_comment = kinds.iter().position(|k| *k == "comment").unwrap();
        let new_elem = kinds.iter().position(|k| *k == "serverurl").unwrap();
        assert!(first_comment < new_elem);

        let replaced = auth.get_child("ServerURL").unwrap();
        assert_eq!(
            replaced.get_text().unwrap().trim(),
            "https://km:9444/services/"
        );
    }

    #[test]
    fn replace_value_preserves_attributes() {
        let mut doc = doc(r#"<Realm>
    <Configuration>
        <Property name="dataSource">jdbc/WSO2CarbonDB</Property>
    </Configuration>
</Realm>"#);
        replace_value(
            &mut doc,
            "Configuration/Property[@name=\"dataSource\"]",
            "jdbc/WSO2UM_DB",
            "datasource changed",
        )
        .unwrap();

        let prop = doc
            .root
            .get_child("Configuration")
            .unwrap()
            .get_child("Property")
            .unwrap();
        assert_eq!(prop.attributes.get("name").unwrap(), "dataSource");
        assert_eq!(prop.get_text().unwrap().trim(), "jdbc/WSO2UM_DB");
    }

    #[test]
    fn missing_address_is_a_skip_and_leaves_document_untouched() {
        let mut doc = doc(AUTH);
        let before = doc.serialize().unwrap();
        let outcome = replace_value(&mut doc, "AuthManager/NoSuch", "x", "noop").unwrap();
        assert_eq!(outcome, MutationOutcome::SkippedNotFound);
        assert_eq!(doc.serialize().unwrap(), before);
    }

    #[test]
    fn insert_after_places_element_behind_anchor() {
        let mut doc = doc(AUTH);
        let elem = crate::parser::text_element("ThriftClientPort", "10397");
        insert_after(&mut doc, "AuthManager/Username", elem, Some("port added")).unwrap();

        let auth = doc.root.get_child("AuthManager").unwrap();
        let names: Vec<String> = auth
            .children
            .iter()
            .filter_map(|n| n.as_element().map(|e| e.name.clone()))
            .collect();
        assert_eq!(names, ["ServerURL", "Username", "ThriftClientPort"]);
        assert!(comments_of(auth)
            .iter()
            .any(|c| c == "HYDROGENERATED: port added"));
    }

    #[test]
    fn append_child_lands_at_the_end_of_the_container() {
        let mut doc = doc("<APIGateway><Environments><Environment/></Environments></APIGateway>");
        let elem = Element::new("Environment");
        append_child(&mut doc, "APIGateway/Environments", elem, "environment added").unwrap();

        let environments = doc.root.get_child("Environments").unwrap();
        let elems: Vec<&Element> = environments
            .children
            .iter()
            .filter_map(|n| n.as_element())
            .collect();
        assert_eq!(elems.len(), 2);
        match environments.children.last().unwrap() {
            XMLNode::Element(e) => assert_eq!(e.name, "Environment"),
            other => panic!("expected trailing element, got {:?}", other),
        }
    }

    #[test]
    fn comment_out_removes_element_and_keeps_its_text() {
        let mut doc = doc(r#"<axisconfig>
    <transportSender name="ws">
        <parameter name="ws.outflow.security">false</parameter>
    </transportSender>
    <transportSender name="http"/>
</axisconfig>"#);
        comment_out(&mut doc, "transportSender[@name=\"ws\"]").unwrap();

        let senders: Vec<&Element> = doc
            .root
            .children
            .iter()
            .filter_map(|n| n.as_element())
            .collect();
        assert_eq!(senders.len(), 1);
        assert_eq!(senders[0].attributes.get("name").unwrap(), "http");
        assert!(comments_of(&doc.root)
            .iter()
            .any(|c| c.contains("transportSender") && c.contains("ws.outflow.security")));
    }

    #[test]
    fn repeated_replacement_rederives_prior_from_current_value() {
        let mut doc = doc(AUTH);
        replace_value(&mut doc, "AuthManager/ServerURL", "https://a:9443/", "first").unwrap();
        replace_value(&mut doc, "AuthManager/ServerURL", "https://b:9443/", "second").unwrap();

        let auth = doc.root.get_child("AuthManager").unwrap();
        let comments = comments_of(auth);
        assert!(comments
            .iter()
            .any(|c| c == "<ServerURL>https://a:9443/</ServerURL>"));
        let replaced = auth.get_child("ServerURL").unwrap();
        assert_eq!(replaced.get_text().unwrap().trim(), "https://b:9443/");
    }
}
