//! Structural addresses over parsed XML trees.
//!
//! Queries are namespace-agnostic path expressions resolving to at most
//! one node: `Seg('/'Seg)*`, where a segment is an element name with an
//! optional predicate — `[@attr="v"]` (attribute equality),
//! `[child="v"]` (direct child element text equality) or `[n]` (1-based
//! position among same-named elements in document order). The first
//! segment matches the root or any descendant, searched depth-first in
//! document order; later segments match direct children only.

use anyhow::{bail, Result};
use xmltree::{Element, XMLNode};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    Attribute { name: String, value: String },
    ChildText { name: String, value: String },
    Position(usize),
}

#[derive(Debug, Clone)]
pub struct Segment {
    pub name: String,
    pub predicate: Option<Predicate>,
}

/// A parsed structural address.
#[derive(Debug, Clone)]
pub struct XmlQuery {
    segments: Vec<Segment>,
}

/// Child-index path from the document root to a resolved node.
///
/// An empty path addresses the root element itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeLocation {
    pub indices: Vec<usize>,
}

impl XmlQuery {
    pub fn parse(expr: &str) -> Result<Self> {
        if expr.trim().is_empty() {
            bail!("empty XML query");
        }
        let mut segments = Vec::new();
        for part in expr.split('/') {
            segments.push(parse_segment(part, expr)?);
        }
        Ok(XmlQuery { segments })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }
}

fn parse_segment(part: &str, expr: &str) -> Result<Segment> {
    let part = part.trim();
    if part.is_empty() {
        bail!("empty segment in XML query '{}'", expr);
    }
    let Some(open) = part.find('[') else {
        return Ok(Segment {
            name: part.to_string(),
            predicate: None,
        });
    };
    if !part.ends_with(']') {
        bail!("unterminated predicate in XML query '{}'", expr);
    }
    let name = part[..open].trim().to_string();
    let body = &part[open + 1..part.len() - 1];

    if let Ok(position) = body.trim().parse::<usize>() {
        if position == 0 {
            bail!("positions are 1-based in XML query '{}'", expr);
        }
        return Ok(Segment {
            name,
            predicate: Some(Predicate::Position(position)),
        });
    }

    let Some(eq) = body.find('=') else {
        bail!("unsupported predicate '[{}]' in XML query '{}'", body, expr);
    };
    let key = body[..eq].trim();
    let value = body[eq + 1..].trim().trim_matches('"').to_string();
    let predicate = if let Some(attr) = key.strip_prefix('@') {
        Predicate::Attribute {
            name: attr.to_string(),
            value,
        }
    } else {
        Predicate::ChildText {
            name: key.to_string(),
            value,
        }
    };
    Ok(Segment {
        name,
        predicate: Some(predicate),
    })
}

fn child_text(elem: &Element, name: &str) -> Option<String> {
    elem.get_child(name)
        .and_then(|c| c.get_text())
        .map(|t| t.trim().to_string())
}

/// Predicate check, position excluded (position is counted by the caller).
fn non_positional_match(elem: &Element, segment: &Segment) -> bool {
    if elem.name != segment.name {
        return false;
    }
    match &segment.predicate {
        None | Some(Predicate::Position(_)) => true,
        Some(Predicate::Attribute { name, value }) => {
            elem.attributes.get(name).map(String::as_str) == Some(value.as_str())
        }
        Some(Predicate::ChildText { name, value }) => {
            child_text(elem, name).as_deref() == Some(value.as_str())
        }
    }
}

/// Match `segments` as a chain of direct children under `elem`.
fn match_chain(elem: &Element, segments: &[Segment]) -> Option<Vec<usize>> {
    let Some(segment) = segments.first() else {
        return Some(Vec::new());
    };
    let mut position = 0usize;
    for (i, node) in elem.children.iter().enumerate() {
        let XMLNode::Element(child) = node else {
            continue;
        };
        if !non_positional_match(child, segment) {
            continue;
        }
        position += 1;
        if let Some(Predicate::Position(wanted)) = &segment.predicate {
            if position != *wanted {
                continue;
            }
        }
        if let Some(mut rest) = match_chain(child, &segments[1..]) {
            let mut path = vec![i];
            path.append(&mut rest);
            return Some(path);
        }
    }
    None
}

fn search(
    elem: &Element,
    path: &mut Vec<usize>,
    segments: &[Segment],
    position: &mut usize,
) -> Option<Vec<usize>> {
    let head = &segments[0];
    if non_positional_match(elem, head) {
        *position += 1;
        let positional_hit = match &head.predicate {
            Some(Predicate::Position(wanted)) => *position == *wanted,
            _ => true,
        };
        if positional_hit {
            if let Some(rest) = match_chain(elem, &segments[1..]) {
                let mut full = path.clone();
                full.extend(rest);
                return Some(full);
            }
        }
    }
    for (i, node) in elem.children.iter().enumerate() {
        if let XMLNode::Element(child) = node {
            path.push(i);
            let found = search(child, path, segments, position);
            path.pop();
            if found.is_some() {
                return found;
            }
        }
    }
    None
}

/// Resolve a query against the root, returning the first match in
/// document order, or `None` when the address is not present.
pub fn resolve(root: &Element, query: &XmlQuery) -> Option<NodeLocation> {
    let mut path = Vec::new();
    let mut position = 0usize;
    search(root, &mut path, query.segments(), &mut position).map(|indices| NodeLocation { indices })
}

/// Borrow the element a location points at.
pub fn node_at<'a>(root: &'a Element, loc: &NodeLocation) -> Option<&'a Element> {
    let mut current = root;
    for &i in &loc.indices {
        current = match current.children.get(i) {
            Some(XMLNode::Element(child)) => child,
            _ => return None,
        };
    }
    Some(current)
}

/// Mutable access to the sibling list holding a located node.
///
/// Returns the parent's children vector and the node's index within it.
/// Fails for the root element, which has no siblings to splice.
pub fn sibling_slot<'a>(
    root: &'a mut Element,
    loc: &NodeLocation,
) -> Result<(&'a mut Vec<XMLNode>, usize)> {
    let Some((&last, parents)) = loc.indices.split_last() else {
        bail!("cannot splice at the document root");
    };
    let mut current = root;
    for &i in parents {
        current = match current.children.get_mut(i) {
            Some(XMLNode::Element(child)) => child,
            _ => bail!("stale node location"),
        };
    }
    if last >= current.children.len() {
        bail!("stale node location");
    }
    Ok((&mut current.children, last))
}

/// Mutable access to the element a location points at.
pub fn element_at_mut<'a>(root: &'a mut Element, loc: &NodeLocation) -> Result<&'a mut Element> {
    let mut current = root;
    for &i in &loc.indices {
        current = match current.children.get_mut(i) {
            Some(XMLNode::Element(child)) => child,
            _ => bail!("stale node location"),
        };
    }
    Ok(current)
}
