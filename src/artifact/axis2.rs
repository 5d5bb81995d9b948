//! Transport senders in `axis2/axis2.xml`.
//!
//! Only the distributed traffic-manager role touches this artifact: the
//! WS and WSS transport senders are commented out entirely, with no
//! replacement, to disable those transports on that node.

use anyhow::Result;
use std::path::Path;
use tracing::debug;

use crate::maps::SchemaMap;
use crate::parser::{mutate, parse_xml, Encoding};

pub fn comment_ws_transport_sender(maps: &SchemaMap, working_dir: &Path) -> Result<()> {
    debug!("commenting WS transport sender");
    comment_transport_sender(maps, working_dir, maps.xml.axis2_ws_transportsender)
}

pub fn comment_wss_transport_sender(maps: &SchemaMap, working_dir: &Path) -> Result<()> {
    debug!("commenting WSS transport sender");
    comment_transport_sender(maps, working_dir, maps.xml.axis2_wss_transportsender)
}

fn comment_transport_sender(maps: &SchemaMap, working_dir: &Path, expr: &str) -> Result<()> {
    let path = working_dir.join(maps.artifacts.axis2);
    let mut doc = parse_xml(&path)?;
    mutate::comment_out(&mut doc, expr)?;
    doc.write(&path, Encoding::Utf8)
}
