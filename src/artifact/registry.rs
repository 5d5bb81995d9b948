//! Registry mount configuration in `registry.xml`.
//!
//! The mount is a batch of four related structures inserted around fixed
//! anchors. Insertion order matters: the governance and config mounts
//! reference the remote instance by id, so they must land after it in
//! document order.

use anyhow::Result;
use std::path::Path;
use tracing::debug;
use xmltree::{Element, XMLNode};

use crate::confs::DatasourceConfs;
use crate::maps::{ProductVersion, SchemaMap};
use crate::parser::{mutate, parse_xml, text_element, Encoding};

/// The four registry structures, in insertion order: `dbConfig`,
/// `remoteInstance`, governance `mount`, config `mount`.
pub fn construct_registry(
    maps: &SchemaMap,
    confs: &DatasourceConfs,
    offset: u16,
) -> [Element; 4] {
    debug!("constructing registry mount configurations");

    let mut db_config = Element::new("dbConfig");
    db_config
        .attributes
        .insert("name".to_string(), "govregistry".to_string());
    db_config
        .children
        .push(XMLNode::Element(text_element("dataSource", &confs.jndi_name)));

    let mut remote_instance = Element::new("remoteInstance");
    remote_instance.attributes.insert(
        "url".to_string(),
        format!(
            "https://localhost:{}/registry",
            maps.ports.https_servlet + offset
        ),
    );
    for child in [
        text_element("id", "gov"),
        text_element(
            "cacheId",
            &format!("{}@{}", confs.username, confs.connection_url),
        ),
        text_element("dbConfig", "govregistry"),
        text_element("readOnly", "false"),
        text_element("enableCache", "true"),
        text_element("registryRoot", "/"),
    ] {
        remote_instance.children.push(XMLNode::Element(child));
    }

    let mount_gov = mount("/_system/governance");
    let mount_conf = mount("/_system/config");

    [db_config, remote_instance, mount_gov, mount_conf]
}

fn mount(path: &str) -> Element {
    let mut elem = Element::new("mount");
    elem.attributes.insert("path".to_string(), path.to_string());
    elem.attributes
        .insert("overwrite".to_string(), "true".to_string());
    for child in [
        text_element("instanceId", "gov"),
        text_element("targetPath", path),
    ] {
        elem.children.push(XMLNode::Element(child));
    }
    elem
}

/// Mount the governance/config registry onto the shared database.
///
/// XML only: the newer generation mounts through its shared database
/// tables, so the V31 path is a deliberate no-op.
pub fn alter_registry(
    maps: &SchemaMap,
    confs: &DatasourceConfs,
    offset: u16,
    working_dir: &Path,
) -> Result<()> {
    debug!(offset, "altering registry");
    match maps.version {
        ProductVersion::V26 => {
            let path = working_dir.join(maps.artifacts.registry);
            let mut doc = parse_xml(&path)?;
            let [db_config, remote_instance, mount_gov, mount_conf] =
                construct_registry(maps, confs, offset);

            // anchors resolve against the document as it grows, so each
            // insertion feeds the next one
            mutate::insert_after(
                &mut doc,
                maps.xml.registry_dbconfig_wso2registry,
                db_config,
                Some("registry mounted"),
            )?;
            mutate::insert_after(&mut doc, maps.xml.registry_dbconfig_second, remote_instance, None)?;
            mutate::insert_after(&mut doc, maps.xml.registry_remoteinstance, mount_gov, None)?;
            mutate::insert_after(&mut doc, maps.xml.registry_mount, mount_conf, None)?;

            doc.write(&path, Encoding::Utf8)
        }
        ProductVersion::V31 => {
            debug!("registry mounts ride the shared database on this version");
            Ok(())
        }
    }
}
