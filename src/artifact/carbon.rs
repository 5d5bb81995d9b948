//! Port offset configuration in `carbon.xml` / `deployment.toml`.

use anyhow::Result;
use std::path::Path;
use toml_edit::value;
use tracing::debug;

use crate::maps::{ProductVersion, SchemaMap};
use crate::parser::toml::parse_toml;
use crate::parser::{mutate, parse_xml, Encoding};

/// Shift the whole port family of one node instance.
///
/// Offset 0 means "use base ports unchanged" and short-circuits before
/// touching the artifact, leaving the file byte-identical.
///
/// The carbon artifact is the one place the consuming runtime demands an
/// ISO-8859-1 declaration, so the XML path writes with the encoding swap.
pub fn configure_port_offset(maps: &SchemaMap, working_dir: &Path, offset: u16) -> Result<()> {
    debug!(offset, "configuring port offset");
    if offset == 0 {
        return Ok(());
    }

    match maps.version {
        ProductVersion::V26 => {
            let path = working_dir.join(maps.artifacts.carbon);
            let mut doc = parse_xml(&path)?;
            mutate::replace_value(
                &mut doc,
                maps.xml.carbon_ports_offset,
                &offset.to_string(),
                &format!("port offset {}", offset),
            )?;
            doc.write(&path, Encoding::Latin1)
        }
        ProductVersion::V31 => {
            let path = working_dir.join(maps.artifacts.deployment_toml);
            let mut doc = parse_toml(&path)?;
            doc.merge_value(
                maps.toml.server_offset,
                value(i64::from(offset)),
                &format!("port offset {}", offset),
            )?;
            doc.write()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn offset_zero_leaves_carbon_byte_identical() {
        let temp = TempDir::new().unwrap();
        fixtures::write_pack(temp.path()).unwrap();
        let maps = SchemaMap::for_version(ProductVersion::V26);
        let carbon = temp.path().join(maps.artifacts.carbon);
        let before = fs::read(&carbon).unwrap();

        configure_port_offset(&maps, temp.path(), 0).unwrap();
        assert_eq!(fs::read(&carbon).unwrap(), before);
    }

    #[test]
    fn offset_zero_leaves_deployment_toml_byte_identical() {
        let temp = TempDir::new().unwrap();
        fixtures::write_pack(temp.path()).unwrap();
        let maps = SchemaMap::for_version(ProductVersion::V31);
        let toml = temp.path().join(maps.artifacts.deployment_toml);
        let before = fs::read(&toml).unwrap();

        configure_port_offset(&maps, temp.path(), 0).unwrap();
        assert_eq!(fs::read(&toml).unwrap(), before);
    }

    #[test]
    fn xml_offset_is_replaced_and_declared_latin1() {
        let temp = TempDir::new().unwrap();
        fixtures::write_pack(temp.path()).unwrap();
        let maps = SchemaMap::for_version(ProductVersion::V26);

        configure_port_offset(&maps, temp.path(), 2).unwrap();

        let out = fs::read_to_string(temp.path().join(maps.artifacts.carbon)).unwrap();
        assert!(out.starts_with("<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?>"));
        assert!(out.contains("<Offset>2</Offset>"));
        assert!(out.contains("<!-- <Offset>0</Offset> -->"));
        assert!(out.contains("HYDROGENERATED: port offset 2"));
    }

    #[test]
    fn toml_offset_merges_server_key() {
        let temp = TempDir::new().unwrap();
        fixtures::write_pack(temp.path()).unwrap();
        let maps = SchemaMap::for_version(ProductVersion::V31);

        configure_port_offset(&maps, temp.path(), 3).unwrap();

        let out = fs::read_to_string(temp.path().join(maps.artifacts.deployment_toml)).unwrap();
        assert!(out.contains("offset = 3"));
        assert!(out.contains("hostname = \"localhost\""));
    }
}
