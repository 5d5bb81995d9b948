//! Persistence-manager datasource in `identity/identity.xml`.

use anyhow::Result;
use std::path::Path;
use tracing::debug;

use crate::maps::SchemaMap;
use crate::parser::{mutate, parse_xml, Encoding};

/// Rename the JDBC persistence-manager datasource reference.
pub fn alter_identity(maps: &SchemaMap, jndi_name: &str, working_dir: &Path) -> Result<()> {
    debug!(jndi_name, "altering identity");
    let path = working_dir.join(maps.artifacts.identity);
    let mut doc = parse_xml(&path)?;
    mutate::replace_value(
        &mut doc,
        maps.xml.identity_datasource_name,
        jndi_name,
        "datasource added & changed jdbc/WSO2CarbonDB",
    )?;
    doc.write(&path, Encoding::Utf8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::maps::ProductVersion;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn datasource_name_is_replaced_with_audit_trail() {
        let temp = TempDir::new().unwrap();
        fixtures::write_pack(temp.path()).unwrap();
        let maps = SchemaMap::for_version(ProductVersion::V26);

        alter_identity(&maps, "jdbc/WSO2CARBON_DB_2", temp.path()).unwrap();

        let out = fs::read_to_string(temp.path().join(maps.artifacts.identity)).unwrap();
        assert!(out.contains("<Name>jdbc/WSO2CARBON_DB_2</Name>"));
        assert!(out.contains("<!-- <Name>jdbc/WSO2CarbonDB</Name> -->"));
        assert!(out.contains("HYDROGENERATED: datasource added & changed"));
    }
}
