//! Datasource definitions in `master-datasources.xml` / `deployment.toml`.
//!
//! The AM/UM/REG trio is order-dependent on the XML path: the UM block
//! anchors after the stock `WSO2AM_DB` datasource, and the REG block
//! anchors after the UM block inserted just before it. Recipes must call
//! AM → UM → REG in that order.

use anyhow::Result;
use std::path::{Path, PathBuf};
use toml_edit::{value, Item, Table};
use tracing::debug;
use xmltree::{Element, XMLNode};

use crate::confs::DatasourceConfs;
use crate::maps::{ProductVersion, SchemaMap};
use crate::parser::toml::parse_toml;
use crate::parser::{mutate, parse_xml, text_element, Encoding, XmlDocument};

fn load(maps: &SchemaMap, working_dir: &Path) -> Result<(PathBuf, XmlDocument)> {
    let path = working_dir.join(maps.artifacts.master_datasource);
    let doc = parse_xml(&path)?;
    Ok((path, doc))
}

/// Build a `<datasource>` block in the fixed field order the product
/// expects.
pub fn construct_datasource(confs: &DatasourceConfs) -> Element {
    debug!(name = %confs.name, "constructing datasource element");
    let mut datasource = Element::new("datasource");
    datasource
        .children
        .push(XMLNode::Element(text_element("name", &confs.name)));
    datasource.children.push(XMLNode::Element(text_element(
        "description",
        &confs.description,
    )));

    let mut jndi_config = Element::new("jndiConfig");
    jndi_config
        .children
        .push(XMLNode::Element(text_element("name", &confs.jndi_name)));
    datasource.children.push(XMLNode::Element(jndi_config));

    let mut definition = Element::new("definition");
    definition
        .attributes
        .insert("type".to_string(), "RDBMS".to_string());
    let mut configuration = Element::new("configuration");
    let fields = [
        ("url", confs.connection_url.as_str()),
        ("username", confs.username.as_str()),
        ("password", confs.password.as_str()),
        ("driverClassName", confs.driver.as_str()),
        ("maxActive", confs.max_active.as_str()),
        ("maxWait", confs.max_wait.as_str()),
        ("minIdle", confs.min_idle.as_str()),
        ("testOnBorrow", confs.test_on_borrow.as_str()),
        ("validationQuery", confs.validation_query.as_str()),
        ("validationInterval", confs.validation_interval.as_str()),
        ("defaultAutoCommit", confs.default_auto_commit.as_str()),
    ];
    for (name, text) in fields {
        configuration
            .children
            .push(XMLNode::Element(text_element(name, text)));
    }
    definition.children.push(XMLNode::Element(configuration));
    datasource.children.push(XMLNode::Element(definition));
    datasource
}

/// Build the deployment.toml datasource table.
pub fn construct_datasource_toml(confs: &DatasourceConfs) -> Table {
    debug!(name = %confs.name, "constructing datasource table");
    let mut table = Table::new();
    table.insert("type", value(confs.ds_type.as_str()));
    table.insert("url", value(confs.connection_url.as_str()));
    table.insert("username", value(confs.username.as_str()));
    table.insert("password", value(confs.password.as_str()));
    table.insert("driver", value(confs.driver.as_str()));
    table.insert("validation_query", value(confs.validation_query.as_str()));

    let mut pool = Table::new();
    pool.insert("maxActive", value(confs.max_active.as_str()));
    pool.insert("maxWait", value(confs.max_wait.as_str()));
    pool.insert("minIdle", value(confs.min_idle.as_str()));
    pool.insert("testOnBorrow", value(confs.test_on_borrow.as_str()));
    pool.insert("validationInterval", value(confs.validation_interval.as_str()));
    pool.insert("defaultAutoCommit", value(confs.default_auto_commit.as_str()));
    table.insert("pool_options", Item::Table(pool));
    table
}

/// Replace the API Manager datasource, keeping the stock block as the
/// audit comment.
pub fn alter_master_ds_of_am(
    maps: &SchemaMap,
    confs: &DatasourceConfs,
    working_dir: &Path,
) -> Result<()> {
    debug!("altering AM datasource in master-datasources");
    match maps.version {
        ProductVersion::V26 => {
            let (path, mut doc) = load(maps, working_dir)?;
            let datasource = construct_datasource(confs);
            mutate::replace_element(
                &mut doc,
                maps.xml.datasources_datasource_am,
                datasource,
                "datasource added",
            )?;
            doc.write(&path, Encoding::Utf8)
        }
        ProductVersion::V31 => merge_toml_datasource(maps, confs, working_dir, maps.toml.am_db),
    }
}

/// Insert the user-management datasource after the AM block.
pub fn alter_master_ds_of_um(
    maps: &SchemaMap,
    confs: &DatasourceConfs,
    working_dir: &Path,
) -> Result<()> {
    debug!("altering UM datasource in master-datasources");
    match maps.version {
        ProductVersion::V26 => {
            let (path, mut doc) = load(maps, working_dir)?;
            let datasource = construct_datasource(confs);
            mutate::insert_after(
                &mut doc,
                maps.xml.datasources_datasource_am,
                datasource,
                Some("datasource added"),
            )?;
            doc.write(&path, Encoding::Utf8)
        }
        ProductVersion::V31 => merge_toml_datasource(maps, confs, working_dir, maps.toml.um_db),
    }
}

/// Insert the registry datasource after the UM block.
pub fn alter_master_ds_of_reg(
    maps: &SchemaMap,
    confs: &DatasourceConfs,
    working_dir: &Path,
) -> Result<()> {
    debug!("altering REG datasource in master-datasources");
    match maps.version {
        ProductVersion::V26 => {
            let (path, mut doc) = load(maps, working_dir)?;
            let datasource = construct_datasource(confs);
            mutate::insert_after(
                &mut doc,
                maps.xml.datasources_datasource_um,
                datasource,
                Some("datasource added"),
            )?;
            doc.write(&path, Encoding::Utf8)
        }
        ProductVersion::V31 => merge_toml_datasource(maps, confs, working_dir, maps.toml.shared_db),
    }
}

fn merge_toml_datasource(
    maps: &SchemaMap,
    confs: &DatasourceConfs,
    working_dir: &Path,
    key: &str,
) -> Result<()> {
    let path = working_dir.join(maps.artifacts.deployment_toml);
    let mut doc = parse_toml(&path)?;
    let table = construct_datasource_toml(confs);
    doc.merge_value(key, Item::Table(table), "datasource added")?;
    doc.write()
}

/// Generic single-node fallback: replace the datasource matching the
/// configured name, or insert after the first datasource when no block
/// carries that name yet.
pub fn alter_master_ds(maps: &SchemaMap, confs: &DatasourceConfs, working_dir: &Path) -> Result<()> {
    debug!(name = %confs.name, "altering generic master datasource");
    let (path, mut doc) = load(maps, working_dir)?;
    let datasource = construct_datasource(confs);
    let named = format!("datasources/datasource[name=\"{}\"]", confs.name);

    let outcome = mutate::replace_element(
        &mut doc,
        &named,
        datasource.clone(),
        "datasource added & replaced",
    )?;
    if outcome == mutate::MutationOutcome::SkippedNotFound {
        mutate::insert_after(
            &mut doc,
            maps.xml.datasources_datasource,
            datasource,
            Some("datasource added & replaced"),
        )?;
    }
    doc.write(&path, Encoding::Utf8)
}
