//! Single-node recipes: respecialize one pack in place against a
//! relational backend.

use anyhow::Result;
use std::path::Path;
use tracing::debug;

use super::step;
use crate::artifact::{datasource, identity, registry, user_mgt};
use crate::confs::{DatasourceConfs, DatasourceSet};
use crate::maps::SchemaMap;

/// Generic carbon-server product: swap the named datasource, rebind the
/// identity persistence manager, mount the registry at base ports.
pub fn configure_carbon_server(
    maps: &SchemaMap,
    confs: &DatasourceConfs,
    working_dir: &Path,
) -> Result<()> {
    debug!("configuring single-node carbon server");
    step(
        "replace master datasource",
        datasource::alter_master_ds(maps, confs, working_dir),
    );
    step(
        "rebind identity datasource",
        identity::alter_identity(maps, &confs.jndi_name, working_dir),
    );
    step(
        "mount registry",
        registry::alter_registry(maps, confs, 0, working_dir),
    );
    Ok(())
}

/// API Manager product: swap the AM/UM/REG trio, mount the registry,
/// point the realm at the user-management datasource.
pub fn configure_api_manager_server(
    maps: &SchemaMap,
    datasources: &DatasourceSet,
    working_dir: &Path,
) -> Result<()> {
    debug!("configuring single-node API Manager");
    step(
        "replace AM datasource",
        datasource::alter_master_ds_of_am(maps, &datasources.am, working_dir),
    );
    step(
        "insert UM datasource",
        datasource::alter_master_ds_of_um(maps, &datasources.um, working_dir),
    );
    step(
        "insert REG datasource",
        datasource::alter_master_ds_of_reg(maps, &datasources.reg, working_dir),
    );
    step(
        "mount registry",
        registry::alter_registry(maps, &datasources.reg, 0, working_dir),
    );
    step(
        "swap realm datasource",
        user_mgt::alter_user_management(maps, false, working_dir),
    );
    Ok(())
}
