//! Identity-Server-as-Key-Manager layout: an IS-KM pack owns key
//! validation, an API Manager pack delegates to it.

use anyhow::Result;
use std::path::Path;
use tracing::debug;

use super::step;
use crate::artifact::{api_manager, carbon, datasource, registry, user_mgt};
use crate::confs::{DatasourceSet, EnvironmentConfs, LayoutConfs};
use crate::maps::{ProductVersion, SchemaMap};

/// Configure the IS-KM pack: gateway environment pointed at the gateway,
/// the datasource trio, registry mounts, a JDBC user store (the IS pack
/// defaults to LDAP, which cannot be shared with the API Manager), and
/// its own port offset.
pub fn configure_identity_server_km(
    maps: &SchemaMap,
    working_dir: &Path,
    datasources: &DatasourceSet,
    confs: &LayoutConfs,
) -> Result<()> {
    debug!("configuring Identity Server as Key Manager");
    match maps.version {
        ProductVersion::V26 => step(
            "alter gateway environment server URL",
            api_manager::alter_gateway_environment_server_url(
                maps,
                confs,
                working_dir,
                confs.gw_offset,
            ),
        ),
        ProductVersion::V31 => step(
            "add gateway environment",
            api_manager::add_gateway_environment(
                maps,
                &EnvironmentConfs::default(),
                working_dir,
            ),
        ),
    }
    step(
        "alter revoke API URL",
        api_manager::alter_oauth_revoke_api_url(maps, confs, working_dir, confs.gw_offset),
    );

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
        registry::alter_registry(maps, &datasources.reg, confs.offset, working_dir),
    );
    step(
        "convert user store to JDBC",
        user_mgt::alter_user_management(maps, true, working_dir),
    );

    step(
        "configure port offset",
        carbon::configure_port_offset(maps, working_dir, confs.offset),
    );
    Ok(())
}

/// Configure the API Manager pack against the IS-KM node: auth manager
/// and key validation both point at the IS-KM offset, the user store
/// stays LDAP, registry mounts at base ports.
pub fn configure_api_manager_with_iskm(
    maps: &SchemaMap,
    working_dir: &Path,
    datasources: &DatasourceSet,
    confs: &LayoutConfs,
) -> Result<()> {
    debug!("configuring API Manager against IS-KM");
    step(
        "alter AuthManager server URL",
        api_manager::alter_auth_manager_server_url(maps, confs, working_dir, confs.iskm_offset),
    );
    step(
        "alter APIKeyValidator server URL",
        api_manager::alter_api_key_validator_server_url(
            maps,
            confs,
            working_dir,
            confs.iskm_offset,
        ),
    );
    step(
        "alter key validator client type",
        api_manager::alter_api_key_validator_client_type(maps, confs, working_dir),
    );
    step(
        "alter thrift server flag",
        api_manager::alter_api_key_validator_enable_thrift_server(maps, confs, working_dir),
    );

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
        "keep LDAP user store, swap realm datasource",
        user_mgt::alter_user_management(maps, false, working_dir),
    );
    Ok(())
}
