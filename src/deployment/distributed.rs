//! Fully distributed layout: gateway, key manager, publisher, store and
//! traffic manager, each on its own offset, cross-referencing each
//! other's offsets through their URLs.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use super::{copy_pack, find_server_pack, step, DEPLOYMENT_DIR};
use crate::artifact::{api_manager, axis2, carbon, datasource, jndi, registry, user_mgt};
use crate::confs::{DatasourceSet, LayoutConfs};
use crate::maps::SchemaMap;

/// Node directory names, in configuration order.
pub const ROLES: [&str; 5] = [
    "gateway",
    "key-manager",
    "publisher",
    "store",
    "traffic-manager",
];

/// Per-role layout records with the conventional offset assignment:
/// gateway 0, key manager 1, publisher 2, store 3, traffic manager 4.
#[derive(Debug, Clone)]
pub struct DistributedConfs {
    pub gateway: LayoutConfs,
    pub key_manager: LayoutConfs,
    pub publisher: LayoutConfs,
    pub store: LayoutConfs,
    pub traffic_manager: LayoutConfs,
}

impl Default for DistributedConfs {
    fn default() -> Self {
        let base = LayoutConfs::default();
        DistributedConfs {
            gateway: LayoutConfs {
                offset: 0,
                ..base.clone()
            },
            key_manager: LayoutConfs {
                offset: 1,
                ..base.clone()
            },
            publisher: LayoutConfs {
                offset: 2,
                ..base.clone()
            },
            store: LayoutConfs {
                offset: 3,
                ..base.clone()
            },
            traffic_manager: LayoutConfs { offset: 4, ..base },
        }
    }
}

/// Gateway role: key validation at the key manager, throttling wired to
/// the traffic manager's broker.
pub fn configure_distributed_gateway(
    maps: &SchemaMap,
    working_dir: &Path,
    confs: &LayoutConfs,
) -> Result<()> {
    debug!("configuring distributed gateway");
    step(
        "alter APIKeyValidator server URL",
        api_manager::alter_api_key_validator_server_url(maps, confs, working_dir, confs.km_offset),
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
        "alter traffic manager receiver URL group",
        api_manager::alter_traffic_manager_receiver_url_group(
            maps,
            confs,
            working_dir,
            confs.tm_offset,
        ),
    );
    step(
        "alter traffic manager auth URL group",
        api_manager::alter_traffic_manager_auth_url_group(maps, confs, working_dir, confs.tm_offset),
    );
    step(
        "alter policy deployer flag",
        api_manager::alter_policy_deployer_enabled(maps, confs, working_dir),
    );
    step(
        "alter policy deployer service URL",
        api_manager::alter_policy_deployer_service_url(maps, confs, working_dir, confs.tm_offset),
    );
    step(
        "add JMS service URL",
        api_manager::add_jms_connection_details_service_url(
            maps,
            confs,
            working_dir,
            confs.tm_offset,
        ),
    );
    step(
        "alter topic connection factory",
        api_manager::alter_jms_topic_connection_factory(maps, confs, working_dir, confs.tm_offset),
    );
    step(
        "configure port offset",
        carbon::configure_port_offset(maps, working_dir, confs.offset),
    );
    Ok(())
}

/// Key-manager role.
pub fn configure_key_manager(
    maps: &SchemaMap,
    working_dir: &Path,
    datasources: &DatasourceSet,
    confs: &LayoutConfs,
) -> Result<()> {
    debug!("configuring distributed key manager");
    step(
        "alter gateway environment server URL",
        api_manager::alter_gateway_environment_server_url(maps, confs, working_dir, confs.gw_offset),
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
        "alter policy deployer flag",
        api_manager::alter_policy_deployer_enabled(maps, confs, working_dir),
    );
    configure_node_datasources(maps, working_dir, datasources, confs);
    step(
        "configure port offset",
        carbon::configure_port_offset(maps, working_dir, confs.offset),
    );
    Ok(())
}

/// Publisher role: API store pointed at the store node, throttling and
/// messaging pointed at the traffic manager.
pub fn configure_publisher(
    maps: &SchemaMap,
    working_dir: &Path,
    datasources: &DatasourceSet,
    confs: &LayoutConfs,
) -> Result<()> {
    debug!("configuring distributed publisher");
    step(
        "alter AuthManager server URL",
        api_manager::alter_auth_manager_server_url(maps, confs, working_dir, confs.km_offset),
    );
    step(
        "alter gateway environment server URL",
        api_manager::alter_gateway_environment_server_url(maps, confs, working_dir, confs.gw_offset),
    );
    step(
        "alter gateway environment endpoint",
        api_manager::alter_gateway_environment_gateway_endpoint(
            maps,
            confs,
            working_dir,
            confs.gw_offset,
        ),
    );
    step(
        "alter thrift server flag",
        api_manager::alter_api_key_validator_enable_thrift_server(maps, confs, working_dir),
    );
    step(
        "alter API store display URL",
        api_manager::alter_api_store_display_url(maps, confs, working_dir),
    );
    step(
        "alter API store URL",
        api_manager::alter_api_store_url(maps, confs, working_dir, confs.store_offset),
    );
    step(
        "alter traffic manager receiver URL group",
        api_manager::alter_traffic_manager_receiver_url_group(
            maps,
            confs,
            working_dir,
            confs.tm_offset,
        ),
    );
    step(
        "alter traffic manager auth URL group",
        api_manager::alter_traffic_manager_auth_url_group(maps, confs, working_dir, confs.tm_offset),
    );
    step(
        "alter data publisher flag",
        api_manager::alter_data_publisher_enabled(maps, confs, working_dir),
    );
    step(
        "alter policy deployer service URL",
        api_manager::alter_policy_deployer_service_url(maps, confs, working_dir, confs.tm_offset),
    );
    step(
        "alter block condition flag",
        api_manager::alter_block_condition_enabled(maps, confs, working_dir),
    );
    step(
        "alter JMS connection details flag",
        api_manager::alter_jms_connection_details_enabled(maps, confs, working_dir),
    );
    configure_node_datasources(maps, working_dir, datasources, confs);
    step(
        "alter jndi.properties",
        jndi::alter_jndi_properties(maps, confs, working_dir, confs.tm_offset),
    );
    step(
        "configure port offset",
        carbon::configure_port_offset(maps, working_dir, confs.offset),
    );
    Ok(())
}

/// Store role: auth manager and key validation at the key manager,
/// gateway endpoints at the gateway.
pub fn configure_store(
    maps: &SchemaMap,
    working_dir: &Path,
    datasources: &DatasourceSet,
    confs: &LayoutConfs,
) -> Result<()> {
    debug!("configuring distributed store");
    step(
        "alter AuthManager server URL",
        api_manager::alter_auth_manager_server_url(maps, confs, working_dir, confs.km_offset),
    );
    step(
        "alter gateway environment server URL",
        api_manager::alter_gateway_environment_server_url(maps, confs, working_dir, confs.gw_offset),
    );
    step(
        "alter gateway environment endpoint",
        api_manager::alter_gateway_environment_gateway_endpoint(
            maps,
            confs,
            working_dir,
            confs.gw_offset,
        ),
    );
    step(
        "alter APIKeyValidator server URL",
        api_manager::alter_api_key_validator_server_url(maps, confs, working_dir, confs.km_offset),
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
        "alter revoke API URL",
        api_manager::alter_oauth_revoke_api_url(maps, confs, working_dir, confs.gw_offset),
    );
    step(
        "alter data publisher flag",
        api_manager::alter_data_publisher_enabled(maps, confs, working_dir),
    );
    step(
        "alter policy deployer flag",
        api_manager::alter_policy_deployer_enabled(maps, confs, working_dir),
    );
    step(
        "alter block condition flag",
        api_manager::alter_block_condition_enabled(maps, confs, working_dir),
    );
    step(
        "alter JMS connection details flag",
        api_manager::alter_jms_connection_details_enabled(maps, confs, working_dir),
    );
    configure_node_datasources(maps, working_dir, datasources, confs);
    step(
        "configure port offset",
        carbon::configure_port_offset(maps, working_dir, confs.offset),
    );
    Ok(())
}

/// Traffic-manager role.
///
/// The role-specific registry and axis2 templates are renamed into place
/// first — every later mutation must see the substituted files, not the
/// stock ones.
pub fn configure_traffic_manager(
    maps: &SchemaMap,
    working_dir: &Path,
    confs: &LayoutConfs,
) -> Result<()> {
    debug!("configuring distributed traffic manager");
    substitute(working_dir, maps.artifacts.registry_tm, maps.artifacts.registry)?;
    substitute(working_dir, maps.artifacts.axis2_tm, maps.artifacts.axis2)?;

    step(
        "comment WS transport sender",
        axis2::comment_ws_transport_sender(maps, working_dir),
    );
    step(
        "comment WSS transport sender",
        axis2::comment_wss_transport_sender(maps, working_dir),
    );
    step(
        "alter thrift server flag",
        api_manager::alter_api_key_validator_enable_thrift_server(maps, confs, working_dir),
    );
    step(
        "configure port offset",
        carbon::configure_port_offset(maps, working_dir, confs.offset),
    );
    Ok(())
}

fn substitute(working_dir: &Path, variant: &str, stock: &str) -> Result<()> {
    let stock_path = working_dir.join(stock);
    let variant_path = working_dir.join(variant);
    fs::remove_file(&stock_path)
        .with_context(|| format!("removing stock artifact '{}'", stock_path.display()))?;
    fs::rename(&variant_path, &stock_path).with_context(|| {
        format!(
            "renaming '{}' to '{}'",
            variant_path.display(),
            stock_path.display()
        )
    })
}

fn configure_node_datasources(
    maps: &SchemaMap,
    working_dir: &Path,
    datasources: &DatasourceSet,
    confs: &LayoutConfs,
) {
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
        "swap realm datasource",
        user_mgt::alter_user_management(maps, false, working_dir),
    );
    step(
        "mount registry",
        registry::alter_registry(maps, &datasources.reg, confs.offset, working_dir),
    );
}

/// Materialize and configure all five roles under `deployment/`.
///
/// Roles are processed sequentially, each copy completing before its
/// configuration starts; the loop halts at the first failed role.
pub fn configure_distributed(
    maps: &SchemaMap,
    working_dir: &Path,
    datasources: &DatasourceSet,
    confs: &DistributedConfs,
) -> Result<()> {
    let pack = find_server_pack(working_dir, "wso2am")?;
    let deployment = working_dir.join(DEPLOYMENT_DIR);
    fs::create_dir(&deployment)
        .with_context(|| format!("creating deployment directory '{}'", deployment.display()))?;

    info!(pack = %pack.display(), "laying out distributed deployment");

    for role in ROLES {
        let node_dir = deployment.join(role);
        copy_pack(&pack, &node_dir)?;
        match role {
            "gateway" => configure_distributed_gateway(maps, &node_dir, &confs.gateway)?,
            "key-manager" => {
                configure_key_manager(maps, &node_dir, datasources, &confs.key_manager)?
            }
            "publisher" => configure_publisher(maps, &node_dir, datasources, &confs.publisher)?,
            "store" => configure_store(maps, &node_dir, datasources, &confs.store)?,
            "traffic-manager" => {
                configure_traffic_manager(maps, &node_dir, &confs.traffic_manager)?
            }
            other => unreachable!("unknown role '{}'", other),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::confs::DatasourceConfs;
    use crate::fixtures;
    use crate::maps::ProductVersion;
    use std::fs;
    use tempfile::TempDir;

    fn datasources() -> DatasourceSet {
        let ds = |name: &str, jndi: &str| DatasourceConfs {
            name: name.to_string(),
            jndi_name: jndi.to_string(),
            connection_url: format!("jdbc:mysql://db:3306/{}", name),
            ..DatasourceConfs::default()
        };
        DatasourceSet {
            am: ds("WSO2AM_DB", "jdbc/WSO2AM_DB"),
            um: ds("WSO2UM_DB", "jdbc/WSO2UM_DB"),
            reg: ds("WSO2REG_DB", "jdbc/WSO2REG_DB"),
        }
    }

    #[test]
    fn store_auth_manager_points_at_key_manager_offset() {
        let temp = TempDir::new().unwrap();
        fixtures::write_pack(temp.path()).unwrap();
        let maps = SchemaMap::for_version(ProductVersion::V26);
        let confs = LayoutConfs {
            gw_offset: 1,
            km_offset: 4,
            offset: 3,
            ..LayoutConfs::default()
        };

        configure_store(&maps, temp.path(), &datasources(), &confs).unwrap();

        let out = fs::read_to_string(temp.path().join(maps.artifacts.api_manager)).unwrap();
        // 9443 + the key manager's offset, not the store's own
        let auth_manager = &out[out.find("<AuthManager>").unwrap()..out.find("</AuthManager>").unwrap()];
        assert!(auth_manager.contains("https://localhost:9447/services/"));
        assert!(!auth_manager.contains("https://localhost:9446/services/"));

        // the store's own offset lands in carbon.xml
        let carbon = fs::read_to_string(temp.path().join(maps.artifacts.carbon)).unwrap();
        assert!(carbon.contains("<Offset>3</Offset>"));
    }

    #[test]
    fn traffic_manager_substitutes_templates_before_mutating() {
        let temp = TempDir::new().unwrap();
        fixtures::write_pack(temp.path()).unwrap();
        let maps = SchemaMap::for_version(ProductVersion::V26);
        let confs = LayoutConfs {
            offset: 4,
            ..LayoutConfs::default()
        };

        configure_traffic_manager(&maps, temp.path(), &confs).unwrap();

        // the TM variants were renamed into place
        assert!(!temp.path().join(maps.artifacts.registry_tm).exists());
        assert!(!temp.path().join(maps.artifacts.axis2_tm).exists());
        let registry = fs::read_to_string(temp.path().join(maps.artifacts.registry)).unwrap();
        assert!(!registry.contains("enableCache"));

        // websocket senders were commented out of the substituted axis2
        let axis2 = fs::read_to_string(temp.path().join(maps.artifacts.axis2)).unwrap();
        assert!(!axis2.contains("<transportSender name=\"ws\""));
        assert!(axis2.contains("<transportSender name=\"http\""));

        let carbon = fs::read_to_string(temp.path().join(maps.artifacts.carbon)).unwrap();
        assert!(carbon.contains("<Offset>4</Offset>"));
    }

    #[test]
    fn publisher_points_store_url_at_store_offset() {
        let temp = TempDir::new().unwrap();
        fixtures::write_pack(temp.path()).unwrap();
        let maps = SchemaMap::for_version(ProductVersion::V26);
        let confs = LayoutConfs {
            offset: 2,
            store_offset: 3,
            tm_offset: 4,
            ..LayoutConfs::default()
        };

        configure_publisher(&maps, temp.path(), &datasources(), &confs).unwrap();

        let out = fs::read_to_string(temp.path().join(maps.artifacts.api_manager)).unwrap();
        assert!(out.contains("<URL>https://localhost:9446/store</URL>"));
        let jndi = fs::read_to_string(temp.path().join(maps.artifacts.jndi_properties)).unwrap();
        assert!(jndi.contains("brokerlist='tcp://localhost:5676'"));
    }

    #[test]
    fn all_five_roles_are_materialized() {
        let temp = TempDir::new().unwrap();
        let pack = temp.path().join("wso2am-2.6.0");
        fixtures::write_pack(&pack).unwrap();
        let maps = SchemaMap::for_version(ProductVersion::V26);

        configure_distributed(
            &maps,
            temp.path(),
            &datasources(),
            &DistributedConfs::default(),
        )
        .unwrap();

        let deployment = temp.path().join(DEPLOYMENT_DIR);
        for role in ROLES {
            assert!(deployment.join(role).is_dir(), "missing role dir {}", role);
        }

        // gateway at offset 0: carbon untouched
        let gw_carbon =
            fs::read_to_string(deployment.join("gateway").join(maps.artifacts.carbon)).unwrap();
        assert!(gw_carbon.contains("<Offset>0</Offset>"));
        // traffic manager at offset 4
        let tm_carbon = fs::read_to_string(
            deployment.join("traffic-manager").join(maps.artifacts.carbon),
        )
        .unwrap();
        assert!(tm_carbon.contains("<Offset>4</Offset>"));
    }
}
