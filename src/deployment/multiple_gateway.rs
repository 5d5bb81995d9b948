//! Publish-through-multiple-gateway layout.
//!
//! Node 0 is the all-in-one pack carrying every gateway environment
//! entry; nodes 1..=N are plain gateway packs pointed back at it, each
//! on its own port offset. Environments are added one call at a time,
//! sequentially — every call is a read-modify-write of the same
//! document, so interleaving them would lose entries.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use super::{copy_pack, find_server_pack, step, DEPLOYMENT_DIR};
use crate::artifact::{api_manager, carbon};
use crate::confs::{EnvironmentConfs, LayoutConfs};
use crate::maps::SchemaMap;

/// Node 0's directory name.
pub const GATEWAY_AIO: &str = "gateway_aio";

/// Prefix for the numbered gateway nodes (`gateway_1`, `gateway_2`, ...).
pub const GATEWAY_NODE_PREFIX: &str = "gateway_";

/// Configure one plain gateway node: point key validation back at the
/// AIO node (base ports) and move this node onto its own offset.
pub fn configure_gateway(maps: &SchemaMap, working_dir: &Path, confs: &LayoutConfs) -> Result<()> {
    debug!("configuring gateway node");
    step(
        "alter AuthManager server URL",
        api_manager::alter_auth_manager_server_url(maps, confs, working_dir, 0),
    );
    step(
        "alter APIKeyValidator server URL",
        api_manager::alter_api_key_validator_server_url(maps, confs, working_dir, 0),
    );
    step(
        "alter thrift client port",
        api_manager::alter_api_key_validator_thrift_client_port(maps, confs, working_dir),
    );
    step(
        "alter thrift server flag",
        api_manager::alter_api_key_validator_enable_thrift_server(maps, confs, working_dir),
    );
    step(
        "alter revoke API URL",
        api_manager::alter_oauth_revoke_api_url(maps, confs, working_dir, 0),
    );
    step(
        "configure port offset",
        carbon::configure_port_offset(maps, working_dir, confs.offset),
    );
    Ok(())
}

/// Configure the all-in-one node: one environment entry per gateway.
pub fn configure_gateway_aio(
    maps: &SchemaMap,
    working_dir: &Path,
    environments: &[EnvironmentConfs],
) -> Result<()> {
    debug!("configuring all-in-one node");
    for env in environments {
        step(
            &format!("add gateway environment '{}'", env.name),
            api_manager::add_gateway_environment(maps, env, working_dir),
        );
    }
    Ok(())
}

/// Materialize and configure the whole layout.
///
/// Copies the template pack once per node under `deployment/`; each
/// node's copy completes before its configuration begins, and the loop
/// halts at the first failed node. Gateway node `k` runs at offset
/// `confs.offset + k`.
pub fn configure_publish_multiple_gateway(
    maps: &SchemaMap,
    working_dir: &Path,
    gw_count: u16,
    environments: &[EnvironmentConfs],
    confs: &LayoutConfs,
) -> Result<()> {
    let pack = find_server_pack(working_dir, "wso2am")?;
    let deployment = working_dir.join(DEPLOYMENT_DIR);
    fs::create_dir(&deployment)
        .with_context(|| format!("creating deployment directory '{}'", deployment.display()))?;

    info!(pack = %pack.display(), gw_count, "laying out multiple-gateway deployment");

    let aio_dir = deployment.join(GATEWAY_AIO);
    copy_pack(&pack, &aio_dir)?;
    configure_gateway_aio(maps, &aio_dir, environments)?;

    for node in 1..=gw_count {
        let node_dir = deployment.join(format!("{}{}", GATEWAY_NODE_PREFIX, node));
        copy_pack(&pack, &node_dir)?;
        let node_confs = LayoutConfs {
            offset: confs.offset + node,
            ..confs.clone()
        };
        configure_gateway(maps, &node_dir, &node_confs)?;
    }
    Ok(())
}
