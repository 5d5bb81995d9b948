//! Typed configuration records consumed by the mutation functions.
//!
//! These are the de facto schema of the JSON deployment config: a flat
//! [`LayoutConfs`] record per node role, gateway [`EnvironmentConfs`]
//! entries, and the AM/UM/REG [`DatasourceConfs`] triple. The records are
//! constructed by the caller (or loaded from disk), validated upstream,
//! and never mutated by the engine.
//!
//! Boolean feature flags are deliberately string literals (`"true"` /
//! `"false"`) because they are written into the documents verbatim.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Flat per-node-role layout parameters.
///
/// Offsets cross-reference other roles: a store's auth-manager URL points
/// at the key-manager's offset, a publisher's API store URL at the
/// store's, and so on. `Default` mirrors the documented role defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LayoutConfs {
    /// Scheme-qualified hostname, e.g. `https://localhost`.
    pub hostname: String,
    /// TCP endpoint hostname, e.g. `tcp://localhost`.
    pub tcp_hostname: String,
    /// SSL endpoint hostname, e.g. `ssl://localhost`.
    pub ssl_hostname: String,
    pub thrift_client_port: String,
    pub enable_thrift_server: String,
    pub key_validator_client_type: String,
    pub enable_data_publisher: String,
    pub enable_policy_deployer: String,
    pub enable_block_condition: String,
    pub enable_jms_connection_details: String,
    pub display_url: String,
    /// Opaque broker query suffix appended after the port inside the
    /// topic-connection-factory brokerlist, e.g. `?retries='5'%26connectdelay='50'`.
    pub topic_connection_factory_query: String,
    /// This node's own port offset.
    pub offset: u16,
    pub gw_offset: u16,
    pub km_offset: u16,
    pub store_offset: u16,
    pub tm_offset: u16,
    pub iskm_offset: u16,
}

impl Default for LayoutConfs {
    fn default() -> Self {
        LayoutConfs {
            hostname: "https://localhost".to_string(),
            tcp_hostname: "tcp://localhost".to_string(),
            ssl_hostname: "ssl://localhost".to_string(),
            thrift_client_port: "10397".to_string(),
            enable_thrift_server: "false".to_string(),
            key_validator_client_type: "WSClient".to_string(),
            enable_data_publisher: "false".to_string(),
            enable_policy_deployer: "false".to_string(),
            enable_block_condition: "false".to_string(),
            enable_jms_connection_details: "false".to_string(),
            display_url: "true".to_string(),
            topic_connection_factory_query: String::new(),
            offset: 0,
            gw_offset: 0,
            km_offset: 1,
            store_offset: 3,
            tm_offset: 4,
            iskm_offset: 1,
        }
    }
}

/// One gateway environment entry for the AIO node.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EnvironmentConfs {
    #[serde(rename = "type")]
    pub env_type: String,
    pub api_console: bool,
    pub name: String,
    pub description: String,
    /// Bare hostname (no scheme); endpoint URLs add their own schemes.
    pub hostname: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub offset: u16,
}

impl Default for EnvironmentConfs {
    fn default() -> Self {
        EnvironmentConfs {
            env_type: "production".to_string(),
            api_console: true,
            name: "Production and Sandbox".to_string(),
            description: "This is a hybrid gateway that handles both production and sandbox token traffic.".to_string(),
            hostname: "localhost".to_string(),
            username: None,
            password: None,
            offset: 0,
        }
    }
}

impl EnvironmentConfs {
    /// Credentials fall back to `admin`/`admin` when unset.
    pub fn username(&self) -> &str {
        self.username.as_deref().unwrap_or("admin")
    }

    pub fn password(&self) -> &str {
        self.password.as_deref().unwrap_or("admin")
    }
}

/// One relational datasource definition.
///
/// Pool-tuning fields stay strings: they are written into the documents
/// verbatim, and the product accepts only their literal spellings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatasourceConfs {
    pub name: String,
    pub description: String,
    pub jndi_name: String,
    pub connection_url: String,
    pub driver: String,
    pub username: String,
    pub password: String,
    pub max_active: String,
    pub max_wait: String,
    pub min_idle: String,
    pub test_on_borrow: String,
    pub validation_query: String,
    pub validation_interval: String,
    pub default_auto_commit: String,
    /// Database vendor discriminator (`mysql`, `postgre`, `mssql`, `oracle`).
    pub ds_type: String,
}

impl Default for DatasourceConfs {
    fn default() -> Self {
        DatasourceConfs {
            name: "WSO2AM_DB".to_string(),
            description: "The datasource used for API Manager database".to_string(),
            jndi_name: "jdbc/WSO2AM_DB".to_string(),
            connection_url: "jdbc:mysql://localhost:3306/apimgtdb?autoReconnect=true".to_string(),
            driver: "com.mysql.jdbc.Driver".to_string(),
            username: "root".to_string(),
            password: "root".to_string(),
            max_active: "80".to_string(),
            max_wait: "60000".to_string(),
            min_idle: "5".to_string(),
            test_on_borrow: "true".to_string(),
            validation_query: "SELECT 1".to_string(),
            validation_interval: "30000".to_string(),
            default_auto_commit: "false".to_string(),
            ds_type: "mysql".to_string(),
        }
    }
}

/// The AM/UM/REG datasource triple a database-backed node role needs.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatasourceSet {
    pub am: DatasourceConfs,
    pub um: DatasourceConfs,
    pub reg: DatasourceConfs,
}

/// Everything a layout recipe consumes, bundled for file-based loading.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeploymentConfs {
    pub layout: LayoutConfs,
    pub environments: Vec<EnvironmentConfs>,
    pub datasources: Option<DatasourceSet>,
}

/// Load a deployment config from disk, JSON by default, TOML by
/// extension.
pub fn load_deployment_confs(path: &Path) -> Result<DeploymentConfs> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading deployment config '{}'", path.display()))?;
    let is_toml = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("toml"))
        .unwrap_or(false);
    let confs: DeploymentConfs = if is_toml {
        toml::from_str(&raw)
            .with_context(|| format!("parsing deployment config '{}'", path.display()))?
    } else {
        serde_json::from_str(&raw)
            .with_context(|| format!("parsing deployment config '{}'", path.display()))?
    };
    Ok(confs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_defaults_match_documented_role_defaults() {
        let confs = LayoutConfs::default();
        assert_eq!(confs.hostname, "https://localhost");
        assert_eq!(confs.enable_thrift_server, "false");
        assert_eq!(confs.km_offset, 1);
        assert_eq!(confs.tm_offset, 4);
    }

    #[test]
    fn environment_credentials_default_to_admin() {
        let confs = EnvironmentConfs::default();
        assert_eq!(confs.username(), "admin");
        assert_eq!(confs.password(), "admin");

        let confs = EnvironmentConfs {
            username: Some("ops".to_string()),
            ..EnvironmentConfs::default()
        };
        assert_eq!(confs.username(), "ops");
        assert_eq!(confs.password(), "admin");
    }

    #[test]
    fn deployment_confs_parse_from_json() {
        let raw = r#"{
            "layout": { "hostname": "https://gw.example.com", "offset": 2 },
            "environments": [
                { "type": "production", "name": "Production one", "hostname": "gw.example.com", "offset": 1 }
            ],
            "datasources": {
                "am": { "name": "WSO2AM_DB" },
                "um": { "name": "WSO2UM_DB", "jndi_name": "jdbc/WSO2UM_DB" },
                "reg": { "name": "WSO2REG_DB", "jndi_name": "jdbc/WSO2REG_DB" }
            }
        }"#;
        let confs: DeploymentConfs = serde_json::from_str(raw).unwrap();
        assert_eq!(confs.layout.hostname, "https://gw.example.com");
        assert_eq!(confs.layout.km_offset, 1);
        assert_eq!(confs.environments.len(), 1);
        assert_eq!(confs.environments[0].env_type, "production");
        let ds = confs.datasources.unwrap();
        assert_eq!(ds.reg.jndi_name, "jdbc/WSO2REG_DB");
    }

    #[test]
    fn deployment_confs_load_from_toml_by_extension() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("deployment-confs.toml");
        fs::write(
            &path,
            "[layout]\nhostname = \"https://gw.example.com\"\noffset = 2\n",
        )
        .unwrap();

        let confs = load_deployment_confs(&path).unwrap();
        assert_eq!(confs.layout.hostname, "https://gw.example.com");
        assert_eq!(confs.layout.offset, 2);
        assert!(confs.environments.is_empty());
    }

    #[test]
    fn unknown_config_keys_are_rejected() {
        let raw = r#"{ "layout": { "hostnme": "typo" } }"#;
        assert!(serde_json::from_str::<DeploymentConfs>(raw).is_err());
    }
}
