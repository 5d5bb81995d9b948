//! Versioned schema tables for the supported product generations.
//!
//! Everything the mutation functions need to address a configuration
//! artifact lives here: well-known base ports, fixed relative artifact
//! paths, XML path queries and deployment.toml dotted keys. The whole
//! table is one immutable [`SchemaMap`] value constructed per product
//! version and passed by reference into every component, so two schema
//! versions can be exercised side by side in the same process.

use std::fmt;
use std::str::FromStr;

use anyhow::bail;

/// Product generations this tool knows how to configure.
///
/// `V26` carries the XML artifact set; `V31` consolidates most
/// configuration into `repository/conf/deployment.toml`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductVersion {
    /// 2.6.x — XML artifacts only.
    V26,
    /// 3.1.x — deployment.toml plus the remaining XML artifacts.
    V31,
}

impl FromStr for ProductVersion {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "2.6" => Ok(ProductVersion::V26),
            "3.1" => Ok(ProductVersion::V31),
            other => bail!("unsupported product version '{}' (expected '2.6' or '3.1')", other),
        }
    }
}

impl fmt::Display for ProductVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProductVersion::V26 => write!(f, "2.6"),
            ProductVersion::V31 => write!(f, "3.1"),
        }
    }
}

/// Well-known base ports shifted by per-node offsets.
#[derive(Debug, Clone, Copy)]
pub struct Ports {
    /// HTTPS servlet transport (management console, services).
    pub https_servlet: u16,
    /// HTTP NIO gateway transport.
    pub http_nio: u16,
    /// HTTPS NIO gateway transport.
    pub https_nio: u16,
    /// AMQP messaging (message broker).
    pub amqp: u16,
    /// Thrift key-validation client.
    pub thrift_client: u16,
    /// Binary throttling event receiver.
    pub binary_receiver: u16,
    /// Binary throttling auth endpoint.
    pub binary_auth: u16,
    /// WebSocket gateway transport.
    pub ws: u16,
    /// Secure WebSocket gateway transport.
    pub wss: u16,
}

const PORTS: Ports = Ports {
    https_servlet: 9443,
    http_nio: 8280,
    https_nio: 8243,
    amqp: 5672,
    thrift_client: 10397,
    binary_receiver: 9611,
    binary_auth: 9711,
    ws: 9099,
    wss: 8099,
};

/// Fixed relative paths of the configuration artifacts under a pack root.
#[derive(Debug, Clone, Copy)]
pub struct ArtifactPaths {
    pub api_manager: &'static str,
    pub carbon: &'static str,
    pub deployment_toml: &'static str,
    pub identity: &'static str,
    pub jndi_properties: &'static str,
    pub master_datasource: &'static str,
    pub registry: &'static str,
    pub registry_tm: &'static str,
    pub axis2: &'static str,
    pub axis2_tm: &'static str,
    pub user_management: &'static str,
}

const ARTIFACT_PATHS: ArtifactPaths = ArtifactPaths {
    api_manager: "repository/conf/api-manager.xml",
    carbon: "repository/conf/carbon.xml",
    deployment_toml: "repository/conf/deployment.toml",
    identity: "repository/conf/identity/identity.xml",
    jndi_properties: "repository/conf/jndi.properties",
    master_datasource: "repository/conf/datasources/master-datasources.xml",
    registry: "repository/conf/registry.xml",
    registry_tm: "repository/conf/registry_TM.xml",
    axis2: "repository/conf/axis2/axis2.xml",
    axis2_tm: "repository/conf/axis2/axis2_TM.xml",
    user_management: "repository/conf/user-mgt.xml",
};

/// XML path queries, namespace-agnostic (see [`crate::parser::query`]).
#[derive(Debug, Clone, Copy)]
pub struct XmlPaths {
    pub authmanager_serverurl: &'static str,
    pub apikeyvalidator_serverurl: &'static str,
    pub apikeyvalidator_keyvalidatorclienttype: &'static str,
    pub apikeyvalidator_enablethriftserver: &'static str,
    pub apikeyvalidator_thriftclientconnectiontimeout: &'static str,
    pub oauthconfigurations_revokeapiurl: &'static str,
    pub apigateway_environments: &'static str,
    pub apigateway_environment_serverurl: &'static str,
    pub apigateway_environment_gatewayendpoint: &'static str,
    pub apistore_displayurl: &'static str,
    pub apistore_url: &'static str,
    pub throttling_datapublisher_enabled: &'static str,
    pub throttling_policydeployer_enabled: &'static str,
    pub throttling_policydeployer_serviceurl: &'static str,
    pub throttling_blockcondition_enabled: &'static str,
    pub throttling_jmsconnectiondetails_enabled: &'static str,
    pub throttling_jms_topicconnectionfactory: &'static str,
    pub trafficmanager_receiverurlgroup: &'static str,
    pub trafficmanager_authurlgroup: &'static str,
    pub carbon_ports_offset: &'static str,
    pub identity_datasource_name: &'static str,
    pub datasources_datasource: &'static str,
    pub datasources_datasource_am: &'static str,
    pub datasources_datasource_um: &'static str,
    pub registry_dbconfig_wso2registry: &'static str,
    pub registry_dbconfig_second: &'static str,
    pub registry_remoteinstance: &'static str,
    pub registry_mount: &'static str,
    pub usermgt_realm_datasource_property: &'static str,
    pub usermgt_ldap_userstoremanager: &'static str,
    pub axis2_ws_transportsender: &'static str,
    pub axis2_wss_transportsender: &'static str,
}

const XML_PATHS: XmlPaths = XmlPaths {
    authmanager_serverurl: "AuthManager/ServerURL",
    apikeyvalidator_serverurl: "APIKeyValidator/ServerURL",
    apikeyvalidator_keyvalidatorclienttype: "APIKeyValidator/KeyValidatorClientType",
    apikeyvalidator_enablethriftserver: "APIKeyValidator/EnableThriftServer",
    apikeyvalidator_thriftclientconnectiontimeout: "APIKeyValidator/ThriftClientConnectionTimeOut",
    oauthconfigurations_revokeapiurl: "OAuthConfigurations/RevokeAPIURL",
    apigateway_environments: "APIGateway/Environments",
    apigateway_environment_serverurl: "APIGateway/Environments/Environment/ServerURL",
    apigateway_environment_gatewayendpoint: "APIGateway/Environments/Environment/GatewayEndpoint",
    apistore_displayurl: "APIStore/DisplayURL",
    apistore_url: "APIStore/URL",
    throttling_datapublisher_enabled: "ThrottlingConfigurations/DataPublisher/Enabled",
    throttling_policydeployer_enabled: "ThrottlingConfigurations/PolicyDeployer/Enabled",
    throttling_policydeployer_serviceurl: "ThrottlingConfigurations/PolicyDeployer/ServiceURL",
    throttling_blockcondition_enabled: "ThrottlingConfigurations/BlockCondition/Enabled",
    throttling_jmsconnectiondetails_enabled: "ThrottlingConfigurations/JMSConnectionDetails/Enabled",
    throttling_jms_topicconnectionfactory:
        "JMSConnectionParameters/connectionfactory.TopicConnectionFactory",
    trafficmanager_receiverurlgroup: "TrafficManager/ReceiverUrlGroup",
    trafficmanager_authurlgroup: "TrafficManager/AuthUrlGroup",
    carbon_ports_offset: "Ports/Offset",
    identity_datasource_name: "JDBCPersistenceManager/DataSource/Name",
    datasources_datasource: "datasources/datasource",
    datasources_datasource_am: "datasources/datasource[name=\"WSO2AM_DB\"]",
    datasources_datasource_um: "datasources/datasource[name=\"WSO2UM_DB\"]",
    registry_dbconfig_wso2registry: "dbConfig[@name=\"wso2registry\"]",
    registry_dbconfig_second: "dbConfig[2]",
    registry_remoteinstance: "remoteInstance",
    registry_mount: "mount",
    usermgt_realm_datasource_property: "Realm/Configuration/Property[@name=\"dataSource\"]",
    usermgt_ldap_userstoremanager:
        "Realm/UserStoreManager[@class=\"org.wso2.carbon.user.core.ldap.ReadWriteLDAPUserStoreManager\"]",
    axis2_ws_transportsender: "transportSender[@name=\"ws\"]",
    axis2_wss_transportsender: "transportSender[@name=\"wss\"]",
};

/// Dotted keys into `deployment.toml` for the newer product generation.
#[derive(Debug, Clone, Copy)]
pub struct TomlKeys {
    pub am_db: &'static str,
    pub um_db: &'static str,
    pub shared_db: &'static str,
    pub server_offset: &'static str,
    pub realm_datasource: &'static str,
    /// Array-of-tables key; environments are appended, never replaced.
    pub gateway_environment: &'static str,
}

const TOML_KEYS: TomlKeys = TomlKeys {
    am_db: "database.apim_db",
    um_db: "database.user",
    shared_db: "database.shared_db",
    server_offset: "server.offset",
    realm_datasource: "realm_manager.data_source",
    gateway_environment: "apim.gateway.environment",
};

/// Fixed JNDI names referenced across artifacts.
pub mod jndi {
    pub const WSO2AM_DB: &str = "jdbc/WSO2AM_DB";
    pub const WSO2UM_DB: &str = "jdbc/WSO2UM_DB";
    pub const WSO2REG_DB: &str = "jdbc/WSO2REG_DB";
    pub const WSO2CARBON_DB: &str = "jdbc/WSO2CarbonDB";
}

/// The complete addressing table for one product version.
///
/// Construct with [`SchemaMap::for_version`] and pass by reference; the
/// value is cheap to copy and never mutated after construction.
#[derive(Debug, Clone, Copy)]
pub struct SchemaMap {
    pub version: ProductVersion,
    pub ports: Ports,
    pub artifacts: ArtifactPaths,
    pub xml: XmlPaths,
    pub toml: TomlKeys,
}

impl SchemaMap {
    pub fn for_version(version: ProductVersion) -> Self {
        SchemaMap {
            version,
            ports: PORTS,
            artifacts: ARTIFACT_PATHS,
            xml: XML_PATHS,
            toml: TOML_KEYS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_parses_known_strings() {
        assert_eq!("2.6".parse::<ProductVersion>().unwrap(), ProductVersion::V26);
        assert_eq!("3.1".parse::<ProductVersion>().unwrap(), ProductVersion::V31);
        assert_eq!(ProductVersion::V31.to_string(), "3.1");
    }

    #[test]
    fn version_rejects_unknown_strings() {
        assert!("4.0".parse::<ProductVersion>().is_err());
        assert!("".parse::<ProductVersion>().is_err());
    }

    #[test]
    fn maps_share_port_table_across_versions() {
        let v26 = SchemaMap::for_version(ProductVersion::V26);
        let v31 = SchemaMap::for_version(ProductVersion::V31);
        assert_eq!(v26.ports.https_servlet, 9443);
        assert_eq!(v31.ports.https_servlet, 9443);
        assert_eq!(v26.artifacts.carbon, "repository/conf/carbon.xml");
    }
}
