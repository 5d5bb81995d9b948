//! Realm configuration in `user-mgt.xml` / `deployment.toml`.

use anyhow::Result;
use std::path::Path;
use toml_edit::value;
use tracing::debug;
use xmltree::{Element, XMLNode};

use crate::maps::{jndi, ProductVersion, SchemaMap};
use crate::parser::toml::parse_toml;
use crate::parser::{attr_text_element, mutate, parse_xml, Encoding};

const JDBC_USER_STORE_CLASS: &str = "org.wso2.carbon.user.core.jdbc.JDBCUserStoreManager";

/// The fixed JDBC user-store bundle.
///
/// A constant template: regex policies, digest settings and cache
/// toggles are hardcoded product defaults, not configuration.
pub fn construct_jdbc_user_store() -> Element {
    debug!("constructing JDBC user store");
    let mut store = Element::new("UserStoreManager");
    store
        .attributes
        .insert("class".to_string(), JDBC_USER_STORE_CLASS.to_string());

    let properties: [(&str, &str); 22] = [
        ("TenantManager", "org.wso2.carbon.user.core.tenant.JDBCTenantManager"),
        ("ReadOnly", "false"),
        ("ReadGroups", "true"),
        ("WriteGroups", "true"),
        ("UsernameJavaRegEx", "^[\\S]{3,30}$"),
        ("UsernameJavaScriptRegEx", "^[\\S]{3,30}$"),
        ("UsernameJavaRegExViolationErrorMsg", "Username pattern policy violated"),
        ("PasswordJavaRegEx", "^[\\S]{5,30}$"),
        ("PasswordJavaScriptRegEx", "^[\\S]{5,30}$"),
        (
            "PasswordJavaRegExViolationErrorMsg",
            "Password length should be within 5 to 30 characters",
        ),
        ("RolenameJavaRegEx", "^[\\S]{3,30}$"),
        ("RolenameJavaScriptRegEx", "^[\\S]{3,30}$"),
        ("CaseInsensitiveUsername", "false"),
        ("SCIMEnabled", "false"),
        ("IsBulkImportSupported", "false"),
        ("PasswordDigest", "SHA-256"),
        ("StoreSaltedPassword", "true"),
        ("MultiAttributeSeparator", ","),
        ("MaxUserNameListLength", "100"),
        ("MaxRoleNameListLength", "100"),
        ("UserRolesCacheEnabled", "true"),
        ("UserNameUniqueAcrossTenants", "false"),
    ];
    for (name, text) in properties {
        store.children.push(XMLNode::Element(attr_text_element(
            "Property",
            &[("name", name)],
            text,
        )));
    }
    store
}

/// Swap the realm datasource, optionally converting the read-write LDAP
/// user store into the JDBC one.
///
/// With `convert_ldap_to_jdbc` unset the LDAP `UserStoreManager` element
/// is left exactly as it stands.
pub fn alter_user_management(
    maps: &SchemaMap,
    convert_ldap_to_jdbc: bool,
    working_dir: &Path,
) -> Result<()> {
    debug!(convert_ldap_to_jdbc, "altering user-management");
    match maps.version {
        ProductVersion::V26 => {
            let path = working_dir.join(maps.artifacts.user_management);
            let mut doc = parse_xml(&path)?;
            mutate::replace_value(
                &mut doc,
                maps.xml.usermgt_realm_datasource_property,
                jndi::WSO2UM_DB,
                "datasource changed",
            )?;
            if convert_ldap_to_jdbc {
                debug!("converting LDAP user store to JDBC");
                let store = construct_jdbc_user_store();
                mutate::replace_element(
                    &mut doc,
                    maps.xml.usermgt_ldap_userstoremanager,
                    store,
                    "user store manager changed to jdbc",
                )?;
            }
            doc.write(&path, Encoding::Utf8)
        }
        ProductVersion::V31 => {
            let path = working_dir.join(maps.artifacts.deployment_toml);
            let mut doc = parse_toml(&path)?;
            doc.merge_value(
                maps.toml.realm_datasource,
                value("WSO2USER_DB"),
                "datasource changed",
            )?;
            doc.write()
        }
    }
}
