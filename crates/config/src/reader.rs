// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration resolution from environment variables and JSON files.
//!
//! `DBAAS_SERVICE_HOST` switches the reader into env-authoritative mode
//! for the database topology; JSON files still contribute namespace
//! configurations in that mode. Without the env variable, the last
//! `database` block found in the scanned files wins, and plain defaults
//! apply when nothing configures the database at all.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use sdl_core::hostport::{AddressError, HostAndPort, DEFAULT_PORT};
use sdl_core::namespace::{disallowed_characters, is_valid_namespace_syntax};
use sdl_core::system::System;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error};

use crate::database::{DatabaseConfiguration, DbType};
use crate::namespaces::{NamespaceConfiguration, NamespaceConfigurations};

pub const DB_HOST_ENV_VAR: &str = "DBAAS_SERVICE_HOST";
pub const DB_PORT_ENV_VAR: &str = "DBAAS_SERVICE_PORT";
pub const SENTINEL_PORT_ENV_VAR: &str = "DBAAS_SERVICE_SENTINEL_PORT";
pub const SENTINEL_MASTER_NAME_ENV_VAR: &str = "DBAAS_MASTER_NAME";
pub const DB_CLUSTER_ADDR_LIST_ENV_VAR: &str = "DBAAS_CLUSTER_ADDR_LIST";

const DEFAULT_CONF_DIRECTORIES: &[&str] = &["/etc/shareddatalayer.d"];

/// Failure to resolve a usable configuration. Fatal at init time.
#[derive(Debug, Error)]
#[error("configuration error in {source_name}: {kind}")]
pub struct ConfigurationError {
    pub source_name: String,
    pub kind: ConfigurationErrorKind,
}

#[derive(Debug, Error)]
pub enum ConfigurationErrorKind {
    #[error("cannot read file: {0}")]
    UnreadableFile(String),

    #[error("malformed JSON: {0}")]
    MalformedJson(String),

    #[error("missing \"{0}\"")]
    MissingField(String),

    #[error("invalid \"{field}\": \"{value}\"")]
    InvalidField { field: String, value: String },

    #[error("unknown database type \"{0}\"")]
    UnknownDbType(String),

    #[error("invalid \"address\": {0}")]
    InvalidAddress(#[from] AddressError),

    #[error("\"namespacePrefix\": \"{prefix}\" contains some of these disallowed characters: {disallowed}")]
    InvalidNamespacePrefix { prefix: String, disallowed: &'static str },

    #[error("\"enableNotifications\" cannot be true, when \"useDbBackend\" is false")]
    NotificationsWithoutBackend,

    #[error("missing environment variable configuration")]
    MissingEnvironmentConfiguration,
}

impl ConfigurationError {
    fn new(source_name: &str, kind: ConfigurationErrorKind) -> Self {
        let err = Self { source_name: source_name.to_string(), kind };
        error!("{err}");
        err
    }
}

struct EnvConfiguration {
    host: String,
    port_list: Option<String>,
    sentinel_port_list: Option<String>,
    master_name_list: Option<String>,
    cluster_addr_list: Option<String>,
}

/// Gathers raw configuration from the environment and JSON sources;
/// [`ConfigurationReader::read_database_configuration`] and
/// [`ConfigurationReader::read_namespace_configurations`] then produce
/// fresh immutable containers.
pub struct ConfigurationReader {
    env: Option<EnvConfiguration>,
    json_database: Option<(Value, String)>,
    json_namespaces: BTreeMap<String, (Value, String)>,
}

impl ConfigurationReader {
    /// Resolve from the environment and the default configuration
    /// directories.
    pub fn new(system: &dyn System) -> Result<Self, ConfigurationError> {
        let directories: Vec<PathBuf> = DEFAULT_CONF_DIRECTORIES
            .iter()
            .map(|directory| PathBuf::from(*directory))
            .collect();
        Self::from_directories(system, &directories)
    }

    /// Resolve from the environment and the given directories, scanning
    /// each for `*.json` files in sorted order.
    pub fn from_directories(
        system: &dyn System,
        directories: &[PathBuf],
    ) -> Result<Self, ConfigurationError> {
        let mut reader = Self::from_env(system);
        for path in find_configuration_files(directories) {
            let source_name = path.display().to_string();
            let content = std::fs::read_to_string(&path).map_err(|err| {
                ConfigurationError::new(
                    &source_name,
                    ConfigurationErrorKind::UnreadableFile(err.to_string()),
                )
            })?;
            reader.apply_json(&content, &source_name)?;
        }
        Ok(reader)
    }

    /// Environment-only resolution; JSON sources can be layered on with
    /// [`ConfigurationReader::apply_json`].
    pub fn from_env(system: &dyn System) -> Self {
        let env = system.env_var(DB_HOST_ENV_VAR).map(|host| {
            debug!("database configuration taken from environment ({DB_HOST_ENV_VAR})");
            EnvConfiguration {
                host,
                port_list: system.env_var(DB_PORT_ENV_VAR),
                sentinel_port_list: system.env_var(SENTINEL_PORT_ENV_VAR),
                master_name_list: system.env_var(SENTINEL_MASTER_NAME_ENV_VAR),
                cluster_addr_list: system.env_var(DB_CLUSTER_ADDR_LIST_ENV_VAR),
            }
        });
        Self { env, json_database: None, json_namespaces: BTreeMap::new() }
    }

    /// Merge one JSON document into the raw configuration.
    ///
    /// The environment keeps precedence for the `database` block; a later
    /// document's `sharedDataLayer` entry replaces an earlier one with
    /// the same prefix.
    pub fn apply_json(
        &mut self,
        content: &str,
        source_name: &str,
    ) -> Result<(), ConfigurationError> {
        let document: Value = serde_json::from_str(content).map_err(|err| {
            ConfigurationError::new(
                source_name,
                ConfigurationErrorKind::MalformedJson(err.to_string()),
            )
        })?;

        if self.env.is_none() {
            if let Some(database) = document.get("database") {
                self.json_database = Some((database.clone(), source_name.to_string()));
            }
        }

        if let Some(namespaces) = document.get("sharedDataLayer") {
            let entries = namespaces.as_array().ok_or_else(|| {
                ConfigurationError::new(
                    source_name,
                    ConfigurationErrorKind::InvalidField {
                        field: "sharedDataLayer".to_string(),
                        value: namespaces.to_string(),
                    },
                )
            })?;
            for entry in entries {
                let prefix = get_string(entry, "namespacePrefix", source_name)?;
                self.json_namespaces
                    .insert(prefix, (entry.clone(), source_name.to_string()));
            }
        }
        Ok(())
    }

    /// Produce the immutable database topology.
    pub fn read_database_configuration(
        &self,
    ) -> Result<DatabaseConfiguration, ConfigurationError> {
        match (&self.env, &self.json_database) {
            (Some(env), _) => read_env_database_configuration(env),
            (None, Some((value, source_name))) => {
                read_json_database_configuration(value, source_name)
            }
            (None, None) => {
                debug!("no database configuration found, using defaults");
                Ok(DatabaseConfiguration::new(
                    DbType::Standalone,
                    DatabaseConfiguration::default_server_addresses(),
                ))
            }
        }
    }

    /// Produce the namespace feature table (always containing the
    /// built-in default entry).
    pub fn read_namespace_configurations(
        &self,
    ) -> Result<NamespaceConfigurations, ConfigurationError> {
        let mut configurations = NamespaceConfigurations::new();
        for (prefix, (value, source_name)) in &self.json_namespaces {
            let use_db_backend = get_bool(value, "useDbBackend", source_name)?;
            let enable_notifications = get_bool(value, "enableNotifications", source_name)?;

            if !is_valid_namespace_syntax(prefix) {
                return Err(ConfigurationError::new(
                    source_name,
                    ConfigurationErrorKind::InvalidNamespacePrefix {
                        prefix: prefix.clone(),
                        disallowed: disallowed_characters(),
                    },
                ));
            }
            if enable_notifications && !use_db_backend {
                return Err(ConfigurationError::new(
                    source_name,
                    ConfigurationErrorKind::NotificationsWithoutBackend,
                ));
            }

            configurations.add(NamespaceConfiguration {
                namespace_prefix: prefix.clone(),
                use_db_backend,
                enable_notifications,
                source_name: source_name.clone(),
            });
        }
        Ok(configurations)
    }
}

fn read_env_database_configuration(
    env: &EnvConfiguration,
) -> Result<DatabaseConfiguration, ConfigurationError> {
    let has_host = !env.host.is_empty();
    let has_sentinel = env.sentinel_port_list.as_deref().is_some_and(|s| !s.is_empty());
    let has_cluster_list = env.cluster_addr_list.as_deref().is_some_and(|s| !s.is_empty());

    let (db_type, host_list) = match (has_host, has_sentinel, has_cluster_list) {
        (true, false, false) => (DbType::Standalone, env.host.as_str()),
        (true, true, false) => (DbType::Sentinel, env.host.as_str()),
        (_, false, true) => {
            (DbType::StandaloneCluster, env.cluster_addr_list.as_deref().unwrap_or(""))
        }
        (_, true, true) => {
            (DbType::SentinelCluster, env.cluster_addr_list.as_deref().unwrap_or(""))
        }
        _ => {
            return Err(ConfigurationError::new(
                DB_HOST_ENV_VAR,
                ConfigurationErrorKind::MissingEnvironmentConfiguration,
            ))
        }
    };

    let addresses = zip_hosts_with_ports(host_list, env.port_list.as_deref())?;
    let mut configuration = DatabaseConfiguration::new(db_type, addresses);

    if db_type.uses_sentinel() {
        let ports = parse_sentinel_ports(env.sentinel_port_list.as_deref().unwrap_or(""));
        let names = env
            .master_name_list
            .as_deref()
            .map(|names| names.split(',').map(str::to_string).collect())
            .unwrap_or_default();
        configuration = configuration.with_sentinels(ports, names);
    }
    Ok(configuration)
}

/// Pair the i-th host with the i-th configured port; hosts beyond the
/// port list get the default backend port.
fn zip_hosts_with_ports(
    host_list: &str,
    port_list: Option<&str>,
) -> Result<Vec<HostAndPort>, ConfigurationError> {
    let ports: Vec<&str> = port_list
        .map(|list| list.split(',').collect())
        .unwrap_or_default();
    let mut addresses = Vec::new();
    for (index, host) in host_list.split(',').enumerate() {
        let default_port = match ports.get(index) {
            Some(port) => port.parse::<u16>().map_err(|_| {
                ConfigurationError::new(
                    DB_PORT_ENV_VAR,
                    ConfigurationErrorKind::InvalidField {
                        field: DB_PORT_ENV_VAR.to_string(),
                        value: (*port).to_string(),
                    },
                )
            })?,
            None => DEFAULT_PORT,
        };
        let address = HostAndPort::parse(host, default_port)
            .map_err(|err| ConfigurationError::new(DB_HOST_ENV_VAR, err.into()))?;
        addresses.push(address);
    }
    Ok(addresses)
}

/// Un-parseable entries are skipped; defaults fill in at lookup time.
fn parse_sentinel_ports(port_list: &str) -> Vec<u16> {
    port_list
        .split(',')
        .filter_map(|port| port.parse::<u16>().ok())
        .collect()
}

fn read_json_database_configuration(
    value: &Value,
    source_name: &str,
) -> Result<DatabaseConfiguration, ConfigurationError> {
    let type_string = get_string(value, "type", source_name)?;
    let db_type = DbType::parse(&type_string).ok_or_else(|| {
        ConfigurationError::new(
            source_name,
            ConfigurationErrorKind::UnknownDbType(type_string.clone()),
        )
    })?;

    let servers = value
        .get("servers")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            ConfigurationError::new(
                source_name,
                ConfigurationErrorKind::MissingField("servers".to_string()),
            )
        })?;

    let mut addresses = Vec::new();
    for server in servers {
        let address = get_string(server, "address", source_name)?;
        let parsed = HostAndPort::parse(&address, DEFAULT_PORT)
            .map_err(|err| ConfigurationError::new(source_name, err.into()))?;
        addresses.push(parsed);
    }
    Ok(DatabaseConfiguration::new(db_type, addresses))
}

fn get_string(value: &Value, field: &str, source_name: &str) -> Result<String, ConfigurationError> {
    let present = value.get(field).ok_or_else(|| {
        ConfigurationError::new(
            source_name,
            ConfigurationErrorKind::MissingField(field.to_string()),
        )
    })?;
    present.as_str().map(str::to_string).ok_or_else(|| {
        ConfigurationError::new(
            source_name,
            ConfigurationErrorKind::InvalidField {
                field: field.to_string(),
                value: present.to_string(),
            },
        )
    })
}

fn get_bool(value: &Value, field: &str, source_name: &str) -> Result<bool, ConfigurationError> {
    let present = value.get(field).ok_or_else(|| {
        ConfigurationError::new(
            source_name,
            ConfigurationErrorKind::MissingField(field.to_string()),
        )
    })?;
    present.as_bool().ok_or_else(|| {
        ConfigurationError::new(
            source_name,
            ConfigurationErrorKind::InvalidField {
                field: field.to_string(),
                value: present.to_string(),
            },
        )
    })
}

/// All `*.json` files under the given directories, sorted within each
/// directory. Missing directories are skipped.
fn find_configuration_files(directories: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for directory in directories {
        files.extend(list_json_files(directory));
    }
    files
}

fn list_json_files(directory: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(directory) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();
    files
}

#[cfg(test)]
#[path = "reader_tests.rs"]
mod tests;
