//! The sample configuration type the CLI operates on.

use layerconf_core::{config_fields, RuleBasedValidator};
use serde::{Deserialize, Serialize};

/// Server section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: None,
            port: Some(default_port()),
        }
    }
}

/// Application settings, layered from one or more files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_string: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<ServerSettings>,
}

fn default_name() -> String {
    "Timothy".into()
}

fn default_connection_string() -> String {
    "localhost".into()
}

fn default_port() -> u16 {
    8080
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            name: Some(default_name()),
            age: None,
            connection_string: Some(default_connection_string()),
            server: Some(ServerSettings::default()),
        }
    }
}

config_fields!(ServerSettings { host, port });
config_fields!(Settings { name, age, connection_string, server as nested });

/// Checks applied when loading and before saving.
pub fn validator() -> RuleBasedValidator<Settings> {
    RuleBasedValidator::new().rule("server_port_nonzero", |s: &Settings| {
        s.server.as_ref().and_then(|server| server.port) != Some(0)
    })
}
