use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::data::Attributes;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateType {
    Soft,
    #[default]
    Hard,
}

impl StateType {
    pub fn as_i64(&self) -> i64 {
        match self {
            StateType::Soft => 0,
            StateType::Hard => 1,
        }
    }
}

/// Check result state shared by hosts and services
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckStatus {
    pub state: i64,
    pub state_type: StateType,
    pub has_been_checked: bool,
    pub current_attempt: i64,
    pub max_check_attempts: i64,
    pub last_check: Option<DateTime<Utc>>,
    pub next_check: Option<DateTime<Utc>>,
    pub last_state_change: Option<DateTime<Utc>>,
    pub latency: f64,
    pub execution_time: f64,
    pub plugin_output: String,
    pub long_plugin_output: String,
    pub perf_data: String,
    pub acknowledged: bool,
    pub scheduled_downtime_depth: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Host {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub alias: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub contacts: Vec<String>,
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default)]
    pub attributes: Attributes,
    /// Opaque inventory document attached by the core
    #[serde(default)]
    pub inventory: Vec<u8>,
    #[serde(flatten)]
    pub check: CheckStatus,
    /// Descriptions of the services on this host, filled in when the graph is built
    #[serde(skip)]
    pub services: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Service {
    pub host: Arc<Host>,
    pub description: String,
    pub display_name: String,
    pub contacts: Vec<String>,
    pub groups: Vec<String>,
    pub attributes: Attributes,
    pub check: CheckStatus,
}

/// A service as it appears in a snapshot, naming its host instead of linking it
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub host_name: String,
    pub description: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub contacts: Vec<String>,
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default)]
    pub attributes: Attributes,
    #[serde(flatten)]
    pub check: CheckStatus,
}

impl ServiceConfig {
    pub fn attach(self, host: Arc<Host>) -> Service {
        Service {
            host,
            description: self.description,
            display_name: self.display_name,
            contacts: self.contacts,
            groups: self.groups,
            attributes: self.attributes,
            check: self.check,
        }
    }
}

/// Log entry classes, numbered like the core's log reader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogClass {
    #[default]
    Info,
    Alert,
    Program,
    Notification,
    Passivecheck,
    Command,
    State,
    Text,
}

impl LogClass {
    pub fn as_i64(&self) -> i64 {
        match self {
            LogClass::Info => 0,
            LogClass::Alert => 1,
            LogClass::Program => 2,
            LogClass::Notification => 3,
            LogClass::Passivecheck => 4,
            LogClass::Command => 5,
            LogClass::State => 6,
            LogClass::Text => 7,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub time: DateTime<Utc>,
    pub class: LogClass,
    pub kind: String,
    pub message: String,
    pub host_name: String,
    pub service_description: String,
    pub state: i64,
    pub plugin_output: String,
    /// The host the entry refers to, if it still exists in the configuration
    pub host: Option<Arc<Host>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    pub time: DateTime<Utc>,
    #[serde(default)]
    pub class: LogClass,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub host_name: String,
    #[serde(default)]
    pub service_description: String,
    #[serde(default)]
    pub state: i64,
    #[serde(default)]
    pub plugin_output: String,
}

impl LogConfig {
    pub fn attach(self, host: Option<Arc<Host>>) -> LogEntry {
        LogEntry {
            time: self.time,
            class: self.class,
            kind: self.kind,
            message: self.message,
            host_name: self.host_name,
            service_description: self.service_description,
            state: self.state,
            plugin_output: self.plugin_output,
            host,
        }
    }
}

/// Process-level status of the monitoring core
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgramStatus {
    pub program_version: String,
    pub program_start: DateTime<Utc>,
    pub pid: i64,
    pub interval_length: i64,
    pub enable_notifications: bool,
    pub execute_service_checks: bool,
    pub execute_host_checks: bool,
    pub accept_passive_service_checks: bool,
    pub accept_passive_host_checks: bool,
}

impl Default for ProgramStatus {
    fn default() -> Self {
        Self {
            program_version: env!("CARGO_PKG_VERSION").to_string(),
            program_start: Utc::now(),
            pid: std::process::id() as i64,
            interval_length: 60,
            enable_notifications: true,
            execute_service_checks: true,
            execute_host_checks: true,
            accept_passive_service_checks: true,
            accept_passive_host_checks: true,
        }
    }
}
