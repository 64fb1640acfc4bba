use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::domain::checks::{ContainerTarget, DeviceLimit, LogTarget, MountLimit};

const SYSTEM_CONFIG_PATH: &str = "/etc/hostwatch/config.toml";
const SUBSCRIBER_FILE_NAME: &str = "telegram_subscribers.json";

/// Top-level application configuration loaded from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_state_path")]
    pub state_path: String,
    /// Defaults to the state path with a `.lock` extension.
    #[serde(default)]
    pub lock_path: Option<String>,
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
    /// Shown in report headers; defaults to the machine hostname.
    #[serde(default)]
    pub host_label: Option<String>,
    #[serde(default)]
    pub thresholds: ThresholdConfig,
    #[serde(default)]
    pub commands: CommandConfig,
    #[serde(default)]
    pub docker: DockerConfig,
    #[serde(default)]
    pub database: Option<DatabaseCheckConfig>,
    #[serde(default)]
    pub health: Option<HealthEndpointConfig>,
    #[serde(default)]
    pub logs: Vec<LogWatchConfig>,
    #[serde(default)]
    pub disk_devices: Vec<DiskDeviceConfig>,
    #[serde(default = "default_disk_mounts")]
    pub disk_mounts: Vec<DiskMountConfig>,
    #[serde(default)]
    pub notification: NotificationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdConfig {
    #[serde(default = "default_load_window")]
    pub load_window_minutes: u32,
    /// Overrides the detected logical CPU count.
    #[serde(default)]
    pub cpu_cores: Option<usize>,
    #[serde(default = "default_memory_critical")]
    pub memory_critical_percent: f64,
}

/// Bounds for external binaries (systemctl, docker, journalctl).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandConfig {
    #[serde(default = "default_command_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DockerConfig {
    /// Hosts without a container runtime turn both docker checks off.
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_docker_service")]
    pub service_name: String,
    #[serde(default)]
    pub containers: Vec<ContainerConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerConfig {
    pub container: String,
    /// Display name; the container name is used when absent.
    #[serde(default)]
    pub name: Option<String>,
}

impl ContainerConfig {
    #[must_use]
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.container)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseCheckConfig {
    pub container_name: String,
    #[serde(default = "default_loopback")]
    pub host: String,
    #[serde(default = "default_pg_port")]
    pub port: u16,
    #[serde(default = "default_pg_user")]
    pub user: String,
    #[serde(default = "default_pg_database")]
    pub database: String,
    /// Environment variable holding the password, passed as `PGPASSWORD`.
    #[serde(default)]
    pub password_env_var: Option<String>,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthEndpointConfig {
    #[serde(default = "default_health_url")]
    pub url: String,
    #[serde(default = "default_health_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_status_field")]
    pub status_field: String,
    #[serde(default = "default_healthy_value")]
    pub healthy_value: String,
    #[serde(default)]
    pub required_fields: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogWatchConfig {
    pub path: String,
    /// Regular expression matched against each new line.
    #[serde(default = "default_log_pattern")]
    pub pattern: String,
    /// Match `pattern` as plain text instead of a regular expression.
    #[serde(default)]
    pub literal: bool,
}

impl LogWatchConfig {
    /// The pattern as a regular expression, escaped when literal.
    #[must_use]
    pub fn regex_source(&self) -> String {
        if self.literal {
            regex::escape(&self.pattern)
        } else {
            self.pattern.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiskDeviceConfig {
    pub name: String,
    #[serde(default = "default_max_iops")]
    pub max_iops: f64,
    #[serde(default = "default_true")]
    pub include_reads: bool,
    #[serde(default = "default_true")]
    pub include_writes: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiskMountConfig {
    pub name: String,
    pub path: String,
    #[serde(default = "default_disk_warn")]
    pub warn_percent: f64,
    #[serde(default = "default_disk_critical")]
    pub critical_percent: f64,
    #[serde(default = "default_min_free_gb")]
    pub min_free_gb: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub email: EmailConfig,
}

/// Plain-text alert mail through an SMTP relay, by default the local MTA.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_mail_recipients")]
    pub recipients: Vec<String>,
    #[serde(default)]
    pub cc: Vec<String>,
    #[serde(default = "default_mail_sender")]
    pub sender: String,
    #[serde(default = "default_subject_prefix")]
    pub subject_prefix: String,
    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub username: Option<String>,
    /// Environment variable holding the SMTP password.
    #[serde(default)]
    pub password_env: Option<String>,
    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u64,
}

impl EmailConfig {
    /// Recipients then cc addresses, each address once.
    #[must_use]
    pub fn all_recipients(&self) -> Vec<String> {
        let mut all: Vec<String> = Vec::new();
        for address in self.recipients.iter().chain(&self.cc) {
            let address = address.trim();
            if !address.is_empty() && !all.iter().any(|a| a == address) {
                all.push(address.to_string());
            }
        }
        all
    }

    /// Username plus password from `password_env`, when both are set.
    #[must_use]
    pub fn resolve_credentials(&self) -> Option<(String, String)> {
        let user = self.username.clone().filter(|u| !u.trim().is_empty())?;
        let password = std::env::var(self.password_env.as_deref()?).ok()?;
        Some((user, password))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub chat_ids: Vec<String>,
    /// Inline token; prefer `bot_token_env`.
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_token_env")]
    pub bot_token_env: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub subscriber_store: Option<String>,
    #[serde(default)]
    pub poll_updates: bool,
    #[serde(default = "default_subscribe_command")]
    pub subscribe_command: String,
    #[serde(default = "default_unsubscribe_command")]
    pub unsubscribe_command: String,
    #[serde(default = "default_welcome")]
    pub welcome_message: String,
}

impl TelegramConfig {
    /// Inline token first, then the configured environment variable.
    #[must_use]
    pub fn resolve_token(&self) -> Option<String> {
        self.token
            .clone()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| std::env::var(&self.bot_token_env).ok())
            .filter(|t| !t.trim().is_empty())
    }
}

// --- Defaults ---

fn default_state_path() -> String {
    "/var/lib/hostwatch/state.db".into()
}

const fn default_retention_days() -> u32 {
    365
}

const fn default_load_window() -> u32 {
    60
}

const fn default_memory_critical() -> f64 {
    95.0
}

const fn default_command_timeout() -> u64 {
    15
}

fn default_docker_service() -> String {
    "docker".into()
}

fn default_loopback() -> String {
    "127.0.0.1".into()
}

const fn default_pg_port() -> u16 {
    5432
}

fn default_pg_user() -> String {
    "postgres".into()
}

fn default_pg_database() -> String {
    "postgres".into()
}

const fn default_connect_timeout() -> u64 {
    3
}

fn default_health_url() -> String {
    "http://127.0.0.1:8888/status".into()
}

const fn default_health_timeout() -> u64 {
    10
}

fn default_status_field() -> String {
    "status".into()
}

fn default_healthy_value() -> String {
    "healthy".into()
}

fn default_log_pattern() -> String {
    "Traceback".into()
}

const fn default_max_iops() -> f64 {
    1000.0
}

const fn default_true() -> bool {
    true
}

const fn default_disk_warn() -> f64 {
    85.0
}

const fn default_disk_critical() -> f64 {
    95.0
}

const fn default_min_free_gb() -> f64 {
    2.0
}

fn default_disk_mounts() -> Vec<DiskMountConfig> {
    vec![DiskMountConfig {
        name: "root".into(),
        path: "/".into(),
        warn_percent: default_disk_warn(),
        critical_percent: default_disk_critical(),
        min_free_gb: default_min_free_gb(),
    }]
}

fn default_token_env() -> String {
    "TG_BOT_TOKEN".into()
}

fn default_api_base() -> String {
    "https://api.telegram.org".into()
}

const fn default_request_timeout() -> u64 {
    10
}

fn default_subscribe_command() -> String {
    "/start".into()
}

fn default_unsubscribe_command() -> String {
    "/stop".into()
}

fn default_mail_recipients() -> Vec<String> {
    vec!["root@localhost".into()]
}

fn default_mail_sender() -> String {
    "hostwatch@localhost".into()
}

fn default_subject_prefix() -> String {
    "[hostwatch]".into()
}

fn default_smtp_host() -> String {
    "localhost".into()
}

const fn default_smtp_port() -> u16 {
    25
}

fn default_welcome() -> String {
    "Subscribed to host alerts. You will receive a message whenever a check reports WARN or CRIT."
        .into()
}

// --- Default impls ---

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            state_path: default_state_path(),
            lock_path: None,
            retention_days: default_retention_days(),
            host_label: None,
            thresholds: ThresholdConfig::default(),
            commands: CommandConfig::default(),
            docker: DockerConfig::default(),
            database: None,
            health: None,
            logs: Vec::new(),
            disk_devices: Vec::new(),
            disk_mounts: default_disk_mounts(),
            notification: NotificationConfig::default(),
        }
    }
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            load_window_minutes: default_load_window(),
            cpu_cores: None,
            memory_critical_percent: default_memory_critical(),
        }
    }
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_command_timeout(),
        }
    }
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            service_name: default_docker_service(),
            containers: Vec::new(),
        }
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            chat_ids: Vec::new(),
            token: None,
            bot_token_env: default_token_env(),
            api_base: default_api_base(),
            request_timeout_secs: default_request_timeout(),
            subscriber_store: None,
            poll_updates: false,
            subscribe_command: default_subscribe_command(),
            unsubscribe_command: default_unsubscribe_command(),
            welcome_message: default_welcome(),
        }
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            recipients: default_mail_recipients(),
            cc: Vec::new(),
            sender: default_mail_sender(),
            subject_prefix: default_subject_prefix(),
            smtp_host: default_smtp_host(),
            smtp_port: default_smtp_port(),
            username: None,
            password_env: None,
            timeout_secs: default_request_timeout(),
        }
    }
}

// --- AppConfig methods ---

impl AppConfig {
    /// Load from `explicit` when given, otherwise from the first existing
    /// candidate path, otherwise fall back to built-in defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicit path does not exist, or if the selected
    /// file cannot be read or is not valid TOML.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            if !path.exists() {
                bail!("config file {} does not exist", path.display());
            }
            return Self::load_from(path);
        }
        match Self::candidate_paths().into_iter().find(|p| p.exists()) {
            Some(path) => Self::load_from(&path),
            None => {
                tracing::debug!("no config file found, using built-in defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load from a specific path
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or the TOML content is invalid.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    fn candidate_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(SYSTEM_CONFIG_PATH)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("hostwatch").join("config.toml"));
        }
        paths
    }

    fn validate(&self) -> Result<()> {
        if self.retention_days == 0 {
            bail!("retention_days must be at least 1");
        }
        if self.thresholds.load_window_minutes == 0 {
            bail!("thresholds.load_window_minutes must be at least 1");
        }
        for log in &self.logs {
            regex::Regex::new(&log.regex_source()).with_context(|| {
                format!(
                    "invalid pattern for log {} (set literal = true to match it as plain text)",
                    log.path
                )
            })?;
        }
        // Names key stored snapshots and metric names, so they must be unique.
        if let Some(name) = first_duplicate(self.disk_devices.iter().map(|d| d.name.as_str())) {
            bail!("disk device {name} is configured more than once");
        }
        if let Some(name) = first_duplicate(self.disk_mounts.iter().map(|m| m.name.as_str())) {
            bail!("disk mount {name} is configured more than once");
        }
        for mount in &self.disk_mounts {
            if mount.critical_percent < mount.warn_percent {
                bail!(
                    "disk mount {}: critical_percent is below warn_percent",
                    mount.name
                );
            }
        }
        Ok(())
    }

    /// Tilde-expanded state database path.
    #[must_use]
    pub fn state_path(&self) -> PathBuf {
        expand(&self.state_path)
    }

    #[must_use]
    pub fn lock_path(&self) -> PathBuf {
        self.lock_path
            .as_deref()
            .map_or_else(|| self.state_path().with_extension("lock"), expand)
    }

    /// Subscriber document location: configured, or next to the state database.
    #[must_use]
    pub fn subscriber_store_path(&self) -> PathBuf {
        if let Some(path) = self.notification.telegram.subscriber_store.as_deref() {
            return expand(path);
        }
        let state = self.state_path();
        let dir = state.parent().unwrap_or_else(|| Path::new("."));
        dir.join(SUBSCRIBER_FILE_NAME)
    }

    /// Whether a subscriber store participates in this configuration.
    #[must_use]
    pub fn uses_subscribers(&self) -> bool {
        let tg = &self.notification.telegram;
        tg.poll_updates || tg.subscriber_store.is_some()
    }

    #[must_use]
    pub fn host_label(&self) -> String {
        self.host_label
            .clone()
            .or_else(sysinfo::System::host_name)
            .unwrap_or_else(|| "localhost".into())
    }
}

fn first_duplicate<'a>(names: impl Iterator<Item = &'a str>) -> Option<&'a str> {
    let mut seen = std::collections::HashSet::new();
    names.map(str::trim).find(|name| !seen.insert(*name))
}

fn expand(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).into_owned())
}

impl From<&ContainerConfig> for ContainerTarget {
    fn from(config: &ContainerConfig) -> Self {
        Self {
            container: config.container.clone(),
            label: config.label().to_string(),
        }
    }
}

impl From<&LogWatchConfig> for LogTarget {
    fn from(config: &LogWatchConfig) -> Self {
        Self {
            path: expand(&config.path),
            pattern: config.regex_source(),
        }
    }
}

impl From<&DiskDeviceConfig> for DeviceLimit {
    fn from(config: &DiskDeviceConfig) -> Self {
        Self {
            name: config.name.clone(),
            max_iops: config.max_iops.max(0.0),
            include_reads: config.include_reads,
            include_writes: config.include_writes,
        }
    }
}

impl From<&DiskMountConfig> for MountLimit {
    fn from(config: &DiskMountConfig) -> Self {
        // Clamp percentages to valid range
        let warn_percent = config.warn_percent.clamp(0.0, 100.0);
        Self {
            name: config.name.clone(),
            path: expand(&config.path),
            warn_percent,
            critical_percent: config.critical_percent.clamp(warn_percent, 100.0),
            min_free_gb: config.min_free_gb.max(0.0),
        }
    }
}
