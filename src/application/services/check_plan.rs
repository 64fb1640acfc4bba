use std::time::Duration;

use crate::application::config::{AppConfig, DatabaseCheckConfig, HealthEndpointConfig};
use crate::domain::checks::{
    ContainersCheck, DatabaseCheck, DatabaseTarget, DiskIopsCheck, DiskSpaceCheck,
    DockerDaemonCheck, HealthCheck, HealthEndpointCheck, LoadCheck, LogTailCheck, MemoryCheck,
    OomCheck, RebootCheck,
};

fn database_check(db: &DatabaseCheckConfig, command_timeout: Duration) -> DatabaseCheck {
    let password = db.password_env_var.as_deref().and_then(|var| {
        let value = std::env::var(var).ok();
        if value.is_none() {
            tracing::warn!(var, "database password variable is not set");
        }
        value
    });
    DatabaseCheck {
        target: DatabaseTarget {
            container: db.container_name.clone(),
            host: db.host.clone(),
            port: db.port,
            user: db.user.clone(),
            database: db.database.clone(),
            password,
            connect_timeout: Duration::from_secs(db.connect_timeout_secs),
            command_timeout,
        },
    }
}

fn health_check(health: &HealthEndpointConfig) -> HealthEndpointCheck {
    HealthEndpointCheck {
        url: health.url.clone(),
        timeout: Duration::from_secs(health.timeout_secs),
        status_field: health.status_field.clone(),
        healthy_value: health.healthy_value.clone(),
        required_fields: health.required_fields.clone(),
    }
}

/// The fixed, ordered list of checks this configuration enables.
#[must_use]
pub fn configured_checks(config: &AppConfig) -> Vec<Box<dyn HealthCheck>> {
    let command_timeout = Duration::from_secs(config.commands.timeout_secs.max(1));
    let mut checks: Vec<Box<dyn HealthCheck>> = vec![
        Box::new(LoadCheck {
            window_minutes: config.thresholds.load_window_minutes,
            cores: config.thresholds.cpu_cores,
        }),
        Box::new(MemoryCheck {
            critical_percent: config.thresholds.memory_critical_percent,
        }),
        Box::new(OomCheck {
            timeout: command_timeout,
        }),
    ];
    if config.docker.enabled {
        checks.push(Box::new(DockerDaemonCheck {
            service: config.docker.service_name.clone(),
            timeout: command_timeout,
        }));
        checks.push(Box::new(ContainersCheck {
            containers: config.docker.containers.iter().map(Into::into).collect(),
            timeout: command_timeout,
        }));
    }
    if let Some(db) = &config.database {
        checks.push(Box::new(database_check(db, command_timeout)));
    }
    if let Some(health) = &config.health {
        checks.push(Box::new(health_check(health)));
    }
    checks.push(Box::new(LogTailCheck::new(
        config.logs.iter().map(Into::into).collect(),
    )));
    checks.push(Box::new(RebootCheck));
    checks.push(Box::new(DiskIopsCheck {
        devices: config.disk_devices.iter().map(Into::into).collect(),
    }));
    checks.push(Box::new(DiskSpaceCheck {
        mounts: config.disk_mounts.iter().map(Into::into).collect(),
    }));
    checks
}
