// Copyright (c) 2025 - Cowboy AI, Inc.
//! Deployment Configuration
//!
//! Raw [`DeploymentParameters`] come from a context file, the process
//! environment, or code. [`StackConfig::from_parameters`] validates them once
//! and produces the immutable configuration every tier borrows. No tier reads
//! the environment or any other process-wide state.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

use crate::domain::{
    AvailabilityZone, DataRetention, DomainName, Environment, EnvironmentName, HostedZone,
    HostedZoneId, Ipv4Cidr,
};
use crate::errors::{SynthesisError, SynthesisResult};

/// Region used when none is given
pub const DEFAULT_REGION: &str = "eu-central-1";

/// Container image used when none is given
pub const DEFAULT_CONTAINER_IMAGE: &str = "health-service:latest";

/// Raw deployment parameters, all optional until validated
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentParameters {
    #[serde(default)]
    pub env_name: Option<String>,
    #[serde(default)]
    pub hosted_zone_id: Option<String>,
    #[serde(default)]
    pub hosted_zone_name: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub data_retention: Option<String>,
    #[serde(default)]
    pub container_image: Option<String>,
    #[serde(default)]
    pub service_replicas: Option<u32>,
    #[serde(default)]
    pub database_replicas: Option<u32>,
}

/// Context file layout (`{"context": {...}}`); other keys are ignored
#[derive(Debug, Deserialize)]
struct ContextFile {
    #[serde(default)]
    context: DeploymentParameters,
}

impl DeploymentParameters {
    /// Load parameters from the `context` object of a JSON file
    pub fn from_context_file(path: impl AsRef<Path>) -> SynthesisResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            SynthesisError::Configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_context_json(&raw)
    }

    /// Parse parameters from the text of a context file
    pub fn from_context_json(raw: &str) -> SynthesisResult<Self> {
        let file: ContextFile = serde_json::from_str(raw)?;
        Ok(file.context)
    }

    /// Load parameters from process environment variables
    pub fn from_env() -> SynthesisResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load parameters through a variable lookup
    ///
    /// Reads `ENV_NAME`, `HOSTED_ZONE_ID`, `HOSTED_ZONE_NAME`, `AWS_REGION`,
    /// `DATA_RETENTION`, `CONTAINER_IMAGE`, `SERVICE_REPLICAS` and
    /// `DATABASE_REPLICAS`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> SynthesisResult<Self> {
        let count = |key: &str, name: &'static str| -> SynthesisResult<Option<u32>> {
            lookup(key)
                .map(|raw| {
                    raw.trim()
                        .parse::<u32>()
                        .map_err(|e| SynthesisError::InvalidParameter {
                            name,
                            reason: format!("'{raw}' is not a count: {e}"),
                        })
                })
                .transpose()
        };

        Ok(Self {
            env_name: lookup("ENV_NAME"),
            hosted_zone_id: lookup("HOSTED_ZONE_ID"),
            hosted_zone_name: lookup("HOSTED_ZONE_NAME"),
            region: lookup("AWS_REGION"),
            data_retention: lookup("DATA_RETENTION"),
            container_image: lookup("CONTAINER_IMAGE"),
            service_replicas: count("SERVICE_REPLICAS", "service_replicas")?,
            database_replicas: count("DATABASE_REPLICAS", "database_replicas")?,
        })
    }

    /// Overlay `other` on top of `self`; values present in `other` win
    pub fn overlay(self, other: DeploymentParameters) -> Self {
        Self {
            env_name: other.env_name.or(self.env_name),
            hosted_zone_id: other.hosted_zone_id.or(self.hosted_zone_id),
            hosted_zone_name: other.hosted_zone_name.or(self.hosted_zone_name),
            region: other.region.or(self.region),
            data_retention: other.data_retention.or(self.data_retention),
            container_image: other.container_image.or(self.container_image),
            service_replicas: other.service_replicas.or(self.service_replicas),
            database_replicas: other.database_replicas.or(self.database_replicas),
        }
    }
}

/// Treat blank strings as absent
fn present(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Network sizing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkSettings {
    pub cidr: Ipv4Cidr,
    /// Prefix length of every subnet
    pub subnet_mask: u8,
    pub zone_count: u8,
}

/// Container service shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceSettings {
    pub port: u16,
    /// CPU units (1024 = one vCPU)
    pub cpu: u32,
    pub memory_mib: u32,
    pub image: String,
    pub replicas: u32,
    pub log_retention_days: u32,
}

/// Database tier shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatabaseTierSettings {
    pub port: u16,
    pub engine: String,
    pub engine_version: String,
    pub instance_class: String,
    /// Read replicas in addition to the writer
    pub replicas: u32,
    /// Database and table the health service bootstraps
    pub database_name: String,
    pub table_name: String,
    pub monitoring_interval_secs: u32,
}

/// Load balancer health check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthCheckSettings {
    pub path: String,
    pub interval_secs: u32,
    pub timeout_secs: u32,
    pub healthy_threshold: u32,
    pub unhealthy_threshold: u32,
}

/// Edge firewall
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FirewallSettings {
    /// Requests per five minutes per client address
    pub rate_limit: u32,
}

/// Utilization alarm
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlarmSettings {
    pub cpu_threshold: f64,
    pub evaluation_periods: u32,
    pub period_secs: u32,
}

/// Validated, immutable stack configuration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StackConfig {
    pub environment: Environment,
    pub hosted_zone: HostedZone,
    pub region: String,
    pub network: NetworkSettings,
    pub service: ServiceSettings,
    pub database: DatabaseTierSettings,
    pub health_check: HealthCheckSettings,
    pub firewall: FirewallSettings,
    pub alarm: AlarmSettings,
}

impl StackConfig {
    /// Validate raw parameters into a configuration
    ///
    /// Required parameters are checked before anything else, in the order
    /// `hosted_zone_id`, `hosted_zone_name`. A missing environment name falls
    /// back to `dev` and is reported in the returned warnings.
    pub fn from_parameters(
        params: &DeploymentParameters,
    ) -> SynthesisResult<(StackConfig, Vec<String>)> {
        let mut warnings = Vec::new();

        let zone_id =
            present(&params.hosted_zone_id).ok_or(SynthesisError::MissingParameter("hosted_zone_id"))?;
        let zone_name = present(&params.hosted_zone_name)
            .ok_or(SynthesisError::MissingParameter("hosted_zone_name"))?;

        let name = match present(&params.env_name) {
            Some(name) => EnvironmentName::new(name)?,
            None => {
                let message = format!(
                    "Missing deployment parameter 'env_name'; proceeding with a '{}' environment",
                    EnvironmentName::DEVELOPMENT
                );
                warn!("{}", message);
                warnings.push(message);
                EnvironmentName::development()
            }
        };

        let retention = match present(&params.data_retention) {
            Some(raw) => raw.parse::<DataRetention>()?,
            None if name.is_development() => DataRetention::Destroy,
            None => return Err(SynthesisError::MissingParameter("data_retention")),
        };

        let region = present(&params.region).unwrap_or(DEFAULT_REGION).to_string();
        if !region
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(SynthesisError::InvalidParameter {
                name: "region",
                reason: format!("'{region}' is not a region identifier"),
            });
        }

        let hosted_zone = HostedZone {
            id: HostedZoneId::new(zone_id)?,
            name: DomainName::new(zone_name)?,
        };

        let zone_count = 3;
        let service_replicas = params.service_replicas.unwrap_or(u32::from(zone_count));
        let database_replicas = params.database_replicas.unwrap_or(2);

        let config = StackConfig {
            environment: Environment::new(name, retention),
            hosted_zone,
            region,
            network: NetworkSettings {
                cidr: Ipv4Cidr::new("10.0.0.0/16")?,
                subnet_mask: 24,
                zone_count,
            },
            service: ServiceSettings {
                port: 5000,
                cpu: 1024,
                memory_mib: 2048,
                image: present(&params.container_image)
                    .unwrap_or(DEFAULT_CONTAINER_IMAGE)
                    .to_string(),
                replicas: service_replicas,
                log_retention_days: 7,
            },
            database: DatabaseTierSettings {
                port: 5432,
                engine: "aurora-postgresql".to_string(),
                engine_version: "16.6".to_string(),
                instance_class: "db.m6g.large".to_string(),
                replicas: database_replicas,
                database_name: "flaskdb".to_string(),
                table_name: "user".to_string(),
                monitoring_interval_secs: 60,
            },
            health_check: HealthCheckSettings {
                path: "/ping".to_string(),
                interval_secs: 30,
                timeout_secs: 5,
                healthy_threshold: 2,
                unhealthy_threshold: 3,
            },
            firewall: FirewallSettings { rate_limit: 1000 },
            alarm: AlarmSettings {
                cpu_threshold: 80.0,
                evaluation_periods: 3,
                period_secs: 60,
            },
        };

        Ok((config, warnings))
    }

    /// Availability zones the stack spreads across
    pub fn availability_zones(&self) -> Vec<AvailabilityZone> {
        (0..self.network.zone_count)
            .map(|index| AvailabilityZone::new(self.region.clone(), index))
            .collect()
    }

    /// Fully qualified name of the environment's subdomain
    pub fn environment_domain(&self) -> SynthesisResult<DomainName> {
        Ok(self
            .hosted_zone
            .name
            .subdomain(self.environment.name.as_str())?)
    }

    /// Name of the credential secret for this environment
    pub fn credentials_secret_name(&self) -> String {
        self.environment.name.scoped("aurora-credentials")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> DeploymentParameters {
        DeploymentParameters {
            env_name: Some("dev".to_string()),
            hosted_zone_id: Some("Z0123456789ABC".to_string()),
            hosted_zone_name: Some("example.com".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults() {
        let (config, warnings) = StackConfig::from_parameters(&params()).unwrap();
        assert!(warnings.is_empty());
        assert_eq!(config.region, "eu-central-1");
        assert_eq!(config.network.cidr.to_string(), "10.0.0.0/16");
        assert_eq!(config.service.replicas, 3);
        assert_eq!(config.environment.retention, DataRetention::Destroy);
        assert_eq!(config.credentials_secret_name(), "dev-aurora-credentials");
        assert_eq!(config.environment_domain().unwrap().as_str(), "dev.example.com");
        assert_eq!(config.availability_zones()[2].name(), "eu-central-1c");
    }

    #[test]
    fn test_blank_values_are_missing() {
        let mut p = params();
        p.hosted_zone_id = Some("  ".to_string());
        assert!(matches!(
            StackConfig::from_parameters(&p),
            Err(SynthesisError::MissingParameter("hosted_zone_id"))
        ));
    }

    #[test]
    fn test_missing_env_name_defaults_with_warning() {
        let mut p = params();
        p.env_name = None;
        let (config, warnings) = StackConfig::from_parameters(&p).unwrap();
        assert_eq!(config.environment.name.as_str(), "dev");
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("env_name"));
    }

    #[test]
    fn test_persistent_environment_requires_retention_flag() {
        let mut p = params();
        p.env_name = Some("prod".to_string());
        assert!(matches!(
            StackConfig::from_parameters(&p),
            Err(SynthesisError::MissingParameter("data_retention"))
        ));

        p.data_retention = Some("retain".to_string());
        let (config, _) = StackConfig::from_parameters(&p).unwrap();
        assert!(config.environment.deletion_protection());
    }

    #[test]
    fn test_context_file_parsing() {
        let raw = r#"{
            "app": "python3 app.py",
            "context": {
                "hosted_zone_id": "Z0123456789ABC",
                "hosted_zone_name": "example.com",
                "@aws-cdk/core:enableStackNameDuplicates": true
            }
        }"#;
        let p = DeploymentParameters::from_context_json(raw).unwrap();
        assert_eq!(p.hosted_zone_name.as_deref(), Some("example.com"));
        assert_eq!(p.env_name, None);
    }

    #[test]
    fn test_lookup_and_overlay() {
        let env = DeploymentParameters::from_lookup(|key| match key {
            "ENV_NAME" => Some("staging".to_string()),
            "SERVICE_REPLICAS" => Some("6".to_string()),
            _ => None,
        })
        .unwrap();
        let merged = params().overlay(env);
        assert_eq!(merged.env_name.as_deref(), Some("staging"));
        assert_eq!(merged.hosted_zone_name.as_deref(), Some("example.com"));
        assert_eq!(merged.service_replicas, Some(6));

        let bad = DeploymentParameters::from_lookup(|key| {
            (key == "DATABASE_REPLICAS").then(|| "many".to_string())
        });
        assert!(matches!(
            bad,
            Err(SynthesisError::InvalidParameter {
                name: "database_replicas",
                ..
            })
        ));
    }
}
