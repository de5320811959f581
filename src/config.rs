// src/config.rs
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use clap::ValueEnum;
use log::debug;

use crate::error::{AssistError, Result};
use crate::mode::Mode;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_JPEG_QUALITY: u8 = 80;
pub const TIMEOUT_ENV: &str = "COVA_REQUEST_TIMEOUT_SECS";

/// The inference service deployments the app talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Deployment {
    /// Paperspace host serving the ATM and walking models
    Standard,
    /// Cloud Run host serving the CPU build of all three models
    GoogleCloud,
    /// GPU host serving all three models
    GpuCloud,
}

impl Deployment {
    pub const ALL: [Deployment; 3] = [Deployment::Standard, Deployment::GoogleCloud, Deployment::GpuCloud];

    pub fn env_var(self) -> &'static str {
        match self {
            Deployment::Standard => "COVA_STANDARD_URL",
            Deployment::GoogleCloud => "COVA_GOOGLE_CLOUD_URL",
            Deployment::GpuCloud => "COVA_GPU_CLOUD_URL",
        }
    }

    pub fn default_base_url(self) -> Option<&'static str> {
        match self {
            Deployment::Standard => {
                Some("https://d3e134e5d335b4aa1b23b9a8a78193562.clg07azjl.paperspacegradient.com")
            }
            Deployment::GoogleCloud => Some("https://cova-vlm-cpu-1043776497444.us-central1.run.app"),
            Deployment::GpuCloud => None,
        }
    }

    pub fn endpoints(self) -> EndpointMap {
        match self {
            Deployment::Standard => EndpointMap::standard(),
            Deployment::GoogleCloud | Deployment::GpuCloud => EndpointMap::full(),
        }
    }
}

impl fmt::Display for Deployment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Deployment::Standard => "standard",
            Deployment::GoogleCloud => "google-cloud",
            Deployment::GpuCloud => "gpu-cloud",
        };
        f.write_str(name)
    }
}

/// Endpoint suffix per supported mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointMap(BTreeMap<Mode, String>);

impl EndpointMap {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn standard() -> Self {
        Self::new()
            .with(Mode::Atm, "/ATMpredict")
            .with(Mode::Walking, "/WApredict")
    }

    pub fn full() -> Self {
        Self::standard().with(Mode::Vqa, "/VLMpredict")
    }

    pub fn with(mut self, mode: Mode, suffix: impl Into<String>) -> Self {
        self.0.insert(mode, suffix.into());
        self
    }

    pub fn get(&self, mode: Mode) -> Option<&str> {
        self.0.get(&mode).map(String::as_str)
    }

    pub fn modes(&self) -> impl Iterator<Item = Mode> + '_ {
        self.0.keys().copied()
    }
}

impl Default for EndpointMap {
    fn default() -> Self {
        Self::full()
    }
}

/// Everything the endpoint client needs to reach one deployment.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub name: String,
    pub base_url: String,
    pub endpoints: EndpointMap,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}

impl ServiceConfig {
    pub fn new(name: impl Into<String>, base_url: &str, endpoints: EndpointMap) -> Self {
        Self {
            name: name.into(),
            base_url: normalize_base_url(base_url),
            endpoints,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Resolves a deployment: explicit url, then its env var, then the built-in default.
    pub fn for_deployment(deployment: Deployment, url_arg: Option<String>) -> Result<Self> {
        let env_value = std::env::var(deployment.env_var()).ok();
        let base_url = resolve_base_url(deployment, url_arg, env_value)?;
        let timeout = match std::env::var(TIMEOUT_ENV) {
            Ok(raw) => parse_timeout_secs(&raw)?,
            Err(_) => DEFAULT_REQUEST_TIMEOUT,
        };
        debug!("Resolved {} deployment at {} (timeout {:?})", deployment, base_url, timeout);
        Ok(Self::new(deployment.to_string(), &base_url, deployment.endpoints()).with_request_timeout(timeout))
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn url_for(&self, mode: Mode) -> Option<String> {
        self.endpoints
            .get(mode)
            .map(|suffix| format!("{}{}", self.base_url, suffix))
    }
}

pub fn resolve_base_url(
    deployment: Deployment,
    url_arg: Option<String>,
    env_value: Option<String>,
) -> Result<String> {
    url_arg
        .or(env_value)
        .filter(|url| !url.trim().is_empty())
        .or_else(|| deployment.default_base_url().map(str::to_string))
        .map(|url| normalize_base_url(&url))
        .ok_or_else(|| {
            AssistError::Config(format!(
                "no base URL for the {} deployment; pass --base-url or set {}",
                deployment,
                deployment.env_var()
            ))
        })
}

pub fn parse_timeout_secs(raw: &str) -> Result<Duration> {
    match raw.trim().parse::<u64>() {
        Ok(0) | Err(_) => Err(AssistError::Config(format!(
            "invalid request timeout '{}': expected a positive number of seconds",
            raw
        ))),
        Ok(secs) => Ok(Duration::from_secs(secs)),
    }
}

fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

/// Fixed parameters for turning captures into request-ready images.
#[derive(Debug, Clone)]
pub struct AcquisitionConfig {
    pub jpeg_quality: u8,
    pub output_dir: PathBuf,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            output_dir: std::env::temp_dir(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_tables_match_deployments() {
        let standard = Deployment::Standard.endpoints();
        assert_eq!(standard.get(Mode::Atm), Some("/ATMpredict"));
        assert_eq!(standard.get(Mode::Walking), Some("/WApredict"));
        assert_eq!(standard.get(Mode::Vqa), None);

        let cloud = Deployment::GoogleCloud.endpoints();
        assert_eq!(cloud.get(Mode::Vqa), Some("/VLMpredict"));
        assert_eq!(cloud.modes().count(), 3);
        assert_eq!(Deployment::GpuCloud.endpoints(), cloud);
    }

    #[test]
    fn explicit_url_beats_env_and_default() {
        let url = resolve_base_url(
            Deployment::Standard,
            Some("http://flag:1/".to_string()),
            Some("http://env:2".to_string()),
        )
        .unwrap();
        assert_eq!(url, "http://flag:1");

        let url = resolve_base_url(Deployment::Standard, None, Some("http://env:2".to_string())).unwrap();
        assert_eq!(url, "http://env:2");

        let url = resolve_base_url(Deployment::GoogleCloud, None, None).unwrap();
        assert_eq!(url, "https://cova-vlm-cpu-1043776497444.us-central1.run.app");
    }

    #[test]
    fn gpu_cloud_requires_configuration() {
        let err = resolve_base_url(Deployment::GpuCloud, None, Some("  ".to_string())).unwrap_err();
        assert!(err.to_string().contains("COVA_GPU_CLOUD_URL"));
    }

    #[test]
    fn url_for_joins_base_and_suffix() {
        let config = ServiceConfig::new("test", "http://localhost:8000///", EndpointMap::standard());
        assert_eq!(config.url_for(Mode::Atm).as_deref(), Some("http://localhost:8000/ATMpredict"));
        assert_eq!(config.url_for(Mode::Vqa), None);
    }

    #[test]
    fn timeout_must_be_positive() {
        assert_eq!(parse_timeout_secs("30").unwrap(), Duration::from_secs(30));
        assert!(parse_timeout_secs("0").is_err());
        assert!(parse_timeout_secs("soon").is_err());
    }
}
