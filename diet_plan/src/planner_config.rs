use config::{Config, ConfigError, Environment, File, FileFormat};
use flow_client::FlowEndpoint;
use serde_derive::Deserialize;

use crate::DEFAULT_FLOW_VERSION;

/// Prefix for environment overrides, e.g. `DIET_PLANNER__FLOW__VERSION=1.1.0`.
pub const ENV_PREFIX: &str = "DIET_PLANNER";

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct FlowConfig {
    pub protocol: String,
    pub host: String,
    pub port: Option<u16>,
    pub route: String,
    pub version: String,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct FileConfig {
    pub output_dir: String,
    pub save_to_file: bool,
    pub overwrite: bool,
}

/// Settings for the planner. The API key is deliberately not in here, it is
/// read from the environment once and handed to the client separately.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct PlannerConfig {
    pub flow: FlowConfig,
    pub file: FileConfig,
}

impl PlannerConfig {
    /// Layers defaults, then the optional JSON settings file, then
    /// `DIET_PLANNER__*` environment variables.
    pub fn load(settings_file: Option<&str>) -> Result<PlannerConfig, ConfigError> {
        let endpoint = FlowEndpoint::default();
        let mut builder = Config::builder()
            .set_default("flow.protocol", endpoint.protocol)?
            .set_default("flow.host", endpoint.host)?
            .set_default("flow.route", endpoint.route)?
            .set_default("flow.version", DEFAULT_FLOW_VERSION)?
            .set_default("file.output_dir", ".")?
            .set_default("file.save_to_file", true)?
            .set_default("file.overwrite", true)?;

        if let Some(path) = settings_file {
            builder = builder.add_source(File::new(path, FileFormat::Json));
        }

        builder
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?
            .try_deserialize()
    }

    pub fn endpoint(&self) -> FlowEndpoint {
        FlowEndpoint {
            protocol: String::from(&self.flow.protocol),
            host: String::from(&self.flow.host),
            port: self.flow.port,
            route: String::from(&self.flow.route),
        }
    }
}
