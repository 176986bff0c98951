//! Configuration loading and validation for the flock simulation.
//!
//! Configuration files are JSON by default; files ending in `.toml` are read
//! as TOML. Every field has a default, so partial files are accepted.

use std::fs;
use std::path::Path;

use log::debug;
use thiserror::Error;

// Re-export types
pub use self::types::{
    Config, FileSenderConfig, Preset, RunnerConfig, SenderConfig, SerializerType, SimulationConfig,
    TransportConfig, UpdateStrategy, Viewport,
};
mod types;

// Config error handling
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileReadError(#[from] std::io::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParseError(#[from] serde_json::Error),

    #[error("Failed to parse TOML: {0}")]
    TomlParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError(message.into())
}

// Config loader implementation
pub struct ConfigLoader;

impl ConfigLoader {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
        let path = path.as_ref();
        let file_content = fs::read_to_string(path)?;

        let is_toml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

        debug!("Parsing {} as {}", path.display(), if is_toml { "TOML" } else { "JSON" });
        if is_toml {
            Self::from_toml_str(&file_content)
        } else {
            Self::from_json_str(&file_content)
        }
    }

    pub fn from_json_str(content: &str) -> Result<Config, ConfigError> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn from_toml_str(content: &str) -> Result<Config, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Checks the whole configuration, including the simulation section.
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        Self::validate_simulation(&config.simulation)?;

        if config.transport.output_frequency == 0 {
            return Err(invalid("Output frequency must be greater than 0"));
        }
        if config.runner.channel_capacity == 0 {
            return Err(invalid("Channel capacity must be greater than 0"));
        }
        if let SenderConfig::File(file) = &config.transport.sender {
            if file.output_path.trim().is_empty() {
                return Err(invalid("File sender requires a non-empty output_path"));
            }
        }

        Ok(())
    }

    pub fn validate_simulation(sim: &SimulationConfig) -> Result<(), ConfigError> {
        if sim.agent_count == 0 {
            return Err(invalid("Agent count must be greater than 0"));
        }

        let Viewport { width, height } = sim.viewport;
        if !(width.is_finite() && height.is_finite()) || width <= 0.0 || height <= 0.0 {
            return Err(invalid("Viewport dimensions must be positive"));
        }

        let positive = [
            ("cohesion_radius", sim.cohesion_radius),
            ("separation_radius", sim.separation_radius),
            ("particle_max_speed", sim.particle_max_speed),
            ("leader_max_speed", sim.leader_max_speed),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(invalid(format!("{name} must be a positive number, got {value}")));
            }
        }

        let non_negative = [
            ("alignment_factor", sim.alignment_factor),
            ("cohesion_factor", sim.cohesion_factor),
            ("separation_factor", sim.separation_factor),
            ("edge_buffer", sim.edge_buffer),
            ("damping_factor", sim.damping_factor),
            ("spawn_radius", sim.spawn_radius),
            ("particle_initial_speed", sim.particle_initial_speed),
            ("leader_initial_speed", sim.leader_initial_speed),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(format!("{name} must be a non-negative number, got {value}")));
            }
        }

        if sim.separation_radius > sim.cohesion_radius {
            return Err(invalid(format!(
                "separation_radius ({}) must not exceed cohesion_radius ({})",
                sim.separation_radius, sim.cohesion_radius
            )));
        }

        if sim.tick_interval_ms == 0 {
            return Err(invalid("Tick interval must be greater than 0"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn defaults_match_reference_tuning() {
        let sim = SimulationConfig::default();
        assert_eq!(sim.cohesion_radius, 50.0);
        assert_eq!(sim.separation_radius, 3.0);
        assert_eq!(sim.edge_buffer, 200.0);
        assert_eq!(sim.leader_adjustment_delay_ms, 4000);
        assert_eq!(sim.agent_count, 1500);
        assert_eq!(sim.update_strategy, UpdateStrategy::InPlace);
        assert!(ConfigLoader::validate(&Config::default()).is_ok());
    }

    #[test]
    fn load_partial_json_config() {
        let content = r#"{
          "simulation": {
            "agent_count": 200,
            "viewport": { "width": 800.0, "height": 600.0 },
            "update_strategy": "double_buffer",
            "seed": 42
          },
          "transport": {
            "serializer": "binary",
            "sender": { "sender_type": "File", "options": { "output_path": "out.bin" } }
          }
        }"#;
        let mut file = Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, "{}", content).unwrap();

        let config = ConfigLoader::from_file(file.path()).unwrap();
        assert_eq!(config.simulation.agent_count, 200);
        assert_eq!(config.simulation.viewport, Viewport::new(800.0, 600.0));
        assert_eq!(config.simulation.update_strategy, UpdateStrategy::DoubleBuffer);
        assert_eq!(config.simulation.seed, Some(42));
        // Unspecified fields keep their defaults
        assert_eq!(config.simulation.cohesion_radius, 50.0);
        assert_eq!(config.transport.serializer, SerializerType::Binary);
        assert_eq!(
            config.transport.sender,
            SenderConfig::File(FileSenderConfig { output_path: "out.bin".to_string() })
        );
        assert!(ConfigLoader::validate(&config).is_ok());
    }

    #[test]
    fn load_toml_config() {
        let content = r#"
[simulation]
agent_count = 10
tick_interval_ms = 33

[simulation.viewport]
width = 400.0
height = 300.0

[runner]
max_ticks = 120

[transport.sender]
sender_type = "Stdio"
"#;
        let mut file = Builder::new().suffix(".toml").tempfile().unwrap();
        write!(file, "{}", content).unwrap();

        let config = ConfigLoader::from_file(file.path()).unwrap();
        assert_eq!(config.simulation.agent_count, 10);
        assert_eq!(config.simulation.tick_interval_ms, 33);
        assert_eq!(config.runner.max_ticks, Some(120));
        assert_eq!(config.transport.sender, SenderConfig::Stdio);
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let result = ConfigLoader::from_json_str("{ \"simulation\": ");
        assert!(matches!(result, Err(ConfigError::JsonParseError(_))));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let result = ConfigLoader::from_file("definitely/not/here.json");
        assert!(matches!(result, Err(ConfigError::FileReadError(_))));
    }

    #[test]
    fn zero_agents_is_rejected() {
        let mut config = Config::default();
        config.simulation.agent_count = 0;
        assert!(matches!(ConfigLoader::validate(&config), Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn invalid_numbers_are_rejected() {
        let mut sim = SimulationConfig::default();
        sim.viewport.width = 0.0;
        assert!(ConfigLoader::validate_simulation(&sim).is_err());

        let mut sim = SimulationConfig::default();
        sim.particle_max_speed = f32::NAN;
        assert!(ConfigLoader::validate_simulation(&sim).is_err());

        let mut sim = SimulationConfig::default();
        sim.damping_factor = -0.1;
        assert!(ConfigLoader::validate_simulation(&sim).is_err());

        let mut sim = SimulationConfig::default();
        sim.separation_radius = sim.cohesion_radius + 1.0;
        assert!(ConfigLoader::validate_simulation(&sim).is_err());

        let mut sim = SimulationConfig::default();
        sim.tick_interval_ms = 0;
        assert!(ConfigLoader::validate_simulation(&sim).is_err());
    }

    #[test]
    fn chaos_preset_keeps_population() {
        let mut sim = SimulationConfig::default();
        sim.agent_count = 64;
        sim.apply_preset(Preset::Chaos);
        assert_eq!(sim.agent_count, 64);
        assert_eq!(sim.cohesion_radius, 100.0);
        assert_eq!(sim.leader_max_speed, 3.0);
        assert!(ConfigLoader::validate_simulation(&sim).is_ok());
        assert_eq!(SimulationConfig::preset(Preset::Calm), SimulationConfig::default());
    }
}
