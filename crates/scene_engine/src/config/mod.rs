//! Configuration system
//!
//! Engine and scene settings are plain serde structs that load from `.toml`
//! or `.ron` files through the [`Config`] trait.

pub use serde::{Serialize, Deserialize};

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(ConfigError::Io)?;

        // Try different formats
        if path.ends_with(".toml") {
            Self::from_toml_str(&contents)
        } else if path.ends_with(".ron") {
            Self::from_ron_str(&contents)
        } else {
            Err(ConfigError::UnsupportedFormat(path.to_string()))
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let contents = if path.ends_with(".toml") {
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else if path.ends_with(".ron") {
            ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else {
            return Err(ConfigError::UnsupportedFormat(path.to_string()));
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }

    /// Parse configuration from TOML text
    fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Parse configuration from RON text
    fn from_ron_str(contents: &str) -> Result<Self, ConfigError> {
        ron::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Values that parsed but make no sense together
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// # Scene Configuration
///
/// Controls which layers a new scene registers up front and how strictly the
/// membership index is checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Register the built-in by-type layers (lights, cameras, meshes, objects)
    pub builtin_type_layers: bool,
    /// Create one layer per shader the first time a mesh uses it
    pub group_by_shader: bool,
    /// Cross-check layer contents against the membership index after every
    /// notification (debug builds only)
    pub validate_index: bool,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            builtin_type_layers: true,
            group_by_shader: true,
            validate_index: true,
        }
    }
}

impl SceneConfig {
    /// Builder pattern: toggle the built-in type layers
    pub fn with_builtin_type_layers(mut self, enabled: bool) -> Self {
        self.builtin_type_layers = enabled;
        self
    }

    /// Builder pattern: toggle per-shader grouping
    pub fn with_group_by_shader(mut self, enabled: bool) -> Self {
        self.group_by_shader = enabled;
        self
    }

    /// Builder pattern: toggle index validation
    pub fn with_validate_index(mut self, enabled: bool) -> Self {
        self.validate_index = enabled;
        self
    }
}

impl Config for SceneConfig {}

/// # Engine Configuration
///
/// Process-level settings: logging plus the defaults handed to every scene.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Default log filter (overridden by `RUST_LOG`)
    pub log_level: String,
    /// Settings applied to scenes created by the engine context
    pub scene: SceneConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            scene: SceneConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Create engine configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder pattern: set log level
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Builder pattern: set scene defaults
    pub fn with_scene(mut self, scene: SceneConfig) -> Self {
        self.scene = scene;
        self
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        const LEVELS: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];

        if !LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            return Err(ConfigError::Invalid(format!("unknown log level '{}'", self.log_level)));
        }
        Ok(())
    }
}

impl Config for EngineConfig {}
