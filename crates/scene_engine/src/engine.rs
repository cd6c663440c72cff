//! Engine context
//!
//! Owns the identity allocator shared by every scene it creates, so object
//! identities never collide across scenes of one process.

use crate::config::{Config, ConfigError, EngineConfig, SceneConfig};
use crate::scene::identity::IdentityAllocator;
use crate::scene::scene::Scene;
use std::sync::Arc;
use thiserror::Error;

/// Process-level state shared by scenes
#[derive(Debug)]
pub struct EngineContext {
    identities: Arc<IdentityAllocator>,
    config: EngineConfig,
}

impl EngineContext {
    /// Create a context from validated configuration
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        log::info!("Initializing engine context (log level '{}')", config.log_level);

        Ok(Self {
            identities: Arc::new(IdentityAllocator::new()),
            config,
        })
    }

    /// Create a context from a `.toml` or `.ron` file
    pub fn from_config_file(path: &str) -> Result<Self, EngineError> {
        let config = EngineConfig::load_from_file(path)?;
        Self::new(config)
    }

    /// New empty scene using the configured scene defaults
    pub fn create_scene(&self) -> Scene {
        self.create_scene_with(self.config.scene.clone())
    }

    /// New empty scene with explicit settings
    pub fn create_scene_with(&self, config: SceneConfig) -> Scene {
        let scene = Scene::new(Arc::clone(&self.identities), config);
        log::info!("Created scene {}", scene.id());
        scene
    }

    /// Shared identity allocator
    pub fn identities(&self) -> &Arc<IdentityAllocator> {
        &self.identities
    }

    /// Engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

/// Engine errors
#[derive(Error, Debug)]
pub enum EngineError {
    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scenes_share_identity_space() {
        let engine = EngineContext::new(EngineConfig::default()).unwrap();
        let a = engine.create_scene();
        let b = engine.create_scene();

        assert_ne!(a.id(), b.id());
        assert!(a.id().is_assigned() && b.id().is_assigned());
    }

    #[test]
    fn test_scene_defaults_come_from_config() {
        let config = EngineConfig::new().with_scene(SceneConfig::default().with_builtin_type_layers(false));
        let engine = EngineContext::new(config).unwrap();

        assert!(engine.create_scene().layers().is_empty());
        assert_eq!(engine.create_scene_with(SceneConfig::default()).layers().len(), 4);
    }

    #[test]
    fn test_context_from_ron_file() {
        let path = std::env::temp_dir().join(format!("scene_engine_{}.ron", std::process::id()));
        let path = path.to_string_lossy().into_owned();
        let config = EngineConfig::new().with_scene(SceneConfig::default().with_group_by_shader(false));
        config.save_to_file(&path).unwrap();

        let engine = EngineContext::from_config_file(&path);
        std::fs::remove_file(&path).ok();
        assert_eq!(engine.unwrap().config(), &config);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let result = EngineContext::new(EngineConfig::new().with_log_level("loud"));
        assert!(matches!(result, Err(EngineError::Config(ConfigError::Invalid(_)))));
    }
}
