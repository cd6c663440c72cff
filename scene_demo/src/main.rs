//! Scene demo application
//!
//! Builds a small scene (a sun, a camera rig and a ring of meshes using two
//! shaders), animates it for a few ticks, and logs how the layers follow
//! along. Pass a `.toml` or `.ron` engine config path as the first argument
//! to override the defaults.

use scene_engine::foundation::logging;
use scene_engine::prelude::*;
use std::f32::consts::TAU;
use std::thread;

const RING_SIZE: usize = 8;
const TICKS: usize = 4;

/// Logs structural changes as a renderer front end would see them
struct RenderQueueWatcher {
    structural: usize,
}

impl ChangeListener for RenderQueueWatcher {
    fn notify_changed(&mut self, scene: &Scene, node: NodeKey, change: ChangeDescriptor) {
        if !change.is_any(ChangeDescriptor::PARENT | ChangeDescriptor::VISIBILITY | ChangeDescriptor::RENDER) {
            return;
        }
        self.structural += 1;

        let label = scene
            .get(node)
            .map_or("<gone>", |n| n.name().unwrap_or(n.kind().label()));
        log::debug!("#{} v{}: {:?} on {}", self.structural, scene.version(), change, label);
    }
}

struct SceneDemo {
    scene: Scene,
    tasks: SceneTaskQueue,
    ring: NodeKey,
    meshes: Vec<NodeKey>,
}

impl SceneDemo {
    fn new(engine: &EngineContext) -> Self {
        let mut scene = engine.create_scene();
        scene.add_listener(Box::new(RenderQueueWatcher { structural: 0 }));

        let sun = scene.spawn(scene.root(), NodeKind::Light(Light::directional(Vec3::new(1.0, 0.95, 0.9), 1.2)));
        scene.set_name(sun, "sun");

        let rig = scene.spawn(scene.root(), NodeKind::Group);
        scene.set_name(rig, "camera rig");
        scene.set_local_transform(rig, Transform::from_position(Vec3::new(0.0, 2.0, 10.0)));
        let camera = scene.spawn(rig, NodeKind::Camera(Camera::default()));
        scene.set_name(camera, "main camera");

        let ring = scene.create_node(NodeKind::Group);
        scene.set_name(ring, "ring");

        let lit = Material::new("lit", ShaderId::new(1)).with_color(Vec3::new(0.8, 0.7, 0.5));
        let glass = Material::new("glass", ShaderId::new(2)).transparent();

        // Built detached, reported in one go when the ring joins the scene
        let mut meshes = Vec::with_capacity(RING_SIZE);
        for i in 0..RING_SIZE {
            let material = if i % 3 == 0 { glass.clone() } else { lit.clone() };
            let mesh = scene.create_node(NodeKind::Mesh(Mesh::new("teapot", material)));
            scene.set_name(mesh, format!("teapot {i}"));

            let angle = TAU * i as f32 / RING_SIZE as f32;
            scene.set_local_transform(mesh, Transform::from_position(Vec3::new(angle.cos() * 4.0, 0.0, angle.sin() * 4.0)));
            scene.add_child(ring, mesh);
            meshes.push(mesh);
        }
        scene.add_child(scene.root(), ring);
        scene.update_world_matrices();

        Self {
            scene,
            tasks: SceneTaskQueue::new(),
            ring,
            meshes,
        }
    }

    fn run(&mut self) {
        // A loader thread swaps the first teapot over to glass
        let handle = self.tasks.handle();
        let first = self.meshes[0];
        let loader = thread::spawn(move || {
            handle.execute(Box::new(move |scene: &mut Scene| {
                scene.set_materials(first, vec![Material::new("glass", ShaderId::new(2)).transparent()]);
            }));
        });
        if loader.join().is_err() {
            log::error!("Loader thread panicked");
        }

        for tick in 0..TICKS {
            let ran = self.tasks.run_pending(&mut self.scene);

            let spin = Transform::identity().with_rotation_axis_angle(Vec3::y(), 0.25 * tick as f32);
            self.scene.set_local_transform(self.ring, spin);
            if tick == 2 {
                self.scene.set_visible(self.meshes[1], false);
            }
            self.scene.update_world_matrices();

            log::info!("Tick {tick}: ran {ran} queued tasks, scene at v{}", self.scene.version());
        }

        self.report();
    }

    fn report(&self) {
        for layer in self.scene.layers().iter() {
            log::info!(
                "Layer '{}' ({}): {} members, version {}",
                layer.name(),
                layer.id(),
                layer.content().len(),
                layer.version()
            );
        }
        for shader in [ShaderId::new(1), ShaderId::new(2)] {
            match self.scene.shader_layer(shader) {
                Some(id) => log::info!("{shader} is drawn from layer {id}"),
                None => log::warn!("{shader} has no layer"),
            }
        }
    }
}

/// Engine config from the path given on the command line, or the defaults
fn load_config(path: Option<String>) -> Result<EngineConfig, ConfigError> {
    match path {
        Some(path) => EngineConfig::load_from_file(&path),
        None => Ok(EngineConfig::default()),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(std::env::args().nth(1))?;
    logging::init_with_level(&config.log_level);
    let engine = EngineContext::new(config)?;

    log::info!("Starting scene demo");
    let mut demo = SceneDemo::new(&engine);
    demo.run();
    log::info!("Scene demo finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_argument() {
        let config = load_config(None).unwrap();
        assert_eq!(config.log_level, EngineConfig::default().log_level);
    }

    #[test]
    fn test_config_file_is_read_before_engine_starts() {
        let path = std::env::temp_dir().join(format!("scene_demo_{}.toml", std::process::id()));
        let path = path.to_string_lossy().into_owned();
        EngineConfig::default().with_log_level("debug").save_to_file(&path).unwrap();

        let config = load_config(Some(path.clone())).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(config.log_level, "debug");
        assert!(EngineContext::new(config).is_ok());
    }

    #[test]
    fn test_unknown_extension_is_rejected() {
        assert!(load_config(Some("engine.yaml".to_string())).is_err());
    }
}
