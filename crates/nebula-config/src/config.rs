//! Configuration structs with sensible defaults and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Directory name used under the platform config root.
const CONFIG_DIR_NAME: &str = "nebula-explorer";

/// Top-level explorer configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Window settings.
    pub window: WindowConfig,
    /// Similarity graph construction.
    pub graph: GraphConfig,
    /// Rendering settings.
    pub render: RenderConfig,
    /// Camera navigation.
    pub camera: CameraConfig,
    /// Hover highlight appearance.
    pub highlight: HighlightConfig,
    /// Input settings.
    pub input: InputConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Window configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WindowConfig {
    /// Window width in logical pixels.
    pub width: u32,
    /// Window height in logical pixels.
    pub height: u32,
    /// Start in fullscreen mode.
    pub fullscreen: bool,
    /// Enable vsync (PresentMode::Fifo).
    pub vsync: bool,
    /// Window title.
    pub title: String,
}

/// Which similarity measure the graph builder uses per pair.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum SimilaritySetting {
    /// Embedding cosine when both entities carry vectors, tag Jaccard otherwise.
    #[default]
    Auto,
    /// Always embedding cosine.
    Embedding,
    /// Always tag Jaccard.
    Tags,
}

/// Similarity graph configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GraphConfig {
    /// Maximum number of entities that become nodes.
    pub max_nodes: usize,
    /// Pairs strictly above this similarity are linked.
    pub threshold: f32,
    /// Minimum similarity assigned to orphan rescue links.
    pub rescue_floor: f32,
    /// Similarity measure selection.
    pub similarity: SimilaritySetting,
    /// Entity list JSON file. A mock catalogue is generated when unset.
    pub entities: Option<PathBuf>,
    /// Search results JSON file used to filter the graph.
    pub search: Option<PathBuf>,
    /// Size of the generated mock catalogue.
    pub mock_count: usize,
    /// Seed of the generated mock catalogue.
    pub mock_seed: u64,
}

/// Rendering configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RenderConfig {
    /// Draw the animated shader background.
    pub background: bool,
    /// Fragment shader file replacing the built-in background.
    pub background_shader: Option<PathBuf>,
    /// Directory poster keys are resolved against.
    pub poster_dir: Option<PathBuf>,
    /// World units per unit of node size.
    pub node_scale: f32,
    /// Radius of the static spherical layout.
    pub layout_radius: f32,
    /// Node tint as linear RGB.
    pub node_color: [f32; 3],
    /// Link tint as linear RGB.
    pub link_color: [f32; 3],
    /// Tint of search-result placeholders as linear RGB.
    pub result_color: [f32; 3],
    /// World height of highlight labels.
    pub label_height: f32,
}

/// Easing curve used by camera flights.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum CameraEasing {
    Linear,
    EaseIn,
    EaseOut,
    #[default]
    EaseInOut,
}

/// Camera configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CameraConfig {
    /// Vertical field of view in degrees.
    pub fov_y_degrees: f32,
    /// Starting distance from the origin.
    pub start_distance: f32,
    /// Distance kept between the camera and a selected node.
    pub fly_distance: f32,
    /// Duration of a camera flight in milliseconds.
    pub fly_duration_ms: u64,
    /// Sideways offset applied to the flight destination.
    pub lateral_offset: f32,
    /// Easing curve of the flight.
    pub easing: CameraEasing,
}

/// Hover highlight configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HighlightConfig {
    /// Opacity of nodes outside the focus neighbourhood.
    pub dim_node_opacity: f32,
    /// Opacity of links not touching the focused node.
    pub dim_link_opacity: f32,
    /// Label height above a neighbour, in multiples of its size.
    pub label_margin: f32,
    /// Screen-space pick radius in pixels.
    pub pick_radius_px: f32,
}

/// Input configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InputConfig {
    /// Scale applied to mouse deltas fed into the shader movement uniform.
    pub mouse_move_scale: f32,
    /// Radians of orbit per pixel of drag.
    pub orbit_sensitivity: f32,
    /// Fraction of the camera distance moved per wheel line.
    pub zoom_sensitivity: f32,
    /// Invert Y axis for orbiting.
    pub invert_y: bool,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Show FPS in the window title.
    pub show_fps: bool,
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
}

// --- Default implementations ---

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            fullscreen: false,
            vsync: true,
            title: "Nebula Explorer".to_string(),
        }
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            max_nodes: 100,
            threshold: 0.65,
            rescue_floor: 0.1,
            similarity: SimilaritySetting::Auto,
            entities: None,
            search: None,
            mock_count: 500,
            mock_seed: 42,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            background: true,
            background_shader: None,
            poster_dir: None,
            node_scale: 2.0,
            layout_radius: 120.0,
            node_color: [0.0, 0.953, 1.0],
            link_color: [0.6, 0.7, 1.0],
            result_color: [1.0, 0.62, 0.2],
            label_height: 3.0,
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_y_degrees: 60.0,
            start_distance: 320.0,
            fly_distance: 40.0,
            fly_duration_ms: 3000,
            lateral_offset: 0.0,
            easing: CameraEasing::EaseInOut,
        }
    }
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            dim_node_opacity: 0.12,
            dim_link_opacity: 0.02,
            label_margin: 1.5,
            pick_radius_px: 18.0,
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            mouse_move_scale: 0.1,
            orbit_sensitivity: 0.005,
            zoom_sensitivity: 0.1,
            invert_y: false,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            show_fps: false,
            log_level: "info".to_string(),
        }
    }
}

// --- Load / Save / Reload ---

impl Config {
    /// Platform config directory, e.g. `~/.config/nebula-explorer` on Linux.
    ///
    /// Falls back to the working directory when the platform has none.
    pub fn default_dir() -> PathBuf {
        dirs::config_dir()
            .map(|dir| dir.join(CONFIG_DIR_NAME))
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join("config.ron");

        if config_path.exists() {
            let config = read_config(&config_path)?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        let config_path = config_dir.join("config.ron");
        std::fs::create_dir_all(config_dir).map_err(|source| ConfigError::Write {
            path: config_dir.to_path_buf(),
            source,
        })?;

        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::Serialize)?;

        std::fs::write(&config_path, serialized).map_err(|source| ConfigError::Write {
            path: config_path.clone(),
            source,
        })?;
        Ok(())
    }

    /// Hot-reload: returns `Some(new_config)` if the file changed, `None` otherwise.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let config_path = config_dir.join("config.ron");
        let new_config = read_config(&config_path)?;

        if &new_config != self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }
}

fn read_config(path: &Path) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    ron::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
