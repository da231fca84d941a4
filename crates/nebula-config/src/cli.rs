//! Command-line argument parsing for the explorer.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Nebula explorer command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "nebula", about = "3D movie similarity explorer")]
pub struct CliArgs {
    /// Window width.
    #[arg(long)]
    pub width: Option<u32>,

    /// Window height.
    #[arg(long)]
    pub height: Option<u32>,

    /// Start in fullscreen.
    #[arg(long)]
    pub fullscreen: Option<bool>,

    /// Entity list JSON file.
    #[arg(long)]
    pub entities: Option<PathBuf>,

    /// Search results JSON file; the graph is filtered to these results.
    #[arg(long)]
    pub search: Option<PathBuf>,

    /// Size of the generated catalogue when no entity file is given.
    #[arg(long)]
    pub mock: Option<usize>,

    /// Maximum number of graph nodes.
    #[arg(long)]
    pub max_nodes: Option<usize>,

    /// Similarity threshold for links.
    #[arg(long)]
    pub threshold: Option<f32>,

    /// Poster image directory.
    #[arg(long)]
    pub posters: Option<PathBuf>,

    /// Fragment shader file for the background.
    #[arg(long)]
    pub shader: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(w) = args.width {
            self.window.width = w;
        }
        if let Some(h) = args.height {
            self.window.height = h;
        }
        if let Some(fs) = args.fullscreen {
            self.window.fullscreen = fs;
        }
        if let Some(ref path) = args.entities {
            self.graph.entities = Some(path.clone());
        }
        if let Some(ref path) = args.search {
            self.graph.search = Some(path.clone());
        }
        if let Some(count) = args.mock {
            self.graph.mock_count = count;
        }
        if let Some(max) = args.max_nodes {
            self.graph.max_nodes = max;
        }
        if let Some(t) = args.threshold {
            self.graph.threshold = t;
        }
        if let Some(ref dir) = args.posters {
            self.render.poster_dir = Some(dir.clone());
        }
        if let Some(ref path) = args.shader {
            self.render.background_shader = Some(path.clone());
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}
