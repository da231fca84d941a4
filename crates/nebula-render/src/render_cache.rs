//! Lazily built materials shared by node sprites and similarity labels.
//!
//! Materials are keyed by stable identity (poster path, label text) and built
//! once through a [`MaterialFactory`]. Sprites hold a cloned handle plus their
//! own transform and opacity, so replacing or dropping a cache entry never
//! invalidates anything a node owns.

use std::collections::HashMap;
use std::path::PathBuf;

use glam::Vec3;

use crate::texture::TextureError;

/// Errors that can occur while building a material.
#[derive(Debug, thiserror::Error)]
pub enum MaterialError {
    #[error("no poster directory configured")]
    NoPosterDir,

    #[error("poster key '{0}' escapes the poster directory")]
    InvalidKey(String),

    #[error("failed to read poster {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error(transparent)]
    Texture(#[from] TextureError),
}

/// Builds materials on cache misses.
pub trait MaterialFactory {
    type Material: Clone;

    /// Material showing the poster stored under `key`.
    fn poster(&mut self, key: &str) -> Result<Self::Material, MaterialError>;

    /// Material rendering `text` as a floating label.
    fn label(&mut self, text: &str) -> Result<Self::Material, MaterialError>;

    /// Stand-in for nodes without a usable poster.
    fn placeholder(&mut self) -> Result<Self::Material, MaterialError>;
}

/// Lookup counters, reported when the cache is torn down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub poster_hits: u64,
    pub poster_misses: u64,
    pub label_hits: u64,
    pub label_misses: u64,
    /// Posters that failed to load and now resolve to the placeholder.
    pub placeholder_fallbacks: u64,
}

/// Poster and label materials keyed by identity.
#[derive(Debug)]
pub struct RenderObjectCache<M> {
    posters: HashMap<String, M>,
    labels: HashMap<String, M>,
    placeholder: Option<M>,
    stats: CacheStats,
}

impl<M> Default for RenderObjectCache<M> {
    fn default() -> Self {
        Self {
            posters: HashMap::new(),
            labels: HashMap::new(),
            placeholder: None,
            stats: CacheStats::default(),
        }
    }
}

impl<M: Clone> RenderObjectCache<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Material for a node's poster. Nodes without a poster get the
    /// placeholder; a poster that fails to load is cached as the placeholder.
    pub fn poster<F>(&mut self, key: Option<&str>, factory: &mut F) -> Result<M, MaterialError>
    where
        F: MaterialFactory<Material = M>,
    {
        let Some(key) = key.filter(|key| !key.trim().is_empty()) else {
            return self.placeholder(factory);
        };
        if let Some(material) = self.posters.get(key) {
            self.stats.poster_hits += 1;
            return Ok(material.clone());
        }

        self.stats.poster_misses += 1;
        let material = match factory.poster(key) {
            Ok(material) => material,
            Err(err) => {
                log::warn!("Poster '{key}' unavailable, using placeholder: {err}");
                self.stats.placeholder_fallbacks += 1;
                self.placeholder(factory)?
            }
        };
        self.posters.insert(key.to_owned(), material.clone());
        Ok(material)
    }

    /// Material for a label showing `text`.
    pub fn label<F>(&mut self, text: &str, factory: &mut F) -> Result<M, MaterialError>
    where
        F: MaterialFactory<Material = M>,
    {
        if let Some(material) = self.labels.get(text) {
            self.stats.label_hits += 1;
            return Ok(material.clone());
        }
        self.stats.label_misses += 1;
        let material = factory.label(text)?;
        self.labels.insert(text.to_owned(), material.clone());
        Ok(material)
    }

    /// The shared placeholder, built on first use.
    pub fn placeholder<F>(&mut self, factory: &mut F) -> Result<M, MaterialError>
    where
        F: MaterialFactory<Material = M>,
    {
        if let Some(material) = &self.placeholder {
            return Ok(material.clone());
        }
        let material = factory.placeholder()?;
        self.placeholder = Some(material.clone());
        Ok(material)
    }

    /// Cached poster material without building anything.
    pub fn peek_poster(&self, key: &str) -> Option<&M> {
        self.posters.get(key)
    }

    /// Cached label material without building anything.
    pub fn peek_label(&self, text: &str) -> Option<&M> {
        self.labels.get(text)
    }

    #[must_use]
    pub fn poster_count(&self) -> usize {
        self.posters.len()
    }

    #[must_use]
    pub fn label_count(&self) -> usize {
        self.labels.len()
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Drop every cached material. Returns how many entries were released.
    pub fn teardown(&mut self) -> usize {
        let released =
            self.posters.len() + self.labels.len() + usize::from(self.placeholder.is_some());
        log::debug!("Render cache teardown: {released} materials, {:?}", self.stats);
        self.posters.clear();
        self.labels.clear();
        self.placeholder = None;
        released
    }
}

/// Handle of a live label sprite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LabelHandle(u64);

/// A floating label: a shared text material at a world position.
#[derive(Debug, Clone)]
pub struct LabelSprite<M> {
    pub text: String,
    /// `None` when the material could not be built; the label is not drawn.
    pub material: Option<M>,
    pub position: Vec3,
}

/// Live labels keyed by handle. Materials come from the label cache, so
/// labels with the same text share one material across hovers.
#[derive(Debug)]
pub struct LabelOverlays<M> {
    live: HashMap<LabelHandle, LabelSprite<M>>,
    next: u64,
}

impl<M> Default for LabelOverlays<M> {
    fn default() -> Self {
        Self {
            live: HashMap::new(),
            next: 0,
        }
    }
}

impl<M: Clone> LabelOverlays<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a label showing `text` at `position`.
    pub fn spawn<F>(
        &mut self,
        cache: &mut RenderObjectCache<M>,
        factory: &mut F,
        text: &str,
        position: Vec3,
    ) -> LabelHandle
    where
        F: MaterialFactory<Material = M>,
    {
        let material = match cache.label(text, factory) {
            Ok(material) => Some(material),
            Err(err) => {
                log::error!("Could not build label '{text}': {err}");
                None
            }
        };
        let handle = LabelHandle(self.next);
        self.next += 1;
        self.live.insert(
            handle,
            LabelSprite {
                text: text.to_owned(),
                material,
                position,
            },
        );
        handle
    }

    /// Drop one label. Returns `false` for an unknown handle.
    pub fn dispose(&mut self, handle: LabelHandle) -> bool {
        self.live.remove(&handle).is_some()
    }

    pub fn get(&self, handle: LabelHandle) -> Option<&LabelSprite<M>> {
        self.live.get(&handle)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LabelSprite<M>> {
        self.live.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.live.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    pub fn clear(&mut self) {
        self.live.clear();
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Materials are plain strings describing what was built.
    #[derive(Default)]
    pub(crate) struct CountingFactory {
        pub built: Vec<String>,
        pub missing: Vec<&'static str>,
    }

    impl MaterialFactory for CountingFactory {
        type Material = String;

        fn poster(&mut self, key: &str) -> Result<String, MaterialError> {
            if self.missing.iter().any(|missing| *missing == key) {
                return Err(MaterialError::InvalidKey(key.to_owned()));
            }
            self.built.push(format!("poster:{key}"));
            Ok(format!("poster:{key}"))
        }

        fn label(&mut self, text: &str) -> Result<String, MaterialError> {
            self.built.push(format!("label:{text}"));
            Ok(format!("label:{text}"))
        }

        fn placeholder(&mut self) -> Result<String, MaterialError> {
            self.built.push("placeholder".into());
            Ok("placeholder".into())
        }
    }
}
