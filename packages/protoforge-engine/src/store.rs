use crate::compiler::{Bundle, MARKUP_FILE, compile};
use crate::config::GenerationConfig;
use crate::schema::Specification;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

const MANIFEST_FILE: &str = "manifest.json";

/// Where a bundle ended up after being stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredBundle {
    pub public_url: String,
    pub path: PathBuf,
}

/// Persistence collaborator for compiled bundles.
#[async_trait]
pub trait BundleStore: Send + Sync {
    async fn store(&self, owner: &str, bundle: &Bundle) -> Result<StoredBundle>;

    /// Removes a previously stored bundle. Missing paths are not an error.
    async fn delete(&self, path: &Path) -> Result<()>;
}

/// Last published state for one owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub slug: String,
    pub public_url: String,
    pub path: PathBuf,
    pub published_at: String,
    pub spec: Specification,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedBundle {
    pub slug: String,
    pub public_url: String,
    pub path: PathBuf,
    /// True when the stored bundle already matched and nothing was rewritten.
    pub reused: bool,
}

/// Stores bundles as `<root>/<owner>/<slug>/{index.html,styles.css,app.js}`.
#[derive(Debug, Clone)]
pub struct FsBundleStore {
    root: PathBuf,
    public_base_url: String,
}

impl FsBundleStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: &str) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &GenerationConfig) -> Self {
        Self::new(&config.output_dir, &config.public_base_url)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn owner_dir(&self, owner: &str) -> Result<PathBuf> {
        let valid = !owner.is_empty()
            && owner
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            anyhow::bail!("Invalid owner id '{}': use letters, digits, '-' or '_'", owner);
        }
        Ok(self.root.join(owner))
    }

    fn public_url(&self, owner: &str, slug: &str) -> String {
        format!("{}/{}/{}/{}", self.public_base_url, owner, slug, MARKUP_FILE)
    }

    pub async fn load_manifest(&self, owner: &str) -> Result<Option<Manifest>> {
        let path = self.owner_dir(owner)?.join(MANIFEST_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let manifest = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(Some(manifest))
    }

    /// Compiles and stores `spec` for `owner` unless the last published
    /// specification is identical and its files are still on disk.
    pub async fn publish(&self, owner: &str, spec: &Specification) -> Result<PublishedBundle> {
        let previous = self.load_manifest(owner).await?;
        let unchanged = previous
            .as_ref()
            .filter(|m| m.spec == *spec && m.path.join(MARKUP_FILE).exists());
        if let Some(manifest) = unchanged {
            debug!("Bundle for {} unchanged, reusing {}", owner, manifest.slug);
            return Ok(PublishedBundle {
                slug: manifest.slug.clone(),
                public_url: manifest.public_url.clone(),
                path: manifest.path.clone(),
                reused: true,
            });
        }

        let bundle = compile(spec);
        let stored = self.store(owner, &bundle).await?;
        if let Some(old) = previous.filter(|m| m.path != stored.path) {
            self.delete(&old.path).await?;
        }

        let manifest = Manifest {
            slug: bundle.slug.clone(),
            public_url: stored.public_url.clone(),
            path: stored.path.clone(),
            published_at: chrono::Utc::now().to_rfc3339(),
            spec: spec.clone(),
        };
        let manifest_path = self.owner_dir(owner)?.join(MANIFEST_FILE);
        fs::write(&manifest_path, serde_json::to_string_pretty(&manifest)?)
            .await
            .with_context(|| format!("Failed to write {}", manifest_path.display()))?;

        info!("Published {} for {} at {}", bundle.slug, owner, stored.public_url);
        Ok(PublishedBundle {
            slug: bundle.slug,
            public_url: stored.public_url,
            path: stored.path,
            reused: false,
        })
    }

    /// Removes everything published for `owner`. Returns false when there was
    /// nothing to remove.
    pub async fn delete_owner(&self, owner: &str) -> Result<bool> {
        let dir = self.owner_dir(owner)?;
        if !dir.exists() {
            return Ok(false);
        }
        fs::remove_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to remove {}", dir.display()))?;
        info!("Deleted published bundles for {}", owner);
        Ok(true)
    }
}

#[async_trait]
impl BundleStore for FsBundleStore {
    async fn store(&self, owner: &str, bundle: &Bundle) -> Result<StoredBundle> {
        let dir = self.owner_dir(owner)?.join(&bundle.slug);
        fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create {}", dir.display()))?;

        for (name, contents) in bundle.files() {
            let path = dir.join(name);
            fs::write(&path, contents)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }

        Ok(StoredBundle {
            public_url: self.public_url(owner, &bundle.slug),
            path: dir,
        })
    }

    async fn delete(&self, path: &Path) -> Result<()> {
        let inside = path
            .strip_prefix(&self.root)
            .is_ok_and(|rest| rest.components().all(|c| c != Component::ParentDir));
        if !inside {
            anyhow::bail!("Refusing to delete {} outside {}", path.display(), self.root.display());
        }
        if path.exists() {
            fs::remove_dir_all(path)
                .await
                .with_context(|| format!("Failed to remove {}", path.display()))?;
        }
        Ok(())
    }
}
