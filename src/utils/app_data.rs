use crate::index::types::IndexConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

const APP_NAME: &str = "srcdex";
const CONFIG_FILE: &str = "config.json";
const META_FILE: &str = "meta.json";
const INDEX_FILE: &str = "index.sdx";

/// Overrides the app data directory (used by tests and sandboxed runs)
pub const HOME_ENV: &str = "SRCDEX_HOME";

/// Application configuration stored in the app data directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Settings handed to the index engine
    #[serde(default)]
    pub index: IndexConfig,

    /// Files larger than this are skipped when indexing a tree
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    /// Directory names never descended into
    #[serde(default = "default_ignored_dirs")]
    pub ignored_dirs: Vec<String>,

    /// Read and extract files on the rayon pool
    #[serde(default = "default_parallel_read")]
    pub parallel_read: bool,
}

fn default_max_file_size() -> u64 {
    4 * 1024 * 1024
}

fn default_ignored_dirs() -> Vec<String> {
    [".git", "node_modules", "target", "__pycache__", ".venv", "venv"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_parallel_read() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            index: IndexConfig::default(),
            max_file_size: default_max_file_size(),
            ignored_dirs: default_ignored_dirs(),
            parallel_read: default_parallel_read(),
        }
    }
}

impl AppConfig {
    /// Load config from the app data directory, or return default if not found
    pub fn load() -> Result<Self> {
        Self::load_from(&get_config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(config_path).context("Failed to read config file")?;
        serde_json::from_str(&content).context("Failed to parse config file")
    }

    /// Save config to the app data directory
    pub fn save(&self) -> Result<()> {
        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(get_config_path()?, content).context("Failed to write config file")?;
        Ok(())
    }

    pub fn is_ignored_dir(&self, name: &str) -> bool {
        self.ignored_dirs.iter().any(|d| d == name)
    }
}

/// Get the path to the config file
pub fn get_config_path() -> Result<PathBuf> {
    Ok(get_app_data_dir()?.join(CONFIG_FILE))
}

/// Get the application data directory for storing indexes
pub fn get_app_data_dir() -> Result<PathBuf> {
    let app_dir = match std::env::var_os(HOME_ENV) {
        Some(home) => PathBuf::from(home),
        None => {
            let base = if cfg!(target_os = "macos") {
                dirs::home_dir().map(|h| h.join("Library").join("Application Support"))
            } else if cfg!(target_os = "windows") {
                dirs::data_local_dir()
            } else {
                // Linux/Unix: use XDG_DATA_HOME or ~/.local/share
                dirs::data_dir()
            };
            base.context("Could not determine app data directory")?
                .join(APP_NAME)
        }
    };

    fs::create_dir_all(&app_dir)?;
    Ok(app_dir)
}

/// Get the index directory for a specific source root
pub fn get_index_dir(root_path: &Path) -> Result<PathBuf> {
    let indexes_dir = get_app_data_dir()?.join("indexes");
    fs::create_dir_all(&indexes_dir)?;
    Ok(indexes_dir.join(hash_path(root_path)))
}

/// Durable index file for a source root
pub fn get_index_file(root_path: &Path) -> Result<PathBuf> {
    Ok(get_index_dir(root_path)?.join(INDEX_FILE))
}

/// Hash a path to create a unique folder name
/// Format: first 16 chars of dir name + hash
fn hash_path(path: &Path) -> String {
    let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    let path_str = canonical.to_string_lossy();

    let dir_name = canonical
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("root");

    let sanitized: String = dir_name
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '-' || *c == '_')
        .take(16)
        .collect();

    let mut hasher = DefaultHasher::new();
    path_str.hash(&mut hasher);

    format!("{}-{:016x}", sanitized, hasher.finish())
}

/// Find the root of a source tree starting from a given path
/// Walks up looking for a .git directory, then for a previously indexed root.
pub fn find_source_root(start_path: &Path) -> Result<PathBuf> {
    let start = start_path
        .canonicalize()
        .with_context(|| format!("Invalid path: {}", start_path.display()))?;

    for dir in start.ancestors() {
        if dir.join(".git").exists() {
            return Ok(dir.to_path_buf());
        }
    }
    for dir in start.ancestors() {
        if is_indexed(dir)? {
            return Ok(dir.to_path_buf());
        }
    }

    Ok(start)
}

/// Check if a path has an existing index
pub fn is_indexed(root_path: &Path) -> Result<bool> {
    Ok(get_index_dir(root_path)?.join(META_FILE).exists())
}

/// Per-root bookkeeping written next to the index file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexMeta {
    pub root_path: PathBuf,
    pub created_at: u64,
    pub updated_at: u64,
    /// Indexed files relative to the root, with their modification times
    #[serde(default)]
    pub files: BTreeMap<String, u64>,
}

impl IndexMeta {
    pub fn new(root_path: &Path) -> Self {
        let now = unix_now();
        Self {
            root_path: root_path.to_path_buf(),
            created_at: now,
            updated_at: now,
            files: BTreeMap::new(),
        }
    }

    /// Load the meta file for `root_path`, if one exists
    pub fn load(root_path: &Path) -> Result<Option<Self>> {
        let meta_path = get_index_dir(root_path)?.join(META_FILE);
        if !meta_path.exists() {
            return Ok(None);
        }
        let file = fs::File::open(&meta_path).context("Failed to open meta.json")?;
        let meta = serde_json::from_reader(file).context("Failed to parse meta.json")?;
        Ok(Some(meta))
    }

    pub fn save(&mut self) -> Result<()> {
        self.updated_at = unix_now();
        let index_dir = get_index_dir(&self.root_path)?;
        fs::create_dir_all(&index_dir)?;
        let content = serde_json::to_string_pretty(self).context("Failed to serialize meta.json")?;
        fs::write(index_dir.join(META_FILE), content).context("Failed to write meta.json")?;
        Ok(())
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// List all indexed source roots
pub fn list_indexed_roots() -> Result<Vec<IndexLocation>> {
    let indexes_dir = get_app_data_dir()?.join("indexes");
    if !indexes_dir.exists() {
        return Ok(Vec::new());
    }

    let mut roots = Vec::new();
    for entry in fs::read_dir(&indexes_dir)? {
        let path = entry?.path();
        let meta_path = path.join(META_FILE);
        if !meta_path.is_file() {
            continue;
        }
        let Ok(file) = fs::File::open(&meta_path) else {
            continue;
        };
        if let Ok(meta) = serde_json::from_reader::<_, IndexMeta>(file) {
            roots.push(IndexLocation {
                root_path: meta.root_path,
                index_dir: path,
            });
        }
    }

    roots.sort_by(|a, b| a.root_path.cmp(&b.root_path));
    Ok(roots)
}

/// Remove the index for a source root
pub fn remove_index(root_path: &Path) -> Result<bool> {
    let index_dir = get_index_dir(root_path)?;
    if !index_dir.exists() {
        return Ok(false);
    }
    fs::remove_dir_all(&index_dir)?;
    Ok(true)
}

/// Information about an indexed source root
#[derive(Debug, Clone)]
pub struct IndexLocation {
    pub root_path: PathBuf,
    pub index_dir: PathBuf,
}
