use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::error::StoreError;
use crate::models::{Article, ArticleStatus, SeedTopic};

/// Load/save seam for the topic and publication collections.
///
/// A missing record is an empty collection, never an error.
pub trait CollectionStore<T>: Send + Sync {
    fn load(&self) -> Result<T, StoreError>;
    fn save(&self, value: &T) -> Result<(), StoreError>;
}

impl<T, S> CollectionStore<T> for Arc<S>
where
    S: CollectionStore<T> + ?Sized,
{
    fn load(&self) -> Result<T, StoreError> {
        (**self).load()
    }

    fn save(&self, value: &T) -> Result<(), StoreError> {
        (**self).save(value)
    }
}

/// Pretty-printed JSON file, written through a temp file and a rename so a
/// failed write never leaves a truncated collection behind.
#[derive(Debug, Clone)]
pub struct JsonFileStore<T> {
    path: PathBuf,
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonFileStore<T> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _marker: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<T> CollectionStore<T> for JsonFileStore<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    fn load(&self) -> Result<T, StoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %self.path.display(), "Collection file not found, starting empty");
                return Ok(T::default());
            }
            Err(e) => return Err(StoreError::io(&self.path, e)),
        };

        if content.trim().is_empty() {
            return Ok(T::default());
        }

        serde_json::from_str(&content).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    fn save(&self, value: &T) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(value)?;
        write_atomic(&self.path, json.as_bytes())
    }
}

pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
    }
    let temp_path = path.with_extension("json.tmp");
    fs::write(&temp_path, bytes).map_err(|e| StoreError::io(&temp_path, e))?;
    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        StoreError::io(path, e)
    })
}

/// In-process store, used by tests and dry runs. Saves can be made to fail
/// to exercise store-failure handling.
#[derive(Debug, Default)]
pub struct MemoryStore<T> {
    value: Mutex<Option<T>>,
    fail_saves: Mutex<bool>,
    saves: Mutex<usize>,
}

impl<T: Clone> MemoryStore<T> {
    pub fn new() -> Self {
        Self {
            value: Mutex::new(None),
            fail_saves: Mutex::new(false),
            saves: Mutex::new(0),
        }
    }

    pub fn with_value(value: T) -> Self {
        let store = Self::new();
        if let Ok(mut slot) = store.value.lock() {
            *slot = Some(value);
        }
        store
    }

    pub fn set_fail_saves(&self, fail: bool) {
        if let Ok(mut flag) = self.fail_saves.lock() {
            *flag = fail;
        }
    }

    pub fn snapshot(&self) -> Option<T> {
        self.value.lock().ok().and_then(|slot| slot.clone())
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> usize {
        self.saves.lock().map(|n| *n).unwrap_or(0)
    }
}

impl<T> CollectionStore<T> for MemoryStore<T>
where
    T: Clone + Default + Send,
{
    fn load(&self) -> Result<T, StoreError> {
        let slot = self
            .value
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store poisoned".to_string()))?;
        Ok(slot.clone().unwrap_or_default())
    }

    fn save(&self, value: &T) -> Result<(), StoreError> {
        let failing = self.fail_saves.lock().map(|f| *f).unwrap_or(false);
        if failing {
            return Err(StoreError::Unavailable("save rejected".to_string()));
        }
        let mut slot = self
            .value
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store poisoned".to_string()))?;
        *slot = Some(value.clone());
        if let Ok(mut saves) = self.saves.lock() {
            *saves += 1;
        }
        Ok(())
    }
}

/// File-backed store, or with `in_memory` a memory store holding the file's
/// current content so nothing is ever written back.
pub fn open_store<T>(path: PathBuf, in_memory: bool) -> Result<Box<dyn CollectionStore<T>>, StoreError>
where
    T: Serialize + DeserializeOwned + Default + Clone + Send + 'static,
{
    let file = JsonFileStore::new(path);
    if in_memory {
        Ok(Box::new(MemoryStore::with_value(file.load()?)))
    } else {
        Ok(Box::new(file))
    }
}

pub fn topics_path(data_dir: &Path) -> PathBuf {
    data_dir.join("topics.json")
}

pub fn published_path(data_dir: &Path) -> PathBuf {
    data_dir.join("published.json")
}

/// Generated articles go to `articles/`, QA failures to the manual review
/// queue in `review/`.
pub fn save_article(data_dir: &Path, article: &Article) -> Result<PathBuf, StoreError> {
    let folder = match article.status {
        ArticleStatus::QaFailed => "review",
        ArticleStatus::Generated | ArticleStatus::Published => "articles",
    };
    let stem = if article.slug.is_empty() {
        format!("topic-{}", article.topic_id)
    } else {
        article.slug.clone()
    };
    let filepath = data_dir
        .join(folder)
        .join(format!("{}-{}.json", stem, article.created_at.format("%Y%m%d%H%M%S")));

    let json = serde_json::to_string_pretty(article)?;
    write_atomic(&filepath, json.as_bytes())?;
    Ok(filepath)
}

/// Read a curated seed file: a JSON array of topics without ids.
pub fn load_seed_topics(path: &Path) -> Result<Vec<SeedTopic>, StoreError> {
    let content = fs::read_to_string(path).map_err(|e| StoreError::io(path, e))?;
    serde_json::from_str(&content).map_err(|source| StoreError::Corrupt {
        path: path.to_path_buf(),
        source,
    })
}
