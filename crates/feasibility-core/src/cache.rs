use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::model::BaseFinancialModel;
use crate::FeasibilityResult;

/// Identity of a loaded source: where it lives and when it last changed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceKey {
    pub path: PathBuf,
    pub modified: Option<DateTime<Utc>>,
}

impl SourceKey {
    pub fn for_path(path: &Path) -> FeasibilityResult<Self> {
        let path = std::fs::canonicalize(path)?;
        let modified = std::fs::metadata(&path)?
            .modified()
            .ok()
            .map(DateTime::<Utc>::from);
        Ok(SourceKey { path, modified })
    }
}

#[derive(Debug)]
struct CachedModel {
    key: SourceKey,
    model: Arc<BaseFinancialModel>,
}

/// Explicit memoization of extracted models.
///
/// Entries are keyed by canonical path and invalidated when the file's
/// modification time changes. Owned by whoever serves requests; there is
/// no process-wide instance.
#[derive(Debug, Default)]
pub struct ModelCache {
    entries: HashMap<PathBuf, CachedModel>,
}

impl ModelCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached model for `path`, loading it with `load` when the
    /// entry is missing or stale.
    pub fn get_or_load<F>(&mut self, path: &Path, load: F) -> FeasibilityResult<Arc<BaseFinancialModel>>
    where
        F: FnOnce(&Path) -> FeasibilityResult<BaseFinancialModel>,
    {
        let key = SourceKey::for_path(path)?;

        if let Some(cached) = self.entries.get(&key.path) {
            if cached.key == key {
                tracing::debug!(path = %key.path.display(), "model cache hit");
                return Ok(Arc::clone(&cached.model));
            }
            tracing::info!(path = %key.path.display(), "source changed, reloading model");
        }

        let model = Arc::new(load(&key.path)?);
        self.entries.insert(
            key.path.clone(),
            CachedModel {
                key,
                model: Arc::clone(&model),
            },
        );
        Ok(model)
    }

    pub fn invalidate(&mut self, path: &Path) -> bool {
        let path = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        self.entries.remove(&path).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::cell::Cell;
    use std::fs::File;
    use std::time::{Duration, SystemTime};

    fn model(name: &str) -> BaseFinancialModel {
        BaseFinancialModel {
            project_name: name.into(),
            base_irr: dec!(0.1),
            reference_npv: Decimal::ZERO,
            years: vec![2025],
            base_cash_flow: vec![dec!(120)],
            base_volumes: vec![dec!(1)],
            investment: dec!(100),
        }
    }

    fn scratch_file(name: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "feasibility-cache-{}-{name}.json",
            std::process::id()
        ));
        std::fs::write(&path, "{}").unwrap();
        path
    }

    #[test]
    fn test_second_load_is_cached() {
        let path = scratch_file("hit");
        let loads = Cell::new(0);
        let mut cache = ModelCache::new();

        let load = |_: &Path| {
            loads.set(loads.get() + 1);
            Ok(model("a"))
        };
        let first = cache.get_or_load(&path, load).unwrap();
        let second = cache.get_or_load(&path, load).unwrap();

        assert_eq!(loads.get(), 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_modified_source_reloads() {
        let path = scratch_file("stale");
        let mut cache = ModelCache::new();

        let first = cache.get_or_load(&path, |_| Ok(model("old"))).unwrap();
        File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(SystemTime::now() + Duration::from_secs(60))
            .unwrap();
        let second = cache.get_or_load(&path, |_| Ok(model("new"))).unwrap();

        assert_eq!(first.project_name, "old");
        assert_eq!(second.project_name, "new");
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_invalidate_forces_reload() {
        let path = scratch_file("invalidate");
        let mut cache = ModelCache::new();
        cache.get_or_load(&path, |_| Ok(model("x"))).unwrap();
        assert!(cache.invalidate(&path));
        assert!(cache.is_empty());
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_failed_load_is_not_cached() {
        let path = scratch_file("fail");
        let mut cache = ModelCache::new();
        let result = cache.get_or_load(&path, |_| {
            Err(crate::FeasibilityError::InsufficientData("broken".into()))
        });
        assert!(result.is_err());
        assert!(cache.is_empty());
        std::fs::remove_file(&path).ok();
    }
}
