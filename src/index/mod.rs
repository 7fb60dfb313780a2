//! Class Repository
//!
//! Read-only access to the structural extractor's persisted output:
//!
//! ```text
//! <parse_dir>/
//! ├── classNameMap.json          {"Calc": ["com.x.Calc"], ...}
//! └── class/
//!     └── com/x/Calc.json        one serialized ClassInfo per class
//! ```
//!
//! ## Design
//!
//! - Class files are discovered once at open; contents load on first use
//! - Loaded classes are cached in a `DashMap` shared by all jobs
//! - A missing `classNameMap.json` is rebuilt from the discovered class files

use dashmap::DashMap;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::constants::layout::{CLASS_INFO_DIR, CLASS_NAME_MAP};
use crate::types::{ClassInfo, ForgeError, Result};

// =============================================================================
// Class Resolution
// =============================================================================

/// Outcome of resolving a user-supplied class name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassResolution {
    Found(String),
    NotFound,
    /// More than one class shares the simple name
    Ambiguous(Vec<String>),
}

impl ClassResolution {
    /// Convert into the fully-qualified name, or the matching error
    pub fn into_result(self, name: &str) -> Result<String> {
        match self {
            Self::Found(fqn) => Ok(fqn),
            Self::NotFound => Err(ForgeError::ClassNotFound(name.to_string())),
            Self::Ambiguous(candidates) => Err(ForgeError::AmbiguousClass {
                name: name.to_string(),
                candidates,
            }),
        }
    }
}

// =============================================================================
// Repository Trait
// =============================================================================

pub trait ClassRepository: Send + Sync {
    /// ClassInfo for a fully-qualified name
    fn class_info(&self, fqn: &str) -> Result<Option<Arc<ClassInfo>>>;

    /// Simple name -> fully-qualified names
    fn simple_names(&self) -> &BTreeMap<String, Vec<String>>;

    /// Every known fully-qualified class name, sorted
    fn all_classes(&self) -> Vec<String>;

    /// A name containing `.` is already qualified and returned unchanged
    fn resolve(&self, name: &str) -> ClassResolution {
        if name.contains('.') {
            return ClassResolution::Found(name.to_string());
        }
        match self.simple_names().get(name).map(Vec::as_slice) {
            None | Some([]) => ClassResolution::NotFound,
            Some([only]) => ClassResolution::Found(only.clone()),
            Some(many) => {
                let mut candidates = many.to_vec();
                candidates.sort();
                ClassResolution::Ambiguous(candidates)
            }
        }
    }
}

/// Shared repository type for concurrent access across jobs
pub type SharedRepository = Arc<dyn ClassRepository>;

// =============================================================================
// Filesystem Repository
// =============================================================================

pub struct FsClassRepository {
    files: BTreeMap<String, PathBuf>,
    simple_names: BTreeMap<String, Vec<String>>,
    cache: DashMap<String, Arc<ClassInfo>>,
}

impl FsClassRepository {
    pub fn open(parse_dir: &Path) -> Result<Self> {
        let class_dir = parse_dir.join(CLASS_INFO_DIR);
        if !class_dir.is_dir() {
            return Err(ForgeError::Config(format!(
                "Structural metadata not found at {}. Run the extractor first",
                class_dir.display()
            )));
        }

        let files = discover_class_files(&class_dir)?;
        debug!("Discovered {} class files under {}", files.len(), class_dir.display());

        let map_path = parse_dir.join(CLASS_NAME_MAP);
        let simple_names = if map_path.exists() {
            let content = std::fs::read_to_string(&map_path)?;
            serde_json::from_str(&content).map_err(|e| ForgeError::Parse {
                message: e.to_string(),
                path: map_path.display().to_string(),
            })?
        } else {
            warn!(
                "{} missing; rebuilding simple-name index from class files",
                map_path.display()
            );
            index_simple_names(files.keys())
        };

        Ok(Self {
            files,
            simple_names,
            cache: DashMap::new(),
        })
    }
}

impl ClassRepository for FsClassRepository {
    fn class_info(&self, fqn: &str) -> Result<Option<Arc<ClassInfo>>> {
        if let Some(cached) = self.cache.get(fqn) {
            return Ok(Some(cached.value().clone()));
        }
        let Some(path) = self.files.get(fqn) else {
            return Ok(None);
        };

        let content = std::fs::read_to_string(path)?;
        let info: ClassInfo = serde_json::from_str(&content).map_err(|e| ForgeError::Parse {
            message: e.to_string(),
            path: path.display().to_string(),
        })?;
        let info = Arc::new(info);
        self.cache.insert(fqn.to_string(), info.clone());
        Ok(Some(info))
    }

    fn simple_names(&self) -> &BTreeMap<String, Vec<String>> {
        &self.simple_names
    }

    fn all_classes(&self) -> Vec<String> {
        self.files.keys().cloned().collect()
    }
}

/// `class/com/x/Calc.json` and `class/com.x.Calc.json` both map to `com.x.Calc`
fn discover_class_files(class_dir: &Path) -> Result<BTreeMap<String, PathBuf>> {
    let pattern = class_dir.join("**").join("*.json");
    let pattern = pattern.to_string_lossy();
    let entries = glob::glob(&pattern).map_err(|e| ForgeError::Parse {
        message: e.to_string(),
        path: pattern.to_string(),
    })?;

    let mut files = BTreeMap::new();
    for entry in entries {
        let path = match entry {
            Ok(path) => path,
            Err(e) => {
                warn!("Skipping unreadable class file: {}", e);
                continue;
            }
        };
        let Ok(relative) = path.strip_prefix(class_dir) else {
            continue;
        };
        let fqn = relative
            .with_extension("")
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(".");
        files.insert(fqn, path);
    }
    Ok(files)
}

fn index_simple_names<'a>(fqns: impl Iterator<Item = &'a String>) -> BTreeMap<String, Vec<String>> {
    let mut index: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for fqn in fqns {
        let simple = fqn.rsplit('.').next().unwrap_or(fqn);
        index.entry(simple.to_string()).or_default().push(fqn.clone());
    }
    index
}

// =============================================================================
// In-Memory Repository (tests)
// =============================================================================

#[cfg(test)]
pub(crate) struct InMemoryClassRepository {
    classes: BTreeMap<String, Arc<ClassInfo>>,
    simple_names: BTreeMap<String, Vec<String>>,
}

#[cfg(test)]
impl InMemoryClassRepository {
    pub fn new(classes: impl IntoIterator<Item = ClassInfo>) -> Self {
        let classes: BTreeMap<String, Arc<ClassInfo>> = classes
            .into_iter()
            .map(|c| (c.full_name(), Arc::new(c)))
            .collect();
        let simple_names = index_simple_names(classes.keys());
        Self {
            classes,
            simple_names,
        }
    }
}

#[cfg(test)]
impl ClassRepository for InMemoryClassRepository {
    fn class_info(&self, fqn: &str) -> Result<Option<Arc<ClassInfo>>> {
        Ok(self.classes.get(fqn).cloned())
    }

    fn simple_names(&self) -> &BTreeMap<String, Vec<String>> {
        &self.simple_names
    }

    fn all_classes(&self) -> Vec<String> {
        self.classes.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::model::fixtures::calc;
    use std::fs;
    use tempfile::TempDir;

    fn write_class(dir: &Path, relative: &str, info: &ClassInfo) {
        let path = dir.join(CLASS_INFO_DIR).join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, serde_json::to_string(info).unwrap()).unwrap();
    }

    #[test]
    fn test_resolution_rules() {
        let other = ClassInfo {
            package: "org.y".to_string(),
            ..calc()
        };
        let unique = ClassInfo {
            class_name: "Util".to_string(),
            ..calc()
        };
        let repo = InMemoryClassRepository::new([calc(), other, unique]);

        assert_eq!(
            repo.resolve("com.x.Anything"),
            ClassResolution::Found("com.x.Anything".to_string())
        );
        assert_eq!(
            repo.resolve("Util"),
            ClassResolution::Found("com.x.Util".to_string())
        );
        assert_eq!(repo.resolve("Nope"), ClassResolution::NotFound);
        assert_eq!(
            repo.resolve("Calc"),
            ClassResolution::Ambiguous(vec!["com.x.Calc".to_string(), "org.y.Calc".to_string()])
        );
    }

    #[test]
    fn test_resolution_into_result() {
        let err = ClassResolution::Ambiguous(vec!["a.Foo".into(), "b.Foo".into()])
            .into_result("Foo")
            .unwrap_err();
        assert!(err.is_fatal());

        let err = ClassResolution::NotFound.into_result("Foo").unwrap_err();
        assert!(err.is_job_not_found());
    }

    #[test]
    fn test_fs_repository_loads_and_caches() {
        let temp_dir = TempDir::new().unwrap();
        write_class(temp_dir.path(), "com/x/Calc.json", &calc());
        fs::write(
            temp_dir.path().join(CLASS_NAME_MAP),
            r#"{"Calc": ["com.x.Calc"]}"#,
        )
        .unwrap();

        let repo = FsClassRepository::open(temp_dir.path()).unwrap();
        assert_eq!(repo.all_classes(), vec!["com.x.Calc".to_string()]);

        let first = repo.class_info("com.x.Calc").unwrap().unwrap();
        assert_eq!(first.class_name, "Calc");
        assert_eq!(first.methods[0].id, "3");

        let second = repo.class_info("com.x.Calc").unwrap().unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        assert!(repo.class_info("com.x.Missing").unwrap().is_none());
    }

    #[test]
    fn test_fs_repository_rebuilds_missing_name_map() {
        let temp_dir = TempDir::new().unwrap();
        write_class(temp_dir.path(), "com.x.Calc.json", &calc());

        let repo = FsClassRepository::open(temp_dir.path()).unwrap();
        assert_eq!(
            repo.resolve("Calc"),
            ClassResolution::Found("com.x.Calc".to_string())
        );
    }

    #[test]
    fn test_fs_repository_requires_class_dir() {
        let temp_dir = TempDir::new().unwrap();
        assert!(FsClassRepository::open(temp_dir.path()).is_err());
    }

    #[test]
    fn test_malformed_class_file_is_parse_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(CLASS_INFO_DIR).join("com/x/Bad.json");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{not json").unwrap();

        let repo = FsClassRepository::open(temp_dir.path()).unwrap();
        let err = repo.class_info("com.x.Bad").unwrap_err();
        assert!(matches!(err, ForgeError::Parse { .. }));
    }
}
