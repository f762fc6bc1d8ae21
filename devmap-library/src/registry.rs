//! Versioned Library Registry
//!
//! Hosts several loaded catalogs side by side, e.g. the bundled default and a
//! user workspace library, each under a name and a dotted version. Libraries
//! are handed out as `Arc<DeviceLibrary>` so a project can keep borrowing the
//! catalog it was mapped against while a newer version is registered.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use devmap_core::DeviceLibrary;

use crate::{bundled, LibraryError, LibraryResult, VERSION};

/// Name the bundled library is registered under
pub const DEFAULT_LIBRARY: &str = "default";

/// Thread-safe library registry with version tracking
#[derive(Debug, Default)]
pub struct LibraryRegistry {
    /// Libraries indexed by `name@version`
    libraries: RwLock<HashMap<String, Arc<DeviceLibrary>>>,

    /// Registered versions per name, in registration order
    versions: RwLock<HashMap<String, Vec<String>>>,

    /// Highest version per name
    latest: RwLock<HashMap<String, String>>,
}

impl LibraryRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `library` as `name` at `version`
    ///
    /// Registering the same name and version twice is an error; the first
    /// library stays in place.
    pub fn register(
        &self,
        name: &str,
        version: &str,
        library: DeviceLibrary,
    ) -> LibraryResult<Arc<DeviceLibrary>> {
        let key = qualified(name, version);
        let library = Arc::new(library);
        {
            let mut libraries = self.libraries.write().map_err(|_| LibraryError::Poisoned)?;
            if libraries.contains_key(&key) {
                log::warn!("Library {} already registered, keeping the first", key);
                return Err(LibraryError::Duplicate(key));
            }
            libraries.insert(key.clone(), Arc::clone(&library));
        }
        {
            let mut versions = self.versions.write().map_err(|_| LibraryError::Poisoned)?;
            versions.entry(name.to_string()).or_default().push(version.to_string());
        }
        {
            let mut latest = self.latest.write().map_err(|_| LibraryError::Poisoned)?;
            let newer = latest
                .get(name)
                .map_or(true, |current| compare_versions(version, current) == Ordering::Greater);
            if newer {
                latest.insert(name.to_string(), version.to_string());
            }
        }
        log::debug!(
            "Registered library {} ({} devices)",
            key,
            library.device_count()
        );
        Ok(library)
    }

    /// Library by name and exact version
    pub fn get(&self, name: &str, version: &str) -> LibraryResult<Arc<DeviceLibrary>> {
        let key = qualified(name, version);
        let libraries = self.libraries.read().map_err(|_| LibraryError::Poisoned)?;
        libraries.get(&key).cloned().ok_or(LibraryError::NotFound(key))
    }

    /// Highest registered version of `name`
    pub fn get_latest(&self, name: &str) -> LibraryResult<Arc<DeviceLibrary>> {
        let version = {
            let latest = self.latest.read().map_err(|_| LibraryError::Poisoned)?;
            latest
                .get(name)
                .cloned()
                .ok_or_else(|| LibraryError::NotFound(format!("no versions of {}", name)))?
        };
        self.get(name, &version)
    }

    /// Versions registered under `name`, in registration order
    pub fn versions(&self, name: &str) -> LibraryResult<Vec<String>> {
        let versions = self.versions.read().map_err(|_| LibraryError::Poisoned)?;
        Ok(versions.get(name).cloned().unwrap_or_default())
    }

    /// Register the bundled library as `default` at the crate version
    pub fn load_defaults(&self) -> LibraryResult<Arc<DeviceLibrary>> {
        self.register(DEFAULT_LIBRARY, VERSION, bundled()?)
    }
}

fn qualified(name: &str, version: &str) -> String {
    format!("{}@{}", name, version)
}

/// Compare dotted versions numerically, component by component
///
/// Components that are not numbers fall back to string order, so `1.10`
/// sorts above `1.9` and `1.0-beta` still has a stable place.
fn compare_versions(a: &str, b: &str) -> Ordering {
    let mut left = a.split('.');
    let mut right = b.split('.');
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (Some(_), None) => return Ordering::Greater,
            (None, Some(_)) => return Ordering::Less,
            (Some(x), Some(y)) => {
                let order = match (x.parse::<u64>(), y.parse::<u64>()) {
                    (Ok(x), Ok(y)) => x.cmp(&y),
                    _ => x.cmp(y),
                };
                if order != Ordering::Equal {
                    return order;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty() -> DeviceLibrary {
        DeviceLibrary::builder().build()
    }

    #[test]
    fn register_and_retrieve() {
        let registry = LibraryRegistry::new();
        registry.register("workspace", "1.0", empty()).unwrap();
        assert!(registry.get("workspace", "1.0").is_ok());
        assert_eq!(
            registry.get("workspace", "2.0").unwrap_err(),
            LibraryError::NotFound("workspace@2.0".into())
        );
    }

    #[test]
    fn version_tracking() {
        let registry = LibraryRegistry::new();
        registry.register("workspace", "1.9", empty()).unwrap();
        registry.register("workspace", "1.10", empty()).unwrap();
        registry.register("workspace", "1.2", empty()).unwrap();

        assert_eq!(registry.versions("workspace").unwrap(), ["1.9", "1.10", "1.2"]);
        let latest = registry.get_latest("workspace").unwrap();
        assert!(Arc::ptr_eq(&latest, &registry.get("workspace", "1.10").unwrap()));
        assert!(registry.versions("other").unwrap().is_empty());
    }

    #[test]
    fn duplicate_keeps_first() {
        let registry = LibraryRegistry::new();
        let first = registry.register("workspace", "1.0", empty()).unwrap();
        assert_eq!(
            registry.register("workspace", "1.0", empty()).unwrap_err(),
            LibraryError::Duplicate("workspace@1.0".into())
        );
        assert!(Arc::ptr_eq(&first, &registry.get("workspace", "1.0").unwrap()));
        assert_eq!(registry.versions("workspace").unwrap().len(), 1);
    }

    #[test]
    fn defaults_load_bundled() {
        let registry = LibraryRegistry::new();
        registry.load_defaults().unwrap();
        let library = registry.get_latest(DEFAULT_LIBRARY).unwrap();
        assert!(library.device_count() > 0);
    }

    #[test]
    fn versions_compare_numerically() {
        assert_eq!(compare_versions("1.10", "1.9"), Ordering::Greater);
        assert_eq!(compare_versions("1.0", "1.0.1"), Ordering::Less);
        assert_eq!(compare_versions("2.0", "2.0"), Ordering::Equal);
    }
}
