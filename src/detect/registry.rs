use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};

use super::backend::DetectorBackend;
use super::model::{ModelInit, SharedBackend};

/// Registry of detector backends, keyed by name.
pub struct BackendRegistry {
    backends: HashMap<String, SharedBackend>,
    default_name: Option<String>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self {
            backends: HashMap::new(),
            default_name: None,
        }
    }

    /// Register a backend. The first registered backend becomes the default.
    pub fn register<B: DetectorBackend + 'static>(&mut self, backend: B) {
        let name = backend.name().to_string();
        if self.default_name.is_none() {
            self.default_name = Some(name.clone());
        }
        self.backends.insert(name, Arc::new(Mutex::new(backend)));
    }

    /// Set default backend by name.
    pub fn set_default(&mut self, name: &str) -> Result<()> {
        if !self.backends.contains_key(name) {
            return Err(anyhow!("backend '{}' not registered", name));
        }
        self.default_name = Some(name.to_string());
        Ok(())
    }

    /// Get backend by name.
    pub fn get(&self, name: &str) -> Option<SharedBackend> {
        self.backends.get(name).cloned()
    }

    /// Get default backend.
    pub fn default_backend(&self) -> Option<SharedBackend> {
        self.default_name.as_ref().and_then(|name| self.get(name))
    }

    /// List registered backends.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.backends.keys().cloned().collect();
        names.sort();
        names
    }

    /// Initialize a backend (named, or the default) and warm it up.
    ///
    /// Never fails outright: problems are folded into `ModelInit::Unavailable`
    /// and reported when the pipeline is first used.
    pub fn initialize(&self, name: Option<&str>) -> ModelInit {
        let selected = match name {
            Some(name) => self
                .get(name)
                .ok_or_else(|| format!("detector backend '{}' not registered", name)),
            None => self
                .default_backend()
                .ok_or_else(|| "no detector backend registered".to_string()),
        };
        let backend = match selected {
            Ok(backend) => backend,
            Err(reason) => {
                log::error!("{}", reason);
                return ModelInit::unavailable(reason);
            }
        };
        let name = name
            .map(str::to_string)
            .or_else(|| self.default_name.clone())
            .unwrap_or_default();

        let warmed = match backend.lock() {
            Ok(mut guard) => guard.warm_up(),
            Err(_) => Err(anyhow!("backend lock poisoned")),
        };
        match warmed {
            Ok(()) => {
                log::info!("detector backend '{}' ready", name);
                ModelInit::Ready(backend)
            }
            Err(e) => {
                log::error!("detector backend '{}' failed to initialize: {:#}", name, e);
                ModelInit::unavailable(format!("backend '{}' failed to initialize: {:#}", name, e))
            }
        }
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{RawDetection, StubBackend};
    use image::RgbaImage;

    struct ColdModel;

    impl DetectorBackend for ColdModel {
        fn name(&self) -> &'static str {
            "cold"
        }

        fn detect(&mut self, _image: &RgbaImage) -> Result<Vec<RawDetection>> {
            Ok(Vec::new())
        }

        fn warm_up(&mut self) -> Result<()> {
            Err(anyhow!("weights file truncated"))
        }
    }

    #[test]
    fn first_registered_backend_is_default() {
        let mut registry = BackendRegistry::new();
        registry.register(StubBackend::new());
        registry.register(ColdModel);
        assert_eq!(registry.list(), vec!["cold".to_string(), "stub".to_string()]);
        assert!(registry.initialize(None).is_ready());
        assert!(registry.set_default("missing").is_err());
    }

    #[test]
    fn set_default_changes_the_unnamed_backend() {
        let mut registry = BackendRegistry::new();
        registry.register(StubBackend::new());
        registry.register(ColdModel);
        registry.set_default("cold").unwrap();

        let default = registry.default_backend().unwrap();
        assert_eq!(default.lock().unwrap().name(), "cold");
        // the cold model fails its warm-up, so the default is now unavailable
        assert!(!registry.initialize(None).is_ready());
    }

    #[test]
    fn failed_warm_up_yields_unavailable_model() {
        let mut registry = BackendRegistry::new();
        registry.register(ColdModel);
        match registry.initialize(Some("cold")) {
            ModelInit::Unavailable { reason } => assert!(reason.contains("weights file truncated")),
            other => panic!("expected unavailable model, got {:?}", other),
        }
    }

    #[test]
    fn unknown_or_empty_registry_is_unavailable() {
        let empty = BackendRegistry::default();
        assert!(!empty.initialize(None).is_ready());

        let mut registry = BackendRegistry::new();
        registry.register(StubBackend::new());
        assert!(!registry.initialize(Some("onnx")).is_ready());
    }
}
