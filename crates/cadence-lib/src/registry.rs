//! Process-wide model registry.
//!
//! Engine plugins register a factory under a name at load time; a
//! `Pipeline` configured with `EngineChoice::Model` looks the name up and
//! calls the factory lazily. Concurrency-safe via a plain `Mutex` around the
//! map rather than a dedicated DI crate.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, LazyLock, Mutex};

use cadence_core::types::AudioSpec;

use crate::engine::{DummyEngine, Engine};

type FactoryOutput = Pin<Box<dyn Future<Output = anyhow::Result<Arc<dyn Engine>>> + Send>>;
type Factory = Arc<dyn Fn(HashMap<String, String>) -> FactoryOutput + Send + Sync>;

/// Maps model names to engine factories.
pub struct ModelRegistry {
    factories: Mutex<HashMap<String, Factory>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        let registry = Self {
            factories: Mutex::new(HashMap::new()),
        };
        registry.register("dummy", |_kwargs| {
            Box::pin(async { Ok(Arc::new(DummyEngine::default()) as Arc<dyn Engine>) }) as FactoryOutput
        });
        registry
    }

    /// Registers a factory under `name`, overwriting any previous
    /// registration for that name.
    pub fn register<F>(&self, name: &str, factory: F)
    where
        F: Fn(HashMap<String, String>) -> FactoryOutput + Send + Sync + 'static,
    {
        self.factories
            .lock()
            .expect("model registry mutex poisoned")
            .insert(name.to_string(), Arc::new(factory));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories
            .lock()
            .expect("model registry mutex poisoned")
            .contains_key(name)
    }

    /// Builds an engine from the factory registered under `name`.
    ///
    /// Callers are expected to have checked [`Self::contains`] first;
    /// `build` itself still returns a normal error for an unknown name so it
    /// is safe to call directly.
    pub async fn build(&self, name: &str, kwargs: HashMap<String, String>) -> anyhow::Result<Arc<dyn Engine>> {
        let factory = {
            let guard = self.factories.lock().expect("model registry mutex poisoned");
            guard.get(name).cloned()
        };
        match factory {
            Some(factory) => factory(kwargs).await,
            None => Err(anyhow::anyhow!("no model registered under the name '{name}'")),
        }
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// The process-wide registry, populated with the built-in `dummy` engine at
/// first access. Engine plugins elsewhere in a binary register themselves
/// here at startup.
pub static GLOBAL_REGISTRY: LazyLock<ModelRegistry> = LazyLock::new(ModelRegistry::new);

/// Convenience helper: builds the default `dummy` engine at a given spec,
/// for callers that don't need the full registry path.
pub fn dummy_engine(spec: AudioSpec) -> Arc<dyn Engine> {
    Arc::new(DummyEngine::new(spec))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dummy_is_registered_by_default() {
        let registry = ModelRegistry::new();
        assert!(registry.contains("dummy"));
        let engine = registry.build("dummy", HashMap::new()).await.unwrap();
        let chunk = engine.synth("hi", None).await.unwrap();
        assert!(!chunk.data.is_empty());
    }

    #[tokio::test]
    async fn unknown_model_is_an_error() {
        let registry = ModelRegistry::new();
        assert!(!registry.contains("nonexistent"));
        assert!(registry.build("nonexistent", HashMap::new()).await.is_err());
    }

    #[tokio::test]
    async fn register_overwrites_existing_name() {
        let registry = ModelRegistry::new();
        registry.register("dummy", |_kwargs| {
            Box::pin(async { Ok(Arc::new(DummyEngine::new(AudioSpec::pcm(8_000, 1, 16))) as Arc<dyn Engine>) }) as FactoryOutput
        });
        let engine = registry.build("dummy", HashMap::new()).await.unwrap();
        let chunk = engine.synth("hi", None).await.unwrap();
        assert_eq!(chunk.spec.sample_rate, 8_000);
    }
}
