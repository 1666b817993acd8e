//! Startup orchestration.

use serde_json::Value;
use tokio::task::JoinHandle;

use crate::cache::ExpiringCache;
use crate::error::Result;
use crate::lifecycle::Shutdown;
use crate::settings::Settings;
use crate::store::{ConfigStore, Reloadable, StoreOptions};

/// A running set of hot-reloaded documents.
pub struct Agent {
    store: ConfigStore,
    documents: Vec<Reloadable<Value>>,
    shutdown: Shutdown,
}

impl Agent {
    /// Build the store, load every configured document and install watchers.
    pub fn start(settings: &Settings) -> Result<Self> {
        let cache = ExpiringCache::with_default_ttl(settings.cache.default_ttl());
        let store = ConfigStore::with_cache(StoreOptions::from(&settings.store), cache);

        let mut documents = Vec::with_capacity(settings.watch.descriptors.len());
        for entry in &settings.watch.descriptors {
            let mut descriptor = store.descriptor(entry.file_name.clone());
            if let Some(environment) = &entry.environment {
                descriptor = descriptor.with_environment(environment.clone());
            }

            let document = Reloadable::load(store.clone(), descriptor)?;
            if document.get().is_none() {
                tracing::warn!(
                    path = %document.descriptor().base_path().display(),
                    "Config document absent at startup"
                );
            }
            if settings.watch.enabled {
                document.watch(settings.watch.debounce())?;
            }
            documents.push(document);
        }

        tracing::info!(
            base_dir = %store.options().base_dir.display(),
            documents = documents.len(),
            watching = settings.watch.enabled,
            "Agent started"
        );
        Ok(Self {
            store,
            documents,
            shutdown: Shutdown::new(),
        })
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    pub fn documents(&self) -> &[Reloadable<Value>] {
        &self.documents
    }

    /// Re-read every document. Returns how many produced a new snapshot.
    pub fn reload_all(&self) -> usize {
        self.documents.iter().filter(|d| d.reload()).count()
    }

    /// Start one reload reporter per document. Requires a Tokio runtime.
    pub fn spawn_reporters(&self) -> Vec<JoinHandle<()>> {
        self.documents
            .iter()
            .map(|document| self.shutdown.spawn_reporter(document))
            .collect()
    }

    /// Stop the reporters and remove every watcher installed by this agent.
    pub fn stop(&self) {
        self.shutdown.trigger();
        for document in &self.documents {
            document.unwatch();
        }
        tracing::info!("Agent stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::schema::DescriptorSettings;
    use serde_json::json;

    #[test]
    fn test_start_loads_configured_documents() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("app.json"), r#"{"db": {"host": "base", "port": 1}}"#).unwrap();
        std::fs::write(dir.path().join("app.prod.json"), r#"{"db": {"port": 2}}"#).unwrap();

        let mut settings = Settings::default();
        settings.store.base_dir = dir.path().to_path_buf();
        settings.watch.enabled = false;
        settings.watch.descriptors = vec![
            DescriptorSettings { file_name: "app.json".into(), environment: Some("prod".into()) },
            DescriptorSettings { file_name: "missing.json".into(), environment: None },
        ];

        let agent = Agent::start(&settings).unwrap();
        assert_eq!(agent.documents().len(), 2);
        assert_eq!(
            *agent.documents()[0].get().unwrap(),
            json!({"db": {"host": "base", "port": 2}})
        );
        assert!(agent.documents()[1].get().is_none());
        let desc = agent.documents()[0].descriptor();
        assert!(!agent.store().is_watching(desc));

        std::fs::write(dir.path().join("missing.json"), r#"{"late": true}"#).unwrap();
        assert_eq!(agent.reload_all(), 2);
        assert_eq!(*agent.documents()[1].get().unwrap(), json!({"late": true}));
    }

    #[tokio::test]
    async fn test_stop_ends_reporters_and_watchers() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("app.json"), r#"{"v": 1}"#).unwrap();

        let mut settings = Settings::default();
        settings.store.base_dir = dir.path().to_path_buf();
        settings.watch.descriptors = vec![DescriptorSettings {
            file_name: "app.json".into(),
            environment: None,
        }];

        let agent = Agent::start(&settings).unwrap();
        let desc = agent.documents()[0].descriptor().clone();
        assert!(agent.store().is_watching(&desc));

        let reporters = agent.spawn_reporters();
        assert_eq!(reporters.len(), 1);

        agent.stop();
        for reporter in reporters {
            reporter.await.unwrap();
        }
        assert!(!agent.store().is_watching(&desc));
    }
}
