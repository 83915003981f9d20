use crate::config::RuntimeConfig;
use futures::future::join_all;
use futures::FutureExt;
use orchcore::{AdapterError, FrameworkAdapter, FrameworkMetadata, FrameworkType, RegistryError};
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Lifecycle of a registered adapter. Removal from the registry is the
/// terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterState {
    Registered,
    Initialized,
    ShuttingDown,
}

struct Entry {
    adapter: Arc<dyn FrameworkAdapter>,
    metadata: FrameworkMetadata,
    state: AdapterState,
}

/// Adapters that failed to shut down; every adapter was still asked to.
#[derive(Debug, Default)]
pub struct ShutdownReport {
    pub shut_down: Vec<FrameworkType>,
    pub failures: Vec<(FrameworkType, AdapterError)>,
}

impl ShutdownReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Registry of execution backends keyed by framework type.
///
/// Safe to share behind `Arc`: registration happens at startup while lookups
/// run on every request.
pub struct FrameworkRegistry {
    entries: RwLock<BTreeMap<FrameworkType, Entry>>,
}

impl FrameworkRegistry {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<FrameworkType, Entry>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<FrameworkType, Entry>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register an adapter. A second adapter for the same framework type is
    /// rejected, never swapped in.
    pub fn register(&self, adapter: Arc<dyn FrameworkAdapter>) -> Result<(), RegistryError> {
        let framework = adapter.framework_type().clone();
        let mut entries = self.write();

        if entries.contains_key(&framework) {
            tracing::error!("Framework adapter for {} is already registered", framework);
            return Err(RegistryError::DuplicateFramework(framework));
        }

        let metadata = adapter.metadata().clone();
        entries.insert(
            framework.clone(),
            Entry {
                adapter,
                metadata,
                state: AdapterState::Registered,
            },
        );
        tracing::info!("Registered framework adapter: {}", framework);
        Ok(())
    }

    pub fn unregister(&self, framework: &FrameworkType) {
        if self.write().remove(framework).is_none() {
            tracing::warn!("Framework adapter for {} is not registered", framework);
            return;
        }
        tracing::info!("Unregistered framework adapter: {}", framework);
    }

    pub fn get(&self, framework: &FrameworkType) -> Option<Arc<dyn FrameworkAdapter>> {
        self.read().get(framework).map(|e| e.adapter.clone())
    }

    pub fn is_supported(&self, framework: &FrameworkType) -> bool {
        self.read().contains_key(framework)
    }

    pub fn state(&self, framework: &FrameworkType) -> Option<AdapterState> {
        self.read().get(framework).map(|e| e.state)
    }

    /// Registered framework types, sorted.
    pub fn list(&self) -> Vec<FrameworkType> {
        self.read().keys().cloned().collect()
    }

    pub fn list_metadata(&self) -> Vec<FrameworkMetadata> {
        self.read().values().map(|e| e.metadata.clone()).collect()
    }

    pub fn metadata(&self, framework: &FrameworkType) -> Option<FrameworkMetadata> {
        self.read().get(framework).map(|e| e.metadata.clone())
    }

    pub fn require_support(&self, framework: &FrameworkType) -> Result<(), RegistryError> {
        if self.is_supported(framework) {
            Ok(())
        } else {
            Err(RegistryError::UnsupportedFramework(framework.clone()))
        }
    }

    /// The adapter an execution may be routed to. Only initialized adapters
    /// qualify.
    pub fn dispatch_target(
        &self,
        framework: &FrameworkType,
    ) -> Result<Arc<dyn FrameworkAdapter>, RegistryError> {
        let entries = self.read();
        let entry = entries
            .get(framework)
            .ok_or_else(|| RegistryError::UnsupportedFramework(framework.clone()))?;

        match entry.state {
            AdapterState::Initialized => Ok(entry.adapter.clone()),
            AdapterState::Registered => Err(RegistryError::NotInitialized(framework.clone())),
            AdapterState::ShuttingDown => {
                Err(RegistryError::UnsupportedFramework(framework.clone()))
            }
        }
    }

    fn snapshot(&self) -> Vec<(FrameworkType, Arc<dyn FrameworkAdapter>)> {
        self.read()
            .iter()
            .map(|(framework, e)| (framework.clone(), e.adapter.clone()))
            .collect()
    }

    /// Initialize every registered adapter concurrently. All attempts run to
    /// completion; the call fails if any of them failed.
    pub async fn initialize_all(&self, config: &RuntimeConfig) -> Result<(), RegistryError> {
        let adapters = self.snapshot();

        let outcomes = join_all(adapters.into_iter().map(|(framework, adapter)| {
            let options = config.adapter_options(&framework);
            async move {
                let outcome = guarded(adapter.initialize(&options)).await;
                match &outcome {
                    Ok(()) => tracing::info!("Initialized framework: {}", framework),
                    Err(e) => tracing::error!("Failed to initialize framework {}: {}", framework, e),
                }
                (framework, outcome)
            }
        }))
        .await;

        let mut failures = Vec::new();
        {
            let mut entries = self.write();
            for (framework, outcome) in outcomes {
                match outcome {
                    Ok(()) => {
                        if let Some(entry) = entries.get_mut(&framework) {
                            entry.state = AdapterState::Initialized;
                        }
                    }
                    Err(e) => failures.push((framework, e)),
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(RegistryError::InitializationFailed { failures })
        }
    }

    /// Shut every adapter down concurrently. A failing adapter never keeps
    /// the others from shutting down; all entries are removed afterwards.
    pub async fn shutdown_all(&self) -> ShutdownReport {
        let adapters = {
            let mut entries = self.write();
            for entry in entries.values_mut() {
                entry.state = AdapterState::ShuttingDown;
            }
            entries
                .iter()
                .map(|(framework, e)| (framework.clone(), e.adapter.clone()))
                .collect::<Vec<_>>()
        };

        let outcomes = join_all(adapters.into_iter().map(|(framework, adapter)| async move {
            let outcome = guarded(adapter.shutdown()).await;
            match &outcome {
                Ok(()) => tracing::info!("Shutdown framework: {}", framework),
                Err(e) => tracing::error!("Failed to shutdown framework {}: {}", framework, e),
            }
            (framework, outcome)
        }))
        .await;

        let mut report = ShutdownReport::default();
        {
            let mut entries = self.write();
            for (framework, outcome) in outcomes {
                entries.remove(&framework);
                match outcome {
                    Ok(()) => report.shut_down.push(framework),
                    Err(e) => report.failures.push((framework, e)),
                }
            }
        }

        report
    }
}

/// Lifecycle calls run side by side; a panicking adapter must not take its
/// siblings down with it.
async fn guarded<F>(call: F) -> Result<(), AdapterError>
where
    F: std::future::Future<Output = Result<(), AdapterError>>,
{
    AssertUnwindSafe(call)
        .catch_unwind()
        .await
        .unwrap_or_else(|_| Err(AdapterError::Fault("adapter panicked".to_string())))
}

impl Default for FrameworkRegistry {
    fn default() -> Self {
        Self::new()
    }
}
