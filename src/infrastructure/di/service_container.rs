//! Service container for dependency injection
//!
//! Wires up all services with their dependencies.

use std::sync::Arc;

use crate::application::services::{QueryService, StorageService};
use crate::config::Settings;
use crate::infrastructure::traits::{Console, FileSystem, RealFileSystem, StdConsole};

/// Container holding all application services.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Filesystem abstraction
    pub fs: Arc<dyn FileSystem>,

    /// User interaction
    pub console: Arc<dyn Console>,

    pub storage: StorageService,
    pub query: QueryService,
}

impl ServiceContainer {
    /// Create a new service container with real implementations.
    pub fn new(settings: Settings) -> Self {
        Self::with_deps(settings, Arc::new(RealFileSystem), Arc::new(StdConsole))
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(
        settings: Settings,
        fs: Arc<dyn FileSystem>,
        console: Arc<dyn Console>,
    ) -> Self {
        let settings = Arc::new(settings);
        let storage = StorageService::new(fs.clone(), settings.clone());
        let query = QueryService::new(console.clone(), settings.clone());

        Self {
            settings,
            fs,
            console,
            storage,
            query,
        }
    }
}
