//! Application state shared by request handlers and the inspection commands.

use std::collections::BTreeMap;
use std::sync::Arc;

use solo_core::{AuditLog, Caller, PermissionEntry, PermissionOracle, PublicationController};
use solo_storage::{FileStore, MemoryStore, RecordStore, StorageError};
use tracing::info;

use crate::config::SoloConfig;

pub(crate) type Controller = PublicationController<dyn RecordStore>;

pub(crate) struct AppState {
    /// One controller per section, keyed by section name.
    pub(crate) controllers: BTreeMap<String, Controller>,
    /// API token → caller.
    pub(crate) tokens: BTreeMap<String, Caller>,
    pub(crate) permissions: Vec<PermissionEntry>,
}

impl AppState {
    pub(crate) async fn from_config(config: &SoloConfig) -> Result<Self, StorageError> {
        let store: Arc<dyn RecordStore> = match &config.storage.path {
            Some(path) => {
                info!(path = %path.display(), "using file storage");
                Arc::new(FileStore::open(path).await?)
            }
            None => {
                info!("using in-memory storage");
                Arc::new(MemoryStore::new())
            }
        };
        Ok(Self::with_store(config, store))
    }

    pub(crate) fn with_store(config: &SoloConfig, store: Arc<dyn RecordStore>) -> Self {
        let oracle: Arc<dyn PermissionOracle> = Arc::new(config.grant_table());
        let controllers = config
            .sections
            .iter()
            .map(|section| {
                let controller = PublicationController::new(store.clone(), section.clone(), oracle.clone())
                    .with_hook(Arc::new(AuditLog));
                (section.name.clone(), controller)
            })
            .collect();
        Self {
            controllers,
            tokens: config.tokens().into_iter().collect(),
            permissions: solo_core::provide_permissions(&config.sections),
        }
    }

    pub(crate) fn controller(&self, section: &str) -> Option<&Controller> {
        self.controllers.get(section)
    }

    pub(crate) fn caller_for_token(&self, token: &str) -> Option<&Caller> {
        self.tokens.get(token)
    }
}
