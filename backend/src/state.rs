//! Application state management
//!
//! Shared resources handed to every handler through Axum's state
//! extraction. Every field is cheap to clone: stores, generators and the
//! chat hub sit behind `Arc`, JWT keys are derived once at startup.

use crate::ai::{DisabledPlanGenerator, PlanGenerator};
use crate::auth::JwtService;
use crate::chat_hub::ChatHub;
use crate::config::AppConfig;
use crate::repositories::Storage;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Persistence port (PostgreSQL or in-memory)
    pub store: Arc<dyn Storage>,
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Pre-initialized JWT service with cached keys
    pub jwt: JwtService,
    /// Live chat connections
    pub chat: ChatHub,
    /// AI draft generator
    pub generator: Arc<dyn PlanGenerator>,
    /// Prometheus renderer; absent when no recorder is installed
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create a new application state with AI generation disabled and no
    /// metrics exporter
    pub fn new(store: Arc<dyn Storage>, config: AppConfig) -> Self {
        let jwt = JwtService::new(
            &config.jwt.secret,
            config.jwt.access_token_expiry_secs,
            config.jwt.refresh_token_expiry_secs,
        );

        Self {
            store,
            config: Arc::new(config),
            jwt,
            chat: ChatHub::new(),
            generator: Arc::new(DisabledPlanGenerator),
            metrics: None,
        }
    }

    pub fn with_generator(mut self, generator: Arc<dyn PlanGenerator>) -> Self {
        self.generator = generator;
        self
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    #[inline]
    pub fn store(&self) -> &dyn Storage {
        self.store.as_ref()
    }

    #[inline]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    #[inline]
    pub fn jwt(&self) -> &JwtService {
        &self.jwt
    }

    #[inline]
    pub fn generator(&self) -> &dyn PlanGenerator {
        self.generator.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::MemoryStore;
    use helix_shared::Role;

    fn state() -> AppState {
        AppState::new(Arc::new(MemoryStore::new()), AppConfig::default())
    }

    #[tokio::test]
    async fn test_state_clone_shares_store() {
        let state = state();
        let cloned = state.clone();
        assert!(Arc::ptr_eq(&state.store, &cloned.store));
        assert!(cloned.metrics.is_none());
    }

    #[tokio::test]
    async fn test_jwt_service_is_precomputed() {
        let state = state();
        let token = state
            .jwt()
            .generate_access_token(uuid::Uuid::new_v4(), Role::Admin)
            .unwrap();
        assert!(!token.is_empty());
    }
}
