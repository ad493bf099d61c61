// Dynamic option providers
// Registry of named providers and a loader that bounds each load with a timeout

use crate::form::{EnumOption, Field, FieldKind, FieldValues};

use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinSet;

/// Default time a provider gets before its load is abandoned
pub const DEFAULT_LOAD_TIMEOUT: Duration = Duration::from_millis(30_000);

/// Failure reported by a provider
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ProviderError {
    pub message: String,
}

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// What a provider sees when asked for options
#[derive(Debug, Clone, Default)]
pub struct OptionsContext {
    pub repository_path: Option<PathBuf>,
    pub token_values: FieldValues,
}

/// Source of options for `dynamic-enum` fields
#[async_trait::async_trait]
pub trait OptionsProvider: Send + Sync {
    async fn provide_options(&self, context: &OptionsContext)
        -> Result<Vec<EnumOption>, ProviderError>;
}

/// Providers keyed by id
#[derive(Default)]
pub struct ProviderRegistry {
    providers: RwLock<HashMap<String, Arc<dyn OptionsProvider>>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `provider` under `id`, returning any provider it replaces
    pub fn register(
        &self,
        id: impl Into<String>,
        provider: Arc<dyn OptionsProvider>,
    ) -> Option<Arc<dyn OptionsProvider>> {
        let id = id.into();
        tracing::debug!(provider = %id, "registered options provider");
        self.providers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, provider)
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn OptionsProvider>> {
        self.providers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    pub fn unregister(&self, id: &str) -> Option<Arc<dyn OptionsProvider>> {
        self.providers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
    }

    pub fn clear(&self) {
        self.providers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn len(&self) -> usize {
        self.providers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let providers = self.providers.read().unwrap_or_else(PoisonError::into_inner);
        let mut ids: Vec<&String> = providers.keys().collect();
        ids.sort();
        f.debug_struct("ProviderRegistry")
            .field("providers", &ids)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct LoadOptionsRequest {
    pub token_name: String,
    pub provider_id: String,
    pub context: OptionsContext,
}

/// Result of one load: options on success, otherwise an error message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadOptionsResponse {
    pub token_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<EnumOption>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LoadOptionsResponse {
    fn success(token_name: String, options: Vec<EnumOption>) -> Self {
        Self {
            token_name,
            options: Some(options),
            error: None,
        }
    }

    fn failure(token_name: String, error: impl Into<String>) -> Self {
        Self {
            token_name,
            options: None,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.options.is_some()
    }
}

pub struct OptionsLoader;

impl OptionsLoader {
    /// Load options for one field.
    ///
    /// The provider future is dropped when the timeout fires, so no work
    /// outlives the call.
    pub async fn load(
        registry: &ProviderRegistry,
        request: LoadOptionsRequest,
        timeout: Duration,
    ) -> LoadOptionsResponse {
        let provider = registry.get(&request.provider_id);
        Self::load_from(provider, request, timeout).await
    }

    async fn load_from(
        provider: Option<Arc<dyn OptionsProvider>>,
        request: LoadOptionsRequest,
        timeout: Duration,
    ) -> LoadOptionsResponse {
        let LoadOptionsRequest {
            token_name,
            provider_id,
            context,
        } = request;

        let Some(provider) = provider else {
            tracing::warn!(provider = %provider_id, token = %token_name, "options provider not found");
            return LoadOptionsResponse::failure(
                token_name,
                format!(
                    "provider \"{}\" not found; make sure the extension that supplies it is installed and active",
                    provider_id
                ),
            );
        };

        match tokio::time::timeout(timeout, provider.provide_options(&context)).await {
            Ok(Ok(options)) => {
                tracing::debug!(token = %token_name, count = options.len(), "loaded options");
                LoadOptionsResponse::success(token_name, options)
            }
            Ok(Err(err)) => {
                tracing::warn!(token = %token_name, error = %err, "options provider failed");
                let message = if err.message.is_empty() {
                    "failed to load options".to_string()
                } else {
                    err.message
                };
                LoadOptionsResponse::failure(token_name, message)
            }
            Err(_) => {
                tracing::warn!(token = %token_name, timeout_ms = timeout.as_millis() as u64, "options load timed out");
                LoadOptionsResponse::failure(
                    token_name,
                    format!("loading options timed out ({}ms)", timeout.as_millis()),
                )
            }
        }
    }

    /// Load every `dynamic-enum` field that names a provider, concurrently.
    ///
    /// Responses come back in field order regardless of completion order.
    pub async fn load_all(
        registry: &ProviderRegistry,
        fields: &[Field],
        context: &OptionsContext,
        timeout: Duration,
    ) -> Vec<LoadOptionsResponse> {
        let requests: Vec<LoadOptionsRequest> = fields
            .iter()
            .filter(|field| field.kind == FieldKind::DynamicEnum)
            .filter_map(|field| {
                field.provider.as_ref().map(|provider_id| LoadOptionsRequest {
                    token_name: field.name.clone(),
                    provider_id: provider_id.clone(),
                    context: context.clone(),
                })
            })
            .collect();

        let mut tasks = JoinSet::new();
        for (index, request) in requests.iter().enumerate() {
            let provider = registry.get(&request.provider_id);
            let request = request.clone();
            tasks.spawn(async move { (index, Self::load_from(provider, request, timeout).await) });
        }

        let mut responses: Vec<Option<LoadOptionsResponse>> = vec![None; requests.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, response)) => responses[index] = Some(response),
                Err(err) => tracing::error!(error = %err, "options load task failed"),
            }
        }

        responses
            .into_iter()
            .zip(requests)
            .map(|(response, request)| {
                response.unwrap_or_else(|| {
                    LoadOptionsResponse::failure(request.token_name, "failed to load options")
                })
            })
            .collect()
    }
}
