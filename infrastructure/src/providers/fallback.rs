//! Fallback gateway: provider chain with circuit breaking.

use super::health::ProviderHealthRegistry;
use super::{ProviderAdapter, ProviderKind};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use stepwise_application::ports::llm_gateway::{GatewayError, LlmGateway, ModelRequest};
use stepwise_domain::{LlmResponse, ModelSpec};
use tracing::{debug, error, warn};

/// [`LlmGateway`] that walks a provider fallback chain.
///
/// The chain is the requested model first, then the default model of every
/// other provider in the fallback order. Providers whose circuit is open
/// are skipped without a network call. The first success wins; its
/// `model` field is set to the `provider:model` key that answered.
pub struct FallbackGateway {
    providers: HashMap<ProviderKind, Arc<dyn ProviderAdapter>>,
    fallback_order: Vec<ProviderKind>,
    default_models: HashMap<ProviderKind, String>,
    health: Arc<ProviderHealthRegistry>,
    attempt_timeout: Option<Duration>,
}

impl FallbackGateway {
    pub fn new(health: Arc<ProviderHealthRegistry>) -> Self {
        Self {
            providers: HashMap::new(),
            fallback_order: Vec::new(),
            default_models: HashMap::new(),
            health,
            attempt_timeout: None,
        }
    }

    /// Register a provider with the model used when falling back to it.
    ///
    /// Providers are appended to the fallback order in registration order
    /// unless an explicit order is set.
    pub fn with_provider(
        mut self,
        provider: Arc<dyn ProviderAdapter>,
        default_model: impl Into<String>,
    ) -> Self {
        let kind = provider.kind();
        if !self.fallback_order.contains(&kind) {
            self.fallback_order.push(kind);
        }
        self.default_models.insert(kind, default_model.into());
        self.providers.insert(kind, provider);
        self
    }

    pub fn with_fallback_order(mut self, order: Vec<ProviderKind>) -> Self {
        let mut deduped = Vec::with_capacity(order.len());
        for kind in order {
            if !deduped.contains(&kind) {
                deduped.push(kind);
            }
        }
        self.fallback_order = deduped;
        self
    }

    pub fn with_attempt_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    pub fn health(&self) -> &Arc<ProviderHealthRegistry> {
        &self.health
    }

    /// Models tried for a request, in order.
    pub fn chain(&self, preferred: &ModelSpec) -> Vec<ModelSpec> {
        let preferred_kind = ProviderKind::from_name(preferred.provider());
        let mut chain = Vec::new();

        match preferred_kind {
            Some(kind) if self.providers.contains_key(&kind) => {
                chain.push(ModelSpec::new(kind.as_str(), preferred.model()));
            }
            _ => warn!(model = %preferred, "No adapter for requested provider; using fallbacks only"),
        }

        for kind in &self.fallback_order {
            if Some(*kind) == preferred_kind || !self.providers.contains_key(kind) {
                continue;
            }
            if let Some(model) = self.default_models.get(kind) {
                chain.push(ModelSpec::new(kind.as_str(), model.as_str()));
            }
        }
        chain
    }

    async fn attempt(
        &self,
        provider: &dyn ProviderAdapter,
        model: &str,
        request: &ModelRequest,
    ) -> Result<LlmResponse, GatewayError> {
        match self.attempt_timeout {
            Some(limit) => tokio::time::timeout(limit, provider.invoke(model, request))
                .await
                .unwrap_or(Err(GatewayError::Timeout)),
            None => provider.invoke(model, request).await,
        }
    }
}

#[async_trait]
impl LlmGateway for FallbackGateway {
    async fn invoke(&self, request: &ModelRequest) -> Result<LlmResponse, GatewayError> {
        let chain = self.chain(&request.model);
        if chain.is_empty() {
            return Err(GatewayError::NotConfigured(format!(
                "no provider available for {}",
                request.model
            )));
        }

        let mut attempts = Vec::new();
        let mut skipped = Vec::new();
        let mut last_error = None;

        for spec in chain {
            let key = spec.key();
            let Some(provider) = ProviderKind::from_name(spec.provider())
                .and_then(|kind| self.providers.get(&kind))
            else {
                continue;
            };

            if !self.health.try_acquire(&key) {
                debug!(provider = %key, "Circuit open; skipping provider");
                skipped.push(key);
                continue;
            }

            match self.attempt(provider.as_ref(), spec.model(), request).await {
                Ok(mut response) => {
                    self.health.record_success(&key);
                    if !attempts.is_empty() {
                        warn!(provider = %key, failed = ?attempts, "Served by fallback provider");
                    }
                    response.model = Some(key);
                    return Ok(response);
                }
                Err(e) => {
                    warn!(provider = %key, error = %e, "Provider call failed");
                    self.health.record_failure(&key);
                    attempts.push(key);
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(last) => {
                error!(attempts = ?attempts, error = %last, "All providers failed");
                Err(GatewayError::AllProvidersFailed {
                    attempts,
                    last: Box::new(last),
                })
            }
            None => {
                warn!(skipped = ?skipped, "Every provider circuit is open");
                Err(GatewayError::AllCircuitsOpen { skipped })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::health::{BreakerConfig, CircuitState};
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    // -- Mock ProviderAdapter --------------------------------------------------

    struct MockProvider {
        kind: ProviderKind,
        script: Mutex<VecDeque<Result<LlmResponse, GatewayError>>>,
        calls: AtomicUsize,
        models: Mutex<Vec<String>>,
        delay: Option<Duration>,
    }

    impl MockProvider {
        fn new(kind: ProviderKind, script: Vec<Result<LlmResponse, GatewayError>>) -> Arc<Self> {
            Arc::new(Self {
                kind,
                script: Mutex::new(script.into()),
                calls: AtomicUsize::new(0),
                models: Mutex::new(Vec::new()),
                delay: None,
            })
        }

        fn slow(kind: ProviderKind, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                kind,
                script: Mutex::new(VecDeque::new()),
                calls: AtomicUsize::new(0),
                models: Mutex::new(Vec::new()),
                delay: Some(delay),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ProviderAdapter for MockProvider {
        fn kind(&self) -> ProviderKind {
            self.kind
        }

        async fn invoke(
            &self,
            model: &str,
            _request: &ModelRequest,
        ) -> Result<LlmResponse, GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.models.lock().unwrap().push(model.to_string());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(LlmResponse::from_text("ok")))
        }
    }

    fn down() -> Result<LlmResponse, GatewayError> {
        Err(GatewayError::ApiError {
            status: 503,
            message: "unavailable".to_string(),
        })
    }

    fn registry(threshold: u32) -> Arc<ProviderHealthRegistry> {
        Arc::new(ProviderHealthRegistry::new(BreakerConfig {
            failure_threshold: threshold,
            timeout: Duration::from_secs(300),
        }))
    }

    fn request() -> ModelRequest {
        ModelRequest::new(ModelSpec::new("anthropic", "claude-opus-4-1"))
    }

    #[test]
    fn test_chain_preferred_then_defaults() {
        let gateway = FallbackGateway::new(registry(3))
            .with_provider(MockProvider::new(ProviderKind::Anthropic, vec![]), "claude-sonnet-4-0")
            .with_provider(MockProvider::new(ProviderKind::OpenAi, vec![]), "gpt-4o");

        let keys: Vec<String> = gateway
            .chain(&ModelSpec::new("anthropic", "claude-opus-4-1"))
            .iter()
            .map(ModelSpec::key)
            .collect();
        assert_eq!(keys, vec!["anthropic:claude-opus-4-1", "openai:gpt-4o"]);

        let keys: Vec<String> = gateway
            .chain(&ModelSpec::new("google-genai", "gemini-2.5-pro"))
            .iter()
            .map(ModelSpec::key)
            .collect();
        assert_eq!(keys, vec!["anthropic:claude-sonnet-4-0", "openai:gpt-4o"]);
    }

    #[tokio::test]
    async fn test_success_on_first_provider() {
        let anthropic = MockProvider::new(ProviderKind::Anthropic, vec![]);
        let openai = MockProvider::new(ProviderKind::OpenAi, vec![]);
        let gateway = FallbackGateway::new(registry(3))
            .with_provider(anthropic.clone(), "claude-sonnet-4-0")
            .with_provider(openai.clone(), "gpt-4o");

        let response = gateway.invoke(&request()).await.unwrap();
        assert_eq!(response.model.as_deref(), Some("anthropic:claude-opus-4-1"));
        assert_eq!(*anthropic.models.lock().unwrap(), vec!["claude-opus-4-1"]);
        assert_eq!(openai.calls(), 0);
    }

    #[tokio::test]
    async fn test_falls_back_on_failure() {
        let anthropic = MockProvider::new(ProviderKind::Anthropic, vec![down()]);
        let openai = MockProvider::new(ProviderKind::OpenAi, vec![]);
        let health = registry(3);
        let gateway = FallbackGateway::new(health.clone())
            .with_provider(anthropic.clone(), "claude-sonnet-4-0")
            .with_provider(openai.clone(), "gpt-4o");

        let response = gateway.invoke(&request()).await.unwrap();
        assert_eq!(response.model.as_deref(), Some("openai:gpt-4o"));
        assert_eq!(anthropic.calls(), 1);
        assert_eq!(health.snapshot()[0].failure_count, 1);
    }

    #[tokio::test]
    async fn test_open_circuit_is_skipped_without_call() {
        let anthropic = MockProvider::new(ProviderKind::Anthropic, vec![down(), down()]);
        let openai = MockProvider::new(ProviderKind::OpenAi, vec![]);
        let health = registry(2);
        let gateway = FallbackGateway::new(health.clone())
            .with_provider(anthropic.clone(), "claude-sonnet-4-0")
            .with_provider(openai.clone(), "gpt-4o");

        gateway.invoke(&request()).await.unwrap();
        gateway.invoke(&request()).await.unwrap();
        assert_eq!(health.state("anthropic:claude-opus-4-1"), CircuitState::Open);

        gateway.invoke(&request()).await.unwrap();
        assert_eq!(anthropic.calls(), 2);
        assert_eq!(openai.calls(), 3);
    }

    #[tokio::test]
    async fn test_all_failed_surfaces_last_error() {
        let gateway = FallbackGateway::new(registry(3))
            .with_provider(MockProvider::new(ProviderKind::Anthropic, vec![down()]), "claude-sonnet-4-0")
            .with_provider(
                MockProvider::new(
                    ProviderKind::OpenAi,
                    vec![Err(GatewayError::ConnectionError("reset".to_string()))],
                ),
                "gpt-4o",
            );

        let err = gateway.invoke(&request()).await.unwrap_err();
        match &err {
            GatewayError::AllProvidersFailed { attempts, .. } => {
                assert_eq!(attempts, &vec!["anthropic:claude-opus-4-1", "openai:gpt-4o"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(matches!(err.root(), GatewayError::ConnectionError(_)));
    }

    #[tokio::test]
    async fn test_all_circuits_open() {
        let health = registry(1);
        health.record_failure("anthropic:claude-opus-4-1");
        health.record_failure("openai:gpt-4o");
        let anthropic = MockProvider::new(ProviderKind::Anthropic, vec![]);
        let gateway = FallbackGateway::new(health)
            .with_provider(anthropic.clone(), "claude-sonnet-4-0")
            .with_provider(MockProvider::new(ProviderKind::OpenAi, vec![]), "gpt-4o");

        let err = gateway.invoke(&request()).await.unwrap_err();
        assert!(matches!(err, GatewayError::AllCircuitsOpen { ref skipped } if skipped.len() == 2));
        assert_eq!(anthropic.calls(), 0);
    }

    #[tokio::test]
    async fn test_attempt_timeout_counts_as_failure() {
        let health = registry(3);
        let gateway = FallbackGateway::new(health.clone())
            .with_provider(
                MockProvider::slow(ProviderKind::Anthropic, Duration::from_secs(5)),
                "claude-sonnet-4-0",
            )
            .with_provider(MockProvider::new(ProviderKind::OpenAi, vec![]), "gpt-4o")
            .with_attempt_timeout(Some(Duration::from_millis(20)));

        let response = gateway.invoke(&request()).await.unwrap();
        assert_eq!(response.model.as_deref(), Some("openai:gpt-4o"));
        assert_eq!(health.snapshot()[0].failure_count, 1);
    }

    #[tokio::test]
    async fn test_explicit_fallback_order() {
        let anthropic = MockProvider::new(ProviderKind::Anthropic, vec![]);
        let openai = MockProvider::new(ProviderKind::OpenAi, vec![]);
        let gateway = FallbackGateway::new(registry(3))
            .with_provider(anthropic.clone(), "claude-sonnet-4-0")
            .with_provider(openai.clone(), "gpt-4o")
            .with_fallback_order(vec![ProviderKind::OpenAi, ProviderKind::Anthropic]);

        let response = gateway
            .invoke(&ModelRequest::new(ModelSpec::new("mistral", "mistral-large")))
            .await
            .unwrap();
        assert_eq!(response.model.as_deref(), Some("openai:gpt-4o"));
        assert_eq!(anthropic.calls(), 0);
    }

    #[tokio::test]
    async fn test_no_providers_is_not_configured() {
        let gateway = FallbackGateway::new(registry(3));
        let err = gateway.invoke(&request()).await.unwrap_err();
        assert!(matches!(err, GatewayError::NotConfigured(_)));
    }
}
