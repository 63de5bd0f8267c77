use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{ProviderError, RouterError};
use crate::models::ProviderKind;
use crate::providers::{GenerationOptions, GenerationProvider};

/// Text produced by one router call, with the provider that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    pub text: String,
    pub provider: ProviderKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProviderUsage {
    pub provider: ProviderKind,
    pub calls: u64,
    pub percentage: f64,
}

/// `total_calls` and the per-provider shares count article generations only.
/// Follow-up requests made for an article (meta description, exam questions)
/// are counted in `auxiliary_calls`.
#[derive(Debug, Clone, PartialEq)]
pub struct UsageReport {
    pub total_calls: u64,
    pub auxiliary_calls: u64,
    pub last_used: ProviderKind,
    pub providers: Vec<ProviderUsage>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Purpose {
    Article,
    Auxiliary,
}

/// Alternates between exactly two providers, with one cross-provider
/// failover per call.
pub struct ProviderRouter {
    providers: HashMap<ProviderKind, Arc<dyn GenerationProvider>>,
    last_used: ProviderKind,
    usage: HashMap<ProviderKind, u64>,
    auxiliary_calls: u64,
    timeout: Duration,
}

impl ProviderRouter {
    /// `openai` and `claude` must report the matching [`ProviderKind`].
    pub fn new(
        openai: Arc<dyn GenerationProvider>,
        claude: Arc<dyn GenerationProvider>,
        timeout: Duration,
    ) -> Self {
        let mut providers = HashMap::new();
        providers.insert(ProviderKind::OpenAi, openai);
        providers.insert(ProviderKind::Claude, claude);

        Self {
            providers,
            // First call goes to Claude.
            last_used: ProviderKind::OpenAi,
            usage: HashMap::new(),
            auxiliary_calls: 0,
            timeout,
        }
    }

    pub fn with_last_used(mut self, last_used: ProviderKind) -> Self {
        self.last_used = last_used;
        self
    }

    pub fn last_used(&self) -> ProviderKind {
        self.last_used
    }

    /// Provider the next call without a preference would use.
    pub fn next_provider(&self) -> ProviderKind {
        self.last_used.other()
    }

    pub async fn call(
        &mut self,
        prompt: &str,
        options: &GenerationOptions,
        preferred: Option<ProviderKind>,
    ) -> Result<Generation, RouterError> {
        self.route(prompt, options, preferred, Purpose::Article).await
    }

    /// Same routing as [`call`](Self::call), but kept out of the article usage shares.
    pub async fn call_auxiliary(
        &mut self,
        prompt: &str,
        options: &GenerationOptions,
        preferred: Option<ProviderKind>,
    ) -> Result<Generation, RouterError> {
        self.route(prompt, options, preferred, Purpose::Auxiliary).await
    }

    async fn route(
        &mut self,
        prompt: &str,
        options: &GenerationOptions,
        preferred: Option<ProviderKind>,
        purpose: Purpose,
    ) -> Result<Generation, RouterError> {
        let primary = preferred.unwrap_or_else(|| self.next_provider());

        let primary_error = match self.attempt(primary, prompt, options, purpose).await {
            Ok(text) => return Ok(Generation { text, provider: primary }),
            Err(e) => e,
        };

        let fallback = primary.other();
        tracing::warn!(
            provider = %primary,
            fallback = %fallback,
            transient = primary_error.is_transient(),
            error = %primary_error,
            "Provider failed, retrying with alternate provider"
        );

        match self.attempt(fallback, prompt, options, purpose).await {
            Ok(text) => Ok(Generation { text, provider: fallback }),
            Err(fallback_error) => {
                tracing::error!(provider = %fallback, error = %fallback_error, "Fallback provider failed");
                Err(RouterError {
                    primary,
                    primary_error,
                    fallback,
                    fallback_error,
                })
            }
        }
    }

    async fn attempt(
        &mut self,
        kind: ProviderKind,
        prompt: &str,
        options: &GenerationOptions,
        purpose: Purpose,
    ) -> Result<String, ProviderError> {
        self.last_used = kind;
        let provider = self
            .providers
            .get(&kind)
            .cloned()
            .ok_or_else(|| ProviderError::Rejected(format!("{} provider not configured", kind)))?;

        let text = match tokio::time::timeout(self.timeout, provider.generate(prompt, options)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(ProviderError::Transient(format!(
                    "timed out after {}s",
                    self.timeout.as_secs()
                )))
            }
        };

        match purpose {
            Purpose::Article => *self.usage.entry(kind).or_insert(0) += 1,
            Purpose::Auxiliary => self.auxiliary_calls += 1,
        }
        tracing::info!(provider = %kind, purpose = ?purpose, "Provider call succeeded");
        Ok(text)
    }

    pub fn usage(&self) -> UsageReport {
        let total: u64 = self.usage.values().sum();
        let providers = [ProviderKind::OpenAi, ProviderKind::Claude]
            .into_iter()
            .map(|provider| {
                let calls = self.usage.get(&provider).copied().unwrap_or(0);
                let percentage = if total > 0 {
                    calls as f64 / total as f64 * 100.0
                } else {
                    0.0
                };
                ProviderUsage {
                    provider,
                    calls,
                    percentage,
                }
            })
            .collect();

        UsageReport {
            total_calls: total,
            auxiliary_calls: self.auxiliary_calls,
            last_used: self.last_used,
            providers,
        }
    }
}
