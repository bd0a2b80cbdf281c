//! Store connection settings and retry timing.

use aws_config::{BehaviorVersion, Region, timeout::TimeoutConfig};
use aws_sdk_dynamodb::Client;
use rand::Rng;
use std::time::Duration;

/// Attempts made by [`Model::atomic_action`](crate::Model::atomic_action) when none are given.
pub const ATOMIC_ACTION_MAX_ATTEMPTS: u32 = 5;

/// Upper bound (exclusive) of the random pause between atomic action attempts.
pub const ATOMIC_ACTION_MAX_DELAY: Duration = Duration::from_millis(100);

/// Where and how to reach the store.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct StoreConfig {
    /// Region override; the environment's region when `None`.
    pub region: Option<String>,
    /// Endpoint override, e.g. `http://127.0.0.1:4566` for LocalStack.
    pub endpoint_url: Option<String>,
    /// Per-operation timeout in milliseconds.
    pub timeout_ms: Option<u64>,
}

/// Builds a store client from the environment's AWS configuration plus `config`'s overrides.
///
/// ```rust,no_run
/// use dynamodb_model::{Client, config};
///
/// # async fn example() {
/// let store = config::load_store(&config::StoreConfig {
///     endpoint_url: Some("http://127.0.0.1:4566".to_string()),
///     ..Default::default()
/// })
/// .await;
/// let client = Client::new(store);
/// # }
/// ```
pub async fn load_store(config: &StoreConfig) -> Client {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(region) = &config.region {
        loader = loader.region(Region::new(region.clone()));
    }
    if let Some(endpoint_url) = &config.endpoint_url {
        loader = loader.endpoint_url(endpoint_url);
    }
    if let Some(timeout_ms) = config.timeout_ms {
        let timeout_config = TimeoutConfig::builder()
            .operation_timeout(Duration::from_millis(timeout_ms))
            .build();
        loader = loader.timeout_config(timeout_config);
    }
    let sdk_config = loader.load().await;
    Client::new(&sdk_config)
}

/// Randomized exponential backoff between batch rounds.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BackoffConfig {
    /// Ceiling of the first pause.
    pub initial_delay: Duration,
    /// Ceiling of any pause.
    pub max_delay: Duration,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl BackoffConfig {
    /// Ceiling of the pause before retry number `attempt` (0-based).
    pub fn ceiling(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.initial_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// A pause drawn uniformly from `[0, ceiling(attempt))`.
    pub fn delay(&self, attempt: u32) -> Duration {
        random_delay(self.ceiling(attempt))
    }
}

/// A duration drawn uniformly from `[0, max)`.
pub(crate) fn random_delay(max: Duration) -> Duration {
    max.mul_f64(rand::thread_rng().gen_range(0.0..1.0))
}
