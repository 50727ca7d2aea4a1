//! Run-scoped state shared by every record of one run.

use chrono::{DateTime, Utc};
use storebridge_core::TierPolicy;

use crate::config::{FileSettings, MigrateConfig};
use crate::resolve::KeyResolver;
use crate::shopify::AdminClient;

/// Everything a flow needs besides the record itself.
///
/// Created once per run and dropped with it, so the identifier map never
/// outlives the run that filled it.
#[derive(Debug)]
pub struct RunContext {
    /// Store written to.
    pub target: AdminClient,
    /// Store read from, when the flow has one.
    pub source: Option<AdminClient>,
    /// Target-side key resolution and the run's identifier map.
    pub resolver: KeyResolver<AdminClient>,
    /// Tier thresholds.
    pub tier_policy: TierPolicy,
    /// File upload settings.
    pub files: FileSettings,
    /// Reference time for tier windows and default discount start dates.
    pub now: DateTime<Utc>,
}

impl RunContext {
    /// A context for a run against `target`.
    #[must_use]
    pub fn new(target: AdminClient) -> Self {
        Self {
            resolver: KeyResolver::new(target.clone()),
            target,
            source: None,
            tier_policy: TierPolicy::default(),
            files: FileSettings::default(),
            now: Utc::now(),
        }
    }

    /// Build clients and settings from loaded configuration.
    #[must_use]
    pub fn from_config(config: &MigrateConfig) -> Self {
        let target = AdminClient::new(&config.target, config.retry);
        let mut context = Self::new(target)
            .with_tier_policy(config.tier)
            .with_files(config.files);
        context.source = config
            .source
            .as_ref()
            .map(|source| AdminClient::new(source, config.retry));
        context
    }

    /// Read from `source`.
    #[must_use]
    pub fn with_source(mut self, source: AdminClient) -> Self {
        self.source = Some(source);
        self
    }

    /// Use these tier thresholds.
    #[must_use]
    pub fn with_tier_policy(mut self, policy: TierPolicy) -> Self {
        self.tier_policy = policy;
        self
    }

    /// Use these upload settings.
    #[must_use]
    pub fn with_files(mut self, files: FileSettings) -> Self {
        self.files = files;
        self
    }

    /// Pin the reference time.
    #[must_use]
    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }
}
