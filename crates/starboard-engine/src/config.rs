use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, bail};

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Votes needed for promotion in a quiet community.
    pub min_threshold: u32,
    /// Applied (rounding up) to a community's threshold on every promotion.
    pub growth_factor: f64,
    /// Applied (rounding down) to every threshold once per maintenance interval.
    pub decay_factor: f64,
    pub maintenance_interval: Duration,
    /// Votes, cache entries and references older than this are pruned.
    pub retention: chrono::Duration,
    /// Messages older than this are never promoted, however many votes they get.
    pub promotion_window: chrono::Duration,
    pub vote_emoji: String,
    /// Rows deleted per prune statement.
    pub purge_batch: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_threshold: 3,
            growth_factor: 1.25,
            decay_factor: 0.9,
            maintenance_interval: Duration::from_secs(3600),
            retention: chrono::Duration::hours(168), // 7 days
            promotion_window: chrono::Duration::hours(24),
            vote_emoji: "⭐".into(),
            purge_batch: 500,
        }
    }
}

impl EngineConfig {
    /// Read `STARBOARD_*` variables, falling back to the defaults.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let config = Self {
            min_threshold: env_or("STARBOARD_MIN_THRESHOLD", defaults.min_threshold)?,
            growth_factor: env_or("STARBOARD_GROWTH_FACTOR", defaults.growth_factor)?,
            decay_factor: env_or("STARBOARD_DECAY_FACTOR", defaults.decay_factor)?,
            maintenance_interval: Duration::from_secs(env_or(
                "STARBOARD_MAINTENANCE_SECS",
                defaults.maintenance_interval.as_secs(),
            )?),
            retention: chrono::Duration::hours(env_or(
                "STARBOARD_RETENTION_HOURS",
                defaults.retention.num_hours(),
            )?),
            promotion_window: chrono::Duration::hours(env_or(
                "STARBOARD_PROMOTION_WINDOW_HOURS",
                defaults.promotion_window.num_hours(),
            )?),
            vote_emoji: std::env::var("STARBOARD_EMOJI").unwrap_or(defaults.vote_emoji),
            purge_batch: env_or("STARBOARD_PURGE_BATCH", defaults.purge_batch)?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_threshold == 0 {
            bail!("minimum threshold must be at least 1");
        }
        if !(self.growth_factor > 1.0) {
            bail!("growth factor must be greater than 1, got {}", self.growth_factor);
        }
        if !(self.decay_factor > 0.0 && self.decay_factor < 1.0) {
            bail!("decay factor must be between 0 and 1, got {}", self.decay_factor);
        }
        if self.maintenance_interval.is_zero() {
            bail!("maintenance interval must be non-zero");
        }
        if self.promotion_window <= chrono::Duration::zero() {
            bail!("promotion window must be positive");
        }
        if self.promotion_window > self.retention {
            bail!("promotion window cannot exceed the retention window");
        }
        if self.vote_emoji.is_empty() {
            bail!("vote emoji must not be empty");
        }
        if self.purge_batch == 0 {
            bail!("purge batch must be at least 1");
        }
        Ok(())
    }
}

fn env_or<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {}: {:?}", name, raw)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        EngineConfig::default().validate().unwrap();
    }

    #[test]
    fn rejects_non_growing_threshold() {
        let config = EngineConfig { growth_factor: 1.0, ..EngineConfig::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_window_longer_than_retention() {
        let config = EngineConfig {
            promotion_window: chrono::Duration::hours(200),
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_decay_out_of_range() {
        for decay in [0.0, 1.0, 1.5] {
            let config = EngineConfig { decay_factor: decay, ..EngineConfig::default() };
            assert!(config.validate().is_err(), "decay {} accepted", decay);
        }
    }
}
