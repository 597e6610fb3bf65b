use std::collections::HashMap;

use tokio::sync::RwLock;
use tracing::debug;

use starboard_types::CommunityId;

/// Adaptive per-community promotion bar.
///
/// Process-local: after a restart every community starts back at the minimum,
/// which only makes promotion briefly easier.
pub struct ThresholdController {
    minimum: u32,
    growth: f64,
    decay: f64,
    /// Communities above the minimum. Absent means "at the minimum".
    levels: RwLock<HashMap<CommunityId, u32>>,
}

impl ThresholdController {
    pub fn new(minimum: u32, growth: f64, decay: f64) -> Self {
        Self {
            minimum,
            growth,
            decay,
            levels: RwLock::new(HashMap::new()),
        }
    }

    pub fn minimum(&self) -> u32 {
        self.minimum
    }

    pub async fn current(&self, community: CommunityId) -> u32 {
        self.levels
            .read()
            .await
            .get(&community)
            .copied()
            .unwrap_or(self.minimum)
    }

    /// Raise the bar after a promotion. Returns the new threshold.
    pub async fn record_promotion(&self, community: CommunityId) -> u32 {
        let mut levels = self.levels.write().await;
        let level = levels.entry(community).or_insert(self.minimum);
        *level = self.grow(*level);
        *level
    }

    /// Check `votes` against the bar and, if it qualifies, raise the bar in the
    /// same critical section. Returns the threshold that was met.
    ///
    /// Of several messages crossing the bar at the same instant only the first
    /// gets through at the old value.
    pub async fn try_claim(&self, community: CommunityId, votes: u32) -> Option<u32> {
        let mut levels = self.levels.write().await;
        let level = levels.entry(community).or_insert(self.minimum);
        if votes < *level {
            return None;
        }
        let met = *level;
        *level = self.grow(met);
        debug!("Threshold for community {} raised {} -> {}", community, met, *level);
        Some(met)
    }

    /// Relax every community's bar one step, never below the minimum.
    pub async fn decay_all(&self) {
        let mut levels = self.levels.write().await;
        for level in levels.values_mut() {
            *level = (((*level as f64) * self.decay).floor() as u32).max(self.minimum);
        }
        levels.retain(|_, level| *level > self.minimum);
    }

    fn grow(&self, level: u32) -> u32 {
        ((level as f64) * self.growth).ceil() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use starboard_types::Snowflake;

    const COMMUNITY: CommunityId = Snowflake(1);

    #[tokio::test]
    async fn defaults_to_minimum() {
        let t = ThresholdController::new(2, 1.5, 0.5);
        assert_eq!(t.current(COMMUNITY).await, 2);
        assert_eq!(t.current(Snowflake(99)).await, 2);
    }

    #[tokio::test]
    async fn promotion_rounds_up() {
        let t = ThresholdController::new(2, 1.25, 0.9);
        assert_eq!(t.record_promotion(COMMUNITY).await, 3);
        assert_eq!(t.record_promotion(COMMUNITY).await, 4);
        assert_eq!(t.record_promotion(COMMUNITY).await, 5);
        assert_eq!(t.current(Snowflake(2)).await, 2);
    }

    #[tokio::test]
    async fn claim_raises_bar_for_the_next_message() {
        let t = ThresholdController::new(2, 1.25, 0.9);
        assert_eq!(t.try_claim(COMMUNITY, 1).await, None);
        assert_eq!(t.try_claim(COMMUNITY, 2).await, Some(2));
        // a second message with the same count no longer qualifies
        assert_eq!(t.try_claim(COMMUNITY, 2).await, None);
        assert_eq!(t.current(COMMUNITY).await, 3);
    }

    #[tokio::test]
    async fn decay_never_drops_below_minimum() {
        let t = ThresholdController::new(3, 2.0, 0.5);
        for _ in 0..5 {
            t.record_promotion(COMMUNITY).await;
        }
        assert_eq!(t.current(COMMUNITY).await, 96);

        t.decay_all().await;
        assert_eq!(t.current(COMMUNITY).await, 48);

        for _ in 0..50 {
            t.decay_all().await;
            assert!(t.current(COMMUNITY).await >= 3);
        }
        assert_eq!(t.current(COMMUNITY).await, 3);
    }
}
