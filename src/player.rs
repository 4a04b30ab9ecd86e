//! Player stats: the sink that task rewards and penalties flow into.

use crate::domain::RewardType;
use crate::persistence::{SaveStore, SaveStoreExt, PLAYER_STATS_SAVE_KEY};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, info, warn};

/// Receives stat changes from completed or failed tasks
pub trait RewardSink {
    fn add_stat(&mut self, reward_type: RewardType, amount: i32);
}

impl<T: RewardSink> RewardSink for Rc<RefCell<T>> {
    fn add_stat(&mut self, reward_type: RewardType, amount: i32) {
        self.borrow_mut().add_stat(reward_type, amount);
    }
}

/// Mood derived from health
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvatarState {
    Sad,
    Normal,
    Happy,
}

impl AvatarState {
    pub fn name(&self) -> &'static str {
        match self {
            AvatarState::Sad => "Sad",
            AvatarState::Normal => "Normal",
            AvatarState::Happy => "Happy",
        }
    }
}

/// Persisted stat values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStatsData {
    pub player_name: String,
    pub strength: i32,
    pub health: i32,
    pub intelligence: i32,
    pub max_stat_value: i32,
    pub level: i32,
    pub current_xp: i32,
    pub xp_to_next_level: i32,
}

impl Default for PlayerStatsData {
    fn default() -> Self {
        Self {
            player_name: "Player".to_string(),
            strength: 3,
            health: 10,
            intelligence: 3,
            max_stat_value: 10,
            level: 1,
            current_xp: 0,
            xp_to_next_level: xp_for_next_level(1),
        }
    }
}

fn xp_for_next_level(level: i32) -> i32 {
    100 * level
}

/// Player stats with optional persistence
pub struct PlayerStats {
    data: PlayerStatsData,
    store: Option<Box<dyn SaveStore>>,
}

impl PlayerStats {
    /// Stats that live only in memory
    #[cfg(test)]
    pub fn in_memory(data: PlayerStatsData) -> Self {
        Self { data, store: None }
    }

    /// Load from the store; a missing or unreadable blob starts from defaults
    pub fn load(store: Box<dyn SaveStore>) -> Self {
        let data = match store.load(PLAYER_STATS_SAVE_KEY, PlayerStatsData::default()) {
            Ok(data) => data,
            Err(e) => {
                warn!(error = %e, "failed to load player stats, using defaults");
                PlayerStatsData::default()
            }
        };
        Self {
            data,
            store: Some(store),
        }
    }

    pub fn data(&self) -> &PlayerStatsData {
        &self.data
    }

    pub fn avatar_state(&self) -> AvatarState {
        if self.data.max_stat_value <= 0 {
            return AvatarState::Normal;
        }
        let health_percent = self.data.health * 100 / self.data.max_stat_value;
        match health_percent {
            p if p < 20 => AvatarState::Sad,
            p if p < 70 => AvatarState::Normal,
            _ => AvatarState::Happy,
        }
    }

    fn add_xp(&mut self, amount: i32) {
        self.data.current_xp = (self.data.current_xp + amount).max(0);
        while self.data.xp_to_next_level > 0 && self.data.current_xp >= self.data.xp_to_next_level {
            self.data.current_xp -= self.data.xp_to_next_level;
            self.data.level += 1;
            self.data.xp_to_next_level = xp_for_next_level(self.data.level);
            info!(level = self.data.level, "level up");
        }
    }

    fn save(&mut self) {
        if let Some(store) = self.store.as_mut() {
            if let Err(e) = store.save(PLAYER_STATS_SAVE_KEY, &self.data) {
                warn!(error = %e, "failed to save player stats");
            }
        }
    }
}

impl RewardSink for PlayerStats {
    fn add_stat(&mut self, reward_type: RewardType, amount: i32) {
        let max = self.data.max_stat_value;
        match reward_type {
            RewardType::Strength => self.data.strength = (self.data.strength + amount).clamp(0, max),
            RewardType::Health => self.data.health = (self.data.health + amount).clamp(0, max),
            RewardType::Intelligence => {
                self.data.intelligence = (self.data.intelligence + amount).clamp(0, max)
            }
            RewardType::Xp => self.add_xp(amount),
        }
        debug!(stat = reward_type.name(), amount, "stat changed");
        self.save();
    }
}

impl std::fmt::Debug for PlayerStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerStats")
            .field("data", &self.data)
            .field("persistent", &self.store.is_some())
            .finish()
    }
}
