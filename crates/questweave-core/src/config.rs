//! Kernel configuration.
//!
//! Every field has a default, so an empty TOML document is a valid
//! configuration. Sections map one-to-one onto the bounded contexts that
//! read them.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::vocabulary::{SeedTier, SeedType};

/// Top-level configuration, loadable from TOML.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KernelConfig {
    /// Event bus guards.
    #[serde(default)]
    pub bus: BusConfig,
    /// Quest seed generation and lifespan.
    #[serde(default)]
    pub seeds: SeedConfig,
    /// Quest resolution, rewards and chaining.
    #[serde(default)]
    pub quests: QuestConfig,
}

impl KernelConfig {
    /// Load configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Config` if the TOML is invalid.
    pub fn from_toml(toml_str: &str) -> Result<Self, DomainError> {
        toml::from_str(toml_str).map_err(|e| DomainError::Config(e.to_string()))
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Config` if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, DomainError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| DomainError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml(&content)
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// Event bus settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusConfig {
    /// Maximum propagation depth; emissions beyond it are dropped.
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
        }
    }
}

/// Quest seed generation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedConfig {
    /// Chance that an eligible conversation plants a seed.
    #[serde(default = "default_generation_chance")]
    pub generation_chance: f64,
    /// Conversations that must pass between two seeds from the same NPC.
    #[serde(default = "default_cooldown")]
    pub cooldown_conversations: u32,
    /// Relative weights of tiers 1, 2 and 3.
    #[serde(default = "default_tier_weights")]
    pub tier_weights: [u32; 3],
    /// Chance that a new seed continues an existing chain, per tier 1, 2, 3.
    #[serde(default = "default_chain_chance")]
    pub chain_chance: [f64; 3],
    /// Lifespan in turns per seed type.
    #[serde(default)]
    pub ttl: SeedTtlConfig,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            generation_chance: default_generation_chance(),
            cooldown_conversations: default_cooldown(),
            tier_weights: default_tier_weights(),
            chain_chance: default_chain_chance(),
            ttl: SeedTtlConfig::default(),
        }
    }
}

impl SeedConfig {
    /// Chain continuation chance for a tier.
    #[must_use]
    pub fn chain_chance_for(&self, tier: SeedTier) -> f64 {
        self.chain_chance[tier.index()]
    }
}

/// Seed lifespan per type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedTtlConfig {
    #[serde(default = "default_ttl_personal")]
    pub personal: u32,
    #[serde(default = "default_ttl_rumor")]
    pub rumor: u32,
    #[serde(default = "default_ttl_request")]
    pub request: u32,
    #[serde(default = "default_ttl_warning")]
    pub warning: u32,
    /// Used when the narrative layer names a type the kernel does not know.
    #[serde(default = "default_ttl_fallback")]
    pub fallback: u32,
}

impl Default for SeedTtlConfig {
    fn default() -> Self {
        Self {
            personal: default_ttl_personal(),
            rumor: default_ttl_rumor(),
            request: default_ttl_request(),
            warning: default_ttl_warning(),
            fallback: default_ttl_fallback(),
        }
    }
}

impl SeedTtlConfig {
    /// Lifespan of a seed of the given type.
    #[must_use]
    pub fn for_type(&self, seed_type: SeedType) -> u32 {
        match seed_type {
            SeedType::Personal => self.personal,
            SeedType::Rumor => self.rumor,
            SeedType::Request => self.request,
            SeedType::Warning => self.warning,
        }
    }
}

/// Quest resolution and chaining settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestConfig {
    /// Chance that resolving a quest finalizes its chain, indexed by chain
    /// length minus one. Longer chains reuse the last entry.
    #[serde(default = "default_finalization_chance")]
    pub finalization_chance: Vec<f64>,
    /// Related NPCs recorded as witnesses for tier 1 and 2 quests.
    #[serde(default = "default_two")]
    pub max_witnesses: usize,
    /// Unborn NPC slots proposed for tier 1 quests.
    #[serde(default = "default_two")]
    pub max_unborn_slots: usize,
    /// Base rewards per tier.
    #[serde(default)]
    pub rewards: RewardConfig,
}

impl Default for QuestConfig {
    fn default() -> Self {
        Self {
            finalization_chance: default_finalization_chance(),
            max_witnesses: default_two(),
            max_unborn_slots: default_two(),
            rewards: RewardConfig::default(),
        }
    }
}

/// Full-success rewards for tiers 1, 2 and 3.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardConfig {
    #[serde(default = "default_reward_experience")]
    pub experience: [u32; 3],
    #[serde(default = "default_reward_gold")]
    pub gold: [u32; 3],
    #[serde(default = "default_reward_affinity")]
    pub affinity: [f64; 3],
    #[serde(default = "default_reward_trust")]
    pub trust: [f64; 3],
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            experience: default_reward_experience(),
            gold: default_reward_gold(),
            affinity: default_reward_affinity(),
            trust: default_reward_trust(),
        }
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

fn default_max_depth() -> u32 {
    5
}
fn default_generation_chance() -> f64 {
    0.05
}
fn default_cooldown() -> u32 {
    5
}
fn default_tier_weights() -> [u32; 3] {
    [10, 30, 60]
}
fn default_chain_chance() -> [f64; 3] {
    [0.6, 0.35, 0.15]
}
fn default_ttl_personal() -> u32 {
    15
}
fn default_ttl_rumor() -> u32 {
    30
}
fn default_ttl_request() -> u32 {
    20
}
fn default_ttl_warning() -> u32 {
    10
}
fn default_ttl_fallback() -> u32 {
    20
}
fn default_finalization_chance() -> Vec<f64> {
    vec![0.0, 0.15, 0.35, 0.6, 0.8, 0.95]
}
fn default_two() -> usize {
    2
}
fn default_reward_experience() -> [u32; 3] {
    [300, 150, 60]
}
fn default_reward_gold() -> [u32; 3] {
    [120, 60, 25]
}
fn default_reward_affinity() -> [f64; 3] {
    [12.0, 8.0, 5.0]
}
fn default_reward_trust() -> [f64; 3] {
    [8.0, 5.0, 3.0]
}
