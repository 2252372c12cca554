//! Repositories owned by the quest context.

use std::sync::Arc;

use questweave_core::repository::Repository;

use crate::domain::objective::Objective;
use crate::domain::quest::{Quest, QuestChain};
use crate::domain::seed::QuestSeed;

/// The records the quest service reads and writes.
#[derive(Clone)]
pub struct QuestStores {
    pub seeds: Arc<dyn Repository<QuestSeed>>,
    pub quests: Arc<dyn Repository<Quest>>,
    pub objectives: Arc<dyn Repository<Objective>>,
    pub chains: Arc<dyn Repository<QuestChain>>,
}

impl std::fmt::Debug for QuestStores {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuestStores").finish_non_exhaustive()
    }
}
