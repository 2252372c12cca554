//! In-memory companion roster.

use std::collections::{BTreeSet, HashMap};
use std::sync::{PoisonError, RwLock};

use questweave_core::collaborators::CompanionDirectory;

/// Who travels with whom. Recruitment and dismissal are decided by the
/// game; the kernel only reads the roster.
#[derive(Debug, Default)]
pub struct CompanionRoster {
    parties: RwLock<HashMap<String, BTreeSet<String>>>,
}

impl CompanionRoster {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `npc_id` joins `player_id`'s party. Returns false if already present.
    pub fn join(&self, player_id: &str, npc_id: &str) -> bool {
        let mut parties = self.parties.write().unwrap_or_else(PoisonError::into_inner);
        parties
            .entry(player_id.to_owned())
            .or_default()
            .insert(npc_id.to_owned())
    }

    /// `npc_id` leaves `player_id`'s party. Returns false if absent.
    pub fn leave(&self, player_id: &str, npc_id: &str) -> bool {
        let mut parties = self.parties.write().unwrap_or_else(PoisonError::into_inner);
        parties
            .get_mut(player_id)
            .is_some_and(|party| party.remove(npc_id))
    }

    /// Current companions of `player_id`, sorted.
    #[must_use]
    pub fn party(&self, player_id: &str) -> Vec<String> {
        let parties = self.parties.read().unwrap_or_else(PoisonError::into_inner);
        parties
            .get(player_id)
            .map(|party| party.iter().cloned().collect())
            .unwrap_or_default()
    }
}

impl CompanionDirectory for CompanionRoster {
    fn is_companion(&self, player_id: &str, npc_id: &str) -> bool {
        let parties = self.parties.read().unwrap_or_else(PoisonError::into_inner);
        parties
            .get(player_id)
            .is_some_and(|party| party.contains(npc_id))
    }
}
