//! Test companion directory.

use std::collections::HashSet;

use questweave_core::collaborators::CompanionDirectory;

/// A companion directory backed by a fixed set of `(player, npc)` pairs.
#[derive(Debug, Default)]
pub struct StaticCompanions {
    pairs: HashSet<(String, String)>,
}

impl StaticCompanions {
    /// A directory in which nobody travels with anybody.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Adds `npc_id` as a companion of `player_id`.
    #[must_use]
    pub fn with(mut self, player_id: &str, npc_id: &str) -> Self {
        self.pairs.insert((player_id.to_owned(), npc_id.to_owned()));
        self
    }
}

impl CompanionDirectory for StaticCompanions {
    fn is_companion(&self, player_id: &str, npc_id: &str) -> bool {
        self.pairs
            .contains(&(player_id.to_owned(), npc_id.to_owned()))
    }
}
