//! Boundaries to collaborators outside the kernel.

/// Answers whether an NPC currently travels with a player.
///
/// Escort objectives only complete when the escorted NPC is an active
/// companion; acceptance and dismissal live outside the kernel.
pub trait CompanionDirectory: Send + Sync {
    /// Whether `npc_id` is an active companion of `player_id`.
    fn is_companion(&self, player_id: &str, npc_id: &str) -> bool;
}
