//! Shared helpers for kernel integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use questweave_core::clock::Clock;
use questweave_core::config::KernelConfig;
use questweave_core::event::{DialogueEnded, ObjectiveHint, QuestSeedResponse};
use questweave_core::id::SequentialIds;
use questweave_core::rng::DeterministicRng;
use questweave_runtime::kernel::{Kernel, KernelDeps};
use questweave_test_support::{FixedClock, StaticCompanions};
use serde_json::json;

pub const PLAYER: &str = "p1";
pub const GIVER: &str = "miller";

/// Fixed timestamp used across all integration tests.
fn fixed_clock() -> Arc<dyn Clock> {
    Arc::new(FixedClock::session_start())
}

/// Build a kernel over in-memory stores with a fixed clock and sequential
/// ids.
pub fn build_kernel(rng: impl DeterministicRng + 'static, companions: StaticCompanions) -> Kernel {
    build_kernel_with_config(&KernelConfig::default(), rng, companions)
}

pub fn build_kernel_with_config(
    config: &KernelConfig,
    rng: impl DeterministicRng + 'static,
    companions: StaticCompanions,
) -> Kernel {
    let deps = KernelDeps::in_memory(Box::new(rng), Arc::new(companions))
        .with_clock(fixed_clock())
        .with_ids(Arc::new(SequentialIds::starting_at(1000)));
    Kernel::new(config, deps)
}

/// A reach-the-granary hint.
pub fn granary_hint() -> ObjectiveHint {
    ObjectiveHint {
        objective_type: "reach_node".into(),
        description: "Search the granary".into(),
        target: json!({"node_id": "granary"}),
    }
}

/// A deliver-five-sacks-of-flour hint.
pub fn flour_hint() -> ObjectiveHint {
    ObjectiveHint {
        objective_type: "deliver".into(),
        description: "Bring five sacks of flour".into(),
        target: json!({"item_tag": "flour", "quantity": 5, "recipient_id": GIVER}),
    }
}

/// An escort-the-child-home hint.
pub fn escort_hint() -> ObjectiveHint {
    ObjectiveHint {
        objective_type: "escort".into(),
        description: "See the child home".into(),
        target: json!({"npc_id": "child", "destination_node_id": "village"}),
    }
}

/// End of a conversation with the giver in which a request is proposed.
pub fn offer(turn: u32, conversation_count: u32, hints: Vec<ObjectiveHint>) -> DialogueEnded {
    DialogueEnded {
        player_id: PLAYER.into(),
        npc_id: GIVER.into(),
        turn,
        conversation_count,
        relationship_delta: None,
        memory_tags: vec![],
        topic_tags: vec![],
        quest_seed_response: Some(QuestSeedResponse {
            seed_type: "request".into(),
            context_tags: vec!["flour".into()],
            unresolved_threads: vec![],
            objective_hints: hints,
        }),
    }
}
