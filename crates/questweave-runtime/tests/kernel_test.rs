mod common;

use questweave_bus::FnHandler;
use questweave_core::error::DomainError;
use questweave_core::event::{
    AttitudeRequest, EventPayload, EventType, ItemGiven, NpcDied, PlayerMoved,
};
use questweave_core::vocabulary::{FailReason, QuestResult, RelationshipStatus, SeedTier};
use questweave_quests::application::service::QuestDetails;
use questweave_quests::domain::objective::ObjectiveStatus;
use questweave_quests::domain::quest::{QuestStatus, Urgency};
use questweave_quests::domain::seed::SeedStatus;
use questweave_relationships::domain::relationship::EntityRef;
use questweave_runtime::kernel::Kernel;
use questweave_test_support::{MockRng, RecordingHandler, StaticCompanions};
use uuid::Uuid;

use common::{GIVER, PLAYER, build_kernel, escort_hint, flour_hint, granary_hint, offer};

fn accept(kernel: &Kernel, turn: u32, details: QuestDetails) -> Uuid {
    let seeds = kernel.quests().active_seeds_of(GIVER).unwrap();
    assert_eq!(seeds.len(), 1, "expected exactly one offer");
    let quest = kernel
        .quests()
        .accept_seed(kernel.bus(), seeds[0].id, turn, details)
        .unwrap();
    kernel.end_turn(turn);
    quest.id
}

fn standing(kernel: &Kernel) -> (RelationshipStatus, f64) {
    let attitude = kernel
        .relationships()
        .attitude_of(&EntityRef::npc(GIVER), &EntityRef::player(PLAYER))
        .unwrap()
        .expect("relationship exists");
    (attitude.status, attitude.affinity)
}

#[test]
fn test_full_quest_loop_rewards_player_and_warms_giver() {
    // Arrange
    let kernel = build_kernel(MockRng, StaticCompanions::none());
    let recorder = RecordingHandler::attach(
        kernel.bus(),
        &[EventType::QuestSeedCreated, EventType::QuestCompleted],
    );
    kernel.publish("dialogue:miller", offer(1, 5, vec![granary_hint(), flour_hint()]));
    kernel.end_turn(1);
    let quest_id = accept(&kernel, 2, QuestDetails::default());
    let (_, affinity_before) = standing(&kernel);

    // Act
    kernel.publish(
        "player:p1",
        PlayerMoved {
            player_id: PLAYER.into(),
            from_node_id: None,
            node_id: "granary".into(),
            turn: 3,
        },
    );
    kernel.end_turn(3);
    kernel.publish(
        "player:p1",
        ItemGiven {
            player_id: PLAYER.into(),
            recipient_id: GIVER.into(),
            item_id: "flour_sack".into(),
            item_tags: vec!["flour".into()],
            quantity: 5,
            turn: 4,
        },
    );
    kernel.end_turn(4);

    // Assert
    let quest = kernel.quests().quest(quest_id).unwrap();
    assert_eq!(quest.seed_tier, SeedTier::ONE);
    assert_eq!(quest.status, QuestStatus::Completed);
    assert_eq!(quest.result, Some(QuestResult::Success));
    assert!(quest.rewards.is_some_and(|r| r.experience > 0));
    assert_eq!(recorder.of_type(EventType::QuestSeedCreated).len(), 1);
    assert_eq!(recorder.of_type(EventType::QuestCompleted).len(), 1);

    let (_, affinity_after) = standing(&kernel);
    assert!(affinity_after > affinity_before);
}

#[test]
fn test_end_turn_expires_unaccepted_offer() {
    // Arrange
    let kernel = build_kernel(MockRng, StaticCompanions::none());
    let recorder = RecordingHandler::attach(kernel.bus(), &[EventType::QuestSeedExpired]);
    kernel.publish("dialogue:miller", offer(1, 5, vec![granary_hint()]));
    kernel.end_turn(1);
    let seed_id = kernel.quests().active_seeds_of(GIVER).unwrap()[0].id;

    // Act
    kernel.end_turn(20);
    let still_active = kernel.quests().seed(seed_id).unwrap().status;
    kernel.end_turn(21);

    // Assert
    assert_eq!(still_active, SeedStatus::Active);
    assert_eq!(kernel.quests().seed(seed_id).unwrap().status, SeedStatus::Expired);
    assert_eq!(recorder.of_type(EventType::QuestSeedExpired).len(), 1);
}

#[test]
fn test_offer_lapses_even_without_turn_processing() {
    // Arrange
    let kernel = build_kernel(MockRng, StaticCompanions::none());
    let recorder = RecordingHandler::attach(kernel.bus(), &[EventType::QuestSeedExpired]);
    kernel.publish("dialogue:miller", offer(1, 5, vec![granary_hint()]));
    let seed_id = kernel.quests().active_seeds_of(GIVER).unwrap()[0].id;

    // Act
    let result = kernel
        .quests()
        .accept_seed(kernel.bus(), seed_id, 21, QuestDetails::default());

    // Assert
    match result {
        Err(DomainError::Validation(msg)) => assert!(msg.contains("expired")),
        other => panic!("expected Validation error, got {other:?}"),
    }
    assert_eq!(kernel.quests().seed(seed_id).unwrap().status, SeedStatus::Expired);
    assert_eq!(recorder.of_type(EventType::QuestSeedExpired).len(), 1);
    kernel.end_turn(21);
    assert_eq!(recorder.of_type(EventType::QuestSeedExpired).len(), 1);
}

#[test]
fn test_urgent_quest_fails_when_time_runs_out() {
    // Arrange
    let kernel = build_kernel(MockRng, StaticCompanions::none());
    let recorder = RecordingHandler::attach(kernel.bus(), &[EventType::ObjectiveFailed]);
    kernel.publish("dialogue:miller", offer(1, 5, vec![granary_hint()]));
    kernel.end_turn(1);
    let quest_id = accept(
        &kernel,
        2,
        QuestDetails {
            urgency: Urgency::Urgent,
            time_limit: Some(3),
            ..QuestDetails::default()
        },
    );

    // Act
    kernel.end_turn(4);
    let before_limit = kernel.quests().quest(quest_id).unwrap().status;
    kernel.end_turn(5);

    // Assert
    assert_eq!(before_limit, QuestStatus::Active);
    let quest = kernel.quests().quest(quest_id).unwrap();
    assert_eq!(quest.result, Some(QuestResult::Failure));
    let objectives = kernel.quests().objectives_of(quest_id).unwrap();
    assert!(objectives.iter().all(|o| o.status == ObjectiveStatus::Failed
        && o.failure.as_ref().is_some_and(|f| f.reason == FailReason::TimeExpired)));
    // The quest is already over, so nobody is left to consult.
    assert_eq!(objectives.len(), 1);
    let failures = recorder.of_type(EventType::ObjectiveFailed);
    assert_eq!(failures.len(), 1);
    match &failures[0].payload {
        EventPayload::ObjectiveFailed(p) => assert!(p.replacement_ids.is_empty()),
        other => panic!("expected objective_failed, got {other:?}"),
    }
    let (_, affinity) = standing(&kernel);
    assert!(affinity < 0.0);
}

#[test]
fn test_escort_target_dies_on_destination() {
    // Arrange
    let kernel = build_kernel(MockRng, StaticCompanions::none().with(PLAYER, "child"));
    let recorder = RecordingHandler::attach(kernel.bus(), &[EventType::ObjectiveFailed]);
    kernel.publish("dialogue:miller", offer(1, 5, vec![escort_hint()]));
    kernel.end_turn(1);
    let quest_id = accept(&kernel, 2, QuestDetails::default());

    // Act
    kernel.publish(
        "npc:child",
        NpcDied {
            npc_id: "child".into(),
            node_id: Some("village".into()),
            turn: 3,
        },
    );
    kernel.end_turn(3);

    // Assert
    let events = recorder.of_type(EventType::ObjectiveFailed);
    assert_eq!(events.len(), 1);
    match &events[0].payload {
        EventPayload::ObjectiveFailed(p) => {
            assert_eq!(p.reason, FailReason::TargetDead);
            assert_eq!(p.replacement_ids.len(), 2);
        }
        other => panic!("expected objective_failed, got {other:?}"),
    }
    let objectives = kernel.quests().objectives_of(quest_id).unwrap();
    let escort = objectives.iter().find(|o| !o.is_replacement).unwrap();
    assert_eq!(
        escort.failure.as_ref().and_then(|f| f.node_id.as_deref()),
        Some("village")
    );
    assert_eq!(objectives.len(), 3);
    assert!(kernel.quests().quest(quest_id).unwrap().is_active());
}

#[test]
fn test_quest_survives_death_of_its_giver() {
    // Arrange
    let kernel = build_kernel(MockRng, StaticCompanions::none());
    kernel.publish("dialogue:miller", offer(1, 5, vec![flour_hint()]));
    kernel.end_turn(1);
    let quest_id = accept(&kernel, 2, QuestDetails::default());

    // Act
    kernel.publish(
        "npc:miller",
        NpcDied {
            npc_id: GIVER.into(),
            node_id: Some("mill".into()),
            turn: 3,
        },
    );
    kernel.end_turn(3);
    let open: Vec<_> = kernel
        .quests()
        .objectives_of(quest_id)
        .unwrap()
        .into_iter()
        .filter(|o| o.status == ObjectiveStatus::Active)
        .collect();
    kernel.publish(
        "player:p1",
        PlayerMoved {
            player_id: PLAYER.into(),
            from_node_id: None,
            node_id: "mill".into(),
            turn: 4,
        },
    );
    kernel.end_turn(4);

    // Assert
    assert_eq!(open.len(), 1);
    assert!(open[0].target.dependent_npc().is_none());
    let quest = kernel.quests().quest(quest_id).unwrap();
    assert_eq!(quest.status, QuestStatus::Completed);
    assert_eq!(quest.result, Some(QuestResult::Partial));
}

#[test]
fn test_attitude_request_is_answered() {
    // Arrange
    let kernel = build_kernel(MockRng, StaticCompanions::none());
    let recorder = RecordingHandler::attach(kernel.bus(), &[EventType::AttitudeResponse]);
    kernel.publish("dialogue:miller", offer(1, 5, vec![]));
    kernel.end_turn(1);

    // Act
    kernel.publish(
        "npc:baker",
        AttitudeRequest {
            requester: "baker".into(),
            source_id: GIVER.into(),
            target_id: PLAYER.into(),
        },
    );

    // Assert
    let events = recorder.of_type(EventType::AttitudeResponse);
    match &events[0].payload {
        EventPayload::AttitudeResponse(p) => {
            assert_eq!(p.status, Some(RelationshipStatus::Stranger));
            assert_eq!(p.familiarity, 1);
        }
        other => panic!("expected attitude_response, got {other:?}"),
    }
}

#[test]
fn test_handler_failure_does_not_stop_siblings() {
    // Arrange
    let kernel = build_kernel(MockRng, StaticCompanions::none());
    kernel.bus().subscribe(
        EventType::DialogueEnded,
        FnHandler::shared("broken", |_, _| {
            Err(DomainError::Infrastructure("boom".into()))
        }),
    );
    let recorder = RecordingHandler::attach(kernel.bus(), &[EventType::DialogueEnded]);

    // Act
    kernel.publish("dialogue:miller", offer(1, 5, vec![granary_hint()]));

    // Assert
    assert_eq!(recorder.of_type(EventType::DialogueEnded).len(), 1);
    assert_eq!(kernel.quests().active_seeds_of(GIVER).unwrap().len(), 1);
}

#[test]
fn test_shutdown_unsubscribes_every_service() {
    let kernel = build_kernel(MockRng, StaticCompanions::none());
    assert_eq!(kernel.bus().handler_count(EventType::DialogueEnded), 3);
    assert_eq!(kernel.bus().handler_count(EventType::PlayerMoved), 1);

    kernel.shutdown();

    assert_eq!(kernel.bus().handler_count(EventType::DialogueEnded), 0);
    assert_eq!(kernel.bus().handler_count(EventType::TurnProcessed), 0);
}
