use std::sync::Arc;

use serene::config::CompositionConfig;
use serene::kernel::event::{EngineEvent, EngineNotice, UtteranceId};
use serene::kernel::scheduler::CompositionScheduler;
use serene::kernel::responses::{ResponsePool, GREETING};
use serene::{EngineError, Originator, ResponseCategory, ScriptedChoice, TurnEngine, TurnState};
use tokio::time::{timeout, Duration, Instant};

fn engine(script: Vec<usize>) -> TurnEngine {
    TurnEngine::new(
        Arc::new(ResponsePool::builtin()),
        Box::new(ScriptedChoice::new(script)),
        CompositionConfig::default(),
    )
}

#[tokio::test(start_paused = true)]
async fn test_blank_input_changes_nothing() {
    let mut engine = engine(vec![]);

    for input in ["", "   ", "\n\t "] {
        assert_eq!(engine.submit_user_text(input), Err(EngineError::EmptyInput));
    }

    assert!(engine.current_transcript().is_empty());
    assert_eq!(engine.current_turn_state(), TurnState::Idle);
    assert_eq!(engine.state_version(), 0);
    assert_eq!(engine.telemetry.snapshot().turn_stats.rejected, 3);

    // Nothing was scheduled either.
    assert!(timeout(Duration::from_secs(10), engine.process_next()).await.is_err());
}

#[tokio::test(start_paused = true)]
async fn test_stress_reply_after_delay() {
    let mut engine = engine(vec![1]);

    let turn = engine.submit_user_text("I'm so stressed about work").unwrap();
    let transcript = engine.current_transcript();
    assert_eq!(transcript.len(), 1);
    assert_eq!(transcript[0].id, turn);
    assert_eq!(transcript[0].originator, Originator::User);
    assert_eq!(engine.current_turn_state(), TurnState::AwaitingAssistant { turn });

    // Not before the delay.
    let start = Instant::now();
    assert!(timeout(Duration::from_millis(1499), engine.process_next()).await.is_err());
    assert_eq!(engine.current_transcript().len(), 1);

    let reply = engine.process_next().await.expect("reply composed");
    assert!(start.elapsed() >= Duration::from_millis(1500));
    assert_eq!(reply.originator, Originator::Assistant);
    assert_eq!(reply.category, Some(ResponseCategory::Stress));
    assert_eq!(reply.text, engine.pool().candidates(ResponseCategory::Stress)[1]);

    let transcript = engine.current_transcript();
    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript[1], reply);
    assert_eq!(engine.current_turn_state(), TurnState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_greeting_opens_transcript() {
    let mut engine = TurnEngine::with_greeting(
        Arc::new(ResponsePool::builtin()),
        Box::new(ScriptedChoice::new(vec![])),
        CompositionConfig::default(),
        GREETING,
    );

    let transcript = engine.current_transcript();
    assert_eq!(transcript.len(), 1);
    assert_eq!(transcript[0].text, GREETING);
    assert_eq!(transcript[0].originator, Originator::Assistant);
    assert_eq!(transcript[0].category, None);

    // The greeting is not a pending turn.
    assert_eq!(engine.compose_reply("hello"), Err(EngineError::NoPendingTurn));

    engine.submit_user_text("hello there").unwrap();
    let reply = engine.process_next().await.unwrap();
    assert_eq!(reply.category, Some(ResponseCategory::Default));
    assert_eq!(engine.current_transcript().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_second_submission_waits_for_reply() {
    let mut engine = engine(vec![]);

    engine.submit_user_text("I feel sad").unwrap();
    assert_eq!(engine.submit_user_text("and tired"), Err(EngineError::TurnInProgress));
    assert_eq!(engine.current_transcript().len(), 1);

    let reply = engine.process_next().await.unwrap();
    assert_eq!(reply.category, Some(ResponseCategory::Sadness));

    engine.submit_user_text("and tired").unwrap();
    let reply = engine.process_next().await.unwrap();
    assert_eq!(reply.category, Some(ResponseCategory::Fatigue));

    // Strict alternation.
    let originators: Vec<_> = engine.current_transcript().iter().map(|u| u.originator).collect();
    assert_eq!(
        originators,
        vec![Originator::User, Originator::Assistant, Originator::User, Originator::Assistant]
    );
}

#[tokio::test(start_paused = true)]
async fn test_compose_reply_needs_pending_turn() {
    let mut engine = engine(vec![]);
    assert_eq!(engine.compose_reply("anything"), Err(EngineError::NoPendingTurn));
    assert!(engine.current_transcript().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_direct_compose_makes_timer_stale() {
    let mut engine = engine(vec![]);

    let turn = engine.submit_user_text("I'm happy today").unwrap();
    let reply = engine.compose_reply("I'm happy today").unwrap();
    assert_eq!(reply.category, Some(ResponseCategory::Positive));

    // A late timer for the already answered turn is dropped.
    assert_eq!(engine.handle_event(EngineEvent::CompositionDue { turn }), None);
    assert_eq!(engine.current_transcript().len(), 2);

    // The cancelled timer never fires.
    assert!(timeout(Duration::from_secs(5), engine.process_next()).await.is_err());
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_cancels_pending_reply() {
    let mut engine = engine(vec![]);

    engine.submit_user_text("I'm angry").unwrap();
    let version = engine.state_version();
    engine.shutdown();

    assert!(engine.is_closed());
    assert_eq!(engine.current_turn_state(), TurnState::Idle);
    assert!(timeout(Duration::from_secs(5), engine.process_next()).await.is_err());

    let transcript = engine.current_transcript();
    assert_eq!(transcript.len(), 1);
    assert!(transcript[0].is_user());
    assert_eq!(engine.state_version(), version + 1);

    assert_eq!(engine.submit_user_text("hello?"), Err(EngineError::SessionClosed));
    assert_eq!(engine.telemetry.snapshot().turn_stats.cancelled, 1);

    // Idempotent.
    engine.shutdown();
    assert_eq!(engine.telemetry.snapshot().turn_stats.cancelled, 1);
}

#[tokio::test(start_paused = true)]
async fn test_jitter_extends_delay() {
    let mut engine = TurnEngine::new(
        Arc::new(ResponsePool::builtin()),
        // First draw is the jitter, second picks the reply.
        Box::new(ScriptedChoice::new(vec![200, 0])),
        CompositionConfig {
            delay_ms: 1000,
            jitter_ms: 500,
        },
    );

    engine.submit_user_text("please help me relax").unwrap();
    let start = Instant::now();
    assert!(timeout(Duration::from_millis(1150), engine.process_next()).await.is_err());

    let reply = engine.process_next().await.unwrap();
    assert!(start.elapsed() >= Duration::from_millis(1200));
    assert_eq!(reply.category, Some(ResponseCategory::CalmingRequest));
}

#[tokio::test(start_paused = true)]
async fn test_unbounded_jitter_setting() {
    let mut engine = TurnEngine::new(
        Arc::new(ResponsePool::builtin()),
        Box::new(ScriptedChoice::new(vec![42, 0])),
        CompositionConfig {
            delay_ms: 1500,
            jitter_ms: u64::MAX,
        },
    );

    engine.submit_user_text("hello").unwrap();
    let start = Instant::now();
    engine.process_next().await.unwrap();
    assert!(start.elapsed() >= Duration::from_millis(1542));
}

#[tokio::test(start_paused = true)]
async fn test_dropping_scheduler_cancels_timer() {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let mut scheduler = CompositionScheduler::new();
    scheduler.schedule(UtteranceId(1), Duration::from_millis(1500), tx);
    assert_eq!(scheduler.pending_turn(), Some(UtteranceId(1)));

    let start = Instant::now();
    drop(scheduler);

    // The timer task exits without posting, which closes the channel.
    assert_eq!(rx.recv().await, None);
    assert!(start.elapsed() < Duration::from_millis(1500));
}

#[tokio::test(start_paused = true)]
async fn test_dropping_engine_mid_composition() {
    let mut engine = engine(vec![]);
    engine.submit_user_text("I'm worried").unwrap();
    drop(engine);

    tokio::time::sleep(Duration::from_secs(5)).await;
}

#[tokio::test(start_paused = true)]
async fn test_blank_greeting_seeds_nothing() {
    let engine = TurnEngine::with_greeting(
        Arc::new(ResponsePool::builtin()),
        Box::new(ScriptedChoice::new(vec![])),
        CompositionConfig::default(),
        "  ",
    );
    assert!(engine.current_transcript().is_empty());
    assert_eq!(engine.state_version(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_notices_follow_turns() {
    let mut engine = engine(vec![]);
    let mut notices = engine.subscribe();

    let turn = engine.submit_user_text("exhausted").unwrap();
    engine.process_next().await.unwrap();

    match notices.recv().await.unwrap() {
        EngineNotice::UtteranceAppended(u) => assert_eq!(u.id, turn),
        other => panic!("Expected user utterance, got {:?}", other),
    }
    assert_eq!(
        notices.recv().await.unwrap(),
        EngineNotice::TurnStateChanged {
            from: TurnState::Idle,
            to: TurnState::AwaitingAssistant { turn },
        }
    );
    match notices.recv().await.unwrap() {
        EngineNotice::UtteranceAppended(u) => {
            assert_eq!(u.originator, Originator::Assistant);
            assert_eq!(u.category, Some(ResponseCategory::Fatigue));
        }
        other => panic!("Expected assistant utterance, got {:?}", other),
    }
    assert_eq!(
        notices.recv().await.unwrap(),
        EngineNotice::TurnStateChanged {
            from: TurnState::AwaitingAssistant { turn },
            to: TurnState::Idle,
        }
    );
}

#[tokio::test(start_paused = true)]
async fn test_telemetry_carries_no_text() {
    let mut engine = engine(vec![]);
    engine.submit_user_text("my secret worry").unwrap();
    engine.process_next().await.unwrap();

    let snapshot = engine.telemetry.snapshot();
    assert_eq!(snapshot.turn_stats.submitted, 1);
    assert_eq!(snapshot.turn_stats.composed, 1);
    assert!(snapshot.turn_stats.max_latency_ms >= 1500);

    let json = serde_json::to_string(&engine.telemetry.events().collect::<Vec<_>>()).unwrap();
    assert!(!json.contains("secret"));
}
