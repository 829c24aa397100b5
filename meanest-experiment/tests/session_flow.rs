use std::time::Duration;

use meanest_core::rng::session_rng;
use meanest_core::{
    BlockSpec, Category, ExperimentConfig, InputEvent, InputSource, Key, Mode, RecordingSurface,
    ScriptedInput, SessionRecord,
};
use meanest_experiment::presentation::{FIXATION_SETTLE, PresentationTiming};
use meanest_experiment::session::INTER_BLOCK_PAUSE;
use meanest_experiment::{BlockPlan, Session, build_block_trials, present_block};
use meanest_timing::{Timer, VirtualTimer};

fn practice_config() -> ExperimentConfig {
    ExperimentConfig::new("s001", 1, Mode::SmallWindow, true).unwrap()
}

fn enter() -> InputEvent {
    InputEvent::Key(Key::Enter)
}

#[test]
fn four_trial_block_end_to_end() {
    let spec = BlockSpec::new(90.0, 30.0, 2);
    let mut rng = session_rng(Some(2025));
    let trials = build_block_trials(&spec, 5.0, &mut rng).unwrap();

    assert_eq!(trials.len(), 4);
    let blue: Vec<f64> = trials
        .trials()
        .filter(|t| t.category == Category::Blue)
        .map(|t| t.angle_deg)
        .collect();
    let red: Vec<f64> = trials
        .trials()
        .filter(|t| t.category == Category::Red)
        .map(|t| t.angle_deg)
        .collect();
    assert_eq!(blue.len(), 2);
    assert_eq!(red.len(), 2);
    // five sigma from each generating center
    assert!(blue.iter().all(|a| (a - 75.0).abs() < 25.0), "{blue:?}");
    assert!(red.iter().all(|a| (a - 105.0).abs() < 25.0), "{red:?}");

    let config = practice_config();
    let timing = PresentationTiming::from_config(&config);
    let timer = VirtualTimer::new();
    let mut surface = RecordingSurface::default();
    present_block(&trials, &timing, &mut surface, &timer).unwrap();
    assert_eq!(timer.total_slept(), timing.per_trial() * 4);

    let mut session = Session::new(
        config,
        BlockPlan::new(vec![spec], 5.0),
        RecordingSurface::default(),
        ScriptedInput::new([enter(), enter()]),
        VirtualTimer::new(),
        session_rng(Some(2025)),
        Vec::<SessionRecord>::new(),
    )
    .unwrap()
    .without_start_prompt();
    let record = session.run().unwrap();
    assert_eq!(record.blocks.len(), 1);
    let est = record.blocks[0].mean_estimates;
    assert_eq!(est.as_array(), [0.0, 0.0]);
}

#[test]
fn blocks_recorded_in_plan_order_with_both_estimates() {
    let centers = [0.0, 45.0, 90.0, 135.0, 180.0, 225.0];
    let blocks: Vec<BlockSpec> = centers.iter().map(|&c| BlockSpec::new(c, 30.0, 2)).collect();

    let mut events = vec![InputEvent::Key(Key::Other("space".into()))];
    for i in 0..centers.len() {
        // first probe of each block confirmed after some rotation, the second
        // one aborted on every other block
        events.push(InputEvent::Wheel { delta_y: 40.0 * i as f64 });
        events.push(enter());
        if i % 2 == 0 {
            events.push(InputEvent::Key(Key::Escape));
        } else {
            events.push(InputEvent::Key(Key::ArrowRight));
            events.push(InputEvent::Click);
        }
    }

    let mut session = Session::new(
        practice_config(),
        BlockPlan::new(blocks.clone(), 5.0),
        RecordingSurface::default(),
        ScriptedInput::new(events),
        VirtualTimer::new(),
        session_rng(Some(7)),
        Vec::<SessionRecord>::new(),
    )
    .unwrap();
    let record = session.run().unwrap();

    assert_eq!(record.blocks.len(), centers.len());
    for (i, block) in record.blocks.iter().enumerate() {
        assert_eq!(block.block_info, blocks[i]);
        assert_eq!(block.stimuli.len(), 4);
        assert_eq!(block.responses.len(), 4);
        let est = block.mean_estimates.as_array();
        let aborted = est.iter().filter(|v| v.is_nan()).count();
        let valid = est
            .iter()
            .filter(|v| (0.0..360.0).contains(*v))
            .count();
        assert_eq!(aborted + valid, 2, "block {i}: {est:?}");
        assert_eq!(aborted, usize::from(i % 2 == 0), "block {i}: {est:?}");
    }

    assert_eq!(session.sink.len(), 1);
    assert_eq!(session.sink[0], record);
    assert_eq!(session.input.listener_count(), 0);
    assert_eq!(session.input.remaining(), 0);
}

#[test]
fn total_virtual_time_is_the_sum_of_sleeps() {
    let config = practice_config();
    let timing = PresentationTiming::from_config(&config);
    let blocks = vec![BlockSpec::new(10.0, 30.0, 2), BlockSpec::new(20.0, 30.0, 3)];
    let timer = VirtualTimer::new();
    let mut session = Session::new(
        config,
        BlockPlan::new(blocks, 5.0),
        RecordingSurface::default(),
        ScriptedInput::new([enter(), enter(), enter(), enter()]),
        timer.clone(),
        session_rng(Some(3)),
        Vec::<SessionRecord>::new(),
    )
    .unwrap()
    .without_start_prompt();
    session.run().unwrap();

    let expected = timing.per_trial() * (4 + 6) + INTER_BLOCK_PAUSE;
    assert_eq!(timer.total_slept(), expected);
    assert_eq!(timer.sleeps()[0], FIXATION_SETTLE);
    assert_eq!(
        timer.sleeps().iter().filter(|d| **d == INTER_BLOCK_PAUSE).count(),
        1
    );
    assert!(timer.elapsed(0) >= Duration::from_secs(9));
}

#[test]
fn probe_order_is_reshuffled_per_block() {
    let blocks: Vec<BlockSpec> = (0..24).map(|i| BlockSpec::new(i as f64, 20.0, 1)).collect();
    let events: Vec<InputEvent> = (0..blocks.len() * 2).map(|_| enter()).collect();
    let mut session = Session::new(
        practice_config(),
        BlockPlan::new(blocks, 0.0),
        RecordingSurface::default(),
        ScriptedInput::new(events),
        VirtualTimer::new(),
        session_rng(Some(11)),
        Vec::<SessionRecord>::new(),
    )
    .unwrap()
    .without_start_prompt();
    session.run().unwrap();

    let first_labels: Vec<&str> = session
        .surface
        .texts()
        .into_iter()
        .filter(|t| t.contains("rotate with mouse wheel"))
        .step_by(2)
        .collect();
    assert_eq!(first_labels.len(), 24);
    assert!(first_labels.iter().any(|t| t.starts_with("Category 0")));
    assert!(first_labels.iter().any(|t| t.starts_with("Category 1")));
}

#[test]
fn seeded_sessions_replay_identically() {
    let run = || {
        let mut session = Session::new(
            practice_config(),
            BlockPlan::new(vec![BlockSpec::new(30.0, 30.0, 4)], 5.0),
            RecordingSurface::default(),
            ScriptedInput::new([enter(), enter()]),
            VirtualTimer::new(),
            session_rng(Some(99)),
            Vec::<SessionRecord>::new(),
        )
        .unwrap()
        .without_start_prompt();
        session.run().unwrap().blocks
    };
    assert_eq!(run(), run());
}

#[test]
fn finished_record_serializes_in_the_lab_format() {
    let events = vec![
        InputEvent::Key(Key::Escape),
        InputEvent::Key(Key::ArrowRight),
        enter(),
    ];
    let mut session = Session::new(
        practice_config(),
        BlockPlan::new(vec![BlockSpec::new(45.0, 30.0, 1)], 5.0),
        RecordingSurface::default(),
        ScriptedInput::new(events),
        VirtualTimer::new(),
        session_rng(Some(5)),
        Vec::<SessionRecord>::new(),
    )
    .unwrap()
    .without_start_prompt();
    let record = session.run().unwrap();

    let json = serde_json::to_value(&record).unwrap();
    let meta = &json["meta"];
    assert_eq!(meta["subjID"], "s001");
    assert_eq!(meta["session"], 1);
    assert_eq!(meta["isitime"], 0.6);
    assert_eq!(meta["prestime"], 0.3);
    assert!(meta["startTime"].is_string());
    assert!(meta["endTime"].is_string());
    assert!(meta["totalTimeSec"].is_number());

    let block = &json["data"][0];
    assert_eq!(block["blockInfo"]["centerAngleDeg"], 45.0);
    assert_eq!(block["stimuli"].as_array().unwrap().len(), 2);
    assert_eq!(block["responses"]["RT"].as_array().unwrap().len(), 2);
    let estimates = block["meanEstimates"].as_array().unwrap();
    assert_eq!(estimates.iter().filter(|v| v.is_null()).count(), 1);
    assert_eq!(estimates.iter().filter(|v| v.is_number()).count(), 1);
}
