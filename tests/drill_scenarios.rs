use drill_counter::{BallBox, DetectionHalf, DrillEngine, Limb, Pose, TriggerResult};

fn detection(x: f64, y: f64, w: f64, h: f64) -> DetectionHalf {
    DetectionHalf::new(Some(BallBox::new(x, y, w, h)))
}

fn feet(left: (f64, f64), right: (f64, f64)) -> Pose {
    Pose::new()
        .with_ankle(Limb::Left, left.0, left.1)
        .with_ankle(Limb::Right, right.0, right.1)
}

fn right_foot(x: f64, y: f64) -> Pose {
    Pose::new().with_ankle(Limb::Right, x, y)
}

#[test]
fn toe_tap_counts_on_the_descent_only() {
    let engine = DrillEngine::default();
    let ball = detection(0.5, 0.5, 0.1, 0.1);
    let right_down = (0.6, 0.8);

    // Left ankle rises from 0.6 to 0.45 then comes back down onto the ball top.
    let mut results = Vec::new();
    for (frame, y) in [(0, 0.60), (1, 0.45), (2, 0.48)] {
        let pose = feet((0.5, y), right_down);
        results.push(
            engine
                .get_trigger("s1", "toe_taps", frame, Some(&ball), Some(&pose))
                .unwrap(),
        );
    }
    assert_eq!(results[0], TriggerResult::NEUTRAL);
    assert_eq!(results[1], TriggerResult::NEUTRAL);
    // One tap with one foot is half a repetition.
    assert_eq!(results[2], TriggerResult::new(0, true));

    // The right foot completes the repetition once the window has passed.
    let swap = |frame, y| {
        engine
            .get_trigger("s1", "toe_taps", frame, Some(&ball), Some(&feet((0.45, 0.8), (0.55, y))))
            .unwrap()
    };
    swap(13, 0.40);
    assert_eq!(swap(14, 0.44), TriggerResult::new(1, true));
}

#[test]
fn inside_outside_right_alternating_ball() {
    let engine = DrillEngine::default();
    let mut accepted = 0;
    let mut last = TriggerResult::NEUTRAL;
    for (frame, x) in [(0, 0.40), (6, 0.45), (12, 0.40)] {
        last = engine
            .get_trigger(
                "s1",
                "inside_outside_right",
                frame,
                Some(&detection(x, 0.6, 0.1, 0.1)),
                Some(&right_foot(0.42, 0.7)),
            )
            .unwrap();
        if last.triggered {
            accepted += 1;
        }
    }
    assert_eq!(accepted, 2);
    assert_eq!(last, TriggerResult::new(1, true));
}

#[test]
fn dropped_frames_do_not_disturb_the_count() {
    let engine = DrillEngine::default();
    let raised = feet((0.5, 0.45), (0.7, 0.8));
    let feed = |frame, detection: DetectionHalf, pose: Pose| {
        engine
            .get_trigger("s1", "push_pull", frame, Some(&detection), Some(&pose))
            .unwrap()
    };

    feed(0, detection(0.50, 0.5, 0.1, 0.1), raised.clone());
    assert!(feed(1, detection(0.52, 0.5, 0.1, 0.1), raised.clone()).triggered);

    // Ball lost, then both ankles lost.
    assert_eq!(feed(5, DetectionHalf::missing(), raised.clone()), TriggerResult::NEUTRAL);
    assert_eq!(feed(6, detection(0.40, 0.5, 0.1, 0.1), Pose::new()), TriggerResult::NEUTRAL);

    let pull = feed(14, detection(0.48, 0.5, 0.1, 0.1), raised);
    assert_eq!(pull, TriggerResult::new(1, true));
}

#[test]
fn halves_may_arrive_on_separate_calls() {
    let engine = DrillEngine::default();
    let raised = feet((0.5, 0.45), (0.7, 0.8));

    let pending = engine
        .get_trigger("s1", "push_pull", 0, None, Some(&raised))
        .unwrap();
    assert_eq!(pending, TriggerResult::NEUTRAL);
    engine
        .get_trigger("s1", "push_pull", 0, Some(&detection(0.50, 0.5, 0.1, 0.1)), None)
        .unwrap();

    engine
        .get_trigger("s1", "push_pull", 1, Some(&detection(0.52, 0.5, 0.1, 0.1)), None)
        .unwrap();
    let completed = engine
        .get_trigger("s1", "push_pull", 1, None, Some(&raised))
        .unwrap();
    assert_eq!(completed, TriggerResult::new(0, true));
}

#[test]
fn unknown_drill_never_counts() {
    let engine = DrillEngine::default();
    for frame in 0..30 {
        let result = engine
            .get_trigger(
                "s1",
                "rainbow_flick",
                frame,
                Some(&detection(0.5, 0.5, 0.1, 0.1)),
                Some(&feet((0.5, 0.45), (0.6, 0.8))),
            )
            .unwrap();
        assert_eq!(result, TriggerResult::NEUTRAL);
    }
    assert_eq!(engine.session_count().unwrap(), 0);
}
