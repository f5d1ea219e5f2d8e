use std::sync::mpsc;
use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use typealpha::clock::ManualClock;
use typealpha::config::Config;
use typealpha::runtime::{apply_event, FixedTicker, GameEvent, Runner, TestEventSource};
use typealpha::session::{EndReason, GameMode, Lifecycle, Session};

fn short_config(duration: u32) -> Config {
    let mut config = Config::default();
    config.game.duration = duration;
    config.game.countdown_seconds = 0;
    config
}

fn press(c: char) -> GameEvent {
    GameEvent::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE))
}

// Drives a session through Runner/TestEventSource without a TTY
#[test]
fn headless_run_times_out_with_typed_keys() {
    let mut session = Session::new(&short_config(2), ManualClock::new()).unwrap();
    session.start(GameMode::Practice, 42);
    assert_eq!(session.lifecycle(), Lifecycle::Running);

    let (tx, rx) = mpsc::channel();
    for &c in &session.text()[..5] {
        tx.send(press(c)).unwrap();
    }

    let mut runner = Runner::new(
        TestEventSource::new(rx),
        FixedTicker::new(Duration::from_millis(50)),
    );
    for _ in 0..100u32 {
        let event = runner.step();
        if apply_event(&mut session, &event) == Lifecycle::Ended {
            break;
        }
    }

    let result = session.result().expect("session should have ended");
    assert_eq!(result.end_reason, EndReason::Timeout);
    assert_eq!(result.correct_count, 5);
    assert_eq!(result.miss_count, 0);
    // one word in two seconds
    assert_eq!(result.wpm, 30.0);
    assert_eq!(result.accuracy, 100.0);
}

#[test]
fn headless_escape_cancels() {
    let mut session = Session::new(&short_config(60), ManualClock::new()).unwrap();
    session.start(GameMode::Daily, 7);

    let wrong = if session.expected() == Some('z') { 'y' } else { 'z' };
    let (tx, rx) = mpsc::channel();
    tx.send(press(wrong)).unwrap();
    tx.send(GameEvent::Key(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE)))
        .unwrap();

    let mut runner = Runner::new(
        TestEventSource::new(rx),
        FixedTicker::new(Duration::from_secs(5)),
    );
    for _ in 0..2 {
        let event = runner.step();
        apply_event(&mut session, &event);
    }

    assert_eq!(session.lifecycle(), Lifecycle::Ended);
    let result = session.result().unwrap();
    assert_eq!(result.end_reason, EndReason::Cancelled);
    assert_eq!(result.miss_count, 1);
    assert_eq!(result.accuracy, 0.0);
    assert_eq!(result.weakest_keys(3)[0].0, session.text()[0]);
}

#[test]
fn headless_ticks_run_countdown() {
    let mut config = Config::default();
    config.game.duration = 1;
    config.game.countdown_seconds = 2;
    let mut session = Session::new(&config, ManualClock::new()).unwrap();
    session.start(GameMode::Practice, 1);

    let (_tx, rx) = mpsc::channel();
    let mut runner = Runner::new(
        TestEventSource::new(rx),
        FixedTicker::new(Duration::from_millis(5)),
    );

    let mut states = Vec::new();
    for _ in 0..3 {
        let event = runner.step();
        states.push(apply_event(&mut session, &event));
    }
    assert_eq!(
        states,
        vec![Lifecycle::Countdown, Lifecycle::Running, Lifecycle::Ended]
    );
    assert_eq!(session.result().unwrap().wpm, 0.0);
}
