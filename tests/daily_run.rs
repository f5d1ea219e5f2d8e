use std::time::Duration;

use chrono::{Local, NaiveDate};
use tempfile::TempDir;
use typealpha::clock::ManualClock;
use typealpha::config::Config;
use typealpha::history::{
    best_record, GameRecord, HistoryRepository, RecordFilter, SqliteHistory,
};
use typealpha::rank::{Rank, RankThresholds};
use typealpha::session::{EndReason, GameMode, Lifecycle, Session};
use typealpha::{date_to_seed, share};

const DAILY_TEXT: &str = "tiutontiaatehraesionsvtheaiontdbithooire";

// A full daily challenge: countdown, sixty seconds at five correct keys per
// second, then persisting the result.
#[test]
fn daily_run_end_to_end() {
    let seed = date_to_seed(NaiveDate::from_ymd_opt(2024, 6, 15).unwrap());
    assert_eq!(seed, 20240615);

    let config = Config::default();
    let clock = ManualClock::new();
    let mut session = Session::new(&config, clock.clone()).unwrap();
    assert!(session.start(GameMode::Daily, seed));

    let head: String = session.text()[..40].iter().collect();
    assert_eq!(head, DAILY_TEXT);

    for _ in 0..3 {
        assert_eq!(session.lifecycle(), Lifecycle::Countdown);
        session.tick();
    }
    assert_eq!(session.lifecycle(), Lifecycle::Running);

    for second in 0..60 {
        for _ in 0..5 {
            clock.advance(Duration::from_millis(200));
            let c = session.expected().unwrap();
            session.submit_input(c);
        }
        if second == 59 {
            assert_eq!(session.live().wpm, 60.0);
        }
        session.tick();
    }

    assert_eq!(session.lifecycle(), Lifecycle::Ended);
    let result = session.result().unwrap().clone();
    assert_eq!(result.end_reason, EndReason::Timeout);
    assert_eq!(result.correct_count, 300);
    assert_eq!(result.wpm, 60.0);
    assert_eq!(result.accuracy, 100.0);
    assert_eq!(result.strokes.last().unwrap().timestamp_ms, 60_000);

    let thresholds = RankThresholds::try_from(&config.ranking).unwrap();
    assert_eq!(result.rank(&thresholds), Rank::B);

    assert!(share::summary_text(&result).contains("WPM: 60"));

    let dir = TempDir::new().unwrap();
    let mut history = SqliteHistory::open(dir.path().join("history.db")).unwrap();
    history
        .append(&GameRecord::from_result(&result, Local::now()))
        .unwrap();

    let reopened = SqliteHistory::open(dir.path().join("history.db")).unwrap();
    let today = reopened
        .query(
            &RecordFilter::all()
                .mode(GameMode::Daily)
                .on_date(Local::now().date_naive()),
        )
        .unwrap();
    assert_eq!(today.len(), 1);
    let best = best_record(&today).unwrap();
    assert_eq!(best.seed, seed);
    assert_eq!(best.wpm, 60.0);
    assert_eq!(best.key_stats, result.key_stats);
}

#[test]
fn same_date_gives_same_text_across_sessions() {
    let config = Config::default();
    let seed = date_to_seed(NaiveDate::from_ymd_opt(2025, 1, 2).unwrap());

    let mut a = Session::new(&config, ManualClock::new()).unwrap();
    let mut b = Session::new(&config, ManualClock::new()).unwrap();
    a.start(GameMode::Daily, seed);
    b.start(GameMode::Daily, seed);
    assert_eq!(a.text(), b.text());
}
