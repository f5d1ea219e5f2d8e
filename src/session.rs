use crate::{
    clock::{Clock, SystemClock},
    config::{Config, GameConfig},
    error::ConfigError,
    generator::{CharacterGenerator, GeneratorTables},
    rank::{calculate_rank, Rank, RankThresholds},
    rng::{random_seed, today_seed, Seed},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum GameMode {
    Daily,
    Practice,
}

impl GameMode {
    pub fn label(&self) -> &'static str {
        match self {
            GameMode::Daily => "Daily Challenge",
            GameMode::Practice => "Practice",
        }
    }

    /// Seed for a new attempt: today's date for daily runs, random otherwise
    pub fn fresh_seed(&self) -> Seed {
        match self {
            GameMode::Daily => today_seed(),
            GameMode::Practice => random_seed(),
        }
    }
}

impl std::str::FromStr for GameMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(GameMode::Daily),
            "practice" => Ok(GameMode::Practice),
            other => Err(format!("unknown game mode '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Idle,
    Countdown,
    Running,
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndReason {
    Timeout,
    Cancelled,
}

/// One accepted keypress. Every keystroke is final; there is no backspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyStroke {
    pub typed: char,
    pub expected: char,
    pub correct: bool,
    /// milliseconds since the session left the countdown
    pub timestamp_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputOutcome {
    Recorded { correct: bool },
    /// not a letter; nothing recorded
    Rejected,
    /// the session is not running
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiveStats {
    pub wpm: f64,
    pub accuracy: f64,
    pub correct: usize,
    pub total: usize,
}

impl Default for LiveStats {
    fn default() -> Self {
        Self {
            wpm: 0.0,
            accuracy: 100.0,
            correct: 0,
            total: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyStat {
    pub correct: u32,
    pub miss: u32,
}

impl KeyStat {
    pub fn attempts(&self) -> u32 {
        self.correct + self.miss
    }

    pub fn accuracy(&self) -> f64 {
        match self.attempts() {
            0 => 0.0,
            n => self.correct as f64 / n as f64,
        }
    }
}

/// Snapshot of a finished session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameResult {
    pub mode: GameMode,
    pub seed: Seed,
    pub wpm: f64,
    pub accuracy: f64,
    pub correct_count: usize,
    pub miss_count: usize,
    pub key_stats: BTreeMap<char, KeyStat>,
    pub strokes: Vec<KeyStroke>,
    pub end_reason: EndReason,
}

impl GameResult {
    /// Score a list of keystrokes against a run of `duration_secs` seconds.
    ///
    /// WPM always uses the configured duration, so a cancelled run is scored
    /// as if it lasted the full time.
    pub fn from_strokes(
        mode: GameMode,
        seed: Seed,
        strokes: Vec<KeyStroke>,
        duration_secs: u32,
        end_reason: EndReason,
    ) -> Self {
        let correct_count = strokes.iter().filter(|s| s.correct).count();
        let miss_count = strokes.len() - correct_count;
        let minutes = duration_secs as f64 / 60.0;
        let wpm = if minutes > 0.0 {
            (correct_count as f64 / 5.0) / minutes
        } else {
            0.0
        };
        let accuracy = if strokes.is_empty() {
            0.0
        } else {
            correct_count as f64 / strokes.len() as f64 * 100.0
        };

        let key_stats = strokes
            .iter()
            .fold(BTreeMap::<char, KeyStat>::new(), |mut map, s| {
                let stat = map.entry(s.expected).or_default();
                if s.correct {
                    stat.correct += 1;
                } else {
                    stat.miss += 1;
                }
                map
            });

        Self {
            mode,
            seed,
            wpm,
            accuracy,
            correct_count,
            miss_count,
            key_stats,
            strokes,
            end_reason,
        }
    }

    pub fn total_keystrokes(&self) -> usize {
        self.correct_count + self.miss_count
    }

    pub fn rank(&self, thresholds: &RankThresholds) -> Rank {
        calculate_rank(self.wpm, thresholds)
    }

    /// Missed keys, least accurate first: `(key, accuracy, misses)`
    pub fn weakest_keys(&self, limit: usize) -> Vec<(char, f64, u32)> {
        let mut keys: Vec<(char, f64, u32)> = self
            .key_stats
            .iter()
            .filter(|(_, stat)| stat.miss > 0)
            .map(|(&key, stat)| (key, stat.accuracy(), stat.miss))
            .collect();
        keys.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        keys.truncate(limit);
        keys
    }
}

type EndedCallback = Box<dyn FnMut(&GameResult)>;

/// One timed typing attempt: countdown, sixty seconds of input, result.
///
/// The session is driven from outside: call [`Session::tick`] once per second
/// and [`Session::submit_input`] for each keypress, strictly in arrival order.
/// Nothing here blocks.
pub struct Session<C: Clock = SystemClock> {
    game: GameConfig,
    tables: Arc<GeneratorTables>,
    clock: C,
    lifecycle: Lifecycle,
    mode: Option<GameMode>,
    seed: Option<Seed>,
    generator: Option<CharacterGenerator>,
    text: Vec<char>,
    cursor: usize,
    strokes: Vec<KeyStroke>,
    correct_count: usize,
    countdown_remaining: u32,
    time_remaining: u32,
    started_at: Option<Duration>,
    live: LiveStats,
    result: Option<GameResult>,
    on_ended: Vec<EndedCallback>,
}

impl<C: Clock> std::fmt::Debug for Session<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("lifecycle", &self.lifecycle)
            .field("mode", &self.mode)
            .field("seed", &self.seed)
            .field("cursor", &self.cursor)
            .field("strokes", &self.strokes.len())
            .field("countdown_remaining", &self.countdown_remaining)
            .field("time_remaining", &self.time_remaining)
            .finish_non_exhaustive()
    }
}

impl Session<SystemClock> {
    pub fn with_system_clock(config: &Config) -> Result<Self, ConfigError> {
        Self::new(config, SystemClock::new())
    }
}

impl<C: Clock> Session<C> {
    pub fn new(config: &Config, clock: C) -> Result<Self, ConfigError> {
        config.validate()?;
        let tables = Arc::new(GeneratorTables::from_config(config)?);

        Ok(Self {
            game: config.game.clone(),
            tables,
            clock,
            lifecycle: Lifecycle::Idle,
            mode: None,
            seed: None,
            generator: None,
            text: Vec::new(),
            cursor: 0,
            strokes: Vec::new(),
            correct_count: 0,
            countdown_remaining: config.game.countdown_seconds,
            time_remaining: config.game.duration,
            started_at: None,
            live: LiveStats::default(),
            result: None,
            on_ended: Vec::new(),
        })
    }

    /// Leave `Idle`: seed the generator, fill the buffer, begin the countdown.
    /// Returns false if the session was already started.
    pub fn start(&mut self, mode: GameMode, seed: Seed) -> bool {
        if self.lifecycle != Lifecycle::Idle {
            return false;
        }

        let mut generator = CharacterGenerator::with_tables(seed, Arc::clone(&self.tables));
        self.text = generator.generate(self.game.initial_buffer).chars().collect();
        self.generator = Some(generator);
        self.mode = Some(mode);
        self.seed = Some(seed);
        self.cursor = 0;
        self.strokes.clear();
        self.correct_count = 0;
        self.countdown_remaining = self.game.countdown_seconds;
        self.ensure_buffer();

        tracing::info!(%mode, seed, "session started");

        if self.countdown_remaining == 0 {
            self.begin_running();
        } else {
            self.lifecycle = Lifecycle::Countdown;
        }
        true
    }

    /// Advance one second of countdown or play time. No-op when idle or ended.
    pub fn tick(&mut self) -> Lifecycle {
        match self.lifecycle {
            Lifecycle::Countdown => {
                self.countdown_remaining = self.countdown_remaining.saturating_sub(1);
                if self.countdown_remaining == 0 {
                    self.begin_running();
                }
            }
            Lifecycle::Running => {
                self.time_remaining = self.time_remaining.saturating_sub(1);
                if self.time_remaining == 0 {
                    self.finish(EndReason::Timeout);
                }
            }
            Lifecycle::Idle | Lifecycle::Ended => {}
        }
        self.lifecycle
    }

    /// Score one keypress against the character under the cursor.
    ///
    /// Upper-case letters are folded to lower case; anything else that is not
    /// `a`-`z` is rejected without being recorded.
    pub fn submit_input(&mut self, symbol: char) -> InputOutcome {
        if self.lifecycle != Lifecycle::Running {
            return InputOutcome::Ignored;
        }

        let typed = symbol.to_ascii_lowercase();
        if !typed.is_ascii_lowercase() {
            return InputOutcome::Rejected;
        }

        self.ensure_buffer();
        let Some(&expected) = self.text.get(self.cursor) else {
            return InputOutcome::Ignored;
        };

        let correct = typed == expected;
        let timestamp_ms = self.elapsed().as_millis() as u64;
        self.strokes.push(KeyStroke {
            typed,
            expected,
            correct,
            timestamp_ms,
        });
        if correct {
            self.correct_count += 1;
        }
        self.cursor += 1;

        self.ensure_buffer();
        self.live = self.compute_live();

        tracing::trace!(typed = %typed, expected = %expected, correct, "keystroke");
        InputOutcome::Recorded { correct }
    }

    /// End the attempt early. Only a counting-down or running session is affected.
    pub fn cancel(&mut self) -> bool {
        match self.lifecycle {
            Lifecycle::Countdown | Lifecycle::Running => {
                self.finish(EndReason::Cancelled);
                true
            }
            Lifecycle::Idle | Lifecycle::Ended => false,
        }
    }

    /// Register a callback for the final result. Fires immediately if the
    /// session has already ended.
    pub fn on_ended<F>(&mut self, mut callback: F)
    where
        F: FnMut(&GameResult) + 'static,
    {
        match &self.result {
            Some(result) => callback(result),
            None => self.on_ended.push(Box::new(callback)),
        }
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn mode(&self) -> Option<GameMode> {
        self.mode
    }

    pub fn seed(&self) -> Option<Seed> {
        self.seed
    }

    pub fn text(&self) -> &[char] {
        &self.text
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn expected(&self) -> Option<char> {
        self.text.get(self.cursor).copied()
    }

    pub fn strokes(&self) -> &[KeyStroke] {
        &self.strokes
    }

    pub fn countdown_remaining(&self) -> u32 {
        self.countdown_remaining
    }

    pub fn time_remaining(&self) -> u32 {
        self.time_remaining
    }

    /// Stats as of the last keystroke
    pub fn live(&self) -> LiveStats {
        self.live
    }

    pub fn result(&self) -> Option<&GameResult> {
        self.result.as_ref()
    }

    fn begin_running(&mut self) {
        self.started_at = Some(self.clock.now());
        self.time_remaining = self.game.duration;
        self.lifecycle = Lifecycle::Running;
        tracing::debug!(duration = self.game.duration, "countdown finished");
    }

    fn elapsed(&self) -> Duration {
        self.started_at
            .map(|start| self.clock.now().saturating_sub(start))
            .unwrap_or_default()
    }

    fn compute_live(&self) -> LiveStats {
        let total = self.strokes.len();
        let correct = self.correct_count;
        let minutes = self.elapsed().as_millis() as f64 / 60_000.0;
        let wpm = if minutes > 0.0 {
            (correct as f64 / 5.0) / minutes
        } else {
            0.0
        };
        let accuracy = if total > 0 {
            correct as f64 / total as f64 * 100.0
        } else {
            100.0
        };
        LiveStats {
            wpm,
            accuracy,
            correct,
            total,
        }
    }

    /// Keep at least `lookahead` characters in front of the cursor
    fn ensure_buffer(&mut self) {
        let Some(generator) = self.generator.as_mut() else {
            return;
        };
        let wanted = self.cursor + self.game.lookahead.max(1);
        let chunk = self.game.refill_chunk.max(1);
        while self.text.len() < wanted {
            self.text.extend(generator.generate(chunk).chars());
        }
    }

    fn finish(&mut self, reason: EndReason) {
        self.lifecycle = Lifecycle::Ended;
        let (mode, seed) = match (self.mode, self.seed) {
            (Some(mode), Some(seed)) => (mode, seed),
            _ => return,
        };

        let result = GameResult::from_strokes(
            mode,
            seed,
            self.strokes.clone(),
            self.game.duration,
            reason,
        );
        tracing::info!(
            %mode,
            seed,
            ?reason,
            wpm = result.wpm,
            accuracy = result.accuracy,
            "session ended"
        );

        for callback in self.on_ended.iter_mut() {
            callback(&result);
        }
        self.on_ended.clear();
        self.result = Some(result);
    }
}
