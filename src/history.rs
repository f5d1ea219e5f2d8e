use crate::{
    app_dirs::AppDirs,
    error::HistoryError,
    rng::Seed,
    session::{GameMode, GameResult, KeyStat, KeyStroke},
    util::{mean, std_dev},
};
use chrono::{DateTime, Local, NaiveDate};
use itertools::Itertools;
use rusqlite::{params, types::Type, Connection};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Records kept after each append; older ones are dropped
pub const DEFAULT_RETAIN: usize = 100;

/// Keys need this many attempts before they count as weak or strong
const MIN_KEY_SAMPLES: u32 = 10;

/// A stored result with its identity and date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    pub id: String,
    pub mode: GameMode,
    pub seed: Seed,
    pub date: DateTime<Local>,
    pub wpm: f64,
    pub accuracy: f64,
    pub correct_count: usize,
    pub miss_count: usize,
    pub key_stats: BTreeMap<char, KeyStat>,
    pub strokes: Vec<KeyStroke>,
}

impl GameRecord {
    pub fn from_result(result: &GameResult, date: DateTime<Local>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            mode: result.mode,
            seed: result.seed,
            date,
            wpm: result.wpm,
            accuracy: result.accuracy,
            correct_count: result.correct_count,
            miss_count: result.miss_count,
            key_stats: result.key_stats.clone(),
            strokes: result.strokes.clone(),
        }
    }
}

/// Which records a query returns. Results are always oldest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordFilter {
    pub mode: Option<GameMode>,
    /// local calendar day the record was made on
    pub on_date: Option<NaiveDate>,
    /// keep only the most recent N matches
    pub last: Option<usize>,
}

impl RecordFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn mode(mut self, mode: GameMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn on_date(mut self, date: NaiveDate) -> Self {
        self.on_date = Some(date);
        self
    }

    pub fn last(mut self, n: usize) -> Self {
        self.last = Some(n);
        self
    }

    fn matches(&self, record: &GameRecord) -> bool {
        self.mode.map_or(true, |m| record.mode == m)
            && self
                .on_date
                .map_or(true, |d| record.date.date_naive() == d)
    }
}

/// Storage for past results, owned by the caller rather than the session
pub trait HistoryRepository {
    fn append(&mut self, record: &GameRecord) -> Result<(), HistoryError>;
    fn query(&self, filter: &RecordFilter) -> Result<Vec<GameRecord>, HistoryError>;
}

/// SQLite-backed history
#[derive(Debug)]
pub struct SqliteHistory {
    conn: Connection,
    retain: usize,
}

impl SqliteHistory {
    /// Open the database at the default state directory
    pub fn open_default() -> Result<Self, HistoryError> {
        let path = AppDirs::db_path().unwrap_or_else(|| PathBuf::from("typealpha_history.db"));
        Self::open(path)
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, HistoryError> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path.as_ref())?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, HistoryError> {
        Self::init(Connection::open_in_memory()?)
    }

    pub fn with_retain(mut self, retain: usize) -> Self {
        self.retain = retain;
        self
    }

    fn init(conn: Connection) -> Result<Self, HistoryError> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS game_records (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                mode TEXT NOT NULL,
                seed INTEGER NOT NULL,
                date TEXT NOT NULL,
                wpm REAL NOT NULL,
                accuracy REAL NOT NULL,
                correct_count INTEGER NOT NULL,
                miss_count INTEGER NOT NULL,
                key_stats TEXT NOT NULL,
                strokes TEXT NOT NULL
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_game_records_mode ON game_records(mode)",
            [],
        )?;

        Ok(Self {
            conn,
            retain: DEFAULT_RETAIN,
        })
    }

    /// Remove every record
    pub fn clear(&self) -> Result<(), HistoryError> {
        self.conn.execute("DELETE FROM game_records", [])?;
        Ok(())
    }

    pub fn len(&self) -> Result<usize, HistoryError> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM game_records", [], |row| row.get(0))?;
        Ok(n as usize)
    }

    pub fn is_empty(&self) -> Result<bool, HistoryError> {
        Ok(self.len()? == 0)
    }
}

fn json_column<T: serde::de::DeserializeOwned>(idx: usize, raw: &str) -> rusqlite::Result<T> {
    serde_json::from_str(raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

impl HistoryRepository for SqliteHistory {
    fn append(&mut self, record: &GameRecord) -> Result<(), HistoryError> {
        let key_stats = serde_json::to_string(&record.key_stats)?;
        let strokes = serde_json::to_string(&record.strokes)?;

        let tx = self.conn.transaction()?;
        tx.execute(
            r#"
            INSERT INTO game_records
            (id, mode, seed, date, wpm, accuracy, correct_count, miss_count, key_stats, strokes)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                record.id,
                record.mode.to_string(),
                record.seed,
                record.date.to_rfc3339(),
                record.wpm,
                record.accuracy,
                record.correct_count as i64,
                record.miss_count as i64,
                key_stats,
                strokes,
            ],
        )?;
        tx.execute(
            r#"
            DELETE FROM game_records
            WHERE seq NOT IN (SELECT seq FROM game_records ORDER BY seq DESC LIMIT ?1)
            "#,
            [self.retain as i64],
        )?;
        tx.commit()?;

        tracing::debug!(id = %record.id, mode = %record.mode, wpm = record.wpm, "history record saved");
        Ok(())
    }

    fn query(&self, filter: &RecordFilter) -> Result<Vec<GameRecord>, HistoryError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, mode, seed, date, wpm, accuracy, correct_count, miss_count, key_stats, strokes
            FROM game_records
            WHERE (?1 IS NULL OR mode = ?1)
            ORDER BY seq
            "#,
        )?;

        let rows = stmt.query_map([filter.mode.map(|m| m.to_string())], |row| {
            let mode_str: String = row.get(1)?;
            let mode = mode_str.parse::<GameMode>().map_err(|_| {
                rusqlite::Error::InvalidColumnType(1, "mode".to_string(), Type::Text)
            })?;
            let date_str: String = row.get(3)?;
            let date = DateTime::parse_from_rfc3339(&date_str)
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?
                .with_timezone(&Local);
            let key_stats: String = row.get(8)?;
            let strokes: String = row.get(9)?;

            Ok(GameRecord {
                id: row.get(0)?,
                mode,
                seed: row.get(2)?,
                date,
                wpm: row.get(4)?,
                accuracy: row.get(5)?,
                correct_count: row.get::<_, i64>(6)? as usize,
                miss_count: row.get::<_, i64>(7)? as usize,
                key_stats: json_column(8, &key_stats)?,
                strokes: json_column(9, &strokes)?,
            })
        })?;

        let mut records = Vec::new();
        for row in rows {
            let record = row?;
            if filter.matches(&record) {
                records.push(record);
            }
        }

        if let Some(n) = filter.last {
            let skip = records.len().saturating_sub(n);
            records.drain(..skip);
        }
        Ok(records)
    }
}

/// Highest-WPM record; the earliest one wins a tie
pub fn best_record(records: &[GameRecord]) -> Option<&GameRecord> {
    records.iter().fold(None, |best: Option<&GameRecord>, r| match best {
        Some(b) if r.wpm <= b.wpm => Some(b),
        _ => Some(r),
    })
}

/// Aggregated accuracy of one key across many records
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeakKey {
    pub key: char,
    /// fraction in [0, 1]
    pub accuracy: f64,
    pub count: u32,
}

/// Least accurate keys over `records`, ignoring keys with fewer than ten attempts
pub fn weak_keys(records: &[GameRecord], limit: usize) -> Vec<WeakKey> {
    let totals = records
        .iter()
        .flat_map(|r| r.key_stats.iter())
        .fold(BTreeMap::<char, KeyStat>::new(), |mut map, (&key, stat)| {
            let entry = map.entry(key).or_default();
            entry.correct += stat.correct;
            entry.miss += stat.miss;
            map
        });

    totals
        .into_iter()
        .filter(|(_, stat)| stat.attempts() >= MIN_KEY_SAMPLES)
        .map(|(key, stat)| WeakKey {
            key,
            accuracy: stat.accuracy(),
            count: stat.attempts(),
        })
        .sorted_by(|a, b| {
            a.accuracy
                .partial_cmp(&b.accuracy)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .take(limit)
        .collect()
}

/// Totals and averages over a set of records
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HistorySummary {
    pub total: usize,
    pub daily: usize,
    pub practice: usize,
    pub avg_wpm: f64,
    pub avg_accuracy: f64,
    pub wpm_std_dev: f64,
}

impl HistorySummary {
    pub fn from_records(records: &[GameRecord]) -> Self {
        let wpms: Vec<f64> = records.iter().map(|r| r.wpm).collect();
        let accuracies: Vec<f64> = records.iter().map(|r| r.accuracy).collect();
        let (daily, practice): (Vec<_>, Vec<_>) =
            records.iter().partition(|r| r.mode == GameMode::Daily);

        Self {
            total: records.len(),
            daily: daily.len(),
            practice: practice.len(),
            avg_wpm: mean(&wpms).unwrap_or(0.0),
            avg_accuracy: mean(&accuracies).unwrap_or(0.0),
            wpm_std_dev: std_dev(&wpms).unwrap_or(0.0),
        }
    }
}
