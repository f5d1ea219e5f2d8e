use crate::{error::ConfigError, rank::RankThresholds};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Game settings and generator tuning, loaded from `config.json`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub game: GameConfig,
    pub generator: GeneratorConfig,
    pub finger_map: IndexMap<char, u8>,
    pub ranking: RankingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GameConfig {
    /// length of a run in seconds
    pub duration: u32,
    pub countdown_seconds: u32,
    /// characters generated when a session starts
    #[serde(default = "default_initial_buffer")]
    pub initial_buffer: usize,
    /// keep at least this many characters ahead of the cursor
    #[serde(default = "default_lookahead")]
    pub lookahead: usize,
    #[serde(default = "default_refill_chunk")]
    pub refill_chunk: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GeneratorConfig {
    pub letter_weights: IndexMap<char, f64>,
    pub same_finger_penalty: f64,
    pub pattern_insert_rate: f64,
    pub patterns: Vec<String>,
}

/// Minimum WPM per tier
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RankingConfig {
    #[serde(rename = "S")]
    pub s: f64,
    #[serde(rename = "A")]
    pub a: f64,
    #[serde(rename = "B")]
    pub b: f64,
    #[serde(rename = "C")]
    pub c: f64,
    #[serde(rename = "D")]
    pub d: f64,
}

fn default_initial_buffer() -> usize {
    200
}

fn default_lookahead() -> usize {
    120
}

fn default_refill_chunk() -> usize {
    100
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            duration: 60,
            countdown_seconds: 3,
            initial_buffer: default_initial_buffer(),
            lookahead: default_lookahead(),
            refill_chunk: default_refill_chunk(),
        }
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        let letter_weights = [
            ('a', 8.2),
            ('b', 1.5),
            ('c', 2.8),
            ('d', 4.3),
            ('e', 12.7),
            ('f', 2.2),
            ('g', 2.0),
            ('h', 6.1),
            ('i', 7.0),
            ('j', 0.15),
            ('k', 0.77),
            ('l', 4.0),
            ('m', 2.4),
            ('n', 6.7),
            ('o', 7.5),
            ('p', 1.9),
            ('q', 0.095),
            ('r', 6.0),
            ('s', 6.3),
            ('t', 9.1),
            ('u', 2.8),
            ('v', 0.98),
            ('w', 2.4),
            ('x', 0.15),
            ('y', 2.0),
            ('z', 0.074),
        ]
        .into_iter()
        .collect();

        let patterns = [
            "ing", "the", "tion", "and", "ent", "ion", "ere", "her", "ate", "ter", "hat", "all",
            "ith",
        ]
        .into_iter()
        .map(String::from)
        .collect();

        Self {
            letter_weights,
            same_finger_penalty: 0.3,
            pattern_insert_rate: 0.15,
            patterns,
        }
    }
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            s: 120.0,
            a: 90.0,
            b: 60.0,
            c: 40.0,
            d: 0.0,
        }
    }
}

/// Left hand pinky (0) through right hand pinky (7), thumbs unused
pub fn default_finger_map() -> IndexMap<char, u8> {
    [
        ("aqz", 0),
        ("swx", 1),
        ("dec", 2),
        ("frvtgb", 3),
        ("jumyhn", 4),
        ("ki", 5),
        ("lo", 6),
        ("p", 7),
    ]
    .into_iter()
    .flat_map(|(keys, finger)| keys.chars().map(move |c| (c, finger)))
    .collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            game: GameConfig::default(),
            generator: GeneratorConfig::default(),
            finger_map: default_finger_map(),
            ranking: RankingConfig::default(),
        }
    }
}

impl GeneratorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.letter_weights.is_empty() {
            return Err(ConfigError::EmptyWeights);
        }
        if let Some((&symbol, &weight)) = self
            .letter_weights
            .iter()
            .find(|(_, w)| !(w.is_finite() && **w > 0.0))
        {
            return Err(ConfigError::NonPositiveWeight { symbol, weight });
        }
        if !(self.same_finger_penalty > 0.0 && self.same_finger_penalty <= 1.0) {
            return Err(ConfigError::PenaltyOutOfRange(self.same_finger_penalty));
        }
        if !(0.0..=1.0).contains(&self.pattern_insert_rate) {
            return Err(ConfigError::InsertRateOutOfRange(self.pattern_insert_rate));
        }
        if self.patterns.iter().any(String::is_empty) {
            return Err(ConfigError::EmptyPattern);
        }
        if self.patterns.is_empty() && self.pattern_insert_rate > 0.0 {
            return Err(ConfigError::NoPatterns(self.pattern_insert_rate));
        }
        Ok(())
    }
}

impl Config {
    /// Check every section; the core trusts a config that passed this
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.generator.validate()?;
        if self.game.duration == 0 {
            return Err(ConfigError::ZeroDuration);
        }
        RankThresholds::try_from(&self.ranking)?;
        Ok(())
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new() -> Self {
        let path = crate::app_dirs::AppDirs::config_path()
            .unwrap_or_else(|| PathBuf::from("typealpha_config.json"));
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        match fs::read(&self.path) {
            Ok(bytes) => match serde_json::from_slice::<Config>(&bytes) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    tracing::warn!(path = %self.path.display(), error = %e, "malformed config, using defaults")
                }
            },
            Err(e) => {
                tracing::debug!(path = %self.path.display(), error = %e, "no config file, using defaults")
            }
        }
        Config::default()
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tempfile::tempdir;

    #[test]
    fn default_store_uses_platform_path() {
        let store = FileConfigStore::default();
        assert_eq!(store.path(), FileConfigStore::new().path());
        let file = store.path().file_name().and_then(|f| f.to_str());
        assert_matches!(file, Some("config.json") | Some("typealpha_config.json"));
    }

    #[test]
    fn default_config_is_valid() {
        assert_eq!(Config::default().validate(), Ok(()));
    }

    #[test]
    fn default_finger_map_covers_alphabet() {
        let map = default_finger_map();
        assert_eq!(map.len(), 26);
        assert_eq!(map[&'a'], 0);
        assert_eq!(map[&'t'], 3);
        assert_eq!(map[&'n'], 4);
        assert_eq!(map[&'p'], 7);
    }

    #[test]
    fn roundtrip_default_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let store = FileConfigStore::with_path(&path);
        let cfg = Config::default();
        store.save(&cfg).unwrap();
        let loaded = store.load();
        assert_eq!(cfg, loaded);
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempdir().unwrap();
        let store = FileConfigStore::with_path(dir.path().join("absent.json"));
        assert_eq!(store.load(), Config::default());
    }

    #[test]
    fn malformed_file_loads_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, b"{ not json").unwrap();
        let store = FileConfigStore::with_path(&path);
        assert_eq!(store.load(), Config::default());
    }

    #[test]
    fn reads_camel_case_document() {
        let json = r#"{
            "game": { "duration": 30, "countdownSeconds": 0 },
            "generator": {
                "letterWeights": { "z": 1.0, "a": 2.0 },
                "sameFingerPenalty": 0.5,
                "patternInsertRate": 0.0,
                "patterns": []
            },
            "fingerMap": { "a": 0, "z": 0 },
            "ranking": { "S": 100, "A": 80, "B": 50, "C": 30, "D": 0 }
        }"#;
        let cfg: Config = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.game.duration, 30);
        assert_eq!(cfg.game.countdown_seconds, 0);
        assert_eq!(cfg.game.initial_buffer, 200);
        assert_eq!(cfg.game.lookahead, 120);
        // document order is kept
        assert_eq!(
            cfg.generator.letter_weights.keys().copied().collect::<Vec<_>>(),
            vec!['z', 'a']
        );
        assert_eq!(cfg.ranking.s, 100.0);
        assert_eq!(cfg.validate(), Ok(()));
    }

    #[test]
    fn rejects_empty_weights() {
        let mut cfg = Config::default();
        cfg.generator.letter_weights.clear();
        assert_eq!(cfg.validate(), Err(ConfigError::EmptyWeights));
    }

    #[test]
    fn rejects_non_positive_weight() {
        let mut cfg = Config::default();
        cfg.generator.letter_weights.insert('e', 0.0);
        assert_matches!(
            cfg.validate(),
            Err(ConfigError::NonPositiveWeight { symbol: 'e', .. })
        );
    }

    #[test]
    fn rejects_out_of_range_rates() {
        let mut cfg = Config::default();
        cfg.generator.same_finger_penalty = 0.0;
        assert_matches!(cfg.validate(), Err(ConfigError::PenaltyOutOfRange(_)));

        let mut cfg = Config::default();
        cfg.generator.same_finger_penalty = 1.5;
        assert_matches!(cfg.validate(), Err(ConfigError::PenaltyOutOfRange(_)));

        let mut cfg = Config::default();
        cfg.generator.pattern_insert_rate = -0.1;
        assert_matches!(cfg.validate(), Err(ConfigError::InsertRateOutOfRange(_)));
    }

    #[test]
    fn rejects_missing_patterns() {
        let mut cfg = Config::default();
        cfg.generator.patterns.clear();
        assert_matches!(cfg.validate(), Err(ConfigError::NoPatterns(_)));

        cfg.generator.pattern_insert_rate = 0.0;
        assert_eq!(cfg.validate(), Ok(()));

        cfg.generator.patterns.push(String::new());
        assert_eq!(cfg.validate(), Err(ConfigError::EmptyPattern));
    }

    #[test]
    fn rejects_zero_duration() {
        let mut cfg = Config::default();
        cfg.game.duration = 0;
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroDuration));
    }

    #[test]
    fn rejects_inverted_ranking() {
        let mut cfg = Config::default();
        cfg.ranking.b = 95.0;
        assert_matches!(
            cfg.validate(),
            Err(ConfigError::RankingNotMonotonic { .. })
        );
    }
}
