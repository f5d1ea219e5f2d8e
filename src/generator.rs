//! Practice text generation.
//!
//! Letters are drawn by frequency weight, with candidates typed by the same
//! finger as the previous letter made less likely. Common n-grams are
//! occasionally spliced in whole so the text reads closer to prose.

use crate::{
    config::{Config, GeneratorConfig},
    error::ConfigError,
    rng::{SeededRandom, Seed},
};
use indexmap::IndexMap;
use std::sync::Arc;

/// Finger index; symbols missing from the finger map all share [`UNMAPPED_FINGER`]
pub type Finger = i16;

/// Finger of every symbol absent from the finger map
pub const UNMAPPED_FINGER: Finger = -1;

/// Validated lookup tables shared by every generator built from one config
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorTables {
    letters: Vec<char>,
    weights: Vec<f64>,
    /// finger of each entry in `letters`
    fingers: Vec<Finger>,
    finger_map: IndexMap<char, u8>,
    patterns: Vec<Vec<char>>,
    same_finger_penalty: f64,
    pattern_insert_rate: f64,
}

impl GeneratorTables {
    pub fn new(
        generator: &GeneratorConfig,
        finger_map: &IndexMap<char, u8>,
    ) -> Result<Self, ConfigError> {
        generator.validate()?;

        let letters: Vec<char> = generator.letter_weights.keys().copied().collect();
        let weights = generator.letter_weights.values().copied().collect();
        let fingers = letters.iter().map(|&c| finger_for(finger_map, c)).collect();

        Ok(Self {
            letters,
            weights,
            fingers,
            finger_map: finger_map.clone(),
            patterns: generator
                .patterns
                .iter()
                .map(|p| p.chars().collect())
                .collect(),
            same_finger_penalty: generator.same_finger_penalty,
            pattern_insert_rate: generator.pattern_insert_rate,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Self::new(&config.generator, &config.finger_map)
    }

    fn finger_of(&self, c: char) -> Finger {
        finger_for(&self.finger_map, c)
    }
}

fn finger_for(finger_map: &IndexMap<char, u8>, c: char) -> Finger {
    finger_map
        .get(&c)
        .map_or(UNMAPPED_FINGER, |&f| Finger::from(f))
}

/// Seeded character source. Two generators with the same seed and tables
/// produce the same text.
#[derive(Debug, Clone)]
pub struct CharacterGenerator {
    random: SeededRandom,
    tables: Arc<GeneratorTables>,
    last_finger: Option<Finger>,
    /// reused between draws to avoid reallocating per character
    adjusted: Vec<f64>,
}

impl CharacterGenerator {
    pub fn new(seed: Seed, config: &Config) -> Result<Self, ConfigError> {
        let tables = GeneratorTables::from_config(config)?;
        Ok(Self::with_tables(seed, Arc::new(tables)))
    }

    pub fn with_tables(seed: Seed, tables: Arc<GeneratorTables>) -> Self {
        Self {
            random: SeededRandom::new(seed),
            adjusted: Vec::with_capacity(tables.letters.len()),
            tables,
            last_finger: None,
        }
    }

    /// Finger of the most recently emitted character, `None` before the first
    pub fn last_finger(&self) -> Option<Finger> {
        self.last_finger
    }

    /// Produce exactly `length` characters.
    ///
    /// Each step first rolls for a pattern; a pattern that would overshoot
    /// `length` is dropped and a single letter is drawn instead.
    pub fn generate(&mut self, length: usize) -> String {
        let mut out = String::with_capacity(length);
        let mut emitted = 0;

        while emitted < length {
            if self.random.next() < self.tables.pattern_insert_rate {
                let tables = Arc::clone(&self.tables);
                if let Some(pattern) = self.random.pick(&tables.patterns) {
                    if emitted + pattern.len() <= length {
                        out.extend(pattern.iter());
                        emitted += pattern.len();
                        self.last_finger = pattern.last().map(|&c| tables.finger_of(c));
                        continue;
                    }
                }
            }

            out.push(self.next_char());
            emitted += 1;
        }

        out
    }

    /// Endless single-letter draws, never inserting patterns.
    ///
    /// The stream borrows the generator; dropping it leaves the generator
    /// where the last pulled character left it.
    pub fn stream(&mut self) -> CharStream<'_> {
        CharStream { generator: self }
    }

    fn next_char(&mut self) -> char {
        let tables = &self.tables;
        let last = self.last_finger;

        self.adjusted.clear();
        self.adjusted
            .extend(tables.weights.iter().zip(&tables.fingers).map(
                |(&weight, &finger)| match (last, finger) {
                    (Some(prev), f) if prev == f => weight * tables.same_finger_penalty,
                    _ => weight,
                },
            ));

        // tables are validated non-empty, so the draw always yields a letter
        let c = self
            .random
            .weighted_pick(&tables.letters, &self.adjusted)
            .copied()
            .unwrap_or_default();
        self.last_finger = Some(tables.finger_of(c));
        c
    }
}

/// Lazy, infinite character sequence from [`CharacterGenerator::stream`]
pub struct CharStream<'a> {
    generator: &'a mut CharacterGenerator,
}

impl Iterator for CharStream<'_> {
    type Item = char;

    fn next(&mut self) -> Option<char> {
        Some(self.generator.next_char())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (usize::MAX, None)
    }
}

/// Build a generator for `seed`, validating `config` first
pub fn create_generator(seed: Seed, config: &Config) -> Result<CharacterGenerator, ConfigError> {
    CharacterGenerator::new(seed, config)
}
