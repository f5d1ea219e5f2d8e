// Library surface for the binary, headless tests and reuse.
pub mod app_dirs;
pub mod clock;
pub mod config;
pub mod error;
pub mod generator;
pub mod history;
pub mod logging;
pub mod rank;
pub mod rng;
pub mod runtime;
pub mod session;
pub mod share;
pub mod util;

pub use generator::{create_generator, CharacterGenerator};
pub use rank::{calculate_rank, Rank, RankThresholds};
pub use rng::{date_to_seed, random_seed, today_seed, SeededRandom, Seed};
pub use session::{GameMode, GameResult, Lifecycle, Session};
