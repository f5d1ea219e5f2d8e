use crate::{config::RankingConfig, error::ConfigError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display)]
pub enum Rank {
    S,
    A,
    B,
    C,
    D,
}

/// Tiers with their minimum WPM, highest tier first.
///
/// Thresholds never increase from one tier to the next; the last tier is
/// the catch-all for anything below the others.
#[derive(Debug, Clone, PartialEq)]
pub struct RankThresholds {
    tiers: Vec<(Rank, f64)>,
}

impl RankThresholds {
    pub fn new(tiers: Vec<(Rank, f64)>) -> Result<Self, ConfigError> {
        if tiers.is_empty() {
            return Err(ConfigError::EmptyRanking);
        }
        if let Some((tier, _)) = tiers.iter().find(|(_, min)| !min.is_finite()) {
            return Err(ConfigError::NonFiniteThreshold {
                tier: tier.to_string(),
            });
        }
        for pair in tiers.windows(2) {
            let (upper, upper_min) = pair[0];
            let (lower, lower_min) = pair[1];
            if lower_min > upper_min {
                return Err(ConfigError::RankingNotMonotonic {
                    upper: upper.to_string(),
                    upper_min,
                    lower: lower.to_string(),
                    lower_min,
                });
            }
        }
        Ok(Self { tiers })
    }

    pub fn tiers(&self) -> &[(Rank, f64)] {
        &self.tiers
    }

    /// The catch-all tier
    pub fn lowest(&self) -> Rank {
        // `new` refuses an empty list
        self.tiers.last().map(|(rank, _)| *rank).unwrap_or(Rank::D)
    }
}

impl TryFrom<&RankingConfig> for RankThresholds {
    type Error = ConfigError;

    fn try_from(cfg: &RankingConfig) -> Result<Self, Self::Error> {
        Self::new(vec![
            (Rank::S, cfg.s),
            (Rank::A, cfg.a),
            (Rank::B, cfg.b),
            (Rank::C, cfg.c),
            (Rank::D, cfg.d),
        ])
    }
}

/// First tier whose threshold is at or below `wpm`, else the lowest tier
pub fn calculate_rank(wpm: f64, thresholds: &RankThresholds) -> Rank {
    thresholds
        .tiers
        .iter()
        .find(|(_, min)| *min <= wpm)
        .map(|(rank, _)| *rank)
        .unwrap_or_else(|| thresholds.lowest())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn standard() -> RankThresholds {
        RankThresholds::try_from(&RankingConfig::default()).unwrap()
    }

    #[test]
    fn test_rank_boundaries() {
        let t = standard();
        assert_eq!(calculate_rank(119.0, &t), Rank::A);
        assert_eq!(calculate_rank(120.0, &t), Rank::S);
        assert_eq!(calculate_rank(-5.0, &t), Rank::D);
        assert_eq!(calculate_rank(0.0, &t), Rank::D);
        assert_eq!(calculate_rank(40.0, &t), Rank::C);
        assert_eq!(calculate_rank(59.99, &t), Rank::C);
        assert_eq!(calculate_rank(60.0, &t), Rank::B);
        assert_eq!(calculate_rank(500.0, &t), Rank::S);
    }

    #[test]
    fn test_lowest_is_catch_all_even_with_positive_floor() {
        let t = RankThresholds::new(vec![(Rank::S, 100.0), (Rank::D, 10.0)]).unwrap();
        assert_eq!(calculate_rank(5.0, &t), Rank::D);
        assert_eq!(calculate_rank(f64::NAN, &t), Rank::D);
    }

    #[test]
    fn test_thresholds_unchanged_by_lookup() {
        let t = standard();
        let before = t.clone();
        let _ = calculate_rank(75.0, &t);
        assert_eq!(t, before);
    }

    #[test]
    fn test_equal_thresholds_pick_higher_tier() {
        let t = RankThresholds::new(vec![(Rank::A, 50.0), (Rank::B, 50.0), (Rank::D, 0.0)])
            .unwrap();
        assert_eq!(calculate_rank(50.0, &t), Rank::A);
    }

    #[test]
    fn test_rejects_bad_thresholds() {
        assert_eq!(RankThresholds::new(vec![]), Err(ConfigError::EmptyRanking));
        assert!(matches!(
            RankThresholds::new(vec![(Rank::S, 10.0), (Rank::A, 20.0)]),
            Err(ConfigError::RankingNotMonotonic { .. })
        ));
        assert!(matches!(
            RankThresholds::new(vec![(Rank::S, f64::INFINITY)]),
            Err(ConfigError::NonFiniteThreshold { .. })
        ));
    }

    #[test]
    fn test_rank_display() {
        assert_eq!(Rank::S.to_string(), "S");
        assert_eq!(Rank::D.to_string(), "D");
    }
}
