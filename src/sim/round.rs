/// Round selection.
///
/// A round is one target, from selection until it is guessed correctly
/// (or the streak ends). Targets are drawn uniformly from the catalog
/// records that have a display name; unnamed features never qualify.

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use super::catalog::Catalog;
use crate::error::{GameError, Result};

/// Whether the same country may be drawn twice in a row.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum RepeatPolicy {
    /// Uniform over every candidate, including the previous target.
    #[default]
    Allow,
    /// Exclude the previous target while another candidate exists.
    AvoidPrevious,
}

#[derive(Clone, Debug, Default)]
pub struct RoundState {
    /// Catalog index of the current target. `None` only before the first round.
    pub target: Option<usize>,
    pub feedback: String,
    /// Increments on every new round, so two rounds on the same country
    /// are still distinguishable.
    pub round_no: u64,
}

impl RoundState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a round on `target`: clears feedback.
    pub fn start(&mut self, target: usize) {
        self.target = Some(target);
        self.feedback.clear();
        self.round_no += 1;
    }

    /// Pick and start the next round.
    pub fn advance<R: Rng + ?Sized>(
        &mut self,
        catalog: &Catalog,
        rng: &mut R,
        policy: RepeatPolicy,
    ) -> Result<usize> {
        let idx = select_round(catalog, rng, policy, self.target)?;
        self.start(idx);
        Ok(idx)
    }
}

/// Choose a target index from the selectable part of `catalog`.
///
/// Fails with `GameError::Data` when no record has a display name.
pub fn select_round<R: Rng + ?Sized>(
    catalog: &Catalog,
    rng: &mut R,
    policy: RepeatPolicy,
    previous: Option<usize>,
) -> Result<usize> {
    let mut candidates = catalog.selectable_indices();
    if candidates.is_empty() {
        return Err(GameError::Data("no country with a display name to select".into()));
    }

    if policy == RepeatPolicy::AvoidPrevious && candidates.len() > 1 {
        if let Some(prev) = previous {
            candidates.retain(|&i| i != prev);
        }
    }

    let idx = *candidates
        .choose(rng)
        .ok_or_else(|| GameError::Data("no candidate country".into()))?;
    debug!(target_idx = idx, candidates = candidates.len(), "round selected");
    Ok(idx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::country::{CountryRecord, Geometry};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn catalog(names: &[&str]) -> Catalog {
        Catalog::from_records(
            names.iter().map(|n| CountryRecord::new(n, Geometry::default(), "")).collect(),
        )
    }

    #[test]
    fn always_selects_a_named_record() {
        let cat = catalog(&["", "Peru", "  ", "Chile", "Japan"]);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let idx = select_round(&cat, &mut rng, RepeatPolicy::Allow, None).unwrap();
            assert!(cat.get(idx).unwrap().is_selectable());
        }
    }

    #[test]
    fn single_record_catalog() {
        let cat = catalog(&["Peru"]);
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(select_round(&cat, &mut rng, RepeatPolicy::Allow, None).unwrap(), 0);
        // Avoidance cannot apply with one candidate.
        assert_eq!(select_round(&cat, &mut rng, RepeatPolicy::AvoidPrevious, Some(0)).unwrap(), 0);
    }

    #[test]
    fn empty_or_unnamed_catalog_is_data_error() {
        let mut rng = StdRng::seed_from_u64(1);
        for cat in [catalog(&[]), catalog(&["", "   "])] {
            let err = select_round(&cat, &mut rng, RepeatPolicy::Allow, None).unwrap_err();
            assert!(matches!(err, GameError::Data(_)));
        }
    }

    #[test]
    fn allow_policy_can_repeat() {
        let cat = catalog(&["Peru", "Chile"]);
        let mut rng = StdRng::seed_from_u64(3);
        let mut prev = None;
        let mut repeated = false;
        for _ in 0..100 {
            let idx = select_round(&cat, &mut rng, RepeatPolicy::Allow, prev).unwrap();
            repeated |= prev == Some(idx);
            prev = Some(idx);
        }
        assert!(repeated);
    }

    #[test]
    fn avoid_policy_never_repeats() {
        let cat = catalog(&["Peru", "Chile", "Japan"]);
        let mut rng = StdRng::seed_from_u64(11);
        let mut prev = None;
        for _ in 0..100 {
            let idx = select_round(&cat, &mut rng, RepeatPolicy::AvoidPrevious, prev).unwrap();
            assert_ne!(Some(idx), prev);
            prev = Some(idx);
        }
    }

    #[test]
    fn selection_is_roughly_uniform() {
        let cat = catalog(&["A", "B", "C", "D"]);
        let mut rng = StdRng::seed_from_u64(42);
        let mut counts = [0u32; 4];
        for _ in 0..4000 {
            counts[select_round(&cat, &mut rng, RepeatPolicy::Allow, None).unwrap()] += 1;
        }
        assert!(counts.iter().all(|&c| c > 800 && c < 1200), "{counts:?}");
    }

    #[test]
    fn start_clears_feedback_and_bumps_round() {
        let mut round = RoundState::new();
        round.feedback = "Incorrect".into();
        round.start(2);
        assert_eq!(round.target, Some(2));
        assert!(round.feedback.is_empty());
        assert_eq!(round.round_no, 1);
        round.start(2);
        assert_eq!(round.round_no, 2);
    }

    #[test]
    fn advance_sets_target() {
        let cat = catalog(&["Peru", "Chile"]);
        let mut rng = StdRng::seed_from_u64(5);
        let mut round = RoundState::new();
        let idx = round.advance(&cat, &mut rng, RepeatPolicy::Allow).unwrap();
        assert_eq!(round.target, Some(idx));
    }
}
