/// Guess evaluation: clicked feature vs. current target.
///
/// Exact equality after `normalize_id` on both sides. No fuzzy matching,
/// no geometry; the map layer has already resolved the click to a feature.

use tracing::debug;

use super::catalog::Catalog;
use super::round::RoundState;
use crate::domain::country::normalize_id;

/// What the map layer hands over on a click.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MapFeature {
    /// `None` for shapes with no country metadata (sea, disputed areas).
    pub display_name: Option<String>,
}

impl MapFeature {
    pub fn named(name: &str) -> Self {
        MapFeature { display_name: Some(name.to_string()) }
    }

    pub fn unnamed() -> Self {
        MapFeature { display_name: None }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuessOutcome {
    Correct,
    /// Carries the clicked country's name for feedback.
    Incorrect { picked: String },
    /// No active target or nothing resolvable was clicked. Not an error.
    Ignored,
}

pub fn evaluate_guess(clicked: &MapFeature, round: &RoundState, catalog: &Catalog) -> GuessOutcome {
    let target = match round.target.and_then(|idx| catalog.get(idx)) {
        Some(t) => t,
        None => return GuessOutcome::Ignored,
    };

    let picked = match clicked.display_name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => name,
        _ => return GuessOutcome::Ignored,
    };

    let clicked_id = normalize_id(picked);
    let target_id = normalize_id(&target.display_name);
    debug!(clicked = %clicked_id, target = %target_id, "evaluating guess");

    if clicked_id == target_id {
        GuessOutcome::Correct
    } else {
        GuessOutcome::Incorrect { picked: picked.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::country::{CountryRecord, Geometry};

    fn setup(target: &str) -> (Catalog, RoundState) {
        let cat = Catalog::from_records(vec![
            CountryRecord::new(target, Geometry::default(), ""),
            CountryRecord::new("Spain", Geometry::default(), ""),
        ]);
        let mut round = RoundState::new();
        round.start(0);
        (cat, round)
    }

    #[test]
    fn match_ignores_case_and_whitespace() {
        let (cat, round) = setup("france");
        assert_eq!(evaluate_guess(&MapFeature::named("FRANCE "), &round, &cat), GuessOutcome::Correct);
        assert_eq!(evaluate_guess(&MapFeature::named("  France"), &round, &cat), GuessOutcome::Correct);
    }

    #[test]
    fn target_side_is_normalized_too() {
        let (cat, round) = setup("  FRANCE ");
        assert_eq!(evaluate_guess(&MapFeature::named("france"), &round, &cat), GuessOutcome::Correct);
    }

    #[test]
    fn wrong_country_carries_picked_name() {
        let (cat, round) = setup("France");
        assert_eq!(
            evaluate_guess(&MapFeature::named(" Spain "), &round, &cat),
            GuessOutcome::Incorrect { picked: "Spain".into() }
        );
    }

    #[test]
    fn no_fuzzy_matching() {
        let (cat, round) = setup("France");
        assert!(matches!(
            evaluate_guess(&MapFeature::named("Frence"), &round, &cat),
            GuessOutcome::Incorrect { .. }
        ));
    }

    #[test]
    fn unnamed_feature_is_ignored() {
        let (cat, round) = setup("France");
        assert_eq!(evaluate_guess(&MapFeature::unnamed(), &round, &cat), GuessOutcome::Ignored);
        assert_eq!(evaluate_guess(&MapFeature::named("   "), &round, &cat), GuessOutcome::Ignored);
    }

    #[test]
    fn no_target_is_ignored() {
        let (cat, _) = setup("France");
        let round = RoundState::new();
        assert_eq!(evaluate_guess(&MapFeature::named("France"), &round, &cat), GuessOutcome::Ignored);
    }

    #[test]
    fn stale_target_index_is_ignored() {
        let (cat, mut round) = setup("France");
        round.target = Some(99);
        assert_eq!(evaluate_guess(&MapFeature::named("France"), &round, &cat), GuessOutcome::Ignored);
    }
}
