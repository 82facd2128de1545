/// Session state machine.
///
/// One `Session` owns everything that changes during play: stats, the
/// current round and the difficulty. The UI only reads it and forwards
/// clicks through `handle_click`, the single dispatch point.
///
/// ## Transitions on a guess
/// ┌───────────────────────────┬───────────────────────────────────────────────┐
/// │ Outcome                   │ Effect                                        │
/// ├───────────────────────────┼───────────────────────────────────────────────┤
/// │ Ignored                   │ nothing                                       │
/// │ Correct                   │ score+1, next round, lives unchanged          │
/// │ Incorrect, lives > 1      │ lives-1, SAME target, feedback names pick     │
/// │ Incorrect, lives == 1     │ max=max(max,score), score=0, lives reset,     │
/// │                           │ next round immediately (no terminal state)    │
/// └───────────────────────────┴───────────────────────────────────────────────┘

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{error, info};

use super::catalog::Catalog;
use super::event::GameEvent;
use super::guess::{evaluate_guess, GuessOutcome, MapFeature};
use super::round::{RepeatPolicy, RoundState};
use crate::config::GameSettings;
use crate::domain::country::CountryRecord;
use crate::domain::difficulty::{render_config_for, DifficultyLevel, RenderConfig};
use crate::error::Result;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct SessionStats {
    pub score: u32,
    pub lives: u32,
    /// Best streak seen at a game-over. Never decreases.
    pub max_score: u32,
}

impl SessionStats {
    pub fn new(starting_lives: u32) -> Self {
        SessionStats { score: 0, lives: starting_lives, max_score: 0 }
    }
}

pub struct Session {
    catalog: Catalog,
    pub stats: SessionStats,
    pub round: RoundState,
    pub difficulty: DifficultyLevel,
    starting_lives: u32,
    policy: RepeatPolicy,
    rng: StdRng,
}

// ── Construction ──

impl Session {
    /// Start a session and its first round. The RNG is seeded from config
    /// when a seed is set, otherwise from OS entropy.
    pub fn start(catalog: Catalog, settings: &GameSettings) -> Result<Self> {
        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(catalog, settings, rng)
    }

    /// Fails with `GameError::Data` if the catalog has nothing to select.
    pub fn with_rng(catalog: Catalog, settings: &GameSettings, rng: StdRng) -> Result<Self> {
        let mut session = Session {
            catalog,
            stats: SessionStats::new(settings.starting_lives),
            round: RoundState::new(),
            difficulty: settings.difficulty,
            starting_lives: settings.starting_lives,
            policy: settings.repeat_policy,
            rng,
        };
        session.round.advance(&session.catalog, &mut session.rng, session.policy)?;
        info!(
            target_country = %session.target_name(),
            lives = session.stats.lives,
            difficulty = %session.difficulty,
            "session started"
        );
        Ok(session)
    }
}

// ── Queries ──

impl Session {
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn target(&self) -> Option<&CountryRecord> {
        self.round.target.and_then(|idx| self.catalog.get(idx))
    }

    pub fn target_name(&self) -> &str {
        self.target().map(|t| t.display_name.as_str()).unwrap_or("")
    }

    /// Flag of the current target; empty when unknown.
    pub fn target_flag(&self) -> &str {
        self.target().map(|t| t.flag_ref.as_str()).unwrap_or("")
    }

    pub fn feedback(&self) -> &str {
        &self.round.feedback
    }

    pub fn render_config(&self) -> RenderConfig {
        render_config_for(self.difficulty)
    }
}

// ── Transitions ──

impl Session {
    /// Single entry point for map clicks.
    pub fn handle_click(&mut self, feature: &MapFeature) -> Vec<GameEvent> {
        let outcome = evaluate_guess(feature, &self.round, &self.catalog);
        self.apply_outcome(outcome)
    }

    pub fn apply_outcome(&mut self, outcome: GuessOutcome) -> Vec<GameEvent> {
        let mut events = Vec::new();
        match outcome {
            GuessOutcome::Ignored => {}
            GuessOutcome::Correct => self.on_correct(&mut events),
            GuessOutcome::Incorrect { picked } => {
                if self.stats.lives > 1 {
                    self.on_wrong(picked, &mut events);
                } else {
                    self.on_last_life_lost(picked, &mut events);
                }
            }
        }
        events
    }

    /// Difficulty only changes rendering; target and stats stay as they are.
    pub fn set_difficulty(&mut self, level: DifficultyLevel) -> Vec<GameEvent> {
        if level == self.difficulty {
            return vec![];
        }
        self.difficulty = level;
        info!(
            difficulty = %level,
            tiles = render_config_for(level).tile_style.tile_url(),
            "difficulty changed"
        );
        vec![GameEvent::DifficultyChanged(level)]
    }

    pub fn cycle_difficulty(&mut self) -> Vec<GameEvent> {
        self.set_difficulty(self.difficulty.next())
    }

    fn on_correct(&mut self, events: &mut Vec<GameEvent>) {
        let country = self.target_name().to_string();
        self.stats.score += 1;
        info!(country = %country, score = self.stats.score, "correct guess");
        events.push(GameEvent::CorrectGuess { country: country.clone(), score: self.stats.score });

        self.next_round(events);
        self.round.feedback = format!("Correct! That was {country}.");
    }

    fn on_wrong(&mut self, picked: String, events: &mut Vec<GameEvent>) {
        self.stats.lives -= 1;
        info!(picked = %picked, lives = self.stats.lives, "wrong guess");
        self.round.feedback = format!("Incorrect, you picked {picked}.");
        events.push(GameEvent::WrongGuess { picked, lives_left: self.stats.lives });
    }

    fn on_last_life_lost(&mut self, picked: String, events: &mut Vec<GameEvent>) {
        let answer = self.target_name().to_string();
        let streak = self.stats.score;
        self.stats.max_score = self.stats.max_score.max(streak);
        let max_score = self.stats.max_score;
        info!(answer = %answer, streak, max_score, "out of lives, restarting");

        events.push(GameEvent::WrongGuess { picked, lives_left: 0 });
        events.push(GameEvent::GameOver { answer: answer.clone(), streak, max_score });

        self.stats.score = 0;
        self.stats.lives = self.starting_lives;
        self.next_round(events);
        self.round.feedback =
            format!("Out of lives! It was {answer}. Streak: {streak}  Best: {max_score}");
    }

    /// The catalog is immutable and had a selectable record at start, so
    /// this cannot fail in practice; if it does the old target stays.
    fn next_round(&mut self, events: &mut Vec<GameEvent>) {
        match self.round.advance(&self.catalog, &mut self.rng, self.policy) {
            Ok(_) => events.push(GameEvent::RoundStarted { round_no: self.round.round_no }),
            Err(e) => error!("could not start next round: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::country::Geometry;
    use crate::error::GameError;

    const NAMES: &[&str] = &["France", "Spain", "Peru", "Japan", "Chile"];

    fn catalog(names: &[&str]) -> Catalog {
        Catalog::from_records(
            names.iter().map(|n| CountryRecord::new(n, Geometry::default(), "flag")).collect(),
        )
    }

    fn session() -> Session {
        let settings = GameSettings { seed: Some(99), ..GameSettings::default() };
        Session::start(catalog(NAMES), &settings).unwrap()
    }

    /// A name in the catalog that is not the current target.
    fn wrong_name(s: &Session) -> String {
        NAMES.iter().find(|n| **n != s.target_name()).unwrap().to_string()
    }

    fn click(s: &mut Session, name: &str) -> Vec<GameEvent> {
        s.handle_click(&MapFeature::named(name))
    }

    #[test]
    fn start_selects_first_round() {
        let s = session();
        assert!(s.round.target.is_some());
        assert!(NAMES.contains(&s.target_name()));
        assert_eq!(s.target_flag(), "flag");
        assert_eq!(s.stats, SessionStats { score: 0, lives: 3, max_score: 0 });
        assert!(s.feedback().is_empty());
    }

    #[test]
    fn start_on_unusable_catalog_fails() {
        let err = Session::start(catalog(&["", "  "]), &GameSettings::default()).err().unwrap();
        assert!(matches!(err, GameError::Data(_)));
    }

    #[test]
    fn correct_guess_scores_and_advances() {
        let mut s = session();
        let round_before = s.round.round_no;
        let target = s.target_name().to_uppercase() + " ";
        let events = click(&mut s, &target);

        assert_eq!(s.stats.score, 1);
        assert_eq!(s.stats.lives, 3);
        assert_eq!(s.round.round_no, round_before + 1);
        assert!(s.feedback().starts_with("Correct!"));
        assert!(matches!(events[0], GameEvent::CorrectGuess { score: 1, .. }));
        assert!(matches!(events[1], GameEvent::RoundStarted { .. }));
    }

    #[test]
    fn wrong_guess_keeps_target() {
        let mut s = session();
        s.stats.score = 5;
        s.stats.max_score = 5;
        let target = s.round.target;
        let round_no = s.round.round_no;
        let picked = wrong_name(&s);

        let events = click(&mut s, &picked);

        assert_eq!(s.stats, SessionStats { score: 5, lives: 2, max_score: 5 });
        assert_eq!(s.round.target, target);
        assert_eq!(s.round.round_no, round_no);
        assert_eq!(s.feedback(), format!("Incorrect, you picked {picked}."));
        assert_eq!(events, vec![GameEvent::WrongGuess { picked, lives_left: 2 }]);
    }

    #[test]
    fn last_life_resets_and_records_max() {
        let mut s = session();
        s.stats = SessionStats { score: 7, lives: 1, max_score: 4 };
        let answer = s.target_name().to_string();
        let round_no = s.round.round_no;
        let picked = wrong_name(&s);

        let events = click(&mut s, &picked);

        assert_eq!(s.stats, SessionStats { score: 0, lives: 3, max_score: 7 });
        assert_eq!(s.round.round_no, round_no + 1);
        assert!(s.feedback().contains(&answer));
        assert!(s.feedback().contains("Streak: 7"));
        assert!(s.feedback().contains("Best: 7"));
        assert!(events.contains(&GameEvent::GameOver { answer, streak: 7, max_score: 7 }));
        assert!(matches!(events.last(), Some(GameEvent::RoundStarted { .. })));
    }

    #[test]
    fn max_score_never_decreases() {
        let mut s = session();
        s.stats = SessionStats { score: 2, lives: 1, max_score: 9 };
        let picked = wrong_name(&s);
        click(&mut s, &picked);
        assert_eq!(s.stats.max_score, 9);
        assert_eq!(s.stats.score, 0);
    }

    #[test]
    fn three_wrong_guesses_end_streak() {
        let mut s = session();
        let target = s.target_name().to_string();
        click(&mut s, &target);
        let target = s.target_name().to_string();
        click(&mut s, &target);
        assert_eq!(s.stats.score, 2);

        for _ in 0..3 {
            let picked = wrong_name(&s);
            click(&mut s, &picked);
        }
        assert_eq!(s.stats, SessionStats { score: 0, lives: 3, max_score: 2 });
    }

    #[test]
    fn ignored_click_changes_nothing() {
        let mut s = session();
        s.stats = SessionStats { score: 4, lives: 2, max_score: 6 };
        s.round.feedback = "Incorrect, you picked Peru.".into();
        let before_stats = s.stats;
        let before_round = s.round.clone();

        assert!(s.handle_click(&MapFeature::unnamed()).is_empty());
        assert!(s.handle_click(&MapFeature::named("  ")).is_empty());

        assert_eq!(s.stats, before_stats);
        assert_eq!(s.round.target, before_round.target);
        assert_eq!(s.round.round_no, before_round.round_no);
        assert_eq!(s.round.feedback, before_round.feedback);
    }

    #[test]
    fn difficulty_does_not_touch_round() {
        let mut s = session();
        s.stats.score = 3;
        let target = s.round.target;

        let events = s.set_difficulty(DifficultyLevel::Extreme);
        assert_eq!(events, vec![GameEvent::DifficultyChanged(DifficultyLevel::Extreme)]);
        assert!(!s.render_config().show_labels);
        assert_eq!(s.round.target, target);
        assert_eq!(s.stats.score, 3);

        assert!(s.set_difficulty(DifficultyLevel::Extreme).is_empty());
        s.cycle_difficulty();
        assert_eq!(s.difficulty, DifficultyLevel::Normal);
    }

    #[test]
    fn custom_starting_lives() {
        let settings = GameSettings { starting_lives: 1, seed: Some(1), ..GameSettings::default() };
        let mut s = Session::start(catalog(NAMES), &settings).unwrap();
        s.stats.score = 3;
        let picked = wrong_name(&s);
        click(&mut s, &picked);
        assert_eq!(s.stats, SessionStats { score: 0, lives: 1, max_score: 3 });
    }

    #[test]
    fn avoid_repeats_policy_applies() {
        let settings = GameSettings {
            repeat_policy: RepeatPolicy::AvoidPrevious,
            seed: Some(3),
            ..GameSettings::default()
        };
        let mut s = Session::start(catalog(NAMES), &settings).unwrap();
        for _ in 0..50 {
            let before = s.round.target;
            let name = s.target_name().to_string();
            click(&mut s, &name);
            assert_ne!(s.round.target, before);
        }
    }

    #[test]
    fn single_country_catalog_loops() {
        let settings = GameSettings { seed: Some(1), ..GameSettings::default() };
        let mut s = Session::start(catalog(&["Peru"]), &settings).unwrap();
        let r = s.round.round_no;
        click(&mut s, "peru");
        assert_eq!(s.target_name(), "Peru");
        assert_eq!(s.round.round_no, r + 1);
    }
}
