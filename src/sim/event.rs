/// Events emitted by a session transition.
/// The presentation layer consumes these for sound and banners.

use crate::domain::difficulty::DifficultyLevel;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GameEvent {
    RoundStarted { round_no: u64 },
    CorrectGuess { country: String, score: u32 },
    WrongGuess { picked: String, lives_left: u32 },
    /// Last life lost. Stats are already reset when this is emitted.
    GameOver { answer: String, streak: u32, max_score: u32 },
    DifficultyChanged(DifficultyLevel),
}
