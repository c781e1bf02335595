pub mod paranoia_game;
pub mod paranoia_service;
pub mod questions;

pub use paranoia_game::{Answer, AnswerOutcome, Game, LeaveOutcome, ParanoiaError, Phase, Prompt, Reveal};
pub use paranoia_service::{ParanoiaService, QuestionStore};
