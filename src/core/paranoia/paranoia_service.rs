// Keeps one Paranoia game per channel and the guild's custom question list.
//
// Games live only in memory; a restart ends them. Custom questions persist
// through the `QuestionStore` port.

use super::paranoia_game::{AnswerOutcome, Game, LeaveOutcome, ParanoiaError, Prompt, Reveal};
use super::questions::DEFAULT_QUESTIONS;
use async_trait::async_trait;
use dashmap::DashMap;

const MIN_QUESTION_LEN: usize = 5;
const MAX_QUESTION_LEN: usize = 200;

#[async_trait]
pub trait QuestionStore: Send + Sync {
    async fn get_questions(&self, guild_id: u64) -> Result<Vec<String>, ParanoiaError>;
    async fn save_questions(&self, guild_id: u64, questions: Vec<String>) -> Result<(), ParanoiaError>;
}

pub struct ParanoiaService<S: QuestionStore> {
    store: S,
    // Channel ID -> running game
    games: DashMap<u64, Game>,
}

impl<S: QuestionStore> ParanoiaService<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            games: DashMap::new(),
        }
    }

    pub fn create_game(&self, guild_id: u64, channel_id: u64, host_id: u64) -> Result<Game, ParanoiaError> {
        match self.games.entry(channel_id) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(ParanoiaError::GameExists),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                let game = Game::new(guild_id, channel_id, host_id);
                slot.insert(game.clone());
                tracing::info!(guild_id, channel_id, host_id, "Paranoia game created");
                Ok(game)
            }
        }
    }

    pub fn game(&self, channel_id: u64) -> Option<Game> {
        self.games.get(&channel_id).map(|g| g.clone())
    }

    /// Channel of a game where this user still owes an answer. Used when
    /// someone answers from their DMs.
    pub fn channel_awaiting_answer_from(&self, user_id: u64) -> Option<u64> {
        self.games
            .iter()
            .find(|entry| entry.value().pending_targets().contains(&user_id))
            .map(|entry| *entry.key())
    }

    /// Which game an `answer` from `here` is meant for: the game in this
    /// channel if the user plays in it, otherwise the game still waiting on
    /// them, otherwise any game they play in so the real error surfaces.
    pub fn answer_channel(&self, here: u64, user_id: u64) -> Option<u64> {
        if let Some(game) = self.games.get(&here) {
            if game.players().contains(&user_id) {
                return Some(here);
            }
        }
        self.channel_awaiting_answer_from(user_id).or_else(|| {
            self.games
                .iter()
                .find(|entry| entry.value().players().contains(&user_id))
                .map(|entry| *entry.key())
        })
    }

    pub fn join(&self, channel_id: u64, user_id: u64) -> Result<usize, ParanoiaError> {
        let mut game = self.games.get_mut(&channel_id).ok_or(ParanoiaError::NoGame)?;
        game.join(user_id)?;
        Ok(game.players().len())
    }

    pub fn leave(&self, channel_id: u64, user_id: u64) -> Result<LeaveOutcome, ParanoiaError> {
        let outcome = {
            let mut game = self.games.get_mut(&channel_id).ok_or(ParanoiaError::NoGame)?;
            game.leave(user_id, &mut rand::thread_rng())?
        };

        if outcome.game_over {
            self.games.remove(&channel_id);
            tracing::info!(channel_id, "Paranoia game ended, everyone left");
        }
        Ok(outcome)
    }

    pub async fn start_round(&self, channel_id: u64, user_id: u64) -> Result<Vec<Prompt>, ParanoiaError> {
        let guild_id = self
            .games
            .get(&channel_id)
            .map(|g| g.guild_id)
            .ok_or(ParanoiaError::NoGame)?;

        // Load the pool before taking the map lock; never hold it across an await.
        let pool = self.question_pool(guild_id).await?;

        let mut game = self.games.get_mut(&channel_id).ok_or(ParanoiaError::NoGame)?;
        let prompts = game.start_round(user_id, &pool, &mut rand::thread_rng())?;
        tracing::debug!(channel_id, round = game.rounds_played(), "Paranoia round started");
        Ok(prompts)
    }

    pub fn answer(&self, channel_id: u64, user_id: u64, named_id: u64) -> Result<AnswerOutcome, ParanoiaError> {
        let mut game = self.games.get_mut(&channel_id).ok_or(ParanoiaError::NoGame)?;
        game.answer(user_id, named_id, &mut rand::thread_rng())
    }

    pub fn force_reveal(&self, channel_id: u64, user_id: u64) -> Result<Vec<Reveal>, ParanoiaError> {
        let mut game = self.games.get_mut(&channel_id).ok_or(ParanoiaError::NoGame)?;
        game.force_reveal(user_id, &mut rand::thread_rng())
    }

    /// The host (or a moderator) ends the game.
    pub fn end_game(&self, channel_id: u64, user_id: u64, is_moderator: bool) -> Result<Game, ParanoiaError> {
        {
            let game = self.games.get(&channel_id).ok_or(ParanoiaError::NoGame)?;
            if game.host_id() != user_id && !is_moderator {
                return Err(ParanoiaError::NotHost);
            }
        }
        self.games
            .remove(&channel_id)
            .map(|(_, game)| game)
            .ok_or(ParanoiaError::NoGame)
    }

    // ------------------------------------------------------------------------
    // Custom questions
    // ------------------------------------------------------------------------

    /// Built-in questions followed by the guild's own.
    pub async fn question_pool(&self, guild_id: u64) -> Result<Vec<String>, ParanoiaError> {
        let mut pool: Vec<String> = DEFAULT_QUESTIONS.iter().map(|q| q.to_string()).collect();
        for question in self.store.get_questions(guild_id).await? {
            if !pool.iter().any(|q| q.eq_ignore_ascii_case(&question)) {
                pool.push(question);
            }
        }
        Ok(pool)
    }

    pub async fn custom_questions(&self, guild_id: u64) -> Result<Vec<String>, ParanoiaError> {
        self.store.get_questions(guild_id).await
    }

    pub async fn add_question(&self, guild_id: u64, text: &str) -> Result<usize, ParanoiaError> {
        let text = text.trim();
        let len = text.chars().count();
        if !(MIN_QUESTION_LEN..=MAX_QUESTION_LEN).contains(&len) {
            return Err(ParanoiaError::InvalidQuestion);
        }

        let mut questions = self.store.get_questions(guild_id).await?;
        let duplicate = questions
            .iter()
            .map(String::as_str)
            .chain(DEFAULT_QUESTIONS.iter().copied())
            .any(|q| q.eq_ignore_ascii_case(text));
        if duplicate {
            return Err(ParanoiaError::DuplicateQuestion);
        }

        questions.push(text.to_string());
        let count = questions.len();
        self.store.save_questions(guild_id, questions).await?;
        Ok(count)
    }

    /// `number` is 1-based, matching the numbered list shown to users.
    pub async fn remove_question(&self, guild_id: u64, number: usize) -> Result<String, ParanoiaError> {
        let mut questions = self.store.get_questions(guild_id).await?;
        if number == 0 || number > questions.len() {
            return Err(ParanoiaError::QuestionNotFound);
        }
        let removed = questions.remove(number - 1);
        self.store.save_questions(guild_id, questions).await?;
        Ok(removed)
    }
}
