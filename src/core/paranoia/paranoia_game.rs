// Paranoia round state machine.
//
//   Lobby ──start──▶ Collecting ──all answered / skip──▶ Revealed ──next──▶ Collecting ...
//     ▲                   │
//     └──── fewer than MIN_PLAYERS remain ◀────┘
//
// Every player is the target of exactly one prompt per round. The target
// answers by naming another player; at reveal a coin flip decides whether
// the question itself is read out.

use rand::Rng;
use std::collections::HashSet;
use thiserror::Error;

pub const MIN_PLAYERS: usize = 3;
pub const MAX_PLAYERS: usize = 20;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParanoiaError {
    #[error("A game is already running in this channel")]
    GameExists,

    #[error("There is no game in this channel")]
    NoGame,

    #[error("Only the host can do that")]
    NotHost,

    #[error("You're not in this game")]
    NotPlayer,

    #[error("You've already joined")]
    AlreadyJoined,

    #[error("The game is full")]
    GameFull,

    #[error("You can't do that right now")]
    WrongPhase,

    #[error("At least 3 players are needed")]
    NotEnoughPlayers,

    #[error("You have to name another player in this game")]
    InvalidAnswer,

    #[error("You've already answered this round")]
    AlreadyAnswered,

    #[error("You don't have a question this round")]
    NoPrompt,

    #[error("There are no questions to draw from")]
    NoQuestions,

    #[error("Questions must be 5-200 characters")]
    InvalidQuestion,

    #[error("That question is already in the list")]
    DuplicateQuestion,

    #[error("No question with that number")]
    QuestionNotFound,

    #[error("Storage error: {0}")]
    Store(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Named(u64),
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub asker_id: u64,
    pub target_id: u64,
    pub question: String,
    pub answer: Option<Answer>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reveal {
    pub asker_id: u64,
    pub target_id: u64,
    pub answer: Answer,
    pub question: String,
    /// Result of the coin flip; skipped prompts are never revealed.
    pub question_revealed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Lobby,
    Collecting { round: u32, prompts: Vec<Prompt> },
    Revealed { round: u32, reveals: Vec<Reveal> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerOutcome {
    Waiting { remaining: usize },
    AllAnswered(Vec<Reveal>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeaveOutcome {
    pub new_host: Option<u64>,
    pub returned_to_lobby: bool,
    pub game_over: bool,
    /// The departure completed the round.
    pub reveals: Option<Vec<Reveal>>,
}

#[derive(Debug, Clone)]
pub struct Game {
    pub guild_id: u64,
    pub channel_id: u64,
    host_id: u64,
    players: Vec<u64>,
    phase: Phase,
    rounds_played: u32,
    used_questions: HashSet<String>,
}

impl Game {
    pub fn new(guild_id: u64, channel_id: u64, host_id: u64) -> Self {
        Self {
            guild_id,
            channel_id,
            host_id,
            players: vec![host_id],
            phase: Phase::Lobby,
            rounds_played: 0,
            used_questions: HashSet::new(),
        }
    }

    pub fn host_id(&self) -> u64 {
        self.host_id
    }

    pub fn players(&self) -> &[u64] {
        &self.players
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn rounds_played(&self) -> u32 {
        self.rounds_played
    }

    pub fn is_player(&self, user_id: u64) -> bool {
        self.players.contains(&user_id)
    }

    /// Targets who still owe an answer this round.
    pub fn pending_targets(&self) -> Vec<u64> {
        match &self.phase {
            Phase::Collecting { prompts, .. } => prompts
                .iter()
                .filter(|p| p.answer.is_none())
                .map(|p| p.target_id)
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn prompt_for(&self, target_id: u64) -> Option<&Prompt> {
        match &self.phase {
            Phase::Collecting { prompts, .. } => prompts.iter().find(|p| p.target_id == target_id),
            _ => None,
        }
    }

    /// Players may join in the lobby or between rounds, never mid-round.
    pub fn join(&mut self, user_id: u64) -> Result<(), ParanoiaError> {
        if matches!(self.phase, Phase::Collecting { .. }) {
            return Err(ParanoiaError::WrongPhase);
        }
        if self.is_player(user_id) {
            return Err(ParanoiaError::AlreadyJoined);
        }
        if self.players.len() >= MAX_PLAYERS {
            return Err(ParanoiaError::GameFull);
        }
        self.players.push(user_id);
        Ok(())
    }

    pub fn leave<R: Rng>(&mut self, user_id: u64, rng: &mut R) -> Result<LeaveOutcome, ParanoiaError> {
        let pos = self
            .players
            .iter()
            .position(|id| *id == user_id)
            .ok_or(ParanoiaError::NotPlayer)?;
        self.players.remove(pos);

        let mut outcome = LeaveOutcome::default();

        if self.players.is_empty() {
            outcome.game_over = true;
            return Ok(outcome);
        }

        if self.host_id == user_id {
            self.host_id = self.players[0];
            outcome.new_host = Some(self.host_id);
        }

        if !matches!(self.phase, Phase::Lobby) && self.players.len() < MIN_PLAYERS {
            self.phase = Phase::Lobby;
            outcome.returned_to_lobby = true;
            return Ok(outcome);
        }

        if let Phase::Collecting { prompts, .. } = &mut self.phase {
            prompts.retain(|p| p.target_id != user_id);
            if prompts.iter().all(|p| p.answer.is_some()) {
                outcome.reveals = Some(self.reveal(rng));
            }
        }

        Ok(outcome)
    }

    /// Start the next round: draw one question per player and pair each target
    /// with an asker. Returns the prompts so the caller can DM them out.
    pub fn start_round<R: Rng>(
        &mut self,
        user_id: u64,
        pool: &[String],
        rng: &mut R,
    ) -> Result<Vec<Prompt>, ParanoiaError> {
        if user_id != self.host_id {
            return Err(ParanoiaError::NotHost);
        }
        if matches!(self.phase, Phase::Collecting { .. }) {
            return Err(ParanoiaError::WrongPhase);
        }
        if self.players.len() < MIN_PLAYERS {
            return Err(ParanoiaError::NotEnoughPlayers);
        }
        if pool.is_empty() {
            return Err(ParanoiaError::NoQuestions);
        }

        let round = self.rounds_played + 1;
        let n = self.players.len();
        // Offset in 1..n so nobody is ever asked by themselves, and it rotates
        // each round so the same pair doesn't repeat back to back.
        let offset = ((round as usize - 1) % (n - 1)) + 1;

        // Recycle early rather than mid-round so a round never repeats a question.
        let fresh = pool
            .iter()
            .filter(|q| !self.used_questions.contains(*q))
            .count();
        if fresh < n {
            self.used_questions.clear();
        }

        let players = self.players.clone();
        let mut prompts = Vec::with_capacity(n);
        for (i, target_id) in players.iter().enumerate() {
            let asker_id = players[(i + n - offset) % n];
            prompts.push(Prompt {
                asker_id,
                target_id: *target_id,
                question: self.draw_question(pool, rng),
                answer: None,
            });
        }

        self.rounds_played = round;
        self.phase = Phase::Collecting {
            round,
            prompts: prompts.clone(),
        };
        Ok(prompts)
    }

    pub fn answer<R: Rng>(
        &mut self,
        user_id: u64,
        named_id: u64,
        rng: &mut R,
    ) -> Result<AnswerOutcome, ParanoiaError> {
        if !self.is_player(user_id) {
            return Err(ParanoiaError::NotPlayer);
        }
        if named_id == user_id || !self.is_player(named_id) {
            return Err(ParanoiaError::InvalidAnswer);
        }

        let Phase::Collecting { prompts, .. } = &mut self.phase else {
            return Err(ParanoiaError::WrongPhase);
        };

        let prompt = prompts
            .iter_mut()
            .find(|p| p.target_id == user_id)
            .ok_or(ParanoiaError::NoPrompt)?;
        if prompt.answer.is_some() {
            return Err(ParanoiaError::AlreadyAnswered);
        }
        prompt.answer = Some(Answer::Named(named_id));

        let remaining = prompts.iter().filter(|p| p.answer.is_none()).count();
        if remaining == 0 {
            Ok(AnswerOutcome::AllAnswered(self.reveal(rng)))
        } else {
            Ok(AnswerOutcome::Waiting { remaining })
        }
    }

    /// Host override: reveal now, marking missing answers as skipped.
    pub fn force_reveal<R: Rng>(&mut self, user_id: u64, rng: &mut R) -> Result<Vec<Reveal>, ParanoiaError> {
        if user_id != self.host_id {
            return Err(ParanoiaError::NotHost);
        }
        let Phase::Collecting { prompts, .. } = &mut self.phase else {
            return Err(ParanoiaError::WrongPhase);
        };
        for prompt in prompts.iter_mut().filter(|p| p.answer.is_none()) {
            prompt.answer = Some(Answer::Skipped);
        }
        Ok(self.reveal(rng))
    }

    fn reveal<R: Rng>(&mut self, rng: &mut R) -> Vec<Reveal> {
        let Phase::Collecting { round, prompts } = std::mem::replace(&mut self.phase, Phase::Lobby)
        else {
            return Vec::new();
        };

        let reveals: Vec<Reveal> = prompts
            .into_iter()
            .map(|prompt| {
                let answer = prompt.answer.unwrap_or(Answer::Skipped);
                let question_revealed = matches!(answer, Answer::Named(_)) && rng.gen_bool(0.5);
                Reveal {
                    asker_id: prompt.asker_id,
                    target_id: prompt.target_id,
                    answer,
                    question: prompt.question,
                    question_revealed,
                }
            })
            .collect();

        self.phase = Phase::Revealed {
            round,
            reveals: reveals.clone(),
        };
        reveals
    }

    fn draw_question<R: Rng>(&mut self, pool: &[String], rng: &mut R) -> String {
        let mut fresh: Vec<&String> = pool
            .iter()
            .filter(|q| !self.used_questions.contains(*q))
            .collect();
        if fresh.is_empty() {
            self.used_questions.clear();
            fresh = pool.iter().collect();
        }

        let question = fresh[rng.gen_range(0..fresh.len())].clone();
        self.used_questions.insert(question.clone());
        question
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const HOST: u64 = 1;

    fn pool() -> Vec<String> {
        (1..=10).map(|i| format!("Question {}", i)).collect()
    }

    fn lobby_with(players: &[u64]) -> Game {
        let mut game = Game::new(100, 200, HOST);
        for p in players {
            game.join(*p).unwrap();
        }
        game
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    #[test]
    fn start_requires_host_and_three_players() {
        let mut rng = rng();
        let mut game = lobby_with(&[2]);
        assert_eq!(
            game.start_round(HOST, &pool(), &mut rng),
            Err(ParanoiaError::NotEnoughPlayers)
        );

        game.join(3).unwrap();
        assert_eq!(game.start_round(2, &pool(), &mut rng), Err(ParanoiaError::NotHost));
        assert_eq!(game.start_round(HOST, &[], &mut rng), Err(ParanoiaError::NoQuestions));

        let prompts = game.start_round(HOST, &pool(), &mut rng).unwrap();
        assert_eq!(prompts.len(), 3);
        assert_eq!(game.rounds_played(), 1);
        assert_eq!(
            game.start_round(HOST, &pool(), &mut rng),
            Err(ParanoiaError::WrongPhase)
        );
    }

    #[test]
    fn every_player_is_targeted_once_and_never_asks_themselves() {
        let mut rng = rng();
        let mut game = lobby_with(&[2, 3, 4]);

        for _ in 0..6 {
            let prompts = game.start_round(HOST, &pool(), &mut rng).unwrap();
            let mut targets: Vec<u64> = prompts.iter().map(|p| p.target_id).collect();
            targets.sort();
            assert_eq!(targets, vec![1, 2, 3, 4]);
            assert!(prompts.iter().all(|p| p.asker_id != p.target_id));

            // Questions are distinct within a round.
            let distinct: HashSet<&String> = prompts.iter().map(|p| &p.question).collect();
            assert_eq!(distinct.len(), prompts.len());

            game.force_reveal(HOST, &mut rng).unwrap();
        }
    }

    #[test]
    fn asker_rotates_between_rounds() {
        let mut rng = rng();
        let mut game = lobby_with(&[2, 3]);

        let first = game.start_round(HOST, &pool(), &mut rng).unwrap();
        game.force_reveal(HOST, &mut rng).unwrap();
        let second = game.start_round(HOST, &pool(), &mut rng).unwrap();

        let asker_of = |prompts: &[Prompt], target: u64| {
            prompts.iter().find(|p| p.target_id == target).unwrap().asker_id
        };
        assert_ne!(asker_of(&first, HOST), asker_of(&second, HOST));
    }

    #[test]
    fn answers_are_validated() {
        let mut rng = rng();
        let mut game = lobby_with(&[2, 3]);

        assert_eq!(game.answer(2, 3, &mut rng), Err(ParanoiaError::WrongPhase));
        game.start_round(HOST, &pool(), &mut rng).unwrap();

        assert_eq!(game.answer(2, 2, &mut rng), Err(ParanoiaError::InvalidAnswer));
        assert_eq!(game.answer(2, 99, &mut rng), Err(ParanoiaError::InvalidAnswer));
        assert_eq!(game.answer(99, 2, &mut rng), Err(ParanoiaError::NotPlayer));

        assert_eq!(
            game.answer(2, 3, &mut rng),
            Ok(AnswerOutcome::Waiting { remaining: 2 })
        );
        assert_eq!(game.answer(2, 1, &mut rng), Err(ParanoiaError::AlreadyAnswered));
        assert_eq!(game.pending_targets().len(), 2);
    }

    #[test]
    fn last_answer_triggers_reveal() {
        let mut rng = rng();
        let mut game = lobby_with(&[2, 3]);
        game.start_round(HOST, &pool(), &mut rng).unwrap();

        game.answer(1, 2, &mut rng).unwrap();
        game.answer(2, 3, &mut rng).unwrap();
        let outcome = game.answer(3, 1, &mut rng).unwrap();

        let AnswerOutcome::AllAnswered(reveals) = outcome else {
            panic!("expected reveal");
        };
        assert_eq!(reveals.len(), 3);
        assert!(matches!(game.phase(), Phase::Revealed { round: 1, .. }));

        // Next round is available again.
        game.start_round(HOST, &pool(), &mut rng).unwrap();
        assert!(matches!(game.phase(), Phase::Collecting { round: 2, .. }));
    }

    #[test]
    fn force_reveal_marks_skips_and_hides_their_questions() {
        let mut rng = rng();
        let mut game = lobby_with(&[2, 3]);
        game.start_round(HOST, &pool(), &mut rng).unwrap();
        game.answer(2, 3, &mut rng).unwrap();

        assert_eq!(game.force_reveal(2, &mut rng), Err(ParanoiaError::NotHost));
        let reveals = game.force_reveal(HOST, &mut rng).unwrap();

        let skipped: Vec<&Reveal> = reveals
            .iter()
            .filter(|r| r.answer == Answer::Skipped)
            .collect();
        assert_eq!(skipped.len(), 2);
        assert!(skipped.iter().all(|r| !r.question_revealed));
    }

    #[test]
    fn joining_mid_round_is_refused() {
        let mut rng = rng();
        let mut game = lobby_with(&[2, 3]);
        assert_eq!(game.join(2), Err(ParanoiaError::AlreadyJoined));

        game.start_round(HOST, &pool(), &mut rng).unwrap();
        assert_eq!(game.join(4), Err(ParanoiaError::WrongPhase));

        game.force_reveal(HOST, &mut rng).unwrap();
        game.join(4).unwrap();
        assert_eq!(game.players().len(), 4);
    }

    #[test]
    fn leaving_drops_prompt_and_can_complete_round() {
        let mut rng = rng();
        let mut game = lobby_with(&[2, 3, 4]);
        game.start_round(HOST, &pool(), &mut rng).unwrap();
        game.answer(1, 2, &mut rng).unwrap();
        game.answer(2, 3, &mut rng).unwrap();
        game.answer(3, 1, &mut rng).unwrap();

        // Player 4 is the only one left to answer; leaving completes the round.
        let outcome = game.leave(4, &mut rng).unwrap();
        assert_eq!(outcome.reveals.map(|r| r.len()), Some(3));
        assert!(matches!(game.phase(), Phase::Revealed { .. }));
    }

    #[test]
    fn host_leaving_hands_over_and_small_games_fall_back_to_lobby() {
        let mut rng = rng();
        let mut game = lobby_with(&[2, 3]);
        game.start_round(HOST, &pool(), &mut rng).unwrap();

        let outcome = game.leave(HOST, &mut rng).unwrap();
        assert_eq!(outcome.new_host, Some(2));
        assert!(outcome.returned_to_lobby);
        assert_eq!(game.host_id(), 2);
        assert_eq!(game.phase(), &Phase::Lobby);

        game.leave(2, &mut rng).unwrap();
        let outcome = game.leave(3, &mut rng).unwrap();
        assert!(outcome.game_over);

        assert_eq!(game.leave(3, &mut rng), Err(ParanoiaError::NotPlayer));
    }

    #[test]
    fn question_pool_recycles_when_exhausted() {
        let mut rng = rng();
        let mut game = lobby_with(&[2, 3]);
        let small: Vec<String> = vec!["A?".into(), "B?".into(), "C?".into(), "D?".into()];

        for _ in 0..4 {
            let prompts = game.start_round(HOST, &small, &mut rng).unwrap();
            assert_eq!(prompts.len(), 3);
            game.force_reveal(HOST, &mut rng).unwrap();
        }
    }
}
