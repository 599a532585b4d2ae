//! Runtime for one attempt at a game: randomized questions, countdown,
//! hints, scoring and the final summary.

use std::time::Duration;

use log::{debug, info};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::catalog::Game;
use crate::error::QuizError;
use crate::report::{Submission, Summary};
use crate::scheduler::{Scheduler, TaskId, TaskKind};
use crate::shuffle::{randomize, RandomizedQuestion};

pub const POINTS_WITHOUT_HINT: u32 = 10;
pub const POINTS_WITH_HINT: u32 = 5;
pub const DEFAULT_SECS_PER_QUESTION: u32 = 120;
pub const ADVANCE_DELAY_MS: u64 = 1500;

const COUNTDOWN_STEP: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionConfig {
    /// Budget used when the game does not declare one.
    pub default_secs_per_question: u32,
    /// Pause after a correct answer before moving on.
    pub advance_delay: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_secs_per_question: DEFAULT_SECS_PER_QUESTION,
            advance_delay: Duration::from_millis(ADVANCE_DELAY_MS),
        }
    }
}

/// Outcome of a single question, answered or expired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreEntry {
    pub question_id: u32,
    pub points: u32,
    pub used_hint: bool,
    pub correct: bool,
    /// Seconds left on the clock when the question resolved.
    pub time_remaining: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub index: usize,
    pub selected: Option<usize>,
    pub hint_visible: bool,
    pub remaining_secs: u32,
    pub answered: bool,
    pub started: bool,
    pub showing_report: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerOutcome {
    /// Guarded no-op: already answered, out of range or not in play.
    Ignored,
    Correct { points: u32 },
    Incorrect { correct_position: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    TimedOut { index: usize },
    Advanced { index: usize },
    Finished,
}

#[derive(Debug)]
pub struct Session {
    game: Game,
    questions: Vec<RandomizedQuestion>,
    config: SessionConfig,
    state: SessionState,
    scores: Vec<ScoreEntry>,
    summary: Option<Summary>,
    scheduler: Scheduler,
    countdown: Option<TaskId>,
    auto_advance: Option<TaskId>,
    current_entry: Option<usize>,
}

impl Session {
    /// Validates and randomizes every question, then starts the clock on the
    /// first one. Fails closed on any malformed question.
    pub fn start<R: Rng>(game: Game, config: SessionConfig, rng: &mut R) -> Result<Self, QuizError> {
        game.validate()?;
        let questions = game
            .questions
            .iter()
            .map(|q| randomize(q, &mut *rng))
            .collect::<Result<Vec<_>, _>>()?;

        let secs = game
            .metadata
            .seconds_per_question()
            .unwrap_or(config.default_secs_per_question);

        let mut session = Self {
            game,
            questions,
            config,
            state: SessionState {
                index: 0,
                selected: None,
                hint_visible: false,
                remaining_secs: secs,
                answered: false,
                started: true,
                showing_report: false,
            },
            scores: Vec::new(),
            summary: None,
            scheduler: Scheduler::new(),
            countdown: None,
            auto_advance: None,
            current_entry: None,
        };
        session.arm_countdown();

        info!(
            "session started for '{}' with {} questions, {}s each",
            session.game.id,
            session.questions.len(),
            secs
        );
        Ok(session)
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn scores(&self) -> &[ScoreEntry] {
        &self.scores
    }

    pub fn summary(&self) -> Option<&Summary> {
        self.summary.as_ref()
    }

    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    pub fn questions(&self) -> &[RandomizedQuestion] {
        &self.questions
    }

    pub fn current_question(&self) -> Option<&RandomizedQuestion> {
        self.questions.get(self.state.index)
    }

    pub fn secs_per_question(&self) -> u32 {
        self.game
            .metadata
            .seconds_per_question()
            .unwrap_or(self.config.default_secs_per_question)
    }

    pub fn timer_running(&self) -> bool {
        self.state.started && !self.state.answered && !self.state.showing_report
    }

    /// An auto-advance is scheduled after a correct answer.
    pub fn advance_pending(&self) -> bool {
        self.auto_advance
            .is_some_and(|id| self.scheduler.is_pending(id))
    }

    /// The current question was answered wrongly and is showing its solution.
    pub fn awaiting_continue(&self) -> bool {
        self.state.answered
            && !self.state.showing_report
            && self.current_entry().is_some_and(|entry| !entry.correct)
    }

    /// The score recorded for the current question, if any.
    pub fn current_entry(&self) -> Option<&ScoreEntry> {
        self.current_entry.and_then(|i| self.scores.get(i))
    }

    pub fn select_answer(&mut self, position: usize) -> AnswerOutcome {
        if !self.timer_running() {
            return AnswerOutcome::Ignored;
        }
        let Some(question) = self.questions.get(self.state.index) else {
            return AnswerOutcome::Ignored;
        };
        if position >= question.options.len() {
            return AnswerOutcome::Ignored;
        }

        let correct = question.is_correct(position);
        let correct_position = question.correct_position();
        let question_id = question.question.id;
        let points = match (correct, self.state.hint_visible) {
            (false, _) => 0,
            (true, true) => POINTS_WITH_HINT,
            (true, false) => POINTS_WITHOUT_HINT,
        };

        self.state.selected = Some(position);
        self.state.answered = true;
        self.cancel_countdown();
        self.current_entry = Some(self.scores.len());
        self.scores.push(ScoreEntry {
            question_id,
            points,
            used_hint: self.state.hint_visible,
            correct,
            time_remaining: self.state.remaining_secs,
        });
        debug!("question {question_id} answered at position {position}: correct={correct}");

        if correct {
            self.auto_advance = Some(
                self.scheduler
                    .schedule(TaskKind::AutoAdvance, self.config.advance_delay),
            );
            AnswerOutcome::Correct { points }
        } else {
            AnswerOutcome::Incorrect { correct_position }
        }
    }

    /// Reveals the hint for the current question. Returns whether it was
    /// revealed by this call.
    pub fn request_hint(&mut self) -> bool {
        if !self.timer_running() || self.state.hint_visible {
            return false;
        }
        match self.current_question() {
            Some(q) if q.question.has_hint() => {
                self.state.hint_visible = true;
                true
            }
            _ => false,
        }
    }

    /// Records a zero for the unanswered current question and moves on.
    pub fn on_time_expired(&mut self) -> Option<Transition> {
        if !self.timer_running() {
            return None;
        }
        let question_id = self.current_question()?.question.id;
        self.state.remaining_secs = 0;
        self.cancel_countdown();
        self.current_entry = Some(self.scores.len());
        self.scores.push(ScoreEntry {
            question_id,
            points: 0,
            used_hint: self.state.hint_visible,
            correct: false,
            time_remaining: 0,
        });
        debug!("question {question_id} timed out");
        self.advance()
    }

    /// Moves to the next question, or into the report after the last one.
    pub fn advance(&mut self) -> Option<Transition> {
        if !self.state.started || self.state.showing_report {
            return None;
        }
        self.scheduler.cancel_all();
        self.countdown = None;
        self.auto_advance = None;

        if self.state.index + 1 < self.questions.len() {
            self.state.index += 1;
            self.state.selected = None;
            self.state.hint_visible = false;
            self.state.answered = false;
            self.state.remaining_secs = self.secs_per_question();
            self.current_entry = None;
            self.arm_countdown();
            debug!("advanced to question index {}", self.state.index);
            Some(Transition::Advanced {
                index: self.state.index,
            })
        } else {
            let summary = Summary::new(&self.scores, self.questions.len());
            info!(
                "session for '{}' finished: {}/{} points",
                self.game.id, summary.total_points, summary.max_possible
            );
            self.summary = Some(summary);
            self.state.showing_report = true;
            Some(Transition::Finished)
        }
    }

    /// Feeds elapsed wall time into the session and fires whatever came due,
    /// in due order.
    pub fn tick(&mut self, elapsed: Duration) -> Vec<Transition> {
        let until = self.scheduler.now() + elapsed;
        let mut transitions = Vec::new();

        while let Some(task) = self.scheduler.pop_due(until) {
            match task.kind {
                TaskKind::CountdownTick => {
                    self.countdown = None;
                    self.on_countdown_tick(&mut transitions);
                }
                TaskKind::AutoAdvance => {
                    self.auto_advance = None;
                    transitions.extend(self.advance());
                }
            }
        }
        self.scheduler.settle(until);
        transitions
    }

    pub fn submission(&self) -> Submission {
        Submission {
            game_id: self.game.id.clone(),
            game_name: self.game.name.clone(),
            total_score: self.scores.iter().map(|s| s.points).sum(),
            scores: self.scores.clone(),
            questions_attempted: self.scores.len(),
            total_questions: self.questions.len(),
        }
    }

    fn on_countdown_tick(&mut self, transitions: &mut Vec<Transition>) {
        if !self.timer_running() {
            return;
        }
        self.state.remaining_secs = self.state.remaining_secs.saturating_sub(1);
        if self.state.remaining_secs > 0 {
            self.arm_countdown();
            return;
        }
        let index = self.state.index;
        if let Some(next) = self.on_time_expired() {
            transitions.push(Transition::TimedOut { index });
            transitions.push(next);
        }
    }

    fn arm_countdown(&mut self) {
        self.cancel_countdown();
        if self.timer_running() {
            self.countdown = Some(self.scheduler.schedule(TaskKind::CountdownTick, COUNTDOWN_STEP));
        }
    }

    fn cancel_countdown(&mut self) {
        if let Some(id) = self.countdown.take() {
            self.scheduler.cancel(id);
        }
    }
}
