use std::time::Duration;

use chrono::Utc;
use log::{info, warn};
use rand::{rngs::StdRng, SeedableRng};

use crate::catalog::Game;
use crate::error::QuizError;
use crate::report::{ScoreRecord, ScoreSink, Submission};
use crate::session::{AnswerOutcome, Session, SessionConfig, Transition};
use crate::store::DocumentStore;

#[derive(Debug)]
pub enum Phase {
    /// Nothing loaded yet.
    Empty,
    /// The requested game does not exist. Terminal.
    NotFound(String),
    /// The game could not be loaded or played.
    Invalid(QuizError),
    /// Game loaded, no session running.
    Ready(Game),
    /// A session is running or showing its report.
    Playing(Session),
}

/// Result of tearing a session down.
#[derive(Debug)]
pub enum Delivery {
    Sent,
    /// Nothing was answered, so nothing was submitted.
    Skipped,
    /// The sink failed. The session still ended locally.
    Failed(QuizError),
}

#[derive(Debug)]
pub struct EndOutcome {
    pub submission: Submission,
    pub delivery: Delivery,
}

impl EndOutcome {
    /// User-facing warning, if delivery went wrong.
    pub fn warning(&self) -> Option<String> {
        match &self.delivery {
            Delivery::Failed(e) => Some(format!("Score not saved: {e}")),
            _ => None,
        }
    }
}

/// Drives one game through load, play, report and teardown on top of a
/// document store and a score sink.
pub struct Playground<S: DocumentStore, K: ScoreSink> {
    store: S,
    sink: K,
    config: SessionConfig,
    rng: StdRng,
    phase: Phase,
}

impl<S: DocumentStore, K: ScoreSink> Playground<S, K> {
    pub fn new(store: S, sink: K, config: SessionConfig) -> Self {
        Self {
            store,
            sink,
            config,
            rng: StdRng::from_entropy(),
            phase: Phase::Empty,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub fn session(&self) -> Option<&Session> {
        match &self.phase {
            Phase::Playing(session) => Some(session),
            _ => None,
        }
    }

    pub fn game(&self) -> Option<&Game> {
        match &self.phase {
            Phase::Ready(game) => Some(game),
            Phase::Playing(session) => Some(session.game()),
            _ => None,
        }
    }

    /// Looks the game up and checks it can be played. Any running session is
    /// discarded without being reported.
    pub fn load(&mut self, game_id: &str) -> &Phase {
        self.phase = match self.store.find_game(game_id) {
            Ok(Some(game)) => match game.validate() {
                Ok(()) => Phase::Ready(game),
                Err(e) => {
                    warn!("game '{game_id}' is not playable: {e}");
                    Phase::Invalid(e)
                }
            },
            Ok(None) => {
                info!("game '{game_id}' not found");
                Phase::NotFound(game_id.to_string())
            }
            Err(e) => {
                warn!("failed to read game '{game_id}': {e}");
                Phase::Invalid(e)
            }
        };
        &self.phase
    }

    /// Starts a fresh session. A running session is dropped, never reset.
    /// When the game turns out to be unplayable the cause is returned and
    /// the phase moves to `Invalid`.
    pub fn start_session(&mut self) -> Result<(), QuizError> {
        let game = match std::mem::replace(&mut self.phase, Phase::Empty) {
            Phase::Ready(game) => game,
            Phase::Playing(session) => session.game().clone(),
            other => {
                let err = match &other {
                    Phase::NotFound(id) => QuizError::NotFound(id.clone()),
                    _ => QuizError::NotReady,
                };
                self.phase = other;
                return Err(err);
            }
        };

        let game_id = game.id.clone();
        match Session::start(game, self.config, &mut self.rng) {
            Ok(session) => {
                self.phase = Phase::Playing(session);
                Ok(())
            }
            Err(e) => {
                warn!("could not start session for '{game_id}': {e}");
                self.phase = Phase::Invalid(QuizError::Unplayable {
                    game_id,
                    reason: e.to_string(),
                });
                Err(e)
            }
        }
    }

    pub fn select_answer(&mut self, position: usize) -> AnswerOutcome {
        match &mut self.phase {
            Phase::Playing(session) => session.select_answer(position),
            _ => AnswerOutcome::Ignored,
        }
    }

    pub fn request_hint(&mut self) -> bool {
        match &mut self.phase {
            Phase::Playing(session) => session.request_hint(),
            _ => false,
        }
    }

    pub fn advance(&mut self) -> Option<Transition> {
        match &mut self.phase {
            Phase::Playing(session) => session.advance(),
            _ => None,
        }
    }

    pub fn tick(&mut self, elapsed: Duration) -> Vec<Transition> {
        match &mut self.phase {
            Phase::Playing(session) => session.tick(elapsed),
            _ => Vec::new(),
        }
    }

    /// Reports whatever was scored so far and tears the session down.
    /// Delivery is best-effort: a failing sink is logged and returned as a
    /// warning, the player still goes back to the idle state.
    pub fn end_session(&mut self) -> Option<EndOutcome> {
        let session = match std::mem::replace(&mut self.phase, Phase::Empty) {
            Phase::Playing(session) => session,
            other => {
                self.phase = other;
                return None;
            }
        };

        let submission = session.submission();
        self.phase = Phase::Ready(session.game().clone());
        drop(session);

        let delivery = if submission.scores.is_empty() {
            Delivery::Skipped
        } else {
            let record = ScoreRecord {
                submission: submission.clone(),
                timestamp: Utc::now(),
            };
            match self.sink.submit(&record) {
                Ok(()) => {
                    info!(
                        "submitted {} points for '{}'",
                        submission.total_score, submission.game_id
                    );
                    Delivery::Sent
                }
                Err(e) => {
                    warn!("failed to save score for '{}': {e}", submission.game_id);
                    Delivery::Failed(match e {
                        QuizError::SinkDelivery(_) => e,
                        other => QuizError::SinkDelivery(other.to_string()),
                    })
                }
            }
        };

        Some(EndOutcome {
            submission,
            delivery,
        })
    }

    /// Ends the current session (reporting it) and starts a fresh one.
    pub fn play_again(&mut self) -> Result<Option<EndOutcome>, QuizError> {
        let ended = self.end_session();
        self.start_session()?;
        Ok(ended)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fixtures::{catalog, game};
    use crate::catalog::{Catalog, MainSubject, SubSubject};
    use crate::error::ErrorKind;
    use assert_matches::assert_matches;

    #[derive(Default)]
    struct RecordingSink {
        records: Vec<ScoreRecord>,
    }

    impl ScoreSink for RecordingSink {
        fn submit(&mut self, record: &ScoreRecord) -> Result<(), QuizError> {
            self.records.push(record.clone());
            Ok(())
        }
    }

    struct FailingSink;

    impl ScoreSink for FailingSink {
        fn submit(&mut self, _record: &ScoreRecord) -> Result<(), QuizError> {
            Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only").into())
        }
    }

    fn playground() -> Playground<Catalog, RecordingSink> {
        Playground::new(catalog(), RecordingSink::default(), SessionConfig::default()).with_seed(5)
    }

    #[test]
    fn unknown_game_is_terminal_not_found() {
        let mut pg = playground();
        assert_matches!(pg.load("missing"), Phase::NotFound(id) if id == "missing");
        assert_matches!(pg.start_session(), Err(QuizError::NotFound(_)));
        assert_matches!(pg.phase(), Phase::NotFound(_));
    }

    #[test]
    fn malformed_game_blocks_play() {
        let mut bad = game("bad", 2);
        bad.questions[0].options.clear();
        let store = Catalog {
            main_subjects: vec![MainSubject {
                main_subject: "M".into(),
                main_subject_context: vec![SubSubject {
                    sub_subject: "S".into(),
                    sub_subject_context: vec![bad],
                }],
            }],
        };
        let mut pg = Playground::new(store, RecordingSink::default(), SessionConfig::default());
        assert_matches!(pg.load("bad"), Phase::Invalid(e) if e.kind() == ErrorKind::InvalidData);
        assert_matches!(pg.start_session(), Err(QuizError::NotReady));
        assert!(pg.session().is_none());
    }

    #[test]
    fn failed_start_returns_the_cause() {
        let mut pg = playground();
        let mut bad = game("oversized", 1);
        bad.questions[0].options = (0..12).map(|i| format!("option {i}")).collect();
        pg.phase = Phase::Ready(bad);

        let err = pg.start_session().unwrap_err();
        assert_matches!(err, QuizError::InvalidQuestion { question_id: 1, .. });
        assert_matches!(
            pg.phase(),
            Phase::Invalid(QuizError::Unplayable { game_id, reason })
                if game_id == "oversized" && reason.contains("at most 9 options")
        );
    }

    #[test]
    fn start_before_load_is_refused() {
        let mut pg = playground();
        assert_matches!(pg.start_session(), Err(QuizError::NotReady));
        assert_eq!(pg.select_answer(0), AnswerOutcome::Ignored);
        assert!(!pg.request_hint());
        assert!(pg.tick(Duration::from_secs(10)).is_empty());
        assert!(pg.end_session().is_none());
    }

    #[test]
    fn end_session_reports_and_returns_to_ready() {
        let mut pg = playground();
        pg.load("series-1");
        pg.start_session().unwrap();
        let correct = pg.session().unwrap().current_question().unwrap().correct_position();
        pg.select_answer(correct);

        let outcome = pg.end_session().unwrap();
        assert_matches!(outcome.delivery, Delivery::Sent);
        assert!(outcome.warning().is_none());
        assert_eq!(outcome.submission.questions_attempted, 1);
        assert_matches!(pg.phase(), Phase::Ready(g) if g.id == "series-1");
        assert_eq!(pg.sink().records.len(), 1);
        assert_eq!(pg.sink().records[0].submission.total_score, 10);
    }

    #[test]
    fn end_without_answers_submits_nothing() {
        let mut pg = playground();
        pg.load("series-2");
        pg.start_session().unwrap();
        let outcome = pg.end_session().unwrap();
        assert_matches!(outcome.delivery, Delivery::Skipped);
        assert!(pg.sink().records.is_empty());
    }

    #[test]
    fn sink_failure_is_a_warning_only() {
        let mut pg = Playground::new(catalog(), FailingSink, SessionConfig::default());
        pg.load("series-1");
        pg.start_session().unwrap();
        pg.tick(Duration::from_secs(60));

        let outcome = pg.end_session().unwrap();
        assert_matches!(&outcome.delivery, Delivery::Failed(e) if e.kind() == ErrorKind::SinkDelivery);
        assert!(outcome.warning().unwrap().starts_with("Score not saved"));
        assert_matches!(pg.phase(), Phase::Ready(_));
    }

    #[test]
    fn play_again_starts_from_scratch() {
        let mut pg = playground();
        pg.load("series-1");
        pg.start_session().unwrap();
        pg.tick(Duration::from_secs(60));
        assert_eq!(pg.session().unwrap().state().index, 1);

        let ended = pg.play_again().unwrap().unwrap();
        assert_eq!(ended.submission.questions_attempted, 1);
        let session = pg.session().unwrap();
        assert_eq!(session.state().index, 0);
        assert!(session.scores().is_empty());
        assert_eq!(session.state().remaining_secs, 60);
    }
}
