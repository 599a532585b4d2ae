use std::sync::mpsc::{self, Sender};
use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use logiq::app::{App, AppState, Control, PlayView};
use logiq::catalog::Catalog;
use logiq::playground::{Phase, Playground};
use logiq::report::JsonScoreSink;
use logiq::runtime::{ChannelKeys, Runner};
use logiq::session::SessionConfig;
use tempfile::{tempdir, TempDir};

// Headless integration using the library runtime + App without a TTY.
// Keys go through Runner/ChannelKeys; long waits are fed in as explicit ticks.

const CATALOG: &str = r#"{
  "main_subjects": [{
    "main_subject": "Reasoning",
    "main_subject_context": [{
      "sub_subject": "Series",
      "sub_subject_context": [
        {
          "id": "duo",
          "name": "Duo",
          "metadata": { "timePerQuestion": 0.05 },
          "questions": [
            { "id": 1, "question": "one?", "options": ["a", "b", "c"], "correct": 0,
              "hint": "first", "solution": "a it is" },
            { "id": 2, "question": "two?", "options": ["a", "b", "c"], "correct": 2,
              "hint": "last", "solution": "c it is" }
          ]
        }
      ]
    }]
  }]
}"#;

type TestApp = App<Catalog, JsonScoreSink>;

struct Harness {
    app: TestApp,
    tx: Sender<KeyEvent>,
    runner: Runner<ChannelKeys>,
    dir: TempDir,
}

impl Harness {
    fn new() -> Self {
        let dir = tempdir().unwrap();
        let catalog: Catalog = serde_json::from_str(CATALOG).unwrap();
        let sink = JsonScoreSink::with_path(dir.path().join("scores.json"));
        let playground = Playground::new(catalog, sink, SessionConfig::default()).with_seed(11);

        let (tx, rx) = mpsc::channel();
        let runner = Runner::new(ChannelKeys::new(rx), Duration::from_millis(5));
        Self {
            app: App::new(playground),
            tx,
            runner,
            dir,
        }
    }

    fn send(&self, code: KeyCode) {
        self.tx
            .send(KeyEvent::new(code, KeyModifiers::NONE))
            .unwrap();
    }

    /// Runs steps until the queued keys are used up (first idle step).
    fn pump(&mut self) -> Control {
        for _ in 0..100u32 {
            let step = self.runner.step();
            let idle = step.key.is_none();
            if self.app.on_step(step) == Control::Quit {
                return Control::Quit;
            }
            if idle {
                break;
            }
        }
        Control::Continue
    }

    fn answer_key(&self, correct: bool) -> KeyCode {
        let question = self
            .app
            .playground
            .session()
            .and_then(|s| s.current_question())
            .expect("a question should be showing");
        let position = if correct {
            question.correct_position()
        } else {
            (question.correct_position() + 1) % question.options.len()
        };
        KeyCode::Char(char::from(b'1' + position as u8))
    }

    fn scores_path(&self) -> std::path::PathBuf {
        self.dir.path().join("scores.json")
    }
}

#[test]
fn headless_game_plays_through_to_report_and_saves() {
    let mut h = Harness::new();

    h.send(KeyCode::Enter); // open the only game
    h.send(KeyCode::Enter); // start
    assert_eq!(h.pump(), Control::Continue);
    assert_eq!(h.app.state, AppState::Play);
    assert_eq!(h.app.play_view(), PlayView::Question { can_continue: false });

    for _ in 0..2 {
        let key = h.answer_key(true);
        h.send(key);
        h.pump();
        h.app.on_tick(Duration::from_millis(1500));
    }
    assert_eq!(h.app.play_view(), PlayView::Report);

    let summary = h.app.playground.session().unwrap().summary().unwrap().clone();
    assert_eq!(summary.total_points, 20);
    assert_eq!(summary.correct, 2);

    h.send(KeyCode::Char('b'));
    h.pump();
    assert_eq!(h.app.state, AppState::Browse);

    let records = JsonScoreSink::with_path(h.scores_path()).records().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].submission.game_id, "duo");
    assert_eq!(records[0].submission.total_score, 20);
    assert_eq!(records[0].submission.questions_attempted, 2);
}

#[test]
fn headless_wrong_answer_waits_for_continue() {
    let mut h = Harness::new();
    h.send(KeyCode::Enter);
    h.send(KeyCode::Enter);
    h.pump();

    let key = h.answer_key(false);
    h.send(key);
    h.pump();
    assert_eq!(h.app.play_view(), PlayView::Question { can_continue: true });

    // Nothing happens on its own after a wrong answer.
    h.app.on_tick(Duration::from_secs(10));
    assert_eq!(h.app.playground.session().unwrap().state().index, 0);

    h.send(KeyCode::Enter);
    h.pump();
    let session = h.app.playground.session().unwrap();
    assert_eq!(session.state().index, 1);
    assert_eq!(session.scores().len(), 1);
    assert!(!session.scores()[0].correct);
}

#[test]
fn headless_countdown_expiry_moves_on() {
    let mut h = Harness::new();
    h.send(KeyCode::Enter);
    h.send(KeyCode::Enter);
    h.pump();
    assert_eq!(h.app.playground.session().unwrap().state().remaining_secs, 3);

    for _ in 0..3 {
        h.app.on_tick(Duration::from_secs(1));
    }

    let session = h.app.playground.session().unwrap();
    assert_eq!(session.state().index, 1);
    assert_eq!(session.state().remaining_secs, 3);
    assert_eq!(session.scores().len(), 1);
    assert_eq!(session.scores()[0].points, 0);
    assert_eq!(session.scores()[0].time_remaining, 0);
}

#[test]
fn headless_hint_then_correct_scores_five() {
    let mut h = Harness::new();
    h.send(KeyCode::Enter);
    h.send(KeyCode::Enter);
    h.send(KeyCode::Char('h'));
    h.pump();

    let key = h.answer_key(true);
    h.send(key);
    h.pump();

    let session = h.app.playground.session().unwrap();
    assert_eq!(session.scores()[0].points, 5);
    assert!(session.scores()[0].used_hint);
}

#[test]
fn headless_search_and_escape() {
    let mut h = Harness::new();
    for c in "zzz".chars() {
        h.send(KeyCode::Char(c));
    }
    h.send(KeyCode::Enter);
    h.pump();
    assert_eq!(h.app.state, AppState::Browse);
    assert!(h.app.filtered().entries().is_empty());

    h.send(KeyCode::Esc);
    assert_eq!(h.pump(), Control::Quit);
}

#[test]
fn headless_leaving_mid_game_reports_partial_score() {
    let mut h = Harness::new();
    h.send(KeyCode::Enter);
    h.send(KeyCode::Enter);
    h.pump();
    let key = h.answer_key(false);
    h.send(key);
    h.send(KeyCode::Char('e'));
    h.pump();

    assert!(matches!(h.app.playground.phase(), Phase::Ready(_)));
    let records = JsonScoreSink::with_path(h.scores_path()).records().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].submission.questions_attempted, 1);
    assert_eq!(records[0].submission.total_questions, 2);
    assert_eq!(records[0].submission.total_score, 0);
}
