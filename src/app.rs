use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use log::debug;

use crate::catalog::{Catalog, CatalogEntry};
use crate::playground::{EndOutcome, Phase, Playground};
use crate::report::ScoreSink;
use crate::runtime::Step;
use crate::session::AnswerOutcome;
use crate::store::DocumentStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Browse,
    Play,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayView {
    /// Not-found or invalid game, or nothing loaded.
    Message,
    Ready,
    Question { can_continue: bool },
    Report,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Quit,
}

#[derive(Debug, Default)]
pub struct BrowserState {
    pub search: String,
    pub selected: usize,
}

pub struct App<S: DocumentStore, K: ScoreSink> {
    pub playground: Playground<S, K>,
    pub state: AppState,
    pub browser: BrowserState,
    pub catalog: Catalog,
    /// One-line status message, e.g. a failed score save.
    pub notice: Option<String>,
    pub last_answer: Option<AnswerOutcome>,
}

impl<S: DocumentStore, K: ScoreSink> App<S, K> {
    pub fn new(playground: Playground<S, K>) -> Self {
        let (catalog, notice) = match playground.store().catalog() {
            Ok(catalog) => (catalog, None),
            Err(e) => {
                log::warn!("could not read catalog: {e}");
                (Catalog::default(), Some(format!("Could not read games: {e}")))
            }
        };
        Self {
            playground,
            state: AppState::Browse,
            browser: BrowserState::default(),
            catalog,
            notice,
            last_answer: None,
        }
    }

    /// Jumps straight into a game, skipping the browser.
    pub fn open_game(&mut self, game_id: &str) {
        self.playground.load(game_id);
        self.last_answer = None;
        self.state = AppState::Play;
    }

    pub fn filtered(&self) -> Catalog {
        self.catalog.search(&self.browser.search)
    }

    pub fn selected_entry<'a>(&self, filtered: &'a Catalog) -> Option<CatalogEntry<'a>> {
        filtered.entries().get(self.browser.selected).copied()
    }

    pub fn on_tick(&mut self, elapsed: Duration) {
        for transition in self.playground.tick(elapsed) {
            debug!("tick transition {transition:?}");
            self.last_answer = None;
        }
    }

    /// Applies elapsed time first, so a key that arrives after the countdown
    /// ran out lands on the next question.
    pub fn on_step(&mut self, step: Step) -> Control {
        self.on_tick(step.elapsed);
        match step.key {
            Some(key) => self.on_key(key),
            None => Control::Continue,
        }
    }

    /// A notice lasts until the next key press.
    pub fn on_key(&mut self, key: KeyEvent) -> Control {
        self.notice = None;
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Control::Quit;
        }
        match self.state {
            AppState::Browse => self.on_browse_key(key),
            AppState::Play => self.on_play_key(key),
        }
    }

    /// Reports any running session before the app exits.
    pub fn shutdown(&mut self) -> Option<EndOutcome> {
        self.end_session()
    }

    fn on_browse_key(&mut self, key: KeyEvent) -> Control {
        match key.code {
            KeyCode::Esc => return Control::Quit,
            KeyCode::Up => {
                self.browser.selected = self.browser.selected.saturating_sub(1);
            }
            KeyCode::Down => {
                let count = self.filtered().entries().len();
                if self.browser.selected + 1 < count {
                    self.browser.selected += 1;
                }
            }
            KeyCode::Enter => {
                let filtered = self.filtered();
                if let Some(id) = self.selected_entry(&filtered).map(|e| e.game.id.clone()) {
                    self.open_game(&id);
                }
            }
            KeyCode::Backspace => {
                self.browser.search.pop();
                self.browser.selected = 0;
            }
            KeyCode::Char(c) => {
                self.browser.search.push(c);
                self.browser.selected = 0;
            }
            _ => {}
        }
        Control::Continue
    }

    /// What the play screen is currently showing.
    pub fn play_view(&self) -> PlayView {
        match self.playground.phase() {
            Phase::Empty | Phase::NotFound(_) | Phase::Invalid(_) => PlayView::Message,
            Phase::Ready(_) => PlayView::Ready,
            Phase::Playing(session) if session.state().showing_report => PlayView::Report,
            Phase::Playing(session) => PlayView::Question {
                can_continue: session.awaiting_continue() || session.advance_pending(),
            },
        }
    }

    fn on_play_key(&mut self, key: KeyEvent) -> Control {
        match self.play_view() {
            PlayView::Message => {
                if matches!(key.code, KeyCode::Esc | KeyCode::Enter | KeyCode::Char('b')) {
                    self.back_to_browser();
                }
            }
            PlayView::Ready => match key.code {
                KeyCode::Enter | KeyCode::Char('s') => {
                    if let Err(e) = self.playground.start_session() {
                        self.notice = Some(e.to_string());
                    }
                    self.last_answer = None;
                }
                KeyCode::Esc | KeyCode::Char('b') => self.back_to_browser(),
                _ => {}
            },
            PlayView::Report => match key.code {
                KeyCode::Char('r') => {
                    match self.playground.play_again() {
                        Ok(outcome) => self.note_outcome(outcome.as_ref()),
                        Err(e) => self.notice = Some(e.to_string()),
                    }
                    self.last_answer = None;
                }
                KeyCode::Char('b') => {
                    self.end_session();
                    self.back_to_browser();
                }
                KeyCode::Esc => return Control::Quit,
                _ => {}
            },
            PlayView::Question { can_continue } => match key.code {
                KeyCode::Char(c @ '1'..='9') => {
                    let position = c as usize - '1' as usize;
                    let outcome = self.playground.select_answer(position);
                    if outcome != AnswerOutcome::Ignored {
                        self.last_answer = Some(outcome);
                    }
                }
                KeyCode::Char('h') => {
                    self.playground.request_hint();
                }
                KeyCode::Enter | KeyCode::Char(' ') if can_continue => {
                    self.playground.advance();
                    self.last_answer = None;
                }
                KeyCode::Char('e') => {
                    self.end_session();
                }
                KeyCode::Esc => {
                    self.end_session();
                    self.back_to_browser();
                }
                _ => {}
            },
        }
        Control::Continue
    }

    fn end_session(&mut self) -> Option<EndOutcome> {
        let outcome = self.playground.end_session();
        self.note_outcome(outcome.as_ref());
        self.last_answer = None;
        outcome
    }

    fn note_outcome(&mut self, outcome: Option<&EndOutcome>) {
        if let Some(warning) = outcome.and_then(EndOutcome::warning) {
            self.notice = Some(warning);
        }
    }

    fn back_to_browser(&mut self) {
        self.state = AppState::Browse;
        self.last_answer = None;
        if let Ok(catalog) = self.playground.store().catalog() {
            self.catalog = catalog;
        }
    }
}
