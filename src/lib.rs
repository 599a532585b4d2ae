// Library surface for the binary, headless tests and reuse.
pub mod app;
pub mod app_dirs;
pub mod catalog;
pub mod config;
pub mod error;
pub mod playground;
pub mod report;
pub mod runtime;
pub mod scheduler;
pub mod session;
pub mod shuffle;
pub mod store;
pub mod ui;

pub use app::{App, AppState, Control};
pub use error::{ErrorKind, QuizError};
pub use playground::{Playground, Phase};
