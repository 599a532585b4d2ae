use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use log::info;
use logiq::{
    app::{App, Control},
    app_dirs::AppDirs,
    catalog::Catalog,
    config::{Config, ConfigStore, FileConfigStore},
    playground::Playground,
    report::{JsonScoreSink, ScoreSink},
    runtime::{KeySource, Runner, TerminalKeys},
    session::SessionConfig,
    store::{DocumentStore, JsonFileStore},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    fs::{self, OpenOptions},
    io::{self, stdin, Write},
    path::PathBuf,
    time::Duration,
};

const TICK_RATE_MS: u64 = 100;

/// terminal player for timed logic-game quizzes
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Browse a catalog of logic games and play them in the terminal: shuffled options, a per-question countdown, optional hints and a score report at the end."
)]
pub struct Cli {
    /// catalog document to read games from
    #[clap(short = 'd', long)]
    data: Option<PathBuf>,

    /// score document that finished sessions are appended to
    #[clap(long)]
    scores: Option<PathBuf>,

    /// open this game directly instead of the browser
    #[clap(short = 'g', long)]
    game: Option<String>,

    /// print the catalog and exit
    #[clap(short = 'l', long)]
    list: bool,

    /// filter the catalog (browser and --list)
    #[clap(short = 's', long)]
    search: Option<String>,

    /// seed for option shuffling
    #[clap(long)]
    seed: Option<u64>,

    /// seconds per question for games that do not set their own
    #[clap(long)]
    default_secs: Option<u32>,

    /// remember --data, --scores and --default-secs for later runs
    #[clap(long)]
    save_config: bool,
}

impl Cli {
    /// Layers command line flags over the persisted config.
    fn apply(&self, mut cfg: Config) -> Config {
        if let Some(path) = &self.data {
            cfg.data_path = Some(path.clone());
        }
        if let Some(path) = &self.scores {
            cfg.scores_path = Some(path.clone());
        }
        if let Some(secs) = self.default_secs {
            cfg.default_secs_per_question = secs;
        }
        cfg
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging();

    let config_store = FileConfigStore::new();
    let cfg = cli.apply(config_store.load());
    if cli.save_config {
        config_store.save(&cfg)?;
        info!("saved config to {}", config_store.path().display());
    }
    let data_path = cfg.data_path.clone().unwrap_or_else(AppDirs::data_path);
    let scores_path = cfg.scores_path.clone().unwrap_or_else(AppDirs::scores_path);
    let store = JsonFileStore::with_path(&data_path);

    if cli.list {
        let catalog = store.catalog()?;
        let catalog = catalog.search(cli.search.as_deref().unwrap_or_default());
        print_catalog(&catalog, &mut io::stdout().lock())?;
        return Ok(());
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let sink = JsonScoreSink::with_path(&scores_path);
    info!(
        "starting with catalog {} and scores {}",
        store.path().display(),
        sink.path().display()
    );
    let mut playground = Playground::new(store, sink, SessionConfig::from(&cfg));
    if let Some(seed) = cli.seed {
        playground = playground.with_seed(seed);
    }

    let mut app = App::new(playground);
    if let Some(search) = &cli.search {
        app.browser.search = search.clone();
    }
    if let Some(game) = &cli.game {
        app.open_game(game);
    }

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut runner = Runner::new(TerminalKeys::spawn(), Duration::from_millis(TICK_RATE_MS));
    let result = start_tui(&mut terminal, &mut app, &mut runner);
    let ended = app.shutdown();

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen,)?;
    terminal.show_cursor()?;

    if let Some(warning) = ended.as_ref().and_then(|o| o.warning()) {
        eprintln!("{warning}");
    }

    result
}

fn start_tui<B, S, K, I>(
    terminal: &mut Terminal<B>,
    app: &mut App<S, K>,
    runner: &mut Runner<I>,
) -> Result<(), Box<dyn Error>>
where
    B: Backend,
    S: DocumentStore,
    K: ScoreSink,
    I: KeySource,
{
    terminal.draw(|f| f.render_widget(&*app, f.area()))?;

    loop {
        if app.on_step(runner.step()) == Control::Quit {
            break;
        }
        terminal.draw(|f| f.render_widget(&*app, f.area()))?;
    }

    Ok(())
}

/// Writes the catalog as an indented tree, one game per line.
fn print_catalog<W: Write>(catalog: &Catalog, out: &mut W) -> io::Result<()> {
    if catalog.main_subjects.is_empty() {
        return writeln!(out, "no games found");
    }
    for main in &catalog.main_subjects {
        writeln!(out, "{}", main.main_subject)?;
        for sub in &main.main_subject_context {
            writeln!(out, "  {}", sub.sub_subject)?;
            for game in &sub.sub_subject_context {
                writeln!(
                    out,
                    "    {}  {} ({} questions)",
                    game.id,
                    game.name,
                    game.question_count()
                )?;
            }
        }
    }
    Ok(())
}

/// Logs only when `RUST_LOG` is set, and always to a file so the alternate
/// screen stays clean.
fn init_logging() {
    let Ok(filters) = std::env::var("RUST_LOG") else {
        return;
    };
    let path = AppDirs::log_path();
    if let Some(parent) = path.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            eprintln!("could not create log dir {}: {e}", parent.display());
            return;
        }
    }
    let file = match OpenOptions::new().create(true).append(true).open(&path) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("could not open log file {}: {e}", path.display());
            return;
        }
    };

    let mut builder = pretty_env_logger::formatted_builder();
    builder
        .parse_filters(&filters)
        .write_style(env_logger::WriteStyle::Never)
        .target(env_logger::Target::Pipe(Box::new(file)));
    if let Err(e) = builder.try_init() {
        eprintln!("could not start logging: {e}");
    }
}
