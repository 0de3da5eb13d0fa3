use std::{
    env,
    io::{self, Stdout, Write},
    path::PathBuf,
    sync::Arc,
    time::Duration,
};

use anyhow::Context;
use crossterm::{
    cursor,
    event::{Event, EventStream, KeyEventKind},
    execute,
    terminal::{
        Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode,
        enable_raw_mode,
    },
};
use futures::StreamExt;
use ratatui::{Terminal, backend::CrosstermBackend};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio_util::sync::CancellationToken;

mod app;
mod backend;
mod branch;
mod cache;
mod config;
mod conflict;
mod detail;
mod detail_cache;
mod editor;
mod events;
mod files;
mod focus;
mod git_ops;
mod input;
mod log;
mod logging;
mod operation;
mod overlay;
mod pane;
mod remotes;
mod runner;
mod theme;
mod ui;

use app::App;
use backend::GitCli;
use config::Settings;
use detail_cache::DetailCache;
use editor::{ExternalEditor, MessageEditor};
use events::{AppEvent, KeyEventResult};
use runner::OperationRunner;

const VERSION: &str = env!("CARGO_PKG_VERSION");

type Term = Terminal<CrosstermBackend<Stdout>>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    if let Some(arg) = env::args().nth(1)
        && (arg == "--version" || arg == "-V")
    {
        println!("gitbuddy {}", VERSION);
        return Ok(());
    }

    let start_path = env::args()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));

    if let Err(e) = logging::init_tracing() {
        eprintln!("gitbuddy: logging disabled: {:#}", e);
    }
    let settings = Settings::load();

    let git = GitCli::discover(&start_path)
        .map_err(|e| anyhow::anyhow!(e))
        .with_context(|| format!("{} is not inside a git repository", start_path.display()))?;
    tracing::info!(
        version = VERSION,
        repo = %git.repo_root().display(),
        theme = settings.theme.label(),
        "starting"
    );

    let (tx, mut rx) = mpsc::unbounded_channel::<AppEvent>();
    let runner = OperationRunner::new(
        Arc::new(git),
        tx.clone(),
        Arc::new(DetailCache::default()),
        settings.log_limit,
    );
    let mut app = App::new(runner, settings.theme);
    let editor = ExternalEditor::from_env(settings.editor.as_deref());

    let cancel = CancellationToken::new();
    let timer = (settings.refresh_interval_ms > 0).then(|| {
        events::spawn_refresh_timer(
            tx.clone(),
            Duration::from_millis(settings.refresh_interval_ms),
            cancel.clone(),
        )
    });
    drop(tx);

    // Put the terminal back before the panic message is printed.
    let orig_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, cursor::Show);
        orig_hook(info);
    }));

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    app.start();
    let result = run(&mut terminal, &mut app, &mut rx, &editor).await;

    cancel.cancel();
    if let Some(timer) = timer {
        let _ = timer.await;
    }

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, cursor::Show)?;
    if let Err(e) = &result {
        tracing::error!(error = %e, "event loop stopped");
    }
    tracing::info!("shutdown");
    result
}

/// The single writer: every mutation of `app` happens on this task.
async fn run(
    terminal: &mut Term,
    app: &mut App,
    rx: &mut UnboundedReceiver<AppEvent>,
    editor: &dyn MessageEditor,
) -> anyhow::Result<()> {
    let mut term_events = EventStream::new();

    loop {
        // Force full terminal refresh if needed (e.g., after external editor)
        if app.needs_full_redraw {
            app.needs_full_redraw = false;
            terminal.clear()?;
        }
        terminal.draw(|f| ui::render(app, f))?;

        // Wakes the loop so status messages can fade without input.
        let idle = tokio::time::sleep(Duration::from_millis(500));
        tokio::pin!(idle);

        tokio::select! {
            Some(event) = rx.recv() => events::handle_app_event(app, event),
            maybe_event = term_events.next() => match maybe_event {
                Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                    if events::handle_key_event(app, &key) == KeyEventResult::Quit {
                        break;
                    }
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e).context("reading terminal events"),
                None => break,
            },
            _ = &mut idle => {}
        }

        if app.editor_requested {
            app.editor_requested = false;
            suspend_terminal()?;
            let result = editor.edit();
            resume_terminal()?;
            app.finish_editor(result);
        }
    }
    Ok(())
}

fn suspend_terminal() -> io::Result<()> {
    disable_raw_mode()?;
    execute!(io::stdout(), LeaveAlternateScreen, cursor::Show)?;
    io::stdout().flush()
}

fn resume_terminal() -> io::Result<()> {
    enable_raw_mode()?;
    execute!(
        io::stdout(),
        EnterAlternateScreen,
        Clear(ClearType::All),
        Clear(ClearType::Purge),
        cursor::MoveTo(0, 0),
        cursor::Hide
    )?;
    io::stdout().flush()
}
