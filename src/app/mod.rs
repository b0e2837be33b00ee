mod effects;
mod input;
mod message;
mod render;
mod state;
mod update;

use std::collections::VecDeque;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossterm::{
    event::{self, Event},
    execute,
    terminal::{self, disable_raw_mode, enable_raw_mode, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen},
};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::info;

use crate::error::Result;
use crate::shell;
use crate::view::Presenter;

pub use effects::Executor;
pub use message::{Effect, Msg};
pub use state::{App, DASHBOARD_CHROME, LOGS_CHROME};

/// How long the loop waits for a key before draining completions again.
const INPUT_POLL: Duration = Duration::from_millis(100);

/// Restore the terminal to normal mode. Safe to call multiple times.
pub fn restore_terminal() {
    let _ = execute!(io::stdout(), LeaveAlternateScreen);
    let _ = disable_raw_mode();
}

fn enter_terminal() -> io::Result<()> {
    enable_raw_mode()?;
    execute!(io::stdout(), EnterAlternateScreen, Clear(ClearType::All))
}

/// Run the application. Sets up the terminal, runs the main loop, restores
/// the terminal on exit.
pub fn run(
    mut app: App,
    executor: Executor,
    mut rx: UnboundedReceiver<Msg>,
    should_quit: Arc<AtomicBool>,
) -> Result<()> {
    enter_terminal()?;
    let result = run_loop(&mut app, &executor, &mut rx, &should_quit);
    restore_terminal();
    result
}

fn run_loop(
    app: &mut App,
    executor: &Executor,
    rx: &mut UnboundedReceiver<Msg>,
    should_quit: &AtomicBool,
) -> Result<()> {
    app.size = terminal::size()?;
    let initial = app.init();
    if apply_effects(app, executor, initial)? {
        return Ok(());
    }
    let mut needs_render = true;

    loop {
        if should_quit.load(Ordering::Relaxed) {
            info!("signal received, exiting");
            break;
        }

        while let Ok(msg) = rx.try_recv() {
            let effects = app.update(msg);
            needs_render = true;
            if apply_effects(app, executor, effects)? {
                return Ok(());
            }
        }

        if needs_render {
            if !Presenter::render_size_guard()? {
                render::render(app)?;
            }
            needs_render = false;
        }

        if event::poll(INPUT_POLL)? {
            let msg = match event::read()? {
                Event::Key(key) => Msg::Key(key),
                Event::Resize(cols, rows) => Msg::Resize(cols, rows),
                _ => continue,
            };
            let effects = app.update(msg);
            needs_render = true;
            if apply_effects(app, executor, effects)? {
                break;
            }
        }
    }
    Ok(())
}

/// Dispatch effects, running the ones that own the terminal inline.
/// Returns true when the app should quit.
fn apply_effects(app: &mut App, executor: &Executor, effects: Vec<Effect>) -> Result<bool> {
    let mut queue: VecDeque<Effect> = effects.into();
    while let Some(effect) = queue.pop_front() {
        match effect {
            Effect::Quit => return Ok(true),
            Effect::LaunchShell(target) => {
                info!(task = %target.task_id, container = %target.container, "launching shell");
                restore_terminal();
                let result = shell::launch(&target);
                enter_terminal()?;
                queue.extend(app.update(Msg::ShellExited(result)));
            }
            other => executor.dispatch(other),
        }
    }
    Ok(false)
}
