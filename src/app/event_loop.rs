use std::io::stdout;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{self, DisableBracketedPaste, EnableBracketedPaste};
use crossterm::execute;
use ratatui::DefaultTerminal;
use tracing::{debug, info};

use crate::app::{App, EffectRunner};
use crate::editor::{Command, EditorModel, Message, Route, update};
use crate::store::DiagramId;
use crate::ui::PreviewCache;

/// Longest the loop sleeps when no timer is due.
const IDLE_POLL_MS: u64 = 250;
/// Poll interval while background work is outstanding.
const BUSY_POLL_MS: u64 = 10;

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

impl App {
    /// Edit diagram `id` until the user leaves. Returns where to go next.
    ///
    /// # Errors
    ///
    /// Returns an error if terminal initialization or drawing fails.
    pub fn run(&self, id: DiagramId) -> Result<Route> {
        let mut terminal = ratatui::try_init()
            .context("Failed to initialize terminal: the editor requires an interactive terminal")?;
        execute!(stdout(), EnableBracketedPaste)?;

        let result = self.event_loop(&mut terminal, id);

        let _ = execute!(stdout(), DisableBracketedPaste);
        ratatui::restore();
        result
    }

    fn event_loop(&self, terminal: &mut DefaultTerminal, id: DiagramId) -> Result<Route> {
        let start = Instant::now();
        let mut runner = EffectRunner::new(self.effects.clone(), self.handle.clone());
        let mut model = EditorModel::open(id, self.settings);
        let mut preview = if self.preview {
            PreviewCache::new()
        } else {
            PreviewCache::disabled()
        }
        .with_backdrop(self.backdrop);
        let mut needs_render = true;

        loop {
            let now_ms = elapsed_ms(start);
            let due = model.next_deadline_ms().is_some_and(|d| d <= now_ms);
            model = update(model, Message::Tick(now_ms));
            needs_render |= due;

            for msg in runner.drain() {
                debug!(?msg, "completion");
                model = update(model, msg);
                needs_render = true;
            }

            if let Some(route) = dispatch_commands(&mut model, &mut runner) {
                let model = settle(model, &mut runner);
                info!(id = %model.id(), ?route, "leaving editor");
                return Ok(route);
            }

            if needs_render {
                terminal.draw(|frame| crate::ui::render(&model, &mut preview, frame))?;
                needs_render = false;
            }

            let mut poll_ms = model
                .next_deadline_ms()
                .map_or(IDLE_POLL_MS, |d| d.saturating_sub(now_ms).min(IDLE_POLL_MS));
            if runner.outstanding() > 0 {
                poll_ms = poll_ms.min(BUSY_POLL_MS);
            }
            if event::poll(Duration::from_millis(poll_ms))? {
                // Coalesce key repeat and paste bursts into a single frame.
                loop {
                    let event_ms = elapsed_ms(start);
                    for msg in super::input::event_to_messages(&event::read()?, event_ms) {
                        model = update(model, msg);
                        needs_render = true;
                    }
                    if !event::poll(Duration::ZERO)? {
                        break;
                    }
                }
            }
        }
    }
}

/// Hand queued commands to the runner. Returns the route if the model
/// asked to navigate away.
fn dispatch_commands(model: &mut EditorModel, runner: &mut EffectRunner) -> Option<Route> {
    let mut route = None;
    for command in model.take_commands() {
        match command {
            Command::Navigate(to) => route = Some(to),
            command => runner.dispatch(command),
        }
    }
    route
}

/// Let outstanding work land before the editor goes away, including any
/// save that was parked behind an in-flight one.
fn settle(mut model: EditorModel, runner: &mut EffectRunner) -> EditorModel {
    while runner.outstanding() > 0 {
        for msg in runner.wait_idle() {
            model = update(model, msg);
        }
        dispatch_commands(&mut model, runner);
    }
    model
}
