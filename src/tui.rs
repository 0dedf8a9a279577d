// TUI Module - Terminal front-end drawn from the dashboard document
use anyhow::Result;
use crossterm::cursor::Show;
use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use futures::StreamExt;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::{Frame, Terminal};
use std::io::{self, Stdout};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::warn;

use crate::backend::Backend;
use crate::dashboard::Dashboard;
use crate::dispatch::Command;
use crate::dom::{self, Document};
use crate::poller;

/// What a key press asks the controller to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiAction {
    None,
    Quit,
    PollNow,
    Send(String),
}

// Power commands that need the same key twice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Confirm {
    Reboot,
    Shutdown,
}

// Selection cursors and the pending confirmation
#[derive(Debug, Default)]
pub struct UiState {
    swatch: usize,
    mode: usize,
    armed: Option<Confirm>,
}

// Passed to `sudo shutdown` on the controller host
const SHUTDOWN_PARAM: &str = "now";

fn mode_values(document: &Document) -> Vec<String> {
    document
        .element(dom::MODE_SELECT)
        .map(|select| {
            select
                .children
                .iter()
                .filter_map(|o| o.attr("value").map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

fn swatch_commands(document: &Document) -> Vec<String> {
    document
        .element(dom::COLOR_PICKER)
        .map(|picker| picker.children.iter().filter_map(|s| s.command.clone()).collect())
        .unwrap_or_default()
}

// Selected swatch as an /rgb command, for controllers without named colors
fn swatch_rgb(document: &Document, index: usize) -> Option<Command> {
    let picker = document.element(dom::COLOR_PICKER).ok()?;
    let hex = picker.children.get(index)?.style.background_color.as_deref()?;
    match css_color(hex)? {
        Color::Rgb(r, g, b) => Some(Command::Rgb(r, g, b)),
        _ => None,
    }
}

fn step(index: usize, len: usize, forward: bool) -> usize {
    if len == 0 {
        return 0;
    }
    let index = index.min(len - 1);
    if forward {
        (index + 1) % len
    } else {
        (index + len - 1) % len
    }
}

pub fn handle_key(state: &mut UiState, key: KeyEvent, document: &Document) -> UiAction {
    if key.kind != KeyEventKind::Press {
        return UiAction::None;
    }
    let armed = state.armed.take();

    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => UiAction::Quit,
        KeyCode::Char('q') | KeyCode::Esc => UiAction::Quit,
        KeyCode::Char('p') => UiAction::PollNow,
        KeyCode::Char('r') => UiAction::Send(Command::Rainbow.path()),
        KeyCode::Char('o') => UiAction::Send(Command::AllOff.path()),
        KeyCode::Char('B') => confirm(state, armed, Confirm::Reboot, Command::Reboot),
        KeyCode::Char('S') => confirm(
            state,
            armed,
            Confirm::Shutdown,
            Command::Shutdown(SHUTDOWN_PARAM.to_string()),
        ),
        KeyCode::Char('g') => match swatch_rgb(document, state.swatch) {
            Some(command) => UiAction::Send(command.path()),
            None => UiAction::None,
        },
        KeyCode::Left | KeyCode::Right => {
            let len = swatch_commands(document).len();
            state.swatch = step(state.swatch, len, key.code == KeyCode::Right);
            UiAction::None
        }
        KeyCode::Up | KeyCode::Down => {
            let len = mode_values(document).len();
            state.mode = step(state.mode, len, key.code == KeyCode::Down);
            UiAction::None
        }
        KeyCode::Enter => match swatch_commands(document).get(state.swatch) {
            Some(path) => UiAction::Send(path.clone()),
            None => UiAction::None,
        },
        KeyCode::Char('m') => match mode_values(document).get(state.mode) {
            Some(mode) => UiAction::Send(Command::Mode(mode.clone()).path()),
            None => UiAction::None,
        },
        _ => UiAction::None,
    }
}

fn confirm(state: &mut UiState, armed: Option<Confirm>, wanted: Confirm, command: Command) -> UiAction {
    if armed == Some(wanted) {
        UiAction::Send(command.path())
    } else {
        state.armed = Some(wanted);
        UiAction::None
    }
}

/// Parse a CSS color string (hex or name) into a terminal color.
pub fn css_color(value: &str) -> Option<Color> {
    let color = colorgrad::Color::from_html(value.trim()).ok()?;
    let [r, g, b, _] = color.to_rgba8();
    Some(Color::Rgb(r, g, b))
}

fn indicator_color(value: &str) -> Color {
    match css_color(value) {
        // Pure black vanishes on a dark terminal
        Some(Color::Rgb(0, 0, 0)) | None => Color::DarkGray,
        Some(c) => c,
    }
}

/// One header line per strand, then its LEDs with a line break at every spacer.
pub fn strand_lines(document: &Document) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let holder = match document.element(dom::LED_RESULTS) {
        Ok(holder) => holder,
        Err(_) => return lines,
    };

    for strand in &holder.children {
        lines.push(Line::from(vec![
            Span::styled(strand.text.clone(), Style::default().add_modifier(Modifier::BOLD)),
            Span::styled(
                format!("  {}", strand.title.clone().unwrap_or_default()),
                Style::default().fg(Color::Gray),
            ),
        ]));

        let mut row: Vec<Span<'static>> = Vec::new();
        for child in &strand.children {
            if child.has_class("spacer") {
                lines.push(Line::from(std::mem::take(&mut row)));
            } else if child.has_class("led") {
                let fg = child
                    .style
                    .color
                    .as_deref()
                    .and_then(css_color)
                    .unwrap_or(Color::Gray);
                row.push(Span::styled(child.text.clone(), Style::default().fg(fg)));
            }
        }
        if !row.is_empty() {
            lines.push(Line::from(row));
        }
        lines.push(Line::from(""));
    }
    lines
}

fn draw<B: Backend>(f: &mut Frame, dashboard: &Dashboard<B>, ui: &UiState, backend_url: &str) {
    let document = dashboard.document();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),  // Header
            Constraint::Length(3),  // Command status
            Constraint::Min(8),     // Strands and controls
            Constraint::Length(8),  // Event log
            Constraint::Length(3),  // Footer
        ])
        .split(f.size());

    // Header - connectivity dot, backend and refresh timing
    let indicator = dashboard.connectivity().indicator();
    let next_poll = dashboard
        .timer()
        .remaining()
        .map(|d| format!("{}s", d.as_secs()))
        .unwrap_or_else(|| "-".to_string());
    let stats = dashboard.stats();
    let header = Paragraph::new(Line::from(vec![
        Span::styled("⬤ ", Style::default().fg(indicator_color(indicator.color))),
        Span::raw(indicator.tooltip),
        Span::styled(
            format!(
                " | {} | Last refresh: {} | Next poll: {} | Polls: {} ({} failed)",
                backend_url,
                dashboard.last_refresh_label(),
                next_poll,
                stats.cycles,
                stats.failures
            ),
            Style::default().fg(Color::Gray),
        ),
    ]))
    .block(Block::default().borders(Borders::ALL).title("strandview"));
    f.render_widget(header, chunks[0]);

    let status_text = document
        .element(dom::STATUS)
        .map(|s| s.text.clone())
        .unwrap_or_default();
    let status = Paragraph::new(status_text).block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(status, chunks[1]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
        .split(chunks[2]);

    let mut lines = strand_lines(document);
    if lines.is_empty() {
        lines.push(Line::from("Waiting for state from the controller..."));
    }
    let strands = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title("Strands"));
    f.render_widget(strands, body[0]);

    let side = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(4), Constraint::Length(5)])
        .split(body[1]);

    // Mode selector options, labels as rendered
    let options: Vec<Line> = document
        .element(dom::MODE_SELECT)
        .map(|select| {
            select
                .children
                .iter()
                .enumerate()
                .map(|(i, option)| {
                    if i == ui.mode {
                        Line::styled(
                            format!("> {}", option.text),
                            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                        )
                    } else {
                        Line::from(format!("  {}", option.text))
                    }
                })
                .collect()
        })
        .unwrap_or_default();
    let modes = Paragraph::new(options).block(Block::default().borders(Borders::ALL).title("Modes (m to set)"));
    f.render_widget(modes, side[0]);

    let (swatches, selected_title) = document
        .element(dom::COLOR_PICKER)
        .map(|picker| {
            let spans: Vec<Span> = picker
                .children
                .iter()
                .enumerate()
                .map(|(i, swatch)| {
                    let fg = swatch
                        .style
                        .background_color
                        .as_deref()
                        .and_then(css_color)
                        .unwrap_or(Color::Gray);
                    let mut style = Style::default().fg(fg);
                    if i == ui.swatch {
                        style = style.add_modifier(Modifier::REVERSED);
                    }
                    Span::styled(swatch.text.clone(), style)
                })
                .collect();
            let title = picker
                .children
                .get(ui.swatch)
                .and_then(|s| s.title.clone())
                .unwrap_or_default();
            (spans, title)
        })
        .unwrap_or_default();
    let palette = Paragraph::new(vec![Line::from(swatches), Line::from(selected_title)])
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title("Colors (Enter to set)"));
    f.render_widget(palette, side[1]);

    let events: Vec<&str> = dashboard.events().collect();
    let visible = events.len().saturating_sub(6);
    let log_lines: Vec<Line> = events[visible..].iter().map(|s| Line::from(*s)).collect();
    let log = Paragraph::new(log_lines).block(Block::default().borders(Borders::ALL).title("Events"));
    f.render_widget(log, chunks[3]);

    let footer_text = match ui.armed {
        Some(Confirm::Reboot) => "Press B again to reboot the controller, any other key cancels",
        Some(Confirm::Shutdown) => "Press S again to shut the controller down, any other key cancels",
        None => {
            "←/→ color | Enter set color | g as rgb | ↑/↓ mode | m set mode | r rainbow | o all off | B reboot | S shutdown | p poll | q quit"
        }
    };
    let footer = Paragraph::new(footer_text).block(Block::default().borders(Borders::ALL));
    f.render_widget(footer, chunks[4]);
}

pub async fn run_tui<B: Backend>(
    dashboard: &mut Dashboard<B>,
    mut commands: mpsc::Receiver<String>,
    page: watch::Sender<String>,
    backend_url: &str,
) -> Result<()> {
    enable_raw_mode()?;
    // From here on every exit, including a failed setup step, restores the terminal
    let _restore = RestoreGuard::new(restore_terminal);

    let mut stdout = io::stdout();
    stdout.execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;
    terminal.clear()?;
    terminal.hide_cursor()?;

    event_loop(&mut terminal, dashboard, &mut commands, &page, backend_url).await
}

// Runs its closure when dropped
struct RestoreGuard<F: FnMut()> {
    restore: F,
}

impl<F: FnMut()> RestoreGuard<F> {
    fn new(restore: F) -> Self {
        RestoreGuard { restore }
    }
}

impl<F: FnMut()> Drop for RestoreGuard<F> {
    fn drop(&mut self) {
        (self.restore)();
    }
}

fn restore_terminal() {
    if let Err(e) = disable_raw_mode() {
        warn!(error = %e, "failed to leave raw mode");
    }
    let mut stdout = io::stdout();
    if let Err(e) = stdout.execute(LeaveAlternateScreen) {
        warn!(error = %e, "failed to leave alternate screen");
    }
    let _ = stdout.execute(Show);
}

async fn event_loop<B: Backend>(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    dashboard: &mut Dashboard<B>,
    commands: &mut mpsc::Receiver<String>,
    page: &watch::Sender<String>,
    backend_url: &str,
) -> Result<()> {
    let mut events = EventStream::new();
    let mut ui = UiState::default();
    let mut commands_open = true;
    // Keeps the next-poll countdown moving between polls
    let mut redraw = tokio::time::interval(Duration::from_secs(1));
    dashboard.publish(page);

    loop {
        terminal.draw(|f| draw(f, dashboard, &ui, backend_url))?;

        tokio::select! {
            _ = poller::wait_for(dashboard.timer().deadline()) => {
                dashboard.poll().await;
            }
            _ = redraw.tick() => {}
            maybe_event = events.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key))) => match handle_key(&mut ui, key, dashboard.document()) {
                        UiAction::Quit => break,
                        UiAction::PollNow => {
                            dashboard.poll_now().await;
                        }
                        UiAction::Send(path) => {
                            let _ = dashboard.send_command(&path).await;
                        }
                        UiAction::None => {}
                    },
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e.into()),
                    None => break,
                }
            }
            maybe_path = commands.recv(), if commands_open => {
                match maybe_path {
                    Some(path) => {
                        let _ = dashboard.send_command(&path).await;
                    }
                    None => commands_open = false,
                }
            }
        }
        dashboard.publish(page);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modes::ModeRegistry;
    use crate::palette::{populate_color_picker, Swatch};
    use crate::renderer::render_strands;
    use crate::snapshot::{LedState, SlotId, StrandState};
    use std::collections::BTreeMap;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn document() -> Document {
        let mut doc = Document::dashboard();
        let mut registry = ModeRegistry::new();
        registry
            .reconcile(&mut doc, &["rainbow".to_string(), "chase".to_string()])
            .unwrap();
        populate_color_picker(&mut doc, &[Swatch::new("Red", "#f00"), Swatch::new("Blue", "#00f")]).unwrap();
        doc
    }

    #[test]
    fn test_mode_and_color_selection() {
        let doc = document();
        let mut ui = UiState::default();

        assert_eq!(handle_key(&mut ui, press(KeyCode::Down), &doc), UiAction::None);
        assert_eq!(
            handle_key(&mut ui, press(KeyCode::Char('m')), &doc),
            UiAction::Send("/mode/chase".to_string())
        );

        // Wraps around to the last swatch
        handle_key(&mut ui, press(KeyCode::Left), &doc);
        assert_eq!(
            handle_key(&mut ui, press(KeyCode::Enter), &doc),
            UiAction::Send("/color/Blue".to_string())
        );
    }

    #[test]
    fn test_reboot_needs_confirmation() {
        let doc = document();
        let mut ui = UiState::default();

        assert_eq!(handle_key(&mut ui, press(KeyCode::Char('B')), &doc), UiAction::None);
        assert_eq!(
            handle_key(&mut ui, press(KeyCode::Char('B')), &doc),
            UiAction::Send("/reboot".to_string())
        );

        handle_key(&mut ui, press(KeyCode::Char('B')), &doc);
        handle_key(&mut ui, press(KeyCode::Char('x')), &doc);
        assert_eq!(handle_key(&mut ui, press(KeyCode::Char('B')), &doc), UiAction::None);
    }

    #[test]
    fn test_shutdown_needs_its_own_confirmation() {
        let doc = document();
        let mut ui = UiState::default();

        assert_eq!(handle_key(&mut ui, press(KeyCode::Char('S')), &doc), UiAction::None);
        assert_eq!(
            handle_key(&mut ui, press(KeyCode::Char('S')), &doc),
            UiAction::Send("/shutdown now".to_string())
        );

        // A reboot latch does not confirm a shutdown
        handle_key(&mut ui, press(KeyCode::Char('B')), &doc);
        assert_eq!(handle_key(&mut ui, press(KeyCode::Char('S')), &doc), UiAction::None);
        assert_eq!(handle_key(&mut ui, press(KeyCode::Char('B')), &doc), UiAction::None);
    }

    #[test]
    fn test_selected_swatch_sent_as_rgb() {
        let doc = document();
        let mut ui = UiState::default();
        assert_eq!(
            handle_key(&mut ui, press(KeyCode::Char('g')), &doc),
            UiAction::Send("/rgb/255,0,0".to_string())
        );
        handle_key(&mut ui, press(KeyCode::Right), &doc);
        assert_eq!(
            handle_key(&mut ui, press(KeyCode::Char('g')), &doc),
            UiAction::Send("/rgb/0,0,255".to_string())
        );

        let empty = Document::dashboard();
        assert_eq!(handle_key(&mut ui, press(KeyCode::Char('g')), &empty), UiAction::None);
    }

    #[test]
    fn test_restore_runs_when_setup_fails() {
        let restored = std::cell::Cell::new(0);
        let setup = || -> Result<()> {
            let _restore = RestoreGuard::new(|| restored.set(restored.get() + 1));
            let attach: Result<()> = Err(anyhow::anyhow!("no terminal attached"));
            attach?;
            Ok(())
        };
        assert!(setup().is_err());
        assert_eq!(restored.get(), 1);
    }

    #[test]
    fn test_quit_and_shortcuts() {
        let doc = document();
        let mut ui = UiState::default();
        assert_eq!(handle_key(&mut ui, press(KeyCode::Char('q')), &doc), UiAction::Quit);
        assert_eq!(
            handle_key(&mut ui, KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL), &doc),
            UiAction::Quit
        );
        assert_eq!(handle_key(&mut ui, press(KeyCode::Char('p')), &doc), UiAction::PollNow);
        assert_eq!(
            handle_key(&mut ui, press(KeyCode::Char('o')), &doc),
            UiAction::Send("/all off".to_string())
        );
    }

    #[test]
    fn test_empty_selector_sends_nothing() {
        let doc = Document::dashboard();
        let mut ui = UiState::default();
        handle_key(&mut ui, press(KeyCode::Down), &doc);
        assert_eq!(handle_key(&mut ui, press(KeyCode::Char('m')), &doc), UiAction::None);
        assert_eq!(handle_key(&mut ui, press(KeyCode::Enter), &doc), UiAction::None);
    }

    #[test]
    fn test_css_color() {
        assert_eq!(css_color("#ff0000"), Some(Color::Rgb(255, 0, 0)));
        assert_eq!(css_color("#0f0"), Some(Color::Rgb(0, 255, 0)));
        assert_eq!(css_color("blue"), Some(Color::Rgb(0, 0, 255)));
        assert_eq!(css_color("not a color"), None);
        assert_eq!(indicator_color("black"), Color::DarkGray);
        assert_eq!(indicator_color("green"), Color::Rgb(0, 128, 0));
    }

    #[test]
    fn test_strand_lines_break_at_spacer() {
        let mut strand = StrandState::default();
        for i in 0..35 {
            strand.led_info.insert(
                SlotId::new(i.to_string()),
                LedState {
                    color: "#123456".to_string(),
                    ..Default::default()
                },
            );
        }
        let mut strands = BTreeMap::new();
        strands.insert(SlotId::from("0"), strand);

        let mut doc = Document::dashboard();
        render_strands(&mut doc, &strands).unwrap();
        let lines = strand_lines(&doc);

        // Header, 30 LEDs, 5 LEDs, blank separator
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[1].spans.len(), 30);
        assert_eq!(lines[2].spans.len(), 5);
        assert_eq!(lines[1].spans[0].style.fg, Some(Color::Rgb(0x12, 0x34, 0x56)));
    }
}
