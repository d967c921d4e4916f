mod export;
mod help;
mod state;

use crate::cli::Cli;
use crate::controller::{self, LifecyclePhase, OpportunityCard, RenderedResults, UiCommand};
use crate::model::{ClientConfig, ClientEvent, ProfitPotential, CATEGORIES, DEFAULT_SOURCE};
use crate::service::JobServiceClient;
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Gauge, List, ListItem, ListState, Paragraph, Tabs, Wrap},
    Terminal,
};
use state::{Focus, UiState};
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

pub async fn run(args: Cli, cfg: ClientConfig, client: JobServiceClient) -> Result<()> {
    let (event_tx, event_rx) = mpsc::unbounded_channel::<ClientEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    // TUI runs in a dedicated thread to keep all blocking I/O out of the Tokio runtime.
    let ui_args = args.clone();
    let ui_handle = std::thread::spawn(move || run_threaded(ui_args, event_rx, cmd_tx));

    let res = controller::run_controller(&cfg, client, event_tx, cmd_rx).await;

    let join_res = tokio::task::spawn_blocking(move || ui_handle.join()).await;
    if let Ok(joined) = join_res {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(anyhow::anyhow!("TUI thread panicked")),
        }
    }

    res
}

/// Run the TUI loop on a dedicated thread.
pub fn run_threaded(
    args: Cli,
    mut event_rx: UnboundedReceiver<ClientEvent>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    // UiState is owned by the UI thread only; the controller task only sends snapshots.
    let mut state = UiState::new(&args.category, &args.model);
    state.export_dir = args.export_dir.clone();

    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now() - tick_rate;

    let res = loop {
        while let Ok(ev) = event_rx.try_recv() {
            state.apply_event(ev);
        }

        if last_tick.elapsed() >= tick_rate {
            terminal.draw(|f| draw(f.area(), f, &state)).ok();
            last_tick = Instant::now();
        }

        // Poll input with a short timeout to avoid blocking the render loop.
        if event::poll(Duration::from_millis(20)).unwrap_or(false) {
            if let Ok(Event::Key(k)) = event::read() {
                if k.kind != KeyEventKind::Press {
                    continue;
                }
                if handle_key(&mut state, k, &cmd_tx) == KeyAction::Quit {
                    break Ok(());
                }
                // Redraw right away so key feedback does not wait for the next tick.
                last_tick = Instant::now() - tick_rate;
            }
        }
    };

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen).ok();
    res
}

#[derive(Debug, PartialEq, Eq)]
enum KeyAction {
    Continue,
    Quit,
}

fn handle_key(state: &mut UiState, k: KeyEvent, cmd_tx: &UnboundedSender<UiCommand>) -> KeyAction {
    if matches!((k.modifiers, k.code), (KeyModifiers::CONTROL, KeyCode::Char('c'))) {
        let _ = cmd_tx.send(UiCommand::Quit);
        return KeyAction::Quit;
    }

    // An open alert blocks everything else until it is acknowledged.
    if !state.alerts.is_empty() {
        if matches!(k.code, KeyCode::Enter | KeyCode::Esc) {
            state.alerts.pop_front();
        }
        return KeyAction::Continue;
    }

    if state.show_help {
        match k.code {
            KeyCode::Char('q') => {
                let _ = cmd_tx.send(UiCommand::Quit);
                return KeyAction::Quit;
            }
            KeyCode::Char('?') | KeyCode::Esc | KeyCode::Enter => state.show_help = false,
            _ => {}
        }
        return KeyAction::Continue;
    }

    match k.code {
        KeyCode::Char('q') => {
            let _ = cmd_tx.send(UiCommand::Quit);
            return KeyAction::Quit;
        }
        KeyCode::Char('r') => {
            if state.view.trigger_enabled {
                let model = state.selected_model().to_string();
                state.info = format!("Starting run with {model}…");
                let _ = cmd_tx.send(UiCommand::StartRun { model });
            } else {
                state.info = "A run is already in progress".into();
            }
        }
        KeyCode::Char('m') => {
            state.cycle_model();
            state.info = format!("Model: {}", state.selected_model());
        }
        KeyCode::Tab => {
            let _ = cmd_tx.send(UiCommand::SelectTab(state.next_tab().to_string()));
        }
        KeyCode::Char(c @ '1'..='3') => {
            let idx = (c as usize) - ('1' as usize);
            let _ = cmd_tx.send(UiCommand::SelectTab(CATEGORIES[idx].to_string()));
        }
        KeyCode::Char('h') => {
            state.focus = match state.focus {
                Focus::Cards => Focus::History,
                Focus::History => Focus::Cards,
            };
        }
        KeyCode::Char('l') => {
            state.info = "Reloading history…".into();
            let _ = cmd_tx.send(UiCommand::RefreshHistory);
        }
        KeyCode::Char('e') => export::export_and_show_path(state),
        KeyCode::Char('?') => state.show_help = true,
        KeyCode::Up | KeyCode::Char('k') => match state.focus {
            Focus::Cards => state.card_selected = state.card_selected.saturating_sub(1),
            Focus::History => state.history_selected = state.history_selected.saturating_sub(1),
        },
        KeyCode::Down | KeyCode::Char('j') => match state.focus {
            Focus::Cards => {
                if state.card_selected + 1 < state.cards().len() {
                    state.card_selected += 1;
                }
            }
            Focus::History => {
                if state.history_selected + 1 < state.view.history.len() {
                    state.history_selected += 1;
                }
            }
        },
        KeyCode::Enter => {
            if state.focus == Focus::History {
                // The sentinel entry loads nothing.
                if let Some(run) = state.selected_history_run().cloned() {
                    state.info = format!("Loading run {run}…");
                    let _ = cmd_tx.send(UiCommand::LoadRun(run));
                }
            }
        }
        KeyCode::Char('f') => {
            if state.focus == Focus::Cards {
                if let Some(card) = state.selected_card() {
                    let key = card.key;
                    if state.view.refreshing.contains(&key) {
                        state.info = "Already refreshing".into();
                    } else {
                        let _ = cmd_tx.send(UiCommand::RefreshCard(key));
                    }
                }
            }
        }
        _ => {}
    }
    KeyAction::Continue
}

fn draw(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let progress_height = if state.view.progress.visible { 3 } else { 0 };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Length(progress_height),
                Constraint::Min(0),
                Constraint::Length(3),
            ]
            .as_ref(),
        )
        .split(area);

    let selected_tab = CATEGORIES
        .iter()
        .position(|c| *c == state.view.active_tab)
        .unwrap_or(0);
    let tabs = Tabs::new(CATEGORIES.iter().map(|c| Line::from(*c)).collect::<Vec<_>>())
        .select(selected_tab)
        .block(Block::default().borders(Borders::ALL).title("arbitrage-watch"))
        .highlight_style(Style::default().fg(Color::Yellow));
    f.render_widget(tabs, chunks[0]);

    draw_controls(chunks[1], f, state);

    if state.view.progress.visible {
        let gauge = Gauge::default()
            .block(Block::default().borders(Borders::ALL).title("Progress"))
            .gauge_style(Style::default().fg(Color::Green))
            .percent(u16::from(state.view.progress.percent.min(100)))
            .label(state.view.progress.label.clone());
        f.render_widget(gauge, chunks[2]);
    }

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(30), Constraint::Percentage(70)].as_ref())
        .split(chunks[3]);
    draw_history(body[0], f, state);
    draw_results(body[1], f, state);

    let status = Paragraph::new(Line::from(vec![
        Span::styled("Info: ", Style::default().fg(Color::Gray)),
        Span::raw(state.info.as_str()),
    ]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title("q quit | r run | m model | tab category | h focus | f refresh | e export | ? help"),
    );
    f.render_widget(status, chunks[4]);

    if state.show_help {
        help::draw_help(centered_rect(60, 24, area), f);
    }
    if let Some(msg) = state.alerts.front() {
        draw_alert(centered_rect(60, 7, area), f, msg);
    }
}

fn draw_controls(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let run_span = if state.view.trigger_enabled {
        Span::styled("[r] Run", Style::default().fg(Color::Green))
    } else {
        Span::styled("Running…", Style::default().fg(Color::DarkGray))
    };
    let phase = match state.view.phase {
        LifecyclePhase::Idle => "idle",
        LifecyclePhase::Running => "running",
        LifecyclePhase::Completing => "completing",
    };
    let loaded = state
        .view
        .loaded_run
        .as_ref()
        .map(|r| r.to_string())
        .unwrap_or_else(|| "-".into());
    let line = Line::from(vec![
        Span::styled("Model: ", Style::default().fg(Color::Gray)),
        Span::raw(state.selected_model().to_string()),
        Span::raw("   "),
        run_span,
        Span::raw("   "),
        Span::styled("Job: ", Style::default().fg(Color::Gray)),
        Span::raw(phase),
        Span::raw("   "),
        Span::styled("Run: ", Style::default().fg(Color::Gray)),
        Span::raw(loaded),
    ]);
    f.render_widget(
        Paragraph::new(line).block(Block::default().borders(Borders::ALL).title("Controls")),
        area,
    );
}

fn focus_block(title: &str, focused: bool) -> Block<'_> {
    let style = if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    Block::default()
        .borders(Borders::ALL)
        .border_style(style)
        .title(title)
}

fn draw_history(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let items: Vec<ListItem> = state
        .view
        .history
        .iter()
        .map(|opt| ListItem::new(opt.label().to_string()))
        .collect();
    let list = List::new(items)
        .block(focus_block("History", state.focus == Focus::History))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    let mut list_state = ListState::default().with_selected(Some(state.history_selected));
    f.render_stateful_widget(list, area, &mut list_state);
}

fn draw_results(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let block = focus_block("Opportunities", state.focus == Focus::Cards);
    if !state.view.results_visible {
        let hint = Paragraph::new("No run loaded. Press r to start a run, or pick one from History.")
            .wrap(Wrap { trim: true })
            .block(block);
        f.render_widget(hint, area);
        return;
    }

    match &state.view.rendered {
        RenderedResults::Empty(msg) => {
            f.render_widget(Paragraph::new(*msg).block(block), area);
        }
        RenderedResults::Cards(cards) => {
            let items: Vec<ListItem> = cards
                .iter()
                .map(|card| ListItem::new(card_text(card, state.view.refreshing.contains(&card.key))))
                .collect();
            let list = List::new(items)
                .block(block)
                .highlight_style(Style::default().add_modifier(Modifier::BOLD))
                .highlight_symbol("▌ ");
            let mut list_state = ListState::default().with_selected(Some(state.card_selected));
            f.render_stateful_widget(list, area, &mut list_state);
        }
    }
}

fn profit_color(profit: ProfitPotential) -> Color {
    match profit {
        ProfitPotential::High => Color::Green,
        ProfitPotential::Medium => Color::Yellow,
        ProfitPotential::Low => Color::Red,
        ProfitPotential::Unknown => Color::DarkGray,
    }
}

fn card_text(card: &OpportunityCard, refreshing: bool) -> Text<'static> {
    let source_color = if card.source == DEFAULT_SOURCE {
        Color::Magenta
    } else {
        Color::Cyan
    };
    let refresh = if refreshing {
        Span::styled("Refreshing...", Style::default().fg(Color::DarkGray))
    } else {
        Span::styled("[f] Refresh", Style::default().fg(Color::Gray))
    };
    Text::from(vec![
        Line::from(vec![
            Span::styled(
                card.category.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw("  "),
            Span::styled(card.source.clone(), Style::default().fg(source_color)),
            Span::raw("  "),
            Span::styled(card.profit_badge(), Style::default().fg(profit_color(card.profit))),
        ]),
        Line::from(Span::styled(
            card.title.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(card.description.clone()),
        Line::from(vec![
            Span::styled(
                confidence_bar(card.confidence_ratio, 20),
                Style::default().fg(Color::Blue),
            ),
            Span::raw(" "),
            Span::raw(card.confidence_label()),
        ]),
        Line::from(refresh),
        Line::from(""),
    ])
}

fn confidence_bar(ratio: f64, width: usize) -> String {
    let filled = ((ratio.clamp(0.0, 1.0) * width as f64).round() as usize).min(width);
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

fn draw_alert(area: Rect, f: &mut ratatui::Frame, msg: &str) {
    let p = Paragraph::new(vec![
        Line::from(msg.to_string()),
        Line::from(""),
        Line::from(Span::styled(
            "Press Enter to dismiss",
            Style::default().fg(Color::Gray),
        )),
    ])
    .wrap(Wrap { trim: true })
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Red))
            .title("Alert"),
    );
    f.render_widget(Clear, area);
    f.render_widget(p, area);
}

/// A rectangle `percent_x` wide and `height` tall, centered in `area`.
fn centered_rect(percent_x: u16, height: u16, area: Rect) -> Rect {
    let width = area.width.saturating_mul(percent_x.min(100)) / 100;
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
