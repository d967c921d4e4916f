use ratatui::{
    layout::Rect,
    style::Color,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

fn key_line(key: &'static str, pad: usize, what: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::raw("  "),
        Span::styled(key, Style::default().fg(Color::Magenta)),
        Span::raw(" ".repeat(pad)),
        Span::raw(what),
    ])
}

pub fn draw_help(area: Rect, f: &mut Frame) {
    let p = Paragraph::new(vec![
        Line::from("Keybinds:"),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("q", Style::default().fg(Color::Magenta)),
            Span::raw(" / "),
            Span::styled("Ctrl-C", Style::default().fg(Color::Magenta)),
            Span::raw("  Quit"),
        ]),
        key_line("r", 11, "Start a run with the selected model"),
        key_line("m", 11, "Cycle model"),
        key_line("tab", 9, "Next category"),
        key_line("1/2/3", 7, "Real / Value / Logic"),
        key_line("h", 11, "Toggle focus between results and history"),
        key_line("l", 11, "Reload history"),
        key_line("e", 11, "Export loaded run as JSON"),
        key_line("?", 11, "Toggle this help"),
        Line::from(""),
        Line::from("Results:"),
        key_line("↑/↓ j/k", 5, "Select card"),
        key_line("f", 11, "Refresh selected card"),
        Line::from(""),
        Line::from("History:"),
        key_line("↑/↓ j/k", 5, "Select run"),
        key_line("enter", 7, "Load selected run"),
        Line::from(""),
        Line::from("Alerts:"),
        key_line("enter/esc", 3, "Dismiss"),
    ])
    .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(Clear, area);
    f.render_widget(p, area);
}
