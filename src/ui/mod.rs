use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Frame;

pub mod layout;

use crate::app::{App, Focus, ListenerStatus, StatusLevel};
use crate::domain::Field;

pub fn draw(f: &mut Frame, app: &App) {
    let areas = layout::areas(f.size());

    draw_header(f, areas.header, app);
    draw_form(f, areas.form, app);
    draw_greeting(f, areas.greeting, app);
    draw_listener(f, areas.listener, app);
    draw_submission(f, areas.submission, app);
    draw_status_line(f, areas.status_line, app);
    draw_hint_line(f, areas.hint_line, app);

    if app.help_open {
        draw_help_popup(f, areas.size);
    }
}

fn draw_header(f: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
        .split(area);

    let title = Line::from(vec![
        Span::styled(
            "greetform",
            Style::default()
                .fg(Color::LightCyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled("RPC ", Style::default().fg(Color::DarkGray)),
        Span::raw(app.rpc_endpoint.clone()),
    ]);
    let left = Paragraph::new(title).block(Block::default().borders(Borders::ALL));
    f.render_widget(left, chunks[0]);

    let (label, color) = listener_badge(&app.listener);
    let right = Paragraph::new(Line::from(Span::styled(label, Style::default().fg(color))))
        .alignment(Alignment::Right)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(right, chunks[1]);
}

fn listener_badge(status: &ListenerStatus) -> (String, Color) {
    let color = match status {
        ListenerStatus::Listening { .. } => Color::Green,
        ListenerStatus::Connecting => Color::Yellow,
        ListenerStatus::Reconnecting { .. } => Color::LightRed,
        ListenerStatus::Stopped => Color::DarkGray,
    };
    (format!("● {}", status.label()), color)
}

fn draw_form(f: &mut Frame, area: Rect, app: &App) {
    let block = Block::default().borders(Borders::ALL).title("Sign up");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let areas = layout::form_areas(inner);
    for (idx, field) in Field::ALL.iter().copied().enumerate() {
        draw_field(f, areas.inputs[idx], areas.errors[idx], app, field);
    }
    draw_submit_button(f, areas.submit, app);
}

fn draw_field(f: &mut Frame, input: Rect, error_area: Rect, app: &App, field: Field) {
    let focused = app.focus == Focus::Field(field);
    let error = app.form.visible_error(field);

    let border_color = if error.is_some() {
        Color::LightRed
    } else if focused {
        Color::Yellow
    } else {
        Color::DarkGray
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(field.label())
        .border_style(Style::default().fg(border_color));
    let inner = block.inner(input);

    // keep the cursor end visible for long values
    let width = inner.width.saturating_sub(1) as usize;
    let visible = tail_chars(app.form.value(field), width);
    let visible_len = visible.chars().count() as u16;
    f.render_widget(Paragraph::new(visible).block(block), input);

    if focused && inner.width > 0 && inner.height > 0 {
        f.set_cursor(inner.x + visible_len.min(inner.width - 1), inner.y);
    }

    if let Some(error) = error {
        let line = Line::from(Span::styled(
            format!(" {error}"),
            Style::default().fg(Color::LightRed),
        ));
        f.render_widget(Paragraph::new(line), error_area);
    }
}

fn draw_submit_button(f: &mut Frame, area: Rect, app: &App) {
    let focused = app.focus == Focus::Submit;
    let mut style = if app.form.is_valid() {
        Style::default().fg(Color::White).bg(Color::Magenta)
    } else {
        Style::default().fg(Color::Gray).bg(Color::DarkGray)
    };
    if focused {
        style = style.add_modifier(Modifier::BOLD | Modifier::REVERSED);
    }
    let button = Paragraph::new(Line::from(Span::styled("Submit", style)))
        .alignment(Alignment::Center)
        .style(style);
    f.render_widget(button, area);
}

fn draw_greeting(f: &mut Frame, area: Rect, app: &App) {
    let value = if app.latest_greeting.is_empty() {
        Span::styled("waiting for events…", Style::default().fg(Color::DarkGray))
    } else {
        Span::styled(
            app.latest_greeting.clone(),
            Style::default()
                .fg(Color::LightCyan)
                .add_modifier(Modifier::BOLD),
        )
    };
    let received = app
        .last_greeting_at
        .map(|at| format!("received {}", at.format("%H:%M:%S")))
        .unwrap_or_default();
    let lines = vec![
        Line::from(Span::styled(
            "Latest Greet : ",
            Style::default().fg(Color::DarkGray),
        )),
        Line::from(value),
        Line::from(Span::styled(received, Style::default().fg(Color::DarkGray))),
    ];
    let paragraph = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title("Events"));
    f.render_widget(paragraph, area);
}

fn draw_listener(f: &mut Frame, area: Rect, app: &App) {
    let head = app
        .head_block
        .map(|n| n.to_string())
        .unwrap_or_else(|| "--".to_string());
    let lines = vec![
        kv_line("Address", app.filter.address().to_checksum(None)),
        kv_line("Event", app.filter.signature().to_string()),
        kv_line("Topic", short_hash(&topic_hex(app))),
        kv_line("Status", app.listener.label()),
        kv_line("Head", head),
        kv_line("Events", app.greeting_count.to_string()),
    ];
    let paragraph = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title("Listener"));
    f.render_widget(paragraph, area);
}

fn draw_submission(f: &mut Frame, area: Rect, app: &App) {
    let lines: Vec<Line> = match app.last_submission.as_ref() {
        Some(submission) => submission
            .json
            .lines()
            .map(|line| Line::from(line.to_string()))
            .collect(),
        None => vec![Line::from(Span::styled(
            "nothing submitted yet",
            Style::default().fg(Color::DarkGray),
        ))],
    };
    let paragraph = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Last submission"));
    f.render_widget(paragraph, area);
}

fn draw_status_line(f: &mut Frame, area: Rect, app: &App) {
    let Some((text, level)) = app.status_text() else {
        return;
    };
    let color = match level {
        StatusLevel::Info => Color::Green,
        StatusLevel::Warn => Color::Yellow,
        StatusLevel::Error => Color::LightRed,
    };
    let paragraph = Paragraph::new(Line::from(Span::styled(
        text.to_string(),
        Style::default().fg(color),
    )));
    f.render_widget(paragraph, area);
}

fn draw_hint_line(f: &mut Frame, area: Rect, app: &App) {
    let submit_hint = if app.form.is_valid() {
        "ready to submit"
    } else {
        "submit disabled"
    };
    let line = Line::from(vec![
        Span::styled("Tab/↓ ", Style::default().fg(Color::Yellow)),
        Span::raw("next  "),
        Span::styled("Shift-Tab/↑ ", Style::default().fg(Color::Yellow)),
        Span::raw("prev  "),
        Span::styled("Enter ", Style::default().fg(Color::Yellow)),
        Span::raw("next/submit  "),
        Span::styled("Ctrl-S ", Style::default().fg(Color::Yellow)),
        Span::raw("submit  "),
        Span::styled("F1 ", Style::default().fg(Color::Yellow)),
        Span::raw("help  "),
        Span::styled("Esc ", Style::default().fg(Color::Yellow)),
        Span::raw("quit  "),
        Span::styled(submit_hint, Style::default().fg(Color::DarkGray)),
    ]);
    f.render_widget(Paragraph::new(line), area);
}

fn draw_help_popup(f: &mut Frame, area: Rect) {
    let popup = centered_rect(60, 60, area);
    let lines = vec![
        Line::from(Span::styled(
            "Keys",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from("Tab / ↓         next field (marks the field touched)"),
        Line::from("Shift-Tab / ↑   previous field"),
        Line::from("Enter           next field, or submit on the button"),
        Line::from("Ctrl-S          submit from anywhere"),
        Line::from("Backspace       delete last character"),
        Line::from("Esc / Ctrl-C    quit"),
        Line::from(""),
        Line::from(Span::styled(
            "Errors show once a field has been left or a submit was attempted.",
            Style::default().fg(Color::DarkGray),
        )),
    ];
    let paragraph = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title("Help (F1 to close)"));
    f.render_widget(Clear, popup);
    f.render_widget(paragraph, popup);
}

fn kv_line(key: &str, value: String) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{key:<8}"), Style::default().fg(Color::DarkGray)),
        Span::raw(value),
    ])
}

fn topic_hex(app: &App) -> String {
    format!("0x{}", hex::encode(app.filter.topic()))
}

fn short_hash(hash: &str) -> String {
    if hash.len() <= 18 {
        return hash.to_string();
    }
    format!("{}…{}", &hash[..10], &hash[hash.len() - 6..])
}

fn tail_chars(value: &str, max: usize) -> String {
    let count = value.chars().count();
    if count <= max {
        value.to_string()
    } else {
        value.chars().skip(count - max).collect()
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
