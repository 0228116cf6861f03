use ratatui::{
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, ServerStatus};
use crate::conversation::{Message, Role};

const TITLE: &str = " MJC AI Chat ";
const RESET_LABEL: &str = "[ 초기화 ^L ]";
const SEND_LABEL: &str = "[ 전송 ]";
const PLACEHOLDER: &str = "메시지를 입력하세요... (Enter: 전송, Shift+Enter: 줄바꿈)";
const TIME_FORMAT: &str = "%H:%M:%S";
const INPUT_ROWS: u16 = 3;

/// Turn `**bold**` runs into bold spans; an unpaired marker stays literal.
fn styled_markdown_line(text: &str) -> Line<'static> {
    let parts: Vec<&str> = text.split("**").collect();
    let paired = parts.len() % 2 == 1;
    let last = parts.len() - 1;

    let mut spans: Vec<Span<'static>> = Vec::new();
    for (i, part) in parts.iter().enumerate() {
        if !paired && i == last {
            spans.push(Span::raw(format!("**{}", part)));
        } else if part.is_empty() {
            continue;
        } else if i % 2 == 1 {
            spans.push(Span::styled(
                part.to_string(),
                Style::default().add_modifier(Modifier::BOLD),
            ));
        } else {
            spans.push(Span::raw(part.to_string()));
        }
    }

    Line::from(spans)
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    let [header_area, chat_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(3),
        Constraint::Length(INPUT_ROWS + 2),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_messages(app, frame, chat_area);
    render_input(app, frame, input_area);
    render_footer(frame, footer_area);
}

fn render_header(app: &mut App, frame: &mut Frame, area: Rect) {
    let (status_text, status_color) = match app.server_status {
        ServerStatus::Checking => ("○ connecting", Color::DarkGray),
        ServerStatus::Online => ("● online", Color::Green),
        ServerStatus::Offline => ("● offline", Color::Red),
    };

    let title = Line::from(vec![
        Span::styled(TITLE, Style::default().fg(Color::Cyan).bold()),
        Span::styled(status_text, Style::default().fg(status_color)),
        Span::styled(
            format!(" {}", app.api_base_url()),
            Style::default().fg(Color::Gray),
        ),
    ]);
    frame.render_widget(
        Paragraph::new(title).style(Style::default().bg(Color::DarkGray)),
        area,
    );

    let reset = Span::styled(
        RESET_LABEL,
        Style::default().bg(Color::Red).fg(Color::White).bold(),
    );
    let reset_width = (reset.width() as u16).min(area.width);
    let reset_area = Rect::new(
        area.right().saturating_sub(reset_width),
        area.y,
        reset_width,
        area.height.min(1),
    );
    frame.render_widget(Paragraph::new(Line::from(reset)), reset_area);
    app.reset_area = Some(reset_area);
}

fn message_lines(message: &Message) -> Vec<Line<'static>> {
    let time = message.timestamp.format(TIME_FORMAT).to_string();
    let time_style = Style::default().fg(Color::DarkGray);
    let mut lines = Vec::new();

    match message.role {
        Role::User => {
            lines.push(
                Line::from(Span::styled(
                    "You",
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                ))
                .alignment(Alignment::Right),
            );
            for line in message.content.lines() {
                lines.push(
                    Line::from(Span::styled(line.to_string(), Style::default().fg(Color::Cyan)))
                        .alignment(Alignment::Right),
                );
            }
            lines.push(Line::from(Span::styled(time, time_style)).alignment(Alignment::Right));
        }
        Role::Ai => {
            lines.push(Line::from(Span::styled(
                "AI",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )));
            for line in message.content.lines() {
                lines.push(styled_markdown_line(line));
            }
            lines.push(Line::from(Span::styled(time, time_style)));
        }
    }

    lines.push(Line::default());
    lines
}

/// Three dots with the current animation frame highlighted
fn typing_indicator(frame_idx: u8) -> Vec<Line<'static>> {
    let dots: Vec<Span<'static>> = (0..3u8)
        .flat_map(|i| {
            let style = if i == frame_idx {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            [Span::styled("•", style), Span::raw(" ")]
        })
        .collect();

    vec![
        Line::from(Span::styled(
            "AI",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )),
        Line::from(dots),
    ]
}

fn render_messages(app: &mut App, frame: &mut Frame, area: Rect) {
    app.chat_area = Some(area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));
    let inner = block.inner(area);

    let mut lines: Vec<Line> = app
        .conversation
        .messages()
        .iter()
        .flat_map(message_lines)
        .collect();
    if app.conversation.is_busy() {
        lines.extend(typing_indicator(app.animation_frame));
    }

    // Measure with the same wrapping the paragraph is drawn with
    let text = Text::from(lines);
    let total = Paragraph::new(text.clone())
        .wrap(Wrap { trim: false })
        .line_count(inner.width);
    app.max_chat_scroll = clamp_u16(total.saturating_sub(inner.height as usize));
    app.chat_scroll = if app.follow_tail {
        app.max_chat_scroll
    } else {
        app.chat_scroll.min(app.max_chat_scroll)
    };

    let chat = Paragraph::new(text)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let busy = app.conversation.is_busy();

    let (title, border_color) = if busy {
        (" 응답을 기다리는 중... ", Color::DarkGray)
    } else {
        (" 메시지 ", Color::Yellow)
    };

    let send_style = if app.conversation.can_submit() {
        Style::default().bg(Color::Blue).fg(Color::White).bold()
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title)
        .title_bottom(Line::from(Span::styled(SEND_LABEL, send_style)).alignment(Alignment::Right));
    let inner = block.inner(area);

    let draft = app.conversation.draft();
    let (text, text_style) = if draft.is_empty() {
        (Text::from(PLACEHOLDER), Style::default().fg(Color::DarkGray))
    } else if busy {
        (Text::from(draft), Style::default().fg(Color::DarkGray))
    } else {
        (Text::from(draft), Style::default().fg(Color::Cyan))
    };

    // Keep the cursor inside the box; a pasted line may be wider than u16
    let (row, prefix) = app.cursor_row_prefix();
    let col = Span::raw(prefix).width();
    let scroll_y = row.saturating_sub(inner.height.saturating_sub(1) as usize);
    let scroll_x = col.saturating_sub(inner.width.saturating_sub(1) as usize);

    let input = Paragraph::new(text)
        .style(text_style)
        .block(block)
        .scroll((clamp_u16(scroll_y), clamp_u16(scroll_x)));
    frame.render_widget(input, area);

    if !busy && inner.width > 0 && inner.height > 0 {
        let x = inner.x.saturating_add(clamp_u16(col - scroll_x));
        let y = inner.y.saturating_add(clamp_u16(row - scroll_y));
        frame.set_cursor_position((x, y));
    }
}

fn clamp_u16(value: usize) -> u16 {
    u16::try_from(value).unwrap_or(u16::MAX)
}

fn render_footer(frame: &mut Frame, area: Rect) {
    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().fg(Color::Gray);

    let hints = [
        ("Enter", "send"),
        ("Shift/Alt+Enter", "newline"),
        ("PgUp/PgDn", "scroll"),
        ("^L", "reset"),
        ("Esc", "quit"),
    ];

    let spans: Vec<Span> = hints
        .iter()
        .flat_map(|(key, label)| {
            [
                Span::styled(format!(" {} ", key), key_style),
                Span::styled(format!(" {} ", label), label_style),
            ]
        })
        .collect();

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
