use std::time::Duration;

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};
use tui_textarea::TextArea;

use crate::core::chat_session::ChatSnapshot;
use crate::core::constants::INDICATOR_SPACE;
use crate::core::message::{Message, Role};
use crate::core::notice::{Notice, NoticeLevel};
use crate::ui::picker::ModelPicker;
use crate::ui::title::{build_title, TitleInfo};

/// Offered on an empty conversation; Tab copies the next one into the input.
pub const SUGGESTED_PROMPTS: &[&str] = &[
    "Write a myth about a monkey king",
    "Explain quantum entanglement simply",
    "Help me plan a royal feast",
    "Roast my resume (upload file)",
];

const MAX_INPUT_ROWS: u16 = 6;

/// Everything one frame needs.
pub struct ChatView<'a> {
    pub snapshot: &'a ChatSnapshot,
    pub title: TitleInfo<'a>,
    pub textarea: &'a TextArea<'static>,
    pub picker: Option<&'a ModelPicker>,
    pub status: Option<&'a Notice>,
    pub scroll_offset: u16,
    pub pulse_elapsed: Duration,
}

pub fn build_display_lines(messages: &[Message]) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    for msg in messages {
        let text = msg.text();
        match msg.role {
            Role::User => {
                let mut rows = text.lines();
                let first = rows.next().unwrap_or("").to_string();
                lines.push(Line::from(vec![
                    Span::styled(
                        "You: ",
                        Style::default()
                            .fg(Color::Cyan)
                            .add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(first, Style::default().fg(Color::Cyan)),
                ]));
                for row in rows {
                    lines.push(Line::from(Span::styled(
                        format!("     {row}"),
                        Style::default().fg(Color::Cyan),
                    )));
                }
            }
            Role::Assistant if text.is_empty() => {
                lines.push(Line::from(Span::styled(
                    "…",
                    Style::default().fg(Color::DarkGray),
                )));
            }
            Role::Assistant => {
                for row in text.lines() {
                    lines.push(Line::from(Span::styled(
                        row.to_string(),
                        Style::default().fg(Color::White),
                    )));
                }
            }
            Role::System | Role::Tool => {
                lines.push(Line::from(Span::styled(
                    text,
                    Style::default().fg(Color::DarkGray),
                )));
            }
        }
        lines.push(Line::from(""));
    }

    lines
}

fn suggestion_lines(ready: bool) -> Vec<Line<'static>> {
    let mut lines = vec![
        Line::from(Span::styled(
            "How can I help you today?",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];
    if !ready {
        lines.push(Line::from(Span::styled(
            "Connecting to the platform…",
            Style::default().fg(Color::DarkGray),
        )));
        return lines;
    }
    lines.push(Line::from(Span::styled(
        "Press Tab to use a suggestion:",
        Style::default().fg(Color::DarkGray),
    )));
    for prompt in SUGGESTED_PROMPTS {
        lines.push(Line::from(format!("  • {prompt}")));
    }
    lines
}

/// Rows `lines` take once wrapped to `width` columns, using the same word
/// wrapping the message list is drawn with.
pub fn wrapped_line_count(lines: &[Line<'_>], width: u16) -> u16 {
    let rows = Paragraph::new(lines.to_vec())
        .wrap(Wrap { trim: false })
        .line_count(width.max(1));
    u16::try_from(rows).unwrap_or(u16::MAX)
}

pub fn max_scroll_offset(lines: &[Line<'_>], area: Rect) -> u16 {
    wrapped_line_count(lines, area.width).saturating_sub(area.height)
}

/// Pulsing typing indicator, two cycles per second.
pub fn indicator_symbol(elapsed: Duration) -> &'static str {
    let elapsed = elapsed.as_millis() as f32 / 1000.0;
    let pulse_phase = (elapsed * 2.0) % 2.0;
    let pulse_intensity = if pulse_phase < 1.0 {
        pulse_phase
    } else {
        2.0 - pulse_phase
    };

    if pulse_intensity < 0.33 {
        "○"
    } else if pulse_intensity < 0.66 {
        "◐"
    } else {
        "●"
    }
}

pub fn input_area_height(textarea: &TextArea<'static>) -> u16 {
    let rows = u16::try_from(textarea.lines().len()).unwrap_or(MAX_INPUT_ROWS);
    rows.clamp(1, MAX_INPUT_ROWS) + 2
}

/// Split the frame into header, messages, status line and input box.
pub fn layout(area: Rect, textarea: &TextArea<'static>) -> [Rect; 4] {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
            Constraint::Length(input_area_height(textarea)),
        ])
        .split(area);
    [chunks[0], chunks[1], chunks[2], chunks[3]]
}

pub fn ui(f: &mut Frame, view: &ChatView<'_>) {
    let [header, body, status, input] = layout(f.area(), view.textarea);

    let title = build_title(&view.title, usize::from(header.width));
    f.render_widget(
        Paragraph::new(title).style(Style::default().add_modifier(Modifier::BOLD)),
        header,
    );

    if view.snapshot.messages.is_empty() {
        f.render_widget(
            Paragraph::new(suggestion_lines(view.snapshot.is_ready)).wrap(Wrap { trim: false }),
            body,
        );
    } else {
        let lines = build_display_lines(&view.snapshot.messages);
        let scroll_offset = view.scroll_offset.min(max_scroll_offset(&lines, body));
        f.render_widget(
            Paragraph::new(lines)
                .wrap(Wrap { trim: false })
                .scroll((scroll_offset, 0)),
            body,
        );
    }

    render_status(f, status, view.status);
    render_input(f, input, view);

    if let Some(picker) = view.picker {
        render_picker(f, picker);
    }
}

fn render_status(f: &mut Frame, area: Rect, notice: Option<&Notice>) {
    let Some(notice) = notice else {
        return;
    };
    let color = match notice.level {
        NoticeLevel::Success => Color::Green,
        NoticeLevel::Info => Color::Blue,
        NoticeLevel::Error => Color::Red,
    };
    f.render_widget(
        Paragraph::new(notice.text.clone()).style(Style::default().fg(color)),
        area,
    );
}

fn render_input(f: &mut Frame, area: Rect, view: &ChatView<'_>) {
    let input_title = if view.snapshot.is_loading {
        "Generating… (Ctrl+L to clear and stop, Ctrl+C to quit)"
    } else {
        "Type your message (Enter to send, Ctrl+P models, Ctrl+S sign in/out, Ctrl+C to quit)"
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(input_title)
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let parts = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(0), Constraint::Length(INDICATOR_SPACE)])
        .split(inner);
    f.render_widget(view.textarea, parts[0]);

    if view.snapshot.is_loading {
        let symbol = indicator_symbol(view.pulse_elapsed);
        f.render_widget(
            Paragraph::new(format!("  {symbol}")).style(Style::default().fg(Color::Yellow)),
            parts[1],
        );
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

fn render_picker(f: &mut Frame, picker: &ModelPicker) {
    let area = centered_rect(70, 70, f.area());
    f.render_widget(Clear, area);

    let title = if picker.query.is_empty() {
        "Pick a model (type to search, Enter to select, Esc to cancel)".to_string()
    } else {
        format!("Pick a model • search: {}", picker.query)
    };

    let mut items: Vec<ListItem> = picker
        .visible_items()
        .map(|model| {
            let mut spans = vec![
                Span::raw(model.name.clone()),
                Span::styled(
                    format!("  {}", model.provider),
                    Style::default().fg(Color::DarkGray),
                ),
            ];
            if let Some(cost) = model.cost_summary() {
                spans.push(Span::styled(
                    format!("  {cost}"),
                    Style::default().fg(Color::DarkGray),
                ));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();

    let mut state = ListState::default();
    if items.is_empty() {
        let hint = match picker.selected_id() {
            Some(custom) => format!("No match. Enter uses \"{custom}\" as a custom model id."),
            None => "No models available.".to_string(),
        };
        items.push(ListItem::new(Span::styled(
            hint,
            Style::default().fg(Color::DarkGray),
        )));
    } else {
        state.select(Some(picker.selected));
    }

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("▶ ");
    f.render_stateful_widget(list, area, &mut state);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::ModelDescriptor;
    use ratatui::{backend::TestBackend, Terminal};

    fn buffer_text(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        let area = buffer.area;
        let mut out = String::new();
        for y in 0..area.height {
            for x in 0..area.width {
                out.push_str(buffer[(x, y)].symbol());
            }
            out.push('\n');
        }
        out
    }

    fn snapshot(messages: Vec<Message>, is_loading: bool) -> ChatSnapshot {
        ChatSnapshot {
            messages,
            is_loading,
            is_ready: true,
            selected_model: "openai/gpt-4o".into(),
        }
    }

    fn draw(snapshot: &ChatSnapshot, picker: Option<&ModelPicker>) -> String {
        let model = ModelDescriptor::discovered(&snapshot.selected_model);
        let textarea = TextArea::default();
        let mut terminal = Terminal::new(TestBackend::new(100, 24)).unwrap();
        terminal
            .draw(|f| {
                ui(
                    f,
                    &ChatView {
                        snapshot,
                        title: TitleInfo {
                            model: &model,
                            username: Some("wukong"),
                            chat_ready: true,
                            auth_ready: true,
                        },
                        textarea: &textarea,
                        picker,
                        status: None,
                        scroll_offset: 0,
                        pulse_elapsed: Duration::ZERO,
                    },
                )
            })
            .unwrap();
        buffer_text(&terminal)
    }

    #[test]
    fn empty_log_shows_suggested_prompts() {
        let screen = draw(&snapshot(Vec::new(), false), None);
        for prompt in SUGGESTED_PROMPTS {
            assert!(screen.contains(prompt), "missing suggestion {prompt}");
        }
        assert!(screen.contains("Signed in as wukong"));
    }

    #[test]
    fn conversation_replaces_suggestions_and_shows_indicator() {
        let messages = vec![Message::user("Hi"), Message::assistant("Hello there")];
        let screen = draw(&snapshot(messages, true), None);
        assert!(screen.contains("You: Hi"));
        assert!(screen.contains("Hello there"));
        assert!(!screen.contains(SUGGESTED_PROMPTS[0]));
        assert!(screen.contains("○"));
        assert!(screen.contains("Generating"));
    }

    #[test]
    fn picker_overlay_lists_models() {
        let models = vec![
            ModelDescriptor::discovered("openai/gpt-4o"),
            ModelDescriptor::discovered("x-ai/grok-3"),
        ];
        let picker = ModelPicker::new(models, "x-ai/grok-3");
        let screen = draw(&snapshot(Vec::new(), false), Some(&picker));
        assert!(screen.contains("Pick a model"));
        assert!(screen.contains("▶ Grok 3"));
        assert!(screen.contains("Gpt 4o"));
    }

    #[test]
    fn empty_placeholder_renders_as_ellipsis() {
        let lines = build_display_lines(&[Message::user("Hi"), Message::assistant("")]);
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[2].to_string(), "…");
    }

    #[test]
    fn wrapped_count_accounts_for_long_lines() {
        let lines = vec![Line::from("x".repeat(25)), Line::from("")];
        assert_eq!(wrapped_line_count(&lines, 10), 4);
        let area = Rect::new(0, 0, 10, 2);
        assert_eq!(max_scroll_offset(&lines, area), 2);
    }

    #[test]
    fn wrapped_count_follows_word_wrapping() {
        // 15 columns of text, but each word lands on its own row at width 5.
        let lines = vec![Line::from("aaa bbb ccc ddd")];
        assert_eq!(wrapped_line_count(&lines, 5), 4);

        let area = Rect::new(0, 0, 5, 2);
        assert_eq!(max_scroll_offset(&lines, area), 2);
    }

    #[test]
    fn indicator_cycles_through_symbols() {
        assert_eq!(indicator_symbol(Duration::ZERO), "○");
        assert_eq!(indicator_symbol(Duration::from_millis(250)), "◐");
        assert_eq!(indicator_symbol(Duration::from_millis(450)), "●");
    }
}
