use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
};
use crate::app::{App, DownloadStatus, InputMode, Widget, WidgetKind};
use rhesus_core::directive::RenderNode;
use rhesus_core::provider::Provider;
use rhesus_core::state::Author;
use rhesus_core::structure::{LoadState, ViewReport};

/// Parse simple markdown (bold with **) into styled spans
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut chars = text.char_indices().peekable();
    let mut current_text = String::new();

    while let Some((_, c)) = chars.next() {
        if c == '*' && chars.peek().map(|(_, c)| *c) == Some('*') {
            chars.next();

            if !current_text.is_empty() {
                spans.push(Span::raw(std::mem::take(&mut current_text)));
            }

            // Find closing **
            let mut bold_text = String::new();
            let mut found_close = false;

            while let Some((_, c)) = chars.next() {
                if c == '*' && chars.peek().map(|(_, c)| *c) == Some('*') {
                    chars.next();
                    found_close = true;
                    break;
                }
                bold_text.push(c);
            }

            if found_close && !bold_text.is_empty() {
                spans.push(Span::styled(
                    bold_text,
                    Style::default().add_modifier(Modifier::BOLD),
                ));
            } else {
                // No closing **, treat as literal
                current_text.push_str("**");
                current_text.push_str(&bold_text);
            }
        } else {
            current_text.push(c);
        }
    }

    if !current_text.is_empty() {
        spans.push(Span::raw(current_text));
    }

    if spans.is_empty() {
        Line::default()
    } else {
        Line::from(spans)
    }
}

fn author_style(author: Author) -> Style {
    let color = match author {
        Author::User => Color::Cyan,
        Author::Assistant => Color::Yellow,
        Author::System => Color::Magenta,
    };
    Style::default().fg(color).add_modifier(Modifier::BOLD)
}

/// Short status of a widget for its reference line in the chat
fn widget_status(widget: &Widget) -> (String, Color) {
    fn load<T>(state: &LoadState<T>) -> (String, Color) {
        match state {
            LoadState::Loading => ("loading".to_string(), Color::DarkGray),
            LoadState::Ready(_) => ("ready".to_string(), Color::Green),
            LoadState::Failed(_) => ("failed".to_string(), Color::Red),
        }
    }

    match &widget.kind {
        WidgetKind::Structure { viewer, .. } => load(viewer.state()),
        WidgetKind::Sequence(view) => load(view.state()),
        WidgetKind::Download { status, .. } => match status {
            DownloadStatus::Idle => ("Enter to download".to_string(), Color::Blue),
            DownloadStatus::InProgress => ("downloading".to_string(), Color::DarkGray),
            DownloadStatus::Saved(_) => ("saved".to_string(), Color::Green),
        },
        WidgetKind::Preformatted { .. } => ("text".to_string(), Color::DarkGray),
    }
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_chat_screen(app, frame, body_area);
    render_footer(app, frame, footer_area);

    if app.show_provider_picker {
        render_provider_picker(app, frame, area);
    } else if app.show_model_picker {
        render_model_picker(app, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let widget_indicator = if app.widgets.is_empty() {
        String::new()
    } else {
        format!(" [{} widgets]", app.widgets.len())
    };

    let title = Line::from(vec![
        Span::styled(" Dr. Rhesus ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(widget_indicator, Style::default().fg(Color::DarkGray)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let (mode_text, mode_style) = match app.input_mode {
        InputMode::Normal => (" NORMAL ", Style::default().bg(Color::Blue).fg(Color::White)),
        InputMode::Editing => (" INSERT ", Style::default().bg(Color::Yellow).fg(Color::Black)),
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let hints: Vec<(&str, &str)> = if app.show_provider_picker || app.show_model_picker {
        vec![("j/k", "move"), ("Enter", "select"), ("Esc", "cancel")]
    } else {
        match app.input_mode {
            InputMode::Editing => vec![
                ("Enter", "send"),
                ("Esc", "normal"),
                ("Tab", "widgets"),
                ("/help", "commands"),
            ],
            InputMode::Normal => vec![
                ("i", "type"),
                ("Tab", "next widget"),
                ("m", "mode"),
                ("r", "reload"),
                ("Enter", "download"),
                ("J/K", "detail"),
                ("P", "provider"),
                ("M", "model"),
                ("q", "quit"),
            ],
        }
    };

    let mut spans = vec![Span::styled(mode_text, mode_style), Span::raw(" ")];
    for (key, label) in hints {
        spans.push(Span::styled(format!(" {} ", key), key_style));
        spans.push(Span::styled(format!(" {} ", label), label_style));
        spans.push(Span::raw(" "));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_chat_screen(app: &mut App, frame: &mut Frame, area: Rect) {
    // Chat on the left, selected widget on the right
    let [chat_column, detail_area] = Layout::horizontal([
        Constraint::Percentage(50),
        Constraint::Percentage(50),
    ])
    .areas(area);

    let [chat_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .areas(chat_column);

    // Store chat area dimensions for scroll calculations (inner size minus borders)
    app.query_chat_height = chat_area.height.saturating_sub(2);
    app.query_chat_width = chat_area.width.saturating_sub(2);

    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(format!(
            " {}: {} ",
            app.current_provider.display_name(),
            app.selected_model
        ));

    let mut lines: Vec<Line> = Vec::new();
    // Widgets are created in message order, so one cursor walks them all
    let mut next_widget = 0;

    for msg in app.chat.conversation().messages() {
        lines.push(Line::from(Span::styled(
            format!("{}:", msg.author.display_name()),
            author_style(msg.author),
        )));

        for node in msg.content.nodes() {
            match node {
                RenderNode::Text(text) => {
                    for line in text.lines() {
                        lines.push(parse_markdown_line(line));
                    }
                }
                _ => {
                    let index = next_widget;
                    let Some(widget) = app
                        .widgets
                        .get(index)
                        .filter(|w| w.message_id == msg.id)
                    else {
                        continue;
                    };
                    next_widget += 1;

                    let (status, status_color) = widget_status(widget);
                    let selected = app.selected_widget == Some(index);
                    let title_style = if selected {
                        Style::default()
                            .bg(Color::Blue)
                            .fg(Color::White)
                            .add_modifier(Modifier::BOLD)
                    } else {
                        Style::default().fg(Color::Blue)
                    };
                    lines.push(Line::from(vec![
                        Span::styled(format!("[{}] {}", index + 1, widget.title()), title_style),
                        Span::raw(" - "),
                        Span::styled(status, Style::default().fg(status_color)),
                    ]));
                }
            }
        }
        lines.push(Line::default());
    }

    if app.is_loading() {
        lines.push(Line::from(Span::styled(
            format!("{}:", Author::Assistant.display_name()),
            author_style(Author::Assistant),
        )));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("Thinking{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    let chat = Paragraph::new(Text::from(lines))
        .block(chat_block)
        .wrap(Wrap { trim: true })
        .scroll((app.query_scroll, 0));

    frame.render_widget(chat, chat_area);

    render_input(app, frame, input_area);
    render_widget_detail(app, frame, detail_area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let editing = app.input_mode == InputMode::Editing;
    let border_color = if app.is_loading() {
        Color::DarkGray
    } else if editing {
        Color::Yellow
    } else {
        Color::DarkGray
    };
    let title = if app.is_loading() {
        " Waiting for Dr. Rhesus... "
    } else {
        " Ask about a protein (or /help) "
    };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    // Horizontal scrolling keeps the cursor visible
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = app.query_cursor;
    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let visible_text: String = app
        .query_input
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let text_style = if app.is_loading() {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default().fg(Color::Cyan)
    };
    let input = Paragraph::new(visible_text)
        .style(text_style)
        .block(input_block);

    frame.render_widget(input, area);

    if editing {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn section(title: &str) -> Line<'static> {
    Line::from(Span::styled(
        title.to_string(),
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
    ))
}

fn failed(message: &str) -> Vec<Line<'static>> {
    vec![
        Line::from(Span::styled(message.to_string(), Style::default().fg(Color::Red))),
        Line::default(),
        Line::from(Span::styled(
            "Press r to retry.",
            Style::default().fg(Color::DarkGray),
        )),
    ]
}

fn loading() -> Vec<Line<'static>> {
    vec![Line::from(Span::styled(
        "Loading structure...",
        Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
    ))]
}

fn report_lines(report: &ViewReport) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    if let Some(caption) = &report.caption {
        lines.push(Line::default());
        lines.push(Line::from(Span::styled(
            caption.clone(),
            Style::default().fg(Color::Cyan),
        )));
    }

    if let Some(interaction) = &report.interaction {
        lines.push(Line::default());
        lines.push(section(&format!(
            "Chain {} interface ({})",
            interaction.chain_a,
            interaction.residues_a.len()
        )));
        let names: Vec<String> = interaction.residues_a.iter().map(|r| r.to_string()).collect();
        lines.push(Line::from(names.join(", ")));

        lines.push(section(&format!(
            "Chain {} interface ({})",
            interaction.chain_b,
            interaction.residues_b.len()
        )));
        let names: Vec<String> = interaction.residues_b.iter().map(|r| r.to_string()).collect();
        lines.push(Line::from(names.join(", ")));

        lines.push(Line::default());
        lines.push(section(&format!("Contacts ({})", interaction.findings.len())));
        for finding in &interaction.findings {
            lines.push(Line::from(format!("  {}", finding)));
        }
    }

    if let Some(target) = &report.target {
        lines.push(Line::default());
        lines.push(section(&format!("Neighbors of {}", target)));
        if report.neighbors.is_empty() {
            lines.push(Line::from(Span::styled(
                "No residues within range.",
                Style::default().fg(Color::DarkGray),
            )));
        }
        for finding in &report.neighbors {
            lines.push(Line::from(format!(
                "  {}: {:.2} Å, {}",
                finding.residue_b, finding.distance, finding.classification
            )));
        }
    }

    lines
}

fn render_widget_detail(app: &App, frame: &mut Frame, area: Rect) {
    let Some(widget) = app.selected() else {
        let placeholder = Paragraph::new(
            "No widget selected.\nAsk about a protein, or try /view 1TUP.",
        )
        .style(Style::default().fg(Color::DarkGray))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray))
                .title(" Viewer "),
        );
        frame.render_widget(placeholder, area);
        return;
    };

    let position = app.selected_widget.map(|i| i + 1).unwrap_or(0);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta))
        .title(format!(" [{}/{}] {} ", position, app.widgets.len(), widget.title()));

    let lines: Vec<Line> = match &widget.kind {
        WidgetKind::Structure { viewer, scene } => match viewer.state() {
            LoadState::Loading => loading(),
            LoadState::Failed(message) => failed(message),
            LoadState::Ready(report) => {
                let mut lines = vec![section(&format!(
                    "{} ({})",
                    viewer.request().structure_id,
                    viewer.request().mode.label()
                ))];
                lines.extend(scene.describe().into_iter().map(Line::from));
                lines.extend(report_lines(report));
                lines
            }
        },
        WidgetKind::Sequence(view) => match view.state() {
            LoadState::Loading => loading(),
            LoadState::Failed(message) => failed(message),
            LoadState::Ready(fasta) => {
                let mut lines = vec![section(&format!("{} residues", fasta.len()))];
                lines.extend(
                    fasta
                        .to_fasta()
                        .lines()
                        .map(|l| Line::from(Span::styled(l.to_string(), Style::default().fg(Color::Green)))),
                );
                lines
            }
        },
        WidgetKind::Download {
            filename,
            structure_id,
            status,
        } => {
            let mut lines = vec![
                section(filename),
                Line::from(format!("Structure {}", structure_id)),
                Line::default(),
            ];
            lines.push(match status {
                DownloadStatus::Idle => Line::from(Span::styled(
                    "Press Enter to download.",
                    Style::default().fg(Color::Blue),
                )),
                DownloadStatus::InProgress => Line::from(Span::styled(
                    "Downloading...",
                    Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
                )),
                DownloadStatus::Saved(path) => Line::from(Span::styled(
                    format!("Saved to {}", path.display()),
                    Style::default().fg(Color::Green),
                )),
            });
            lines
        }
        WidgetKind::Preformatted { text, .. } => text
            .lines()
            .map(|l| Line::from(l.to_string()))
            .collect(),
    };

    let detail = Paragraph::new(Text::from(lines))
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.widget_scroll, 0));

    frame.render_widget(detail, area);
}

fn render_model_picker(app: &mut App, frame: &mut Frame, area: Rect) {
    use ratatui::widgets::Clear;

    // Calculate popup size and position (centered)
    let popup_width = 40.min(area.width.saturating_sub(4));
    let rows = app.available_models.len().max(1) as u16;
    let popup_height = (rows + 2).min(area.height.saturating_sub(4));

    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;

    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Select Model (Enter to select, Esc to cancel) ");

    if app.available_models.is_empty() {
        let placeholder = Paragraph::new(" Loading models...")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(placeholder, popup_area);
        return;
    }

    let items: Vec<ListItem> = app
        .available_models
        .iter()
        .map(|model| {
            let style = if model == &app.selected_model {
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(format!(" {} ", model)).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, popup_area, &mut app.model_picker_state);
}

fn render_provider_picker(app: &mut App, frame: &mut Frame, area: Rect) {
    use ratatui::widgets::Clear;

    let providers = Provider::all();

    // Calculate popup size and position (centered)
    let popup_width = 45.min(area.width.saturating_sub(4));
    let popup_height = (providers.len() as u16 + 2).min(area.height.saturating_sub(4));

    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;

    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Select Provider ");

    let items: Vec<ListItem> = providers
        .iter()
        .map(|provider| {
            let has_key = app.has_key(*provider);
            let is_current = *provider == app.current_provider;

            let status = match (provider, has_key) {
                (Provider::Ollama, _) => "(local)",
                (_, true) => "(configured)",
                (_, false) => "(needs key)",
            };
            let prefix = if is_current { "* " } else { "  " };

            let style = if is_current {
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
            } else if has_key {
                Style::default()
            } else {
                Style::default().fg(Color::DarkGray)
            };

            ListItem::new(format!("{}{} {}", prefix, provider.display_name(), status)).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, popup_area, &mut app.provider_picker_state);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bold_markdown_becomes_styled_span() {
        let line = parse_markdown_line("The **R248** contact");
        assert_eq!(line.spans.len(), 3);
        assert_eq!(line.spans[1].content, "R248");
        assert!(line.spans[1].style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn unclosed_bold_is_literal() {
        let line = parse_markdown_line("a **b");
        let text: String = line.spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(text, "a **b");
    }
}
