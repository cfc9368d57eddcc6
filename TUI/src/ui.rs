use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Gauge, Paragraph, Wrap},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use crate::app::{App, BackendStatus};
use crate::chat::Role;
use crate::controller::ActionController;
use crate::files::Origin;
use crate::store::MAX_CREATIVITY;
use crate::templates::TEMPLATES;
use crate::ui_state::{ConfigField, Focus, NoticeLevel, Screen};

// Copper Sapphire Morning color palette
const BG_DARK: Color = Color::Rgb(12, 12, 16);           // Deep background
const BG_PANEL: Color = Color::Rgb(18, 18, 24);          // Slightly lighter for panels

// Sapphire blues
const SAPPHIRE: Color = Color::Rgb(101, 150, 243);       // #6596F3 - Primary accent
const SAPPHIRE_DARK: Color = Color::Rgb(84, 112, 156);   // #54709C - Darker blue
const CYAN_LIGHT: Color = Color::Rgb(178, 220, 226);     // #B2DCE2 - Light cyan

// Copper/warm tones
const COPPER: Color = Color::Rgb(138, 72, 38);           // #8A4826 - Copper
const WARM_BROWN: Color = Color::Rgb(164, 103, 38);      // #A46726 - Warm brown
const PALE_YELLOW: Color = Color::Rgb(234, 208, 148);    // #EAD094 - Pale yellow

// Accent colors
const BURGUNDY: Color = Color::Rgb(204, 92, 68);         // #CC5C44 - Warnings/errors
const OLIVE: Color = Color::Rgb(131, 179, 102);          // #83B366 - Success/green
const LAVENDER: Color = Color::Rgb(211, 164, 234);       // #D3A4EA - Purple accent

// Text colors
const TEXT_PRIMARY: Color = Color::Rgb(240, 240, 245);   // Near white
const TEXT_SECONDARY: Color = Color::Rgb(180, 180, 190); // Light gray
const TEXT_MUTED: Color = Color::Rgb(105, 116, 133);     // #697485 - Medium gray

// Border colors (subtle)
const BORDER_DIM: Color = Color::Rgb(45, 50, 60);        // Dim border
const BORDER_ACCENT: Color = Color::Rgb(70, 85, 110);    // Accent border

const SPINNER: [&str; 4] = ["◐", "◓", "◑", "◒"];

pub fn draw(frame: &mut Frame, app: &App) {
    // Fill entire background
    let bg = Block::default().style(Style::default().bg(BG_DARK));
    frame.render_widget(bg, frame.area());

    match app.ui.screen {
        Screen::Home => draw_home(frame, app),
        Screen::Workspace => draw_workspace(frame, app),
    }
}

fn spinner(app: &App) -> &'static str {
    SPINNER[(app.animation_frame / 8) % SPINNER.len()]
}

/// Button-style label: spinner while pending, dimmed when disabled.
fn button<'a, T>(app: &App, label: &'a str, ctl: &ActionController<T>, enabled: bool) -> Span<'a> {
    if ctl.is_pending() {
        Span::styled(
            format!("{} {}", spinner(app), label),
            Style::default().fg(PALE_YELLOW).add_modifier(Modifier::ITALIC),
        )
    } else if enabled {
        Span::styled(format!("[ {} ]", label), Style::default().fg(SAPPHIRE).add_modifier(Modifier::BOLD))
    } else {
        Span::styled(format!("[ {} ]", label), Style::default().fg(BORDER_ACCENT))
    }
}

fn panel_block(app: &App, title: &str, focus: Focus) -> Block<'static> {
    let focused = app.ui.focus == focus;
    let border_color = if focused { SAPPHIRE } else { BORDER_DIM };
    let title_color = if focused { TEXT_PRIMARY } else { TEXT_SECONDARY };
    Block::default()
        .title(Span::styled(
            format!(" {} ", title),
            Style::default().fg(title_color).add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(border_color))
}

fn draw_home(frame: &mut Frame, app: &App) {
    let area = frame.area();

    draw_background_pattern(frame, area, app.animation_frame);

    let v_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(25),
            Constraint::Length(10),  // Logo container
            Constraint::Length(3),   // Subtitle
            Constraint::Length(3),   // Hint
            Constraint::Min(0),
        ])
        .split(area);

    let logo_width = 60;
    let h_padding = (area.width.saturating_sub(logo_width)) / 2;
    let logo_area = Rect {
        x: area.x + h_padding,
        y: v_chunks[1].y,
        width: logo_width.min(area.width),
        height: v_chunks[1].height,
    };

    draw_glass_border(frame, logo_area, app.animation_frame);

    let inner = Rect {
        x: logo_area.x + 2,
        y: logo_area.y + 1,
        width: logo_area.width.saturating_sub(4),
        height: logo_area.height.saturating_sub(2),
    };
    draw_animated_logo(frame, inner, app.animation_frame);

    // Subtitle with typing animation
    let subtitle_text = "Chat with your documents, search the web, ship content";
    let visible_chars = ((app.animation_frame as f64 / 120.0 * subtitle_text.len() as f64) as usize)
        .min(subtitle_text.len());
    let subtitle = if app.animation_frame < 120 {
        format!("{}|", &subtitle_text[..visible_chars])
    } else {
        subtitle_text.to_string()
    };
    let subtitle_widget = Paragraph::new(subtitle)
        .alignment(Alignment::Center)
        .style(Style::default().fg(TEXT_SECONDARY));
    frame.render_widget(subtitle_widget, v_chunks[2]);

    // Copper glow
    let glow = (app.animation_frame as f64 / 45.0).sin().abs() * 0.5 + 0.5;
    let r = (138.0 + (216.0 - 138.0) * glow) as u8;
    let g = (72.0 + (180.0 - 72.0) * glow) as u8;
    let b = (38.0 + (169.0 - 38.0) * glow) as u8;
    let hint = Paragraph::new("[ Press any key to start ]")
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::Rgb(r, g, b)));
    frame.render_widget(hint, v_chunks[3]);

    let backend = match app.base_url() {
        Some(url) => format!("backend {}", url),
        None => "offline mode".to_string(),
    };
    let version_area = Rect {
        x: area.x,
        y: area.height.saturating_sub(2),
        width: area.width,
        height: 1,
    };
    let version = Paragraph::new(format!("v{}  ·  {}", env!("CARGO_PKG_VERSION"), backend))
        .alignment(Alignment::Center)
        .style(Style::default().fg(TEXT_MUTED));
    frame.render_widget(version, version_area);
}

fn draw_background_pattern(frame: &mut Frame, area: Rect, anim_frame: usize) {
    let pattern_offset = (anim_frame / 30) % 4;

    let mut lines: Vec<Line> = Vec::new();
    for y in 0..area.height as usize {
        let mut spans: Vec<Span> = Vec::new();
        for x in 0..area.width as usize {
            let show_star = ((x + pattern_offset) % 14 == 0) && ((y + pattern_offset) % 5 == 0);
            if show_star {
                let brightness = 25 + ((anim_frame as f64 / 60.0 + (x as f64 / 14.0)).sin().abs() * 15.0) as u8;
                spans.push(Span::styled(
                    "·",
                    Style::default().fg(Color::Rgb(brightness, brightness + 2, brightness + 5)),
                ));
            } else {
                spans.push(Span::raw(" "));
            }
        }
        lines.push(Line::from(spans));
    }

    let pattern = Paragraph::new(lines).style(Style::default().bg(BG_DARK));
    frame.render_widget(pattern, area);
}

fn draw_glass_border(frame: &mut Frame, area: Rect, anim_frame: usize) {
    // Cycles between sapphire and copper
    let t = (anim_frame as f64 / 120.0).sin() * 0.5 + 0.5;
    let r = (84.0 + (138.0 - 84.0) * t) as u8;
    let g = (112.0 + (72.0 - 112.0) * t) as u8;
    let b = (156.0 + (38.0 - 156.0) * t) as u8;

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(Color::Rgb(r, g, b)));
    frame.render_widget(block, area);
}

fn draw_animated_logo(frame: &mut Frame, area: Rect, anim_frame: usize) {
    let logo_lines = [
        "",
        "█▀█ ▄▀█ █▀▀ █▀▄ █▀▀ █▀ █▄▀",
        "█▀▄ █▀█ █▄█ █▄▀ ██▄ ▄█ █ █",
        "",
        "[ Retrieval-Augmented Writing Desk ]",
    ];

    let mut lines: Vec<Line> = Vec::new();
    for (line_idx, logo_line) in logo_lines.iter().enumerate() {
        let spans: Vec<Span> = logo_line
            .chars()
            .enumerate()
            .map(|(char_idx, ch)| {
                let wave_offset =
                    (anim_frame as f64 / 25.0) + (char_idx as f64 / 5.0) - (line_idx as f64 / 2.0);
                let t = wave_offset.sin() * 0.5 + 0.5;
                // Sapphire to cyan along the wave
                let color = Color::Rgb(
                    (101.0 + (178.0 - 101.0) * t) as u8,
                    (150.0 + (220.0 - 150.0) * t) as u8,
                    (243.0 + (226.0 - 243.0) * t) as u8,
                );
                Span::styled(ch.to_string(), Style::default().fg(color))
            })
            .collect();
        lines.push(Line::from(spans));
    }

    let logo = Paragraph::new(lines).alignment(Alignment::Center);
    frame.render_widget(logo, area);
}

fn draw_workspace(frame: &mut Frame, app: &App) {
    let area = frame.area();

    let padded = Rect {
        x: area.x + 1,
        y: area.y + 1,
        width: area.width.saturating_sub(2),
        height: area.height.saturating_sub(2),
    };

    let main_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(app.config.sidebar_width),  // Config + templates
            Constraint::Length(app.config.files_width),    // Files
            Constraint::Min(40),                            // Chat
            Constraint::Length(app.config.search_width),   // Search
        ])
        .split(padded);

    draw_sidebar(frame, app, main_chunks[0]);
    draw_files(frame, app, main_chunks[1]);
    draw_chat_area(frame, app, main_chunks[2]);
    draw_search(frame, app, main_chunks[3]);

    if app.showing_command_popup() && app.ui.focus == Focus::Chat {
        draw_command_popup(frame, app, main_chunks[2]);
    }

    if app.attestation.is_visible() {
        draw_attestation_modal(frame, app, area);
    }

    draw_notices(frame, app, area);
}

fn draw_sidebar(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),   // Backend status
            Constraint::Length(10),  // Generation config
            Constraint::Min(6),      // Templates
            Constraint::Length(5),   // Backup
            Constraint::Length(5),   // Keyboard hints
        ])
        .split(area);

    draw_backend_status(frame, app, chunks[0]);
    draw_config(frame, app, chunks[1]);
    draw_templates(frame, app, chunks[2]);
    draw_backup(frame, app, chunks[3]);
    draw_keyboard_hints(frame, chunks[4]);
}

fn draw_backend_status(frame: &mut Frame, app: &App, area: Rect) {
    let (dot, label, color) = match app.backend_status() {
        BackendStatus::Offline => ("○", "offline", TEXT_MUTED),
        BackendStatus::Unknown if app.health.is_pending() => (spinner(app), "connecting", PALE_YELLOW),
        BackendStatus::Unknown => ("○", "not checked", TEXT_MUTED),
        BackendStatus::Healthy => ("●", "connected", OLIVE),
        BackendStatus::Unreachable => ("●", "unreachable", BURGUNDY),
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(BORDER_DIM));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let line = Line::from(vec![
        Span::styled(format!("{} ", dot), Style::default().fg(color)),
        Span::styled(label, Style::default().fg(TEXT_SECONDARY)),
    ]);
    frame.render_widget(Paragraph::new(line).alignment(Alignment::Center), inner);
}

fn draw_config(frame: &mut Frame, app: &App, area: Rect) {
    let mut block = panel_block(app, "Generation", Focus::Config);
    if app.ui.config_flash > 0 {
        block = block.border_style(Style::default().fg(LAVENDER));
    }
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let config = app.store.snapshot();
    let focused = app.ui.focus == Focus::Config;

    let row = |field: ConfigField, name: &'static str, value: String| -> Line<'static> {
        let selected = focused && app.ui.config_field == field;
        let marker = if selected { "▸ " } else { "  " };
        let value_style = if selected {
            Style::default().fg(CYAN_LIGHT).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(TEXT_PRIMARY)
        };
        Line::from(vec![
            Span::styled(marker, Style::default().fg(COPPER)),
            Span::styled(format!("{:<11}", name), Style::default().fg(TEXT_MUTED)),
            Span::styled(value, value_style),
        ])
    };

    let lines = vec![
        row(ConfigField::ContentType, "Type", format!("‹ {} ›", config.content_type.label())),
        row(ConfigField::Tone, "Tone", format!("‹ {} ›", config.tone.label())),
        row(ConfigField::Creativity, "Creativity", format!("{}%", config.creativity_level)),
        Line::from(""),
        row(
            ConfigField::Seo,
            "SEO",
            if config.seo_optimization { "[x] on".to_string() } else { "[ ] off".to_string() },
        ),
    ];

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Length(1), Constraint::Min(1)])
        .split(inner);

    frame.render_widget(Paragraph::new(lines[..3].to_vec()), chunks[0]);

    let ratio = f64::from(config.creativity_level) / f64::from(MAX_CREATIVITY);
    let gauge = Gauge::default()
        .gauge_style(Style::default().fg(SAPPHIRE_DARK).bg(BG_PANEL))
        .ratio(ratio.clamp(0.0, 1.0))
        .label("");
    let gauge_area = Rect {
        x: chunks[1].x + 2,
        width: chunks[1].width.saturating_sub(4),
        ..chunks[1]
    };
    frame.render_widget(gauge, gauge_area);

    frame.render_widget(Paragraph::new(lines[3..].to_vec()), chunks[2]);
}

fn draw_templates(frame: &mut Frame, app: &App, area: Rect) {
    let block = panel_block(app, "Templates", Focus::Templates);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let active = app.store.snapshot().content_type;
    let focused = app.ui.focus == Focus::Templates;

    let mut lines: Vec<Line> = Vec::new();
    for (i, template) in TEMPLATES.iter().enumerate() {
        let selected = focused && app.templates.selected == i;
        let marker = if template.content_type == active { "◆ " } else { "  " };
        let title_style = if selected {
            Style::default().fg(CYAN_LIGHT).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(TEXT_PRIMARY)
        };
        lines.push(Line::from(vec![
            Span::styled(marker, Style::default().fg(COPPER)),
            Span::styled(template.title, title_style),
        ]));
        if inner.height as usize >= TEMPLATES.len() * 2 {
            lines.push(Line::from(Span::styled(
                format!("  {}", template.description),
                Style::default().fg(TEXT_MUTED),
            )));
        }
    }
    frame.render_widget(Paragraph::new(lines), inner);
}

fn draw_backup(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(Span::styled(" Backup ", Style::default().fg(TEXT_SECONDARY).add_modifier(Modifier::BOLD)))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(BORDER_DIM));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let enabled = app.base_url().is_some();
    let last = match app.backup.latest() {
        Some(record) => Span::styled(
            format!(
                "#{} {} @ {}",
                app.backup.backups().len(),
                record.upload_id,
                record.created_at.format("%H:%M:%S")
            ),
            Style::default().fg(OLIVE),
        ),
        None => Span::styled("no backups yet", Style::default().fg(TEXT_MUTED)),
    };
    let lines = vec![
        Line::from(vec![
            button(app, "Backup DB", &app.backup.action, enabled),
            Span::styled(" F3", Style::default().fg(TEXT_MUTED)),
        ]),
        Line::from(last),
    ];
    frame.render_widget(Paragraph::new(lines), inner);
}

fn draw_keyboard_hints(frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(BORDER_DIM));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let hints = Paragraph::new(vec![
        Line::from(vec![
            Span::styled("TAB", Style::default().fg(SAPPHIRE).add_modifier(Modifier::BOLD)),
            Span::styled(" focus  ", Style::default().fg(TEXT_MUTED)),
            Span::styled("/", Style::default().fg(COPPER).add_modifier(Modifier::BOLD)),
            Span::styled(" cmds", Style::default().fg(TEXT_MUTED)),
        ]),
        Line::from(vec![
            Span::styled("F2", Style::default().fg(LAVENDER).add_modifier(Modifier::BOLD)),
            Span::styled(" attest  ", Style::default().fg(TEXT_MUTED)),
            Span::styled("^C", Style::default().fg(BURGUNDY).add_modifier(Modifier::BOLD)),
            Span::styled(" quit", Style::default().fg(TEXT_MUTED)),
        ]),
    ])
    .alignment(Alignment::Center);
    frame.render_widget(hints, inner);
}

fn draw_files(frame: &mut Frame, app: &App, area: Rect) {
    let block = panel_block(app, "Documents", Focus::Files);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),      // File list
            Constraint::Length(3),   // Path / CID input
            Constraint::Length(2),   // Buttons
        ])
        .split(inner);

    let mut lines: Vec<Line> = Vec::new();
    if app.files.records().is_empty() {
        lines.push(Line::from(Span::styled(
            "No documents yet",
            Style::default().fg(TEXT_MUTED).add_modifier(Modifier::ITALIC),
        )));
    }
    for record in app.files.records() {
        let (icon, color) = match record.origin {
            Origin::Uploaded => ("↑", OLIVE),
            Origin::Retrieved => ("↓", SAPPHIRE),
        };
        lines.push(Line::from(vec![
            Span::styled(format!("{} ", icon), Style::default().fg(color)),
            Span::styled(record.name.clone(), Style::default().fg(TEXT_PRIMARY)),
        ]));
        if let Some(id) = &record.server_id {
            lines.push(Line::from(Span::styled(
                format!("  {}", id),
                Style::default().fg(TEXT_MUTED),
            )));
        }
    }
    // Keep the newest entries visible
    let overflow = lines.len().saturating_sub(chunks[0].height as usize);
    frame.render_widget(Paragraph::new(lines).scroll((overflow as u16, 0)), chunks[0]);

    draw_text_input(
        frame,
        app,
        chunks[1],
        &app.files.input,
        "path(s) or CID",
        app.ui.focus == Focus::Files,
        app.files.is_busy(),
    );

    let enabled = app.base_url().is_some() && !app.files.input.trim().is_empty();
    let buttons = Line::from(vec![
        button(app, "^U Upload", &app.files.upload, enabled),
        Span::raw(" "),
        button(app, "⏎ Retrieve", &app.files.retrieve, enabled),
    ]);
    frame.render_widget(Paragraph::new(buttons), chunks[2]);
}

fn draw_text_input(
    frame: &mut Frame,
    app: &App,
    area: Rect,
    value: &str,
    placeholder: &str,
    focused: bool,
    disabled: bool,
) {
    let border_color = if disabled {
        BORDER_DIM
    } else if focused {
        // Pulsing border when focused
        let glow = (app.animation_frame as f64 / 90.0).sin() * 0.3 + 0.7;
        Color::Rgb((101.0 * glow) as u8, (150.0 * glow) as u8, (243.0 * glow) as u8)
    } else {
        BORDER_DIM
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(border_color));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let line = if value.is_empty() && !focused {
        Line::from(Span::styled(placeholder.to_string(), Style::default().fg(TEXT_MUTED)))
    } else {
        let cursor = if focused && !disabled && app.animation_frame % 30 < 15 { "|" } else { " " };
        // Show the tail when the value is wider than the box
        let width = inner.width.saturating_sub(2) as usize;
        let shown = tail_fitting(value, width);
        Line::from(vec![
            Span::styled(shown.to_string(), Style::default().fg(TEXT_PRIMARY)),
            Span::styled(cursor, Style::default().fg(SAPPHIRE)),
        ])
    };
    frame.render_widget(Paragraph::new(line), inner);
}

/// Longest suffix of `text` whose display width fits in `width` columns.
fn tail_fitting(text: &str, width: usize) -> &str {
    let mut start = text.len();
    let mut used = 0;
    for (idx, ch) in text.char_indices().rev() {
        let w = unicode_width::UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + w > width {
            break;
        }
        used += w;
        start = idx;
    }
    &text[start..]
}

fn draw_chat_area(frame: &mut Frame, app: &App, area: Rect) {
    // Input grows with content (min 3, max 8)
    let input_width = area.width.saturating_sub(6) as usize;
    let input_lines = if input_width > 0 {
        (app.chat.input.width() / input_width) + 1
    } else {
        1
    };
    let input_height = (input_lines as u16 + 2).clamp(3, 8);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(5),               // Messages
            Constraint::Length(input_height), // Input (dynamic)
        ])
        .split(area);

    draw_messages(frame, app, chunks[0]);
    draw_chat_input(frame, app, chunks[1]);
}

/// Greedy word wrap measured in display columns.
fn wrap_text(text: &str, max_width: usize) -> Vec<String> {
    if max_width == 0 {
        return vec![text.to_string()];
    }
    let mut result = Vec::new();
    let mut current_line = String::new();

    for word in text.split_whitespace() {
        if current_line.is_empty() {
            current_line = word.to_string();
        } else if current_line.width() + 1 + word.width() <= max_width {
            current_line.push(' ');
            current_line.push_str(word);
        } else {
            result.push(std::mem::take(&mut current_line));
            current_line = word.to_string();
        }
    }
    if !current_line.is_empty() {
        result.push(current_line);
    }
    if result.is_empty() {
        result.push(String::new());
    }
    result
}

fn draw_messages(frame: &mut Frame, app: &App, area: Rect) {
    let block = panel_block(app, "Chat", Focus::Chat);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let padded = Rect {
        x: inner.x + 1,
        y: inner.y,
        width: inner.width.saturating_sub(2),
        height: inner.height,
    };

    // Fixed-width label for alignment
    const LABEL_WIDTH: usize = 12;
    let indent: String = " ".repeat(LABEL_WIDTH);
    let content_width = (padded.width as usize).saturating_sub(LABEL_WIDTH);

    let mut lines: Vec<Line> = Vec::new();
    for msg in app.chat.messages() {
        let pending = app.chat.is_placeholder(msg.id);
        let (label, label_style, content_style) = match msg.role {
            Role::User => (
                "you",
                Style::default().fg(SAPPHIRE).add_modifier(Modifier::BOLD),
                Style::default().fg(TEXT_PRIMARY),
            ),
            Role::Assistant if pending => (
                "assistant",
                Style::default().fg(COPPER).add_modifier(Modifier::BOLD),
                Style::default().fg(COPPER).add_modifier(Modifier::ITALIC),
            ),
            Role::Assistant => (
                "assistant",
                Style::default().fg(COPPER).add_modifier(Modifier::BOLD),
                Style::default().fg(TEXT_PRIMARY),
            ),
            Role::System => (
                "system",
                Style::default().fg(WARM_BROWN).add_modifier(Modifier::BOLD),
                Style::default().fg(TEXT_MUTED),
            ),
        };

        let formatted_label = format!("{:>width$} │ ", label, width = LABEL_WIDTH - 3);
        let content = if pending {
            format!("{} {}", spinner(app), msg.content)
        } else {
            msg.content.clone()
        };

        let mut is_first_line = true;
        for content_line in content.lines() {
            for wrapped_line in wrap_text(content_line, content_width) {
                let lead = if is_first_line {
                    Span::styled(formatted_label.clone(), label_style)
                } else {
                    Span::raw(indent.clone())
                };
                lines.push(Line::from(vec![lead, Span::styled(wrapped_line, content_style)]));
                is_first_line = false;
            }
        }
        if is_first_line {
            lines.push(Line::from(Span::styled(formatted_label, label_style)));
        }

        let stamp = msg.timestamp.with_timezone(&chrono::Local).format("%H:%M");
        lines.push(Line::from(vec![
            Span::raw(indent.clone()),
            Span::styled(stamp.to_string(), Style::default().fg(BORDER_ACCENT)),
        ]));
        lines.push(Line::from(""));
    }

    let total_lines = lines.len();
    let visible_height = padded.height as usize;

    // Scroll from bottom, clamp scroll_offset to valid range
    let max_scroll = total_lines.saturating_sub(visible_height);
    app.chat.set_scroll_limit(max_scroll);
    let clamped_offset = app.chat.scroll_offset.min(max_scroll);
    let scroll_pos = max_scroll.saturating_sub(clamped_offset);

    let messages = Paragraph::new(lines).scroll((scroll_pos as u16, 0));
    frame.render_widget(messages, padded);

    if total_lines > visible_height && area.width > 2 && area.height > 2 {
        if scroll_pos > 0 {
            let up_area = Rect {
                x: area.x + area.width - 2,
                y: area.y + 1,
                width: 1,
                height: 1,
            };
            frame.render_widget(Paragraph::new("▲").style(Style::default().fg(SAPPHIRE)), up_area);
        }
        if clamped_offset > 0 {
            let down_area = Rect {
                x: area.x + area.width - 2,
                y: area.y + area.height - 2,
                width: 1,
                height: 1,
            };
            frame.render_widget(Paragraph::new("▼").style(Style::default().fg(SAPPHIRE)), down_area);
        }
    }
}

fn draw_chat_input(frame: &mut Frame, app: &App, area: Rect) {
    let focused = app.ui.focus == Focus::Chat;
    let pending = app.chat.send.is_pending();

    let border_color = if pending {
        BORDER_DIM
    } else if focused {
        let glow = (app.animation_frame as f64 / 90.0).sin() * 0.3 + 0.7;
        Color::Rgb((101.0 * glow) as u8, (150.0 * glow) as u8, (243.0 * glow) as u8)
    } else {
        BORDER_DIM
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(border_color));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let input = if pending {
        Paragraph::new(format!(" {} waiting for the assistant...", spinner(app)))
            .style(Style::default().fg(TEXT_MUTED).add_modifier(Modifier::ITALIC))
    } else {
        let cursor = if focused && app.animation_frame % 30 < 15 { "|" } else { " " };
        Paragraph::new(format!(" > {}{}", app.chat.input, cursor))
            .style(Style::default().fg(TEXT_PRIMARY))
            .wrap(Wrap { trim: false })
    };
    frame.render_widget(input, inner);
}

fn draw_search(frame: &mut Frame, app: &App, area: Rect) {
    let block = panel_block(app, "Web Search", Focus::Search);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),   // Query
            Constraint::Min(3),      // Result draft
            Constraint::Length(2),   // Buttons
        ])
        .split(inner);

    draw_text_input(
        frame,
        app,
        chunks[0],
        &app.search.query,
        "search the web",
        app.ui.focus == Focus::Search,
        app.search.search.is_pending(),
    );

    let result_block = Block::default()
        .title(Span::styled(" Draft ", Style::default().fg(TEXT_MUTED)))
        .borders(Borders::TOP)
        .border_style(Style::default().fg(BORDER_DIM));
    let result_inner = result_block.inner(chunks[1]);
    frame.render_widget(result_block, chunks[1]);

    let draft = if app.search.search.is_pending() {
        Paragraph::new(format!("{} searching...", spinner(app)))
            .style(Style::default().fg(PALE_YELLOW).add_modifier(Modifier::ITALIC))
    } else if app.search.search_result().is_empty() {
        Paragraph::new("Results appear here")
            .style(Style::default().fg(TEXT_MUTED).add_modifier(Modifier::ITALIC))
    } else {
        let lines: Vec<Line> = app
            .search
            .search_result()
            .lines()
            .flat_map(|line| wrap_text(line, result_inner.width as usize))
            .map(|line| Line::from(Span::styled(line, Style::default().fg(TEXT_SECONDARY))))
            .collect();
        let max_scroll = lines.len().saturating_sub(result_inner.height as usize);
        app.search.set_draft_scroll_limit(max_scroll);
        let offset = app.search.draft_scroll.min(max_scroll);
        Paragraph::new(lines).scroll((offset as u16, 0))
    };
    frame.render_widget(draft, result_inner);

    let online = app.base_url().is_some();
    let buttons = Line::from(vec![
        button(
            app,
            "⏎ Search",
            &app.search.search,
            online && !app.search.query.trim().is_empty(),
        ),
        Span::raw(" "),
        button(app, "F4 Send to chat", &app.search.forward, online && app.search.can_send_to_chat()),
    ]);
    frame.render_widget(Paragraph::new(buttons), chunks[2]);
}

fn draw_command_popup(frame: &mut Frame, app: &App, chat_area: Rect) {
    let filtered = app.get_filtered_commands();
    if filtered.is_empty() {
        return;
    }

    // +1 for the "your input" option, +2 for borders
    let popup_height = (filtered.len() + 3) as u16;
    let popup_width = 44.min(chat_area.width.saturating_sub(4));
    let popup_area = Rect {
        x: chat_area.x + 2,
        y: chat_area.y + chat_area.height.saturating_sub(popup_height + 4),
        width: popup_width,
        height: popup_height.min(chat_area.height),
    };

    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .title(Span::styled(" Commands ", Style::default().fg(COPPER).add_modifier(Modifier::BOLD)))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(COPPER))
        .style(Style::default().bg(BG_PANEL));
    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let mut lines: Vec<Line> = Vec::new();

    // Current input is selected when command_selection is None
    let input_selected = app.ui.command_selection.is_none();
    let input_style = if input_selected {
        Style::default().fg(CYAN_LIGHT).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(TEXT_SECONDARY)
    };
    let indicator = if input_selected { ">" } else { " " };
    lines.push(Line::from(vec![
        Span::styled(format!("{} {} ", indicator, &app.chat.input), input_style),
        Span::styled("(your input)", Style::default().fg(TEXT_MUTED).add_modifier(Modifier::ITALIC)),
    ]));

    for (i, (cmd, desc)) in filtered.iter().enumerate() {
        let is_selected = app.ui.command_selection == Some(i);
        let style = if is_selected {
            Style::default().fg(CYAN_LIGHT).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(TEXT_SECONDARY)
        };
        let indicator = if is_selected { ">" } else { " " };
        lines.push(Line::from(vec![
            Span::styled(format!("{} {} ", indicator, cmd), style),
            Span::styled(format!("- {}", desc), Style::default().fg(TEXT_MUTED)),
        ]));
    }

    frame.render_widget(Paragraph::new(lines), inner);
}

fn draw_attestation_modal(frame: &mut Frame, app: &App, area: Rect) {
    let width = (area.width * 7 / 10).max(40).min(area.width);
    let height = (area.height * 7 / 10).max(10).min(area.height);
    let modal = Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    };

    frame.render_widget(Clear, modal);

    let block = Block::default()
        .title(Span::styled(
            " Attestation ",
            Style::default().fg(LAVENDER).add_modifier(Modifier::BOLD),
        ))
        .title_bottom(Line::from(Span::styled(
            " ↑/↓ scroll · Esc close ",
            Style::default().fg(TEXT_MUTED),
        )))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(LAVENDER))
        .style(Style::default().bg(BG_PANEL));
    let inner = block.inner(modal);
    frame.render_widget(block, modal);

    let fetch = &app.attestation.fetch;
    let body = if fetch.is_pending() {
        Paragraph::new(format!("{} Requesting attestation from the backend...", spinner(app)))
            .style(Style::default().fg(PALE_YELLOW).add_modifier(Modifier::ITALIC))
    } else if let Some(e) = fetch.error() {
        Paragraph::new(vec![
            Line::from(Span::styled(e.title(), Style::default().fg(BURGUNDY).add_modifier(Modifier::BOLD))),
            Line::from(Span::styled(e.to_string(), Style::default().fg(TEXT_SECONDARY))),
        ])
        .wrap(Wrap { trim: false })
    } else if let Some(output) = app.attestation.output() {
        Paragraph::new(output.to_string())
            .style(Style::default().fg(TEXT_PRIMARY))
            .wrap(Wrap { trim: false })
            .scroll((app.attestation.scroll, 0))
    } else {
        Paragraph::new("No attestation available").style(Style::default().fg(TEXT_MUTED))
    };

    let padded = Rect {
        x: inner.x + 1,
        y: inner.y + 1,
        width: inner.width.saturating_sub(2),
        height: inner.height.saturating_sub(2),
    };
    frame.render_widget(body, padded);
}

fn draw_notices(frame: &mut Frame, app: &App, area: Rect) {
    if app.ui.notices.is_empty() {
        return;
    }

    let width = 42.min(area.width.saturating_sub(4));
    let mut y = area.y + 1;
    for notice in app.ui.notices.iter() {
        let (accent, icon) = match notice.level {
            NoticeLevel::Info => (SAPPHIRE, "i"),
            NoticeLevel::Success => (OLIVE, "✓"),
            NoticeLevel::Warning => (PALE_YELLOW, "!"),
            NoticeLevel::Error => (BURGUNDY, "✗"),
        };

        let body_lines = wrap_text(&notice.body, width.saturating_sub(4) as usize);
        let height = (body_lines.len() as u16 + 3).min(6);
        if y + height > area.y + area.height {
            break;
        }
        let rect = Rect {
            x: area.x + area.width.saturating_sub(width + 2),
            y,
            width,
            height,
        };
        frame.render_widget(Clear, rect);

        let block = Block::default()
            .title(Span::styled(
                format!(" {} {} ", icon, notice.title),
                Style::default().fg(accent).add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(accent))
            .style(Style::default().bg(BG_PANEL));
        let inner = block.inner(rect);
        frame.render_widget(block, rect);

        let lines: Vec<Line> = body_lines
            .into_iter()
            .map(|l| Line::from(Span::styled(l, Style::default().fg(TEXT_SECONDARY))))
            .collect();
        frame.render_widget(
            Paragraph::new(lines),
            Rect {
                x: inner.x + 1,
                width: inner.width.saturating_sub(1),
                ..inner
            },
        );

        y += height;
    }
}
