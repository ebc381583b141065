use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{
        Block, BorderType, Borders, Clear, HighlightSpacing, List, ListItem, ListState,
        Paragraph, Row, Table, TableState, Wrap,
    },
};

use super::app::{App, SIDEBAR};
use super::overlay::{Menu, Overlay};
use super::pane::{Pane, PaneState, Table as PaneTable, Viewport};
use super::theme::Theme;

/// Overlays never grow taller than this.
const OVERLAY_MAX_HEIGHT: u16 = 20;
const OVERLAY_WIDTH: u16 = 64;
/// Width of the key column in the shortcuts overlay.
const LABEL_WIDTH: usize = 12;

pub fn draw(frame: &mut Frame, app: &App) {
    let area = frame.area();
    let theme = app.theme;

    for (index, pane) in app.panes.iter().enumerate() {
        let rect = pane.rect.intersection(area);
        if rect.is_empty() {
            continue;
        }
        let active_row = (index == SIDEBAR)
            .then(|| app.modules.iter().position(|m| *m == app.active_module))
            .flatten();
        draw_pane(frame, theme, pane, rect, active_row);
    }

    let status = app.layout.status.intersection(area);
    if !status.is_empty() {
        frame.render_widget(
            Paragraph::new(app.status.as_str()).style(theme.status_style()),
            status,
        );
    }

    draw_footer(frame, app, app.layout.footer.intersection(area));

    match &app.overlay {
        Overlay::None => {}
        Overlay::AuthMenu(menu) => draw_menu(frame, theme, menu, "enter select · esc close"),
        Overlay::Shortcuts(menu) => {
            let prompt = format!("/ {}█", menu.filter().unwrap_or(""));
            draw_menu(frame, theme, menu, &prompt);
        }
    }
}

fn draw_pane(frame: &mut Frame, theme: &Theme, pane: &Pane, area: Rect, active_row: Option<usize>) {
    let block = Block::default()
        .title(Span::styled(format!(" {} ", pane.title), theme.title_style()))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(theme.border(pane.is_focused()));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    match &pane.state {
        PaneState::List(table) => draw_table(frame, theme, table, inner, active_row),
        PaneState::Content(vp) => draw_viewport(frame, theme, vp, inner),
    }
}

fn draw_table(
    frame: &mut Frame,
    theme: &Theme,
    table: &PaneTable,
    area: Rect,
    active_row: Option<usize>,
) {
    let header = Row::new(table.columns.iter().map(|c| c.title)).style(
        Style::default()
            .fg(theme.text_secondary)
            .add_modifier(Modifier::BOLD),
    );
    let rows = table.rows.iter().enumerate().map(|(i, cells)| {
        let style = if active_row == Some(i) {
            Style::default().fg(theme.text_accent)
        } else {
            Style::default().fg(theme.text_primary)
        };
        Row::new(cells.iter().map(String::as_str)).style(style)
    });
    let widths: Vec<Constraint> = table
        .columns
        .iter()
        .map(|c| Constraint::Length(c.width))
        .collect();

    let widget = Table::new(rows, widths)
        .header(header)
        .row_highlight_style(theme.selection_style(table.cursor.is_focused()))
        .highlight_symbol("▸ ")
        .highlight_spacing(HighlightSpacing::Always);
    let mut state = TableState::default()
        .with_offset(table.cursor.offset())
        .with_selected(table.cursor.selected());
    frame.render_stateful_widget(widget, area, &mut state);
}

fn draw_viewport(frame: &mut Frame, theme: &Theme, vp: &Viewport, area: Rect) {
    if area.height == 0 {
        return;
    }
    let total = vp.lines().len();
    let shown = vp.visible().len();
    let position = if total == 0 {
        "empty".to_string()
    } else {
        format!("lines {}-{} of {total}", vp.offset() + 1, vp.offset() + shown)
    };
    let header = Rect::new(area.x, area.y, area.width, 1);
    frame.render_widget(
        Paragraph::new(position).style(Style::default().fg(theme.text_secondary)),
        header,
    );

    let body = Rect::new(area.x, area.y + 1, area.width, area.height - 1);
    let lines: Vec<Line> = vp.visible().iter().map(|l| Line::raw(l.as_str())).collect();
    frame.render_widget(
        Paragraph::new(lines).style(Style::default().fg(theme.text_primary)),
        body,
    );
}

fn draw_footer(frame: &mut Frame, app: &App, area: Rect) {
    if area.is_empty() {
        return;
    }
    let theme = app.theme;
    let help_width = app.layout.help_width().min(area.width);
    let left = Rect::new(area.x, area.y, help_width, area.height);
    let right = Rect::new(
        area.x + help_width,
        area.y,
        area.width - help_width,
        area.height,
    );

    frame.render_widget(
        Paragraph::new(app.keymap.short_help_line())
            .style(Style::default().fg(theme.text_secondary))
            .wrap(Wrap { trim: false }),
        left,
    );

    let badge = if app.signed_in {
        "signed in"
    } else {
        "signed out"
    };
    let line = Line::from(vec![
        Span::styled(
            format!("v{} · ", crate::VERSION),
            Style::default().fg(theme.text_secondary),
        ),
        Span::styled(badge, theme.auth_badge_style(app.signed_in)),
    ]);
    frame.render_widget(Paragraph::new(line).alignment(Alignment::Right), right);
}

fn draw_menu<A: Copy>(frame: &mut Frame, theme: &Theme, menu: &Menu<A>, prompt: &str) {
    let visible = menu.visible();
    let height = (visible.len() as u16 + 3).clamp(5, OVERLAY_MAX_HEIGHT);
    let inner = render_modal(
        frame,
        &format!(" {} ", menu.title),
        Style::default().fg(theme.overlay_border),
        OVERLAY_WIDTH,
        height,
    );
    if inner.height == 0 {
        return;
    }

    frame.render_widget(
        Paragraph::new(prompt).style(Style::default().fg(theme.filter_prompt)),
        Rect::new(inner.x, inner.y, inner.width, 1),
    );

    let items: Vec<ListItem> = visible
        .iter()
        .map(|item| {
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{:<LABEL_WIDTH$}", item.title),
                    Style::default()
                        .fg(theme.text_accent)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    item.description.as_str(),
                    Style::default().fg(theme.text_secondary),
                ),
            ]))
        })
        .collect();
    let list = List::new(items)
        .highlight_style(theme.selection_style(true))
        .highlight_symbol("▸ ")
        .highlight_spacing(HighlightSpacing::Always);
    let mut state = ListState::default()
        .with_offset(menu.cursor().offset())
        .with_selected(menu.cursor().selected());
    let body = Rect::new(inner.x, inner.y + 1, inner.width, inner.height - 1);
    frame.render_stateful_widget(list, body, &mut state);
}

/// Rows an overlay list can show on a terminal `height` rows tall.
pub fn overlay_list_rows(height: u16) -> u16 {
    OVERLAY_MAX_HEIGHT
        .min(height.saturating_sub(4))
        .saturating_sub(3)
        .max(1)
}

// ── Rendering helpers ─────────────────────────────────────────────────

/// Render a centered modal overlay: `Clear` background, bordered block, returns inner `Rect`.
///
/// Centres a panel of the given `width`×`height` on screen, clamping to available space.
/// The caller gets back the usable inner area (inside borders).
pub fn render_modal(
    frame: &mut Frame,
    title: &str,
    border_color: Style,
    width: u16,
    height: u16,
) -> Rect {
    let area = frame.area();
    let w = width.min(area.width.saturating_sub(4));
    let h = height.min(area.height.saturating_sub(4));
    let x = (area.width.saturating_sub(w)) / 2;
    let y = (area.height.saturating_sub(h)) / 2;
    let panel = Rect::new(x, y, w, h);

    frame.render_widget(Clear, panel);

    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(border_color);
    let inner = block.inner(panel);
    frame.render_widget(block, panel);

    inner
}

/// Measure how many visual lines a paragraph of `text` would occupy at `width`,
/// using ratatui's own word-wrapping (consistent with `Wrap { trim: false }`).
/// Returns at least 1.
pub fn measure_wrapped_height(text: &str, width: u16) -> u16 {
    if width == 0 {
        return 1;
    }
    Paragraph::new(text)
        .wrap(Wrap { trim: false })
        .line_count(width)
        .max(1) as u16
}
