//! Cell-grid layout for the two-pane dashboard.
//!
//! [`compute`] is a pure function of the terminal size and the wrapped height
//! of the footer help line. It is rerun on every resize, never patched.

use ratatui::layout::Rect;

/// Blank columns on each side of the frame.
pub const MARGIN: u16 = 1;
/// Columns between the sidebar and the main pane.
pub const GAP: u16 = 1;
pub const MIN_INNER_WIDTH: u16 = 10;
pub const SIDEBAR_PERCENT: u16 = 34;
pub const MIN_COLUMN_WIDTH: u16 = 16;
/// Title row plus one content row inside two border rows.
pub const MIN_PANE_AREA: u16 = 5;
/// Two border rows and one title row.
pub const PANE_CHROME: u16 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaneLayout {
    pub sidebar: Rect,
    pub main: Rect,
    /// Width between the margins.
    pub inner_width: u16,
    /// Rows available to a pane's list or scroll content.
    pub content_height: u16,
    pub status: Rect,
    pub footer: Rect,
}

impl PaneLayout {
    pub fn panes(&self) -> [Rect; 2] {
        [self.sidebar, self.main]
    }

    /// Left two thirds of the footer hold the help line.
    pub fn help_width(&self) -> u16 {
        help_width(self.inner_width)
    }
}

pub fn help_width(inner_width: u16) -> u16 {
    scale(inner_width, 2, 3).max(1)
}

fn scale(value: u16, num: u32, den: u32) -> u16 {
    u16::try_from(u32::from(value) * num / den).unwrap_or(u16::MAX)
}

pub fn inner_width(width: u16) -> u16 {
    width.saturating_sub(MARGIN * 2).max(MIN_INNER_WIDTH)
}

pub fn compute(width: u16, height: u16, help_height: u16) -> PaneLayout {
    let inner = inner_width(width);

    let sidebar_width = scale(inner, u32::from(SIDEBAR_PERCENT), 100).max(MIN_COLUMN_WIDTH);
    let main_width = inner
        .saturating_sub(GAP)
        .saturating_sub(sidebar_width)
        .max(MIN_COLUMN_WIDTH);

    let help_height = help_height.max(1);
    let footer_lines = help_height + 1;
    let pane_area = height.saturating_sub(footer_lines).max(MIN_PANE_AREA);
    let content_height = pane_area.saturating_sub(PANE_CHROME).max(1);

    PaneLayout {
        sidebar: Rect::new(MARGIN, 0, sidebar_width, pane_area),
        main: Rect::new(MARGIN + sidebar_width + GAP, 0, main_width, pane_area),
        inner_width: inner,
        content_height,
        status: Rect::new(MARGIN, pane_area, inner, 1),
        footer: Rect::new(MARGIN, pane_area + 1, inner, help_height),
    }
}

/// Half-open containment, matching how cells are drawn.
pub fn contains(rect: Rect, column: u16, row: u16) -> bool {
    column >= rect.x
        && column < rect.x.saturating_add(rect.width)
        && row >= rect.y
        && row < rect.y.saturating_add(rect.height)
}
