use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;

/// Rows moved per wheel notch in a scrollable viewport.
const WHEEL_STEP: usize = 3;

// ── Selection cursor ─────────────────────────────────────────────────

/// Cursor over `len` rows. Blurred lists ignore keyboard and mouse input.
#[derive(Debug, Clone)]
pub struct SelectList {
    len: usize,
    selected: usize,
    offset: usize,
    page: usize,
    focused: bool,
}

impl SelectList {
    pub fn new(len: usize) -> Self {
        Self {
            len,
            selected: 0,
            offset: 0,
            page: 1,
            focused: false,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn selected(&self) -> Option<usize> {
        (self.len > 0).then_some(self.selected)
    }

    /// First visible row.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Replace the row count and move the cursor back to the top.
    pub fn reset(&mut self, len: usize) {
        self.len = len;
        self.selected = 0;
        self.offset = 0;
    }

    /// Number of rows visible at once; drives paging and scrolling.
    pub fn set_page(&mut self, rows: usize) {
        self.page = rows.max(1);
        self.clamp_offset();
    }

    /// Select `index` if it is in range. Works on blurred lists.
    pub fn select(&mut self, index: usize) -> bool {
        if index >= self.len {
            return false;
        }
        self.selected = index;
        self.clamp_offset();
        true
    }

    pub fn focus(&mut self) {
        self.focused = true;
    }

    pub fn blur(&mut self) {
        self.focused = false;
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    /// Returns `true` when the cursor moved.
    pub fn handle_key(&mut self, key: &KeyEvent) -> bool {
        if !self.focused || self.len == 0 {
            return false;
        }
        if key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) {
            return false;
        }
        let page = isize::try_from(self.page).unwrap_or(isize::MAX);
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.move_by(-1),
            KeyCode::Down | KeyCode::Char('j') => self.move_by(1),
            KeyCode::PageUp => self.move_by(-page),
            KeyCode::PageDown => self.move_by(page),
            KeyCode::Home | KeyCode::Char('g') => self.move_to(0),
            KeyCode::End | KeyCode::Char('G') => self.move_to(self.len - 1),
            _ => false,
        }
    }

    pub fn handle_mouse(&mut self, event: &MouseEvent) -> bool {
        if !self.focused {
            return false;
        }
        match event.kind {
            MouseEventKind::ScrollUp => self.move_by(-1),
            MouseEventKind::ScrollDown => self.move_by(1),
            _ => false,
        }
    }

    fn move_by(&mut self, delta: isize) -> bool {
        let target = self.selected.saturating_add_signed(delta);
        self.move_to(target)
    }

    fn move_to(&mut self, index: usize) -> bool {
        if self.len == 0 {
            return false;
        }
        let target = index.min(self.len - 1);
        let moved = target != self.selected;
        self.selected = target;
        self.clamp_offset();
        moved
    }

    fn clamp_offset(&mut self) {
        if self.selected < self.offset {
            self.offset = self.selected;
        } else if self.selected >= self.offset + self.page {
            self.offset = self.selected + 1 - self.page;
        }
    }
}

// ── Scrollable text ──────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct Viewport {
    lines: Vec<String>,
    offset: usize,
    height: usize,
}

impl Viewport {
    pub fn new(content: &str) -> Self {
        let mut vp = Self {
            height: 1,
            ..Self::default()
        };
        vp.set_content(content);
        vp
    }

    pub fn set_content(&mut self, content: &str) {
        self.lines = content.lines().map(str::to_string).collect();
        self.offset = self.offset.min(self.max_offset());
    }

    pub fn set_height(&mut self, rows: usize) {
        self.height = rows.max(1);
        self.offset = self.offset.min(self.max_offset());
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Lines currently inside the viewport.
    pub fn visible(&self) -> &[String] {
        let end = (self.offset + self.height).min(self.lines.len());
        &self.lines[self.offset.min(end)..end]
    }

    fn max_offset(&self) -> usize {
        self.lines.len().saturating_sub(self.height)
    }

    pub fn scroll_by(&mut self, delta: isize) -> bool {
        let target = self.offset.saturating_add_signed(delta).min(self.max_offset());
        let moved = target != self.offset;
        self.offset = target;
        moved
    }

    pub fn handle_key(&mut self, key: &KeyEvent) -> bool {
        let page = isize::try_from(self.height).unwrap_or(isize::MAX);
        let half = (page / 2).max(1);
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('u') if ctrl => self.scroll_by(-half),
            KeyCode::Char('d') if ctrl => self.scroll_by(half),
            _ if ctrl => false,
            KeyCode::Up | KeyCode::Char('k') => self.scroll_by(-1),
            KeyCode::Down | KeyCode::Char('j') => self.scroll_by(1),
            KeyCode::PageUp | KeyCode::Char('b') => self.scroll_by(-page),
            KeyCode::PageDown | KeyCode::Char('f' | ' ') => self.scroll_by(page),
            KeyCode::Home | KeyCode::Char('g') => self.scroll_by(isize::MIN),
            KeyCode::End | KeyCode::Char('G') => self.scroll_by(isize::MAX),
            _ => false,
        }
    }

    pub fn handle_mouse(&mut self, event: &MouseEvent) -> bool {
        let step = isize::try_from(WHEEL_STEP).unwrap_or(1);
        match event.kind {
            MouseEventKind::ScrollUp => self.scroll_by(-step),
            MouseEventKind::ScrollDown => self.scroll_by(step),
            _ => false,
        }
    }
}

// ── Table ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub title: &'static str,
    pub width: u16,
}

/// Rows of cells with a selection cursor. The header row takes the pane's
/// title line.
#[derive(Debug, Clone)]
pub struct Table {
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<String>>,
    pub cursor: SelectList,
}

impl Table {
    pub fn new(columns: Vec<Column>, rows: Vec<Vec<String>>) -> Self {
        let cursor = SelectList::new(rows.len());
        Self {
            columns,
            rows,
            cursor,
        }
    }

    pub fn selected_row(&self) -> Option<&[String]> {
        self.cursor
            .selected()
            .and_then(|i| self.rows.get(i))
            .map(Vec::as_slice)
    }
}

// ── Pane ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaneKind {
    List,
    Content,
}

#[derive(Debug, Clone)]
pub enum PaneState {
    List(Table),
    Content(Viewport),
}

impl PaneState {
    pub fn kind(&self) -> PaneKind {
        match self {
            Self::List(_) => PaneKind::List,
            Self::Content(_) => PaneKind::Content,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Pane {
    pub title: String,
    pub state: PaneState,
    pub rect: Rect,
    focused: bool,
}

impl Pane {
    pub fn new(title: impl Into<String>, state: PaneState) -> Self {
        Self {
            title: title.into(),
            state,
            rect: Rect::default(),
            focused: false,
        }
    }

    pub fn kind(&self) -> PaneKind {
        self.state.kind()
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    /// Flag the pane and focus or blur its list component.
    pub fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
        if let PaneState::List(table) = &mut self.state {
            if focused {
                table.cursor.focus();
            } else {
                table.cursor.blur();
            }
        }
    }

    /// Swap the pane's component, carrying over focus and size.
    pub fn replace_state(&mut self, state: PaneState, content_height: u16) {
        self.state = state;
        self.set_focused(self.focused);
        self.set_content_height(content_height);
    }

    pub fn set_content_height(&mut self, rows: u16) {
        let rows = usize::from(rows);
        match &mut self.state {
            PaneState::List(table) => table.cursor.set_page(rows),
            PaneState::Content(vp) => vp.set_height(rows),
        }
    }

    pub fn table(&self) -> Option<&Table> {
        match &self.state {
            PaneState::List(table) => Some(table),
            PaneState::Content(_) => None,
        }
    }

    pub fn table_mut(&mut self) -> Option<&mut Table> {
        match &mut self.state {
            PaneState::List(table) => Some(table),
            PaneState::Content(_) => None,
        }
    }

    pub fn handle_key(&mut self, key: &KeyEvent) -> bool {
        match &mut self.state {
            PaneState::List(table) => table.cursor.handle_key(key),
            PaneState::Content(vp) => vp.handle_key(key),
        }
    }

    pub fn handle_mouse(&mut self, event: &MouseEvent) -> bool {
        match &mut self.state {
            PaneState::List(table) => table.cursor.handle_mouse(event),
            PaneState::Content(vp) => vp.handle_mouse(event),
        }
    }
}
