use ratatui::style::{Color, Modifier, Style};
use serde::Deserialize;

/// Colours used by the renderer. Any of them can be overridden from the
/// `[theme]` table in `config.toml`.
#[derive(Debug, Clone)]
pub struct Theme {
    // ── Borders ───────────────────────────────────────────────
    pub border_focused: Color,
    pub border_unfocused: Color,

    // ── Text ──────────────────────────────────────────────────
    pub text_primary: Color,
    pub text_secondary: Color,
    pub text_accent: Color,

    // ── Selection ─────────────────────────────────────────────
    pub selection_indicator: Color,
    pub selection_dim: Color,

    // ── Status line / footer ──────────────────────────────────
    pub status_text: Color,
    pub signed_in: Color,
    pub signed_out: Color,

    // ── Overlays ──────────────────────────────────────────────
    pub overlay_border: Color,
    pub filter_prompt: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            border_focused: Color::LightBlue,
            border_unfocused: Color::DarkGray,

            text_primary: Color::White,
            text_secondary: Color::DarkGray,
            text_accent: Color::Cyan,

            selection_indicator: Color::Cyan,
            selection_dim: Color::Gray,

            status_text: Color::Gray,
            signed_in: Color::Green,
            signed_out: Color::Yellow,

            overlay_border: Color::Magenta,
            filter_prompt: Color::Yellow,
        }
    }
}

impl Theme {
    pub fn focused_border(&self) -> Style {
        Style::default().fg(self.border_focused)
    }

    pub fn unfocused_border(&self) -> Style {
        Style::default().fg(self.border_unfocused)
    }

    pub fn border(&self, focused: bool) -> Style {
        if focused {
            self.focused_border()
        } else {
            self.unfocused_border()
        }
    }

    pub fn title_style(&self) -> Style {
        Style::default()
            .fg(self.text_primary)
            .add_modifier(Modifier::BOLD)
    }

    /// Highlight for the selected row. Blurred lists keep a dim marker so the
    /// cursor stays visible.
    pub fn selection_style(&self, focused: bool) -> Style {
        if focused {
            Style::default()
                .fg(self.selection_indicator)
                .add_modifier(Modifier::BOLD | Modifier::REVERSED)
        } else {
            Style::default().fg(self.selection_dim)
        }
    }

    pub fn status_style(&self) -> Style {
        Style::default()
            .fg(self.status_text)
            .add_modifier(Modifier::DIM)
    }

    pub fn auth_badge_style(&self, signed_in: bool) -> Style {
        let color = if signed_in {
            self.signed_in
        } else {
            self.signed_out
        };
        Style::default().fg(color)
    }
}

// ── Config deserialization ────────────────────────────────────────────

/// The `[theme]` table: one optional colour string per [`Theme`] field.
#[derive(Debug, Default, Deserialize, Clone)]
pub struct ThemeConfig {
    pub border_focused: Option<String>,
    pub border_unfocused: Option<String>,

    pub text_primary: Option<String>,
    pub text_secondary: Option<String>,
    pub text_accent: Option<String>,

    pub selection_indicator: Option<String>,
    pub selection_dim: Option<String>,

    pub status_text: Option<String>,
    pub signed_in: Option<String>,
    pub signed_out: Option<String>,

    pub overlay_border: Option<String>,
    pub filter_prompt: Option<String>,
}

const NAMED_COLORS: &[(&str, Color)] = &[
    ("black", Color::Black),
    ("red", Color::Red),
    ("green", Color::Green),
    ("yellow", Color::Yellow),
    ("blue", Color::Blue),
    ("magenta", Color::Magenta),
    ("cyan", Color::Cyan),
    ("gray", Color::Gray),
    ("darkgray", Color::DarkGray),
    ("lightred", Color::LightRed),
    ("lightgreen", Color::LightGreen),
    ("lightyellow", Color::LightYellow),
    ("lightblue", Color::LightBlue),
    ("lightmagenta", Color::LightMagenta),
    ("lightcyan", Color::LightCyan),
    ("white", Color::White),
];

/// Named colours (`cyan`, `dark_gray`, `Light-Blue`), `rgb(r,g,b)` or `#rrggbb`.
fn parse_color(s: &str) -> Option<Color> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix('#') {
        return parse_hex(hex);
    }
    if let Some(args) = s.strip_prefix("rgb(").and_then(|r| r.strip_suffix(')')) {
        let channels: Vec<u8> = args
            .split(',')
            .map(|c| c.trim().parse().ok())
            .collect::<Option<_>>()?;
        let [r, g, b] = channels[..] else {
            return None;
        };
        return Some(Color::Rgb(r, g, b));
    }

    let key: String = s
        .chars()
        .filter(|c| !matches!(c, '_' | '-'))
        .collect::<String>()
        .to_lowercase()
        .replace("grey", "gray");
    NAMED_COLORS
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, color)| *color)
}

fn parse_hex(hex: &str) -> Option<Color> {
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some(Color::Rgb(channel(0)?, channel(2)?, channel(4)?))
}

/// Unparseable values are logged and leave `target` alone.
fn apply(target: &mut Color, field: &str, source: Option<&String>) {
    let Some(s) = source else {
        return;
    };
    match parse_color(s) {
        Some(color) => *target = color,
        None => tracing::warn!(field, value = %s, "ignoring unknown theme colour"),
    }
}

impl ThemeConfig {
    pub fn build(&self) -> Theme {
        let mut t = Theme::default();

        apply(&mut t.border_focused, "border_focused", self.border_focused.as_ref());
        apply(
            &mut t.border_unfocused,
            "border_unfocused",
            self.border_unfocused.as_ref(),
        );
        apply(&mut t.text_primary, "text_primary", self.text_primary.as_ref());
        apply(&mut t.text_secondary, "text_secondary", self.text_secondary.as_ref());
        apply(&mut t.text_accent, "text_accent", self.text_accent.as_ref());
        apply(
            &mut t.selection_indicator,
            "selection_indicator",
            self.selection_indicator.as_ref(),
        );
        apply(&mut t.selection_dim, "selection_dim", self.selection_dim.as_ref());
        apply(&mut t.status_text, "status_text", self.status_text.as_ref());
        apply(&mut t.signed_in, "signed_in", self.signed_in.as_ref());
        apply(&mut t.signed_out, "signed_out", self.signed_out.as_ref());
        apply(&mut t.overlay_border, "overlay_border", self.overlay_border.as_ref());
        apply(&mut t.filter_prompt, "filter_prompt", self.filter_prompt.as_ref());

        t
    }
}
