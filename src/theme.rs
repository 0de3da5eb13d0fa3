use ratatui::style::Color;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Theme {
    #[default]
    Mocha,
    Terminal,
}

impl Theme {
    pub fn label(self) -> &'static str {
        match self {
            Theme::Mocha => "Mocha",
            Theme::Terminal => "Terminal",
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Palette {
    pub bg: Color,
    pub fg: Color,
    pub accent_primary: Color,
    pub accent_secondary: Color,
    pub accent_tertiary: Color,
    pub border_inactive: Color,
    pub selection_bg: Color,
    pub muted: Color,
    pub overlay_bg: Color,
    pub warn_fg: Color,
    pub error_fg: Color,
    pub diff_add_fg: Color,
    pub diff_del_fg: Color,
    pub diff_hunk_fg: Color,
}

fn tint(base: Color, overlay: Color, alpha: f32) -> Color {
    let (br, bg, bb) = match base {
        Color::Rgb(r, g, b) => (r, g, b),
        _ => return base,
    };
    let (or, og, ob) = match overlay {
        Color::Rgb(r, g, b) => (r, g, b),
        _ => return base,
    };

    let mix = |b: u8, o: u8| -> u8 {
        let b = b as f32;
        let o = o as f32;
        let v = b + (o - b) * alpha;
        v.round().clamp(0.0, 255.0) as u8
    };
    Color::Rgb(mix(br, or), mix(bg, og), mix(bb, ob))
}

pub fn palette(theme: Theme) -> Palette {
    match theme {
        Theme::Mocha => {
            let bg = Color::Rgb(30, 30, 46);
            let accent_primary = Color::Rgb(203, 166, 247);
            Palette {
                bg,
                fg: Color::Rgb(248, 248, 255),
                accent_primary,
                accent_secondary: Color::Rgb(250, 179, 135),
                accent_tertiary: Color::Rgb(137, 180, 250),
                border_inactive: Color::Rgb(120, 124, 150),
                selection_bg: Color::Rgb(78, 82, 110),
                muted: Color::Rgb(147, 153, 178),
                overlay_bg: tint(bg, accent_primary, 0.08),
                warn_fg: Color::Rgb(249, 226, 175),
                error_fg: Color::Rgb(243, 139, 168),
                diff_add_fg: Color::Rgb(148, 226, 213),
                diff_del_fg: Color::Rgb(243, 139, 168),
                diff_hunk_fg: Color::Rgb(137, 180, 250),
            }
        }
        // Defer to whatever the terminal is configured with.
        Theme::Terminal => Palette {
            bg: Color::Reset,
            fg: Color::Reset,
            accent_primary: Color::Magenta,
            accent_secondary: Color::Yellow,
            accent_tertiary: Color::Blue,
            border_inactive: Color::DarkGray,
            selection_bg: Color::DarkGray,
            muted: Color::Gray,
            overlay_bg: Color::Reset,
            warn_fg: Color::Yellow,
            error_fg: Color::Red,
            diff_add_fg: Color::Green,
            diff_del_fg: Color::Red,
            diff_hunk_fg: Color::Cyan,
        },
    }
}
