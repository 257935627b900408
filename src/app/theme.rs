use ratatui::style::{Color, Modifier, Style};

use crate::app::models::Priority;
use crate::config::ThemeMode;

// Colours the list, dialogs and info boxes draw with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub text: Color,
    pub muted: Color,
    pub highlight_fg: Color,
    pub highlight_bg: Color,
    pub cursor_fg: Color,
    pub cursor_bg: Color,
    pub error: Color,
    pub notice: Color,
}

impl Palette {
    pub fn for_theme(theme: ThemeMode) -> Palette {
        match theme {
            ThemeMode::Dark => Palette {
                text: Color::White,
                muted: Color::Rgb(110, 110, 110),
                highlight_fg: Color::Black,
                highlight_bg: Color::LightGreen,
                cursor_fg: Color::Black,
                cursor_bg: Color::White,
                error: Color::LightRed,
                notice: Color::LightYellow,
            },
            ThemeMode::Light => Palette {
                text: Color::Black,
                muted: Color::Rgb(150, 150, 150),
                highlight_fg: Color::White,
                highlight_bg: Color::Rgb(0, 122, 255),
                cursor_fg: Color::White,
                cursor_bg: Color::Black,
                error: Color::Red,
                notice: Color::Rgb(180, 110, 0),
            },
            ThemeMode::System => Palette {
                text: Color::Reset,
                muted: Color::DarkGray,
                highlight_fg: Color::Reset,
                highlight_bg: Color::Reset,
                cursor_fg: Color::Black,
                cursor_bg: Color::Gray,
                error: Color::Red,
                notice: Color::Yellow,
            },
        }
    }

    pub fn text(&self) -> Style {
        Style::new().fg(self.text)
    }

    pub fn muted(&self) -> Style {
        Style::new().fg(self.muted)
    }

    pub fn cursor(&self) -> Style {
        Style::new().fg(self.cursor_fg).bg(self.cursor_bg)
    }

    // System theme marks the selection by reversing instead of painting
    pub fn highlight(&self) -> Style {
        if self.highlight_bg == Color::Reset {
            Style::new().add_modifier(Modifier::REVERSED | Modifier::BOLD)
        } else {
            Style::new()
                .fg(self.highlight_fg)
                .bg(self.highlight_bg)
                .add_modifier(Modifier::BOLD)
        }
    }

    pub fn priority(&self, priority: Priority) -> Color {
        match priority {
            Priority::Low => self.text,
            Priority::Medium => Color::Yellow,
            Priority::High => Color::Red,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn themes_differ() {
        let light = Palette::for_theme(ThemeMode::Light);
        let dark = Palette::for_theme(ThemeMode::Dark);
        assert_ne!(light, dark);
        assert_eq!(dark.priority(Priority::High), Color::Red);
        assert_eq!(light.priority(Priority::Low), Color::Black);
    }

    #[test]
    fn system_theme_reverses_selection() {
        let system = Palette::for_theme(ThemeMode::System);
        assert!(system.highlight().add_modifier.contains(Modifier::REVERSED));
    }
}
