//! Theme bridge: maps an externally owned theme attribute to the two
//! gradient colors, animating transitions instead of hard-cutting.
//!
//! The bridge is strictly a consumer of the theme signal. On a change it
//! overwrites only the *target* colors; the frame step lerps the current
//! colors toward them so the on-screen gradient fades between schemes.

use crate::color::Color;

/// Fraction of the remaining distance the current colors cover per frame.
pub const COLOR_LERP_RATE: f32 = 0.02;

/// The two recognized color themes. Anything that is not `dark` renders
/// as light.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    /// Parses a theme attribute value.
    pub fn parse(attribute: &str) -> Self {
        if attribute == "dark" {
            Theme::Dark
        } else {
            Theme::Light
        }
    }

    /// The gradient endpoint pair for this theme.
    pub fn scheme(self) -> ColorScheme {
        match self {
            // blue -> purple
            Theme::Light => ColorScheme {
                a: Color::from_hex(0x3b82f6),
                b: Color::from_hex(0x8b5cf6),
            },
            // cyan -> violet
            Theme::Dark => ColorScheme {
                a: Color::from_hex(0x06b6d4),
                b: Color::from_hex(0x7c3aed),
            },
        }
    }
}

/// A named pair of gradient endpoint colors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorScheme {
    pub a: Color,
    pub b: Color,
}

/// Current and target gradient colors.
#[derive(Debug, Clone, Copy)]
pub struct ColorState {
    pub current_a: Color,
    pub current_b: Color,
    pub target_a: Color,
    pub target_b: Color,
}

impl ColorState {
    /// Starts with current and target both on the given theme's scheme.
    pub fn from_theme(theme: Theme) -> Self {
        let scheme = theme.scheme();
        Self {
            current_a: scheme.a,
            current_b: scheme.b,
            target_a: scheme.a,
            target_b: scheme.b,
        }
    }

    /// Overwrites the targets with a new scheme, leaving the currents to
    /// converge over the following frames.
    pub fn retarget(&mut self, scheme: ColorScheme) {
        self.target_a = scheme.a;
        self.target_b = scheme.b;
    }

    /// One frame of convergence toward the targets.
    pub fn step(&mut self, rate: f32) {
        self.current_a = self.current_a.lerp(self.target_a, rate);
        self.current_b = self.current_b.lerp(self.target_b, rate);
    }
}

/// Observes the host's theme attribute and keeps the color state's
/// targets in sync with it.
#[derive(Debug, Clone, Copy)]
pub struct ThemeBridge {
    theme: Theme,
    pub colors: ColorState,
}

impl ThemeBridge {
    /// Reads the initial attribute value and initializes both current and
    /// target colors to its scheme.
    pub fn new(initial_attribute: &str) -> Self {
        Self::from_theme(Theme::parse(initial_attribute))
    }

    pub fn from_theme(theme: Theme) -> Self {
        Self {
            theme,
            colors: ColorState::from_theme(theme),
        }
    }

    /// Reacts to an observed mutation of the theme attribute.
    pub fn observe(&mut self, attribute: &str) {
        self.theme = Theme::parse(attribute);
        self.colors.retarget(self.theme.scheme());
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anything_but_dark_parses_as_light() {
        assert_eq!(Theme::parse("dark"), Theme::Dark);
        assert_eq!(Theme::parse("light"), Theme::Light);
        assert_eq!(Theme::parse(""), Theme::Light);
        assert_eq!(Theme::parse("solarized"), Theme::Light);
    }

    #[test]
    fn bridge_starts_with_current_equal_to_target() {
        let bridge = ThemeBridge::new("dark");
        assert_eq!(bridge.theme(), Theme::Dark);
        assert_eq!(bridge.colors.current_a, bridge.colors.target_a);
        assert_eq!(bridge.colors.current_b, bridge.colors.target_b);
        assert_eq!(bridge.colors.target_a, Theme::Dark.scheme().a);
    }

    #[test]
    fn theme_change_retargets_without_touching_current_colors() {
        let mut bridge = ThemeBridge::new("light");
        let before = bridge.colors;

        bridge.observe("dark");
        assert_eq!(bridge.colors.current_a, before.current_a);
        assert_eq!(bridge.colors.current_b, before.current_b);
        assert_eq!(bridge.colors.target_a, Theme::Dark.scheme().a);
        assert_eq!(bridge.colors.target_b, Theme::Dark.scheme().b);
    }

    #[test]
    fn stepping_converges_toward_the_target_without_reaching_it() {
        let mut bridge = ThemeBridge::new("light");
        bridge.observe("dark");

        let target = bridge.colors.target_a;
        let mut distance = bridge.colors.current_a.distance_to(target);
        for _ in 0..200 {
            bridge.colors.step(COLOR_LERP_RATE);
            let next = bridge.colors.current_a.distance_to(target);
            assert!(next < distance);
            distance = next;
        }
        assert!(distance > 0.0, "convergence is asymptotic, not exact");
    }
}
