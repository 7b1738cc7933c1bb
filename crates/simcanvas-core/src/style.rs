//! Shared widget theme.

use crate::color::Rgba;

/// Font color used for labels and value text across the panel.
pub const FONT_COLOR: Rgba = Rgba::rgb(45, 45, 50);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ButtonStyle {
    pub font_color: Rgba,
    pub bg: Rgba,
    pub border: Rgba,
    pub border_width: f64,
}

/// Button appearance for each interaction state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ButtonTheme {
    pub normal: ButtonStyle,
    pub hover: ButtonStyle,
    pub press: ButtonStyle,
}

impl Default for ButtonTheme {
    fn default() -> Self {
        Self {
            normal: ButtonStyle {
                font_color: FONT_COLOR,
                bg: Rgba::rgb(230, 230, 235),
                border: Rgba::rgb(150, 150, 160),
                border_width: 1.0,
            },
            hover: ButtonStyle {
                font_color: FONT_COLOR,
                bg: Rgba::rgb(210, 215, 225),
                border: Rgba::rgb(110, 110, 125),
                border_width: 1.0,
            },
            press: ButtonStyle {
                font_color: Rgba::WHITE,
                bg: Rgba::rgb(90, 100, 125),
                border: Rgba::rgb(60, 60, 75),
                border_width: 2.0,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Theme {
    pub background: Rgba,
    pub font_color: Rgba,
    pub font_size: f64,
    pub button: ButtonTheme,
    pub slider_track: Rgba,
    pub slider_fill: Rgba,
    pub slider_handle: Rgba,
    pub dropdown_bg: Rgba,
    pub dropdown_highlight: Rgba,
    pub focus: Rgba,
}

impl Theme {
    pub fn new(font_size: f64) -> Self {
        Self {
            background: Rgba::WHITESMOKE,
            font_color: FONT_COLOR,
            font_size,
            button: ButtonTheme::default(),
            slider_track: Rgba::rgb(200, 200, 205),
            slider_fill: Rgba::rgb(120, 135, 170),
            slider_handle: Rgba::rgb(70, 80, 110),
            dropdown_bg: Rgba::WHITE,
            dropdown_highlight: Rgba::rgb(220, 225, 240),
            focus: Rgba::rgb(255, 140, 0),
        }
    }
}
