//! Per-frame draw list.
//!
//! Coordinates are logical window pixels with the origin at the bottom-left
//! corner and y pointing up.

use serde::Serialize;

use crate::color::Rgba;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle anchored at its bottom-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn centered(center: Point, width: f64, height: f64) -> Self {
        Self::new(
            center.x - width / 2.0,
            center.y - height / 2.0,
            width,
            height,
        )
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn top(&self) -> f64 {
        self.y + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.top()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Primitive {
    FilledRect {
        rect: Rect,
        color: Rgba,
    },
    OutlineRect {
        rect: Rect,
        color: Rgba,
        width: f64,
    },
    Circle {
        center: Point,
        radius: f64,
        color: Rgba,
    },
    Line {
        from: Point,
        to: Point,
        color: Rgba,
        width: f64,
    },
    LineStrip {
        points: Vec<Point>,
        color: Rgba,
        width: f64,
    },
    /// Text anchored at its baseline-left corner.
    Text {
        anchor: Point,
        text: String,
        color: Rgba,
        size: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scene {
    pub width: f64,
    pub height: f64,
    pub background: Rgba,
    primitives: Vec<Primitive>,
}

impl Scene {
    pub fn new(width: f64, height: f64, background: Rgba) -> Self {
        Self {
            width,
            height,
            background,
            primitives: Vec::new(),
        }
    }

    pub fn push(&mut self, primitive: Primitive) {
        self.primitives.push(primitive);
    }

    pub fn fill_rect(&mut self, rect: Rect, color: Rgba) {
        self.push(Primitive::FilledRect { rect, color });
    }

    pub fn outline_rect(&mut self, rect: Rect, color: Rgba, width: f64) {
        self.push(Primitive::OutlineRect { rect, color, width });
    }

    pub fn circle(&mut self, center: Point, radius: f64, color: Rgba) {
        self.push(Primitive::Circle {
            center,
            radius,
            color,
        });
    }

    pub fn line(&mut self, from: Point, to: Point, color: Rgba, width: f64) {
        self.push(Primitive::Line {
            from,
            to,
            color,
            width,
        });
    }

    pub fn line_strip(&mut self, points: Vec<Point>, color: Rgba, width: f64) {
        if points.len() >= 2 {
            self.push(Primitive::LineStrip {
                points,
                color,
                width,
            });
        }
    }

    pub fn text(&mut self, anchor: Point, text: impl Into<String>, color: Rgba, size: f64) {
        self.push(Primitive::Text {
            anchor,
            text: text.into(),
            color,
            size,
        });
    }

    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }

    pub fn len(&self) -> usize {
        self.primitives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }

    /// All text strings in draw order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.primitives.iter().filter_map(|p| match p {
            Primitive::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }
}
