//! Fixed window geometry derived from the window size.
//!
//! The window is divided into a 36×36 grid of atomic units. Controllers live
//! in the left column, value displays in the right column and figures in the
//! middle.

use crate::error::ConfigError;
use crate::scene::{Point, Rect};

pub const MAX_FIGURES: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutMetrics {
    pub window_width: f64,
    pub window_height: f64,
    pub atomic_width: f64,
    pub atomic_height: f64,
    pub small_button: (f64, f64),
    pub big_button: (f64, f64),
    pub font_size: f64,
}

/// Widget rectangles of one numeric controller row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumControllerRects {
    pub label: Point,
    pub decrease: Rect,
    pub increase: Rect,
    pub value: Point,
    pub slider: Rect,
}

/// Widget rectangles of one categorical controller row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CatControllerRects {
    pub label: Point,
    pub dropdown: Rect,
}

/// Baseline anchors of a value display's label and value text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplaySlot {
    pub label: Point,
    pub value: Point,
}

impl LayoutMetrics {
    pub fn new(window_width: f64, window_height: f64) -> Self {
        let atomic_width = (window_width / 36.0).round();
        let atomic_height = (window_height / 36.0).round();
        Self {
            window_width,
            window_height,
            atomic_width,
            atomic_height,
            small_button: (atomic_width * 0.6, atomic_height * 0.8),
            big_button: ((atomic_width * 2.0).round(), (atomic_height * 2.0).round()),
            font_size: (atomic_height * 0.5).round(),
        }
    }

    /// Figure rectangles for `count` figures (1 to 4).
    pub fn figure_rects(&self, count: usize) -> Result<Vec<Rect>, ConfigError> {
        let (w, h) = (self.window_width, self.window_height);
        let (aw, ah) = (self.atomic_width, self.atomic_height);
        let square = |x: f64, y: f64, size: f64| Rect::new(x, y, size, size);

        let rects = match count {
            0 => Vec::new(),
            1 => {
                let size = ah * 33.0;
                vec![square(
                    w / 2.0 - size / 2.0 + aw * 2.0,
                    h / 2.0 - size / 2.0,
                    size,
                )]
            }
            2 => {
                let size = ah * 19.0;
                let y = h / 2.0 - size / 2.0;
                vec![
                    square(w / 2.0 - size / 2.0 - size / 4.0 - ah * 1.5, y, size),
                    square(w / 2.0 + size / 4.0 - ah * 0.5, y, size),
                ]
            }
            3 | 4 => {
                let size = ah * 15.0;
                let left = w / 2.0 - size / 2.0 - size / 4.0 - ah;
                let right = w / 2.0 + size / 4.0 + ah;
                let top = h / 2.0 + ah;
                let bottom = h / 2.0 - size - ah;
                let mut rects = vec![
                    square(left, top, size),
                    square(right, top, size),
                    square(left, bottom, size),
                ];
                if count == 4 {
                    rects.push(square(right, bottom, size));
                }
                rects
            }
            n => return Err(ConfigError::TooManyFigures(n)),
        };
        Ok(rects)
    }

    /// Vertical offset of controller row `row`, measured down from the window top.
    pub fn controller_offset(&self, row: usize) -> f64 {
        let ah = self.atomic_height;
        (-(row as f64 * (ah * 3.1)) - ah * 2.0).round()
    }

    pub fn num_controller(&self, row: usize) -> NumControllerRects {
        let (aw, ah) = (self.atomic_width, self.atomic_height);
        let top = self.window_height + self.controller_offset(row);
        let (small_w, small_h) = self.small_button;
        let stepper_left = aw + aw * 4.0;
        let slider_height = ah * 0.8;
        let slider_top = top + ah * 0.19;
        NumControllerRects {
            label: Point::new(aw, top + ah - self.font_size),
            decrease: Rect::new(stepper_left, top + ah - small_h, small_w, small_h),
            increase: Rect::new(stepper_left + small_w, top + ah - small_h, small_w, small_h),
            value: Point::new(aw + aw * 6.0, top + ah - self.font_size),
            slider: Rect::new(aw, slider_top - slider_height, aw * 7.0, slider_height),
        }
    }

    pub fn cat_controller(&self, row: usize) -> CatControllerRects {
        let (aw, ah) = (self.atomic_width, self.atomic_height);
        let top = self.window_height + self.controller_offset(row);
        CatControllerRects {
            label: Point::new(aw, top + ah - self.font_size),
            dropdown: Rect::new(aw, top - ah, aw * 7.0, ah),
        }
    }

    /// Anchors of value display slot `index` in the right column.
    pub fn display_slot(&self, index: usize) -> DisplaySlot {
        let (aw, ah) = (self.atomic_width, self.atomic_height);
        let x = aw * 33.0;
        let y = ah * 36.0 - index as f64 * ah * 3.0;
        DisplaySlot {
            label: Point::new(x, y),
            value: Point::new(x, y - ah),
        }
    }

    /// Play, Step and Reset button rectangles, left to right.
    pub fn default_buttons(&self) -> [Rect; 3] {
        let aw = self.atomic_width;
        let (bw, bh) = self.big_button;
        let top = self.window_height - self.atomic_height;
        [1.5, 3.5, 5.5].map(|units| Rect::new(aw * units, top - bh, bw, bh))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics() -> LayoutMetrics {
        LayoutMetrics::new(1200.0, 720.0)
    }

    #[test]
    fn atomic_units_round_from_window() {
        let m = metrics();
        assert_eq!(m.atomic_width, 33.0);
        assert_eq!(m.atomic_height, 20.0);
        assert_eq!(m.big_button, (66.0, 40.0));
        assert_eq!(m.font_size, 10.0);
    }

    #[test]
    fn single_figure_is_centered_right_of_controls() {
        let rects = metrics().figure_rects(1).expect("one figure");
        assert_eq!(rects, vec![Rect::new(336.0, 30.0, 660.0, 660.0)]);
    }

    #[test]
    fn figure_layouts_stay_inside_window() {
        let m = metrics();
        for count in 1..=MAX_FIGURES {
            let rects = m.figure_rects(count).expect("layout");
            assert_eq!(rects.len(), count);
            for rect in rects {
                assert!(rect.x >= 0.0 && rect.right() <= m.window_width, "{rect:?}");
                assert!(rect.y >= 0.0 && rect.top() <= m.window_height, "{rect:?}");
            }
        }
        assert_eq!(m.figure_rects(5), Err(ConfigError::TooManyFigures(5)));
    }

    #[test]
    fn controller_rows_descend() {
        let m = metrics();
        assert_eq!(m.controller_offset(1), -102.0);
        assert_eq!(m.controller_offset(3), -226.0);
        let first = m.num_controller(1);
        let second = m.num_controller(2);
        assert!(second.slider.y < first.slider.y);
        assert!(first.increase.x > first.decrease.x);
    }

    #[test]
    fn default_buttons_sit_under_the_top_edge() {
        let [play, step, reset] = metrics().default_buttons();
        assert_eq!(play.top(), 700.0);
        assert_eq!(step.x, play.right());
        assert_eq!(reset.x, step.right());
    }
}
