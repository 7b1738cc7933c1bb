//! Half-block rasterizer: two vertical pixels per terminal cell.

use simcanvas_core::{Point, Primitive, Rect, Rgba, Scene};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterCell {
    pub top: Rgba,
    pub bottom: Rgba,
    pub glyph: Option<(char, Rgba)>,
}

/// Scene painted onto a `cols x rows` cell grid (`cols x 2*rows` pixels).
#[derive(Debug, Clone)]
pub struct Raster {
    cols: usize,
    rows: usize,
    scene_width: f64,
    scene_height: f64,
    pixels: Vec<Rgba>,
    glyphs: Vec<Option<(char, Rgba)>>,
}

impl Raster {
    pub fn paint(scene: &Scene, cols: u16, rows: u16) -> Self {
        let (cols, rows) = (usize::from(cols.max(1)), usize::from(rows.max(1)));
        let mut raster = Self {
            cols,
            rows,
            scene_width: scene.width.max(1.0),
            scene_height: scene.height.max(1.0),
            pixels: vec![scene.background; cols * rows * 2],
            glyphs: vec![None; cols * rows],
        };
        for primitive in scene.primitives() {
            raster.draw(primitive);
        }
        raster
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    fn pixel_rows(&self) -> usize {
        self.rows * 2
    }

    /// Logical point to fractional pixel coordinates (y flipped downwards).
    fn to_pixel(&self, p: Point) -> (f64, f64) {
        (
            p.x / self.scene_width * self.cols as f64,
            (self.scene_height - p.y) / self.scene_height * self.pixel_rows() as f64,
        )
    }

    /// Centre of a terminal cell in logical coordinates.
    pub fn to_logical(&self, col: u16, row: u16) -> Point {
        let x = (f64::from(col) + 0.5) / self.cols as f64 * self.scene_width;
        let y = self.scene_height - (f64::from(row) + 0.5) / self.rows as f64 * self.scene_height;
        Point::new(x, y)
    }

    pub fn cell(&self, col: usize, row: usize) -> Option<RasterCell> {
        if col >= self.cols || row >= self.rows {
            return None;
        }
        Some(RasterCell {
            top: self.pixels[(row * 2) * self.cols + col],
            bottom: self.pixels[(row * 2 + 1) * self.cols + col],
            glyph: self.glyphs[row * self.cols + col],
        })
    }

    fn put(&mut self, px: i64, py: i64, color: Rgba) {
        if px < 0 || py < 0 || px as usize >= self.cols || py as usize >= self.pixel_rows() {
            return;
        }
        let idx = py as usize * self.cols + px as usize;
        self.pixels[idx] = color.over(self.pixels[idx]);
    }

    fn fill(&mut self, rect: Rect, color: Rgba) {
        let (x0, y1) = self.to_pixel(Point::new(rect.x, rect.y));
        let (x1, y0) = self.to_pixel(Point::new(rect.right(), rect.top()));
        let (cx0, cx1) = (x0.round() as i64, (x1.round() as i64).max(x0.round() as i64 + 1));
        let (cy0, cy1) = (y0.round() as i64, (y1.round() as i64).max(y0.round() as i64 + 1));
        for py in cy0..cy1 {
            for px in cx0..cx1 {
                self.put(px, py, color);
            }
        }
    }

    fn segment(&mut self, from: Point, to: Point, color: Rgba) {
        let (x0, y0) = self.to_pixel(from);
        let (x1, y1) = self.to_pixel(to);
        let steps = (x1 - x0).abs().max((y1 - y0).abs()).ceil().max(1.0) as usize;
        for i in 0..=steps {
            let t = i as f64 / steps as f64;
            let x = x0 + (x1 - x0) * t;
            let y = y0 + (y1 - y0) * t;
            self.put(x.floor() as i64, y.floor() as i64, color);
        }
    }

    fn disc(&mut self, center: Point, radius: f64, color: Rgba) {
        let (cx, cy) = self.to_pixel(center);
        let rx = radius / self.scene_width * self.cols as f64;
        let ry = radius / self.scene_height * self.pixel_rows() as f64;
        self.put(cx.floor() as i64, cy.floor() as i64, color);
        if rx < 0.5 && ry < 0.5 {
            return;
        }
        for py in (cy - ry).floor() as i64..=(cy + ry).ceil() as i64 {
            for px in (cx - rx).floor() as i64..=(cx + rx).ceil() as i64 {
                let dx = (px as f64 + 0.5 - cx) / rx.max(0.5);
                let dy = (py as f64 + 0.5 - cy) / ry.max(0.5);
                if dx * dx + dy * dy <= 1.0 && (px, py) != (cx.floor() as i64, cy.floor() as i64) {
                    self.put(px, py, color);
                }
            }
        }
    }

    fn text(&mut self, anchor: Point, text: &str, color: Rgba) {
        let (px, py) = self.to_pixel(anchor);
        let row = (py.floor() as i64 - 1).div_euclid(2);
        if row < 0 || row as usize >= self.rows {
            return;
        }
        let start = px.floor() as i64;
        for (offset, ch) in text.chars().enumerate() {
            let col = start + offset as i64;
            if col < 0 {
                continue;
            }
            if col as usize >= self.cols {
                break;
            }
            self.glyphs[row as usize * self.cols + col as usize] = Some((ch, color));
        }
    }

    fn draw(&mut self, primitive: &Primitive) {
        match primitive {
            Primitive::FilledRect { rect, color } => self.fill(*rect, *color),
            Primitive::OutlineRect { rect, color, .. } => {
                let corners = [
                    Point::new(rect.x, rect.y),
                    Point::new(rect.right(), rect.y),
                    Point::new(rect.right(), rect.top()),
                    Point::new(rect.x, rect.top()),
                ];
                for i in 0..4 {
                    self.segment(corners[i], corners[(i + 1) % 4], *color);
                }
            }
            Primitive::Circle {
                center,
                radius,
                color,
            } => self.disc(*center, *radius, *color),
            Primitive::Line {
                from, to, color, ..
            } => self.segment(*from, *to, *color),
            Primitive::LineStrip { points, color, .. } => {
                for pair in points.windows(2) {
                    self.segment(pair[0], pair[1], *color);
                }
            }
            Primitive::Text {
                anchor,
                text,
                color,
                ..
            } => self.text(*anchor, text, *color),
        }
    }
}
