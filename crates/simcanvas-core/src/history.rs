//! Multi-series line chart of scalar model values over ticks.

use ordered_float::OrderedFloat;

use crate::color::{Rgba, parse_color};
use crate::error::{ConfigError, RenderError};
use crate::figure::{Component, FigureFrame};
use crate::model::{Model, format_float};
use crate::scene::{Point, Rect, Scene};

pub const MAX_SERIES: usize = 6;
pub const DEFAULT_SAMPLING_STEP: u64 = 3;

const DEFAULT_COLORS: [Rgba; MAX_SERIES] = [
    Rgba::NAVY_BLUE,
    Rgba::ORANGE,
    Rgba::GREEN,
    Rgba::RED,
    Rgba::PINK,
    Rgba::PURPLE,
];

/// Linear map of `value` from `[old_min, old_max]` onto `[new_min, new_max]`.
///
/// A non-positive source range falls back to `new_min + (value - old_min) * span`.
pub fn rescale(value: f64, old_min: f64, old_max: f64, new_min: f64, new_max: f64) -> f64 {
    let old_range = old_max - old_min;
    let new_range = new_max - new_min;
    if old_range > 0.0 {
        new_min + (value - old_min) / old_range * new_range
    } else {
        new_min + (value - old_min) * new_range
    }
}

enum Source<M> {
    Attribute(String),
    Collector(String),
    Accessor(Box<dyn Fn(&M) -> f64>),
}

/// One sampled line of a [`HistoryPlot`].
pub struct Series<M> {
    label: String,
    source: Source<M>,
}

impl<M> Series<M> {
    /// Numeric model attribute read through [`Model::attribute`].
    pub fn attribute(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            label: name.clone(),
            source: Source::Attribute(name),
        }
    }

    /// Latest entry of a data collector series.
    pub fn collector(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            label: name.clone(),
            source: Source::Collector(name),
        }
    }

    pub fn from_fn(label: impl Into<String>, f: impl Fn(&M) -> f64 + 'static) -> Self {
        Self {
            label: label.into(),
            source: Source::Accessor(Box::new(f)),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl<M: Model> Series<M> {
    /// `Ok(None)` when the collector series exists but has no entries yet.
    fn sample(&self, model: &M) -> Result<Option<f64>, RenderError> {
        match &self.source {
            Source::Attribute(name) => {
                let value = model
                    .attribute(name)
                    .ok_or_else(|| RenderError::MissingAttribute(name.clone()))?;
                value
                    .as_f64()
                    .map(Some)
                    .ok_or_else(|| RenderError::NonNumericAttribute(name.clone()))
            }
            Source::Collector(name) => model
                .collector()
                .ok_or_else(|| RenderError::MissingCollector(name.clone()))?
                .latest(name)
                .ok_or_else(|| RenderError::MissingSeries(name.clone())),
            Source::Accessor(f) => Ok(Some(f(model))),
        }
    }
}

pub struct HistoryPlotBuilder<M> {
    series: Vec<Series<M>>,
    labels: Option<Vec<String>>,
    colors: Option<Vec<String>>,
    sampling_step: u64,
    legend: bool,
}

impl<M> HistoryPlotBuilder<M> {
    pub fn series(mut self, series: Series<M>) -> Self {
        self.series.push(series);
        self
    }

    pub fn labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels = Some(labels.into_iter().map(Into::into).collect());
        self
    }

    pub fn colors<I, S>(mut self, colors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.colors = Some(colors.into_iter().map(Into::into).collect());
        self
    }

    /// Sample every `step` ticks (ticks 0 and 1 are always sampled).
    pub fn sampling_step(mut self, step: u64) -> Self {
        self.sampling_step = step;
        self
    }

    pub fn legend(mut self, enabled: bool) -> Self {
        self.legend = enabled;
        self
    }

    pub fn build(self) -> Result<HistoryPlot<M>, ConfigError> {
        let count = self.series.len();
        if count == 0 {
            return Err(ConfigError::EmptyHistory);
        }
        if count > MAX_SERIES {
            return Err(ConfigError::TooManySeries {
                count,
                max: MAX_SERIES,
            });
        }
        if self.sampling_step == 0 {
            return Err(ConfigError::InvalidSettings(
                "history sampling step must be positive".into(),
            ));
        }
        let labels = match self.labels {
            Some(labels) if labels.len() != count => {
                return Err(ConfigError::LengthMismatch {
                    what: "labels",
                    expected: count,
                    actual: labels.len(),
                });
            }
            Some(labels) => labels,
            None => self.series.iter().map(|s| s.label.clone()).collect(),
        };
        let colors = match self.colors {
            Some(colors) if colors.len() != count => {
                return Err(ConfigError::LengthMismatch {
                    what: "colors",
                    expected: count,
                    actual: colors.len(),
                });
            }
            Some(colors) => colors
                .iter()
                .map(|c| parse_color(c))
                .collect::<Result<Vec<_>, _>>()?,
            None => DEFAULT_COLORS[..count].to_vec(),
        };

        Ok(HistoryPlot {
            buffers: vec![Vec::new(); count],
            scaled: vec![Vec::new(); count],
            series: self.series,
            labels,
            colors,
            sampling_step: self.sampling_step,
            legend: self.legend,
            min_y: 0.0,
            max_y: 0.0,
            last_tick: 0,
            plot: Rect::default(),
            font_size: 0.0,
            legend_entries: Vec::new(),
        })
    }
}

struct LegendEntry {
    label: Point,
    dot: Point,
}

pub struct HistoryPlot<M> {
    series: Vec<Series<M>>,
    labels: Vec<String>,
    colors: Vec<Rgba>,
    sampling_step: u64,
    legend: bool,
    buffers: Vec<Vec<(u64, f64)>>,
    scaled: Vec<Vec<Point>>,
    min_y: f64,
    max_y: f64,
    last_tick: u64,
    plot: Rect,
    font_size: f64,
    legend_entries: Vec<LegendEntry>,
}

impl<M> HistoryPlot<M> {
    pub fn builder() -> HistoryPlotBuilder<M> {
        HistoryPlotBuilder {
            series: Vec::new(),
            labels: None,
            colors: None,
            sampling_step: DEFAULT_SAMPLING_STEP,
            legend: true,
        }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn colors(&self) -> &[Rgba] {
        &self.colors
    }

    /// Raw `(tick, value)` samples of series `index`.
    pub fn buffer(&self, index: usize) -> Option<&[(u64, f64)]> {
        self.buffers.get(index).map(Vec::as_slice)
    }

    /// Running `(min, max)` of all samples, both starting at 0.
    pub fn y_range(&self) -> (f64, f64) {
        (self.min_y, self.max_y)
    }

    pub fn plot_area(&self) -> Rect {
        self.plot
    }

    /// Scaled polyline of series `index` in window pixels.
    pub fn polyline(&self, index: usize) -> Option<&[Point]> {
        self.scaled.get(index).map(Vec::as_slice)
    }

    fn rescale_all(&mut self) {
        let plot = self.plot;
        let (min_y, max_y, tick) = (self.min_y, self.max_y, self.last_tick as f64);
        for (buffer, scaled) in self.buffers.iter().zip(self.scaled.iter_mut()) {
            *scaled = buffer
                .iter()
                .map(|&(x, y)| {
                    Point::new(
                        rescale(x as f64, 0.0, tick, plot.x, plot.right()),
                        rescale(y, min_y, max_y, plot.y, plot.top()),
                    )
                })
                .collect();
        }
    }

    fn axis_label_x(&self, text: &str) -> f64 {
        self.plot.x - (text.chars().count() as f64 + 1.0) * self.font_size / 1.5
    }
}

fn axis_text(value: f64) -> String {
    format_float((value * 1000.0).round() / 1000.0)
}

impl<M: Model> Component<M> for HistoryPlot<M> {
    fn setup(&mut self, frame: &FigureFrame, _model: &M) -> Result<(), RenderError> {
        let r = frame.rect;
        self.font_size = (r.height * 0.03).trunc();
        self.plot = Rect::new(
            r.x + r.width * 0.15,
            r.y + r.height * 0.3,
            r.width * 0.825,
            r.height * 0.675,
        );
        self.buffers.iter_mut().for_each(Vec::clear);
        self.scaled.iter_mut().for_each(Vec::clear);
        self.min_y = 0.0;
        self.max_y = 0.0;
        self.last_tick = 0;

        self.legend_entries.clear();
        if self.legend {
            let base_x = r.x + r.width * 0.1;
            let mut label_y = self.plot.y - r.height * 0.1;
            for i in 0..self.labels.len() {
                if i % 2 == 0 {
                    label_y -= self.font_size * 2.0;
                }
                let label_x = if i % 2 == 0 {
                    base_x
                } else {
                    base_x + r.width / 2.0
                };
                self.legend_entries.push(LegendEntry {
                    label: Point::new(label_x, label_y),
                    dot: Point::new(label_x - self.font_size, label_y + self.font_size / 3.0),
                });
            }
        }
        Ok(())
    }

    fn update(&mut self, _frame: &FigureFrame, model: &M, tick: u64) -> Result<(), RenderError> {
        if tick % self.sampling_step != 0 && tick > 1 {
            return Ok(());
        }
        for (i, series) in self.series.iter().enumerate() {
            let Some(y) = series.sample(model)?.filter(|y| y.is_finite()) else {
                continue;
            };
            self.max_y = OrderedFloat(self.max_y).max(OrderedFloat(y)).into_inner();
            self.min_y = OrderedFloat(self.min_y).min(OrderedFloat(y)).into_inner();
            self.buffers[i].push((tick, y));
        }
        self.last_tick = tick;
        self.rescale_all();
        Ok(())
    }

    fn draw(&self, _frame: &FigureFrame, scene: &mut Scene) {
        let font = self.font_size;
        scene.fill_rect(self.plot, Rgba::WHITE);
        scene.outline_rect(self.plot, Rgba::BLACK, 2.0);

        for (entry, (label, color)) in self
            .legend_entries
            .iter()
            .zip(self.labels.iter().zip(&self.colors))
        {
            scene.circle(entry.dot, font / 2.0, *color);
            scene.text(entry.label, label.clone(), Rgba::BLACK, font);
        }

        let min_text = axis_text(self.min_y);
        let max_text = axis_text(self.max_y);
        scene.text(
            Point::new(self.axis_label_x(&min_text), self.plot.y),
            min_text,
            Rgba::BLACK,
            font,
        );
        scene.text(
            Point::new(self.axis_label_x(&max_text), self.plot.top() - font),
            max_text,
            Rgba::BLACK,
            font,
        );

        let tick_text = self.last_tick.to_string();
        let below = self.plot.y - font * 1.5;
        scene.text(Point::new(self.plot.x, below), "0", Rgba::BLACK, font);
        scene.text(
            Point::new(
                self.plot.right() - tick_text.len() as f64 * font / 1.5,
                below,
            ),
            tick_text,
            Rgba::BLACK,
            font,
        );

        for (points, color) in self.scaled.iter().zip(&self.colors) {
            scene.line_strip(points.clone(), *color, 2.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DataCollector, ModelError, ParamValue, Params};

    #[derive(Default)]
    struct Gauge {
        level: f64,
        collector: DataCollector,
    }

    impl Model for Gauge {
        fn from_params(_params: &Params) -> Result<Self, ModelError> {
            Ok(Self::default())
        }

        fn step(&mut self) {}

        fn attribute(&self, name: &str) -> Option<ParamValue> {
            (name == "level").then_some(ParamValue::Float(self.level))
        }

        fn collector(&self) -> Option<&DataCollector> {
            Some(&self.collector)
        }
    }

    fn frame() -> FigureFrame {
        FigureFrame {
            rect: Rect::new(0.0, 0.0, 200.0, 200.0),
            ..FigureFrame::default()
        }
    }

    fn level_plot() -> HistoryPlot<Gauge> {
        HistoryPlot::builder()
            .series(Series::attribute("level"))
            .build()
            .expect("plot")
    }

    #[test]
    fn rescale_fallback_is_additive() {
        assert_eq!(rescale(5.0, 0.0, 10.0, 100.0, 200.0), 150.0);
        assert_eq!(rescale(0.0, 0.0, 0.0, 100.0, 200.0), 100.0);
        assert_eq!(rescale(2.0, 0.0, 0.0, 100.0, 200.0), 300.0);
        assert_eq!(rescale(1.0, 3.0, 3.0, 10.0, 12.0), 6.0);
    }

    #[test]
    fn builder_validates_counts() {
        let too_many = (0..7).fold(HistoryPlot::<Gauge>::builder(), |b, i| {
            b.series(Series::attribute(format!("s{i}")))
        });
        assert!(matches!(
            too_many.build(),
            Err(ConfigError::TooManySeries { count: 7, max: 6 })
        ));
        assert!(matches!(
            HistoryPlot::<Gauge>::builder().build(),
            Err(ConfigError::EmptyHistory)
        ));
        let mismatch = HistoryPlot::<Gauge>::builder()
            .series(Series::attribute("a"))
            .labels(["a", "b"])
            .build();
        assert!(matches!(
            mismatch,
            Err(ConfigError::LengthMismatch { what: "labels", .. })
        ));
        let colors = HistoryPlot::<Gauge>::builder()
            .series(Series::attribute("a"))
            .colors(["red", "blue"])
            .build();
        assert!(matches!(
            colors,
            Err(ConfigError::LengthMismatch { what: "colors", .. })
        ));
    }

    #[test]
    fn geometry_follows_figure_rect() {
        let mut plot = level_plot();
        plot.setup(&frame(), &Gauge::default()).expect("setup");
        assert_eq!(plot.plot_area(), Rect::new(30.0, 60.0, 165.0, 135.0));
        assert_eq!(plot.colors(), &[Rgba::NAVY_BLUE]);
        assert_eq!(plot.labels(), &["level".to_string()]);
    }

    #[test]
    fn samples_on_interval_and_first_ticks() {
        let mut plot = level_plot();
        let mut model = Gauge::default();
        plot.setup(&frame(), &model).expect("setup");
        for tick in 0..=7 {
            model.level = tick as f64;
            plot.update(&frame(), &model, tick).expect("update");
        }
        let ticks: Vec<u64> = plot
            .buffer(0)
            .expect("buffer")
            .iter()
            .map(|(t, _)| *t)
            .collect();
        assert_eq!(ticks, vec![0, 1, 3, 6]);
        assert_eq!(plot.y_range(), (0.0, 6.0));
        let line = plot.polyline(0).expect("line");
        let area = plot.plot_area();
        assert_eq!(line.last().copied(), Some(Point::new(area.right(), area.top())));
    }

    #[test]
    fn non_finite_and_missing_samples_are_skipped() {
        let mut plot: HistoryPlot<Gauge> = HistoryPlot::builder()
            .series(Series::attribute("level"))
            .series(Series::collector("Infected"))
            .build()
            .expect("plot");
        let mut model = Gauge {
            collector: DataCollector::with_series(["Infected"]),
            ..Gauge::default()
        };
        plot.setup(&frame(), &model).expect("setup");

        model.level = f64::NAN;
        plot.update(&frame(), &model, 0).expect("nan tick");
        model.level = f64::INFINITY;
        plot.update(&frame(), &model, 1).expect("inf tick");
        assert_eq!(plot.buffer(0).map(<[_]>::len), Some(0));
        assert_eq!(plot.buffer(1).map(<[_]>::len), Some(0));
        assert_eq!(plot.y_range(), (0.0, 0.0));

        model.level = -2.0;
        model.collector.record("Infected", 4.0);
        plot.update(&frame(), &model, 3).expect("finite tick");
        assert_eq!(plot.y_range(), (-2.0, 4.0));
    }

    #[test]
    fn missing_attribute_or_series_propagates() {
        let mut plot: HistoryPlot<Gauge> = HistoryPlot::builder()
            .series(Series::attribute("nope"))
            .build()
            .expect("plot");
        let model = Gauge::default();
        plot.setup(&frame(), &model).expect("setup");
        assert!(matches!(
            plot.update(&frame(), &model, 0),
            Err(RenderError::MissingAttribute(_))
        ));

        let mut plot: HistoryPlot<Gauge> = HistoryPlot::builder()
            .series(Series::collector("Resistant"))
            .build()
            .expect("plot");
        plot.setup(&frame(), &model).expect("setup");
        assert!(matches!(
            plot.update(&frame(), &model, 0),
            Err(RenderError::MissingSeries(_))
        ));
    }

    #[test]
    fn draw_emits_axis_labels_and_legend() {
        let mut plot: HistoryPlot<Gauge> = HistoryPlot::builder()
            .series(Series::from_fn("double", |m: &Gauge| m.level * 2.0))
            .series(Series::attribute("level"))
            .labels(["Double", "Level"])
            .build()
            .expect("plot");
        let mut model = Gauge::default();
        plot.setup(&frame(), &model).expect("setup");
        model.level = 1.25;
        plot.update(&frame(), &model, 1).expect("update");

        let mut scene = Scene::new(200.0, 200.0, Rgba::WHITE);
        plot.draw(&frame(), &mut scene);
        let texts: Vec<&str> = scene.texts().collect();
        for expected in ["Double", "Level", "0.0", "2.5", "0", "1"] {
            assert!(texts.contains(&expected), "missing {expected}: {texts:?}");
        }
    }
}
