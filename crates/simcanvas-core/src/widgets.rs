//! Host-agnostic buttons, sliders, dropdowns and labels.
//!
//! Widgets never touch the model. Input is translated into [`UiAction`]s that
//! the renderer applies to whatever model instance is current.

use tracing::warn;

use crate::layout::{CatControllerRects, NumControllerRects};
use crate::scene::{Point, Rect, Scene};
use crate::style::{ButtonStyle, Theme};

/// Intent produced by a UI interaction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UiAction {
    TogglePlay,
    Step,
    Reset,
    Increase(usize),
    Decrease(usize),
    /// Raw slider position for controller `controller`, before snapping.
    Slide { controller: usize, value: f64 },
    Select { controller: usize, option: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiKey {
    Space,
    Char(char),
    Tab,
    BackTab,
    Left,
    Right,
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WidgetId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum ButtonState {
    #[default]
    Normal,
    Hover,
    Press,
}

#[derive(Debug, Clone)]
struct Button {
    rect: Rect,
    label: String,
    action: UiAction,
    state: ButtonState,
}

#[derive(Debug, Clone)]
struct Slider {
    rect: Rect,
    min: f64,
    max: f64,
    value: f64,
    controller: usize,
}

impl Slider {
    fn value_at(&self, x: f64) -> f64 {
        let t = ((x - self.rect.x) / self.rect.width).clamp(0.0, 1.0);
        self.min + t * (self.max - self.min)
    }

    fn fraction(&self) -> f64 {
        if self.max > self.min {
            ((self.value - self.min) / (self.max - self.min)).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone)]
struct Dropdown {
    rect: Rect,
    options: Vec<String>,
    selected: usize,
    open: bool,
    controller: usize,
}

impl Dropdown {
    fn option_rect(&self, index: usize) -> Rect {
        Rect::new(
            self.rect.x,
            self.rect.y - (index as f64 + 1.0) * self.rect.height,
            self.rect.width,
            self.rect.height,
        )
    }
}

#[derive(Debug, Clone)]
struct Label {
    anchor: Point,
    text: String,
}

#[derive(Debug, Clone)]
enum Widget {
    Button(Button),
    Slider(Slider),
    Dropdown(Dropdown),
    Label(Label),
}

#[derive(Debug, Clone, Copy)]
enum ControllerWidgets {
    Num { value: WidgetId, slider: WidgetId },
    Cat { dropdown: WidgetId },
}

impl ControllerWidgets {
    fn focus_target(&self) -> WidgetId {
        match *self {
            ControllerWidgets::Num { slider, .. } => slider,
            ControllerWidgets::Cat { dropdown } => dropdown,
        }
    }
}

pub struct WidgetManager {
    theme: Theme,
    widgets: Vec<Widget>,
    controllers: Vec<ControllerWidgets>,
    focus: Option<usize>,
    pressed: Option<WidgetId>,
    dragging: Option<WidgetId>,
}

impl WidgetManager {
    pub fn new(theme: Theme) -> Self {
        Self {
            theme,
            widgets: Vec::new(),
            controllers: Vec::new(),
            focus: None,
            pressed: None,
            dragging: None,
        }
    }

    fn push(&mut self, widget: Widget) -> WidgetId {
        self.widgets.push(widget);
        WidgetId(self.widgets.len() - 1)
    }

    pub fn add_button(&mut self, rect: Rect, label: impl Into<String>, action: UiAction) -> WidgetId {
        self.push(Widget::Button(Button {
            rect,
            label: label.into(),
            action,
            state: ButtonState::Normal,
        }))
    }

    pub fn add_label(&mut self, anchor: Point, text: impl Into<String>) -> WidgetId {
        self.push(Widget::Label(Label {
            anchor,
            text: text.into(),
        }))
    }

    /// Label, steppers, value text and slider for the next controller index.
    pub fn add_num_controller(
        &mut self,
        rects: &NumControllerRects,
        label: &str,
        range: (f64, f64),
        value: f64,
        value_text: &str,
    ) -> usize {
        let controller = self.controllers.len();
        self.add_label(rects.label, label);
        self.add_button(rects.decrease, "-", UiAction::Decrease(controller));
        self.add_button(rects.increase, "+", UiAction::Increase(controller));
        let value_id = self.add_label(rects.value, value_text);
        let slider = self.push(Widget::Slider(Slider {
            rect: rects.slider,
            min: range.0,
            max: range.1,
            value,
            controller,
        }));
        self.controllers.push(ControllerWidgets::Num {
            value: value_id,
            slider,
        });
        controller
    }

    /// Label and dropdown for the next controller index.
    pub fn add_cat_controller(
        &mut self,
        rects: &CatControllerRects,
        label: &str,
        options: Vec<String>,
        selected: usize,
    ) -> usize {
        let controller = self.controllers.len();
        self.add_label(rects.label, label);
        let dropdown = self.push(Widget::Dropdown(Dropdown {
            rect: rects.dropdown,
            options,
            selected,
            open: false,
            controller,
        }));
        self.controllers.push(ControllerWidgets::Cat { dropdown });
        controller
    }

    pub fn set_button_label(&mut self, id: WidgetId, text: &str) {
        if let Some(Widget::Button(button)) = self.widgets.get_mut(id.0) {
            button.label = text.to_string();
        }
    }

    pub fn button_label(&self, id: WidgetId) -> Option<&str> {
        match self.widgets.get(id.0) {
            Some(Widget::Button(button)) => Some(&button.label),
            _ => None,
        }
    }

    /// Push a numeric controller's current value into its slider and value text.
    pub fn sync_num(&mut self, controller: usize, value: f64, text: &str) {
        let Some(ControllerWidgets::Num { value: label, slider }) =
            self.controllers.get(controller).copied()
        else {
            return;
        };
        if let Some(Widget::Label(l)) = self.widgets.get_mut(label.0) {
            l.text = text.to_string();
        }
        if let Some(Widget::Slider(s)) = self.widgets.get_mut(slider.0) {
            s.value = value;
        }
    }

    pub fn sync_cat(&mut self, controller: usize, selected: usize) {
        let Some(ControllerWidgets::Cat { dropdown }) = self.controllers.get(controller).copied()
        else {
            return;
        };
        if let Some(Widget::Dropdown(d)) = self.widgets.get_mut(dropdown.0) {
            d.selected = selected;
        }
    }

    /// Text shown next to a numeric controller.
    pub fn value_text(&self, controller: usize) -> Option<&str> {
        let ControllerWidgets::Num { value, .. } = self.controllers.get(controller)? else {
            return None;
        };
        match self.widgets.get(value.0)? {
            Widget::Label(label) => Some(&label.text),
            _ => None,
        }
    }

    /// Track rectangle of a numeric controller's slider.
    pub fn slider_rect(&self, controller: usize) -> Option<Rect> {
        let ControllerWidgets::Num { slider, .. } = self.controllers.get(controller)? else {
            return None;
        };
        match self.widgets.get(slider.0)? {
            Widget::Slider(s) => Some(s.rect),
            _ => None,
        }
    }

    /// Option index currently shown by a categorical controller's dropdown.
    pub fn selected_option(&self, controller: usize) -> Option<usize> {
        let ControllerWidgets::Cat { dropdown } = self.controllers.get(controller)? else {
            return None;
        };
        match self.widgets.get(dropdown.0)? {
            Widget::Dropdown(d) => Some(d.selected),
            _ => None,
        }
    }

    pub fn focus(&self) -> Option<usize> {
        self.focus
    }

    fn open_dropdown(&self) -> Option<usize> {
        self.widgets
            .iter()
            .position(|w| matches!(w, Widget::Dropdown(d) if d.open))
    }

    fn hit(&self, p: Point) -> Option<usize> {
        self.widgets.iter().rposition(|w| match w {
            Widget::Button(b) => b.rect.contains(p),
            Widget::Slider(s) => s.rect.contains(p),
            Widget::Dropdown(d) => d.rect.contains(p),
            Widget::Label(_) => false,
        })
    }

    pub fn on_mouse_move(&mut self, p: Point) {
        for widget in &mut self.widgets {
            if let Widget::Button(b) = widget
                && b.state != ButtonState::Press
            {
                b.state = if b.rect.contains(p) {
                    ButtonState::Hover
                } else {
                    ButtonState::Normal
                };
            }
        }
    }

    pub fn on_mouse_press(&mut self, p: Point) -> Option<UiAction> {
        if let Some(idx) = self.open_dropdown() {
            let Widget::Dropdown(d) = &mut self.widgets[idx] else {
                return None;
            };
            d.open = false;
            let picked = (0..d.options.len()).find(|i| d.option_rect(*i).contains(p));
            return picked.map(|option| UiAction::Select {
                controller: d.controller,
                option,
            });
        }

        let idx = self.hit(p)?;
        match &mut self.widgets[idx] {
            Widget::Button(b) => {
                b.state = ButtonState::Press;
                self.pressed = Some(WidgetId(idx));
                None
            }
            Widget::Slider(s) => {
                let controller = s.controller;
                let value = s.value_at(p.x);
                self.dragging = Some(WidgetId(idx));
                self.focus = Some(controller);
                Some(UiAction::Slide { controller, value })
            }
            Widget::Dropdown(d) => {
                d.open = true;
                self.focus = Some(d.controller);
                None
            }
            Widget::Label(_) => None,
        }
    }

    pub fn on_mouse_drag(&mut self, p: Point) -> Option<UiAction> {
        let WidgetId(idx) = self.dragging?;
        match self.widgets.get(idx)? {
            Widget::Slider(s) => Some(UiAction::Slide {
                controller: s.controller,
                value: s.value_at(p.x),
            }),
            _ => None,
        }
    }

    pub fn on_mouse_release(&mut self, p: Point) -> Option<UiAction> {
        self.dragging = None;
        let WidgetId(idx) = self.pressed.take()?;
        let Some(Widget::Button(b)) = self.widgets.get_mut(idx) else {
            return None;
        };
        let inside = b.rect.contains(p);
        b.state = if inside {
            ButtonState::Hover
        } else {
            ButtonState::Normal
        };
        inside.then_some(b.action)
    }

    pub fn on_key(&mut self, key: UiKey) -> Option<UiAction> {
        match key {
            UiKey::Space => Some(UiAction::TogglePlay),
            UiKey::Char('s') => Some(UiAction::Step),
            UiKey::Char('r') => Some(UiAction::Reset),
            UiKey::Tab | UiKey::BackTab => {
                let count = self.controllers.len();
                if count > 0 {
                    self.focus = Some(match (self.focus, key) {
                        (None, UiKey::Tab) => 0,
                        (None, _) => count - 1,
                        (Some(i), UiKey::Tab) => (i + 1) % count,
                        (Some(i), _) => (i + count - 1) % count,
                    });
                }
                None
            }
            UiKey::Left | UiKey::Right | UiKey::Up | UiKey::Down => {
                let controller = self.focus?;
                match self.controllers.get(controller)? {
                    ControllerWidgets::Num { .. } => match key {
                        UiKey::Left => Some(UiAction::Decrease(controller)),
                        UiKey::Right => Some(UiAction::Increase(controller)),
                        _ => None,
                    },
                    ControllerWidgets::Cat { dropdown } => {
                        let Some(Widget::Dropdown(d)) = self.widgets.get(dropdown.0) else {
                            return None;
                        };
                        let option = match key {
                            UiKey::Left | UiKey::Up => d.selected.checked_sub(1)?,
                            _ => d.selected + 1,
                        };
                        if option >= d.options.len() {
                            warn!(controller, option, "dropdown option out of range");
                            return None;
                        }
                        Some(UiAction::Select { controller, option })
                    }
                }
            }
            UiKey::Char(_) => None,
        }
    }

    fn draw_button(&self, scene: &mut Scene, button: &Button) {
        let ButtonStyle {
            font_color,
            bg,
            border,
            border_width,
        } = match button.state {
            ButtonState::Normal => self.theme.button.normal,
            ButtonState::Hover => self.theme.button.hover,
            ButtonState::Press => self.theme.button.press,
        };
        let font = self.theme.font_size;
        scene.fill_rect(button.rect, bg);
        scene.outline_rect(button.rect, border, border_width);
        let text_width = button.label.chars().count() as f64 * font * 0.6;
        scene.text(
            Point::new(
                button.rect.x + (button.rect.width - text_width) / 2.0,
                button.rect.y + (button.rect.height - font) / 2.0,
            ),
            button.label.clone(),
            font_color,
            font,
        );
    }

    fn draw_slider(&self, scene: &mut Scene, slider: &Slider) {
        let r = slider.rect;
        let track = Rect::new(r.x, r.y + r.height / 3.0, r.width, r.height / 3.0);
        scene.fill_rect(track, self.theme.slider_track);
        let filled = Rect::new(track.x, track.y, track.width * slider.fraction(), track.height);
        scene.fill_rect(filled, self.theme.slider_fill);
        scene.circle(
            Point::new(filled.right(), r.y + r.height / 2.0),
            r.height / 2.0,
            self.theme.slider_handle,
        );
    }

    fn draw_dropdown_list(&self, scene: &mut Scene, dropdown: &Dropdown) {
        let font = self.theme.font_size;
        for (i, option) in dropdown.options.iter().enumerate() {
            let rect = dropdown.option_rect(i);
            let bg = if i == dropdown.selected {
                self.theme.dropdown_highlight
            } else {
                self.theme.dropdown_bg
            };
            scene.fill_rect(rect, bg);
            scene.text(
                Point::new(rect.x + font * 0.5, rect.y + (rect.height - font) / 2.0),
                option.clone(),
                self.theme.font_color,
                font,
            );
        }
    }

    pub fn draw(&self, scene: &mut Scene) {
        let font = self.theme.font_size;
        for widget in &self.widgets {
            match widget {
                Widget::Button(b) => self.draw_button(scene, b),
                Widget::Slider(s) => self.draw_slider(scene, s),
                Widget::Dropdown(d) => {
                    scene.fill_rect(d.rect, self.theme.dropdown_bg);
                    scene.outline_rect(d.rect, self.theme.button.normal.border, 1.0);
                    if let Some(text) = d.options.get(d.selected) {
                        scene.text(
                            Point::new(d.rect.x + font * 0.5, d.rect.y + (d.rect.height - font) / 2.0),
                            text.clone(),
                            self.theme.font_color,
                            font,
                        );
                    }
                }
                Widget::Label(l) => scene.text(l.anchor, l.text.clone(), self.theme.font_color, font),
            }
        }

        if let Some(target) = self
            .focus
            .and_then(|c| self.controllers.get(c))
            .map(ControllerWidgets::focus_target)
        {
            let rect = match self.widgets.get(target.0) {
                Some(Widget::Slider(s)) => Some(s.rect),
                Some(Widget::Dropdown(d)) => Some(d.rect),
                _ => None,
            };
            if let Some(rect) = rect {
                scene.outline_rect(rect, self.theme.focus, 1.0);
            }
        }

        if let Some(Widget::Dropdown(d)) = self.open_dropdown().map(|i| &self.widgets[i]) {
            self.draw_dropdown_list(scene, d);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgba;
    use crate::layout::LayoutMetrics;

    fn manager() -> (WidgetManager, LayoutMetrics) {
        let metrics = LayoutMetrics::new(1200.0, 720.0);
        (WidgetManager::new(Theme::new(metrics.font_size)), metrics)
    }

    #[test]
    fn button_fires_on_release_inside() {
        let (mut ui, metrics) = manager();
        let [play, ..] = metrics.default_buttons();
        let id = ui.add_button(play, "Play", UiAction::TogglePlay);

        assert_eq!(ui.on_mouse_press(play.center()), None);
        assert_eq!(ui.on_mouse_release(play.center()), Some(UiAction::TogglePlay));

        ui.on_mouse_press(play.center());
        assert_eq!(ui.on_mouse_release(Point::new(0.0, 0.0)), None);

        ui.set_button_label(id, "Pause");
        assert_eq!(ui.button_label(id), Some("Pause"));
    }

    #[test]
    fn slider_press_and_drag_emit_raw_positions() {
        let (mut ui, metrics) = manager();
        let rects = metrics.num_controller(1);
        let controller = ui.add_num_controller(&rects, "fps", (5.0, 60.0), 40.0, "40");
        let track = ui.slider_rect(controller).expect("slider");

        let start = ui.on_mouse_press(Point::new(track.x, track.center().y));
        assert_eq!(start, Some(UiAction::Slide { controller, value: 5.0 }));
        let end = ui.on_mouse_drag(Point::new(track.right() + 50.0, track.center().y));
        assert_eq!(end, Some(UiAction::Slide { controller, value: 60.0 }));
        ui.on_mouse_release(Point::new(0.0, 0.0));
        assert_eq!(ui.on_mouse_drag(Point::new(track.x, track.y)), None);
        assert_eq!(ui.focus(), Some(controller));
    }

    #[test]
    fn dropdown_opens_then_selects() {
        let (mut ui, metrics) = manager();
        let rects = metrics.cat_controller(3);
        let controller =
            ui.add_cat_controller(&rects, "mode", vec!["a".into(), "b".into(), "c".into()], 0);

        assert_eq!(ui.on_mouse_press(rects.dropdown.center()), None);
        let second = Rect::new(
            rects.dropdown.x,
            rects.dropdown.y - 2.0 * rects.dropdown.height,
            rects.dropdown.width,
            rects.dropdown.height,
        );
        assert_eq!(
            ui.on_mouse_press(second.center()),
            Some(UiAction::Select {
                controller,
                option: 1
            })
        );
        assert_eq!(ui.on_mouse_press(Point::new(1.0, 1.0)), None);
    }

    #[test]
    fn keyboard_focus_drives_controllers() {
        let (mut ui, metrics) = manager();
        let num = ui.add_num_controller(&metrics.num_controller(1), "n", (0.0, 10.0), 5.0, "5");
        let cat = ui.add_cat_controller(
            &metrics.cat_controller(2),
            "mode",
            vec!["a".into(), "b".into()],
            1,
        );

        assert_eq!(ui.on_key(UiKey::Space), Some(UiAction::TogglePlay));
        assert_eq!(ui.on_key(UiKey::Char('s')), Some(UiAction::Step));
        assert_eq!(ui.on_key(UiKey::Right), None);

        ui.on_key(UiKey::Tab);
        assert_eq!(ui.focus(), Some(num));
        assert_eq!(ui.on_key(UiKey::Right), Some(UiAction::Increase(num)));
        assert_eq!(ui.on_key(UiKey::Left), Some(UiAction::Decrease(num)));

        ui.on_key(UiKey::Tab);
        assert_eq!(ui.focus(), Some(cat));
        assert_eq!(
            ui.on_key(UiKey::Up),
            Some(UiAction::Select {
                controller: cat,
                option: 0
            })
        );
        assert_eq!(ui.on_key(UiKey::Down), None);
        ui.on_key(UiKey::BackTab);
        assert_eq!(ui.focus(), Some(num));
    }

    #[test]
    fn sync_updates_value_text() {
        let (mut ui, metrics) = manager();
        let c = ui.add_num_controller(&metrics.num_controller(1), "n", (0.0, 10.0), 5.0, "5");
        ui.sync_num(c, 7.0, "7");
        assert_eq!(ui.value_text(c), Some("7"));
        let mut scene = Scene::new(1200.0, 720.0, Rgba::WHITE);
        ui.draw(&mut scene);
        assert!(scene.texts().any(|t| t == "7"));
    }
}
