//! FigureWidget - A self-contained egui widget that paints a [`Figure`]
//!
//! The widget owns its figure and the GPU textures built from it. Multiple
//! instances can be used side-by-side without sharing state.

use std::f32::consts::FRAC_PI_2;

use egui::epaint::TextShape;
use egui::{
    Align2, Color32, FontId, Painter, Pos2, Rect, Response, Shape, Stroke, StrokeKind,
    TextureHandle, TextureOptions, Ui, Vec2,
};

use crate::figure::{format_scientific, Figure, SliceFigure, SpectrumFigure};
use crate::transform::{self, LogAxis};

/// Height reserved above the grid for titles
const TITLE_HEIGHT: f32 = 18.0;
/// Height reserved below the grid for colorbar tick labels
const TICK_LABEL_HEIGHT: f32 = 16.0;
/// Length of tick marks in pixels
const TICK_LENGTH: f32 = 4.0;
/// Spectrum plot margins: left, right, top, bottom
const PLOT_MARGINS: (f32, f32, f32, f32) = (64.0, 12.0, 12.0, 44.0);
/// Width of spectrum curves
const CURVE_WIDTH: f32 = 1.5;
/// Length of the line sample in legend entries
const LEGEND_SAMPLE: f32 = 20.0;

const FIGURE_BG: Color32 = Color32::WHITE;
const FIGURE_FG: Color32 = Color32::from_gray(30);

/// Value under the pointer
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum HoverInfo {
    /// A pixel of a slice panel
    Pixel {
        field: usize,
        channel: usize,
        x: usize,
        y: usize,
        value: f64,
    },
    /// A position along a field's colorbar
    Colorbar { field: usize, value: f64 },
}

impl HoverInfo {
    pub fn label(&self) -> String {
        match *self {
            HoverInfo::Pixel {
                field,
                channel,
                x,
                y,
                value,
            } => format!(
                "field {}, channel {}, ({}, {}): {}",
                field,
                channel,
                x,
                y,
                format_scientific(value)
            ),
            HoverInfo::Colorbar { field, value } => {
                format!("field {} colorbar: {}", field, format_scientific(value))
            }
        }
    }
}

/// A self-contained widget for viewing one figure.
pub struct FigureWidget {
    figure: Option<Figure>,
    /// Slice textures, indexed [field][channel]
    panel_textures: Vec<Vec<TextureHandle>>,
    /// One colorbar texture per field
    colorbar_textures: Vec<TextureHandle>,
    /// Flag indicating textures need rebuild
    texture_dirty: bool,
    hover_info: Option<HoverInfo>,
}

impl Default for FigureWidget {
    fn default() -> Self {
        Self::new()
    }
}

impl FigureWidget {
    /// Create a new empty widget
    pub fn new() -> Self {
        Self {
            figure: None,
            panel_textures: Vec::new(),
            colorbar_textures: Vec::new(),
            texture_dirty: false,
            hover_info: None,
        }
    }

    /// Replace the displayed figure
    pub fn set_figure(&mut self, figure: Figure) {
        self.figure = Some(figure);
        self.texture_dirty = true;
        self.hover_info = None;
    }

    /// Drop the figure and its textures
    pub fn clear(&mut self) {
        self.figure = None;
        self.panel_textures.clear();
        self.colorbar_textures.clear();
        self.texture_dirty = false;
        self.hover_info = None;
    }

    pub fn has_figure(&self) -> bool {
        self.figure.is_some()
    }

    pub fn figure(&self) -> Option<&Figure> {
        self.figure.as_ref()
    }

    pub fn hover_info(&self) -> Option<HoverInfo> {
        self.hover_info
    }

    fn rebuild_textures(&mut self, ctx: &egui::Context) {
        self.panel_textures.clear();
        self.colorbar_textures.clear();

        let Some(Figure::Slices(fig)) = &self.figure else {
            return;
        };
        for (f, column) in fig.columns.iter().enumerate() {
            let textures = column
                .panels
                .iter()
                .map(|panel| {
                    ctx.load_texture(
                        format!("slice_{}_{}", f, panel.channel),
                        panel.raster.to_color_image(),
                        TextureOptions::NEAREST,
                    )
                })
                .collect();
            self.panel_textures.push(textures);
            self.colorbar_textures.push(ctx.load_texture(
                format!("colorbar_{}", f),
                column.colorbar.raster.to_color_image(),
                TextureOptions::LINEAR,
            ));
        }
    }

    /// Show the widget, rendering into the given UI with a specified container size.
    pub fn show(&mut self, ui: &mut Ui, container_size: Vec2) -> Response {
        let ctx = ui.ctx().clone();

        if self.texture_dirty {
            self.texture_dirty = false;
            self.rebuild_textures(&ctx);
        }

        let (rect, response) = ui.allocate_exact_size(container_size, egui::Sense::hover());
        let painter = ui.painter_at(rect);

        let hover = match &self.figure {
            None => {
                painter.text(
                    rect.center(),
                    Align2::CENTER_CENTER,
                    "No figure",
                    FontId::default(),
                    ui.style().visuals.text_color(),
                );
                None
            }
            Some(Figure::Slices(fig)) => {
                painter.rect_filled(rect, 0.0, FIGURE_BG);
                self.paint_slices(&painter, rect, fig, response.hover_pos())
            }
            Some(Figure::Spectra(fig)) => {
                painter.rect_filled(rect, 0.0, FIGURE_BG);
                paint_spectra(&painter, rect, fig);
                None
            }
        };
        self.hover_info = hover;

        self.render_hover_overlay(&ctx, rect);
        response
    }

    fn paint_slices(
        &self,
        painter: &Painter,
        rect: Rect,
        fig: &SliceFigure,
        hover_pos: Option<Pos2>,
    ) -> Option<HoverInfo> {
        let has_titles = fig.columns.iter().any(|c| c.title.is_some());
        let mut grid_rect = rect;
        if has_titles {
            grid_rect.min.y += TITLE_HEIGHT;
        }
        grid_rect.max.y -= TICK_LABEL_HEIGHT;

        let mut hover = None;
        let frame = Stroke::new(1.0, Color32::GRAY);

        for (f, column) in fig.columns.iter().enumerate() {
            for (c, panel) in column.panels.iter().enumerate() {
                let Some(texture) = self.panel_textures.get(f).and_then(|t| t.get(c)) else {
                    continue;
                };
                let cell = fig.layout.cell_rect(grid_rect, c, f);
                let size = transform::fit_aspect(panel.raster.width, panel.raster.height, cell.size());
                let image_rect = Rect::from_center_size(cell.center(), size);

                // Flip Y so row 0 is at the bottom
                painter.image(
                    texture.id(),
                    image_rect,
                    Rect::from_min_max(egui::pos2(0.0, 1.0), egui::pos2(1.0, 0.0)),
                    Color32::WHITE,
                );
                painter.rect_stroke(image_rect, 0.0, frame, StrokeKind::Outside);

                if c == 0 {
                    if let Some(title) = &column.title {
                        painter.text(
                            image_rect.center_top() - egui::vec2(0.0, 3.0),
                            Align2::CENTER_BOTTOM,
                            title,
                            FontId::proportional(12.0),
                            FIGURE_FG,
                        );
                    }
                }

                if let Some(pos) = hover_pos {
                    let image_size = (panel.raster.width, panel.raster.height);
                    if let Some((x, y)) = transform::screen_to_image(pos, image_rect, image_size) {
                        if let Some(&value) = panel.values.get([y, x]) {
                            hover = Some(HoverInfo::Pixel {
                                field: f,
                                channel: panel.channel,
                                x,
                                y,
                                value,
                            });
                        }
                    }
                }
            }

            if let Some(texture) = self.colorbar_textures.get(f) {
                let cell = fig.layout.cell_rect(grid_rect, fig.colorbar_row(), f);
                let bar_rect = cell.shrink2(egui::vec2(cell.width() * 0.05, 0.0));
                painter.image(
                    texture.id(),
                    bar_rect,
                    Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                    Color32::WHITE,
                );
                painter.rect_stroke(bar_rect, 0.0, frame, StrokeKind::Outside);

                if let Some(pos) = hover_pos.filter(|p| bar_rect.contains(*p)) {
                    let t = ((pos.x - bar_rect.min.x) / bar_rect.width()).clamp(0.0, 1.0);
                    hover = Some(HoverInfo::Colorbar {
                        field: f,
                        value: column.colorbar.norm.invert(t as f64),
                    });
                }

                for tick in &column.colorbar.ticks {
                    let x = bar_rect.min.x + tick.position as f32 * bar_rect.width();
                    painter.line_segment(
                        [egui::pos2(x, bar_rect.max.y), egui::pos2(x, bar_rect.max.y + TICK_LENGTH)],
                        Stroke::new(1.0, FIGURE_FG),
                    );
                    painter.text(
                        egui::pos2(x, bar_rect.max.y + TICK_LENGTH),
                        Align2::CENTER_TOP,
                        &tick.label,
                        FontId::proportional(9.0),
                        FIGURE_FG,
                    );
                }
            }
        }
        hover
    }

    /// Render hover info overlay at bottom-left of widget
    fn render_hover_overlay(&self, ctx: &egui::Context, widget_rect: Rect) {
        if let Some(info) = self.hover_info {
            egui::Area::new(egui::Id::new("hover_overlay"))
                .fixed_pos(egui::pos2(widget_rect.min.x + 10.0, widget_rect.max.y - 30.0))
                .show(ctx, |ui| {
                    egui::Frame::popup(ui.style()).show(ui, |ui| {
                        ui.style_mut().wrap_mode = Some(egui::TextWrapMode::Extend);
                        ui.label(info.label());
                    });
                });
        }
    }
}

/// Paint log-log axes, curves and legend of a spectrum figure
fn paint_spectra(painter: &Painter, rect: Rect, fig: &SpectrumFigure) {
    let (left, right, top, bottom) = PLOT_MARGINS;
    let plot_rect = Rect::from_min_max(
        egui::pos2(rect.min.x + left, rect.min.y + top),
        egui::pos2(rect.max.x - right, rect.max.y - bottom),
    );
    let axis_stroke = Stroke::new(1.0, FIGURE_FG);
    painter.rect_stroke(plot_rect, 0.0, axis_stroke, StrokeKind::Middle);

    let label_font = FontId::proportional(12.0);
    let tick_font = FontId::proportional(10.0);

    painter.text(
        plot_rect.center_bottom() + egui::vec2(0.0, 22.0),
        Align2::CENTER_TOP,
        &fig.x_label,
        label_font.clone(),
        FIGURE_FG,
    );
    let galley = painter.layout_no_wrap(fig.y_label.clone(), label_font, FIGURE_FG);
    let y_label_pos = egui::pos2(rect.min.x + 4.0, plot_rect.center().y + galley.size().x / 2.0);
    painter.add(TextShape::new(y_label_pos, galley, FIGURE_FG).with_angle(-FRAC_PI_2));

    let (Some(x_axis), Some(y_axis)) = (fig.x_axis, fig.y_axis) else {
        painter.text(
            plot_rect.center(),
            Align2::CENTER_CENTER,
            "no positive power to plot",
            tick_font,
            FIGURE_FG,
        );
        return;
    };

    for t in x_axis.decade_ticks() {
        if let Some(u) = x_axis.to_unit(t) {
            let x = plot_rect.min.x + u as f32 * plot_rect.width();
            painter.line_segment(
                [egui::pos2(x, plot_rect.max.y), egui::pos2(x, plot_rect.max.y - TICK_LENGTH)],
                axis_stroke,
            );
            painter.text(
                egui::pos2(x, plot_rect.max.y + 2.0),
                Align2::CENTER_TOP,
                decade_label(t),
                tick_font.clone(),
                FIGURE_FG,
            );
        }
    }
    for t in y_axis.decade_ticks() {
        if let Some(u) = y_axis.to_unit(t) {
            let y = plot_rect.max.y - u as f32 * plot_rect.height();
            painter.line_segment(
                [egui::pos2(plot_rect.min.x, y), egui::pos2(plot_rect.min.x + TICK_LENGTH, y)],
                axis_stroke,
            );
            painter.text(
                egui::pos2(plot_rect.min.x - 3.0, y),
                Align2::RIGHT_CENTER,
                decade_label(t),
                tick_font.clone(),
                FIGURE_FG,
            );
        }
    }

    let clipped = painter.with_clip_rect(plot_rect);
    for curve in &fig.curves {
        let points = curve_points(&curve.k, &curve.power, &x_axis, &y_axis, plot_rect);
        if points.len() >= 2 {
            clipped.add(Shape::line(points, Stroke::new(CURVE_WIDTH, curve.color)));
        }
    }

    if fig.legend {
        paint_legend(painter, plot_rect, fig, &tick_font);
    }
}

/// Screen points of a curve; non-positive samples are skipped
fn curve_points(k: &[f64], power: &[f64], x_axis: &LogAxis, y_axis: &LogAxis, plot_rect: Rect) -> Vec<Pos2> {
    k.iter()
        .zip(power)
        .filter_map(|(&x, &y)| transform::data_to_screen(x, y, x_axis, y_axis, plot_rect))
        .collect()
}

fn paint_legend(painter: &Painter, plot_rect: Rect, fig: &SpectrumFigure, font: &FontId) {
    let entries: Vec<_> = fig
        .curves
        .iter()
        .filter_map(|c| {
            let label = c.label.as_ref()?;
            Some((c.color, painter.layout_no_wrap(label.clone(), font.clone(), FIGURE_FG)))
        })
        .collect();
    if entries.is_empty() {
        return;
    }

    let pad = 6.0;
    let row_height = entries.iter().map(|(_, g)| g.size().y).fold(0.0, f32::max) + 2.0;
    let text_width = entries.iter().map(|(_, g)| g.size().x).fold(0.0, f32::max);
    let size = egui::vec2(
        LEGEND_SAMPLE + pad * 3.0 + text_width,
        row_height * entries.len() as f32 + pad * 2.0,
    );
    let legend_rect = Rect::from_min_size(
        egui::pos2(plot_rect.max.x - size.x - pad, plot_rect.min.y + pad),
        size,
    );
    painter.rect_filled(legend_rect, 3.0, Color32::from_white_alpha(220));
    painter.rect_stroke(legend_rect, 3.0, Stroke::new(1.0, Color32::LIGHT_GRAY), StrokeKind::Inside);

    for (i, (color, galley)) in entries.into_iter().enumerate() {
        let y = legend_rect.min.y + pad + row_height * (i as f32 + 0.5);
        let x0 = legend_rect.min.x + pad;
        painter.line_segment(
            [egui::pos2(x0, y), egui::pos2(x0 + LEGEND_SAMPLE, y)],
            Stroke::new(CURVE_WIDTH, color),
        );
        let text_pos = egui::pos2(x0 + LEGEND_SAMPLE + pad, y - galley.size().y / 2.0);
        painter.galley(text_pos, galley, FIGURE_FG);
    }
}

/// Label for a power-of-ten tick
fn decade_label(v: f64) -> String {
    let e = v.log10().round() as i32;
    match e {
        0 => "1".to_string(),
        1 => "10".to_string(),
        _ => format!("1e{}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decade_labels() {
        assert_eq!(decade_label(1.0), "1");
        assert_eq!(decade_label(10.0), "10");
        assert_eq!(decade_label(1000.0), "1e3");
        assert_eq!(decade_label(0.01), "1e-2");
    }

    #[test]
    fn test_curve_points_skip_non_positive() {
        let axis = LogAxis { min: 0.1, max: 100.0 };
        let rect = Rect::from_min_size(Pos2::ZERO, Vec2::new(100.0, 100.0));
        let pts = curve_points(&[1.0, 2.0, 3.0], &[1.0, 0.0, 5.0], &axis, &axis, rect);
        assert_eq!(pts.len(), 2);
        assert!(pts[0].x < pts[1].x);
    }

    #[test]
    fn test_hover_labels() {
        let pixel = HoverInfo::Pixel {
            field: 1,
            channel: 0,
            x: 3,
            y: 4,
            value: 0.5,
        };
        assert_eq!(pixel.label(), "field 1, channel 0, (3, 4): 0.5");
        let bar = HoverInfo::Colorbar { field: 0, value: 2.0 };
        assert_eq!(bar.label(), "field 0 colorbar: 2");
    }

    #[test]
    fn test_new_widget_is_empty() {
        let mut w = FigureWidget::new();
        assert!(!w.has_figure());
        assert!(w.hover_info().is_none());
        w.clear();
        assert!(w.figure().is_none());
    }
}
