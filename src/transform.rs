//! Coordinate transformation logic for figure layout and plot axes
//!
//! This module contains pure coordinate transformation logic that can be
//! easily unit tested without a running egui context.

use egui::{Pos2, Rect, Vec2};

/// Fraction of the log-space data span added on each side of a log axis
pub const AXIS_MARGIN: f64 = 0.05;

/// Grid of figure cells with per-row height ratios and equal-width columns
#[derive(Clone, Debug, PartialEq)]
pub struct GridLayout {
    /// Relative row heights, top to bottom
    pub height_ratios: Vec<f32>,
    pub cols: usize,
    /// Gap between neighbouring cells, in pixels
    pub gap: f32,
}

impl GridLayout {
    pub fn new(height_ratios: Vec<f32>, cols: usize, gap: f32) -> Self {
        Self {
            height_ratios,
            cols,
            gap,
        }
    }

    pub fn rows(&self) -> usize {
        self.height_ratios.len()
    }

    /// Screen rect of cell (row, col) inside `outer`
    pub fn cell_rect(&self, outer: Rect, row: usize, col: usize) -> Rect {
        let rows = self.rows().max(1);
        let cols = self.cols.max(1);

        let usable_w = (outer.width() - self.gap * (cols - 1) as f32).max(0.0);
        let usable_h = (outer.height() - self.gap * (rows - 1) as f32).max(0.0);
        let total_ratio: f32 = self.height_ratios.iter().sum();

        let cell_w = usable_w / cols as f32;
        let scale = if total_ratio > 0.0 { usable_h / total_ratio } else { 0.0 };

        let above: f32 = self.height_ratios[..row.min(self.rows())].iter().sum();
        let height = self.height_ratios.get(row).copied().unwrap_or(0.0) * scale;

        let min = Pos2::new(
            outer.min.x + col as f32 * (cell_w + self.gap),
            outer.min.y + above * scale + row as f32 * self.gap,
        );
        Rect::from_min_size(min, Vec2::new(cell_w, height))
    }
}

/// Largest size with the image's aspect ratio that fits inside `available`
pub fn fit_aspect(image_width: usize, image_height: usize, available: Vec2) -> Vec2 {
    if image_width == 0 || image_height == 0 || available.x <= 0.0 || available.y <= 0.0 {
        return Vec2::ZERO;
    }
    let img_aspect = image_width as f32 / image_height as f32;
    let available_aspect = available.x / available.y;

    if img_aspect > available_aspect {
        Vec2::new(available.x, available.x / img_aspect)
    } else {
        Vec2::new(available.y * img_aspect, available.y)
    }
}

/// Logarithmic axis over a positive data range
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LogAxis {
    pub min: f64,
    pub max: f64,
}

impl LogAxis {
    /// Fit an axis around the positive finite values, padding by
    /// [`AXIS_MARGIN`] in log space. `None` if there are no such values.
    pub fn fit<I>(values: I) -> Option<LogAxis>
    where
        I: IntoIterator<Item = f64>,
    {
        let (lo, hi) = values
            .into_iter()
            .filter(|v| v.is_finite() && *v > 0.0)
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
        if !lo.is_finite() {
            return None;
        }

        let (a, b) = (lo.log10(), hi.log10());
        let span = if b > a { b - a } else { 1.0 };
        let pad = span * AXIS_MARGIN;
        Some(LogAxis {
            min: 10f64.powf(a - pad),
            max: 10f64.powf(b + pad),
        })
    }

    /// Position of `v` along the axis in [0, 1]; `None` for non-positive values
    pub fn to_unit(&self, v: f64) -> Option<f64> {
        if !(v.is_finite() && v > 0.0) {
            return None;
        }
        let (a, b) = (self.min.log10(), self.max.log10());
        Some((v.log10() - a) / (b - a))
    }

    /// Powers of ten within the axis range
    pub fn decade_ticks(&self) -> Vec<f64> {
        let first = self.min.log10().ceil() as i32;
        let last = self.max.log10().floor() as i32;
        (first..=last).map(|e| 10f64.powi(e)).collect()
    }
}

/// Map a data point to screen coordinates inside `plot_rect` (y grows upward)
pub fn data_to_screen(x: f64, y: f64, x_axis: &LogAxis, y_axis: &LogAxis, plot_rect: Rect) -> Option<Pos2> {
    let ux = x_axis.to_unit(x)? as f32;
    let uy = y_axis.to_unit(y)? as f32;
    Some(Pos2::new(
        plot_rect.min.x + ux * plot_rect.width(),
        plot_rect.max.y - uy * plot_rect.height(),
    ))
}

/// Convert a screen position to pixel coordinates of an image drawn in
/// `image_rect`. Y is flipped so that row 0 sits at the bottom.
pub fn screen_to_image(screen_pos: Pos2, image_rect: Rect, image_size: (usize, usize)) -> Option<(usize, usize)> {
    if !image_rect.contains(screen_pos) || image_rect.width() <= 0.0 || image_rect.height() <= 0.0 {
        return None;
    }

    let rel_x = (screen_pos.x - image_rect.min.x) / image_rect.width();
    // Flip Y: screen Y increases downward, but image Y=0 is at bottom
    let rel_y = 1.0 - (screen_pos.y - image_rect.min.y) / image_rect.height();

    // Clamp to [0, 1) to handle boundary conditions
    let rel_x = rel_x.clamp(0.0, 0.9999999);
    let rel_y = rel_y.clamp(0.0, 0.9999999);

    let img_x = (rel_x * image_size.0 as f32).floor() as usize;
    let img_y = (rel_y * image_size.1 as f32).floor() as usize;

    if img_x < image_size.0 && img_y < image_size.1 {
        Some((img_x, img_y))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outer() -> Rect {
        Rect::from_min_size(Pos2::ZERO, Vec2::new(400.0, 420.0))
    }

    #[test]
    fn test_grid_rows_follow_ratios() {
        let grid = GridLayout::new(vec![2.0, 2.0, 0.2], 2, 0.0);
        let r0 = grid.cell_rect(outer(), 0, 0);
        let r1 = grid.cell_rect(outer(), 1, 1);
        let bar = grid.cell_rect(outer(), 2, 0);

        assert!((r0.height() - 200.0).abs() < 0.01);
        assert!((bar.height() - 20.0).abs() < 0.01);
        assert!((r1.min.x - 200.0).abs() < 0.01);
        assert!((r1.min.y - 200.0).abs() < 0.01);
        assert!((bar.max.y - 420.0).abs() < 0.01);
    }

    #[test]
    fn test_grid_gaps() {
        let grid = GridLayout::new(vec![1.0, 1.0], 2, 10.0);
        let a = grid.cell_rect(outer(), 0, 0);
        let b = grid.cell_rect(outer(), 1, 1);
        assert!((b.min.x - a.max.x - 10.0).abs() < 0.01);
        assert!((b.min.y - a.max.y - 10.0).abs() < 0.01);
        assert!((b.max.x - 400.0).abs() < 0.01);
    }

    #[test]
    fn test_fit_aspect() {
        let wide = fit_aspect(200, 100, Vec2::new(100.0, 100.0));
        assert!((wide.x - 100.0).abs() < 0.01 && (wide.y - 50.0).abs() < 0.01);

        let square = fit_aspect(64, 64, Vec2::new(300.0, 120.0));
        assert!((square.x - 120.0).abs() < 0.01 && (square.y - 120.0).abs() < 0.01);

        assert_eq!(fit_aspect(0, 10, Vec2::new(1.0, 1.0)), Vec2::ZERO);
    }

    #[test]
    fn test_log_axis_fit_pads_in_log_space() {
        let axis = LogAxis::fit([1.0, 10.0, 100.0, 0.0, -5.0, f64::NAN]).unwrap();
        assert!((axis.min.log10() + 0.1).abs() < 1e-12);
        assert!((axis.max.log10() - 2.1).abs() < 1e-12);
        assert!(LogAxis::fit([0.0, -1.0]).is_none());
    }

    #[test]
    fn test_log_axis_single_value() {
        let axis = LogAxis::fit([5.0]).unwrap();
        assert!(axis.min < 5.0 && axis.max > 5.0);
        assert!((axis.to_unit(5.0).unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_decade_ticks() {
        let axis = LogAxis { min: 0.5, max: 2000.0 };
        assert_eq!(axis.decade_ticks(), vec![1.0, 10.0, 100.0, 1000.0]);
    }

    #[test]
    fn test_data_to_screen_corners() {
        let axis = LogAxis { min: 1.0, max: 100.0 };
        let rect = Rect::from_min_size(Pos2::new(10.0, 10.0), Vec2::new(100.0, 50.0));

        let lo = data_to_screen(1.0, 1.0, &axis, &axis, rect).unwrap();
        assert!((lo.x - 10.0).abs() < 0.01 && (lo.y - 60.0).abs() < 0.01);

        let hi = data_to_screen(100.0, 100.0, &axis, &axis, rect).unwrap();
        assert!((hi.x - 110.0).abs() < 0.01 && (hi.y - 10.0).abs() < 0.01);

        assert!(data_to_screen(0.0, 1.0, &axis, &axis, rect).is_none());
    }

    #[test]
    fn test_screen_to_image_flips_y() {
        let rect = Rect::from_min_size(Pos2::ZERO, Vec2::new(64.0, 64.0));
        assert_eq!(screen_to_image(Pos2::new(0.5, 63.5), rect, (64, 64)), Some((0, 0)));
        assert_eq!(screen_to_image(Pos2::new(63.5, 0.5), rect, (64, 64)), Some((63, 63)));
        assert_eq!(screen_to_image(Pos2::new(70.0, 10.0), rect, (64, 64)), None);
    }
}
