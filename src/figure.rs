//! Figure objects returned by the plotting entry points
//!
//! A [`Figure`] owns everything needed to draw it: colored rasters, colorbar
//! ticks, curves and fitted axes. Each call builds a fresh figure, so there is
//! no shared "current figure" to clear.

use egui::{Color32, ColorImage};
use ndarray::{Array2, ArrayView2};

use crate::colormap::{Colormap, LUT_SIZE};
use crate::norm::{Normalization, Style};
use crate::transform::{GridLayout, LogAxis};

/// Pixels per inch of slice figures
pub const SLICE_DPI: f32 = 100.0;
/// Side of one slice cell, in inches
pub const SLICE_CELL_INCHES: f32 = 2.0;
/// Height of the colorbar row, in inches
pub const COLORBAR_INCHES: f32 = 0.2;
/// Pixels per inch of spectrum figures
pub const SPECTRUM_DPI: f32 = 150.0;
/// Spectrum figure size, in inches
pub const SPECTRUM_INCHES: (f32, f32) = (4.8, 3.6);
/// Opacity of spectrum curves
pub const CURVE_ALPHA: f32 = 0.7;

pub const X_LABEL: &str = "unnormalized wavenumber";
pub const Y_LABEL: &str = "unnormalized power";

/// Target number of ticks on a linear colorbar
const LINEAR_TICKS: usize = 5;

/// A rendered figure
#[derive(Clone, Debug)]
pub enum Figure {
    Slices(SliceFigure),
    Spectra(SpectrumFigure),
}

impl Figure {
    /// Nominal size in pixels
    pub fn size_px(&self) -> [f32; 2] {
        match self {
            Figure::Slices(f) => f.size_px,
            Figure::Spectra(f) => f.size_px,
        }
    }
}

/// RGBA image, row 0 first. Row 0 is drawn at the bottom.
#[derive(Clone, Debug, PartialEq)]
pub struct Raster {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<Color32>,
}

impl Raster {
    pub fn pixel(&self, x: usize, y: usize) -> Option<Color32> {
        if x < self.width && y < self.height {
            self.pixels.get(y * self.width + x).copied()
        } else {
            None
        }
    }

    pub fn to_color_image(&self) -> ColorImage {
        let bytes: Vec<u8> = self.pixels.iter().flat_map(|c| c.to_array()).collect();
        ColorImage::from_rgba_premultiplied([self.width, self.height], &bytes)
    }
}

/// Color a 2-D array; masked values become transparent
pub fn render_raster(values: ArrayView2<'_, f64>, colormap: Colormap, norm: &Normalization) -> Raster {
    let (height, width) = values.dim();
    let pixels = values
        .iter()
        .map(|&v| match norm.apply(v) {
            Some(t) => colormap.map(t),
            None => Color32::TRANSPARENT,
        })
        .collect();
    Raster {
        width,
        height,
        pixels,
    }
}

/// One colorbar tick
#[derive(Clone, Debug, PartialEq)]
pub struct Tick {
    pub value: f64,
    /// Position along the bar in [0, 1]
    pub position: f64,
    pub label: String,
}

/// Horizontal colorbar shared by all channels of one field
#[derive(Clone, Debug)]
pub struct Colorbar {
    pub colormap: Colormap,
    pub norm: Normalization,
    /// LUT_SIZE x 1 strip, low values on the left
    pub raster: Raster,
    pub ticks: Vec<Tick>,
}

impl Colorbar {
    pub fn new(colormap: Colormap, norm: Normalization) -> Self {
        let pixels = (0..LUT_SIZE)
            .map(|i| colormap.map((i as f64 + 0.5) / LUT_SIZE as f64))
            .collect();
        let raster = Raster {
            width: LUT_SIZE,
            height: 1,
            pixels,
        };
        let ticks = colorbar_ticks(&norm);
        Self {
            colormap,
            norm,
            raster,
            ticks,
        }
    }
}

/// Tick values for a normalization, placed at their display positions
pub fn colorbar_ticks(norm: &Normalization) -> Vec<Tick> {
    let (vmin, vmax) = norm.bounds();
    let (lo, hi) = (vmin.min(vmax), vmin.max(vmax));

    let values: Vec<f64> = match *norm {
        Normalization::Linear { .. } => linear_ticks(lo, hi, LINEAR_TICKS),
        Normalization::Log { .. } => decades(lo, hi),
        Normalization::SymLog { linthresh, .. } => {
            let mut v = Vec::new();
            let positive = decades(linthresh.max(f64::MIN_POSITIVE), hi.max(0.0));
            let negative = decades(linthresh.max(f64::MIN_POSITIVE), (-lo).max(0.0));
            v.extend(negative.iter().rev().map(|d| -d));
            if lo <= 0.0 && hi >= 0.0 {
                v.push(0.0);
            }
            v.extend(positive);
            v
        }
    };

    let mut ticks: Vec<Tick> = values
        .into_iter()
        .filter_map(|value| {
            let position = norm.apply(value)?;
            (-1e-9..=1.0 + 1e-9).contains(&position).then(|| Tick {
                value,
                position: position.clamp(0.0, 1.0),
                label: format_scientific(value),
            })
        })
        .collect();

    // Fall back to the bounds so every bar is labeled
    if ticks.is_empty() {
        for value in [vmin, vmax] {
            if let Some(position) = norm.apply(value) {
                ticks.push(Tick {
                    value,
                    position: position.clamp(0.0, 1.0),
                    label: format_scientific(value),
                });
            }
        }
    }
    ticks
}

/// Round 1-2-5 step ticks covering [lo, hi], about `target` of them
pub fn linear_ticks(lo: f64, hi: f64, target: usize) -> Vec<f64> {
    let span = hi - lo;
    if !(span.is_finite() && span > 0.0) || target == 0 {
        return if lo.is_finite() { vec![lo] } else { Vec::new() };
    }

    let raw = span / target as f64;
    let mag = 10f64.powf(raw.log10().floor());
    let step = [1.0, 2.0, 5.0, 10.0]
        .iter()
        .map(|m| m * mag)
        .find(|s| span / s <= target as f64)
        .unwrap_or(10.0 * mag);

    let first = (lo / step).ceil() as i64;
    let last = (hi / step).floor() as i64;
    (first..=last)
        .map(|i| {
            let v = i as f64 * step;
            // snap float noise around zero
            if v.abs() < step * 1e-9 {
                0.0
            } else {
                v
            }
        })
        .collect()
}

/// Powers of ten in [lo, hi] for positive bounds
fn decades(lo: f64, hi: f64) -> Vec<f64> {
    if !(lo > 0.0 && hi >= lo) {
        return Vec::new();
    }
    let first = (lo.log10() - 1e-9).ceil() as i32;
    let last = (hi.log10() + 1e-9).floor() as i32;
    (first..=last).map(|e| 10f64.powi(e)).collect()
}

/// Format a float compactly for tick labels and readouts
pub fn format_scientific(v: f64) -> String {
    if v == 0.0 {
        "0".to_string()
    } else if v.abs() >= 1e4 || v.abs() < 1e-2 {
        format!("{:.2e}", v)
    } else {
        let s = format!("{:.2}", v);
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

/// One channel of one field, cropped to 2-D
#[derive(Clone, Debug)]
pub struct SlicePanel {
    pub channel: usize,
    /// Row-major values, shape (rows, cols)
    pub values: Array2<f64>,
    pub raster: Raster,
}

/// Everything drawn in one figure column
#[derive(Clone, Debug)]
pub struct SliceColumn {
    pub title: Option<String>,
    pub style: Style,
    /// One panel per channel; rows past the field's channel count stay empty
    pub panels: Vec<SlicePanel>,
    pub colorbar: Colorbar,
}

/// Grid of slices: one column per field, one row per channel plus a colorbar row
#[derive(Clone, Debug)]
pub struct SliceFigure {
    pub size_px: [f32; 2],
    pub layout: GridLayout,
    /// Number of image rows (the largest channel count)
    pub channel_rows: usize,
    pub columns: Vec<SliceColumn>,
}

impl SliceFigure {
    pub fn colorbar_row(&self) -> usize {
        self.channel_rows
    }

    pub fn panel(&self, row: usize, col: usize) -> Option<&SlicePanel> {
        self.columns.get(col)?.panels.get(row)
    }
}

/// One spectrum line
#[derive(Clone, Debug)]
pub struct Curve {
    pub label: Option<String>,
    pub k: Vec<f64>,
    pub power: Vec<f64>,
    pub color: Color32,
}

/// Log-log overlay of power spectra
#[derive(Clone, Debug)]
pub struct SpectrumFigure {
    pub size_px: [f32; 2],
    pub curves: Vec<Curve>,
    /// `None` when no curve has a positive point
    pub x_axis: Option<LogAxis>,
    pub y_axis: Option<LogAxis>,
    pub x_label: String,
    pub y_label: String,
    pub legend: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_raster_masks_log_non_positive() {
        let values = array![[0.0, 1.0], [10.0, -1.0]];
        let norm = Normalization::Log { vmin: 1.0, vmax: 10.0 };
        let r = render_raster(values.view(), Colormap::Viridis, &norm);
        assert_eq!((r.width, r.height), (2, 2));
        assert_eq!(r.pixel(0, 0), Some(Color32::TRANSPARENT));
        assert_eq!(r.pixel(1, 0), Some(Colormap::Viridis.map(0.0)));
        assert_eq!(r.pixel(0, 1), Some(Colormap::Viridis.map(1.0)));
        assert_eq!(r.pixel(1, 1), Some(Color32::TRANSPARENT));
        assert_eq!(r.pixel(2, 0), None);
    }

    #[test]
    fn test_linear_ticks_are_round() {
        let unit = linear_ticks(0.0, 1.0, 5);
        assert_eq!(unit.len(), 6);
        for (i, v) in unit.iter().enumerate() {
            assert!((v - 0.2 * i as f64).abs() < 1e-12);
        }
        let t = linear_ticks(-4.0, 4.0, 5);
        assert_eq!(t, vec![-4.0, -2.0, 0.0, 2.0, 4.0]);
        assert_eq!(linear_ticks(3.0, 3.0, 5), vec![3.0]);
    }

    #[test]
    fn test_log_colorbar_ticks_are_decades() {
        let bar = Colorbar::new(Colormap::Viridis, Normalization::Log { vmin: 0.5, vmax: 300.0 });
        let values: Vec<f64> = bar.ticks.iter().map(|t| t.value).collect();
        assert_eq!(values, vec![1.0, 10.0, 100.0]);
        assert!(bar.ticks.windows(2).all(|w| w[0].position < w[1].position));
        assert_eq!(bar.raster.width, LUT_SIZE);
    }

    #[test]
    fn test_symlog_ticks_are_symmetric() {
        let norm = Normalization::SymLog { linthresh: 0.1, vmin: -100.0, vmax: 100.0 };
        let values: Vec<f64> = colorbar_ticks(&norm).iter().map(|t| t.value).collect();
        assert_eq!(values, vec![-100.0, -10.0, -1.0, -0.1, 0.0, 0.1, 1.0, 10.0, 100.0]);
        let zero = colorbar_ticks(&norm)[4].position;
        assert!((zero - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_ticks_fall_back_to_bounds() {
        let ticks = colorbar_ticks(&Normalization::Log { vmin: 2.0, vmax: 8.0 });
        let values: Vec<f64> = ticks.iter().map(|t| t.value).collect();
        assert_eq!(values, vec![2.0, 8.0]);
    }

    #[test]
    fn test_format_scientific() {
        assert_eq!(format_scientific(0.0), "0");
        assert_eq!(format_scientific(0.5), "0.5");
        assert_eq!(format_scientific(2.0), "2");
        assert_eq!(format_scientific(12345.0), "1.23e4");
        assert_eq!(format_scientific(-0.001), "-1.00e-3");
    }
}
