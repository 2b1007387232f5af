//! Slice plots of fields with two or more spatial dimensions
//!
//! Each field is laid out `[channel, *spatial]` (no batch axis). Every
//! channel is cut at the midpoint of all spatial axes but the last two,
//! cropped to a centered window, and colored with one style per field.

use ndarray::{Array2, ArrayViewD, Axis, Ix2, Slice};

use crate::error::PlotError;
use crate::figure::{
    render_raster, Colorbar, Figure, SliceColumn, SliceFigure, SlicePanel, COLORBAR_INCHES,
    SLICE_CELL_INCHES, SLICE_DPI,
};
use crate::norm::{select_style, FieldStats};
use crate::options::SliceOptions;
use crate::transform::GridLayout;

/// Channel axis plus at least two spatial axes
const MIN_RANK: usize = 3;

/// Gap between grid cells, in pixels
const CELL_GAP: f32 = 4.0;

/// Start and end of a centered window of `size` along an axis of length `n`.
/// Windows larger than the axis keep the full extent.
pub fn crop_window(n: usize, size: Option<usize>) -> (usize, usize) {
    match size {
        Some(size) if size < n => {
            let start = (n - size) / 2;
            let end = (n + size) / 2;
            (start, end)
        }
        _ => (0, n),
    }
}

/// 2-D cut of one channel: middle index of every spatial axis except the
/// last two, then a centered crop of those two
pub fn slice_plane(
    field: &ArrayViewD<'_, f64>,
    channel: usize,
    size: Option<usize>,
) -> Array2<f64> {
    let mut plane = field.index_axis(Axis(0), channel);
    while plane.ndim() > 2 {
        let mid = plane.len_of(Axis(0)) / 2;
        plane = plane.index_axis_move(Axis(0), mid);
    }

    for ax in 0..2 {
        let (start, end) = crop_window(plane.len_of(Axis(ax)), size);
        plane.slice_axis_inplace(Axis(ax), Slice::from(start..end));
    }

    match plane.into_dimensionality::<Ix2>() {
        Ok(p) => p.to_owned(),
        // rank is exactly 2 after the loop above
        Err(_) => Array2::zeros((0, 0)),
    }
}

fn check_fields(fields: &[ArrayViewD<'_, f64>], opts: &SliceOptions) -> Result<(), PlotError> {
    if fields.is_empty() {
        return Err(PlotError::NoFields);
    }
    if let Some(titles) = &opts.titles {
        if titles.len() != fields.len() {
            return Err(PlotError::TitleCount {
                expected: fields.len(),
                got: titles.len(),
            });
        }
    }
    for (index, field) in fields.iter().enumerate() {
        if field.ndim() < MIN_RANK {
            return Err(PlotError::Rank {
                index,
                rank: field.ndim(),
                min: MIN_RANK,
            });
        }
        if field.is_empty() {
            return Err(PlotError::EmptyField {
                index,
                shape: field.shape().to_vec(),
            });
        }
    }
    Ok(())
}

/// Plot midpoint slices of every channel of every field.
///
/// Returns a figure with one column per field and one row per channel
/// (padded to the largest channel count), plus a row of horizontal colorbars.
pub fn plot_slices(fields: &[ArrayViewD<'_, f64>], opts: &SliceOptions) -> Result<Figure, PlotError> {
    check_fields(fields, opts)?;

    let nf = fields.len();
    let cmaps = opts.cmap.resolve(nf, "cmap")?;
    let norms = opts.norm.resolve(nf, "norm")?;

    let nc = fields.iter().map(|f| f.len_of(Axis(0))).max().unwrap_or(0);

    let mut columns = Vec::with_capacity(nf);
    for (f, field) in fields.iter().enumerate() {
        let stats = FieldStats::from_values(field.iter()).ok_or_else(|| PlotError::EmptyField {
            index: f,
            shape: field.shape().to_vec(),
        })?;
        let style = select_style(&stats, cmaps[f], norms[f]);
        let (colormap, norm) = style.resolve(&stats);

        let panels = (0..field.len_of(Axis(0)))
            .map(|c| {
                let values = slice_plane(field, c, opts.size);
                let raster = render_raster(values.view(), colormap, &norm);
                SlicePanel {
                    channel: c,
                    values,
                    raster,
                }
            })
            .collect();

        columns.push(SliceColumn {
            title: opts.titles.as_ref().map(|t| t[f].clone()),
            style,
            panels,
            colorbar: Colorbar::new(colormap, norm),
        });
    }

    let mut height_ratios = vec![SLICE_CELL_INCHES; nc];
    height_ratios.push(COLORBAR_INCHES);
    let size_px = [
        nf as f32 * SLICE_CELL_INCHES * SLICE_DPI,
        (nc as f32 * SLICE_CELL_INCHES + COLORBAR_INCHES) * SLICE_DPI,
    ];

    log::debug!("slice figure: {} fields x {} channel rows", nf, nc);

    Ok(Figure::Slices(SliceFigure {
        size_px,
        layout: GridLayout::new(height_ratios, nf, CELL_GAP),
        channel_rows: nc,
        columns,
    }))
}
