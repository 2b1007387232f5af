//! Colormap definitions and utilities
//!
//! Palettes are stored as color stops (see `colormap_luts`) and expanded into
//! 256-entry lookups on demand, matching matplotlib's default resolution.

use egui::Color32;
use serde::Deserialize;

use crate::colormap_luts::{sample_stops, RDBU_R_STOPS, TAB10, VIRIDIS_STOPS};

/// Number of discrete colors a palette resolves to
pub const LUT_SIZE: usize = 256;

/// Available colormap types
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Deserialize)]
pub enum Colormap {
    /// Sequential perceptual palette, also the fallback when nothing is chosen
    #[default]
    #[serde(rename = "viridis")]
    Viridis,
    /// Diverging palette, blue below the midpoint and red above
    #[serde(rename = "RdBu_r")]
    RdBuR,
    #[serde(rename = "gray")]
    Gray,
}

impl Colormap {
    /// Get display name for UI
    pub fn name(&self) -> &'static str {
        match self {
            Colormap::Viridis => "viridis",
            Colormap::RdBuR => "RdBu_r",
            Colormap::Gray => "gray",
        }
    }

    /// Look up a colormap by its display name
    pub fn from_name(name: &str) -> Option<Colormap> {
        match name {
            "viridis" => Some(Colormap::Viridis),
            "RdBu_r" => Some(Colormap::RdBuR),
            "gray" | "grey" => Some(Colormap::Gray),
            _ => None,
        }
    }

    /// Check if this is a diverging colormap
    pub fn is_diverging(&self) -> bool {
        matches!(self, Colormap::RdBuR)
    }

    /// Map a normalized value (0-1) to a color
    pub fn map(&self, t: f64) -> Color32 {
        // Snap to one of LUT_SIZE bins the way a listed colormap does
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let idx = ((t * LUT_SIZE as f64) as usize).min(LUT_SIZE - 1);
        let t = idx as f64 / (LUT_SIZE - 1) as f64;

        let rgb = match self {
            Colormap::Viridis => sample_stops(&VIRIDIS_STOPS, t),
            Colormap::RdBuR => sample_stops(&RDBU_R_STOPS, t),
            Colormap::Gray => {
                let v = (t * 255.0).round() as u8;
                [v, v, v]
            }
        };
        Color32::from_rgb(rgb[0], rgb[1], rgb[2])
    }
}

/// Color for the `index`-th curve of a line plot, with the given opacity
pub fn cycle_color(index: usize, alpha: f32) -> Color32 {
    let rgb = TAB10[index % TAB10.len()];
    let a = (alpha.clamp(0.0, 1.0) * 255.0).round() as u8;
    Color32::from_rgba_unmultiplied(rgb[0], rgb[1], rgb[2], a)
}
