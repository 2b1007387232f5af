//! Plot options, deserializable from JSON
//!
//! The JavaScript handle passes these as JSON strings; Rust callers usually
//! build them directly.

use serde::Deserialize;

use crate::colormap::Colormap;
use crate::error::PlotError;
use crate::norm::Normalization;

/// Default crop size for slices (pixels per side)
pub const DEFAULT_CROP: usize = 64;

fn default_crop() -> Option<usize> {
    Some(DEFAULT_CROP)
}

/// A per-field setting given once for all fields or once per field
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Broadcast<T> {
    Each(Vec<Option<T>>),
    One(Option<T>),
}

impl<T> Default for Broadcast<T> {
    fn default() -> Self {
        Broadcast::One(None)
    }
}

impl<T: Clone> Broadcast<T> {
    /// Expand to exactly `n` entries
    pub fn resolve(&self, n: usize, what: &'static str) -> Result<Vec<Option<T>>, PlotError> {
        match self {
            Broadcast::One(v) => Ok(vec![v.clone(); n]),
            Broadcast::Each(vs) if vs.len() == n => Ok(vs.clone()),
            Broadcast::Each(vs) if vs.len() == 1 => Ok(vec![vs[0].clone(); n]),
            Broadcast::Each(vs) => Err(PlotError::OverrideCount {
                what,
                expected: n,
                got: vs.len(),
            }),
        }
    }
}

/// Options for [`plot_slices`](crate::plot_slices)
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct SliceOptions {
    /// Side of the centered crop of the last two dimensions; `None` keeps the
    /// full extent
    #[serde(default = "default_crop")]
    pub size: Option<usize>,
    /// One title per field, shown above the first row
    pub titles: Option<Vec<String>>,
    pub cmap: Broadcast<Colormap>,
    pub norm: Broadcast<Normalization>,
}

impl Default for SliceOptions {
    fn default() -> Self {
        Self {
            size: default_crop(),
            titles: None,
            cmap: Broadcast::default(),
            norm: Broadcast::default(),
        }
    }
}

impl SliceOptions {
    pub fn from_json(json: &str) -> Result<Self, PlotError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Options for [`plot_power`](crate::plot_power)
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PowerOptions {
    /// One legend label per field
    pub labels: Option<Vec<String>>,
}

impl PowerOptions {
    pub fn from_json(json: &str) -> Result<Self, PlotError> {
        Ok(serde_json::from_str(json)?)
    }
}
