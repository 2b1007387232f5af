//! Adaptive color scaling for field data
//!
//! Field statistics (sign regime and the 2.5/16/84/97.5 percentiles) are
//! computed once per field and turned into exactly one colormap and one
//! [`Normalization`]. The decision functions are pure so they can be tested
//! without any rendering.

use serde::Deserialize;

use crate::colormap::Colormap;

/// Percentiles driving the default normalization: l2, l1, h1, h2
const PERCENTILES: [f64; 4] = [2.5, 16.0, 84.0, 97.5];

/// Ratio below which the inner interval counts as narrow against the outer one
const NARROW_RATIO: f64 = 0.1;

/// SymLog base and linear-segment scale (matplotlib defaults)
const SYMLOG_BASE: f64 = 10.0;
const SYMLOG_LINSCALE: f64 = 1.0;

/// Snap a positive value to 2^(n/10), the nearest tenth of an octave.
///
/// Gives colorbar bounds that read cleanly. Returns 0 for inputs that are not
/// finite and positive, which have no octave.
pub fn quantize(x: f64) -> f64 {
    if !(x.is_finite() && x > 0.0) {
        return 0.0;
    }
    let tenths = (x.log2() * 10.0).round();
    2f64.powf(tenths / 10.0)
}

/// Which side of zero the field's values fall on
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignRegime {
    /// Every value is >= 0 (an all-zero field lands here)
    NonNegative,
    /// Every value is <= 0 and at least one is negative
    NonPositive,
    Mixed,
}

/// Summary statistics of one field, computed over its finite values
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FieldStats {
    pub regime: SignRegime,
    /// 2.5th percentile
    pub l2: f64,
    /// 16th percentile
    pub l1: f64,
    /// 84th percentile
    pub h1: f64,
    /// 97.5th percentile
    pub h2: f64,
    pub min: f64,
    pub max: f64,
    /// Smallest strictly positive value, if any
    pub min_positive: Option<f64>,
}

impl FieldStats {
    /// Compute statistics, ignoring NaN and infinite values.
    /// Returns `None` when there is no finite value at all.
    pub fn from_values<'a, I>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a f64>,
    {
        let mut sorted: Vec<f64> = values.into_iter().copied().filter(|v| v.is_finite()).collect();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(f64::total_cmp);

        let min = sorted[0];
        let max = sorted[sorted.len() - 1];
        let regime = if min >= 0.0 {
            SignRegime::NonNegative
        } else if max <= 0.0 {
            SignRegime::NonPositive
        } else {
            SignRegime::Mixed
        };
        let min_positive = sorted.iter().copied().find(|&v| v > 0.0);

        let [l2, l1, h1, h2] = PERCENTILES.map(|p| percentile_sorted(&sorted, p));

        Some(Self {
            regime,
            l2,
            l1,
            h1,
            h2,
            min,
            max,
            min_positive,
        })
    }
}

/// Percentile `p` (0-100) of ascending `sorted` data, linearly interpolating
/// between neighbouring order statistics.
pub fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let pos = (p / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Mapping from data values to the [0, 1] display range
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Normalization {
    Linear { vmin: f64, vmax: f64 },
    Log { vmin: f64, vmax: f64 },
    /// Logarithmic away from zero, linear inside `[-linthresh, linthresh]`
    SymLog { linthresh: f64, vmin: f64, vmax: f64 },
}

impl Normalization {
    /// Lower and upper bound of the display range
    pub fn bounds(&self) -> (f64, f64) {
        match *self {
            Normalization::Linear { vmin, vmax }
            | Normalization::Log { vmin, vmax }
            | Normalization::SymLog { vmin, vmax, .. } => (vmin, vmax),
        }
    }

    /// Map a value into display units. Out-of-range values fall outside
    /// [0, 1]; `None` means the value is masked (non-finite, or <= 0 on a
    /// log scale).
    pub fn apply(&self, v: f64) -> Option<f64> {
        if !v.is_finite() {
            return None;
        }
        match *self {
            Normalization::Linear { vmin, vmax } => Some(unit(v, vmin, vmax)),
            Normalization::Log { vmin, vmax } => {
                if v <= 0.0 || vmin <= 0.0 || vmax <= 0.0 {
                    return None;
                }
                Some(unit(v.log10(), vmin.log10(), vmax.log10()))
            }
            Normalization::SymLog { linthresh, vmin, vmax } => {
                let t = |x| symlog_forward(x, linthresh);
                Some(unit(t(v), t(vmin), t(vmax)))
            }
        }
    }

    /// Inverse of [`apply`](Self::apply) for a display position in [0, 1]
    pub fn invert(&self, t: f64) -> f64 {
        match *self {
            Normalization::Linear { vmin, vmax } => vmin + t * (vmax - vmin),
            Normalization::Log { vmin, vmax } => {
                let (a, b) = (vmin.log10(), vmax.log10());
                10f64.powf(a + t * (b - a))
            }
            Normalization::SymLog { linthresh, vmin, vmax } => {
                let a = symlog_forward(vmin, linthresh);
                let b = symlog_forward(vmax, linthresh);
                symlog_inverse(a + t * (b - a), linthresh)
            }
        }
    }
}

fn unit(v: f64, lo: f64, hi: f64) -> f64 {
    let range = hi - lo;
    if range.abs() > f64::EPSILON {
        (v - lo) / range
    } else {
        0.0
    }
}

fn symlog_linscale_adj() -> f64 {
    SYMLOG_LINSCALE / (1.0 - 1.0 / SYMLOG_BASE)
}

fn symlog_forward(v: f64, linthresh: f64) -> f64 {
    let c = symlog_linscale_adj();
    let a = v.abs();
    if a <= linthresh {
        v * c
    } else {
        v.signum() * linthresh * (c + (a / linthresh).log(SYMLOG_BASE))
    }
}

fn symlog_inverse(t: f64, linthresh: f64) -> f64 {
    let c = symlog_linscale_adj();
    let a = t.abs();
    if a <= linthresh * c {
        t / c
    } else {
        t.signum() * linthresh * SYMLOG_BASE.powf(a / linthresh - c)
    }
}

/// Outcome of choosing a colormap or normalization for one field
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Selection<T> {
    /// Derived from the field's statistics
    Auto(T),
    /// Supplied by the caller
    Given(T),
    /// No rule exists for this field (all values non-positive)
    Unsupported,
}

impl<T: Copy> Selection<T> {
    pub fn value(&self) -> Option<T> {
        match self {
            Selection::Auto(v) | Selection::Given(v) => Some(*v),
            Selection::Unsupported => None,
        }
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, Selection::Unsupported)
    }
}

/// Default colormap for a sign regime
pub fn default_colormap(regime: SignRegime) -> Selection<Colormap> {
    match regime {
        SignRegime::NonNegative => Selection::Auto(Colormap::Viridis),
        SignRegime::Mixed => Selection::Auto(Colormap::RdBuR),
        SignRegime::NonPositive => Selection::Unsupported,
    }
}

/// Default normalization from percentile statistics
pub fn default_norm(stats: &FieldStats) -> Selection<Normalization> {
    let FieldStats { l2, l1, h1, h2, .. } = *stats;

    match stats.regime {
        SignRegime::NonNegative => {
            if h2 <= 0.0 {
                // all (or nearly all) zeros
                return Selection::Auto(Normalization::Linear { vmin: 0.0, vmax: 1.0 });
            }
            let vmax = quantize(h2);
            if h1 > NARROW_RATIO * h2 {
                Selection::Auto(Normalization::Linear { vmin: 0.0, vmax })
            } else {
                let floor = if l2 > 0.0 { l2 } else { stats.min_positive.unwrap_or(h2) };
                Selection::Auto(Normalization::Log {
                    vmin: quantize(floor),
                    vmax,
                })
            }
        }
        SignRegime::Mixed => {
            let w1 = (h1 - l1) / 2.0;
            let w2 = (h2 - l2) / 2.0;

            let mut vlim = quantize((-l2).max(h2));
            if vlim == 0.0 {
                vlim = quantize((-stats.min).max(stats.max));
            }

            if w1 > NARROW_RATIO * w2 || l1 * h1 >= 0.0 {
                Selection::Auto(Normalization::Linear { vmin: -vlim, vmax: vlim })
            } else {
                let linthresh = NARROW_RATIO * quantize((-l1).min(h1));
                Selection::Auto(Normalization::SymLog {
                    linthresh,
                    vmin: -vlim,
                    vmax: vlim,
                })
            }
        }
        SignRegime::NonPositive => Selection::Unsupported,
    }
}

/// Colormap and normalization chosen for one field
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Style {
    pub colormap: Selection<Colormap>,
    pub norm: Selection<Normalization>,
}

impl Style {
    /// Concrete colormap and normalization to draw with. Unsupported picks
    /// fall back to the default palette and a linear min/max scale.
    pub fn resolve(&self, stats: &FieldStats) -> (Colormap, Normalization) {
        let colormap = self.colormap.value().unwrap_or_default();
        let norm = self.norm.value().unwrap_or(Normalization::Linear {
            vmin: stats.min,
            vmax: stats.max,
        });
        (colormap, norm)
    }
}

/// Choose a style for one field, honouring caller overrides
pub fn select_style(
    stats: &FieldStats,
    cmap: Option<Colormap>,
    norm: Option<Normalization>,
) -> Style {
    let colormap = match cmap {
        Some(c) => Selection::Given(c),
        None => default_colormap(stats.regime),
    };
    if colormap.is_unsupported() {
        log::warn!("no colormap rule for all non-positive values");
    }

    let norm = match norm {
        Some(n) => Selection::Given(n),
        None => default_norm(stats),
    };
    if norm.is_unsupported() {
        log::warn!("no normalization rule for all non-positive values");
    }

    log::debug!("selected style {:?} / {:?}", colormap, norm);
    Style { colormap, norm }
}
