//! Isotropic power spectra
//!
//! Input fields are laid out `[batch, channel, *spatial]`. The spectrum is
//! the squared magnitude of the real-input DFT over the spatial axes, summed
//! over channels, averaged over the batch, then binned by integer wavenumber
//! magnitude. Power is not normalized; wavenumbers are in units of the
//! fundamental frequency of the input.

use ndarray::{ArrayD, ArrayViewD, Axis, IxDyn, Slice};
use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

use crate::error::PlotError;

/// Leading non-spatial axes: batch and channel
const LEADING_AXES: usize = 2;

/// Binned spectrum for wavenumber bins 1..=kmax
#[derive(Clone, Debug, PartialEq)]
pub struct PowerSpectrum {
    /// Weighted mean wavenumber magnitude per bin
    pub k: Vec<f64>,
    /// Weighted mean power per bin
    pub power: Vec<f64>,
    /// Number of (full-spectrum) modes per bin
    pub count: Vec<u64>,
}

impl PowerSpectrum {
    pub fn len(&self) -> usize {
        self.k.len()
    }

    pub fn is_empty(&self) -> bool {
        self.k.is_empty()
    }
}

/// Compute the power spectrum of one `[batch, channel, *spatial]` field
pub fn power(field: ArrayViewD<'_, f64>) -> Result<PowerSpectrum, PlotError> {
    spectrum_of(field, 0)
}

pub(crate) fn spectrum_of(field: ArrayViewD<'_, f64>, index: usize) -> Result<PowerSpectrum, PlotError> {
    check_field(&field, index)?;

    let shape = field.shape();
    let kmax = nyquist(&shape[LEADING_AXES..]);
    let even = shape[shape.len() - 1] % 2 == 0;

    let coeffs = rfftn(field.view());
    let p = mode_power(&coeffs);
    let bins = radial_bins(&p, even);

    let mut spectrum = PowerSpectrum {
        k: Vec::with_capacity(kmax),
        power: Vec::with_capacity(kmax),
        count: Vec::with_capacity(kmax),
    };
    // drop the k=0 mode and cut at the smallest Nyquist
    for b in 1..=kmax {
        let n = bins.weight[b];
        spectrum.k.push(bins.k_sum[b] / n);
        spectrum.power.push(bins.p_sum[b] / n);
        spectrum.count.push(n.round() as u64);
    }

    log::debug!(
        "power spectrum of field {} with shape {:?}: {} bins",
        index,
        field.shape(),
        kmax
    );
    Ok(spectrum)
}

pub(crate) fn check_field(field: &ArrayViewD<'_, f64>, index: usize) -> Result<(), PlotError> {
    let rank = field.ndim();
    if rank < LEADING_AXES + 1 {
        return Err(PlotError::Rank {
            index,
            rank,
            min: LEADING_AXES + 1,
        });
    }
    if field.is_empty() {
        return Err(PlotError::EmptyField {
            index,
            shape: field.shape().to_vec(),
        });
    }
    Ok(())
}

/// Highest wavenumber bin kept: the smallest per-axis Nyquist index
pub fn nyquist(spatial: &[usize]) -> usize {
    spatial.iter().copied().min().unwrap_or(0) / 2
}

/// Real-input DFT over every axis after the leading two.
///
/// The last axis keeps only the non-negative frequencies `0..=n/2`; the
/// remaining half is the complex conjugate of what is stored.
fn rfftn(field: ArrayViewD<'_, f64>) -> ArrayD<Complex<f64>> {
    let mut planner = FftPlanner::<f64>::new();
    let mut data = field.mapv(|v| Complex::new(v, 0.0));

    let ndim = data.ndim();
    let last = Axis(ndim - 1);

    fft_axis(&mut planner, &mut data, last);
    let half = data.len_of(last) / 2 + 1;
    data.slice_axis_inplace(last, Slice::from(0..half));
    let mut data = data.as_standard_layout().into_owned();

    for ax in LEADING_AXES..ndim - 1 {
        fft_axis(&mut planner, &mut data, Axis(ax));
    }
    data
}

fn fft_axis(planner: &mut FftPlanner<f64>, data: &mut ArrayD<Complex<f64>>, axis: Axis) {
    let n = data.len_of(axis);
    if n < 2 {
        return;
    }
    let fft = planner.plan_fft_forward(n);
    let mut buf = Vec::with_capacity(n);
    for mut lane in data.lanes_mut(axis) {
        buf.clear();
        buf.extend(lane.iter().copied());
        fft.process(&mut buf);
        for (dst, src) in lane.iter_mut().zip(&buf) {
            *dst = *src;
        }
    }
}

/// |X|^2 summed over channels and averaged over the batch
fn mode_power(coeffs: &ArrayD<Complex<f64>>) -> ArrayD<f64> {
    let batch = coeffs.len_of(Axis(0)) as f64;
    let p = coeffs.mapv(|c| c.norm_sqr());
    p.sum_axis(Axis(0)).sum_axis(Axis(0)) / batch
}

/// Weighted sums per integer wavenumber bin, `ceil(|k|)`, over every stored
/// mode (including bin 0 and bins past the Nyquist cut)
#[derive(Clone, Debug)]
pub(crate) struct RadialBins {
    pub k_sum: Vec<f64>,
    pub p_sum: Vec<f64>,
    pub weight: Vec<f64>,
}

pub(crate) fn radial_bins(p: &ArrayD<f64>, even: bool) -> RadialBins {
    let shape = p.shape().to_vec();
    let rank = shape.len();
    let half = shape[rank - 1];

    let mut bins = RadialBins {
        k_sum: Vec::new(),
        p_sum: Vec::new(),
        weight: Vec::new(),
    };

    for (idx, &power) in p.indexed_iter() {
        let k = wavenumber(&idx, &shape);
        let n = degeneracy(idx[rank - 1], half, even);

        let b = k.ceil() as usize;
        if b >= bins.weight.len() {
            bins.k_sum.resize(b + 1, 0.0);
            bins.p_sum.resize(b + 1, 0.0);
            bins.weight.resize(b + 1, 0.0);
        }
        bins.k_sum[b] += k * n;
        bins.p_sum[b] += power * n;
        bins.weight[b] += n;
    }
    bins
}

/// Euclidean wavenumber magnitude of one stored mode. Axes other than the
/// last fold indices past the midpoint to negative frequencies.
fn wavenumber(idx: &IxDyn, shape: &[usize]) -> f64 {
    let rank = shape.len();
    let mut k2 = 0.0;
    for (ax, &d) in shape.iter().enumerate() {
        let j = idx[ax] as f64;
        let kj = if ax + 1 < rank && idx[ax] > d / 2 {
            j - d as f64
        } else {
            j
        };
        k2 += kj * kj;
    }
    k2.sqrt()
}

/// Number of full-spectrum modes a stored half-spectrum mode stands for
fn degeneracy(last_idx: usize, half: usize, even: bool) -> f64 {
    if last_idx == 0 || (even && last_idx + 1 == half) {
        1.0
    } else {
        2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn noise(shape: &[usize], seed: u64) -> ArrayD<f64> {
        // uniform on [-sqrt(3), sqrt(3)] has unit variance
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let a = 3f64.sqrt();
        Array::from_shape_simple_fn(IxDyn(shape), || rng.gen_range(-a..a))
    }

    #[test]
    fn test_output_lengths_equal_kmax() {
        for shape in [vec![1, 1, 32, 32], vec![2, 3, 12, 9], vec![1, 2, 8, 6, 10], vec![1, 1, 7]] {
            let field = noise(&shape, 1);
            let s = power(field.view()).unwrap();
            let kmax = nyquist(&shape[2..]);
            assert_eq!(s.k.len(), kmax);
            assert_eq!(s.power.len(), kmax);
            assert_eq!(s.count.len(), kmax);
        }
    }

    #[test]
    fn test_weights_cover_every_mode() {
        for shape in [vec![1, 1, 8], vec![1, 1, 9], vec![1, 1, 6, 10], vec![1, 1, 5, 7], vec![1, 1, 4, 4, 5]] {
            let field = noise(&shape, 2);
            let even = shape[shape.len() - 1] % 2 == 0;
            let p = mode_power(&rfftn(field.view()));
            let bins = radial_bins(&p, even);

            let total: f64 = bins.weight.iter().sum();
            let modes: usize = shape[2..].iter().product();
            assert!((total - modes as f64).abs() < 1e-9, "{:?}", shape);
        }
    }

    #[test]
    fn test_one_dimensional_counts() {
        // every bin of a 1-D spectrum lies below Nyquist
        let field = noise(&[1, 1, 8], 3);
        let s = power(field.view()).unwrap();
        assert_eq!(s.count, vec![2, 2, 2, 1]);
        assert_eq!(s.count.iter().sum::<u64>() + 1, 8);
        for (b, &k) in s.k.iter().enumerate() {
            assert!((k - (b + 1) as f64).abs() < 1e-12);
        }
    }

    #[test]
    fn test_constant_field_has_no_power_off_dc() {
        let field = ArrayD::from_elem(IxDyn(&[2, 3, 16, 12]), 4.5);
        let s = power(field.view()).unwrap();
        assert_eq!(s.len(), 6);
        for &p in &s.power {
            assert!(p.abs() < 1e-9, "{}", p);
        }
    }

    #[test]
    fn test_wavenumbers_non_decreasing() {
        let field = noise(&[1, 1, 24, 20, 16], 4);
        let s = power(field.view()).unwrap();
        assert_eq!(s.len(), 8);
        for w in s.k.windows(2) {
            assert!(w[0] <= w[1]);
        }
        for (b, &k) in s.k.iter().enumerate() {
            assert!(k > b as f64 && k <= (b + 1) as f64);
        }
    }

    #[test]
    fn test_single_mode_lands_in_its_bin() {
        // cos(2 pi 3 x / 16) along the last axis
        let n = 16;
        let field = Array::from_shape_fn(IxDyn(&[1, 1, 8, n]), |idx| {
            (2.0 * std::f64::consts::PI * 3.0 * idx[3] as f64 / n as f64).cos()
        });
        let s = power(field.view()).unwrap();
        let (peak, _) = s
            .power
            .iter()
            .enumerate()
            .fold((0, f64::MIN), |acc, (i, &p)| if p > acc.1 { (i, p) } else { acc });
        assert_eq!(peak + 1, 3);
        for (i, &p) in s.power.iter().enumerate() {
            if i + 1 != 3 {
                assert!(p < 1e-9);
            }
        }
    }

    #[test]
    fn test_white_noise_is_flat() {
        let field = noise(&[1, 1, 32, 32], 42);
        let s = power(field.view()).unwrap();
        assert_eq!(s.len(), 16);

        // E|X_k|^2 = number of samples * variance
        let expected = 1024.0;
        let mean = s.power.iter().sum::<f64>() / s.len() as f64;
        assert!((mean / expected - 1.0).abs() < 0.25, "mean power {}", mean);

        let low = s.power[..8].iter().sum::<f64>() / 8.0;
        let high = s.power[8..].iter().sum::<f64>() / 8.0;
        let ratio = high / low;
        assert!(ratio > 0.5 && ratio < 2.0, "high/low {}", ratio);
    }

    #[test]
    fn test_batch_average_and_channel_sum() {
        let one = noise(&[1, 1, 8, 8], 5);
        let s1 = power(one.view()).unwrap();

        // same field twice in the batch: average is unchanged
        let batch = ndarray::concatenate(Axis(0), &[one.view(), one.view()]).unwrap();
        let s2 = power(batch.view()).unwrap();
        // same field twice in channels: power doubles
        let chans = ndarray::concatenate(Axis(1), &[one.view(), one.view()]).unwrap();
        let s3 = power(chans.view()).unwrap();

        for i in 0..s1.len() {
            assert!((s2.power[i] - s1.power[i]).abs() < 1e-9 * s1.power[i].max(1.0));
            assert!((s3.power[i] - 2.0 * s1.power[i]).abs() < 1e-9 * s1.power[i].max(1.0));
        }
    }

    #[test]
    fn test_rejects_bad_shapes() {
        let flat = ArrayD::<f64>::zeros(IxDyn(&[4, 4]));
        assert!(matches!(
            power(flat.view()),
            Err(PlotError::Rank { rank: 2, min: 3, .. })
        ));
        let empty = ArrayD::<f64>::zeros(IxDyn(&[0, 1, 4]));
        assert!(matches!(power(empty.view()), Err(PlotError::EmptyField { .. })));
    }
}
