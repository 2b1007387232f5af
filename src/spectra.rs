//! Log-log overlay plots of power spectra

use ndarray::ArrayD;

use crate::colormap::cycle_color;
use crate::error::PlotError;
use crate::figure::{Curve, Figure, SpectrumFigure, CURVE_ALPHA, SPECTRUM_DPI, SPECTRUM_INCHES, X_LABEL, Y_LABEL};
use crate::options::PowerOptions;
use crate::power::{check_field, spectrum_of};
use crate::transform::LogAxis;

/// Remapping applied to all fields before their spectra are taken, such as a
/// Lagrangian-to-Eulerian (displacement to density) transform.
///
/// Must return one field per input, in the same order.
pub trait FieldTransform {
    fn apply(&self, fields: Vec<ArrayD<f64>>) -> Vec<ArrayD<f64>>;
}

impl<F> FieldTransform for F
where
    F: Fn(Vec<ArrayD<f64>>) -> Vec<ArrayD<f64>>,
{
    fn apply(&self, fields: Vec<ArrayD<f64>>) -> Vec<ArrayD<f64>> {
        self(fields)
    }
}

/// Plot the power spectrum of every field on shared log-log axes.
///
/// Fields are `[batch, channel, *spatial]`. When `transform` is given the
/// fields go through it first.
pub fn plot_power(
    fields: Vec<ArrayD<f64>>,
    transform: Option<&dyn FieldTransform>,
    opts: &PowerOptions,
) -> Result<Figure, PlotError> {
    let n = fields.len();
    if let Some(labels) = &opts.labels {
        if labels.len() != n {
            return Err(PlotError::LabelCount {
                expected: n,
                got: labels.len(),
            });
        }
    }
    if n == 0 {
        return Err(PlotError::NoFields);
    }

    let fields = match transform {
        Some(t) => {
            let out = t.apply(fields);
            if out.len() != n {
                return Err(PlotError::TransformCount {
                    expected: n,
                    got: out.len(),
                });
            }
            out
        }
        None => fields,
    };
    for (index, field) in fields.iter().enumerate() {
        check_field(&field.view(), index)?;
    }

    let mut curves = Vec::with_capacity(n);
    for (index, field) in fields.iter().enumerate() {
        let spectrum = spectrum_of(field.view(), index)?;
        curves.push(Curve {
            label: opts.labels.as_ref().map(|l| l[index].clone()),
            k: spectrum.k,
            power: spectrum.power,
            color: cycle_color(index, CURVE_ALPHA),
        });
    }

    let x_axis = LogAxis::fit(curves.iter().flat_map(|c| c.k.iter().copied()));
    let y_axis = LogAxis::fit(curves.iter().flat_map(|c| c.power.iter().copied()));

    Ok(Figure::Spectra(SpectrumFigure {
        size_px: [SPECTRUM_INCHES.0 * SPECTRUM_DPI, SPECTRUM_INCHES.1 * SPECTRUM_DPI],
        curves,
        x_axis,
        y_axis,
        x_label: X_LABEL.to_string(),
        y_label: Y_LABEL.to_string(),
        legend: true,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array, IxDyn};
    use std::cell::Cell;

    fn wave(n: usize, mode: usize, amp: f64) -> ArrayD<f64> {
        Array::from_shape_fn(IxDyn(&[1, 1, n, n]), |idx| {
            amp * (2.0 * std::f64::consts::PI * mode as f64 * idx[3] as f64 / n as f64).sin() + 1.0
        })
    }

    fn spectra(figure: Figure) -> SpectrumFigure {
        match figure {
            Figure::Spectra(f) => f,
            Figure::Slices(_) => panic!("expected a spectrum figure"),
        }
    }

    struct CountingTransform {
        calls: Cell<usize>,
        scale: f64,
    }

    impl FieldTransform for CountingTransform {
        fn apply(&self, fields: Vec<ArrayD<f64>>) -> Vec<ArrayD<f64>> {
            self.calls.set(self.calls.get() + 1);
            fields.into_iter().map(|f| f * self.scale).collect()
        }
    }

    #[test]
    fn test_one_curve_per_field() {
        let opts = PowerOptions {
            labels: Some(vec!["a".into(), "b".into()]),
        };
        let fig = spectra(plot_power(vec![wave(16, 2, 1.0), wave(16, 5, 1.0)], None, &opts).unwrap());

        assert_eq!(fig.curves.len(), 2);
        assert_eq!(fig.curves[0].label.as_deref(), Some("a"));
        assert_eq!(fig.curves[1].label.as_deref(), Some("b"));
        assert_eq!(fig.curves[0].k.len(), 8);
        assert_eq!(fig.curves[0].color.a(), cycle_color(0, CURVE_ALPHA).a());
        assert_ne!(fig.curves[0].color, fig.curves[1].color);
        assert_eq!(fig.x_label, "unnormalized wavenumber");
        assert_eq!(fig.y_label, "unnormalized power");
        assert!(fig.legend);
        assert!((fig.size_px[0] - 720.0).abs() < 0.01);
        assert!((fig.size_px[1] - 540.0).abs() < 0.01);
    }

    #[test]
    fn test_axes_cover_positive_data() {
        let fig = spectra(plot_power(vec![wave(16, 3, 2.0)], None, &PowerOptions::default()).unwrap());
        let x = fig.x_axis.unwrap();
        assert!(x.min < 1.0 && x.max > fig.curves[0].k[7]);
        let y = fig.y_axis.unwrap();
        let peak = fig.curves[0].power.iter().cloned().fold(0.0, f64::max);
        assert!(y.max > peak);
    }

    #[test]
    fn test_label_mismatch_fails_before_transform() {
        let t = CountingTransform {
            calls: Cell::new(0),
            scale: 2.0,
        };
        let opts = PowerOptions {
            labels: Some(vec!["only one".into()]),
        };
        let result = plot_power(vec![wave(8, 1, 1.0), wave(8, 2, 1.0)], Some(&t), &opts);
        assert!(matches!(result, Err(PlotError::LabelCount { expected: 2, got: 1 })));
        assert_eq!(t.calls.get(), 0);
    }

    #[test]
    fn test_transform_runs_first() {
        let t = CountingTransform {
            calls: Cell::new(0),
            scale: 3.0,
        };
        let plain = spectra(plot_power(vec![wave(16, 4, 1.0)], None, &PowerOptions::default()).unwrap());
        let scaled = spectra(plot_power(vec![wave(16, 4, 1.0)], Some(&t), &PowerOptions::default()).unwrap());
        assert_eq!(t.calls.get(), 1);

        let (p0, p1) = (&plain.curves[0].power, &scaled.curves[0].power);
        assert!((p1[3] - 9.0 * p0[3]).abs() < 1e-6 * p0[3]);
    }

    #[test]
    fn test_closure_transform() {
        let drop_one = |mut fields: Vec<ArrayD<f64>>| {
            fields.pop();
            fields
        };
        let result = plot_power(vec![wave(8, 1, 1.0), wave(8, 2, 1.0)], Some(&drop_one), &PowerOptions::default());
        assert!(matches!(result, Err(PlotError::TransformCount { expected: 2, got: 1 })));
    }

    #[test]
    fn test_bad_fields() {
        assert!(matches!(
            plot_power(Vec::new(), None, &PowerOptions::default()),
            Err(PlotError::NoFields)
        ));
        let flat = ArrayD::<f64>::zeros(IxDyn(&[4, 4]));
        assert!(matches!(
            plot_power(vec![wave(8, 1, 1.0), flat], None, &PowerOptions::default()),
            Err(PlotError::Rank { index: 1, .. })
        ));
    }
}
