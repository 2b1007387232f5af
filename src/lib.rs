//! fieldviz - Diagnostic plots for multi-channel scientific fields
//!
//! This library turns N-dimensional fields into figures: grids of midpoint
//! slices with an automatically chosen colormap and normalization, and
//! log-log overlays of isotropic power spectra. Figures can be drawn with
//! egui, and on wasm32 a handle lets JavaScript plot into a canvas.
//!
//! ## Architecture
//!
//! - [`norm`]: Sign-aware colormap and normalization selection
//! - [`power`]: Isotropic power spectrum of `[batch, channel, *spatial]` fields
//! - [`plot_slices`] / [`plot_power`]: Build [`Figure`] values
//! - `FigureWidget`: Self-contained egui widget that paints a figure
//! - `FigureApp`: Thin eframe App shell that hosts the widget
//! - `FigureHandle`: WASM interface for JavaScript to drive a canvas

#[cfg(target_arch = "wasm32")]
use std::cell::RefCell;
#[cfg(target_arch = "wasm32")]
use std::rc::Rc;
#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;
#[cfg(target_arch = "wasm32")]
use web_sys::HtmlCanvasElement;

use ndarray::{ArrayD, IxDyn};

#[cfg(target_arch = "wasm32")]
mod app;
pub mod colormap;
mod colormap_luts;
pub mod error;
pub mod figure;
pub mod norm;
pub mod options;
pub mod power;
pub mod slices;
pub mod spectra;
pub mod transform;
pub mod widget;

#[cfg(target_arch = "wasm32")]
use app::FigureApp;

pub use colormap::Colormap;
pub use error::PlotError;
pub use figure::Figure;
pub use norm::{quantize, select_style, FieldStats, Normalization, Selection, SignRegime, Style};
pub use options::{Broadcast, PowerOptions, SliceOptions};
pub use power::{power, PowerSpectrum};
pub use slices::plot_slices;
pub use spectra::{plot_power, FieldTransform};
pub use widget::FigureWidget;

/// Build a row-major field from flat values and a shape
pub fn field_from_vec(values: Vec<f64>, shape: &[usize]) -> Result<ArrayD<f64>, PlotError> {
    let expected: usize = shape.iter().product();
    if values.len() != expected {
        return Err(PlotError::Shape {
            shape: shape.to_vec(),
            expected,
            got: values.len(),
        });
    }
    ArrayD::from_shape_vec(IxDyn(shape), values).map_err(|_| PlotError::Shape {
        shape: shape.to_vec(),
        expected,
        got: expected,
    })
}

/// A handle to a figure canvas. Each handle manages its own canvas and figure.
///
/// This struct is exposed to JavaScript. It holds an Rc to the widget so it
/// can swap figures, and also stores the eframe runner for the application
/// lifecycle.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub struct FigureHandle {
    /// The widget instance (shared with FigureApp)
    widget: Rc<RefCell<FigureWidget>>,
    /// The eframe runner (kept alive to maintain the render loop)
    runner: eframe::WebRunner,
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
impl FigureHandle {
    /// Create a new figure canvas attached to the given canvas element.
    /// Returns a promise that resolves to a FigureHandle when initialization completes.
    #[wasm_bindgen]
    pub async fn create(canvas: HtmlCanvasElement) -> Result<FigureHandle, JsValue> {
        #[cfg(debug_assertions)]
        {
            eframe::WebLogger::init(log::LevelFilter::Debug).ok();
        }
        #[cfg(not(debug_assertions))]
        {
            eframe::WebLogger::init(log::LevelFilter::Warn).ok();
        }

        let widget = Rc::new(RefCell::new(FigureWidget::new()));
        let widget_for_app = widget.clone();

        let web_options = eframe::WebOptions::default();
        let runner = eframe::WebRunner::new();

        runner
            .start(
                canvas,
                web_options,
                Box::new(move |cc| Ok(Box::new(FigureApp::new(cc, widget_for_app.clone())))),
            )
            .await?;

        Ok(FigureHandle { widget, runner })
    }

    /// Plot midpoint slices of each field.
    ///
    /// # Arguments
    /// * `buffers` - Array of ArrayBuffers, one per field, laid out `[channel, *spatial]`
    /// * `shapes` - Array of shape arrays, one per field
    /// * `array_type` - Rust-style element type of every buffer ("u8", "i32", "f32", "f64", ...)
    /// * `options` - JSON object: `{ size, titles, cmap, norm }`, all optional
    #[wasm_bindgen(js_name = plotSlices)]
    pub fn plot_slices(
        &self,
        buffers: &js_sys::Array,
        shapes: &js_sys::Array,
        array_type: &str,
        options: Option<String>,
    ) -> Result<(), JsValue> {
        let fields = fields_from_js(buffers, shapes, array_type)?;
        let opts = match options {
            Some(json) => SliceOptions::from_json(&json).map_err(to_js)?,
            None => SliceOptions::default(),
        };
        let views: Vec<_> = fields.iter().map(|f| f.view()).collect();
        let figure = slices::plot_slices(&views, &opts).map_err(to_js)?;
        self.widget.borrow_mut().set_figure(figure);
        Ok(())
    }

    /// Plot power spectra of each field on shared log-log axes.
    ///
    /// Buffers are laid out `[batch, channel, *spatial]`. `options` is a JSON
    /// object `{ labels }`.
    #[wasm_bindgen(js_name = plotPower)]
    pub fn plot_power(
        &self,
        buffers: &js_sys::Array,
        shapes: &js_sys::Array,
        array_type: &str,
        options: Option<String>,
    ) -> Result<(), JsValue> {
        let fields = fields_from_js(buffers, shapes, array_type)?;
        let opts = match options {
            Some(json) => PowerOptions::from_json(&json).map_err(to_js)?,
            None => PowerOptions::default(),
        };
        let figure = spectra::plot_power(fields, None, &opts).map_err(to_js)?;
        self.widget.borrow_mut().set_figure(figure);
        Ok(())
    }

    /// Remove the current figure
    #[wasm_bindgen(js_name = clear)]
    pub fn clear(&self) {
        self.widget.borrow_mut().clear();
    }

    /// Nominal figure size as [width, height] in pixels, or [0, 0] when empty
    #[wasm_bindgen(js_name = getFigureSize)]
    pub fn get_figure_size(&self) -> js_sys::Float32Array {
        let size = self
            .widget
            .borrow()
            .figure()
            .map(|f| f.size_px())
            .unwrap_or([0.0, 0.0]);
        let result = js_sys::Float32Array::new_with_length(2);
        result.copy_from(&size);
        result
    }

    /// End event loop and release resources
    #[wasm_bindgen(js_name = destroy)]
    pub fn destroy(&self) {
        self.runner.destroy();
    }
}

#[cfg(target_arch = "wasm32")]
fn to_js(e: PlotError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Pair up buffers and shapes passed from JavaScript
#[cfg(target_arch = "wasm32")]
fn fields_from_js(
    buffers: &js_sys::Array,
    shapes: &js_sys::Array,
    array_type: &str,
) -> Result<Vec<ArrayD<f64>>, JsValue> {
    if buffers.length() != shapes.length() {
        return Err(JsValue::from_str(&format!(
            "got {} buffers but {} shapes",
            buffers.length(),
            shapes.length()
        )));
    }

    let mut fields = Vec::with_capacity(buffers.length() as usize);
    for (buffer, shape) in buffers.iter().zip(shapes.iter()) {
        let buffer: js_sys::ArrayBuffer = buffer
            .dyn_into()
            .map_err(|_| JsValue::from_str("expected an ArrayBuffer"))?;
        let shape: Vec<usize> = js_sys::Array::from(&shape)
            .iter()
            .map(|d| d.as_f64().map(|d| d as usize))
            .collect::<Option<_>>()
            .ok_or_else(|| JsValue::from_str("shape entries must be numbers"))?;

        let values = convert_buffer_to_f64(&buffer, array_type);
        fields.push(field_from_vec(values, &shape).map_err(to_js)?);
    }
    Ok(fields)
}

/// Convert a JavaScript ArrayBuffer to Vec<f64> based on ArrayType string.
/// ArrayType values are Rust-style type specifiers (i8, u8, i16, etc.).
#[cfg(target_arch = "wasm32")]
fn convert_buffer_to_f64(buffer: &js_sys::ArrayBuffer, array_type: &str) -> Vec<f64> {
    match array_type {
        "i8" => js_sys::Int8Array::new(buffer).to_vec().into_iter().map(f64::from).collect(),
        "u8" => js_sys::Uint8Array::new(buffer).to_vec().into_iter().map(f64::from).collect(),
        "i16" => js_sys::Int16Array::new(buffer).to_vec().into_iter().map(f64::from).collect(),
        "u16" => js_sys::Uint16Array::new(buffer).to_vec().into_iter().map(f64::from).collect(),
        "i32" => js_sys::Int32Array::new(buffer).to_vec().into_iter().map(f64::from).collect(),
        "u32" => js_sys::Uint32Array::new(buffer).to_vec().into_iter().map(f64::from).collect(),
        // 64-bit integers may lose precision
        "i64" => js_sys::BigInt64Array::new(buffer).to_vec().into_iter().map(|v| v as f64).collect(),
        "u64" => js_sys::BigUint64Array::new(buffer).to_vec().into_iter().map(|v| v as f64).collect(),
        "f32" => js_sys::Float32Array::new(buffer).to_vec().into_iter().map(f64::from).collect(),
        _ => js_sys::Float64Array::new(buffer).to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_from_vec() {
        let field = field_from_vec((0..24).map(f64::from).collect(), &[2, 3, 4]).unwrap();
        assert_eq!(field.shape(), &[2, 3, 4]);
        assert_eq!(field[[1, 2, 3]], 23.0);
    }

    #[test]
    fn test_field_from_vec_rejects_mismatch() {
        let err = field_from_vec(vec![0.0; 10], &[2, 3, 2]).unwrap_err();
        assert!(matches!(err, PlotError::Shape { expected: 12, got: 10, .. }));
        assert!(err.to_string().contains("12"));
    }
}
