//! Thin eframe shell that hosts a [`FigureWidget`]

use std::cell::RefCell;
use std::rc::Rc;

use crate::widget::FigureWidget;

/// The egui application for one figure canvas
pub struct FigureApp {
    widget: Rc<RefCell<FigureWidget>>,
}

impl FigureApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, widget: Rc<RefCell<FigureWidget>>) -> Self {
        Self { widget }
    }
}

impl eframe::App for FigureApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| {
                let size = ui.available_size();
                let response = self.widget.borrow_mut().show(ui, size);

                // Keep the hover readout following the pointer
                if response.hovered() {
                    ctx.request_repaint();
                }
            });
    }
}
