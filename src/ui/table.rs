use eframe::egui::{self, RichText, Ui};
use egui_extras::{Column, TableBuilder};

use crate::color::generate_palette;
use crate::data::model::ElementDataset;

/// One row per field: name, shape, value range and mean.
pub fn dataset_table(ui: &mut Ui, name: &str, dataset: &ElementDataset) {
    let res = dataset
        .resolution
        .map(|r| format!("{r:.6} µm/pixel"))
        .unwrap_or_else(|| "unknown pixel size".to_string());
    ui.label(format!("{name}: {} fields, {res}", dataset.len()));
    ui.separator();

    let summaries = dataset.summaries();
    let colors = generate_palette(summaries.len());

    TableBuilder::new(ui)
        .striped(true)
        .column(Column::auto().at_least(80.0))
        .column(Column::auto().at_least(80.0))
        .columns(Column::auto().at_least(70.0), 3)
        .header(20.0, |mut header| {
            for title in ["Field", "Shape", "Min", "Max", "Mean"] {
                header.col(|ui| {
                    ui.strong(title);
                });
            }
        })
        .body(|mut body| {
            for (s, color) in summaries.iter().zip(colors) {
                body.row(18.0, |mut row| {
                    row.col(|ui| {
                        ui.label(RichText::new(&s.name).color(color));
                    });
                    row.col(|ui| {
                        ui.label(format!("{} × {}", s.rows, s.cols));
                    });
                    for v in [s.min, s.max, s.mean] {
                        row.col(|ui| {
                            ui.label(format!("{v:.3}"));
                        });
                    }
                });
            }
        });
}

/// Floating window listing the fields of the left tile.
pub fn table_window(ctx: &egui::Context, open: &mut bool, name: &str, dataset: Option<&ElementDataset>) {
    egui::Window::new("Dataset Table")
        .open(open)
        .resizable(true)
        .default_width(420.0)
        .show(ctx, |ui: &mut Ui| match dataset {
            Some(ds) => dataset_table(ui, name, ds),
            None => {
                ui.label("No dataset selected.");
            }
        });
}
