use std::time::Instant;

use eframe::egui;

use crate::config::AppConfig;
use crate::state::AppState;
use crate::ui::{panels, plot, table};
use crate::worker::Worker;

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct ElementalScopeApp {
    pub state: AppState,
    image_view: plot::ImageView,
    show_table: bool,
}

impl ElementalScopeApp {
    pub fn new(cc: &eframe::CreationContext<'_>, config: AppConfig) -> Self {
        let worker = Worker::new(Some(cc.egui_ctx.clone()));
        let mut state = AppState::new(config, worker);
        state.hint("Choose a folder with one subfolder per tile to start.");
        Self {
            state,
            image_view: plot::ImageView::default(),
            show_table: false,
        }
    }
}

impl eframe::App for ElementalScopeApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = Instant::now();
        self.state.poll(now);
        if let Some(wait) = self.state.next_wakeup(now) {
            ctx.request_repaint_after(wait);
        }

        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state, &mut self.show_table);
        });

        // ---- Bottom panel: hint log ----
        egui::TopBottomPanel::bottom("hint_panel")
            .resizable(true)
            .default_height(120.0)
            .show(ctx, |ui| {
                panels::hint_panel(ui, &self.state);
            });

        // ---- Left side panel: controls ----
        egui::SidePanel::left("control_panel")
            .default_width(260.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: image ----
        egui::CentralPanel::default().show(ctx, |ui| {
            plot::image_plot(ui, &self.state, &mut self.image_view);
        });

        let left = self.state.left.clone();
        table::table_window(ctx, &mut self.show_table, &left, self.state.datasets.get(&left));
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.state.config.save();
    }
}
