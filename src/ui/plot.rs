use eframe::egui::{self, TextureHandle, TextureOptions, Ui};
use egui_plot::{Plot, PlotBounds, PlotImage, PlotPoint};

use crate::color::{rgb_to_color_image, Heatmap};
use crate::imaging::compare::ViewWindow;
use crate::state::{AppState, ViewMode};

// ---------------------------------------------------------------------------
// Texture cache
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum TextureKey {
    Comparison(u64),
    Single {
        tile: String,
        element: String,
        transpose: bool,
    },
}

/// Keeps the GPU texture of the central image until its source changes.
#[derive(Default)]
pub struct ImageView {
    key: Option<TextureKey>,
    texture: Option<TextureHandle>,
    /// Pixel size of `texture`, width first.
    size: [usize; 2],
    /// Window last pushed to the plot, so user panning is not overridden.
    applied: Option<ViewWindow>,
    heatmap: Heatmap,
}

impl ImageView {
    fn key(state: &AppState) -> TextureKey {
        match state.view_mode {
            ViewMode::Comparison => TextureKey::Comparison(state.comparison.generation),
            ViewMode::Single => TextureKey::Single {
                tile: state.left.clone(),
                element: state.element.clone(),
                transpose: state.transpose,
            },
        }
    }

    fn refresh(&mut self, ctx: &egui::Context, state: &AppState) {
        let key = Self::key(state);
        if self.key.as_ref() == Some(&key) && self.texture.is_some() {
            return;
        }

        let image = match &key {
            TextureKey::Comparison(_) => Some(rgb_to_color_image(&state.comparison.image)),
            TextureKey::Single { tile, element, transpose } => state
                .datasets
                .get(tile)
                .and_then(|ds| ds.get(element))
                .map(|map| {
                    if *transpose {
                        self.heatmap.render(&map.t().to_owned())
                    } else {
                        self.heatmap.render(map)
                    }
                }),
        };

        match image {
            Some(image) => {
                self.size = image.size;
                self.texture = Some(ctx.load_texture("central_image", image, TextureOptions::NEAREST));
            }
            None => self.texture = None,
        }
        self.key = Some(key);
        self.applied = None;
    }

    /// Region to show: the detected window for comparisons, the whole map otherwise.
    fn target_window(&self, state: &AppState) -> ViewWindow {
        match state.view_mode {
            ViewMode::Comparison => state.view_window(),
            ViewMode::Single => ViewWindow {
                x_min: 0.0,
                x_max: self.size[0] as f64,
                y_min: 0.0,
                y_max: self.size[1] as f64,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Central plot
// ---------------------------------------------------------------------------

/// Render the comparison (or single map) in the central panel.
pub fn image_plot(ui: &mut Ui, state: &AppState, view: &mut ImageView) {
    view.refresh(ui.ctx(), state);

    let Some(texture) = view.texture.clone() else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Choose a folder to compare tiles  (File → Choose Folder…)");
        });
        return;
    };

    let [w, h] = view.size;
    let (w, h) = (w as f64, h as f64);
    let window = view.target_window(state);
    let push_bounds = view.applied != Some(window);

    Plot::new("image_plot")
        .data_aspect(1.0)
        .show_grid(false)
        .show_axes(false)
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            plot_ui.image(PlotImage::new(
                texture.id(),
                PlotPoint::new(w / 2.0, h / 2.0),
                egui::vec2(w as f32, h as f32),
            ));
            if push_bounds {
                // Image row 0 is at the top of the plot.
                plot_ui.set_plot_bounds(PlotBounds::from_min_max(
                    [window.x_min, h - window.y_max],
                    [window.x_max, h - window.y_min],
                ));
            }
        });

    if push_bounds {
        view.applied = Some(window);
    }
}
