use std::time::Instant;

use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use crate::color::legend_entries;
use crate::data::h5;
use crate::imaging::pair::PairMethod;
use crate::state::{AppState, ViewMode};

// ---------------------------------------------------------------------------
// Left side panel – control panel
// ---------------------------------------------------------------------------

/// Render the control panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Control Panel");
    ui.separator();

    if state.datasets.is_empty() {
        ui.label("No folder loaded.");
        if ui
            .add_enabled(!state.loading, egui::Button::new(choose_label(state)))
            .clicked()
        {
            choose_folder_dialog(state);
        }
        return;
    }

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            selectors(ui, state);
            ui.separator();
            position_controls(ui, state);
            ui.separator();
            action_buttons(ui, state);
            ui.separator();
            legend(ui, state);
        });
}

fn choose_label(state: &AppState) -> &'static str {
    if state.loading {
        "Loading ..."
    } else {
        "Choose Folder"
    }
}

fn combo(ui: &mut Ui, id: &str, label: &str, current: &str, choices: &[String]) -> Option<String> {
    let mut picked = None;
    ui.horizontal(|ui: &mut Ui| {
        ui.label(label);
        egui::ComboBox::from_id_salt(id)
            .selected_text(current)
            .show_ui(ui, |ui: &mut Ui| {
                for choice in choices {
                    if ui.selectable_label(current == choice.as_str(), choice).clicked() {
                        picked = Some(choice.clone());
                    }
                }
            });
    });
    picked
}

fn selectors(ui: &mut Ui, state: &mut AppState) {
    let tasks = state.task_choices();
    if let Some(task) = combo(ui, "task", "Task", &state.task_choice.clone(), &tasks) {
        state.select_task(&task);
    }

    let tiles = state.tile_names();
    if let Some(left) = combo(ui, "left", "Left", &state.left.clone(), &tiles) {
        state.set_left(&left);
    }
    if let Some(right) = combo(ui, "right", "Right", &state.right.clone(), &tiles) {
        state.set_right(&right);
    }

    let elements = state.elements.clone();
    if let Some(element) = combo(ui, "element", "Element", &state.element.clone(), &elements) {
        state.element = element;
    }

    let methods: Vec<String> = PairMethod::ALL.iter().map(|m| m.to_string()).collect();
    if let Some(method) = combo(ui, "method", "Method", &state.method.to_string(), &methods) {
        if let Ok(m) = method.parse() {
            state.method = m;
            state.config.pair_method = m;
        }
    }

    ui.checkbox(&mut state.transpose, "Transpose");

    ui.horizontal(|ui: &mut Ui| {
        ui.selectable_value(&mut state.view_mode, ViewMode::Comparison, "Comparison");
        ui.selectable_value(&mut state.view_mode, ViewMode::Single, "Left map");
    });
}

fn position_controls(ui: &mut Ui, state: &mut AppState) {
    ui.strong("Position");
    let mut moved = false;
    moved |= ui
        .add(egui::Slider::new(&mut state.placement.percent_x, 0.0..=100.0).text("X %").integer())
        .changed();
    moved |= ui
        .add(egui::Slider::new(&mut state.placement.percent_y, 0.0..=100.0).text("Y %").integer())
        .changed();
    // Zoom only changes the view window.
    ui.add(egui::Slider::new(&mut state.zoom, 0.0..=100.0).text("Zoom %").integer());
    if moved {
        state.slider_changed(Instant::now());
    }

    let (edited, delta) = move_row(ui, "dx", state.placement.dx);
    state.placement.dx = edited;
    if let Some(d) = delta {
        state.move_x(d);
    }
    let (edited, delta) = move_row(ui, "dy", state.placement.dy);
    state.placement.dy = edited;
    if let Some(d) = delta {
        state.move_y(d);
    }
}

/// `−10 −1 [value] +1 +10` row.  Typing a value sets it without comparing.
///
/// Returns the (possibly edited) value and the clicked step, if any.
fn move_row(ui: &mut Ui, label: &str, value: i64) -> (i64, Option<i64>) {
    let mut delta = None;
    let mut edited = value;
    ui.horizontal(|ui: &mut Ui| {
        ui.label(label);
        if ui.small_button("−10").clicked() {
            delta = Some(-10);
        }
        if ui.small_button("−1").clicked() {
            delta = Some(-1);
        }
        ui.add(egui::DragValue::new(&mut edited).speed(1.0));
        if ui.small_button("+1").clicked() {
            delta = Some(1);
        }
        if ui.small_button("+10").clicked() {
            delta = Some(10);
        }
    });
    (edited, delta)
}

fn action_buttons(ui: &mut Ui, state: &mut AppState) {
    ui.horizontal_wrapped(|ui: &mut Ui| {
        if ui.button("Compare").clicked() {
            state.compare();
        }
        if ui.button("Save").clicked() {
            state.save();
        }
        let stitch_label = if state.pending_writes > 0 {
            "Writing ..."
        } else {
            "Stitch"
        };
        if ui
            .add_enabled(state.can_stitch(), egui::Button::new(stitch_label))
            .clicked()
        {
            state.stitch();
        }
        if ui.button("Reset").clicked() {
            state.reset();
        }
        if ui.button("Exit").clicked() {
            ui.ctx().send_viewport_cmd(egui::ViewportCommand::Close);
        }
    });
}

fn legend(ui: &mut Ui, state: &AppState) {
    for (label, color) in legend_entries(state.method, &state.left, &state.right) {
        ui.label(RichText::new(format!("■ {label}")).color(color));
    }
}

// ---------------------------------------------------------------------------
// Bottom panel – hint log
// ---------------------------------------------------------------------------

pub fn hint_panel(ui: &mut Ui, state: &AppState) {
    ScrollArea::vertical()
        .auto_shrink([false, false])
        .stick_to_bottom(true)
        .show(ui, |ui: &mut Ui| {
            for line in &state.hints {
                let text = RichText::new(line).monospace();
                if line.contains("$ Error:") {
                    ui.label(text.color(Color32::RED));
                } else {
                    ui.label(text);
                }
            }
        });
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState, show_table: &mut bool) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui
                .add_enabled(!state.loading, egui::Button::new("Choose Folder…"))
                .clicked()
            {
                choose_folder_dialog(state);
                ui.close_menu();
            }
            if ui.button("Open File…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
            if ui
                .add_enabled(!state.datasets.is_empty(), egui::Button::new("Export Dataset…"))
                .clicked()
            {
                export_dialog(state);
                ui.close_menu();
            }
            if ui.button("Save Image…").clicked() {
                save_image_dialog(state);
                ui.close_menu();
            }
            ui.separator();
            if ui.button("Exit").clicked() {
                ui.ctx().send_viewport_cmd(egui::ViewportCommand::Close);
            }
        });

        ui.separator();

        if ui.selectable_label(*show_table, "Dataset Table").clicked() {
            *show_table = !*show_table;
        }

        ui.separator();

        if state.loading {
            ui.spinner();
            ui.label("Loading ...");
        } else if !state.datasets.is_empty() {
            ui.label(format!(
                "{} tiles loaded, {} saved tasks",
                state.datasets.len(),
                state.tasks.len()
            ));
        }

        if let Some(msg) = &state.status_message {
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn choose_folder_dialog(state: &mut AppState) {
    let mut dialog = rfd::FileDialog::new().set_title("Select Folder");
    if let Some(last) = &state.config.last_root {
        dialog = dialog.set_directory(last);
    }
    if let Some(root) = dialog.pick_folder() {
        state.choose_root(&root);
    }
}

pub fn open_file_dialog(state: &mut AppState) {
    let mut extensions = vec!["csv"];
    if h5::ENABLED {
        extensions.extend(["h5", "hdf5"]);
    }
    let mut dialog = rfd::FileDialog::new()
        .set_title("Open element data")
        .add_filter("Supported files", &extensions);
    if h5::ENABLED {
        dialog = dialog.add_filter("HDF5", &["h5", "hdf5"]);
    }
    let file = dialog.add_filter("Element CSV", &["csv"]).pick_file();

    if let Some(path) = file {
        if let Err(e) = state.open_file(&path) {
            state.report_error(&e.context(format!("opening {}", path.display())));
        }
    }
}

pub fn export_dialog(state: &mut AppState) {
    let dir = rfd::FileDialog::new()
        .set_title(format!("Export {}", state.left))
        .pick_folder();
    if let Some(dir) = dir {
        if let Err(e) = state.export_selected(&dir) {
            state.report_error(&e);
        }
    }
}

pub fn save_image_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Save comparison image")
        .add_filter("PNG", &["png"])
        .set_file_name("comparison.png")
        .save_file();
    if let Some(path) = file {
        if let Err(e) = state.save_image(&path) {
            state.report_error(&e);
        }
    }
}
