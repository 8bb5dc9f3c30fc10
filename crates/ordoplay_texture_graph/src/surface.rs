// SPDX-License-Identifier: MIT OR Apache-2.0
//! Presentation hook: drawing a node body inside an editor-supplied rect.
//!
//! Nothing here is called by the evaluator; the editor asks a node to draw
//! itself after (or between) passes and the node only reads its own state.

use crate::node::Node;
use crate::socket::{ImageBuffer, MaskBuffer, SocketValue};
use egui::{Color32, Rect, Sense, Stroke, UiBuilder, Vec2};

/// Largest number of preview cells along either axis
const PREVIEW_CELLS: u32 = 8;
/// Edge length of a color swatch
const SWATCH_SIZE: f32 = 14.0;

fn to_color32(color: [f32; 4]) -> Color32 {
    let [r, g, b, a] = color.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8);
    Color32::from_rgba_unmultiplied(r, g, b, a)
}

/// Draw a single color swatch
pub(crate) fn color_swatch(ui: &mut egui::Ui, color: [f32; 4]) {
    let (rect, _) = ui.allocate_exact_size(Vec2::splat(SWATCH_SIZE), Sense::hover());
    ui.painter().rect_filled(rect, 2.0, to_color32(color));
    ui.painter()
        .rect_stroke(rect, 2.0, Stroke::new(1.0, Color32::from_gray(90)));
}

/// Nearest-neighbour sample of at most `max_cells` x `max_cells` pixels
pub(crate) fn downsample(image: &ImageBuffer, max_cells: u32) -> (u32, u32, Vec<[f32; 4]>) {
    if image.is_empty() || max_cells == 0 {
        return (0, 0, Vec::new());
    }
    let cols = image.width.min(max_cells);
    let rows = image.height.min(max_cells);
    let cells = (0..rows)
        .flat_map(|row| (0..cols).map(move |col| (col, row)))
        .map(|(col, row)| {
            let x = col * image.width / cols;
            let y = row * image.height / rows;
            image.pixel(x, y).unwrap_or([0.0; 4])
        })
        .collect();
    (cols, rows, cells)
}

fn mask_as_image(mask: &MaskBuffer) -> ImageBuffer {
    ImageBuffer {
        width: mask.width,
        height: mask.height,
        pixels: mask.values.iter().map(|&v| [v, v, v, 1.0]).collect(),
    }
}

fn image_preview(ui: &mut egui::Ui, image: &ImageBuffer) {
    let (cols, rows, cells) = downsample(image, PREVIEW_CELLS);
    if cells.is_empty() {
        ui.weak("empty image");
        return;
    }
    let cell = (ui.available_width() / cols as f32).clamp(2.0, SWATCH_SIZE);
    let (rect, _) = ui.allocate_exact_size(Vec2::new(cell * cols as f32, cell * rows as f32), Sense::hover());
    let painter = ui.painter_at(rect);
    for (i, color) in cells.into_iter().enumerate() {
        let col = (i as u32 % cols) as f32;
        let row = (i as u32 / cols) as f32;
        let min = rect.min + Vec2::new(col * cell, row * cell);
        painter.rect_filled(Rect::from_min_size(min, Vec2::splat(cell)), 0.0, to_color32(color));
    }
    ui.weak(format!("{}x{}", image.width, image.height));
}

fn format_components(components: &[f32]) -> String {
    let parts: Vec<String> = components.iter().map(|c| format!("{c:.3}")).collect();
    format!("({})", parts.join(", "))
}

fn value_preview(ui: &mut egui::Ui, value: &SocketValue) {
    match value {
        SocketValue::Scalar(v) => {
            ui.label(format!("{v:.3}"));
        }
        SocketValue::Vector2(_) | SocketValue::Vector3(_) | SocketValue::Vector4(_) => {
            ui.label(format_components(value.as_vector().unwrap_or_default()));
        }
        SocketValue::Color(color) => color_swatch(ui, *color),
        SocketValue::Image(image) => image_preview(ui, image),
        SocketValue::Mask(mask) => image_preview(ui, &mask_as_image(mask)),
        SocketValue::Bytes(bytes) => {
            ui.label(format!("{} bytes", bytes.len()));
        }
        SocketValue::Texture(handle) => {
            ui.label(format!("texture {}", handle.0));
        }
    }
}

impl Node {
    /// Draw this node's body inside `content_area`: the kernel's own content,
    /// a preview per output, and the last error.
    pub fn render_surface(&self, ui: &mut egui::Ui, content_area: Rect) {
        ui.allocate_new_ui(UiBuilder::new().max_rect(content_area), |ui| {
            ui.set_clip_rect(content_area.intersect(ui.clip_rect()));
            self.kernel().surface(ui);

            for port in self.outputs() {
                ui.horizontal(|ui| {
                    ui.label(&port.name);
                    match port.value() {
                        Some(value) => value_preview(ui, value),
                        None => {
                            ui.weak("-");
                        }
                    }
                });
            }

            if let Some(error) = self.last_error() {
                ui.colored_label(Color32::from_rgb(230, 80, 80), error.to_string());
            }
        });
    }
}
