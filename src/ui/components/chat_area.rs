use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use eframe::egui;

use crate::room::{MessageSide, RenderedMessage};

pub fn render(ui: &mut egui::Ui, messages: &[RenderedMessage], scroll_to_latest: bool) {
    egui::ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui| {
            if messages.is_empty() {
                ui.label(egui::RichText::new("No messages yet").weak());
            }

            for message in messages {
                render_message(ui, message);
                ui.add_space(4.0);
            }

            // Anchor below the last message.
            let anchor = ui.allocate_response(egui::vec2(1.0, 1.0), egui::Sense::hover());
            if scroll_to_latest {
                anchor.scroll_to_me(Some(egui::Align::BOTTOM));
            }
        });
}

fn render_message(ui: &mut egui::Ui, message: &RenderedMessage) {
    let (layout, fill) = match message.side {
        MessageSide::Sent => (
            egui::Layout::right_to_left(egui::Align::TOP),
            ui.visuals().selection.bg_fill,
        ),
        MessageSide::Received => (
            egui::Layout::left_to_right(egui::Align::TOP),
            ui.visuals().faint_bg_color,
        ),
    };

    ui.with_layout(layout, |ui| {
        ui.colored_label(avatar_color(&message.photo_url), "●")
            .on_hover_text(&message.photo_url);

        egui::Frame::group(ui.style()).fill(fill).show(ui, |ui| {
            ui.vertical(|ui| {
                for line in &message.lines {
                    ui.label(line);
                }
            });
        });
    });
}

/// Stable color per author photo, standing in for the image itself.
fn avatar_color(photo_url: &str) -> egui::Color32 {
    let mut hasher = DefaultHasher::new();
    photo_url.hash(&mut hasher);
    let [r, g, b, ..] = hasher.finish().to_le_bytes();
    egui::Color32::from_rgb(r | 0x40, g | 0x40, b | 0x40)
}
