use eframe::egui;

const SEND_BUTTON_WIDTH: f32 = 64.0;

/// Composer row. Returns true when the user submits; the text stays in
/// `input_text` until the room acknowledges the append.
pub fn render(ui: &mut egui::Ui, input_text: &mut String, sending: bool) -> bool {
    let mut send = false;
    ui.horizontal(|ui| {
        let width = (ui.available_width() - SEND_BUTTON_WIDTH).max(0.0);
        let response = ui.add(
            egui::TextEdit::singleline(input_text)
                .hint_text("Type a message...")
                .desired_width(width),
        );

        if ui.add_enabled(!sending, egui::Button::new("Send")).clicked() {
            send = true;
        }

        if response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
            send = true;
            response.request_focus();
        }
    });

    send && !sending && !input_text.trim().is_empty()
}
