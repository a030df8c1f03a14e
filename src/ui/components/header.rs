use eframe::egui;

use crate::common::UserIdentity;

/// Room title and sign-out button. Returns true when sign-out is clicked.
pub fn render(ui: &mut egui::Ui, user: &UserIdentity) -> bool {
    let mut sign_out = false;
    ui.horizontal(|ui| {
        ui.heading("Chat Room");
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            if ui.button("Sign out").clicked() {
                sign_out = true;
            }
            ui.label(egui::RichText::new(user.label()).weak());
        });
    });
    sign_out
}
