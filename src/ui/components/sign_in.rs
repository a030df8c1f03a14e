use eframe::egui;

/// Welcome screen with the sign-in affordance. Returns true on click.
pub fn render(ui: &mut egui::Ui, signing_in: bool, error: Option<&str>) -> bool {
    let mut clicked = false;
    ui.vertical_centered(|ui| {
        ui.add_space(80.0);
        ui.heading("Welcome to the Chat Room");
        ui.add_space(16.0);

        if ui
            .add_enabled(!signing_in, egui::Button::new("Sign in"))
            .clicked()
        {
            clicked = true;
        }
        if signing_in {
            ui.spinner();
        }

        if let Some(error) = error {
            ui.add_space(8.0);
            ui.colored_label(egui::Color32::RED, error);
        }
    });
    clicked
}
