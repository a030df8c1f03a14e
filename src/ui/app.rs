use eframe::egui;
use tokio::sync::mpsc;

use crate::common::{RoomCommand, RoomEvent};
use crate::room::Screen;

use super::components::{chat_area, header, input_bar, sign_in};
use super::state::AppState;

#[derive(Default)]
struct FrameActions {
    sign_in: bool,
    sign_out: bool,
    send: bool,
}

pub struct ChatApp {
    state: AppState,
    command_sender: mpsc::Sender<RoomCommand>,
    event_receiver: mpsc::Receiver<RoomEvent>,
}

impl ChatApp {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        command_sender: mpsc::Sender<RoomCommand>,
        event_receiver: mpsc::Receiver<RoomEvent>,
    ) -> Self {
        Self {
            state: AppState::new(),
            command_sender,
            event_receiver,
        }
    }

    fn handle_room_events(&mut self) {
        while let Ok(event) = self.event_receiver.try_recv() {
            self.state.apply(event);
        }
    }

    fn send_command(&mut self, command: RoomCommand) -> bool {
        if let Err(err) = self.command_sender.try_send(command) {
            log::warn!("Failed to send command to room: {err}");
            return false;
        }
        true
    }

    fn apply_actions(&mut self, actions: FrameActions) {
        if actions.sign_in {
            self.state.signing_in = self.send_command(RoomCommand::SignIn);
        }
        if actions.sign_out {
            self.send_command(RoomCommand::SignOut);
        }
        if actions.send {
            if let Some(text) = self.state.begin_send() {
                if !self.send_command(RoomCommand::SendMessage(text)) {
                    self.state.abort_send("The room is not responding; try again");
                }
            }
        }
    }
}

impl eframe::App for ChatApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_room_events();

        let scroll_to_latest = self.state.take_scroll();
        let mut actions = FrameActions::default();

        match &self.state.screen {
            Screen::SignIn => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    actions.sign_in = sign_in::render(
                        ui,
                        self.state.signing_in,
                        self.state.last_error.as_deref(),
                    );
                });
            }
            Screen::Chat { user, messages } => {
                egui::TopBottomPanel::top("room_header").show(ctx, |ui| {
                    actions.sign_out = header::render(ui, user);
                });

                egui::TopBottomPanel::bottom("composer").show(ctx, |ui| {
                    if let Some(error) = self.state.last_error.as_deref() {
                        ui.colored_label(egui::Color32::RED, error);
                    }
                    actions.send =
                        input_bar::render(ui, &mut self.state.input_text, self.state.sending);
                });

                egui::CentralPanel::default().show(ctx, |ui| {
                    chat_area::render(ui, messages, scroll_to_latest);
                });
            }
        }

        self.apply_actions(actions);
        ctx.request_repaint();
    }
}
