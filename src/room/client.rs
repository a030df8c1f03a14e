use tokio::sync::mpsc;

use crate::common::{RoomCommand, RoomEvent};

use super::view::RoomView;

/// Event loop that owns the room and serves the UI.
///
/// Commands from the UI and snapshots from the live feed are handled one at a
/// time on this task. Appends run on their own tasks so a slow write never
/// holds back feed delivery; their outcome loops back here before it is
/// forwarded to the UI.
pub struct RoomClient {
    view: RoomView,
    event_sender: mpsc::Sender<RoomEvent>,
    command_receiver: mpsc::Receiver<RoomCommand>,
    append_sender: mpsc::Sender<RoomEvent>,
    append_results: mpsc::Receiver<RoomEvent>,
}

impl RoomClient {
    pub fn new(
        view: RoomView,
        event_sender: mpsc::Sender<RoomEvent>,
        command_receiver: mpsc::Receiver<RoomCommand>,
    ) -> Self {
        let (append_sender, append_results) = mpsc::channel(16);
        Self {
            view,
            event_sender,
            command_receiver,
            append_sender,
            append_results,
        }
    }

    /// Runs until the UI drops its command sender.
    pub async fn run(mut self) {
        log::info!("Room event loop started");
        self.render().await;

        loop {
            tokio::select! {
                command = self.command_receiver.recv() => {
                    if let Some(command) = command {
                        self.handle_command(command).await;
                    } else {
                        break;
                    }
                }
                updated = self.view.next_update() => {
                    if updated {
                        self.render().await;
                        self.flush_scroll().await;
                    } else {
                        // The query may have ended because the session did.
                        self.sync_session().await;
                    }
                }
                Some(outcome) = self.append_results.recv() => {
                    if matches!(outcome, RoomEvent::SendFailed { .. }) {
                        self.sync_session().await;
                    }
                    self.emit(outcome).await;
                }
            }
        }

        self.view.unmount();
        log::info!("Room event loop stopped");
    }

    async fn handle_command(&mut self, command: RoomCommand) {
        self.sync_session().await;
        match command {
            RoomCommand::SignIn => match self.view.sign_in().await {
                Ok(()) => self.render().await,
                Err(err) => self.emit(RoomEvent::SignInFailed(err.to_string())).await,
            },
            RoomCommand::SignOut => {
                if let Err(err) = self.view.sign_out().await {
                    log::warn!("Staying signed in: {err}");
                }
                self.render().await;
            }
            RoomCommand::SendMessage(text) => self.send_message(text).await,
        }
    }

    async fn send_message(&mut self, text: String) {
        let (feed, author) = match self.view.prepare_append() {
            Ok(parts) => parts,
            Err(err) => {
                self.emit(RoomEvent::SendFailed {
                    text,
                    reason: err.to_string(),
                })
                .await;
                return;
            }
        };

        let outcomes = self.append_sender.clone();
        tokio::spawn(async move {
            let event = match feed.append(&text, &author).await {
                Ok(id) => RoomEvent::MessageSent { id },
                Err(err) => RoomEvent::SendFailed {
                    text,
                    reason: err.to_string(),
                },
            };
            if let Err(err) = outcomes.send(event).await {
                log::warn!("Failed to report append result: {err}");
            }
        });

        self.view.request_scroll();
        self.flush_scroll().await;
    }

    /// Shows a session that changed behind the room's back.
    async fn sync_session(&mut self) {
        if self.view.sync_session() {
            log::info!("Session changed outside the room; now {:?}", self.view.state());
            self.render().await;
        }
    }

    async fn render(&mut self) {
        let screen = self.view.render();
        self.emit(RoomEvent::Render(screen)).await;
    }

    async fn flush_scroll(&mut self) {
        if self.view.take_scroll_request() {
            self.emit(RoomEvent::ScrollToLatest).await;
        }
    }

    async fn emit(&mut self, event: RoomEvent) {
        if let Err(err) = self.event_sender.send(event).await {
            log::warn!("Failed to notify UI: {err}");
        }
    }
}
