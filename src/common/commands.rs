/// Intents sent from the UI to the room client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomCommand {
    /// Start the interactive sign-in flow.
    SignIn,
    SignOut,
    /// Append a message authored by the signed-in user.
    SendMessage(String),
}
