//! The room: text wrapping, live feed, session mirror and the state machine
//! that ties them together.

pub mod client;
pub mod feed;
pub mod listeners;
pub mod session;
pub mod view;
pub mod window;
pub mod wrap;

pub use client::RoomClient;
pub use feed::{FeedSubscription, MessageFeed};
pub use listeners::ListenerId;
pub use session::SessionState;
pub use view::{MessageSide, RenderedMessage, RoomState, RoomView, Screen};
pub use window::{FEED_LIMIT, FeedWindow};
pub use wrap::{DEFAULT_LINE_WIDTH, wrap};
