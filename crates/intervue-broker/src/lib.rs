pub mod client;
pub mod dispatch;
pub mod error;
pub mod room;
pub mod token;

pub use client::RoomClient;
pub use dispatch::{DispatchRule, AGENT_ROOM_PATTERN};
pub use error::{BrokerError, Result};
pub use room::{room_name_for, session_id_from_room, AudioFrame, RoomEvent, RoomHandle};
pub use token::{RoomGrants, RoomToken, TokenMinter};
