pub mod audio;
pub mod client;
pub mod outbound;
pub mod session;
pub mod turn;

pub use cartesia_agents_types as types;

pub use client::{Client, ClientError, Config, ConfigBuilder};
pub use session::{Session, SessionError};
pub use turn::{TurnConfig, TurnError, TurnOutcome, TurnWatcher};
