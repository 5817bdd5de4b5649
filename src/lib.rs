//! TETRS Arena - two-player versus engine
//!
//! Rooms of up to two players race on identical piece sequences. Clearing
//! lines pushes garbage onto the opponent; the last player standing wins.

pub mod board;
pub mod driver;
pub mod engine;
pub mod error;
pub mod piece;
pub mod player;
pub mod protocol;
pub mod room;
pub mod scheduler;
pub mod score;
pub mod sequence;
pub mod session;
pub mod settings;
pub mod srs;
pub mod tetromino;

pub use error::{ErrorKind, GameError, GameResult};
pub use protocol::{Command, Inbound, Outbound, ServerEvent};
pub use room::{Room, RoomOptions};
pub use session::SessionManager;
pub use settings::Settings;
