//! Errors reported back to the connection that issued a command
//!
//! Every rejected command becomes one [`GameError`] carrying a machine
//! readable `code` next to the human message. None of these are fatal: the
//! room and player state are left as they were.

use serde::Serialize;
use thiserror::Error;

/// Broad category of a rejected command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    /// Join rejected, room missing, start refused
    Room,
    /// Command from a player with no piece, no game, or no room
    Player,
    /// Malformed names or unknown move tokens
    Validation,
    /// Undecodable input from the transport
    Network,
}

/// Error codes sent over the wire
pub mod codes {
    pub const ROOM_FULL: &str = "ROOM_FULL";
    pub const GAME_ALREADY_STARTED: &str = "GAME_ALREADY_STARTED";
    pub const DUPLICATE_PLAYER: &str = "DUPLICATE_PLAYER";
    pub const ALREADY_IN_ROOM: &str = "ALREADY_IN_ROOM";
    pub const ROOM_NOT_FOUND: &str = "ROOM_NOT_FOUND";
    pub const NO_PLAYERS: &str = "NO_PLAYERS";
    pub const NOT_HOST: &str = "NOT_HOST";
    pub const PLAYER_NOT_FOUND: &str = "PLAYER_NOT_FOUND";
    pub const GAME_NOT_STARTED: &str = "GAME_NOT_STARTED";
    pub const NO_ACTIVE_PIECE: &str = "NO_ACTIVE_PIECE";
    pub const PLAYER_ELIMINATED: &str = "PLAYER_ELIMINATED";
    pub const INVALID_ROOM_NAME: &str = "INVALID_ROOM_NAME";
    pub const INVALID_PLAYER_NAME: &str = "INVALID_PLAYER_NAME";
    pub const INVALID_PLAYER_ID: &str = "INVALID_PLAYER_ID";
    pub const INVALID_DIRECTION: &str = "INVALID_DIRECTION";
    pub const MALFORMED_MESSAGE: &str = "MALFORMED_MESSAGE";
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{message} ({code})")]
pub struct GameError {
    pub kind: ErrorKind,
    pub code: &'static str,
    pub message: String,
}

impl GameError {
    pub fn new(kind: ErrorKind, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            kind,
            code,
            message: message.into(),
        }
    }

    pub fn room(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Room, code, message)
    }

    pub fn player(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Player, code, message)
    }

    pub fn validation(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, code, message)
    }

    pub fn network(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Network, code, message)
    }
}

pub type GameResult<T> = Result<T, GameError>;
