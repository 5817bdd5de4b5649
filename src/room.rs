//! Room state machine
//!
//! A room holds up to two players, each running an independent simulation
//! fed from one shared piece sequence. The room decides locking, line
//! clears, garbage distribution, elimination and the winner; it returns the
//! resulting events and leaves delivery to the caller.
//!
//! Lifecycle: Empty → Waiting (1 player) → Ready (2 players) → Playing →
//! back to Waiting/Ready on stop, or Empty once everyone leaves.

use crate::board::Grid;
use crate::engine::{
    ClearResult, add_penalty_lines, add_penalty_lines_reverse, can_place, clear_lines, lock_piece,
    move_piece, render_with_piece, rotate_piece_with_kicks_by,
};
use crate::error::{GameError, GameResult, codes};
use crate::piece::{Gravity, Piece};
use crate::player::Player;
use crate::protocol::{Direction, Outbound, PlayerId, PlayerSummary, ServerEvent, SpectrumEntry};
use crate::sequence::SequenceGenerator;
use crate::tetromino::{RotationDirection, TetrominoType};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::time::Duration;
use tracing::{debug, info};

/// Player slots per room
pub const MAX_PLAYERS: usize = 2;

/// Per-room game options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomOptions {
    /// Gravity tick interval at game start
    pub game_speed: Duration,
    /// Shorten the tick interval as lines are cleared
    pub speed_up: bool,
    /// Lines cleared in the room between speed-ups
    pub speed_up_every_lines: u32,
    /// Fastest tick interval speed-up may reach
    pub min_game_speed: Duration,
    /// Pieces spawn at the bottom and rise
    pub reverse_gravity: bool,
}

impl Default for RoomOptions {
    fn default() -> Self {
        Self {
            game_speed: Duration::from_millis(1000),
            speed_up: false,
            speed_up_every_lines: 10,
            min_game_speed: Duration::from_millis(100),
            reverse_gravity: false,
        }
    }
}

pub struct Room {
    name: String,
    /// Players in join order; this is also the processing order on each tick
    players: Vec<Player>,
    host: Option<PlayerId>,
    game_started: bool,
    /// Shared piece sequence, extended one batch at a time
    sequence: Vec<TetrominoType>,
    current_piece_index: usize,
    generator: Option<SequenceGenerator>,
    /// Fixed sequence seed; a time-based seed is drawn per game otherwise
    sequence_seed: Option<u32>,
    /// Garbage hole placement, kept apart from the piece sequence
    penalty_rng: ChaCha8Rng,
    options: RoomOptions,
    game_speed: Duration,
    lines_cleared: u32,
    players_at_start: usize,
}

impl Room {
    pub fn new(name: impl Into<String>, options: RoomOptions) -> Self {
        Self {
            name: name.into(),
            players: Vec::with_capacity(MAX_PLAYERS),
            host: None,
            game_started: false,
            sequence: Vec::new(),
            current_piece_index: 0,
            generator: None,
            sequence_seed: None,
            penalty_rng: ChaCha8Rng::from_entropy(),
            game_speed: options.game_speed,
            options,
            lines_cleared: 0,
            players_at_start: 0,
        }
    }

    /// Use a fixed piece sequence seed instead of name + time
    pub fn with_sequence_seed(mut self, seed: u32) -> Self {
        self.sequence_seed = Some(seed);
        self
    }

    /// Make garbage hole placement reproducible
    pub fn with_penalty_seed(mut self, seed: u64) -> Self {
        self.penalty_rng = ChaCha8Rng::seed_from_u64(seed);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player(&self, id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn player_mut(&mut self, id: &str) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    pub fn is_started(&self) -> bool {
        self.game_started
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn sequence(&self) -> &[TetrominoType] {
        &self.sequence
    }

    pub fn current_piece_index(&self) -> usize {
        self.current_piece_index
    }

    /// Current gravity tick interval
    pub fn game_speed(&self) -> Duration {
        self.game_speed
    }

    pub fn gravity(&self) -> Gravity {
        if self.options.reverse_gravity {
            Gravity::Up
        } else {
            Gravity::Down
        }
    }

    fn index_of(&self, id: &str) -> Option<usize> {
        self.players.iter().position(|p| p.id == id)
    }

    /// True while the game has not started and a slot is free
    pub fn can_join(&self) -> bool {
        !self.game_started && self.players.len() < MAX_PLAYERS
    }

    pub fn add_player(&mut self, id: &str, name: &str) -> GameResult<()> {
        if id.is_empty() {
            return Err(GameError::validation(codes::INVALID_PLAYER_ID, "Player id is required"));
        }
        if name.is_empty() {
            return Err(GameError::validation(codes::INVALID_PLAYER_NAME, "Player name is required"));
        }
        if self.index_of(id).is_some() {
            return Err(GameError::room(codes::DUPLICATE_PLAYER, "Player is already in this room"));
        }
        if self.game_started {
            return Err(GameError::room(codes::GAME_ALREADY_STARTED, "Game already in progress"));
        }
        if self.players.len() >= MAX_PLAYERS {
            return Err(GameError::room(codes::ROOM_FULL, "Room is full"));
        }

        self.players.push(Player::new(id, name));
        if self.host.is_none() {
            self.host = Some(id.to_string());
        }
        info!("Player '{}' ({}) joined room '{}'", name, id, self.name);
        Ok(())
    }

    /// Remove a player. Returns true when the room is now empty and can be
    /// discarded.
    pub fn remove_player(&mut self, id: &str) -> bool {
        if let Some(index) = self.index_of(id) {
            let player = self.players.remove(index);
            info!("Player '{}' ({}) left room '{}'", player.name, id, self.name);
        }

        if self.players.is_empty() {
            self.host = None;
            self.cleanup();
            return true;
        }

        if self.host.as_deref() == Some(id) {
            self.host = self.players.first().map(|p| p.id.clone());
            debug!("Room '{}' host is now {:?}", self.name, self.host);
        }
        false
    }

    /// Release game state once the room has no players left
    pub fn cleanup(&mut self) {
        self.stop_game();
    }

    pub fn start_game(&mut self) -> GameResult<()> {
        if self.game_started {
            return Err(GameError::room(codes::GAME_ALREADY_STARTED, "Game already in progress"));
        }
        if self.players.is_empty() {
            return Err(GameError::room(codes::NO_PLAYERS, "Cannot start a game without players"));
        }

        let mut generator = match self.sequence_seed {
            Some(seed) => SequenceGenerator::new(seed),
            None => SequenceGenerator::for_room(&self.name),
        };
        self.sequence = generator.batch();
        self.generator = Some(generator);
        self.current_piece_index = 0;
        self.game_speed = self.options.game_speed;
        self.lines_cleared = 0;

        let gravity = self.gravity();
        for player in &mut self.players {
            player.start(&self.sequence, gravity);
        }
        self.current_piece_index += 1;
        self.players_at_start = self.players.len();
        self.game_started = true;

        info!(
            "Room '{}' started with {} player(s), speed {:?}",
            self.name,
            self.players.len(),
            self.game_speed
        );
        Ok(())
    }

    /// Reset every player and the shared sequence. Safe to call repeatedly.
    pub fn stop_game(&mut self) {
        if self.game_started {
            info!("Room '{}' stopped", self.name);
        }
        self.game_started = false;
        for player in &mut self.players {
            player.reset();
        }
        self.sequence.clear();
        self.current_piece_index = 0;
        self.generator = None;
        self.game_speed = self.options.game_speed;
        self.lines_cleared = 0;
        self.players_at_start = 0;
    }

    /// Column heights of a player's stack as shown to the opponent
    pub fn spectrum(&self, player: &Player) -> Vec<u8> {
        match self.gravity() {
            Gravity::Down => player.grid.spectrum(),
            Gravity::Up => player.grid.spectrum_reversed(),
        }
    }

    /// Placement check that also treats the top edge as solid when gravity
    /// is reversed
    fn fits(gravity: Gravity, grid: &Grid, piece: &Piece, dx: i32, dy: i32) -> bool {
        can_place(grid, piece, dx, dy)
            && match gravity {
                Gravity::Down => true,
                Gravity::Up => piece.cells().all(|(_, y, _)| y + dy >= 0),
            }
    }

    /// One gravity tick for every active player, in join order
    pub fn tick(&mut self) -> Vec<Outbound> {
        let mut outbox = Vec::new();
        if !self.game_started {
            return outbox;
        }

        let mut locked_any = false;
        for index in 0..self.players.len() {
            if !self.players[index].is_active() {
                continue;
            }
            if !self.step_player(index, &mut outbox) {
                locked_any = true;
            }
        }

        self.push_board_updates(&mut outbox);
        if locked_any {
            outbox.extend(self.room_update());
        }
        self.finish_if_over(&mut outbox);
        outbox
    }

    /// Handle a move command from a player
    pub fn apply_move(&mut self, id: &str, direction: Direction) -> GameResult<Vec<Outbound>> {
        let index = self
            .index_of(id)
            .ok_or_else(|| GameError::player(codes::PLAYER_NOT_FOUND, "Player is not in this room"))?;
        if !self.game_started {
            return Err(GameError::player(codes::GAME_NOT_STARTED, "Game has not started"));
        }
        if self.players[index].eliminated {
            return Err(GameError::player(codes::PLAYER_ELIMINATED, "Player is out of the game"));
        }
        let Some(piece) = self.players[index].current_piece.clone() else {
            return Err(GameError::player(codes::NO_ACTIVE_PIECE, "No active piece"));
        };

        let gravity = self.gravity();
        let mut outbox = Vec::new();
        let mut locked = false;
        match direction {
            Direction::Left | Direction::Right => {
                let dx = if direction == Direction::Left { -1 } else { 1 };
                let player = &mut self.players[index];
                if Self::fits(gravity, &player.grid, &piece, dx, 0) {
                    player.current_piece = Some(move_piece(&piece, dx, 0));
                }
            }
            Direction::Rotate => {
                let player = &mut self.players[index];
                player.current_piece = Some(rotate_piece_with_kicks_by(
                    &player.grid,
                    &piece,
                    RotationDirection::Clockwise,
                    |grid, candidate| Self::fits(gravity, grid, candidate, 0, 0),
                ));
            }
            Direction::Down => {
                self.players[index].soft_dropping = true;
                if self.step_player(index, &mut outbox) {
                    self.players[index].score.add_soft_drop(1);
                } else {
                    locked = true;
                }
            }
            Direction::HardDrop => {
                let dy = gravity.dy();
                let player = &mut self.players[index];
                let mut distance = 0;
                while Self::fits(gravity, &player.grid, &piece, 0, (distance + 1) * dy) {
                    distance += 1;
                }
                player.current_piece = Some(move_piece(&piece, 0, distance * dy));
                player.score.add_hard_drop(distance as u32);
                self.lock_and_spawn(index, &mut outbox);
                locked = true;
            }
        }

        self.after_player_step(index, locked, &mut outbox);
        Ok(outbox)
    }

    /// One accelerated step for a player holding soft drop
    pub fn soft_drop_step(&mut self, id: &str) -> Vec<Outbound> {
        let mut outbox = Vec::new();
        let Some(index) = self.index_of(id) else {
            return outbox;
        };
        let player = &self.players[index];
        if !self.game_started || !player.is_active() || !player.soft_dropping {
            return outbox;
        }

        let locked = if self.step_player(index, &mut outbox) {
            self.players[index].score.add_soft_drop(1);
            false
        } else {
            true
        };
        self.after_player_step(index, locked, &mut outbox);
        outbox
    }

    pub fn stop_soft_drop(&mut self, id: &str) -> GameResult<()> {
        let player = self
            .player_mut(id)
            .ok_or_else(|| GameError::player(codes::PLAYER_NOT_FOUND, "Player is not in this room"))?;
        player.soft_dropping = false;
        Ok(())
    }

    /// Events after a single player's piece moved or locked
    fn after_player_step(&mut self, index: usize, locked: bool, outbox: &mut Vec<Outbound>) {
        if locked {
            // Garbage may have changed the opponents' boards too
            self.push_board_updates(outbox);
            outbox.extend(self.room_update());
            self.finish_if_over(outbox);
        } else {
            outbox.push(self.board_update(&self.players[index]));
        }
    }

    /// Move the player's piece one row along gravity, or lock it when it
    /// cannot move. Returns true if the piece moved.
    fn step_player(&mut self, index: usize, outbox: &mut Vec<Outbound>) -> bool {
        let gravity = self.gravity();
        let dy = gravity.dy();
        let player = &mut self.players[index];
        let Some(piece) = player.current_piece.as_ref() else {
            return false;
        };
        if Self::fits(gravity, &player.grid, piece, 0, dy) {
            player.current_piece = Some(move_piece(piece, 0, dy));
            true
        } else {
            self.lock_and_spawn(index, outbox);
            false
        }
    }

    fn lock_and_spawn(&mut self, index: usize, outbox: &mut Vec<Outbound>) {
        let gravity = self.gravity();
        let player = &mut self.players[index];
        let piece = player.current_piece.take();
        let locked = lock_piece(&player.grid, piece.as_ref());
        let ClearResult { grid, lines_cleared } = match gravity {
            Gravity::Down => clear_lines(&locked),
            // The stack hangs from the top: clear with the grid upside down
            Gravity::Up => {
                let result = clear_lines(&locked.flipped());
                ClearResult {
                    grid: result.grid.flipped(),
                    lines_cleared: result.lines_cleared,
                }
            }
        };
        player.grid = grid;
        player.soft_dropping = false;
        player.score.add_clear(lines_cleared);

        if lines_cleared > 0 {
            debug!(
                "Player '{}' cleared {} line(s) in room '{}'",
                player.name, lines_cleared, self.name
            );
            self.send_penalties(index, lines_cleared - 1, outbox);
            self.register_cleared_lines(lines_cleared);
        }
        self.spawn_next(index, outbox);
    }

    /// Give every other active player `count` garbage rows
    fn send_penalties(&mut self, from: usize, count: usize, outbox: &mut Vec<Outbound>) {
        if count == 0 {
            return;
        }
        let gravity = self.gravity();
        let from_name = self.players[from].name.clone();
        let lines = count as i32;

        for index in 0..self.players.len() {
            if index == from || !self.players[index].is_active() {
                continue;
            }
            let grid = match gravity {
                Gravity::Down => add_penalty_lines(&self.players[index].grid, lines, &mut self.penalty_rng),
                Gravity::Up => add_penalty_lines_reverse(&self.players[index].grid, lines, &mut self.penalty_rng),
            };
            let player = &mut self.players[index];
            player.grid = grid;
            info!(
                "Player '{}' receives {} penalty line(s) from '{}'",
                player.name, count, from_name
            );
            outbox.push(Outbound::new(
                player.id.clone(),
                ServerEvent::PenaltyReceived {
                    lines: count,
                    from_player_name: from_name.clone(),
                },
            ));

            // The stack moved under the falling piece; carry the piece along,
            // or top out when it has nowhere left to go
            let Some(piece) = player.current_piece.as_ref() else {
                continue;
            };
            if Self::fits(gravity, &player.grid, piece, 0, 0) {
                continue;
            }
            match Self::displace(gravity, &player.grid, piece, lines) {
                Some(piece) => player.current_piece = Some(piece),
                None => self.top_out(index, outbox),
            }
        }
    }

    fn register_cleared_lines(&mut self, lines: usize) {
        if !self.options.speed_up || self.options.speed_up_every_lines == 0 {
            return;
        }
        let before = self.lines_cleared / self.options.speed_up_every_lines;
        self.lines_cleared += lines as u32;
        let after = self.lines_cleared / self.options.speed_up_every_lines;
        for _ in before..after {
            self.game_speed = (self.game_speed * 9 / 10).max(self.options.min_game_speed);
        }
        if after > before {
            debug!("Room '{}' speed is now {:?}", self.name, self.game_speed);
        }
    }

    /// Promote the next piece, or eliminate the player if it cannot spawn
    fn spawn_next(&mut self, index: usize, outbox: &mut Vec<Outbound>) {
        let gravity = self.gravity();
        let next = self.players[index].next_piece.take();
        let blocked = match &next {
            Some(piece) => !Self::fits(gravity, &self.players[index].grid, piece, 0, 0),
            None => true,
        };

        if blocked {
            if let Some(piece) = &next {
                debug!("No room to spawn {} for '{}'", piece.kind.name(), self.players[index].name);
            }
            self.top_out(index, outbox);
            return;
        }

        if self.players[index].needs_refill() {
            self.refill();
        }
        let player = &mut self.players[index];
        player.current_piece = next;
        player.next_piece = player.deal(gravity);
    }

    /// Push a piece up to `lines` rows against gravity, preferring the full
    /// push, and return the first position that fits
    fn displace(gravity: Gravity, grid: &Grid, piece: &Piece, lines: i32) -> Option<Piece> {
        let step = -gravity.dy();
        (0..=lines)
            .rev()
            .map(|n| move_piece(piece, 0, n * step))
            .find(|candidate| Self::fits(gravity, grid, candidate, 0, 0))
    }

    /// Eliminate a player whose piece has no legal position
    fn top_out(&mut self, index: usize, outbox: &mut Vec<Outbound>) {
        let player = &mut self.players[index];
        player.eliminated = true;
        player.current_piece = None;
        player.soft_dropping = false;
        info!("Player '{}' topped out in room '{}'", player.name, self.name);
        outbox.push(Outbound::new(player.id.clone(), ServerEvent::GameOver));
    }

    /// Append the next batch to the shared sequence and to every player's
    /// copy, so all copies stay identical
    fn refill(&mut self) {
        let Some(generator) = self.generator.as_mut() else {
            return;
        };
        let batch = generator.batch();
        self.sequence.extend_from_slice(&batch);
        for player in &mut self.players {
            player.sequence.extend_from_slice(&batch);
        }
        debug!(
            "Room '{}' sequence extended to {} pieces",
            self.name,
            self.sequence.len()
        );
    }

    /// End the game if at most one player is left standing (none, for a
    /// solo game). Returns true if the game ended.
    pub fn finish_if_over(&mut self, outbox: &mut Vec<Outbound>) -> bool {
        if !self.game_started {
            return false;
        }
        let active: Vec<&Player> = self.players.iter().filter(|p| p.is_active()).collect();
        let over = if self.players_at_start >= MAX_PLAYERS {
            active.len() <= 1
        } else {
            active.is_empty()
        };
        if !over {
            return false;
        }

        let winner = if self.players_at_start >= MAX_PLAYERS {
            active.first().map(|p| (p.id.clone(), p.name.clone()))
        } else {
            None
        };
        info!(
            "Game in room '{}' ended, winner: {:?}",
            self.name,
            winner.as_ref().map(|(_, name)| name)
        );

        for player in &self.players {
            outbox.push(Outbound::new(
                player.id.clone(),
                ServerEvent::GameEnd {
                    winner_name: winner.as_ref().map(|(_, name)| name.clone()),
                    is_winner: winner.as_ref().is_some_and(|(id, _)| *id == player.id),
                },
            ));
        }
        self.stop_game();
        outbox.extend(self.room_update());
        true
    }

    fn board_update(&self, player: &Player) -> Outbound {
        let composite = render_with_piece(&player.grid, player.current_piece.as_ref());
        Outbound::new(
            player.id.clone(),
            ServerEvent::UpdateBoard {
                grid: composite.rows().to_vec(),
                next_piece: player.next_piece_summary(),
            },
        )
    }

    /// Board updates for every player
    pub fn board_updates(&self) -> Vec<Outbound> {
        self.players.iter().map(|p| self.board_update(p)).collect()
    }

    fn push_board_updates(&self, outbox: &mut Vec<Outbound>) {
        outbox.extend(self.board_updates());
    }

    /// The roster and spectra, addressed to every occupant
    pub fn room_update(&self) -> Vec<Outbound> {
        let event = ServerEvent::RoomUpdate {
            room: self.name.clone(),
            players: self
                .players
                .iter()
                .map(|p| PlayerSummary {
                    id: p.id.clone(),
                    name: p.name.clone(),
                    is_host: self.host.as_deref() == Some(p.id.as_str()),
                    score: p.score.points,
                    lines: p.score.lines,
                    level: p.score.level,
                    eliminated: p.eliminated,
                })
                .collect(),
            spectrums: self
                .players
                .iter()
                .map(|p| SpectrumEntry {
                    player_id: p.id.clone(),
                    spectrum: self.spectrum(p),
                })
                .collect(),
            game_started: self.game_started,
        };
        self.players
            .iter()
            .map(|p| Outbound::new(p.id.clone(), event.clone()))
            .collect()
    }
}
