//! Room registry and command dispatch
//!
//! The [`SessionManager`] owns every room, maps connections to the room they
//! are in, and keeps the scheduler's timers in line with room state after
//! every command and every tick.

use crate::error::{GameError, GameResult, codes};
use crate::protocol::{Command, Direction, Outbound, PlayerId, ServerEvent, validate_name};
use crate::room::Room;
use crate::scheduler::{Scheduler, TimerFired, TimerKey};
use crate::settings::GameplaySettings;
use std::collections::HashMap;
use tracing::{debug, info, warn};

pub struct SessionManager {
    rooms: HashMap<String, Room>,
    player_rooms: HashMap<PlayerId, String>,
    scheduler: Scheduler,
    settings: GameplaySettings,
    /// Fixed seeds for new rooms (sequence, penalty gaps)
    seeds: Option<(u32, u64)>,
}

impl SessionManager {
    /// Create an empty registry
    pub fn init(settings: GameplaySettings, scheduler: Scheduler) -> Self {
        info!(
            "Session manager ready (speed {} ms, speed-up {}, reverse gravity {})",
            settings.game_speed_ms, settings.speed_up, settings.reverse_gravity
        );
        Self {
            rooms: HashMap::new(),
            player_rooms: HashMap::new(),
            scheduler,
            settings,
            seeds: None,
        }
    }

    /// Seed every room created from now on
    pub fn with_seeds(mut self, sequence: u32, penalty: u64) -> Self {
        self.seeds = Some((sequence, penalty));
        self
    }

    /// Stop every game, cancel every timer and drop all rooms
    pub fn dispose(&mut self) {
        self.scheduler.cancel_all();
        for room in self.rooms.values_mut() {
            room.stop_game();
        }
        info!("Session manager disposed ({} room(s))", self.rooms.len());
        self.rooms.clear();
        self.player_rooms.clear();
    }

    pub fn room(&self, name: &str) -> Option<&Room> {
        self.rooms.get(name)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Room the connection is currently in
    pub fn room_of(&self, id: &str) -> Option<&str> {
        self.player_rooms.get(id).map(String::as_str)
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Run one command. A rejected command yields a single error event for
    /// the sender and leaves all state untouched.
    pub fn handle(&mut self, from: &str, command: Command) -> Vec<Outbound> {
        match self.dispatch(from, &command) {
            Ok(outbox) => outbox,
            Err(err) => {
                warn!("Rejected {:?} from {}: {}", command, from, err);
                vec![Outbound::new(from, ServerEvent::rejected(&command, &err))]
            }
        }
    }

    fn dispatch(&mut self, from: &str, command: &Command) -> GameResult<Vec<Outbound>> {
        match command {
            Command::Join { room, player_name } => self.join(from, room, player_name),
            Command::StartGame { room } => self.start_game(from, room),
            Command::Move { direction } => {
                let direction: Direction = direction.parse()?;
                self.apply_move(from, direction)
            }
            Command::StopSoftDrop => self.stop_soft_drop(from),
            Command::Leave => self.leave(from),
        }
    }

    fn join(&mut self, from: &str, room_name: &str, player_name: &str) -> GameResult<Vec<Outbound>> {
        if from.is_empty() {
            return Err(GameError::validation(codes::INVALID_PLAYER_ID, "Player id is required"));
        }
        validate_name(room_name, codes::INVALID_ROOM_NAME, "Room name")?;
        validate_name(player_name, codes::INVALID_PLAYER_NAME, "Player name")?;
        if let Some(current) = self.player_rooms.get(from) {
            return Err(GameError::room(
                codes::ALREADY_IN_ROOM,
                format!("Already in room '{}'", current),
            ));
        }

        let options = self.settings.room_options();
        let seeds = self.seeds;
        let room = self.rooms.entry(room_name.to_string()).or_insert_with(|| {
            info!("Room '{}' created", room_name);
            let room = Room::new(room_name, options);
            match seeds {
                Some((sequence, penalty)) => room.with_sequence_seed(sequence).with_penalty_seed(penalty),
                None => room,
            }
        });

        if let Err(err) = room.add_player(from, player_name) {
            if room.is_empty() {
                self.rooms.remove(room_name);
            }
            return Err(err);
        }
        self.player_rooms.insert(from.to_string(), room_name.to_string());

        let mut outbox = vec![Outbound::new(
            from,
            ServerEvent::Joined {
                room: room_name.to_string(),
                player_id: from.to_string(),
                is_host: room.host() == Some(from),
            },
        )];
        outbox.extend(room.room_update());
        Ok(outbox)
    }

    fn start_game(&mut self, from: &str, room_name: &str) -> GameResult<Vec<Outbound>> {
        let room = self
            .rooms
            .get_mut(room_name)
            .ok_or_else(|| GameError::room(codes::ROOM_NOT_FOUND, format!("Room '{}' not found", room_name)))?;
        if room.player(from).is_none() {
            return Err(GameError::player(codes::PLAYER_NOT_FOUND, "Player is not in this room"));
        }
        if room.host() != Some(from) {
            return Err(GameError::room(codes::NOT_HOST, "Only the host can start the game"));
        }
        room.start_game()?;

        let mut outbox = room.room_update();
        outbox.extend(room.board_updates());
        self.sync_timers(room_name);
        Ok(outbox)
    }

    fn apply_move(&mut self, from: &str, direction: Direction) -> GameResult<Vec<Outbound>> {
        let room_name = self.joined_room(from)?;
        let room = self
            .rooms
            .get_mut(&room_name)
            .ok_or_else(|| GameError::room(codes::ROOM_NOT_FOUND, "Room not found"))?;
        let outbox = room.apply_move(from, direction)?;
        self.sync_timers(&room_name);
        Ok(outbox)
    }

    fn stop_soft_drop(&mut self, from: &str) -> GameResult<Vec<Outbound>> {
        let room_name = self.joined_room(from)?;
        if let Some(room) = self.rooms.get_mut(&room_name) {
            room.stop_soft_drop(from)?;
        }
        self.scheduler.cancel(&TimerKey::SoftDrop(from.to_string()));
        Ok(Vec::new())
    }

    fn leave(&mut self, from: &str) -> GameResult<Vec<Outbound>> {
        let room_name = self.joined_room(from)?;
        self.scheduler.cancel(&TimerKey::SoftDrop(from.to_string()));
        self.player_rooms.remove(from);

        let mut outbox = Vec::new();
        let Some(room) = self.rooms.get_mut(&room_name) else {
            return Ok(outbox);
        };
        if room.remove_player(from) {
            self.scheduler.cancel(&TimerKey::Gravity(room_name.clone()));
            self.rooms.remove(&room_name);
            info!("Room '{}' discarded", room_name);
            return Ok(outbox);
        }

        // The remaining player may have just won by default
        if !room.finish_if_over(&mut outbox) {
            outbox.extend(room.room_update());
        }
        self.sync_timers(&room_name);
        Ok(outbox)
    }

    /// Treat a dropped connection as a leave
    pub fn disconnect(&mut self, from: &str) -> Vec<Outbound> {
        if !self.player_rooms.contains_key(from) {
            return Vec::new();
        }
        debug!("Connection {} dropped", from);
        self.handle(from, Command::Leave)
    }

    fn joined_room(&self, from: &str) -> GameResult<String> {
        self.player_rooms
            .get(from)
            .cloned()
            .ok_or_else(|| GameError::player(codes::PLAYER_NOT_FOUND, "Not in a room"))
    }

    /// Handle a timer tick from the scheduler
    pub fn on_timer(&mut self, fired: TimerFired) -> Vec<Outbound> {
        if !self.scheduler.is_live(&fired) {
            debug!("Dropping stale tick {:?}", fired);
            return Vec::new();
        }

        let (room_name, outbox) = match &fired.key {
            TimerKey::Gravity(room_name) => {
                let outbox = match self.rooms.get_mut(room_name) {
                    Some(room) => room.tick(),
                    None => Vec::new(),
                };
                (room_name.clone(), outbox)
            }
            TimerKey::SoftDrop(player_id) => {
                let Some(room_name) = self.player_rooms.get(player_id).cloned() else {
                    self.scheduler.cancel(&fired.key);
                    return Vec::new();
                };
                let outbox = match self.rooms.get_mut(&room_name) {
                    Some(room) => room.soft_drop_step(player_id),
                    None => Vec::new(),
                };
                (room_name, outbox)
            }
        };
        self.sync_timers(&room_name);
        outbox
    }

    /// Bring the room's timers in line with its state: gravity while
    /// playing at the current speed, soft drop for players holding it
    fn sync_timers(&mut self, room_name: &str) {
        let gravity = TimerKey::Gravity(room_name.to_string());
        let Some(room) = self.rooms.get(room_name) else {
            self.scheduler.cancel(&gravity);
            return;
        };

        if room.is_started() {
            if self.scheduler.period_of(&gravity) != Some(room.game_speed()) {
                self.scheduler.start(gravity, room.game_speed());
            }
        } else if self.scheduler.cancel(&gravity) {
            info!("Gravity stopped for room '{}'", room_name);
        }

        for player in room.players() {
            let key = TimerKey::SoftDrop(player.id.clone());
            let wanted = room.is_started() && player.is_active() && player.soft_dropping;
            if wanted && !self.scheduler.is_running(&key) {
                self.scheduler.start(key, self.settings.soft_drop_interval());
            } else if !wanted {
                self.scheduler.cancel(&key);
            }
        }
    }
}
