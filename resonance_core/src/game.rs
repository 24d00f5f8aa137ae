use std::time::Duration;

use log::{debug, info};
use rand::{Rng, SeedableRng, rngs::StdRng, seq::IndexedRandom};
use slotmap::SlotMap;

use crate::{
    Position,
    ability::{AbilityKind, AbilitySet, AbilityStatus, dash_target},
    clock::{Clock, SystemClock},
    config::{ConfigError, GameConfig},
    crystal::{Crystal, CrystalId, CrystalType},
    dungeon::{Dungeon, DungeonGenerator},
    map::GameMap,
    room::Room,
    sequence::CrystalSequence,
};

/// Holds the state of the player.
#[derive(Debug, Clone)]
pub struct Player {
    pub position: Position,
    /// Time of the last successful step, for the movement cooldown.
    pub last_move: Option<Duration>,
    pub abilities: AbilitySet,
}

impl Player {
    fn new(position: Position) -> Self {
        Self {
            position,
            last_move: None,
            abilities: AbilitySet::default(),
        }
    }
}

/// Manages one dungeon level: map, rooms, crystals, the puzzle and the player.
///
/// All mutation goes through [`GameState::move_player`],
/// [`GameState::use_ability`] and [`GameState::update`]. Rejected commands
/// return `false` and change nothing.
pub struct GameState {
    config: GameConfig,
    seed: u64,
    map: GameMap,
    rooms: Vec<Room>,
    /// Crystal owned by each room, parallel to `rooms`.
    room_crystals: Vec<Option<CrystalId>>,
    crystals: SlotMap<CrystalId, Crystal>,
    player: Player,
    sequence: CrystalSequence,
    clock: Box<dyn Clock>,
}

impl GameState {
    /// Generates a new level from `config`.
    ///
    /// Uses `config.seed` when set, otherwise draws a seed (see [`GameState::seed`]).
    pub fn new(config: GameConfig, clock: Box<dyn Clock>) -> Result<Self, ConfigError> {
        config.validate()?;
        let seed = config.seed.unwrap_or_else(rand::random);
        let mut rng = StdRng::seed_from_u64(seed);
        let dungeon = DungeonGenerator::new(config.dungeon.clone()).generate(&mut rng);
        Ok(Self::assemble(config, dungeon, clock, seed, rng))
    }

    /// Same as [`GameState::new`] with wall-clock time.
    pub fn with_system_clock(config: GameConfig) -> Result<Self, ConfigError> {
        Self::new(config, Box::new(SystemClock::new()))
    }

    /// Builds a game on an already generated level.
    pub fn from_dungeon(config: GameConfig, dungeon: Dungeon, clock: Box<dyn Clock>, seed: u64) -> Self {
        Self::assemble(config, dungeon, clock, seed, StdRng::seed_from_u64(seed))
    }

    fn assemble(
        config: GameConfig,
        dungeon: Dungeon,
        clock: Box<dyn Clock>,
        seed: u64,
        mut rng: StdRng,
    ) -> Self {
        let Dungeon { map, rooms, .. } = dungeon;
        let mut sequence = CrystalSequence::new(config.sequence_length, rng.random());

        let spawn = rooms.first().map(Room::center).unwrap_or_else(|| {
            Position::new(map.width() as i32 / 2, map.height() as i32 / 2)
        });

        let mut crystals = SlotMap::with_key();
        let room_crystals = place_crystals(
            &rooms,
            sequence.target_sequence(),
            config.crystal_duration,
            &mut crystals,
            &mut rng,
        );
        let placed: Vec<CrystalType> = crystals.values().map(|c| c.crystal_type).collect();
        sequence.restrict_to(&placed);

        info!(
            "New game (seed {}): {} rooms, {} crystals, target {:?}",
            seed,
            rooms.len(),
            crystals.len(),
            sequence.target_sequence()
        );

        Self {
            config,
            seed,
            map,
            rooms,
            room_crystals,
            crystals,
            player: Player::new(spawn),
            sequence,
            clock,
        }
    }

    /// Steps the player one tile. `dx` and `dy` must each be -1, 0 or 1 and
    /// not both zero.
    ///
    /// Fails while the movement cooldown runs or when the target tile is not
    /// walkable. Stepping onto an inactive crystal activates it.
    pub fn move_player(&mut self, dx: i32, dy: i32) -> bool {
        if !is_direction(dx, dy) {
            return false;
        }
        let now = self.clock.now();
        if self
            .player
            .last_move
            .is_some_and(|last| now.saturating_sub(last) < self.config.move_cooldown)
        {
            return false;
        }

        let target = self.player.position.offset(dx, dy);
        if !self.map.is_walkable(target.x, target.y) {
            return false;
        }
        self.player.position = target;
        self.player.last_move = Some(now);
        self.activate_crystals_at(target, now);
        true
    }

    /// Uses the ability bound to `crystal_type` in direction `(dx, dy)`.
    ///
    /// Fails if there is no such ability, it is locked, or it is cooling
    /// down. On success the cooldown starts even if the player could not
    /// move at all.
    pub fn use_ability(&mut self, crystal_type: CrystalType, dx: i32, dy: i32) -> bool {
        if !is_direction(dx, dy) {
            return false;
        }
        let now = self.clock.now();
        let Some(ability) = self.player.abilities.get_mut(crystal_type) else {
            return false;
        };
        if !ability.can_use(now) {
            return false;
        }

        let start = self.player.position;
        let kind = ability.kind;
        let destination = match kind {
            AbilityKind::Dash { distance } => dash_target(&self.map, start, dx, dy, distance),
        };
        ability.start_cooldown(now);
        self.player.position = destination;
        debug!("{:?} from {:?} to {:?}", kind, start, destination);

        if destination != start {
            self.activate_crystals_at(destination, now);
        }
        true
    }

    /// Advances timers. Call once per frame.
    pub fn update(&mut self) {
        let now = self.clock.now();
        for crystal in self.crystals.values_mut() {
            if crystal.update(now) {
                debug!(
                    "{:?} crystal at {:?} expired",
                    crystal.crystal_type, crystal.position
                );
            }
        }
        self.sequence.update(&mut self.crystals, now);
    }

    fn activate_crystals_at(&mut self, pos: Position, now: Duration) {
        let hits: Vec<CrystalId> = self
            .room_crystals
            .iter()
            .flatten()
            .copied()
            .filter(|id| {
                self.crystals
                    .get(*id)
                    .is_some_and(|c| c.position == pos && !c.is_active())
            })
            .collect();

        for id in hits {
            let crystal = &mut self.crystals[id];
            crystal.activate(now);
            debug!("Activated {:?} crystal at {:?}", crystal.crystal_type, pos);

            if self.sequence.add_crystal(id, &self.crystals) {
                for crystal_type in self.sequence.completed_types() {
                    if self.player.abilities.unlock(*crystal_type) {
                        info!("Unlocked {} crystal ability", crystal_type.name());
                    }
                }
            }
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// The seed this level was generated from.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn now(&self) -> Duration {
        self.clock.now()
    }

    pub fn map(&self) -> &GameMap {
        &self.map
    }

    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    /// The crystal owned by the room at `index`, if any.
    pub fn room_crystal(&self, index: usize) -> Option<(CrystalId, &Crystal)> {
        let id = (*self.room_crystals.get(index)?)?;
        self.crystals.get(id).map(|crystal| (id, crystal))
    }

    pub fn crystals(&self) -> &SlotMap<CrystalId, Crystal> {
        &self.crystals
    }

    pub fn crystal_at(&self, pos: Position) -> Option<&Crystal> {
        self.crystals.values().find(|c| c.position == pos)
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn player_position(&self) -> Position {
        self.player.position
    }

    pub fn sequence(&self) -> &CrystalSequence {
        &self.sequence
    }

    pub fn progress(&self) -> f64 {
        self.sequence.progress()
    }

    pub fn next_crystal_type(&self) -> Option<CrystalType> {
        self.sequence.next_crystal_type()
    }

    pub fn ability_status(&self, crystal_type: CrystalType) -> Option<AbilityStatus> {
        self.player.abilities.status(crystal_type, self.clock.now())
    }
}

fn is_direction(dx: i32, dy: i32) -> bool {
    (-1..=1).contains(&dx) && (-1..=1).contains(&dy) && (dx, dy) != (0, 0)
}

/// Puts one crystal in every room except the spawn room.
///
/// Rooms receive the target types in order, then each type not yet placed,
/// then random types. Small levels may miss some types; the sequence is
/// restricted to what was placed afterwards. Returns the crystal of each room.
fn place_crystals<R: Rng + ?Sized>(
    rooms: &[Room],
    target: &[CrystalType],
    duration: Duration,
    crystals: &mut SlotMap<CrystalId, Crystal>,
    rng: &mut R,
) -> Vec<Option<CrystalId>> {
    let mut order: Vec<CrystalType> = target.to_vec();
    order.extend(CrystalType::ALL.into_iter().filter(|t| !target.contains(t)));

    let mut room_crystals = vec![None; rooms.len()];
    for (index, room) in rooms.iter().enumerate().skip(1) {
        let crystal_type = match order.get(index - 1) {
            Some(t) => *t,
            None => *CrystalType::ALL.choose(rng).unwrap_or(&CrystalType::Red),
        };
        let position = Position::new(
            rng.random_range(room.x..room.x + room.width),
            rng.random_range(room.y..room.y + room.height),
        );
        room_crystals[index] = Some(crystals.insert(Crystal::new(crystal_type, position, index, duration)));
    }
    room_crystals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{clock::ManualClock, tile::Tile};

    /// Two 3x3 rooms joined by a straight corridor on row 2:
    ///
    /// ```text
    /// ###########
    /// #...###...#
    /// #.........#
    /// #...###...#
    /// ###########
    /// ```
    fn two_room_dungeon() -> Dungeon {
        let mut map = GameMap::new_void(11, 5);
        let rooms = vec![Room::new(1, 1, 3, 3), Room::new(7, 1, 3, 3)];
        for room in &rooms {
            room.place_in_map(&mut map);
        }
        for x in 4..7 {
            map.set(x, 2, Tile::floor()).unwrap();
        }
        Dungeon {
            map,
            rooms,
            connections: vec![(0, 1)],
        }
    }

    fn new_game(config: GameConfig) -> (GameState, ManualClock) {
        let clock = ManualClock::new();
        let game = GameState::from_dungeon(config, two_room_dungeon(), Box::new(clock.clone()), 7);
        (game, clock)
    }

    /// Moves the room-1 crystal to `pos` and retypes it.
    fn set_crystal(game: &mut GameState, crystal_type: CrystalType, pos: Position) -> CrystalId {
        let (id, _) = game.room_crystal(1).unwrap();
        let crystal = &mut game.crystals[id];
        crystal.crystal_type = crystal_type;
        crystal.position = pos;
        id
    }

    #[test]
    fn player_spawns_in_first_room_and_crystals_skip_it() {
        let (game, _) = new_game(GameConfig::default());
        assert_eq!(game.player_position(), Position::new(2, 2));
        assert!(game.room_crystal(0).is_none());

        let (_, crystal) = game.room_crystal(1).unwrap();
        assert!(game.rooms()[1].contains(crystal.position));
        assert_eq!(crystal.crystal_type, game.sequence().target_sequence()[0]);
        assert!(!crystal.is_active());
    }

    #[test]
    fn empty_dungeon_spawns_at_map_center() {
        let dungeon = Dungeon {
            map: GameMap::new_void(9, 7),
            rooms: Vec::new(),
            connections: Vec::new(),
        };
        let mut game =
            GameState::from_dungeon(GameConfig::default(), dungeon, Box::new(ManualClock::new()), 1);
        assert_eq!(game.player_position(), Position::new(4, 3));
        assert!(game.crystals().is_empty());
        assert!(!game.move_player(1, 0));
        game.update();
    }

    #[test]
    fn movement_respects_walls_and_direction_limits() {
        let (mut game, clock) = new_game(GameConfig::default());
        assert!(!game.move_player(0, 0));
        assert!(!game.move_player(2, 0));
        assert!(!game.move_player(0, -2));

        game.player.position = Position::new(1, 1);
        assert!(!game.move_player(-1, 0));
        assert!(!game.move_player(0, -1));
        assert_eq!(game.player_position(), Position::new(1, 1));

        assert!(game.move_player(1, 1));
        assert_eq!(game.player_position(), Position::new(2, 2));
        clock.advance(Duration::from_millis(100));
        assert!(game.move_player(1, 0));
        assert_eq!(game.player_position(), Position::new(3, 2));
    }

    #[test]
    fn movement_cooldown_blocks_rapid_steps() {
        let (mut game, clock) = new_game(GameConfig::default());
        assert!(game.move_player(1, 0));
        assert!(!game.move_player(1, 0));
        clock.advance(Duration::from_millis(99));
        assert!(!game.move_player(1, 0));
        clock.advance(Duration::from_millis(1));
        assert!(game.move_player(1, 0));
        assert_eq!(game.player_position(), Position::new(4, 2));
    }

    #[test]
    fn stepping_on_crystal_completes_type_and_unlocks_dash() {
        let config = GameConfig {
            sequence_length: 1,
            ..GameConfig::default()
        };
        let (mut game, _) = new_game(config);
        game.sequence = CrystalSequence::with_target(vec![CrystalType::Red], 3);
        let id = set_crystal(&mut game, CrystalType::Red, Position::new(3, 2));

        assert!(!game.ability_status(CrystalType::Red).unwrap().unlocked);
        assert!(game.move_player(1, 0));

        assert!(game.crystals()[id].is_active());
        assert!(game.sequence().is_type_completed(CrystalType::Red));
        assert!(game.ability_status(CrystalType::Red).unwrap().unlocked);
        assert_eq!(game.progress(), 0.0);
        assert_ne!(game.next_crystal_type(), Some(CrystalType::Red));
    }

    #[test]
    fn active_crystal_is_not_reactivated() {
        let (mut game, clock) = new_game(GameConfig::default());
        game.sequence = CrystalSequence::with_target(vec![CrystalType::Blue, CrystalType::Green], 3);
        let id = set_crystal(&mut game, CrystalType::Blue, Position::new(3, 2));

        assert!(game.move_player(1, 0));
        let first_activation = game.crystals()[id].activation_time();
        assert_eq!(game.progress(), 0.5);

        clock.advance(Duration::from_secs(1));
        assert!(game.move_player(-1, 0));
        clock.advance(Duration::from_secs(1));
        assert!(game.move_player(1, 0));
        assert_eq!(game.crystals()[id].activation_time(), first_activation);
        assert_eq!(game.progress(), 0.5);
    }

    #[test]
    fn update_expires_crystals_and_resets_attempt() {
        let (mut game, clock) = new_game(GameConfig::default());
        game.sequence = CrystalSequence::with_target(vec![CrystalType::Blue, CrystalType::Green], 3);
        let id = set_crystal(&mut game, CrystalType::Blue, Position::new(3, 2));
        assert!(game.move_player(1, 0));
        assert_eq!(game.progress(), 0.5);

        clock.advance(Duration::from_secs(30));
        game.update();
        assert!(game.crystals()[id].is_active());
        assert_eq!(game.progress(), 0.5);

        clock.advance(Duration::from_secs(1));
        game.update();
        assert!(!game.crystals()[id].is_active());
        assert_eq!(game.progress(), 0.0);
        assert_eq!(game.next_crystal_type(), Some(CrystalType::Blue));
    }

    #[test]
    fn dash_is_locked_until_unlocked() {
        let (mut game, _) = new_game(GameConfig::default());
        assert!(!game.use_ability(CrystalType::Red, 1, 0));
        assert!(!game.use_ability(CrystalType::Blue, 1, 0));
        assert_eq!(game.player_position(), Position::new(2, 2));
    }

    #[test]
    fn dash_toward_near_wall_moves_one_tile() {
        let (mut game, _) = new_game(GameConfig::default());
        game.player.abilities.unlock(CrystalType::Red);
        // Wall at (2, 0): one floor tile above the spawn.
        assert!(game.use_ability(CrystalType::Red, 0, -1));
        assert_eq!(game.player_position(), Position::new(2, 1));
    }

    #[test]
    fn dash_travels_three_tiles_and_cools_down() {
        let (mut game, clock) = new_game(GameConfig::default());
        game.player.abilities.unlock(CrystalType::Red);
        assert!(game.use_ability(CrystalType::Red, 1, 0));
        assert_eq!(game.player_position(), Position::new(5, 2));

        assert!(!game.use_ability(CrystalType::Red, 1, 0));
        let status = game.ability_status(CrystalType::Red).unwrap();
        assert_eq!(status.cooldown_remaining, Duration::from_millis(500));

        clock.advance(Duration::from_millis(500));
        assert!(game.use_ability(CrystalType::Red, 1, 0));
        assert_eq!(game.player_position(), Position::new(8, 2));
    }

    #[test]
    fn blocked_dash_still_starts_cooldown() {
        let (mut game, _) = new_game(GameConfig::default());
        game.player.abilities.unlock(CrystalType::Red);
        game.player.position = Position::new(1, 1);
        assert!(game.use_ability(CrystalType::Red, -1, 0));
        assert_eq!(game.player_position(), Position::new(1, 1));
        assert!(!game.ability_status(CrystalType::Red).unwrap().cooldown_remaining.is_zero());
    }

    #[test]
    fn dash_landing_on_crystal_activates_it() {
        let (mut game, _) = new_game(GameConfig::default());
        game.player.abilities.unlock(CrystalType::Red);
        let id = set_crystal(&mut game, CrystalType::Yellow, Position::new(5, 2));
        assert!(game.use_ability(CrystalType::Red, 1, 0));
        assert!(game.crystals()[id].is_active());
    }

    #[test]
    fn generated_games_are_always_solvable() {
        for seed in 0..200 {
            let config = GameConfig {
                seed: Some(seed),
                ..GameConfig::default()
            };
            let mut game = GameState::new(config, Box::new(ManualClock::new())).unwrap();
            let mut activations = 0;
            while let Some(next) = game.next_crystal_type() {
                let pos = game
                    .crystals()
                    .values()
                    .find(|c| c.crystal_type == next && !c.is_active())
                    .map(|c| c.position)
                    .unwrap_or_else(|| panic!("seed {}: no free {:?} crystal", seed, next));
                let now = game.now();
                game.activate_crystals_at(pos, now);
                activations += 1;
                assert!(activations <= 20, "seed {}: puzzle never finishes", seed);
            }
            assert!(game.sequence().is_complete());
            for crystal in game.crystals().values() {
                assert!(
                    game.sequence().is_type_completed(crystal.crystal_type),
                    "seed {}: {:?} left unsolved",
                    seed,
                    crystal.crystal_type
                );
            }
        }
    }
}
