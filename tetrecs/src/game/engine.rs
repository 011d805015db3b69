//! The game engine
//!
//! [`Game`] owns the grid, the piece pair and the [`GameState`]. It is not
//! synchronized: every call must come from one owner, normally a
//! [`GameSession`](crate::session::GameSession), which also owns the countdown and
//! clear timers. The engine only reports the delays to arm.

use std::time::Duration;

use crate::config::GameConfig;
use crate::grid::{Grid, LineClear};
use crate::piece::GamePiece;
use crate::piece_source::{fallback_piece, LocalPieceSource, PieceSource};

use super::events::GameEvent;
use super::hooks::GameHooks;
use super::state::{GamePhase, GameSnapshot, GameState, GameSummary};

/// Outcome of a block activation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// Nothing happened
    Rejected,
    /// The piece was placed and the countdown must restart
    Placed {
        countdown: Duration,
        /// Set when full lines were found; the clear must be applied after this delay
        clear_delay: Option<Duration>,
    },
}

/// Outcome of a countdown expiry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// A life was lost; rearm the countdown with this delay
    Continue(Duration),
    /// The last life was lost
    GameOver,
    /// The game is not running
    Idle,
}

/// A single game
pub struct Game {
    config: GameConfig,
    grid: Grid,
    source: Box<dyn PieceSource>,
    hooks: Box<dyn GameHooks>,
    events: flume::Sender<GameEvent>,
    phase: GamePhase,
    state: GameState,
    current: GamePiece,
    next: GamePiece,
    /// Whether current and next are stand-ins drawn while the source was empty
    fallback: [bool; 2],
    /// Lines detected but not yet zeroed
    pending_clear: Option<LineClear>,
    lines_cleared: u32,
    highest_multiplier: u32,
}

impl Game {
    /// Create a game and draw its first two pieces
    ///
    /// A piece the source cannot supply yet is stood in for by the fallback piece
    /// until [`Game::replace_fallback_pieces`] finds a real one.
    pub fn new(
        config: GameConfig,
        mut source: Box<dyn PieceSource>,
        mut hooks: Box<dyn GameHooks>,
        events: flume::Sender<GameEvent>,
    ) -> Self {
        let mut pieces = [fallback_piece(); 2];
        let mut fallback = [false; 2];
        for (piece, is_fallback) in pieces.iter_mut().zip(fallback.iter_mut()) {
            match source.try_spawn() {
                Some(spawned) => *piece = spawned,
                None => *is_fallback = true,
            }
            hooks.on_spawn(piece);
        }
        let [current, next] = pieces;

        let game = Self {
            grid: Grid::new(config.cols, config.rows),
            state: GameState::new(config.starting_lives),
            config,
            source,
            hooks,
            events,
            phase: GamePhase::Created,
            current,
            next,
            fallback,
            pending_clear: None,
            lines_cleared: 0,
            highest_multiplier: 1,
        };
        game.notify_pieces();

        tracing::info!(
            "Game created ({}x{}, {} lives)",
            game.grid.cols(),
            game.grid.rows(),
            game.state.lives
        );
        game
    }

    /// Single-player game drawing from a local random source
    pub fn local(config: GameConfig, events: flume::Sender<GameEvent>) -> Self {
        let source = LocalPieceSource::new(config.seed);
        Self::new(config, Box::new(source), Box::new(()), events)
    }

    /// Start the game
    ///
    /// Returns the countdown delay to arm, or None if the game was already started.
    pub fn start(&mut self) -> Option<Duration> {
        if self.phase != GamePhase::Created {
            tracing::debug!("Game already started ({:?})", self.phase);
            return None;
        }
        self.phase = GamePhase::Running;
        tracing::info!("Game started");
        Some(self.restart_countdown())
    }

    /// Try to place the current piece centred on (x, y)
    pub fn block_activated(&mut self, x: i32, y: i32) -> Activation {
        if self.phase != GamePhase::Running {
            tracing::debug!("Placement at ({}, {}) ignored, game is {:?}", x, y, self.phase);
            return Activation::Rejected;
        }
        if self.pending_clear.is_some() {
            tracing::debug!("Placement at ({}, {}) ignored, clear pending", x, y);
            return Activation::Rejected;
        }
        if !self.grid.can_place_piece(&self.current, x, y) {
            tracing::debug!("Cannot place {} at ({}, {})", self.current, x, y);
            return Activation::Rejected;
        }

        tracing::debug!("Placed {} at ({}, {})", self.current, x, y);
        self.grid.place_piece(&self.current, x, y);

        let clear = self.grid.detect_full_lines();
        let (lines, blocks) = (clear.lines(), clear.blocks());
        let clear_delay = if clear.is_empty() {
            None
        } else {
            tracing::info!("Cleared {} lines ({} blocks)", lines, blocks);
            self.lines_cleared = self.lines_cleared.saturating_add(lines);
            self.notify(GameEvent::LinesCleared(clear.cells.clone()));
            self.pending_clear = Some(clear);
            Some(self.config.clear_delay())
        };

        self.state.record_round(lines, blocks);
        self.highest_multiplier = self.highest_multiplier.max(self.state.multiplier);
        self.hooks.on_score(&self.state);
        self.notify(GameEvent::StateChanged(self.state));

        self.advance_pieces();
        let countdown = self.restart_countdown();

        Activation::Placed {
            countdown,
            clear_delay,
        }
    }

    /// Zero the cells of the pending clear
    ///
    /// Returns the applied clear, or None if nothing was pending.
    pub fn apply_pending_clear(&mut self) -> Option<LineClear> {
        let clear = self.pending_clear.take()?;
        self.grid.clear_cells(&clear.cells);
        tracing::debug!("Applied clear of {} blocks", clear.blocks());
        Some(clear)
    }

    /// Whether a detected clear is waiting to be applied
    pub fn has_pending_clear(&self) -> bool {
        self.pending_clear.is_some()
    }

    /// Handle countdown expiry
    pub fn countdown_elapsed(&mut self) -> Tick {
        if self.phase != GamePhase::Running {
            return Tick::Idle;
        }

        tracing::info!("Game loop fired, lives {}", self.state.lives);
        let dead = self.state.lose_life();
        self.hooks.on_tick(&self.state);
        self.notify(GameEvent::StateChanged(self.state));

        if dead {
            self.phase = GamePhase::Over;
            if self.pending_clear.take().is_some() {
                tracing::debug!("Dropped pending clear at game over");
            }
            tracing::info!("Game over, final score {}", self.state.score);
            self.notify(GameEvent::GameOver);
            return Tick::GameOver;
        }

        self.advance_pieces();
        Tick::Continue(self.restart_countdown())
    }

    /// Rotate the current piece clockwise
    ///
    /// Returns false once the game is over.
    pub fn rotate_current_piece(&mut self) -> bool {
        if self.phase == GamePhase::Over {
            return false;
        }
        self.current = self.current.rotated();
        tracing::trace!("Rotated current piece {}", self.current);
        self.notify_pieces();
        true
    }

    /// Exchange the current and next pieces
    ///
    /// Returns false once the game is over.
    pub fn swap_current_piece(&mut self) -> bool {
        if self.phase == GamePhase::Over {
            return false;
        }
        std::mem::swap(&mut self.current, &mut self.next);
        self.fallback.swap(0, 1);
        tracing::trace!("Swapped to {}", self.current);
        self.notify_pieces();
        true
    }

    /// Swap in available pieces for fallback stand-ins, current first
    ///
    /// Takes only pieces the source already holds and counts no spawn, so no further
    /// pieces are requested. Returns whether a piece changed.
    pub fn replace_fallback_pieces(&mut self) -> bool {
        if self.phase == GamePhase::Over {
            return false;
        }
        let mut replaced = false;
        for slot in 0..2 {
            if !self.fallback[slot] {
                continue;
            }
            let Some(piece) = self.source.take_ready() else {
                break;
            };
            if slot == 0 {
                self.current = piece;
            } else {
                self.next = piece;
            }
            self.fallback[slot] = false;
            replaced = true;
        }
        if replaced {
            tracing::debug!("Fallback replaced, now {} then {}", self.current, self.next);
            self.notify_pieces();
        }
        replaced
    }

    /// Whether current or next is still a fallback stand-in
    pub fn has_fallback_pieces(&self) -> bool {
        self.fallback.contains(&true)
    }

    /// Drop any pending clear. Safe to call repeatedly.
    pub fn shutdown(&mut self) {
        if self.pending_clear.take().is_some() {
            tracing::debug!("Dropped pending clear on shutdown");
        }
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn is_over(&self) -> bool {
        self.phase == GamePhase::Over
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn current_piece(&self) -> &GamePiece {
        &self.current
    }

    pub fn next_piece(&self) -> &GamePiece {
        &self.next
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Countdown length at the current level
    pub fn timer_delay(&self) -> Duration {
        self.config.timer_delay(self.state.level)
    }

    pub fn summary(&self) -> GameSummary {
        GameSummary {
            score: self.state.score,
            level: self.state.level,
            lines_cleared: self.lines_cleared,
            highest_multiplier: self.highest_multiplier,
        }
    }

    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot::capture(self.phase, self.state, &self.grid, self.current, self.next)
    }

    /// current <- next, next <- spawn
    fn advance_pieces(&mut self) {
        let spawned = self.source.spawn();
        self.hooks.on_spawn(&spawned);
        self.current = std::mem::replace(&mut self.next, spawned);
        self.fallback = [self.fallback[1], false];
        tracing::debug!("Next piece {}, then {}", self.current, self.next);
        self.notify_pieces();
    }

    fn restart_countdown(&mut self) -> Duration {
        let delay = self.timer_delay();
        tracing::debug!("Countdown restarted, {} ms", delay.as_millis());
        self.notify(GameEvent::CountdownReset { delay });
        delay
    }

    fn notify_pieces(&self) {
        self.notify(GameEvent::NextPiece {
            current: self.current,
            next: self.next,
        });
    }

    fn notify(&self, event: GameEvent) {
        if self.events.send(event).is_err() {
            tracing::trace!("Game event receiver dropped");
        }
    }
}

impl std::fmt::Debug for Game {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Game")
            .field("phase", &self.phase)
            .field("state", &self.state)
            .field("current", &self.current)
            .field("next", &self.next)
            .field("pending_clear", &self.pending_clear.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::piece::create_piece;
    use crate::piece_source::{PieceIngest, RemotePieceQueue};

    /// Hands out a fixed sequence of pieces, then dots
    struct ScriptedSource(VecDeque<u32>);

    impl PieceSource for ScriptedSource {
        fn spawn(&mut self) -> GamePiece {
            let index = self.0.pop_front().unwrap_or(3);
            create_piece(index).unwrap()
        }
    }

    #[derive(Default, Clone)]
    struct Recorder(Arc<Mutex<Vec<String>>>);

    impl GameHooks for Recorder {
        fn on_spawn(&mut self, piece: &GamePiece) {
            self.0.lock().unwrap().push(format!("spawn {}", piece.index()));
        }
        fn on_score(&mut self, state: &GameState) {
            self.0.lock().unwrap().push(format!("score {}", state.score));
        }
        fn on_tick(&mut self, state: &GameState) {
            self.0.lock().unwrap().push(format!("lives {}", state.lives));
        }
    }

    fn scripted(
        config: GameConfig,
        pieces: &[u32],
    ) -> (Game, flume::Receiver<GameEvent>, Recorder) {
        let (tx, rx) = flume::unbounded();
        let recorder = Recorder::default();
        let game = Game::new(
            config,
            Box::new(ScriptedSource(pieces.iter().copied().collect())),
            Box::new(recorder.clone()),
            tx,
        );
        (game, rx, recorder)
    }

    #[test]
    fn test_construction_spawns_twice() {
        let (game, events, recorder) = scripted(GameConfig::default(), &[0, 2, 4]);
        assert_eq!(game.phase(), GamePhase::Created);
        assert_eq!(game.current_piece().index(), 0);
        assert_eq!(game.next_piece().index(), 2);
        assert_eq!(*recorder.0.lock().unwrap(), vec!["spawn 0", "spawn 2"]);
        assert!(matches!(
            events.drain().last(),
            Some(GameEvent::NextPiece { .. })
        ));
    }

    #[test]
    fn test_placement_requires_running() {
        let (mut game, _events, _) = scripted(GameConfig::default(), &[]);
        assert_eq!(game.block_activated(2, 2), Activation::Rejected);
        assert_eq!(game.start(), Some(Duration::from_millis(12000)));
        assert_eq!(game.start(), None);
        assert!(matches!(game.block_activated(2, 2), Activation::Placed { .. }));
    }

    /// Game built on an empty remote queue, and the handle that feeds it
    fn starved(config: GameConfig) -> (Game, PieceIngest, Recorder) {
        let (queue, _requests) = RemotePieceQueue::new();
        let ingest = queue.ingest();
        let (tx, _rx) = flume::unbounded();
        let recorder = Recorder::default();
        let game = Game::new(config, Box::new(queue), Box::new(recorder.clone()), tx);
        (game, ingest, recorder)
    }

    #[test]
    fn test_extreme_coordinates_rejected() {
        let (tx, _rx) = flume::unbounded();
        let mut game = Game::local(GameConfig::default().with_seed(5), tx);
        game.start();
        for (x, y) in [(i32::MAX, 0), (0, i32::MAX), (i32::MIN, 0), (0, i32::MIN)] {
            assert_eq!(game.block_activated(x, y), Activation::Rejected);
        }
        assert_eq!(game.grid(), &Grid::new(5, 5));
    }

    #[test]
    fn test_rejected_placement_changes_nothing() {
        let (mut game, events, _) = scripted(GameConfig::default(), &[2, 2]);
        game.start();
        events.drain();
        let before = game.snapshot();
        // Plus centred on a corner spills off the grid
        assert_eq!(game.block_activated(0, 0), Activation::Rejected);
        assert_eq!(game.grid(), &Grid::new(5, 5));
        assert_eq!(game.state(), before.state);
        assert_eq!(game.current_piece(), &before.current);
        assert!(events.is_empty());
    }

    #[test]
    fn test_clear_is_two_phase() {
        // Five vertical lines centred on row 1 fill rows 0, 1 and 2
        let config = GameConfig::default();
        let (mut game, events, recorder) = scripted(config, &[0, 0, 0, 0, 0]);
        game.start();

        // Line is vertical: (x, y-1), (x, y), (x, y+1)
        for x in 0..4 {
            assert!(matches!(
                game.block_activated(x, 1),
                Activation::Placed { clear_delay: None, .. }
            ));
        }
        events.drain();
        assert_eq!(game.state().multiplier, 1);

        let outcome = game.block_activated(4, 1);
        assert_eq!(
            outcome,
            Activation::Placed {
                countdown: Duration::from_millis(12000),
                clear_delay: Some(Duration::from_millis(500)),
            }
        );
        // Rows 0, 1, 2 are full: 3 lines, 15 blocks
        assert_eq!(game.state().score, 3 * 15 * 10);
        assert_eq!(game.state().multiplier, 2);

        let events: Vec<_> = events.drain().collect();
        let GameEvent::LinesCleared(cells) = &events[0] else {
            panic!("expected LinesCleared first, got {:?}", events);
        };
        assert_eq!(cells.len(), 15);
        assert!(events.contains(&GameEvent::StateChanged(game.state())));

        // Detected cells are still filled until the clear is applied
        assert!(game.grid().is_row_full(0));
        assert!(game.has_pending_clear());
        assert_eq!(game.block_activated(2, 3), Activation::Rejected);

        let applied = game.apply_pending_clear().unwrap();
        assert_eq!(applied.rows, vec![0, 1, 2]);
        assert!(game.grid().cells().iter().all(|v| *v == 0));
        assert!(game.apply_pending_clear().is_none());

        let log = recorder.0.lock().unwrap();
        assert!(log.contains(&"score 450".to_string()));
    }

    #[test]
    fn test_countdown_costs_a_life_and_refreshes_piece() {
        let (mut game, events, recorder) = scripted(GameConfig::default(), &[0, 1, 2, 3]);
        assert_eq!(game.countdown_elapsed(), Tick::Idle);
        game.start();
        events.drain();

        assert_eq!(game.countdown_elapsed(), Tick::Continue(Duration::from_millis(12000)));
        assert_eq!(game.state().lives, 2);
        assert_eq!(game.current_piece().index(), 1);
        assert_eq!(game.next_piece().index(), 2);

        let events: Vec<_> = events.drain().collect();
        assert!(events.contains(&GameEvent::CountdownReset {
            delay: Duration::from_millis(12000)
        }));
        assert!(recorder.0.lock().unwrap().contains(&"lives 2".to_string()));
    }

    #[test]
    fn test_last_life_ends_game_once() {
        let config = GameConfig::default().with_starting_lives(1);
        let (mut game, events, recorder) = scripted(config, &[]);
        game.start();
        events.drain();

        assert_eq!(game.countdown_elapsed(), Tick::GameOver);
        assert!(game.is_over());
        assert_eq!(game.countdown_elapsed(), Tick::Idle);

        let game_overs = events
            .drain()
            .filter(|e| *e == GameEvent::GameOver)
            .count();
        assert_eq!(game_overs, 1);
        assert!(recorder.0.lock().unwrap().contains(&"lives 0".to_string()));

        assert_eq!(game.block_activated(2, 2), Activation::Rejected);
        assert!(!game.rotate_current_piece());
        assert!(!game.swap_current_piece());
    }

    #[test]
    fn test_game_over_drops_pending_clear() {
        let config = GameConfig::default().with_starting_lives(1);
        let (mut game, _events, _) = scripted(config, &[0; 5]);
        game.start();
        for x in 0..5 {
            game.block_activated(x, 1);
        }
        assert!(game.has_pending_clear());
        let score = game.state().score;

        assert_eq!(game.countdown_elapsed(), Tick::GameOver);
        assert!(!game.has_pending_clear());
        assert!(game.apply_pending_clear().is_none());
        assert!(game.grid().is_row_full(0));
        assert_eq!(game.state().score, score);
    }

    #[test]
    fn test_fallback_pieces_replaced_before_start() {
        let (mut game, ingest, recorder) = starved(GameConfig::default());
        assert!(game.has_fallback_pieces());
        assert_eq!(game.current_piece().index(), 0);
        assert_eq!(game.next_piece().index(), 0);
        assert!(!game.replace_fallback_pieces());

        ingest.enqueue(7).unwrap();
        assert!(game.replace_fallback_pieces());
        assert_eq!(game.current_piece().index(), 7);
        assert_eq!(game.next_piece().index(), 0);

        ingest.enqueue(9).unwrap();
        assert!(game.replace_fallback_pieces());
        assert_eq!(game.current_piece().index(), 7);
        assert_eq!(game.next_piece().index(), 9);
        assert!(!game.has_fallback_pieces());

        // Replacements are not spawns
        assert_eq!(*recorder.0.lock().unwrap(), vec!["spawn 0", "spawn 0"]);
        ingest.enqueue(4).unwrap();
        assert!(!game.replace_fallback_pieces());
        assert_eq!(game.current_piece().index(), 7);
    }

    #[test]
    fn test_fallback_marker_follows_the_piece() {
        let (mut game, ingest, _) = starved(GameConfig::default());
        ingest.enqueue(7).unwrap();
        game.replace_fallback_pieces();

        // The fallback next moves to current; the starved spawn behind it is final
        game.start();
        assert!(matches!(game.block_activated(2, 2), Activation::Placed { .. }));
        ingest.enqueue(4).unwrap();
        assert!(game.replace_fallback_pieces());
        assert_eq!(game.current_piece().index(), 4);
        assert_eq!(game.next_piece().index(), 0);
        assert!(!game.has_fallback_pieces());

        // Swapping carries the marker along
        let (mut game, ingest, _) = starved(GameConfig::default());
        ingest.enqueue(7).unwrap();
        game.replace_fallback_pieces();
        assert!(game.swap_current_piece());
        ingest.enqueue(9).unwrap();
        assert!(game.replace_fallback_pieces());
        assert_eq!(game.current_piece().index(), 9);
        assert_eq!(game.next_piece().index(), 7);
    }

    #[test]
    fn test_no_fallback_replacement_after_game_over() {
        let config = GameConfig::default().with_starting_lives(1);
        let (mut game, ingest, _) = starved(config);
        game.start();
        assert_eq!(game.countdown_elapsed(), Tick::GameOver);
        ingest.enqueue(7).unwrap();
        assert!(!game.replace_fallback_pieces());
        assert_eq!(game.current_piece().index(), 0);
    }

    #[test]
    fn test_rotate_and_swap() {
        let (mut game, events, _) = scripted(GameConfig::default(), &[0, 2]);
        events.drain();
        let state = game.state();

        assert!(game.rotate_current_piece());
        assert_eq!(*game.current_piece(), create_piece(0).unwrap().rotated());

        assert!(game.swap_current_piece());
        assert_eq!(game.current_piece().index(), 2);
        assert_eq!(game.next_piece().index(), 0);

        assert_eq!(game.state(), state);
        let events: Vec<_> = events.drain().collect();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| matches!(e, GameEvent::NextPiece { .. })));
    }

    #[test]
    fn test_summary_tracks_lines_and_multiplier() {
        let (mut game, _events, _) = scripted(GameConfig::default(), &[0; 8]);
        game.start();
        for x in 0..5 {
            game.block_activated(x, 1);
        }
        game.apply_pending_clear();

        let summary = game.summary();
        assert_eq!(summary.lines_cleared, 3);
        assert_eq!(summary.highest_multiplier, 2);
        assert_eq!(summary.score, 450);

        // A round without lines resets the multiplier but not the maximum
        game.block_activated(2, 2);
        assert_eq!(game.state().multiplier, 1);
        assert_eq!(game.summary().highest_multiplier, 2);
    }
}
