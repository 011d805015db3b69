//! Game session - the single owner of a running game
//!
//! Player commands, countdown expiry, the deferred clear and network messages all
//! reach the [`Game`] through [`GameSession::step`], one at a time. Nothing else
//! mutates the game, so placements never interleave with ticks or message handling.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::config::GameConfig;
use crate::error::Result;
use crate::game::{Activation, Game, GameEvent, GameState, GameSummary, Tick};
use crate::multiplayer::{InboundMessage, MultiplayerSync, Transport};

/// Commands that can be sent to a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    /// Place the current piece centred on (x, y)
    BlockActivated { x: i32, y: i32 },
    RotateCurrent,
    SwapCurrent,
    /// Stop the session's run loop
    Stop,
}

/// Result of a session step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepResult {
    /// The game state after a change
    State(GameState),
    /// Nothing changed before the step timeout
    Timeout,
    /// The last life was lost; returned once
    GameOver(GameSummary),
    /// The session is stopped
    Stop,
}

/// What woke a step up
enum Wake {
    Clear,
    Countdown,
    Command(Option<SessionCommand>),
    Inbound(String),
    Timeout,
}

/// Sleep until `deadline`, or forever when there is none
async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn next_inbound(sync: Option<&MultiplayerSync>) -> String {
    match sync {
        Some(sync) => sync.next_message().await,
        None => std::future::pending().await,
    }
}

/// Serialized execution context of one game
pub struct GameSession {
    game: Game,
    sync: Option<MultiplayerSync>,
    /// Receiver for commands from the application
    command_rx: flume::Receiver<SessionCommand>,
    /// Sender for commands from the application
    command_tx: flume::Sender<SessionCommand>,
    countdown: Option<Instant>,
    clear_at: Option<Instant>,
    stopped: bool,
}

impl GameSession {
    /// Wrap a game, and optionally its multiplayer adapter
    pub fn new(game: Game, sync: Option<MultiplayerSync>) -> Self {
        let (command_tx, command_rx) = flume::unbounded();
        Self {
            game,
            sync,
            command_rx,
            command_tx,
            countdown: None,
            clear_at: None,
            stopped: false,
        }
    }

    /// Get a sender for sending commands to this session
    pub fn sender(&self) -> flume::Sender<SessionCommand> {
        self.command_tx.clone()
    }

    /// Start the game and arm the countdown
    ///
    /// Returns the countdown length, or None if the game was already started.
    pub fn start(&mut self) -> Option<Duration> {
        if self.stopped {
            return None;
        }
        let delay = self.game.start()?;
        self.countdown = Some(Instant::now() + delay);
        Some(delay)
    }

    /// Execute one step of the session
    ///
    /// Returns when either:
    /// - The game state changed (returns State)
    /// - The last life was lost (returns GameOver, once)
    /// - The step timeout (configured in GameConfig) elapses (returns Timeout)
    /// - A Stop command is received or the session is already stopped (returns Stop)
    pub async fn step(&mut self) -> Result<StepResult> {
        if self.stopped {
            return Ok(StepResult::Stop);
        }

        let sleep = tokio::time::sleep(self.game.config().step_timeout());
        tokio::pin!(sleep);

        loop {
            let wake = tokio::select! {
                biased;
                () = wait_until(self.clear_at) => Wake::Clear,
                () = wait_until(self.countdown) => Wake::Countdown,
                command = self.command_rx.recv_async() => Wake::Command(command.ok()),
                message = next_inbound(self.sync.as_ref()) => Wake::Inbound(message),
                () = &mut sleep => Wake::Timeout,
            };

            if let Some(result) = self.handle(wake) {
                return Ok(result);
            }
        }
    }

    /// Apply one wake-up; None means keep waiting
    fn handle(&mut self, wake: Wake) -> Option<StepResult> {
        match wake {
            Wake::Timeout => Some(StepResult::Timeout),
            Wake::Clear => {
                self.clear_at = None;
                self.game
                    .apply_pending_clear()
                    .map(|_| StepResult::State(self.game.state()))
            }
            Wake::Countdown => {
                self.countdown = None;
                match self.game.countdown_elapsed() {
                    Tick::Continue(delay) => {
                        self.countdown = Some(Instant::now() + delay);
                        Some(StepResult::State(self.game.state()))
                    }
                    Tick::GameOver => {
                        self.shutdown();
                        Some(StepResult::GameOver(self.game.summary()))
                    }
                    Tick::Idle => None,
                }
            }
            Wake::Command(None) => {
                tracing::info!("Session command channel closed");
                self.shutdown();
                Some(StepResult::Stop)
            }
            Wake::Command(Some(SessionCommand::Stop)) => {
                tracing::info!("Session received Stop command, exiting");
                self.shutdown();
                Some(StepResult::Stop)
            }
            Wake::Command(Some(SessionCommand::BlockActivated { x, y })) => {
                match self.game.block_activated(x, y) {
                    Activation::Rejected => None,
                    Activation::Placed {
                        countdown,
                        clear_delay,
                    } => {
                        let now = Instant::now();
                        self.countdown = Some(now + countdown);
                        if let Some(delay) = clear_delay {
                            self.clear_at = Some(now + delay);
                        }
                        Some(StepResult::State(self.game.state()))
                    }
                }
            }
            Wake::Command(Some(SessionCommand::RotateCurrent)) => self
                .game
                .rotate_current_piece()
                .then(|| StepResult::State(self.game.state())),
            Wake::Command(Some(SessionCommand::SwapCurrent)) => self
                .game
                .swap_current_piece()
                .then(|| StepResult::State(self.game.state())),
            Wake::Inbound(message) => match self.sync.as_mut()?.handle_message(&message) {
                // Early pieces stand in for the fallbacks drawn before any arrived
                Ok(InboundMessage::Piece(_)) => self
                    .game
                    .replace_fallback_pieces()
                    .then(|| StepResult::State(self.game.state())),
                Ok(_) => None,
                Err(e) => {
                    tracing::warn!("Ignoring message '{}': {}", message, e);
                    None
                }
            },
        }
    }

    /// Cancel the countdown and any pending clear, and detach from the network
    ///
    /// Safe to call more than once.
    pub fn shutdown(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        self.countdown = None;
        self.clear_at = None;
        self.game.shutdown();
        if let Some(sync) = self.sync.as_mut() {
            sync.detach();
        }
        tracing::info!("Session stopped");
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    pub fn sync(&self) -> Option<&MultiplayerSync> {
        self.sync.as_ref()
    }

    /// Mutable access to the adapter, e.g. to request or submit high scores
    pub fn sync_mut(&mut self) -> Option<&mut MultiplayerSync> {
        self.sync.as_mut()
    }

    /// Time left before the countdown expires
    pub fn countdown_remaining(&self) -> Option<Duration> {
        self.countdown
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }
}

impl std::fmt::Debug for GameSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameSession")
            .field("game", &self.game)
            .field("multiplayer", &self.sync.is_some())
            .field("stopped", &self.stopped)
            .finish()
    }
}

/// Builder for a [`GameSession`]
#[derive(Default)]
pub struct SessionBuilder {
    config: GameConfig,
    transport: Option<Arc<dyn Transport>>,
}

impl SessionBuilder {
    pub fn new(config: GameConfig) -> Self {
        Self {
            config,
            transport: None,
        }
    }

    /// Play multiplayer over `transport`
    pub fn multiplayer(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Build the session and the receiver of its game events
    pub fn build(self) -> (GameSession, flume::Receiver<GameEvent>) {
        let (events_tx, events_rx) = flume::unbounded();
        let session = match self.transport {
            Some(transport) => {
                let (sync, queue, hooks) = MultiplayerSync::attach(transport);
                let game = Game::new(self.config, Box::new(queue), Box::new(hooks), events_tx);
                GameSession::new(game, Some(sync))
            }
            None => GameSession::new(Game::local(self.config, events_tx), None),
        };
        (session, events_rx)
    }
}
