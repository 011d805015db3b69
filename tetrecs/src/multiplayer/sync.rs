//! Multiplayer sync adapter
//!
//! Bridges a [`Game`](crate::game::Game) and a [`Transport`]. Incoming messages are
//! queued by the transport listener and applied by the session owner through
//! [`MultiplayerSync::handle_message`]; outgoing messages are sent from engine hooks.

use std::sync::Arc;

use crate::error::Result;
use crate::game::{GameHooks, GameState};
use crate::piece::GamePiece;
use crate::piece_source::{PieceIngest, PieceRequest, RemotePieceQueue};
use crate::scores::ScoreList;

use super::leaderboard::Leaderboard;
use super::protocol::{InboundMessage, OutboundMessage};
use super::transport::{ListenerId, Transport};

/// Send a message, logging instead of failing
fn send(transport: &dyn Transport, message: OutboundMessage) {
    let text = message.to_string();
    tracing::trace!("Sending '{}'", text);
    if let Err(e) = transport.send(&text) {
        tracing::warn!("Failed to send '{}': {}", text, e);
    }
}

/// Network side of a multiplayer game
pub struct MultiplayerSync {
    transport: Arc<dyn Transport>,
    listener: Option<ListenerId>,
    inbound_rx: flume::Receiver<String>,
    ingest: PieceIngest,
    leaderboard: Leaderboard,
    /// Lines of the latest `SCORES` message
    last_scores: Vec<String>,
    online_scores: Option<ScoreList>,
    final_scores: Option<Leaderboard>,
}

impl MultiplayerSync {
    /// Subscribe to `transport` and build the piece queue and hooks for a game
    pub fn attach(transport: Arc<dyn Transport>) -> (Self, RemotePieceQueue, SyncHooks) {
        let (queue, requests) = RemotePieceQueue::new();
        let (inbound_tx, inbound_rx) = flume::unbounded();

        let listener = transport.subscribe(Box::new(move |message: &str| {
            if inbound_tx.send(message.to_string()).is_err() {
                tracing::debug!("Dropping message after detach: '{}'", message);
            }
        }));
        tracing::info!("Multiplayer listener attached");

        let hooks = SyncHooks {
            transport: transport.clone(),
            requests,
        };
        let sync = Self {
            transport,
            listener: Some(listener),
            inbound_rx,
            ingest: queue.ingest(),
            leaderboard: Leaderboard::default(),
            last_scores: Vec::new(),
            online_scores: None,
            final_scores: None,
        };
        (sync, queue, hooks)
    }

    /// Wait for the next received message
    ///
    /// Never completes once the listener is detached and the backlog is drained.
    pub async fn next_message(&self) -> String {
        match self.inbound_rx.recv_async().await {
            Ok(message) => message,
            Err(_) => std::future::pending().await,
        }
    }

    /// Apply one received message
    pub fn handle_message(&mut self, message: &str) -> Result<InboundMessage> {
        let parsed = InboundMessage::parse(message)?;
        match &parsed {
            InboundMessage::Piece(index) => {
                self.ingest.enqueue(*index)?;
                tracing::debug!("Queued piece {}", index);
            }
            InboundMessage::Scores(lines) => {
                self.leaderboard = Leaderboard::from_lines(lines.iter().map(String::as_str));
                self.last_scores = lines.clone();
                tracing::debug!("Leaderboard updated, {} players", self.leaderboard.len());
            }
            InboundMessage::HiScores(payload) => {
                let scores = ScoreList::parse(payload);
                tracing::debug!("Received {} online high scores", scores.len());
                self.online_scores = Some(scores);
            }
        }
        Ok(parsed)
    }

    /// Apply every message already received, logging the ones that fail
    ///
    /// Returns the number of messages applied.
    pub fn drain_inbound(&mut self) -> usize {
        let messages: Vec<String> = self.inbound_rx.drain().collect();
        messages
            .iter()
            .filter(|message| match self.handle_message(message) {
                Ok(_) => true,
                Err(e) => {
                    tracing::warn!("Ignoring message '{}': {}", message, e);
                    false
                }
            })
            .count()
    }

    /// Ask the server for its high-score list
    pub fn request_hiscores(&self) {
        send(self.transport.as_ref(), OutboundMessage::RequestHiScores);
    }

    /// Submit a score to the online high-score list
    pub fn submit_hiscore(&self, name: &str, score: u32) {
        send(
            self.transport.as_ref(),
            OutboundMessage::HiScore {
                name: name.to_string(),
                score,
            },
        );
    }

    /// Unsubscribe from the transport and freeze the final leaderboard
    ///
    /// Messages received before the unsubscribe are applied first. Safe to call
    /// more than once.
    pub fn detach(&mut self) {
        let Some(listener) = self.listener.take() else {
            return;
        };
        self.transport.unsubscribe(listener);
        tracing::info!("Multiplayer listener detached");

        let applied = self.drain_inbound();
        if applied > 0 {
            tracing::debug!("Applied {} messages received before detach", applied);
        }

        if !self.last_scores.is_empty() {
            self.final_scores = Some(Leaderboard::from_lines(
                self.last_scores.iter().map(String::as_str),
            ));
        }
    }

    pub fn is_attached(&self) -> bool {
        self.listener.is_some()
    }

    pub fn leaderboard(&self) -> &Leaderboard {
        &self.leaderboard
    }

    /// Online high scores, once a `HISCORES` reply arrived
    pub fn online_scores(&self) -> Option<&ScoreList> {
        self.online_scores.as_ref()
    }

    /// Leaderboard at the time of detach, if one was received
    pub fn final_scores(&self) -> Option<&Leaderboard> {
        self.final_scores.as_ref()
    }
}

impl Drop for MultiplayerSync {
    fn drop(&mut self) {
        self.detach();
    }
}

impl std::fmt::Debug for MultiplayerSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiplayerSync")
            .field("attached", &self.is_attached())
            .field("leaderboard", &self.leaderboard)
            .finish()
    }
}

/// Engine hooks that report to the server
pub struct SyncHooks {
    transport: Arc<dyn Transport>,
    requests: flume::Receiver<PieceRequest>,
}

impl GameHooks for SyncHooks {
    fn on_spawn(&mut self, _piece: &GamePiece) {
        // One request per spawn keeps the server queue topped up
        for request in self.requests.drain() {
            if request == PieceRequest::Starved {
                tracing::debug!("Requesting piece after starvation");
            }
            send(self.transport.as_ref(), OutboundMessage::RequestPiece);
        }
    }

    fn on_score(&mut self, state: &GameState) {
        send(self.transport.as_ref(), OutboundMessage::Score(state.score));
    }

    fn on_tick(&mut self, state: &GameState) {
        send(self.transport.as_ref(), OutboundMessage::Lives(state.lives));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::game::{Game, Tick};
    use crate::multiplayer::transport::LoopbackTransport;

    fn setup() -> (LoopbackTransport, MultiplayerSync, Game) {
        let transport = LoopbackTransport::new();
        let (sync, queue, hooks) = MultiplayerSync::attach(Arc::new(transport.clone()));
        let (events, _) = flume::unbounded();
        let game = Game::new(GameConfig::default(), Box::new(queue), Box::new(hooks), events);
        (transport, sync, game)
    }

    #[test]
    fn test_session_start_requests_two_pieces() {
        let (transport, _sync, game) = setup();
        let sent: Vec<_> = transport.outbox().drain().collect();
        assert_eq!(sent, vec!["PIECE", "PIECE"]);
        // Both spawns starved
        assert_eq!(game.current_piece().index(), 0);
        assert_eq!(game.next_piece().index(), 0);
    }

    #[test]
    fn test_piece_message_feeds_queue() {
        let (transport, mut sync, mut game) = setup();
        transport.outbox().drain();

        transport.deliver("PIECE 7");
        transport.deliver("PIECE 99");
        transport.deliver("PIECE 2");
        transport.deliver("PIECE 5");
        assert_eq!(sync.drain_inbound(), 3);

        // The first two replace the fallbacks from the starved construction spawns
        assert!(game.replace_fallback_pieces());
        assert_eq!(game.current_piece().index(), 7);
        assert_eq!(game.next_piece().index(), 2);
        assert!(transport.outbox().is_empty());

        game.start();
        assert!(matches!(
            game.block_activated(2, 2),
            crate::game::Activation::Placed { .. }
        ));
        assert_eq!(game.current_piece().index(), 2);
        assert_eq!(game.next_piece().index(), 5);

        let sent: Vec<_> = transport.outbox().drain().collect();
        assert_eq!(sent, vec!["SCORE 0", "PIECE"]);
    }

    #[test]
    fn test_tick_sends_lives() {
        let (transport, _sync, mut game) = setup();
        game.start();
        transport.outbox().drain();

        assert!(matches!(game.countdown_elapsed(), Tick::Continue(_)));
        let sent: Vec<_> = transport.outbox().drain().collect();
        assert_eq!(sent, vec!["LIVES 2", "PIECE"]);
    }

    #[test]
    fn test_scores_and_hiscores() {
        let (transport, mut sync, _game) = setup();
        transport.deliver("SCORES alice:120:2\nnope\nbob:40:DEAD");
        transport.deliver("HISCORES carol:900\ndave:10");
        assert_eq!(sync.drain_inbound(), 2);

        assert_eq!(sync.leaderboard().len(), 2);
        assert_eq!(sync.leaderboard().entries()[0].to_string(), "alice: 120 (2 Lives)");
        let online = sync.online_scores().unwrap();
        assert_eq!(online.entries()[0].name, "carol");

        sync.request_hiscores();
        sync.submit_hiscore("ann", 300);
        let sent: Vec<_> = transport.outbox().drain().collect();
        assert!(sent.ends_with(&["HISCORES".to_string(), "HISCORE ann:300".to_string()]));
    }

    #[test]
    fn test_detach_is_idempotent() {
        let (transport, mut sync, _game) = setup();
        transport.deliver("SCORES alice:120:2\nbob:40:DEAD");
        sync.drain_inbound();
        assert_eq!(transport.listener_count(), 1);

        sync.detach();
        assert!(!sync.is_attached());
        assert_eq!(transport.listener_count(), 0);
        let final_scores = sync.final_scores().unwrap();
        assert_eq!(final_scores.len(), 2);
        assert!(final_scores.entries()[1].is_dead());

        sync.detach();
        assert_eq!(transport.listener_count(), 0);

        // Nothing reaches the adapter after detach
        transport.deliver("PIECE 3");
        assert_eq!(sync.drain_inbound(), 0);
    }

    #[test]
    fn test_detach_applies_received_scores() {
        let (transport, mut sync, _game) = setup();
        transport.deliver("SCORES ann:300:1");
        sync.drain_inbound();
        // Reply to the final LIVES 0, not yet handled by the session
        transport.deliver("SCORES ann:300:DEAD");

        sync.detach();
        let final_scores = sync.final_scores().unwrap();
        assert_eq!(final_scores.len(), 1);
        assert!(final_scores.entries()[0].is_dead());
        assert!(sync.leaderboard().entries()[0].is_dead());
    }

    #[test]
    fn test_drop_detaches() {
        let (transport, sync, _game) = setup();
        drop(sync);
        assert_eq!(transport.listener_count(), 0);
    }
}
