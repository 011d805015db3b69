//! Piece sources
//!
//! A [`PieceSource`] hands the engine its next piece. Single-player games draw from a
//! seedable random generator; multiplayer games consume a FIFO filled by `PIECE`
//! messages from the server. The remote queue never blocks: when it runs dry it falls
//! back to piece 0 and asks for more.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::Result;
use crate::piece::{create_piece, GamePiece, PIECE_COUNT};

/// Piece handed out by a starved remote queue
pub(crate) fn fallback_piece() -> GamePiece {
    GamePiece::from_catalog(0)
}

/// Supplies the next piece to the engine
pub trait PieceSource: Send {
    /// Produce the next piece. Must not block.
    fn spawn(&mut self) -> GamePiece;

    /// Like [`PieceSource::spawn`], but None where a fallback piece would be returned
    fn try_spawn(&mut self) -> Option<GamePiece> {
        Some(self.spawn())
    }

    /// Take a piece that is already available, without counting it as a spawn
    fn take_ready(&mut self) -> Option<GamePiece> {
        None
    }
}

/// Uniformly random pieces from a local generator
#[derive(Debug)]
pub struct LocalPieceSource {
    rng: StdRng,
}

impl LocalPieceSource {
    /// Create a source, seeded when `seed` is given
    pub fn new(seed: Option<u64>) -> Self {
        let seed = seed.unwrap_or_else(rand::random);
        tracing::debug!("Local piece source seeded with {}", seed);
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl PieceSource for LocalPieceSource {
    fn spawn(&mut self) -> GamePiece {
        GamePiece::from_catalog(self.rng.random_range(0..PIECE_COUNT))
    }
}

/// Signal emitted by [`RemotePieceQueue::spawn`], one per spawn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PieceRequest {
    /// A queued piece was consumed
    Consumed(u8),
    /// The queue was empty and the fallback piece was returned
    Starved,
}

/// Cloneable handle that feeds a [`RemotePieceQueue`]
#[derive(Debug, Clone)]
pub struct PieceIngest {
    fifo_tx: flume::Sender<GamePiece>,
}

impl PieceIngest {
    /// Append the piece for `index` to the queue
    pub fn enqueue(&self, index: u32) -> Result<()> {
        let piece = create_piece(index)?;
        // The queue owns the receiving side, so this only fails after it is dropped
        if self.fifo_tx.send(piece).is_err() {
            tracing::debug!("Remote piece queue dropped, discarding piece {}", index);
        }
        Ok(())
    }
}

/// FIFO of pieces received from the network
#[derive(Debug)]
pub struct RemotePieceQueue {
    fifo_tx: flume::Sender<GamePiece>,
    fifo_rx: flume::Receiver<GamePiece>,
    requests: flume::Sender<PieceRequest>,
}

impl RemotePieceQueue {
    /// Create an empty queue and the receiver of its spawn signals
    pub fn new() -> (Self, flume::Receiver<PieceRequest>) {
        let (fifo_tx, fifo_rx) = flume::unbounded();
        let (requests, requests_rx) = flume::unbounded();
        (
            Self {
                fifo_tx,
                fifo_rx,
                requests,
            },
            requests_rx,
        )
    }

    /// Append the piece for `index`
    pub fn enqueue(&self, index: u32) -> Result<()> {
        self.ingest().enqueue(index)
    }

    /// Handle for feeding the queue from elsewhere
    pub fn ingest(&self) -> PieceIngest {
        PieceIngest {
            fifo_tx: self.fifo_tx.clone(),
        }
    }

    /// Number of queued pieces
    pub fn len(&self) -> usize {
        self.fifo_rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fifo_rx.is_empty()
    }

    fn signal(&self, request: PieceRequest) {
        if self.requests.send(request).is_err() {
            tracing::debug!("Piece request receiver dropped");
        }
    }
}

impl PieceSource for RemotePieceQueue {
    fn spawn(&mut self) -> GamePiece {
        self.try_spawn().unwrap_or_else(|| {
            tracing::warn!("Remote piece queue empty, using fallback piece");
            fallback_piece()
        })
    }

    fn try_spawn(&mut self) -> Option<GamePiece> {
        match self.take_ready() {
            Some(piece) => {
                tracing::trace!("Spawned queued piece {}", piece);
                self.signal(PieceRequest::Consumed(piece.index()));
                Some(piece)
            }
            None => {
                tracing::debug!("Remote piece queue empty");
                self.signal(PieceRequest::Starved);
                None
            }
        }
    }

    fn take_ready(&mut self) -> Option<GamePiece> {
        self.fifo_rx.try_recv().ok()
    }
}
