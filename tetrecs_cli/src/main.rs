use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use rand::Rng;
use tetrecs::multiplayer::LoopbackTransport;
use tetrecs::scores::{normalize_name, MAX_SCORES};
use tetrecs::{
    GameConfig, GameEvent, GamePiece, GameSession, GameSummary, HighScorePlacement, Profile,
    ScoreEntry, ScoreList, SessionBuilder, SessionCommand, StepResult, PIECE_COUNT,
};

/// tetrecs - headless grid puzzle driver
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Player name for high scores
    #[arg(short, long)]
    name: Option<String>,

    /// Grid columns
    #[arg(long, default_value_t = 5)]
    cols: usize,

    /// Grid rows
    #[arg(long, default_value_t = 5)]
    rows: usize,

    /// Seed for the local piece source
    #[arg(short, long)]
    seed: Option<u64>,

    /// Play against a simulated multiplayer server
    #[arg(short, long)]
    multiplayer: bool,

    /// Directory holding settings, statistics and scores
    #[arg(short, long, default_value = "tetrecs-data")]
    data_dir: PathBuf,
}

const SCORES_FILE: &str = "scores.txt";

#[tokio::main(flavor = "multi_thread", worker_threads = 1)]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::fmt::init();

    let name = normalize_name(args.name.as_deref().unwrap_or_default());
    let mut profile = Profile::load(&args.data_dir).context("Failed to load profile")?;
    let scores_path = args.data_dir.join(SCORES_FILE);
    let mut local_scores = ScoreList::load(&scores_path).context("Failed to load scores")?;

    let mut config = GameConfig::default().with_size(args.cols, args.rows);
    if let Some(seed) = args.seed {
        config = config.with_seed(seed);
    }

    let mut builder = SessionBuilder::new(config);
    let mut server_task = None;
    if args.multiplayer {
        let transport = LoopbackTransport::new();
        server_task = Some(tokio::spawn(simulated_server(transport.clone(), name.clone())));
        builder = builder.multiplayer(Arc::new(transport));
    }
    let (mut session, events) = builder.build();

    println!("=== tetrecs ===");
    println!("Player: {}", name);
    println!("Mode: {}", if args.multiplayer { "multiplayer" } else { "single player" });
    println!("{}", profile.statistics);
    println!("Controls (one per line):");
    println!("  x y - Place current piece centred on column x, row y");
    println!("  r   - Rotate current piece");
    println!("  s   - Swap current and next piece");
    println!("  q   - Quit");
    println!();

    if let Some(sync) = session.sync() {
        sync.request_hiscores();
    }

    // Stdin reader on a detached thread; exiting must not wait for a pending read
    let input_sender = session.sender();
    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            let Ok(line) = line else { break };
            let command = match parse_command(&line) {
                Some(command) => command,
                None => {
                    println!("→ Unrecognized input '{}'", line.trim());
                    continue;
                }
            };
            if input_sender.send(command).is_err() || command == SessionCommand::Stop {
                break;
            }
        }
        // End of input quits
        let _ = input_sender.send(SessionCommand::Stop);
    });

    session.start();
    render(&session);

    // Main step loop
    let mut summary = None;
    loop {
        let result = session.step().await?;
        for event in events.drain() {
            print_event(&event);
        }
        match result {
            StepResult::State(_) => render(&session),
            StepResult::Timeout => {}
            StepResult::GameOver(game_summary) => {
                summary = Some(game_summary);
                break;
            }
            StepResult::Stop => {
                println!("Session stopped");
                break;
            }
        }
    }

    if let Some(summary) = summary {
        finish_game(&session, &summary, &name, &mut profile, &mut local_scores);
        profile.save(&args.data_dir).context("Failed to save profile")?;
        local_scores.save(&scores_path).context("Failed to save scores")?;
    }

    if let Some(task) = server_task {
        task.abort();
    }

    println!("Game Over!");
    Ok(())
}

fn parse_command(line: &str) -> Option<SessionCommand> {
    let mut parts = line.split_whitespace();
    let command = match (parts.next()?, parts.next()) {
        ("q" | "Q", None) => SessionCommand::Stop,
        ("r" | "R", None) => SessionCommand::RotateCurrent,
        ("s" | "S", None) => SessionCommand::SwapCurrent,
        (x, Some(y)) => SessionCommand::BlockActivated {
            x: x.parse().ok()?,
            y: y.parse().ok()?,
        },
        _ => return None,
    };
    parts.next().is_none().then_some(command)
}

fn print_event(event: &GameEvent) {
    match event {
        GameEvent::LinesCleared(cells) => println!("→ Cleared {} blocks", cells.len()),
        GameEvent::CountdownReset { delay } => {
            println!("→ Countdown {:.1}s", delay.as_secs_f32())
        }
        GameEvent::GameOver => println!("→ Out of lives"),
        GameEvent::NextPiece { .. } | GameEvent::StateChanged(_) => {}
    }
}

fn piece_rows(piece: &GamePiece) -> Vec<String> {
    (0..3)
        .map(|y| {
            (0..3)
                .map(|x| if piece.is_filled(x, y) { '#' } else { '.' })
                .collect()
        })
        .collect()
}

fn render(session: &GameSession) {
    let game = session.game();
    let current = piece_rows(game.current_piece());
    let next = piece_rows(game.next_piece());

    println!("{}", game.state());
    println!(
        "current: {:<16} next: {}",
        game.current_piece().name(),
        game.next_piece().name()
    );
    for y in 0..3 {
        println!("  {}            {}", current[y], next[y]);
    }
    for row in game.grid().to_rows() {
        let line: String = row
            .iter()
            .map(|v| match v {
                0 => '.',
                v => char::from_digit(u32::from(*v), 16).unwrap_or('?'),
            })
            .collect();
        println!("  {}", line);
    }
    if let Some(sync) = session.sync() {
        for entry in sync.leaderboard().entries() {
            println!("  {}", entry);
        }
    }
    println!();
}

fn finish_game(
    session: &GameSession,
    summary: &GameSummary,
    name: &str,
    profile: &mut Profile,
    local_scores: &mut ScoreList,
) {
    println!(
        "Final score {} (level {}, {} lines, best multiplier x{})",
        summary.score, summary.level, summary.lines_cleared, summary.highest_multiplier
    );
    profile.statistics.record_game(summary);

    let online = session.sync().and_then(|sync| sync.online_scores());
    match HighScorePlacement::decide(summary.score, local_scores, online) {
        HighScorePlacement::Online => {
            if let Some(sync) = session.sync() {
                sync.submit_hiscore(name, summary.score);
                println!("New online high score!");
            }
        }
        HighScorePlacement::Local => {
            if let Some(position) = local_scores.insert(ScoreEntry::new(name, summary.score)) {
                println!("New high score, #{} of {}", position + 1, MAX_SCORES);
            }
        }
        HighScorePlacement::None => {}
    }

    if let Some(final_scores) = session.sync().and_then(|sync| sync.final_scores()) {
        println!("Final leaderboard:");
        for entry in final_scores.entries() {
            println!("  {}", entry);
        }
    }
}

/// Stand-in server answering on the loopback transport
///
/// Hands out random pieces, echoes scores into a leaderboard with one bot player and
/// serves a fixed online high-score list.
async fn simulated_server(transport: LoopbackTransport, player: String) {
    let outbox = transport.outbox();
    let mut score = 0;
    let mut lives = 3;
    let bot_score = 250;

    while let Ok(message) = outbox.recv_async().await {
        tracing::debug!("Server received '{}'", message);
        let (command, payload) = message.split_once(' ').unwrap_or((message.as_str(), ""));
        let reply = match command {
            "PIECE" => {
                let index = rand::rng().random_range(0..PIECE_COUNT);
                Some(format!("PIECE {}", index))
            }
            "SCORE" | "LIVES" => {
                let Ok(value) = payload.parse::<u32>() else {
                    tracing::warn!("Server ignoring '{}'", message);
                    continue;
                };
                if command == "SCORE" {
                    score = value;
                } else {
                    lives = value;
                }
                let player_lives = if lives == 0 {
                    "DEAD".to_string()
                } else {
                    lives.to_string()
                };
                let mut board = vec![
                    (score, format!("{}:{}:{}", player, score, player_lives)),
                    (bot_score, format!("Bot:{}:3", bot_score)),
                ];
                board.sort_by(|a, b| b.0.cmp(&a.0));
                let lines: Vec<_> = board.into_iter().map(|(_, line)| line).collect();
                Some(format!("SCORES {}", lines.join("\n")))
            }
            "HISCORES" => Some("HISCORES Ada:2000\nBot:1200\nGrace:800".to_string()),
            "HISCORE" => {
                println!("→ Server recorded high score {}", payload);
                None
            }
            _ => None,
        };

        if let Some(reply) = reply {
            transport.deliver(&reply);
        }
    }
}
