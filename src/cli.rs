use anyhow::Context;
use clap::{Parser, Subcommand};
use crossterm::{
    cursor, execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{self, ClearType},
};
use serde::Serialize;
use std::io::{stdout, Write};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::config::AppConfig;
use crate::domain::{ConnectionState, NewPoll, OptionId, PollId};
use crate::error::{QuickPollError, Result};
use crate::service::PollService;
use crate::sync::{load_snapshot, ActionOutcome, LiveSession, PollStoreHandle, PollView};

/// Width of the vote bar in characters
const BAR_WIDTH: u64 = 20;

#[derive(Parser)]
#[command(name = "quickpoll")]
#[command(version)]
#[command(about = "Live poll client", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Config directory
    #[arg(short, long, default_value = "config")]
    pub config: String,

    /// Override the REST base URL
    #[arg(long, env = "QUICKPOLL_REST_URL")]
    pub rest_url: Option<String>,

    /// Override the live stream URL
    #[arg(long, env = "QUICKPOLL_WS_URL")]
    pub ws_url: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Follow polls live (default)
    Watch,
    /// Print the current poll list once
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Create a poll
    Create {
        /// Poll title
        #[arg(short, long)]
        title: String,
        /// Option text, repeat for each option
        #[arg(short = 'o', long = "option", required = true)]
        options: Vec<String>,
    },
    /// Vote once on a poll
    Vote {
        poll_id: PollId,
        option_id: OptionId,
    },
    /// Like a poll once
    Like { poll_id: PollId },
}

impl Cli {
    /// Load config from the chosen directory and apply URL overrides
    pub fn load_config(&self) -> Result<AppConfig> {
        let mut config = AppConfig::load_from(&self.config)?;
        if let Some(url) = &self.rest_url {
            config.server.rest_url = url.clone();
        }
        if let Some(url) = &self.ws_url {
            config.server.ws_url = url.clone();
        }
        config
            .validate()
            .map_err(|errors| QuickPollError::Validation(errors.join("; ")))?;
        Ok(config)
    }
}

/// A line typed in watch mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchCommand {
    Vote { poll_id: PollId, option_id: OptionId },
    Like { poll_id: PollId },
    Resync,
    Help,
    Quit,
}

const WATCH_HELP: &str = "vote <poll> <option> | like <poll> | resync | quit";

pub fn parse_command(line: &str) -> Result<WatchCommand> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let id = |raw: &str, what: &str| -> Result<i64> {
        raw.parse().map_err(|_| {
            QuickPollError::Validation(format!("{} must be a number, got '{}'", what, raw))
        })
    };

    match parts.as_slice() {
        ["vote", poll, option] => Ok(WatchCommand::Vote {
            poll_id: id(*poll, "poll id")?,
            option_id: id(*option, "option id")?,
        }),
        ["like", poll] => Ok(WatchCommand::Like {
            poll_id: id(*poll, "poll id")?,
        }),
        ["resync"] | ["r"] => Ok(WatchCommand::Resync),
        ["help"] | ["?"] => Ok(WatchCommand::Help),
        ["quit"] | ["q"] | ["exit"] => Ok(WatchCommand::Quit),
        _ => Err(QuickPollError::Validation(format!(
            "unknown command, try: {}",
            WATCH_HELP
        ))),
    }
}

/// Run a command against the store and describe the result for the status line
async fn execute_command(handle: &PollStoreHandle, cmd: WatchCommand) -> String {
    match cmd {
        WatchCommand::Vote { poll_id, option_id } => match handle.vote(poll_id, option_id).await {
            Ok(ActionOutcome::Recorded) => format!("Vote recorded on poll {}", poll_id),
            Ok(ActionOutcome::AlreadyRecorded) => format!("Already voted on poll {}", poll_id),
            Ok(ActionOutcome::InFlight) => format!("Vote on poll {} still pending", poll_id),
            Err(e) if e.is_rejected() => format!("Vote rejected: {}", e),
            Err(e) => format!("Vote failed, try again: {}", e),
        },
        WatchCommand::Like { poll_id } => match handle.like(poll_id).await {
            Ok(ActionOutcome::Recorded) => format!("Liked poll {}", poll_id),
            Ok(ActionOutcome::AlreadyRecorded) => format!("Already liked poll {}", poll_id),
            Ok(ActionOutcome::InFlight) => format!("Like on poll {} still pending", poll_id),
            Err(e) if e.is_rejected() => format!("Like rejected: {}", e),
            Err(e) => format!("Like failed, try again: {}", e),
        },
        WatchCommand::Resync => match handle.resync().await {
            Ok(count) => format!("Resynced {} polls", count),
            Err(e) => format!("Resync failed, showing cached polls: {}", e),
        },
        WatchCommand::Help => WATCH_HELP.to_string(),
        WatchCommand::Quit => String::new(),
    }
}

/// Live view: redraw on every published change, read commands from stdin
pub async fn run_watch(config: &AppConfig) -> Result<()> {
    let session = LiveSession::start(config)?;
    watch_session(session, BufReader::new(tokio::io::stdin()), &mut stdout()).await
}

/// Drive the live view until quit or error, then always tear the session down
async fn watch_session<R, W>(session: LiveSession, input: R, out: &mut W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let result = watch_loop(&session.handle(), input, out).await;
    let teardown = session.teardown().await;
    result.and(teardown)
}

async fn watch_loop<R, W>(handle: &PollStoreHandle, input: R, out: &mut W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut view_rx = handle.subscribe();
    let mut lines = input.lines();
    let (status_tx, mut status_rx) = mpsc::unbounded_channel::<String>();
    let mut status = format!("Commands: {}", WATCH_HELP);

    let initial = view_rx.borrow_and_update().clone();
    render_screen(out, &initial, &status)?;

    loop {
        tokio::select! {
            changed = view_rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            Some(msg) = status_rx.recv() => {
                status = msg;
            }
            line = lines.next_line() => {
                match line? {
                    None => break,
                    Some(line) if line.trim().is_empty() => {}
                    Some(line) => match parse_command(&line) {
                        Ok(WatchCommand::Quit) => break,
                        Ok(cmd) => {
                            // Requests run off the loop so live updates keep redrawing.
                            status = format!("Sending: {}", line.trim());
                            let handle = handle.clone();
                            let status_tx = status_tx.clone();
                            tokio::spawn(async move {
                                let _ = status_tx.send(execute_command(&handle, cmd).await);
                            });
                        }
                        Err(e) => status = e.to_string(),
                    },
                }
            }
        }

        let view = view_rx.borrow_and_update().clone();
        render_screen(out, &view, &status)?;
    }

    Ok(())
}

fn render_screen<W: Write>(out: &mut W, view: &PollView, status: &str) -> Result<()> {
    execute!(out, terminal::Clear(ClearType::All), cursor::MoveTo(0, 0))?;
    render_view(out, view)?;
    queue!(
        out,
        SetForegroundColor(Color::DarkGrey),
        Print(format!("  {}\n", status)),
        ResetColor,
        Print("> ")
    )?;
    out.flush()?;
    Ok(())
}

/// Draw the poll list with the live indicator and sync footer
pub fn render_view<W: Write>(out: &mut W, view: &PollView) -> Result<()> {
    let (indicator, color) = match view.connection {
        ConnectionState::Open => ("● LIVE", Color::Green),
        ConnectionState::Connecting => ("◌ CONNECTING", Color::Yellow),
        ConnectionState::Closed => ("○ OFFLINE", Color::Red),
    };

    queue!(
        out,
        SetForegroundColor(Color::Cyan),
        Print("QUICKPOLL  "),
        SetForegroundColor(color),
        Print(format!("{}\n", indicator)),
        ResetColor,
        Print("─".repeat(60)),
        Print("\n")
    )?;

    if view.polls.is_empty() {
        queue!(
            out,
            SetForegroundColor(Color::DarkGrey),
            Print("  No polls yet\n"),
            ResetColor
        )?;
    }

    for poll in &view.polls {
        let mut markers = Vec::new();
        if !view.ledger.can_vote(poll.id) {
            markers.push("voted");
        }
        if !view.ledger.can_like(poll.id) {
            markers.push("liked");
        }
        let markers = if markers.is_empty() {
            String::new()
        } else {
            format!(" [{}]", markers.join(", "))
        };

        queue!(
            out,
            SetForegroundColor(Color::Yellow),
            Print(format!("#{} ", poll.id)),
            ResetColor,
            Print(format!("{}  ♥ {}", poll.title, poll.likes)),
            SetForegroundColor(Color::Green),
            Print(format!("{}\n", markers)),
            ResetColor
        )?;

        for option in &poll.options {
            let pct = poll.vote_percentage(option.votes);
            let filled = (pct.min(100) * BAR_WIDTH / 100) as usize;
            queue!(
                out,
                Print(format!(
                    "   {:>3}. {:<24} {}{} {:>3}% ({})\n",
                    option.id,
                    option.option_text,
                    "█".repeat(filled),
                    "░".repeat((BAR_WIDTH as usize).saturating_sub(filled)),
                    pct,
                    option.votes
                ))
            )?;
        }
        queue!(
            out,
            SetForegroundColor(Color::DarkGrey),
            Print(format!("   {} votes total\n", poll.total_votes())),
            ResetColor
        )?;
    }

    let synced = view
        .last_synced_at
        .map(|ts| ts.with_timezone(&chrono::Local).format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "never".to_string());
    queue!(
        out,
        SetForegroundColor(Color::DarkGrey),
        Print("─".repeat(60)),
        Print(format!(
            "\n  synced {} │ connected {}x │ events {} applied, {} dropped\n",
            synced, view.connections_opened, view.events_applied, view.events_dropped
        )),
        ResetColor
    )?;
    if let Some(err) = &view.last_sync_error {
        queue!(
            out,
            SetForegroundColor(Color::Red),
            Print(format!("  last resync failed: {}\n", err)),
            ResetColor
        )?;
    }

    Ok(())
}

fn print_json<T: Serialize>(item: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(item).context("failed to encode output")?;
    println!("{}", json);
    Ok(())
}

/// Print the poll list once
pub async fn list_polls(service: &dyn PollService, json: bool) -> Result<()> {
    let polls = load_snapshot(service).await?;
    if json {
        print_json(&polls)?;
        return Ok(());
    }
    if polls.is_empty() {
        println!("No polls yet");
        return Ok(());
    }

    for poll in &polls {
        println!(
            "\x1b[33m#{}\x1b[0m {}  ({} likes, {} votes, created {})",
            poll.id,
            poll.title,
            poll.likes,
            poll.total_votes(),
            poll.created_at.format("%Y-%m-%d %H:%M")
        );
        for option in &poll.options {
            println!(
                "    {:>3}. {:<24} {:>5} ({}%)",
                option.id,
                option.option_text,
                option.votes,
                poll.vote_percentage(option.votes)
            );
        }
    }
    Ok(())
}

pub async fn create_poll(
    service: &dyn PollService,
    title: &str,
    options: &[String],
) -> Result<()> {
    let poll = NewPoll::new(title, options)?;
    service.create_poll(&poll).await?;
    println!(
        "\x1b[32m✓\x1b[0m Created '{}' with {} options",
        poll.title,
        poll.options.len()
    );
    Ok(())
}

pub async fn vote_once(
    service: &dyn PollService,
    poll_id: PollId,
    option_id: OptionId,
) -> Result<()> {
    service.vote(poll_id, option_id).await?;
    println!(
        "\x1b[32m✓\x1b[0m Voted for option {} on poll {}",
        option_id, poll_id
    );
    Ok(())
}

pub async fn like_once(service: &dyn PollService, poll_id: PollId) -> Result<()> {
    service.like(poll_id).await?;
    println!("\x1b[32m✓\x1b[0m Liked poll {}", poll_id);
    Ok(())
}
