// Line-oriented front end.
//
// Reads commands from stdin, turns them into UserCommand messages for the
// app loop, and prints every UiUpdate it receives.

use std::fmt::Write as _;

use deckwise_core::{CatalogEntry, NormalizedItem, RarityFilter, SortKey};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

use crate::protocol::{AccountOverview, CollectionSnapshot, UiUpdate, UserCommand};

pub const HELP: &str = "\
commands:
  load <tag>        fetch an account (e.g. load #2PP)
  cards             show the collection with the current filter and sort
  deck              show the current deck
  catalog           show the card catalog (fetching it first if needed)
  rarity <name>     all | common | rare | epic | legendary | champion
  sort <key>        level_desc | level_asc | cost_asc | cost_desc
  chat <text>       ask the assistant about the loaded account
  reset             forget the account, catalog and conversation
  help              show this text
  quit              exit";

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// What a line of input asks for.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Command(UserCommand),
    Help,
    Empty,
}

/// Parse one line of input. Errors carry the text to show the user.
pub fn parse_line(line: &str) -> Result<Input, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Input::Empty);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let cmd = match word.to_ascii_lowercase().as_str() {
        "load" => {
            if rest.is_empty() {
                return Err("usage: load <tag>".into());
            }
            UserCommand::LoadAccount { tag: rest.into() }
        }
        "cards" => UserCommand::ShowCollection,
        "deck" => UserCommand::ShowDeck,
        "catalog" => UserCommand::ShowCatalog,
        "rarity" => match RarityFilter::parse(rest) {
            Some(filter) => UserCommand::SetRarityFilter(filter),
            None => return Err(format!("unknown rarity \"{rest}\"")),
        },
        "sort" => match SortKey::parse(rest) {
            Some(key) => UserCommand::SetSortKey(key),
            None => return Err(format!("unknown sort key \"{rest}\"")),
        },
        "chat" => UserCommand::SendChat { text: rest.into() },
        "reset" => UserCommand::Teardown,
        "quit" | "exit" => UserCommand::Quit,
        "help" | "?" => return Ok(Input::Help),
        other => return Err(format!("unknown command \"{other}\", try \"help\"")),
    };
    Ok(Input::Command(cmd))
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Render an update as the text to print.
pub fn render_update(update: &UiUpdate) -> String {
    match update {
        UiUpdate::AccountLoading { tag } => format!("Loading {tag}..."),
        UiUpdate::AccountLoaded(overview) => render_overview(overview),
        UiUpdate::AccountLoadFailed { message } => format!("! {message}"),
        UiUpdate::CatalogLoading => "Loading catalog...".into(),
        UiUpdate::CatalogLoaded { entries } => format!("Catalog ready ({entries} cards)"),
        UiUpdate::CatalogLoadFailed { message } => format!("! catalog: {message}"),
        UiUpdate::Catalog(entries) => render_catalog(entries),
        UiUpdate::CollectionChanged(snapshot) => render_collection(snapshot),
        UiUpdate::Deck(items) => render_items("Current deck", items),
        UiUpdate::ChatPending { token, text } => format!("[{token}] {text}"),
        UiUpdate::ChatReply { token, text } => format!("[{token}] {text}"),
        UiUpdate::ChatFailed { token, message } => format!("[{token}] ! {message}"),
        UiUpdate::Rejected { reason } => format!("! {reason}"),
        UiUpdate::SessionReset => "Session cleared".into(),
    }
}

fn render_overview(o: &AccountOverview) -> String {
    let mut out = format!("{} ({})", o.name, o.tag);
    if let Some(level) = o.leadership_level {
        let _ = write!(out, "  level {level}");
    }
    if let Some(trophies) = o.trophies {
        let _ = write!(out, "  trophies {trophies}");
    }
    if let Some(best) = o.best_trophies {
        let _ = write!(out, " (best {best})");
    }
    let _ = write!(out, "\n{}  {} cards", o.arena, o.card_count);
    out
}

fn render_collection(s: &CollectionSnapshot) -> String {
    if s.summary.total == 0 {
        return format!("No cards  [rarity: {}  sort: {}]", s.rarity, s.sort);
    }
    let mut out = render_items(
        &format!("Cards [rarity: {}  sort: {}]", s.rarity, s.sort),
        &s.items,
    );
    let labels: Vec<String> = s
        .summary
        .by_label
        .iter()
        .filter(|(_, n)| **n > 0)
        .map(|(label, n)| format!("{label} {n}"))
        .collect();
    let _ = write!(out, "\n{} total: {}", s.summary.total, labels.join(", "));
    if let Some(avg) = s.summary.average_level {
        let _ = write!(out, "  avg level {avg:.1}");
    }
    out
}

fn render_items(title: &str, items: &[NormalizedItem]) -> String {
    let mut out = format!("{title} ({})", items.len());
    for item in items {
        let cost = item
            .elixir_cost
            .map_or_else(|| "-".to_string(), |c| c.to_string());
        let rarity = item.rarity.as_deref().unwrap_or("?");
        let _ = write!(
            out,
            "\n  {:>2} {:<9} {:<28} {:>2}  {}",
            item.unified_level,
            item.label.as_str(),
            item.display_name(),
            cost,
            rarity
        );
    }
    out
}

fn render_catalog(entries: &[CatalogEntry]) -> String {
    let mut out = format!("Catalog ({})", entries.len());
    for entry in entries {
        let cost = entry
            .elixir_cost
            .map_or_else(|| "-".to_string(), |c| c.to_string());
        let _ = write!(
            out,
            "\n  {:<28} {:>2}  {}",
            entry.name,
            cost,
            entry.rarity.as_deref().unwrap_or("?")
        );
    }
    out
}

// ---------------------------------------------------------------------------
// Loop
// ---------------------------------------------------------------------------

/// Run the front end until the user quits or the app loop goes away.
pub async fn run(
    mut ui_rx: mpsc::Receiver<UiUpdate>,
    cmd_tx: mpsc::Sender<UserCommand>,
) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    print(&mut stdout, "deckwise: type \"help\" for commands").await?;

    loop {
        tokio::select! {
            update = ui_rx.recv() => {
                match update {
                    Some(update) => print(&mut stdout, &render_update(&update)).await?,
                    // App loop finished
                    None => break,
                }
            }

            line = lines.next_line() => {
                let Some(line) = line? else {
                    let _ = cmd_tx.send(UserCommand::Quit).await;
                    break;
                };
                match parse_line(&line) {
                    Ok(Input::Command(UserCommand::Quit)) => {
                        let _ = cmd_tx.send(UserCommand::Quit).await;
                        break;
                    }
                    Ok(Input::Command(cmd)) => {
                        if cmd_tx.send(cmd).await.is_err() {
                            break;
                        }
                    }
                    Ok(Input::Help) => print(&mut stdout, HELP).await?,
                    Ok(Input::Empty) => {}
                    Err(message) => print(&mut stdout, &format!("! {message}")).await?,
                }
            }
        }
    }

    Ok(())
}

async fn print(stdout: &mut tokio::io::Stdout, text: &str) -> anyhow::Result<()> {
    stdout.write_all(text.as_bytes()).await?;
    stdout.write_all(b"\n").await?;
    stdout.flush().await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
