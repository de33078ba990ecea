//! Line-driven search field driver.
//!
//! Usage:
//!   searchfield --config field.toml
//!   searchfield --catalog data/catalog.json complete ro
//!   searchfield --catalog data/catalog.json import "near {{Q1|Place|Rome}}"
//!
//! The interactive mode reads one command per line from stdin:
//!   type <text>     type characters one key at a time
//!   paste <text>    insert text as one edit
//!   key <name>      enter, mod-enter, tab, esc, up, down, left, right, home,
//!                   end, backspace, delete, pageup, pagedown, ctrl-space,
//!                   undo, redo
//!   pick <n>        accept popup candidate n, numbered as printed
//!   remove <n>      activate the remove affordance of region n (1-based)
//!   cursor <pos>    place the caret
//!   search          submit the query
//!   show            print the field

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use searchfield::{
    create_search_field, create_search_field_with_text, load_config, logging, KeyEvent,
    QueryEncoding, SearchField, SearchFieldConfig,
};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "searchfield")]
#[command(about = "Entity-token query field driven from the terminal")]
struct Args {
    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Catalog JSON (overrides the config)
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Search payload encoding: markers or labels (overrides the config)
    #[arg(long)]
    encoding: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interactive line commands on stdin (default)
    Interactive {
        /// Initial text; literal markers become tokens
        #[arg(long, default_value = "")]
        text: String,
    },
    /// Print completion candidates for a fragment
    Complete {
        fragment: String,
        /// Treat as Ctrl-Space (an empty fragment lists everything)
        #[arg(long)]
        explicit: bool,
    },
    /// Import text with literal markers and print its tokens and payload
    Import { text: String },
    /// Print the effective configuration as TOML
    Config,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = load_config(args.config.as_deref())?;
    if let Some(catalog) = args.catalog {
        config.catalog = Some(catalog);
    }
    if let Some(encoding) = args.encoding.as_deref() {
        config.base.query_encoding = parse_encoding(encoding)?;
    }
    logging::init(&config.log_filter);

    match args.command.unwrap_or(Command::Interactive { text: String::new() }) {
        Command::Interactive { text } => {
            let mut field = create_search_field_with_text(config, &text)?;
            interactive(&mut field)
        }
        Command::Complete { fragment, explicit } => complete(config, &fragment, explicit),
        Command::Import { text } => {
            let mut field = create_search_field_with_text(config, &text)?;
            print_view(&field);
            println!("payload: {}", field.search());
            Ok(())
        }
        Command::Config => {
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
    }
}

fn parse_encoding(name: &str) -> Result<QueryEncoding> {
    match name {
        "markers" => Ok(QueryEncoding::Markers),
        "labels" => Ok(QueryEncoding::Labels),
        _ => bail!("unsupported encoding: {name}. Use 'markers' or 'labels'"),
    }
}

fn complete(config: SearchFieldConfig, fragment: &str, explicit: bool) -> Result<()> {
    let mut field = create_search_field(config)?;
    field.paste(fragment);
    let count = field.complete(explicit);
    if count == 0 {
        println!("  (no candidates)");
    }
    for (i, candidate) in field.completions().iter().enumerate() {
        println!("  {}. {}", i + 1, candidate.label());
    }
    Ok(())
}

fn interactive(field: &mut SearchField) -> Result<()> {
    field.on_search(|query| println!("search: {query}"));
    field.on_update(|state| {
        tracing::debug!(can_undo = state.can_undo, can_redo = state.can_redo, "history changed");
    });

    print_view(field);
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line.context("reading stdin")?;
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }
        if let Err(e) = run_command(field, line) {
            eprintln!("error: {e:#}");
            continue;
        }
        print_view(field);
        io::stdout().flush()?;
    }
    Ok(())
}

fn run_command(field: &mut SearchField, line: &str) -> Result<()> {
    let (command, arg) = line.split_once(' ').unwrap_or((line, ""));
    match command {
        "type" => {
            for ch in arg.chars() {
                field.process_key(KeyEvent::Char(ch));
            }
        }
        "paste" => field.paste(arg),
        "key" => {
            field.process_key(parse_key(arg)?);
        }
        "pick" => {
            let n: usize = arg.trim().parse().context("pick expects a number")?;
            if n == 0 || !field.accept_completion(n - 1) {
                bail!("no candidate {n}");
            }
        }
        "remove" => {
            let n: usize = arg.trim().parse().context("remove expects a number")?;
            let Some(region) = n.checked_sub(1).and_then(|i| field.view().regions.get(i)) else {
                bail!("no region {n}");
            };
            let remove = region.remove;
            field.activate_remove(&remove);
        }
        "cursor" => {
            let pos: usize = arg.trim().parse().context("cursor expects a position")?;
            field.set_cursor(pos);
        }
        "search" => {
            field.search();
        }
        "show" => {}
        _ => bail!("unknown command: {command}"),
    }
    Ok(())
}

fn parse_key(name: &str) -> Result<KeyEvent> {
    let key = match name.trim() {
        "enter" => KeyEvent::Enter,
        "mod-enter" => KeyEvent::ModEnter,
        "tab" => KeyEvent::Tab,
        "esc" | "escape" => KeyEvent::Escape,
        "up" => KeyEvent::Up,
        "down" => KeyEvent::Down,
        "left" => KeyEvent::Left,
        "right" => KeyEvent::Right,
        "home" => KeyEvent::Home,
        "end" => KeyEvent::End,
        "backspace" => KeyEvent::Backspace,
        "delete" => KeyEvent::Delete,
        "pageup" => KeyEvent::PageUp,
        "pagedown" => KeyEvent::PageDown,
        "ctrl-space" => KeyEvent::Ctrl(' '),
        "undo" => KeyEvent::Ctrl('z'),
        "redo" => KeyEvent::Ctrl('y'),
        other => bail!("unknown key: {other}"),
    };
    Ok(key)
}

/// Printed number of the first row on the popup's current page. Rows are
/// numbered across pages so `pick` takes the number as shown.
fn first_row(field: &SearchField) -> usize {
    let popup = field.session().popup();
    popup.current_page() * popup.page_size() + 1
}

fn print_view(field: &SearchField) {
    let view = field.view();
    let mut text = String::with_capacity(view.text.len() + 2);
    for (i, ch) in view.text.chars().enumerate() {
        if i == view.cursor {
            text.push('|');
        }
        text.push(ch);
    }
    if view.cursor >= view.text.chars().count() {
        text.push('|');
    }
    println!("text: {text:?}");

    for (i, region) in view.regions.iter().enumerate() {
        println!(
            "  [{}] {} {} ({} {}) {}",
            i + 1,
            region.span,
            region.label,
            region.kind,
            region.entity_id,
            region.icon
        );
    }

    if view.has_completions() {
        let first = first_row(field);
        for (i, row) in view.completions.iter().enumerate() {
            let mark = if row.selected { '>' } else { ' ' };
            let kind = row.kind.as_deref().unwrap_or("keyword");
            println!("  {mark} {}. {} ({kind})", first + i, row.label);
        }
        if !view.auxiliary_text.is_empty() {
            println!("    page {}", view.auxiliary_text);
        }
    }

    let undo = if view.can_undo { "undo" } else { "-" };
    let redo = if view.can_redo { "redo" } else { "-" };
    println!("  [{undo} {redo}]");
}
