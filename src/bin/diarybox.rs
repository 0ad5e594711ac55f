//! Diarybox CLI - password-protected personal diary
//!
//! Thin presentation layer over [`diarybox::EntryStore`]. The password is
//! read once per invocation and never stored.

use clap::{Args, Parser, Subcommand};
use std::fs;
use std::io;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;
use zeroize::Zeroizing;

use diarybox::config::Config;
use diarybox::passphrase::{PassphraseReader, ReaderPassphraseReader, TerminalPassphraseReader};
use diarybox::{DiaryError, Entry, EntryFilter, EntryStore, ErrorCategory, ErrorKind, Listing, Result};

#[derive(Parser)]
#[command(name = "diarybox")]
#[command(version)]
#[command(about = "Password-protected personal diary.", long_about = None)]
struct Cli {
    /// Path to a diarybox.toml configuration file
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Path to the diary database (overrides the configuration file)
    #[arg(long, global = true, value_name = "FILE")]
    db: Option<PathBuf>,

    /// Read password from stdin instead of from terminal
    #[arg(long, global = true)]
    passphrase_stdin: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct ContentArgs {
    /// Entry text
    #[arg(short, long)]
    content: Option<String>,

    /// Read the entry text from a file
    #[arg(long, value_name = "FILE")]
    content_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the diary database if it does not exist yet
    Init,

    /// Add a new entry
    #[command(alias = "a")]
    Add {
        /// Entry date (YYYY-MM-DD), defaults to today
        #[arg(short, long)]
        date: Option<String>,

        /// Entry title
        #[arg(short, long)]
        title: String,

        #[command(flatten)]
        content: ContentArgs,
    },

    /// List all entries, newest first
    #[command(alias = "ls")]
    List {
        /// Print entries as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a single entry
    Show {
        /// Entry id
        id: i64,
    },

    /// Find entries by keyword and/or date range
    Search {
        /// Case-insensitive text to look for in titles, contents and dates
        #[arg(short, long)]
        keyword: Option<String>,

        /// Earliest date to include (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// Latest date to include (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,

        /// Print entries as JSON
        #[arg(long)]
        json: bool,
    },

    /// Replace date, title and content of an entry, while validating
    /// that the password is not accidentally changed.
    #[command(alias = "u")]
    Update {
        /// Entry id
        id: i64,

        /// Entry date (YYYY-MM-DD)
        #[arg(short, long)]
        date: String,

        /// Entry title
        #[arg(short, long)]
        title: String,

        #[command(flatten)]
        content: ContentArgs,
    },

    /// Permanently delete an entry
    #[command(alias = "rm")]
    Delete {
        /// Entry id
        id: i64,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e.chain_message());
        process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("diarybox={}", level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load_or_default(cli.config.as_deref())?;
    if let Some(db) = cli.db {
        config.db_path = db;
    }

    let store = EntryStore::new(&config.db_path);
    store.try_initialize()?;

    let mut reader = get_passphrase_reader(cli.passphrase_stdin, &config.app_name);

    match cli.command {
        Commands::Init => {
            println!("Diary ready at {}", store.db_path().display());
        }
        Commands::Add {
            date,
            title,
            content,
        } => {
            let date = date.unwrap_or_else(today);
            let content = content.read()?;
            let password = reader.read_passphrase()?;
            let id = store.try_add(&date, &title, &content, &password)?;
            println!("Added entry {}", id);
        }
        Commands::List { json } => {
            let password = reader.read_passphrase()?;
            let listing = store.try_get_all(&password)?;
            print_listing(&listing, json)?;
        }
        Commands::Show { id } => {
            let password = reader.read_passphrase()?;
            let entry = store.try_get(id, &password)?;
            print_entry(&entry, true);
        }
        Commands::Search {
            keyword,
            from,
            to,
            json,
        } => {
            let filter = EntryFilter {
                keyword,
                date_from: from,
                date_to: to,
            };
            let password = reader.read_passphrase()?;
            let listing = store.try_search(&filter, &password)?;
            print_listing(&listing, json)?;
        }
        Commands::Update {
            id,
            date,
            title,
            content,
        } => {
            let content = content.read()?;
            let password = reader.read_passphrase()?;
            // Re-encrypting under a mistyped password would hide the entry
            // from every later listing, so the old content must open first.
            store
                .try_get(id, &password)
                .map_err(|e| e.with_context("refusing to update"))?;
            store.try_update(id, &date, &title, &content, &password)?;
            println!("Updated entry {}", id);
        }
        Commands::Delete { id } => {
            store.try_delete(id)?;
            println!("Deleted entry {}", id);
        }
    }

    Ok(())
}

impl ContentArgs {
    fn read(self) -> Result<Zeroizing<String>> {
        match (self.content, self.content_file) {
            (Some(content), _) => Ok(Zeroizing::new(content)),
            (None, Some(path)) => fs::read_to_string(&path).map(Zeroizing::new).map_err(|e| {
                DiaryError::with_kind_and_source(
                    ErrorCategory::User,
                    ErrorKind::Io,
                    format!("failed to read from {}", path.display()),
                    e,
                )
            }),
            (None, None) => Err(DiaryError::with_kind(
                ErrorCategory::User,
                ErrorKind::InvalidEntry,
                "either --content or --content-file is required",
            )),
        }
    }
}

fn get_passphrase_reader(use_stdin: bool, app_name: &str) -> Box<dyn PassphraseReader> {
    if use_stdin {
        Box::new(ReaderPassphraseReader::new(Box::new(io::stdin())))
    } else {
        Box::new(TerminalPassphraseReader::new(app_name))
    }
}

fn today() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}

fn print_listing(listing: &Listing, json: bool) -> Result<()> {
    if json {
        let rendered = serde_json::to_string_pretty(&listing.entries).map_err(|e| {
            DiaryError::with_source(ErrorCategory::Internal, "failed to render JSON", e)
        })?;
        println!("{}", rendered);
    } else {
        for entry in &listing.entries {
            print_entry(entry, false);
        }
    }

    if listing.undecryptable > 0 {
        if listing.entries.is_empty() {
            eprintln!(
                "warning: none of the {} stored entries could be decrypted; is the password correct?",
                listing.undecryptable
            );
        } else {
            eprintln!(
                "warning: {} entries could not be decrypted and were skipped",
                listing.undecryptable
            );
        }
    }
    Ok(())
}

fn print_entry(entry: &Entry, with_created_at: bool) {
    println!("[{}] {}  {}", entry.id, entry.date, entry.title);
    if with_created_at {
        println!("created {}", entry.created_at.format("%Y-%m-%d %H:%M:%S"));
    }
    for line in entry.content.lines() {
        println!("    {}", line);
    }
    println!();
}
