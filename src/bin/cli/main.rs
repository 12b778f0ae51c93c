mod app;
mod commands;
mod render;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "parla-cli", about = "Vocabulary recall from the terminal", version)]
struct Cli {
    /// Use a specific content sheet for this run (default: from settings)
    #[arg(long, global = true)]
    sheet: Option<String>,

    /// Output format
    #[arg(long, global = true, default_value = "plain")]
    format: OutputFormat,

    /// Disable ANSI colors
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Plain,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Start recalling a word
    Focus {
        word: String,
    },

    /// Confirm you remembered a word, moving it to the next stop
    Recalled {
        word: String,
    },

    /// Stop recalling a word
    Remove {
        word: String,
    },

    /// Stop recalling every word in the sheet
    Clear,

    /// Attach a note to a word
    Note {
        word: String,
        /// Note text (use "-" to read from stdin)
        text: String,
    },

    /// Show the recall state of a word
    Status {
        word: String,
    },

    /// List words being recalled
    List,

    /// List words that are due
    Due,

    /// Show the stop ladder
    Ladder,

    /// Content sheets
    #[command(subcommand)]
    Sheet(SheetCommand),

    /// Keep running and print whenever a word becomes due
    Watch,
}

#[derive(Subcommand)]
enum SheetCommand {
    /// List sheets with recall progress
    List,

    /// Select the sheet used by default
    Use {
        name: String,
    },
}

/// Resolve "-" as stdin
fn resolve_text(text: String) -> String {
    if text == "-" {
        let mut buf = String::new();
        std::io::Read::read_to_string(&mut std::io::stdin(), &mut buf).ok();
        buf.trim_end().to_string()
    } else {
        text
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let use_color = !cli.no_color && atty_check();
    let mut app = app::App::new(cli.sheet.as_deref())?;

    match cli.command {
        None | Some(Command::List) => {
            commands::list::run(&app, false, &cli.format, use_color)?;
        }
        Some(Command::Due) => {
            commands::list::run(&app, true, &cli.format, use_color)?;
        }
        Some(Command::Focus { word }) => {
            commands::recall::run_focus(&app, &word, &cli.format, use_color)?;
        }
        Some(Command::Recalled { word }) => {
            commands::recall::run_recalled(&app, &word, &cli.format, use_color)?;
        }
        Some(Command::Remove { word }) => {
            commands::recall::run_remove(&app, &word, &cli.format)?;
        }
        Some(Command::Clear) => {
            commands::recall::run_clear(&app, &cli.format)?;
        }
        Some(Command::Note { word, text }) => {
            let text = resolve_text(text);
            commands::recall::run_note(&app, &word, &text, &cli.format)?;
        }
        Some(Command::Status { word }) => {
            commands::recall::run_status(&app, &word, &cli.format, use_color)?;
        }
        Some(Command::Ladder) => {
            commands::sheet::run_ladder(&app, &cli.format)?;
        }
        Some(Command::Sheet(subcmd)) => match subcmd {
            SheetCommand::List => {
                commands::sheet::run_list(&app, &cli.format, use_color)?;
            }
            SheetCommand::Use { name } => {
                commands::sheet::run_use(&mut app, &name, &cli.format).await?;
            }
        },
        Some(Command::Watch) => {
            commands::watch::run(&app, use_color).await?;
        }
    }

    // Writes are queued in the background; make sure they land before exit
    app.scheduler.flush().await;

    Ok(())
}

/// Check if stdout is a terminal (for color support)
fn atty_check() -> bool {
    unsafe { libc_isatty(1) != 0 }
}

extern "C" {
    #[link_name = "isatty"]
    fn libc_isatty(fd: i32) -> i32;
}
