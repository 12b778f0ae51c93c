use anyhow::{Context, Result};

use parla_lib::recall::format_countdown;

use crate::app::App;
use crate::render::terminal::{due_label, item_json, paint, progress, Color};
use crate::OutputFormat;

pub fn run_focus(app: &App, word: &str, format: &OutputFormat, use_color: bool) -> Result<()> {
    let scheduler = &app.scheduler;
    let inserted = scheduler.focus_on_word(word);
    let item = scheduler
        .get(word)
        .context(format!("'{}' vanished after focusing", word))?;
    let now = scheduler.now();

    match format {
        OutputFormat::Json => {
            let mut output = item_json(&item, scheduler.ladder(), now);
            output["inserted"] = serde_json::Value::Bool(inserted);
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            if inserted {
                println!("Now recalling {}", paint(word, Color::BOLD, use_color));
            } else {
                println!("Already recalling {}", paint(word, Color::BOLD, use_color));
            }
            println!("  Next check: {}", due_label(&item, now, use_color));
        }
    }

    Ok(())
}

pub fn run_recalled(app: &App, word: &str, format: &OutputFormat, use_color: bool) -> Result<()> {
    let scheduler = &app.scheduler;
    let item = scheduler.recalled_ok(word)?;
    let now = scheduler.now();

    match format {
        OutputFormat::Json => {
            let output = item_json(&item, scheduler.ladder(), now);
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            println!(
                "Recalled {} (stop {})",
                paint(word, Color::BOLD, use_color),
                progress(&item, scheduler.ladder())
            );
            println!(
                "  Next check in {}",
                format_countdown(item.time_until_due(now))
            );
        }
    }

    Ok(())
}

pub fn run_remove(app: &App, word: &str, format: &OutputFormat) -> Result<()> {
    let was_recalling = app.scheduler.am_i_recalling(word);
    app.scheduler.remove(word);

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({ "key": word, "removed": was_recalling });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            if was_recalling {
                println!("Stopped recalling \"{}\"", word);
            } else {
                println!("\"{}\" was not being recalled", word);
            }
        }
    }

    Ok(())
}

pub fn run_clear(app: &App, format: &OutputFormat) -> Result<()> {
    let count = app.scheduler.items().len();
    app.scheduler.remove_all();

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({ "sheet": app.scheduler.sheet(), "removed": count });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            println!("Removed {} words from sheet \"{}\"", count, app.scheduler.sheet());
        }
    }

    Ok(())
}

pub fn run_note(app: &App, word: &str, text: &str, format: &OutputFormat) -> Result<()> {
    app.scheduler.set_additional_text(word, text)?;

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({ "key": word, "additionalText": text });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            println!("Note saved for \"{}\"", word);
        }
    }

    Ok(())
}

pub fn run_status(app: &App, word: &str, format: &OutputFormat, use_color: bool) -> Result<()> {
    let scheduler = &app.scheduler;
    let now = scheduler.now();
    let item = scheduler.get(word);

    match format {
        OutputFormat::Json => {
            let output = match &item {
                Some(item) => {
                    let mut value = item_json(item, scheduler.ladder(), now);
                    value["recalling"] = serde_json::Value::Bool(true);
                    value
                }
                None => serde_json::json!({ "key": word, "recalling": false }),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => match item {
            Some(item) => {
                println!("{}", paint(word, Color::BOLD, use_color));
                println!("  Stop:  {}", progress(&item, scheduler.ladder()));
                println!("  Due:   {}", due_label(&item, now, use_color));
                if !item.additional_text.is_empty() {
                    println!("  Note:  {}", item.additional_text);
                }
            }
            None => println!("\"{}\" is not being recalled", word),
        },
    }

    Ok(())
}
