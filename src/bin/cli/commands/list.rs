use anyhow::Result;

use crate::app::App;
use crate::render::terminal::{due_label, item_json, render_table};
use crate::OutputFormat;

/// List tracked words; `due_only` restricts to overdue ones
pub fn run(app: &App, due_only: bool, format: &OutputFormat, use_color: bool) -> Result<()> {
    let scheduler = &app.scheduler;
    let now = scheduler.now();
    let items = if due_only {
        scheduler.overdue_items()
    } else {
        scheduler.items().to_vec()
    };

    match format {
        OutputFormat::Json => {
            let output: Vec<serde_json::Value> = items
                .iter()
                .map(|item| item_json(item, scheduler.ladder(), now))
                .collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            if items.is_empty() {
                println!(
                    "No {}words in sheet \"{}\".",
                    if due_only { "due " } else { "" },
                    scheduler.sheet()
                );
                if let Some(next) = scheduler.next_due().filter(|_| due_only) {
                    println!("Next up: \"{}\" {}", next.key, due_label(&next, now, use_color));
                }
                return Ok(());
            }

            println!("{}", render_table(&items, scheduler.ladder(), now, use_color));
        }
    }

    Ok(())
}
