use anyhow::Result;

use parla_lib::recall::format_countdown;

use crate::app::App;
use crate::render::terminal::{paint, Color};
use crate::OutputFormat;

/// Select the sheet used by later runs
pub async fn run_use(app: &mut App, sheet: &str, format: &OutputFormat) -> Result<()> {
    app.scheduler.select_sheet(sheet).await;
    app.use_sheet(sheet)?;
    let count = app.scheduler.items().len();

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({ "sheet": sheet, "words": count });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            println!("Using sheet \"{}\" ({} words)", sheet, count);
        }
    }

    Ok(())
}

pub fn run_list(app: &App, format: &OutputFormat, use_color: bool) -> Result<()> {
    let sheets = app.list_sheets()?;
    let current = app.scheduler.sheet();

    match format {
        OutputFormat::Json => {
            let output: Vec<serde_json::Value> = sheets
                .iter()
                .map(|s| serde_json::json!({ "name": s, "isCurrent": *s == current }))
                .collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            if sheets.is_empty() {
                println!("No sheets with recall progress yet.");
            }
            for sheet in &sheets {
                if *sheet == current {
                    println!("* {}", paint(sheet, Color::BOLD, use_color));
                } else {
                    println!("  {}", sheet);
                }
            }
        }
    }

    Ok(())
}

/// Show the configured stop ladder with intervals measured from now
pub fn run_ladder(app: &App, format: &OutputFormat) -> Result<()> {
    let ladder = app.scheduler.ladder();
    let now = app.scheduler.now();

    match format {
        OutputFormat::Json => {
            let output: Vec<serde_json::Value> = ladder
                .timings()
                .iter()
                .enumerate()
                .map(|(i, timing)| {
                    serde_json::json!({
                        "stop": i + 1,
                        "timing": timing,
                        "millis": ladder.duration_at(i + 1, now).num_milliseconds(),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            for (i, timing) in ladder.timings().iter().enumerate() {
                println!(
                    "{:>2}. {:<6} {}",
                    i + 1,
                    timing,
                    format_countdown(ladder.duration_at(i + 1, now))
                );
            }
        }
    }

    Ok(())
}
