use anyhow::Result;

use parla_lib::recall::{spawn_refresh_loop, RecallState};

use crate::app::App;
use crate::render::terminal::{paint, render_table, Color};

/// Print the table whenever a word becomes due, until Ctrl-C
pub async fn run(app: &App, use_color: bool) -> Result<()> {
    let scheduler = &app.scheduler;
    let mut updates = scheduler.subscribe();
    let refresher = spawn_refresh_loop(scheduler, app.settings.refresh_interval());

    // Pick up items that were already overdue when loaded
    scheduler.refresh_states();
    print_snapshot(app, use_color);

    loop {
        tokio::select! {
            snapshot = updates.recv() => {
                let Some(snapshot) = snapshot else { break };
                let due = snapshot
                    .iter()
                    .filter(|i| i.recall_state == RecallState::Overdue)
                    .count();
                log::debug!("Snapshot with {} items, {} due", snapshot.len(), due);
                print_snapshot(app, use_color);
            }
            _ = tokio::signal::ctrl_c() => {
                break;
            }
        }
    }

    refresher.abort();
    Ok(())
}

fn print_snapshot(app: &App, use_color: bool) {
    let scheduler = &app.scheduler;
    let items = scheduler.items();
    let now = scheduler.now();

    println!();
    println!(
        "{} {}",
        paint(&format!("[{}]", scheduler.sheet()), Color::CYAN, use_color),
        now.with_timezone(&chrono::Local).format("%H:%M:%S")
    );
    if items.is_empty() {
        println!("No words being recalled.");
    } else {
        println!("{}", render_table(&items, scheduler.ladder(), now, use_color));
    }
}
