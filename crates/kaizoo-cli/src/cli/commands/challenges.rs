//! Challenge command handlers.

use anyhow::Result;

use crate::cli::app::App;

pub async fn list(app: &App) -> Result<()> {
    let challenges = app.challenges().list().await?;
    app.emit(&challenges, |list| {
        if list.is_empty() {
            println!("No challenges right now.");
        }
        for c in list {
            let marker = if c.joined { "*" } else { " " };
            println!(
                "{marker} {}  {}  {}/{} ({}%)",
                c.id,
                c.title,
                c.progress,
                c.goal,
                c.completion_percent()
            );
        }
    })
}

pub async fn join(app: &App, id: &str) -> Result<()> {
    let challenge = app.challenges().join(id).await?;
    app.emit(&challenge, |c| println!("Joined {}", c.title))
}
