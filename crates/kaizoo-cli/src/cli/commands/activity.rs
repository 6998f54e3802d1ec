//! Activity command handlers.

use anyhow::Result;
use kaizoo_core::services::{Activity, ActivityKind, NewActivity};

use super::format_timestamp;
use crate::cli::app::App;

pub async fn log(
    app: &App,
    kind: ActivityKind,
    minutes: u32,
    km: Option<f64>,
    note: Option<String>,
) -> Result<()> {
    let activity = NewActivity {
        kind,
        duration_minutes: minutes,
        distance_km: km,
        note,
    };
    let logged = app.activities().log(&activity).await?;
    app.emit(&logged, |a| {
        println!("Logged {} ({} min), +{} xp", a.kind, a.duration_minutes, a.xp_awarded);
    })
}

pub async fn list(app: &App) -> Result<()> {
    let activities = app.activities().list().await?;
    app.emit(&activities, |list| {
        if list.is_empty() {
            println!("No activities logged yet.");
        }
        for a in list {
            println!("{}", describe(a));
        }
    })
}

fn describe(a: &Activity) -> String {
    let mut line = format!(
        "{}  {:<8} {:>4} min",
        format_timestamp(a.logged_at),
        a.kind.as_str(),
        a.duration_minutes
    );
    if let Some(km) = a.distance_km {
        line.push_str(&format!("  {km:.1} km"));
    }
    if let Some(note) = &a.note {
        line.push_str("  ");
        line.push_str(note);
    }
    line
}
