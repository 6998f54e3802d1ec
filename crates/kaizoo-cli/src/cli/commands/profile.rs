//! Profile command handlers.

use anyhow::Result;
use kaizoo_core::services::{Profile, ProfileUpdate};

use crate::cli::app::App;

pub async fn show(app: &App) -> Result<()> {
    let profile = app.profiles().get().await?;
    app.emit(&profile, print_profile)
}

pub async fn set(app: &App, update: &ProfileUpdate) -> Result<()> {
    let profile = app.profiles().update(update).await?;
    app.emit(&profile, |p| {
        println!("Profile saved.");
        print_profile(p);
    })
}

fn print_profile(p: &Profile) {
    println!("email:   {}", p.email);
    if let Some(name) = &p.display_name {
        println!("name:    {name}");
    }
    if let Some(height) = p.height_cm {
        println!("height:  {height} cm");
    }
    if let Some(weight) = p.weight_kg {
        println!("weight:  {weight} kg");
    }
    if let Some(goal) = &p.goal {
        println!("goal:    {goal}");
    }
    println!("level:   {} ({} xp)", p.level, p.xp);
    println!("streak:  {} days", p.streak_days);
}
