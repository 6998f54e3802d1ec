//! Session command handlers.

use anyhow::{Result, bail};
use serde::Serialize;

use crate::cli::app::App;

#[derive(Serialize)]
struct SessionState {
    authenticated: bool,
}

pub async fn login(app: &App, email: &str, password: &str) -> Result<()> {
    let user = app.auth().login(email, password).await?;
    app.emit(&user, |u| println!("Signed in as {}", u.email))
}

pub async fn register(app: &App, email: &str, password: &str, name: Option<&str>) -> Result<()> {
    let user = app.auth().register(email, password, name).await?;
    app.emit(&user, |u| println!("Account created for {}", u.email))
}

pub async fn logout(app: &App) -> Result<()> {
    app.auth().logout().await?;
    let state = SessionState {
        authenticated: app.credentials.is_authenticated().await?,
    };
    app.emit(&state, |_| println!("Signed out."))
}

pub async fn whoami(app: &App) -> Result<()> {
    if !app.credentials.is_authenticated().await? {
        bail!("Not signed in. Run `kaizoo login`.");
    }
    let profile = app.profiles().get().await?;
    app.emit(&profile, |p| match &p.display_name {
        Some(name) => println!("{name} <{}>", p.email),
        None => println!("{}", p.email),
    })
}
