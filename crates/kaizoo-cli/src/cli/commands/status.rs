//! Launch routing and device flags.

use anyhow::Result;
use kaizoo_core::flags::Route;
use serde::Serialize;

use crate::cli::app::App;

#[derive(Serialize)]
struct LaunchStatus {
    route: Route,
    authenticated: bool,
    onboarding_seen: bool,
    profile_ready: bool,
    api_url: String,
}

pub async fn status(app: &App) -> Result<()> {
    let authenticated = app.credentials.is_authenticated().await?;
    let status = LaunchStatus {
        route: app.flags.launch_route(authenticated).await?,
        authenticated,
        onboarding_seen: app.flags.onboarding_seen().await?,
        profile_ready: app.flags.profile_ready().await?,
        api_url: app.client.base_url().to_string(),
    };

    app.emit(&status, |s| {
        println!("route:           {}", s.route);
        println!("signed in:       {}", yes_no(s.authenticated));
        println!("onboarding seen: {}", yes_no(s.onboarding_seen));
        println!("profile ready:   {}", yes_no(s.profile_ready));
        println!("api:             {}", s.api_url);
    })
}

#[derive(Serialize)]
struct DeviceState {
    onboarding_seen: bool,
    profile_ready: bool,
}

async fn device_state(app: &App) -> Result<DeviceState> {
    Ok(DeviceState {
        onboarding_seen: app.flags.onboarding_seen().await?,
        profile_ready: app.flags.profile_ready().await?,
    })
}

pub async fn onboarding_done(app: &App) -> Result<()> {
    app.flags.mark_onboarding_seen().await?;
    let state = device_state(app).await?;
    app.emit(&state, |_| println!("Onboarding marked as seen."))
}

pub async fn onboarding_reset(app: &App) -> Result<()> {
    app.flags.reset().await?;
    let state = device_state(app).await?;
    app.emit(&state, |_| println!("Device flags cleared."))
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}
