//! CLI entry and dispatch.

use anyhow::{Context, Result};
use clap::Parser;
use kaizoo_core::config::Config;
use kaizoo_core::logging;
use kaizoo_core::services::{ActivityKind, ProfileUpdate};

mod app;
mod commands;

use app::App;

#[derive(Parser)]
#[command(name = "kaizoo")]
#[command(version)]
#[command(about = "Kaizoo fitness client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Sign in with email and password
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "KAIZOO_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account and sign in
    Register {
        #[arg(long)]
        email: String,
        #[arg(long, env = "KAIZOO_PASSWORD", hide_env_values = true)]
        password: String,
        /// Display name
        #[arg(long)]
        name: Option<String>,
    },
    /// Sign out and forget the stored tokens
    Logout,
    /// Show the signed-in account
    Whoami,
    /// Show where the app would land on launch
    Status,

    /// Onboarding state on this device
    Onboarding {
        #[command(subcommand)]
        command: OnboardingCommands,
    },
    /// View or edit your profile
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },
    /// Community feed
    Feed {
        #[command(subcommand)]
        command: FeedCommands,
    },
    /// Log and list activities
    Activity {
        #[command(subcommand)]
        command: ActivityCommands,
    },
    /// Browse and join challenges
    Challenges {
        #[command(subcommand)]
        command: ChallengeCommands,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum OnboardingCommands {
    /// Mark onboarding as seen
    Done,
    /// Clear the onboarding and profile-ready flags
    Reset,
}

#[derive(clap::Subcommand)]
enum ProfileCommands {
    /// Show your profile
    Show,
    /// Update profile fields
    Set {
        #[arg(long = "name")]
        display_name: Option<String>,
        #[arg(long)]
        avatar_url: Option<String>,
        #[arg(long)]
        height_cm: Option<u16>,
        #[arg(long)]
        weight_kg: Option<f32>,
        #[arg(long)]
        goal: Option<String>,
    },
}

#[derive(clap::Subcommand)]
enum FeedCommands {
    /// List recent posts
    List {
        /// Include the latest comments under each post
        #[arg(long)]
        comments: bool,
    },
    /// Publish a post
    Post {
        #[arg(value_name = "TEXT")]
        text: String,
    },
    /// Like a post
    Like {
        #[arg(value_name = "POST_ID")]
        id: String,
    },
    /// Remove your like from a post
    Unlike {
        #[arg(value_name = "POST_ID")]
        id: String,
    },
    /// Comment on a post
    Comment {
        #[arg(value_name = "POST_ID")]
        id: String,
        #[arg(value_name = "TEXT")]
        text: String,
    },
    /// Show the comments on a post
    Comments {
        #[arg(value_name = "POST_ID")]
        id: String,
    },
}

#[derive(clap::Subcommand)]
enum ActivityCommands {
    /// Log an activity
    Log {
        /// run, walk, cycle, swim, strength, yoga or other
        #[arg(long)]
        kind: ActivityKind,
        #[arg(long)]
        minutes: u32,
        #[arg(long)]
        km: Option<f64>,
        #[arg(long)]
        note: Option<String>,
    },
    /// List logged activities
    List,
}

#[derive(clap::Subcommand)]
enum ChallengeCommands {
    /// List challenges
    List,
    /// Join a challenge
    Join {
        #[arg(value_name = "CHALLENGE_ID")]
        id: String,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
    /// Generate a fresh config from Rust defaults (for xtask)
    Generate,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    // Config commands must work even with a broken config file.
    if let Commands::Config { command } = &cli.command {
        return config_command(command);
    }

    let config = Config::load().context("load config")?;
    let _log_guard = logging::init(&config.log).context("init logging")?;

    // one single-threaded runtime for everything
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("create tokio runtime")?;

    rt.block_on(async move { dispatch(cli, config).await })
}

fn config_command(command: &ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Path => {
            commands::config::path();
            Ok(())
        }
        ConfigCommands::Init => commands::config::init(),
        ConfigCommands::Generate => commands::config::generate(),
    }
}

async fn dispatch(cli: Cli, config: Config) -> Result<()> {
    let app = App::open(config, cli.json)?;

    match cli.command {
        Commands::Login { email, password } => commands::auth::login(&app, &email, &password).await,
        Commands::Register {
            email,
            password,
            name,
        } => commands::auth::register(&app, &email, &password, name.as_deref()).await,
        Commands::Logout => commands::auth::logout(&app).await,
        Commands::Whoami => commands::auth::whoami(&app).await,
        Commands::Status => commands::status::status(&app).await,

        Commands::Onboarding { command } => match command {
            OnboardingCommands::Done => commands::status::onboarding_done(&app).await,
            OnboardingCommands::Reset => commands::status::onboarding_reset(&app).await,
        },

        Commands::Profile { command } => match command {
            ProfileCommands::Show => commands::profile::show(&app).await,
            ProfileCommands::Set {
                display_name,
                avatar_url,
                height_cm,
                weight_kg,
                goal,
            } => {
                let update = ProfileUpdate {
                    display_name,
                    avatar_url,
                    height_cm,
                    weight_kg,
                    goal,
                };
                commands::profile::set(&app, &update).await
            }
        },

        Commands::Feed { command } => match command {
            FeedCommands::List { comments } => commands::feed::list(&app, comments).await,
            FeedCommands::Post { text } => commands::feed::post(&app, &text).await,
            FeedCommands::Like { id } => commands::feed::set_liked(&app, &id, true).await,
            FeedCommands::Unlike { id } => commands::feed::set_liked(&app, &id, false).await,
            FeedCommands::Comment { id, text } => commands::feed::comment(&app, &id, &text).await,
            FeedCommands::Comments { id } => commands::feed::comments(&app, &id).await,
        },

        Commands::Activity { command } => match command {
            ActivityCommands::Log {
                kind,
                minutes,
                km,
                note,
            } => commands::activity::log(&app, kind, minutes, km, note).await,
            ActivityCommands::List => commands::activity::list(&app).await,
        },

        Commands::Challenges { command } => match command {
            ChallengeCommands::List => commands::challenges::list(&app).await,
            ChallengeCommands::Join { id } => commands::challenges::join(&app, &id).await,
        },

        Commands::Config { command } => config_command(&command),
    }
}
