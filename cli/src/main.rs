mod commands;
mod config;
mod logging;
mod upstream;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::process;

use crate::commands::{
    SettingsChanges, cmd_comment_exercise, cmd_comment_meal, cmd_delete_account,
    cmd_delete_exercise_comment, cmd_delete_meal_comment, cmd_exercise_categories,
    cmd_exercise_list, cmd_exercise_show, cmd_favorite_exercise, cmd_favorite_meal, cmd_login,
    cmd_meal_categories, cmd_meal_show, cmd_passwd, cmd_profile, cmd_register, cmd_settings,
    cmd_sync, cmd_unfavorite_exercise, cmd_unfavorite_meal, json_error,
};
use crate::config::{Config, SyncConfig};
use crate::upstream::UpstreamClient;
use fitmeal_core::catalog::CatalogSource;
use fitmeal_core::models::NewUser;
use fitmeal_core::service::FitmealService;

#[derive(Parser)]
#[command(
    name = "fitmeal",
    version,
    about = "Browse exercises and meals, keep favorites, and leave comments"
)]
struct Cli {
    /// Debug-level logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Skip the startup catalog sync and use stored reference data only
    #[arg(long, global = true)]
    offline: bool,
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pull new exercise and meal reference data from wger and TheMealDB
    Sync,
    /// Create an account (password from FITMEAL_PASSWORD or prompted)
    Register {
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        /// Profile picture URL (default: built-in avatar)
        #[arg(long)]
        avatar_url: Option<String>,
    },
    /// Check a username and password
    Login { username: String },
    /// Change your password (new one from FITMEAL_NEW_PASSWORD or prompted)
    Passwd { username: String },
    /// Edit your profile (current password from FITMEAL_PASSWORD or prompted)
    Settings {
        username: String,
        #[arg(long)]
        new_username: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        /// Profile picture URL (empty resets to the built-in avatar)
        #[arg(long)]
        avatar_url: Option<String>,
    },
    /// Show your favorites and comments
    Profile { username: String },
    /// Delete your account along with its favorites and comments
    DeleteAccount { username: String },
    /// Browse exercises
    Exercises {
        #[command(subcommand)]
        command: ExerciseCommands,
    },
    /// Browse meal categories
    Meals {
        #[command(subcommand)]
        command: MealCommands,
    },
    /// Add an exercise or meal to your favorites
    Favorite {
        #[command(subcommand)]
        item: ItemCommands,
    },
    /// Remove an exercise or meal from your favorites
    Unfavorite {
        #[command(subcommand)]
        item: ItemCommands,
    },
    /// Post or delete comments
    Comment {
        #[command(subcommand)]
        command: CommentCommands,
    },
}

#[derive(Subcommand)]
enum ExerciseCommands {
    /// List exercise categories
    Categories,
    /// List exercises in a category
    List {
        /// Category ID (see `exercises categories`)
        category: i64,
    },
    /// Show one exercise with its comments
    Show {
        id: i64,
        #[arg(short, long, env = "FITMEAL_USER")]
        user: String,
    },
}

#[derive(Subcommand)]
enum MealCommands {
    /// List meal categories
    Categories,
    /// Show one meal with its comments
    Show {
        id: i64,
        #[arg(short, long, env = "FITMEAL_USER")]
        user: String,
    },
}

#[derive(Subcommand)]
enum ItemCommands {
    /// An exercise, by wger ID
    Exercise {
        id: i64,
        #[arg(short, long, env = "FITMEAL_USER")]
        user: String,
    },
    /// A meal, by TheMealDB ID
    Meal {
        id: i64,
        #[arg(short, long, env = "FITMEAL_USER")]
        user: String,
    },
}

#[derive(Subcommand)]
enum CommentCommands {
    /// Comment on an exercise
    Exercise {
        id: i64,
        content: String,
        #[arg(short, long, env = "FITMEAL_USER")]
        user: String,
    },
    /// Comment on a meal
    Meal {
        id: i64,
        content: String,
        #[arg(short, long, env = "FITMEAL_USER")]
        user: String,
    },
    /// Delete one of your exercise comments
    DeleteExercise {
        comment_id: i64,
        #[arg(short, long, env = "FITMEAL_USER")]
        user: String,
    },
    /// Delete one of your meal comments
    DeleteMeal {
        comment_id: i64,
        #[arg(short, long, env = "FITMEAL_USER")]
        user: String,
    },
}

fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    logging::init(if cli.verbose { "debug" } else { "info" });

    let json = cli.json;
    if let Err(e) = run(cli) {
        if json {
            println!("{}", json_error(&format!("{e:#}")));
        } else {
            eprintln!("Error: {e:#}");
        }
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    // The upstream client blocks on this runtime, so `run` itself stays sync.
    let rt = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    let config = Config::load()?;
    let svc = FitmealService::new(&config.db_path, config.hashing)
        .with_context(|| format!("Failed to open database: {}", config.db_path.display()))?;
    let upstream = UpstreamClient::new(&config.upstream, rt.handle().clone())?;
    let json = cli.json;
    let offline = cli.offline;

    if !offline && !matches!(cli.command, Commands::Sync) {
        startup_sync(&svc, &upstream, config.sync)?;
    }

    match cli.command {
        Commands::Sync => {
            if offline {
                bail!("`sync` needs network access; drop --offline");
            }
            cmd_sync(&svc, &upstream, json)
        }
        Commands::Register {
            username,
            email,
            first_name,
            last_name,
            avatar_url,
        } => {
            let new_user = NewUser {
                username,
                email,
                first_name,
                last_name,
                avatar_url,
            };
            cmd_register(&svc, &new_user, json)
        }
        Commands::Login { username } => cmd_login(&svc, &username, json),
        Commands::Passwd { username } => cmd_passwd(&svc, &username, json),
        Commands::Settings {
            username,
            new_username,
            email,
            first_name,
            last_name,
            avatar_url,
        } => {
            let changes = SettingsChanges {
                username: new_username,
                email,
                first_name,
                last_name,
                avatar_url,
            };
            cmd_settings(&svc, &username, changes, json)
        }
        Commands::Profile { username } => cmd_profile(&svc, &username, json),
        Commands::DeleteAccount { username } => cmd_delete_account(&svc, &username, json),
        Commands::Exercises { command } => match command {
            ExerciseCommands::Categories => cmd_exercise_categories(&svc, json),
            ExerciseCommands::List { category } => cmd_exercise_list(&svc, category, json),
            ExerciseCommands::Show { id, user } => cmd_exercise_show(&svc, &user, id, json),
        },
        Commands::Meals { command } => match command {
            MealCommands::Categories => cmd_meal_categories(&svc, json),
            MealCommands::Show { id, user } => cmd_meal_show(&svc, &upstream, &user, id, json),
        },
        Commands::Favorite { item } => match item {
            ItemCommands::Exercise { id, user } => cmd_favorite_exercise(&svc, &user, id, json),
            ItemCommands::Meal { id, user } => cmd_favorite_meal(&svc, &upstream, &user, id, json),
        },
        Commands::Unfavorite { item } => match item {
            ItemCommands::Exercise { id, user } => cmd_unfavorite_exercise(&svc, &user, id, json),
            ItemCommands::Meal { id, user } => cmd_unfavorite_meal(&svc, &user, id, json),
        },
        Commands::Comment { command } => match command {
            CommentCommands::Exercise { id, content, user } => {
                cmd_comment_exercise(&svc, &user, id, &content, json)
            }
            CommentCommands::Meal { id, content, user } => {
                cmd_comment_meal(&svc, &upstream, &user, id, &content, json)
            }
            CommentCommands::DeleteExercise { comment_id, user } => {
                cmd_delete_exercise_comment(&svc, &user, comment_id, json)
            }
            CommentCommands::DeleteMeal { comment_id, user } => {
                cmd_delete_meal_comment(&svc, &user, comment_id, json)
            }
        },
    }
}

/// Populate reference tables before handling a command. Unless the config
/// marks the sync as required, a failure is logged and the command runs
/// against whatever is already stored.
fn startup_sync(svc: &FitmealService, source: &dyn CatalogSource, sync: SyncConfig) -> Result<()> {
    if !sync.on_startup {
        return Ok(());
    }
    match svc.sync_catalog(source) {
        Ok(report) => {
            tracing::debug!(inserted = report.total_inserted(), "startup sync complete");
            Ok(())
        }
        Err(e) if !sync.required => {
            tracing::warn!(error = %e, "startup sync failed, continuing with stored reference data");
            Ok(())
        }
        Err(e) => Err(e).context("Startup sync failed"),
    }
}
