use anyhow::{Result, bail};
use tabled::{Table, Tabled, settings::Style};

use fitmeal_core::error::Error;
use fitmeal_core::models::{NewUser, UserUpdate};
use fitmeal_core::service::FitmealService;

use super::helpers::{
    NEW_PASSWORD_ENV, PASSWORD_ENV, check_login, json_error, print_json, read_secret,
    require_login, require_session, truncate,
};

/// Profile fields given on the command line; anything left out keeps its
/// stored value.
#[derive(Debug, Default)]
pub(crate) struct SettingsChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar_url: Option<String>,
}

pub(crate) fn cmd_register(svc: &FitmealService, new_user: &NewUser, json: bool) -> Result<()> {
    let password = read_secret(PASSWORD_ENV, "Password")?;
    let user = svc.register(new_user, Some(&password))?;

    if json {
        print_json(&user)?;
    } else {
        println!("Registered {user} (ID: {})", user.id);
    }
    Ok(())
}

pub(crate) fn cmd_login(svc: &FitmealService, username: &str, json: bool) -> Result<()> {
    let user = require_login(svc, username, json)?;

    if json {
        print_json(&user)?;
    } else {
        println!("Welcome back, {}!", user.first_name);
    }
    Ok(())
}

pub(crate) fn cmd_passwd(svc: &FitmealService, username: &str, json: bool) -> Result<()> {
    let current = read_secret(PASSWORD_ENV, "Current password")?;
    let session = check_login(svc, username, &current, json)?.session();
    let new_password = read_secret(NEW_PASSWORD_ENV, "New password")?;

    if !svc.change_password(session.user_id, &current, &new_password)? {
        bail!("Current password is incorrect");
    }

    if json {
        println!("{}", serde_json::json!({ "changed": true }));
    } else {
        println!("Password changed for {}", session.username);
    }
    Ok(())
}

pub(crate) fn cmd_settings(
    svc: &FitmealService,
    username: &str,
    changes: SettingsChanges,
    json: bool,
) -> Result<()> {
    let password = read_secret(PASSWORD_ENV, "Current password")?;
    let current = check_login(svc, username, &password, json)?;
    let session = current.session();
    let update = UserUpdate {
        username: changes.username.unwrap_or(current.username),
        email: changes.email.unwrap_or(current.email),
        first_name: changes.first_name.unwrap_or(current.first_name),
        last_name: changes.last_name.unwrap_or(current.last_name),
        avatar_url: changes.avatar_url.or(Some(current.avatar_url)),
    };

    let user = match svc.update_settings(&session, &password, &update) {
        Ok(Some(user)) => user,
        Ok(None) => {
            if json {
                println!("{}", json_error("Incorrect password"));
            } else {
                eprintln!("Incorrect password");
            }
            std::process::exit(2);
        }
        Err(Error::IntegrityViolation(_)) => {
            bail!("Username or email already taken, or a field is too long")
        }
        Err(e) => return Err(e.into()),
    };

    if json {
        print_json(&user)?;
    } else {
        println!("Updated {user}");
    }
    Ok(())
}

pub(crate) fn cmd_profile(svc: &FitmealService, username: &str, json: bool) -> Result<()> {
    #[derive(Tabled)]
    struct FavoriteRow {
        #[tabled(rename = "Kind")]
        kind: &'static str,
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Name")]
        name: String,
    }

    #[derive(Tabled)]
    struct CommentRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "On")]
        target: String,
        #[tabled(rename = "Comment")]
        content: String,
        #[tabled(rename = "Posted")]
        created_at: String,
    }

    let session = require_session(svc, username, json)?;
    let overview = svc.user_overview(&session)?;

    if json {
        return print_json(&overview);
    }

    let user = &overview.user;
    println!("{user}");
    println!("  Avatar:  {}", user.avatar_url);
    println!("  Joined:  {}", user.created_at);

    let favorites: Vec<FavoriteRow> = overview
        .favorite_exercises
        .iter()
        .map(|f| FavoriteRow {
            kind: "exercise",
            id: f.exercise_id,
            name: f.exercise_name.clone().unwrap_or_default(),
        })
        .chain(overview.favorite_meals.iter().map(|f| FavoriteRow {
            kind: "meal",
            id: f.meal_id,
            name: f.meal_name.clone(),
        }))
        .collect();

    if favorites.is_empty() {
        println!("\nNo favorites yet.");
    } else {
        println!("\nFavorites:");
        let table = Table::new(&favorites).with(Style::rounded()).to_string();
        println!("{table}");
    }

    let comments: Vec<CommentRow> = overview
        .exercise_comments
        .iter()
        .map(|c| CommentRow {
            id: c.id,
            target: format!("exercise {}", c.exercise_id),
            content: truncate(&c.content, 40),
            created_at: c.created_at.clone(),
        })
        .chain(overview.meal_comments.iter().map(|c| CommentRow {
            id: c.id,
            target: truncate(&c.meal_name, 25),
            content: truncate(&c.content, 40),
            created_at: c.created_at.clone(),
        }))
        .collect();

    if !comments.is_empty() {
        println!("\nComments:");
        let table = Table::new(&comments).with(Style::rounded()).to_string();
        println!("{table}");
    }

    Ok(())
}

pub(crate) fn cmd_delete_account(svc: &FitmealService, username: &str, json: bool) -> Result<()> {
    let session = require_session(svc, username, json)?;
    svc.delete_user(&session)?;

    if json {
        println!("{}", serde_json::json!({ "deleted": session.username }));
    } else {
        println!("Deleted account {} and everything attached to it", session.username);
    }
    Ok(())
}
