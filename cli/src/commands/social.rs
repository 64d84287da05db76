use anyhow::{Result, bail};

use fitmeal_core::catalog::MealLookup;
use fitmeal_core::error::Error;
use fitmeal_core::service::FitmealService;

use super::helpers::{not_found, print_json, require_session};

pub(crate) fn cmd_favorite_exercise(
    svc: &FitmealService,
    username: &str,
    exercise_id: i64,
    json: bool,
) -> Result<()> {
    let session = require_session(svc, username, json)?;
    let fav = match svc.favorite_exercise(&session, exercise_id) {
        Ok(f) => f,
        Err(Error::IntegrityViolation(_)) => {
            bail!("Exercise {exercise_id} is unknown or already a favorite")
        }
        Err(e) => return Err(e.into()),
    };

    if json {
        print_json(&fav)?;
    } else {
        println!("Added exercise {exercise_id} to favorites");
    }
    Ok(())
}

pub(crate) fn cmd_favorite_meal(
    svc: &FitmealService,
    meals: &dyn MealLookup,
    username: &str,
    meal_id: i64,
    json: bool,
) -> Result<()> {
    let session = require_session(svc, username, json)?;
    let fav = match svc.favorite_meal(&session, meals, meal_id) {
        Ok(f) => f,
        Err(Error::NotFound { entity, key }) => not_found(&format!("No {entity} '{key}'"), json),
        Err(Error::IntegrityViolation(_)) => bail!("Meal {meal_id} is already a favorite"),
        Err(e) => return Err(e.into()),
    };

    if json {
        print_json(&fav)?;
    } else {
        println!("Added {} to favorites", fav.meal_name);
    }
    Ok(())
}

pub(crate) fn cmd_unfavorite_exercise(
    svc: &FitmealService,
    username: &str,
    exercise_id: i64,
    json: bool,
) -> Result<()> {
    let session = require_session(svc, username, json)?;
    if !svc.unfavorite_exercise(&session, exercise_id)? {
        not_found(&format!("Exercise {exercise_id} is not a favorite"), json);
    }

    if json {
        println!("{}", serde_json::json!({ "removed": exercise_id }));
    } else {
        println!("Removed exercise {exercise_id} from favorites");
    }
    Ok(())
}

pub(crate) fn cmd_unfavorite_meal(
    svc: &FitmealService,
    username: &str,
    meal_id: i64,
    json: bool,
) -> Result<()> {
    let session = require_session(svc, username, json)?;
    if !svc.unfavorite_meal(&session, meal_id)? {
        not_found(&format!("Meal {meal_id} is not a favorite"), json);
    }

    if json {
        println!("{}", serde_json::json!({ "removed": meal_id }));
    } else {
        println!("Removed meal {meal_id} from favorites");
    }
    Ok(())
}

pub(crate) fn cmd_comment_exercise(
    svc: &FitmealService,
    username: &str,
    exercise_id: i64,
    content: &str,
    json: bool,
) -> Result<()> {
    let session = require_session(svc, username, json)?;
    let comment = match svc.comment_on_exercise(&session, exercise_id, content) {
        Ok(c) => c,
        Err(Error::IntegrityViolation(_)) => {
            not_found(&format!("No exercise '{exercise_id}'"), json)
        }
        Err(e) => return Err(e.into()),
    };

    if json {
        print_json(&comment)?;
    } else {
        println!("Posted comment {} on exercise {exercise_id}", comment.id);
    }
    Ok(())
}

pub(crate) fn cmd_comment_meal(
    svc: &FitmealService,
    meals: &dyn MealLookup,
    username: &str,
    meal_id: i64,
    content: &str,
    json: bool,
) -> Result<()> {
    let session = require_session(svc, username, json)?;
    let comment = match svc.comment_on_meal(&session, meals, meal_id, content) {
        Ok(c) => c,
        Err(Error::NotFound { entity, key }) => not_found(&format!("No {entity} '{key}'"), json),
        Err(e) => return Err(e.into()),
    };

    if json {
        print_json(&comment)?;
    } else {
        println!("Posted comment {} on {}", comment.id, comment.meal_name);
    }
    Ok(())
}

pub(crate) fn cmd_delete_exercise_comment(
    svc: &FitmealService,
    username: &str,
    comment_id: i64,
    json: bool,
) -> Result<()> {
    let session = require_session(svc, username, json)?;
    match svc.delete_exercise_comment(&session, comment_id) {
        Ok(()) => {}
        Err(Error::NotFound { .. }) => {
            not_found(&format!("Exercise comment {comment_id} not found"), json)
        }
        Err(e) => return Err(e.into()),
    }

    if json {
        println!("{}", serde_json::json!({ "deleted": comment_id }));
    } else {
        println!("Deleted exercise comment {comment_id}");
    }
    Ok(())
}

pub(crate) fn cmd_delete_meal_comment(
    svc: &FitmealService,
    username: &str,
    comment_id: i64,
    json: bool,
) -> Result<()> {
    let session = require_session(svc, username, json)?;
    match svc.delete_meal_comment(&session, comment_id) {
        Ok(()) => {}
        Err(Error::NotFound { .. }) => {
            not_found(&format!("Meal comment {comment_id} not found"), json)
        }
        Err(e) => return Err(e.into()),
    }

    if json {
        println!("{}", serde_json::json!({ "deleted": comment_id }));
    } else {
        println!("Deleted meal comment {comment_id}");
    }
    Ok(())
}
