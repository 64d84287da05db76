use anyhow::Result;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use fitmeal_core::catalog::{CatalogSource, MealLookup};
use fitmeal_core::error::Error;
use fitmeal_core::models::SyncReport;
use fitmeal_core::service::FitmealService;

use super::helpers::{not_found, print_json, require_session, strip_markup, truncate};

#[derive(Tabled)]
struct ItemCommentRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "By")]
    author: String,
    #[tabled(rename = "Comment")]
    content: String,
    #[tabled(rename = "Posted")]
    created_at: String,
}

fn print_item_comments(rows: &[ItemCommentRow]) {
    if rows.is_empty() {
        println!("\nNo comments yet.");
    } else {
        println!("\nComments ({}):", rows.len());
        let table = Table::new(rows).with(Style::rounded()).to_string();
        println!("{table}");
    }
}

pub(crate) fn cmd_sync(svc: &FitmealService, source: &dyn CatalogSource, json: bool) -> Result<()> {
    let report = svc.sync_catalog(source)?;

    if json {
        print_json(&report)?;
    } else {
        print_sync_report(&report);
    }
    Ok(())
}

fn print_sync_report(report: &SyncReport) {
    #[derive(Tabled)]
    struct SourceRow {
        #[tabled(rename = "Source")]
        source: &'static str,
        #[tabled(rename = "Fetched")]
        fetched: usize,
        #[tabled(rename = "Inserted")]
        inserted: usize,
    }

    let rows = [
        ("exercise categories", report.exercise_categories),
        ("meal categories", report.meal_categories),
        ("exercises", report.exercises),
    ]
    .map(|(source, r)| SourceRow {
        source,
        fetched: r.fetched,
        inserted: r.inserted,
    });

    let table = Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..3)).with(Alignment::right()))
        .to_string();
    println!("{table}");
    println!("{} new rows", report.total_inserted());
}

pub(crate) fn cmd_exercise_categories(svc: &FitmealService, json: bool) -> Result<()> {
    let categories = svc.list_exercise_categories()?;

    if json {
        print_json(&categories)?;
    } else if categories.is_empty() {
        eprintln!("No exercise categories stored. Run `fitmeal sync` first.");
    } else {
        #[derive(Tabled)]
        struct CategoryRow {
            #[tabled(rename = "ID")]
            id: i64,
            #[tabled(rename = "Name")]
            name: String,
        }

        let rows: Vec<CategoryRow> = categories
            .into_iter()
            .map(|c| CategoryRow {
                id: c.id,
                name: c.name,
            })
            .collect();
        let table = Table::new(&rows).with(Style::rounded()).to_string();
        println!("{table}");
    }
    Ok(())
}

pub(crate) fn cmd_exercise_list(svc: &FitmealService, category_id: i64, json: bool) -> Result<()> {
    let exercises = match svc.list_exercises(category_id) {
        Ok(e) => e,
        Err(Error::NotFound { .. }) => {
            not_found(&format!("No exercises in category {category_id}"), json)
        }
        Err(e) => return Err(e.into()),
    };

    if json {
        print_json(&exercises)?;
    } else {
        #[derive(Tabled)]
        struct ExerciseRow {
            #[tabled(rename = "ID")]
            id: i64,
            #[tabled(rename = "Name")]
            name: String,
            #[tabled(rename = "Description")]
            description: String,
        }

        let rows: Vec<ExerciseRow> = exercises
            .iter()
            .map(|e| ExerciseRow {
                id: e.id,
                name: truncate(&e.name, 35),
                description: e
                    .description
                    .as_deref()
                    .map(|d| truncate(&strip_markup(d), 60))
                    .unwrap_or_default(),
            })
            .collect();
        let table = Table::new(&rows).with(Style::rounded()).to_string();
        println!("{table}");
    }
    Ok(())
}

pub(crate) fn cmd_exercise_show(
    svc: &FitmealService,
    username: &str,
    exercise_id: i64,
    json: bool,
) -> Result<()> {
    let session = require_session(svc, username, json)?;
    let detail = match svc.exercise_detail(&session, exercise_id) {
        Ok(d) => d,
        Err(Error::NotFound { .. }) => not_found(&format!("No exercise '{exercise_id}'"), json),
        Err(e) => return Err(e.into()),
    };

    if json {
        return print_json(&detail);
    }

    let exercise = &detail.exercise;
    println!("{} (ID: {})", exercise.name, exercise.id);
    println!("  Category:  {}", exercise.category_id);
    println!("  Favorite:  {}", if detail.favorited { "yes" } else { "no" });
    if let Some(description) = exercise.description.as_deref() {
        println!("\n{}", strip_markup(description));
    }

    let rows: Vec<ItemCommentRow> = detail
        .comments
        .iter()
        .map(|c| ItemCommentRow {
            id: c.id,
            author: c.username.clone().unwrap_or_default(),
            content: truncate(&c.content, 50),
            created_at: c.created_at.clone(),
        })
        .collect();
    print_item_comments(&rows);
    Ok(())
}

pub(crate) fn cmd_meal_show(
    svc: &FitmealService,
    meals: &dyn MealLookup,
    username: &str,
    meal_id: i64,
    json: bool,
) -> Result<()> {
    let session = require_session(svc, username, json)?;
    let detail = match svc.meal_detail(&session, meals, meal_id) {
        Ok(d) => d,
        Err(Error::NotFound { .. }) => not_found(&format!("No meal '{meal_id}'"), json),
        Err(e) => return Err(e.into()),
    };

    if json {
        return print_json(&detail);
    }

    let meal = &detail.meal;
    println!("{} (ID: {})", meal.name, meal.id);
    println!("  Category:  {}", meal.category_name);
    println!("  Favorite:  {}", if detail.favorited { "yes" } else { "no" });

    let rows: Vec<ItemCommentRow> = detail
        .comments
        .iter()
        .map(|c| ItemCommentRow {
            id: c.id,
            author: c.username.clone().unwrap_or_default(),
            content: truncate(&c.content, 50),
            created_at: c.created_at.clone(),
        })
        .collect();
    print_item_comments(&rows);
    Ok(())
}

pub(crate) fn cmd_meal_categories(svc: &FitmealService, json: bool) -> Result<()> {
    let categories = svc.list_meal_categories()?;

    if json {
        print_json(&categories)?;
    } else if categories.is_empty() {
        eprintln!("No meal categories stored. Run `fitmeal sync` first.");
    } else {
        #[derive(Tabled)]
        struct MealCategoryRow {
            #[tabled(rename = "ID")]
            id: i64,
            #[tabled(rename = "Name")]
            name: String,
            #[tabled(rename = "Description")]
            description: String,
        }

        let rows: Vec<MealCategoryRow> = categories
            .iter()
            .map(|c| MealCategoryRow {
                id: c.id,
                name: c.name.clone(),
                description: truncate(&c.description, 60),
            })
            .collect();
        let table = Table::new(&rows).with(Style::rounded()).to_string();
        println!("{table}");
    }
    Ok(())
}
