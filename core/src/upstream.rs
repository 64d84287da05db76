//! Wire formats of the upstream reference-data APIs (wger for exercises,
//! TheMealDB for meals) and their conversion into store rows.

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::models::{Exercise, ExerciseCategory, MealCategory, RemoteMeal};

/// wger list envelope (`/exercisecategory/`, `/exercise`).
#[derive(Debug, Deserialize)]
pub struct WgerPage<T> {
    pub results: Vec<T>,
}

#[derive(Debug, Deserialize)]
pub struct WgerCategory {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct WgerExercise {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub category: i64,
}

#[derive(Debug, Deserialize)]
pub struct MealDbCategoriesResponse {
    pub categories: Vec<MealDbCategory>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealDbCategory {
    pub id_category: String,
    pub str_category: String,
    pub str_category_description: String,
    pub str_category_thumb: String,
}

#[derive(Debug, Deserialize)]
pub struct MealDbLookupResponse {
    pub meals: Option<Vec<MealDbMeal>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealDbMeal {
    pub id_meal: String,
    pub str_meal: String,
    pub str_category: Option<String>,
}

#[must_use]
pub fn category_to_row(c: WgerCategory) -> ExerciseCategory {
    ExerciseCategory {
        id: c.id,
        name: c.name,
    }
}

#[must_use]
pub fn exercise_to_row(e: WgerExercise) -> Exercise {
    Exercise {
        id: e.id,
        name: e.name,
        description: e.description.filter(|d| !d.trim().is_empty()),
        category_id: e.category,
    }
}

/// TheMealDB sends numeric ids as strings; anything non-numeric means the
/// response is not what we expect.
pub fn meal_category_to_row(c: MealDbCategory, endpoint: &str) -> Result<MealCategory> {
    let id = parse_mealdb_id(&c.id_category, endpoint)?;
    Ok(MealCategory {
        id,
        name: c.str_category,
        description: c.str_category_description,
        image_url: c.str_category_thumb,
    })
}

/// First meal of a lookup response, or `None` when the id is unknown upstream.
pub fn lookup_to_meal(resp: MealDbLookupResponse, endpoint: &str) -> Result<Option<RemoteMeal>> {
    let Some(meal) = resp.meals.and_then(|m| m.into_iter().next()) else {
        return Ok(None);
    };
    let id = parse_mealdb_id(&meal.id_meal, endpoint)?;
    Ok(Some(RemoteMeal {
        id,
        name: meal.str_meal,
        category_name: meal.str_category.unwrap_or_default(),
    }))
}

fn parse_mealdb_id(raw: &str, endpoint: &str) -> Result<i64> {
    raw.trim()
        .parse()
        .map_err(|_| Error::upstream(endpoint, format!("non-numeric id '{raw}'")))
}
