use std::time::Duration;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;

use crate::config::UpstreamConfig;
use fitmeal_core::catalog::{CatalogSource, MealLookup};
use fitmeal_core::error::Error;
use fitmeal_core::models::{Exercise, ExerciseCategory, MealCategory, RemoteMeal};
use fitmeal_core::upstream::{
    MealDbCategoriesResponse, MealDbLookupResponse, WgerCategory, WgerExercise, WgerPage,
    category_to_row, exercise_to_row, lookup_to_meal, meal_category_to_row,
};

/// wger's English listing; one page is large enough for the whole catalog.
const WGER_LANGUAGE: &str = "2";
const WGER_PAGE_LIMIT: &str = "250";

/// HTTP client for wger and TheMealDB.
///
/// The async methods are used directly where a runtime is available; the
/// `CatalogSource` / `MealLookup` impls block on the stored runtime handle
/// and must be called from outside async code.
pub struct UpstreamClient {
    client: reqwest::Client,
    rt: tokio::runtime::Handle,
    wger_url: String,
    mealdb_url: String,
}

impl UpstreamClient {
    pub fn new(config: &UpstreamConfig, rt: tokio::runtime::Handle) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(format!(
                "fitmeal/{} (exercise and meal browser)",
                env!("CARGO_PKG_VERSION")
            ))
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            rt,
            wger_url: config.wger_url.trim_end_matches('/').to_string(),
            mealdb_url: config.mealdb_url.trim_end_matches('/').to_string(),
        })
    }

    /// GET `url` and decode the body. Transport errors, non-2xx statuses and
    /// undecodable bodies all come back as `UpstreamUnavailable`.
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> fitmeal_core::Result<T> {
        tracing::debug!(url, "fetching upstream");
        let resp = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| Error::upstream(url, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::upstream(url, format!("HTTP {status}")));
        }

        resp.json::<T>()
            .await
            .map_err(|e| Error::upstream(url, format!("malformed response: {e}")))
    }

    pub async fn exercise_categories_async(&self) -> fitmeal_core::Result<Vec<ExerciseCategory>> {
        let url = format!("{}/exercisecategory/", self.wger_url);
        let page: WgerPage<WgerCategory> = self.get_json(&url, &[]).await?;
        Ok(page.results.into_iter().map(category_to_row).collect())
    }

    pub async fn exercises_async(&self) -> fitmeal_core::Result<Vec<Exercise>> {
        let url = format!("{}/exercise", self.wger_url);
        let page: WgerPage<WgerExercise> = self
            .get_json(
                &url,
                &[("language", WGER_LANGUAGE), ("limit", WGER_PAGE_LIMIT)],
            )
            .await?;
        Ok(page.results.into_iter().map(exercise_to_row).collect())
    }

    pub async fn meal_categories_async(&self) -> fitmeal_core::Result<Vec<MealCategory>> {
        let url = format!("{}/categories.php", self.mealdb_url);
        let data: MealDbCategoriesResponse = self.get_json(&url, &[]).await?;
        data.categories
            .into_iter()
            .map(|c| meal_category_to_row(c, &url))
            .collect()
    }

    pub async fn lookup_meal_async(&self, meal_id: i64) -> fitmeal_core::Result<Option<RemoteMeal>> {
        let url = format!("{}/lookup.php", self.mealdb_url);
        let id = meal_id.to_string();
        let data: MealDbLookupResponse = self.get_json(&url, &[("i", id.as_str())]).await?;
        lookup_to_meal(data, &url)
    }
}

impl CatalogSource for UpstreamClient {
    fn exercise_categories(&self) -> fitmeal_core::Result<Vec<ExerciseCategory>> {
        self.rt.block_on(self.exercise_categories_async())
    }

    fn exercises(&self) -> fitmeal_core::Result<Vec<Exercise>> {
        self.rt.block_on(self.exercises_async())
    }

    fn meal_categories(&self) -> fitmeal_core::Result<Vec<MealCategory>> {
        self.rt.block_on(self.meal_categories_async())
    }
}

impl MealLookup for UpstreamClient {
    fn lookup_meal(&self, meal_id: i64) -> fitmeal_core::Result<Option<RemoteMeal>> {
        self.rt.block_on(self.lookup_meal_async(meal_id))
    }
}

#[cfg(test)]
pub(crate) mod fixture_server {
    use std::collections::HashMap;

    use axum::{
        Json, Router,
        extract::Query,
        http::StatusCode,
        response::IntoResponse,
        routing::get,
    };
    use serde_json::json;

    /// A stand-in for wger and TheMealDB on one local port.
    pub fn router() -> Router {
        Router::new()
            .route(
                "/wger/exercisecategory/",
                get(|| async {
                    Json(json!({
                        "count": 2, "next": null, "previous": null,
                        "results": [{"id": 10, "name": "Chest"}, {"id": 11, "name": "Triceps"}]
                    }))
                }),
            )
            .route(
                "/wger/exercise",
                get(|Query(q): Query<HashMap<String, String>>| async move {
                    if q.get("language").map(String::as_str) != Some("2")
                        || q.get("limit").map(String::as_str) != Some("250")
                    {
                        return StatusCode::BAD_REQUEST.into_response();
                    }
                    Json(json!({
                        "results": [
                            {"id": 192, "name": "Bench Press", "description": "<p>Press</p>", "category": 10},
                            {"id": 307, "name": "Dips", "description": "", "category": 11}
                        ]
                    }))
                    .into_response()
                }),
            )
            .route(
                "/mealdb/categories.php",
                get(|| async {
                    Json(json!({
                        "categories": [
                            {"idCategory": "1", "strCategory": "Beef",
                             "strCategoryThumb": "https://www.themealdb.com/images/category/beef.png",
                             "strCategoryDescription": "Beef is the culinary name for meat from cattle."},
                            {"idCategory": "3", "strCategory": "Dessert",
                             "strCategoryThumb": "https://www.themealdb.com/images/category/dessert.png",
                             "strCategoryDescription": "Dessert is a course that concludes a meal."}
                        ]
                    }))
                }),
            )
            .route(
                "/mealdb/lookup.php",
                get(|Query(q): Query<HashMap<String, String>>| async move {
                    if q.get("i").map(String::as_str) == Some("52772") {
                        Json(json!({"meals": [{
                            "idMeal": "52772",
                            "strMeal": "Beef Wellington",
                            "strCategory": "Beef"
                        }]}))
                    } else {
                        Json(json!({"meals": null}))
                    }
                }),
            )
            .route(
                "/broken/exercisecategory/",
                get(|| async { StatusCode::SERVICE_UNAVAILABLE }),
            )
            .route("/garbled/categories.php", get(|| async { "<html>oops</html>" }))
    }

    /// Start the fixture server on a fresh runtime. Keep the runtime alive for
    /// as long as the server is needed.
    pub fn start() -> (tokio::runtime::Runtime, String) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let listener = rt
            .block_on(tokio::net::TcpListener::bind("127.0.0.1:0"))
            .unwrap();
        let addr = listener.local_addr().unwrap();
        rt.spawn(async move {
            axum::serve(listener, router()).await.unwrap();
        });
        (rt, format!("http://{addr}"))
    }
}
