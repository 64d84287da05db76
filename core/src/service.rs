use std::path::Path;

use crate::catalog::{self, CatalogSource, MealLookup};
use crate::credentials;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{
    Exercise, ExerciseCategory, ExerciseComment, ExerciseDetail, MealCategory, MealComment,
    MealDetail, MealSnapshot, NewUser, Session, SyncReport, User, UserExercise, UserMeal,
    UserOverview, UserUpdate, validate_comment,
};
use crate::password::{CredentialHasher, HashParams};

pub struct FitmealService {
    db: Database,
    hasher: CredentialHasher,
}

impl FitmealService {
    pub fn new(db_path: &Path, params: HashParams) -> Result<Self> {
        let db = Database::open(db_path)?;
        Ok(Self {
            db,
            hasher: CredentialHasher::new(params)?,
        })
    }

    pub fn new_in_memory(params: HashParams) -> Result<Self> {
        let db = Database::open_in_memory()?;
        Ok(Self {
            db,
            hasher: CredentialHasher::new(params)?,
        })
    }

    #[must_use]
    pub fn db(&self) -> &Database {
        &self.db
    }

    // --- Credentials ---

    pub fn register(&self, new_user: &NewUser, raw_password: Option<&str>) -> Result<User> {
        credentials::register(&self.db, &self.hasher, new_user, raw_password)
    }

    pub fn authenticate(&self, username: &str, raw_password: &str) -> Result<Option<User>> {
        credentials::authenticate(&self.db, &self.hasher, username, raw_password)
    }

    pub fn change_password(&self, user_id: i64, current: &str, new_password: &str) -> Result<bool> {
        credentials::change_password(&self.db, &self.hasher, user_id, current, new_password)
    }

    /// Edit the session user's profile. The current password is checked
    /// first; `Ok(None)` means it did not match.
    pub fn update_settings(
        &self,
        session: &Session,
        password: &str,
        update: &UserUpdate,
    ) -> Result<Option<User>> {
        credentials::update_profile(&self.db, &self.hasher, session.user_id, password, update)
    }

    // --- Catalog ---

    pub fn sync_catalog(&self, source: &dyn CatalogSource) -> Result<SyncReport> {
        catalog::sync_catalog(&self.db, source)
    }

    pub fn list_exercise_categories(&self) -> Result<Vec<ExerciseCategory>> {
        self.db.list_exercise_categories()
    }

    /// Exercises in one category. An unknown or empty category is reported as
    /// not found.
    pub fn list_exercises(&self, category_id: i64) -> Result<Vec<Exercise>> {
        let exercises = self.db.list_exercises_in_category(category_id)?;
        if exercises.is_empty() {
            return Err(Error::not_found("exercise category", category_id));
        }
        Ok(exercises)
    }

    pub fn list_meal_categories(&self) -> Result<Vec<MealCategory>> {
        self.db.list_meal_categories()
    }

    /// One exercise with every comment posted on it and whether the session
    /// user has it as a favorite.
    pub fn exercise_detail(&self, session: &Session, exercise_id: i64) -> Result<ExerciseDetail> {
        let exercise = self.db.get_exercise(exercise_id)?;
        let comments = self.db.list_exercise_comments(exercise_id)?;
        Ok(ExerciseDetail {
            favorited: self.db.is_favorite_exercise(session.user_id, exercise_id)?,
            comment_count: comments.len(),
            comments,
            exercise,
        })
    }

    /// One meal, looked up upstream, with its local comments and favorite flag.
    pub fn meal_detail(
        &self,
        session: &Session,
        lookup: &dyn MealLookup,
        meal_id: i64,
    ) -> Result<MealDetail> {
        let meal = lookup
            .lookup_meal(meal_id)?
            .ok_or_else(|| Error::not_found("meal", meal_id))?;
        let comments = self.db.list_meal_comments(meal_id)?;
        Ok(MealDetail {
            favorited: self.db.is_favorite_meal(session.user_id, meal_id)?,
            comment_count: comments.len(),
            comments,
            meal,
        })
    }

    // --- Profile ---

    pub fn user_overview(&self, session: &Session) -> Result<UserOverview> {
        let user = self.db.get_user_by_id(session.user_id)?;
        Ok(UserOverview {
            favorite_exercises: self.db.list_user_exercises(user.id)?,
            favorite_meals: self.db.list_user_meals(user.id)?,
            exercise_comments: self.db.list_exercise_comments_for_user(user.id)?,
            meal_comments: self.db.list_meal_comments_for_user(user.id)?,
            user,
        })
    }

    /// Remove the session user; favorites and comments go with it.
    pub fn delete_user(&self, session: &Session) -> Result<()> {
        if !self.db.delete_user(session.user_id)? {
            return Err(Error::not_found("user", &session.username));
        }
        tracing::info!(user_id = session.user_id, "deleted user");
        Ok(())
    }

    // --- Favorites ---

    pub fn favorite_exercise(&self, session: &Session, exercise_id: i64) -> Result<UserExercise> {
        self.db.insert_user_exercise(session.user_id, exercise_id)
    }

    pub fn unfavorite_exercise(&self, session: &Session, exercise_id: i64) -> Result<bool> {
        self.db.delete_user_exercise(session.user_id, exercise_id)
    }

    pub fn favorite_meal(
        &self,
        session: &Session,
        lookup: &dyn MealLookup,
        meal_id: i64,
    ) -> Result<UserMeal> {
        let snapshot = self.snapshot_meal(lookup, meal_id)?;
        self.db.insert_user_meal(session.user_id, &snapshot)
    }

    pub fn unfavorite_meal(&self, session: &Session, meal_id: i64) -> Result<bool> {
        self.db.delete_user_meal(session.user_id, meal_id)
    }

    // --- Comments ---

    pub fn comment_on_exercise(
        &self,
        session: &Session,
        exercise_id: i64,
        content: &str,
    ) -> Result<ExerciseComment> {
        let content = validate_comment(content)?;
        self.db
            .insert_exercise_comment(session.user_id, exercise_id, &content)
    }

    pub fn comment_on_meal(
        &self,
        session: &Session,
        lookup: &dyn MealLookup,
        meal_id: i64,
        content: &str,
    ) -> Result<MealComment> {
        let content = validate_comment(content)?;
        let snapshot = self.snapshot_meal(lookup, meal_id)?;
        self.db
            .insert_meal_comment(session.user_id, &snapshot, &content)
    }

    pub fn delete_exercise_comment(&self, session: &Session, comment_id: i64) -> Result<()> {
        let comment = self.db.get_exercise_comment(comment_id)?;
        if comment.user_id != session.user_id {
            return Err(Error::Forbidden(format!(
                "exercise comment {comment_id} belongs to another user"
            )));
        }
        self.db.delete_exercise_comment(comment_id)?;
        Ok(())
    }

    pub fn delete_meal_comment(&self, session: &Session, comment_id: i64) -> Result<()> {
        let comment = self.db.get_meal_comment(comment_id)?;
        if comment.user_id != session.user_id {
            return Err(Error::Forbidden(format!(
                "meal comment {comment_id} belongs to another user"
            )));
        }
        self.db.delete_meal_comment(comment_id)?;
        Ok(())
    }

    /// Fetch a meal upstream and pin its category to a locally stored meal
    /// category by name.
    fn snapshot_meal(&self, lookup: &dyn MealLookup, meal_id: i64) -> Result<MealSnapshot> {
        let meal = lookup
            .lookup_meal(meal_id)?
            .ok_or_else(|| Error::not_found("meal", meal_id))?;
        let category = self
            .db
            .find_meal_category_by_name(&meal.category_name)?
            .ok_or_else(|| Error::not_found("meal category", &meal.category_name))?;
        Ok(MealSnapshot {
            meal_id: meal.id,
            meal_name: meal.name,
            meal_category: category.id,
        })
    }
}
