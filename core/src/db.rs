use std::collections::HashSet;
use std::path::Path;

use chrono::Local;
use rusqlite::{Connection, OptionalExtension, params};

use crate::error::{Error, Result};
use crate::models::{
    DEFAULT_AVATAR_URL, Exercise, ExerciseCategory, ExerciseComment, MAX_EMAIL_LEN, MAX_NAME_LEN,
    MAX_USERNAME_LEN, MealCategory, MealComment, MealSnapshot, NewUser, User, UserExercise,
    UserMeal, UserUpdate,
};

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        tracing::debug!(path = %path.display(), "opened database");
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    #[allow(clippy::too_many_lines)]
    fn migrate(&self) -> Result<()> {
        // Cascades on users rely on this; it is per-connection, not stored.
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            self.conn.execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS users (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    username TEXT NOT NULL UNIQUE CHECK (length(username) BETWEEN 1 AND {MAX_USERNAME_LEN}),
                    password TEXT NOT NULL,
                    email TEXT NOT NULL UNIQUE CHECK (length(email) BETWEEN 1 AND {MAX_EMAIL_LEN}),
                    first_name TEXT NOT NULL CHECK (length(first_name) BETWEEN 1 AND {MAX_NAME_LEN}),
                    last_name TEXT NOT NULL CHECK (length(last_name) BETWEEN 1 AND {MAX_NAME_LEN}),
                    img_url TEXT NOT NULL DEFAULT '{DEFAULT_AVATAR_URL}',
                    created_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS exercise_categories (
                    id INTEGER PRIMARY KEY,
                    name TEXT NOT NULL UNIQUE
                );

                CREATE TABLE IF NOT EXISTS exercises (
                    id INTEGER PRIMARY KEY,
                    name TEXT NOT NULL,
                    description TEXT,
                    category_id INTEGER NOT NULL
                        REFERENCES exercise_categories(id) ON DELETE CASCADE
                );

                CREATE TABLE IF NOT EXISTS meal_categories (
                    id INTEGER PRIMARY KEY,
                    name TEXT NOT NULL UNIQUE,
                    description TEXT NOT NULL,
                    image_url TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS user_exercises (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                    exercise_id INTEGER NOT NULL UNIQUE
                        REFERENCES exercises(id) ON DELETE CASCADE
                );

                CREATE TABLE IF NOT EXISTS user_meals (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                    meal_id INTEGER NOT NULL UNIQUE,
                    meal_name TEXT NOT NULL UNIQUE,
                    meal_category INTEGER NOT NULL
                );

                CREATE TABLE IF NOT EXISTS exercise_comments (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    content TEXT NOT NULL,
                    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                    exercise_id INTEGER NOT NULL REFERENCES exercises(id) ON DELETE CASCADE,
                    created_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS meal_comments (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    content TEXT NOT NULL,
                    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                    meal_id INTEGER NOT NULL,
                    meal_name TEXT NOT NULL,
                    meal_category INTEGER NOT NULL,
                    created_at TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_exercises_category ON exercises(category_id);
                CREATE INDEX IF NOT EXISTS idx_exercise_comments_exercise ON exercise_comments(exercise_id);
                CREATE INDEX IF NOT EXISTS idx_meal_comments_meal ON meal_comments(meal_id);

                PRAGMA user_version = 1;"
            ))?;
        }

        Ok(())
    }

    // --- Row mapping helpers ---

    fn user_from_row(row: &rusqlite::Row) -> rusqlite::Result<User> {
        Ok(User {
            id: row.get(0)?,
            username: row.get(1)?,
            password_hash: row.get(2)?,
            email: row.get(3)?,
            first_name: row.get(4)?,
            last_name: row.get(5)?,
            avatar_url: row.get(6)?,
            created_at: row.get(7)?,
        })
    }

    fn exercise_from_row(row: &rusqlite::Row) -> rusqlite::Result<Exercise> {
        Ok(Exercise {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            category_id: row.get(3)?,
        })
    }

    fn meal_category_from_row(row: &rusqlite::Row) -> rusqlite::Result<MealCategory> {
        Ok(MealCategory {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            image_url: row.get(3)?,
        })
    }

    fn exercise_comment_from_row(row: &rusqlite::Row) -> rusqlite::Result<ExerciseComment> {
        Ok(ExerciseComment {
            id: row.get(0)?,
            content: row.get(1)?,
            user_id: row.get(2)?,
            exercise_id: row.get(3)?,
            created_at: row.get(4)?,
            username: None,
        })
    }

    fn meal_comment_from_row(row: &rusqlite::Row) -> rusqlite::Result<MealComment> {
        Ok(MealComment {
            id: row.get(0)?,
            content: row.get(1)?,
            user_id: row.get(2)?,
            meal_id: row.get(3)?,
            meal_name: row.get(4)?,
            meal_category: row.get(5)?,
            created_at: row.get(6)?,
            username: None,
        })
    }

    fn user_meal_from_row(row: &rusqlite::Row) -> rusqlite::Result<UserMeal> {
        Ok(UserMeal {
            id: row.get(0)?,
            user_id: row.get(1)?,
            meal_id: row.get(2)?,
            meal_name: row.get(3)?,
            meal_category: row.get(4)?,
        })
    }

    fn id_set(&self, table: &str) -> Result<HashSet<i64>> {
        let mut stmt = self.conn.prepare(&format!("SELECT id FROM {table}"))?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<HashSet<i64>>>()?;
        Ok(ids)
    }

    // --- Users ---

    const USER_COLUMNS: &str =
        "id, username, password, email, first_name, last_name, img_url, created_at";

    pub fn insert_user(&self, user: &NewUser, password_hash: &str) -> Result<User> {
        let now = Local::now().to_rfc3339();
        let avatar = user
            .avatar_url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .unwrap_or(DEFAULT_AVATAR_URL);
        self.conn.execute(
            "INSERT INTO users (username, password, email, first_name, last_name, img_url, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                user.username,
                password_hash,
                user.email,
                user.first_name,
                user.last_name,
                avatar,
                now,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_user_by_id(id)
    }

    pub fn get_user_by_id(&self, id: i64) -> Result<User> {
        self.find_user_by_id(id)?
            .ok_or_else(|| Error::not_found("user", id))
    }

    pub fn find_user_by_id(&self, id: i64) -> Result<Option<User>> {
        let user = self
            .conn
            .query_row(
                &format!("SELECT {} FROM users WHERE id = ?1", Self::USER_COLUMNS),
                params![id],
                Self::user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    pub fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM users WHERE username = ?1",
                    Self::USER_COLUMNS
                ),
                params![username],
                Self::user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    pub fn update_password_hash(&self, user_id: i64, password_hash: &str) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE users SET password = ?1 WHERE id = ?2",
            params![password_hash, user_id],
        )?;
        if changed == 0 {
            return Err(Error::not_found("user", user_id));
        }
        Ok(())
    }

    /// Overwrite the editable profile fields. A username or email already
    /// taken by someone else is an `IntegrityViolation`.
    pub fn update_user(&self, user_id: i64, update: &UserUpdate) -> Result<User> {
        let avatar = update
            .avatar_url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .unwrap_or(DEFAULT_AVATAR_URL);
        let changed = self.conn.execute(
            "UPDATE users SET username = ?1, email = ?2, first_name = ?3, last_name = ?4, img_url = ?5
             WHERE id = ?6",
            params![
                update.username,
                update.email,
                update.first_name,
                update.last_name,
                avatar,
                user_id,
            ],
        )?;
        if changed == 0 {
            return Err(Error::not_found("user", user_id));
        }
        self.get_user_by_id(user_id)
    }

    pub fn delete_user(&self, user_id: i64) -> Result<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM users WHERE id = ?1", params![user_id])?;
        Ok(changed > 0)
    }

    pub fn count_users(&self) -> Result<i64> {
        let n = self
            .conn
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(n)
    }

    // --- Exercise categories ---

    pub fn exercise_category_ids(&self) -> Result<HashSet<i64>> {
        self.id_set("exercise_categories")
    }

    pub fn insert_exercise_category(&self, category: &ExerciseCategory) -> Result<()> {
        self.conn.execute(
            "INSERT INTO exercise_categories (id, name) VALUES (?1, ?2)",
            params![category.id, category.name],
        )?;
        Ok(())
    }

    pub fn list_exercise_categories(&self) -> Result<Vec<ExerciseCategory>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name FROM exercise_categories ORDER BY name")?;
        let categories = stmt
            .query_map([], |row| {
                Ok(ExerciseCategory {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(categories)
    }

    // --- Exercises ---

    pub fn exercise_ids(&self) -> Result<HashSet<i64>> {
        self.id_set("exercises")
    }

    pub fn insert_exercise(&self, exercise: &Exercise) -> Result<()> {
        self.conn.execute(
            "INSERT INTO exercises (id, name, description, category_id) VALUES (?1, ?2, ?3, ?4)",
            params![
                exercise.id,
                exercise.name,
                exercise.description,
                exercise.category_id,
            ],
        )?;
        Ok(())
    }

    pub fn get_exercise(&self, id: i64) -> Result<Exercise> {
        self.conn
            .query_row(
                "SELECT id, name, description, category_id FROM exercises WHERE id = ?1",
                params![id],
                Self::exercise_from_row,
            )
            .optional()?
            .ok_or_else(|| Error::not_found("exercise", id))
    }

    pub fn list_exercises_in_category(&self, category_id: i64) -> Result<Vec<Exercise>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, description, category_id FROM exercises
             WHERE category_id = ?1 ORDER BY name",
        )?;
        let exercises = stmt
            .query_map(params![category_id], Self::exercise_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(exercises)
    }

    // --- Meal categories ---

    pub fn meal_category_ids(&self) -> Result<HashSet<i64>> {
        self.id_set("meal_categories")
    }

    pub fn insert_meal_category(&self, category: &MealCategory) -> Result<()> {
        self.conn.execute(
            "INSERT INTO meal_categories (id, name, description, image_url) VALUES (?1, ?2, ?3, ?4)",
            params![
                category.id,
                category.name,
                category.description,
                category.image_url,
            ],
        )?;
        Ok(())
    }

    pub fn list_meal_categories(&self) -> Result<Vec<MealCategory>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, description, image_url FROM meal_categories ORDER BY name",
        )?;
        let categories = stmt
            .query_map([], Self::meal_category_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(categories)
    }

    pub fn find_meal_category_by_name(&self, name: &str) -> Result<Option<MealCategory>> {
        let category = self
            .conn
            .query_row(
                "SELECT id, name, description, image_url FROM meal_categories WHERE name = ?1",
                params![name],
                Self::meal_category_from_row,
            )
            .optional()?;
        Ok(category)
    }

    // --- Favorites ---

    pub fn insert_user_exercise(&self, user_id: i64, exercise_id: i64) -> Result<UserExercise> {
        self.conn.execute(
            "INSERT INTO user_exercises (user_id, exercise_id) VALUES (?1, ?2)",
            params![user_id, exercise_id],
        )?;
        Ok(UserExercise {
            id: self.conn.last_insert_rowid(),
            user_id,
            exercise_id,
            exercise_name: None,
        })
    }

    pub fn delete_user_exercise(&self, user_id: i64, exercise_id: i64) -> Result<bool> {
        let changed = self.conn.execute(
            "DELETE FROM user_exercises WHERE user_id = ?1 AND exercise_id = ?2",
            params![user_id, exercise_id],
        )?;
        Ok(changed > 0)
    }

    pub fn list_user_exercises(&self, user_id: i64) -> Result<Vec<UserExercise>> {
        let mut stmt = self.conn.prepare(
            "SELECT ue.id, ue.user_id, ue.exercise_id, e.name
             FROM user_exercises ue
             JOIN exercises e ON e.id = ue.exercise_id
             WHERE ue.user_id = ?1
             ORDER BY ue.id",
        )?;
        let rows = stmt
            .query_map(params![user_id], |row| {
                Ok(UserExercise {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    exercise_id: row.get(2)?,
                    exercise_name: Some(row.get(3)?),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn is_favorite_exercise(&self, user_id: i64, exercise_id: i64) -> Result<bool> {
        let found: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM user_exercises WHERE user_id = ?1 AND exercise_id = ?2)",
            params![user_id, exercise_id],
            |row| row.get(0),
        )?;
        Ok(found)
    }

    pub fn insert_user_meal(&self, user_id: i64, meal: &MealSnapshot) -> Result<UserMeal> {
        self.conn.execute(
            "INSERT INTO user_meals (user_id, meal_id, meal_name, meal_category)
             VALUES (?1, ?2, ?3, ?4)",
            params![user_id, meal.meal_id, meal.meal_name, meal.meal_category],
        )?;
        Ok(UserMeal {
            id: self.conn.last_insert_rowid(),
            user_id,
            meal_id: meal.meal_id,
            meal_name: meal.meal_name.clone(),
            meal_category: meal.meal_category,
        })
    }

    pub fn delete_user_meal(&self, user_id: i64, meal_id: i64) -> Result<bool> {
        let changed = self.conn.execute(
            "DELETE FROM user_meals WHERE user_id = ?1 AND meal_id = ?2",
            params![user_id, meal_id],
        )?;
        Ok(changed > 0)
    }

    pub fn list_user_meals(&self, user_id: i64) -> Result<Vec<UserMeal>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, meal_id, meal_name, meal_category
             FROM user_meals WHERE user_id = ?1 ORDER BY id",
        )?;
        let rows = stmt
            .query_map(params![user_id], Self::user_meal_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn is_favorite_meal(&self, user_id: i64, meal_id: i64) -> Result<bool> {
        let found: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM user_meals WHERE user_id = ?1 AND meal_id = ?2)",
            params![user_id, meal_id],
            |row| row.get(0),
        )?;
        Ok(found)
    }

    // --- Comments ---

    pub fn insert_exercise_comment(
        &self,
        user_id: i64,
        exercise_id: i64,
        content: &str,
    ) -> Result<ExerciseComment> {
        let now = Local::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO exercise_comments (content, user_id, exercise_id, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![content, user_id, exercise_id, now],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_exercise_comment(id)
    }

    pub fn get_exercise_comment(&self, id: i64) -> Result<ExerciseComment> {
        self.conn
            .query_row(
                "SELECT id, content, user_id, exercise_id, created_at
                 FROM exercise_comments WHERE id = ?1",
                params![id],
                Self::exercise_comment_from_row,
            )
            .optional()?
            .ok_or_else(|| Error::not_found("exercise comment", id))
    }

    pub fn delete_exercise_comment(&self, id: i64) -> Result<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM exercise_comments WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    pub fn list_exercise_comments_for_user(&self, user_id: i64) -> Result<Vec<ExerciseComment>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, content, user_id, exercise_id, created_at
             FROM exercise_comments WHERE user_id = ?1 ORDER BY id",
        )?;
        let rows = stmt
            .query_map(params![user_id], Self::exercise_comment_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Every comment on one exercise, oldest first, with the author's name.
    pub fn list_exercise_comments(&self, exercise_id: i64) -> Result<Vec<ExerciseComment>> {
        let mut stmt = self.conn.prepare(
            "SELECT c.id, c.content, c.user_id, c.exercise_id, c.created_at, u.username
             FROM exercise_comments c
             JOIN users u ON u.id = c.user_id
             WHERE c.exercise_id = ?1 ORDER BY c.id",
        )?;
        let rows = stmt
            .query_map(params![exercise_id], |row| {
                let mut comment = Self::exercise_comment_from_row(row)?;
                comment.username = Some(row.get(5)?);
                Ok(comment)
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn insert_meal_comment(
        &self,
        user_id: i64,
        meal: &MealSnapshot,
        content: &str,
    ) -> Result<MealComment> {
        let now = Local::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO meal_comments (content, user_id, meal_id, meal_name, meal_category, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                content,
                user_id,
                meal.meal_id,
                meal.meal_name,
                meal.meal_category,
                now,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_meal_comment(id)
    }

    pub fn get_meal_comment(&self, id: i64) -> Result<MealComment> {
        self.conn
            .query_row(
                "SELECT id, content, user_id, meal_id, meal_name, meal_category, created_at
                 FROM meal_comments WHERE id = ?1",
                params![id],
                Self::meal_comment_from_row,
            )
            .optional()?
            .ok_or_else(|| Error::not_found("meal comment", id))
    }

    pub fn delete_meal_comment(&self, id: i64) -> Result<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM meal_comments WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    pub fn list_meal_comments_for_user(&self, user_id: i64) -> Result<Vec<MealComment>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, content, user_id, meal_id, meal_name, meal_category, created_at
             FROM meal_comments WHERE user_id = ?1 ORDER BY id",
        )?;
        let rows = stmt
            .query_map(params![user_id], Self::meal_comment_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn list_meal_comments(&self, meal_id: i64) -> Result<Vec<MealComment>> {
        let mut stmt = self.conn.prepare(
            "SELECT c.id, c.content, c.user_id, c.meal_id, c.meal_name, c.meal_category,
                    c.created_at, u.username
             FROM meal_comments c
             JOIN users u ON u.id = c.user_id
             WHERE c.meal_id = ?1 ORDER BY c.id",
        )?;
        let rows = stmt
            .query_map(params![meal_id], |row| {
                let mut comment = Self::meal_comment_from_row(row)?;
                comment.username = Some(row.get(7)?);
                Ok(comment)
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}
