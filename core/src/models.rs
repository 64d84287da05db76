use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const DEFAULT_AVATAR_URL: &str = "/static/images/default-pic.png";

pub const MAX_USERNAME_LEN: usize = 20;
pub const MAX_EMAIL_LEN: usize = 50;
pub const MAX_NAME_LEN: usize = 30;

// --- Users ---

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub avatar_url: String,
    pub created_at: String,
}

impl User {
    /// The explicit per-request identity handed to every operation that acts
    /// on behalf of this user.
    #[must_use]
    pub fn session(&self) -> Session {
        Session {
            user_id: self.id,
            username: self.username.clone(),
        }
    }
}

impl std::fmt::Display for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "<{}: {} {} - {}>",
            self.username, self.first_name, self.last_name, self.email
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub avatar_url: Option<String>,
}

/// New values for the settings edit. `avatar_url: None` (or blank) resets
/// the picture to the default.
#[derive(Debug, Clone, Deserialize)]
pub struct UserUpdate {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub avatar_url: Option<String>,
}

/// Authenticated caller identity. Obtained from a successful login and passed
/// explicitly; nothing in the crate keeps "the current user" around.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub user_id: i64,
    pub username: String,
}

// --- Reference data (ids are assigned upstream) ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExerciseCategory {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exercise {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub category_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MealCategory {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub image_url: String,
}

/// A meal as returned by the upstream lookup. Never stored whole; favorites
/// and comments keep a snapshot of the id, name and resolved category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteMeal {
    pub id: i64,
    pub name: String,
    pub category_name: String,
}

// --- Favorites ---

#[derive(Debug, Clone, Serialize)]
pub struct UserExercise {
    pub id: i64,
    pub user_id: i64,
    pub exercise_id: i64,
    // Joined for display
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exercise_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserMeal {
    pub id: i64,
    pub user_id: i64,
    pub meal_id: i64,
    pub meal_name: String,
    pub meal_category: i64,
}

#[derive(Debug, Clone)]
pub struct MealSnapshot {
    pub meal_id: i64,
    pub meal_name: String,
    pub meal_category: i64,
}

// --- Comments ---

#[derive(Debug, Clone, Serialize)]
pub struct ExerciseComment {
    pub id: i64,
    pub content: String,
    pub user_id: i64,
    pub exercise_id: i64,
    pub created_at: String,
    // Joined for display
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MealComment {
    pub id: i64,
    pub content: String,
    pub user_id: i64,
    pub meal_id: i64,
    pub meal_name: String,
    pub meal_category: i64,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// Everything hanging off one user, for the profile view.
#[derive(Debug, Clone, Serialize)]
pub struct UserOverview {
    pub user: User,
    pub favorite_exercises: Vec<UserExercise>,
    pub favorite_meals: Vec<UserMeal>,
    pub exercise_comments: Vec<ExerciseComment>,
    pub meal_comments: Vec<MealComment>,
}

/// One exercise with every user's comments on it, as seen by `session`.
#[derive(Debug, Clone, Serialize)]
pub struct ExerciseDetail {
    pub exercise: Exercise,
    pub comments: Vec<ExerciseComment>,
    pub comment_count: usize,
    pub favorited: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct MealDetail {
    pub meal: RemoteMeal,
    pub comments: Vec<MealComment>,
    pub comment_count: usize,
    pub favorited: bool,
}

// --- Sync reporting ---

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SourceReport {
    pub fetched: usize,
    pub inserted: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub exercise_categories: SourceReport,
    pub meal_categories: SourceReport,
    pub exercises: SourceReport,
}

impl SyncReport {
    #[must_use]
    pub fn total_inserted(&self) -> usize {
        self.exercise_categories.inserted + self.meal_categories.inserted + self.exercises.inserted
    }
}

pub fn validate_comment(content: &str) -> Result<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidInput(
            "Comment content must not be empty".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: 1,
            username: "testing1".to_string(),
            password_hash: "$argon2id$...".to_string(),
            email: "testing1@test.com".to_string(),
            first_name: "John".to_string(),
            last_name: "Doe".to_string(),
            avatar_url: DEFAULT_AVATAR_URL.to_string(),
            created_at: "2024-06-15T10:00:00+00:00".to_string(),
        }
    }

    #[test]
    fn test_user_display() {
        assert_eq!(
            sample_user().to_string(),
            "<testing1: John Doe - testing1@test.com>"
        );
    }

    #[test]
    fn test_user_json_hides_password_hash() {
        let json = serde_json::to_value(sample_user()).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["username"], "testing1");
    }

    #[test]
    fn test_session_from_user() {
        let session = sample_user().session();
        assert_eq!(session.user_id, 1);
        assert_eq!(session.username, "testing1");
    }

    #[test]
    fn test_validate_comment() {
        assert_eq!(validate_comment("  nice form  ").unwrap(), "nice form");
        assert!(matches!(
            validate_comment("   "),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_sync_report_total() {
        let report = SyncReport {
            exercise_categories: SourceReport {
                fetched: 2,
                inserted: 1,
            },
            meal_categories: SourceReport {
                fetched: 3,
                inserted: 3,
            },
            exercises: SourceReport::default(),
        };
        assert_eq!(report.total_inserted(), 4);
    }
}
