//! Registration, login, and password rotation.

use crate::db::Database;
use crate::error::Result;
use crate::models::{NewUser, User, UserUpdate};
use crate::password::CredentialHasher;

/// Create a user with a salted hash of `raw_password`.
///
/// Uniqueness of username and email is left to the store: a duplicate comes
/// back as `Error::IntegrityViolation` from the insert.
pub fn register(
    db: &Database,
    hasher: &CredentialHasher,
    new_user: &NewUser,
    raw_password: Option<&str>,
) -> Result<User> {
    let hash = hasher.hash(raw_password)?;
    let user = db.insert_user(new_user, &hash)?;
    tracing::info!(user_id = user.id, username = %user.username, "registered user");
    Ok(user)
}

/// `Some(user)` when the username exists and the password matches, `None`
/// otherwise. Both failure cases look the same to the caller.
pub fn authenticate(
    db: &Database,
    hasher: &CredentialHasher,
    username: &str,
    raw_password: &str,
) -> Result<Option<User>> {
    let Some(user) = db.find_user_by_username(username)? else {
        hasher.verify_absent(raw_password);
        tracing::debug!("login rejected");
        return Ok(None);
    };
    if hasher.verify(raw_password, &user.password_hash) {
        Ok(Some(user))
    } else {
        tracing::debug!("login rejected");
        Ok(None)
    }
}

/// Replace the stored hash after verifying `current`. Returns `false` and
/// leaves the hash alone when `current` does not match.
pub fn change_password(
    db: &Database,
    hasher: &CredentialHasher,
    user_id: i64,
    current: &str,
    new_password: &str,
) -> Result<bool> {
    let user = db.get_user_by_id(user_id)?;
    if !hasher.verify(current, &user.password_hash) {
        return Ok(false);
    }
    let hash = hasher.hash(Some(new_password))?;
    db.update_password_hash(user.id, &hash)?;
    tracing::info!(user_id = user.id, "password changed");
    Ok(true)
}

/// Overwrite the user's profile fields after verifying `password` against
/// the stored hash. Returns `None` and changes nothing on a mismatch.
pub fn update_profile(
    db: &Database,
    hasher: &CredentialHasher,
    user_id: i64,
    password: &str,
    update: &UserUpdate,
) -> Result<Option<User>> {
    let user = db.get_user_by_id(user_id)?;
    if !hasher.verify(password, &user.password_hash) {
        tracing::debug!(user_id, "settings update rejected");
        return Ok(None);
    }
    let updated = db.update_user(user.id, update)?;
    tracing::info!(user_id, username = %updated.username, "profile updated");
    Ok(Some(updated))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::password::test_hasher;

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: email.to_string(),
            first_name: "John".to_string(),
            last_name: "Doe".to_string(),
            avatar_url: None,
        }
    }

    #[test]
    fn test_register_then_authenticate() {
        let db = Database::open_in_memory().unwrap();
        let hasher = test_hasher();

        for (i, password) in ["password", "p", "correct horse battery staple", "пароль🔑"]
            .into_iter()
            .enumerate()
        {
            let username = format!("user{i}");
            let created = register(
                &db,
                &hasher,
                &new_user(&username, &format!("{username}@test.com")),
                Some(password),
            )
            .unwrap();
            assert_ne!(created.password_hash, password);

            let found = authenticate(&db, &hasher, &username, password)
                .unwrap()
                .unwrap();
            assert_eq!(found.id, created.id);
        }
    }

    #[test]
    fn test_wrong_password_is_none_not_error() {
        let db = Database::open_in_memory().unwrap();
        let hasher = test_hasher();
        register(&db, &hasher, &new_user("testing1", "t1@test.com"), Some("password")).unwrap();

        assert!(
            authenticate(&db, &hasher, "testing1", "passwordx")
                .unwrap()
                .is_none()
        );
        assert!(authenticate(&db, &hasher, "testing1", "").unwrap().is_none());
    }

    #[test]
    fn test_unknown_username_is_none() {
        let db = Database::open_in_memory().unwrap();
        let hasher = test_hasher();
        assert!(
            authenticate(&db, &hasher, "nobody", "password")
                .unwrap()
                .is_none()
        );
        // The throwaway hash checked on a miss never lets anyone in
        assert!(
            authenticate(&db, &hasher, "nobody", "fitmeal-absent-user")
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_register_empty_or_missing_password() {
        let db = Database::open_in_memory().unwrap();
        let hasher = test_hasher();
        let u = new_user("testtest", "email@email.com");

        assert!(matches!(
            register(&db, &hasher, &u, Some("")),
            Err(Error::InvalidCredential(_))
        ));
        assert!(matches!(
            register(&db, &hasher, &u, None),
            Err(Error::InvalidCredential(_))
        ));
        assert_eq!(db.count_users().unwrap(), 0);
    }

    #[test]
    fn test_duplicate_username_fails_at_insert() {
        let db = Database::open_in_memory().unwrap();
        let hasher = test_hasher();
        register(&db, &hasher, &new_user("twin", "a@test.com"), Some("password")).unwrap();

        let mut other = new_user("twin", "b@test.com");
        other.first_name = "Jane".to_string();
        let err = register(&db, &hasher, &other, Some("different")).unwrap_err();
        assert!(matches!(err, Error::IntegrityViolation(_)));
        assert_eq!(db.count_users().unwrap(), 1);
    }

    #[test]
    fn test_change_password() {
        let db = Database::open_in_memory().unwrap();
        let hasher = test_hasher();
        let user = register(&db, &hasher, &new_user("rotate", "r@test.com"), Some("old-pass")).unwrap();

        assert!(change_password(&db, &hasher, user.id, "old-pass", "new-pass").unwrap());
        assert!(authenticate(&db, &hasher, "rotate", "old-pass").unwrap().is_none());
        assert!(authenticate(&db, &hasher, "rotate", "new-pass").unwrap().is_some());
    }

    #[test]
    fn test_change_password_wrong_current_leaves_hash() {
        let db = Database::open_in_memory().unwrap();
        let hasher = test_hasher();
        let user = register(&db, &hasher, &new_user("keep", "k@test.com"), Some("original")).unwrap();

        assert!(!change_password(&db, &hasher, user.id, "wrong", "new-pass").unwrap());
        assert_eq!(
            db.get_user_by_id(user.id).unwrap().password_hash,
            user.password_hash
        );
        assert!(authenticate(&db, &hasher, "keep", "original").unwrap().is_some());
    }

    #[test]
    fn test_change_password_unknown_user() {
        let db = Database::open_in_memory().unwrap();
        let hasher = test_hasher();
        assert!(matches!(
            change_password(&db, &hasher, 4242, "a", "b"),
            Err(Error::NotFound { entity: "user", .. })
        ));
    }

    #[test]
    fn test_change_password_to_empty_rejected() {
        let db = Database::open_in_memory().unwrap();
        let hasher = test_hasher();
        let user = register(&db, &hasher, &new_user("empty", "e@test.com"), Some("original")).unwrap();
        assert!(matches!(
            change_password(&db, &hasher, user.id, "original", ""),
            Err(Error::InvalidCredential(_))
        ));
        assert!(authenticate(&db, &hasher, "empty", "original").unwrap().is_some());
    }
}
