//! Cold-start population of the reference tables.
//!
//! Each source is reconciled by set difference on the upstream id: rows that
//! are missing locally get inserted, rows that exist are never touched. The
//! first failure aborts the run and is returned to the caller; rows inserted
//! before it stay committed.

use std::collections::HashSet;

use crate::db::Database;
use crate::error::Result;
use crate::models::{Exercise, ExerciseCategory, MealCategory, RemoteMeal, SourceReport, SyncReport};

/// Remote source of truth for reference data.
///
/// The CLI implements this over HTTP with reqwest; tests use fixtures.
/// Called synchronously, one listing per call.
pub trait CatalogSource: Send + Sync {
    fn exercise_categories(&self) -> Result<Vec<ExerciseCategory>>;
    fn exercises(&self) -> Result<Vec<Exercise>>;
    fn meal_categories(&self) -> Result<Vec<MealCategory>>;
}

/// Single-meal lookup, used to snapshot a meal onto favorites and comments.
pub trait MealLookup: Send + Sync {
    fn lookup_meal(&self, meal_id: i64) -> Result<Option<RemoteMeal>>;
}

/// Insert every record whose id is not in `local`. Returns the report for
/// this source.
fn reconcile<T>(
    source_name: &str,
    remote: &[T],
    mut local: HashSet<i64>,
    id_of: impl Fn(&T) -> i64,
    mut insert: impl FnMut(&T) -> Result<()>,
) -> Result<SourceReport> {
    let mut report = SourceReport {
        fetched: remote.len(),
        inserted: 0,
    };
    for record in remote {
        let id = id_of(record);
        if local.contains(&id) {
            continue;
        }
        insert(record)?;
        local.insert(id);
        report.inserted += 1;
    }
    tracing::info!(
        source = source_name,
        fetched = report.fetched,
        inserted = report.inserted,
        "reference data reconciled"
    );
    Ok(report)
}

pub fn sync_exercise_categories(db: &Database, source: &dyn CatalogSource) -> Result<SourceReport> {
    let remote = source.exercise_categories()?;
    reconcile(
        "exercise_categories",
        &remote,
        db.exercise_category_ids()?,
        |c| c.id,
        |c| db.insert_exercise_category(c),
    )
}

pub fn sync_meal_categories(db: &Database, source: &dyn CatalogSource) -> Result<SourceReport> {
    let remote = source.meal_categories()?;
    reconcile(
        "meal_categories",
        &remote,
        db.meal_category_ids()?,
        |c| c.id,
        |c| db.insert_meal_category(c),
    )
}

pub fn sync_exercises(db: &Database, source: &dyn CatalogSource) -> Result<SourceReport> {
    let remote = source.exercises()?;
    reconcile(
        "exercises",
        &remote,
        db.exercise_ids()?,
        |e| e.id,
        |e| db.insert_exercise(e),
    )
}

/// Run all three sources, strictly in sequence. Exercises go last because
/// they reference exercise categories.
pub fn sync_catalog(db: &Database, source: &dyn CatalogSource) -> Result<SyncReport> {
    let exercise_categories = sync_exercise_categories(db, source)?;
    let meal_categories = sync_meal_categories(db, source)?;
    let exercises = sync_exercises(db, source)?;
    Ok(SyncReport {
        exercise_categories,
        meal_categories,
        exercises,
    })
}


#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::Ordering;

    use super::fixtures::{FixtureSource, category, exercise, meal_category};
    use super::*;
    use crate::error::Error;

    fn category_map(db: &Database) -> HashMap<i64, String> {
        db.list_exercise_categories()
            .unwrap()
            .into_iter()
            .map(|c| (c.id, c.name))
            .collect()
    }

    #[test]
    fn test_first_run_inserts_everything() {
        let db = Database::open_in_memory().unwrap();
        let source = FixtureSource::standard();

        let report = sync_catalog(&db, &source).unwrap();
        assert_eq!(report.exercise_categories.inserted, 2);
        assert_eq!(report.meal_categories.inserted, 2);
        assert_eq!(report.exercises.inserted, 2);
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_second_run_is_a_no_op() {
        let db = Database::open_in_memory().unwrap();
        let source = FixtureSource::standard();

        sync_catalog(&db, &source).unwrap();
        let counts_after_first = (
            db.exercise_category_ids().unwrap().len(),
            db.exercise_ids().unwrap().len(),
            db.meal_category_ids().unwrap().len(),
        );

        let report = sync_catalog(&db, &source).unwrap();
        assert_eq!(report.total_inserted(), 0);
        assert_eq!(report.exercises.fetched, 2);
        let counts_after_second = (
            db.exercise_category_ids().unwrap().len(),
            db.exercise_ids().unwrap().len(),
            db.meal_category_ids().unwrap().len(),
        );
        assert_eq!(counts_after_first, counts_after_second);
    }

    #[test]
    fn test_seeded_chest_gains_triceps() {
        let db = Database::open_in_memory().unwrap();
        db.insert_exercise_category(&category(10, "Chest")).unwrap();

        let source = FixtureSource {
            exercise_categories: vec![category(10, "Chest"), category(11, "Triceps")].into(),
            ..FixtureSource::default()
        };

        let report = sync_exercise_categories(&db, &source).unwrap();
        assert_eq!(report.fetched, 2);
        assert_eq!(report.inserted, 1);
        assert_eq!(
            category_map(&db),
            HashMap::from([(10, "Chest".to_string()), (11, "Triceps".to_string())])
        );
    }

    #[test]
    fn test_one_new_remote_id_inserts_one_row() {
        let db = Database::open_in_memory().unwrap();
        let source = FixtureSource::standard();
        sync_catalog(&db, &source).unwrap();
        let before = db.list_exercises_in_category(10).unwrap();

        source
            .exercises
            .lock()
            .unwrap()
            .push(exercise(88, "Incline Fly", 10));

        let report = sync_catalog(&db, &source).unwrap();
        assert_eq!(report.total_inserted(), 1);
        assert_eq!(report.exercises.inserted, 1);

        let after = db.list_exercises_in_category(10).unwrap();
        assert_eq!(after.len(), before.len() + 1);
        for row in &before {
            assert!(after.contains(row));
        }
    }

    #[test]
    fn test_existing_rows_are_not_updated() {
        let db = Database::open_in_memory().unwrap();
        db.insert_exercise_category(&category(10, "Chest")).unwrap();

        let source = FixtureSource {
            exercise_categories: vec![category(10, "Pectorals")].into(),
            ..FixtureSource::default()
        };
        let report = sync_exercise_categories(&db, &source).unwrap();
        assert_eq!(report.inserted, 0);
        assert_eq!(category_map(&db)[&10], "Chest");
    }

    #[test]
    fn test_duplicate_ids_in_one_listing_insert_once() {
        let db = Database::open_in_memory().unwrap();
        let source = FixtureSource {
            meal_categories: vec![meal_category(1, "Beef"), meal_category(1, "Beef")].into(),
            ..FixtureSource::default()
        };
        let report = sync_meal_categories(&db, &source).unwrap();
        assert_eq!(report.fetched, 2);
        assert_eq!(report.inserted, 1);
    }

    #[test]
    fn test_upstream_failure_aborts_and_keeps_earlier_rows() {
        let db = Database::open_in_memory().unwrap();
        let source = FixtureSource {
            fail_exercises: true,
            ..FixtureSource::standard()
        };

        let err = sync_catalog(&db, &source).unwrap_err();
        assert!(matches!(err, Error::UpstreamUnavailable { .. }));
        assert_eq!(db.exercise_category_ids().unwrap().len(), 2);
        assert_eq!(db.meal_category_ids().unwrap().len(), 2);
        assert!(db.exercise_ids().unwrap().is_empty());
    }

    #[test]
    fn test_insert_failure_propagates() {
        let db = Database::open_in_memory().unwrap();
        let source = FixtureSource {
            exercises: vec![exercise(1, "Orphan", 404)].into(),
            ..FixtureSource::default()
        };
        let err = sync_exercises(&db, &source).unwrap_err();
        assert!(matches!(err, Error::IntegrityViolation(_)));
    }
}
