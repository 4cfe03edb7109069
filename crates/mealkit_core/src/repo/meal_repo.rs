//! Meal repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide meal-domain CRUD over the generic storage engine.
//! - Own the `meals` table schema mapping.
//!
//! # Invariants
//! - Read paths reject unknown categories and malformed rows instead of
//!   masking them.
//! - Write paths that target one meal by id report `NotFound` when the id is
//!   absent; `delete_meal` is the exception and treats absence as a no-op.
//! - `created_at` is never written after insert.

use crate::db::migrations::latest_version;
use crate::db::{table_exists, table_has_column, DbError};
use crate::model::meal::{
    validate_ingredients, Meal, MealCategory, MealId, MealRecord, MealValidationError,
};
use crate::store::{
    Entity, FetchRequest, Field, FieldValue, Filter, SortKey, SqliteStore, StoreError,
    StoreResult,
};
use log::error;
use rusqlite::{Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const MEALS_TABLE: &str = "meals";

pub type RepoResult<T> = Result<T, RepoError>;

/// Error for meal persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(MealValidationError),
    /// Storage transport or commit failure.
    Store(StoreError),
    NotFound(MealId),
    /// Persisted row violates the meal schema (for example an unknown
    /// category). Indicates corruption, not a normal runtime condition.
    InvalidData(String),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "meal not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted meal data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} does not match expected {expected_version}"
            ),
            Self::MissingRequiredTable(table) => write!(f, "missing required table `{table}`"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "missing required column `{table}.{column}`")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<MealValidationError> for RepoError {
    fn from(value: MealValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<StoreError> for RepoError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::InvalidData(message) => Self::InvalidData(message),
            other => Self::Store(other),
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Store(StoreError::Db(value))
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Store(StoreError::from(value))
    }
}

/// Columns of the `meals` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MealField {
    Id,
    Name,
    Note,
    Category,
    CreatedAt,
    Archived,
    Ingredients,
    /// SQLite row order; breaks ties between meals created in the same
    /// millisecond.
    InsertOrder,
}

impl Field for MealField {
    fn column(self) -> &'static str {
        match self {
            Self::Id => "uuid",
            Self::Name => "name",
            Self::Note => "note",
            Self::Category => "category",
            Self::CreatedAt => "created_at",
            Self::Archived => "archived",
            Self::Ingredients => "ingredients",
            Self::InsertOrder => "rowid",
        }
    }
}

impl Entity for Meal {
    type Field = MealField;

    const TABLE: &'static str = MEALS_TABLE;

    const COLUMNS: &'static [&'static str] = &[
        "uuid",
        "name",
        "note",
        "category",
        "created_at",
        "archived",
        "ingredients",
    ];

    fn from_row(row: &Row<'_>) -> StoreResult<Self> {
        let uuid_text: String = row.get("uuid")?;
        let id = Uuid::parse_str(&uuid_text).map_err(|_| {
            StoreError::InvalidData(format!("invalid uuid value `{uuid_text}` in meals.uuid"))
        })?;

        let category_text: String = row.get("category")?;
        let category = category_text
            .parse::<MealCategory>()
            .map_err(|err| StoreError::InvalidData(format!("{err} in meals.category ({id})")))?;

        let archived = match row.get::<_, i64>("archived")? {
            0 => false,
            1 => true,
            other => {
                return Err(StoreError::InvalidData(format!(
                    "invalid archived value `{other}` in meals.archived ({id})"
                )));
            }
        };

        let ingredients_json: String = row.get("ingredients")?;
        let ingredients = serde_json::from_str::<Vec<String>>(&ingredients_json).map_err(|err| {
            StoreError::InvalidData(format!("malformed meals.ingredients ({id}): {err}"))
        })?;

        let meal = Meal {
            record: MealRecord {
                id,
                name: row.get("name")?,
                note: row.get("note")?,
                category,
                created_at: row.get("created_at")?,
                ingredients,
            },
            archived,
        };
        meal.validate()
            .map_err(|err| StoreError::InvalidData(format!("{err} ({id})")))?;
        Ok(meal)
    }

    fn to_values(&self) -> StoreResult<Vec<FieldValue>> {
        let record = &self.record;
        Ok(vec![
            record.id.to_string().into(),
            record.name.as_str().into(),
            record.note.as_str().into(),
            record.category.as_str().into(),
            record.created_at.into(),
            self.archived.into(),
            encode_ingredients(&record.ingredients)?,
        ])
    }
}

/// Repository interface for meal operations.
pub trait MealRepository {
    /// Persists a new meal with a fresh id, the current time, no ingredients
    /// and `archived = false`.
    fn create_meal(&self, name: &str, note: &str, category: MealCategory)
        -> RepoResult<MealRecord>;
    /// Persists one meal per name, sharing `note` and `category`, in a single
    /// transaction. Nothing is written when any name is invalid or the
    /// commit fails.
    fn create_meals(
        &self,
        names: &[&str],
        note: &str,
        category: MealCategory,
    ) -> RepoResult<Vec<MealRecord>>;
    /// Lists meals of one category and archive state, newest first.
    fn list_meals(&self, category: MealCategory, archived: bool) -> RepoResult<Vec<MealRecord>>;
    fn set_archived(&self, archived: bool, id: MealId) -> RepoResult<()>;
    /// Overwrites the whole ingredient list. Blank entries are rejected.
    fn replace_ingredients(&self, ingredients: &[String], id: MealId) -> RepoResult<()>;
    fn get_meal(&self, id: MealId) -> RepoResult<Option<MealRecord>>;
    /// Returns the archive flag, or `None` when the meal does not exist.
    fn is_archived(&self, id: MealId) -> RepoResult<Option<bool>>;
    /// Deletes one meal. Unknown ids are a no-op.
    fn delete_meal(&self, id: MealId) -> RepoResult<()>;
    /// Deletes every meal and cart line. Returns the number removed.
    fn wipe_all(&self) -> RepoResult<usize>;
}

/// SQLite-backed meal repository.
pub struct SqliteMealRepository<'conn> {
    store: SqliteStore<'conn>,
}

impl<'conn> SqliteMealRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    ///
    /// # Errors
    /// - `UninitializedConnection` when migrations have not been applied.
    /// - `MissingRequiredTable`/`MissingRequiredColumn` on schema drift.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_meal_connection_ready(conn)?;
        Ok(Self {
            store: SqliteStore::new(conn),
        })
    }

    fn fetch_by_id(&self, id: MealId) -> RepoResult<Option<Meal>> {
        self.store
            .fetch_one::<Meal>(&id_filter(id))
            .map_err(|err| log_read_failure("get", err))
    }
}

impl MealRepository for SqliteMealRepository<'_> {
    fn create_meal(
        &self,
        name: &str,
        note: &str,
        category: MealCategory,
    ) -> RepoResult<MealRecord> {
        let meal = Meal::new(name, note, category)?;
        self.store.insert(&meal)?;
        Ok(meal.into_record())
    }

    fn create_meals(
        &self,
        names: &[&str],
        note: &str,
        category: MealCategory,
    ) -> RepoResult<Vec<MealRecord>> {
        let meals = names
            .iter()
            .map(|name| Meal::new(*name, note, category))
            .collect::<Result<Vec<_>, _>>()?;
        self.store.insert_many(&meals)?;
        Ok(meals.into_iter().map(Meal::into_record).collect())
    }

    fn list_meals(&self, category: MealCategory, archived: bool) -> RepoResult<Vec<MealRecord>> {
        let request = FetchRequest::filtered(
            Filter::equals(MealField::Category, category.as_str())
                .and(Filter::equals(MealField::Archived, archived)),
        )
        .sorted_by(SortKey::desc(MealField::CreatedAt))
        .sorted_by(SortKey::desc(MealField::InsertOrder));

        let meals = self
            .store
            .fetch_all::<Meal>(&request)
            .map_err(|err| log_read_failure("list", err))?;
        Ok(meals.into_iter().map(Meal::into_record).collect())
    }

    fn set_archived(&self, archived: bool, id: MealId) -> RepoResult<()> {
        let changed = self
            .store
            .update_matching::<Meal>(&id_filter(id), &[(MealField::Archived, archived.into())])?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }

    fn replace_ingredients(&self, ingredients: &[String], id: MealId) -> RepoResult<()> {
        validate_ingredients(ingredients)?;
        let encoded = encode_ingredients(ingredients)?;
        let changed = self
            .store
            .update_matching::<Meal>(&id_filter(id), &[(MealField::Ingredients, encoded)])?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }

    fn get_meal(&self, id: MealId) -> RepoResult<Option<MealRecord>> {
        Ok(self.fetch_by_id(id)?.map(Meal::into_record))
    }

    fn is_archived(&self, id: MealId) -> RepoResult<Option<bool>> {
        Ok(self.fetch_by_id(id)?.map(|meal| meal.archived))
    }

    fn delete_meal(&self, id: MealId) -> RepoResult<()> {
        self.store.delete_matching::<Meal>(&id_filter(id))?;
        Ok(())
    }

    fn wipe_all(&self) -> RepoResult<usize> {
        Ok(self.store.delete_all::<Meal>()?)
    }
}

fn id_filter(id: MealId) -> Filter<MealField> {
    Filter::equals(MealField::Id, id.to_string())
}

fn encode_ingredients(ingredients: &[String]) -> StoreResult<FieldValue> {
    serde_json::to_string(ingredients)
        .map(FieldValue::Text)
        .map_err(|err| StoreError::Encode(format!("meals.ingredients: {err}")))
}

fn log_read_failure(op: &'static str, err: StoreError) -> RepoError {
    let error_code = match &err {
        StoreError::InvalidData(_) => "invalid_data",
        _ => "store_failed",
    };
    error!(
        "event=meal_read module=repo status=error op={op} error_code={error_code} error={err}"
    );
    err.into()
}

fn ensure_meal_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    if !table_exists(conn, MEALS_TABLE)? {
        return Err(RepoError::MissingRequiredTable(MEALS_TABLE));
    }

    for &column in <Meal as Entity>::COLUMNS {
        if !table_has_column(conn, MEALS_TABLE, column)? {
            return Err(RepoError::MissingRequiredColumn {
                table: MEALS_TABLE,
                column,
            });
        }
    }

    Ok(())
}
