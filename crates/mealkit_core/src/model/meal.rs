//! Meal domain model.
//!
//! # Responsibility
//! - Define the meal record returned to callers and its stored form.
//! - Own the category tag set and its persisted spelling.
//!
//! # Invariants
//! - `id` is stable and never reused for another meal.
//! - `created_at` is assigned once at creation.
//! - `archived` starts as `false`.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Stable identifier for meals and cart lines.
pub type MealId = Uuid;

/// Category tag. `Cart` marks shopping-cart lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MealCategory {
    Snack,
    Breakfast,
    Lunch,
    Dinner,
    Cart,
}

impl MealCategory {
    /// Every category in tab order.
    pub const ALL: [MealCategory; 5] = [
        MealCategory::Snack,
        MealCategory::Breakfast,
        MealCategory::Lunch,
        MealCategory::Dinner,
        MealCategory::Cart,
    ];

    /// Persisted tag. Snacks are stored in the plural.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Snack => "snacks",
            Self::Breakfast => "breakfast",
            Self::Lunch => "lunch",
            Self::Dinner => "dinner",
            Self::Cart => "cart",
        }
    }

    pub fn is_cart(self) -> bool {
        self == Self::Cart
    }
}

impl Display for MealCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown category tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCategory(pub String);

impl Display for UnknownCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown meal category `{}`", self.0)
    }
}

impl Error for UnknownCategory {}

impl FromStr for MealCategory {
    type Err = UnknownCategory;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "snacks" => Ok(Self::Snack),
            "breakfast" => Ok(Self::Breakfast),
            "lunch" => Ok(Self::Lunch),
            "dinner" => Ok(Self::Dinner),
            "cart" => Ok(Self::Cart),
            other => Err(UnknownCategory(other.to_string())),
        }
    }
}

/// Immutable snapshot of one meal handed to callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MealRecord {
    pub id: MealId,
    pub name: String,
    /// For cart lines: the meal the line was added from.
    pub note: String,
    pub category: MealCategory,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    /// Newest first.
    pub ingredients: Vec<String>,
}

/// Stored form of a meal: the record plus its archive flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Meal {
    pub record: MealRecord,
    pub archived: bool,
}

/// Validation errors for meal writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MealValidationError {
    EmptyName,
    /// Ingredient at `index` is blank.
    EmptyIngredient { index: usize },
}

impl Display for MealValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "meal name must not be empty"),
            Self::EmptyIngredient { index } => {
                write!(f, "ingredient at index {index} must not be empty")
            }
        }
    }
}

impl Error for MealValidationError {}

impl Meal {
    /// Builds a fresh, unarchived meal with a new random id and the current
    /// time as its creation stamp.
    ///
    /// # Errors
    /// - `EmptyName` when `name` is blank.
    pub fn new(
        name: impl Into<String>,
        note: impl Into<String>,
        category: MealCategory,
    ) -> Result<Self, MealValidationError> {
        Self::with_id(Uuid::new_v4(), name, note, category, now_epoch_ms())
    }

    /// Builds a meal with caller-provided identity and timestamp.
    pub fn with_id(
        id: MealId,
        name: impl Into<String>,
        note: impl Into<String>,
        category: MealCategory,
        created_at: i64,
    ) -> Result<Self, MealValidationError> {
        let meal = Self {
            record: MealRecord {
                id,
                name: name.into(),
                note: note.into(),
                category,
                created_at,
                ingredients: Vec::new(),
            },
            archived: false,
        };
        meal.validate()?;
        Ok(meal)
    }

    pub fn validate(&self) -> Result<(), MealValidationError> {
        if self.record.name.trim().is_empty() {
            return Err(MealValidationError::EmptyName);
        }
        validate_ingredients(&self.record.ingredients)
    }

    pub fn id(&self) -> MealId {
        self.record.id
    }

    pub fn into_record(self) -> MealRecord {
        self.record
    }
}

/// Rejects blank ingredient entries. Every ingredient can become a cart
/// line name, so the same non-blank rule applies.
pub fn validate_ingredients(ingredients: &[String]) -> Result<(), MealValidationError> {
    match ingredients
        .iter()
        .position(|ingredient| ingredient.trim().is_empty())
    {
        Some(index) => Err(MealValidationError::EmptyIngredient { index }),
        None => Ok(()),
    }
}

pub(crate) fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
