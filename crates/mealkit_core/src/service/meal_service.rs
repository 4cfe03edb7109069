//! Meal use-case service.
//!
//! # Responsibility
//! - Provide the entry points UI callers use for meals, ingredients and the
//!   shopping cart.
//! - Publish change signals after writes that make other listings stale.
//!
//! # Invariants
//! - New ingredients are inserted at the front of the list.
//! - Cart lines carry the originating meal's name in `note`.
//! - Cart lines are never moved into the cart again.

use crate::events::{ChangeBus, ChangeSignal};
use crate::model::meal::{validate_ingredients, MealCategory, MealId, MealRecord};
use crate::repo::meal_repo::{MealRepository, RepoError, RepoResult};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for meal use-cases.
#[derive(Debug)]
pub enum MealServiceError {
    /// Ingredient text is blank.
    InvalidIngredient,
    IngredientIndexOutOfRange {
        id: MealId,
        index: usize,
        len: usize,
    },
    /// The meal is already a cart line.
    CartLineNotMovable(MealId),
    MealNotFound(MealId),
    Repo(RepoError),
}

impl Display for MealServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidIngredient => write!(f, "ingredient must not be empty"),
            Self::IngredientIndexOutOfRange { id, index, len } => write!(
                f,
                "ingredient index {index} out of range for meal {id} with {len} ingredients"
            ),
            Self::CartLineNotMovable(id) => write!(f, "cart line cannot be moved to cart: {id}"),
            Self::MealNotFound(id) => write!(f, "meal not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for MealServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for MealServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::MealNotFound(id),
            other => Self::Repo(other),
        }
    }
}

pub type MealServiceResult<T> = Result<T, MealServiceError>;

/// Meal service facade over a repository and a change bus.
pub struct MealService<R: MealRepository> {
    repo: R,
    changes: ChangeBus,
}

impl<R: MealRepository> MealService<R> {
    /// Creates a service with its own change bus.
    pub fn new(repo: R) -> Self {
        Self::with_change_bus(repo, ChangeBus::new())
    }

    /// Creates a service publishing to a shared change bus.
    pub fn with_change_bus(repo: R, changes: ChangeBus) -> Self {
        Self { repo, changes }
    }

    pub fn change_bus(&self) -> &ChangeBus {
        &self.changes
    }

    pub fn create_meal(
        &self,
        name: &str,
        note: &str,
        category: MealCategory,
    ) -> RepoResult<MealRecord> {
        self.repo.create_meal(name, note, category)
    }

    pub fn list_meals(&self, category: MealCategory, archived: bool) -> RepoResult<Vec<MealRecord>> {
        self.repo.list_meals(category, archived)
    }

    pub fn get_meal(&self, id: MealId) -> RepoResult<Option<MealRecord>> {
        self.repo.get_meal(id)
    }

    pub fn set_archived(&self, archived: bool, id: MealId) -> MealServiceResult<()> {
        Ok(self.repo.set_archived(archived, id)?)
    }

    /// Archives an active meal or restores an archived one. Returns the new
    /// flag.
    pub fn toggle_archived(&self, id: MealId) -> MealServiceResult<bool> {
        let archived = self
            .repo
            .is_archived(id)?
            .ok_or(MealServiceError::MealNotFound(id))?;
        self.repo.set_archived(!archived, id)?;
        Ok(!archived)
    }

    pub fn delete_meal(&self, id: MealId) -> RepoResult<()> {
        self.repo.delete_meal(id)
    }

    /// Removes every meal and cart line.
    pub fn wipe_all(&self) -> RepoResult<usize> {
        let removed = self.repo.wipe_all()?;
        info!("event=meal_wipe module=service status=ok removed={removed}");
        Ok(removed)
    }

    /// Overwrites the ingredient list and publishes `MealsChanged`. Blank
    /// entries are rejected before anything is written.
    pub fn replace_ingredients(&self, ingredients: &[String], id: MealId) -> MealServiceResult<()> {
        validate_ingredients(ingredients).map_err(|_| MealServiceError::InvalidIngredient)?;
        self.repo.replace_ingredients(ingredients, id)?;
        self.changes.publish(ChangeSignal::MealsChanged);
        Ok(())
    }

    /// Inserts `ingredient` at the front of the meal's list.
    pub fn add_ingredient(&self, id: MealId, ingredient: &str) -> MealServiceResult<MealRecord> {
        let ingredient = ingredient.trim();
        if ingredient.is_empty() {
            return Err(MealServiceError::InvalidIngredient);
        }

        let mut meal = self.require_meal(id)?;
        meal.ingredients.insert(0, ingredient.to_string());
        self.replace_ingredients(&meal.ingredients, id)?;
        Ok(meal)
    }

    /// Removes the ingredient at `index`.
    pub fn remove_ingredient(&self, id: MealId, index: usize) -> MealServiceResult<MealRecord> {
        let mut meal = self.require_meal(id)?;
        if index >= meal.ingredients.len() {
            return Err(MealServiceError::IngredientIndexOutOfRange {
                id,
                index,
                len: meal.ingredients.len(),
            });
        }

        meal.ingredients.remove(index);
        self.replace_ingredients(&meal.ingredients, id)?;
        Ok(meal)
    }

    /// Adds one ingredient of a meal to the cart as its own line.
    pub fn add_ingredient_to_cart(
        &self,
        id: MealId,
        index: usize,
    ) -> MealServiceResult<MealRecord> {
        let meal = self.require_meal(id)?;
        let Some(ingredient) = meal.ingredients.get(index) else {
            return Err(MealServiceError::IngredientIndexOutOfRange {
                id,
                index,
                len: meal.ingredients.len(),
            });
        };

        let line = self
            .repo
            .create_meal(ingredient, &meal.name, MealCategory::Cart)?;
        self.changes.publish(ChangeSignal::CartChanged);
        Ok(line)
    }

    /// Moves a meal into the cart: one line per ingredient, or a single line
    /// named after the meal when it has no ingredients. Lines are written in
    /// one transaction, so a failure adds nothing to the cart.
    pub fn move_meal_to_cart(&self, id: MealId) -> MealServiceResult<Vec<MealRecord>> {
        let meal = self.require_meal(id)?;
        if meal.category.is_cart() {
            return Err(MealServiceError::CartLineNotMovable(id));
        }

        let line_names: Vec<&str> = if meal.ingredients.is_empty() {
            vec![meal.name.as_str()]
        } else {
            meal.ingredients.iter().map(String::as_str).collect()
        };

        let lines = self
            .repo
            .create_meals(&line_names, &meal.name, MealCategory::Cart)?;

        info!(
            "event=cart_add module=service status=ok meal_id={id} lines={}",
            lines.len()
        );
        self.changes.publish(ChangeSignal::CartChanged);
        Ok(lines)
    }

    fn require_meal(&self, id: MealId) -> MealServiceResult<MealRecord> {
        self.repo
            .get_meal(id)?
            .ok_or(MealServiceError::MealNotFound(id))
    }
}
