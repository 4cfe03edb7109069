//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `mealkit_core` linkage and storage wiring without a UI.
//! - Keep output deterministic apart from generated ids.
//!
//! Usage: `mealkit_cli [DB_PATH]`. Without a path the store is in-memory.

use mealkit_core::{CoreConfig, MealCategory, MealService, SqliteMealRepository};
use std::error::Error;
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("mealkit_cli error={err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    println!("mealkit_core ping={}", mealkit_core::ping());
    println!("mealkit_core version={}", mealkit_core::core_version());

    let config = match std::env::args_os().nth(1) {
        Some(path) => CoreConfig::with_db_path(path),
        None => CoreConfig::in_memory(),
    };
    config.validate()?;
    let conn = config.open_store()?;
    let service = MealService::new(SqliteMealRepository::try_new(&conn)?);

    let meal = service.create_meal("Banana", "", MealCategory::Snack)?;
    service.add_ingredient(meal.id, "banana")?;
    service.add_ingredient(meal.id, "peanut butter")?;
    let lines = service.move_meal_to_cart(meal.id)?;
    println!("mealkit_core cart_lines_added={}", lines.len());

    for category in MealCategory::ALL {
        let meals = service.list_meals(category, false)?;
        println!("{category}: {}", meals.len());
        for meal in meals {
            println!("  - {} [{}] {}", meal.name, meal.ingredients.join(", "), meal.note);
        }
    }
    Ok(())
}
