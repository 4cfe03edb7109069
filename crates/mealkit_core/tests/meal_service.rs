use mealkit_core::db::open_db_in_memory;
use mealkit_core::store::StoreError;
use mealkit_core::{
    ChangeBus, ChangeSignal, MealCategory, MealId, MealRecord, MealRepository, MealService,
    MealServiceError, RepoError, RepoResult, SqliteMealRepository,
};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

fn record_signals(bus: &ChangeBus) -> Arc<Mutex<Vec<ChangeSignal>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    for signal in [ChangeSignal::MealsChanged, ChangeSignal::CartChanged] {
        let sink = Arc::clone(&seen);
        bus.subscribe(signal, move |signal: ChangeSignal| {
            sink.lock().unwrap().push(signal)
        });
    }
    seen
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

#[test]
fn banana_scenario_end_to_end() {
    let conn = open_db_in_memory().unwrap();
    let service = MealService::new(SqliteMealRepository::try_new(&conn).unwrap());

    let banana = service.create_meal("Banana", "", MealCategory::Snack).unwrap();
    assert!(banana.ingredients.is_empty());

    service
        .replace_ingredients(&strings(&["banana", "peanut butter"]), banana.id)
        .unwrap();
    assert_eq!(
        service.get_meal(banana.id).unwrap().unwrap().ingredients,
        strings(&["banana", "peanut butter"])
    );

    service.set_archived(true, banana.id).unwrap();
    assert!(service
        .list_meals(MealCategory::Snack, false)
        .unwrap()
        .iter()
        .all(|meal| meal.id != banana.id));
    assert!(service
        .list_meals(MealCategory::Snack, true)
        .unwrap()
        .iter()
        .any(|meal| meal.id == banana.id));
}

#[test]
fn add_ingredient_inserts_at_front_and_signals_meals() {
    let conn = open_db_in_memory().unwrap();
    let service = MealService::new(SqliteMealRepository::try_new(&conn).unwrap());
    let seen = record_signals(service.change_bus());
    let meal = service.create_meal("Tacos", "", MealCategory::Dinner).unwrap();

    service.add_ingredient(meal.id, "tortilla").unwrap();
    let updated = service.add_ingredient(meal.id, "  salsa ").unwrap();

    assert_eq!(updated.ingredients, strings(&["salsa", "tortilla"]));
    assert_eq!(
        service.get_meal(meal.id).unwrap().unwrap().ingredients,
        strings(&["salsa", "tortilla"])
    );
    assert_eq!(
        *seen.lock().unwrap(),
        vec![ChangeSignal::MealsChanged, ChangeSignal::MealsChanged]
    );
}

#[test]
fn add_ingredient_rejects_blank_text() {
    let conn = open_db_in_memory().unwrap();
    let service = MealService::new(SqliteMealRepository::try_new(&conn).unwrap());
    let meal = service.create_meal("Tacos", "", MealCategory::Dinner).unwrap();

    let err = service.add_ingredient(meal.id, "   ").unwrap_err();
    assert!(matches!(err, MealServiceError::InvalidIngredient));
}

#[test]
fn remove_ingredient_by_index() {
    let conn = open_db_in_memory().unwrap();
    let service = MealService::new(SqliteMealRepository::try_new(&conn).unwrap());
    let meal = service.create_meal("Soup", "", MealCategory::Lunch).unwrap();
    service
        .replace_ingredients(&strings(&["leek", "potato", "stock"]), meal.id)
        .unwrap();

    let updated = service.remove_ingredient(meal.id, 1).unwrap();
    assert_eq!(updated.ingredients, strings(&["leek", "stock"]));

    let err = service.remove_ingredient(meal.id, 2).unwrap_err();
    assert!(matches!(
        err,
        MealServiceError::IngredientIndexOutOfRange { index: 2, len: 2, .. }
    ));
}

#[test]
fn add_ingredient_to_cart_creates_line_noted_with_meal_name() {
    let conn = open_db_in_memory().unwrap();
    let service = MealService::new(SqliteMealRepository::try_new(&conn).unwrap());
    let seen = record_signals(service.change_bus());
    let meal = service.create_meal("Pesto Pasta", "", MealCategory::Dinner).unwrap();
    service
        .replace_ingredients(&strings(&["basil", "pine nuts"]), meal.id)
        .unwrap();
    seen.lock().unwrap().clear();

    let line = service.add_ingredient_to_cart(meal.id, 1).unwrap();

    assert_eq!(line.name, "pine nuts");
    assert_eq!(line.note, "Pesto Pasta");
    assert_eq!(line.category, MealCategory::Cart);
    assert_eq!(service.list_meals(MealCategory::Cart, false).unwrap(), vec![line]);
    assert_eq!(*seen.lock().unwrap(), vec![ChangeSignal::CartChanged]);
}

#[test]
fn move_meal_with_ingredients_creates_one_line_each() {
    let conn = open_db_in_memory().unwrap();
    let service = MealService::new(SqliteMealRepository::try_new(&conn).unwrap());
    let seen = record_signals(service.change_bus());
    let meal = service.create_meal("Omelette", "", MealCategory::Breakfast).unwrap();
    service
        .replace_ingredients(&strings(&["eggs", "cheese", "eggs"]), meal.id)
        .unwrap();
    seen.lock().unwrap().clear();

    let lines = service.move_meal_to_cart(meal.id).unwrap();

    let names: Vec<_> = lines.iter().map(|line| line.name.as_str()).collect();
    assert_eq!(names, vec!["eggs", "cheese", "eggs"]);
    assert!(lines.iter().all(|line| line.note == "Omelette"));
    assert_eq!(service.list_meals(MealCategory::Cart, false).unwrap().len(), 3);
    assert_eq!(*seen.lock().unwrap(), vec![ChangeSignal::CartChanged]);
    assert_eq!(
        service.get_meal(meal.id).unwrap().unwrap().category,
        MealCategory::Breakfast
    );
}

#[test]
fn move_meal_without_ingredients_creates_single_line_named_after_meal() {
    let conn = open_db_in_memory().unwrap();
    let service = MealService::new(SqliteMealRepository::try_new(&conn).unwrap());
    let meal = service.create_meal("Apple", "", MealCategory::Snack).unwrap();

    let lines = service.move_meal_to_cart(meal.id).unwrap();

    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].name, "Apple");
    assert_eq!(lines[0].note, "Apple");
    assert!(lines[0].ingredients.is_empty());
}

#[test]
fn failed_move_to_cart_leaves_cart_untouched() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TRIGGER reject_sprouts BEFORE INSERT ON meals
         WHEN NEW.name = 'sprouts'
         BEGIN
             SELECT RAISE(ABORT, 'sprouts rejected');
         END;",
    )
    .unwrap();
    let service = MealService::new(SqliteMealRepository::try_new(&conn).unwrap());
    let meal = service.create_meal("Stir Fry", "", MealCategory::Dinner).unwrap();
    service
        .replace_ingredients(&strings(&["milk", "noodles", "sprouts"]), meal.id)
        .unwrap();
    let seen = record_signals(service.change_bus());

    let err = service.move_meal_to_cart(meal.id).unwrap_err();

    assert!(matches!(err, MealServiceError::Repo(RepoError::Store(_))));
    assert!(service.list_meals(MealCategory::Cart, false).unwrap().is_empty());
    assert!(seen.lock().unwrap().is_empty());
}

#[test]
fn replace_ingredients_rejects_blank_entries_without_writing() {
    let conn = open_db_in_memory().unwrap();
    let service = MealService::new(SqliteMealRepository::try_new(&conn).unwrap());
    let meal = service.create_meal("Cereal", "", MealCategory::Breakfast).unwrap();
    service
        .replace_ingredients(&strings(&["oats"]), meal.id)
        .unwrap();
    let seen = record_signals(service.change_bus());

    let err = service
        .replace_ingredients(&strings(&["milk", " "]), meal.id)
        .unwrap_err();

    assert!(matches!(err, MealServiceError::InvalidIngredient));
    assert_eq!(
        service.get_meal(meal.id).unwrap().unwrap().ingredients,
        strings(&["oats"])
    );
    assert!(seen.lock().unwrap().is_empty());
}

#[test]
fn cart_lines_cannot_be_moved_to_cart() {
    let conn = open_db_in_memory().unwrap();
    let service = MealService::new(SqliteMealRepository::try_new(&conn).unwrap());
    let line = service.create_meal("milk", "Cereal", MealCategory::Cart).unwrap();

    let err = service.move_meal_to_cart(line.id).unwrap_err();
    assert!(matches!(err, MealServiceError::CartLineNotMovable(id) if id == line.id));
}

#[test]
fn toggle_archived_flips_flag_and_reports_missing_meal() {
    let conn = open_db_in_memory().unwrap();
    let service = MealService::new(SqliteMealRepository::try_new(&conn).unwrap());
    let meal = service.create_meal("Ramen", "", MealCategory::Lunch).unwrap();

    assert!(service.toggle_archived(meal.id).unwrap());
    assert!(service.list_meals(MealCategory::Lunch, false).unwrap().is_empty());
    assert!(!service.toggle_archived(meal.id).unwrap());
    assert_eq!(service.list_meals(MealCategory::Lunch, false).unwrap().len(), 1);

    let missing = Uuid::new_v4();
    let err = service.toggle_archived(missing).unwrap_err();
    assert!(matches!(err, MealServiceError::MealNotFound(id) if id == missing));
}

#[test]
fn missing_meal_maps_to_meal_not_found() {
    let conn = open_db_in_memory().unwrap();
    let service = MealService::new(SqliteMealRepository::try_new(&conn).unwrap());
    let missing = Uuid::new_v4();

    assert!(matches!(
        service.add_ingredient(missing, "salt").unwrap_err(),
        MealServiceError::MealNotFound(_)
    ));
    assert!(matches!(
        service.set_archived(true, missing).unwrap_err(),
        MealServiceError::MealNotFound(_)
    ));
    assert!(matches!(
        service.move_meal_to_cart(missing).unwrap_err(),
        MealServiceError::MealNotFound(_)
    ));
}

#[test]
fn shared_bus_reaches_observers_of_other_screens() {
    let conn = open_db_in_memory().unwrap();
    let bus = ChangeBus::new();
    let cart_refreshes = Arc::new(Mutex::new(0));
    let counter = Arc::clone(&cart_refreshes);
    bus.subscribe(ChangeSignal::CartChanged, move |_: ChangeSignal| {
        *counter.lock().unwrap() += 1;
    });
    let service =
        MealService::with_change_bus(SqliteMealRepository::try_new(&conn).unwrap(), bus.clone());
    let meal = service.create_meal("Curry", "", MealCategory::Dinner).unwrap();

    service.move_meal_to_cart(meal.id).unwrap();
    service.move_meal_to_cart(meal.id).unwrap();

    assert_eq!(*cart_refreshes.lock().unwrap(), 2);
}

#[test]
fn wipe_all_clears_meals_and_cart() {
    let conn = open_db_in_memory().unwrap();
    let service = MealService::new(SqliteMealRepository::try_new(&conn).unwrap());
    let meal = service.create_meal("Pizza", "", MealCategory::Dinner).unwrap();
    service.move_meal_to_cart(meal.id).unwrap();

    assert_eq!(service.wipe_all().unwrap(), 2);
    for category in MealCategory::ALL {
        assert!(service.list_meals(category, false).unwrap().is_empty());
    }
}

/// Repository double whose writes always fail after reads succeed.
struct FailingWrites {
    meal: MealRecord,
}

impl FailingWrites {
    fn failure() -> RepoError {
        RepoError::Store(StoreError::Encode("disk full".to_string()))
    }
}

impl MealRepository for FailingWrites {
    fn create_meal(&self, _: &str, _: &str, _: MealCategory) -> RepoResult<MealRecord> {
        Err(Self::failure())
    }

    fn create_meals(&self, _: &[&str], _: &str, _: MealCategory) -> RepoResult<Vec<MealRecord>> {
        Err(Self::failure())
    }

    fn list_meals(&self, _: MealCategory, _: bool) -> RepoResult<Vec<MealRecord>> {
        Ok(vec![self.meal.clone()])
    }

    fn set_archived(&self, _: bool, _: MealId) -> RepoResult<()> {
        Err(Self::failure())
    }

    fn replace_ingredients(&self, _: &[String], _: MealId) -> RepoResult<()> {
        Err(Self::failure())
    }

    fn get_meal(&self, id: MealId) -> RepoResult<Option<MealRecord>> {
        Ok((id == self.meal.id).then(|| self.meal.clone()))
    }

    fn is_archived(&self, id: MealId) -> RepoResult<Option<bool>> {
        Ok((id == self.meal.id).then_some(false))
    }

    fn delete_meal(&self, _: MealId) -> RepoResult<()> {
        Err(Self::failure())
    }

    fn wipe_all(&self) -> RepoResult<usize> {
        Err(Self::failure())
    }
}

#[test]
fn failed_writes_surface_errors_and_publish_nothing() {
    let meal = MealRecord {
        id: Uuid::new_v4(),
        name: "Bagel".to_string(),
        note: String::new(),
        category: MealCategory::Breakfast,
        created_at: 1,
        ingredients: strings(&["cream cheese"]),
    };
    let service = MealService::new(FailingWrites { meal: meal.clone() });
    let seen = record_signals(service.change_bus());

    assert!(matches!(
        service.add_ingredient(meal.id, "lox").unwrap_err(),
        MealServiceError::Repo(RepoError::Store(_))
    ));
    assert!(matches!(
        service.move_meal_to_cart(meal.id).unwrap_err(),
        MealServiceError::Repo(RepoError::Store(_))
    ));
    assert!(service.wipe_all().is_err());
    assert!(seen.lock().unwrap().is_empty());
}
