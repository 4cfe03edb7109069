//! SQLite implementation of the storage engine primitives.

use super::query::{FetchRequest, Field, FieldValue, Filter};
use super::{StoreError, StoreResult};
use log::{debug, error};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Row, Transaction, TransactionBehavior};
use std::time::Instant;

/// Compile-time schema of one persisted entity kind.
pub trait Entity: Sized {
    /// Typed column names usable in filters, sorts and assignments.
    type Field: Field;

    const TABLE: &'static str;

    /// Columns read by `from_row` and written by `to_values`, in that order.
    const COLUMNS: &'static [&'static str];

    fn from_row(row: &Row<'_>) -> StoreResult<Self>;

    /// Column values in `COLUMNS` order.
    fn to_values(&self) -> StoreResult<Vec<FieldValue>>;
}

/// Storage engine bound to one migrated connection.
pub struct SqliteStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteStore<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Returns the first entity matching `filter`.
    ///
    /// Which row wins among several matches is unspecified; filter on a
    /// unique key.
    pub fn fetch_one<E: Entity>(&self, filter: &Filter<E::Field>) -> StoreResult<Option<E>> {
        let mut binds = Vec::new();
        let predicate = filter.to_sql(&mut binds);
        let sql = format!("{} WHERE {predicate} LIMIT 1;", select_sql::<E>());

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(binds))?;
        if let Some(row) = rows.next()? {
            return Ok(Some(E::from_row(row)?));
        }
        Ok(None)
    }

    /// Returns every entity matching the request filter, in sort-key order,
    /// truncated to the request limit.
    pub fn fetch_all<E: Entity>(&self, request: &FetchRequest<E::Field>) -> StoreResult<Vec<E>> {
        let mut binds = Vec::new();
        let predicate = request.filter.to_sql(&mut binds);
        let mut sql = format!("{} WHERE {predicate}", select_sql::<E>());

        if let Some(order_by) = request.order_by_sql() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&order_by);
        }
        if let Some(limit) = request.limit {
            sql.push_str(" LIMIT ?");
            binds.push(Value::Integer(i64::from(limit)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(binds))?;
        let mut entities = Vec::new();
        while let Some(row) = rows.next()? {
            entities.push(E::from_row(row)?);
        }
        Ok(entities)
    }

    /// Inserts one entity and commits.
    pub fn insert<E: Entity>(&self, entity: &E) -> StoreResult<()> {
        self.insert_many(std::slice::from_ref(entity)).map(|_| ())
    }

    /// Inserts every entity in one transaction. Either all rows are committed
    /// or none are.
    pub fn insert_many<E: Entity>(&self, entities: &[E]) -> StoreResult<usize> {
        if entities.is_empty() {
            return Ok(0);
        }

        let rows = entities
            .iter()
            .map(|entity| {
                entity
                    .to_values()
                    .map(|values| values.into_iter().map(FieldValue::into_sql).collect::<Vec<_>>())
            })
            .collect::<StoreResult<Vec<_>>>()?;
        let placeholders = vec!["?"; E::COLUMNS.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({placeholders});",
            E::TABLE,
            E::COLUMNS.join(", ")
        );

        let op = if rows.len() == 1 { "insert" } else { "insert_many" };
        self.commit::<E>(op, |tx| {
            let mut stmt = tx.prepare(&sql)?;
            for values in rows {
                stmt.execute(params_from_iter(values))?;
            }
            Ok(entities.len())
        })
    }

    /// Sets `assignments` on every entity matching `filter` and commits.
    /// Returns the number of rows changed.
    pub fn update_matching<E: Entity>(
        &self,
        filter: &Filter<E::Field>,
        assignments: &[(E::Field, FieldValue)],
    ) -> StoreResult<usize> {
        if assignments.is_empty() {
            return Ok(0);
        }

        let mut binds = assignments
            .iter()
            .map(|(_, value)| value.clone().into_sql())
            .collect::<Vec<_>>();
        let set_clause = assignments
            .iter()
            .map(|(field, _)| format!("{} = ?", field.column()))
            .collect::<Vec<_>>()
            .join(", ");
        let predicate = filter.to_sql(&mut binds);
        let sql = format!("UPDATE {} SET {set_clause} WHERE {predicate};", E::TABLE);

        self.commit::<E>("update", |tx| Ok(tx.execute(&sql, params_from_iter(binds))?))
    }

    /// Removes every entity matching `filter` and commits. Matching nothing
    /// is not an error.
    pub fn delete_matching<E: Entity>(&self, filter: &Filter<E::Field>) -> StoreResult<usize> {
        let mut binds = Vec::new();
        let predicate = filter.to_sql(&mut binds);
        let sql = format!("DELETE FROM {} WHERE {predicate};", E::TABLE);

        self.commit::<E>("delete", |tx| Ok(tx.execute(&sql, params_from_iter(binds))?))
    }

    /// Removes every entity of kind `E` in one statement.
    pub fn delete_all<E: Entity>(&self) -> StoreResult<usize> {
        let sql = format!("DELETE FROM {};", E::TABLE);
        self.commit::<E>("delete_all", |tx| Ok(tx.execute(&sql, [])?))
    }

    /// Runs `write` inside an immediate transaction and commits it.
    ///
    /// The transaction rolls back on drop when `write` or the commit fails.
    fn commit<E: Entity>(
        &self,
        op: &'static str,
        write: impl FnOnce(&Transaction<'_>) -> StoreResult<usize>,
    ) -> StoreResult<usize> {
        let started_at = Instant::now();
        let result = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)
            .map_err(StoreError::from)
            .and_then(|tx| {
                let value = write(&tx)?;
                tx.commit()?;
                Ok(value)
            });

        match &result {
            Ok(rows) => debug!(
                "event=store_write module=store status=ok op={op} table={} rows={rows} duration_ms={}",
                E::TABLE,
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=store_write module=store status=error op={op} table={} duration_ms={} error={err}",
                E::TABLE,
                started_at.elapsed().as_millis()
            ),
        }
        result
    }
}

fn select_sql<E: Entity>() -> String {
    format!("SELECT {} FROM {}", E::COLUMNS.join(", "), E::TABLE)
}
