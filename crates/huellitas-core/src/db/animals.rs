//! Animal database operations.

use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DbResult};
use crate::models::Animal;

fn animal_from_row(row: &Row<'_>) -> rusqlite::Result<Animal> {
    Ok(Animal {
        id: row.get(0)?,
        name: row.get(1)?,
        species: row.get(2)?,
        breed: row.get(3)?,
        weight_kg: row.get(4)?,
        date_of_birth: row.get(5)?,
        owner_name: row.get(6)?,
        notes: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

const ANIMAL_COLUMNS: &str = "id, name, species, breed, weight_kg, \
                              date_of_birth, owner_name, notes, created_at, updated_at";

impl Database {
    /// Insert a new animal.
    pub fn insert_animal(&self, animal: &Animal) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO animals (
                id, name, species, breed, weight_kg,
                date_of_birth, owner_name, notes, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                animal.id,
                animal.name,
                animal.species,
                animal.breed,
                animal.weight_kg,
                animal.date_of_birth,
                animal.owner_name,
                animal.notes,
                animal.created_at,
                animal.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Update an existing animal.
    pub fn update_animal(&self, animal: &Animal) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE animals SET
                name = ?2,
                species = ?3,
                breed = ?4,
                weight_kg = ?5,
                date_of_birth = ?6,
                owner_name = ?7,
                notes = ?8,
                updated_at = datetime('now')
            WHERE id = ?1
            "#,
            params![
                animal.id,
                animal.name,
                animal.species,
                animal.breed,
                animal.weight_kg,
                animal.date_of_birth,
                animal.owner_name,
                animal.notes,
            ],
        )?;
        Ok(rows_affected > 0)
    }

    /// Get an animal by id.
    pub fn get_animal(&self, id: &str) -> DbResult<Option<Animal>> {
        self.conn
            .query_row(
                &format!("SELECT {ANIMAL_COLUMNS} FROM animals WHERE id = ?"),
                [id],
                animal_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Search animals by name (prefix match).
    pub fn search_animals(&self, query: &str, limit: usize) -> DbResult<Vec<Animal>> {
        let pattern = format!("{}%", query);
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ANIMAL_COLUMNS} FROM animals WHERE name LIKE ? ORDER BY name LIMIT ?"
        ))?;

        let rows = stmt.query_map(params![pattern, limit as i64], animal_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// List all animals.
    pub fn list_animals(&self) -> DbResult<Vec<Animal>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {ANIMAL_COLUMNS} FROM animals ORDER BY name"))?;

        let rows = stmt.query_map([], animal_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn setup_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn test_insert_and_get() {
        let db = setup_db();

        let mut animal = Animal::new("Rex".into(), "canine".into());
        animal.breed = Some("Golden Retriever".into());
        animal.weight_kg = Some(30.0);
        animal.date_of_birth = NaiveDate::from_ymd_opt(2024, 3, 15);

        db.insert_animal(&animal).unwrap();

        let retrieved = db.get_animal(&animal.id).unwrap().unwrap();
        assert_eq!(retrieved.name, "Rex");
        assert_eq!(retrieved.species, "canine");
        assert_eq!(retrieved.breed, Some("Golden Retriever".into()));
        assert_eq!(retrieved.date_of_birth, NaiveDate::from_ymd_opt(2024, 3, 15));
    }

    #[test]
    fn test_update_animal() {
        let db = setup_db();

        let mut animal = Animal::new("Rex".into(), "canine".into());
        db.insert_animal(&animal).unwrap();

        animal.weight_kg = Some(32.0);
        animal.notes = Some("Good boy".into());
        db.update_animal(&animal).unwrap();

        let retrieved = db.get_animal(&animal.id).unwrap().unwrap();
        assert_eq!(retrieved.weight_kg, Some(32.0));
        assert_eq!(retrieved.notes, Some("Good boy".into()));
    }

    #[test]
    fn test_search_animals() {
        let db = setup_db();

        db.insert_animal(&Animal::new("Max".into(), "canine".into())).unwrap();
        db.insert_animal(&Animal::new("Maxine".into(), "feline".into())).unwrap();
        db.insert_animal(&Animal::new("Luna".into(), "canine".into())).unwrap();

        let results = db.search_animals("Max", 10).unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().any(|a| a.name == "Max"));
        assert!(results.iter().any(|a| a.name == "Maxine"));
    }

    #[test]
    fn test_get_missing_animal() {
        let db = setup_db();
        assert!(db.get_animal("nope").unwrap().is_none());
    }
}
