use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A person who can hold address segments.
///
/// Persons are managed elsewhere in the wider system; this table exists so
/// the store can enforce the foreign key and the existence check, and so the
/// seeding CLI can create test subjects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Person {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
}

impl Person {
    pub fn new(first_name: &str, last_name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
        }
    }
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS persons (
            id TEXT PRIMARY KEY,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    // ==========================================================================
    // Address segments table
    // The integer row id is the insertion order; the latest segment for a
    // person is the one with the greatest id. end_date NULL = open segment.
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS address_segments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            segment_uuid TEXT UNIQUE NOT NULL,
            person_id TEXT NOT NULL REFERENCES persons(id),
            street_one TEXT NOT NULL,
            street_two TEXT,
            city TEXT NOT NULL,
            state TEXT NOT NULL,
            zip_code TEXT NOT NULL,
            start_date TEXT NOT NULL,
            end_date TEXT,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_segments_person ON address_segments(person_id)",
        [],
    )?;

    Ok(())
}

pub fn insert_person(conn: &Connection, person: &Person) -> Result<()> {
    conn.execute(
        "INSERT INTO persons (id, first_name, last_name) VALUES (?1, ?2, ?3)",
        params![
            person.id.to_string(),
            person.first_name,
            person.last_name,
        ],
    )?;

    Ok(())
}

pub fn get_person(conn: &Connection, person_id: Uuid) -> rusqlite::Result<Option<Person>> {
    conn.query_row(
        "SELECT id, first_name, last_name FROM persons WHERE id = ?1",
        params![person_id.to_string()],
        |row| {
            let id_str: String = row.get(0)?;
            Ok(Person {
                id: Uuid::parse_str(&id_str).map_err(|_| rusqlite::Error::InvalidQuery)?,
                first_name: row.get(1)?,
                last_name: row.get(2)?,
            })
        },
    )
    .optional()
}

pub fn list_persons(conn: &Connection) -> Result<Vec<Person>> {
    let mut stmt =
        conn.prepare("SELECT id, first_name, last_name FROM persons ORDER BY created_at")?;

    let persons = stmt
        .query_map([], |row| {
            let id_str: String = row.get(0)?;
            Ok(Person {
                id: Uuid::parse_str(&id_str).map_err(|_| rusqlite::Error::InvalidQuery)?,
                first_name: row.get(1)?,
                last_name: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(persons)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_person_round_trip() {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();

        let person = Person::new("Ada", "Lovelace");
        insert_person(&conn, &person).unwrap();

        let loaded = get_person(&conn, person.id).unwrap().unwrap();
        assert_eq!(loaded.id, person.id);
        assert_eq!(loaded.first_name, "Ada");
        assert_eq!(loaded.last_name, "Lovelace");
    }

    #[test]
    fn test_get_person_unknown_returns_none() {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();

        assert!(get_person(&conn, Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn test_list_persons() {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();

        insert_person(&conn, &Person::new("Grace", "Hopper")).unwrap();
        insert_person(&conn, &Person::new("Alan", "Turing")).unwrap();

        let persons = list_persons(&conn).unwrap();
        assert_eq!(persons.len(), 2);
    }

    #[test]
    fn test_setup_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        setup_database(&conn).unwrap();
    }
}
