use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (contacts)");
        // AUTOINCREMENT keeps ids of deleted rows from being handed out again.
        conn.execute_batch(
            "
            CREATE TABLE contacts (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                full_name   TEXT NOT NULL CHECK (length(full_name) BETWEEN 1 AND 200),
                address     TEXT NOT NULL CHECK (length(address) BETWEEN 1 AND 300),
                phone       TEXT NOT NULL CHECK (length(phone) BETWEEN 1 AND 50),
                photo_url   TEXT,
                created_at  TEXT NOT NULL
            );

            CREATE INDEX idx_contacts_full_name
                ON contacts(full_name, id);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        run(&conn).unwrap();

        let version: i64 = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(version, 1);
    }

    #[test]
    fn empty_required_fields_are_rejected_by_the_table() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();

        let result = conn.execute(
            "INSERT INTO contacts (full_name, address, phone, created_at) VALUES ('', 'a', 'b', 'now')",
            [],
        );
        assert!(result.is_err());
    }
}
