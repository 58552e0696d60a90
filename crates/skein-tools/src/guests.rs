use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use tracing::debug;

use skein_core::error::{Result, SkeinError};

const BUNDLED_INVITEES: &str = include_str!("../data/invitees.json");

/// One invitee of the gala.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Guest {
    pub name: String,
    pub relation: String,
    pub description: String,
    pub email: String,
}

impl Guest {
    /// Text document shown to the assistant.
    pub fn document(&self) -> String {
        format!(
            "Name: {}\nRelation: {}\nDescription: {}\nEmail: {}",
            self.name, self.relation, self.description, self.email
        )
    }
}

/// In-memory SQLite FTS5 index over the invitee list, ranked by `bm25()`.
pub struct GuestIndex {
    conn: Mutex<Connection>,
    len: usize,
}

impl GuestIndex {
    /// Index the bundled invitee list.
    pub fn bundled() -> Result<Self> {
        let guests: Vec<Guest> = serde_json::from_str(BUNDLED_INVITEES)?;
        Self::from_guests(&guests)
    }

    /// Index a JSON file holding an array of guests.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let guests: Vec<Guest> = serde_json::from_str(&content)?;
        debug!(path = %path.display(), guests = guests.len(), "Loaded invitee list");
        Self::from_guests(&guests)
    }

    pub fn from_guests(guests: &[Guest]) -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| SkeinError::Database(e.to_string()))?;

        conn.execute_batch(
            "CREATE VIRTUAL TABLE guests USING fts5(
                name,
                relation,
                description,
                email,
                tokenize='porter unicode61'
            );",
        )
        .map_err(|e| SkeinError::Database(e.to_string()))?;

        {
            let mut stmt = conn
                .prepare(
                    "INSERT INTO guests (name, relation, description, email)
                     VALUES (?1, ?2, ?3, ?4)",
                )
                .map_err(|e| SkeinError::Database(e.to_string()))?;
            for g in guests {
                stmt.execute(params![g.name, g.relation, g.description, g.email])
                    .map_err(|e| SkeinError::Database(e.to_string()))?;
            }
        }

        debug!(guests = guests.len(), "Guest index built");
        Ok(Self {
            conn: Mutex::new(conn),
            len: guests.len(),
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Best matches first. A query with no searchable terms matches nothing.
    pub fn search(&self, query: &str, limit: usize) -> Result<Vec<Guest>> {
        let Some(fts_query) = to_fts_query(query) else {
            return Ok(Vec::new());
        };

        let conn = self
            .conn
            .lock()
            .map_err(|e| SkeinError::Database(e.to_string()))?;

        let mut stmt = conn
            .prepare(
                "SELECT name, relation, description, email
                 FROM guests
                 WHERE guests MATCH ?1
                 ORDER BY bm25(guests)
                 LIMIT ?2",
            )
            .map_err(|e| SkeinError::Database(e.to_string()))?;

        let rows = stmt
            .query_map(params![fts_query, limit as i64], |row| {
                Ok(Guest {
                    name: row.get(0)?,
                    relation: row.get(1)?,
                    description: row.get(2)?,
                    email: row.get(3)?,
                })
            })
            .map_err(|e| SkeinError::Database(e.to_string()))?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row.map_err(|e| SkeinError::Database(e.to_string()))?);
        }
        Ok(results)
    }
}

/// Turn free text into an FTS5 query: every alphanumeric term, quoted,
/// OR-ed together. Quoting keeps FTS5 operators in user text inert.
fn to_fts_query(query: &str) -> Option<String> {
    let terms: Vec<String> = query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| format!("\"{}\"", t.to_lowercase()))
        .collect();
    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" OR "))
    }
}
