use std::fs;
use std::path::Path;

use rusqlite::{Connection, OptionalExtension, Row, params};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{PorterError, Result};
use crate::record::{CustomFields, ID_FIELD, Record, parse_record_id};

use super::{ContentStore, run_migrations};

/// A record is stored only if at least one of these is non-empty.
const CONTENT_FIELDS: [&str; 3] = ["post_title", "post_content", "post_excerpt"];

/// Raw `records` row. Expects columns in order: id, record_type, fields
struct RecordRow {
    id: i64,
    record_type: String,
    fields: String,
}

fn map_record_row(row: &Row) -> rusqlite::Result<RecordRow> {
    Ok(RecordRow {
        id: row.get(0)?,
        record_type: row.get(1)?,
        fields: row.get(2)?,
    })
}

impl RecordRow {
    fn into_record(self) -> Result<Record> {
        let stored: Map<String, Value> = serde_json::from_str(&self.fields)?;

        let mut fields = Map::new();
        fields.insert(ID_FIELD.to_string(), Value::from(self.id));
        fields.extend(stored);

        Ok(Record {
            record_type: self.record_type,
            fields,
            custom_fields: CustomFields::new(),
        })
    }
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}

fn check_insertable(record: &Record) -> Result<()> {
    if record.record_type.trim().is_empty() {
        return Err(PorterError::Rejected("record has no type".into()));
    }
    if CONTENT_FIELDS
        .iter()
        .all(|field| is_blank(record.fields.get(*field)))
    {
        return Err(PorterError::Rejected(
            "title, content and excerpt are empty".into(),
        ));
    }
    Ok(())
}

/// SQLite-backed content store.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let mut conn = Connection::open(path)?;
        run_migrations(&mut conn)?;

        Ok(SqliteStore { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        run_migrations(&mut conn)?;
        Ok(SqliteStore { conn })
    }

    pub fn count(&self, record_type: &str) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM records WHERE record_type = ?1",
            params![record_type],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Load one record including its custom fields.
    pub fn get(&self, id: i64) -> Result<Option<Record>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, record_type, fields FROM records WHERE id = ?1",
                params![id],
                map_record_row,
            )
            .optional()?;

        match row {
            Some(row) => {
                let mut record = row.into_record()?;
                record.custom_fields = self.custom_fields_for(id)?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// Every record of a type, without paging.
    pub fn load_all(&self, record_type: &str) -> Result<Vec<Record>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, record_type, fields FROM records WHERE record_type = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![record_type], map_record_row)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?.into_record()?);
        }
        Ok(records)
    }

    fn custom_fields_for(&self, id: i64) -> Result<CustomFields> {
        let mut stmt = self.conn.prepare(
            "SELECT meta_key, meta_value FROM record_meta WHERE record_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut fields = CustomFields::new();
        for row in rows {
            let (key, raw) = row?;
            let value: Value = serde_json::from_str(&raw)?;
            fields.entry(key).or_default().push(value);
        }
        Ok(fields)
    }
}

impl ContentStore for SqliteStore {
    fn query(&self, content_type: &str, limit: usize, offset: usize) -> Result<Vec<Record>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, record_type, fields FROM records
             WHERE record_type = ?1 ORDER BY id LIMIT ?2 OFFSET ?3",
        )?;
        let rows = stmt.query_map(
            params![
                content_type,
                i64::try_from(limit).unwrap_or(i64::MAX),
                i64::try_from(offset).unwrap_or(i64::MAX),
            ],
            map_record_row,
        )?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?.into_record()?);
        }
        Ok(records)
    }

    fn read_custom_fields(&self, record: &Record) -> Result<CustomFields> {
        match record.id().and_then(parse_record_id) {
            Some(id) => self.custom_fields_for(id),
            None => Ok(CustomFields::new()),
        }
    }

    fn insert(&mut self, record: &Record) -> Result<i64> {
        check_insertable(record)?;

        let mut fields = record.fields.clone();
        fields.shift_remove(ID_FIELD);
        let fields_json = serde_json::to_string(&fields)?;

        self.conn.execute(
            "INSERT INTO records (record_type, fields) VALUES (?1, ?2)",
            params![record.record_type, fields_json],
        )?;

        let id = self.conn.last_insert_rowid();
        debug!(id, record_type = %record.record_type, "inserted record");
        Ok(id)
    }

    fn store_custom_field(
        &mut self,
        id: i64,
        field: &str,
        value: &Value,
        unique: bool,
    ) -> Result<bool> {
        if unique {
            let exists: bool = self.conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM record_meta WHERE record_id = ?1 AND meta_key = ?2)",
                params![id, field],
                |row| row.get(0),
            )?;
            if exists {
                return Ok(false);
            }
        }

        self.conn.execute(
            "INSERT INTO record_meta (record_id, meta_key, meta_value) VALUES (?1, ?2, ?3)",
            params![id, field, serde_json::to_string(value)?],
        )?;
        Ok(true)
    }
}
