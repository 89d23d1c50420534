//! `SQLite`-backed record store.
//!
//! Stores the ledger in a local `SQLite` file via `switchy_database`. The
//! schema is created on open; dates are stored as `YYYY-MM-DD` text so they
//! compare and group correctly with plain SQL.

use std::path::Path;

use async_trait::async_trait;
use chrono::NaiveDate;
use geopark_database_models::{GroupField, GroupRow, RecordFilter, RecordOrder};
use geopark_tuban_models::{
    Event, NewEvent, NewViolationRecord, RectifyStatus, ViolationRecord, YesNo,
};
use moosicbox_json_utils::database::ToValue as _;
use switchy_database::{Database, DatabaseValue};
use switchy_database_connection::init_sqlite_rusqlite;

use crate::{RecordStore, RecordWriter, StoreError};

const DATE_FORMAT: &str = "%Y-%m-%d";

const RECORD_COLUMNS: &str = "t.id, t.tuban_code, t.park_name, t.func_zone, t.facility_name,
    t.longitude, t.latitude, t.area, t.problem_type, t.problem_desc, t.impact_level,
    t.rectify_status, t.is_closed, t.discover_time, t.rectify_deadline,
    t.rectify_verify_time, t.is_deleted";

/// A [`RecordStore`] over a `SQLite` database.
pub struct SqliteStore {
    db: Box<dyn Database>,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore").finish_non_exhaustive()
    }
}

impl SqliteStore {
    /// Opens (or creates) the database at `path` and ensures the schema
    /// exists.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the parent directory cannot be created, the
    /// database cannot be opened, or schema creation fails.
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let db = init_sqlite_rusqlite(Some(path)).map_err(|e| StoreError::Connection(e.to_string()))?;

        Self::from_database(db).await
    }

    /// Wraps an already-open connection, creating the schema if needed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if schema creation fails.
    pub async fn from_database(db: Box<dyn Database>) -> Result<Self, StoreError> {
        ensure_schema(db.as_ref()).await?;
        Ok(Self { db })
    }

    /// Creates an active event and returns its ID.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the database operation fails.
    pub async fn create_event(&self, event: &NewEvent) -> Result<i64, StoreError> {
        let now = chrono::Utc::now().to_rfc3339();
        let rows = self
            .db
            .query_raw_params(
                "INSERT INTO events (
                    event_name, event_type, issue_date, description, is_active,
                    created_at, updated_at
                 ) VALUES ($1, $2, $3, $4, 1, $5, $6)
                 RETURNING id",
                &[
                    DatabaseValue::String(event.event_name.clone()),
                    opt_str(event.event_type.as_deref()),
                    opt_date(event.issue_date),
                    opt_str(event.description.as_deref()),
                    DatabaseValue::String(now.clone()),
                    DatabaseValue::String(now),
                ],
            )
            .await?;

        let row = rows.first().ok_or_else(|| StoreError::Conversion {
            message: "Failed to get event id from insert".to_string(),
        })?;

        row.to_value("id").map_err(conversion("events.id"))
    }

    /// Shows or hides an event in the map filter choices. Returns `false`
    /// if no event had that ID.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the database operation fails.
    pub async fn set_event_active(&self, event_id: i64, active: bool) -> Result<bool, StoreError> {
        let updated = self
            .db
            .exec_raw_params(
                "UPDATE events SET is_active = $1, updated_at = $2 WHERE id = $3",
                &[
                    DatabaseValue::Int64(i64::from(active)),
                    DatabaseValue::String(chrono::Utc::now().to_rfc3339()),
                    DatabaseValue::Int64(event_id),
                ],
            )
            .await?;

        Ok(updated > 0)
    }

    /// Links a record to an existing event.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownEvent`] if the event does not exist, or
    /// another [`StoreError`] if the database operation fails.
    pub async fn link_event(&self, tuban_id: i64, event_id: i64) -> Result<(), StoreError> {
        let found = self
            .db
            .query_raw_params(
                "SELECT 1 as found FROM events WHERE id = $1",
                &[DatabaseValue::Int64(event_id)],
            )
            .await?;
        if found.is_empty() {
            return Err(StoreError::UnknownEvent(event_id));
        }

        let now = chrono::Utc::now().to_rfc3339();

        self.db
            .exec_raw_params(
                "INSERT OR IGNORE INTO tuban_events (tuban_id, event_id, added_at)
                 VALUES ($1, $2, $3)",
                &[
                    DatabaseValue::Int64(tuban_id),
                    DatabaseValue::Int64(event_id),
                    DatabaseValue::String(now),
                ],
            )
            .await?;

        Ok(())
    }

    /// Marks a record as deleted. Returns `false` if no live record had
    /// that ID.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the database operation fails.
    pub async fn soft_delete(&self, id: i64) -> Result<bool, StoreError> {
        let updated = self
            .db
            .exec_raw_params(
                "UPDATE tubans SET is_deleted = 1, updated_at = $1
                 WHERE id = $2 AND is_deleted = 0",
                &[
                    DatabaseValue::String(chrono::Utc::now().to_rfc3339()),
                    DatabaseValue::Int64(id),
                ],
            )
            .await?;

        Ok(updated > 0)
    }
}

/// Creates all tables if they don't already exist.
async fn ensure_schema(db: &dyn Database) -> Result<(), StoreError> {
    db.exec_raw(
        "CREATE TABLE IF NOT EXISTS tubans (
            id                  INTEGER PRIMARY KEY AUTOINCREMENT,
            tuban_code          TEXT NOT NULL UNIQUE,
            park_name           TEXT NOT NULL,
            func_zone           TEXT,
            facility_name       TEXT,
            longitude           REAL,
            latitude            REAL,
            area                REAL,
            image_date          TEXT,
            build_unit          TEXT,
            build_time          TEXT,
            has_approval        TEXT,
            approval_no         TEXT,
            discover_time       TEXT,
            discover_method     TEXT,
            check_time          TEXT,
            check_person        TEXT,
            check_result        TEXT,
            problem_type        TEXT,
            problem_desc        TEXT,
            geo_heritage_type   TEXT,
            impact_level        TEXT,
            is_illegal          TEXT,
            violated_law        TEXT,
            rectify_measure     TEXT,
            rectify_deadline    TEXT,
            rectify_status      TEXT,
            rectify_verify_time TEXT,
            verify_person       TEXT,
            is_closed           TEXT NOT NULL DEFAULT '否',
            is_punished         TEXT,
            punish_type         TEXT,
            fine_amount         REAL,
            punish_doc_no       TEXT,
            data_source         TEXT,
            is_patrol_point     TEXT,
            responsible_dept    TEXT,
            attachments         TEXT,
            remark              TEXT,
            created_at          TEXT NOT NULL,
            updated_at          TEXT NOT NULL,
            is_deleted          INTEGER NOT NULL DEFAULT 0
        )",
    )
    .await?;

    db.exec_raw(
        "CREATE TABLE IF NOT EXISTS events (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            event_name  TEXT NOT NULL,
            event_type  TEXT,
            issue_date  TEXT,
            description TEXT,
            is_active   INTEGER NOT NULL DEFAULT 1,
            created_at  TEXT NOT NULL,
            updated_at  TEXT NOT NULL
        )",
    )
    .await?;

    db.exec_raw(
        "CREATE TABLE IF NOT EXISTS tuban_events (
            tuban_id    INTEGER NOT NULL REFERENCES tubans(id),
            event_id    INTEGER NOT NULL REFERENCES events(id),
            added_at    TEXT NOT NULL,
            PRIMARY KEY (tuban_id, event_id)
        )",
    )
    .await?;

    db.exec_raw(
        "CREATE INDEX IF NOT EXISTS idx_tubans_status
         ON tubans (is_deleted, rectify_status, rectify_deadline)",
    )
    .await?;

    db.exec_raw("CREATE INDEX IF NOT EXISTS idx_tuban_events_event ON tuban_events (event_id)")
        .await?;

    Ok(())
}

fn opt_str(value: Option<&str>) -> DatabaseValue {
    value.map_or(DatabaseValue::Null, |s| DatabaseValue::String(s.to_string()))
}

fn opt_f64(value: Option<f64>) -> DatabaseValue {
    value.map_or(DatabaseValue::Null, DatabaseValue::Real64)
}

fn opt_date(value: Option<NaiveDate>) -> DatabaseValue {
    value.map_or(DatabaseValue::Null, |d| {
        DatabaseValue::String(d.format(DATE_FORMAT).to_string())
    })
}

fn date_param(date: NaiveDate) -> DatabaseValue {
    DatabaseValue::String(date.format(DATE_FORMAT).to_string())
}

/// Builds the WHERE fragments for a [`RecordFilter`]. Soft-deleted rows are
/// always excluded.
fn build_filters(filter: &RecordFilter) -> (Vec<String>, Vec<DatabaseValue>) {
    let mut frags = vec!["t.is_deleted = 0".to_string()];
    let mut params: Vec<DatabaseValue> = Vec::new();
    let mut idx = 1;

    if let Some(status) = &filter.rectify_status {
        frags.push(format!("t.rectify_status = ${idx}"));
        params.push(DatabaseValue::String(status.to_string()));
        idx += 1;
    }

    if !filter.rectify_status_in.is_empty() {
        let mut placeholders = Vec::with_capacity(filter.rectify_status_in.len());
        for status in &filter.rectify_status_in {
            placeholders.push(format!("${idx}"));
            params.push(DatabaseValue::String(status.to_string()));
            idx += 1;
        }
        frags.push(format!("t.rectify_status IN ({})", placeholders.join(", ")));
    }

    if let Some(closed) = filter.is_closed {
        frags.push(format!("t.is_closed = ${idx}"));
        params.push(DatabaseValue::String(closed.to_string()));
        idx += 1;
    }

    if let Some(before) = filter.deadline_before {
        frags.push(format!("t.rectify_deadline < ${idx}"));
        params.push(date_param(before));
        idx += 1;
    }

    if let Some(zone) = &filter.func_zone {
        frags.push(format!("t.func_zone = ${idx}"));
        params.push(DatabaseValue::String(zone.clone()));
        idx += 1;
    }

    if let Some(problem_type) = &filter.problem_type {
        frags.push(format!("t.problem_type = ${idx}"));
        params.push(DatabaseValue::String(problem_type.clone()));
        idx += 1;
    }

    if let Some(event_id) = filter.event_id {
        frags.push(format!(
            "EXISTS (SELECT 1 FROM tuban_events te WHERE te.tuban_id = t.id AND te.event_id = ${idx})"
        ));
        params.push(DatabaseValue::Int64(event_id));
        idx += 1;
    }

    if filter.has_coordinates {
        frags.push("t.longitude IS NOT NULL AND t.latitude IS NOT NULL".to_string());
    }

    if let Some(range) = &filter.discovered_between {
        frags.push(format!("t.discover_time BETWEEN ${} AND ${}", idx, idx + 1));
        params.push(date_param(range.from));
        params.push(date_param(range.to));
        idx += 2;
    }

    if let Some(range) = &filter.verified_between {
        frags.push(format!(
            "t.rectify_verify_time BETWEEN ${} AND ${}",
            idx,
            idx + 1
        ));
        params.push(date_param(range.from));
        params.push(date_param(range.to));
    }

    (frags, params)
}

fn where_clause(frags: &[String]) -> String {
    format!(" WHERE {}", frags.join(" AND "))
}

const fn group_expr(field: GroupField) -> &'static str {
    match field {
        GroupField::ProblemType => "t.problem_type",
        GroupField::FuncZone => "t.func_zone",
        GroupField::ImpactLevel => "t.impact_level",
        GroupField::RectifyStatus => "t.rectify_status",
        GroupField::ParkName => "t.park_name",
        GroupField::DiscoverMonth => "strftime('%Y-%m', t.discover_time)",
        GroupField::VerifyMonth => "strftime('%Y-%m', t.rectify_verify_time)",
    }
}

const fn order_by(order: RecordOrder) -> &'static str {
    match order {
        RecordOrder::Id => "t.id",
        RecordOrder::DeadlineAsc => "t.rectify_deadline IS NULL, t.rectify_deadline, t.id",
    }
}

fn conversion<E: std::fmt::Display>(col: &'static str) -> impl FnOnce(E) -> StoreError {
    move |e| StoreError::Conversion {
        message: format!("Failed to read {col}: {e}"),
    }
}

fn row_date(
    row: &switchy_database::Row,
    col: &'static str,
) -> Result<Option<NaiveDate>, StoreError> {
    row.to_value::<Option<String>>(col)
        .map_err(conversion(col))?
        .map(|s| {
            NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).map_err(|e| StoreError::Conversion {
                message: format!("Unparseable date in {col}: {s:?} ({e})"),
            })
        })
        .transpose()
}

/// Converts a database row into a [`ViolationRecord`].
fn row_to_record(row: &switchy_database::Row) -> Result<ViolationRecord, StoreError> {
    let is_closed: Option<String> = row.to_value("is_closed").map_err(conversion("is_closed"))?;
    let is_deleted: i64 = row.to_value("is_deleted").map_err(conversion("is_deleted"))?;

    Ok(ViolationRecord {
        id: row.to_value("id").map_err(conversion("id"))?,
        tuban_code: row.to_value("tuban_code").map_err(conversion("tuban_code"))?,
        park_name: row.to_value("park_name").map_err(conversion("park_name"))?,
        func_zone: row.to_value("func_zone").map_err(conversion("func_zone"))?,
        facility_name: row
            .to_value("facility_name")
            .map_err(conversion("facility_name"))?,
        longitude: row.to_value("longitude").map_err(conversion("longitude"))?,
        latitude: row.to_value("latitude").map_err(conversion("latitude"))?,
        area: row.to_value("area").map_err(conversion("area"))?,
        problem_type: row
            .to_value("problem_type")
            .map_err(conversion("problem_type"))?,
        problem_desc: row
            .to_value("problem_desc")
            .map_err(conversion("problem_desc"))?,
        impact_level: row
            .to_value("impact_level")
            .map_err(conversion("impact_level"))?,
        rectify_status: row
            .to_value::<Option<String>>("rectify_status")
            .map_err(conversion("rectify_status"))?
            .map(RectifyStatus::from),
        is_closed: YesNo::from_flag(&is_closed.unwrap_or_default()),
        discover_time: row_date(row, "discover_time")?,
        rectify_deadline: row_date(row, "rectify_deadline")?,
        rectify_verify_time: row_date(row, "rectify_verify_time")?,
        is_deleted: is_deleted != 0,
    })
}

fn row_to_event(row: &switchy_database::Row) -> Result<Event, StoreError> {
    let is_active: i64 = row.to_value("is_active").map_err(conversion("is_active"))?;

    Ok(Event {
        id: row.to_value("id").map_err(conversion("events.id"))?,
        event_name: row.to_value("event_name").map_err(conversion("event_name"))?,
        event_type: row.to_value("event_type").map_err(conversion("event_type"))?,
        issue_date: row_date(row, "issue_date")?,
        description: row
            .to_value("description")
            .map_err(conversion("description"))?,
        is_active: is_active != 0,
    })
}

fn to_count(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn count(&self, filter: &RecordFilter) -> Result<u64, StoreError> {
        let (frags, params) = build_filters(filter);
        let sql = format!(
            "SELECT COUNT(*) as cnt FROM tubans t{}",
            where_clause(&frags)
        );

        let rows = self.db.query_raw_params(&sql, &params).await?;
        let count: i64 = match rows.first() {
            Some(row) => row.to_value("cnt").map_err(conversion("cnt"))?,
            None => 0,
        };

        Ok(to_count(count))
    }

    async fn group_count(
        &self,
        field: GroupField,
        filter: &RecordFilter,
    ) -> Result<Vec<GroupRow>, StoreError> {
        let (frags, params) = build_filters(filter);
        let expr = group_expr(field);
        let sql = format!(
            "SELECT {expr} as grp, COUNT(*) as cnt
             FROM tubans t{}
             GROUP BY grp
             ORDER BY grp",
            where_clause(&frags)
        );

        let rows = self.db.query_raw_params(&sql, &params).await?;

        rows.iter()
            .map(|row| {
                Ok(GroupRow {
                    key: row.to_value("grp").map_err(conversion("grp"))?,
                    count: to_count(row.to_value("cnt").map_err(conversion("cnt"))?),
                })
            })
            .collect()
    }

    async fn fetch(
        &self,
        filter: &RecordFilter,
        order: RecordOrder,
    ) -> Result<Vec<ViolationRecord>, StoreError> {
        let (frags, params) = build_filters(filter);
        let sql = format!(
            "SELECT {RECORD_COLUMNS}
             FROM tubans t{}
             ORDER BY {}",
            where_clause(&frags),
            order_by(order)
        );

        let rows = self.db.query_raw_params(&sql, &params).await?;

        rows.iter().map(row_to_record).collect()
    }

    async fn active_events(&self) -> Result<Vec<Event>, StoreError> {
        let rows = self
            .db
            .query_raw_params(
                "SELECT id, event_name, event_type, issue_date, description, is_active
                 FROM events
                 WHERE is_active = 1
                 ORDER BY issue_date IS NULL, issue_date DESC, id",
                &[],
            )
            .await?;

        rows.iter().map(row_to_event).collect()
    }
}

#[async_trait]
impl RecordWriter for SqliteStore {
    async fn code_exists(&self, tuban_code: &str) -> Result<bool, StoreError> {
        let rows = self
            .db
            .query_raw_params(
                "SELECT 1 as found FROM tubans WHERE tuban_code = $1 LIMIT 1",
                &[DatabaseValue::String(tuban_code.to_string())],
            )
            .await?;

        Ok(!rows.is_empty())
    }

    async fn insert(&self, record: &NewViolationRecord) -> Result<i64, StoreError> {
        if self.code_exists(&record.tuban_code).await? {
            return Err(StoreError::DuplicateCode(record.tuban_code.clone()));
        }

        let now = chrono::Utc::now().to_rfc3339();
        let rows = self
            .db
            .query_raw_params(
                "INSERT INTO tubans (
                    tuban_code, park_name, func_zone, facility_name, longitude, latitude,
                    area, image_date, build_unit, build_time, has_approval, approval_no,
                    discover_time, discover_method, check_time, check_person, check_result,
                    problem_type, problem_desc, geo_heritage_type, impact_level, is_illegal,
                    violated_law, rectify_measure, rectify_deadline, rectify_status,
                    rectify_verify_time, verify_person, is_closed, is_punished, punish_type,
                    fine_amount, punish_doc_no, data_source, is_patrol_point,
                    responsible_dept, attachments, remark, created_at, updated_at
                 ) VALUES (
                    $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15,
                    $16, $17, $18, $19, $20, $21, $22, $23, $24, $25, $26, $27, $28, $29,
                    $30, $31, $32, $33, $34, $35, $36, $37, $38, $39, $40
                 )
                 RETURNING id",
                &[
                    DatabaseValue::String(record.tuban_code.clone()),
                    DatabaseValue::String(record.park_name.clone()),
                    opt_str(record.func_zone.as_deref()),
                    opt_str(record.facility_name.as_deref()),
                    opt_f64(record.longitude),
                    opt_f64(record.latitude),
                    opt_f64(record.area),
                    opt_date(record.image_date),
                    opt_str(record.build_unit.as_deref()),
                    opt_date(record.build_time),
                    opt_str(record.has_approval.as_deref()),
                    opt_str(record.approval_no.as_deref()),
                    opt_date(record.discover_time),
                    opt_str(record.discover_method.as_deref()),
                    opt_date(record.check_time),
                    opt_str(record.check_person.as_deref()),
                    opt_str(record.check_result.as_deref()),
                    opt_str(record.problem_type.as_deref()),
                    opt_str(record.problem_desc.as_deref()),
                    opt_str(record.geo_heritage_type.as_deref()),
                    opt_str(record.impact_level.as_deref()),
                    opt_str(record.is_illegal.as_deref()),
                    opt_str(record.violated_law.as_deref()),
                    opt_str(record.rectify_measure.as_deref()),
                    opt_date(record.rectify_deadline),
                    opt_str(record.rectify_status.as_ref().map(RectifyStatus::as_str)),
                    opt_date(record.rectify_verify_time),
                    opt_str(record.verify_person.as_deref()),
                    DatabaseValue::String(record.is_closed.unwrap_or_default().to_string()),
                    opt_str(record.is_punished.as_deref()),
                    opt_str(record.punish_type.as_deref()),
                    opt_f64(record.fine_amount),
                    opt_str(record.punish_doc_no.as_deref()),
                    opt_str(record.data_source.as_deref()),
                    opt_str(record.is_patrol_point.as_deref()),
                    opt_str(record.responsible_dept.as_deref()),
                    opt_str(record.attachments.as_deref()),
                    opt_str(record.remark.as_deref()),
                    DatabaseValue::String(now.clone()),
                    DatabaseValue::String(now),
                ],
            )
            .await?;

        let row = rows.first().ok_or_else(|| StoreError::Conversion {
            message: "Failed to get tuban id from insert".to_string(),
        })?;

        row.to_value("id").map_err(conversion("tubans.id"))
    }
}
