use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use sqlx::{query, query_as, query_scalar, Column, ColumnIndex, Decode, FromRow, Row, Type};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, warn};

#[cfg(feature = "sqlite")]
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};

#[cfg(feature = "postgres")]
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};

#[cfg(feature = "mysql")]
use sqlx::mysql::{MySqlPool, MySqlPoolOptions, MySqlRow};

#[cfg(any(feature = "postgres", feature = "mysql"))]
use sqlx::types::Decimal;

use crate::config::{get_config, DatabaseConfig};
use crate::errors::{DeskError, DeskResult};
use crate::status::ApprovalStatus;
use crate::validity::ValidityPeriod;

/// An opaque row: column name to JSON value, in column order.
pub type Record = Map<String, Value>;

/// Timestamp layout used when opaque rows carry datetime columns.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A row of the `licenserequests` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct LicenseRequestRecord {
    pub id: i64,
    pub approval_status: String,
    pub national_id: String,
    pub license: String,
    pub expire_time: Option<NaiveDateTime>,
}

/// The validity columns of a `licenses` row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRow)]
pub struct LicenseValidity {
    #[sqlx(rename = "validaty")]
    pub duration: i32,
    #[sqlx(rename = "validaty_unit")]
    pub unit_code: i32,
}

impl LicenseValidity {
    pub fn period(&self) -> DeskResult<ValidityPeriod> {
        ValidityPeriod::from_raw(self.duration, self.unit_code)
    }
}

/// Unified database abstraction over SQLite, Postgres and MySQL.
///
/// Available variants depend on enabled features:
/// - `sqlite` feature enables `Database::SQLite`
/// - `postgres` feature enables `Database::Postgres`
/// - `mysql` feature enables `Database::MySql`
///
/// Every variant wraps a pool; each call checks a connection out for the
/// duration of one statement and returns it on every exit path.
#[derive(Debug, Clone)]
pub enum Database {
    #[cfg(feature = "sqlite")]
    SQLite(SqlitePool),
    #[cfg(feature = "postgres")]
    Postgres(PgPool),
    #[cfg(feature = "mysql")]
    MySql(MySqlPool),
}

fn storage_error(operation: &'static str) -> impl FnOnce(sqlx::Error) -> DeskError {
    move |e| {
        error!("{operation} failed: {e}");
        DeskError::StorageError(format!("{operation}: {e}"))
    }
}

fn connect_error(backend: &'static str) -> impl FnOnce(sqlx::Error) -> DeskError {
    move |e| {
        error!("Failed to connect to {backend}: {e}");
        DeskError::StorageError(format!("failed to connect to {backend}: {e}"))
    }
}

/// Render a nullable column value with `render`, mapping SQL NULL to JSON null.
fn nullable<T>(value: Option<T>, render: impl FnOnce(T) -> Value) -> Value {
    value.map(render).unwrap_or(Value::Null)
}

/// Binary columns are passed through as lowercase hex.
fn bytes_value(bytes: Vec<u8>) -> Value {
    Value::from(hex::encode(bytes))
}

/// Decode one column of an arbitrary row into JSON.
///
/// `backend_value` gets the first attempt so each driver can claim the
/// types only it supports (NUMERIC, unsigned integers). After that the
/// shared candidates are tried in order until the driver accepts one.
/// Integers come before `bool` because SQLite and MySQL report booleans as
/// integers, and bytes come last so text columns stay text.
fn column_value<'r, R>(
    row: &'r R,
    index: usize,
    backend_value: fn(&'r R, usize) -> Option<Value>,
) -> Value
where
    R: Row,
    usize: ColumnIndex<R>,
    i64: Decode<'r, R::Database> + Type<R::Database>,
    i32: Decode<'r, R::Database> + Type<R::Database>,
    i16: Decode<'r, R::Database> + Type<R::Database>,
    f64: Decode<'r, R::Database> + Type<R::Database>,
    f32: Decode<'r, R::Database> + Type<R::Database>,
    bool: Decode<'r, R::Database> + Type<R::Database>,
    String: Decode<'r, R::Database> + Type<R::Database>,
    NaiveDateTime: Decode<'r, R::Database> + Type<R::Database>,
    DateTime<Utc>: Decode<'r, R::Database> + Type<R::Database>,
    NaiveDate: Decode<'r, R::Database> + Type<R::Database>,
    Vec<u8>: Decode<'r, R::Database> + Type<R::Database>,
{
    if let Some(v) = backend_value(row, index) {
        return v;
    }
    if let Ok(v) = row.try_get::<Option<i64>, _>(index) {
        return nullable(v, Value::from);
    }
    if let Ok(v) = row.try_get::<Option<i32>, _>(index) {
        return nullable(v, Value::from);
    }
    if let Ok(v) = row.try_get::<Option<i16>, _>(index) {
        return nullable(v, Value::from);
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(index) {
        return nullable(v, Value::from);
    }
    if let Ok(v) = row.try_get::<Option<f32>, _>(index) {
        return nullable(v, Value::from);
    }
    if let Ok(v) = row.try_get::<Option<bool>, _>(index) {
        return nullable(v, Value::from);
    }
    if let Ok(v) = row.try_get::<Option<String>, _>(index) {
        return nullable(v, Value::from);
    }
    if let Ok(v) = row.try_get::<Option<NaiveDateTime>, _>(index) {
        return nullable(v, |t| Value::from(t.format(TIMESTAMP_FORMAT).to_string()));
    }
    if let Ok(v) = row.try_get::<Option<DateTime<Utc>>, _>(index) {
        return nullable(v, |t| {
            Value::from(t.naive_utc().format(TIMESTAMP_FORMAT).to_string())
        });
    }
    if let Ok(v) = row.try_get::<Option<NaiveDate>, _>(index) {
        return nullable(v, |d| Value::from(d.format("%Y-%m-%d").to_string()));
    }
    if let Ok(v) = row.try_get::<Option<Vec<u8>>, _>(index) {
        return nullable(v, bytes_value);
    }

    let column = row.columns().get(index).map(|c| c.name().to_string());
    warn!(?column, "column type not representable as JSON, returning null");
    Value::Null
}

/// Convert an arbitrary row into a [`Record`].
fn row_to_record<'r, R>(row: &'r R, backend_value: fn(&'r R, usize) -> Option<Value>) -> Record
where
    R: Row,
    usize: ColumnIndex<R>,
    i64: Decode<'r, R::Database> + Type<R::Database>,
    i32: Decode<'r, R::Database> + Type<R::Database>,
    i16: Decode<'r, R::Database> + Type<R::Database>,
    f64: Decode<'r, R::Database> + Type<R::Database>,
    f32: Decode<'r, R::Database> + Type<R::Database>,
    bool: Decode<'r, R::Database> + Type<R::Database>,
    String: Decode<'r, R::Database> + Type<R::Database>,
    NaiveDateTime: Decode<'r, R::Database> + Type<R::Database>,
    DateTime<Utc>: Decode<'r, R::Database> + Type<R::Database>,
    NaiveDate: Decode<'r, R::Database> + Type<R::Database>,
    Vec<u8>: Decode<'r, R::Database> + Type<R::Database>,
{
    row.columns()
        .iter()
        .enumerate()
        .map(|(index, column)| {
            (
                column.name().to_string(),
                column_value(row, index, backend_value),
            )
        })
        .collect()
}

#[cfg(feature = "sqlite")]
fn sqlite_record(row: &SqliteRow) -> Record {
    row_to_record(row, |_, _| None)
}

/// NUMERIC columns come back as their exact decimal text.
#[cfg(feature = "postgres")]
fn postgres_record(row: &PgRow) -> Record {
    row_to_record(row, |row, index| {
        row.try_get::<Option<Decimal>, _>(index)
            .ok()
            .map(|v| nullable(v, |d| Value::from(d.to_string())))
    })
}

/// DECIMAL columns come back as their exact decimal text, unsigned
/// integers as JSON numbers.
#[cfg(feature = "mysql")]
fn mysql_record(row: &MySqlRow) -> Record {
    row_to_record(row, |row, index| {
        if let Ok(v) = row.try_get::<Option<Decimal>, _>(index) {
            return Some(nullable(v, |d| Value::from(d.to_string())));
        }
        row.try_get::<Option<u64>, _>(index)
            .ok()
            .map(|v| nullable(v, Value::from))
    })
}

impl Database {
    /// Initialize the database connection based on the global configuration.
    ///
    /// See `crate::config` for configuration options.
    pub async fn new() -> DeskResult<Arc<Self>> {
        let config = get_config()?;
        Self::connect(&config.database).await
    }

    /// Open a pool for the backend selected by `db_config.db_type`.
    pub async fn connect(db_config: &DatabaseConfig) -> DeskResult<Arc<Self>> {
        let acquire_timeout = Duration::from_secs(db_config.acquire_timeout_secs);
        let url = db_config.url();

        match db_config.db_type.as_str() {
            #[cfg(feature = "sqlite")]
            "sqlite" => {
                let pool = SqlitePoolOptions::new()
                    .max_connections(db_config.max_connections)
                    .acquire_timeout(acquire_timeout)
                    .connect(url)
                    .await
                    .map_err(connect_error("SQLite"))?;

                Ok(Arc::new(Database::SQLite(pool)))
            }
            #[cfg(not(feature = "sqlite"))]
            "sqlite" => Err(DeskError::ConfigError(
                "SQLite support not compiled in. Enable the 'sqlite' feature.".to_string(),
            )),
            #[cfg(feature = "postgres")]
            "postgres" => {
                let pool = PgPoolOptions::new()
                    .max_connections(db_config.max_connections)
                    .acquire_timeout(acquire_timeout)
                    .connect(url)
                    .await
                    .map_err(connect_error("PostgreSQL"))?;

                Ok(Arc::new(Database::Postgres(pool)))
            }
            #[cfg(not(feature = "postgres"))]
            "postgres" => Err(DeskError::ConfigError(
                "PostgreSQL support not compiled in. Enable the 'postgres' feature.".to_string(),
            )),
            #[cfg(feature = "mysql")]
            "mysql" => {
                let pool = MySqlPoolOptions::new()
                    .max_connections(db_config.max_connections)
                    .acquire_timeout(acquire_timeout)
                    .connect(url)
                    .await
                    .map_err(connect_error("MySQL"))?;

                Ok(Arc::new(Database::MySql(pool)))
            }
            #[cfg(not(feature = "mysql"))]
            "mysql" => Err(DeskError::ConfigError(
                "MySQL support not compiled in. Enable the 'mysql' feature.".to_string(),
            )),
            other => Err(DeskError::ConfigError(format!(
                "unsupported database type: {other}"
            ))),
        }
    }

    /// Name of the active backend, as used in `database.db_type`.
    pub fn db_type(&self) -> &'static str {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(_) => "sqlite",
            #[cfg(feature = "postgres")]
            Database::Postgres(_) => "postgres",
            #[cfg(feature = "mysql")]
            Database::MySql(_) => "mysql",
        }
    }

    /// Cheap connectivity probe for the health endpoint.
    pub async fn ping(&self) -> bool {
        let result = match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => query("SELECT 1").execute(pool).await.map(|_| ()),
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => query("SELECT 1").execute(pool).await.map(|_| ()),
            #[cfg(feature = "mysql")]
            Database::MySql(pool) => query("SELECT 1").execute(pool).await.map(|_| ()),
        };

        match result {
            Ok(()) => true,
            Err(e) => {
                error!("Database ping failed: {e}");
                false
            }
        }
    }

    /// Fetch the user row for a national identifier.
    ///
    /// Returns the first matching row with all of its columns, or `None`.
    pub async fn find_user(&self, national_id: &str) -> DeskResult<Option<Record>> {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => {
                let row = query("SELECT * FROM users WHERE national_id = ?")
                    .bind(national_id)
                    .fetch_optional(pool)
                    .await
                    .map_err(storage_error("SQLite find_user"))?;
                Ok(row.as_ref().map(sqlite_record))
            }
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => {
                let row = query("SELECT * FROM users WHERE national_id = $1")
                    .bind(national_id)
                    .fetch_optional(pool)
                    .await
                    .map_err(storage_error("Postgres find_user"))?;
                Ok(row.as_ref().map(postgres_record))
            }
            #[cfg(feature = "mysql")]
            Database::MySql(pool) => {
                let row = query("SELECT * FROM users WHERE national_id = ?")
                    .bind(national_id)
                    .fetch_optional(pool)
                    .await
                    .map_err(storage_error("MySQL find_user"))?;
                Ok(row.as_ref().map(mysql_record))
            }
        }
    }

    /// Fetch the license row for a license identifier.
    ///
    /// Returns the first matching row with all of its columns, or `None`.
    pub async fn find_license(&self, license_id: &str) -> DeskResult<Option<Record>> {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => {
                let row = query("SELECT * FROM licenses WHERE license_id = ?")
                    .bind(license_id)
                    .fetch_optional(pool)
                    .await
                    .map_err(storage_error("SQLite find_license"))?;
                Ok(row.as_ref().map(sqlite_record))
            }
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => {
                let row = query("SELECT * FROM licenses WHERE license_id = $1")
                    .bind(license_id)
                    .fetch_optional(pool)
                    .await
                    .map_err(storage_error("Postgres find_license"))?;
                Ok(row.as_ref().map(postgres_record))
            }
            #[cfg(feature = "mysql")]
            Database::MySql(pool) => {
                let row = query("SELECT * FROM licenses WHERE license_id = ?")
                    .bind(license_id)
                    .fetch_optional(pool)
                    .await
                    .map_err(storage_error("MySQL find_license"))?;
                Ok(row.as_ref().map(mysql_record))
            }
        }
    }

    /// Insert a `pending` license request with no expiration.
    ///
    /// Returns the generated request id.
    pub async fn insert_license_request(
        &self,
        national_id: &str,
        license_id: &str,
    ) -> DeskResult<i64> {
        let status = ApprovalStatus::Pending.as_str();
        let expire_time: Option<NaiveDateTime> = None;

        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => {
                let result = query(
                    "INSERT INTO licenserequests (approval_status, national_id, license, ExpireTime) \
                     VALUES (?, ?, ?, ?)",
                )
                .bind(status)
                .bind(national_id)
                .bind(license_id)
                .bind(expire_time)
                .execute(pool)
                .await
                .map_err(storage_error("SQLite insert_license_request"))?;

                Ok(result.last_insert_rowid())
            }
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => query_scalar::<_, i64>(
                "INSERT INTO licenserequests (approval_status, national_id, license, ExpireTime) \
                 VALUES ($1, $2, $3, $4) \
                 RETURNING id::BIGINT",
            )
            .bind(status)
            .bind(national_id)
            .bind(license_id)
            .bind(expire_time)
            .fetch_one(pool)
            .await
            .map_err(storage_error("Postgres insert_license_request")),
            #[cfg(feature = "mysql")]
            Database::MySql(pool) => {
                let result = query(
                    "INSERT INTO licenserequests (approval_status, national_id, license, ExpireTime) \
                     VALUES (?, ?, ?, ?)",
                )
                .bind(status)
                .bind(national_id)
                .bind(license_id)
                .bind(expire_time)
                .execute(pool)
                .await
                .map_err(storage_error("MySQL insert_license_request"))?;

                i64::try_from(result.last_insert_id()).map_err(|_| {
                    DeskError::StorageError(format!(
                        "generated id {} does not fit in i64",
                        result.last_insert_id()
                    ))
                })
            }
        }
    }

    /// License id referenced by a license request, or `None` if the request
    /// does not exist.
    pub async fn license_for_request(&self, request_id: i64) -> DeskResult<Option<String>> {
        let license = match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => {
                query_scalar::<_, Option<String>>("SELECT license FROM licenserequests WHERE id = ?")
                    .bind(request_id)
                    .fetch_optional(pool)
                    .await
                    .map_err(storage_error("SQLite license_for_request"))?
            }
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => query_scalar::<_, Option<String>>(
                "SELECT license FROM licenserequests WHERE id = $1",
            )
            .bind(request_id)
            .fetch_optional(pool)
            .await
            .map_err(storage_error("Postgres license_for_request"))?,
            #[cfg(feature = "mysql")]
            Database::MySql(pool) => {
                query_scalar::<_, Option<String>>("SELECT license FROM licenserequests WHERE id = ?")
                    .bind(request_id)
                    .fetch_optional(pool)
                    .await
                    .map_err(storage_error("MySQL license_for_request"))?
            }
        };

        Ok(license.flatten())
    }

    /// Validity duration and unit of a license, or `None` if it does not exist.
    pub async fn license_validity(&self, license_id: &str) -> DeskResult<Option<LicenseValidity>> {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => query_as::<_, LicenseValidity>(
                "SELECT validaty, validaty_unit FROM licenses WHERE license_id = ?",
            )
            .bind(license_id)
            .fetch_optional(pool)
            .await
            .map_err(storage_error("SQLite license_validity")),
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => query_as::<_, LicenseValidity>(
                "SELECT validaty::INTEGER AS validaty, validaty_unit::INTEGER AS validaty_unit \
                 FROM licenses WHERE license_id = $1",
            )
            .bind(license_id)
            .fetch_optional(pool)
            .await
            .map_err(storage_error("Postgres license_validity")),
            #[cfg(feature = "mysql")]
            Database::MySql(pool) => query_as::<_, LicenseValidity>(
                "SELECT validaty, validaty_unit FROM licenses WHERE license_id = ?",
            )
            .bind(license_id)
            .fetch_optional(pool)
            .await
            .map_err(storage_error("MySQL license_validity")),
        }
    }

    /// Write the approval status and expiration of a license request.
    ///
    /// Returns:
    /// - `Ok(true)` if a row was updated
    /// - `Ok(false)` if no matching row was found
    /// - `Err(DeskError::StorageError)` on DB failure
    pub async fn update_license_request_status(
        &self,
        request_id: i64,
        status: ApprovalStatus,
        expire_time: Option<NaiveDateTime>,
    ) -> DeskResult<bool> {
        let rows_affected = match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => query(
                "UPDATE licenserequests \
                     SET approval_status = ?, ExpireTime = ? \
                     WHERE id = ?",
            )
            .bind(status.as_str())
            .bind(expire_time)
            .bind(request_id)
            .execute(pool)
            .await
            .map_err(storage_error("SQLite update_license_request_status"))?
            .rows_affected(),
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => query(
                "UPDATE licenserequests \
                     SET approval_status = $1, ExpireTime = $2 \
                     WHERE id = $3",
            )
            .bind(status.as_str())
            .bind(expire_time)
            .bind(request_id)
            .execute(pool)
            .await
            .map_err(storage_error("Postgres update_license_request_status"))?
            .rows_affected(),
            #[cfg(feature = "mysql")]
            Database::MySql(pool) => query(
                "UPDATE licenserequests \
                     SET approval_status = ?, ExpireTime = ? \
                     WHERE id = ?",
            )
            .bind(status.as_str())
            .bind(expire_time)
            .bind(request_id)
            .execute(pool)
            .await
            .map_err(storage_error("MySQL update_license_request_status"))?
            .rows_affected(),
        };

        Ok(rows_affected > 0)
    }

    /// Fetch a license request by id.
    pub async fn get_license_request(
        &self,
        request_id: i64,
    ) -> DeskResult<Option<LicenseRequestRecord>> {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => query_as::<_, LicenseRequestRecord>(
                "SELECT id, approval_status, national_id, license, ExpireTime AS expire_time \
                 FROM licenserequests WHERE id = ?",
            )
            .bind(request_id)
            .fetch_optional(pool)
            .await
            .map_err(storage_error("SQLite get_license_request")),
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => query_as::<_, LicenseRequestRecord>(
                "SELECT id::BIGINT AS id, approval_status, national_id, license, ExpireTime AS expire_time \
                 FROM licenserequests WHERE id = $1",
            )
            .bind(request_id)
            .fetch_optional(pool)
            .await
            .map_err(storage_error("Postgres get_license_request")),
            #[cfg(feature = "mysql")]
            Database::MySql(pool) => query_as::<_, LicenseRequestRecord>(
                "SELECT CAST(id AS SIGNED) AS id, approval_status, national_id, license, ExpireTime AS expire_time \
                 FROM licenserequests WHERE id = ?",
            )
            .bind(request_id)
            .fetch_optional(pool)
            .await
            .map_err(storage_error("MySQL get_license_request")),
        }
    }
}
