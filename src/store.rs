// Storage - per-entity ports + document store implementations
//
// Eligibility and workflow logic talk to abstract storage ports, one per
// entity, so nothing above this module knows which engine holds the data.
// Two implementations ship: a SQLite-backed document store (entities
// serialized as JSON documents, one table per collection) and an in-memory
// store for unit tests. Uniqueness lives at the storage layer: usernames,
// vendor names, and the (member, promo) enrollment pair are single atomic
// inserts, not check-then-insert sequences.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::info;

use crate::entities::{EnrollmentRequest, Member, Promo, Vendor};
use crate::error::{DomainError, Result};

// ============================================================================
// STORAGE PORTS
// ============================================================================

pub trait MemberStore: Send + Sync {
    /// Fails with AlreadyExists when the username is taken.
    fn insert(&self, member: &Member) -> Result<()>;
    fn find_by_id(&self, id: &str) -> Result<Option<Member>>;
    fn find_by_username(&self, username: &str) -> Result<Option<Member>>;
    /// Returns false when no row matched the id.
    fn update(&self, member: &Member) -> Result<bool>;
    fn delete(&self, id: &str) -> Result<bool>;
    fn list(&self) -> Result<Vec<Member>>;
}

pub trait VendorStore: Send + Sync {
    /// Fails with AlreadyExists when the name is taken.
    fn insert(&self, vendor: &Vendor) -> Result<()>;
    fn find_by_id(&self, id: &str) -> Result<Option<Vendor>>;
    fn update(&self, vendor: &Vendor) -> Result<bool>;
    fn delete(&self, id: &str) -> Result<bool>;
    fn list(&self) -> Result<Vec<Vendor>>;
}

pub trait PromoStore: Send + Sync {
    fn insert(&self, promo: &Promo) -> Result<()>;
    fn find_by_id(&self, id: &str) -> Result<Option<Promo>>;
    fn update(&self, promo: &Promo) -> Result<bool>;
    fn delete(&self, id: &str) -> Result<bool>;
    fn list(&self) -> Result<Vec<Promo>>;
}

pub trait EnrollmentStore: Send + Sync {
    /// Atomic insert; a second request for the same (member, promo) pair
    /// fails with DuplicateEnrollment no matter how the calls interleave.
    fn insert_unique(&self, request: &EnrollmentRequest) -> Result<()>;
    fn exists_for(&self, member_id: &str, promo_id: &str) -> Result<bool>;
    fn find_by_id(&self, id: &str) -> Result<Option<EnrollmentRequest>>;
    fn update(&self, request: &EnrollmentRequest) -> Result<bool>;
    /// Administrative/test-only; the workflow never deletes.
    fn delete(&self, id: &str) -> Result<bool>;
    fn list(&self) -> Result<Vec<EnrollmentRequest>>;
}

// ============================================================================
// STORAGE HANDLE
// ============================================================================

/// Explicitly constructed storage handle, passed down to every component.
/// All four ports usually point at the same underlying store.
#[derive(Clone)]
pub struct Storage {
    pub members: Arc<dyn MemberStore>,
    pub vendors: Arc<dyn VendorStore>,
    pub promos: Arc<dyn PromoStore>,
    pub enrollments: Arc<dyn EnrollmentStore>,
}

impl Storage {
    /// Open (creating if needed) the SQLite document store at `path`.
    pub fn sqlite(path: &Path) -> anyhow::Result<Self> {
        let store = Arc::new(SqliteStore::open(path)?);
        Ok(Self::from_store(store))
    }

    /// Private SQLite database in memory; used by tests and ad-hoc runs.
    pub fn sqlite_in_memory() -> anyhow::Result<Self> {
        let store = Arc::new(SqliteStore::open_in_memory()?);
        Ok(Self::from_store(store))
    }

    /// Plain in-memory store for unit tests.
    pub fn in_memory() -> Self {
        Self::from_store(Arc::new(MemoryStore::default()))
    }

    fn from_store<S>(store: Arc<S>) -> Self
    where
        S: MemberStore + VendorStore + PromoStore + EnrollmentStore + 'static,
    {
        Storage {
            members: store.clone(),
            vendors: store.clone(),
            promos: store.clone(),
            enrollments: store,
        }
    }
}

// ============================================================================
// SQLITE DOCUMENT STORE
// ============================================================================

/// Entities live as JSON documents in per-collection tables. The columns
/// outside `body` exist for lookups and uniqueness constraints only.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;
        info!(path = %path.display(), "sqlite document store opened");
        Ok(SqliteStore {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(SqliteStore {
            conn: Mutex::new(conn),
        })
    }

    fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
        // WAL for crash recovery
        conn.pragma_update(None, "journal_mode", "WAL")?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS members (
                id TEXT PRIMARY KEY,
                username TEXT NOT NULL UNIQUE,
                body TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS vendors (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                body TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS promos (
                id TEXT PRIMARY KEY,
                body TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )",
            [],
        )?;

        // UNIQUE(member_id, promo_id) is the duplicate-enrollment guard;
        // insert_unique relies on it instead of a racy existence check.
        conn.execute(
            "CREATE TABLE IF NOT EXISTS enrollment_requests (
                id TEXT PRIMARY KEY,
                member_id TEXT NOT NULL,
                promo_id TEXT NOT NULL,
                body TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                UNIQUE(member_id, promo_id)
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_enrollments_member
             ON enrollment_requests(member_id)",
            [],
        )?;

        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| DomainError::persistence("storage lock poisoned"))
    }
}

fn to_document<T: Serialize>(entity: &T) -> Result<String> {
    serde_json::to_string(entity).map_err(|e| DomainError::persistence(e.to_string()))
}

fn from_document<T: DeserializeOwned>(body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|e| DomainError::persistence(e.to_string()))
}

fn sql_err(err: rusqlite::Error) -> DomainError {
    DomainError::persistence(err.to_string())
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

fn select_one<T: DeserializeOwned>(
    conn: &Connection,
    table: &str,
    id: &str,
) -> Result<Option<T>> {
    let sql = format!("SELECT body FROM {table} WHERE id = ?1");
    let body: Option<String> = conn
        .query_row(&sql, params![id], |row| row.get(0))
        .optional()
        .map_err(sql_err)?;
    body.as_deref().map(from_document).transpose()
}

fn select_all<T: DeserializeOwned>(conn: &Connection, table: &str) -> Result<Vec<T>> {
    let sql = format!("SELECT body FROM {table} ORDER BY created_at ASC");
    let mut stmt = conn.prepare(&sql).map_err(sql_err)?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .map_err(sql_err)?;

    let mut entities = Vec::new();
    for row in rows {
        let body = row.map_err(sql_err)?;
        entities.push(from_document(&body)?);
    }
    Ok(entities)
}

fn update_row(
    conn: &Connection,
    table: &str,
    id: &str,
    body: &str,
    updated_at: i64,
) -> Result<bool> {
    let sql = format!("UPDATE {table} SET body = ?1, updated_at = ?2 WHERE id = ?3");
    let changed = conn
        .execute(&sql, params![body, updated_at, id])
        .map_err(sql_err)?;
    Ok(changed > 0)
}

fn delete_row(conn: &Connection, table: &str, id: &str) -> Result<bool> {
    let sql = format!("DELETE FROM {table} WHERE id = ?1");
    let changed = conn.execute(&sql, params![id]).map_err(sql_err)?;
    Ok(changed > 0)
}

impl MemberStore for SqliteStore {
    fn insert(&self, member: &Member) -> Result<()> {
        let conn = self.conn()?;
        let body = to_document(member)?;
        let result = conn.execute(
            "INSERT INTO members (id, username, body, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                member.id,
                member.username,
                body,
                member.created_at.timestamp_millis(),
                member.updated_at.timestamp_millis(),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(DomainError::AlreadyExists {
                entity: "Member",
                value: member.username.clone(),
            }),
            Err(e) => Err(sql_err(e)),
        }
    }

    fn find_by_id(&self, id: &str) -> Result<Option<Member>> {
        select_one(&*self.conn()?, "members", id)
    }

    fn find_by_username(&self, username: &str) -> Result<Option<Member>> {
        let conn = self.conn()?;
        let body: Option<String> = conn
            .query_row(
                "SELECT body FROM members WHERE username = ?1",
                params![username],
                |row| row.get(0),
            )
            .optional()
            .map_err(sql_err)?;
        body.as_deref().map(from_document).transpose()
    }

    fn update(&self, member: &Member) -> Result<bool> {
        let conn = self.conn()?;
        let body = to_document(member)?;
        update_row(
            &conn,
            "members",
            &member.id,
            &body,
            member.updated_at.timestamp_millis(),
        )
    }

    fn delete(&self, id: &str) -> Result<bool> {
        delete_row(&*self.conn()?, "members", id)
    }

    fn list(&self) -> Result<Vec<Member>> {
        select_all(&*self.conn()?, "members")
    }
}

impl VendorStore for SqliteStore {
    fn insert(&self, vendor: &Vendor) -> Result<()> {
        let conn = self.conn()?;
        let body = to_document(vendor)?;
        let result = conn.execute(
            "INSERT INTO vendors (id, name, body, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                vendor.id,
                vendor.name,
                body,
                vendor.created_at.timestamp_millis(),
                vendor.updated_at.timestamp_millis(),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(DomainError::AlreadyExists {
                entity: "Vendor",
                value: vendor.name.clone(),
            }),
            Err(e) => Err(sql_err(e)),
        }
    }

    fn find_by_id(&self, id: &str) -> Result<Option<Vendor>> {
        select_one(&*self.conn()?, "vendors", id)
    }

    fn update(&self, vendor: &Vendor) -> Result<bool> {
        let conn = self.conn()?;
        let body = to_document(vendor)?;
        update_row(
            &conn,
            "vendors",
            &vendor.id,
            &body,
            vendor.updated_at.timestamp_millis(),
        )
    }

    fn delete(&self, id: &str) -> Result<bool> {
        delete_row(&*self.conn()?, "vendors", id)
    }

    fn list(&self) -> Result<Vec<Vendor>> {
        select_all(&*self.conn()?, "vendors")
    }
}

impl PromoStore for SqliteStore {
    fn insert(&self, promo: &Promo) -> Result<()> {
        let conn = self.conn()?;
        let body = to_document(promo)?;
        conn.execute(
            "INSERT INTO promos (id, body, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                promo.id,
                body,
                promo.created_at.timestamp_millis(),
                promo.updated_at.timestamp_millis(),
            ],
        )
        .map_err(sql_err)?;
        Ok(())
    }

    fn find_by_id(&self, id: &str) -> Result<Option<Promo>> {
        select_one(&*self.conn()?, "promos", id)
    }

    fn update(&self, promo: &Promo) -> Result<bool> {
        let conn = self.conn()?;
        let body = to_document(promo)?;
        update_row(
            &conn,
            "promos",
            &promo.id,
            &body,
            promo.updated_at.timestamp_millis(),
        )
    }

    fn delete(&self, id: &str) -> Result<bool> {
        delete_row(&*self.conn()?, "promos", id)
    }

    fn list(&self) -> Result<Vec<Promo>> {
        select_all(&*self.conn()?, "promos")
    }
}

impl EnrollmentStore for SqliteStore {
    fn insert_unique(&self, request: &EnrollmentRequest) -> Result<()> {
        let conn = self.conn()?;
        let body = to_document(request)?;
        let result = conn.execute(
            "INSERT INTO enrollment_requests
             (id, member_id, promo_id, body, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                request.id,
                request.member_id,
                request.promo_id,
                body,
                request.created_at.timestamp_millis(),
                request.updated_at.timestamp_millis(),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(DomainError::DuplicateEnrollment {
                member_id: request.member_id.clone(),
                promo_id: request.promo_id.clone(),
            }),
            Err(e) => Err(sql_err(e)),
        }
    }

    fn exists_for(&self, member_id: &str, promo_id: &str) -> Result<bool> {
        let conn = self.conn()?;
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM enrollment_requests
                 WHERE member_id = ?1 AND promo_id = ?2",
                params![member_id, promo_id],
                |row| row.get(0),
            )
            .map_err(sql_err)?;
        Ok(count > 0)
    }

    fn find_by_id(&self, id: &str) -> Result<Option<EnrollmentRequest>> {
        select_one(&*self.conn()?, "enrollment_requests", id)
    }

    fn update(&self, request: &EnrollmentRequest) -> Result<bool> {
        let conn = self.conn()?;
        let body = to_document(request)?;
        update_row(
            &conn,
            "enrollment_requests",
            &request.id,
            &body,
            request.updated_at.timestamp_millis(),
        )
    }

    fn delete(&self, id: &str) -> Result<bool> {
        delete_row(&*self.conn()?, "enrollment_requests", id)
    }

    fn list(&self) -> Result<Vec<EnrollmentRequest>> {
        select_all(&*self.conn()?, "enrollment_requests")
    }
}

// ============================================================================
// IN-MEMORY STORE
// ============================================================================

/// Same ports, no database. Check-and-insert happens under one lock, so the
/// uniqueness guarantees match the SQLite store's.
#[derive(Default)]
pub struct MemoryStore {
    members: Mutex<Vec<Member>>,
    vendors: Mutex<Vec<Vendor>>,
    promos: Mutex<Vec<Promo>>,
    enrollments: Mutex<Vec<EnrollmentRequest>>,
}

fn mem_lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| DomainError::persistence("storage lock poisoned"))
}

impl MemberStore for MemoryStore {
    fn insert(&self, member: &Member) -> Result<()> {
        let mut members = mem_lock(&self.members)?;
        if members.iter().any(|m| m.username == member.username) {
            return Err(DomainError::AlreadyExists {
                entity: "Member",
                value: member.username.clone(),
            });
        }
        members.push(member.clone());
        Ok(())
    }

    fn find_by_id(&self, id: &str) -> Result<Option<Member>> {
        Ok(mem_lock(&self.members)?.iter().find(|m| m.id == id).cloned())
    }

    fn find_by_username(&self, username: &str) -> Result<Option<Member>> {
        Ok(mem_lock(&self.members)?
            .iter()
            .find(|m| m.username == username)
            .cloned())
    }

    fn update(&self, member: &Member) -> Result<bool> {
        let mut members = mem_lock(&self.members)?;
        match members.iter_mut().find(|m| m.id == member.id) {
            Some(slot) => {
                *slot = member.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn delete(&self, id: &str) -> Result<bool> {
        let mut members = mem_lock(&self.members)?;
        let before = members.len();
        members.retain(|m| m.id != id);
        Ok(members.len() < before)
    }

    fn list(&self) -> Result<Vec<Member>> {
        Ok(mem_lock(&self.members)?.clone())
    }
}

impl VendorStore for MemoryStore {
    fn insert(&self, vendor: &Vendor) -> Result<()> {
        let mut vendors = mem_lock(&self.vendors)?;
        if vendors.iter().any(|v| v.name == vendor.name) {
            return Err(DomainError::AlreadyExists {
                entity: "Vendor",
                value: vendor.name.clone(),
            });
        }
        vendors.push(vendor.clone());
        Ok(())
    }

    fn find_by_id(&self, id: &str) -> Result<Option<Vendor>> {
        Ok(mem_lock(&self.vendors)?.iter().find(|v| v.id == id).cloned())
    }

    fn update(&self, vendor: &Vendor) -> Result<bool> {
        let mut vendors = mem_lock(&self.vendors)?;
        match vendors.iter_mut().find(|v| v.id == vendor.id) {
            Some(slot) => {
                *slot = vendor.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn delete(&self, id: &str) -> Result<bool> {
        let mut vendors = mem_lock(&self.vendors)?;
        let before = vendors.len();
        vendors.retain(|v| v.id != id);
        Ok(vendors.len() < before)
    }

    fn list(&self) -> Result<Vec<Vendor>> {
        Ok(mem_lock(&self.vendors)?.clone())
    }
}

impl PromoStore for MemoryStore {
    fn insert(&self, promo: &Promo) -> Result<()> {
        mem_lock(&self.promos)?.push(promo.clone());
        Ok(())
    }

    fn find_by_id(&self, id: &str) -> Result<Option<Promo>> {
        Ok(mem_lock(&self.promos)?.iter().find(|p| p.id == id).cloned())
    }

    fn update(&self, promo: &Promo) -> Result<bool> {
        let mut promos = mem_lock(&self.promos)?;
        match promos.iter_mut().find(|p| p.id == promo.id) {
            Some(slot) => {
                *slot = promo.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn delete(&self, id: &str) -> Result<bool> {
        let mut promos = mem_lock(&self.promos)?;
        let before = promos.len();
        promos.retain(|p| p.id != id);
        Ok(promos.len() < before)
    }

    fn list(&self) -> Result<Vec<Promo>> {
        Ok(mem_lock(&self.promos)?.clone())
    }
}

impl EnrollmentStore for MemoryStore {
    fn insert_unique(&self, request: &EnrollmentRequest) -> Result<()> {
        let mut enrollments = mem_lock(&self.enrollments)?;
        let duplicate = enrollments
            .iter()
            .any(|r| r.member_id == request.member_id && r.promo_id == request.promo_id);
        if duplicate {
            return Err(DomainError::DuplicateEnrollment {
                member_id: request.member_id.clone(),
                promo_id: request.promo_id.clone(),
            });
        }
        enrollments.push(request.clone());
        Ok(())
    }

    fn exists_for(&self, member_id: &str, promo_id: &str) -> Result<bool> {
        Ok(mem_lock(&self.enrollments)?
            .iter()
            .any(|r| r.member_id == member_id && r.promo_id == promo_id))
    }

    fn find_by_id(&self, id: &str) -> Result<Option<EnrollmentRequest>> {
        Ok(mem_lock(&self.enrollments)?
            .iter()
            .find(|r| r.id == id)
            .cloned())
    }

    fn update(&self, request: &EnrollmentRequest) -> Result<bool> {
        let mut enrollments = mem_lock(&self.enrollments)?;
        match enrollments.iter_mut().find(|r| r.id == request.id) {
            Some(slot) => {
                *slot = request.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn delete(&self, id: &str) -> Result<bool> {
        let mut enrollments = mem_lock(&self.enrollments)?;
        let before = enrollments.len();
        enrollments.retain(|r| r.id != id);
        Ok(enrollments.len() < before)
    }

    fn list(&self) -> Result<Vec<EnrollmentRequest>> {
        Ok(mem_lock(&self.enrollments)?.clone())
    }
}

// ============================================================================
// TESTS
// ============================================================================
