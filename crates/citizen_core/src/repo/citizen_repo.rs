//! Citizen repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide lookups over `citizens` and `citizen_addresses` storage.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Write paths call `Citizen::validate()` before SQL mutations.
//! - Read paths reject invalid persisted state instead of masking it.
//! - `save` writes the citizen row and its full address set atomically.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::citizen::{
    Address, AddressWithOwner, Citizen, CitizenValidationError, OwnerSummary, PersonId,
};
use chrono::NaiveDate;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const CITIZEN_SELECT_SQL: &str = "SELECT
    person_id,
    personal_number,
    givenname,
    lastname,
    gender,
    civil_status,
    nr_date,
    classified,
    protected_nr,
    created_at,
    updated_at
FROM citizens";

const ADDRESS_COLUMNS_SQL: &str = "a.id,
    a.status,
    a.nr_date,
    a.co,
    a.address,
    a.address_area,
    a.address_number,
    a.address_letter,
    a.apartment_number,
    a.postal_code,
    a.city,
    a.county,
    a.municipality,
    a.country,
    a.address_type,
    a.created_at,
    a.updated_at";

const DATE_FORMAT: &str = "%Y-%m-%d";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for citizen persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(CitizenValidationError),
    Db(DbError),
    /// Another citizen already owns this personal number.
    DuplicatePersonalNumber(String),
    InvalidData(String),
    /// Connection schema is older than this binary expects.
    SchemaNotReady { db_version: u32, expected: u32 },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::DuplicatePersonalNumber(_) => {
                write!(f, "personal number is already registered")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted citizen data: {message}"),
            Self::SchemaNotReady {
                db_version,
                expected,
            } => write!(
                f,
                "database schema version {db_version} does not match expected {expected}"
            ),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<CitizenValidationError> for RepoError {
    fn from(value: CitizenValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Equality filters for address queries.
///
/// An unset field applies no predicate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressFilter {
    pub status: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub address_type: Option<String>,
}

/// Paging and visibility options for citizen listings.
#[derive(Debug, Clone, Default)]
pub struct CitizenListQuery {
    pub person_id: Option<PersonId>,
    pub include_classified: bool,
    pub limit: Option<u32>,
    pub offset: u32,
}

/// Repository interface for citizen lookups and writes.
pub trait CitizenRepository {
    fn find_by_id(&self, id: PersonId) -> RepoResult<Option<Citizen>>;
    fn find_by_personal_number(&self, personal_number: &str) -> RepoResult<Option<Citizen>>;
    /// Addresses whose owner was updated at or after `since` (epoch ms).
    /// `None` returns every address.
    fn find_changed_since(&self, since: Option<i64>) -> RepoResult<Vec<AddressWithOwner>>;
    fn find_addresses(&self, filter: &AddressFilter) -> RepoResult<Vec<AddressWithOwner>>;
    fn list_citizens(&self, query: &CitizenListQuery) -> RepoResult<Vec<Citizen>>;
    /// Inserts or replaces the citizen and its address set, keeping `person_id`.
    fn save(&self, citizen: &Citizen) -> RepoResult<Citizen>;
}

/// SQLite-backed citizen repository.
pub struct SqliteCitizenRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCitizenRepository<'conn> {
    /// Wraps a connection whose migrations are fully applied.
    ///
    /// # Errors
    /// - `SchemaNotReady` when the connection was not opened through `db::open_db*`.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        let db_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
        let expected = latest_version();
        if db_version != expected {
            return Err(RepoError::SchemaNotReady {
                db_version,
                expected,
            });
        }
        Ok(Self { conn })
    }

    fn find_one(&self, column: &str, value: &str) -> RepoResult<Option<Citizen>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{CITIZEN_SELECT_SQL} WHERE {column} = ?1;"))?;
        let mut rows = stmt.query([value])?;
        match rows.next()? {
            Some(row) => {
                let mut citizen = parse_citizen_row(row)?;
                citizen.addresses = self.load_addresses(citizen.person_id)?;
                Ok(Some(citizen))
            }
            None => Ok(None),
        }
    }

    fn load_addresses(&self, person_id: PersonId) -> RepoResult<Vec<Address>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ADDRESS_COLUMNS_SQL}
             FROM citizen_addresses a
             WHERE a.citizen_id = ?1
             ORDER BY a.created_at ASC, a.id ASC;"
        ))?;
        let mut rows = stmt.query([person_id.to_string()])?;
        let mut addresses = Vec::new();
        while let Some(row) = rows.next()? {
            addresses.push(parse_address_row(row)?);
        }
        Ok(addresses)
    }

    fn query_addresses_with_owner(
        &self,
        where_sql: &str,
        bind_values: Vec<Value>,
    ) -> RepoResult<Vec<AddressWithOwner>> {
        let sql = format!(
            "SELECT {ADDRESS_COLUMNS_SQL},
                c.person_id AS owner_person_id,
                c.givenname AS owner_givenname,
                c.lastname AS owner_lastname,
                c.gender AS owner_gender,
                c.classified AS owner_classified,
                c.updated_at AS owner_updated_at
             FROM citizen_addresses a
             JOIN citizens c ON c.person_id = a.citizen_id
             WHERE {where_sql}
             ORDER BY c.updated_at ASC, a.id ASC;"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut results = Vec::new();
        while let Some(row) = rows.next()? {
            results.push(AddressWithOwner {
                address: parse_address_row(row)?,
                owner: parse_owner_row(row)?,
            });
        }
        Ok(results)
    }
}

impl CitizenRepository for SqliteCitizenRepository<'_> {
    fn find_by_id(&self, id: PersonId) -> RepoResult<Option<Citizen>> {
        self.find_one("person_id", &id.to_string())
    }

    fn find_by_personal_number(&self, personal_number: &str) -> RepoResult<Option<Citizen>> {
        self.find_one("personal_number", personal_number)
    }

    fn find_changed_since(&self, since: Option<i64>) -> RepoResult<Vec<AddressWithOwner>> {
        match since {
            Some(since) => {
                self.query_addresses_with_owner("c.updated_at >= ?", vec![Value::Integer(since)])
            }
            None => self.query_addresses_with_owner("1 = 1", Vec::new()),
        }
    }

    fn find_addresses(&self, filter: &AddressFilter) -> RepoResult<Vec<AddressWithOwner>> {
        let mut where_sql = String::from("1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();
        let filters = [
            ("a.status", &filter.status),
            ("a.city", &filter.city),
            ("a.postal_code", &filter.postal_code),
            ("a.address_type", &filter.address_type),
        ];
        for (column, value) in filters {
            if let Some(value) = value {
                where_sql.push_str(&format!(" AND {column} = ?"));
                bind_values.push(Value::Text(value.clone()));
            }
        }
        self.query_addresses_with_owner(&where_sql, bind_values)
    }

    fn list_citizens(&self, query: &CitizenListQuery) -> RepoResult<Vec<Citizen>> {
        let mut sql = format!("{CITIZEN_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(person_id) = query.person_id {
            sql.push_str(" AND person_id = ?");
            bind_values.push(Value::Text(person_id.to_string()));
        }

        if !query.include_classified {
            sql.push_str(" AND classified IS NULL");
        }

        sql.push_str(" ORDER BY personal_number ASC");

        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
            if query.offset > 0 {
                sql.push_str(" OFFSET ?");
                bind_values.push(Value::Integer(i64::from(query.offset)));
            }
        } else if query.offset > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            bind_values.push(Value::Integer(i64::from(query.offset)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut citizens = Vec::new();
        while let Some(row) = rows.next()? {
            citizens.push(parse_citizen_row(row)?);
        }
        drop(rows);

        for citizen in &mut citizens {
            citizen.addresses = self.load_addresses(citizen.person_id)?;
        }
        Ok(citizens)
    }

    fn save(&self, citizen: &Citizen) -> RepoResult<Citizen> {
        citizen.validate()?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        upsert_citizen(&tx, citizen).map_err(|err| match err {
            RepoError::Db(db) if db.is_unique_violation() => {
                RepoError::DuplicatePersonalNumber(citizen.personal_number.clone())
            }
            other => other,
        })?;
        replace_addresses(&tx, citizen)?;
        tx.commit()?;

        self.find_by_id(citizen.person_id)?.ok_or_else(|| {
            RepoError::InvalidData(format!(
                "saved citizen {} not found in read-back",
                citizen.person_id
            ))
        })
    }
}

fn upsert_citizen(tx: &Transaction<'_>, citizen: &Citizen) -> RepoResult<()> {
    tx.execute(
        "INSERT INTO citizens (
            person_id,
            personal_number,
            givenname,
            lastname,
            gender,
            civil_status,
            nr_date,
            classified,
            protected_nr,
            created_at,
            updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        ON CONFLICT (person_id) DO UPDATE SET
            personal_number = excluded.personal_number,
            givenname = excluded.givenname,
            lastname = excluded.lastname,
            gender = excluded.gender,
            civil_status = excluded.civil_status,
            nr_date = excluded.nr_date,
            classified = excluded.classified,
            protected_nr = excluded.protected_nr,
            updated_at = excluded.updated_at;",
        params![
            citizen.person_id.to_string(),
            citizen.personal_number.as_str(),
            citizen.givenname.as_deref(),
            citizen.lastname.as_deref(),
            citizen.gender.as_deref(),
            citizen.civil_status.as_deref(),
            citizen.nr_date.map(date_to_db),
            citizen.classified.as_deref(),
            citizen.protected_nr.as_deref(),
            citizen.created_at,
            citizen.updated_at,
        ],
    )?;
    Ok(())
}

fn replace_addresses(tx: &Transaction<'_>, citizen: &Citizen) -> RepoResult<()> {
    tx.execute(
        "DELETE FROM citizen_addresses WHERE citizen_id = ?1;",
        [citizen.person_id.to_string()],
    )?;

    let mut stmt = tx.prepare(
        "INSERT INTO citizen_addresses (
            id,
            citizen_id,
            status,
            nr_date,
            co,
            address,
            address_area,
            address_number,
            address_letter,
            apartment_number,
            postal_code,
            city,
            county,
            municipality,
            country,
            address_type,
            created_at,
            updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18);",
    )?;
    for address in &citizen.addresses {
        stmt.execute(params![
            address.id.to_string(),
            citizen.person_id.to_string(),
            address.status.as_deref(),
            address.nr_date.map(date_to_db),
            address.co.as_deref(),
            address.address.as_deref(),
            address.address_area.as_deref(),
            address.address_number.as_deref(),
            address.address_letter.as_deref(),
            address.apartment_number.as_deref(),
            address.postal_code.as_deref(),
            address.city.as_deref(),
            address.county.as_deref(),
            address.municipality.as_deref(),
            address.country.as_deref(),
            address.address_type.as_deref(),
            address.created_at,
            address.updated_at,
        ])?;
    }
    Ok(())
}

fn parse_citizen_row(row: &Row<'_>) -> RepoResult<Citizen> {
    let citizen = Citizen {
        person_id: parse_uuid(row, "person_id", "citizens.person_id")?,
        personal_number: row.get("personal_number")?,
        givenname: row.get("givenname")?,
        lastname: row.get("lastname")?,
        gender: row.get("gender")?,
        civil_status: row.get("civil_status")?,
        nr_date: parse_date(row, "nr_date", "citizens.nr_date")?,
        classified: row.get("classified")?,
        protected_nr: row.get("protected_nr")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        addresses: Vec::new(),
    };
    citizen.validate()?;
    Ok(citizen)
}

fn parse_address_row(row: &Row<'_>) -> RepoResult<Address> {
    Ok(Address {
        id: parse_uuid(row, "id", "citizen_addresses.id")?,
        status: row.get("status")?,
        nr_date: parse_date(row, "nr_date", "citizen_addresses.nr_date")?,
        co: row.get("co")?,
        address: row.get("address")?,
        address_area: row.get("address_area")?,
        address_number: row.get("address_number")?,
        address_letter: row.get("address_letter")?,
        apartment_number: row.get("apartment_number")?,
        postal_code: row.get("postal_code")?,
        city: row.get("city")?,
        county: row.get("county")?,
        municipality: row.get("municipality")?,
        country: row.get("country")?,
        address_type: row.get("address_type")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn parse_owner_row(row: &Row<'_>) -> RepoResult<OwnerSummary> {
    Ok(OwnerSummary {
        person_id: parse_uuid(row, "owner_person_id", "citizens.person_id")?,
        givenname: row.get("owner_givenname")?,
        lastname: row.get("owner_lastname")?,
        gender: row.get("owner_gender")?,
        classified: row.get("owner_classified")?,
        updated_at: row.get("owner_updated_at")?,
    })
}

fn parse_uuid(row: &Row<'_>, column: &str, label: &str) -> RepoResult<Uuid> {
    let text: String = row.get(column)?;
    Uuid::parse_str(&text)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{text}` in {label}")))
}

fn parse_date(row: &Row<'_>, column: &str, label: &str) -> RepoResult<Option<NaiveDate>> {
    match row.get::<_, Option<String>>(column)? {
        Some(text) => NaiveDate::parse_from_str(&text, DATE_FORMAT)
            .map(Some)
            .map_err(|_| RepoError::InvalidData(format!("invalid date `{text}` in {label}"))),
        None => Ok(None),
    }
}

fn date_to_db(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}
