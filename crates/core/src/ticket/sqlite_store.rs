//! SQLite-backed ticket store implementation.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, ToSql};
use tracing::warn;

use super::{
    CreateJobRequest, CreateTicketRequest, CreateVehicleRequest, Job, NewPaymentTransaction,
    ParkingLocation, PaymentConfig, PaymentRecord, PaymentStatus, PaymentTransaction,
    RecordOutcome, Ticket, TicketError, TicketStatus, TicketStore, TransactionStatus, Vehicle,
};
use crate::live::TicketFeed;
use crate::status::Phase;

const TICKET_COLUMNS: &str = "id, ticket_code, status, created_at, parked_at, requested_at, \
     completed_at, parking_zone, parking_level, parking_spot, payment_status, payment_intent_id, \
     vehicle_id, job_id, updated_at";

const TRANSACTION_COLUMNS: &str = "id, ticket_id, job_id, amount, base_amount, tip_amount, \
     currency, provider_transaction_id, status, created_at";

/// Attempts at generating a unique claim-tag code before giving up.
const CODE_ATTEMPTS: usize = 5;

/// SQLite-backed ticket store.
pub struct SqliteTicketStore {
    conn: Mutex<Connection>,
    feed: Option<TicketFeed>,
}

impl SqliteTicketStore {
    /// Create a new SQLite ticket store, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, TicketError> {
        let conn = Connection::open(path).map_err(db_err)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            feed: None,
        })
    }

    /// Create an in-memory SQLite ticket store (useful for testing).
    pub fn in_memory() -> Result<Self, TicketError> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            feed: None,
        })
    }

    /// Publish every ticket mutation to `feed`.
    pub fn with_feed(mut self, feed: TicketFeed) -> Self {
        self.feed = Some(feed);
        self
    }

    fn initialize_schema(conn: &Connection) -> Result<(), TicketError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS jobs (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                location TEXT NOT NULL,
                payment_config TEXT,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS vehicles (
                id TEXT PRIMARY KEY,
                make TEXT,
                model TEXT,
                color TEXT,
                license_plate TEXT
            );

            CREATE TABLE IF NOT EXISTS tickets (
                id TEXT PRIMARY KEY,
                ticket_code TEXT NOT NULL UNIQUE,
                status TEXT NOT NULL,
                created_at TEXT NOT NULL,
                parked_at TEXT,
                requested_at TEXT,
                completed_at TEXT,
                parking_zone TEXT,
                parking_level TEXT,
                parking_spot TEXT,
                payment_status TEXT NOT NULL DEFAULT 'unpaid',
                payment_intent_id TEXT,
                vehicle_id TEXT,
                job_id TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_tickets_job_id ON tickets(job_id);

            CREATE TABLE IF NOT EXISTS payment_transactions (
                id TEXT PRIMARY KEY,
                ticket_id TEXT NOT NULL,
                job_id TEXT NOT NULL,
                amount INTEGER NOT NULL,
                base_amount INTEGER NOT NULL,
                tip_amount INTEGER NOT NULL,
                currency TEXT NOT NULL,
                provider_transaction_id TEXT NOT NULL UNIQUE,
                status TEXT NOT NULL,
                created_at TEXT NOT NULL,
                CHECK (base_amount >= 0 AND tip_amount >= 0),
                CHECK (amount = base_amount + tip_amount)
            );

            CREATE INDEX IF NOT EXISTS idx_payment_transactions_ticket_id
                ON payment_transactions(ticket_id);
            "#,
        )
        .map_err(db_err)?;

        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, TicketError> {
        self.conn
            .lock()
            .map_err(|_| TicketError::Database("connection lock poisoned".to_string()))
    }

    fn publish(&self, ticket: &Ticket) {
        if let Some(feed) = &self.feed {
            feed.publish(ticket);
        }
    }

    fn row_to_ticket(row: &rusqlite::Row) -> rusqlite::Result<Ticket> {
        let id: String = row.get(0)?;
        let status_raw: String = row.get(2)?;

        // Unknown codes fail open to the first phase rather than hiding the ticket
        let status = TicketStatus::parse(&status_raw).unwrap_or_else(|| {
            warn!(ticket_id = %id, status = %status_raw, "Unknown ticket status in storage");
            TicketStatus::Created
        });

        Ok(Ticket {
            id,
            code: row.get(1)?,
            status,
            created_at: parse_timestamp(&row.get::<_, String>(3)?),
            parked_at: row.get::<_, Option<String>>(4)?.map(|s| parse_timestamp(&s)),
            requested_at: row.get::<_, Option<String>>(5)?.map(|s| parse_timestamp(&s)),
            completed_at: row.get::<_, Option<String>>(6)?.map(|s| parse_timestamp(&s)),
            parking: ParkingLocation {
                zone: row.get(7)?,
                level: row.get(8)?,
                spot: row.get(9)?,
            },
            payment_status: PaymentStatus::parse(&row.get::<_, String>(10)?),
            payment_ref: row.get(11)?,
            vehicle_id: row.get(12)?,
            job_id: row.get(13)?,
            updated_at: parse_timestamp(&row.get::<_, String>(14)?),
        })
    }

    fn row_to_job(row: &rusqlite::Row) -> rusqlite::Result<Job> {
        let id: String = row.get(0)?;
        let config_json: Option<String> = row.get(3)?;

        let payment_config = config_json.and_then(|json| {
            serde_json::from_str::<PaymentConfig>(&json)
                .map_err(|e| warn!(job_id = %id, error = %e, "Unreadable payment config"))
                .ok()
        });

        Ok(Job {
            id,
            title: row.get(1)?,
            location: row.get(2)?,
            payment_config,
            created_at: parse_timestamp(&row.get::<_, String>(4)?),
        })
    }

    fn row_to_transaction(row: &rusqlite::Row) -> rusqlite::Result<PaymentTransaction> {
        Ok(PaymentTransaction {
            id: row.get(0)?,
            ticket_id: row.get(1)?,
            job_id: row.get(2)?,
            amount: row.get(3)?,
            base_amount: row.get(4)?,
            tip_amount: row.get(5)?,
            currency: row.get(6)?,
            provider_transaction_id: row.get(7)?,
            status: TransactionStatus::Succeeded,
            created_at: parse_timestamp(&row.get::<_, String>(9)?),
        })
    }

    fn query_ticket(conn: &Connection, id: &str) -> Result<Option<Ticket>, TicketError> {
        conn.query_row(
            &format!("SELECT {} FROM tickets WHERE id = ?", TICKET_COLUMNS),
            params![id],
            Self::row_to_ticket,
        )
        .optional()
        .map_err(db_err)
    }

    /// Shared status update. Timestamps for the phase being entered are
    /// stamped only if still unset, so they never move once written. The
    /// exception is `requested_at`, which is rewritten on every entry into
    /// REQUESTED so a repeat request reflects the latest ask.
    fn write_status(
        &self,
        id: &str,
        expected: Option<&[TicketStatus]>,
        status: TicketStatus,
    ) -> Result<Ticket, TicketError> {
        let conn = self.conn()?;
        let now = Utc::now().to_rfc3339();
        let phase = Phase::of(status);

        let mut sql = String::from(
            "UPDATE tickets SET status = ?1, updated_at = ?2, \
             parked_at = CASE WHEN ?3 THEN COALESCE(parked_at, ?2) ELSE parked_at END, \
             requested_at = CASE WHEN ?1 = 'REQUESTED' THEN ?2 \
             WHEN ?4 THEN COALESCE(requested_at, ?2) ELSE requested_at END, \
             completed_at = CASE WHEN ?5 THEN COALESCE(completed_at, ?2) ELSE completed_at END \
             WHERE id = ?6",
        );

        let mut params: Vec<Box<dyn ToSql>> = vec![
            Box::new(status.as_str()),
            Box::new(now),
            Box::new(phase == Phase::Parked),
            Box::new(phase == Phase::Requested),
            Box::new(phase == Phase::Terminal),
            Box::new(id.to_string()),
        ];

        if let Some(expected) = expected {
            if expected.is_empty() {
                return Err(TicketError::InvalidInput(
                    "expected status set is empty".to_string(),
                ));
            }
            let placeholders: Vec<String> = (0..expected.len())
                .map(|i| format!("?{}", i + params.len() + 1))
                .collect();
            sql.push_str(&format!(" AND status IN ({})", placeholders.join(", ")));
            for s in expected {
                params.push(Box::new(s.as_str()));
            }
        }

        let param_refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let updated = conn
            .execute(&sql, param_refs.as_slice())
            .map_err(db_err)?;

        let ticket =
            Self::query_ticket(&conn, id)?.ok_or_else(|| TicketError::NotFound(id.to_string()))?;

        if updated == 0 {
            // Row exists but the guard did not match
            return Err(TicketError::InvalidState {
                ticket_id: id.to_string(),
                current_state: ticket.status.to_string(),
                operation: format!("move to {}", status),
            });
        }

        drop(conn);
        self.publish(&ticket);
        Ok(ticket)
    }
}

impl TicketStore for SqliteTicketStore {
    fn create_job(&self, request: CreateJobRequest) -> Result<Job, TicketError> {
        if let Some(config) = &request.payment_config {
            config.validate().map_err(TicketError::InvalidInput)?;
        }

        let conn = self.conn()?;
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();

        let config_json = request
            .payment_config
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| TicketError::Database(e.to_string()))?;

        conn.execute(
            "INSERT INTO jobs (id, title, location, payment_config, created_at) VALUES (?, ?, ?, ?, ?)",
            params![id, request.title, request.location, config_json, now.to_rfc3339()],
        )
        .map_err(db_err)?;

        Ok(Job {
            id,
            title: request.title,
            location: request.location,
            payment_config: request.payment_config,
            created_at: now,
        })
    }

    fn get_job(&self, id: &str) -> Result<Option<Job>, TicketError> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id, title, location, payment_config, created_at FROM jobs WHERE id = ?",
            params![id],
            Self::row_to_job,
        )
        .optional()
        .map_err(db_err)
    }

    fn create_vehicle(&self, request: CreateVehicleRequest) -> Result<Vehicle, TicketError> {
        let conn = self.conn()?;
        let id = uuid::Uuid::new_v4().to_string();

        conn.execute(
            "INSERT INTO vehicles (id, make, model, color, license_plate) VALUES (?, ?, ?, ?, ?)",
            params![
                id,
                request.make,
                request.model,
                request.color,
                request.license_plate
            ],
        )
        .map_err(db_err)?;

        Ok(Vehicle {
            id,
            make: request.make,
            model: request.model,
            color: request.color,
            license_plate: request.license_plate,
        })
    }

    fn get_vehicle(&self, id: &str) -> Result<Option<Vehicle>, TicketError> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id, make, model, color, license_plate FROM vehicles WHERE id = ?",
            params![id],
            |row| {
                Ok(Vehicle {
                    id: row.get(0)?,
                    make: row.get(1)?,
                    model: row.get(2)?,
                    color: row.get(3)?,
                    license_plate: row.get(4)?,
                })
            },
        )
        .optional()
        .map_err(db_err)
    }

    fn create_ticket(&self, request: CreateTicketRequest) -> Result<Ticket, TicketError> {
        let conn = self.conn()?;

        let job_exists: bool = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM jobs WHERE id = ?)",
                params![request.job_id],
                |row| row.get(0),
            )
            .map_err(db_err)?;
        if !job_exists {
            return Err(TicketError::NotFound(format!("job {}", request.job_id)));
        }

        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();
        let status = TicketStatus::Created;

        let attempts = if request.code.is_some() { 1 } else { CODE_ATTEMPTS };
        let mut code = String::new();
        let mut inserted = false;

        for _ in 0..attempts {
            code = request.code.clone().unwrap_or_else(generate_code);
            let result = conn.execute(
                "INSERT INTO tickets (id, ticket_code, status, created_at, parking_zone, parking_level, parking_spot, payment_status, vehicle_id, job_id, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    id,
                    code,
                    status.as_str(),
                    now.to_rfc3339(),
                    request.parking.zone,
                    request.parking.level,
                    request.parking.spot,
                    PaymentStatus::Unpaid.as_str(),
                    request.vehicle_id,
                    request.job_id,
                    now.to_rfc3339(),
                ],
            );

            match result {
                Ok(_) => {
                    inserted = true;
                    break;
                }
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    continue;
                }
                Err(e) => return Err(db_err(e)),
            }
        }

        if !inserted {
            return Err(TicketError::InvalidInput(format!(
                "ticket code {} is already in use",
                code
            )));
        }

        Ok(Ticket {
            id,
            code,
            status,
            created_at: now,
            parked_at: None,
            requested_at: None,
            completed_at: None,
            parking: request.parking,
            payment_status: PaymentStatus::Unpaid,
            payment_ref: None,
            vehicle_id: request.vehicle_id,
            job_id: request.job_id,
            updated_at: now,
        })
    }

    fn get(&self, id: &str) -> Result<Option<Ticket>, TicketError> {
        let conn = self.conn()?;
        Self::query_ticket(&conn, id)
    }

    fn get_by_code(&self, code: &str) -> Result<Option<Ticket>, TicketError> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {} FROM tickets WHERE ticket_code = ?", TICKET_COLUMNS),
            params![code],
            Self::row_to_ticket,
        )
        .optional()
        .map_err(db_err)
    }

    fn update_status(&self, id: &str, status: TicketStatus) -> Result<Ticket, TicketError> {
        self.write_status(id, None, status)
    }

    fn compare_and_set_status(
        &self,
        id: &str,
        expected: &[TicketStatus],
        status: TicketStatus,
    ) -> Result<Ticket, TicketError> {
        self.write_status(id, Some(expected), status)
    }

    fn record_payment(&self, payment: NewPaymentTransaction) -> Result<PaymentRecord, TicketError> {
        if payment.base_amount < 0
            || payment.tip_amount < 0
            || payment.base_amount.checked_add(payment.tip_amount) != Some(payment.amount)
        {
            return Err(TicketError::InvalidInput(format!(
                "amount {} does not split into base {} + tip {}",
                payment.amount, payment.base_amount, payment.tip_amount
            )));
        }

        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(db_err)?;
        let now = Utc::now();
        let transaction_id = uuid::Uuid::new_v4().to_string();

        let inserted = tx
            .execute(
                &format!(
                    "INSERT OR IGNORE INTO payment_transactions ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                    TRANSACTION_COLUMNS
                ),
                params![
                    transaction_id,
                    payment.ticket_id,
                    payment.job_id,
                    payment.amount,
                    payment.base_amount,
                    payment.tip_amount,
                    payment.currency,
                    payment.provider_transaction_id,
                    TransactionStatus::Succeeded.as_str(),
                    now.to_rfc3339(),
                ],
            )
            .map_err(db_err)?;

        let updated = tx
            .execute(
                "UPDATE tickets SET payment_status = ?, payment_intent_id = ?, updated_at = ? WHERE id = ?",
                params![
                    PaymentStatus::Paid.as_str(),
                    payment.provider_transaction_id,
                    now.to_rfc3339(),
                    payment.ticket_id,
                ],
            )
            .map_err(db_err)?;

        if updated == 0 {
            // Dropping the transaction rolls back the insert
            return Err(TicketError::NotFound(payment.ticket_id));
        }

        let ticket = Self::query_ticket(&tx, &payment.ticket_id)?
            .ok_or_else(|| TicketError::NotFound(payment.ticket_id.clone()))?;

        tx.commit().map_err(db_err)?;
        drop(conn);

        let outcome = if inserted == 1 {
            self.publish(&ticket);
            RecordOutcome::Recorded(PaymentTransaction {
                id: transaction_id,
                ticket_id: payment.ticket_id,
                job_id: payment.job_id,
                amount: payment.amount,
                base_amount: payment.base_amount,
                tip_amount: payment.tip_amount,
                currency: payment.currency,
                provider_transaction_id: payment.provider_transaction_id,
                status: TransactionStatus::Succeeded,
                created_at: now,
            })
        } else {
            RecordOutcome::Duplicate {
                provider_transaction_id: payment.provider_transaction_id,
            }
        };

        Ok(PaymentRecord { outcome, ticket })
    }

    fn list_transactions(&self, ticket_id: &str) -> Result<Vec<PaymentTransaction>, TicketError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM payment_transactions WHERE ticket_id = ? ORDER BY created_at ASC",
                TRANSACTION_COLUMNS
            ))
            .map_err(db_err)?;

        let rows = stmt
            .query_map(params![ticket_id], Self::row_to_transaction)
            .map_err(db_err)?;

        let mut transactions = Vec::new();
        for row_result in rows {
            transactions.push(row_result.map_err(db_err)?);
        }

        Ok(transactions)
    }
}

fn db_err(e: rusqlite::Error) -> TicketError {
    TicketError::Database(e.to_string())
}

// Timestamps are always written by this store as RFC 3339
fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

/// Six-character uppercase claim-tag code.
fn generate_code() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..6].to_uppercase()
}
