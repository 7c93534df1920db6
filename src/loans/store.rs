//! Loan Storage
//! Mission: Persist loan applications and apply guarded status transitions

use crate::loans::models::{ApplyLoanRequest, Loan, LoanStatus, Transition};
use anyhow::{Context, Result};
use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

const SCHEMA_SQL: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;

CREATE TABLE IF NOT EXISTS loans (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    amount REAL NOT NULL,
    purpose TEXT NOT NULL,
    term INTEGER NOT NULL,
    full_name TEXT NOT NULL,
    employment_status TEXT NOT NULL,
    employment_address TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending',
    verified_by TEXT,
    approved_by TEXT,
    rejected_by TEXT,
    verification_date TEXT,
    approval_date TEXT,
    rejection_date TEXT,
    notes TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_loans_user ON loans(user_id, created_at DESC);
CREATE INDEX IF NOT EXISTS idx_loans_status ON loans(status, created_at DESC);
"#;

const LOAN_COLUMNS: &str = "id, user_id, amount, purpose, term, full_name, employment_status, \
     employment_address, status, verified_by, approved_by, rejected_by, \
     verification_date, approval_date, rejection_date, notes, created_at, updated_at";

/// Outcome of a transition attempt
#[derive(Debug)]
pub enum TransitionOutcome {
    Applied(Loan),
    NotFound,
    /// Precondition failed; carries the status the loan was actually in
    InvalidState(LoanStatus),
}

/// Loan storage with SQLite backend
pub struct LoanStore {
    conn: Arc<Mutex<Connection>>,
}

impl LoanStore {
    /// Create a new loan store and initialize the schema
    pub fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open database at {}", db_path))?;

        conn.execute_batch(SCHEMA_SQL)
            .context("Failed to initialize loans schema")?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create a loan application in the pending state
    pub fn create_loan(&self, user_id: Uuid, request: &ApplyLoanRequest) -> Result<Loan> {
        let now = Utc::now().to_rfc3339();
        let loan = Loan {
            id: Uuid::new_v4(),
            user_id,
            amount: request.amount,
            purpose: request.purpose.trim().to_string(),
            term: request.term,
            full_name: request.full_name.trim().to_string(),
            employment_status: request.employment_status.trim().to_string(),
            employment_address: request.employment_address.trim().to_string(),
            status: LoanStatus::Pending,
            verified_by: None,
            approved_by: None,
            rejected_by: None,
            verification_date: None,
            approval_date: None,
            rejection_date: None,
            notes: None,
            created_at: now.clone(),
            updated_at: now,
        };

        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO loans (id, user_id, amount, purpose, term, full_name,
                 employment_status, employment_address, status, notes, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                loan.id.to_string(),
                loan.user_id.to_string(),
                loan.amount,
                loan.purpose,
                loan.term,
                loan.full_name,
                loan.employment_status,
                loan.employment_address,
                loan.status.as_str(),
                loan.notes,
                loan.created_at,
                loan.updated_at,
            ],
        )
        .context("Failed to insert loan")?;

        info!("Loan application created: {} by {}", loan.id, loan.user_id);

        Ok(loan)
    }

    /// Get a loan by id
    pub fn get_loan(&self, loan_id: &Uuid) -> Result<Option<Loan>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM loans WHERE id = ?1",
            LOAN_COLUMNS
        ))?;

        let loan = stmt
            .query_row(params![loan_id.to_string()], Self::row_to_loan)
            .map(Some);

        match loan {
            Ok(loan) => Ok(loan),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// List every loan (administrator view)
    pub fn list_all(&self) -> Result<Vec<Loan>> {
        self.query_loans(
            &format!("SELECT {} FROM loans ORDER BY created_at DESC", LOAN_COLUMNS),
            [],
        )
    }

    /// List loans owned by a user (applicant view)
    pub fn list_for_user(&self, user_id: &Uuid) -> Result<Vec<Loan>> {
        self.query_loans(
            &format!(
                "SELECT {} FROM loans WHERE user_id = ?1 ORDER BY created_at DESC",
                LOAN_COLUMNS
            ),
            params![user_id.to_string()],
        )
    }

    /// List loans in a given status (verifier view uses pending)
    pub fn list_by_status(&self, status: LoanStatus) -> Result<Vec<Loan>> {
        self.query_loans(
            &format!(
                "SELECT {} FROM loans WHERE status = ?1 ORDER BY created_at DESC",
                LOAN_COLUMNS
            ),
            params![status.as_str()],
        )
    }

    /// Apply a workflow transition as a compare-and-swap.
    ///
    /// The UPDATE only matches when the loan is still in one of the statuses
    /// the transition allows, so two concurrent transitions cannot both win;
    /// the loser observes the new status and reports InvalidState.
    pub fn apply_transition(
        &self,
        loan_id: &Uuid,
        transition: Transition,
        actor_id: &Uuid,
        notes: Option<&str>,
    ) -> Result<TransitionOutcome> {
        let (actor_col, date_col) = transition.audit_columns();
        let allowed = transition
            .allowed_from()
            .iter()
            .map(|s| format!("'{}'", s.as_str()))
            .collect::<Vec<_>>()
            .join(", ");

        let now = Utc::now().to_rfc3339();
        let sql = format!(
            "UPDATE loans
             SET status = ?1, {actor_col} = ?2, {date_col} = ?3,
                 notes = COALESCE(?4, notes), updated_at = ?5
             WHERE id = ?6 AND status IN ({allowed})"
        );

        let rows_affected = {
            let conn = self.conn.lock();
            conn.execute(
                &sql,
                params![
                    transition.target().as_str(),
                    actor_id.to_string(),
                    now,
                    notes,
                    now,
                    loan_id.to_string(),
                ],
            )
            .context("Failed to apply loan transition")?
        };

        if rows_affected == 0 {
            // Guard did not match: either the loan is gone or its status
            // disallows this transition.
            return match self.get_loan(loan_id)? {
                None => Ok(TransitionOutcome::NotFound),
                Some(loan) => Ok(TransitionOutcome::InvalidState(loan.status)),
            };
        }

        let loan = self
            .get_loan(loan_id)?
            .context("Loan vanished after transition")?;

        info!(
            "Loan {} -> {} by {}",
            loan_id,
            loan.status.as_str(),
            actor_id
        );

        Ok(TransitionOutcome::Applied(loan))
    }

    fn query_loans<P: rusqlite::Params>(&self, sql: &str, params: P) -> Result<Vec<Loan>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(sql)?;
        let loans = stmt
            .query_map(params, Self::row_to_loan)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(loans)
    }

    fn row_to_loan(row: &rusqlite::Row<'_>) -> rusqlite::Result<Loan> {
        fn parse_uuid(idx: usize, value: String) -> rusqlite::Result<Uuid> {
            Uuid::parse_str(&value).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    idx,
                    rusqlite::types::Type::Text,
                    e.into(),
                )
            })
        }

        fn parse_opt_uuid(idx: usize, value: Option<String>) -> rusqlite::Result<Option<Uuid>> {
            value.map(|v| parse_uuid(idx, v)).transpose()
        }

        let status_str: String = row.get(8)?;
        Ok(Loan {
            id: parse_uuid(0, row.get(0)?)?,
            user_id: parse_uuid(1, row.get(1)?)?,
            amount: row.get(2)?,
            purpose: row.get(3)?,
            term: row.get(4)?,
            full_name: row.get(5)?,
            employment_status: row.get(6)?,
            employment_address: row.get(7)?,
            status: LoanStatus::from_str(&status_str).unwrap_or(LoanStatus::Pending),
            verified_by: parse_opt_uuid(9, row.get(9)?)?,
            approved_by: parse_opt_uuid(10, row.get(10)?)?,
            rejected_by: parse_opt_uuid(11, row.get(11)?)?,
            verification_date: row.get(12)?,
            approval_date: row.get(13)?,
            rejection_date: row.get(14)?,
            notes: row.get(15)?,
            created_at: row.get(16)?,
            updated_at: row.get(17)?,
        })
    }
}
