//! Ledger Store — SQLite-backed Shared State
//!
//! The ledger exclusively owns all persisted state: users, markets, bets,
//! and the weekly snapshot. Two independent triggers mutate it (the
//! settlement timer and request handlers, possibly from several
//! front-ends), so every multi-step read-then-write sequence runs through
//! `Ledger::exclusive`: one async mutex acquisition, one SQLite
//! transaction, commit on success, rollback on error. Callers never take
//! the lock for a single step and never hold it across a network call.
//!
//! Invariant violations (overdraw, a second OPEN market) surface as typed
//! errors that abort the unit of work; the data is never silently "fixed".

use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Transaction, params};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::info;

use crate::domain::bet::{Bet, BetHistoryEntry, Direction};
use crate::domain::market::{Market, MarketStatus};
use crate::domain::user::{LeaderboardEntry, User};

/// Errors from ledger operations.
///
/// `Overdraw` and `MarketAlreadyOpen` are invariant guards: with correct
/// serialization they cannot fire, and if they do the offending unit of
/// work is rolled back rather than patched over.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Underlying SQLite failure.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Referenced user does not exist.
    #[error("unknown user {0}")]
    UnknownUser(i64),

    /// A debit would push a balance below zero.
    #[error("debit of {amount} would overdraw user {user_id} (balance {balance})")]
    Overdraw {
        /// User whose balance was protected.
        user_id: i64,
        /// Balance at the time of the attempt.
        balance: i64,
        /// Requested debit.
        amount: i64,
    },

    /// Attempted to open a market while one is already OPEN.
    #[error("market {0} is already open")]
    MarketAlreadyOpen(i64),

    /// Attempted to close a market that is not OPEN.
    #[error("market {0} is not open")]
    MarketNotOpen(i64),

    /// Second bet by the same user on the same market.
    #[error("user {user_id} already has a bet on market {market_id}")]
    DuplicateBet {
        /// Offending user.
        user_id: i64,
        /// Target market.
        market_id: i64,
    },
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    id         INTEGER PRIMARY KEY,
    username   TEXT    NOT NULL,
    coins      INTEGER NOT NULL DEFAULT 0 CHECK (coins >= 0),
    last_daily TEXT
);

CREATE TABLE IF NOT EXISTS markets (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    open_price  REAL NOT NULL,
    close_price REAL,
    open_time   TEXT NOT NULL,
    close_time  TEXT,
    status      TEXT NOT NULL DEFAULT 'OPEN'
);

CREATE TABLE IF NOT EXISTS bets (
    id        INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id   INTEGER NOT NULL REFERENCES users(id),
    market_id INTEGER NOT NULL REFERENCES markets(id),
    direction TEXT    NOT NULL,
    amount    INTEGER NOT NULL,
    resolved  INTEGER NOT NULL DEFAULT 0,
    UNIQUE(user_id, market_id)
);

CREATE TABLE IF NOT EXISTS weekly_snapshot (
    user_id             INTEGER PRIMARY KEY REFERENCES users(id),
    coins_at_week_start INTEGER NOT NULL DEFAULT 0,
    week_start          TEXT    NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_bets_market  ON bets(market_id, resolved);
CREATE INDEX IF NOT EXISTS idx_markets_status ON markets(status);
";

/// The shared ledger store.
///
/// One `Connection` behind one async mutex: the mutex is the global
/// serialization boundary the settlement engine and the admission path
/// both pass through.
pub struct Ledger {
    conn: Mutex<Connection>,
}

impl Ledger {
    /// Open (or create) the ledger at `path` and initialize the schema.
    pub fn open(path: &str) -> Result<Self, LedgerError> {
        let conn = Connection::open(path)?;
        // WAL keeps readers from blocking the writer when a second
        // front-end process shares the file.
        conn.query_row("PRAGMA journal_mode = WAL", [], |_row| Ok(()))?;
        conn.busy_timeout(Duration::from_secs(5))?;
        let ledger = Self::init(conn)?;
        info!(path, "Ledger opened");
        Ok(ledger)
    }

    /// Open an in-memory ledger (tests).
    pub fn in_memory() -> Result<Self, LedgerError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, LedgerError> {
        conn.pragma_update(None, "foreign_keys", true)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run a unit of work exclusively.
    ///
    /// Acquires the global ledger lock, opens a transaction, and hands a
    /// typed view to `f`. Commit on `Ok`, rollback on `Err`. Everything
    /// that reads-then-writes balances or bet rows goes through here.
    pub async fn exclusive<T>(
        &self,
        f: impl FnOnce(&LedgerTx<'_>) -> Result<T, LedgerError> + Send,
    ) -> Result<T, LedgerError> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        let view = LedgerTx { tx };
        let out = f(&view)?;
        view.tx.commit()?;
        Ok(out)
    }
}

/// Typed operations available inside a unit of work.
///
/// Each method is one SQL step; composition into atomic sequences happens
/// in the closure passed to [`Ledger::exclusive`].
pub struct LedgerTx<'conn> {
    tx: Transaction<'conn>,
}

impl LedgerTx<'_> {
    // ── users ───────────────────────────────────────────────

    /// Create the user on first interaction; refresh the username after.
    pub fn ensure_user(&self, user_id: i64, username: &str) -> Result<(), LedgerError> {
        self.tx.execute(
            "INSERT INTO users (id, username, coins) VALUES (?1, ?2, 0)
             ON CONFLICT(id) DO UPDATE SET username = excluded.username",
            params![user_id, username],
        )?;
        Ok(())
    }

    /// Load a user row.
    pub fn user(&self, user_id: i64) -> Result<Option<User>, LedgerError> {
        let row = self
            .tx
            .query_row(
                "SELECT id, username, coins, last_daily FROM users WHERE id = ?1",
                params![user_id],
                |row| {
                    Ok(User {
                        id: row.get(0)?,
                        username: row.get(1)?,
                        coins: row.get(2)?,
                        last_daily: row
                            .get::<_, Option<String>>(3)?
                            .map(|raw| parse_date(&raw))
                            .transpose()?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    /// Current balance, or `None` for an unknown user.
    pub fn coins(&self, user_id: i64) -> Result<Option<i64>, LedgerError> {
        let coins = self
            .tx
            .query_row(
                "SELECT coins FROM users WHERE id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(coins)
    }

    /// Credit coins to a user.
    pub fn credit(&self, user_id: i64, amount: i64) -> Result<(), LedgerError> {
        let rows = self.tx.execute(
            "UPDATE users SET coins = coins + ?2 WHERE id = ?1",
            params![user_id, amount],
        )?;
        if rows == 0 {
            return Err(LedgerError::UnknownUser(user_id));
        }
        Ok(())
    }

    /// Debit coins from a user, refusing to overdraw.
    ///
    /// Returns the balance after the debit.
    pub fn debit(&self, user_id: i64, amount: i64) -> Result<i64, LedgerError> {
        let rows = self.tx.execute(
            "UPDATE users SET coins = coins - ?2 WHERE id = ?1 AND coins >= ?2",
            params![user_id, amount],
        )?;
        if rows == 0 {
            let balance = self
                .coins(user_id)?
                .ok_or(LedgerError::UnknownUser(user_id))?;
            return Err(LedgerError::Overdraw {
                user_id,
                balance,
                amount,
            });
        }
        self.coins(user_id)?.ok_or(LedgerError::UnknownUser(user_id))
    }

    /// Record the date of a daily-reward claim.
    pub fn set_last_daily(&self, user_id: i64, date: NaiveDate) -> Result<(), LedgerError> {
        let rows = self.tx.execute(
            "UPDATE users SET last_daily = ?2 WHERE id = ?1",
            params![user_id, date.to_string()],
        )?;
        if rows == 0 {
            return Err(LedgerError::UnknownUser(user_id));
        }
        Ok(())
    }

    /// 1-based rank of a user by absolute balance.
    pub fn rank(&self, user_id: i64) -> Result<i64, LedgerError> {
        let rank = self.tx.query_row(
            "SELECT COUNT(*) + 1 FROM users
             WHERE coins > (SELECT coins FROM users WHERE id = ?1)",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(rank)
    }

    // ── markets ─────────────────────────────────────────────

    /// The single currently OPEN market, if any.
    pub fn open_market(&self) -> Result<Option<Market>, LedgerError> {
        let market = self
            .tx
            .query_row(
                "SELECT id, open_price, close_price, open_time, close_time, status
                 FROM markets WHERE status = 'OPEN' ORDER BY id DESC LIMIT 1",
                [],
                market_from_row,
            )
            .optional()?;
        Ok(market)
    }

    /// Insert a new OPEN market.
    ///
    /// Guards the one-open-market invariant: fails if an OPEN market
    /// already exists.
    pub fn insert_open_market(
        &self,
        open_price: f64,
        open_time: DateTime<Utc>,
        close_deadline: DateTime<Utc>,
    ) -> Result<Market, LedgerError> {
        if let Some(existing) = self.open_market()? {
            return Err(LedgerError::MarketAlreadyOpen(existing.id));
        }
        self.tx.execute(
            "INSERT INTO markets (open_price, open_time, close_time, status)
             VALUES (?1, ?2, ?3, 'OPEN')",
            params![open_price, open_time.to_rfc3339(), close_deadline.to_rfc3339()],
        )?;
        Ok(Market {
            id: self.tx.last_insert_rowid(),
            open_price,
            close_price: None,
            open_time,
            close_time: Some(close_deadline),
            status: MarketStatus::Open,
        })
    }

    /// Transition a market OPEN → CLOSED, recording close price and time.
    pub fn close_market(
        &self,
        market_id: i64,
        close_price: f64,
        close_time: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        let rows = self.tx.execute(
            "UPDATE markets SET close_price = ?2, close_time = ?3, status = 'CLOSED'
             WHERE id = ?1 AND status = 'OPEN'",
            params![market_id, close_price, close_time.to_rfc3339()],
        )?;
        if rows == 0 {
            return Err(LedgerError::MarketNotOpen(market_id));
        }
        Ok(())
    }

    // ── bets ────────────────────────────────────────────────

    /// Insert a bet row for an open market.
    ///
    /// The UNIQUE(user_id, market_id) constraint backstops the
    /// admission-time duplicate check.
    pub fn insert_bet(
        &self,
        user_id: i64,
        market_id: i64,
        direction: Direction,
        amount: i64,
    ) -> Result<i64, LedgerError> {
        let inserted = self.tx.execute(
            "INSERT INTO bets (user_id, market_id, direction, amount) VALUES (?1, ?2, ?3, ?4)",
            params![user_id, market_id, direction.as_str(), amount],
        );
        match inserted {
            Ok(_) => Ok(self.tx.last_insert_rowid()),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(LedgerError::DuplicateBet { user_id, market_id })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// The user's unresolved bet on a market, if any.
    pub fn active_bet(&self, user_id: i64, market_id: i64) -> Result<Option<Bet>, LedgerError> {
        let bet = self
            .tx
            .query_row(
                "SELECT id, user_id, market_id, direction, amount, resolved
                 FROM bets WHERE user_id = ?1 AND market_id = ?2 AND resolved = 0",
                params![user_id, market_id],
                bet_from_row,
            )
            .optional()?;
        Ok(bet)
    }

    /// All unresolved bets on a market (the settlement working set).
    pub fn unresolved_bets(&self, market_id: i64) -> Result<Vec<Bet>, LedgerError> {
        let mut stmt = self.tx.prepare(
            "SELECT id, user_id, market_id, direction, amount, resolved
             FROM bets WHERE market_id = ?1 AND resolved = 0 ORDER BY id",
        )?;
        let bets = stmt
            .query_map(params![market_id], bet_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(bets)
    }

    /// Flip every bet on a market to resolved. Returns the count.
    pub fn mark_bets_resolved(&self, market_id: i64) -> Result<usize, LedgerError> {
        let rows = self.tx.execute(
            "UPDATE bets SET resolved = 1 WHERE market_id = ?1",
            params![market_id],
        )?;
        Ok(rows)
    }

    /// Last `limit` bets for a user, joined with market prices and a
    /// won flag for resolved bets.
    pub fn recent_bets(
        &self,
        user_id: i64,
        limit: i64,
    ) -> Result<Vec<BetHistoryEntry>, LedgerError> {
        let mut stmt = self.tx.prepare(
            "SELECT b.id, b.market_id, b.direction, b.amount, b.resolved,
                    m.open_price, m.close_price,
                    CASE WHEN b.resolved = 1
                         AND ((m.close_price > m.open_price AND b.direction = 'UP')
                           OR (m.close_price < m.open_price AND b.direction = 'DOWN'))
                         THEN 1 ELSE 0 END AS won
             FROM bets b
             JOIN markets m ON m.id = b.market_id
             WHERE b.user_id = ?1
             ORDER BY b.id DESC
             LIMIT ?2",
        )?;
        let entries = stmt
            .query_map(params![user_id, limit], |row| {
                Ok(BetHistoryEntry {
                    id: row.get(0)?,
                    market_id: row.get(1)?,
                    direction: parse_direction(&row.get::<_, String>(2)?)?,
                    amount: row.get(3)?,
                    resolved: row.get::<_, i64>(4)? == 1,
                    open_price: row.get(5)?,
                    close_price: row.get(6)?,
                    won: row.get::<_, i64>(7)? == 1,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    // ── weekly snapshot ─────────────────────────────────────

    /// The week the current snapshot was taken for, if one exists.
    pub fn snapshot_week(&self) -> Result<Option<NaiveDate>, LedgerError> {
        let week = self
            .tx
            .query_row(
                "SELECT week_start FROM weekly_snapshot LIMIT 1",
                [],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        week.map(|raw| parse_date(&raw).map_err(LedgerError::from))
            .transpose()
    }

    /// Replace the entire snapshot set with a fresh capture of every
    /// balance, tagged with `week_start`. Full replace, never a merge.
    pub fn replace_weekly_snapshot(&self, week_start: NaiveDate) -> Result<usize, LedgerError> {
        self.tx.execute("DELETE FROM weekly_snapshot", [])?;
        let rows = self.tx.execute(
            "INSERT INTO weekly_snapshot (user_id, coins_at_week_start, week_start)
             SELECT id, coins, ?1 FROM users",
            params![week_start.to_string()],
        )?;
        Ok(rows)
    }

    /// `coins − snapshot(coins_at_week_start)` for one user; the snapshot
    /// balance defaults to 0 when no row exists (new users, pre-rollover).
    pub fn weekly_gain(&self, user_id: i64, week_start: NaiveDate) -> Result<i64, LedgerError> {
        let gain = self
            .tx
            .query_row(
                "SELECT u.coins - COALESCE(s.coins_at_week_start, 0)
                 FROM users u
                 LEFT JOIN weekly_snapshot s
                   ON s.user_id = u.id AND s.week_start = ?2
                 WHERE u.id = ?1",
                params![user_id, week_start.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        gain.ok_or(LedgerError::UnknownUser(user_id))
    }

    /// Top `limit` users by (weekly gain desc, balance desc).
    pub fn leaderboard(
        &self,
        week_start: NaiveDate,
        limit: i64,
    ) -> Result<Vec<LeaderboardEntry>, LedgerError> {
        let mut stmt = self.tx.prepare(
            "SELECT u.username, u.coins,
                    u.coins - COALESCE(s.coins_at_week_start, 0) AS weekly_gain
             FROM users u
             LEFT JOIN weekly_snapshot s
               ON s.user_id = u.id AND s.week_start = ?1
             ORDER BY weekly_gain DESC, u.coins DESC
             LIMIT ?2",
        )?;
        let entries = stmt
            .query_map(params![week_start.to_string(), limit], |row| {
                Ok(LeaderboardEntry {
                    username: row.get(0)?,
                    coins: row.get(1)?,
                    weekly_gain: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }
}

// ── row mapping helpers ─────────────────────────────────────

fn bet_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Bet> {
    Ok(Bet {
        id: row.get(0)?,
        user_id: row.get(1)?,
        market_id: row.get(2)?,
        direction: parse_direction(&row.get::<_, String>(3)?)?,
        amount: row.get(4)?,
        resolved: row.get::<_, i64>(5)? == 1,
    })
}

fn market_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Market> {
    let status_raw: String = row.get(5)?;
    Ok(Market {
        id: row.get(0)?,
        open_price: row.get(1)?,
        close_price: row.get(2)?,
        open_time: parse_ts(&row.get::<_, String>(3)?)?,
        close_time: row
            .get::<_, Option<String>>(4)?
            .map(|raw| parse_ts(&raw))
            .transpose()?,
        status: MarketStatus::parse(&status_raw).ok_or_else(|| {
            conversion_error(format!("invalid market status: {status_raw}"))
        })?,
    })
}

fn parse_direction(raw: &str) -> rusqlite::Result<Direction> {
    Direction::parse(raw)
        .ok_or_else(|| conversion_error(format!("invalid bet direction: {raw}")))
}

fn parse_ts(raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))
}

fn parse_date(raw: &str) -> rusqlite::Result<NaiveDate> {
    raw.parse::<NaiveDate>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))
}

fn conversion_error(message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(0, Type::Text, message.into())
}
