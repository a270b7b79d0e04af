//! Timer session persistence.
//!
//! # Invariants
//! - At most one row exists (`id = 1`).
//! - Saving overwrites the whole session.

use crate::model::timer::{Phase, TimerSession};
use crate::repo::{ensure_connection_ready, flag_to_db, parse_flag, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension};

/// Repository interface for the singleton timer session.
pub trait TimerRepository {
    /// Loads the persisted session, if one was ever saved.
    fn load_session(&self) -> RepoResult<Option<TimerSession>>;
    /// Writes `session` as the current persisted session.
    fn save_session(&self, session: &TimerSession) -> RepoResult<()>;
}

pub struct SqliteTimerRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTimerRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl TimerRepository for SqliteTimerRepository<'_> {
    fn load_session(&self) -> RepoResult<Option<TimerSession>> {
        let row = self
            .conn
            .query_row(
                "SELECT phase, work_duration, break_duration, remaining, is_paused
                 FROM timer_session
                 WHERE id = 1;",
                [],
                |row| {
                    Ok((
                        row.get::<_, String>("phase")?,
                        row.get::<_, u32>("work_duration")?,
                        row.get::<_, u32>("break_duration")?,
                        row.get::<_, u32>("remaining")?,
                        row.get::<_, i64>("is_paused")?,
                    ))
                },
            )
            .optional()?;

        let Some((phase, work_duration, break_duration, remaining, is_paused)) = row else {
            return Ok(None);
        };
        let phase = Phase::parse(&phase).ok_or_else(|| {
            RepoError::InvalidData(format!("invalid phase `{phase}` in timer_session.phase"))
        })?;

        Ok(Some(TimerSession {
            phase,
            work_duration,
            break_duration,
            remaining,
            is_paused: parse_flag(is_paused, "timer_session.is_paused")?,
        }))
    }

    fn save_session(&self, session: &TimerSession) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO timer_session (
                id,
                phase,
                work_duration,
                break_duration,
                remaining,
                is_paused
            ) VALUES (1, ?1, ?2, ?3, ?4, ?5)
            ON CONFLICT (id) DO UPDATE SET
                phase = excluded.phase,
                work_duration = excluded.work_duration,
                break_duration = excluded.break_duration,
                remaining = excluded.remaining,
                is_paused = excluded.is_paused,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![
                session.phase.as_str(),
                session.work_duration,
                session.break_duration,
                session.remaining,
                flag_to_db(session.is_paused),
            ],
        )?;
        Ok(())
    }
}
