use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use crate::{
    error::Result,
    monitor::SentNotification,
    storage::models::{NotificationRecord, NotificationStats},
};

/// Notification log backing the `history` CLI command. Deduplication does
/// not read from here; it is per-episode and lives in the monitor.
pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn new(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS notifications (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                token_id INTEGER NOT NULL,
                contact TEXT NOT NULL,
                renter TEXT NOT NULL,
                remaining_secs INTEGER NOT NULL,
                sent_at TEXT NOT NULL
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_notifications_token
             ON notifications(token_id)",
            [],
        )?;

        Ok(())
    }

    pub fn save_notification(&self, sent: &SentNotification) -> Result<()> {
        self.conn.execute(
            "INSERT INTO notifications (token_id, contact, renter, remaining_secs, sent_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                sent.token_id,
                sent.contact,
                sent.renter,
                sent.remaining_time,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn recent_notifications(&self, limit: Option<usize>) -> Result<Vec<NotificationRecord>> {
        let query = if let Some(lim) = limit {
            format!(
                "SELECT id, token_id, contact, renter, remaining_secs, sent_at
                 FROM notifications
                 ORDER BY sent_at DESC
                 LIMIT {}",
                lim
            )
        } else {
            "SELECT id, token_id, contact, renter, remaining_secs, sent_at
             FROM notifications
             ORDER BY sent_at DESC"
                .to_string()
        };

        let mut stmt = self.conn.prepare(&query)?;

        let records = stmt
            .query_map([], |row| {
                Ok(NotificationRecord {
                    id: row.get(0)?,
                    token_id: row.get(1)?,
                    contact: row.get(2)?,
                    renter: row.get(3)?,
                    remaining_secs: row.get(4)?,
                    sent_at: parse_timestamp(row.get::<_, String>(5)?, 5)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records)
    }

    pub fn stats(&self) -> Result<NotificationStats> {
        let (total_sent, unique_tokens): (u64, u64) = self.conn.query_row(
            "SELECT COUNT(*), COUNT(DISTINCT token_id) FROM notifications",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let last_sent_at: Option<String> = self.conn.query_row(
            "SELECT MAX(sent_at) FROM notifications",
            [],
            |row| row.get(0),
        )?;

        Ok(NotificationStats {
            total_sent,
            unique_tokens,
            last_sent_at: last_sent_at
                .map(|s| parse_timestamp(s, 0))
                .transpose()?,
        })
    }
}

fn parse_timestamp(raw: String, column: usize) -> rusqlite::Result<DateTime<Utc>> {
    raw.parse().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            column,
            rusqlite::types::Type::Text,
            Box::new(e),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sent(token_id: u64, contact: &str) -> SentNotification {
        SentNotification {
            token_id,
            contact: contact.to_string(),
            renter: "0x1111111111111111111111111111111111111111".to_string(),
            remaining_time: 300,
        }
    }

    fn open_temp() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("test.db").to_str().unwrap()).unwrap();
        (dir, db)
    }

    #[test]
    fn test_save_and_recent() {
        let (_dir, db) = open_temp();
        db.save_notification(&sent(1, "a@x.com")).unwrap();
        db.save_notification(&sent(2, "b@x.com")).unwrap();

        let all = db.recent_notifications(None).unwrap();
        assert_eq!(all.len(), 2);

        let limited = db.recent_notifications(Some(1)).unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[test]
    fn test_stats() {
        let (_dir, db) = open_temp();
        assert_eq!(db.stats().unwrap().total_sent, 0);
        assert!(db.stats().unwrap().last_sent_at.is_none());

        db.save_notification(&sent(1, "a@x.com")).unwrap();
        db.save_notification(&sent(1, "a@x.com")).unwrap();
        db.save_notification(&sent(2, "b@x.com")).unwrap();

        let stats = db.stats().unwrap();
        assert_eq!(stats.total_sent, 3);
        assert_eq!(stats.unique_tokens, 2);
        assert!(stats.last_sent_at.is_some());
    }
}
