//! Dashboard archive operations.

use rusqlite::{params, OptionalExtension, Row};
use sha2::{Digest, Sha256};

use super::{Database, DbResult};
use crate::models::DashboardData;

/// Dashboard as stored in the archive.
#[derive(Debug, Clone, PartialEq)]
pub struct ArchivedDashboard {
    pub home_id: String,
    pub dashboard: DashboardData,
    /// Rendered JS artifact
    pub content: String,
    pub content_sha256: String,
    pub archived_at: String,
}

/// Hex SHA-256 of an artifact.
pub fn content_digest(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

struct DashboardRow {
    home_id: String,
    date_key: String,
    date_display: String,
    generated_at: String,
    residents: String,
    content: String,
    content_sha256: String,
    archived_at: String,
}

impl DashboardRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            home_id: row.get(0)?,
            date_key: row.get(1)?,
            date_display: row.get(2)?,
            generated_at: row.get(3)?,
            residents: row.get(4)?,
            content: row.get(5)?,
            content_sha256: row.get(6)?,
            archived_at: row.get(7)?,
        })
    }

    fn into_archived(self) -> DbResult<ArchivedDashboard> {
        Ok(ArchivedDashboard {
            home_id: self.home_id,
            dashboard: DashboardData {
                date_key: self.date_key,
                date_display: self.date_display,
                generated_at: self.generated_at,
                residents: serde_json::from_str(&self.residents)?,
            },
            content: self.content,
            content_sha256: self.content_sha256,
            archived_at: self.archived_at,
        })
    }
}

const SELECT_COLUMNS: &str = "home_id, date_key, date_display, generated_at, residents, \
                              content, content_sha256, archived_at";

impl Database {
    /// Store a dashboard, replacing any earlier one for the same home and date.
    ///
    /// Returns the content digest.
    pub fn save_dashboard(
        &self,
        home_id: &str,
        dashboard: &DashboardData,
        content: &str,
    ) -> DbResult<String> {
        let residents_json = serde_json::to_string(&dashboard.residents)?;
        let digest = content_digest(content);

        self.conn.execute(
            r#"
            INSERT INTO dashboards (
                home_id, date_key, date_display, generated_at,
                resident_count, residents, content, content_sha256
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(home_id, date_key) DO UPDATE SET
                date_display = excluded.date_display,
                generated_at = excluded.generated_at,
                resident_count = excluded.resident_count,
                residents = excluded.residents,
                content = excluded.content,
                content_sha256 = excluded.content_sha256,
                archived_at = datetime('now')
            "#,
            params![
                home_id,
                dashboard.date_key,
                dashboard.date_display,
                dashboard.generated_at,
                dashboard.resident_count() as i64,
                residents_json,
                content,
                digest,
            ],
        )?;
        Ok(digest)
    }

    /// Get the archived dashboard for a home and date key.
    pub fn get_dashboard(&self, home_id: &str, date_key: &str) -> DbResult<Option<ArchivedDashboard>> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM dashboards WHERE home_id = ?1 AND date_key = ?2");
        let row = self
            .conn
            .query_row(&sql, params![home_id, date_key], DashboardRow::from_row)
            .optional()?;

        row.map(DashboardRow::into_archived).transpose()
    }

    /// All dashboards for a home, ordered by reporting date.
    pub fn list_dashboards(&self, home_id: &str) -> DbResult<Vec<ArchivedDashboard>> {
        // date_key is MM_DD_YYYY, so order on the rearranged date
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM dashboards WHERE home_id = ?1 \
             ORDER BY substr(date_key, 7, 4), substr(date_key, 1, 2), substr(date_key, 4, 2)"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([home_id], DashboardRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(DashboardRow::into_archived).collect()
    }

    /// Number of archived dashboards for a home.
    pub fn count_dashboards(&self, home_id: &str) -> DbResult<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM dashboards WHERE home_id = ?",
            [home_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DashboardResident, YesNo};

    fn dashboard(date_key: &str, data: f64) -> DashboardData {
        DashboardData {
            date_key: date_key.to_string(),
            date_display: date_key.replace('_', "/"),
            generated_at: "2026-10-14 09:30:00".to_string(),
            residents: vec![DashboardResident {
                name: "Doe, Jane".to_string(),
                goal: 1500.0,
                source: "plan.pdf - Page 1".to_string(),
                missed_3_days: YesNo::No,
                data,
                ipc_found: YesNo::No,
                infection: "-".to_string(),
                infection_type: "-".to_string(),
            }],
        }
    }

    #[test]
    fn test_save_and_get() {
        let db = Database::open_in_memory().unwrap();
        let digest = db
            .save_dashboard("cedar-grove", &dashboard("10_01_2026", 900.0), "const hydrationData = [];")
            .unwrap();

        let archived = db.get_dashboard("cedar-grove", "10_01_2026").unwrap().unwrap();
        assert_eq!(archived.content_sha256, digest);
        assert_eq!(archived.dashboard, dashboard("10_01_2026", 900.0));
        assert_eq!(digest.len(), 64);

        assert!(db.get_dashboard("cedar-grove", "10_02_2026").unwrap().is_none());
        assert!(db.get_dashboard("other-home", "10_01_2026").unwrap().is_none());
    }

    #[test]
    fn test_save_overwrites_same_date() {
        let db = Database::open_in_memory().unwrap();
        db.save_dashboard("cedar-grove", &dashboard("10_01_2026", 900.0), "v1").unwrap();
        db.save_dashboard("cedar-grove", &dashboard("10_01_2026", 1200.0), "v2").unwrap();

        assert_eq!(db.count_dashboards("cedar-grove").unwrap(), 1);
        let archived = db.get_dashboard("cedar-grove", "10_01_2026").unwrap().unwrap();
        assert_eq!(archived.content, "v2");
        assert_eq!(archived.dashboard.residents[0].data, 1200.0);
        assert_eq!(archived.content_sha256, content_digest("v2"));
    }

    #[test]
    fn test_list_ordered_by_date() {
        let db = Database::open_in_memory().unwrap();
        for key in ["01_02_2027", "12_31_2026", "10_01_2026"] {
            db.save_dashboard("cedar-grove", &dashboard(key, 0.0), key).unwrap();
        }
        db.save_dashboard("other-home", &dashboard("10_05_2026", 0.0), "x").unwrap();

        let keys: Vec<String> = db
            .list_dashboards("cedar-grove")
            .unwrap()
            .into_iter()
            .map(|a| a.dashboard.date_key)
            .collect();
        assert_eq!(keys, vec!["10_01_2026", "12_31_2026", "01_02_2027"]);
    }
}
