//! SQLite schema definition.

/// Dashboard archive schema.
pub const SCHEMA: &str = r#"
-- ============================================================================
-- Generated dashboards
-- ============================================================================

-- One row per home and reporting date; regenerating a date replaces the row
CREATE TABLE IF NOT EXISTS dashboards (
    home_id TEXT NOT NULL,
    date_key TEXT NOT NULL,                       -- MM_DD_YYYY
    date_display TEXT NOT NULL,                   -- MM/DD/YYYY
    generated_at TEXT NOT NULL,
    resident_count INTEGER NOT NULL,
    residents TEXT NOT NULL,                      -- JSON array of dashboard rows
    content TEXT NOT NULL,                        -- rendered JS artifact
    content_sha256 TEXT NOT NULL,
    archived_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (home_id, date_key)
);

CREATE INDEX IF NOT EXISTS idx_dashboards_generated_at ON dashboards(generated_at);
"#;
