use anyhow::Result;
use rusqlite::Connection;

pub const DB_PATH: &str = "data/spells.sqlite";

pub fn connect(path: &str) -> Result<Connection> {
    if let Some(dir) = std::path::Path::new(path).parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)?;
        }
    }
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS spells (
            name             TEXT PRIMARY KEY,
            source           TEXT NOT NULL,
            block_index      INTEGER NOT NULL,
            school           TEXT NOT NULL,
            school_base      TEXT NOT NULL,
            subschool        TEXT,
            descriptors      TEXT,
            level            TEXT NOT NULL,
            components       TEXT,
            casting_time     TEXT,
            range_text       TEXT,
            area             TEXT,
            effect           TEXT,
            target           TEXT,
            targets          TEXT,
            duration         TEXT,
            saving_throw     TEXT,
            spell_resistance TEXT,
            description      TEXT NOT NULL,
            warnings         TEXT,
            parsed_at        TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_spells_school ON spells(school_base);

        CREATE TABLE IF NOT EXISTS parse_failures (
            id          INTEGER PRIMARY KEY,
            source      TEXT NOT NULL,
            block_index INTEGER NOT NULL,
            kind        TEXT NOT NULL CHECK(kind IN ('missing_level','no_levels')),
            name        TEXT,
            raw         TEXT NOT NULL,
            failed_at   TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(source, block_index)
        );
        ",
    )?;
    Ok(())
}

// ── Parsed spells ──

pub struct SpellRow {
    pub name: String,
    pub source: String,
    pub block_index: i64,
    pub school: String,
    pub school_base: String,
    pub subschool: Option<String>,
    pub descriptors: Option<String>,
    pub level: String,
    pub components: Option<String>,
    pub casting_time: Option<String>,
    pub range_text: Option<String>,
    pub area: Option<String>,
    pub effect: Option<String>,
    pub target: Option<String>,
    pub targets: Option<String>,
    pub duration: Option<String>,
    pub saving_throw: Option<String>,
    pub spell_resistance: Option<String>,
    pub description: String,
    pub warnings: Option<String>, // JSON array of {field, raw}
}

/// Upsert by spell name; a later block with the same name replaces the earlier one.
pub fn save_spells(conn: &Connection, rows: &[SpellRow]) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut count = 0;
    {
        let mut stmt = tx.prepare(
            "INSERT OR REPLACE INTO spells
             (name, source, block_index, school, school_base, subschool, descriptors, level,
              components, casting_time, range_text, area, effect, target, targets, duration,
              saving_throw, spell_resistance, description, warnings)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17,?18,?19,?20)",
        )?;
        for r in rows {
            count += stmt.execute(rusqlite::params![
                r.name, r.source, r.block_index, r.school, r.school_base, r.subschool,
                r.descriptors, r.level, r.components, r.casting_time, r.range_text, r.area,
                r.effect, r.target, r.targets, r.duration, r.saving_throw, r.spell_resistance,
                r.description, r.warnings,
            ])?;
        }
    }
    tx.commit()?;
    Ok(count)
}

// ── Failures ──

pub struct FailureRow {
    pub source: String,
    pub block_index: i64,
    pub kind: String, // "missing_level", "no_levels"
    pub name: Option<String>,
    pub raw: String,
}

pub fn save_failures(conn: &Connection, rows: &[FailureRow]) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut count = 0;
    {
        let mut stmt = tx.prepare(
            "INSERT OR REPLACE INTO parse_failures (source, block_index, kind, name, raw)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        for r in rows {
            count += stmt.execute(rusqlite::params![r.source, r.block_index, r.kind, r.name, r.raw])?;
        }
    }
    tx.commit()?;
    Ok(count)
}

/// Drop failures recorded for a source before it is parsed again.
pub fn clear_failures(conn: &Connection, source: &str) -> Result<usize> {
    Ok(conn.execute("DELETE FROM parse_failures WHERE source = ?1", [source])?)
}

// ── Overview ──

pub struct OverviewRow {
    pub name: String,
    pub school: String,
    pub level: String,
    pub components: String,
    pub range_text: String,
    pub duration: String,
    pub has_warnings: bool,
}

pub fn fetch_overview(conn: &Connection, school: Option<&str>, limit: usize) -> Result<Vec<OverviewRow>> {
    let mut conditions = Vec::new();
    let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

    if let Some(s) = school {
        conditions.push(format!("school_base = ?{}", params.len() + 1));
        params.push(Box::new(s.to_string()));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    };

    let sql = format!(
        "SELECT name, school, level, COALESCE(components,''), COALESCE(range_text,''),
                COALESCE(duration,''), warnings IS NOT NULL
         FROM spells{}
         ORDER BY name
         LIMIT {}",
        where_clause, limit
    );

    let mut stmt = conn.prepare(&sql)?;
    let param_refs: Vec<&dyn rusqlite::types::ToSql> = params.iter().map(|p| p.as_ref()).collect();
    let rows = stmt
        .query_map(param_refs.as_slice(), |row| {
            Ok(OverviewRow {
                name: row.get(0)?,
                school: row.get(1)?,
                level: row.get(2)?,
                components: row.get(3)?,
                range_text: row.get(4)?,
                duration: row.get(5)?,
                has_warnings: row.get(6)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ── Stats ──

pub struct Stats {
    pub spells: usize,
    pub with_warnings: usize,
    pub failures: usize,
    pub sources: usize,
    pub by_school: Vec<(String, usize)>,
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let spells: usize = conn.query_row("SELECT COUNT(*) FROM spells", [], |r| r.get(0))?;
    let with_warnings: usize = conn.query_row(
        "SELECT COUNT(*) FROM spells WHERE warnings IS NOT NULL",
        [],
        |r| r.get(0),
    )?;
    let failures: usize = conn.query_row("SELECT COUNT(*) FROM parse_failures", [], |r| r.get(0))?;
    let sources: usize = conn.query_row(
        "SELECT COUNT(*) FROM (SELECT source FROM spells UNION SELECT source FROM parse_failures)",
        [],
        |r| r.get(0),
    )?;
    let mut stmt = conn.prepare(
        "SELECT school_base, COUNT(*) FROM spells GROUP BY school_base ORDER BY COUNT(*) DESC, school_base",
    )?;
    let by_school = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Stats {
        spells,
        with_warnings,
        failures,
        sources,
        by_school,
    })
}
