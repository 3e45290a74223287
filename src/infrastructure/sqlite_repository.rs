// SQLite repository implementation
use crate::application::monitoring_repository::{MonitoringRepository, TelemetrySink};
use crate::domain::ai::{AiInsight, AiModel, AiModelUpdate, NewAiInsight, NewAiModel, STATUS_ACTIVE, STATUS_PENDING};
use crate::domain::alert::{Alert, NewAlert};
use crate::domain::cnc_telemetry::{CncTelemetryRecord, MachineStatusUpdate, NewCncTelemetry, TelemetrySample};
use crate::domain::machine::{Machine, MachineUpdate, NewMachine};
use crate::domain::maintenance::{MaintenanceRecord, NewMaintenance};
use crate::domain::site::{NewSite, Site};
use crate::domain::telemetry::{NewTelemetryReading, TelemetryReading};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Params, Row, params};
use std::sync::{Arc, Mutex};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS sites (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    location TEXT,
    description TEXT,
    created_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS machines (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    machine_key TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    machine_type TEXT NOT NULL,
    status TEXT NOT NULL,
    site_id INTEGER REFERENCES sites(id),
    temperature REAL,
    vibration REAL,
    runtime REAL,
    efficiency REAL,
    kw_used REAL,
    firmware TEXT,
    model TEXT,
    last_seen TEXT,
    created_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS alerts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    machine_id INTEGER NOT NULL REFERENCES machines(id),
    severity TEXT NOT NULL,
    title TEXT NOT NULL,
    message TEXT NOT NULL,
    acknowledged INTEGER NOT NULL DEFAULT 0,
    assigned_to TEXT,
    created_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS maintenance (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    machine_id INTEGER NOT NULL REFERENCES machines(id),
    maintenance_type TEXT NOT NULL,
    description TEXT NOT NULL,
    technician TEXT,
    cost REAL,
    performed_at TEXT NOT NULL,
    next_due TEXT,
    created_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS telemetry (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    machine_id INTEGER NOT NULL REFERENCES machines(id),
    temperature REAL,
    vibration REAL,
    kw_used REAL,
    runtime REAL,
    recorded_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS cnc_telemetry (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    machine_id INTEGER NOT NULL REFERENCES machines(id),
    recorded_at TEXT NOT NULL,
    spindle_speed REAL NOT NULL,
    spindle_load REAL NOT NULL,
    feed_rate REAL NOT NULL,
    coolant_temp REAL NOT NULL,
    coolant_pressure REAL NOT NULL,
    x_axis_position REAL NOT NULL,
    y_axis_position REAL NOT NULL,
    z_axis_position REAL NOT NULL,
    vibration_x REAL NOT NULL,
    vibration_y REAL NOT NULL,
    vibration_z REAL NOT NULL,
    power_consumption REAL NOT NULL,
    tool_number INTEGER NOT NULL,
    program_number INTEGER NOT NULL,
    part_count INTEGER NOT NULL,
    cycle_time REAL NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_cnc_telemetry_machine ON cnc_telemetry (machine_id, id);
CREATE TABLE IF NOT EXISTS ai_models (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    machine_id INTEGER NOT NULL REFERENCES machines(id),
    name TEXT NOT NULL,
    version TEXT NOT NULL,
    model_type TEXT NOT NULL,
    description TEXT,
    status TEXT NOT NULL,
    file_path TEXT,
    file_name TEXT,
    file_size INTEGER,
    accuracy REAL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS ai_insights (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    machine_id INTEGER NOT NULL REFERENCES machines(id),
    model_id INTEGER REFERENCES ai_models(id) ON DELETE SET NULL,
    insight_type TEXT NOT NULL,
    severity TEXT NOT NULL,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    recommendation TEXT,
    confidence REAL,
    telemetry_snapshot TEXT,
    acknowledged INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);
";

const SITE_COLUMNS: &str = "id, name, location, description, created_at";
const MACHINE_COLUMNS: &str = "id, machine_key, name, machine_type, status, site_id, temperature, vibration, \
     runtime, efficiency, kw_used, firmware, model, last_seen, created_at";
const ALERT_COLUMNS: &str = "id, machine_id, severity, title, message, acknowledged, assigned_to, created_at";
const MAINTENANCE_COLUMNS: &str =
    "id, machine_id, maintenance_type, description, technician, cost, performed_at, next_due, created_at";
const TELEMETRY_COLUMNS: &str = "id, machine_id, temperature, vibration, kw_used, runtime, recorded_at";
const CNC_COLUMNS: &str = "id, machine_id, recorded_at, spindle_speed, spindle_load, feed_rate, coolant_temp, \
     coolant_pressure, x_axis_position, y_axis_position, z_axis_position, vibration_x, vibration_y, vibration_z, \
     power_consumption, tool_number, program_number, part_count, cycle_time";
const AI_MODEL_COLUMNS: &str = "id, machine_id, name, version, model_type, description, status, file_path, \
     file_name, file_size, accuracy, created_at, updated_at";
const AI_INSIGHT_COLUMNS: &str = "id, machine_id, model_id, insight_type, severity, title, description, \
     recommendation, confidence, telemetry_snapshot, acknowledged, created_at";

#[derive(Clone)]
pub struct SqliteRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRepository {
    pub async fn open(path: &str) -> Result<Self> {
        let owned = path.to_string();
        let conn = tokio::task::spawn_blocking(move || Connection::open(owned))
            .await
            .context("SQLite open task failed")?
            .with_context(|| format!("Failed to open database {}", path))?;
        Self::from_connection(conn).await
    }

    pub async fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::from_connection(conn).await
    }

    async fn from_connection(conn: Connection) -> Result<Self> {
        let repo = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        repo.with_conn(|conn| {
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
            conn.execute_batch(SCHEMA)
        })
        .await
        .context("Failed to apply database schema")?;
        Ok(repo)
    }

    /// Run a blocking closure against the connection off the async runtime
    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> rusqlite::Result<T> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().map_err(|_| anyhow!("SQLite connection mutex poisoned"))?;
            f(&mut *guard).context("SQLite query failed")
        })
        .await
        .context("SQLite task failed")?
    }
}

fn query_all<T, P, F>(conn: &Connection, sql: &str, params: P, map: F) -> rusqlite::Result<Vec<T>>
where
    P: Params,
    F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
{
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, map)?;
    rows.collect()
}

fn site_from_row(row: &Row<'_>) -> rusqlite::Result<Site> {
    Ok(Site {
        id: row.get(0)?,
        name: row.get(1)?,
        location: row.get(2)?,
        description: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn machine_from_row(row: &Row<'_>) -> rusqlite::Result<Machine> {
    Ok(Machine {
        id: row.get(0)?,
        machine_id: row.get(1)?,
        name: row.get(2)?,
        machine_type: row.get(3)?,
        status: row.get(4)?,
        site_id: row.get(5)?,
        temperature: row.get(6)?,
        vibration: row.get(7)?,
        runtime: row.get(8)?,
        efficiency: row.get(9)?,
        kw_used: row.get(10)?,
        firmware: row.get(11)?,
        model: row.get(12)?,
        last_seen: row.get(13)?,
        created_at: row.get(14)?,
    })
}

fn alert_from_row(row: &Row<'_>) -> rusqlite::Result<Alert> {
    Ok(Alert {
        id: row.get(0)?,
        machine_id: row.get(1)?,
        severity: row.get(2)?,
        title: row.get(3)?,
        message: row.get(4)?,
        acknowledged: row.get(5)?,
        assigned_to: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn maintenance_from_row(row: &Row<'_>) -> rusqlite::Result<MaintenanceRecord> {
    Ok(MaintenanceRecord {
        id: row.get(0)?,
        machine_id: row.get(1)?,
        maintenance_type: row.get(2)?,
        description: row.get(3)?,
        technician: row.get(4)?,
        cost: row.get(5)?,
        performed_at: row.get(6)?,
        next_due: row.get(7)?,
        created_at: row.get(8)?,
    })
}

fn telemetry_from_row(row: &Row<'_>) -> rusqlite::Result<TelemetryReading> {
    Ok(TelemetryReading {
        id: row.get(0)?,
        machine_id: row.get(1)?,
        temperature: row.get(2)?,
        vibration: row.get(3)?,
        kw_used: row.get(4)?,
        runtime: row.get(5)?,
        recorded_at: row.get(6)?,
    })
}

fn cnc_from_row(row: &Row<'_>) -> rusqlite::Result<CncTelemetryRecord> {
    Ok(CncTelemetryRecord {
        id: row.get(0)?,
        machine_id: row.get(1)?,
        recorded_at: row.get(2)?,
        sample: TelemetrySample {
            spindle_speed: row.get(3)?,
            spindle_load: row.get(4)?,
            feed_rate: row.get(5)?,
            coolant_temp: row.get(6)?,
            coolant_pressure: row.get(7)?,
            x_axis_position: row.get(8)?,
            y_axis_position: row.get(9)?,
            z_axis_position: row.get(10)?,
            vibration_x: row.get(11)?,
            vibration_y: row.get(12)?,
            vibration_z: row.get(13)?,
            power_consumption: row.get(14)?,
            tool_number: row.get(15)?,
            program_number: row.get(16)?,
            part_count: row.get(17)?,
            cycle_time: row.get(18)?,
        },
    })
}

fn ai_model_from_row(row: &Row<'_>) -> rusqlite::Result<AiModel> {
    Ok(AiModel {
        id: row.get(0)?,
        machine_id: row.get(1)?,
        name: row.get(2)?,
        version: row.get(3)?,
        model_type: row.get(4)?,
        description: row.get(5)?,
        status: row.get(6)?,
        file_path: row.get(7)?,
        file_name: row.get(8)?,
        file_size: row.get(9)?,
        accuracy: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

fn ai_insight_from_row(row: &Row<'_>) -> rusqlite::Result<AiInsight> {
    Ok(AiInsight {
        id: row.get(0)?,
        machine_id: row.get(1)?,
        model_id: row.get(2)?,
        insight_type: row.get(3)?,
        severity: row.get(4)?,
        title: row.get(5)?,
        description: row.get(6)?,
        recommendation: row.get(7)?,
        confidence: row.get(8)?,
        telemetry_snapshot: row.get(9)?,
        acknowledged: row.get(10)?,
        created_at: row.get(11)?,
    })
}

fn site_by_id(conn: &Connection, id: i64) -> rusqlite::Result<Option<Site>> {
    conn.query_row(&format!("SELECT {SITE_COLUMNS} FROM sites WHERE id = ?1"), [id], site_from_row)
        .optional()
}

fn machine_by_id(conn: &Connection, id: i64) -> rusqlite::Result<Option<Machine>> {
    conn.query_row(
        &format!("SELECT {MACHINE_COLUMNS} FROM machines WHERE id = ?1"),
        [id],
        machine_from_row,
    )
    .optional()
}

fn alert_by_id(conn: &Connection, id: i64) -> rusqlite::Result<Option<Alert>> {
    conn.query_row(&format!("SELECT {ALERT_COLUMNS} FROM alerts WHERE id = ?1"), [id], alert_from_row)
        .optional()
}

fn ai_model_by_id(conn: &Connection, id: i64) -> rusqlite::Result<Option<AiModel>> {
    conn.query_row(
        &format!("SELECT {AI_MODEL_COLUMNS} FROM ai_models WHERE id = ?1"),
        [id],
        ai_model_from_row,
    )
    .optional()
}

fn ai_insight_by_id(conn: &Connection, id: i64) -> rusqlite::Result<Option<AiInsight>> {
    conn.query_row(
        &format!("SELECT {AI_INSIGHT_COLUMNS} FROM ai_insights WHERE id = ?1"),
        [id],
        ai_insight_from_row,
    )
    .optional()
}

/// Row read back right after its insert
fn inserted<T>(found: Option<T>) -> rusqlite::Result<T> {
    found.ok_or(rusqlite::Error::QueryReturnedNoRows)
}

fn insert_cnc(conn: &Connection, machine_id: i64, sample: &TelemetrySample) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO cnc_telemetry (machine_id, recorded_at, spindle_speed, spindle_load, feed_rate, coolant_temp, \
         coolant_pressure, x_axis_position, y_axis_position, z_axis_position, vibration_x, vibration_y, vibration_z, \
         power_consumption, tool_number, program_number, part_count, cycle_time) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
        params![
            machine_id,
            Utc::now(),
            sample.spindle_speed,
            sample.spindle_load,
            sample.feed_rate,
            sample.coolant_temp,
            sample.coolant_pressure,
            sample.x_axis_position,
            sample.y_axis_position,
            sample.z_axis_position,
            sample.vibration_x,
            sample.vibration_y,
            sample.vibration_z,
            sample.power_consumption,
            sample.tool_number,
            sample.program_number,
            sample.part_count,
            sample.cycle_time,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn apply_machine_update(conn: &mut Connection, id: i64, update: MachineUpdate) -> rusqlite::Result<Option<Machine>> {
    let tx = conn.transaction()?;
    let Some(mut machine) = machine_by_id(&tx, id)? else {
        return Ok(None);
    };
    update.apply(&mut machine);
    tx.execute(
        "UPDATE machines SET name = ?2, status = ?3, site_id = ?4, temperature = ?5, vibration = ?6, runtime = ?7, \
         efficiency = ?8, kw_used = ?9, firmware = ?10, model = ?11, last_seen = ?12 WHERE id = ?1",
        params![
            id,
            machine.name,
            machine.status,
            machine.site_id,
            machine.temperature,
            machine.vibration,
            machine.runtime,
            machine.efficiency,
            machine.kw_used,
            machine.firmware,
            machine.model,
            machine.last_seen,
        ],
    )?;
    tx.commit()?;
    Ok(Some(machine))
}

#[async_trait]
impl MonitoringRepository for SqliteRepository {
    async fn list_sites(&self) -> Result<Vec<Site>> {
        self.with_conn(|conn| query_all(conn, &format!("SELECT {SITE_COLUMNS} FROM sites ORDER BY id"), [], site_from_row))
            .await
    }

    async fn get_site(&self, id: i64) -> Result<Option<Site>> {
        self.with_conn(move |conn| site_by_id(conn, id)).await
    }

    async fn find_site_by_name(&self, name: &str) -> Result<Option<Site>> {
        let name = name.to_string();
        self.with_conn(move |conn| {
            conn.query_row(
                &format!("SELECT {SITE_COLUMNS} FROM sites WHERE name = ?1 ORDER BY id LIMIT 1"),
                [name],
                site_from_row,
            )
            .optional()
        })
        .await
    }

    async fn create_site(&self, site: NewSite) -> Result<Site> {
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO sites (name, location, description, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![site.name, site.location, site.description, Utc::now()],
            )?;
            let id = conn.last_insert_rowid();
            inserted(site_by_id(conn, id)?)
        })
        .await
    }

    async fn list_machines(&self) -> Result<Vec<Machine>> {
        self.with_conn(|conn| {
            query_all(conn, &format!("SELECT {MACHINE_COLUMNS} FROM machines ORDER BY id"), [], machine_from_row)
        })
        .await
    }

    async fn list_machines_by_site(&self, site_id: i64) -> Result<Vec<Machine>> {
        self.with_conn(move |conn| {
            query_all(
                conn,
                &format!("SELECT {MACHINE_COLUMNS} FROM machines WHERE site_id = ?1 ORDER BY id"),
                [site_id],
                machine_from_row,
            )
        })
        .await
    }

    async fn get_machine(&self, id: i64) -> Result<Option<Machine>> {
        self.with_conn(move |conn| machine_by_id(conn, id)).await
    }

    async fn find_machine_by_key(&self, machine_key: &str) -> Result<Option<Machine>> {
        let key = machine_key.to_string();
        self.with_conn(move |conn| {
            conn.query_row(
                &format!("SELECT {MACHINE_COLUMNS} FROM machines WHERE machine_key = ?1"),
                [key],
                machine_from_row,
            )
            .optional()
        })
        .await
    }

    async fn create_machine(&self, machine: NewMachine) -> Result<Machine> {
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO machines (machine_key, name, machine_type, status, site_id, temperature, vibration, \
                 runtime, efficiency, kw_used, firmware, model, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    machine.machine_id,
                    machine.name,
                    machine.machine_type,
                    machine.status,
                    machine.site_id,
                    machine.temperature,
                    machine.vibration,
                    machine.runtime,
                    machine.efficiency,
                    machine.kw_used,
                    machine.firmware,
                    machine.model,
                    Utc::now(),
                ],
            )?;
            let id = conn.last_insert_rowid();
            inserted(machine_by_id(conn, id)?)
        })
        .await
    }

    async fn update_machine(&self, id: i64, update: MachineUpdate) -> Result<Option<Machine>> {
        self.with_conn(move |conn| apply_machine_update(conn, id, update)).await
    }

    async fn list_alerts(&self) -> Result<Vec<Alert>> {
        self.with_conn(|conn| {
            query_all(conn, &format!("SELECT {ALERT_COLUMNS} FROM alerts ORDER BY id DESC"), [], alert_from_row)
        })
        .await
    }

    async fn list_alerts_by_machine(&self, machine_id: i64) -> Result<Vec<Alert>> {
        self.with_conn(move |conn| {
            query_all(
                conn,
                &format!("SELECT {ALERT_COLUMNS} FROM alerts WHERE machine_id = ?1 ORDER BY id DESC"),
                [machine_id],
                alert_from_row,
            )
        })
        .await
    }

    async fn create_alert(&self, alert: NewAlert) -> Result<Alert> {
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO alerts (machine_id, severity, title, message, acknowledged, created_at) \
                 VALUES (?1, ?2, ?3, ?4, 0, ?5)",
                params![alert.machine_id, alert.severity, alert.title, alert.message, Utc::now()],
            )?;
            let id = conn.last_insert_rowid();
            inserted(alert_by_id(conn, id)?)
        })
        .await
    }

    async fn acknowledge_alert(&self, id: i64, acknowledged: bool, assigned_to: Option<String>) -> Result<Option<Alert>> {
        self.with_conn(move |conn| {
            let changed = conn.execute(
                "UPDATE alerts SET acknowledged = ?2, assigned_to = COALESCE(?3, assigned_to) WHERE id = ?1",
                params![id, acknowledged, assigned_to],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            alert_by_id(conn, id)
        })
        .await
    }

    async fn maintenance_history(&self, machine_id: i64) -> Result<Vec<MaintenanceRecord>> {
        self.with_conn(move |conn| {
            query_all(
                conn,
                &format!(
                    "SELECT {MAINTENANCE_COLUMNS} FROM maintenance WHERE machine_id = ?1 \
                     ORDER BY performed_at DESC, id DESC"
                ),
                [machine_id],
                maintenance_from_row,
            )
        })
        .await
    }

    async fn create_maintenance(&self, record: NewMaintenance) -> Result<MaintenanceRecord> {
        self.with_conn(move |conn| {
            let now = Utc::now();
            conn.execute(
                "INSERT INTO maintenance (machine_id, maintenance_type, description, technician, cost, performed_at, \
                 next_due, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    record.machine_id,
                    record.maintenance_type,
                    record.description,
                    record.technician,
                    record.cost,
                    record.performed_at.unwrap_or(now),
                    record.next_due,
                    now,
                ],
            )?;
            let id = conn.last_insert_rowid();
            let found = conn
                .query_row(
                    &format!("SELECT {MAINTENANCE_COLUMNS} FROM maintenance WHERE id = ?1"),
                    [id],
                    maintenance_from_row,
                )
                .optional()?;
            inserted(found)
        })
        .await
    }

    async fn recent_telemetry(&self, machine_id: i64, limit: usize) -> Result<Vec<TelemetryReading>> {
        let limit = i64::try_from(limit).context("Query limit out of range")?;
        self.with_conn(move |conn| {
            query_all(
                conn,
                &format!("SELECT {TELEMETRY_COLUMNS} FROM telemetry WHERE machine_id = ?1 ORDER BY id DESC LIMIT ?2"),
                [machine_id, limit],
                telemetry_from_row,
            )
        })
        .await
    }

    async fn create_telemetry(&self, reading: NewTelemetryReading) -> Result<TelemetryReading> {
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO telemetry (machine_id, temperature, vibration, kw_used, runtime, recorded_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    reading.machine_id,
                    reading.temperature,
                    reading.vibration,
                    reading.kw_used,
                    reading.runtime,
                    Utc::now(),
                ],
            )?;
            let id = conn.last_insert_rowid();
            let found = conn
                .query_row(
                    &format!("SELECT {TELEMETRY_COLUMNS} FROM telemetry WHERE id = ?1"),
                    [id],
                    telemetry_from_row,
                )
                .optional()?;
            inserted(found)
        })
        .await
    }

    async fn recent_cnc_telemetry(&self, machine_id: i64, limit: usize) -> Result<Vec<CncTelemetryRecord>> {
        let limit = i64::try_from(limit).context("Query limit out of range")?;
        self.with_conn(move |conn| {
            query_all(
                conn,
                &format!("SELECT {CNC_COLUMNS} FROM cnc_telemetry WHERE machine_id = ?1 ORDER BY id DESC LIMIT ?2"),
                [machine_id, limit],
                cnc_from_row,
            )
        })
        .await
    }

    async fn all_cnc_telemetry(&self, machine_id: i64) -> Result<Vec<CncTelemetryRecord>> {
        self.with_conn(move |conn| {
            query_all(
                conn,
                &format!("SELECT {CNC_COLUMNS} FROM cnc_telemetry WHERE machine_id = ?1 ORDER BY id"),
                [machine_id],
                cnc_from_row,
            )
        })
        .await
    }

    async fn create_cnc_telemetry(&self, record: NewCncTelemetry) -> Result<CncTelemetryRecord> {
        self.with_conn(move |conn| {
            let id = insert_cnc(conn, record.machine_id, &record.sample)?;
            let found = conn
                .query_row(
                    &format!("SELECT {CNC_COLUMNS} FROM cnc_telemetry WHERE id = ?1"),
                    [id],
                    cnc_from_row,
                )
                .optional()?;
            inserted(found)
        })
        .await
    }

    async fn list_ai_models(&self) -> Result<Vec<AiModel>> {
        self.with_conn(|conn| {
            query_all(conn, &format!("SELECT {AI_MODEL_COLUMNS} FROM ai_models ORDER BY id"), [], ai_model_from_row)
        })
        .await
    }

    async fn get_ai_model(&self, id: i64) -> Result<Option<AiModel>> {
        self.with_conn(move |conn| ai_model_by_id(conn, id)).await
    }

    async fn ai_models_by_machine(&self, machine_id: i64) -> Result<Vec<AiModel>> {
        self.with_conn(move |conn| {
            query_all(
                conn,
                &format!("SELECT {AI_MODEL_COLUMNS} FROM ai_models WHERE machine_id = ?1 ORDER BY id"),
                [machine_id],
                ai_model_from_row,
            )
        })
        .await
    }

    async fn active_ai_model(&self, machine_id: i64) -> Result<Option<AiModel>> {
        self.with_conn(move |conn| {
            conn.query_row(
                &format!(
                    "SELECT {AI_MODEL_COLUMNS} FROM ai_models WHERE machine_id = ?1 AND status = ?2 \
                     ORDER BY updated_at DESC, id DESC LIMIT 1"
                ),
                params![machine_id, STATUS_ACTIVE],
                ai_model_from_row,
            )
            .optional()
        })
        .await
    }

    async fn create_ai_model(&self, model: NewAiModel) -> Result<AiModel> {
        self.with_conn(move |conn| {
            let now = Utc::now();
            conn.execute(
                "INSERT INTO ai_models (machine_id, name, version, model_type, description, status, accuracy, \
                 created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
                params![
                    model.machine_id,
                    model.name,
                    model.version,
                    model.model_type,
                    model.description,
                    STATUS_PENDING,
                    model.accuracy,
                    now,
                ],
            )?;
            let id = conn.last_insert_rowid();
            inserted(ai_model_by_id(conn, id)?)
        })
        .await
    }

    async fn update_ai_model(&self, id: i64, update: AiModelUpdate) -> Result<Option<AiModel>> {
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            let Some(mut model) = ai_model_by_id(&tx, id)? else {
                return Ok(None);
            };
            update.apply(&mut model, Utc::now());
            tx.execute(
                "UPDATE ai_models SET name = ?2, version = ?3, model_type = ?4, description = ?5, status = ?6, \
                 file_path = ?7, file_name = ?8, file_size = ?9, accuracy = ?10, updated_at = ?11 WHERE id = ?1",
                params![
                    id,
                    model.name,
                    model.version,
                    model.model_type,
                    model.description,
                    model.status,
                    model.file_path,
                    model.file_name,
                    model.file_size,
                    model.accuracy,
                    model.updated_at,
                ],
            )?;
            tx.commit()?;
            Ok(Some(model))
        })
        .await
    }

    async fn delete_ai_model(&self, id: i64) -> Result<bool> {
        self.with_conn(move |conn| Ok(conn.execute("DELETE FROM ai_models WHERE id = ?1", [id])? > 0))
            .await
    }

    async fn list_ai_insights(&self, machine_id: Option<i64>, limit: usize) -> Result<Vec<AiInsight>> {
        let limit = i64::try_from(limit).context("Query limit out of range")?;
        self.with_conn(move |conn| {
            query_all(
                conn,
                &format!(
                    "SELECT {AI_INSIGHT_COLUMNS} FROM ai_insights WHERE (?1 IS NULL OR machine_id = ?1) \
                     ORDER BY id DESC LIMIT ?2"
                ),
                params![machine_id, limit],
                ai_insight_from_row,
            )
        })
        .await
    }

    async fn create_ai_insight(&self, insight: NewAiInsight) -> Result<AiInsight> {
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO ai_insights (machine_id, model_id, insight_type, severity, title, description, \
                 recommendation, confidence, telemetry_snapshot, acknowledged, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 0, ?10)",
                params![
                    insight.machine_id,
                    insight.model_id,
                    insight.insight_type,
                    insight.severity,
                    insight.title,
                    insight.description,
                    insight.recommendation,
                    insight.confidence,
                    insight.telemetry_snapshot,
                    Utc::now(),
                ],
            )?;
            let id = conn.last_insert_rowid();
            inserted(ai_insight_by_id(conn, id)?)
        })
        .await
    }

    async fn acknowledge_ai_insight(&self, id: i64) -> Result<Option<AiInsight>> {
        self.with_conn(move |conn| {
            if conn.execute("UPDATE ai_insights SET acknowledged = 1 WHERE id = ?1", [id])? == 0 {
                return Ok(None);
            }
            ai_insight_by_id(conn, id)
        })
        .await
    }
}

#[async_trait]
impl TelemetrySink for SqliteRepository {
    async fn resolve_machine(&self, machine_key: &str) -> Result<Option<i64>> {
        Ok(self.find_machine_by_key(machine_key).await?.map(|m| m.id))
    }

    async fn persist_sample(&self, machine_id: i64, sample: &TelemetrySample) -> Result<()> {
        let sample = sample.clone();
        self.with_conn(move |conn| insert_cnc(conn, machine_id, &sample).map(|_| ()))
            .await
    }

    async fn update_machine_status(&self, machine_id: i64, status: MachineStatusUpdate) -> Result<()> {
        match self.update_machine(machine_id, status.into()).await? {
            Some(_) => Ok(()),
            None => anyhow::bail!("machine {} disappeared", machine_id),
        }
    }
}
