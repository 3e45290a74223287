// HTTP response utilities for spreadsheet downloads
use crate::domain::cnc_telemetry::CncTelemetryRecord;
use anyhow::{Context, Result};
use axum::{
    body::Body,
    http::{HeaderValue, Response, StatusCode, header},
};
use rust_xlsxwriter::Workbook;

pub const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
const SHEET_NAME: &str = "CNC Telemetry Data";
/// Worksheet row capacity minus the header row
const MAX_EXPORT_ROWS: usize = 1_048_575;

const HEADERS: [&str; 17] = [
    "Timestamp",
    "Spindle Speed (RPM)",
    "Spindle Load (%)",
    "Feed Rate (mm/min)",
    "Coolant Temp (°C)",
    "Coolant Pressure (PSI)",
    "X Position (mm)",
    "Y Position (mm)",
    "Z Position (mm)",
    "Vibration X (g)",
    "Vibration Y (g)",
    "Vibration Z (g)",
    "Power (kW)",
    "Tool Number",
    "Program Number",
    "Part Count",
    "Cycle Time (s)",
];

/// Render CNC samples as a single-sheet XLSX workbook.
///
/// Histories longer than one worksheet keep only the most recent rows.
pub fn cnc_telemetry_workbook(records: &[CncTelemetryRecord]) -> Result<Vec<u8>> {
    let records = export_window(records, MAX_EXPORT_ROWS);
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    for (col, title) in HEADERS.iter().enumerate() {
        sheet.write_string(0, col as u16, *title)?;
    }

    for (i, record) in records.iter().enumerate() {
        let row = u32::try_from(i + 1).context("Export row index out of range")?;
        let s = &record.sample;
        sheet.write_string(row, 0, record.recorded_at.to_rfc3339())?;
        let values = [
            s.spindle_speed,
            s.spindle_load,
            s.feed_rate,
            s.coolant_temp,
            s.coolant_pressure,
            s.x_axis_position,
            s.y_axis_position,
            s.z_axis_position,
            s.vibration_x,
            s.vibration_y,
            s.vibration_z,
            s.power_consumption,
            s.tool_number as f64,
            s.program_number as f64,
            s.part_count as f64,
            s.cycle_time,
        ];
        for (offset, value) in values.into_iter().enumerate() {
            sheet.write_number(row, offset as u16 + 1, value)?;
        }
    }

    workbook.save_to_buffer().context("Failed to encode XLSX workbook")
}

fn export_window<T>(records: &[T], max_rows: usize) -> &[T] {
    if records.len() <= max_rows {
        return records;
    }
    tracing::warn!(
        total = records.len(),
        exported = max_rows,
        "Telemetry history exceeds one worksheet, exporting the most recent rows"
    );
    &records[records.len() - max_rows..]
}

/// Wrap bytes as a file download
pub fn attachment_response(bytes: Vec<u8>, content_type: &str, file_name: &str) -> Result<Response<Body>, StatusCode> {
    let disposition = HeaderValue::from_str(&format!("attachment; filename={}", file_name)).map_err(|e| {
        tracing::error!("Invalid attachment file name {}: {}", file_name, e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_DISPOSITION, disposition)
        .header(header::CONTENT_LENGTH, bytes.len())
        .body(Body::from(bytes))
        .map_err(|e| {
            tracing::error!("Response build error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })
}
