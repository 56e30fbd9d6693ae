//! Renders report workbooks into the shared reports directory.
//!
//! Files are written under a temporary `.part` name and renamed once
//! complete, so a poll never observes a half-written workbook.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use thiserror::Error;
use tracing::debug;

use crate::entities::harvests;
use crate::models::price::PriceSnapshot;
use crate::models::report::ReportRequest;

const PRICE_HISTORY_HEADERS: [&str; 7] = [
    "No",
    "Commodity ID",
    "Location ID",
    "Price",
    "Status",
    "Created At",
    "Updated At",
];

const HARVEST_HEADERS: [&str; 6] = [
    "No",
    "Land Commodity ID",
    "Harvest Date",
    "Quantity",
    "Unit",
    "Notes",
];

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to build workbook: {0}")]
    Workbook(#[from] XlsxError),

    #[error("failed to write report file: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct ReportRenderer {
    reports_dir: PathBuf,
}

impl ReportRenderer {
    pub fn new(reports_dir: impl Into<PathBuf>) -> Self {
        Self {
            reports_dir: reports_dir.into(),
        }
    }

    pub async fn render_price_history(
        &self,
        request: &ReportRequest,
        snapshots: &[PriceSnapshot],
        generated_at: DateTime<Utc>,
    ) -> Result<PathBuf, RenderError> {
        let bytes = price_history_workbook(snapshots)?;
        self.write_atomically(&request.file_name(generated_at), &bytes)
            .await
    }

    pub async fn render_harvests(
        &self,
        request: &ReportRequest,
        rows: &[harvests::Model],
        generated_at: DateTime<Utc>,
    ) -> Result<PathBuf, RenderError> {
        let bytes = harvest_workbook(rows)?;
        self.write_atomically(&request.file_name(generated_at), &bytes)
            .await
    }

    async fn write_atomically(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf, RenderError> {
        tokio::fs::create_dir_all(&self.reports_dir).await?;

        let final_path = self.reports_dir.join(file_name);
        let partial_path = self.reports_dir.join(format!("{}.part", file_name));

        tokio::fs::write(&partial_path, bytes).await?;
        if let Err(e) = tokio::fs::rename(&partial_path, &final_path).await {
            let _ = tokio::fs::remove_file(&partial_path).await;
            return Err(e.into());
        }

        debug!(path = %final_path.display(), size = bytes.len(), "Report file written");
        Ok(final_path)
    }
}

fn write_headers(
    worksheet: &mut rust_xlsxwriter::Worksheet,
    headers: &[&str],
) -> Result<(), XlsxError> {
    let bold = Format::new().set_bold();
    for (col, header) in headers.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *header, &bold)?;
    }
    Ok(())
}

fn price_history_workbook(snapshots: &[PriceSnapshot]) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Price History")?;
    write_headers(worksheet, &PRICE_HISTORY_HEADERS)?;

    for (index, snapshot) in snapshots.iter().enumerate() {
        let row = index as u32 + 1;
        worksheet.write_number(row, 0, (index + 1) as f64)?;
        worksheet.write_string(row, 1, snapshot.commodity_id.to_string())?;
        worksheet.write_string(row, 2, snapshot.location_id.to_string())?;
        worksheet.write_number(row, 3, snapshot.value.to_f64().unwrap_or(0.0))?;
        worksheet.write_string(row, 4, if snapshot.current { "current" } else { "archived" })?;
        worksheet.write_string(row, 5, snapshot.created_at.format(DATETIME_FORMAT).to_string())?;
        worksheet.write_string(row, 6, snapshot.updated_at.format(DATETIME_FORMAT).to_string())?;
    }

    worksheet.autofit();
    workbook.save_to_buffer()
}

fn harvest_workbook(rows: &[harvests::Model]) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Harvests")?;
    write_headers(worksheet, &HARVEST_HEADERS)?;

    for (index, harvest) in rows.iter().enumerate() {
        let row = index as u32 + 1;
        worksheet.write_number(row, 0, (index + 1) as f64)?;
        worksheet.write_string(row, 1, harvest.land_commodity_id.to_string())?;
        worksheet.write_string(row, 2, harvest.harvest_date.format("%Y-%m-%d").to_string())?;
        worksheet.write_number(row, 3, harvest.quantity.to_f64().unwrap_or(0.0))?;
        worksheet.write_string(row, 4, harvest.unit.as_str())?;
        worksheet.write_string(row, 5, harvest.notes.as_deref().unwrap_or(""))?;
    }

    worksheet.autofit();
    workbook.save_to_buffer()
}
