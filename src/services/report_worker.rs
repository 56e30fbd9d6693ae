//! Report Consumer Worker
//!
//! Turns one delivered job into one rendered file. The message only names
//! the report; the data is read from the database at render time. Failures
//! are logged here and go nowhere else: the requester only ever sees the
//! file appear or not.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use sea_orm::{DatabaseConnection, DbErr};
use thiserror::Error;
use tracing::{error, info};

use crate::models::price::PriceSnapshot;
use crate::models::report::{DateRange, ReportJobMessage, ReportRequest, ReportTarget};
use crate::services::harvest::load_harvests_between;
use crate::services::price_revision::load_price_history;
use crate::services::report_renderer::{RenderError, ReportRenderer};

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("malformed report job: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("failed to load report data: {0}")]
    Load(#[from] DbErr),

    #[error(transparent)]
    Render(#[from] RenderError),
}

pub struct ReportWorker {
    db: DatabaseConnection,
    renderer: ReportRenderer,
}

impl ReportWorker {
    pub fn new(db: DatabaseConnection, renderer: ReportRenderer) -> Self {
        Self { db, renderer }
    }

    /// Entry point for a raw delivery. Never panics on bad input.
    pub async fn handle_delivery(&self, payload: &[u8]) -> Result<PathBuf, WorkerError> {
        let result = self.process(payload, Utc::now()).await;

        match &result {
            Ok(path) => info!(path = %path.display(), "Report rendered"),
            Err(WorkerError::Decode(e)) => error!(
                error = %e,
                payload = %String::from_utf8_lossy(payload),
                "Dropping malformed report job"
            ),
            Err(e) => error!(error = %e, "Report render failed"),
        }

        result
    }

    pub async fn process(
        &self,
        payload: &[u8],
        generated_at: DateTime<Utc>,
    ) -> Result<PathBuf, WorkerError> {
        let message: ReportJobMessage = serde_json::from_slice(payload)?;
        self.render(&message.into_request(), generated_at).await
    }

    pub async fn render(
        &self,
        request: &ReportRequest,
        generated_at: DateTime<Utc>,
    ) -> Result<PathBuf, WorkerError> {
        info!(
            report = %request.kind().routing_key(),
            start_date = %request.range.start_date,
            end_date = %request.range.end_date,
            "Rendering report"
        );

        let path = match request.target {
            ReportTarget::PriceHistory {
                commodity_id,
                location_id,
            } => {
                let history = load_price_history(&self.db, commodity_id, location_id).await?;
                let snapshots = snapshots_in_range(history.into_snapshots(), request.range);

                self.renderer
                    .render_price_history(request, &snapshots, generated_at)
                    .await?
            }
            ReportTarget::Harvest { land_commodity_id } => {
                let rows = load_harvests_between(&self.db, land_commodity_id, request.range).await?;

                self.renderer
                    .render_harvests(request, &rows, generated_at)
                    .await?
            }
        };

        Ok(path)
    }
}

/// Snapshots revised inside the range, led by the one already in effect
/// when the range opens. Expects snapshots oldest first.
fn snapshots_in_range(snapshots: Vec<PriceSnapshot>, range: DateRange) -> Vec<PriceSnapshot> {
    let in_effect = snapshots
        .iter()
        .rposition(|snapshot| snapshot.updated_at.date_naive() < range.start_date);

    snapshots
        .into_iter()
        .enumerate()
        .filter(|(index, snapshot)| {
            Some(*index) == in_effect || range.contains(snapshot.updated_at.date_naive())
        })
        .map(|(_, snapshot)| snapshot)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use rust_decimal::Decimal;
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn snapshot(value: i64, y: i32, m: u32, d: u32, current: bool) -> PriceSnapshot {
        let updated_at = Utc.with_ymd_and_hms(y, m, d, 8, 0, 0).unwrap().fixed_offset();
        PriceSnapshot {
            price_id: Uuid::nil(),
            commodity_id: Uuid::nil(),
            location_id: Uuid::nil(),
            value: Decimal::from(value),
            created_at: updated_at,
            updated_at,
            current,
        }
    }

    fn values(snapshots: &[PriceSnapshot]) -> Vec<Decimal> {
        snapshots.iter().map(|s| s.value).collect()
    }

    #[test]
    fn test_price_in_effect_at_start_is_kept() {
        let history = vec![
            snapshot(100, 2023, 9, 1, false),
            snapshot(110, 2023, 10, 1, false),
            snapshot(120, 2023, 10, 27, false),
            snapshot(130, 2023, 11, 5, true),
        ];
        let range = DateRange {
            start_date: date(2023, 10, 26),
            end_date: date(2023, 10, 31),
        };

        let kept = snapshots_in_range(history, range);

        assert_eq!(values(&kept), vec![Decimal::from(110), Decimal::from(120)]);
    }

    #[test]
    fn test_unrevised_price_covers_later_range() {
        let history = vec![snapshot(100, 2023, 9, 1, true)];
        let range = DateRange {
            start_date: date(2023, 10, 26),
            end_date: date(2023, 10, 27),
        };

        let kept = snapshots_in_range(history, range);

        assert_eq!(kept.len(), 1);
        assert!(kept[0].current);
    }

    #[test]
    fn test_range_before_first_revision_is_empty() {
        let history = vec![
            snapshot(100, 2023, 9, 1, false),
            snapshot(110, 2023, 10, 1, true),
        ];
        let range = DateRange {
            start_date: date(2023, 8, 1),
            end_date: date(2023, 8, 31),
        };

        assert!(snapshots_in_range(history, range).is_empty());
    }
}
