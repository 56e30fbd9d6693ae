//! Report pipeline models
//!
//! A [`ReportRequest`] is the correlation key of the whole pipeline: the
//! dispatcher serializes it into a [`ReportJobMessage`], the worker derives the
//! output file name from it, and the resolver rebuilds the same name pattern
//! from the polling request. No job id exists; identical parameters mean the
//! same report.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Timestamp suffix of rendered files. Fixed width, most significant field
/// first, so lexical order of file names equals generation order.
pub const REPORT_TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%S%.3fZ";

pub const REPORT_FILE_EXTENSION: &str = ".xlsx";

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

pub const REPORT_ACCEPTED_MESSAGE: &str =
    "Report is being generated, please check back later using the download url";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportKind {
    PriceHistory,
    Harvest,
}

impl ReportKind {
    pub const ALL: [ReportKind; 2] = [ReportKind::PriceHistory, ReportKind::Harvest];

    /// Routing key on the report exchange
    pub fn routing_key(&self) -> &'static str {
        match self {
            ReportKind::PriceHistory => "price-history",
            ReportKind::Harvest => "harvest",
        }
    }

    /// Durable queue the worker consumes for this kind
    pub fn queue_name(&self) -> String {
        format!("report.{}", self.routing_key())
    }

    pub fn file_prefix(&self) -> &'static str {
        match self {
            ReportKind::PriceHistory => "price_history",
            ReportKind::Harvest => "harvest",
        }
    }
}

/// What a report is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReportTarget {
    PriceHistory {
        commodity_id: Uuid,
        location_id: Uuid,
    },
    Harvest {
        land_commodity_id: Uuid,
    },
}

impl ReportTarget {
    pub fn kind(&self) -> ReportKind {
        match self {
            ReportTarget::PriceHistory { .. } => ReportKind::PriceHistory,
            ReportTarget::Harvest { .. } => ReportKind::Harvest,
        }
    }

    fn identifiers(&self) -> Vec<String> {
        match self {
            ReportTarget::PriceHistory {
                commodity_id,
                location_id,
            } => vec![commodity_id.to_string(), location_id.to_string()],
            ReportTarget::Harvest { land_commodity_id } => vec![land_commodity_id.to_string()],
        }
    }

    fn retrieval_path(&self) -> String {
        match self {
            ReportTarget::PriceHistory {
                commodity_id,
                location_id,
            } => format!(
                "/api/prices/history/{}/{}/download/file",
                commodity_id, location_id
            ),
            ReportTarget::Harvest { land_commodity_id } => format!(
                "/api/land-commodities/{}/harvests/download/file",
                land_commodity_id
            ),
        }
    }
}

/// Inclusive date range of a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl DateRange {
    pub fn validate(&self) -> Result<(), String> {
        if self.start_date > self.end_date {
            return Err(format!(
                "start_date {} must not be after end_date {}",
                self.start_date, self.end_date
            ));
        }
        Ok(())
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}

/// Query string of both the download request and the file retrieval endpoints
pub type DownloadQuery = DateRange;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportRequest {
    pub target: ReportTarget,
    pub range: DateRange,
}

impl ReportRequest {
    pub fn new(target: ReportTarget, range: DateRange) -> Self {
        Self { target, range }
    }

    pub fn kind(&self) -> ReportKind {
        self.target.kind()
    }

    pub fn to_message(&self) -> ReportJobMessage {
        ReportJobMessage {
            target: self.target,
            start_date: self.range.start_date,
            end_date: self.range.end_date,
        }
    }

    /// `<prefix>_<ids>_<start>_<end>_`; everything a rendered file name
    /// shares with every other render of the same request
    pub fn file_stem(&self) -> String {
        format!(
            "{}_{}_{}_{}_",
            self.kind().file_prefix(),
            self.target.identifiers().join("_"),
            self.range.start_date.format("%Y-%m-%d"),
            self.range.end_date.format("%Y-%m-%d"),
        )
    }

    pub fn file_name(&self, generated_at: DateTime<Utc>) -> String {
        format!(
            "{}{}{}",
            self.file_stem(),
            generated_at.format(REPORT_TIMESTAMP_FORMAT),
            REPORT_FILE_EXTENSION
        )
    }

    /// True when `name` is a finished render of this request
    pub fn matches_file_name(&self, name: &str) -> bool {
        name.strip_prefix(&self.file_stem())
            .and_then(|rest| rest.strip_suffix(REPORT_FILE_EXTENSION))
            .is_some_and(|timestamp| !timestamp.is_empty() && !timestamp.contains('_'))
    }

    /// URL the client polls; carries the request parameters, not a job id
    pub fn download_url(&self, public_base_url: &str) -> String {
        format!(
            "{}{}?start_date={}&end_date={}",
            public_base_url.trim_end_matches('/'),
            self.target.retrieval_path(),
            self.range.start_date.format("%Y-%m-%d"),
            self.range.end_date.format("%Y-%m-%d"),
        )
    }
}

/// Broker payload. Carries identifiers and the range only; the worker
/// re-reads the data at render time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportJobMessage {
    #[serde(flatten)]
    pub target: ReportTarget,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl ReportJobMessage {
    pub fn into_request(self) -> ReportRequest {
        ReportRequest {
            target: self.target,
            range: DateRange {
                start_date: self.start_date,
                end_date: self.end_date,
            },
        }
    }
}

/// Response of a download request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportTicket {
    pub message: String,
    pub download_url: String,
}
