//! Canned reports over `UserTransfers`
//!
//! Every report is one of seven fixed templates, narrowed by an optional
//! date range and an optional username-or-artist search term. Filter values
//! are always bound as query parameters.

use std::str::FromStr;
use chrono::{DateTime, Duration, Utc};
use rusqlite::types::Value;
use serde::Serialize;
use crate::{Error, Result};
use crate::storage::ReportStore;

/// Timestamp layout used for date range cutoffs, comparable with `EndedAt`
const CUTOFF_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// The fixed set of aggregate reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReportTemplate {
    TopUsersByFiles,
    TopUsersByData,
    MostDownloadedArtists,
    UsersWithMostErrors,
    UsersWithMostCanceled,
    DataByDay,
    FilesByDay,
}

impl ReportTemplate {
    /// Short identifier used on the command line
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportTemplate::TopUsersByFiles => "top-users-files",
            ReportTemplate::TopUsersByData => "top-users-data",
            ReportTemplate::MostDownloadedArtists => "top-artists",
            ReportTemplate::UsersWithMostErrors => "most-errors",
            ReportTemplate::UsersWithMostCanceled => "most-canceled",
            ReportTemplate::DataByDay => "data-by-day",
            ReportTemplate::FilesByDay => "files-by-day",
        }
    }

    /// Human-readable report name
    pub fn title(&self) -> &'static str {
        match self {
            ReportTemplate::TopUsersByFiles => "Top 10 Users by Files Downloaded",
            ReportTemplate::TopUsersByData => "Top 10 Users by Data Downloaded (MB)",
            ReportTemplate::MostDownloadedArtists => "Most Downloaded Artists",
            ReportTemplate::UsersWithMostErrors => "Users with Most Errors",
            ReportTemplate::UsersWithMostCanceled => "Users with Most Canceled Transfers",
            ReportTemplate::DataByDay => "Total Data Transferred by Day",
            ReportTemplate::FilesByDay => "Total Files Transferred by Day",
        }
    }

    /// Get all templates, in menu order
    pub fn all() -> &'static [ReportTemplate] {
        &[
            ReportTemplate::TopUsersByFiles,
            ReportTemplate::TopUsersByData,
            ReportTemplate::MostDownloadedArtists,
            ReportTemplate::UsersWithMostErrors,
            ReportTemplate::UsersWithMostCanceled,
            ReportTemplate::DataByDay,
            ReportTemplate::FilesByDay,
        ]
    }

    fn select(&self) -> &'static str {
        match self {
            ReportTemplate::TopUsersByFiles => "Username, COUNT(*) AS TotalFiles",
            ReportTemplate::TopUsersByData => "Username, SUM(BytesTransferred) / (1024 * 1024) AS TotalDataMB",
            ReportTemplate::MostDownloadedArtists => "Artist, COUNT(*) AS TotalDownloads",
            ReportTemplate::UsersWithMostErrors => "Username, COUNT(*) AS ErrorCount",
            ReportTemplate::UsersWithMostCanceled => "Username, COUNT(*) AS CancelCount",
            ReportTemplate::DataByDay => "DATE(EndedAt) AS TransferDate, SUM(BytesTransferred) / (1024 * 1024) AS TotalDataMB",
            ReportTemplate::FilesByDay => "DATE(EndedAt) AS TransferDate, COUNT(*) AS TotalFiles",
        }
    }

    fn state_filter(&self) -> Option<&'static str> {
        match self {
            ReportTemplate::UsersWithMostErrors => Some("State LIKE '%Errored%'"),
            ReportTemplate::UsersWithMostCanceled => Some("State LIKE '%Canceled%'"),
            _ => None,
        }
    }

    fn group_by(&self) -> &'static str {
        match self {
            ReportTemplate::MostDownloadedArtists => "Artist",
            ReportTemplate::DataByDay | ReportTemplate::FilesByDay => "TransferDate",
            _ => "Username",
        }
    }

    fn order_by(&self) -> &'static str {
        match self {
            ReportTemplate::TopUsersByFiles => "TotalFiles DESC",
            ReportTemplate::TopUsersByData => "TotalDataMB DESC",
            ReportTemplate::MostDownloadedArtists => "TotalDownloads DESC",
            ReportTemplate::UsersWithMostErrors => "ErrorCount DESC",
            ReportTemplate::UsersWithMostCanceled => "CancelCount DESC",
            ReportTemplate::DataByDay | ReportTemplate::FilesByDay => "TransferDate DESC",
        }
    }

    fn limit(&self) -> Option<u32> {
        match self {
            ReportTemplate::DataByDay | ReportTemplate::FilesByDay => None,
            _ => Some(10),
        }
    }
}

impl FromStr for ReportTemplate {
    type Err = Error;

    /// Accepts the identifier, the title, or the 1-based menu position
    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        if let Ok(position) = wanted.parse::<usize>() {
            return position
                .checked_sub(1)
                .and_then(|i| Self::all().get(i).copied())
                .ok_or_else(|| Error::UnknownTemplate(s.to_string()));
        }
        Self::all()
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(wanted) || t.title().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| Error::UnknownTemplate(s.to_string()))
    }
}

impl std::fmt::Display for ReportTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.title())
    }
}

/// Time window applied to `EndedAt`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum DateRange {
    #[default]
    AllTime,
    Last24Hours,
    Last7Days,
    Last30Days,
}

impl DateRange {
    pub fn as_str(&self) -> &'static str {
        match self {
            DateRange::AllTime => "all",
            DateRange::Last24Hours => "24h",
            DateRange::Last7Days => "7d",
            DateRange::Last30Days => "30d",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DateRange::AllTime => "All Time",
            DateRange::Last24Hours => "Last 24 Hours",
            DateRange::Last7Days => "Last 7 Days",
            DateRange::Last30Days => "Last 30 Days",
        }
    }

    pub fn all() -> &'static [DateRange] {
        &[DateRange::AllTime, DateRange::Last24Hours, DateRange::Last7Days, DateRange::Last30Days]
    }

    fn window(&self) -> Option<Duration> {
        match self {
            DateRange::AllTime => None,
            DateRange::Last24Hours => Some(Duration::days(1)),
            DateRange::Last7Days => Some(Duration::days(7)),
            DateRange::Last30Days => Some(Duration::days(30)),
        }
    }

    /// Earliest `EndedAt` still inside the window, relative to `now`
    pub fn cutoff(&self, now: DateTime<Utc>) -> Option<String> {
        self.window().map(|w| (now - w).format(CUTOFF_FORMAT).to_string())
    }
}

impl FromStr for DateRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        Self::all()
            .iter()
            .copied()
            .find(|r| r.as_str().eq_ignore_ascii_case(wanted) || r.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| Error::UnknownDateRange(s.to_string()))
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// How a search term narrows a report
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchFilter {
    Username(String),
    Artist(String),
}

impl SearchFilter {
    fn column(&self) -> &'static str {
        match self {
            SearchFilter::Username(_) => "Username",
            SearchFilter::Artist(_) => "Artist",
        }
    }

    fn value(&self) -> &str {
        match self {
            SearchFilter::Username(v) | SearchFilter::Artist(v) => v,
        }
    }
}

/// A report to run
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRequest {
    pub template: ReportTemplate,
    pub range: DateRange,
    pub search: Option<String>,
}

impl ReportRequest {
    pub fn new(template: ReportTemplate) -> Self {
        Self { template, range: DateRange::AllTime, search: None }
    }

    pub fn range(mut self, range: DateRange) -> Self {
        self.range = range;
        self
    }

    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }
}

/// A single report cell
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ReportValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl ReportValue {
    /// Numeric reading of the cell, for charting
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ReportValue::Integer(i) => Some(*i as f64),
            ReportValue::Real(r) => Some(*r),
            ReportValue::Text(t) => t.trim().parse().ok(),
            ReportValue::Null => None,
        }
    }
}

impl From<Value> for ReportValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => ReportValue::Null,
            Value::Integer(i) => ReportValue::Integer(i),
            Value::Real(r) => ReportValue::Real(r),
            Value::Text(t) => ReportValue::Text(t),
            Value::Blob(b) => ReportValue::Text(format!("<{} bytes>", b.len())),
        }
    }
}

impl std::fmt::Display for ReportValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportValue::Null => write!(f, "None"),
            ReportValue::Integer(i) => write!(f, "{}", i),
            ReportValue::Real(r) => write!(f, "{}", r),
            ReportValue::Text(t) => write!(f, "{}", t),
        }
    }
}

/// Named columns and ordered rows of a report
#[derive(Debug, Clone, Serialize)]
pub struct ReportTable {
    pub title: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<ReportValue>>,
}

impl ReportTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// First column as label, second as value; rows without a number are dropped
    pub fn chart_points(&self) -> Vec<(String, f64)> {
        self.rows
            .iter()
            .filter_map(|row| {
                let label = row.first()?.to_string();
                let value = row.get(1)?.as_f64()?;
                Some((label, value))
            })
            .collect()
    }
}

/// Runs report templates against a reporting store
pub struct ReportEngine<'a> {
    store: &'a ReportStore,
}

impl<'a> ReportEngine<'a> {
    pub fn new(store: &'a ReportStore) -> Self {
        Self { store }
    }

    /// Run a report with date ranges relative to the current time
    pub fn run(&self, request: &ReportRequest) -> Result<ReportTable> {
        self.run_at(request, Utc::now())
    }

    /// Run a report with date ranges relative to `now`
    pub fn run_at(&self, request: &ReportRequest, now: DateTime<Utc>) -> Result<ReportTable> {
        let (sql, values) = self.build_query(request, now)?;
        tracing::debug!(template = request.template.as_str(), %sql, "Running report");

        let (columns, rows) = self.store.query_rows(&sql, &values)?;
        Ok(ReportTable {
            title: request.template.title().to_string(),
            columns,
            rows: rows
                .into_iter()
                .map(|row| row.into_iter().map(ReportValue::from).collect())
                .collect(),
        })
    }

    /// Treat `term` as a username if any row has exactly that username,
    /// otherwise as an artist. Blank terms do not filter.
    pub fn classify_search(&self, term: &str) -> Result<Option<SearchFilter>> {
        let term = term.trim();
        if term.is_empty() {
            return Ok(None);
        }
        let filter = if self.store.contains_username(term)? {
            SearchFilter::Username(term.to_string())
        } else {
            SearchFilter::Artist(term.to_string())
        };
        Ok(Some(filter))
    }

    /// SQL text and bound values for a request
    pub fn build_query(&self, request: &ReportRequest, now: DateTime<Utc>) -> Result<(String, Vec<Value>)> {
        let template = request.template;
        let mut conditions: Vec<String> = Vec::new();
        let mut values = Vec::new();

        if let Some(state) = template.state_filter() {
            conditions.push(state.to_string());
        }
        if let Some(cutoff) = request.range.cutoff(now) {
            conditions.push("EndedAt >= ?".to_string());
            values.push(Value::Text(cutoff));
        }
        if let Some(term) = request.search.as_deref() {
            if let Some(filter) = self.classify_search(term)? {
                conditions.push(format!("{} = ?", filter.column()));
                values.push(Value::Text(filter.value().to_string()));
            }
        }

        let mut sql = format!("SELECT {} FROM UserTransfers", template.select());
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }
        sql.push_str(&format!(" GROUP BY {} ORDER BY {}", template.group_by(), template.order_by()));
        if let Some(limit) = template.limit() {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        Ok((sql, values))
    }
}
