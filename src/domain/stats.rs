use serde::Serialize;

/// Grouping used when aggregating a series across years.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    /// `MM-DD`
    DayOfYear,
    /// `MM`, labelled with the month name.
    Month,
    /// `YYYY-MM`
    YearMonth,
}

impl Period {
    pub fn header(&self) -> &'static str {
        match self {
            Period::DayOfYear => "DayOfYear",
            Period::Month | Period::YearMonth => "Month",
        }
    }

    /// Output file prefix used by the stats stage.
    pub fn file_prefix(&self) -> &'static str {
        match self {
            Period::DayOfYear => "DailyStats",
            Period::YearMonth => "MonthlyStats",
            Period::Month => "MonthlySummaryStats",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PeriodSummary {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    pub p5: f64,
    pub p25: f64,
    pub p75: f64,
    pub p95: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatsRow {
    /// Sortable group key (`MM-DD`, `MM`, `YYYY-MM`).
    pub key: String,
    /// Display label; the month name for `Period::Month`.
    pub label: String,
    pub summary: PeriodSummary,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatsTable {
    pub period: Period,
    pub precision: u32,
    /// Calendar / chronological order.
    pub rows: Vec<StatsRow>,
}

impl StatsTable {
    pub fn get(&self, key: &str) -> Option<&StatsRow> {
        self.rows.iter().find(|row| row.key == key)
    }
}
