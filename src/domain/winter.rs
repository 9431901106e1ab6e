use crate::domain::data_type::DataType;
use crate::domain::series::Observation;

/// One water year (Nov 1 of `water_year` to Mar 31 of `water_year + 1`)
/// reindexed onto its expected grid.
#[derive(Debug, Clone, PartialEq)]
pub struct WinterSegment {
    pub data_type: DataType,
    pub water_year: i32,
    /// One row per expected grid slot; gaps are `Reading::Missing` rows.
    pub rows: Vec<Observation>,
    /// Percentage of rows with a value, rounded to 2 decimals.
    pub completeness: f64,
    /// Winter observations whose timestamps are not on the grid.
    pub off_grid: usize,
}

impl WinterSegment {
    /// `2019-2020` style label.
    pub fn season_label(&self) -> String {
        season_label(self.water_year)
    }

    pub fn present_count(&self) -> usize {
        self.rows.iter().filter(|row| row.reading.is_present()).count()
    }
}

pub fn season_label(water_year: i32) -> String {
    format!("{water_year}-{}", water_year + 1)
}
