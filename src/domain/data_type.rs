use std::fmt;

/// The three USGS series the toolkit works with, in processing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DataType {
    DailyQw,
    InstQw,
    InstHw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Daily,
    Instantaneous,
}

impl Service {
    pub fn code(&self) -> &'static str {
        match self {
            Service::Daily => "dv",
            Service::Instantaneous => "iv",
        }
    }
}

impl DataType {
    pub const ALL: [DataType; 3] = [DataType::DailyQw, DataType::InstQw, DataType::InstHw];

    /// Label used in file names, e.g. `Daily_Qw`.
    pub fn label(&self) -> &'static str {
        match self {
            DataType::DailyQw => "Daily_Qw",
            DataType::InstQw => "Inst_Qw",
            DataType::InstHw => "Inst_Hw",
        }
    }

    pub fn parameter_code(&self) -> &'static str {
        match self {
            DataType::DailyQw | DataType::InstQw => "00060",
            DataType::InstHw => "00065",
        }
    }

    pub fn service(&self) -> Service {
        match self {
            DataType::DailyQw => Service::Daily,
            DataType::InstQw | DataType::InstHw => Service::Instantaneous,
        }
    }

    pub fn is_daily(&self) -> bool {
        self.service() == Service::Daily
    }

    pub fn is_discharge(&self) -> bool {
        self.parameter_code() == "00060"
    }

    pub fn date_column(&self) -> &'static str {
        if self.is_daily() { "Date" } else { "Date & Time" }
    }

    pub fn value_column(&self) -> &'static str {
        if self.is_discharge() {
            "Discharge (cfs)"
        } else {
            "Gage Height (ft)"
        }
    }

    pub fn quantity(&self) -> &'static str {
        if self.is_discharge() { "Discharge" } else { "Gage Height" }
    }

    pub fn unit(&self) -> &'static str {
        if self.is_discharge() { "cfs" } else { "ft" }
    }

    /// Column holding `value / peak` in breakup event tables.
    pub fn dimensionless_column(&self) -> &'static str {
        if self.is_discharge() {
            "Dimensionless Discharge (Q/Qp)"
        } else {
            "Dimensionless Gage Height (H/Hp)"
        }
    }

    /// Column holding `value - pre_breakup` in breakup event tables.
    pub fn change_column(&self) -> &'static str {
        if self.is_discharge() {
            "Discharge Change (cfs)"
        } else {
            "Gage Height Change (ft)"
        }
    }

    pub fn default_interval_minutes(&self) -> u32 {
        if self.is_daily() { 1440 } else { 15 }
    }

    /// Key in the configured `available_dates` map.
    pub fn available_dates_key(&self) -> &'static str {
        match self {
            DataType::DailyQw => "daily_streamflow",
            DataType::InstQw => "inst_streamflow",
            DataType::InstHw => "inst_gageheight",
        }
    }

    /// Key in the configured `folders` map.
    pub fn folder_key(&self) -> &'static str {
        match self {
            DataType::DailyQw => "daily_qw",
            DataType::InstQw => "inst_qw",
            DataType::InstHw => "inst_hw",
        }
    }

    pub fn processed_file_name(&self, gage_number: &str) -> String {
        format!("{gage_number}_{}.csv", self.label())
    }

    pub fn metadata_file_name(&self, gage_number: &str) -> String {
        format!("{gage_number}_{}_metadata.json", self.label())
    }

    pub fn raw_file_name(&self, gage_number: &str) -> String {
        format!("{gage_number}_{}_raw.json", self.label())
    }

    /// `<gage>_WinterDailyQw_<Y>-<Y+1>.csv`
    pub fn winter_file_name(&self, gage_number: &str, water_year: i32) -> String {
        format!(
            "{gage_number}_Winter{}_{water_year}-{}.csv",
            self.label().replace('_', ""),
            water_year + 1
        )
    }

    /// Sub-path below the winter splits folder, e.g. `daily/qw`.
    pub fn winter_subfolder(&self) -> [String; 2] {
        let mut parts = self.label().split('_').map(|part| part.to_ascii_lowercase());
        [
            parts.next().unwrap_or_default(),
            parts.next().unwrap_or_default(),
        ]
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_follow_gage_and_label() {
        assert_eq!(DataType::InstHw.processed_file_name("03020500"), "03020500_Inst_Hw.csv");
        assert_eq!(
            DataType::DailyQw.metadata_file_name("03020500"),
            "03020500_Daily_Qw_metadata.json"
        );
        assert_eq!(
            DataType::DailyQw.winter_file_name("03020500", 2019),
            "03020500_WinterDailyQw_2019-2020.csv"
        );
    }

    #[test]
    fn winter_subfolder_is_lowercased_label_parts() {
        assert_eq!(DataType::InstQw.winter_subfolder(), ["inst".to_string(), "qw".to_string()]);
    }

    #[test]
    fn columns_depend_on_parameter_and_service() {
        assert_eq!(DataType::DailyQw.date_column(), "Date");
        assert_eq!(DataType::InstHw.date_column(), "Date & Time");
        assert_eq!(DataType::InstHw.value_column(), "Gage Height (ft)");
        assert_eq!(DataType::InstQw.service().code(), "iv");
        assert_eq!(DataType::InstHw.default_interval_minutes(), 15);
    }
}
