//! Riparian connectivity statistics record and its tabular form

use std::fmt;
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::Path;

use riparian_core::Result;
use serde::Serialize;

/// Statistics for one watershed.
///
/// Areas are in km², perimeters in km and coverages in percent. Ratios
/// with a zero denominator are `NaN`; see [`StatRecord::undefined_metrics`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatRecord {
    #[serde(rename = "Watershed name")]
    pub watershed_name: String,
    #[serde(rename = "Watershed area (km2)")]
    pub watershed_area_km2: f64,
    #[serde(rename = "Riparian area (km2)")]
    pub riparian_area_km2: f64,
    #[serde(rename = "Vegetated riparian area (km2)")]
    pub vegetated_area_km2: f64,
    #[serde(rename = "Non-vegetated riparian area (km2)")]
    pub non_vegetated_area_km2: f64,
    #[serde(rename = "Vegetated riparian coverage (%)")]
    pub vegetated_coverage_pct: f64,
    #[serde(rename = "Mean non-vegetated patch size (km2)")]
    pub mean_non_vegetated_patch_km2: f64,
    #[serde(rename = "non-vegetated riparian coverage (%)")]
    pub non_vegetated_coverage_pct: f64,
    #[serde(rename = "n vegetated riparian features")]
    pub n_vegetated: usize,
    #[serde(rename = "n non-vegetated riparian features")]
    pub n_non_vegetated: usize,
    #[serde(rename = "Perimeter of vegetation features (km)")]
    pub vegetated_perimeter_km: f64,
    #[serde(rename = "Perimeter of non-vegetation features (km)")]
    pub non_vegetated_perimeter_km: f64,
    #[serde(rename = "Perimeter of riparian buffer (km)")]
    pub riparian_perimeter_km: f64,
    /// Contiguous riparian patches after dissolve; not a table column
    #[serde(skip)]
    pub n_riparian_features: usize,
}

impl StatRecord {
    /// Table columns, in output order
    pub const COLUMNS: [&'static str; 13] = [
        "Watershed name",
        "Watershed area (km2)",
        "Riparian area (km2)",
        "Vegetated riparian area (km2)",
        "Non-vegetated riparian area (km2)",
        "Vegetated riparian coverage (%)",
        "Mean non-vegetated patch size (km2)",
        "non-vegetated riparian coverage (%)",
        "n vegetated riparian features",
        "n non-vegetated riparian features",
        "Perimeter of vegetation features (km)",
        "Perimeter of non-vegetation features (km)",
        "Perimeter of riparian buffer (km)",
    ];

    /// Cell values in [`StatRecord::COLUMNS`] order. `NaN` prints as `NaN`.
    pub fn values(&self) -> [String; 13] {
        [
            self.watershed_name.clone(),
            self.watershed_area_km2.to_string(),
            self.riparian_area_km2.to_string(),
            self.vegetated_area_km2.to_string(),
            self.non_vegetated_area_km2.to_string(),
            self.vegetated_coverage_pct.to_string(),
            self.mean_non_vegetated_patch_km2.to_string(),
            self.non_vegetated_coverage_pct.to_string(),
            self.n_vegetated.to_string(),
            self.n_non_vegetated.to_string(),
            self.vegetated_perimeter_km.to_string(),
            self.non_vegetated_perimeter_km.to_string(),
            self.riparian_perimeter_km.to_string(),
        ]
    }

    /// Columns whose value is undefined (a ratio over zero)
    pub fn undefined_metrics(&self) -> Vec<&'static str> {
        [
            (5, self.vegetated_coverage_pct),
            (6, self.mean_non_vegetated_patch_km2),
            (7, self.non_vegetated_coverage_pct),
        ]
        .into_iter()
        .filter(|(_, v)| v.is_nan())
        .map(|(i, _)| Self::COLUMNS[i])
        .collect()
    }

    /// Write the record as CSV, optionally preceded by the header row
    pub fn write_csv<W: Write>(&self, writer: &mut W, header: bool) -> Result<()> {
        if header {
            let names: Vec<String> = Self::COLUMNS.iter().map(|c| csv_field(c)).collect();
            writeln!(writer, "{}", names.join(","))?;
        }
        let values: Vec<String> = self.values().iter().map(|v| csv_field(v)).collect();
        writeln!(writer, "{}", values.join(","))?;
        Ok(())
    }

    /// Append the record to a CSV table, writing the header only when the
    /// file is new or empty
    pub fn append_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())?;
        let header = file.metadata()?.len() == 0;

        let mut writer = BufWriter::new(file);
        self.write_csv(&mut writer, header)?;
        writer.flush()?;
        Ok(())
    }
}

impl fmt::Display for StatRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = Self::COLUMNS.iter().map(|c| c.len()).max().unwrap_or(0);
        for (name, value) in Self::COLUMNS.iter().zip(self.values()) {
            writeln!(f, "{:<width$}  {}", name, value, width = width)?;
        }
        Ok(())
    }
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
