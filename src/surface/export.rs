//! Text form of a built surface.
//!
//! ```text
//! Maturities\Strikes;90;100;110;
//! 1;0.21;0.2;0.19;
//! 3;0.22;0.2;0.18;
//! ```
//!
//! Every line ends with the delimiter. Strikes and maturities are written in
//! list order, values with the shortest representation that reads back equal.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use csv::{Terminator, WriterBuilder};
use tracing::info;

use super::VolSurface;
use crate::calibration::types::Estimator;
use crate::error::HedgeError;
use crate::models::traits::PricingModel;

/// Top-left cell of the exported table.
pub const CORNER_LABEL: &str = "Maturities\\Strikes";

impl<M: PricingModel> VolSurface<M> {
    /// File name used by [`export_to_dir`](Self::export_to_dir):
    /// `<series>_vol.csv`, or `<series>_robust_vol.csv` for a robust build.
    pub fn export_file_name(&self) -> String {
        let suffix = match self.estimator() {
            Some(Estimator::Robust) => "_robust",
            _ => "",
        };
        format!("{}{suffix}_vol.csv", self.name())
    }

    /// Writes the `;`-delimited table to `writer`.
    ///
    /// Fails with [`HedgeError::NotFound`] if the surface has not been built.
    pub fn write_delimited<W: Write>(&self, writer: W) -> Result<()> {
        let vols = self.vols().ok_or_else(|| {
            HedgeError::not_found(format!("surface {} has not been built", self.name())).traced()
        })?;
        let mut out = WriterBuilder::new()
            .delimiter(b';')
            .terminator(Terminator::Any(b'\n'))
            .has_headers(false)
            .from_writer(writer);

        let ns = self.strikes().len();
        let mut header = Vec::with_capacity(ns + 2);
        header.push(CORNER_LABEL.to_string());
        header.extend(self.strikes().iter().map(f64::to_string));
        header.push(String::new());
        out.write_record(&header)?;

        for (row, maturity) in vols.chunks(ns).zip(self.maturities()) {
            let mut record = Vec::with_capacity(ns + 2);
            record.push(maturity.to_string());
            record.extend(row.iter().map(f64::to_string));
            record.push(String::new());
            out.write_record(&record)?;
        }
        out.flush()?;
        Ok(())
    }

    pub fn to_delimited(&self) -> Result<String> {
        let mut buffer = Vec::new();
        self.write_delimited(&mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    /// Writes the table to `dir/`[`export_file_name`](Self::export_file_name)
    /// and returns the path written.
    pub fn export_to_dir(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let path = dir.as_ref().join(self.export_file_name());
        let file = std::fs::File::create(&path)
            .with_context(|| format!("creating {}", path.display()))?;
        self.write_delimited(file)
            .with_context(|| format!("writing surface {} to {}", self.name(), path.display()))?;
        info!(surface = %self.name(), file = %path.display(), "surface exported");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::config::SurfaceConfig;
    use crate::series::Date;
    use crate::synthetic::zigzag_series;
    use std::sync::Arc;

    fn built(estimator: Estimator) -> VolSurface {
        let start = Date::from_ymd(2020, 1, 1).unwrap();
        let series = Arc::new(zigzag_series("ZZ", start, 120, 100.0, 0.2).unwrap());
        let config = SurfaceConfig {
            strikes: vec![95.0, 105.0],
            maturities: vec![1, 2],
            ..SurfaceConfig::default()
        };
        let mut surface = VolSurface::from_config(series, &config).unwrap();
        surface.build(estimator);
        surface
    }

    #[test]
    fn test_table_layout() {
        let surface = built(Estimator::Plain);
        let text = surface.to_delimited().unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "Maturities\\Strikes;95;105;");
        assert!(lines[1].starts_with("1;"));
        assert!(lines[2].starts_with("2;"));

        let cells: Vec<f64> = lines[2]
            .trim_end_matches(';')
            .split(';')
            .skip(1)
            .map(|c| c.parse().unwrap())
            .collect();
        assert_eq!(cells, surface.skew(2).unwrap());
    }

    #[test]
    fn test_file_name_follows_estimator() {
        assert_eq!(built(Estimator::Plain).export_file_name(), "ZZ_vol.csv");
        assert_eq!(built(Estimator::Robust).export_file_name(), "ZZ_robust_vol.csv");
    }

    #[test]
    fn test_unbuilt_surface_is_not_exported() {
        let mut surface = built(Estimator::Plain);
        surface.set_strikes(vec![100.0]).unwrap();
        let err = surface.to_delimited().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<HedgeError>(),
            Some(HedgeError::NotFound { .. })
        ));
    }

    #[test]
    fn test_export_to_dir() {
        let dir = tempfile::tempdir().unwrap();
        let surface = built(Estimator::Robust);
        let path = surface.export_to_dir(dir.path()).unwrap();
        assert!(path.ends_with("ZZ_robust_vol.csv"));
        let written = std::fs::read_to_string(path).unwrap();
        assert_eq!(written, surface.to_delimited().unwrap());
    }
}
