// SVG charts of surface slices: the skew at one maturity and the term
// structure at one strike. Vols are drawn in percent; failed cells are left
// out of the line.

use anyhow::{bail, Result};
use plotters::prelude::*;

use super::VolSurface;
use crate::calibration::solver::FAILED_VOL;
use crate::models::traits::PricingModel;

const SIZE: (u32, u32) = (960, 600);

/// Skew chart (vol against strike) at `maturity` months, as an SVG document.
pub fn render_skew_svg<M: PricingModel>(surface: &VolSurface<M>, maturity: u32) -> Result<String> {
    let vols = surface.skew(maturity)?;
    let points = surface.strikes().iter().copied().zip(vols).collect();
    render_line(
        &format!("{} skew | {maturity}M", surface.name()),
        "Strike (% of spot)",
        points,
    )
}

/// Term-structure chart (vol against maturity) at `strike` percent, as an SVG
/// document.
pub fn render_term_structure_svg<M: PricingModel>(
    surface: &VolSurface<M>,
    strike: f64,
) -> Result<String> {
    let vols = surface.term_structure(strike)?;
    let points = surface
        .maturities()
        .iter()
        .map(|&m| f64::from(m))
        .zip(vols)
        .collect();
    render_line(
        &format!("{} term structure | {strike}%", surface.name()),
        "Maturity (months)",
        points,
    )
}

fn padded(min: f64, max: f64, fraction: f64) -> (f64, f64) {
    let pad = ((max - min) * fraction).max(1e-6).max(min.abs() * fraction);
    (min - pad, max + pad)
}

fn render_line(caption: &str, x_desc: &str, points: Vec<(f64, f64)>) -> Result<String> {
    let points: Vec<(f64, f64)> = points
        .into_iter()
        .filter(|&(_, v)| v != FAILED_VOL && v.is_finite())
        .map(|(x, v)| (x, v * 100.0))
        .collect();
    if points.is_empty() {
        bail!("nothing to plot for {caption}: every cell failed");
    }

    let (x_min, x_max) = points
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &(x, _)| (lo.min(x), hi.max(x)));
    let (y_min, y_max) = points
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &(_, y)| (lo.min(y), hi.max(y)));
    let (x_min, x_max) = padded(x_min, x_max, 0.05);
    let (y_min, y_max) = padded(y_min, y_max, 0.1);

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, SIZE).into_drawing_area();
        root.fill(&WHITE)?;
        let mut chart = ChartBuilder::on(&root)
            .margin(20)
            .caption(caption, ("sans-serif", 26))
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(x_min..x_max, y_min.max(0.0)..y_max)?;

        chart
            .configure_mesh()
            .x_desc(x_desc)
            .y_desc("Breakeven vol (%)")
            .draw()?;

        chart.draw_series(std::iter::once(PathElement::new(points.clone(), BLUE.stroke_width(2))))?;
        chart.draw_series(points.iter().map(|pt| Circle::new(*pt, 3, BLUE.filled())))?;
        root.present()?;
    }
    Ok(svg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::config::SurfaceConfig;
    use crate::calibration::types::Estimator;
    use crate::series::Date;
    use crate::synthetic::zigzag_series;
    use std::sync::Arc;

    fn built() -> VolSurface {
        let start = Date::from_ymd(2020, 1, 1).unwrap();
        let series = Arc::new(zigzag_series("ZZ", start, 120, 100.0, 0.2).unwrap());
        let config = SurfaceConfig {
            strikes: vec![90.0, 100.0, 110.0],
            maturities: vec![1, 3],
            ..SurfaceConfig::default()
        };
        let mut surface = VolSurface::from_config(series, &config).unwrap();
        surface.build(Estimator::Robust);
        surface
    }

    #[test]
    fn test_renders_svg_documents() {
        let surface = built();
        let skew = render_skew_svg(&surface, 3).unwrap();
        assert!(skew.contains("<svg"));
        let term = render_term_structure_svg(&surface, 100.0).unwrap();
        assert!(term.contains("<svg"));
    }

    #[test]
    fn test_unknown_slice_is_an_error() {
        let surface = built();
        assert!(render_skew_svg(&surface, 7).is_err());
        assert!(render_term_structure_svg(&surface, 101.0).is_err());
    }
}
