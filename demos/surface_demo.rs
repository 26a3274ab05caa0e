// Example: surface_demo.rs
// Builds plain and robust breakeven volatility surfaces over a price file (or
// a seeded synthetic path when no file is given), prints them, exports the
// tables and writes skew / term-structure charts next to them.
//
// Usage:
//     cargo run --example surface_demo -- [<price_file.csv> <name>] [<out_dir>]
//
// The price file holds `dd/mm/yyyy;value` rows without a header.
// Set RUST_LOG=debug to follow window moves and solver steps.

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use breakeven_vol::surface::{render_skew_svg, render_term_structure_svg};
use breakeven_vol::{
    build_surface, load_csv, synthetic, Date, DatedSeries, Estimator, SurfaceConfig, FAILED_VOL,
};
use tracing_subscriber::EnvFilter;

fn load_series(args: &[String]) -> Result<Arc<DatedSeries>> {
    let series = match args {
        [path, name, ..] => load_csv(path, name)?,
        _ => {
            println!("No price file given, using a synthetic 25% vol path");
            let start = Date::from_ymd(2017, 1, 2)?;
            synthetic::gbm_series("SYNTH", start, 800, 2250.0, 0.25, 0.03, 2024)?
        }
    };
    Ok(Arc::new(series))
}

fn print_surface(surface: &breakeven_vol::VolSurface) -> Result<()> {
    print!("{:>6}", "");
    for strike in surface.strikes() {
        print!("{:>8}", format!("{strike}%"));
    }
    println!();
    for &maturity in surface.maturities() {
        print!("{:>6}", format!("{maturity}M"));
        for vol in surface.skew(maturity)? {
            if vol == FAILED_VOL {
                print!("{:>8}", "-");
            } else {
                print!("{:>8.2}", vol * 100.0);
            }
        }
        println!();
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let series = load_series(&args)?;
    let out_dir = args
        .get(2)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));

    let summary = series.summary();
    println!(
        "{}: {} observations {} - {}, min {:.2} max {:.2} mean {:.2}",
        series.name(),
        summary.len,
        summary.first_date,
        summary.last_date,
        summary.min,
        summary.max,
        summary.mean
    );
    if let Ok(start) = series.shift_months(
        series.len(),
        3,
        breakeven_vol::Direction::Before,
        breakeven_vol::Fallback::Next,
    ) {
        let realised = series.realized_vol(start, series.len())?;
        println!("Realised vol, last 3M: {:.2}%", realised * 100.0);
    }

    for estimator in [Estimator::Plain, Estimator::Robust] {
        let config = SurfaceConfig {
            estimator,
            ..SurfaceConfig::default()
        };
        let surface = build_surface(series.clone(), &config)?;

        println!("\nBreakeven vols (%) with the {estimator}");
        print_surface(&surface)?;

        let table = surface.export_to_dir(&out_dir)?;
        println!("Table saved to {}", table.display());

        let tag = if estimator == Estimator::Robust { "_robust" } else { "" };
        let skew = out_dir.join(format!("{}{tag}_skew_6m.svg", series.name()));
        std::fs::write(&skew, render_skew_svg(&surface, 6)?)?;
        let term = out_dir.join(format!("{}{tag}_term_atm.svg", series.name()));
        std::fs::write(&term, render_term_structure_svg(&surface, 100.0)?)?;
        println!("Charts saved to {} and {}", skew.display(), term.display());
    }
    Ok(())
}
