
use std::io::Write;

use breakeven_vol::surface::{render_skew_svg, render_term_structure_svg};
use breakeven_vol::{
    breakeven_vol, build_surface, default_configs, Estimator, HedgeError, MarketParameters,
    SolverConfig, SurfaceConfig, VolSurface, FAILED_VOL,
};
use test_utils::{gbm, init_tracing, test_solver_config, zigzag};

const STRIKES: [f64; 3] = [80.0, 100.0, 120.0];
const MATURITIES: [u32; 3] = [1, 3, 12];

fn grid_config(estimator: Estimator) -> SurfaceConfig {
    SurfaceConfig {
        strikes: STRIKES.to_vec(),
        maturities: MATURITIES.to_vec(),
        estimator,
        solver: test_solver_config(),
        market: MarketParameters {
            rate: 0.0,
            dividend_yield: 0.02,
        },
    }
}

/// Nine cells over a flat 20% vol path: the robust estimator recovers the
/// path vol in every cell.
#[test]
fn test_nine_cell_grid_recovers_flat_vol() {
    init_tracing();
    let surface = build_surface(zigzag(400, 0.20), &grid_config(Estimator::Robust))
        .expect("surface builds");

    for &m in &MATURITIES {
        for &k in &STRIKES {
            let vol = surface.vol_at(k, m).expect("listed cell");
            println!("{m:>2}M {k:>5}%: {vol:.6}");
            assert!(vol.is_finite() && vol >= 0.0);
            assert!((vol - 0.20).abs() < 1e-4, "{m}M {k}%: {vol}");
        }
    }
}

/// The plain estimator fills the same grid with usable values; the window
/// close to expiry at the money carries a discrete-hedging bias.
#[test]
fn test_nine_cell_grid_plain_estimator() {
    let surface = build_surface(zigzag(400, 0.20), &grid_config(Estimator::Plain))
        .expect("surface builds");
    for &m in &MATURITIES {
        for &k in &STRIKES {
            let vol = surface.vol_at(k, m).unwrap();
            assert!(vol.is_finite() && vol >= 0.0, "{m}M {k}%: {vol}");
        }
    }
    let atm_year = surface.vol_at(100.0, 12).unwrap();
    assert!((atm_year - 0.20).abs() < 0.05, "12M ATM {atm_year}");
}

#[test]
fn test_slices_follow_list_order() {
    let surface = build_surface(gbm(400, 0.25, 17), &grid_config(Estimator::Robust)).unwrap();
    let skew = surface.skew(3).unwrap();
    let expected: Vec<f64> = STRIKES.iter().map(|&k| surface.vol_at(k, 3).unwrap()).collect();
    assert_eq!(skew, expected);

    let term = surface.term_structure(120.0).unwrap();
    let expected: Vec<f64> = MATURITIES
        .iter()
        .map(|&m| surface.vol_at(120.0, m).unwrap())
        .collect();
    assert_eq!(term, expected);
}

/// A redefined strike list discards every cell, including strikes that
/// appear in both lists.
#[test]
fn test_stale_strike_after_redefinition() {
    let mut surface = build_surface(zigzag(400, 0.20), &grid_config(Estimator::Robust)).unwrap();
    assert!(surface.vol_at(100.0, 3).is_ok());

    surface.set_strikes(vec![90.0, 100.0, 110.0]).unwrap();
    assert!(matches!(
        surface.vol_at(100.0, 3),
        Err(HedgeError::NotFound { .. })
    ));
    assert!(matches!(surface.skew(3), Err(HedgeError::NotFound { .. })));

    let summary = surface.build(Estimator::Robust);
    assert_eq!(summary.cells, 9);
    assert!(surface.vol_at(110.0, 12).is_ok());
    assert!(matches!(
        surface.vol_at(120.0, 12),
        Err(HedgeError::NotFound { .. })
    ));
}

#[test]
fn test_simulator_swap_discards_grid() {
    let config = grid_config(Estimator::Robust);
    let mut surface = VolSurface::from_config(zigzag(400, 0.2), &config).unwrap();
    surface.build(Estimator::Robust);
    let other = VolSurface::from_config(zigzag(400, 0.3), &config).unwrap();
    surface.set_simulator(other.simulator().clone());
    assert!(!surface.is_built());

    surface.build(Estimator::Robust);
    assert!((surface.vol_at(100.0, 3).unwrap() - 0.3).abs() < 1e-4);
}

#[test]
fn test_single_breakeven() {
    let config = grid_config(Estimator::Robust);
    let result = breakeven_vol(zigzag(200, 0.15), 3, 100.0, &config).expect("breakeven found");
    assert!((result.vol - 0.15).abs() < 1e-4);
    assert!(result.iterations > 0);

    // A window that collapses onto the last observation is refused.
    assert!(breakeven_vol(zigzag(200, 0.15), 0, 100.0, &config).is_err());
    assert!(breakeven_vol(zigzag(200, 0.15), 3, -5.0, &config).is_err());
}

#[test]
fn test_config_file_to_exported_table() {
    init_tracing();
    let mut config_file = tempfile::NamedTempFile::new().unwrap();
    write!(
        config_file,
        r#"
strikes = [90.0, 110.0]
maturities = [2, 4]
estimator = "robust"

[solver]
precision = 0.0001
"#
    )
    .unwrap();
    let config = SurfaceConfig::from_toml_file(config_file.path()).expect("config parses");
    let surface = build_surface(zigzag(200, 0.2), &config).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = surface.export_to_dir(dir.path()).unwrap();
    assert_eq!(path.file_name().unwrap(), "ZIGZAG_robust_vol.csv");

    let text = std::fs::read_to_string(&path).unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("Maturities\\Strikes;90;110;"));
    for months in ["2", "4"] {
        let line = lines.next().expect("one line per maturity");
        let cells: Vec<&str> = line.split(';').collect();
        assert_eq!(cells[0], months);
        assert_eq!(cells.len(), 4);
        assert_eq!(cells[3], "");
        for cell in &cells[1..3] {
            let vol: f64 = cell.parse().unwrap();
            assert!((vol - 0.2).abs() < 1e-4);
        }
    }
    assert_eq!(lines.next(), None);
}

#[test]
fn test_charts_of_a_built_surface() {
    let surface = build_surface(zigzag(400, 0.2), &grid_config(Estimator::Robust)).unwrap();
    let skew = render_skew_svg(&surface, 12).unwrap();
    let term = render_term_structure_svg(&surface, 80.0).unwrap();
    assert!(skew.starts_with("<svg") || skew.contains("<svg"));
    assert!(term.contains("</svg>"));
}

#[test]
fn test_failed_cells_hold_sentinel() {
    // Bracket entirely below the path vol; rejecting it fails every cell.
    let mut config = grid_config(Estimator::Robust);
    config.solver = SolverConfig {
        vol_low: 0.01,
        vol_high: 0.05,
        ..default_configs::precise()
    };
    let surface = build_surface(zigzag(400, 0.2), &config).unwrap();
    assert_eq!(surface.vols().unwrap().len(), 9);
    assert!(surface.vols().unwrap().iter().all(|&v| v == FAILED_VOL));
}
