//! A 2D irregular nesting library for sheet-metal cutting: it packs
//! polygonal parts onto rectangular sheets, minimizing the sheet count and
//! maximizing area utilization.
//!
//! # Crate Layout
//!
//! The placement core is built from small composable pieces:
//!
//! - [`geometry`] holds the planar kernel: points, rectangles, polygons,
//!   convex hulls, Minkowski sums.
//! - [`algorithms::nfp`] computes No-Fit Polygons and Inner-Fit
//!   Rectangles, the primitives behind every placement decision.
//! - [`Sheet`] answers the Bottom-Left placement query against the parts
//!   already fixed on it.
//! - [`algorithms::greedy`] fills sheets largest-part-first.
//! - [`algorithms::genetic`] evolves placement orders and rotations with
//!   an island-model genetic algorithm, one rayon task per island.
//! - [`NestingEngine`] ties it all together: it expands part templates,
//!   picks a strategy and loops sheet by sheet until nothing more fits.
//!
//! # Example
//!
//! ```rust
//! use sheetnest::{NestConfig, NestingEngine, Part, Polygon};
//!
//! let shape = Polygon::from_coords(&[(0.0, 0.0), (40.0, 0.0), (40.0, 25.0), (0.0, 25.0)]);
//! let part = Part::new(1, "bracket", shape).with_count(4);
//!
//! let mut config = NestConfig::default();
//! config.sheet.width = 300.0;
//! config.sheet.height = 200.0;
//!
//! let mut engine = NestingEngine::new(config);
//! let result = engine.nest(&[part]);
//!
//! assert_eq!(result.placed_parts, 4);
//! assert_eq!(result.sheets.len(), 1);
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::ensure;

pub mod algorithms;
pub mod analysis;
pub mod engine;
pub mod geometry;
pub mod part;
pub mod sheet;


// API

// SUBMODULES REEXPORT
pub use algorithms::genetic::{Chromosome, GaProgress, GeneticAlgorithm};
pub use algorithms::nfp::NfpCache;
pub use analysis::TechCard;
pub use engine::{NestingEngine, NestingMode, NestingResult};
pub use geometry::{Point2D, Polygon, Rect};
pub use part::{Part, PlacedPart};
pub use sheet::{Placement, Sheet};

/// Rotation angles a part may be placed under, in degrees.
pub const SUPPORTED_ANGLES: [f64; 4] = [0.0, 90.0, 180.0, 270.0];

/// Cooperative cancellation handle. Clones share the flag; the engine and
/// the genetic algorithm observe it at their loop boundaries, so a set
/// flag winds the run up within one generation or sheet and the best
/// result found so far is still returned.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }
}

/// Receiver for coarse engine progress. `percent` is in `[-1, 100]`, where
/// `-1` means "unchanged since the last report".
pub trait ProgressListener: Send + Sync {
    fn on_progress(&self, percent: i32, message: &str);
}

/// Sheet stock dimensions and placement clearances, all in one length
/// unit (millimetres for metal cutting).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SheetConfig {
    pub width: f64,
    pub height: f64,
    /// Border excluded from the usable area on all four sides.
    pub margin: f64,
    /// Minimum clearance between any two placed parts.
    pub gap: f64,
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            width: 3000.0,
            height: 1500.0,
            margin: 10.0,
            gap: 5.0,
        }
    }
}

/// Genetic-optimizer knobs, forwarded to [`GeneticAlgorithm`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GaConfig {
    pub population_size: usize,
    pub max_generations: usize,
    pub target_fitness: f64,
    pub stagnation_limit: u32,
    pub elite_count: usize,
    pub tournament_k: usize,
    /// 0 selects `clamp(hardware threads, 2, 4)` islands.
    pub island_count: usize,
    pub migration_every: usize,
    pub migration_count: usize,
}

impl Default for GaConfig {
    fn default() -> Self {
        Self {
            population_size: 60,
            max_generations: 300,
            target_fitness: 0.97,
            stagnation_limit: 60,
            elite_count: 4,
            tournament_k: 4,
            island_count: 0,
            migration_every: 20,
            migration_count: 2,
        }
    }
}

/// Full engine configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct NestConfig {
    pub sheet: SheetConfig,
    /// Allowed rotations, a non-empty subset of [`SUPPORTED_ANGLES`].
    pub angles: Vec<f64>,
    pub ga: GaConfig,
    /// Used by technology-card reporting only.
    pub cutting_speed_mm_per_sec: f64,
    pub verbose_logging: bool,
    pub mode: NestingMode,
    /// Run seed; identical seeds with identical input reproduce the run.
    pub seed: u64,
}

impl Default for NestConfig {
    fn default() -> Self {
        Self {
            sheet: SheetConfig::default(),
            angles: SUPPORTED_ANGLES.to_vec(),
            ga: GaConfig::default(),
            cutting_speed_mm_per_sec: 50.0,
            verbose_logging: false,
            mode: NestingMode::Auto,
            seed: 0,
        }
    }
}

impl NestConfig {
    /// Checks the configuration against its documented domain. The engine
    /// runs this first and turns a failure into a warning instead of a
    /// panic or a propagated error.
    pub fn validate(&self) -> anyhow::Result<()> {
        let s = &self.sheet;
        ensure!(s.width > 0.0 && s.height > 0.0, "sheet dimensions must be positive");
        ensure!(s.margin >= 0.0, "margin must be non-negative");
        ensure!(s.gap >= 0.0, "gap must be non-negative");
        ensure!(
            2.0 * s.margin < s.width.min(s.height),
            "margin {} leaves no usable area on a {}x{} sheet",
            s.margin,
            s.width,
            s.height
        );

        ensure!(!self.angles.is_empty(), "at least one rotation angle is required");
        for &a in &self.angles {
            ensure!(
                SUPPORTED_ANGLES.iter().any(|&sup| (sup - a).abs() < 1e-9),
                "unsupported rotation angle {a}"
            );
        }

        let ga = &self.ga;
        ensure!(ga.population_size >= 10, "population size must be at least 10");
        ensure!(ga.max_generations >= 1, "at least one generation is required");
        ensure!(
            ga.target_fitness > 0.0 && ga.target_fitness <= 1.0,
            "target fitness must be in (0, 1]"
        );
        ensure!(
            ga.elite_count < ga.population_size,
            "elite count must be below the population size"
        );
        ensure!(ga.tournament_k >= 1, "tournament size must be at least 1");
        ensure!(ga.migration_every >= 1, "migration interval must be at least 1");

        ensure!(
            self.cutting_speed_mm_per_sec > 0.0,
            "cutting speed must be positive"
        );
        Ok(())
    }
}
