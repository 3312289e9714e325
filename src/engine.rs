//! The nesting façade: mode selection, template expansion, the per-sheet
//! optimization loop and result assembly.
//!
//! The engine never fails. Invalid configuration or degenerate parts are
//! reported through `NestingResult::warnings` and whatever could be placed
//! is returned together with the counters.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::algorithms::genetic::{GaProgress, GeneticAlgorithm};
use crate::algorithms::greedy;
use crate::algorithms::nfp::NfpCache;
use crate::analysis::{self, TechCard};
use crate::part::Part;
use crate::sheet::Sheet;
use crate::{CancelToken, NestConfig, ProgressListener};

/// Placement strategy. `Auto` picks per input: small or rectilinear jobs go
/// greedy, everything else through the genetic optimizer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NestingMode {
    Fast,
    Optimal,
    #[default]
    Auto,
}

/// Output of a nesting run.
#[derive(Clone, Debug, Default)]
pub struct NestingResult {
    pub sheets: Vec<Sheet>,
    pub total_parts: usize,
    pub placed_parts: usize,
    pub avg_utilization: f64,
    pub time_seconds: f64,
    pub mode_used: NestingMode,
    pub tech_card: TechCard,
    pub warnings: Vec<String>,
}

/// Multi-sheet nesting engine.
pub struct NestingEngine {
    pub config: NestConfig,
    pub progress: Option<Arc<dyn ProgressListener>>,
    pub cancel: CancelToken,
    global_cache: NfpCache,
}

// Forwards GA generation progress to the engine listener, rescaled into the
// overall run percentage.
struct GaProgressBridge {
    listener: Arc<dyn ProgressListener>,
    cancel: CancelToken,
    done: usize,
    total: usize,
    generations: usize,
    islands: usize,
}

impl GaProgress for GaProgressBridge {
    fn on_generation(&self, generation: usize, best_fitness: f64) {
        if self.cancel.is_cancelled() {
            return;
        }
        let pct = (self.done * 100 / self.total.max(1)
            + generation * 40 / self.generations.max(1))
        .min(99) as i32;
        self.listener.on_progress(
            pct,
            &format!(
                "GA generation {}/{} | utilization {}% | {} islands",
                generation + 1,
                self.generations,
                (best_fitness * 100.0) as i32,
                self.islands
            ),
        );
    }
}

impl NestingEngine {
    pub fn new(config: NestConfig) -> Self {
        Self {
            config,
            progress: None,
            cancel: CancelToken::new(),
            global_cache: NfpCache::new(),
        }
    }

    fn report(&self, percent: i32, message: &str) {
        if let Some(listener) = &self.progress {
            listener.on_progress(percent, message);
        }
    }

    /// Expands templates into unit instances, rejecting degenerate shapes.
    fn expand(&self, parts: &[Part], warnings: &mut Vec<String>) -> Vec<Part> {
        let mut expanded = Vec::new();
        for p in parts {
            if p.shape.len() < 3 || p.shape.area() < 1.0 {
                warn!(part = p.id, name = %p.name, "degenerate contour rejected");
                warnings.push(format!(
                    "part {} '{}' rejected: degenerate contour",
                    p.id, p.name
                ));
                continue;
            }
            for _ in 0..p.required_count {
                let mut unit = p.clone();
                unit.required_count = 1;
                unit.placed_count = 0;
                unit.normalize();
                expanded.push(unit);
            }
        }
        expanded
    }

    /// Small jobs and purely rectilinear contours gain nothing from the GA.
    fn choose_mode(&self, expanded: &[Part]) -> NestingMode {
        if expanded.len() <= 5 || expanded.iter().all(|p| p.shape.len() <= 8) {
            NestingMode::Fast
        } else {
            NestingMode::Optimal
        }
    }

    /// Runs the full nesting pipeline over the given templates.
    pub fn nest(&mut self, parts: &[Part]) -> NestingResult {
        let t0 = Instant::now();
        self.cancel.reset();
        self.global_cache.clear();

        let mut result = NestingResult::default();

        if let Err(e) = self.config.validate() {
            warn!(error = %e, "invalid nesting configuration");
            result.warnings.push(format!("invalid configuration: {e}"));
            return result;
        }

        let mut warnings = Vec::new();
        let expanded = self.expand(parts, &mut warnings);
        let total = expanded.len();

        let mode = match self.config.mode {
            NestingMode::Auto => self.choose_mode(&expanded),
            m => m,
        };
        if self.config.verbose_logging {
            info!(?mode, parts = total, "nesting started");
        } else {
            debug!(?mode, parts = total, "nesting started");
        }

        let sheets = if total == 0 {
            Vec::new()
        } else {
            match mode {
                NestingMode::Fast => self.nest_greedy(&expanded),
                _ => self.nest_optimal(&expanded),
            }
        };

        result.total_parts = total;
        result.placed_parts = sheets.iter().map(|s| s.placed.len()).sum();
        result.avg_utilization = analysis::average_utilization(&sheets);
        result.mode_used = mode;
        result.warnings = warnings;

        let unplaced = total - result.placed_parts;
        if unplaced > 0 {
            result
                .warnings
                .push(format!("{unplaced} of {total} parts could not be placed"));
        }

        result.tech_card = TechCard::compute(
            &sheets,
            result.placed_parts,
            total,
            self.config.sheet.width,
            self.config.sheet.height,
            self.config.cutting_speed_mm_per_sec,
        );
        result.sheets = sheets;
        result.time_seconds = t0.elapsed().as_secs_f64();

        if self.config.verbose_logging {
            info!(
                sheets = result.sheets.len(),
                placed = result.placed_parts,
                utilization = result.avg_utilization,
                seconds = result.time_seconds,
                "nesting finished"
            );
        }
        result
    }

    fn sheet_template(&self) -> Sheet {
        let s = &self.config.sheet;
        Sheet::new(s.width, s.height, s.margin, s.gap)
    }

    fn nest_greedy(&mut self, expanded: &[Part]) -> Vec<Sheet> {
        let template = self.sheet_template();
        let angles = self.config.angles.clone();
        let listener = self.progress.clone();
        let cancel = self.cancel.clone();
        greedy::nest_greedy(
            expanded,
            &template,
            &angles,
            &mut self.global_cache,
            &cancel,
            |pct, msg| {
                if let Some(l) = &listener {
                    l.on_progress(pct, msg);
                }
            },
        )
    }

    /// One GA run per sheet over everything still unplaced; the winning
    /// chromosome is replayed through the regular placement search.
    fn nest_optimal(&mut self, expanded: &[Part]) -> Vec<Sheet> {
        let total = expanded.len();
        let mut sheets: Vec<Sheet> = Vec::new();
        let mut remaining: Vec<usize> = (0..total).collect();

        while !remaining.is_empty() && !self.cancel.is_cancelled() {
            let batch: Vec<Part> = remaining.iter().map(|&i| expanded[i].clone()).collect();
            let template = self.sheet_template();
            let done = total - remaining.len();

            let ga_cfg = &self.config.ga;
            let islands = if ga_cfg.island_count > 0 {
                ga_cfg.island_count
            } else {
                std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(2)
                    .clamp(2, 4)
            };

            let ga = GeneticAlgorithm {
                population_size: ga_cfg.population_size,
                max_generations: ga_cfg.max_generations,
                target_fitness: ga_cfg.target_fitness,
                stagnation_limit: ga_cfg.stagnation_limit,
                elite_count: ga_cfg.elite_count,
                tournament_k: ga_cfg.tournament_k,
                island_count: ga_cfg.island_count,
                migration_every: ga_cfg.migration_every,
                migration_count: ga_cfg.migration_count,
                allowed_angles: self.config.angles.clone(),
                seed: self.config.seed,
                verbose: self.config.verbose_logging,
                progress: self.progress.clone().map(|listener| {
                    Arc::new(GaProgressBridge {
                        listener,
                        cancel: self.cancel.clone(),
                        done,
                        total,
                        generations: ga_cfg.max_generations,
                        islands,
                    }) as Arc<dyn GaProgress>
                }),
                cancel: self.cancel.clone(),
            };

            let outcome = ga.run(&batch, &template);

            if outcome.best.order.is_empty() {
                // The optimizer produced nothing usable; hand the batch to
                // the greedy packer and stop.
                warn!("GA returned an empty chromosome, falling back to greedy");
                let mut fallback = self.nest_greedy(&batch);
                sheets.append(&mut fallback);
                break;
            }

            let mut sheet = template;
            let mut local_cache = outcome.cache;
            let mut placed_flags = vec![false; batch.len()];
            for (slot, &batch_idx) in outcome.best.order.iter().enumerate() {
                let part = &batch[batch_idx];
                let angle = outcome.best.angles[slot];
                if let Some(pl) = sheet.find_best_placement(part, &[angle], &mut local_cache) {
                    sheet.place(part, pl.pos, pl.angle);
                    placed_flags[batch_idx] = true;
                }
            }

            let new_remaining: Vec<usize> = placed_flags
                .iter()
                .enumerate()
                .filter(|(_, &placed)| !placed)
                .map(|(bi, _)| remaining[bi])
                .collect();

            if new_remaining.len() == remaining.len() {
                self.report(100, "remaining parts do not fit on the sheet");
                break;
            }

            // Keep the per-sheet caches for subsequent sheets.
            for (k, v) in local_cache.drain() {
                self.global_cache.entry(k).or_insert(v);
            }

            sheets.push(sheet);
            remaining = new_remaining;

            let done = total - remaining.len();
            self.report(
                (done * 100 / total.max(1)) as i32,
                &format!("sheet {} done | {done}/{total} parts", sheets.len()),
            );
        }

        sheets
    }
}
