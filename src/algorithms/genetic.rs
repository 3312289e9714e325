//! Island-model genetic algorithm over placement orders and rotations.
//!
//! A chromosome is a permutation of the part indices plus one rotation
//! angle per slot. Fitness simulates a single-sheet Bottom-Left run in that
//! order, using only the slot's angle for each part, and rewards full
//! placement above any partial one.
//!
//! Islands evolve independently on a bounded worker pool, one task per
//! island per generation; nothing is shared during evolution. Each island
//! owns its population, adaptive rates, PRNG and NFP cache. Migration runs
//! on the coordinating thread between generations: every island sends its
//! top chromosomes to the next island on a ring and replaces the
//! recipient's worst. After termination the per-island caches are merged
//! into one, which the caller can reuse when applying the winning
//! chromosome.

use std::sync::Arc;

use rand::prelude::*;
use rand::rngs::StdRng;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::algorithms::nfp::NfpCache;
use crate::geometry::GEO_EPS;
use crate::part::Part;
use crate::sheet::Sheet;
use crate::CancelToken;

/// Fitness improvements below this threshold do not reset stagnation.
const IMPROVEMENT_EPS: f64 = 1e-5;

/// Listener for GA progress. `on_island` reports detail from island 0
/// every 10 generations and may be called from a worker thread.
pub trait GaProgress: Send + Sync {
    fn on_generation(&self, generation: usize, best_fitness: f64);

    fn on_island(&self, island: usize, generation: usize, best_fitness: f64) {
        let _ = (island, generation, best_fitness);
    }
}

/// A placement order with per-slot rotation angles.
///
/// `order` is a permutation of `0..n` over the expanded part indices;
/// `angles[i]` is the rotation tried for the part placed in slot `i`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Chromosome {
    pub order: Vec<usize>,
    pub angles: Vec<f64>,
    pub fitness: f64,
}

/// Mutation and crossover rates, adapted between generations from the
/// island's stagnation counter.
#[derive(Clone, Copy, Debug)]
pub struct AdaptiveParams {
    pub mutation_rate: f64,
    pub crossover_rate: f64,
}

impl Default for AdaptiveParams {
    fn default() -> Self {
        Self {
            mutation_rate: 0.14,
            crossover_rate: 0.88,
        }
    }
}

impl AdaptiveParams {
    /// Long stagnation pushes exploration up; steady progress cools it.
    pub fn adapt(&mut self, stagnation: u32) {
        if stagnation > 10 {
            self.mutation_rate = (self.mutation_rate * 1.15).min(0.40);
            self.crossover_rate = (self.crossover_rate * 0.97).max(0.60);
        } else if stagnation < 3 {
            self.mutation_rate = (self.mutation_rate * 0.95).max(0.05);
            self.crossover_rate = (self.crossover_rate * 1.01).min(0.95);
        }
    }

    pub fn reset(&mut self) {
        self.mutation_rate = 0.12;
        self.crossover_rate = 0.85;
    }
}

struct Island {
    id: usize,
    pop: Vec<Chromosome>,
    cache: NfpCache,
    params: AdaptiveParams,
    rng: StdRng,
    stagnation: u32,
    best: Chromosome,
}

/// Result of a GA run: the globally best chromosome and the merged NFP
/// cache accumulated by all islands.
#[derive(Default)]
pub struct GaOutcome {
    pub best: Chromosome,
    pub cache: NfpCache,
}

/// Island-parallel genetic optimizer for single-sheet placement.
pub struct GeneticAlgorithm {
    pub population_size: usize,
    pub max_generations: usize,
    pub target_fitness: f64,
    pub stagnation_limit: u32,
    pub elite_count: usize,
    pub tournament_k: usize,
    /// Number of islands; 0 selects `clamp(hardware threads, 2, 4)`.
    pub island_count: usize,
    pub migration_every: usize,
    pub migration_count: usize,
    pub allowed_angles: Vec<f64>,
    /// Run seed. Island `i` derives its PRNG as `seed + i`, which makes
    /// repeated runs with the same configuration reproducible.
    pub seed: u64,
    pub verbose: bool,
    pub progress: Option<Arc<dyn GaProgress>>,
    pub cancel: CancelToken,
}

impl Default for GeneticAlgorithm {
    fn default() -> Self {
        Self {
            population_size: 200,
            max_generations: 500,
            target_fitness: 0.97,
            stagnation_limit: 60,
            elite_count: 4,
            tournament_k: 4,
            island_count: 0,
            migration_every: 20,
            migration_count: 2,
            allowed_angles: vec![0.0, 90.0, 180.0, 270.0],
            seed: 0,
            verbose: false,
            progress: None,
            cancel: CancelToken::new(),
        }
    }
}

impl GeneticAlgorithm {
    /// Runs the optimizer for one sheet. `sheet_template` provides the
    /// sheet dimensions; any parts already on it are ignored.
    pub fn run(&self, parts: &[Part], sheet_template: &Sheet) -> GaOutcome {
        if parts.is_empty() {
            return GaOutcome::default();
        }

        let mut template = sheet_template.clone();
        template.placed.clear();

        let ni = if self.island_count > 0 {
            self.island_count
        } else {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(2)
                .clamp(2, 4)
        };
        let island_pop = (self.population_size / ni).max(10);

        let mut islands: Vec<Island> = (0..ni)
            .map(|i| {
                let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(i as u64));
                let mut cache = NfpCache::new();
                let mut pop = self.init_population(island_pop, parts, &mut rng);
                for c in &mut pop {
                    c.fitness = self.evaluate(c, parts, &template, &mut cache);
                }
                sort_desc(&mut pop);
                let best = pop[0].clone();
                Island {
                    id: i,
                    pop,
                    cache,
                    params: AdaptiveParams::default(),
                    rng,
                    stagnation: 0,
                    best,
                }
            })
            .collect();

        let mut global_best = Chromosome::default();
        for isl in &islands {
            if isl.best.fitness > global_best.fitness {
                global_best = isl.best.clone();
            }
        }

        if self.verbose {
            info!(
                islands = ni,
                island_pop,
                parts = parts.len(),
                initial_fitness = global_best.fitness,
                "genetic run starting"
            );
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(ni)
            .build()
            .expect("island worker pool");

        let mut global_stagnation: u32 = 0;
        for gen in 0..self.max_generations {
            if self.cancel.is_cancelled() {
                break;
            }

            // One task per island; `par_iter_mut` hands each task a
            // disjoint island and joins them all before migration.
            pool.install(|| {
                islands
                    .par_iter_mut()
                    .for_each(|island| self.evolve_island(island, gen, parts, &template));
            });

            if (gen + 1) % self.migration_every == 0 {
                migrate(&mut islands, self.migration_count);
            }

            let prev_best = global_best.fitness;
            for isl in &islands {
                if isl.best.fitness > global_best.fitness {
                    global_best = isl.best.clone();
                }
            }
            if global_best.fitness > prev_best + IMPROVEMENT_EPS {
                global_stagnation = 0;
            } else {
                global_stagnation += 1;
            }

            if let Some(listener) = &self.progress {
                listener.on_generation(gen, global_best.fitness);
            }
            if self.verbose && gen % 50 == 0 {
                info!(
                    gen,
                    fitness = global_best.fitness,
                    stagnation = global_stagnation,
                    "generation complete"
                );
            } else {
                debug!(gen, fitness = global_best.fitness, "generation complete");
            }

            if global_best.fitness >= self.target_fitness {
                break;
            }
            if global_stagnation >= self.stagnation_limit {
                break;
            }
        }

        // Merge the per-island caches; the first writer of a key wins, the
        // entries are value-equal anyway.
        let mut cache = NfpCache::new();
        for isl in &mut islands {
            for (k, v) in isl.cache.drain() {
                cache.entry(k).or_insert(v);
            }
        }

        if self.verbose {
            info!(fitness = global_best.fitness, "genetic run finished");
        }

        GaOutcome {
            best: global_best,
            cache,
        }
    }

    /// Three deterministic seeds (area, aspect ratio, bbox perimeter, all
    /// descending, all angles zero) plus uniform random permutations with
    /// random angles.
    fn init_population(&self, n: usize, parts: &[Part], rng: &mut StdRng) -> Vec<Chromosome> {
        let np = parts.len();
        let base: Vec<usize> = (0..np).collect();

        let mut pop = Vec::with_capacity(n);
        for i in 0..n {
            let mut order = base.clone();
            match i {
                0 => order.sort_by(|&a, &b| parts[b].area().total_cmp(&parts[a].area())),
                1 => order.sort_by(|&a, &b| {
                    let ra = parts[a].bounding_box();
                    let rb = parts[b].bounding_box();
                    let aspect_a = ra.w.max(ra.h) / ra.w.min(ra.h).max(GEO_EPS);
                    let aspect_b = rb.w.max(rb.h) / rb.w.min(rb.h).max(GEO_EPS);
                    aspect_b.total_cmp(&aspect_a)
                }),
                2 => order.sort_by(|&a, &b| {
                    let ra = parts[a].bounding_box();
                    let rb = parts[b].bounding_box();
                    (rb.w + rb.h).total_cmp(&(ra.w + ra.h))
                }),
                _ => order.shuffle(rng),
            }

            let angles = if i < 3 || self.allowed_angles.is_empty() {
                vec![0.0; np]
            } else {
                (0..np)
                    .map(|_| *self.allowed_angles.choose(rng).unwrap_or(&0.0))
                    .collect()
            };

            pop.push(Chromosome {
                order,
                angles,
                fitness: 0.0,
            });
        }
        pop
    }

    /// Single-sheet Bottom-Left simulation of the chromosome.
    fn simulate(
        &self,
        order: &[usize],
        angles: &[f64],
        parts: &[Part],
        template: &Sheet,
        cache: &mut NfpCache,
    ) -> (usize, f64) {
        let mut sheet = template.clone();
        let mut placed = 0usize;
        for (i, &part_idx) in order.iter().enumerate() {
            let part = &parts[part_idx];
            if let Some(pl) = sheet.find_best_placement(part, &[angles[i]], cache) {
                sheet.place(part, pl.pos, pl.angle);
                placed += 1;
            }
        }
        (placed, sheet.utilization())
    }

    fn evaluate(
        &self,
        c: &Chromosome,
        parts: &[Part],
        template: &Sheet,
        cache: &mut NfpCache,
    ) -> f64 {
        let (placed, util) = self.simulate(&c.order, &c.angles, parts, template, cache);
        fitness_from(placed, c.order.len(), util)
    }

    fn tournament<'p>(&self, pop: &'p [Chromosome], rng: &mut StdRng) -> &'p Chromosome {
        let mut best = rng.gen_range(0..pop.len());
        for _ in 1..self.tournament_k {
            let idx = rng.gen_range(0..pop.len());
            if pop[idx].fitness > pop[best].fitness {
                best = idx;
            }
        }
        &pop[best]
    }

    /// PMX over the order; angles are inherited by part identity, not by
    /// slot, so a part keeps its rotation wherever it lands in the child.
    fn crossover(&self, p1: &Chromosome, p2: &Chromosome, rng: &mut StdRng) -> Chromosome {
        let n = p1.order.len();
        if n == 0 {
            return p1.clone();
        }
        let mut s = rng.gen_range(0..n);
        let mut e = rng.gen_range(0..n);
        if s > e {
            std::mem::swap(&mut s, &mut e);
        }

        let order = pmx_crossover(&p1.order, &p2.order, s, e);

        let mut angle_map: std::collections::HashMap<usize, f64> =
            std::collections::HashMap::with_capacity(n);
        for i in 0..n {
            angle_map.insert(p2.order[i], p2.angles[i]);
        }
        for i in s..=e {
            angle_map.insert(p1.order[i], p1.angles[i]);
        }
        let angles = order
            .iter()
            .map(|idx| angle_map.get(idx).copied().unwrap_or(0.0))
            .collect();

        Chromosome {
            order,
            angles,
            fitness: 0.0,
        }
    }

    /// Four independent operators: slot swap, sub-range reversal,
    /// cut-and-paste of one slot, per-slot angle resampling.
    fn mutate(&self, c: &mut Chromosome, rng: &mut StdRng, params: &AdaptiveParams) {
        let n = c.order.len();
        if n < 2 {
            return;
        }
        let mr = params.mutation_rate;

        if rng.gen::<f64>() < mr {
            let a = rng.gen_range(0..n);
            let b = rng.gen_range(0..n);
            c.order.swap(a, b);
            c.angles.swap(a, b);
        }

        if rng.gen::<f64>() < mr * 0.5 {
            let mut a = rng.gen_range(0..n);
            let mut b = rng.gen_range(0..n);
            if a > b {
                std::mem::swap(&mut a, &mut b);
            }
            if b - a > 1 {
                c.order[a..=b].reverse();
                c.angles[a..=b].reverse();
            }
        }

        if rng.gen::<f64>() < mr * 0.3 {
            let from = rng.gen_range(0..n);
            let to = rng.gen_range(0..n);
            if from != to {
                let val_o = c.order.remove(from);
                let val_a = c.angles.remove(from);
                let to = to.min(c.order.len().saturating_sub(1));
                c.order.insert(to, val_o);
                c.angles.insert(to, val_a);
            }
        }

        if !self.allowed_angles.is_empty() {
            for i in 0..n {
                if rng.gen::<f64>() < mr * 0.25 {
                    if let Some(&a) = self.allowed_angles.choose(rng) {
                        c.angles[i] = a;
                    }
                }
            }
        }
    }

    /// Swap-based hill climbing applied only to an island's incumbent.
    /// A trial occasionally kicks one of the two swapped angles as well.
    fn local_search(
        &self,
        c: &mut Chromosome,
        max_iter: usize,
        parts: &[Part],
        template: &Sheet,
        cache: &mut NfpCache,
        rng: &mut StdRng,
    ) {
        let n = c.order.len();
        if n < 2 {
            return;
        }
        for _ in 0..max_iter {
            let a = rng.gen_range(0..n);
            let b = rng.gen_range(0..n);
            if a == b {
                continue;
            }
            let mut cand = c.clone();
            cand.order.swap(a, b);
            cand.angles.swap(a, b);

            if !self.allowed_angles.is_empty() && rng.gen::<f64>() < 0.3 {
                let pick = if rng.gen::<f64>() < 0.5 { a } else { b };
                if let Some(&angle) = self.allowed_angles.choose(rng) {
                    cand.angles[pick] = angle;
                }
            }

            cand.fitness = self.evaluate(&cand, parts, template, cache);
            if cand.fitness > c.fitness {
                *c = cand;
            }
        }
    }

    fn evolve_island(&self, island: &mut Island, gen: usize, parts: &[Part], template: &Sheet) {
        let Island {
            id,
            pop,
            cache,
            params,
            rng,
            stagnation,
            best,
        } = island;
        let ps = pop.len();

        let mut new_pop: Vec<Chromosome> = Vec::with_capacity(ps);
        for e in 0..self.elite_count.min(ps) {
            new_pop.push(pop[e].clone());
        }

        while new_pop.len() < ps {
            let mut child = if rng.gen::<f64>() < params.crossover_rate {
                let p1 = self.tournament(pop, rng).clone();
                let p2 = self.tournament(pop, rng).clone();
                self.crossover(&p1, &p2, rng)
            } else {
                self.tournament(pop, rng).clone()
            };
            self.mutate(&mut child, rng, params);
            child.fitness = self.evaluate(&child, parts, template, cache);
            new_pop.push(child);
        }

        *pop = new_pop;
        sort_desc(pop);

        if pop[0].fitness > best.fitness + IMPROVEMENT_EPS {
            *best = pop[0].clone();
            *stagnation = 0;
            self.local_search(best, 8, parts, template, cache, rng);
            best.fitness = self.evaluate(best, parts, template, cache);
            if best.fitness > pop[0].fitness {
                pop[0] = best.clone();
            }
        } else {
            *stagnation += 1;
        }

        params.adapt(*stagnation);

        if *id == 0 && gen % 10 == 0 {
            if let Some(listener) = &self.progress {
                listener.on_island(*id, gen, best.fitness);
            }
        }
    }
}

/// Fitness of a simulated placement.
///
/// Full placements always dominate partial ones: a full placement scores at
/// least 0.5 while a partial one tops out below it once the ratio term is
/// weighted. An all-failed chromosome still gets a tiny positive value so
/// tournament selection keeps discriminating.
pub fn fitness_from(placed: usize, total: usize, util: f64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    if placed == 0 {
        return 1e-6;
    }
    let ratio = placed as f64 / total as f64;
    if placed < total {
        ratio * 0.8 + util * 0.2
    } else {
        0.5 + util * 0.5
    }
}

fn sort_desc(pop: &mut [Chromosome]) {
    pop.sort_by(|a, b| b.fitness.total_cmp(&a.fitness));
}

/// PMX order crossover: the segment `[s, e]` is copied from the first
/// parent, remaining slots take the second parent's genes, walking the
/// mapping whenever a gene is already used.
fn pmx_crossover(p1: &[usize], p2: &[usize], s: usize, e: usize) -> Vec<usize> {
    const UNSET: usize = usize::MAX;
    let n = p1.len();
    let mut child = vec![UNSET; n];
    child[s..=e].copy_from_slice(&p1[s..=e]);

    for i in 0..n {
        if i >= s && i <= e {
            continue;
        }
        let mut val = p2[i];
        let mut tries = 0;
        while child.contains(&val) {
            match p1.iter().position(|&v| v == val) {
                Some(pos) => val = p2[pos],
                None => break,
            }
            tries += 1;
            if tries > n {
                val = UNSET;
                break;
            }
        }
        if val != UNSET {
            child[i] = val;
        }
    }

    let missing: Vec<usize> = (0..n).filter(|v| !child.contains(v)).collect();
    let mut mi = 0;
    for slot in child.iter_mut() {
        if *slot == UNSET && mi < missing.len() {
            *slot = missing[mi];
            mi += 1;
        }
    }
    child
}

/// Ring migration: island `i` receives the top chromosomes of island
/// `i - 1` and replaces its worst entries when the migrant is fitter.
fn migrate(islands: &mut [Island], migration_count: usize) {
    let ni = islands.len();
    if ni < 2 {
        return;
    }

    let migrants: Vec<Vec<Chromosome>> = islands
        .iter()
        .map(|isl| {
            isl.pop
                .iter()
                .take(migration_count.min(isl.pop.len()))
                .cloned()
                .collect()
        })
        .collect();

    for i in 0..ni {
        let src = (i + ni - 1) % ni;
        let pop = &mut islands[i].pop;
        for (j, migrant) in migrants[src].iter().enumerate() {
            let Some(worst) = pop.len().checked_sub(1 + j) else {
                break;
            };
            if migrant.fitness > pop[worst].fitness {
                pop[worst] = migrant.clone();
            }
        }
        sort_desc(pop);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Polygon;
    use approx::assert_abs_diff_eq;

    fn rect_part(id: i32, w: f64, h: f64) -> Part {
        let shape = Polygon::from_coords(&[(0.0, 0.0), (w, 0.0), (w, h), (0.0, h)]);
        Part::new(id, format!("p{id}"), shape)
    }

    fn is_permutation(order: &[usize]) -> bool {
        let mut seen = vec![false; order.len()];
        for &v in order {
            if v >= order.len() || seen[v] {
                return false;
            }
            seen[v] = true;
        }
        true
    }

    #[test]
    fn fitness_table() {
        assert_abs_diff_eq!(fitness_from(0, 0, 0.0), 0.0);
        assert_abs_diff_eq!(fitness_from(0, 10, 0.0), 1e-6);
        assert_abs_diff_eq!(fitness_from(5, 10, 0.5), 0.5 * 0.8 + 0.5 * 0.2);
        assert_abs_diff_eq!(fitness_from(10, 10, 0.6), 0.5 + 0.3);
        // Full placement beats any partial placement.
        assert!(fitness_from(10, 10, 0.01) > fitness_from(9, 10, 0.99));
    }

    #[test]
    fn pmx_yields_permutation() {
        let p1: Vec<usize> = vec![0, 1, 2, 3, 4, 5, 6, 7];
        let p2: Vec<usize> = vec![7, 6, 5, 4, 3, 2, 1, 0];
        for (s, e) in [(0, 0), (2, 5), (0, 7), (7, 7), (3, 3)] {
            let child = pmx_crossover(&p1, &p2, s, e);
            assert!(is_permutation(&child), "broken child for [{s}, {e}]");
            assert_eq!(&child[s..=e], &p1[s..=e]);
        }
    }

    #[test]
    fn crossover_keeps_angles_with_parts() {
        let ga = GeneticAlgorithm {
            allowed_angles: vec![0.0, 90.0],
            ..Default::default()
        };
        let p1 = Chromosome {
            order: vec![0, 1, 2, 3],
            angles: vec![90.0, 0.0, 90.0, 0.0],
            fitness: 0.0,
        };
        let p2 = Chromosome {
            order: vec![3, 2, 1, 0],
            angles: vec![0.0, 90.0, 0.0, 90.0],
            fitness: 0.0,
        };
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let child = ga.crossover(&p1, &p2, &mut rng);
            assert!(is_permutation(&child.order));
            assert_eq!(child.angles.len(), child.order.len());
            // Every angle must come from one of the parents' maps for the
            // same part index.
            for (slot, &part) in child.order.iter().enumerate() {
                let a = child.angles[slot];
                let from_p1 = p1.order.iter().position(|&v| v == part).unwrap();
                let from_p2 = p2.order.iter().position(|&v| v == part).unwrap();
                assert!(a == p1.angles[from_p1] || a == p2.angles[from_p2]);
            }
        }
    }

    #[test]
    fn mutation_preserves_permutation() {
        let ga = GeneticAlgorithm {
            allowed_angles: vec![0.0, 90.0, 180.0, 270.0],
            ..Default::default()
        };
        let params = AdaptiveParams {
            mutation_rate: 1.0,
            crossover_rate: 0.9,
        };
        let mut rng = StdRng::seed_from_u64(11);
        let mut c = Chromosome {
            order: (0..12).collect(),
            angles: vec![0.0; 12],
            fitness: 0.0,
        };
        for _ in 0..50 {
            ga.mutate(&mut c, &mut rng, &params);
            assert!(is_permutation(&c.order));
            assert_eq!(c.angles.len(), 12);
            for a in &c.angles {
                assert!(ga.allowed_angles.contains(a));
            }
        }
    }

    #[test]
    fn adaptive_params_move_and_clamp() {
        let mut p = AdaptiveParams::default();
        for _ in 0..100 {
            p.adapt(20);
        }
        assert_abs_diff_eq!(p.mutation_rate, 0.40, epsilon = 1e-12);
        assert_abs_diff_eq!(p.crossover_rate, 0.60, epsilon = 1e-12);

        for _ in 0..200 {
            p.adapt(0);
        }
        assert_abs_diff_eq!(p.mutation_rate, 0.05, epsilon = 1e-12);
        assert_abs_diff_eq!(p.crossover_rate, 0.95, epsilon = 1e-12);

        p.reset();
        assert_abs_diff_eq!(p.mutation_rate, 0.12);
        assert_abs_diff_eq!(p.crossover_rate, 0.85);
    }

    #[test]
    fn seeded_chromosomes_sort_by_area_aspect_perimeter() {
        let parts = vec![
            rect_part(0, 2.0, 2.0),  // area 4, aspect 1, perimeter 4
            rect_part(1, 10.0, 1.0), // area 10, aspect 10, perimeter 11
            rect_part(2, 5.0, 5.0),  // area 25, aspect 1, perimeter 10
        ];
        let ga = GeneticAlgorithm::default();
        let mut rng = StdRng::seed_from_u64(1);
        let pop = ga.init_population(5, &parts, &mut rng);

        assert_eq!(pop[0].order, vec![2, 1, 0]); // by area
        assert_eq!(pop[1].order[0], 1); // most elongated first
        assert_eq!(pop[2].order, vec![1, 2, 0]); // by bbox perimeter
        for c in &pop[..3] {
            assert!(c.angles.iter().all(|&a| a == 0.0));
        }
    }

    #[test]
    fn ga_places_two_squares_fully() {
        let parts = vec![rect_part(0, 10.0, 10.0), rect_part(1, 10.0, 10.0)];
        let template = Sheet::new(30.0, 30.0, 0.0, 0.0);
        let ga = GeneticAlgorithm {
            population_size: 20,
            max_generations: 10,
            island_count: 2,
            allowed_angles: vec![0.0],
            seed: 3,
            ..Default::default()
        };
        let outcome = ga.run(&parts, &template);
        assert_eq!(outcome.best.order.len(), 2);
        assert!(outcome.best.fitness >= 0.5, "both squares should place");
        assert!(!outcome.cache.is_empty());
    }

    #[test]
    fn empty_input_returns_default() {
        let ga = GeneticAlgorithm::default();
        let outcome = ga.run(&[], &Sheet::new(100.0, 100.0, 0.0, 0.0));
        assert!(outcome.best.order.is_empty());
        assert_abs_diff_eq!(outcome.best.fitness, 0.0);
    }
}
