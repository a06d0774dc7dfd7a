use std::cmp::{max, min, Ordering};
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::prelude::*;

use ansi_term::Colour::Yellow;
use rand::Rng;
use scoped_threadpool::Pool;

use mendel::hatchery::Evaluator;
use mendel::params::Params;
use mendel::phylostructs::*;
use mendel::storage;
use mendel::util::*;

/* How much of an individual one edit touches. The engine runs with
 * Random, which collapses to single-line edits at the default
 * max_section_size of 1; Single and Fixed exist so a caller can pin
 * the length.
 */
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SectionMode {
    Single,
    Fixed(usize),
    Random,
}

pub fn section_length<R: Rng> (mode: SectionMode,
                               available: usize,
                               max_section: usize,
                               rng: &mut R) -> usize {
    match mode {
        SectionMode::Single => min(1, max(available, 1)),
        SectionMode::Fixed(k) => min(k, available),
        SectionMode::Random => {
            let cap = min(max_section, available);
            if cap == 0 {
                min(1, available)
            } else {
                1 + rng.gen_range(0, cap)
            }
        },
    }
}

fn fit_of (ind: &Individual) -> f64 {
    ind.fitness.unwrap_or(0.0)
}

fn child_of (parent: &Individual, rep: Vec<Inst>, op: Op) -> Individual {
    let mut ops = vec![op];
    ops.extend(parent.ops.iter().cloned());
    parent.spawn(rep, ops)
}

/* Remove a section starting where the bad weights point. */
pub fn delete<R: Rng> (parent: &Individual,
                       params: &Params,
                       mode: SectionMode,
                       rng: &mut R) -> Individual {
    if parent.is_empty() {
        return child_of(parent, Vec::new(), Op::Delete);
    }
    let start = weighted_place(&parent.rep, WeightKey::Bad, rng);
    let n = section_length(mode, parent.size() - start, params.max_section_size, rng);
    let mut rep = parent.rep.clone();
    rep.drain(start..start + n);
    child_of(parent, rep, Op::Delete)
}

/* Copy a section from where the good weights point and splice it in
 * after where the bad weights point. The source stays put, so the
 * child grows.
 */
pub fn append<R: Rng> (parent: &Individual,
                       params: &Params,
                       mode: SectionMode,
                       rng: &mut R) -> Individual {
    if parent.is_empty() {
        return child_of(parent, Vec::new(), Op::Append);
    }
    let src = weighted_place(&parent.rep, WeightKey::Good, rng);
    let dst = weighted_place(&parent.rep, WeightKey::Bad, rng);
    let n = section_length(mode, parent.size() - src, params.max_section_size, rng);
    let at = dst + 1;
    let mut rep = Vec::with_capacity(parent.size() + n);
    rep.extend(parent.rep[..at].iter().cloned());
    rep.extend(parent.rep[src..src + n].iter().cloned());
    rep.extend(parent.rep[at..].iter().cloned());
    child_of(parent, rep, Op::Append)
}

/* Exchange two sections chosen by the bad weights, keeping whatever
 * lies between them in place. Two draws of the same spot is a no-op
 * apart from the lineage entry.
 */
pub fn swap<R: Rng> (parent: &Individual,
                     params: &Params,
                     mode: SectionMode,
                     rng: &mut R) -> Individual {
    if parent.is_empty() {
        return child_of(parent, Vec::new(), Op::Swap);
    }
    let p1 = weighted_place(&parent.rep, WeightKey::Bad, rng);
    let p2 = weighted_place(&parent.rep, WeightKey::Bad, rng);
    if p1 == p2 {
        return child_of(parent, parent.rep.clone(), Op::Swap);
    }
    let left = min(p1, p2);
    let right = max(p1, p2);
    let left_len = section_length(mode, right - left, params.max_section_size, rng);
    let right_len = section_length(mode, parent.size() - right, params.max_section_size, rng);
    let rep = &parent.rep;
    let mut child = Vec::with_capacity(rep.len());
    child.extend(rep[..left].iter().cloned());
    child.extend(rep[right..right + right_len].iter().cloned());
    child.extend(rep[left + left_len..right].iter().cloned());
    child.extend(rep[left..left + left_len].iter().cloned());
    child.extend(rep[right + right_len..].iter().cloned());
    child_of(parent, child, Op::Swap)
}

pub fn mutate<R: Rng> (parent: &Individual, params: &Params, rng: &mut R) -> Individual {
    match rng.gen_range(0, 3) {
        0 => delete(parent, params, SectionMode::Random, rng),
        1 => append(parent, params, SectionMode::Random, rng),
        _ => swap(parent, params, SectionMode::Random, rng),
    }
}

fn cross_child (mother: &Individual, father: &Individual, rep: Vec<Inst>) -> Individual {
    Individual {
        rep: rep,
        compile: None,
        cached: false,
        fitness: None,
        trials: max(mother.trials, father.trials),
        ops: vec![Op::Crossover(mother.ops.clone(), father.ops.clone())],
        generation: max(mother.generation, father.generation) + 1,
        name: name(4),
    }
}

fn wp_or_zero<R: Rng> (seq: &[Inst], rng: &mut R) -> usize {
    if seq.is_empty() { 0 } else { weighted_place(seq, WeightKey::Bad, rng) }
}

/* One midpoint, drawn on the mother, cuts both parents; a secondary
 * point inside each mother half decides how much of the corresponding
 * father half replaces it.
 */
pub fn crossover_sticky<R: Rng> (mother: &Individual,
                                 father: &Individual,
                                 rng: &mut R) -> Individual {
    if mother.is_empty() {
        return cross_child(mother, father, father.rep.clone());
    }
    if father.is_empty() {
        return cross_child(mother, father, mother.rep.clone());
    }
    let m = weighted_place(&mother.rep, WeightKey::Bad, rng);
    let (ml, mr) = mother.rep.split_at(m);
    let (fl, fr) = father.rep.split_at(min(m, father.size()));
    let m_l = wp_or_zero(ml, rng);
    let m_r = wp_or_zero(mr, rng);
    let mut rep = Vec::new();
    rep.extend(ml[..m_l].iter().cloned());
    rep.extend(fl[min(m_l, fl.len())..].iter().cloned());
    rep.extend(fr[..min(m_r, fr.len())].iter().cloned());
    rep.extend(mr[m_r..].iter().cloned());
    cross_child(mother, father, rep)
}

/* Two-point crossover with the midpoints drawn independently in each
 * parent, and a secondary point inside each of the four halves.
 */
pub fn crossover_normal<R: Rng> (mother: &Individual,
                                 father: &Individual,
                                 rng: &mut R) -> Individual {
    if mother.is_empty() {
        return cross_child(mother, father, father.rep.clone());
    }
    if father.is_empty() {
        return cross_child(mother, father, mother.rep.clone());
    }
    let m_m = weighted_place(&mother.rep, WeightKey::Bad, rng);
    let m_f = weighted_place(&father.rep, WeightKey::Bad, rng);
    let (ml, mr) = mother.rep.split_at(m_m);
    let (fl, fr) = father.rep.split_at(m_f);
    let m_ml = wp_or_zero(ml, rng);
    let m_mr = wp_or_zero(mr, rng);
    let m_fl = wp_or_zero(fl, rng);
    let m_fr = wp_or_zero(fr, rng);
    let mut rep = Vec::new();
    rep.extend(ml[..m_ml].iter().cloned());
    rep.extend(fl[m_fl..].iter().cloned());
    rep.extend(fr[..m_fr].iter().cloned());
    rep.extend(mr[m_mr..].iter().cloned());
    cross_child(mother, father, rep)
}

/* Like the two-point form, but the father's cut points are found by
 * similarity: windows around the mother's secondary points serve as
 * queries, and the father contributes the stretch between the two
 * positions that best resemble them. The second query window deliber-
 * ately starts its search a half-window early so both matches fit.
 */
pub fn crossover_homologous<R: Rng> (mother: &Individual,
                                     father: &Individual,
                                     params: &Params,
                                     table: &mut DistanceTable,
                                     rng: &mut R) -> Individual {
    if mother.is_empty() {
        return cross_child(mother, father, father.rep.clone());
    }
    if father.is_empty() {
        return cross_child(mother, father, mother.rep.clone());
    }
    let m_m = weighted_place(&mother.rep, WeightKey::Bad, rng);
    let (ml, mr) = mother.rep.split_at(m_m);
    let m_ml = wp_or_zero(ml, rng);
    let m_mr = wp_or_zero(mr, rng);
    let radius = params.point_neighborhood;
    let exemplar_l = points_around(ml, m_ml, radius).to_vec();
    let exemplar_r = points_around(ml, m_mr, radius).to_vec();

    let h_l = homologous_place(&father.rep, &exemplar_l, table, rng);
    let r_r = exemplar_r.len().saturating_sub(1) / 2;
    let rem_start = h_l.saturating_sub(r_r);
    let remainder = &father.rep[rem_start..];
    let m_fr = if remainder.is_empty() {
        0
    } else {
        homologous_place(remainder, &exemplar_r, table, rng)
    };
    let end = min(max(rem_start + m_fr, h_l), father.size());

    let mut rep = Vec::new();
    rep.extend(ml[..m_ml].iter().cloned());
    rep.extend(father.rep[h_l..end].iter().cloned());
    rep.extend(mr[m_mr..].iter().cloned());
    cross_child(mother, father, rep)
}

/* Selection. Tournament draws with replacement and keeps the fittest
 * of the sample; the sampling alternative walks one ruler with n
 * equally spaced marks over the cumulative fitness axis, which keeps
 * the variance below spinning the wheel n times.
 */
pub fn tournament<'a, R: Rng> (deme: &'a [Individual],
                               t_size: usize,
                               rng: &mut R) -> &'a Individual {
    let mut best = &deme[place(deme, rng)];
    for _ in 1..max(1, t_size) {
        let challenger = &deme[place(deme, rng)];
        if fit_of(challenger) > fit_of(best) {
            best = challenger;
        }
    }
    best
}

pub fn sus_select<R: Rng> (deme: &[Individual], n: usize, rng: &mut R) -> Vec<Individual> {
    let mut order: Vec<&Individual> = deme.iter().collect();
    order.sort_by(|a, b| fit_of(b).partial_cmp(&fit_of(a)).unwrap_or(Ordering::Equal));
    let total: f64 = order.iter().map(|x| fit_of(x)).sum();
    if total <= 0.0 {
        return (0..n).map(|_| deme[place(deme, rng)].clone()).collect();
    }
    let step = total / n as f64;
    let start = rng.gen_range(0.0, step);
    let mut survivors = Vec::with_capacity(n);
    let mut idx = 0;
    let mut cum = fit_of(order[0]);
    for k in 0..n {
        let mark = start + step * k as f64;
        while mark >= cum && idx + 1 < order.len() {
            idx += 1;
            cum += fit_of(order[idx]);
        }
        survivors.push(order[idx].clone());
    }
    survivors
}

pub fn select<R: Rng> (deme: &[Individual],
                       n: usize,
                       params: &Params,
                       rng: &mut R) -> Vec<Individual> {
    if params.use_tournament {
        (0..n).map(|_| tournament(deme, params.tournament_size, rng).clone())
              .collect()
    } else {
        sus_select(deme, n, rng)
    }
}

/* The generational loop. Sequential on the outside; each batch of
 * children crosses the worker pool in parallel and selection only
 * looks once they have all come back.
 */
pub struct Engine<R: Rng> {
    pub params: Params,
    pub evaluator: Evaluator,
    pub pop: Population,
    pub champion: Option<Individual>,
    baselines: Vec<Individual>,
    table: DistanceTable,
    pool: Pool,
    rng: R,
    logged: bool,
}

impl<R: Rng> Engine<R> {
    pub fn new (params: Params, baselines: Vec<Individual>, rng: R) -> Engine<R> {
        assert!(!baselines.is_empty(), "at least one baseline is required");
        let warm = match params.fitness_cache {
            Some(ref path) => storage::load_cache(path),
            None => HashMap::new(),
        };
        Engine {
            evaluator: Evaluator::with_cache(params.clone(), warm),
            pool: Pool::new(max(1, params.threads) as u32),
            pop: Population::new(),
            champion: None,
            baselines: baselines,
            table: DistanceTable::new(),
            rng: rng,
            logged: false,
            params: params,
        }
    }

    fn evaluate_all (&mut self, inds: &mut [Individual]) {
        let ev = &self.evaluator;
        let pool = &mut self.pool;
        pool.scoped(|scope| {
            for ind in inds.iter_mut() {
                if ind.fitness.is_some() {
                    continue;
                }
                scope.execute(move || ev.evaluate(ind));
            }
        });
    }

    fn generation (&mut self) {
        let popsize = self.params.population_size;
        let n_cross = (self.params.crossover_rate * popsize as f64).round() as usize;
        let n_mut = ((1.0 - self.params.crossover_rate) * popsize as f64).round() as usize;

        let mut children: Vec<Individual> = Vec::with_capacity(n_cross + n_mut);
        for _ in 0..n_cross {
            let parents = select(&self.pop.deme, 2, &self.params, &mut self.rng);
            let child = if self.params.use_homologous {
                crossover_homologous(&parents[0], &parents[1],
                                     &self.params, &mut self.table, &mut self.rng)
            } else {
                crossover_normal(&parents[0], &parents[1], &mut self.rng)
            };
            children.push(child);
        }
        let survivors = select(&self.pop.deme, n_mut, &self.params, &mut self.rng);
        for parent in survivors.iter() {
            children.push(mutate(parent, &self.params, &mut self.rng));
        }

        self.evaluate_all(&mut children);

        /* parents compete with their children for the next deme */
        self.pop.deme.extend(children);
        let next = select(&self.pop.deme, popsize, &self.params, &mut self.rng);
        self.pop.deme = next;
        self.pop.iteration += 1;
    }

    fn update_champion (&mut self) {
        let best = match self.pop.best_idx() {
            Some(i) => self.pop.deme[i].clone(),
            None => return,
        };
        let improved = match self.champion {
            Some(ref c) => fit_of(&best) > fit_of(c),
            None => true,
        };
        if improved {
            println!("[+] new champion {} at fitness {:.4} after {} trials",
                     best.name, fit_of(&best), best.trials);
            self.champion = Some(best);
        }
    }

    fn report (&mut self, gen: usize) {
        let mean_fit = self.pop.mean_fit();
        let (best_fit, best_trials, best_name) = match self.pop.best() {
            Some(b) => (fit_of(b), b.trials, b.name.clone()),
            None => (0.0, 0, "-".to_string()),
        };
        println!("[*] {} GEN {:<4} mean {:<10.4} best {:<10.4} trials {:<6} ({})",
                 Yellow.bold().paint(self.params.label.clone()),
                 gen, mean_fit, best_fit, best_trials, best_name);
        self.logged = self.log_csv(gen, mean_fit, best_fit, best_trials);
    }

    fn log_csv (&self, gen: usize, mean_fit: f64, best_fit: f64, best_trials: usize) -> bool {
        let header = if self.logged {
            "".to_string()
        } else {
            "GENERATION,MEAN-FIT,BEST-FIT,BEST-TRIALS\n".to_string()
        };
        let row = format!("{}{},{},{},{}\n", header, gen, mean_fit, best_fit, best_trials);
        match OpenOptions::new()
                          .append(true)
                          .create(true)
                          .open(&self.params.csv_path) {
            Ok(mut fd) => {
                let _ = fd.write_all(row.as_bytes());
                true
            },
            Err(e) => {
                println!("[X] could not log to {}: {}", self.params.csv_path, e);
                self.logged
            },
        }
    }

    fn checkpoint (&self, gen: usize) {
        let best = match self.pop.best() {
            Some(b) => b,
            None => return,
        };
        let path = format!("{}/variant.gen.{}.best.{}.json",
                           self.params.log_dir, gen, fit_of(best));
        if let Err(e) = storage::save_individual(&path, best) {
            println!("[X] could not write checkpoint {}: {}", path, e);
        }
    }

    pub fn run (&mut self) -> Individual {
        /* the baselines seed the deme; mutated copies fill it out */
        let mut deme: Vec<Individual> = self.baselines.clone();
        deme.truncate(self.params.population_size);
        while deme.len() < self.params.population_size {
            let i = self.rng.gen_range(0, self.baselines.len());
            let child = mutate(&self.baselines[i], &self.params, &mut self.rng);
            deme.push(child);
        }
        self.evaluate_all(&mut deme);
        self.pop.deme = deme;

        let mut gen = 0;
        loop {
            self.update_champion();
            self.report(gen);
            self.checkpoint(gen);

            let reached = self.champion
                              .as_ref()
                              .and_then(|c| c.fitness)
                              .map(|f| f >= self.params.target_fitness)
                              .unwrap_or(false);
            if reached {
                println!("[+] target fitness reached at generation {}", gen);
                break;
            }
            if gen >= self.params.max_generations {
                println!("[X] generation limit reached");
                break;
            }
            gen += 1;
            self.generation();
        }

        if let Some(ref path) = self.params.fitness_cache {
            if let Err(e) = storage::save_cache(path, &self.evaluator.cache_snapshot()) {
                println!("[X] could not save fitness cache: {}", e);
            }
        }

        let best = match self.champion {
            Some(ref c) => c.clone(),
            None => self.baselines[0].clone(),
        };
        let path = format!("{}/best.json", self.params.log_dir);
        if let Err(e) = storage::save_individual(&path, &best) {
            println!("[X] could not save champion: {}", e);
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::env;
    use std::fs;
    use std::io::Write;
    use std::os::unix::fs::PermissionsExt;
    use rand::SeedableRng;
    use rand::isaac::Isaac64Rng;

    fn rng () -> Isaac64Rng {
        Isaac64Rng::from_seed(&[0xdead, 0xbeef][..])
    }

    fn ind (names: &[&str]) -> Individual {
        Individual::from_lines(names.iter()
                                    .map(|s| Line::Raw(s.to_string()))
                                    .collect())
    }

    fn line_set (ind: &Individual) -> HashSet<Line> {
        ind.rep.iter().map(|i| i.line.clone()).collect()
    }

    #[test]
    fn delete_takes_the_weighted_line () {
        let mut x = ind(&["A", "B", "C", "D"]);
        x.rep[2].bad = 1.0;
        let mut r = rng();
        let params = Params::new("t");
        let child = delete(&x, &params, SectionMode::Single, &mut r);
        let lines: Vec<String> = child.rep.iter().map(|i| i.line.emit()).collect();
        assert_eq!(lines, vec!["A", "B", "D"]);
        assert_eq!(child.ops[0], Op::Delete);
        assert_eq!(child.fitness, None);
    }

    #[test]
    fn delete_shrinks_by_section_length () {
        let mut x = ind(&["A", "B", "C", "D", "E"]);
        x.rep[1].bad = 1.0;
        let mut r = rng();
        let params = Params::new("t");
        let child = delete(&x, &params, SectionMode::Fixed(2), &mut r);
        assert_eq!(child.size(), 3);
        let lines: Vec<String> = child.rep.iter().map(|i| i.line.emit()).collect();
        assert_eq!(lines, vec!["A", "D", "E"]);
    }

    #[test]
    fn append_duplicates_the_good_line () {
        let mut x = ind(&["A", "B", "C"]);
        x.rep[0].good = 1.0;
        x.rep[2].bad = 1.0;
        let mut r = rng();
        let params = Params::new("t");
        let child = append(&x, &params, SectionMode::Single, &mut r);
        let lines: Vec<String> = child.rep.iter().map(|i| i.line.emit()).collect();
        assert_eq!(lines, vec!["A", "B", "C", "A"]);
        assert_eq!(child.size(), x.size() + 1);
    }

    #[test]
    fn swap_of_equal_picks_is_identity () {
        let mut x = ind(&["A", "B", "C"]);
        x.rep[1].bad = 1.0; // both draws land on B
        let mut r = rng();
        let params = Params::new("t");
        let child = swap(&x, &params, SectionMode::Single, &mut r);
        assert_eq!(child.rep, x.rep);
        assert_eq!(child.ops[0], Op::Swap);
    }

    #[test]
    fn swap_preserves_length_and_exchanges () {
        let mut x = ind(&["A", "B", "C", "D", "E"]);
        x.rep[1].bad = 1.0;
        x.rep[3].bad = 1.0;
        let params = Params::new("t");
        let mut r = rng();
        for _ in 0..16 {
            let child = swap(&x, &params, SectionMode::Single, &mut r);
            assert_eq!(child.size(), x.size());
            let lines: Vec<String> = child.rep.iter().map(|i| i.line.emit()).collect();
            /* either the picks coincided (identity) or B and D traded places */
            assert!(lines == vec!["A", "B", "C", "D", "E"]
                 || lines == vec!["A", "D", "C", "B", "E"]);
        }
    }

    #[test]
    fn mutation_alphabet_is_inherited () {
        let x = ind(&["A", "B", "C", "D", "E", "F"]);
        let params = Params::new("t");
        let mut r = rng();
        let parent_lines = line_set(&x);
        for _ in 0..64 {
            let child = mutate(&x, &params, &mut r);
            for inst in child.rep.iter() {
                assert!(parent_lines.contains(&inst.line));
            }
        }
    }

    #[test]
    fn crossover_alphabet_is_inherited () {
        let m = ind(&["A", "B", "C", "D"]);
        let f = ind(&["W", "X", "Y", "Z"]);
        let params = Params::new("t");
        let mut table = DistanceTable::new();
        let mut r = rng();
        let mut union = line_set(&m);
        union.extend(line_set(&f));
        for _ in 0..32 {
            for child in vec![crossover_sticky(&m, &f, &mut r),
                              crossover_normal(&m, &f, &mut r),
                              crossover_homologous(&m, &f, &params, &mut table, &mut r)] {
                for inst in child.rep.iter() {
                    assert!(union.contains(&inst.line));
                }
                assert_eq!(child.fitness, None);
                match child.ops[0] {
                    Op::Crossover(_, _) => {},
                    ref op => panic!("unexpected lineage entry {:?}", op),
                }
            }
        }
    }

    #[test]
    fn crossover_with_empty_parent_returns_the_other () {
        let m = ind(&[]);
        let f = ind(&["X", "Y"]);
        let mut r = rng();
        let child = crossover_normal(&m, &f, &mut r);
        assert_eq!(child.rep, f.rep);
        let child = crossover_sticky(&f, &m, &mut r);
        assert_eq!(child.rep, f.rep);
    }

    #[test]
    fn crossover_trials_take_the_max () {
        let mut m = ind(&["A", "B"]);
        let mut f = ind(&["X", "Y"]);
        m.trials = 3;
        f.trials = 9;
        let mut r = rng();
        let child = crossover_normal(&m, &f, &mut r);
        assert_eq!(child.trials, 9);
    }

    #[test]
    fn section_length_modes () {
        let mut r = rng();
        assert_eq!(section_length(SectionMode::Single, 5, 1, &mut r), 1);
        assert_eq!(section_length(SectionMode::Fixed(3), 2, 1, &mut r), 2);
        assert_eq!(section_length(SectionMode::Fixed(3), 8, 1, &mut r), 3);
        /* max_section_size of 1 pins random sections to one line */
        for _ in 0..16 {
            assert_eq!(section_length(SectionMode::Random, 5, 1, &mut r), 1);
        }
        for _ in 0..16 {
            let n = section_length(SectionMode::Random, 5, 3, &mut r);
            assert!(n >= 1 && n <= 3);
        }
    }

    #[test]
    fn tournament_prefers_fitness () {
        let mut deme = vec![ind(&["A"]), ind(&["B"]), ind(&["C"])];
        deme[0].fitness = Some(1.0);
        deme[1].fitness = Some(5.0);
        deme[2].fitness = Some(3.0);
        let mut r = rng();
        /* a tournament this much larger than the deme has seen everyone */
        for _ in 0..4 {
            let picked = tournament(&deme, 200, &mut r);
            assert_eq!(picked.fitness, Some(5.0));
        }
    }

    #[test]
    fn sus_returns_exactly_n () {
        let mut deme = vec![ind(&["A"]), ind(&["B"]), ind(&["C"]), ind(&["D"])];
        for (i, x) in deme.iter_mut().enumerate() {
            x.fitness = Some(i as f64 + 1.0);
        }
        let mut r = rng();
        for n in 1..9 {
            let survivors = sus_select(&deme, n, &mut r);
            assert_eq!(survivors.len(), n);
        }
        /* with one mark per unit of fitness, the fittest must appear */
        let survivors = sus_select(&deme, 10, &mut r);
        assert!(survivors.iter().any(|s| s.fitness == Some(4.0)));
    }

    #[test]
    fn sus_zero_mass_degrades_to_uniform () {
        let deme = vec![ind(&["A"]), ind(&["B"])];
        let mut r = rng();
        let survivors = sus_select(&deme, 6, &mut r);
        assert_eq!(survivors.len(), 6);
    }

    /* A whole run against a scripted toolchain: the "compiler" copies
     * its input and the oracles print fixed line counts.
     */
    #[test]
    fn engine_smoke_run () {
        let dir = env::temp_dir().join("mendel_engine_smoke");
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        let script = |name: &str, body: &str| -> String {
            let path = dir.join(name);
            {
                let mut fd = fs::File::create(&path).unwrap();
                fd.write_all(body.as_bytes()).unwrap();
            }
            let mut perms = fs::metadata(&path).unwrap().permissions();
            perms.set_mode(0o755);
            fs::set_permissions(&path, perms).unwrap();
            path.to_string_lossy().into_owned()
        };

        let mut params = Params::new("smoke");
        params.test_dir = dir.join("scratch").to_string_lossy().into_owned();
        params.log_dir = dir.to_string_lossy().into_owned();
        params.csv_path = dir.join("smoke.csv").to_string_lossy().into_owned();
        params.compiler = script("cc.sh", "#!/bin/sh\ncp \"$3\" \"$2\"\n");
        params.test_good = script("good.sh", "#!/bin/sh\nprintf '1\\n2\\n' > \"$2\"\n");
        params.test_bad = script("bad.sh", "#!/bin/sh\nprintf '1\\n' > \"$2\"\n");
        params.population_size = 4;
        params.max_generations = 2;
        params.target_fitness = 9999.0; // unreachable, so every generation runs
        params.threads = 2;
        params.crossover_rate = 0.5;

        let baseline = ind(&["one", "two", "three", "four"]);
        let mut engine = Engine::new(params, vec![baseline], rng());
        let best = engine.run();

        /* 2 good lines * 1 + 1 bad line * 5 */
        assert_eq!(best.fitness, Some(7.0));
        assert!(dir.join("best.json").exists());
        assert!(dir.join("smoke.csv").exists());
        let checkpoints = fs::read_dir(&dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name()
                         .to_string_lossy()
                         .starts_with("variant.gen."))
            .count();
        assert!(checkpoints >= 2);
    }
}
