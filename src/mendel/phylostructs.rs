use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::fs::File;
use std::hash::{Hash, Hasher};
use std::io;
use std::io::prelude::*;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use rand;
use rand::Rng;
use regex::Regex;

use mendel::statistics::*;

/* An assembly line is either carried verbatim (labels, directives,
 * comments) or split into its two tab-delimited fields, which is the
 * shape assemblers emit for actual instructions. Equality and hashing
 * are structural; the weights live outside this enum so that two
 * individuals with the same text hash alike no matter what their
 * traces said.
 */
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Line {
    Raw(String),
    Tabbed(String, String),
}

impl Line {
    pub fn emit (&self) -> String {
        match *self {
            Line::Raw(ref s) => s.clone(),
            Line::Tabbed(ref a, ref b) => format!("\t{}\t{}", a, b),
        }
    }
}

impl Display for Line {
    fn fmt (&self, f: &mut Formatter) -> FmtResult {
        write!(f, "{}", self.emit())
    }
}

/* Which of the two trace-derived weights a picker should read. Bad
 * weight marks lines implicated in the defect (edit here); good weight
 * marks lines implicated in correct runs (copy from here).
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeightKey {
    Good,
    Bad,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Inst {
    pub line: Line,
    pub good: f64,
    pub bad:  f64,
}

impl Inst {
    pub fn new (line: Line) -> Inst {
        Inst { line: line, good: 0.0, bad: 0.0 }
    }

    pub fn weight (&self, key: WeightKey) -> f64 {
        match key {
            WeightKey::Good => self.good,
            WeightKey::Bad  => self.bad,
        }
    }

    pub fn set_weight (&mut self, key: WeightKey, w: f64) {
        match key {
            WeightKey::Good => self.good = w,
            WeightKey::Bad  => self.bad  = w,
        }
    }
}

/* Lineage marker. Prepended by each variation operator, never read by
 * selection; it exists so a champion can be audited after the run.
 */
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    Delete,
    Append,
    Swap,
    Crossover(Vec<Op>, Vec<Op>),
}

#[derive(Debug, Clone)]
pub struct Individual {
    pub rep:        Vec<Inst>,
    pub compile:    Option<PathBuf>,
    pub cached:     bool, // fitness reused from the cache; do not recompile
    pub fitness:    Option<f64>,
    pub trials:     usize,
    pub ops:        Vec<Op>,
    pub generation: u32,
    pub name:       String,
}

impl Individual {
    pub fn from_lines (lines: Vec<Line>) -> Individual {
        Individual {
            rep: lines.into_iter().map(Inst::new).collect(),
            compile: None,
            cached: false,
            fitness: None,
            trials: 0,
            ops: Vec::new(),
            generation: 0,
            name: name(4),
        }
    }

    /* A child starts from its parent's instructions with all of the
     * evaluation state cleared.
     */
    pub fn spawn (&self, rep: Vec<Inst>, ops: Vec<Op>) -> Individual {
        Individual {
            rep: rep,
            compile: None,
            cached: false,
            fitness: None,
            trials: self.trials,
            ops: ops,
            generation: self.generation + 1,
            name: name(4),
        }
    }

    pub fn size (&self) -> usize {
        self.rep.len()
    }

    pub fn is_empty (&self) -> bool {
        self.rep.is_empty()
    }

    pub fn source (&self) -> String {
        source_of(&self.rep)
    }

    pub fn lineage_depth (&self) -> usize {
        fn depth (ops: &[Op]) -> usize {
            ops.iter()
               .map(|op| match *op {
                   Op::Crossover(ref m, ref f) => 1 + depth(m).max(depth(f)),
                   _ => 1,
               })
               .sum()
        }
        depth(&self.ops)
    }
}

impl Display for Individual {
    fn fmt (&self, f: &mut Formatter) -> FmtResult {
        let mut s = String::new();
        s.push_str("==================================================\n");
        s.push_str(&format!("Synopsis of variant {}\n", self.name));
        s.push_str("==================================================\n");
        s.push_str(&format!("Fitness:    {:?}\n", self.fitness));
        s.push_str(&format!("Trials:     {}\n", self.trials));
        s.push_str(&format!("Generation: {}\n", self.generation));
        s.push_str(&format!("Length:     {} instructions\n", self.size()));
        s.push_str(&format!("Edits:      {}\n", self.lineage_depth()));
        s.push_str("==================================================\n");
        write!(f, "{}", s)
    }
}

/* Pronounceable log tags, because hashes make for miserable reading.
 * Open syllables drawn from a small syllabary, grouped in pairs; the
 * tag never feeds back into the evolution.
 */
pub fn name (syllables: usize) -> String {
    let mut rng = rand::thread_rng();
    let onsets = ["br", "dr", "gl", "kr", "pl", "sk", "tr", "vr",
                  "b", "d", "f", "g", "l", "m", "n", "p", "r", "s", "t", "z"];
    let nuclei = ["a", "e", "i", "o", "u", "ae", "ei", "io", "ou", "ua"];
    let mut s = String::new();

    for i in 0..syllables {
        if i > 0 && i % 2 == 0 {
            s.push('-');
        }
        s.push_str(onsets[rng.gen::<usize>() % onsets.len()]);
        s.push_str(nuclei[rng.gen::<usize>() % nuclei.len()]);
    }

    s
}

/* The cache key is the instruction text alone. Weights and lineage are
 * invisible to it.
 */
pub fn rep_hash (rep: &[Inst]) -> u64 {
    let mut h = DefaultHasher::new();
    for inst in rep {
        inst.line.hash(&mut h);
    }
    h.finish()
}

/* Copy a trace-derived weight map onto an individual. Indices past the
 * end of the representation are dropped without comment.
 */
pub fn apply_path (ind: &mut Individual, key: WeightKey, map: &HashMap<usize, f64>) {
    for (&i, &w) in map.iter() {
        if i < ind.rep.len() {
            ind.rep[i].set_weight(key, w);
        }
    }
}

pub fn parse_source (text: &str) -> Vec<Line> {
    let re = Regex::new(r"^\t([^\t]+)\t(.*)$").unwrap();
    text.lines()
        .map(|row| match re.captures(row) {
            Some(cap) => Line::Tabbed(cap[1].to_string(), cap[2].to_string()),
            None      => Line::Raw(row.to_string()),
        })
        .collect()
}

pub fn source_of (rep: &[Inst]) -> String {
    let mut s = String::new();
    for inst in rep {
        s.push_str(&inst.line.emit());
        s.push('\n');
    }
    s
}

pub fn read_asm<P: AsRef<Path>> (path: P) -> io::Result<Vec<Line>> {
    let fd = File::open(path)?;
    let mut text = String::new();
    BufReader::new(fd).read_to_string(&mut text)?;
    Ok(parse_source(&text))
}

pub fn write_asm<P: AsRef<Path>> (path: P, rep: &[Inst]) -> io::Result<()> {
    let mut fd = File::create(path)?;
    fd.write_all(source_of(rep).as_bytes())?;
    fd.flush()
}

pub struct Population {
    pub deme: Vec<Individual>,
    pub iteration: usize,
}

impl Population {
    pub fn new () -> Population {
        Population { deme: Vec::new(), iteration: 0 }
    }

    pub fn size (&self) -> usize {
        self.deme.len()
    }

    pub fn mean_fit (&self) -> f64 {
        mean(&self.deme
                  .iter()
                  .filter_map(|ind| ind.fitness)
                  .collect::<Vec<f64>>())
    }

    pub fn best_idx (&self) -> Option<usize> {
        let mut best: Option<usize> = None;
        for (i, ind) in self.deme.iter().enumerate() {
            let f = match ind.fitness {
                Some(f) => f,
                None    => continue,
            };
            match best {
                Some(b) if self.deme[b].fitness.unwrap_or(0.0) >= f => {},
                _ => best = Some(i),
            }
        }
        best
    }

    pub fn best (&self) -> Option<&Individual> {
        self.best_idx().map(|i| &self.deme[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw (s: &str) -> Inst {
        Inst::new(Line::Raw(s.to_string()))
    }

    #[test]
    fn round_trip_is_byte_identical () {
        let text = "main:\n\tpushl\t%ebp\n\tmovl\t%esp, %ebp\n.LC0:\n\t.string\t\"hi\"\n";
        let rep: Vec<Inst> = parse_source(text)
            .into_iter()
            .map(Inst::new)
            .collect();
        assert_eq!(source_of(&rep), text);
    }

    #[test]
    fn tab_lines_become_pairs () {
        let lines = parse_source("\tmovl\t%esp, %ebp\nlabel:\n");
        assert_eq!(lines[0],
                   Line::Tabbed("movl".to_string(), "%esp, %ebp".to_string()));
        assert_eq!(lines[1], Line::Raw("label:".to_string()));
    }

    #[test]
    fn rep_hash_ignores_weights () {
        let mut a = vec![raw("one"), raw("two")];
        let b = vec![raw("one"), raw("two")];
        a[0].bad = 9.0;
        a[1].good = 3.0;
        assert_eq!(rep_hash(&a), rep_hash(&b));
        let c = vec![raw("one"), raw("three")];
        assert!(rep_hash(&a) != rep_hash(&c));
    }

    #[test]
    fn apply_path_skips_out_of_range () {
        let mut ind = Individual::from_lines(vec![
            Line::Raw("a".to_string()),
            Line::Raw("b".to_string()),
        ]);
        let mut map = HashMap::new();
        map.insert(0, 1.5);
        map.insert(7, 2.5);
        apply_path(&mut ind, WeightKey::Bad, &map);
        assert_eq!(ind.rep[0].bad, 1.5);
        assert_eq!(ind.rep[1].bad, 0.0);
    }

    #[test]
    fn spawn_clears_evaluation_state () {
        let mut parent = Individual::from_lines(vec![Line::Raw("x".to_string())]);
        parent.fitness = Some(4.0);
        parent.trials = 11;
        let child = parent.spawn(parent.rep.clone(), vec![Op::Delete]);
        assert_eq!(child.fitness, None);
        assert_eq!(child.compile, None);
        assert!(!child.cached);
        assert_eq!(child.trials, 11);
        assert_eq!(child.generation, 1);
    }
}
