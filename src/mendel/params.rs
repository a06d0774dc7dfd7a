use std::env;
use std::fmt::{Display, Formatter, Result};
use std::fs::DirBuilder;

use chrono::prelude::*;

/* Every knob the engine reads lives here, so that a run can be
 * reconstructed from the dump printed at boot.
 */
#[derive(PartialEq, Debug, Clone)]
pub struct Params {
    pub bad_mult         : f64,
    pub bad_trace        : Option<String>,
    pub baseline_path    : String,
    pub compiler         : String,
    pub compiler_flags   : Option<Vec<String>>,
    pub crossover_rate   : f64,
    pub csv_path         : String,
    pub date_dir         : String,
    pub fitness_cache    : Option<String>,
    pub good_mult        : f64,
    pub good_trace       : Option<String>,
    pub label            : String,
    pub log_dir          : String,
    pub max_generations  : usize,
    pub max_section_size : usize,
    pub point_neighborhood : usize,
    pub population_size  : usize,
    pub seed             : Option<u64>,
    pub target_fitness   : f64,
    pub test_bad         : String,
    pub test_dir         : String,
    pub test_good        : String,
    pub test_timeout     : u64, // milliseconds
    pub threads          : usize,
    pub timestamp        : String,
    pub tournament_size  : usize,
    pub use_homologous   : bool,
    pub use_tournament   : bool,
}

impl Params {
    pub fn new (label: &str) -> Params {
        let t = Local::now();
        let datepath  = t.format("%y/%m/%d").to_string();
        let timestamp = t.format("%H-%M-%S").to_string();
        Params {
            bad_mult:         5.0,
            bad_trace:        None,
            baseline_path:    "".to_string(),
            compiler:         "gcc".to_string(),
            compiler_flags:   None,
            crossover_rate:   0.1,
            csv_path:         format!("{}.csv", &label),
            date_dir:         datepath.clone(),
            fitness_cache:    None,
            good_mult:        1.0,
            good_trace:       None,
            label:            label.to_string(),
            log_dir:          ".".to_string(),
            max_generations:  10,
            max_section_size: 1,
            point_neighborhood: 4,
            population_size:  40,
            seed:             None,
            target_fitness:   10.0,
            test_bad:         "".to_string(),
            test_dir:         env::temp_dir()
                                  .join("mendel")
                                  .to_string_lossy()
                                  .into_owned(),
            test_good:        "".to_string(),
            test_timeout:     2000,
            threads:          4,
            timestamp:        timestamp.clone(),
            tournament_size:  3,
            use_homologous:   false,
            use_tournament:   false,
        }
    }

    pub fn set_log_dir (&mut self, dir: &str) {
        let ddir = format!("{}/{}/{}",
                           dir,
                           self.date_dir,
                           self.label);
        DirBuilder::new()
                   .recursive(true)
                   .create(&ddir)
                   .expect("Could not create log directory");
        self.csv_path = format!("{}/{}.csv", ddir, self.label);
        self.log_dir  = ddir;
    }
}

impl Display for Params {
    fn fmt (&self, f: &mut Formatter) -> Result {
        let mut s = String::new();
        let rem = "% ";

        s.push_str(&format!("{} label: {}\n", rem, self.label));
        s.push_str(&format!("{} baseline_path: {}\n", rem, self.baseline_path));
        s.push_str(&format!("{} compiler: {}\n", rem, self.compiler));
        s.push_str(&format!("{} compiler_flags: {:?}\n", rem, self.compiler_flags));
        s.push_str(&format!("{} test_good: {}\n", rem, self.test_good));
        s.push_str(&format!("{} test_bad: {}\n", rem, self.test_bad));
        s.push_str(&format!("{} good_mult: {}\n", rem, self.good_mult));
        s.push_str(&format!("{} bad_mult: {}\n", rem, self.bad_mult));
        s.push_str(&format!("{} good_trace: {:?}\n", rem, self.good_trace));
        s.push_str(&format!("{} bad_trace: {:?}\n", rem, self.bad_trace));
        s.push_str(&format!("{} test_timeout: {} ms\n", rem, self.test_timeout));
        s.push_str(&format!("{} test_dir: {}\n", rem, self.test_dir));
        s.push_str(&format!("{} target_fitness: {}\n", rem, self.target_fitness));
        s.push_str(&format!("{} max_generations: {}\n", rem, self.max_generations));
        s.push_str(&format!("{} population_size: {}\n", rem, self.population_size));
        s.push_str(&format!("{} crossover_rate: {}\n", rem, self.crossover_rate));
        s.push_str(&format!("{} max_section_size: {}\n", rem, self.max_section_size));
        s.push_str(&format!("{} point_neighborhood: {}\n", rem, self.point_neighborhood));
        s.push_str(&format!("{} use_tournament: {}\n", rem, self.use_tournament));
        s.push_str(&format!("{} tournament_size: {}\n", rem, self.tournament_size));
        s.push_str(&format!("{} use_homologous: {}\n", rem, self.use_homologous));
        s.push_str(&format!("{} fitness_cache: {:?}\n", rem, self.fitness_cache));
        s.push_str(&format!("{} threads: {}\n", rem, self.threads));
        s.push_str(&format!("{} seed: {:?}\n", rem, self.seed));

        write!(f, "{}", s)
    }
}
