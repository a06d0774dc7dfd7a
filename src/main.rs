extern crate ansi_term;
extern crate chrono;
extern crate getopts;
extern crate rand;
extern crate regex;
extern crate rustc_serialize;
extern crate scoped_threadpool;

use std::env;
use std::process::exit;

use ansi_term::Colour::*;
use getopts::Options;
use rand::{thread_rng, Rng, SeedableRng};
use rand::isaac::Isaac64Rng;

mod mendel;

use mendel::evolve::*;
use mendel::params::*;
use mendel::phylostructs::*;
use mendel::trace::*;

fn print_usage (program: &str, opts: Options) {
    let brief = format!("Usage: {} [options]", program);
    print!("{}", opts.usage(&brief));
}

fn main () {
    let args: Vec<String> = env::args().collect();
    let program = args[0].clone();

    let mut opts = Options::new();
    opts.optflag("h", "help", "print this help menu");
    opts.optflag("U", "tournament", "select by tournament instead of universal sampling");
    opts.optflag("H", "homologous", "use homologous crossover");

    opts.optopt("b", "baseline", "assembly source to repair", "<path>");
    opts.optopt("G", "test_good", "oracle script scoring desired behavior", "<path>");
    opts.optopt("B", "test_bad", "oracle script scoring the defect", "<path>");
    opts.optopt("y", "good_trace", "execution trace of the passing run", "<path>");
    opts.optopt("z", "bad_trace", "execution trace of the failing run", "<path>");
    opts.optopt("c", "compiler", "compiler binary (default gcc)", "<name>");
    opts.optopt("F", "compiler_flags", "comma-separated flags for the compiler", "<flags>");
    opts.optopt("M", "good_mult", "weight on the good oracle's line count", "<float>");
    opts.optopt("N", "bad_mult", "weight on the bad oracle's line count", "<float>");
    opts.optopt("g", "goal", "target fitness", "<float>");
    opts.optopt("i", "generations", "maximum number of generations", "<integer>");
    opts.optopt("P", "population", "population size", "<positive integer>");
    opts.optopt("T", "tsize", "tournament size", "<positive integer>");
    opts.optopt("x", "crossover", "crossover (vs. mutation) rate", "<float between 0.0 and 1.0>");
    opts.optopt("s", "section", "maximum section size for one edit", "<positive integer>");
    opts.optopt("r", "radius", "neighborhood radius for homologous matching", "<integer>");
    opts.optopt("m", "timeout", "oracle timeout in milliseconds", "<integer>");
    opts.optopt("d", "scratch", "scratch directory for compile artifacts", "<directory>");
    opts.optopt("f", "fitness_cache", "fitness cache file to load and save", "<path>");
    opts.optopt("t", "threads", "number of evaluator threads", "<positive integer>");
    opts.optopt("L", "label", "label for this trial", "<string>");
    opts.optopt("o", "logs", "log directory", "<directory>");
    opts.optopt("S", "seed", "seed for the random number generator", "<integer>");

    let matches = match opts.parse(&args[1..]) {
        Ok(m) => m,
        Err(f) => panic!("{}", f.to_string()),
    };
    if matches.opt_present("h") {
        print_usage(&program, opts);
        return;
    }

    let label = match matches.opt_str("L") {
        None => "mendel".to_string(),
        Some(s) => s,
    };
    let mut params = Params::new(&label);

    let baseline_path = match matches.opt_str("b") {
        None => {
            print_usage(&program, opts);
            return;
        },
        Some(p) => p,
    };
    params.baseline_path = baseline_path.clone();

    params.test_good = match matches.opt_str("G") {
        None => {
            println!("[X] a good-behavior oracle is required (-G)");
            exit(1);
        },
        Some(p) => p,
    };
    params.test_bad = match matches.opt_str("B") {
        None => {
            println!("[X] a defect oracle is required (-B)");
            exit(1);
        },
        Some(p) => p,
    };
    params.good_trace = matches.opt_str("y");
    params.bad_trace = matches.opt_str("z");
    if let Some(c) = matches.opt_str("c") {
        params.compiler = c;
    }
    params.compiler_flags = matches.opt_str("F")
        .map(|s| s.split(',')
                  .map(|x| x.to_string())
                  .collect::<Vec<String>>());
    if let Some(n) = matches.opt_str("M") {
        params.good_mult = n.parse::<f64>().expect("Failed to parse good_mult");
    }
    if let Some(n) = matches.opt_str("N") {
        params.bad_mult = n.parse::<f64>().expect("Failed to parse bad_mult");
    }
    if let Some(n) = matches.opt_str("g") {
        params.target_fitness = n.parse::<f64>().expect("Failed to parse fitness goal");
    }
    if let Some(n) = matches.opt_str("i") {
        params.max_generations = n.parse::<usize>().expect("Failed to parse generations");
    }
    if let Some(n) = matches.opt_str("P") {
        params.population_size = n.parse::<usize>().expect("Failed to parse population size");
    }
    if let Some(n) = matches.opt_str("T") {
        params.tournament_size = n.parse::<usize>().expect("Failed to parse tournament size");
    }
    if let Some(n) = matches.opt_str("x") {
        params.crossover_rate = n.parse::<f64>().expect("Failed to parse crossover rate");
    }
    if let Some(n) = matches.opt_str("s") {
        params.max_section_size = n.parse::<usize>().expect("Failed to parse section size");
    }
    if let Some(n) = matches.opt_str("r") {
        params.point_neighborhood = n.parse::<usize>().expect("Failed to parse radius");
    }
    if let Some(n) = matches.opt_str("m") {
        params.test_timeout = n.parse::<u64>().expect("Failed to parse timeout");
    }
    if let Some(d) = matches.opt_str("d") {
        params.test_dir = d;
    }
    params.fitness_cache = matches.opt_str("f");
    if let Some(n) = matches.opt_str("t") {
        params.threads = n.parse::<usize>().expect("Failed to parse thread count");
    }
    params.use_tournament = matches.opt_present("U");
    params.use_homologous = matches.opt_present("H");
    params.seed = matches.opt_str("S")
        .map(|n| n.parse::<u64>().expect("Failed to parse seed"));

    let log_dir = match matches.opt_str("o") {
        None => "./logs".to_string(),
        Some(p) => p,
    };
    params.set_log_dir(&log_dir);

    println!("PARAMETERS:\n{}", params);

    let lines = match read_asm(&baseline_path) {
        Ok(lines) => lines,
        Err(e) => {
            println!("[X] could not read {}: {}", baseline_path, e);
            exit(1);
        },
    };
    let mut baseline = Individual::from_lines(lines);
    println!("[*] read {} instructions from {}",
             baseline.size(), baseline_path);

    /* Bad-run mass lands where edits should concentrate; good-run mass
     * minus anything the bad run touched marks what is worth copying.
     */
    let good_hist = match params.good_trace {
        Some(ref p) => match read_path(p) {
            Ok(h) => h,
            Err(e) => {
                println!("[X] could not read good trace {}: {}", p, e);
                exit(1);
            },
        },
        None => Default::default(),
    };
    let bad_hist = match params.bad_trace {
        Some(ref p) => match read_path(p) {
            Ok(h) => h,
            Err(e) => {
                println!("[X] could not read bad trace {}: {}", p, e);
                exit(1);
            },
        },
        None => Default::default(),
    };
    apply_path(&mut baseline, WeightKey::Good,
               &smooth(&difference(&good_hist, &bad_hist)));
    apply_path(&mut baseline, WeightKey::Bad, &smooth(&bad_hist));
    println!("[*] traced {} good / {} bad instruction sites",
             good_hist.len(), bad_hist.len());

    let seed = match params.seed {
        Some(s) => s,
        None => thread_rng().gen::<u64>(),
    };
    println!("[*] rng seed: {}", seed);
    let rng = Isaac64Rng::from_seed(&[seed][..]);

    let mut engine = Engine::new(params.clone(), vec![baseline], rng);
    let best = engine.run();

    println!("\n-=-=-=-=- CHAMPION -=-=-=-=-\n{}", &best);
    let repaired = format!("{}/best.s", params.log_dir);
    match write_asm(&repaired, &best.rep) {
        Ok(_) => println!("[+] repaired source written to {}", repaired),
        Err(e) => println!("[X] could not write {}: {}", repaired, e),
    }
    println!("{} finished at {} with best fitness {:?}",
             Red.bold().paint(label.clone()),
             chrono::Local::now().format("%H:%M:%S"),
             best.fitness);
    println!("[*] logged at {}", params.csv_path);
}
