use std::collections::HashMap;
use std::fs;
use std::fs::File;
use std::io::prelude::*;
use std::io::BufReader;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process;
use std::process::{Command, Stdio};
use std::sync::{Arc, RwLock};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::sleep;
use std::time::{Duration, Instant};

use mendel::params::Params;
use mendel::phylostructs::{rep_hash, write_asm, Individual};

/* Where variants go to earn a fitness score. A variant is written out
 * as assembly, compiled with the operator's toolchain, and handed to
 * the two oracle scripts; its score is the weighted sum of the line
 * counts they emit. Everything that can go wrong in here scores the
 * variant low instead of taking the run down.
 *
 * The cache and the trial counter are the only state shared between
 * worker threads, and both come in as injected cells so a test can
 * build a fresh evaluator around scripted toolchains.
 */
pub struct Evaluator {
    pub params: Params,
    pub fitness_cache: Arc<RwLock<HashMap<u64, f64>>>,
    pub fitness_count: Arc<AtomicUsize>,
    serial: AtomicUsize,
}

impl Evaluator {
    pub fn new (params: Params) -> Evaluator {
        Evaluator::with_cache(params, HashMap::new())
    }

    pub fn with_cache (params: Params, warm: HashMap<u64, f64>) -> Evaluator {
        Evaluator {
            params: params,
            fitness_cache: Arc::new(RwLock::new(warm)),
            fitness_count: Arc::new(AtomicUsize::new(0)),
            serial: AtomicUsize::new(0),
        }
    }

    pub fn trials_so_far (&self) -> usize {
        self.fitness_count.load(Ordering::SeqCst)
    }

    pub fn cache_snapshot (&self) -> HashMap<u64, f64> {
        match self.fitness_cache.read() {
            Ok(c) => c.clone(),
            Err(_) => HashMap::new(),
        }
    }

    /* One call, one tick of the trial counter, cache hit or not. */
    pub fn evaluate (&self, ind: &mut Individual) {
        let trial = self.fitness_count.fetch_add(1, Ordering::SeqCst) + 1;
        let key = rep_hash(&ind.rep);

        let hit = match self.fitness_cache.read() {
            Ok(cache) => cache.get(&key).cloned(),
            Err(_) => None,
        };
        if let Some(fit) = hit {
            ind.fitness = Some(fit);
            ind.cached = true;
            ind.trials = trial;
            return;
        }

        let fit = match self.compile(ind) {
            Some(bin) => {
                let good = self.run_oracle(&self.params.test_good,
                                           &bin,
                                           self.params.good_mult);
                let bad = self.run_oracle(&self.params.test_bad,
                                          &bin,
                                          self.params.bad_mult);
                good + bad
            },
            None => 0.0,
        };

        if let Ok(mut cache) = self.fitness_cache.write() {
            cache.insert(key, fit);
        }
        ind.fitness = Some(fit);
        ind.trials = trial;
    }

    fn scratch (&self) -> PathBuf {
        let dir = PathBuf::from(&self.params.test_dir);
        let _ = fs::create_dir_all(&dir);
        dir
    }

    fn next_serial (&self) -> usize {
        self.serial.fetch_add(1, Ordering::SeqCst)
    }

    /* The source temp file is always removed; a binary survives only
     * if the compiler succeeded on it.
     */
    fn compile (&self, ind: &mut Individual) -> Option<PathBuf> {
        let dir = self.scratch();
        let serial = self.next_serial();
        let src = dir.join(format!("variant_{}_{}.s", process::id(), serial));
        let bin = dir.join(format!("variant_{}_{}.bin", process::id(), serial));

        if write_asm(&src, &ind.rep).is_err() {
            let _ = fs::remove_file(&src);
            ind.compile = None;
            return None;
        }

        let mut cmd = Command::new(&self.params.compiler);
        if let Some(ref flags) = self.params.compiler_flags {
            cmd.args(flags);
        }
        let status = cmd.arg("-o")
                        .arg(&bin)
                        .arg(&src)
                        .stdout(Stdio::null())
                        .stderr(Stdio::null())
                        .status();
        let _ = fs::remove_file(&src);

        match status {
            Ok(ref s) if s.success() => {
                if let Ok(meta) = fs::metadata(&bin) {
                    let mut perms = meta.permissions();
                    perms.set_mode(0o755);
                    let _ = fs::set_permissions(&bin, perms);
                }
                ind.compile = Some(bin.clone());
                Some(bin)
            },
            _ => {
                if bin.exists() {
                    let _ = fs::remove_file(&bin);
                }
                ind.compile = None;
                None
            },
        }
    }

    /* `script binary outfile`, bounded by the wall clock. The score is
     * the output file's line count times the oracle's multiplier; a
     * timeout, spawn failure, or unhappy exit all score zero without
     * disturbing the other oracle.
     */
    fn run_oracle (&self, script: &str, binary: &Path, mult: f64) -> f64 {
        let dir = self.scratch();
        let out = dir.join(format!("oracle_{}_{}.out",
                                   process::id(),
                                   self.next_serial()));

        let child = Command::new(script)
                            .arg(binary)
                            .arg(&out)
                            .stdout(Stdio::null())
                            .stderr(Stdio::null())
                            .spawn();
        let mut child = match child {
            Ok(c) => c,
            Err(_) => {
                let _ = fs::remove_file(&out);
                return 0.0;
            },
        };

        let deadline = Instant::now()
            + Duration::from_millis(self.params.test_timeout);
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break Some(status),
                Ok(None) => {
                    if Instant::now() >= deadline {
                        let _ = child.kill();
                        let _ = child.wait();
                        break None;
                    }
                    sleep(Duration::from_millis(10));
                },
                Err(_) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    break None;
                },
            }
        };

        let score = match status {
            Some(ref s) if s.success() => {
                let count = match File::open(&out) {
                    Ok(fd) => BufReader::new(fd).lines().count(),
                    Err(_) => 0,
                };
                count as f64 * mult
            },
            _ => 0.0,
        };
        let _ = fs::remove_file(&out);
        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::fs;
    use std::io::Write;
    use mendel::params::Params;
    use mendel::phylostructs::{Individual, Line};

    fn script (dir: &Path, name: &str, body: &str) -> String {
        let path = dir.join(name);
        {
            let mut fd = fs::File::create(&path).unwrap();
            fd.write_all(body.as_bytes()).unwrap();
        }
        let mut perms = fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).unwrap();
        path.to_string_lossy().into_owned()
    }

    fn test_params (tag: &str) -> (Params, PathBuf) {
        let dir = env::temp_dir().join(format!("mendel_hatchery_{}", tag));
        fs::create_dir_all(&dir).unwrap();
        let mut params = Params::new(tag);
        params.test_dir = dir.to_string_lossy().into_owned();
        /* a "compiler" that just copies the source to the output slot */
        params.compiler = script(&dir, "cc.sh", "#!/bin/sh\ncp \"$3\" \"$2\"\n");
        params.test_good = script(&dir, "good.sh",
                                  "#!/bin/sh\nprintf 'a\\nb\\nc\\n' > \"$2\"\n");
        params.test_bad = script(&dir, "bad.sh",
                                 "#!/bin/sh\nprintf 'x\\ny\\n' > \"$2\"\n");
        params.good_mult = 1.0;
        params.bad_mult = 5.0;
        params.test_timeout = 2000;
        (params, dir)
    }

    fn variant () -> Individual {
        Individual::from_lines(vec![
            Line::Raw("start:".to_string()),
            Line::Tabbed("nop".to_string(), "".to_string()),
        ])
    }

    #[test]
    fn oracle_line_counts_are_weighted () {
        let (params, _dir) = test_params("weighted");
        let ev = Evaluator::new(params);
        let mut ind = variant();
        ev.evaluate(&mut ind);
        /* 3 good lines * 1 + 2 bad lines * 5 */
        assert_eq!(ind.fitness, Some(13.0));
        assert_eq!(ind.trials, 1);
        assert!(ind.compile.is_some());
        assert!(!ind.cached);
    }

    #[test]
    fn compile_failure_scores_zero () {
        let (mut params, dir) = test_params("nocompile");
        params.compiler = script(&dir, "brokencc.sh", "#!/bin/sh\nexit 1\n");
        let ev = Evaluator::new(params);
        let mut ind = variant();
        ev.evaluate(&mut ind);
        assert_eq!(ind.fitness, Some(0.0));
        assert!(ind.compile.is_none());
    }

    #[test]
    fn oracle_timeout_scores_zero_but_other_oracle_counts () {
        let (mut params, dir) = test_params("timeout");
        params.test_good = script(&dir, "slow.sh", "#!/bin/sh\nsleep 30\n");
        params.test_timeout = 200;
        let ev = Evaluator::new(params);
        let mut ind = variant();
        let began = Instant::now();
        ev.evaluate(&mut ind);
        assert!(began.elapsed() < Duration::from_secs(10));
        /* only the bad oracle contributes: 2 lines * 5 */
        assert_eq!(ind.fitness, Some(10.0));
    }

    #[test]
    fn oracle_process_error_scores_zero () {
        let (mut params, dir) = test_params("oraclerr");
        params.test_bad = script(&dir, "err.sh", "#!/bin/sh\nexit 3\n");
        let ev = Evaluator::new(params);
        let mut ind = variant();
        ev.evaluate(&mut ind);
        assert_eq!(ind.fitness, Some(3.0));
    }

    #[test]
    fn cache_hits_skip_the_toolchain () {
        let (mut params, dir) = test_params("cache");
        let ev = Evaluator::new(params.clone());
        let mut first = variant();
        ev.evaluate(&mut first);
        assert_eq!(first.fitness, Some(13.0));

        /* same representation, broken toolchain: the cache answers */
        params.compiler = script(&dir, "gonecc.sh", "#!/bin/sh\nexit 1\n");
        let ev2 = Evaluator::with_cache(params, ev.cache_snapshot());
        let mut second = variant();
        ev2.evaluate(&mut second);
        assert_eq!(second.fitness, Some(13.0));
        assert!(second.cached);
        assert!(second.compile.is_none());
        assert_eq!(second.trials, 1);
    }

    #[test]
    fn counter_ticks_once_per_call () {
        let (params, _dir) = test_params("counter");
        let ev = Evaluator::new(params);
        let mut a = variant();
        let mut b = variant();
        ev.evaluate(&mut a);
        ev.evaluate(&mut b); // cache hit, still a trial
        assert_eq!(a.trials, 1);
        assert_eq!(b.trials, 2);
        assert_eq!(ev.trials_so_far(), 2);
    }
}
