use std::collections::HashMap;
use std::fs::File;
use std::io;
use std::io::prelude::*;
use std::io::BufReader;
use std::path::Path;

/* Traces arrive as one executed instruction index per line; the same
 * index appearing twice means the line ran twice. Unparseable rows are
 * skipped so a truncated trace still yields a usable path.
 */
pub fn read_path<P: AsRef<Path>> (path: P) -> io::Result<HashMap<usize, f64>> {
    let fd = File::open(path)?;
    let mut hist: HashMap<usize, f64> = HashMap::new();
    for row in BufReader::new(fd).lines() {
        let row = row?;
        if let Ok(i) = row.trim().parse::<usize>() {
            *hist.entry(i).or_insert(0.0) += 1.0;
        }
    }
    Ok(hist)
}

/* Execution counts are blurred over their neighbors before use, so an
 * edit two lines away from a hot instruction still feels some heat,
 * then compressed with log(1 + v) to keep a tight loop from washing
 * out every other signal.
 */
const KERNEL: [(isize, f64); 7] = [
    (-3, 0.006),
    (-2, 0.061),
    (-1, 0.242),
    ( 0, 0.383),
    ( 1, 0.242),
    ( 2, 0.061),
    ( 3, 0.006),
];

pub fn smooth (hist: &HashMap<usize, f64>) -> HashMap<usize, f64> {
    let mut out: HashMap<usize, f64> = HashMap::new();
    for (&i, &v) in hist.iter() {
        for &(off, w) in KERNEL.iter() {
            let j = i as isize + off;
            if j < 0 {
                continue;
            }
            *out.entry(j as usize).or_insert(0.0) += v * w;
        }
    }
    for (_, v) in out.iter_mut() {
        *v = v.ln_1p();
    }
    out
}

/* The good path minus every index the failing runs touched: what is
 * left is mass over lines that only correct executions rely on.
 */
pub fn difference (good: &HashMap<usize, f64>,
                   bad:  &HashMap<usize, f64>) -> HashMap<usize, f64> {
    good.iter()
        .filter(|&(i, _)| !bad.contains_key(i))
        .map(|(&i, &v)| (i, v))
        .collect()
}
