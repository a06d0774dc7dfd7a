use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io;
use std::io::prelude::*;
use std::io::BufReader;
use std::path::Path;

use rustc_serialize::json::{Json, ToJson};

use mendel::phylostructs::{name, Individual, Inst, Line, Op};

/* Checkpoints are plain JSON: enough of an individual to reload it in
 * a later run and to read its lineage by eye. Compile handles and the
 * cache sentinel are runtime state and stay out.
 */

impl ToJson for Line {
    fn to_json (&self) -> Json {
        let mut b = BTreeMap::new();
        match *self {
            Line::Raw(ref s) => {
                b.insert("raw".to_string(), s.to_json());
            },
            Line::Tabbed(ref x, ref y) => {
                b.insert("tabbed".to_string(),
                         Json::Array(vec![x.to_json(), y.to_json()]));
            },
        }
        Json::Object(b)
    }
}

impl ToJson for Inst {
    fn to_json (&self) -> Json {
        let mut b = BTreeMap::new();
        b.insert("line".to_string(), self.line.to_json());
        b.insert("good".to_string(), self.good.to_json());
        b.insert("bad".to_string(), self.bad.to_json());
        Json::Object(b)
    }
}

fn ops_to_json (ops: &[Op]) -> Json {
    Json::Array(ops.iter().map(|op| op.to_json()).collect())
}

impl ToJson for Op {
    fn to_json (&self) -> Json {
        match *self {
            Op::Delete => Json::String("delete".to_string()),
            Op::Append => Json::String("append".to_string()),
            Op::Swap   => Json::String("swap".to_string()),
            Op::Crossover(ref m, ref f) => {
                let mut b = BTreeMap::new();
                b.insert("crossover".to_string(),
                         Json::Array(vec![ops_to_json(m), ops_to_json(f)]));
                Json::Object(b)
            },
        }
    }
}

impl ToJson for Individual {
    fn to_json (&self) -> Json {
        let mut b = BTreeMap::new();
        b.insert("name".to_string(), self.name.to_json());
        b.insert("generation".to_string(), (self.generation as u64).to_json());
        b.insert("trials".to_string(), (self.trials as u64).to_json());
        b.insert("fitness".to_string(), match self.fitness {
            Some(f) => f.to_json(),
            None    => Json::Null,
        });
        b.insert("operations".to_string(), ops_to_json(&self.ops));
        b.insert("representation".to_string(),
                 Json::Array(self.rep.iter().map(|i| i.to_json()).collect()));
        Json::Object(b)
    }
}

pub fn save_individual<P: AsRef<Path>> (path: P, ind: &Individual) -> io::Result<()> {
    let mut fd = File::create(path)?;
    write!(fd, "{}\n", ind.to_json().pretty())?;
    fd.flush()
}

fn line_from_json (j: &Json) -> Option<Line> {
    let obj = j.as_object()?;
    if let Some(raw) = obj.get("raw") {
        return Some(Line::Raw(raw.as_string()?.to_string()));
    }
    if let Some(tab) = obj.get("tabbed") {
        let arr = tab.as_array()?;
        if arr.len() != 2 {
            return None;
        }
        return Some(Line::Tabbed(arr[0].as_string()?.to_string(),
                                 arr[1].as_string()?.to_string()));
    }
    None
}

fn inst_from_json (j: &Json) -> Option<Inst> {
    let obj = j.as_object()?;
    let mut inst = Inst::new(line_from_json(obj.get("line")?)?);
    inst.good = obj.get("good").and_then(|x| x.as_f64()).unwrap_or(0.0);
    inst.bad = obj.get("bad").and_then(|x| x.as_f64()).unwrap_or(0.0);
    Some(inst)
}

fn ops_from_json (j: &Json) -> Option<Vec<Op>> {
    j.as_array()?.iter().map(op_from_json).collect()
}

fn op_from_json (j: &Json) -> Option<Op> {
    match *j {
        Json::String(ref s) => match s.as_str() {
            "delete" => Some(Op::Delete),
            "append" => Some(Op::Append),
            "swap"   => Some(Op::Swap),
            _        => None,
        },
        Json::Object(ref obj) => {
            let arr = obj.get("crossover")?.as_array()?;
            if arr.len() != 2 {
                return None;
            }
            Some(Op::Crossover(ops_from_json(&arr[0])?, ops_from_json(&arr[1])?))
        },
        _ => None,
    }
}

pub fn load_individual<P: AsRef<Path>> (path: P) -> Option<Individual> {
    let mut text = String::new();
    File::open(path).ok()?.read_to_string(&mut text).ok()?;
    let json = Json::from_str(&text).ok()?;
    let obj = json.as_object()?;
    let rep = obj.get("representation")?
                 .as_array()?
                 .iter()
                 .map(inst_from_json)
                 .collect::<Option<Vec<Inst>>>()?;
    let ops = obj.get("operations")
                 .and_then(ops_from_json)
                 .unwrap_or(Vec::new());
    Some(Individual {
        rep: rep,
        compile: None,
        cached: false,
        fitness: obj.get("fitness").and_then(|x| x.as_f64()),
        trials: obj.get("trials").and_then(|x| x.as_u64()).unwrap_or(0) as usize,
        ops: ops,
        generation: obj.get("generation").and_then(|x| x.as_u64()).unwrap_or(0) as u32,
        name: obj.get("name")
                 .and_then(|x| x.as_string())
                 .map(|s| s.to_string())
                 .unwrap_or_else(|| name(4)),
    })
}

/* The fitness cache survives between runs as one `hash<TAB>fitness`
 * row per scored representation. A missing or mangled file is an
 * empty cache, never an error.
 */
pub fn load_cache<P: AsRef<Path>> (path: P) -> HashMap<u64, f64> {
    let mut cache = HashMap::new();
    let fd = match File::open(path) {
        Ok(fd) => fd,
        Err(_) => return cache,
    };
    for row in BufReader::new(fd).lines() {
        let row = match row {
            Ok(r) => r,
            Err(_) => break,
        };
        let mut fields = row.split('\t');
        let key = fields.next().and_then(|x| u64::from_str_radix(x, 16).ok());
        let fit = fields.next().and_then(|x| x.parse::<f64>().ok());
        if let (Some(k), Some(f)) = (key, fit) {
            cache.insert(k, f);
        }
    }
    cache
}

pub fn save_cache<P: AsRef<Path>> (path: P, cache: &HashMap<u64, f64>) -> io::Result<()> {
    let mut fd = File::create(path)?;
    for (k, f) in cache.iter() {
        write!(fd, "{:016x}\t{}\n", k, f)?;
    }
    fd.flush()
}
