pub mod params;
pub mod statistics;
pub mod util;
pub mod phylostructs;
pub mod trace;
pub mod hatchery;
pub mod evolve;
pub mod storage;

pub use self::params::*;
pub use self::phylostructs::*;
pub use self::util::*;
pub use self::trace::*;
pub use self::hatchery::*;
pub use self::evolve::*;
