//! Degree-of-parallelism settings

use std::fmt;
use std::str::FromStr;

use riparian_core::{Error, Result};

/// Number of workers used for chunked processing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Workers {
    /// One worker per available processing unit
    #[default]
    Auto,
    /// Exactly this many workers (must be at least 1)
    Fixed(usize),
}

impl Workers {
    /// Concrete worker count
    pub fn resolve(&self) -> Result<usize> {
        match *self {
            Workers::Auto => Ok(num_cpus().max(1)),
            Workers::Fixed(0) => Err(Error::InvalidParameter {
                name: "workers",
                value: "0".into(),
                reason: "at least one worker is required".into(),
            }),
            Workers::Fixed(n) => Ok(n),
        }
    }
}

impl FromStr for Workers {
    type Err = Error;

    /// `auto` (or `-1`, the joblib convention) selects [`Workers::Auto`];
    /// any positive integer selects [`Workers::Fixed`].
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("auto") || s == "-1" {
            return Ok(Workers::Auto);
        }
        match s.parse::<usize>() {
            Ok(n) if n > 0 => Ok(Workers::Fixed(n)),
            _ => Err(Error::InvalidParameter {
                name: "workers",
                value: s.to_string(),
                reason: "expected `auto` or a positive integer".into(),
            }),
        }
    }
}

impl fmt::Display for Workers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Workers::Auto => f.write_str("auto"),
            Workers::Fixed(n) => write!(f, "{}", n),
        }
    }
}

/// Get the number of available CPU cores
pub fn num_cpus() -> usize {
    rayon::current_num_threads()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!("auto".parse::<Workers>().unwrap(), Workers::Auto);
        assert_eq!("AUTO".parse::<Workers>().unwrap(), Workers::Auto);
        assert_eq!("-1".parse::<Workers>().unwrap(), Workers::Auto);
        assert_eq!("8".parse::<Workers>().unwrap(), Workers::Fixed(8));
        assert!("0".parse::<Workers>().is_err());
        assert!("many".parse::<Workers>().is_err());
    }

    #[test]
    fn test_resolve() {
        assert!(Workers::Auto.resolve().unwrap() >= 1);
        assert_eq!(Workers::Fixed(3).resolve().unwrap(), 3);
        assert!(Workers::Fixed(0).resolve().is_err());
    }

    #[test]
    fn test_display_roundtrip() {
        for w in [Workers::Auto, Workers::Fixed(4)] {
            assert_eq!(w.to_string().parse::<Workers>().unwrap(), w);
        }
    }
}
