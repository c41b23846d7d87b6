//! Coordinate Reference System handling

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Coordinate Reference System representation.
///
/// There is deliberately no `Default`: an input without a CRS must stay
/// `None` so that it can be reported as [`Error::MissingCrs`] instead of
/// silently being treated as geographic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CRS {
    /// WKT representation
    wkt: Option<String>,
    /// EPSG code if known
    epsg: Option<u32>,
    /// PROJ string if available
    proj: Option<String>,
}

impl CRS {
    /// Create a CRS from an EPSG code
    pub fn from_epsg(code: u32) -> Self {
        Self {
            wkt: None,
            epsg: Some(code),
            proj: None,
        }
    }

    /// Create a CRS from a WKT string
    pub fn from_wkt(wkt: impl Into<String>) -> Self {
        Self {
            wkt: Some(wkt.into()),
            epsg: None,
            proj: None,
        }
    }

    /// Create a CRS from a PROJ string
    pub fn from_proj(proj: impl Into<String>) -> Self {
        Self {
            wkt: None,
            epsg: None,
            proj: Some(proj.into()),
        }
    }

    /// Get EPSG code if known
    pub fn epsg(&self) -> Option<u32> {
        self.epsg
    }

    /// Get WKT representation
    pub fn wkt(&self) -> Option<&str> {
        self.wkt.as_deref()
    }

    /// Get PROJ string
    pub fn proj(&self) -> Option<&str> {
        self.proj.as_deref()
    }

    /// Check if two CRS are equivalent
    pub fn is_equivalent(&self, other: &CRS) -> bool {
        if let (Some(a), Some(b)) = (self.epsg, other.epsg) {
            return a == b;
        }

        // Textual comparison only; no reprojection library is involved
        if let (Some(a), Some(b)) = (&self.wkt, &other.wkt) {
            return a == b;
        }

        if let (Some(a), Some(b)) = (&self.proj, &other.proj) {
            return a == b;
        }

        false
    }

    /// OGC URN form used by the legacy GeoJSON `crs` member
    /// (`urn:ogc:def:crs:EPSG::32610`). Falls back to [`CRS::identifier`].
    pub fn ogc_urn(&self) -> String {
        match self.epsg {
            Some(code) => format!("urn:ogc:def:crs:EPSG::{}", code),
            None => self.identifier(),
        }
    }

    /// Get a string identifier for this CRS
    pub fn identifier(&self) -> String {
        if let Some(code) = self.epsg {
            return format!("EPSG:{}", code);
        }
        if let Some(proj) = &self.proj {
            return proj.clone();
        }
        if let Some(wkt) = &self.wkt {
            return format!("WKT:{}", wkt.chars().take(50).collect::<String>());
        }
        "Unknown".to_string()
    }
}

impl fmt::Display for CRS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

impl FromStr for CRS {
    type Err = Error;

    /// Accepts `EPSG:n`, `urn:ogc:def:crs:EPSG::n` (any version segment),
    /// a bare EPSG number, a PROJ string (`+proj=...`) or WKT.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = |reason: &str| Error::InvalidParameter {
            name: "crs",
            value: s.to_string(),
            reason: reason.to_string(),
        };

        if s.is_empty() {
            return Err(invalid("empty CRS identifier"));
        }
        if s.starts_with('+') {
            return Ok(Self::from_proj(s));
        }
        let upper = s.to_ascii_uppercase();
        if ["PROJCS", "GEOGCS", "PROJCRS", "GEOGCRS", "COMPD_CS"]
            .iter()
            .any(|k| upper.starts_with(k))
        {
            return Ok(Self::from_wkt(s));
        }

        let code = if let Some(rest) = upper.strip_prefix("EPSG:") {
            rest
        } else if upper.starts_with("URN:OGC:DEF:CRS:EPSG:") {
            upper.rsplit(':').next().unwrap_or_default()
        } else {
            upper.as_str()
        };

        code.parse::<u32>()
            .map(Self::from_epsg)
            .map_err(|_| invalid("expected EPSG:<code>, an OGC URN, a PROJ string or WKT"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crs_epsg() {
        let crs = CRS::from_epsg(32610);
        assert_eq!(crs.epsg(), Some(32610));
        assert_eq!(crs.identifier(), "EPSG:32610");
        assert_eq!(crs.ogc_urn(), "urn:ogc:def:crs:EPSG::32610");
    }

    #[test]
    fn test_crs_equivalence() {
        let a = CRS::from_epsg(26910);
        let b: CRS = "EPSG:26910".parse().unwrap();
        assert!(a.is_equivalent(&b));
        assert!(!a.is_equivalent(&CRS::from_epsg(4326)));
    }

    #[test]
    fn test_parse_forms() {
        let urn: CRS = "urn:ogc:def:crs:EPSG::32611".parse().unwrap();
        assert_eq!(urn.epsg(), Some(32611));

        let versioned: CRS = "urn:ogc:def:crs:EPSG:9.8.15:2056".parse().unwrap();
        assert_eq!(versioned.epsg(), Some(2056));

        let bare: CRS = "3005".parse().unwrap();
        assert_eq!(bare.epsg(), Some(3005));

        let proj: CRS = "+proj=utm +zone=10 +datum=NAD83".parse().unwrap();
        assert!(proj.proj().is_some());

        let wkt: CRS = "PROJCS[\"NAD83 / UTM zone 10N\"]".parse().unwrap();
        assert!(wkt.wkt().is_some());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("".parse::<CRS>().is_err());
        assert!("EPSG:abc".parse::<CRS>().is_err());
    }
}
