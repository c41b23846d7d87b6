//! Closed class-code domain for classified riparian rasters

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};
use crate::raster::RasterElement;

/// Land-cover class of a classified riparian cell or feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassCode {
    /// Outside the riparian corridor, or NDVI exactly at the threshold
    Background,
    /// NDVI above the threshold
    Vegetated,
    /// NDVI below the threshold
    NonVegetated,
}

impl ClassCode {
    /// All classes, in code order of the default mapping
    pub const ALL: [ClassCode; 3] = [
        ClassCode::Background,
        ClassCode::Vegetated,
        ClassCode::NonVegetated,
    ];

    /// Label written to the `class` property of exported features
    pub fn label(&self) -> &'static str {
        match self {
            ClassCode::Background => "background",
            ClassCode::Vegetated => "vegetated",
            ClassCode::NonVegetated => "non_vegetated",
        }
    }

    /// Whether the class takes part in the combined riparian feature set
    pub fn is_riparian(&self) -> bool {
        !matches!(self, ClassCode::Background)
    }
}

impl fmt::Display for ClassCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Integer codes identifying each [`ClassCode`] in a classified raster.
///
/// The default follows the unsigned 8-bit convention of the classifier:
/// background `0`, vegetated `1`, and non-vegetated `255` (the `-1` of
/// `vegetated - not_vegetated` wrapped into `u8`). Signed rasters that keep
/// `-1` must say so explicitly with `non_vegetated: -1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassCodes {
    pub background: i64,
    pub vegetated: i64,
    pub non_vegetated: i64,
}

impl Default for ClassCodes {
    fn default() -> Self {
        Self {
            background: 0,
            vegetated: 1,
            non_vegetated: 255,
        }
    }
}

impl ClassCodes {
    /// Codes for signed rasters where non-vegetated cells hold `-1`
    pub fn signed() -> Self {
        Self {
            non_vegetated: -1,
            ..Self::default()
        }
    }

    /// Reject mappings where two classes share a code
    pub fn validate(&self) -> Result<()> {
        let Self { background, vegetated, non_vegetated } = *self;
        if background == vegetated || background == non_vegetated || vegetated == non_vegetated {
            return Err(Error::InvalidParameter {
                name: "class_codes",
                value: format!("{}/{}/{}", background, vegetated, non_vegetated),
                reason: "background, vegetated and non-vegetated codes must be distinct".into(),
            });
        }
        Ok(())
    }

    /// Integer code of a class
    pub fn code(&self, class: ClassCode) -> i64 {
        match class {
            ClassCode::Background => self.background,
            ClassCode::Vegetated => self.vegetated,
            ClassCode::NonVegetated => self.non_vegetated,
        }
    }

    /// Class for an integer code (exact match, no tolerance)
    pub fn classify(&self, code: i64) -> Option<ClassCode> {
        ClassCode::ALL.into_iter().find(|&class| self.code(class) == code)
    }

    /// Class for a raster cell value, or [`Error::UnknownClass`]
    pub fn resolve<T: RasterElement>(&self, value: T) -> Result<ClassCode> {
        value
            .class_code()
            .and_then(|code| self.classify(code))
            .ok_or_else(|| Error::UnknownClass {
                value: format!("{:?}", value),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_mapping() {
        let codes = ClassCodes::default();
        assert_eq!(codes.classify(0), Some(ClassCode::Background));
        assert_eq!(codes.classify(1), Some(ClassCode::Vegetated));
        assert_eq!(codes.classify(255), Some(ClassCode::NonVegetated));
        assert_eq!(codes.classify(-1), None);
        assert_eq!(codes.code(ClassCode::NonVegetated), 255);
    }

    #[test]
    fn test_signed_mapping() {
        let codes = ClassCodes::signed();
        assert_eq!(codes.resolve(-1i16).unwrap(), ClassCode::NonVegetated);
        assert!(codes.resolve(255i16).is_err());
    }

    #[test]
    fn test_resolve_rejects_unknown_and_fractional() {
        let codes = ClassCodes::default();
        assert!(matches!(codes.resolve(7u8), Err(Error::UnknownClass { .. })));
        assert!(codes.resolve(0.5f64).is_err());
        assert!(codes.resolve(f64::NAN).is_err());
        assert_eq!(codes.resolve(1.0f32).unwrap(), ClassCode::Vegetated);
    }

    #[test]
    fn test_validate() {
        assert!(ClassCodes::default().validate().is_ok());
        let clash = ClassCodes { background: 1, vegetated: 1, non_vegetated: 255 };
        assert!(clash.validate().is_err());
    }
}
