//! Threshold classification of NDVI into riparian land-cover classes

use ndarray::Array2;
use crate::maybe_rayon::*;
use riparian_core::raster::Raster;
use riparian_core::{ClassCode, ClassCodes, Error, Result};

use super::indices::is_nodata_f64;

/// Parameters for vegetation classification
#[derive(Debug, Clone, Copy)]
pub struct ClassifyParams {
    /// NDVI threshold, strictly between 0 and 1
    pub threshold: f64,
}

impl ClassifyParams {
    pub fn new(threshold: f64) -> Result<Self> {
        let params = Self { threshold };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.threshold > 0.0 && self.threshold < 1.0) {
            return Err(Error::InvalidParameter {
                name: "threshold",
                value: self.threshold.to_string(),
                reason: "NDVI threshold must lie strictly between 0 and 1".into(),
            });
        }
        Ok(())
    }
}

/// Classify an NDVI raster.
///
/// Cells above the threshold get the vegetated code, cells below it the
/// non-vegetated code. Cells exactly at the threshold, NaN cells and nodata
/// cells get the background code. With the default codes this is the
/// unsigned 8-bit `(ndvi > t) - (ndvi < t)`, where -1 wraps to 255.
///
/// All three codes must fit in `u8`. The output keeps the input's
/// transform and CRS.
pub fn classify_vegetation(
    ndvi: &Raster<f64>,
    params: ClassifyParams,
    codes: &ClassCodes,
) -> Result<Raster<u8>> {
    params.validate()?;
    codes.validate()?;

    let code = |class: ClassCode| -> Result<u8> {
        let value = codes.code(class);
        u8::try_from(value).map_err(|_| Error::InvalidParameter {
            name: "class_codes",
            value: value.to_string(),
            reason: format!("{} code does not fit an unsigned 8-bit raster", class),
        })
    };
    let background = code(ClassCode::Background)?;
    let vegetated = code(ClassCode::Vegetated)?;
    let non_vegetated = code(ClassCode::NonVegetated)?;

    let (rows, cols) = ndvi.shape();
    let nodata = ndvi.nodata();
    let t = params.threshold;

    let data: Vec<u8> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![background; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                let v = unsafe { ndvi.get_unchecked(row, col) };
                if is_nodata_f64(v, nodata) {
                    continue;
                }
                if v > t {
                    *out = vegetated;
                } else if v < t {
                    *out = non_vegetated;
                }
            }
            row_data
        })
        .collect();

    let mut output = ndvi.with_same_meta::<u8>(rows, cols);
    *output.data_mut() =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use riparian_core::{GeoTransform, CRS};

    fn ndvi_raster(values: Vec<f64>, rows: usize, cols: usize) -> Raster<f64> {
        let mut r = Raster::from_vec(values, rows, cols).unwrap();
        r.set_transform(GeoTransform::new(500_000.0, 5_000_000.0, 10.0, -10.0));
        r.set_crs(Some(CRS::from_epsg(32610)));
        r
    }

    #[test]
    fn test_default_codes_wrap() {
        let ndvi = ndvi_raster(vec![0.8, 0.1, 0.3, f64::NAN], 2, 2);
        let out = classify_vegetation(&ndvi, ClassifyParams::new(0.3).unwrap(), &ClassCodes::default())
            .unwrap();

        assert_eq!(out.data().iter().copied().collect::<Vec<u8>>(), vec![1, 255, 0, 0]);
        assert_eq!(out.crs(), ndvi.crs());
        assert_eq!(out.transform(), ndvi.transform());
    }

    #[test]
    fn test_custom_codes() {
        let codes = ClassCodes {
            background: 0,
            vegetated: 2,
            non_vegetated: 1,
        };
        let ndvi = ndvi_raster(vec![0.9, 0.0], 1, 2);
        let out = classify_vegetation(&ndvi, ClassifyParams { threshold: 0.5 }, &codes).unwrap();
        assert_eq!(out.get(0, 0).unwrap(), 2);
        assert_eq!(out.get(0, 1).unwrap(), 1);
    }

    #[test]
    fn test_signed_codes_rejected() {
        let ndvi = ndvi_raster(vec![0.9], 1, 1);
        let err = classify_vegetation(&ndvi, ClassifyParams { threshold: 0.5 }, &ClassCodes::signed())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { name: "class_codes", .. }));
    }

    #[test]
    fn test_threshold_range() {
        assert!(ClassifyParams::new(0.0).is_err());
        assert!(ClassifyParams::new(1.0).is_err());
        assert!(ClassifyParams::new(f64::NAN).is_err());
        assert!(ClassifyParams::new(0.35).is_ok());
    }
}
