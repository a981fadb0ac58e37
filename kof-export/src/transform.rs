//! Transformation de coordonnées entre systèmes EPSG
//!
//! Le calcul géodésique est délégué: soit une fonction fournie par
//! l'appelant, soit PROJ avec le feature `reproject`.

use crate::epsg::EpsgRegistry;
use crate::error::ExportError;

/// Transforme une position planimétrique `[x, y]` de `from` vers `to`
///
/// Les codes sont passés tels que stockés dans le document (`EPSG:25832`).
pub trait CoordinateTransform {
    fn transform(&self, from: &str, to: &str, xy: [f64; 2]) -> Result<[f64; 2], ExportError>;
}

impl<F> CoordinateTransform for F
where
    F: Fn(&str, &str, [f64; 2]) -> Result<[f64; 2], ExportError>,
{
    fn transform(&self, from: &str, to: &str, xy: [f64; 2]) -> Result<[f64; 2], ExportError> {
        self(from, to, xy)
    }
}

/// Vérifie si la reprojection PROJ est disponible
pub fn is_available() -> bool {
    cfg!(feature = "reproject")
}

fn epsg_number(code: &str) -> Result<u32, ExportError> {
    EpsgRegistry::normalize(code)
        .and_then(|n| n.parse().ok())
        .ok_or_else(|| ExportError::InvalidEpsgCode(code.to_string()))
}

#[cfg(feature = "reproject")]
pub use self::proj_backend::ProjTransform;

#[cfg(feature = "reproject")]
mod proj_backend {
    use proj::Proj;
    use tracing::debug;

    use super::{epsg_number, CoordinateTransform};
    use crate::error::ExportError;

    /// Transformation PROJ entre deux EPSG fixés à la construction
    pub struct ProjTransform {
        proj: Proj,
        source_epsg: u32,
        target_epsg: u32,
    }

    impl ProjTransform {
        pub fn new(source_epsg: u32, target_epsg: u32) -> Result<Self, ExportError> {
            let source = format!("EPSG:{}", source_epsg);
            let target = format!("EPSG:{}", target_epsg);
            let proj = Proj::new_known_crs(&source, &target, None).map_err(|e| {
                ExportError::transform(format!(
                    "failed to create projection from {} to {}: {}",
                    source, target, e
                ))
            })?;
            debug!(source = %source, target = %target, "PROJ transform created");

            Ok(Self {
                proj,
                source_epsg,
                target_epsg,
            })
        }

        pub fn source_epsg(&self) -> u32 {
            self.source_epsg
        }

        pub fn target_epsg(&self) -> u32 {
            self.target_epsg
        }
    }

    impl CoordinateTransform for ProjTransform {
        fn transform(&self, from: &str, to: &str, xy: [f64; 2]) -> Result<[f64; 2], ExportError> {
            let (source, target) = (epsg_number(from)?, epsg_number(to)?);
            if (source, target) != (self.source_epsg, self.target_epsg) {
                return Err(ExportError::transform(format!(
                    "projection built for EPSG:{} -> EPSG:{}, called with {} -> {}",
                    self.source_epsg, self.target_epsg, from, to
                )));
            }
            if source == target {
                return Ok(xy);
            }

            let (x, y) = self
                .proj
                .convert((xy[0], xy[1]))
                .map_err(ExportError::transform)?;
            Ok([x, y])
        }
    }

}

/// Transformation factice quand le feature `reproject` est désactivé
#[cfg(not(feature = "reproject"))]
pub struct ProjTransform {
    source_epsg: u32,
    target_epsg: u32,
}

#[cfg(not(feature = "reproject"))]
impl ProjTransform {
    /// Échoue toujours, sauf pour une transformation identité
    pub fn new(source_epsg: u32, target_epsg: u32) -> Result<Self, ExportError> {
        if source_epsg == target_epsg {
            Ok(Self {
                source_epsg,
                target_epsg,
            })
        } else {
            Err(ExportError::transform(format!(
                "reprojection from EPSG:{} to EPSG:{} requires the 'reproject' feature",
                source_epsg, target_epsg
            )))
        }
    }

    pub fn source_epsg(&self) -> u32 {
        self.source_epsg
    }

    pub fn target_epsg(&self) -> u32 {
        self.target_epsg
    }
}

#[cfg(not(feature = "reproject"))]
impl CoordinateTransform for ProjTransform {
    fn transform(&self, from: &str, to: &str, xy: [f64; 2]) -> Result<[f64; 2], ExportError> {
        if epsg_number(from)? == self.source_epsg && epsg_number(to)? == self.target_epsg {
            Ok(xy)
        } else {
            Err(ExportError::transform(format!(
                "identity transform called with {} -> {}",
                from, to
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_transform() {
        let shift = |_: &str, _: &str, xy: [f64; 2]| -> Result<[f64; 2], ExportError> {
            Ok([xy[0] + 1.0, xy[1] - 1.0])
        };
        let out = shift.transform("EPSG:25832", "EPSG:4326", [10.0, 20.0]).unwrap();
        assert_eq!(out, [11.0, 19.0]);
    }

    #[test]
    fn test_epsg_number() {
        assert_eq!(epsg_number("EPSG:25832").unwrap(), 25832);
        assert_eq!(epsg_number("4326").unwrap(), 4326);
        assert!(epsg_number("utm").is_err());
    }

    #[cfg(not(feature = "reproject"))]
    #[test]
    fn test_stub_identity_only() {
        assert!(!is_available());
        let identity = ProjTransform::new(25832, 25832).unwrap();
        assert_eq!(
            identity
                .transform("EPSG:25832", "25832", [1.0, 2.0])
                .unwrap(),
            [1.0, 2.0]
        );
        assert!(ProjTransform::new(25832, 4326).is_err());
    }
}
