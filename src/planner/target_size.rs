//! Output size resolution from the width/height fields

use tracing::debug;

use crate::domain::model::{CropRect, SelectionMode, TargetSize};
use crate::error::{CropperError, CropperResult};

/// Turns the optional width/height inputs into a [`TargetSize`]
pub struct TargetSizeResolver;

impl TargetSizeResolver {
    /// Parse one dimension field.
    ///
    /// Empty input and `0` both mean "not set". Anything else must be a
    /// positive whole number.
    pub fn parse_dimension(dimension: &str, raw: &str) -> CropperResult<Option<u32>> {
        let value = raw.trim();
        if value.is_empty() {
            return Ok(None);
        }

        let invalid = |reason: &str| CropperError::InvalidDimensions {
            dimension: dimension.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        };

        if value.starts_with('-') {
            return match value.parse::<i64>() {
                Ok(_) => Err(invalid("must not be negative")),
                Err(_) => Err(invalid("must be a whole number")),
            };
        }

        let parsed = value
            .parse::<u32>()
            .map_err(|_| invalid("must be a whole number"))?;

        Ok(if parsed == 0 { None } else { Some(parsed) })
    }

    /// Resolve raw field text against the mode and the committed selection
    pub fn resolve(
        width: &str,
        height: &str,
        mode: SelectionMode,
        rect: Option<&CropRect>,
    ) -> CropperResult<TargetSize> {
        let width = Self::parse_dimension("width", width)?;
        let height = Self::parse_dimension("height", height)?;
        Ok(Self::resolve_values(width, height, mode, rect))
    }

    /// Resolve already-parsed values
    pub fn resolve_values(
        width: Option<u32>,
        height: Option<u32>,
        mode: SelectionMode,
        rect: Option<&CropRect>,
    ) -> TargetSize {
        let width = width.filter(|w| *w > 0);
        let height = height.filter(|h| *h > 0);

        let target = match mode {
            SelectionMode::Square => match (width, height) {
                (None, None) => TargetSize::Native,
                (Some(side), None) | (None, Some(side)) => TargetSize::Exact {
                    width: side,
                    height: side,
                },
                (Some(w), Some(h)) => {
                    let side = w.min(h);
                    TargetSize::Exact {
                        width: side,
                        height: side,
                    }
                }
            },
            SelectionMode::Free => match (width, height, rect) {
                (None, None, _) => TargetSize::Native,
                (Some(w), Some(h), _) => TargetSize::Exact { width: w, height: h },
                (Some(w), None, Some(rect)) => TargetSize::Exact {
                    width: w,
                    height: derive_axis(w, rect.width(), rect.height()),
                },
                (None, Some(h), Some(rect)) => TargetSize::Exact {
                    width: derive_axis(h, rect.height(), rect.width()),
                    height: h,
                },
                (width, height, None) => TargetSize::Partial { width, height },
            },
        };

        debug!("Resolved target size {} (mode {})", target, mode);
        target
    }
}

/// Scale `crop_other` by `given / crop_given`, rounded, never below one pixel
fn derive_axis(given: u32, crop_given: u32, crop_other: u32) -> u32 {
    let derived = (given as f64 * crop_other as f64 / crop_given as f64).round();
    derived.clamp(1.0, u32::MAX as f64) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x2: u32, y2: u32) -> CropRect {
        CropRect::new(0, 0, x2, y2, 1920, 1080).unwrap()
    }

    #[test]
    fn test_parse_dimension() {
        assert_eq!(TargetSizeResolver::parse_dimension("width", "").unwrap(), None);
        assert_eq!(TargetSizeResolver::parse_dimension("width", "  ").unwrap(), None);
        assert_eq!(TargetSizeResolver::parse_dimension("width", "0").unwrap(), None);
        assert_eq!(TargetSizeResolver::parse_dimension("width", " 640 ").unwrap(), Some(640));
    }

    #[test]
    fn test_parse_dimension_names_the_field() {
        let err = TargetSizeResolver::parse_dimension("height", "12.5").unwrap_err();
        match err {
            CropperError::InvalidDimensions { dimension, value, .. } => {
                assert_eq!(dimension, "height");
                assert_eq!(value, "12.5");
            }
            other => panic!("unexpected error: {other}"),
        }

        let err = TargetSizeResolver::parse_dimension("width", "-20").unwrap_err();
        assert!(err.to_string().contains("negative"));
    }

    #[test]
    fn test_free_mode_derives_missing_axis() {
        // 400x300 crop, width 800 requested
        let target = TargetSizeResolver::resolve("800", "", SelectionMode::Free, Some(&rect(400, 300))).unwrap();
        assert_eq!(target, TargetSize::Exact { width: 800, height: 600 });

        let target = TargetSizeResolver::resolve("", "150", SelectionMode::Free, Some(&rect(400, 300))).unwrap();
        assert_eq!(target, TargetSize::Exact { width: 200, height: 150 });
    }

    #[test]
    fn test_free_mode_rounds_and_keeps_one_pixel() {
        // 333 * 100 / 1000 = 33.3
        let target = TargetSizeResolver::resolve_values(Some(333), None, SelectionMode::Free, Some(&rect(1000, 100)));
        assert_eq!(target, TargetSize::Exact { width: 333, height: 33 });

        let target = TargetSizeResolver::resolve_values(Some(1), None, SelectionMode::Free, Some(&rect(1000, 10)));
        assert_eq!(target, TargetSize::Exact { width: 1, height: 1 });
    }

    #[test]
    fn test_free_mode_both_or_neither() {
        let crop = rect(400, 300);
        assert_eq!(
            TargetSizeResolver::resolve("", "", SelectionMode::Free, Some(&crop)).unwrap(),
            TargetSize::Native
        );
        assert_eq!(
            TargetSizeResolver::resolve("100", "700", SelectionMode::Free, Some(&crop)).unwrap(),
            TargetSize::Exact { width: 100, height: 700 }
        );
    }

    #[test]
    fn test_free_mode_without_selection_passes_through() {
        assert_eq!(
            TargetSizeResolver::resolve("640", "", SelectionMode::Free, None).unwrap(),
            TargetSize::Partial { width: Some(640), height: None }
        );
    }

    #[test]
    fn test_square_mode() {
        let crop = rect(300, 300);
        assert_eq!(
            TargetSizeResolver::resolve("", "", SelectionMode::Square, Some(&crop)).unwrap(),
            TargetSize::Native
        );
        assert_eq!(
            TargetSizeResolver::resolve("", "480", SelectionMode::Square, Some(&crop)).unwrap(),
            TargetSize::Exact { width: 480, height: 480 }
        );
        assert_eq!(
            TargetSizeResolver::resolve("720", "480", SelectionMode::Square, None).unwrap(),
            TargetSize::Exact { width: 480, height: 480 }
        );
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let crop = rect(400, 300);
        for (mode, w, h) in [
            (SelectionMode::Free, Some(800), None),
            (SelectionMode::Free, None, Some(90)),
            (SelectionMode::Free, Some(10), Some(20)),
            (SelectionMode::Square, Some(720), Some(480)),
        ] {
            let first = TargetSizeResolver::resolve_values(w, h, mode, Some(&crop));
            let (ow, oh) = first.output_dimensions(&crop);
            let second = TargetSizeResolver::resolve_values(Some(ow), Some(oh), mode, Some(&crop));
            assert_eq!(first, second);
        }
    }
}
