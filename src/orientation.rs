//! Display orientation and preview rotation math.
//!
//! The preview stream is corrected so its image stays upright as the
//! device rotates. Front-facing cameras are mirrored for display, which
//! inverts the correction direction.

/// Orientation of the display the preview is rendered on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayOrientation {
    /// Native landscape.
    #[default]
    Landscape,
    /// Rotated a quarter turn clockwise from landscape.
    Portrait,
    /// Upside-down landscape.
    LandscapeFlipped,
    /// Rotated a quarter turn counterclockwise from landscape.
    PortraitFlipped,
}

/// Returns the clockwise degrees the display is rotated from landscape.
pub fn orientation_degrees(orientation: DisplayOrientation) -> u32 {
    match orientation {
        DisplayOrientation::Landscape => 0,
        DisplayOrientation::Portrait => 90,
        DisplayOrientation::LandscapeFlipped => 180,
        DisplayOrientation::PortraitFlipped => 270,
    }
}

/// Returns the rotation to apply to the preview stream, in degrees.
///
/// Mirrored previews reflect the image horizontally, so the correction
/// runs in the opposite direction.
pub fn rotation_degrees(orientation: DisplayOrientation, mirrored: bool) -> u32 {
    let degrees = orientation_degrees(orientation);
    if mirrored {
        (360 - degrees) % 360
    } else {
        degrees
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_orientation_degrees() {
        assert_eq!(orientation_degrees(DisplayOrientation::Landscape), 0);
        assert_eq!(orientation_degrees(DisplayOrientation::Portrait), 90);
        assert_eq!(orientation_degrees(DisplayOrientation::LandscapeFlipped), 180);
        assert_eq!(orientation_degrees(DisplayOrientation::PortraitFlipped), 270);
    }

    #[test]
    fn test_rotation_unmirrored() {
        assert_eq!(rotation_degrees(DisplayOrientation::Landscape, false), 0);
        assert_eq!(rotation_degrees(DisplayOrientation::Portrait, false), 90);
        assert_eq!(
            rotation_degrees(DisplayOrientation::LandscapeFlipped, false),
            180
        );
        assert_eq!(
            rotation_degrees(DisplayOrientation::PortraitFlipped, false),
            270
        );
    }

    #[test]
    fn test_rotation_mirrored() {
        assert_eq!(rotation_degrees(DisplayOrientation::Landscape, true), 0);
        assert_eq!(rotation_degrees(DisplayOrientation::Portrait, true), 270);
        assert_eq!(
            rotation_degrees(DisplayOrientation::LandscapeFlipped, true),
            180
        );
        assert_eq!(
            rotation_degrees(DisplayOrientation::PortraitFlipped, true),
            90
        );
    }

    #[test]
    fn test_default_is_landscape() {
        assert_eq!(DisplayOrientation::default(), DisplayOrientation::Landscape);
    }

    fn any_orientation() -> impl Strategy<Value = DisplayOrientation> {
        prop::sample::select(vec![
            DisplayOrientation::Landscape,
            DisplayOrientation::Portrait,
            DisplayOrientation::LandscapeFlipped,
            DisplayOrientation::PortraitFlipped,
        ])
    }

    proptest! {
        #[test]
        fn test_rotation_is_a_quarter_turn(
            orientation in any_orientation(),
            mirrored in any::<bool>(),
        ) {
            let degrees = rotation_degrees(orientation, mirrored);
            prop_assert!(degrees < 360);
            prop_assert_eq!(degrees % 90, 0);
        }

        #[test]
        fn test_mirroring_inverts_the_correction(orientation in any_orientation()) {
            let base = rotation_degrees(orientation, false);
            prop_assert_eq!(rotation_degrees(orientation, true), (360 - base) % 360);
        }
    }
}
