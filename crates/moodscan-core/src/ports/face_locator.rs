//! Face locator port.

use image::GrayImage;

use crate::domain::FaceRegion;

/// Finds face rectangles in a grayscale image.
///
/// Implementations must be pure functions of the pixel data and return
/// regions that lie within the image bounds, in a deterministic order.
pub trait FaceLocator: Send + Sync {
    /// Returns zero or more face regions.
    ///
    /// An image without faces yields an empty vector, not an error.
    fn locate(&self, image: &GrayImage) -> Vec<FaceRegion>;
}
