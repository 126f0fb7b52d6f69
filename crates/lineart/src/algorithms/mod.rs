pub mod gradient;
pub mod contours;

pub use gradient::*;
pub use contours::*;
