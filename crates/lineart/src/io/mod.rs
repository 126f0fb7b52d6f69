pub mod png;
pub mod svg;
pub mod geojson;

pub use png::*;
pub use svg::*;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr, VariantNames};

/// Output encodings a rendered session can be exported to.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, EnumIter, VariantNames, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ExportFormat {
    /// Rendered raster, always available once processing has run.
    #[default]
    Png,
    /// Simplified polygons as SVG paths.
    Svg,
    /// Simplified polygons as a GeoJSON feature collection.
    #[serde(rename = "geojson")]
    #[strum(serialize = "geojson")]
    GeoJson,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Svg => "svg",
            Self::GeoJson => "geojson",
        }
    }

    /// Whether the format needs simplified polygons rather than a raster.
    pub fn is_vector(self) -> bool {
        !matches!(self, Self::Png)
    }
}
