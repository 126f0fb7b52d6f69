use geojson::{Feature, FeatureCollection, Geometry, Value};

use crate::{
    error::{LineArtError, Result},
    types::{PixelPoint, TracedOutline, TracedPolygon},
};

impl TracedOutline {
    pub fn to_geojson(&self) -> Result<FeatureCollection> {
        let mut features = Vec::new();

        for (i, polygon) in self.polygons.iter().enumerate() {
            // GeoJSON rings repeat the first position at the end
            let mut ring: Vec<Vec<f64>> = polygon
                .vertices
                .iter()
                .map(|&[x, y]| vec![f64::from(x), f64::from(y)])
                .collect();
            if let Some(first) = ring.first().cloned() {
                ring.push(first);
            }

            let geometry = Geometry::new(Value::Polygon(vec![ring]));

            let mut properties = serde_json::Map::new();
            properties.insert("id".to_string(), serde_json::Value::from(i));
            properties.insert("area".to_string(), number(polygon.area()));
            properties.insert("perimeter".to_string(), number(polygon.perimeter));
            properties.insert("tolerance".to_string(), number(polygon.tolerance));
            properties.insert("vertex_count".to_string(), serde_json::Value::from(polygon.vertices.len()));

            features.push(Feature {
                bbox: None,
                geometry: Some(geometry),
                id: Some(geojson::feature::Id::Number(serde_json::Number::from(i))),
                properties: Some(properties),
                foreign_members: None,
            });
        }

        let mut foreign_members = serde_json::Map::new();
        foreign_members.insert("image_width".to_string(), serde_json::Value::from(self.image_width));
        foreign_members.insert("image_height".to_string(), serde_json::Value::from(self.image_height));
        foreign_members.insert("shape_count".to_string(), serde_json::Value::from(self.polygons.len()));

        Ok(FeatureCollection {
            bbox: None,
            features,
            foreign_members: Some(foreign_members),
        })
    }

    /// Export to GeoJSON and serialize to JSON string
    pub fn to_geojson_string(&self) -> Result<String> {
        let geojson = self.to_geojson()?;
        Ok(serde_json::to_string_pretty(&geojson)?)
    }

    pub fn save_geojson<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_geojson_string()?)?;
        Ok(())
    }

    pub fn from_geojson_string(geojson_str: &str) -> Result<Self> {
        let geojson: FeatureCollection = geojson_str.parse()?;

        let members = geojson
            .foreign_members
            .as_ref()
            .ok_or_else(|| LineArtError::InvalidInput("Missing metadata in GeoJSON".to_string()))?;
        let dimension = |key: &str| {
            members
                .get(key)
                .and_then(|v| v.as_u64())
                .map(|v| v as u32)
                .ok_or_else(|| LineArtError::InvalidInput(format!("Missing or invalid {key}")))
        };
        let image_width = dimension("image_width")?;
        let image_height = dimension("image_height")?;

        let mut polygons = Vec::new();
        for feature in geojson.features {
            let Some(Geometry { value: Value::Polygon(rings), .. }) = feature.geometry else {
                continue;
            };
            let Some(exterior) = rings.first() else {
                continue;
            };

            let mut vertices: Vec<PixelPoint> = exterior
                .iter()
                .filter(|position| position.len() >= 2)
                .map(|position| [position[0].round() as i32, position[1].round() as i32])
                .collect();
            if vertices.len() > 1 && vertices.first() == vertices.last() {
                vertices.pop();
            }

            let property = |key: &str| {
                feature
                    .properties
                    .as_ref()
                    .and_then(|p| p.get(key))
                    .and_then(|v| v.as_f64())
                    .unwrap_or_default()
            };
            polygons.push(TracedPolygon {
                vertices,
                perimeter: property("perimeter"),
                tolerance: property("tolerance"),
            });
        }

        Ok(Self {
            polygons,
            image_width,
            image_height,
        })
    }
}

fn number(value: f64) -> serde_json::Value {
    serde_json::Number::from_f64(value)
        .map(serde_json::Value::Number)
        .unwrap_or_else(|| serde_json::Value::from(0))
}
