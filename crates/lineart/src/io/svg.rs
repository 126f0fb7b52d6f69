use image::Rgba;

use crate::types::TracedPolygon;

/// File name offered for vector downloads.
pub const DEFAULT_SVG_NAME: &str = "traced-image.svg";

/// Serializes simplified polygons as an SVG document styled like the
/// raster renderer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SvgExporter {
    pub background: Rgba<u8>,
    pub stroke: Rgba<u8>,
    pub line_width: f32,
}

impl Default for SvgExporter {
    fn default() -> Self {
        Self {
            background: Rgba([255, 255, 255, 255]),
            stroke: Rgba([0, 0, 0, 255]),
            line_width: 1.5,
        }
    }
}

impl SvgExporter {
    pub fn export(&self, polygons: &[TracedPolygon], width: u32, height: u32) -> String {
        let mut svg = format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}">"#
        );
        svg.push('\n');
        svg.push_str(&format!(
            r#"  <rect width="100%" height="100%" fill="{}"/>"#,
            hex(self.background)
        ));
        svg.push('\n');
        for polygon in polygons.iter().filter(|p| !p.vertices.is_empty()) {
            svg.push_str(&format!(
                r#"  <path d="{}" fill="none" stroke="{}" stroke-width="{}"/>"#,
                path_data(polygon),
                hex(self.stroke),
                self.line_width
            ));
            svg.push('\n');
        }
        svg.push_str("</svg>\n");
        svg
    }
}

fn path_data(polygon: &TracedPolygon) -> String {
    let commands: Vec<String> = polygon
        .vertices
        .iter()
        .enumerate()
        .map(|(i, [x, y])| format!("{}{x} {y}", if i == 0 { 'M' } else { 'L' }))
        .collect();
    format!("{} Z", commands.join(" "))
}

fn hex(color: Rgba<u8>) -> String {
    let [r, g, b, _] = color.0;
    format!("#{r:02x}{g:02x}{b:02x}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_path_per_polygon() {
        let polygons = vec![
            TracedPolygon {
                vertices: vec![[1, 2], [10, 2], [10, 9]],
                perimeter: 27.4,
                tolerance: 0.274,
            },
            TracedPolygon {
                vertices: vec![[20, 20], [25, 20], [25, 25], [20, 25]],
                perimeter: 20.0,
                tolerance: 0.2,
            },
        ];
        let svg = SvgExporter::default().export(&polygons, 40, 30);

        assert!(svg.starts_with(r#"<svg xmlns="http://www.w3.org/2000/svg" width="40" height="30""#));
        assert!(svg.contains(r##"<rect width="100%" height="100%" fill="#ffffff"/>"##));
        assert!(svg.contains(r#"d="M1 2 L10 2 L10 9 Z""#));
        assert!(svg.contains(r#"d="M20 20 L25 20 L25 25 L20 25 Z""#));
        assert_eq!(svg.matches("<path").count(), 2);
        assert!(svg.contains(r##"stroke="#000000" stroke-width="1.5""##));
        assert!(svg.trim_end().ends_with("</svg>"));
    }

    #[test]
    fn empty_polygons_are_skipped() {
        let polygons = vec![TracedPolygon {
            vertices: vec![],
            perimeter: 0.0,
            tolerance: 0.0,
        }];
        let svg = SvgExporter::default().export(&polygons, 5, 5);
        assert_eq!(svg.matches("<path").count(), 0);
    }

    #[test]
    fn document_has_one_element_per_line() {
        let polygons = vec![TracedPolygon {
            vertices: vec![[0, 0], [4, 0], [4, 3]],
            perimeter: 12.0,
            tolerance: 0.12,
        }];
        let svg = SvgExporter::default().export(&polygons, 8, 6);
        let lines: Vec<&str> = svg.lines().collect();
        assert_eq!(
            lines,
            vec![
                r#"<svg xmlns="http://www.w3.org/2000/svg" width="8" height="6" viewBox="0 0 8 6">"#,
                r##"  <rect width="100%" height="100%" fill="#ffffff"/>"##,
                r##"  <path d="M0 0 L4 0 L4 3 Z" fill="none" stroke="#000000" stroke-width="1.5"/>"##,
                "</svg>",
            ]
        );
    }
}
