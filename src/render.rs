use geo::{BoundingRect, MultiPoint, Point, Rect};
use geojson::{Feature, FeatureCollection};
use serde_json::{json, Value as JsonValue};
use tracing::{debug, warn};

pub const POPUP_TEXT: &str = "Most geocoders reckon it's here";

const CIRCLE_RADIUS: u32 = 8;
const FILL_COLOR: &str = "#ff0000";
const STROKE_WEIGHT: u32 = 1;
const OPACITY: f64 = 1.0;
const DASH_ARRAY: &str = "5, 5";

/// One layer on the map. Layers produced from geocode results carry their
/// source feature; base layers (tiles) carry none and survive re-renders.
#[derive(Debug, Clone)]
pub struct Layer {
    pub id: String,
    pub feature: Option<Feature>,
    pub popup: Option<String>,
    pub source: JsonValue,
}

impl Layer {
    fn base(id: &str, source: JsonValue) -> Self {
        Self {
            id: id.to_string(),
            feature: None,
            popup: None,
            source,
        }
    }
}

/// A map surface owned by the renderer. Each call to [`MapView::render`]
/// replaces every previously drawn result layer with the new collection, so
/// stale geocodes never coexist with fresh ones.
#[derive(Debug, Clone)]
pub struct MapView {
    layers: Vec<Layer>,
    viewport: Option<Rect<f64>>,
}

impl Default for MapView {
    fn default() -> Self {
        Self::new()
    }
}

impl MapView {
    /// A view with a single raster base layer, streets style.
    pub fn new() -> Self {
        let base = Layer::base(
            "base-tiles",
            json!({
                "type": "raster",
                "tiles": ["https://tile.openstreetmap.org/{z}/{x}/{y}.png"],
                "tileSize": 256,
            }),
        );
        Self {
            layers: vec![base],
            viewport: None,
        }
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn feature_layers(&self) -> impl Iterator<Item = &Layer> {
        self.layers.iter().filter(|l| l.feature.is_some())
    }

    pub fn viewport(&self) -> Option<Rect<f64>> {
        self.viewport
    }

    /// Draws a fresh FeatureCollection of geocode results.
    ///
    /// Every feature becomes a styled circle-marker layer. The multipoint
    /// feature with the most coordinates (first wins on ties) gets the
    /// consensus popup; when no multipoint feature exists the popup is bound
    /// nowhere and rendering still completes. Bounds fitting failure is
    /// logged and swallowed.
    pub fn render(&mut self, fc: &FeatureCollection) {
        // 1. Drop previous results; keep base layers.
        self.layers.retain(|layer| layer.feature.is_none());

        // 2-3. Pick the largest multipoint cluster: first index with the
        // maximum coordinate count.
        let mut largest: Option<(usize, usize)> = None;
        for (i, feature) in fc.features.iter().enumerate() {
            if feature.property("label").and_then(|v| v.as_str()) != Some("multipoint") {
                continue;
            }
            let count = coordinate_count(feature);
            if largest.map_or(true, |(_, best)| count > best) {
                largest = Some((i, count));
            }
        }

        // 4-6. Circle-marker layer per feature, popup on the largest cluster.
        for (i, feature) in fc.features.iter().enumerate() {
            let popup = match largest {
                Some((index, _)) if index == i => Some(POPUP_TEXT.to_string()),
                _ => None,
            };
            self.layers.push(Layer {
                id: format!("result_{}", i),
                feature: Some(feature.clone()),
                popup,
                source: json!({
                    "type": "geojson",
                    "data": serde_json::to_value(feature).unwrap_or(JsonValue::Null),
                }),
            });
        }

        // 7-8. Fit the viewport to the drawn coordinates; degenerate or
        // empty geometry leaves the viewport alone.
        match fit_bounds(fc) {
            Some(rect) => {
                debug!(
                    "viewport fitted to ({}, {})..({}, {})",
                    rect.min().x,
                    rect.min().y,
                    rect.max().x,
                    rect.max().y
                );
                self.viewport = Some(rect);
            }
            None => warn!("could not fit bounds: empty or degenerate geometry"),
        }
    }

    /// The view as a MapLibre-style document: base sources untouched, one
    /// geojson source and circle layer per rendered feature, popup text and
    /// fitted bounds carried in layer/style metadata.
    pub fn style_json(&self) -> JsonValue {
        let mut sources = serde_json::Map::new();
        let mut layers = Vec::new();
        for layer in &self.layers {
            sources.insert(layer.id.clone(), layer.source.clone());
            if layer.feature.is_none() {
                layers.push(json!({
                    "id": layer.id,
                    "type": "raster",
                    "source": layer.id,
                }));
                continue;
            }
            let mut spec = json!({
                "id": layer.id,
                "type": "circle",
                "source": layer.id,
                "paint": {
                    "circle-radius": CIRCLE_RADIUS,
                    "circle-color": FILL_COLOR,
                    "circle-stroke-width": STROKE_WEIGHT,
                    "circle-opacity": OPACITY,
                    "circle-stroke-dasharray": DASH_ARRAY,
                },
            });
            if let Some(popup) = &layer.popup {
                spec["metadata"] = json!({ "popup": popup });
            }
            layers.push(spec);
        }

        let mut style = json!({
            "version": 8,
            "sources": sources,
            "layers": layers,
        });
        if let Some(rect) = self.viewport {
            let centre = rect.center();
            style["center"] = json!([centre.x, centre.y]);
            style["metadata"] = json!({
                "bounds": [rect.min().x, rect.min().y, rect.max().x, rect.max().y],
            });
        }
        style
    }
}

/// Number of coordinate positions in a feature's geometry.
fn coordinate_count(feature: &Feature) -> usize {
    match feature.geometry.as_ref().map(|g| &g.value) {
        Some(geojson::Value::Point(_)) => 1,
        Some(geojson::Value::MultiPoint(positions)) => positions.len(),
        Some(geojson::Value::LineString(positions)) => positions.len(),
        Some(geojson::Value::Polygon(rings)) => rings.iter().map(Vec::len).sum(),
        Some(geojson::Value::MultiLineString(lines)) => lines.iter().map(Vec::len).sum(),
        Some(geojson::Value::MultiPolygon(polys)) => polys
            .iter()
            .flat_map(|rings| rings.iter().map(Vec::len))
            .sum(),
        Some(geojson::Value::GeometryCollection(_)) | None => 0,
    }
}

/// Bounding rect of every position in the collection, or None when there is
/// nothing to bound.
fn fit_bounds(fc: &FeatureCollection) -> Option<Rect<f64>> {
    let mut points: Vec<Point<f64>> = Vec::new();
    for feature in &fc.features {
        let Some(geometry) = feature.geometry.as_ref() else {
            continue;
        };
        collect_positions(&geometry.value, &mut points);
    }
    if points.is_empty() {
        return None;
    }
    MultiPoint::from(points).bounding_rect()
}

fn collect_positions(value: &geojson::Value, out: &mut Vec<Point<f64>>) {
    match value {
        geojson::Value::Point(p) => {
            if p.len() >= 2 {
                out.push(Point::new(p[0], p[1]));
            }
        }
        geojson::Value::MultiPoint(ps) | geojson::Value::LineString(ps) => {
            for p in ps {
                if p.len() >= 2 {
                    out.push(Point::new(p[0], p[1]));
                }
            }
        }
        geojson::Value::Polygon(rings) | geojson::Value::MultiLineString(rings) => {
            for ring in rings {
                for p in ring {
                    if p.len() >= 2 {
                        out.push(Point::new(p[0], p[1]));
                    }
                }
            }
        }
        geojson::Value::MultiPolygon(polys) => {
            for rings in polys {
                for ring in rings {
                    for p in ring {
                        if p.len() >= 2 {
                            out.push(Point::new(p[0], p[1]));
                        }
                    }
                }
            }
        }
        geojson::Value::GeometryCollection(geometries) => {
            for g in geometries {
                collect_positions(&g.value, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geojson::{Geometry, Value};
    use serde_json::json;

    fn multipoint_feature(positions: Vec<Vec<f64>>) -> Feature {
        Feature {
            bbox: None,
            geometry: Some(Geometry::new(Value::MultiPoint(positions))),
            id: None,
            properties: json!({ "label": "multipoint" }).as_object().cloned(),
            foreign_members: None,
        }
    }

    fn point_feature(lon: f64, lat: f64, label: &str) -> Feature {
        Feature {
            bbox: None,
            geometry: Some(Geometry::new(Value::Point(vec![lon, lat]))),
            id: None,
            properties: json!({ "label": label }).as_object().cloned(),
            foreign_members: None,
        }
    }

    fn collection(features: Vec<Feature>) -> FeatureCollection {
        FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        }
    }

    #[test]
    fn largest_cluster_gets_the_popup() {
        // Two coordinates beats one.
        let fc = collection(vec![
            multipoint_feature(vec![vec![0.0, 0.0], vec![1.0, 1.0]]),
            multipoint_feature(vec![vec![2.0, 2.0]]),
        ]);
        let mut view = MapView::new();
        view.render(&fc);

        let popups: Vec<_> = view
            .feature_layers()
            .map(|l| l.popup.as_deref())
            .collect();
        assert_eq!(popups, vec![Some(POPUP_TEXT), None]);
    }

    #[test]
    fn tie_break_picks_the_first_feature() {
        let fc = collection(vec![
            multipoint_feature(vec![vec![0.0, 0.0], vec![1.0, 1.0]]),
            multipoint_feature(vec![vec![2.0, 2.0], vec![3.0, 3.0]]),
        ]);
        let mut view = MapView::new();
        view.render(&fc);

        let with_popup: Vec<usize> = view
            .feature_layers()
            .enumerate()
            .filter(|(_, l)| l.popup.is_some())
            .map(|(i, _)| i)
            .collect();
        assert_eq!(with_popup, vec![0]);
    }

    #[test]
    fn no_multipoint_features_binds_no_popup() {
        let fc = collection(vec![
            point_feature(0.0, 0.0, "centroid"),
            point_feature(1.0, 1.0, "centroid"),
        ]);
        let mut view = MapView::new();
        view.render(&fc);

        assert_eq!(view.feature_layers().count(), 2);
        assert!(view.feature_layers().all(|l| l.popup.is_none()));
    }

    #[test]
    fn rerender_clears_previous_feature_layers() {
        let mut view = MapView::new();
        view.render(&collection(vec![
            multipoint_feature(vec![vec![0.0, 0.0]]),
            point_feature(0.0, 0.0, "centroid"),
        ]));
        assert_eq!(view.feature_layers().count(), 2);

        view.render(&collection(vec![multipoint_feature(vec![vec![5.0, 5.0]])]));
        assert_eq!(view.feature_layers().count(), 1);
        // Base layer is untouched by both renders.
        assert_eq!(view.layers().len(), 2);
        assert!(view.layers()[0].feature.is_none());
    }

    #[test]
    fn empty_collection_renders_without_viewport() {
        let mut view = MapView::new();
        view.render(&collection(vec![]));
        assert!(view.viewport().is_none());
        assert_eq!(view.feature_layers().count(), 0);
    }

    #[test]
    fn degenerate_bounds_failure_is_swallowed() {
        // Features with no geometry: render must complete, viewport stays.
        let feature = Feature {
            bbox: None,
            geometry: None,
            id: None,
            properties: json!({ "label": "multipoint" }).as_object().cloned(),
            foreign_members: None,
        };
        let mut view = MapView::new();
        view.render(&collection(vec![feature]));
        assert!(view.viewport().is_none());
        assert_eq!(view.feature_layers().count(), 1);
    }

    #[test]
    fn viewport_fits_all_coordinates() {
        let fc = collection(vec![
            multipoint_feature(vec![vec![0.0, 0.0], vec![2.0, 4.0]]),
            point_feature(-1.0, 1.0, "centroid"),
        ]);
        let mut view = MapView::new();
        view.render(&fc);
        let rect = view.viewport().unwrap();
        assert_eq!(rect.min().x, -1.0);
        assert_eq!(rect.min().y, 0.0);
        assert_eq!(rect.max().x, 2.0);
        assert_eq!(rect.max().y, 4.0);
    }

    #[test]
    fn style_document_styles_every_result_layer() {
        let fc = collection(vec![
            multipoint_feature(vec![vec![0.0, 0.0], vec![1.0, 1.0]]),
            point_feature(0.5, 0.5, "centroid"),
        ]);
        let mut view = MapView::new();
        view.render(&fc);
        let style = view.style_json();

        assert_eq!(style["version"], 8);
        let layers = style["layers"].as_array().unwrap();
        // Base raster layer plus two circle layers.
        assert_eq!(layers.len(), 3);
        let circles: Vec<_> = layers.iter().filter(|l| l["type"] == "circle").collect();
        assert_eq!(circles.len(), 2);
        for circle in &circles {
            assert_eq!(circle["paint"]["circle-radius"], 8);
            assert_eq!(circle["paint"]["circle-color"], "#ff0000");
        }
        assert_eq!(circles[0]["metadata"]["popup"], POPUP_TEXT);
        assert!(circles[1].get("metadata").is_none());
        assert!(style["center"].is_array());
    }
}
