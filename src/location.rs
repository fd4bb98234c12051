use geo::{Centroid, ConvexHull, MultiPoint, Point, Polygon};
use geojson::{Feature, FeatureCollection, Geometry, Value};
use serde_json::json;

use crate::cluster::dbscan;
use crate::models::Candidate;
use crate::utils;

/// A set of forward-geocode responses for one query, across every provider
/// that answered. All derived geometry (`multipoint`, `centroid`, hulls,
/// clusters) treats the set as one collection of candidate positions.
#[derive(Debug, Clone, Default)]
pub struct Location {
    candidates: Vec<Candidate>,
}

impl Location {
    pub fn new(candidates: Vec<Candidate>) -> Self {
        Self { candidates }
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn addresses(&self) -> Vec<&str> {
        self.candidates.iter().map(|c| c.address.as_str()).collect()
    }

    /// Candidate positions as lon/lat points, in response order.
    pub fn points(&self) -> Vec<Point<f64>> {
        self.candidates.iter().map(Candidate::point).collect()
    }

    pub fn multipoint(&self) -> Option<MultiPoint<f64>> {
        if self.candidates.is_empty() {
            return None;
        }
        Some(MultiPoint::from(self.points()))
    }

    pub fn centroid(&self) -> Option<Point<f64>> {
        self.multipoint()?.centroid()
    }

    /// The candidate nearest the geometric centre of all candidates.
    pub fn most_central_location(&self) -> Option<&Candidate> {
        let centroid = self.centroid()?;
        let index = utils::point_nearest_point(&self.points(), centroid)?;
        self.candidates.get(index)
    }

    /// Convex hull of the candidate positions; needs at least three.
    pub fn convex_hull(&self) -> Option<Polygon<f64>> {
        if self.candidates.len() < 3 {
            return None;
        }
        Some(self.multipoint()?.convex_hull())
    }

    /// Minimum bounding circle of the candidates, as a 64-gon.
    pub fn mbc(&self) -> Option<Polygon<f64>> {
        let coords: Vec<(f64, f64)> = self
            .candidates
            .iter()
            .map(|c| (c.lon, c.lat))
            .collect();
        let circle = utils::make_circle(&coords)?;
        Some(utils::circle_to_polygon(&circle))
    }

    /// Clusters among the candidates. Fewer than three candidates yields an
    /// empty cluster set.
    pub fn clusters(&self, epsilon_km: f64) -> LocationClusters {
        LocationClusters::from_location(self, epsilon_km)
    }

    /// WKT rendering of the candidate multipoint, e.g.
    /// `MULTIPOINT (174.776 -41.286, 174.763 -36.848)`.
    pub fn wkt_multipoint(&self) -> String {
        if self.candidates.is_empty() {
            return "MULTIPOINT EMPTY".to_string();
        }
        let coords: Vec<String> = self
            .candidates
            .iter()
            .map(|c| format!("{} {}", c.lon, c.lat))
            .collect();
        format!("MULTIPOINT ({})", coords.join(", "))
    }
}

/// One cluster of candidates. The centroid is the member nearest the
/// cluster's geometric centre, not the raw mean: DBSCAN clusters are
/// irregular, so the mean can land nowhere near any candidate.
#[derive(Debug, Clone)]
pub struct Cluster {
    pub label: usize,
    pub centroid: Point<f64>,
    pub members: Vec<Candidate>,
}

impl Cluster {
    pub fn multipoint(&self) -> MultiPoint<f64> {
        MultiPoint::from(
            self.members
                .iter()
                .map(Candidate::point)
                .collect::<Vec<_>>(),
        )
    }
}

/// The clusters identified within a [`Location`], largest first. Ties keep
/// input order, so the cluster containing the earliest candidate wins.
#[derive(Debug, Clone, Default)]
pub struct LocationClusters {
    clusters: Vec<Cluster>,
}

impl LocationClusters {
    fn from_location(location: &Location, epsilon_km: f64) -> Self {
        if location.len() < 3 {
            return Self::default();
        }
        let points = location.points();
        let mut clusters: Vec<Cluster> = dbscan(&points, epsilon_km, 1)
            .into_iter()
            .enumerate()
            .map(|(label, member_indices)| {
                let members: Vec<Candidate> = member_indices
                    .iter()
                    .map(|&i| location.candidates[i].clone())
                    .collect();
                let member_points: Vec<Point<f64>> =
                    members.iter().map(Candidate::point).collect();
                let centre = MultiPoint::from(member_points.clone())
                    .centroid()
                    .unwrap_or(member_points[0]);
                let nearest = utils::point_nearest_point(&member_points, centre).unwrap_or(0);
                Cluster {
                    label,
                    centroid: member_points[nearest],
                    members,
                }
            })
            .collect();
        clusters.sort_by(|a, b| b.members.len().cmp(&a.members.len()));
        Self { clusters }
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    pub fn cluster_centres(&self) -> Vec<Point<f64>> {
        self.clusters.iter().map(|c| c.centroid).collect()
    }

    /// GeoJSON rendering of the clusters: one `multipoint`-labelled feature
    /// per cluster, followed by a `centroid`-labelled point feature for each.
    /// Clients pick the consensus answer by looking for the multipoint
    /// feature with the most coordinates.
    pub fn to_feature_collection(&self) -> FeatureCollection {
        let mut features = Vec::with_capacity(self.clusters.len() * 2);
        for cluster in &self.clusters {
            let positions: Vec<Vec<f64>> = cluster
                .members
                .iter()
                .map(|m| vec![m.lon, m.lat])
                .collect();
            let addresses: Vec<&str> =
                cluster.members.iter().map(|m| m.address.as_str()).collect();
            features.push(Feature {
                bbox: None,
                geometry: Some(Geometry::new(Value::MultiPoint(positions))),
                id: None,
                properties: json!({
                    "label": "multipoint",
                    "cluster": cluster.label,
                    "size": cluster.members.len(),
                    "addresses": addresses,
                })
                .as_object()
                .cloned(),
                foreign_members: None,
            });
        }
        for cluster in &self.clusters {
            features.push(Feature {
                bbox: None,
                geometry: Some(Geometry::new(Value::Point(vec![
                    cluster.centroid.x(),
                    cluster.centroid.y(),
                ]))),
                id: None,
                properties: json!({
                    "label": "centroid",
                    "cluster": cluster.label,
                })
                .as_object()
                .cloned(),
                foreign_members: None,
            });
        }
        FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(provider: &str, address: &str, lon: f64, lat: f64) -> Candidate {
        Candidate {
            address: address.to_string(),
            lat,
            lon,
            provider: provider.to_string(),
        }
    }

    fn sample_location() -> Location {
        // Four providers agree on Wellington, one says Auckland.
        Location::new(vec![
            candidate("a", "1 Lambton Quay, Wellington", 174.776, -41.286),
            candidate("b", "1 Lambton Quay, Wellington", 174.777, -41.287),
            candidate("c", "Lambton Quay, Wellington", 174.778, -41.286),
            candidate("d", "1 Lambton Quay, Wellington Central", 174.776, -41.285),
            candidate("e", "1 Lambton Quay, Auckland??", 174.763, -36.848),
        ])
    }

    #[test]
    fn empty_location_has_no_geometry() {
        let location = Location::default();
        assert!(location.multipoint().is_none());
        assert!(location.centroid().is_none());
        assert!(location.most_central_location().is_none());
        assert!(location.convex_hull().is_none());
        assert!(location.mbc().is_none());
        assert_eq!(location.wkt_multipoint(), "MULTIPOINT EMPTY");
    }

    #[test]
    fn convex_hull_needs_three_candidates() {
        let location = Location::new(vec![
            candidate("a", "x", 0.0, 0.0),
            candidate("b", "y", 1.0, 1.0),
        ]);
        assert!(location.convex_hull().is_none());
        assert!(location.multipoint().is_some());
    }

    #[test]
    fn wkt_lists_lon_lat_pairs() {
        let location = Location::new(vec![
            candidate("a", "x", 174.5, -41.25),
            candidate("b", "y", 175.0, -41.5),
        ]);
        assert_eq!(
            location.wkt_multipoint(),
            "MULTIPOINT (174.5 -41.25, 175 -41.5)"
        );
    }

    #[test]
    fn most_central_location_is_an_actual_candidate() {
        let location = sample_location();
        let central = location.most_central_location().unwrap();
        assert!(location.candidates().contains(central));
        // The Auckland outlier is never the most central of five.
        assert_ne!(central.provider, "e");
    }

    #[test]
    fn fewer_than_three_candidates_gives_no_clusters() {
        let location = Location::new(vec![
            candidate("a", "x", 0.0, 0.0),
            candidate("b", "y", 0.0, 0.0),
        ]);
        assert!(location.clusters(1.0).is_empty());
    }

    #[test]
    fn clusters_come_out_largest_first() {
        let clusters = sample_location().clusters(1.0);
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters.clusters()[0].members.len(), 4);
        assert_eq!(clusters.clusters()[1].members.len(), 1);
    }

    #[test]
    fn cluster_centroid_is_a_member_position() {
        let clusters = sample_location().clusters(1.0);
        let biggest = &clusters.clusters()[0];
        assert!(biggest
            .members
            .iter()
            .any(|m| m.point() == biggest.centroid));
    }

    #[test]
    fn feature_collection_labels_multipoints_and_centroids() {
        let fc = sample_location().clusters(1.0).to_feature_collection();
        let multipoints: Vec<_> = fc
            .features
            .iter()
            .filter(|f| f.property("label").and_then(|v| v.as_str()) == Some("multipoint"))
            .collect();
        let centroids: Vec<_> = fc
            .features
            .iter()
            .filter(|f| f.property("label").and_then(|v| v.as_str()) == Some("centroid"))
            .collect();
        assert_eq!(multipoints.len(), 2);
        assert_eq!(centroids.len(), 2);

        // Largest cluster is the first multipoint feature.
        match &multipoints[0].geometry.as_ref().unwrap().value {
            Value::MultiPoint(positions) => assert_eq!(positions.len(), 4),
            other => panic!("expected multipoint geometry, got {:?}", other),
        }
    }
}
