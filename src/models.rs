use serde::{Deserialize, Serialize};

#[derive(Deserialize, Debug)]
pub struct GeocodeQuery {
    pub address: String,
}

#[derive(Deserialize, Debug)]
pub struct ReverseQuery {
    pub lat: f64,
    pub lon: f64,
}

/// One parsed response entry from a single provider: a string address and a
/// point, tagged with the provider that produced it.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Candidate {
    pub address: String,
    pub lat: f64,
    pub lon: f64,
    pub provider: String,
}

impl Candidate {
    pub fn point(&self) -> geo::Point<f64> {
        geo::Point::new(self.lon, self.lat)
    }
}

// --- Provider wire formats ---

/// Nominatim `format=jsonv2` entry. Coordinates arrive as strings.
#[derive(Deserialize, Debug)]
pub struct NominatimPlace {
    pub lat: String,
    pub lon: String,
    pub display_name: String,
}

impl NominatimPlace {
    pub fn into_candidate(self, provider: &str) -> Option<Candidate> {
        let lat = self.lat.parse().ok()?;
        let lon = self.lon.parse().ok()?;
        Some(Candidate {
            address: self.display_name,
            lat,
            lon,
            provider: provider.to_string(),
        })
    }
}

/// Photon-style response: a GeoJSON FeatureCollection of points with the
/// address under `properties.label` (or `properties.name`).
pub fn photon_candidates(fc: &geojson::FeatureCollection, provider: &str) -> Vec<Candidate> {
    fc.features
        .iter()
        .filter_map(|feature| {
            let geometry = feature.geometry.as_ref()?;
            let (lon, lat) = match &geometry.value {
                geojson::Value::Point(position) if position.len() >= 2 => {
                    (position[0], position[1])
                }
                _ => return None,
            };
            let address = feature
                .property("label")
                .or_else(|| feature.property("name"))
                .and_then(|v| v.as_str())?
                .to_string();
            Some(Candidate {
                address,
                lat,
                lon,
                provider: provider.to_string(),
            })
        })
        .collect()
}

#[derive(Serialize, Debug)]
pub struct ReverseResponse {
    pub addresses: Vec<Candidate>,
    pub longest_common_substring: String,
}
