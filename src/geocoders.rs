use std::time::Duration;

use anyhow::Context;
use futures::future::join_all;
use tracing::warn;

use crate::address::Address;
use crate::config::Config;
use crate::geocode_cache::GeocodeCache;
use crate::location::Location;
use crate::models::{photon_candidates, Candidate, NominatimPlace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Nominatim,
    Photon,
}

impl ProviderKind {
    fn from_config(kind: Option<&str>, provider: &str) -> Self {
        match kind {
            None | Some("nominatim") => Self::Nominatim,
            Some("photon") => Self::Photon,
            Some(other) => {
                warn!(
                    "unknown kind '{}' for geocoder {}, assuming nominatim",
                    other, provider
                );
                Self::Nominatim
            }
        }
    }
}

/// One configured geocoding provider: a name, a response format, and URL
/// templates with `{query}` (forward) and `{lat}`/`{lon}` (reverse)
/// placeholders.
#[derive(Debug, Clone)]
pub struct Geocoder {
    name: String,
    kind: ProviderKind,
    forward_url: String,
    reverse_url: Option<String>,
}

impl Geocoder {
    pub fn new(
        name: &str,
        kind: ProviderKind,
        forward_url: &str,
        reverse_url: Option<&str>,
    ) -> Self {
        Self {
            name: name.to_string(),
            kind,
            forward_url: forward_url.to_string(),
            reverse_url: reverse_url.map(str::to_string),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Expands the forward template with the percent-encoded query.
    pub fn forward_request_url(&self, query: &str) -> String {
        let encoded: String = url::form_urlencoded::byte_serialize(query.as_bytes()).collect();
        self.forward_url.replace("{query}", &encoded)
    }

    pub fn reverse_request_url(&self, lat: f64, lon: f64) -> Option<String> {
        self.reverse_url.as_ref().map(|template| {
            template
                .replace("{lat}", &lat.to_string())
                .replace("{lon}", &lon.to_string())
        })
    }

    pub fn parse_forward(&self, body: &str) -> anyhow::Result<Vec<Candidate>> {
        match self.kind {
            ProviderKind::Nominatim => {
                let places: Vec<NominatimPlace> = serde_json::from_str(body)
                    .with_context(|| format!("bad nominatim response from {}", self.name))?;
                Ok(places
                    .into_iter()
                    .filter_map(|p| p.into_candidate(&self.name))
                    .collect())
            }
            ProviderKind::Photon => {
                let fc: geojson::FeatureCollection = serde_json::from_str(body)
                    .with_context(|| format!("bad photon response from {}", self.name))?;
                Ok(photon_candidates(&fc, &self.name))
            }
        }
    }

    pub fn parse_reverse(&self, body: &str) -> anyhow::Result<Vec<Candidate>> {
        match self.kind {
            // Nominatim reverse answers with a single object.
            ProviderKind::Nominatim => {
                let place: NominatimPlace = serde_json::from_str(body)
                    .with_context(|| format!("bad nominatim response from {}", self.name))?;
                Ok(place.into_candidate(&self.name).into_iter().collect())
            }
            ProviderKind::Photon => self.parse_forward(body),
        }
    }
}

/// The set of configured providers, queried concurrently for every request.
/// A provider that times out, errors, or returns garbage contributes no
/// candidates; the query as a whole still succeeds with whatever the rest
/// produced.
pub struct GeocoderPool {
    geocoders: Vec<Geocoder>,
    client: reqwest::Client,
    cache: Option<GeocodeCache>,
    timeout: Duration,
}

impl GeocoderPool {
    pub fn from_config(
        config: &Config,
        client: reqwest::Client,
        cache: Option<GeocodeCache>,
    ) -> Self {
        // Sorted for a deterministic candidate order across requests.
        let mut names: Vec<&String> = config.geocoders.keys().collect();
        names.sort();

        let mut geocoders: Vec<Geocoder> = Vec::with_capacity(names.len());
        for name in names {
            let provider = &config.geocoders[name];
            if let Some(duplicate) = geocoders.iter().find(|g| g.forward_url == provider.url) {
                warn!(
                    "geocoder {} shares an endpoint with {}; ignoring duplicate entry",
                    name,
                    duplicate.name()
                );
                continue;
            }
            geocoders.push(Geocoder::new(
                name,
                ProviderKind::from_config(provider.kind.as_deref(), name),
                &provider.url,
                provider.reverse_url.as_deref(),
            ));
        }

        Self {
            geocoders,
            client,
            cache,
            timeout: Duration::from_secs(config.request_timeout_secs.unwrap_or(10)),
        }
    }

    pub fn geocoders(&self) -> &[Geocoder] {
        &self.geocoders
    }

    /// Forward geocoding: one address in, every provider's candidate
    /// locations out, as a single [`Location`].
    pub async fn geocode(&self, address: &str) -> Location {
        let tasks = self.geocoders.iter().map(|geocoder| async move {
            let url = geocoder.forward_request_url(address);
            let key = format!("{}:forward:{}", geocoder.name(), address);
            let Some(body) = self.provider_body(geocoder, &url, &key).await else {
                return Vec::new();
            };
            match geocoder.parse_forward(&body) {
                Ok(candidates) => candidates,
                Err(e) => {
                    warn!("{}", e);
                    Vec::new()
                }
            }
        });
        let results = join_all(tasks).await;
        Location::new(results.into_iter().flatten().collect())
    }

    /// Reverse geocoding: one point in, every provider's candidate
    /// addresses out, as a single [`Address`]. Providers without a reverse
    /// endpoint are skipped.
    pub async fn reverse(&self, lat: f64, lon: f64) -> Address {
        let tasks = self.geocoders.iter().map(|geocoder| async move {
            let Some(url) = geocoder.reverse_request_url(lat, lon) else {
                return Vec::new();
            };
            let key = format!("{}:reverse:{},{}", geocoder.name(), lat, lon);
            let Some(body) = self.provider_body(geocoder, &url, &key).await else {
                return Vec::new();
            };
            match geocoder.parse_reverse(&body) {
                Ok(candidates) => candidates,
                Err(e) => {
                    warn!("{}", e);
                    Vec::new()
                }
            }
        });
        let results = join_all(tasks).await;
        Address::new(results.into_iter().flatten().collect())
    }

    /// Cache-aside fetch of one provider's response body. Cache failures
    /// degrade to a live request; request failures degrade to nothing.
    async fn provider_body(&self, geocoder: &Geocoder, url: &str, key: &str) -> Option<String> {
        if let Some(cache) = &self.cache {
            match cache.get(key).await {
                Ok(Some(body)) => return Some(body),
                Ok(None) => {}
                Err(e) => warn!("cache read failed for {}: {}", key, e),
            }
        }

        match self.fetch(url).await {
            Ok(body) => {
                if let Some(cache) = &self.cache {
                    if let Err(e) = cache.insert(key, &body).await {
                        warn!("cache write failed for {}: {}", key, e);
                    }
                }
                Some(body)
            }
            Err(e) => {
                warn!("geocoder {} gave no answer: {}", geocoder.name(), e);
                None
            }
        }
    }

    async fn fetch(&self, url: &str) -> anyhow::Result<String> {
        let resp = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(anyhow::anyhow!("{} from {}", resp.status(), url));
        }
        Ok(resp.text().await?)
    }
}
