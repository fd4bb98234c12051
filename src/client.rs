use anyhow::Context;
use geojson::FeatureCollection;
use url::Url;

/// Thin client for the geocoding service, one method per endpoint.
/// Requests are async; callers get one-in-flight ordering by awaiting each
/// submission before issuing the next.
pub struct GeocodeClient {
    base: Url,
    client: reqwest::Client,
}

impl GeocodeClient {
    pub fn new(base: &str, client: reqwest::Client) -> anyhow::Result<Self> {
        let base = Url::parse(base).with_context(|| format!("bad base url {}", base))?;
        Ok(Self { base, client })
    }

    /// The raw WKT endpoint. Returns the response body as-is (the
    /// multipoint WKT of all candidates), for the caller to log or display.
    pub async fn raw(&self, address: &str) -> anyhow::Result<String> {
        let url = self.submit_url("", address)?;
        let resp = self.client.get(url).send().await?;
        Ok(resp.text().await?)
    }

    /// The cluster endpoint, parsed as a GeoJSON
    /// FeatureCollection ready for [`crate::render::MapView::render`].
    /// A body that is not valid GeoJSON is an error for the caller.
    pub async fn cluster(&self, address: &str) -> anyhow::Result<FeatureCollection> {
        let url = self.submit_url("forward/cluster", address)?;
        let body = self.client.get(url).send().await?.text().await?;
        let fc: FeatureCollection =
            serde_json::from_str(&body).context("response was not a feature collection")?;
        Ok(fc)
    }

    fn submit_url(&self, path: &str, address: &str) -> anyhow::Result<Url> {
        let mut url = if path.is_empty() {
            self.base.clone()
        } else {
            self.base.join(path)?
        };
        url.query_pairs_mut().append_pair("address", address);
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> GeocodeClient {
        GeocodeClient::new("http://localhost:5000/", reqwest::Client::new()).unwrap()
    }

    #[test]
    fn raw_url_targets_the_root() {
        let url = client().submit_url("", "wellington").unwrap();
        assert_eq!(url.as_str(), "http://localhost:5000/?address=wellington");
    }

    #[test]
    fn cluster_url_targets_the_cluster_route() {
        let url = client().submit_url("forward/cluster", "wellington").unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:5000/forward/cluster?address=wellington"
        );
    }

    #[test]
    fn address_is_fully_percent_encoded() {
        let url = client().submit_url("", "123 Main St, Unit #5").unwrap();
        assert_eq!(
            url.query(),
            Some("address=123+Main+St%2C+Unit+%235")
        );
    }

    #[test]
    fn bad_base_url_is_rejected() {
        assert!(GeocodeClient::new("not a url", reqwest::Client::new()).is_err());
    }
}
