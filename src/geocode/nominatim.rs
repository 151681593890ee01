//! Nominatim search client returning boundary polygons.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use geo::{Coord, LineString, MultiPolygon, Polygon};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

use super::{GeocodeCache, GeocodeError, Geocoder};
use crate::models::Boundary;

/// Pause before retrying a failed request
const RETRY_PAUSE: Duration = Duration::from_secs(2);

/// Maximum number of candidates requested per query
const RESULT_LIMIT: &str = "50";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NominatimSettings {
    pub endpoint: String,
    pub user_agent: String,
    pub timeout_secs: u64,
    /// Minimum delay between two requests (public instance policy: 1 req/s)
    pub request_delay_ms: u64,
    pub max_attempts: u32,
}

impl Default for NominatimSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://nominatim.openstreetmap.org".to_string(),
            user_agent: concat!("blason/", env!("CARGO_PKG_VERSION"), " (emblem generator)")
                .to_string(),
            timeout_secs: 60,
            request_delay_ms: 1000,
            max_attempts: 2,
        }
    }
}

/// Geocoder backed by a Nominatim instance
pub struct NominatimClient {
    client: Client,
    settings: NominatimSettings,
    search_endpoint: Url,
    cache: Option<GeocodeCache>,
    last_request: Mutex<Option<Instant>>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    geojson: Option<RawGeometry>,
}

#[derive(Debug, Deserialize)]
struct RawGeometry {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    coordinates: serde_json::Value,
}

type RawRing = Vec<Vec<f64>>;

impl NominatimClient {
    pub fn new(settings: NominatimSettings) -> Result<Self> {
        let client = Client::builder()
            .user_agent(settings.user_agent.clone())
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        let search_endpoint = Url::parse(&format!(
            "{}/search",
            settings.endpoint.trim_end_matches('/')
        ))
        .with_context(|| format!("Invalid geocoder endpoint: {}", settings.endpoint))?;

        Ok(Self {
            client,
            settings,
            search_endpoint,
            cache: None,
            last_request: Mutex::new(None),
        })
    }

    pub fn with_cache(mut self, cache: GeocodeCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Search URL for a query
    pub fn search_url(&self, query: &str) -> Url {
        let mut url = self.search_endpoint.clone();
        url.query_pairs_mut()
            .append_pair("q", query)
            .append_pair("format", "json")
            .append_pair("polygon_geojson", "1")
            .append_pair("limit", RESULT_LIMIT)
            .append_pair("dedupe", "0");
        url
    }

    /// Wait until the minimum delay since the previous request has passed
    async fn wait_turn(&self) {
        let delay = Duration::from_millis(self.settings.request_delay_ms);
        let mut last = self.last_request.lock().await;
        if let Some(at) = *last {
            let elapsed = at.elapsed();
            if elapsed < delay {
                tokio::time::sleep(delay - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    async fn fetch(&self, query: &str) -> Result<String, GeocodeError> {
        let url = self.search_url(query);
        let max_attempts = self.settings.max_attempts.max(1);
        let mut attempts = 0;

        loop {
            attempts += 1;
            self.wait_turn().await;

            let response = match self.client.get(url.clone()).send().await {
                Ok(r) => r,
                Err(e) => {
                    warn!(
                        "Nominatim request for '{}' failed (attempt {}/{}): {}",
                        query, attempts, max_attempts, e
                    );
                    if attempts < max_attempts {
                        tokio::time::sleep(RETRY_PAUSE).await;
                        continue;
                    }
                    return Err(GeocodeError::Http {
                        query: query.to_string(),
                        source: e,
                    });
                }
            };

            let status = response.status();
            if !status.is_success() {
                let transient =
                    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS;
                warn!(
                    "Nominatim answered {} for '{}' (attempt {}/{})",
                    status, query, attempts, max_attempts
                );
                if transient && attempts < max_attempts {
                    tokio::time::sleep(RETRY_PAUSE).await;
                    continue;
                }
                return Err(GeocodeError::Status {
                    query: query.to_string(),
                    status: status.as_u16(),
                });
            }

            return response.text().await.map_err(|e| GeocodeError::Http {
                query: query.to_string(),
                source: e,
            });
        }
    }
}

impl Geocoder for NominatimClient {
    async fn geocode(&self, query: &str) -> Result<Boundary, GeocodeError> {
        if let Some(body) = self.cache.as_ref().and_then(|c| c.get(query)) {
            match parse_search_response(query, &body) {
                Ok(boundary) => {
                    debug!("Geocode cache hit for '{}'", query);
                    return Ok(boundary);
                }
                Err(e) => warn!("Ignoring cached response for '{}': {}", query, e),
            }
        }

        info!("Geocoding '{}'", query);
        let body = self.fetch(query).await?;
        let boundary = parse_search_response(query, &body)?;

        if let Some(cache) = &self.cache {
            cache.insert(query, &body);
        }
        Ok(boundary)
    }
}

/// Pick the first polygonal result of a `format=json&polygon_geojson=1` search.
pub fn parse_search_response(query: &str, body: &str) -> Result<Boundary, GeocodeError> {
    let results: Vec<SearchResult> =
        serde_json::from_str(body).map_err(|e| GeocodeError::Parse {
            query: query.to_string(),
            message: e.to_string(),
        })?;

    if results.is_empty() {
        return Err(GeocodeError::NotFound(query.to_string()));
    }

    for result in results {
        let Some(raw) = result.geojson else {
            continue;
        };
        let geometry = to_multipolygon(raw).map_err(|message| GeocodeError::Parse {
            query: query.to_string(),
            message,
        })?;

        if let Some(geometry) = geometry.filter(|g| !g.0.is_empty()) {
            debug!(
                "'{}' resolved to {} ({} parts)",
                query,
                result.display_name,
                geometry.0.len()
            );
            return Ok(Boundary::geographic(geometry));
        }
    }

    Err(GeocodeError::NoPolygon(query.to_string()))
}

/// `None` for non-polygonal geometries (points, lines)
fn to_multipolygon(raw: RawGeometry) -> Result<Option<MultiPolygon<f64>>, String> {
    match raw.kind.as_str() {
        "Polygon" => {
            let rings: Vec<RawRing> =
                serde_json::from_value(raw.coordinates).map_err(|e| e.to_string())?;
            Ok(Some(MultiPolygon::new(polygon(rings)?.into_iter().collect())))
        }
        "MultiPolygon" => {
            let polygons: Vec<Vec<RawRing>> =
                serde_json::from_value(raw.coordinates).map_err(|e| e.to_string())?;
            let mut parts = Vec::with_capacity(polygons.len());
            for rings in polygons {
                parts.extend(polygon(rings)?);
            }
            Ok(Some(MultiPolygon::new(parts)))
        }
        _ => Ok(None),
    }
}

fn polygon(rings: Vec<RawRing>) -> Result<Option<Polygon<f64>>, String> {
    let mut rings = rings.into_iter();
    let Some(exterior) = rings.next() else {
        return Ok(None);
    };
    let interiors = rings.map(line_string).collect::<Result<Vec<_>, _>>()?;
    Ok(Some(Polygon::new(line_string(exterior)?, interiors)))
}

fn line_string(points: RawRing) -> Result<LineString<f64>, String> {
    points
        .into_iter()
        .map(|p| match p.as_slice() {
            [x, y, ..] => Ok(Coord { x: *x, y: *y }),
            _ => Err(format!("position with {} values", p.len())),
        })
        .collect::<Result<Vec<_>, _>>()
        .map(LineString::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Crs;

    const POLYGON_BODY: &str = r#"[
        {"display_name": "Lot, Occitanie, France",
         "geojson": {"type": "Polygon",
                     "coordinates": [[[1.0, 44.0], [2.0, 44.0], [2.0, 45.0], [1.0, 45.0], [1.0, 44.0]]]}}
    ]"#;

    #[test]
    fn test_parse_polygon() {
        let boundary = parse_search_response("Lot, France", POLYGON_BODY).unwrap();
        assert_eq!(boundary.crs, Some(Crs::Geographic));
        assert_eq!(boundary.part_count(), 1);
        assert_eq!(boundary.bbox(), Some((1.0, 44.0, 2.0, 45.0)));
    }

    #[test]
    fn test_parse_skips_points_and_keeps_first_polygon() {
        let body = r#"[
            {"display_name": "Lot (river)", "geojson": {"type": "Point", "coordinates": [1.5, 44.5]}},
            {"display_name": "no geometry"},
            {"display_name": "Corse",
             "geojson": {"type": "MultiPolygon",
                         "coordinates": [
                            [[[8.5, 41.4], [9.5, 41.4], [9.5, 43.0], [8.5, 41.4]]],
                            [[[9.3, 41.3], [9.4, 41.3], [9.4, 41.4], [9.3, 41.3]]]
                         ]}},
            {"display_name": "second polygon",
             "geojson": {"type": "Polygon", "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 0]]]}}
        ]"#;

        let boundary = parse_search_response("Corse", body).unwrap();
        assert_eq!(boundary.part_count(), 2);
        assert_eq!(boundary.bbox(), Some((8.5, 41.3, 9.5, 43.0)));
    }

    #[test]
    fn test_parse_polygon_with_hole() {
        let body = r#"[{"geojson": {"type": "Polygon", "coordinates": [
            [[0, 0], [10, 0], [10, 10], [0, 10], [0, 0]],
            [[4, 4], [6, 4], [6, 6], [4, 6], [4, 4]]
        ]}}]"#;
        let boundary = parse_search_response("q", body).unwrap();
        assert_eq!(boundary.geometry.0[0].interiors().len(), 1);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            parse_search_response("Atlantis", "[]"),
            Err(GeocodeError::NotFound(_))
        ));

        let points = r#"[{"geojson": {"type": "Point", "coordinates": [1, 2]}}]"#;
        assert!(matches!(
            parse_search_response("q", points),
            Err(GeocodeError::NoPolygon(_))
        ));

        assert!(matches!(
            parse_search_response("q", "<html>busy</html>"),
            Err(GeocodeError::Parse { .. })
        ));

        let short = r#"[{"geojson": {"type": "Polygon", "coordinates": [[[1], [2, 3]]]}}]"#;
        assert!(matches!(
            parse_search_response("q", short),
            Err(GeocodeError::Parse { .. })
        ));
    }

    #[test]
    fn test_search_url() {
        let client = NominatimClient::new(NominatimSettings {
            endpoint: "https://nominatim.example.org/".to_string(),
            ..Default::default()
        })
        .unwrap();

        let url = client.search_url("Île de La Réunion");
        assert_eq!(url.path(), "/search");

        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs[0], ("q".to_string(), "Île de La Réunion".to_string()));
        assert!(pairs.contains(&("format".to_string(), "json".to_string())));
        assert!(pairs.contains(&("polygon_geojson".to_string(), "1".to_string())));
        assert!(pairs.contains(&("limit".to_string(), "50".to_string())));
    }

    #[test]
    fn test_invalid_endpoint() {
        let settings = NominatimSettings {
            endpoint: "not a url".to_string(),
            ..Default::default()
        };
        assert!(NominatimClient::new(settings).is_err());
    }

    #[tokio::test]
    async fn test_cache_hit_skips_network() {
        let dir = tempfile::tempdir().unwrap();
        let cache = GeocodeCache::open(dir.path()).unwrap();
        cache.insert("Lot, France", POLYGON_BODY);

        // Nothing listens here: any request would fail
        let client = NominatimClient::new(NominatimSettings {
            endpoint: "http://127.0.0.1:9".to_string(),
            max_attempts: 1,
            timeout_secs: 1,
            ..Default::default()
        })
        .unwrap()
        .with_cache(cache);

        let boundary = client.geocode("Lot, France").await.unwrap();
        assert_eq!(boundary.part_count(), 1);
    }

    /// Serve one HTTP response with `body`, return the endpoint
    async fn serve_once(body: &'static str) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = vec![0u8; 8192];
            let _ = socket.read(&mut request).await.unwrap();
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_unreadable_cache_entry_is_refetched() {
        let dir = tempfile::tempdir().unwrap();
        let cache = GeocodeCache::open(dir.path()).unwrap();
        cache.insert("Lot, France", "<html>truncated");

        let client = NominatimClient::new(NominatimSettings {
            endpoint: serve_once(POLYGON_BODY).await,
            max_attempts: 1,
            timeout_secs: 5,
            request_delay_ms: 0,
            ..Default::default()
        })
        .unwrap()
        .with_cache(cache.clone());

        let boundary = client.geocode("Lot, France").await.unwrap();
        assert_eq!(boundary.bbox(), Some((1.0, 44.0, 2.0, 45.0)));

        // The good response replaced the broken entry
        let cached = cache.get("Lot, France").unwrap();
        assert!(parse_search_response("Lot, France", &cached).is_ok());
    }

    #[tokio::test]
    async fn test_unreadable_cache_entry_without_network() {
        let dir = tempfile::tempdir().unwrap();
        let cache = GeocodeCache::open(dir.path()).unwrap();
        cache.insert("Lot, France", "not json");

        let client = NominatimClient::new(NominatimSettings {
            endpoint: "http://127.0.0.1:9".to_string(),
            max_attempts: 1,
            timeout_secs: 1,
            request_delay_ms: 0,
            ..Default::default()
        })
        .unwrap()
        .with_cache(cache);

        // The request was attempted instead of reporting the cached body
        let err = client.geocode("Lot, France").await.unwrap_err();
        assert!(matches!(err, GeocodeError::Http { .. }), "{:?}", err);
    }
}
