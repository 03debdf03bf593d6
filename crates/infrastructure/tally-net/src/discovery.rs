use serde::Deserialize;
use tracing::debug;

/// Backend endpoints, normally served by the app shell at `/config`. The
/// dataset base is not part of discovery and keeps its default unless
/// overridden by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Endpoints {
    pub gateway_url: String,
    pub gateway_ws: String,
    pub monitoring_url: String,
    #[serde(default = "default_dataset_url")]
    pub dataset_url: String,
}

fn default_dataset_url() -> String {
    tally_config::DEFAULT_DATASET_URL.to_owned()
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            gateway_url: tally_config::DEFAULT_GATEWAY_URL.to_owned(),
            gateway_ws: tally_config::DEFAULT_GATEWAY_WS.to_owned(),
            monitoring_url: tally_config::DEFAULT_MONITORING_URL.to_owned(),
            dataset_url: default_dataset_url(),
        }
    }
}

impl Endpoints {
    /// Gateway event stream URL. The configured base may carry an http
    /// scheme; it is coerced to the matching ws scheme.
    pub fn gateway_stream_url(&self) -> String {
        format!("{}/ws", as_ws_base(&self.gateway_ws))
    }

    /// Monitoring event stream URL.
    pub fn monitoring_stream_url(&self) -> String {
        format!("{}/ws/monitoring", as_ws_base(&self.monitoring_url))
    }

    /// Dataset event stream URL.
    pub fn dataset_stream_url(&self) -> String {
        format!("{}/ws", as_ws_base(&self.dataset_url))
    }
}

fn as_ws_base(url: &str) -> String {
    match url.strip_prefix("http") {
        // http:// -> ws://, https:// -> wss://
        Some(rest) => format!("ws{rest}"),
        None => url.trim_end_matches('/').to_owned(),
    }
}

/// Fetches endpoint configuration from the shell at `base_url`. Every
/// failure mode falls back to the local defaults; discovery never blocks a
/// console from starting.
pub async fn discover(client: &reqwest::Client, base_url: &str) -> Endpoints {
    let url = format!("{}/config", base_url.trim_end_matches('/'));
    match client.get(&url).send().await {
        Ok(resp) if resp.status().is_success() => match resp.json::<Endpoints>().await {
            Ok(endpoints) => endpoints,
            Err(err) => {
                debug!("endpoint config decode failed, using defaults: {err}");
                Endpoints::default()
            }
        },
        Ok(resp) => {
            debug!("endpoint config returned {}, using defaults", resp.status());
            Endpoints::default()
        }
        Err(err) => {
            debug!("endpoint config unreachable, using defaults: {err}");
            Endpoints::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_urls_coerce_scheme() {
        let endpoints = Endpoints {
            gateway_ws: "http://gateway.local:8800".into(),
            monitoring_url: "https://monitor.local".into(),
            ..Endpoints::default()
        };
        assert_eq!(endpoints.gateway_stream_url(), "ws://gateway.local:8800/ws");
        assert_eq!(
            endpoints.monitoring_stream_url(),
            "wss://monitor.local/ws/monitoring"
        );
    }

    #[test]
    fn ws_scheme_passes_through() {
        let endpoints = Endpoints::default();
        assert_eq!(endpoints.gateway_stream_url(), "ws://127.0.0.1:8800/ws");
        assert_eq!(endpoints.dataset_stream_url(), "ws://127.0.0.1:8801/ws");
    }

    #[test]
    fn config_without_dataset_base_fills_the_default() {
        let endpoints: Endpoints = serde_json::from_str(
            r#"{"gateway_url": "http://g:1", "gateway_ws": "ws://g:1", "monitoring_url": "http://m:2"}"#,
        )
        .unwrap();
        assert_eq!(endpoints.dataset_url, tally_config::DEFAULT_DATASET_URL);
    }
}
