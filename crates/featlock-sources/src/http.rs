use crate::{SourceConfig, SourceError, TextSource};
use std::collections::HashMap;
use std::io::Read;
use std::sync::{Mutex, PoisonError};

/// Plain HTTP GET over `ureq`, single attempt, bounded by the configured timeout.
pub struct HttpFetcher {
    agent: ureq::Agent,
    user_agent: String,
}

impl HttpFetcher {
    pub fn new(config: &SourceConfig) -> Self {
        let agent_config = ureq::Agent::config_builder()
            .timeout_global(Some(config.timeout()))
            .build();
        Self {
            agent: ureq::Agent::new_with_config(agent_config),
            user_agent: config.user_agent.clone(),
        }
    }
}

impl TextSource for HttpFetcher {
    fn fetch_text(&self, url: &str) -> Result<String, SourceError> {
        tracing::debug!("GET {url}");
        let fetch_err = |reason: String| SourceError::Fetch {
            url: url.to_owned(),
            reason,
        };

        let resp = match self
            .agent
            .get(url)
            .header("User-Agent", &self.user_agent)
            .call()
        {
            Ok(r) => r,
            Err(ureq::Error::StatusCode(code)) => {
                return Err(fetch_err(format!("HTTP {code}")));
            }
            Err(e) => return Err(fetch_err(e.to_string())),
        };

        let mut reader = resp.into_body().into_reader();
        let mut body = Vec::new();
        reader
            .read_to_end(&mut body)
            .map_err(|e| fetch_err(e.to_string()))?;
        String::from_utf8(body).map_err(|_| SourceError::Decode {
            url: url.to_owned(),
        })
    }
}

/// Response cache keyed by exact URL, scoped to the owner's lifetime.
///
/// Only successful fetches are cached; a failed URL is attempted again on the
/// next call.
pub struct CachedFetcher {
    inner: Box<dyn TextSource>,
    cache: Mutex<HashMap<String, String>>,
}

impl CachedFetcher {
    pub fn new(inner: Box<dyn TextSource>) -> Self {
        Self {
            inner,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn cached_len(&self) -> usize {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl TextSource for CachedFetcher {
    fn fetch_text(&self, url: &str) -> Result<String, SourceError> {
        if let Some(hit) = self
            .cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(url)
        {
            tracing::debug!("cache hit for {url}");
            return Ok(hit.clone());
        }
        let text = self.inner.fetch_text(url)?;
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(url.to_owned(), text.clone());
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tiny_http::{Response, Server, StatusCode};

    /// In-process HTTP server answering every request with the same body,
    /// counting how many requests reached it.
    struct CountingServer {
        url: String,
        hits: Arc<AtomicUsize>,
        _server: Arc<Server>,
        _handle: std::thread::JoinHandle<()>,
    }

    impl CountingServer {
        fn start(status: u16, body: Vec<u8>) -> Self {
            let server = Arc::new(Server::http("127.0.0.1:0").unwrap());
            let port = server.server_addr().to_ip().unwrap().port();
            let hits = Arc::new(AtomicUsize::new(0));

            let srv = Arc::clone(&server);
            let counter = Arc::clone(&hits);
            let handle = std::thread::spawn(move || {
                for request in srv.incoming_requests() {
                    counter.fetch_add(1, Ordering::SeqCst);
                    let response =
                        Response::from_data(body.clone()).with_status_code(StatusCode(status));
                    let _ = request.respond(response);
                }
            });

            Self {
                url: format!("http://127.0.0.1:{port}"),
                hits,
                _server: server,
                _handle: handle,
            }
        }

        fn hits(&self) -> usize {
            self.hits.load(Ordering::SeqCst)
        }
    }

    fn fetcher() -> HttpFetcher {
        HttpFetcher::new(&SourceConfig::default().with_timeout_secs(5))
    }

    #[test]
    fn fetches_text_body() {
        let server = CountingServer::start(200, b"go1.22.4\ntime 2024-06-04\n".to_vec());
        let text = fetcher()
            .fetch_text(&format!("{}/VERSION?m=text", server.url))
            .unwrap();
        assert!(text.starts_with("go1.22.4"));
        assert_eq!(server.hits(), 1);
    }

    #[test]
    fn http_error_status_is_fetch_error() {
        let server = CountingServer::start(503, b"unavailable".to_vec());
        let err = fetcher().fetch_text(&server.url).unwrap_err();
        assert!(matches!(err, SourceError::Fetch { .. }));
        assert!(err.to_string().contains("503"), "{err}");
    }

    #[test]
    fn non_utf8_body_is_decode_error() {
        let server = CountingServer::start(200, vec![0xff, 0xfe, 0xfd]);
        let err = fetcher().fetch_text(&server.url).unwrap_err();
        assert!(matches!(err, SourceError::Decode { .. }));
    }

    #[test]
    fn connection_refused_is_fetch_error() {
        let err = fetcher().fetch_text("http://127.0.0.1:1/").unwrap_err();
        assert!(matches!(err, SourceError::Fetch { .. }));
    }

    #[test]
    fn cache_serves_repeated_url_without_new_request() {
        let server = CountingServer::start(200, b"[]".to_vec());
        let cached = CachedFetcher::new(Box::new(fetcher()));
        let url = format!("{}/dist/index.json", server.url);

        assert_eq!(cached.fetch_text(&url).unwrap(), "[]");
        assert_eq!(cached.fetch_text(&url).unwrap(), "[]");
        assert_eq!(server.hits(), 1);
        assert_eq!(cached.cached_len(), 1);

        cached.fetch_text(&format!("{}/other", server.url)).unwrap();
        assert_eq!(server.hits(), 2);
    }

    #[test]
    fn failures_are_not_cached() {
        let server = CountingServer::start(500, Vec::new());
        let cached = CachedFetcher::new(Box::new(fetcher()));
        assert!(cached.fetch_text(&server.url).is_err());
        assert!(cached.fetch_text(&server.url).is_err());
        assert_eq!(server.hits(), 2);
        assert_eq!(cached.cached_len(), 0);
    }
}
