use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

/// Application counters, registered on a private registry so tests and
/// multiple app instances never collide on the global one.
pub struct MetricsService {
    registry: Registry,
    videos_created: IntCounter,
    upload_credentials_issued: IntCounter,
    http_requests: IntCounterVec,
}

impl MetricsService {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let videos_created = IntCounter::new("videos_created_total", "Video records created")?;
        let upload_credentials_issued = IntCounter::new(
            "upload_credentials_issued_total",
            "CDN upload credential sets issued",
        )?;
        let http_requests = IntCounterVec::new(
            Opts::new("http_requests_total", "HTTP responses by status class"),
            &["status_class"],
        )?;

        registry.register(Box::new(videos_created.clone()))?;
        registry.register(Box::new(upload_credentials_issued.clone()))?;
        registry.register(Box::new(http_requests.clone()))?;

        Ok(Self {
            registry,
            videos_created,
            upload_credentials_issued,
            http_requests,
        })
    }

    pub fn record_video_created(&self) {
        self.videos_created.inc();
    }

    pub fn record_upload_credentials(&self) {
        self.upload_credentials_issued.inc();
    }

    pub fn record_response(&self, status: u16) {
        let class = match status {
            200..=299 => "2xx",
            300..=399 => "3xx",
            400..=499 => "4xx",
            _ => "5xx",
        };
        self.http_requests.with_label_values(&[class]).inc();
    }

    pub fn render(&self) -> anyhow::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
