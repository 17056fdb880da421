use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_HEALTH_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_MEDIA_TIMEOUT_MS: u64 = 15_000;
const MIN_NETWORK_TIMEOUT_MS: u64 = 5_000;
const MAX_NETWORK_TIMEOUT_MS: u64 = 15_000;

pub const MIN_PREFETCH_WINDOW: usize = 3;
pub const MAX_PREFETCH_WINDOW: usize = 5;

#[derive(Debug, Clone, Default)]
pub struct ServiceEndpoints {
    pub scheduling: Option<String>,
    pub audio: Option<String>,
    pub image: Option<String>,
    pub progress: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TimeoutConfig {
    pub health: Duration,
    pub request: Duration,
    pub media: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            health: Duration::from_millis(DEFAULT_HEALTH_TIMEOUT_MS),
            request: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            media: Duration::from_millis(DEFAULT_MEDIA_TIMEOUT_MS),
        }
    }
}

impl TimeoutConfig {
    fn from_env() -> Self {
        let health = env_u64("HEALTH_TIMEOUT_MS").unwrap_or(DEFAULT_HEALTH_TIMEOUT_MS);
        let request = env_u64("REQUEST_TIMEOUT_MS").unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS);
        let media = env_u64("MEDIA_TIMEOUT_MS").unwrap_or(DEFAULT_MEDIA_TIMEOUT_MS);

        Self {
            health: clamp_network_timeout(health),
            request: clamp_network_timeout(request),
            media: clamp_network_timeout(media),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PrefetchConfig {
    pub enabled: bool,
    pub window: usize,
}

impl Default for PrefetchConfig {
    fn default() -> Self {
        Self { enabled: true, window: 4 }
    }
}

#[derive(Debug, Clone)]
pub struct MediaCacheConfig {
    pub capacity: usize,
    pub evict_ratio: f64,
}

impl Default for MediaCacheConfig {
    fn default() -> Self {
        Self { capacity: 100, evict_ratio: 0.3 }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    pub endpoints: ServiceEndpoints,
    pub timeouts: TimeoutConfig,
    pub prefetch: PrefetchConfig,
    pub media_cache: MediaCacheConfig,
    pub vocabulary_path: Option<PathBuf>,
    pub log_level: String,
}

impl SessionConfig {
    pub fn from_env() -> Self {
        let endpoints = ServiceEndpoints {
            scheduling: env_string("SCHEDULING_SERVICE_URL"),
            audio: env_string("AUDIO_SERVICE_URL"),
            image: env_string("IMAGE_SERVICE_URL"),
            progress: env_string("PROGRESS_SERVICE_URL"),
        };

        let window = env_u64("PREFETCH_WINDOW")
            .map(|v| v as usize)
            .unwrap_or(PrefetchConfig::default().window)
            .clamp(MIN_PREFETCH_WINDOW, MAX_PREFETCH_WINDOW);

        let capacity = env_u64("MEDIA_CACHE_CAPACITY")
            .map(|v| (v as usize).max(1))
            .unwrap_or(MediaCacheConfig::default().capacity);

        let evict_ratio = env_string("MEDIA_CACHE_EVICT_RATIO")
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|v| v.is_finite())
            .map(|v| v.clamp(0.05, 1.0))
            .unwrap_or(MediaCacheConfig::default().evict_ratio);

        Self {
            endpoints,
            timeouts: TimeoutConfig::from_env(),
            prefetch: PrefetchConfig {
                enabled: env_bool("PREFETCH_ENABLED", true),
                window,
            },
            media_cache: MediaCacheConfig { capacity, evict_ratio },
            vocabulary_path: env_string("VOCABULARY_PATH").map(PathBuf::from),
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        }
    }
}

fn clamp_network_timeout(ms: u64) -> Duration {
    Duration::from_millis(ms.clamp(MIN_NETWORK_TIMEOUT_MS, MAX_NETWORK_TIMEOUT_MS))
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_u64(key: &str) -> Option<u64> {
    env_string(key)?.trim().parse().ok()
}

fn env_bool(key: &str, default: bool) -> bool {
    env_string(key)
        .map(|v| v != "false" && v != "0")
        .unwrap_or(default)
}
