use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::cache::{MediaCache, MediaContent, MediaKey};
use crate::clients::http::with_timeout;
use crate::clients::{AudioService, ImageService, ServiceKind};
use crate::config::{MAX_PREFETCH_WINDOW, MIN_PREFETCH_WINDOW};
use crate::services::search_terms::{audio_search_term, image_search_term};
use crate::types::{CapabilityFlags, CharacterSet, StudyItem};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrefetchRequest {
    Audio { key: MediaKey, text: String, lang: &'static str },
    Image { key: MediaKey, term: String },
}

impl PrefetchRequest {
    pub fn key(&self) -> &MediaKey {
        match self {
            Self::Audio { key, .. } | Self::Image { key, .. } => key,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrefetchReport {
    pub fetched: usize,
    pub failed: usize,
}

/// Runtime switch for prefetching, shared with whoever owns the user's
/// preference. Flipping it only affects future scheduling.
#[derive(Debug, Clone)]
pub struct PrefetchToggle(Arc<AtomicBool>);

impl PrefetchToggle {
    pub fn new(enabled: bool) -> Self {
        Self(Arc::new(AtomicBool::new(enabled)))
    }

    pub fn is_enabled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.0.store(enabled, Ordering::Relaxed);
    }
}

pub struct PrefetchScheduler {
    cache: Arc<MediaCache>,
    audio: Arc<dyn AudioService>,
    image: Arc<dyn ImageService>,
    flags: CapabilityFlags,
    charset: CharacterSet,
    window: usize,
    timeout: Duration,
    toggle: PrefetchToggle,
    pending: Arc<Mutex<HashSet<MediaKey>>>,
}

impl PrefetchScheduler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        cache: Arc<MediaCache>,
        audio: Arc<dyn AudioService>,
        image: Arc<dyn ImageService>,
        flags: CapabilityFlags,
        charset: CharacterSet,
        window: usize,
        timeout: Duration,
        toggle: PrefetchToggle,
    ) -> Self {
        Self {
            cache,
            audio,
            image,
            flags,
            charset,
            window: window.clamp(MIN_PREFETCH_WINDOW, MAX_PREFETCH_WINDOW),
            timeout,
            toggle,
            pending: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn set_capabilities(&mut self, flags: CapabilityFlags) {
        self.flags = flags;
    }

    pub fn cache(&self) -> &Arc<MediaCache> {
        &self.cache
    }

    pub fn toggle(&self) -> &PrefetchToggle {
        &self.toggle
    }

    /// Media requests for the next `window` items from `position` that still
    /// have something uncached and not already being fetched.
    pub fn plan(&self, queue: &[StudyItem], position: usize) -> Vec<PrefetchRequest> {
        if !self.flags.audio_available && !self.flags.image_available {
            return Vec::new();
        }

        let pending = self.pending.lock();
        let mut seen: HashSet<MediaKey> = HashSet::new();
        let mut requests = Vec::new();
        let mut items_selected = 0;

        for item in queue.iter().skip(position) {
            if items_selected >= self.window {
                break;
            }

            let mut item_requests = Vec::new();
            if self.flags.audio_available {
                let (text, lang) = audio_search_term(item, self.charset);
                let key = MediaKey::audio(&text, lang);
                if !text.is_empty() && self.needs_fetch(&key, &pending, &mut seen) {
                    item_requests.push(PrefetchRequest::Audio { key, text, lang });
                }
            }
            if self.flags.image_available {
                let term = image_search_term(item);
                let key = MediaKey::image(&term);
                if self.needs_fetch(&key, &pending, &mut seen) {
                    item_requests.push(PrefetchRequest::Image { key, term });
                }
            }

            if !item_requests.is_empty() {
                items_selected += 1;
                requests.extend(item_requests);
            }
        }

        requests
    }

    fn needs_fetch(&self, key: &MediaKey, pending: &HashSet<MediaKey>, seen: &mut HashSet<MediaKey>) -> bool {
        !self.cache.contains(key) && !pending.contains(key) && seen.insert(key.clone())
    }

    /// Starts fetching the window for `position` in a detached task and
    /// returns immediately. `None` when disabled or nothing needs fetching.
    pub fn schedule(&self, queue: &[StudyItem], position: usize) -> Option<JoinHandle<PrefetchReport>> {
        if !self.toggle.is_enabled() {
            return None;
        }

        let requests: Vec<PrefetchRequest> = {
            let planned = self.plan(queue, position);
            let mut pending = self.pending.lock();
            planned
                .into_iter()
                .filter(|request| pending.insert(request.key().clone()))
                .collect()
        };
        if requests.is_empty() {
            return None;
        }

        debug!(position, requests = requests.len(), "prefetch scheduled");

        let cache = Arc::clone(&self.cache);
        let audio = Arc::clone(&self.audio);
        let image = Arc::clone(&self.image);
        let pending = Arc::clone(&self.pending);
        let timeout = self.timeout;

        Some(tokio::spawn(async move {
            let fetches = requests.into_iter().map(|request| {
                let audio = Arc::clone(&audio);
                let image = Arc::clone(&image);
                let cache = Arc::clone(&cache);
                let pending = Arc::clone(&pending);
                async move {
                    let result = match &request {
                        PrefetchRequest::Audio { text, lang, .. } => {
                            with_timeout(ServiceKind::Audio, timeout, audio.resolve_audio(text, lang))
                                .await
                                .map(|r| MediaContent::Audio { url: r.url, cached: r.cached })
                        }
                        PrefetchRequest::Image { term, .. } => {
                            with_timeout(ServiceKind::Image, timeout, image.fetch_image(term))
                                .await
                                .map(MediaContent::Image)
                        }
                    };

                    let key = request.key();
                    let stored = match result {
                        Ok(content) => {
                            cache.insert(key.clone(), content);
                            true
                        }
                        Err(err) => {
                            warn!(key = %key, error = %err, "prefetch failed");
                            false
                        }
                    };
                    pending.lock().remove(key);
                    stored
                }
            });

            let mut report = PrefetchReport::default();
            for stored in join_all(fetches).await {
                if stored {
                    report.fetched += 1;
                } else {
                    report.failed += 1;
                }
            }
            report
        }))
    }

    /// Best-effort bulk warm-up of the Audio Service for a whole queue.
    pub fn preload_audio(&self, queue: &[StudyItem]) -> Option<JoinHandle<()>> {
        if !self.toggle.is_enabled() || !self.flags.audio_available || queue.is_empty() {
            return None;
        }

        let texts: Vec<String> = queue
            .iter()
            .map(|item| audio_search_term(item, self.charset).0)
            .filter(|text| !text.is_empty())
            .collect();
        let lang = self.charset.audio_lang();
        let audio = Arc::clone(&self.audio);
        let timeout = self.timeout;

        Some(tokio::spawn(async move {
            match with_timeout(ServiceKind::Audio, timeout, audio.preload(&texts, lang)).await {
                Ok(job) => debug!(job_id = %job.job_id, texts = texts.len(), "audio preload queued"),
                Err(err) => warn!(error = %err, "audio preload failed"),
            }
        }))
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }
}
