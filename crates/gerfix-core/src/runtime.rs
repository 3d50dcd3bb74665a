//! State shared between fix callbacks.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::DisplayMetrics;

/// Shared context handed to every fix controller at construction time.
///
/// `metrics` is immutable after construction. `movie_playing` has exactly
/// one writer (the file-read detour, on whichever host thread streams the
/// movie) and one reader (the resolution callback, on the render thread).
/// Loads and stores are `Relaxed` on purpose: the flag being stale by one
/// frame or IO chunk is harmless, while a lock or stronger ordering could
/// delay its visibility across the frame where playback starts and bring
/// back the stretched transition frame.
#[derive(Debug)]
pub struct FixRuntime {
    pub metrics: DisplayMetrics,
    movie_playing: AtomicBool,
}

impl FixRuntime {
    pub fn new(metrics: DisplayMetrics) -> Self {
        Self {
            metrics,
            movie_playing: AtomicBool::new(false),
        }
    }

    pub fn movie_playing(&self) -> bool {
        self.movie_playing.load(Ordering::Relaxed)
    }

    pub fn set_movie_playing(&self, playing: bool) {
        self.movie_playing.store(playing, Ordering::Relaxed);
    }
}
