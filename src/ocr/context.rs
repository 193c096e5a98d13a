//! Lazily initialized, shared OCR engine handles

use super::{build_engine, EngineKind, OcrEngine, OcrResult};
use crate::config::OcrConfig;
use crate::error::Result;
use image::DynamicImage;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Shared handle to an initialized engine. The mutex is the reentrancy guard.
pub type EngineHandle = Arc<Mutex<Box<dyn OcrEngine>>>;

type EngineFactory = dyn Fn(EngineKind, &OcrConfig) -> Result<Box<dyn OcrEngine>> + Send + Sync;

/// Owns every OCR engine used by an extractor.
///
/// Each engine is created on first use and reused for every later page and
/// document. A failed initialization is not cached, so a fixed environment
/// (installed binary, downloaded model) is picked up by the next call.
pub struct EngineContext {
    config: OcrConfig,
    slots: [OnceCell<EngineHandle>; EngineKind::ALL.len()],
    factory: Box<EngineFactory>,
}

impl EngineContext {
    /// Context that builds the real backends described by `config`.
    pub fn new(config: OcrConfig) -> Self {
        Self::with_factory(config, build_engine)
    }

    /// Context with a custom engine constructor.
    pub fn with_factory<F>(config: OcrConfig, factory: F) -> Self
    where
        F: Fn(EngineKind, &OcrConfig) -> Result<Box<dyn OcrEngine>> + Send + Sync + 'static,
    {
        Self {
            config,
            slots: Default::default(),
            factory: Box::new(factory),
        }
    }

    /// Install an already constructed engine, replacing any previous one of the same kind.
    pub fn with_engine(mut self, engine: Box<dyn OcrEngine>) -> Self {
        let slot = slot_index(engine.kind());
        self.slots[slot] = OnceCell::with_value(Arc::new(Mutex::new(engine)));
        self
    }

    pub fn config(&self) -> &OcrConfig {
        &self.config
    }

    /// Return the engine for `kind`, initializing it if needed.
    pub fn handle(&self, kind: EngineKind) -> Result<EngineHandle> {
        self.slots[slot_index(kind)]
            .get_or_try_init(|| {
                let engine = (self.factory)(kind, &self.config)?;
                Ok(Arc::new(Mutex::new(engine)))
            })
            .cloned()
    }

    pub fn is_initialized(&self, kind: EngineKind) -> bool {
        self.slots[slot_index(kind)].get().is_some()
    }

    /// Initialize `kinds` up front so a missing backend fails before any document is read.
    pub fn warm_up(&self, kinds: &[EngineKind]) -> Result<()> {
        for &kind in kinds {
            self.handle(kind)?;
        }
        Ok(())
    }

    /// Run one engine on one image.
    pub fn recognize(&self, kind: EngineKind, image: &DynamicImage) -> Result<OcrResult> {
        let handle = self.handle(kind)?;
        let mut engine = handle.lock();
        engine.recognize(image)
    }
}

impl fmt::Debug for EngineContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let initialized: Vec<EngineKind> = EngineKind::ALL
            .into_iter()
            .filter(|kind| self.is_initialized(*kind))
            .collect();
        f.debug_struct("EngineContext")
            .field("config", &self.config)
            .field("initialized", &initialized)
            .finish()
    }
}

fn slot_index(kind: EngineKind) -> usize {
    kind as usize
}
