use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::detection::domain::asset_source::AssetSource;
use crate::detection::domain::detector::{DetectorConfig, DetectorFactory, LoadedDetector};
use crate::error::LoadError;
use crate::shared::detection::DetectorKind;

/// One optional detector per kind.
#[derive(Default)]
struct DetectorSlots {
    face: Option<LoadedDetector>,
    segmentation: Option<LoadedDetector>,
}

impl DetectorSlots {
    fn slot(&self, kind: DetectorKind) -> &Option<LoadedDetector> {
        match kind {
            DetectorKind::Face => &self.face,
            DetectorKind::Segmentation => &self.segmentation,
        }
    }

    fn slot_mut(&mut self, kind: DetectorKind) -> &mut Option<LoadedDetector> {
        match kind {
            DetectorKind::Face => &mut self.face,
            DetectorKind::Segmentation => &mut self.segmentation,
        }
    }
}

/// Process-wide holder of the detector instances.
///
/// A single mutex guards every slot. Loads and frame callbacks each hold it
/// for their full duration, so a frame never sees a detector mid-swap and a
/// detector is never dropped while a frame is using it. A panic while the
/// lock is held poisons it; the registry recovers the guard and carries on,
/// since a slot only ever holds a fully built instance or nothing.
pub struct DetectorRegistry {
    slots: Mutex<DetectorSlots>,
    factory: Box<dyn DetectorFactory>,
    next_instance_id: AtomicU64,
}

/// Locked view of the registry. Slot access is only possible through it.
pub struct RegistryGuard<'a> {
    slots: MutexGuard<'a, DetectorSlots>,
}

impl RegistryGuard<'_> {
    pub fn get(&self, kind: DetectorKind) -> Option<&LoadedDetector> {
        self.slots.slot(kind).as_ref()
    }

    pub fn get_mut(&mut self, kind: DetectorKind) -> Option<&mut LoadedDetector> {
        self.slots.slot_mut(kind).as_mut()
    }

    pub fn is_loaded(&self, kind: DetectorKind) -> bool {
        self.get(kind).is_some()
    }
}

impl DetectorRegistry {
    pub fn new(factory: Box<dyn DetectorFactory>) -> Self {
        Self {
            slots: Mutex::new(DetectorSlots::default()),
            factory,
            next_instance_id: AtomicU64::new(1),
        }
    }

    pub fn lock(&self) -> RegistryGuard<'_> {
        RegistryGuard {
            slots: self.slots.lock().unwrap_or_else(PoisonError::into_inner),
        }
    }

    /// Builds a new `kind` detector and swaps it into its slot.
    ///
    /// The lock is held across construction. On failure the previous
    /// instance, if any, stays in place untouched.
    pub fn load(
        &self,
        kind: DetectorKind,
        source: &dyn AssetSource,
        config: &DetectorConfig,
    ) -> Result<u64, LoadError> {
        let mut guard = self.lock();
        let engine = self.factory.build(kind, source, config)?;
        let instance_id = self.next_instance_id.fetch_add(1, Ordering::Relaxed);
        let previous = guard
            .slots
            .slot_mut(kind)
            .replace(LoadedDetector::new(kind, instance_id, engine));
        match previous {
            Some(old) => log::info!(
                "Replaced {kind} detector {} with {instance_id} from {}",
                old.instance_id(),
                source.describe()
            ),
            None => log::info!(
                "Loaded {kind} detector {instance_id} from {}",
                source.describe()
            ),
        }
        Ok(instance_id)
    }

    /// Drops every loaded detector. Safe to call repeatedly.
    pub fn teardown(&self) {
        let mut guard = self.lock();
        for kind in DetectorKind::ALL {
            if let Some(old) = guard.slots.slot_mut(kind).take() {
                log::debug!("Released {kind} detector {}", old.instance_id());
            }
        }
    }

    pub fn is_loaded(&self, kind: DetectorKind) -> bool {
        self.lock().is_loaded(kind)
    }

    pub fn instance_id(&self, kind: DetectorKind) -> Option<u64> {
        self.lock().get(kind).map(LoadedDetector::instance_id)
    }

    pub fn loaded_kinds(&self) -> Vec<DetectorKind> {
        let guard = self.lock();
        DetectorKind::ALL
            .into_iter()
            .filter(|&kind| guard.is_loaded(kind))
            .collect()
    }
}
