//! Effect settings: the host-owned parameter bag passed into every call.
//!
//! [`EffectSettings`] holds one slot per parameter declared by the kernel
//! (see [`ParameterSpec`]) plus the generic active/bypassed flag. Settings are
//! plain values: the host owns them, copies them for undo snapshots, and
//! persists them as opaque blobs through [`EffectSettings::to_blob`].
//!
//! # Example
//!
//! ```ignore
//! const GAIN: ParameterId = 0;
//! static SPECS: &[ParameterSpec] = &[ParameterSpec::new(GAIN, "Gain", 0.0, -60.0, 12.0)];
//!
//! let mut settings = EffectSettings::from_specs(SPECS);
//! settings.set(GAIN, -6.0);
//! assert_eq!(settings.get(GAIN), Some(-6.0));
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{ProcessorError, ProcessorResult};
use crate::types::{ParameterId, ParameterValue};

/// Declaration of one kernel parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterSpec {
    /// Parameter identifier, unique within one kernel.
    pub id: ParameterId,
    /// Display name.
    pub name: &'static str,
    /// Default plain value.
    pub default: ParameterValue,
    /// Lowest accepted plain value.
    pub min: ParameterValue,
    /// Highest accepted plain value.
    pub max: ParameterValue,
}

impl ParameterSpec {
    /// Declare a parameter.
    pub const fn new(
        id: ParameterId,
        name: &'static str,
        default: ParameterValue,
        min: ParameterValue,
        max: ParameterValue,
    ) -> Self {
        Self {
            id,
            name,
            default,
            min,
            max,
        }
    }

    /// Clamp a plain value into this parameter's range.
    #[inline]
    pub fn clamp(&self, value: ParameterValue) -> ParameterValue {
        if value.is_nan() {
            return self.default;
        }
        value.clamp(self.min, self.max)
    }
}

/// One stored parameter value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ParameterSlot {
    /// Parameter identifier.
    pub id: ParameterId,
    /// Current plain value.
    pub value: ParameterValue,
    #[serde(skip)]
    min: ParameterValue,
    #[serde(skip)]
    max: ParameterValue,
}

/// Opaque, copyable parameter bag with an active/bypassed flag.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EffectSettings {
    slots: Vec<ParameterSlot>,
    active: bool,
}

impl EffectSettings {
    /// Settings without parameters (active).
    pub fn empty() -> Self {
        Self {
            slots: Vec::new(),
            active: true,
        }
    }

    /// Settings holding each parameter's default value (active).
    pub fn from_specs(specs: &[ParameterSpec]) -> Self {
        Self {
            slots: specs
                .iter()
                .map(|spec| ParameterSlot {
                    id: spec.id,
                    value: spec.default,
                    min: spec.min,
                    max: spec.max,
                })
                .collect(),
            active: true,
        }
    }

    /// Number of parameter slots.
    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the settings hold no parameters.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Get a parameter's plain value.
    #[inline]
    pub fn get(&self, id: ParameterId) -> Option<ParameterValue> {
        self.slots.iter().find(|s| s.id == id).map(|s| s.value)
    }

    /// Get a parameter's value, falling back to `default` when absent.
    #[inline]
    pub fn get_or(&self, id: ParameterId, default: ParameterValue) -> ParameterValue {
        self.get(id).unwrap_or(default)
    }

    /// Set a parameter's plain value, clamped to its range.
    ///
    /// Returns `false` if the parameter is not part of these settings.
    pub fn set(&mut self, id: ParameterId, value: ParameterValue) -> bool {
        match self.slots.iter_mut().find(|s| s.id == id) {
            Some(slot) => {
                slot.value = if value.is_nan() {
                    slot.value
                } else {
                    value.clamp(slot.min, slot.max)
                };
                true
            }
            None => false,
        }
    }

    /// Whether the effect is active (not bypassed).
    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Enable or bypass the effect.
    #[inline]
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Slots in declaration order.
    pub fn slots(&self) -> &[ParameterSlot] {
        &self.slots
    }

    /// Whether `other` has the same parameter ids in the same order.
    pub fn same_layout(&self, other: &EffectSettings) -> bool {
        self.slots.len() == other.slots.len()
            && self
                .slots
                .iter()
                .zip(other.slots.iter())
                .all(|(a, b)| a.id == b.id)
    }

    /// Copy values and the active flag from `other` without allocating.
    ///
    /// Returns `false` (leaving `self` untouched) if the layouts differ.
    pub fn copy_from(&mut self, other: &EffectSettings) -> bool {
        if !self.same_layout(other) {
            return false;
        }
        for (dst, src) in self.slots.iter_mut().zip(other.slots.iter()) {
            dst.value = src.value;
        }
        self.active = other.active;
        true
    }

    /// Overwrite the value at a slot index, bypassing range checks.
    ///
    /// Only used to restore values that were already clamped on publish.
    #[inline]
    pub(crate) fn store_raw(&mut self, index: usize, value: ParameterValue) {
        if let Some(slot) = self.slots.get_mut(index) {
            slot.value = value;
        }
    }

    /// Encode as an opaque blob for persistence.
    pub fn to_blob(&self) -> ProcessorResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode a blob into settings laid out per `specs`.
    ///
    /// Unknown ids in the blob are ignored; parameters missing from the blob
    /// keep their defaults. Values are clamped to each parameter's range.
    pub fn from_blob(specs: &[ParameterSpec], data: &[u8]) -> ProcessorResult<Self> {
        let stored: StoredSettings = serde_json::from_slice(data)?;
        let mut settings = Self::from_specs(specs);
        let mut matched = 0usize;
        for slot in &stored.slots {
            if settings.set(slot.id, slot.value) {
                matched += 1;
            } else {
                log::debug!("Ignoring unknown parameter {} in settings blob", slot.id);
            }
        }
        if matched == 0 && !stored.slots.is_empty() && !specs.is_empty() {
            return Err(ProcessorError::SettingsLayout(
                "blob shares no parameters with the effect".to_string(),
            ));
        }
        settings.active = stored.active;
        Ok(settings)
    }
}

/// Wire form of a blob; ranges come from the specs, not the blob.
#[derive(Deserialize)]
struct StoredSettings {
    slots: Vec<StoredSlot>,
    active: bool,
}

#[derive(Deserialize)]
struct StoredSlot {
    id: ParameterId,
    value: ParameterValue,
}

impl Default for EffectSettings {
    fn default() -> Self {
        Self::empty()
    }
}
