//! Encryption key entry form.
//!
//! One of three mutually exclusive sub-forms is active, chosen by the device
//! profile. Length rules are checked when a field loses focus, not on every
//! keystroke.
//!
//! 加密密钥输入表单：按设备 profile 选择子表单，失焦时校验。

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use zeroize::Zeroize;

use super::validation::{
    validate_gpk_key, validate_mep_key, validate_optical_key, GpkSlot, ValidationError,
};
use crate::device::{DeviceProfile, KeyFormKind};
use crate::security::SecretString;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum KeyField {
    Optical,
    Mep,
    Gpk60,
    Gpk61,
}

/// Keys handed to `setEncryptionKey`. Unused slots are empty.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct EncryptionKeys {
    pub mep_key: SecretString,
    pub gpk60: SecretString,
    pub gpk61: SecretString,
    pub optical_key: SecretString,
}

/// Typed key values. Wiped on overwrite and on drop.
#[derive(Clone, Default, PartialEq, Eq)]
#[cfg_attr(test, derive(Debug))]
struct KeyDrafts {
    optical: String,
    mep: String,
    gpk60: String,
    gpk61: String,
}

impl KeyDrafts {
    fn get(&self, field: KeyField) -> &str {
        match field {
            KeyField::Optical => &self.optical,
            KeyField::Mep => &self.mep,
            KeyField::Gpk60 => &self.gpk60,
            KeyField::Gpk61 => &self.gpk61,
        }
    }

    fn get_mut(&mut self, field: KeyField) -> &mut String {
        match field {
            KeyField::Optical => &mut self.optical,
            KeyField::Mep => &mut self.mep,
            KeyField::Gpk60 => &mut self.gpk60,
            KeyField::Gpk61 => &mut self.gpk61,
        }
    }

    fn set(&mut self, field: KeyField, value: String) {
        let slot = self.get_mut(field);
        slot.zeroize();
        *slot = value;
    }

    fn wipe(&mut self) {
        self.optical.zeroize();
        self.mep.zeroize();
        self.gpk60.zeroize();
        self.gpk61.zeroize();
    }
}

impl Drop for KeyDrafts {
    fn drop(&mut self) {
        self.wipe();
    }
}

#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct EncryptionKeyForm {
    kind: KeyFormKind,
    #[serde(skip)]
    drafts: KeyDrafts,
    errors: BTreeMap<KeyField, ValidationError>,
}

impl EncryptionKeyForm {
    pub fn for_profile(profile: DeviceProfile) -> Self {
        Self::new(profile.key_form())
    }

    pub fn new(kind: KeyFormKind) -> Self {
        Self {
            kind,
            drafts: KeyDrafts::default(),
            errors: BTreeMap::new(),
        }
    }

    pub fn kind(&self) -> KeyFormKind {
        self.kind
    }

    /// Fields rendered by the active sub-form.
    pub fn fields(&self) -> &'static [KeyField] {
        match self.kind {
            KeyFormKind::Optical => &[KeyField::Optical],
            KeyFormKind::Mep => &[KeyField::Mep],
            KeyFormKind::Gpk => &[KeyField::Gpk60, KeyField::Gpk61],
            KeyFormKind::NoKey => &[],
        }
    }

    pub fn has_field(&self, field: KeyField) -> bool {
        self.fields().contains(&field)
    }

    /// Update a draft. Returns false when the field is not part of this form.
    pub fn edit(&mut self, field: KeyField, value: String) -> bool {
        if !self.has_field(field) {
            return false;
        }
        self.drafts.set(field, value);
        true
    }

    /// Validate one field as it loses focus.
    pub fn blur(&mut self, field: KeyField) {
        if !self.has_field(field) {
            return;
        }
        let value = self.drafts.get(field);
        let result = match field {
            KeyField::Mep => validate_mep_key(value),
            KeyField::Gpk60 => validate_gpk_key(GpkSlot::Gpk60, value),
            KeyField::Gpk61 => validate_gpk_key(GpkSlot::Gpk61, value),
            // Optical keys are only checked for presence at submit time.
            KeyField::Optical => Ok(()),
        };
        match result {
            Ok(()) => {
                self.errors.remove(&field);
            }
            Err(err) => {
                self.errors.insert(field, err);
            }
        }
    }

    /// Validate every field of the active sub-form; true when submittable.
    pub fn validate_all(&mut self) -> bool {
        for &field in self.fields() {
            self.blur(field);
        }
        if self.kind == KeyFormKind::Optical {
            match validate_optical_key(&self.drafts.optical) {
                Ok(()) => {
                    self.errors.remove(&KeyField::Optical);
                }
                Err(err) => {
                    self.errors.insert(KeyField::Optical, err);
                }
            }
        }
        self.errors.is_empty()
    }

    pub fn error(&self, field: KeyField) -> Option<&ValidationError> {
        self.errors.get(&field)
    }

    pub fn errors(&self) -> impl Iterator<Item = (KeyField, &ValidationError)> {
        self.errors.iter().map(|(field, err)| (*field, err))
    }

    pub fn value(&self, field: KeyField) -> &str {
        self.drafts.get(field)
    }

    /// Keys to submit: populated drafts, everything else empty.
    pub fn to_keys(&self) -> EncryptionKeys {
        let pick = |field: KeyField| {
            if self.has_field(field) {
                SecretString::new(self.drafts.get(field).to_string())
            } else {
                SecretString::empty()
            }
        };
        EncryptionKeys {
            mep_key: pick(KeyField::Mep),
            gpk60: pick(KeyField::Gpk60),
            gpk61: pick(KeyField::Gpk61),
            optical_key: pick(KeyField::Optical),
        }
    }
}

impl fmt::Debug for EncryptionKeyForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptionKeyForm")
            .field("kind", &self.kind)
            .field("errors", &self.errors)
            .finish_non_exhaustive()
    }
}
