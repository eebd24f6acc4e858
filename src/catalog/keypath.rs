use std::fmt;

/// Address of one translatable string: a key, a locale and, for device
/// variations, the device name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyPath {
    key: String,
    locale: String,
    device: Option<String>,
}

impl KeyPath {
    pub fn new(key: impl Into<String>, locale: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            locale: locale.into(),
            device: None,
        }
    }

    pub fn with_device(
        key: impl Into<String>,
        locale: impl Into<String>,
        device: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            locale: locale.into(),
            device: Some(device.into()),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    pub fn device(&self) -> Option<&str> {
        self.device.as_deref()
    }

    /// Same key and device, addressed in another locale.
    pub fn with_locale(&self, locale: impl Into<String>) -> Self {
        Self {
            key: self.key.clone(),
            locale: locale.into(),
            device: self.device.clone(),
        }
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.device {
            Some(device) => write!(f, "'{}' [{}/{}]", self.key, self.locale, device),
            None => write!(f, "'{}' [{}]", self.key, self.locale),
        }
    }
}
