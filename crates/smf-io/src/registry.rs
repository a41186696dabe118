//! Explicit registry of encodings.

use std::io::{Read, Seek, SeekFrom};

use thiserror::Error;

use smf_core::{FormatVersion, ParserEvents, SmfError};

use crate::format::BinaryFormat;
use crate::traits::{FormatDescription, FormatProvider};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    #[error("A format named {0} is already registered")]
    Duplicate(String),
    #[error("No format is registered under the name {0}")]
    UnknownName(String),
    #[error("No format is registered for the suffix {0}")]
    UnknownSuffix(String),
    #[error("No registered format recognized the stream")]
    Unrecognized,
    #[error("IO error: {0}")]
    Io(String),
    #[error(transparent)]
    Format(#[from] SmfError),
}

impl From<std::io::Error> for RegistryError {
    fn from(e: std::io::Error) -> Self {
        RegistryError::Io(e.to_string())
    }
}

/// Result of a successful probe.
#[derive(Clone, Copy)]
pub struct Probed<'r> {
    pub provider: &'r dyn FormatProvider,
    pub version: FormatVersion,
}

impl std::fmt::Debug for Probed<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Probed")
            .field("format", &self.provider.format())
            .field("version", &self.version)
            .finish()
    }
}

/// Encodings available to a caller. Nothing is registered implicitly.
#[derive(Default)]
pub struct FormatRegistry {
    providers: Vec<Box<dyn FormatProvider>>,
}

impl FormatRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every encoding this crate implements.
    pub fn with_builtin() -> Self {
        Self {
            providers: vec![Box::new(BinaryFormat)],
        }
    }

    pub fn register(&mut self, provider: Box<dyn FormatProvider>) -> Result<(), RegistryError> {
        let name = provider.format().name;
        if self.providers.iter().any(|p| p.format().name == name) {
            return Err(RegistryError::Duplicate(name.to_string()));
        }
        log::debug!("registered format {}", provider.format());
        self.providers.push(provider);
        Ok(())
    }

    pub fn formats(&self) -> impl Iterator<Item = FormatDescription> + '_ {
        self.providers.iter().map(|p| p.format())
    }

    pub fn by_name(&self, name: &str) -> Result<&dyn FormatProvider, RegistryError> {
        self.providers
            .iter()
            .find(|p| p.format().name == name)
            .map(|p| p.as_ref())
            .ok_or_else(|| RegistryError::UnknownName(name.to_string()))
    }

    /// Finds a provider by file suffix, with or without the leading dot.
    pub fn by_suffix(&self, suffix: &str) -> Result<&dyn FormatProvider, RegistryError> {
        let bare = suffix.trim_start_matches('.');
        self.providers
            .iter()
            .find(|p| p.format().suffix.eq_ignore_ascii_case(bare))
            .map(|p| p.as_ref())
            .ok_or_else(|| RegistryError::UnknownSuffix(suffix.to_string()))
    }

    /// Asks each provider in registration order to identify `prefix`.
    pub fn probe(&self, prefix: &[u8]) -> Result<Probed<'_>, RegistryError> {
        for provider in &self.providers {
            if let Some(version) = provider.probe(prefix)? {
                log::debug!("probed {} version {}", provider.format(), version);
                return Ok(Probed {
                    provider: provider.as_ref(),
                    version,
                });
            }
        }
        Err(RegistryError::Unrecognized)
    }

    fn probe_length(&self) -> usize {
        self.providers
            .iter()
            .map(|p| p.probe_length())
            .max()
            .unwrap_or(0)
    }

    /// Probes a seekable stream and rewinds it to where it was.
    pub fn probe_stream<R: Read + Seek>(
        &self,
        reader: &mut R,
    ) -> Result<Probed<'_>, RegistryError> {
        let start = reader.stream_position()?;
        let mut prefix = Vec::with_capacity(self.probe_length());
        reader
            .by_ref()
            .take(self.probe_length() as u64)
            .read_to_end(&mut prefix)?;
        reader.seek(SeekFrom::Start(start))?;
        self.probe(&prefix)
    }

    /// Probes `reader` and parses it with the matching provider.
    pub fn parse<R: Read + Seek>(
        &self,
        reader: &mut R,
        source: Option<&str>,
        events: &mut dyn ParserEvents,
    ) -> Result<FormatDescription, RegistryError> {
        let probed = self.probe_stream(reader)?;
        probed.provider.parse(reader, source, events)?;
        Ok(probed.provider.format())
    }
}
