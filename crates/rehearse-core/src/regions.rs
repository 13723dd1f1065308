//! Region catalog: which regions each cloud provider offers.
//!
//! Regions come from `{provider}_regions.json` files, each a JSON array of
//! `{"name": "...", "enabled": true}` records. A provider whose file is
//! missing or unusable falls back to a short built-in list, so a session
//! can always be planned.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors reading a single region file.
#[derive(Debug, Error)]
pub enum RegionError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl RegionError {
    /// Whether the file simply does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Read { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Aws,
    Azure,
    Gcp,
    DigitalOcean,
}

impl Provider {
    /// Providers in planning order.
    pub const ALL: [Provider; 4] = [Self::Aws, Self::Azure, Self::Gcp, Self::DigitalOcean];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Aws => "aws",
            Self::Azure => "azure",
            Self::Gcp => "gcp",
            Self::DigitalOcean => "digitalocean",
        }
    }

    /// File name holding this provider's regions.
    pub fn file_name(&self) -> String {
        format!("{}_regions.json", self.as_str())
    }

    /// Built-in regions used when no region file is available.
    pub fn default_regions(&self) -> &'static [&'static str] {
        match self {
            Self::Aws => &["us-east-1", "us-west-2", "eu-west-1", "ap-southeast-1"],
            Self::Azure => &["eastus", "westus2", "northeurope", "southeastasia"],
            Self::Gcp => &["us-central1", "europe-west1", "asia-southeast1"],
            Self::DigitalOcean => &["nyc1", "sfo2", "lon1", "sgp1"],
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| {
                format!("unknown provider {s:?} (expected aws, azure, gcp, or digitalocean)")
            })
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RegionEntry {
    name: String,
    #[serde(default = "enabled_by_default")]
    enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

/// Where a provider's region list came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionSource {
    File,
    Default,
}

/// Enabled region names per provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionCatalog {
    regions: BTreeMap<Provider, (Vec<String>, RegionSource)>,
}

impl RegionCatalog {
    /// The built-in lists for every provider.
    pub fn defaults() -> Self {
        let regions = Provider::ALL
            .into_iter()
            .map(|p| (p, (owned(p.default_regions()), RegionSource::Default)))
            .collect();
        Self { regions }
    }

    /// Load every provider's file from `dir`, falling back per provider.
    pub fn load(dir: &Path) -> Self {
        let mut regions = BTreeMap::new();
        for provider in Provider::ALL {
            let path = dir.join(provider.file_name());
            let entry = match read_region_file(&path) {
                Ok(names) => (names, RegionSource::File),
                Err(e) if e.is_not_found() => {
                    tracing::debug!(
                        provider = %provider,
                        path = %path.display(),
                        "no region file; using defaults"
                    );
                    (owned(provider.default_regions()), RegionSource::Default)
                }
                Err(e) => {
                    tracing::warn!(
                        provider = %provider,
                        error = %e,
                        "unusable region file; using defaults"
                    );
                    (owned(provider.default_regions()), RegionSource::Default)
                }
            };
            regions.insert(provider, entry);
        }

        tracing::info!(
            aws = regions[&Provider::Aws].0.len(),
            azure = regions[&Provider::Azure].0.len(),
            gcp = regions[&Provider::Gcp].0.len(),
            digitalocean = regions[&Provider::DigitalOcean].0.len(),
            "loaded regions"
        );
        Self { regions }
    }

    /// Replace one provider's list.
    pub fn with_regions<I, S>(mut self, provider: Provider, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names = names.into_iter().map(Into::into).collect();
        self.regions.insert(provider, (names, RegionSource::File));
        self
    }

    /// Enabled regions for `provider`; may be empty.
    pub fn regions(&self, provider: Provider) -> &[String] {
        self.regions
            .get(&provider)
            .map(|(names, _)| names.as_slice())
            .unwrap_or(&[])
    }

    pub fn source(&self, provider: Provider) -> RegionSource {
        self.regions
            .get(&provider)
            .map(|(_, source)| *source)
            .unwrap_or(RegionSource::Default)
    }
}

impl Default for RegionCatalog {
    fn default() -> Self {
        Self::defaults()
    }
}

/// Read one region file and return its enabled region names in file order.
pub fn read_region_file(path: &Path) -> Result<Vec<String>, RegionError> {
    let text = std::fs::read_to_string(path).map_err(|source| RegionError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let entries: Vec<RegionEntry> =
        serde_json::from_str(&text).map_err(|source| RegionError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(entries
        .into_iter()
        .filter(|e| e.enabled)
        .map(|e| e.name)
        .collect())
}

fn owned(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| (*s).to_owned()).collect()
}
