//! Content digests: `algo:hex`, e.g. `sha256:e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855`.

use boxd_shared::errors::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Digest {
    pub algo: String,
    pub hex: String,
}

impl Digest {
    /// Computes the `sha256:` digest of `bytes`.
    pub fn sha256(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        let hex = hex::encode(hasher.finalize());
        Digest { algo: "sha256".to_string(), hex }
    }

    /// The path segment this digest maps to under the content root:
    /// `<algo>/<hex>`.
    pub fn path_segment(&self) -> String {
        format!("{}/{}", self.algo, self.hex)
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algo, self.hex)
    }
}

impl FromStr for Digest {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (algo, hex) = s
            .split_once(':')
            .ok_or_else(|| CoreError::InvalidArgument(format!("digest '{s}' is missing ':'")))?;
        if algo.is_empty() || hex.is_empty() {
            return Err(CoreError::InvalidArgument(format!("digest '{s}' is malformed")));
        }
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(CoreError::InvalidArgument(format!(
                "digest '{s}' has a non-hex payload"
            )));
        }
        Ok(Digest { algo: algo.to_string(), hex: hex.to_lowercase() })
    }
}
