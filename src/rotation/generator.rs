use anyhow::{bail, Context, Result};
use base64::{engine::general_purpose, Engine};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::config::GeneratorSettings;

const ALPHANUMERIC: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
// Largest multiple of 62 that fits in a byte; bytes above it are rejected to avoid bias
const ALPHANUMERIC_CUTOFF: u8 = 248;

/// Character set of generated secrets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alphabet {
    #[default]
    Alphanumeric,
    Hex,
    UrlSafeBase64,
}

/// Source of fresh secret values.
pub trait SecretGenerator: Send + Sync {
    fn generate(&self) -> Result<String>;
}

/// Token generator backed by the operating system CSPRNG.
#[derive(Debug, Clone)]
pub struct RandomTokenGenerator {
    length: usize,
    alphabet: Alphabet,
}

impl RandomTokenGenerator {
    pub fn new(length: usize, alphabet: Alphabet) -> Result<Self> {
        if length == 0 {
            bail!("token length must be greater than zero");
        }
        Ok(Self { length, alphabet })
    }

    pub fn from_settings(settings: &GeneratorSettings) -> Result<Self> {
        Self::new(settings.length, settings.alphabet)
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn alphabet(&self) -> Alphabet {
        self.alphabet
    }

    fn random_bytes(n: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; n];
        OsRng
            .try_fill_bytes(&mut buf)
            .context("reading from OS random source")?;
        Ok(buf)
    }

    fn alphanumeric(&self) -> Result<String> {
        let mut out = String::with_capacity(self.length);
        while out.len() < self.length {
            let chunk = Self::random_bytes(self.length - out.len() + 8)?;
            for b in chunk {
                if b < ALPHANUMERIC_CUTOFF {
                    out.push(ALPHANUMERIC[(b % 62) as usize] as char);
                    if out.len() == self.length {
                        break;
                    }
                }
            }
        }
        Ok(out)
    }

    fn hex(&self) -> Result<String> {
        let bytes = Self::random_bytes(self.length.div_ceil(2))?;
        let mut out: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
        out.truncate(self.length);
        Ok(out)
    }

    fn url_safe_base64(&self) -> Result<String> {
        let bytes = Self::random_bytes((self.length * 3).div_ceil(4))?;
        let mut out = general_purpose::URL_SAFE_NO_PAD.encode(bytes);
        out.truncate(self.length);
        Ok(out)
    }
}

impl Default for RandomTokenGenerator {
    fn default() -> Self {
        Self {
            length: 32,
            alphabet: Alphabet::Alphanumeric,
        }
    }
}

impl SecretGenerator for RandomTokenGenerator {
    fn generate(&self) -> Result<String> {
        match self.alphabet {
            Alphabet::Alphanumeric => self.alphanumeric(),
            Alphabet::Hex => self.hex(),
            Alphabet::UrlSafeBase64 => self.url_safe_base64(),
        }
    }
}
