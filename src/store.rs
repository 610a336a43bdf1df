use sha2::{Digest, Sha256};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;

/// SHA-256 of normalized page text.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    pub fn of(text: &str) -> Self {
        Self(Sha256::digest(text.as_bytes()).into())
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", &self.to_hex()[..12])
    }
}

pub fn fingerprint(text: &str) -> Fingerprint {
    Fingerprint::of(text)
}

/// Last alerted fingerprint per URL. Lives for the process only.
#[derive(Debug, Default)]
pub struct ChangeDetector {
    last_seen: HashMap<String, Fingerprint>,
}

impl ChangeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when `digest` differs from what is stored for `url` (or nothing
    /// is stored yet). A true result stores `digest` in the same step.
    pub fn has_changed_since(&mut self, url: &str, digest: Fingerprint) -> bool {
        match self.last_seen.entry(url.to_owned()) {
            Entry::Occupied(mut slot) => {
                if *slot.get() == digest {
                    false
                } else {
                    slot.insert(digest);
                    true
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(digest);
                true
            }
        }
    }

    pub fn last_fingerprint(&self, url: &str) -> Option<Fingerprint> {
        self.last_seen.get(url).copied()
    }

    pub fn tracked_urls(&self) -> usize {
        self.last_seen.len()
    }
}
