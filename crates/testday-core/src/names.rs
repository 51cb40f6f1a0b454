// Player name canonicalization and id derivation.

use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};

/// Prefix used when a name produces an empty slug.
const FALLBACK_PREFIX: &str = "player";

/// Hex characters of the name hash used in fallback ids.
const HASH_LEN: usize = 8;

/// Resolve a raw name through the alias table. Keys match exactly against
/// the trimmed input; unaliased names come back trimmed.
pub fn canonical_name(raw: &str, aliases: &HashMap<String, String>) -> String {
    let key = raw.trim();
    match aliases.get(key) {
        Some(target) => target.clone(),
        None => key.to_string(),
    }
}

/// Lower-case, hyphen-separated slug of `name`. Empty when the name has no
/// alphanumeric characters.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for ch in name.trim().chars() {
        if ch.is_alphanumeric() {
            slug.extend(ch.to_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

fn name_hash(name: &str) -> String {
    format!("{:x}", Sha256::digest(name.as_bytes()))
}

/// Stable id for a single name, ignoring any other names in the run.
pub fn player_id(name: &str) -> String {
    let slug = slugify(name);
    if slug.is_empty() {
        format!("{FALLBACK_PREFIX}-{}", &name_hash(name)[..HASH_LEN])
    } else {
        slug
    }
}

/// Hands out ids for one report. Names must be offered in a deterministic
/// order; a name whose id is already taken gets the name hash appended.
#[derive(Debug, Default)]
pub struct IdAllocator {
    taken: HashSet<String>,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self, name: &str) -> String {
        let base = player_id(name);
        if self.taken.insert(base.clone()) {
            return base;
        }

        let digest = name_hash(name);
        let stem = slugify(name);
        let stem = if stem.is_empty() { FALLBACK_PREFIX } else { stem.as_str() };
        for len in HASH_LEN..=digest.len() {
            let candidate = format!("{stem}-{}", &digest[..len]);
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
        }

        // Only reachable when the same name is offered twice.
        let mut n = 2usize;
        loop {
            let candidate = format!("{stem}-{digest}-{n}");
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
