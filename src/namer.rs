//! Collision-safe document naming.
//!
//! Resolves a candidate file name against the store by probing numbered
//! variants (`base(1).ext`, `base(2).ext`, ...) until one is unused. The
//! probe is optimistic; the store's unique constraint on names is the
//! final arbiter, and the ingestor re-probes when an insert loses that
//! race.

use anyhow::Result;

use crate::store::DocumentStore;

/// Returns `candidate` unchanged if no live document holds it, otherwise
/// the first unused numbered variant.
pub async fn unique_name(store: &dyn DocumentStore, candidate: &str) -> Result<String> {
    if !store.name_exists(candidate).await? {
        return Ok(candidate.to_string());
    }

    let (stem, ext) = split_extension(candidate);
    let mut counter: u64 = 1;
    loop {
        let probe = format!("{}({}){}", stem, counter, ext);
        if !store.name_exists(&probe).await? {
            return Ok(probe);
        }
        counter += 1;
    }
}

/// Splits `name.ext` into (`name`, `.ext`). Names without an extension, or
/// with only a leading dot, keep an empty suffix.
fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(pos) if pos > 0 => name.split_at(pos),
        _ => (name, ""),
    }
}
