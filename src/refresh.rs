//! Two-phase refresh merging.
//!
//! Phase one replaces counts, status and classification; phase two fills in
//! image digests. Neither phase ever blanks a digest that is already known.

use std::collections::HashMap;

use crate::model::Service;

/// Copy digests from the previous snapshot into freshly described services
/// that do not carry one yet.
pub fn carry_forward_digests(fresh: &mut [Service], previous: &[Service]) {
    let known: HashMap<&str, &str> = previous
        .iter()
        .filter(|s| !s.image_digest.is_empty())
        .map(|s| (s.name.as_str(), s.image_digest.as_str()))
        .collect();
    for svc in fresh.iter_mut().filter(|s| s.image_digest.is_empty()) {
        if let Some(digest) = known.get(svc.name.as_str()) {
            svc.image_digest = digest.to_string();
        }
    }
}

/// Overwrite digests for services the enrichment resolved; everything else
/// is left untouched. Returns how many services changed.
pub fn merge_digests(current: &mut [Service], enriched: &[Service]) -> usize {
    let resolved: HashMap<&str, &str> = enriched
        .iter()
        .filter(|s| !s.image_digest.is_empty())
        .map(|s| (s.name.as_str(), s.image_digest.as_str()))
        .collect();
    let mut changed = 0;
    for svc in current.iter_mut() {
        if let Some(digest) = resolved.get(svc.name.as_str()) {
            if svc.image_digest != *digest {
                svc.image_digest = digest.to_string();
                changed += 1;
            }
        }
    }
    changed
}
