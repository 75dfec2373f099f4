//! Collapses listings that describe the same physical ad.

use std::collections::HashMap;

use super::domain::Listing;

/// One entry per logical listing, grouped by URL when present, else by id.
/// Ties keep the higher trust score, then the newer fetch, then the first
/// seen. Single left-to-right pass; output preserves first-encounter order.
pub fn dedupe(listings: Vec<Listing>) -> Vec<Listing> {
    let mut kept: Vec<Listing> = Vec::with_capacity(listings.len());
    let mut index_by_key: HashMap<String, usize> = HashMap::with_capacity(listings.len());

    for candidate in listings {
        let key = candidate
            .url
            .clone()
            .unwrap_or_else(|| candidate.id.clone());

        match index_by_key.get(&key) {
            Some(&slot) => {
                if prefer(&candidate, &kept[slot]) {
                    kept[slot] = candidate;
                }
            }
            None => {
                index_by_key.insert(key, kept.len());
                kept.push(candidate);
            }
        }
    }

    kept
}

fn prefer(candidate: &Listing, incumbent: &Listing) -> bool {
    if candidate.trust_score != incumbent.trust_score {
        return candidate.trust_score > incumbent.trust_score;
    }
    match (candidate.fetched_at, incumbent.fetched_at) {
        (Some(newer), Some(older)) => newer > older,
        (Some(_), None) => true,
        _ => false,
    }
}
