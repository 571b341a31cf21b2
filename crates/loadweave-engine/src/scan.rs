// Existing-resource scanner / deduplicator
//
// Before any load is issued, resources already present in the
// environment are matched by normalized URL and removed from the
// candidate list so they are never requested again.

use tracing::debug;

use loadweave_types::{normalize, NormalizerConfig, ResourceDescriptor, UnitId};

use crate::environment::Environment;

/// A candidate that matched a resource already present in the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedResource {
    pub descriptor: ResourceDescriptor,
    /// The pre-existing resource's stable id, freshly assigned when the
    /// environment reported none.
    pub assigned_id: UnitId,
}

/// Match candidates against resources already present in the environment.
///
/// Side effect: `candidates` is mutated in place, matched entries are
/// removed. Pre-existing resources without an id get one assigned and
/// adopted into the environment so later scans report it.
pub fn scan(
    candidates: &mut Vec<ResourceDescriptor>,
    environment: &dyn Environment,
    config: &NormalizerConfig,
    id_length: usize,
) -> Vec<MatchedResource> {
    let mut matched = Vec::new();

    for present in environment.scan_existing() {
        let normalized = normalize(&present.url, config);
        let position = candidates
            .iter()
            .position(|candidate| candidate.normalized_url() == normalized);
        let Some(position) = position else {
            continue;
        };

        let descriptor = candidates.remove(position);
        let assigned_id = match present.existing_id {
            Some(id) => id,
            None => {
                let id = environment.assign_id(id_length);
                environment.adopt_existing(&present.url, &id);
                id
            }
        };
        debug!(url = %descriptor.normalized_url(), id = %assigned_id, "deduplicated pre-existing resource");
        matched.push(MatchedResource {
            descriptor,
            assigned_id,
        });
    }

    matched
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockEnvironment;

    fn descriptors(urls: &[&str], cfg: &NormalizerConfig) -> Vec<ResourceDescriptor> {
        urls.iter()
            .map(|url| ResourceDescriptor::new(*url, cfg))
            .collect()
    }

    #[test]
    fn test_no_overlap_keeps_every_candidate() {
        let env = MockEnvironment::new();
        let cfg = env.base();
        let mut candidates = descriptors(&["a.js", "b.css"], &cfg);

        let matched = scan(&mut candidates, env.as_ref(), &cfg, 8);

        assert!(matched.is_empty());
        assert_eq!(candidates.len(), 2);
    }

    #[test]
    fn test_overlap_is_removed_and_matched() {
        let env = MockEnvironment::new();
        env.add_existing("a.js", Some(UnitId::new("pre_a")));
        let cfg = env.base();
        let mut candidates = descriptors(&["a.js", "b.css"], &cfg);

        let matched = scan(&mut candidates, env.as_ref(), &cfg, 8);

        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].assigned_id, UnitId::new("pre_a"));
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].url(), "b.css");
    }

    #[test]
    fn test_unidentified_existing_resource_gets_adopted() {
        let env = MockEnvironment::new();
        env.add_existing("a.js", None);
        let cfg = env.base();
        let mut candidates = descriptors(&["a.js"], &cfg);

        let matched = scan(&mut candidates, env.as_ref(), &cfg, 8);

        assert_eq!(matched.len(), 1);
        let adopted = env.adopted();
        assert_eq!(adopted.len(), 1);
        assert_eq!(adopted[0].0, "a.js");
        assert_eq!(adopted[0].1, matched[0].assigned_id);

        // The id now sticks: a second scan reports it.
        let rescanned = env.scan_existing();
        assert_eq!(rescanned[0].existing_id, Some(matched[0].assigned_id.clone()));
    }

    #[test]
    fn test_matching_uses_normalized_urls() {
        let env =
            MockEnvironment::with_base(NormalizerConfig::new().with_host("cdn.example.org"));
        env.add_existing("https://cdn.example.org/a.js", Some(UnitId::new("pre_a")));
        let cfg = env.base();
        // Spelled relative, but normalizes to the same URL.
        let mut candidates = descriptors(&["a.js"], &cfg);

        let matched = scan(&mut candidates, env.as_ref(), &cfg, 8);

        assert_eq!(matched.len(), 1);
        assert!(candidates.is_empty());
    }
}
