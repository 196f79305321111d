pub mod arc;
pub mod base;
pub mod gdsize;
pub mod linucb;
pub mod lru;
pub mod opt;
pub mod sampling;
pub mod thompson;

pub use base::Cache;

use crate::error::Error;
use crate::policy::{SubPolicy, SubPolicyKind};
use arc::ArcCache;
use gdsize::GdSizeCache;
use linucb::LinUcbSelector;
use lru::LruCache;
use opt::OptCache;
use sampling::SamplingCache;
use thompson::ThompsonSelector;

/// Builds a cache by its command-line name, stripping a `_hybrid` suffix
/// (which enables row-key coalescing on the sample-based caches) before
/// matching the base name.
pub fn create_cache(cache_type: &str, cache_size: u64, downsample_size: u64, seed: u64) -> Result<Box<dyn Cache>, Error> {
    let cache_size = cache_size / downsample_size.max(1);
    let (base_type, hybrid) = match cache_type.strip_suffix("_hybrid") {
        Some(stripped) => (stripped, true),
        None => (cache_type, false),
    };

    let cache: Box<dyn Cache> = match base_type {
        "lru" => Box::new(LruCache::new(cache_size)),
        "opt" => Box::new(OptCache::new(cache_size)),
        "arc" => Box::new(ArcCache::new(cache_size)),
        "gdsize" => Box::new(GdSizeCache::new(cache_size)),
        "ts" => Box::new(SamplingCache::new(
            cache_size,
            hybrid,
            vec![
                SubPolicy::new(SubPolicyKind::Lru),
                SubPolicy::new(SubPolicyKind::Lfu),
                SubPolicy::new(SubPolicyKind::Hyperbolic),
            ],
            ThompsonSelector::new(3),
            seed,
            "ts",
        )),
        "linucb" => Box::new(SamplingCache::new(
            cache_size,
            hybrid,
            vec![
                SubPolicy::new(SubPolicyKind::Lru),
                SubPolicy::new(SubPolicyKind::Lfu),
                SubPolicy::new(SubPolicyKind::Hyperbolic),
            ],
            LinUcbSelector::new(3),
            seed,
            "linucb",
        )),
        "pylru" => Box::new(SamplingCache::new(
            cache_size,
            hybrid,
            vec![SubPolicy::new(SubPolicyKind::Lru)],
            ThompsonSelector::new(1),
            seed,
            "pylru",
        )),
        "pymru" => Box::new(SamplingCache::new(
            cache_size,
            hybrid,
            vec![SubPolicy::new(SubPolicyKind::Mru)],
            ThompsonSelector::new(1),
            seed,
            "pymru",
        )),
        "pylfu" => Box::new(SamplingCache::new(
            cache_size,
            hybrid,
            vec![SubPolicy::new(SubPolicyKind::Lfu)],
            ThompsonSelector::new(1),
            seed,
            "pylfu",
        )),
        "pyhb" => Box::new(SamplingCache::new(
            cache_size,
            hybrid,
            vec![SubPolicy::new(SubPolicyKind::Hyperbolic)],
            ThompsonSelector::new(1),
            seed,
            "pyhb",
        )),
        other => return Err(Error::InvalidCacheType(other.to_string())),
    };
    Ok(cache)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_cache_type_is_rejected() {
        assert!(create_cache("nonexistent", 1024, 1, 0).is_err());
    }

    #[test]
    fn known_cache_types_build() {
        for name in ["lru", "opt", "arc", "gdsize", "ts", "linucb", "pylru", "pymru", "pylfu", "pyhb", "ts_hybrid"] {
            assert!(create_cache(name, 4096, 1, 0).is_ok(), "{name} should build");
        }
    }

    #[test]
    fn cache_name_matches_the_requested_type() {
        for name in ["lru", "opt", "arc", "gdsize", "ts", "linucb", "pylru", "pymru", "pylfu", "pyhb"] {
            let cache = create_cache(name, 4096, 1, 0).unwrap();
            assert_eq!(cache.cache_name(), name);
        }
    }

    #[test]
    fn sample_based_caches_report_the_hybrid_suffix() {
        for name in ["ts", "linucb", "pylru", "pymru", "pylfu", "pyhb"] {
            let hybrid_name = format!("{name}_hybrid");
            let cache = create_cache(&hybrid_name, 4096, 1, 0).unwrap();
            assert_eq!(cache.cache_name(), hybrid_name);
        }
    }

    #[test]
    fn downsample_divides_cache_size() {
        let cache = create_cache("lru", 1000, 10, 0).unwrap();
        assert_eq!(cache.cache_size(), 100);
    }
}
