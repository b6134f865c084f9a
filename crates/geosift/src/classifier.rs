//! Classifier hierarchy lookups and the linear-category gate.
//!
//! Category type codes are opaque to the ranking core except for their
//! first (coarse) level, which decides whether two equally named features
//! can be fragments of one road.

use std::fmt;

use itertools::Itertools;
use once_cell::sync::OnceCell;
use tracing::{debug, warn};

/// Coarse categories whose features are indexed as polyline fragments.
pub const DEFAULT_LINEAR_CATEGORIES: &[&str] = &["highway"];

/// Read access to the feature-type taxonomy.
pub trait ClassifierHierarchy: Send + Sync {
    /// Index of the top-level node `category_type` descends from.
    ///
    /// Returns `None` when the code does not encode a valid first level.
    fn coarse_index_of(&self, category_type: u32) -> Option<u8>;

    /// Index of the top-level node called `name`, if the taxonomy has one.
    fn coarse_index_by_name(&self, name: &str) -> Option<u8>;
}

/// In-memory taxonomy keyed by top-level category name.
///
/// Type codes carry `coarse_index + 1` in the top byte, so the zero code
/// never names a category, and an opaque subtype in the low 24 bits.
#[derive(Debug, Clone)]
pub struct Classificator {
    root: Vec<String>,
}

impl Classificator {
    const SUBTYPE_BITS: u32 = 24;
    const SUBTYPE_MASK: u32 = (1 << Self::SUBTYPE_BITS) - 1;

    /// Build the taxonomy from its top-level category names.
    ///
    /// Names are sorted and deduplicated; indices follow that order.
    pub fn new<I, S>(root: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let root = root
            .into_iter()
            .map(Into::into)
            .sorted()
            .dedup()
            .take(usize::from(u8::MAX))
            .collect();
        Self { root }
    }

    /// Type code for `subtype` under the coarse category `coarse`.
    pub fn type_code(&self, coarse: &str, subtype: u32) -> Option<u32> {
        let index = self.coarse_index_by_name(coarse)?;
        Some(((u32::from(index) + 1) << Self::SUBTYPE_BITS) | (subtype & Self::SUBTYPE_MASK))
    }

    pub fn coarse_name(&self, index: u8) -> Option<&str> {
        self.root.get(usize::from(index)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.root.len()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }
}

impl ClassifierHierarchy for Classificator {
    fn coarse_index_of(&self, category_type: u32) -> Option<u8> {
        let level = category_type >> Self::SUBTYPE_BITS;
        let index = u8::try_from(level.checked_sub(1)?).ok()?;
        (usize::from(index) < self.root.len()).then_some(index)
    }

    fn coarse_index_by_name(&self, name: &str) -> Option<u8> {
        self.root
            .binary_search_by(|probe| probe.as_str().cmp(name))
            .ok()
            .and_then(|i| u8::try_from(i).ok())
    }
}

/// Lazily resolved set of coarse indices treated as linear.
///
/// The names are resolved against the hierarchy on first use and cached for
/// the lifetime of the gate. Concurrent first callers block until the single
/// initialization finishes.
pub struct LinearCategoryGate {
    names: Vec<String>,
    indices: OnceCell<Vec<u8>>,
}

impl LinearCategoryGate {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            indices: OnceCell::new(),
        }
    }

    pub fn is_linear(&self, hierarchy: &dyn ClassifierHierarchy, coarse_index: u8) -> bool {
        self.resolve(hierarchy).contains(&coarse_index)
    }

    /// Resolved indices, initializing them on the first call.
    pub fn resolve(&self, hierarchy: &dyn ClassifierHierarchy) -> &[u8] {
        self.indices.get_or_init(|| {
            let indices = self
                .names
                .iter()
                .filter_map(|name| {
                    let index = hierarchy.coarse_index_by_name(name);
                    if index.is_none() {
                        warn!(category = %name, "Linear category not present in classifier");
                    }
                    index
                })
                .collect::<Vec<_>>();
            debug!(?indices, "Resolved linear coarse categories");
            indices
        })
    }

    pub fn is_initialized(&self) -> bool {
        self.indices.get().is_some()
    }
}

impl Default for LinearCategoryGate {
    fn default() -> Self {
        Self::new(DEFAULT_LINEAR_CATEGORIES.iter().copied())
    }
}

impl fmt::Debug for LinearCategoryGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinearCategoryGate")
            .field("names", &self.names)
            .field("indices", &self.indices.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn classificator() -> Classificator {
        Classificator::new(["place", "amenity", "highway", "waterway"])
    }

    #[test]
    fn test_type_codes_round_trip_through_coarse_index() {
        let c = classificator();
        let primary = c.type_code("highway", 7).unwrap();
        let cafe = c.type_code("amenity", 7).unwrap();

        assert_eq!(c.coarse_index_of(primary), c.coarse_index_by_name("highway"));
        assert_ne!(c.coarse_index_of(primary), c.coarse_index_of(cafe));
        assert_eq!(c.coarse_name(c.coarse_index_of(cafe).unwrap()), Some("amenity"));
        assert!(c.type_code("railway", 1).is_none());
    }

    #[test]
    fn test_root_names_are_sorted_and_deduplicated() {
        let c = Classificator::new(["place", "amenity", "place", "highway"]);
        assert_eq!(c.len(), 3);
        assert!(!c.is_empty());
        assert_eq!(c.coarse_name(0), Some("amenity"));
        assert_eq!(c.coarse_name(2), Some("place"));
        assert!(Classificator::new(Vec::<String>::new()).is_empty());
    }

    #[test]
    fn test_malformed_codes_have_no_coarse_index() {
        let c = classificator();
        assert_eq!(c.coarse_index_of(0), None);
        assert_eq!(c.coarse_index_of(0x00ff_ffff), None);
        assert_eq!(c.coarse_index_of(0x2000_0000), None);
    }

    #[test]
    fn test_gate_flags_only_linear_categories() {
        let c = classificator();
        let gate = LinearCategoryGate::default();
        assert!(!gate.is_initialized());

        let highway = c.coarse_index_by_name("highway").unwrap();
        let place = c.coarse_index_by_name("place").unwrap();
        assert!(gate.is_linear(&c, highway));
        assert!(!gate.is_linear(&c, place));
        assert!(gate.is_initialized());
    }

    #[test]
    fn test_gate_ignores_unknown_names() {
        let c = classificator();
        let gate = LinearCategoryGate::new(["railway", "waterway"]);
        assert_eq!(gate.resolve(&c), &[c.coarse_index_by_name("waterway").unwrap()]);
    }

    struct CountingHierarchy {
        inner: Classificator,
        lookups: AtomicUsize,
    }

    impl ClassifierHierarchy for CountingHierarchy {
        fn coarse_index_of(&self, category_type: u32) -> Option<u8> {
            self.inner.coarse_index_of(category_type)
        }

        fn coarse_index_by_name(&self, name: &str) -> Option<u8> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            self.inner.coarse_index_by_name(name)
        }
    }

    #[test]
    fn test_gate_initializes_exactly_once_under_contention() {
        let hierarchy = CountingHierarchy {
            inner: classificator(),
            lookups: AtomicUsize::new(0),
        };
        let gate = LinearCategoryGate::default();
        let highway = hierarchy.inner.coarse_index_by_name("highway").unwrap();

        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| assert!(gate.is_linear(&hierarchy, highway)));
            }
        });

        assert_eq!(hierarchy.lookups.load(Ordering::SeqCst), 1);
    }
}
