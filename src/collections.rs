// Copyright 2018-2024 the Deno authors. MIT license.

use indexmap::IndexSet;

/// Set of items seen during a pass, in the order they were first added.
#[derive(Debug, Clone)]
pub struct IncludedSet<T: std::hash::Hash + Eq + Clone> {
  inner: IndexSet<T>,
}

impl<T: std::hash::Hash + Eq + Clone> Default for IncludedSet<T> {
  fn default() -> Self {
    Self {
      inner: Default::default(),
    }
  }
}

impl<T: std::hash::Hash + Eq + Clone> IncludedSet<T> {
  pub fn has_seen(&self, item: &T) -> bool {
    self.inner.contains(item)
  }

  /// Adds the item, returning `false` if it was already seen.
  pub fn add(&mut self, item: T) -> bool {
    self.inner.insert(item)
  }

  pub fn len(&self) -> usize {
    self.inner.len()
  }

  pub fn is_empty(&self) -> bool {
    self.inner.is_empty()
  }

  /// Gets the items added after the set held `len` items.
  pub fn added_since(&self, len: usize) -> impl Iterator<Item = &T> {
    self.inner.iter().skip(len)
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn tracks_seen_items_in_order() {
    let mut set = IncludedSet::default();
    assert!(set.is_empty());
    assert!(set.add("a"));
    assert!(!set.add("a"));
    assert!(set.has_seen(&"a"));
    assert!(!set.has_seen(&"b"));
    let len = set.len();
    assert!(set.add("b"));
    assert!(set.add("c"));
    assert!(!set.add("a"));
    assert_eq!(set.added_since(len).copied().collect::<Vec<_>>(), ["b", "c"]);
    assert_eq!(set.added_since(set.len()).count(), 0);
  }
}
