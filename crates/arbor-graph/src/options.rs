use std::fmt;

/// How conditional mutators treat a value the store considers "null".
///
/// With [`NullPolicy::Permit`] null-like values are ordinary values: a
/// null-valued mapping blocks `put_if_absent` and can be `replace`d. With
/// [`NullPolicy::Absent`] a mapping whose value satisfies the predicate is
/// treated as missing by `put_if_absent` and `replace`.
pub enum NullPolicy<V> {
    Permit,
    Absent(fn(&V) -> bool),
}

impl<V> NullPolicy<V> {
    /// Returns `true` if `value` counts as absent under this policy.
    pub fn treats_as_absent(&self, value: &V) -> bool {
        match self {
            NullPolicy::Permit => false,
            NullPolicy::Absent(is_null) => is_null(value),
        }
    }
}

impl<T> NullPolicy<Option<T>> {
    /// `None` values count as absent.
    pub fn none_is_absent() -> Self {
        NullPolicy::Absent(Option::is_none)
    }
}

impl<V> Clone for NullPolicy<V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<V> Copy for NullPolicy<V> {}

impl<V> Default for NullPolicy<V> {
    fn default() -> Self {
        NullPolicy::Permit
    }
}

impl<V> fmt::Debug for NullPolicy<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NullPolicy::Permit => f.write_str("Permit"),
            NullPolicy::Absent(_) => f.write_str("Absent(..)"),
        }
    }
}

/// Per-tree behavior switches.
pub struct TreeOptions<V> {
    /// Whether the empty path may hold a mapping.
    pub allow_root_value: bool,
    pub null_policy: NullPolicy<V>,
}

impl<V> TreeOptions<V> {
    pub fn allow_root_value(mut self, allow: bool) -> Self {
        self.allow_root_value = allow;
        self
    }

    pub fn null_policy(mut self, policy: NullPolicy<V>) -> Self {
        self.null_policy = policy;
        self
    }
}

impl<V> Default for TreeOptions<V> {
    fn default() -> Self {
        Self {
            allow_root_value: false,
            null_policy: NullPolicy::Permit,
        }
    }
}

impl<V> Clone for TreeOptions<V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<V> Copy for TreeOptions<V> {}

impl<V> fmt::Debug for TreeOptions<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeOptions")
            .field("allow_root_value", &self.allow_root_value)
            .field("null_policy", &self.null_policy)
            .finish()
    }
}
