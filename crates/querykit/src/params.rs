//! Named parameter map and placeholder allocation.

use crate::value::Value;

/// Default prefix of generated placeholder names (`:qp0`, `:qp1`, ...).
pub const DEFAULT_PARAM_PREFIX: &str = ":qp";

/// An insertion-ordered map from placeholder name to bound value.
///
/// The map is owned by the caller of a build and threaded by `&mut` through
/// every builder, so nested sub-queries keep numbering where the outer
/// query left off.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Params {
    entries: Vec<(String, Value)>,
}

impl Params {
    /// Create a new empty parameter map.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Get the current parameter count.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the map is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a bound value by placeholder name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        let name = normalize_name(name);
        self.entries
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v)
    }

    /// Check whether a placeholder name is bound.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Bind `value` under `name`, replacing (in place) any previous value.
    ///
    /// Names without a leading `:` or `@` get a `:` prepended.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = normalize_name(&name.into()).into_owned();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Chaining form of [`Params::insert`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Merge another map into this one. Later values win on name clashes.
    pub fn merge(&mut self, other: &Params) {
        for (k, v) in &other.entries {
            self.insert(k.clone(), v.clone());
        }
    }

    /// Allocate a fresh placeholder for `value` and return its name.
    ///
    /// The name is `prefix + len()`; if a caller-named parameter already
    /// occupies that slot the counter advances so nothing is overwritten.
    pub fn bind(&mut self, prefix: &str, value: impl Into<Value>) -> String {
        let mut n = self.entries.len();
        let mut name = format!("{prefix}{n}");
        while self.entries.iter().any(|(k, _)| *k == name) {
            n += 1;
            name = format!("{prefix}{n}");
        }
        self.entries.push((name.clone(), value.into()));
        name
    }

    /// Iterate over `(name, value)` pairs in binding order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Placeholder names in binding order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Remove all parameters.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Consume the map into its ordered entries.
    pub fn into_vec(self) -> Vec<(String, Value)> {
        self.entries
    }
}

/// Bind `value` into `params` with the given placeholder prefix.
pub fn bind_param(value: impl Into<Value>, params: &mut Params, prefix: &str) -> String {
    params.bind(prefix, value)
}

fn normalize_name(name: &str) -> std::borrow::Cow<'_, str> {
    if name.starts_with(':') || name.starts_with('@') {
        std::borrow::Cow::Borrowed(name)
    } else {
        std::borrow::Cow::Owned(format!(":{name}"))
    }
}

impl<K, V> FromIterator<(K, V)> for Params
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Params::new();
        for (k, v) in iter {
            params.insert(k, v);
        }
        params
    }
}

impl IntoIterator for Params {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
