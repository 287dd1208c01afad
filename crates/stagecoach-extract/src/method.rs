//! Allowed-method sets for the method facet.

use crate::FacetError;
use http::Method;
use std::fmt;

/// One or more HTTP methods a route accepts.
///
/// ```
/// use http::Method;
/// use stagecoach_extract::MethodSet;
///
/// let set = MethodSet::from([Method::GET, Method::POST]);
/// assert!(set.contains(&Method::POST));
/// assert!(!set.contains(&Method::DELETE));
/// assert_eq!(set.to_string(), "GET, POST");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSet {
    methods: Vec<Method>,
}

impl MethodSet {
    /// Creates a set from methods, dropping duplicates and keeping order.
    pub fn new(methods: impl IntoIterator<Item = Method>) -> Self {
        let mut set = Vec::new();
        for method in methods {
            if !set.contains(&method) {
                set.push(method);
            }
        }
        Self { methods: set }
    }

    /// Returns true if `method` is allowed.
    #[must_use]
    pub fn contains(&self, method: &Method) -> bool {
        self.methods.contains(method)
    }

    /// Returns the allowed methods in declaration order.
    #[must_use]
    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    /// Checks `method` and returns its name when allowed.
    ///
    /// # Errors
    ///
    /// Returns [`FacetError::MethodNotAllowed`] listing the allowed methods.
    pub fn check(&self, method: &Method) -> Result<String, FacetError> {
        if self.contains(method) {
            Ok(method.as_str().to_string())
        } else {
            Err(FacetError::MethodNotAllowed {
                method: method.as_str().to_string(),
                allowed: self.to_string(),
            })
        }
    }
}

impl fmt::Display for MethodSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.methods.iter().map(Method::as_str).collect();
        f.write_str(&names.join(", "))
    }
}

impl From<Method> for MethodSet {
    fn from(method: Method) -> Self {
        Self::new([method])
    }
}

impl<const N: usize> From<[Method; N]> for MethodSet {
    fn from(methods: [Method; N]) -> Self {
        Self::new(methods)
    }
}

impl From<Vec<Method>> for MethodSet {
    fn from(methods: Vec<Method>) -> Self {
        Self::new(methods)
    }
}

impl FromIterator<Method> for MethodSet {
    fn from_iter<I: IntoIterator<Item = Method>>(iter: I) -> Self {
        Self::new(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_method() {
        let set = MethodSet::from(Method::POST);
        assert_eq!(set.check(&Method::POST).unwrap(), "POST");
    }

    #[test]
    fn test_rejects_and_lists_allowed() {
        let set = MethodSet::from([Method::GET, Method::PUT]);
        let err = set.check(&Method::DELETE).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Method DELETE not allowed; expected one of: GET, PUT"
        );
    }

    #[test]
    fn test_duplicates_dropped() {
        let set: MethodSet = vec![Method::GET, Method::GET, Method::HEAD].into_iter().collect();
        assert_eq!(set.methods(), &[Method::GET, Method::HEAD]);
    }
}
