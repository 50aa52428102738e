//! Namespace-qualified names.
//!
//! Types, aspects, properties and association types are all named by a
//! [`QName`]. Well-known names are declared as constants with
//! [`QName::from_static`].

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, ErrorKind};

/// A name qualified by a namespace URI, displayed as `{namespace}local`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct QName {
    namespace: Cow<'static, str>,
    local: Cow<'static, str>,
}

impl QName {
    /// Creates a qualified name from borrowed parts.
    #[must_use]
    pub fn new(namespace: &str, local: &str) -> Self {
        Self {
            namespace: Cow::Owned(namespace.to_owned()),
            local: Cow::Owned(local.to_owned()),
        }
    }

    /// Creates a qualified name from static strings, usable in `const` items.
    #[must_use]
    pub const fn from_static(namespace: &'static str, local: &'static str) -> Self {
        Self {
            namespace: Cow::Borrowed(namespace),
            local: Cow::Borrowed(local),
        }
    }

    /// Returns the namespace URI.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Returns the local part of the name.
    #[must_use]
    pub fn local_name(&self) -> &str {
        &self.local
    }
}

impl fmt::Debug for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QName({self})")
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}{}", self.namespace, self.local)
    }
}

impl FromStr for QName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s.strip_prefix('{').ok_or_else(|| {
            Error::new(ErrorKind::InvalidReference(format!(
                "{s}: qualified name must start with '{{'"
            )))
        })?;
        let (namespace, local) = rest.split_once('}').ok_or_else(|| {
            Error::new(ErrorKind::InvalidReference(format!(
                "{s}: unterminated namespace"
            )))
        })?;
        if local.is_empty() {
            return Err(Error::new(ErrorKind::InvalidReference(format!(
                "{s}: empty local name"
            ))));
        }
        Ok(Self::new(namespace, local))
    }
}
