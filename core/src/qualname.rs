//! Qualified names and attributes.
//!
//! Grounded in `markup5ever::interface::{QualName, Attribute, ExpandedName}`,
//! rebuilt on top of this crate's [`Namespace`] enum and [`AttrName`]/
//! [`TagName`] atoms instead of `string_cache`.

use std::fmt;

use tendril::StrTendril;

use crate::atom::AttrName;
use crate::namespace::Namespace;

/// A namespace + local name pair, compared without regard to prefix.
/// <https://www.w3.org/TR/REC-xml-names/#dt-expname>
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExpandedName<'a> {
    pub ns: Namespace,
    pub local: &'a str,
}

impl fmt::Debug for ExpandedName<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ns == Namespace::None {
            write!(f, "{}", self.local)
        } else {
            write!(f, "{{{}}}:{}", self.ns, self.local)
        }
    }
}

/// A fully qualified element or attribute name: optional source prefix,
/// namespace, and local name.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct QualName {
    pub prefix: Option<StrTendril>,
    pub ns: Namespace,
    pub local: AttrName,
}

impl QualName {
    pub fn new(prefix: Option<StrTendril>, ns: Namespace, local: AttrName) -> QualName {
        QualName { prefix, ns, local }
    }

    /// A name in no namespace, with no prefix — the common case for plain
    /// HTML attributes and element names represented as `QualName` (most
    /// element names instead travel as bare [`crate::atom::TagName`]).
    pub fn attr(local: AttrName) -> QualName {
        QualName::new(None, Namespace::None, local)
    }

    pub fn expanded(&self) -> ExpandedName<'_> {
        ExpandedName {
            ns: self.ns,
            local: self.local.as_str(),
        }
    }
}

/// A tag attribute.
///
/// The namespace on the attribute name is almost always [`Namespace::None`].
/// The tokenizer creates all attributes this way; the tree builder adjusts
/// certain attribute names inside foreign content (MathML, SVG) to carry a
/// real namespace and prefix, per the foreign-attribute adjustment table.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Attribute {
    pub name: QualName,
    pub value: StrTendril,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expanded_name_ignores_prefix() {
        let a = QualName::new(
            Some(StrTendril::from("xlink")),
            Namespace::XLink,
            AttrName::new(StrTendril::from("href")),
        );
        let b = QualName::new(None, Namespace::XLink, AttrName::new(StrTendril::from("href")));
        assert_eq!(a.expanded(), b.expanded());
    }
}
