//! The closed set of namespaces a conformant HTML parser can produce.
//!
//! Unlike tag and attribute names, namespace URIs are not worth atomizing
//! through the build-time phf tables: there are exactly six of them plus
//! "no namespace", the set never grows, and every one is a `'static str`
//! known at compile time. An `enum` gives cheaper comparisons than even an
//! atom would.

use std::fmt;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Namespace {
    /// No namespace (the default for plain HTML attributes).
    None,
    Html,
    MathMl,
    Svg,
    XLink,
    Xml,
    XmlNs,
}

impl Namespace {
    pub const fn uri(self) -> &'static str {
        match self {
            Namespace::None => "",
            Namespace::Html => "http://www.w3.org/1999/xhtml",
            Namespace::MathMl => "http://www.w3.org/1998/Math/MathML",
            Namespace::Svg => "http://www.w3.org/2000/svg",
            Namespace::XLink => "http://www.w3.org/1999/xlink",
            Namespace::Xml => "http://www.w3.org/XML/1998/namespace",
            Namespace::XmlNs => "http://www.w3.org/2000/xmlns/",
        }
    }

    pub fn from_uri(uri: &str) -> Option<Namespace> {
        Some(match uri {
            "" => Namespace::None,
            "http://www.w3.org/1999/xhtml" => Namespace::Html,
            "http://www.w3.org/1998/Math/MathML" => Namespace::MathMl,
            "http://www.w3.org/2000/svg" => Namespace::Svg,
            "http://www.w3.org/1999/xlink" => Namespace::XLink,
            "http://www.w3.org/XML/1998/namespace" => Namespace::Xml,
            "http://www.w3.org/2000/xmlns/" => Namespace::XmlNs,
            _ => return None,
        })
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.uri())
    }
}

impl Default for Namespace {
    fn default() -> Self {
        Namespace::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_uri() {
        for ns in [
            Namespace::Html,
            Namespace::MathMl,
            Namespace::Svg,
            Namespace::XLink,
            Namespace::Xml,
            Namespace::XmlNs,
        ] {
            assert_eq!(Namespace::from_uri(ns.uri()), Some(ns));
        }
        assert_eq!(Namespace::from_uri(""), Some(Namespace::None));
    }
}
