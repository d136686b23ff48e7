//! Named sets of HTML tag names used by the scope predicates and the
//! per-mode rules. Grounded in `html5ever::tree_builder::tag_sets`
//! (referenced throughout `tree_builder/mod.rs`/`rules.rs` via its
//! `declare_tag_set!` macro, not present in the retrieval pack); rewritten
//! here as plain slice constants plus a membership helper.

/// <https://html.spec.whatwg.org/multipage/parsing.html#special>
pub(crate) const SPECIAL: &[&str] = &[
    "address", "applet", "area", "article", "aside", "base", "basefont", "bgsound", "blockquote",
    "body", "br", "button", "caption", "center", "col", "colgroup", "dd", "details", "dir", "div",
    "dl", "dt", "embed", "fieldset", "figcaption", "figure", "footer", "form", "frame", "frameset",
    "h1", "h2", "h3", "h4", "h5", "h6", "head", "header", "hgroup", "hr", "html", "iframe", "img",
    "input", "keygen", "li", "link", "listing", "main", "marquee", "menu", "meta", "nav",
    "noembed", "noframes", "noscript", "object", "ol", "p", "param", "plaintext", "pre", "script",
    "section", "select", "source", "style", "summary", "table", "tbody", "td", "template",
    "textarea", "tfoot", "th", "thead", "title", "tr", "track", "ul", "wbr", "xmp",
];

/// Elements subject to the adoption-agency algorithm.
pub(crate) const FORMATTING: &[&str] = &[
    "a", "b", "big", "code", "em", "font", "i", "nobr", "s", "small", "strike", "strong", "tt", "u",
];

pub(crate) const HEADING: &[&str] = &["h1", "h2", "h3", "h4", "h5", "h6"];

/// Elements whose end tags are implied when a new element of a
/// non-matching kind is opened.
/// <https://html.spec.whatwg.org/multipage/parsing.html#generate-implied-end-tags>
pub(crate) const CURSORY_IMPLIED_END: &[&str] = &[
    "dd", "dt", "li", "optgroup", "option", "p", "rb", "rp", "rt", "rtc",
];

pub(crate) const THOROUGH_IMPLIED_END: &[&str] = &[
    "caption", "colgroup", "dd", "dt", "li", "optgroup", "option", "p", "rb", "rp", "rt", "rtc",
    "tbody", "td", "tfoot", "th", "thead", "tr",
];

pub(crate) const TABLE_OUTER: &[&str] = &["table", "tbody", "tfoot", "thead", "tr"];

/// Same boundary as `stack::TABLE_SCOPE`, duplicated here (as a plain name
/// set rather than a scope predicate) for the "in table" rules that pop the
/// open-elements stack back down to table level rather than testing scope.
pub(crate) const TABLE_SCOPE: &[&str] = &["html", "table", "template"];

/// Same boundary as `stack::DEFAULT_SCOPE`, duplicated here for the rules
/// that need to pass a custom name set alongside it to
/// `OpenElementsStack::has_any_in_scope`.
pub(crate) const DEFAULT_SCOPE: &[&str] =
    &["applet", "caption", "html", "table", "td", "th", "marquee", "object", "template"];

pub(crate) const TABLE_BODY_CONTEXT: &[&str] = &["tbody", "tfoot", "thead", "template", "html"];

pub(crate) const TABLE_ROW_CONTEXT: &[&str] = &["tr", "template", "html"];

pub(crate) const FORM_ASSOCIATABLE: &[&str] = &[
    "button", "fieldset", "input", "keygen", "object", "output", "select", "textarea", "img",
];

pub(crate) fn contains(set: &[&str], name: &str) -> bool {
    set.contains(&name)
}
