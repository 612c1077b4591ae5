//! HTML 4.01 element tables.
//!
//! The tag-balancing reducer is driven entirely by these tables:
//!
//! - the content model of each element (which child elements it may hold),
//! - the `EMPTY` elements that never have content (`<br>`, `<img>`, ...),
//! - the `CDATA` elements whose content is not markup (`<script>`, `<style>`),
//! - SGML inclusions (`+(...)`) and exclusions (`-(...)`), which apply to
//!   the element and all of its descendants,
//! - attribute names implied by a bare value (`<td nowrap>`, `<p left>`).
//!
//! Tables follow the HTML 4.01 Transitional (loose) DTD. All lookups take
//! lower-case tag names.
//!
//! # Examples
//!
//! ```
//! use tagmend::html::{content_model, ContentModel};
//!
//! assert!(matches!(content_model("br"), Some(ContentModel::Empty)));
//! let ul = content_model("ul").unwrap();
//! assert!(ul.allows("li"));
//! assert!(!ul.allows("p"));
//! ```

pub mod entities;

type Group = &'static [&'static str];

const FONTSTYLE: Group = &["tt", "i", "b", "u", "s", "strike", "big", "small"];
const PHRASE: Group = &[
    "em", "strong", "dfn", "code", "samp", "kbd", "var", "cite", "abbr", "acronym",
];
const SPECIAL: Group = &[
    "a", "img", "applet", "object", "font", "basefont", "br", "script", "map", "q", "sub",
    "sup", "span", "bdo", "iframe",
];
const FORMCTRL: Group = &["input", "select", "textarea", "label", "button"];
const BLOCK: Group = &[
    "p", "h1", "h2", "h3", "h4", "h5", "h6", "ul", "ol", "dir", "menu", "pre", "dl", "div",
    "center", "noscript", "noframes", "blockquote", "form", "isindex", "hr", "table",
    "fieldset", "address",
];

const INLINE: &[Group] = &[FONTSTYLE, PHRASE, SPECIAL, FORMCTRL];
const FLOW: &[Group] = &[BLOCK, FONTSTYLE, PHRASE, SPECIAL, FORMCTRL];

/// The permitted content of an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentModel {
    /// `EMPTY`: no content and no end tag.
    Empty,
    /// `CDATA`: character data only; markup is not recognized inside.
    Cdata,
    /// Character data plus the listed element groups.
    Elements(&'static [Group]),
}

impl ContentModel {
    /// Returns `true` if a `tag` child is permitted by the model itself,
    /// before inclusions and exclusions.
    #[must_use]
    pub fn allows(self, tag: &str) -> bool {
        match self {
            Self::Empty | Self::Cdata => false,
            Self::Elements(groups) => groups.iter().any(|g| g.contains(&tag)),
        }
    }
}

/// Returns the content model of `tag`, or `None` for elements HTML 4.01
/// does not define.
#[must_use]
pub fn content_model(tag: &str) -> Option<ContentModel> {
    use ContentModel::{Cdata, Elements, Empty};
    let model = match tag {
        "area" | "base" | "basefont" | "br" | "col" | "frame" | "hr" | "img" | "input"
        | "isindex" | "link" | "meta" | "param" => Empty,
        "script" | "style" => Cdata,
        "html" => Elements(&[&["head", "body", "frameset"]]),
        "head" => Elements(&[&[
            "title", "isindex", "base", "script", "style", "meta", "link", "object",
        ]]),
        "body" | "div" | "center" | "blockquote" | "li" | "dd" | "th" | "td" | "del" | "ins"
        | "noscript" | "noframes" | "iframe" | "form" | "button" => Elements(FLOW),
        "address" => Elements(&[FONTSTYLE, PHRASE, SPECIAL, FORMCTRL, &["p"]]),
        "object" | "applet" => Elements(&[&["param"], BLOCK, FONTSTYLE, PHRASE, SPECIAL, FORMCTRL]),
        "fieldset" => Elements(&[&["legend"], BLOCK, FONTSTYLE, PHRASE, SPECIAL, FORMCTRL]),
        "map" => Elements(&[BLOCK, &["area"]]),
        "tt" | "i" | "b" | "u" | "s" | "strike" | "big" | "small" | "em" | "strong" | "dfn"
        | "code" | "samp" | "kbd" | "var" | "cite" | "abbr" | "acronym" | "a" | "font"
        | "span" | "bdo" | "q" | "sub" | "sup" | "label" | "legend" | "p" | "h1" | "h2"
        | "h3" | "h4" | "h5" | "h6" | "dt" | "caption" | "pre" => Elements(INLINE),
        "ul" | "ol" | "dir" | "menu" => Elements(&[&["li"]]),
        "dl" => Elements(&[&["dt", "dd"]]),
        "table" => Elements(&[&["caption", "col", "colgroup", "thead", "tfoot", "tbody", "tr"]]),
        "thead" | "tbody" | "tfoot" => Elements(&[&["tr"]]),
        "tr" => Elements(&[&["th", "td"]]),
        "colgroup" => Elements(&[&["col"]]),
        "select" => Elements(&[&["optgroup", "option"]]),
        "optgroup" => Elements(&[&["option"]]),
        "option" | "textarea" | "title" => Elements(&[]),
        "frameset" => Elements(&[&["frameset", "frame", "noframes"]]),
        _ => return None,
    };
    Some(model)
}

/// Returns `true` for `EMPTY` elements.
#[must_use]
pub fn is_empty_element(tag: &str) -> bool {
    matches!(content_model(tag), Some(ContentModel::Empty))
}

/// Returns `true` for elements with `CDATA` content (`script`, `style`).
#[must_use]
pub fn is_cdata_element(tag: &str) -> bool {
    matches!(content_model(tag), Some(ContentModel::Cdata))
}

/// SGML inclusions: tags permitted anywhere inside `tag`.
#[must_use]
pub fn inclusions(tag: &str) -> &'static [&'static str] {
    match tag {
        "head" => &["script", "style", "meta", "link", "object"],
        "body" => &["ins", "del"],
        _ => &[],
    }
}

/// SGML exclusions: tags forbidden anywhere inside `tag`.
#[must_use]
pub fn exclusions(tag: &str) -> &'static [&'static str] {
    match tag {
        "a" => &["a"],
        "button" => &[
            "a", "input", "select", "textarea", "label", "button", "form", "fieldset", "iframe",
            "isindex",
        ],
        "dir" | "menu" => BLOCK,
        "form" => &["form"],
        "label" => &["label"],
        "pre" => &[
            "img", "object", "big", "small", "sub", "sup", "applet", "font", "basefont",
        ],
        _ => &[],
    }
}

/// Tags whose appearance as the first tag marks a document as HTML.
const SIGNATURE_TAGS: Group = &[
    "html", "head", "title", "isindex", "base", "script", "style", "meta", "link", "object",
];

/// Returns `true` if a leading `tag` identifies the document as HTML.
#[must_use]
pub fn is_signature_tag(tag: &str) -> bool {
    SIGNATURE_TAGS.iter().any(|t| t.eq_ignore_ascii_case(tag))
}

const ALIGN_BLOCK: Group = &["left", "center", "right", "justify"];
const ALIGN_CELL: Group = &["left", "center", "right", "justify", "char"];
const ALIGN_OBJECT: Group = &["top", "middle", "bottom", "left", "right"];
const VALIGN: Group = &["top", "middle", "bottom", "baseline"];
const CELL_ELEMENTS: Group = &["col", "colgroup", "tbody", "td", "tfoot", "th", "thead", "tr"];

/// `(elements, values, attribute)`; an empty element list matches any element.
static OMITTED_ATTRIBUTES: &[(Group, Group, &str)] = &[
    (&["div", "p", "h1", "h2", "h3", "h4", "h5", "h6"], ALIGN_BLOCK, "align"),
    (&["hr", "table"], &["left", "center", "right"], "align"),
    (&["caption"], &["top", "bottom", "left", "right"], "align"),
    (&["legend"], &["top", "bottom", "left", "right"], "align"),
    (&["img", "object", "applet", "iframe", "input"], ALIGN_OBJECT, "align"),
    (CELL_ELEMENTS, ALIGN_CELL, "align"),
    (CELL_ELEMENTS, VALIGN, "valign"),
    (&["td", "th"], &["row", "col", "rowgroup", "colgroup"], "scope"),
    (&["td", "th"], &["nowrap"], "nowrap"),
    (&["br"], &["left", "all", "right", "none"], "clear"),
    (&["input"], &["checked"], "checked"),
    (
        &["input"],
        &[
            "text", "password", "checkbox", "radio", "submit", "reset", "file", "hidden", "image",
            "button",
        ],
        "type",
    ),
    (&["button"], &["button", "submit", "reset"], "type"),
    (&["ul"], &["disc", "square", "circle"], "type"),
    (&["ol"], &["1", "a", "i"], "type"),
    (&["li"], &["disc", "square", "circle", "1", "a", "i"], "type"),
    (
        &["button", "input", "optgroup", "option", "select", "textarea"],
        &["disabled"],
        "disabled",
    ),
    (&["input", "textarea"], &["readonly"], "readonly"),
    (&["option"], &["selected"], "selected"),
    (&["select"], &["multiple"], "multiple"),
    (&["area"], &["nohref"], "nohref"),
    (&["a", "area"], &["rect", "circle", "poly", "default"], "shape"),
    (&["hr"], &["noshade"], "noshade"),
    (&["dir", "dl", "menu", "ol", "ul"], &["compact"], "compact"),
    (&["img", "input"], &["ismap"], "ismap"),
    (&["object"], &["declare"], "declare"),
    (&["script"], &["defer"], "defer"),
    (&["frame"], &["noresize"], "noresize"),
    (&["frame", "iframe"], &["yes", "no", "auto"], "scrolling"),
    (&["frame", "iframe"], &["1", "0"], "frameborder"),
    (&["form"], &["get", "post"], "method"),
    (&["param"], &["data", "ref", "object"], "valuetype"),
    (
        &["table"],
        &["void", "above", "below", "hsides", "lhs", "rhs", "vsides", "box", "border"],
        "frame",
    ),
    (&["table"], &["none", "groups", "rows", "cols", "all"], "rules"),
    (&[], &["ltr", "rtl"], "dir"),
];

/// The attribute implied by a bare value on `element`, as in `<td nowrap>`.
///
/// `value` must already be lower-cased.
///
/// # Examples
///
/// ```
/// use tagmend::html::omitted_attribute_name;
///
/// assert_eq!(omitted_attribute_name("p", "left"), Some("align"));
/// assert_eq!(omitted_attribute_name("input", "checked"), Some("checked"));
/// assert_eq!(omitted_attribute_name("p", "checked"), None);
/// ```
#[must_use]
pub fn omitted_attribute_name(element: &str, value: &str) -> Option<&'static str> {
    OMITTED_ATTRIBUTES
        .iter()
        .find(|(elements, values, _)| {
            (elements.is_empty() || elements.contains(&element)) && values.contains(&value)
        })
        .map(|&(_, _, attr)| attr)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_elements() {
        for tag in ["br", "img", "hr", "meta", "input", "param"] {
            assert!(is_empty_element(tag), "{tag}");
        }
        assert!(!is_empty_element("p"));
        assert!(!is_empty_element("blink"));
    }

    #[test]
    fn test_cdata_elements() {
        assert!(is_cdata_element("script"));
        assert!(is_cdata_element("style"));
        assert!(!is_cdata_element("textarea"));
    }

    #[test]
    fn test_p_holds_inline_only() {
        let p = content_model("p").unwrap();
        assert!(p.allows("b"));
        assert!(p.allows("input"));
        assert!(!p.allows("p"));
        assert!(!p.allows("div"));
        assert!(!p.allows("table"));
    }

    #[test]
    fn test_flow_containers() {
        let td = content_model("td").unwrap();
        assert!(td.allows("table"));
        assert!(td.allows("span"));
        assert!(!td.allows("tr"));
    }

    #[test]
    fn test_table_structure() {
        assert!(content_model("table").unwrap().allows("tr"));
        assert!(content_model("tr").unwrap().allows("td"));
        assert!(!content_model("tr").unwrap().allows("tr"));
    }

    #[test]
    fn test_text_only_elements() {
        assert!(!content_model("title").unwrap().allows("b"));
        assert!(!content_model("option").unwrap().allows("option"));
    }

    #[test]
    fn test_unknown_element_has_no_model() {
        assert!(content_model("blink").is_none());
        assert!(content_model("svg").is_none());
    }

    #[test]
    fn test_inclusions_and_exclusions() {
        assert!(inclusions("body").contains(&"ins"));
        assert!(exclusions("a").contains(&"a"));
        assert!(exclusions("pre").contains(&"img"));
        assert!(exclusions("menu").contains(&"p"));
        assert!(exclusions("div").is_empty());
    }

    #[test]
    fn test_signature_tags() {
        assert!(is_signature_tag("HTML"));
        assert!(is_signature_tag("title"));
        assert!(!is_signature_tag("p"));
    }

    #[test]
    fn test_omitted_attribute_names() {
        assert_eq!(omitted_attribute_name("td", "nowrap"), Some("nowrap"));
        assert_eq!(omitted_attribute_name("td", "top"), Some("valign"));
        assert_eq!(omitted_attribute_name("img", "top"), Some("align"));
        assert_eq!(omitted_attribute_name("span", "rtl"), Some("dir"));
        assert_eq!(omitted_attribute_name("span", "bogus"), None);
    }
}
