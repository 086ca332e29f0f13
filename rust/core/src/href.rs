// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! xlink:href handling.

/// Reduce an `xlink:href` to the bare identifier it points at.
///
/// `"#wall-1"` and `"building.gml#wall-1"` both become `"wall-1"`.
/// Values without a fragment are returned trimmed.
pub fn normalize_href(href: &str) -> &str {
    let href = href.trim();
    match href.rfind('#') {
        Some(pos) => &href[pos + 1..],
        None => href,
    }
}

/// Whether the href points into the current document.
pub fn is_local_href(href: &str) -> bool {
    href.trim_start().starts_with('#')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_fragment_marker() {
        assert_eq!(normalize_href("#poly-1"), "poly-1");
        assert_eq!(normalize_href("  #poly-1 "), "poly-1");
        assert_eq!(normalize_href("other.gml#poly-1"), "poly-1");
        assert_eq!(normalize_href("poly-1"), "poly-1");
    }

    #[test]
    fn local_detection() {
        assert!(is_local_href("#a"));
        assert!(!is_local_href("other.gml#a"));
    }
}
