//! Whitespace as ECMAScript defines it for `\s` and `String.prototype.trim`.
//! It differs from `char::is_whitespace`: U+FEFF counts, U+0085 does not.

pub(crate) fn is_whitespace(ch: char) -> bool {
    matches!(
        ch,
        '\t' | '\n'
            | '\u{000B}'
            | '\u{000C}'
            | '\r'
            | ' '
            | '\u{00A0}'
            | '\u{1680}'
            | '\u{2000}'..='\u{200A}'
            | '\u{2028}'
            | '\u{2029}'
            | '\u{202F}'
            | '\u{205F}'
            | '\u{3000}'
            | '\u{FEFF}'
    )
}

pub(crate) fn trim(text: &str) -> &str {
    text.trim_matches(is_whitespace)
}

pub(crate) fn trim_end(text: &str) -> &str {
    text.trim_end_matches(is_whitespace)
}
