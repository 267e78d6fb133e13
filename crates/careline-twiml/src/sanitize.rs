//! Removal of unprintable characters from spoken text.

/// Strips characters that cannot be spoken or embedded in the voice document.
///
/// Space, tab, newline and carriage return are kept. Dropped: other control
/// characters, format characters (zero-width marks, bidi controls, the
/// byte-order mark, soft hyphen, Arabic number signs, tag characters),
/// separators other than the ASCII space (including the no-break space),
/// private-use characters, and noncharacters. Unassigned code points are
/// kept.
pub fn sanitize(text: &str) -> String {
    text.chars().filter(|&c| is_speakable(c)).collect()
}

fn is_speakable(c: char) -> bool {
    if matches!(c, ' ' | '\t' | '\n' | '\r') {
        return true;
    }
    !(c.is_control()
        || is_format(c)
        || is_separator(c)
        || is_private_use(c)
        || is_noncharacter(c))
}

fn is_format(c: char) -> bool {
    matches!(
        c,
        '\u{00AD}'
            | '\u{0600}'..='\u{0605}'
            | '\u{061C}'
            | '\u{06DD}'
            | '\u{070F}'
            | '\u{0890}'..='\u{0891}'
            | '\u{08E2}'
            | '\u{180E}'
            | '\u{200B}'..='\u{200F}'
            | '\u{202A}'..='\u{202E}'
            | '\u{2060}'..='\u{2064}'
            | '\u{2066}'..='\u{206F}'
            | '\u{FEFF}'
            | '\u{FFF9}'..='\u{FFFB}'
            | '\u{110BD}'
            | '\u{110CD}'
            | '\u{13430}'..='\u{1343F}'
            | '\u{1BCA0}'..='\u{1BCA3}'
            | '\u{1D173}'..='\u{1D17A}'
            | '\u{E0001}'
            | '\u{E0020}'..='\u{E007F}'
    )
}

fn is_separator(c: char) -> bool {
    matches!(
        c,
        '\u{00A0}'
            | '\u{1680}'
            | '\u{2000}'..='\u{200A}'
            | '\u{2028}'
            | '\u{2029}'
            | '\u{202F}'
            | '\u{205F}'
            | '\u{3000}'
    )
}

fn is_private_use(c: char) -> bool {
    matches!(
        c,
        '\u{E000}'..='\u{F8FF}' | '\u{F0000}'..='\u{FFFFD}' | '\u{100000}'..='\u{10FFFD}'
    )
}

fn is_noncharacter(c: char) -> bool {
    let c = c as u32;
    (0xFDD0..=0xFDEF).contains(&c) || c & 0xFFFE == 0xFFFE
}
