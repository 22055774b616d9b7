/// Derive a repository folder name from a book title.
///
/// The title is trimmed, then every character outside the allowed set is
/// replaced by one `_` per UTF-16 code unit, so a character outside the
/// Basic Multilingual Plane (most emoji) becomes `__`. Allowed are ASCII letters and digits, `-`,
/// `_`, CJK punctuation, hiragana, katakana, half- and full-width forms and
/// the CJK unified ideographs block. The result never contains `/` and
/// sanitizing it again changes nothing.
///
/// ```
/// use bookshelf_library::commit::sanitize_folder_name;
/// assert_eq!(sanitize_folder_name("My Book!! 2025"), "My_Book__2025");
/// assert_eq!(sanitize_folder_name("  ねこ の 本  "), "ねこ_の_本");
/// ```
pub fn sanitize_folder_name(title: &str) -> String {
    let mut folder = String::with_capacity(title.len());
    for c in title.trim().chars() {
        if is_allowed(c) {
            folder.push(c);
        } else {
            folder.extend(std::iter::repeat_n('_', c.len_utf16()));
        }
    }
    folder
}

fn is_allowed(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(c,
            '-' | '_'
            | '\u{3000}'..='\u{303F}'
            | '\u{3040}'..='\u{309F}'
            | '\u{30A0}'..='\u{30FF}'
            | '\u{FF00}'..='\u{FF9F}'
            | '\u{4E00}'..='\u{9FAF}'
        )
}
