//! Input cleanup before chunking.
//!
//! Video text renders with a single face, so symbols outside its likely
//! coverage are rewritten up front: common emojis become short bracketed
//! descriptions and anything else exotic blanks to a space. `keep_emojis`
//! skips the whole pass and trusts the chosen font.

/// Common emojis mapped to short text descriptions.
pub const EMOJI_REPLACEMENTS: [(&str, &str); 40] = [
    ("👋", "[wave]"),
    ("😀", "[smile]"),
    ("😃", "[grin]"),
    ("😄", "[happy]"),
    ("😊", "[smile]"),
    ("🚀", "[rocket]"),
    ("🌟", "[star]"),
    ("💻", "[computer]"),
    ("🎉", "[party]"),
    ("🎨", "[art]"),
    ("🎭", "[theater]"),
    ("🎪", "[circus]"),
    ("🎯", "[target]"),
    ("🎲", "[dice]"),
    ("🎸", "[guitar]"),
    ("🎺", "[trumpet]"),
    ("🎻", "[violin]"),
    ("🔥", "[fire]"),
    ("💡", "[lightbulb]"),
    ("📱", "[phone]"),
    ("📧", "[email]"),
    ("📅", "[calendar]"),
    ("📈", "[chart]"),
    ("🏆", "[trophy]"),
    ("💧", "[water]"),
    ("☀️", "[sun]"),
    ("🌙", "[moon]"),
    ("⭐", "[star]"),
    ("❤️", "[heart]"),
    ("💛", "[yellow heart]"),
    ("💚", "[green heart]"),
    ("💙", "[blue heart]"),
    ("💜", "[purple heart]"),
    ("🌳", "[tree]"),
    ("🌲", "[evergreen]"),
    ("🍎", "[apple]"),
    ("✨", "[sparkles]"),
    ("👨‍💻", "[man technologist]"),
    ("👩‍🚀", "[woman astronaut]"),
    ("🏳️‍🌈", "[rainbow flag]"),
];

pub fn replace_emojis(text: &str) -> String {
    let mut out = text.to_owned();
    for (emoji, replacement) in EMOJI_REPLACEMENTS {
        if out.contains(emoji) {
            out = out.replace(emoji, replacement);
        }
    }
    out
}

/// Blanks anything outside letters, digits, whitespace and light prose
/// punctuation. Unicode letters pass through untouched.
pub fn strip_unsupported(text: &str) -> String {
    text.chars()
        .map(|ch| {
            if ch.is_alphanumeric()
                || ch.is_whitespace()
                || matches!(ch, '?' | '!' | '\'' | '.' | ',' | '[' | ']' | '-')
            {
                ch
            } else {
                ' '
            }
        })
        .collect()
}

pub fn prepare(text: &str, keep_emojis: bool) -> String {
    if keep_emojis {
        return text.to_owned();
    }
    strip_unsupported(&replace_emojis(text))
}

#[cfg(test)]
mod tests {
    use super::{prepare, replace_emojis, strip_unsupported};

    #[test]
    fn known_emojis_become_descriptions() {
        assert_eq!(replace_emojis("hi 👋 there"), "hi [wave] there");
    }

    #[test]
    fn descriptions_survive_the_filter() {
        assert_eq!(prepare("launch 🚀 now", false), "launch [rocket] now");
    }

    #[test]
    fn stray_symbols_blank_to_spaces() {
        assert_eq!(strip_unsupported("a*b; c…"), "a b  c ");
    }

    #[test]
    fn prose_and_accents_pass_through() {
        let text = "Voilà! Ça va? It's fine, really.";
        assert_eq!(strip_unsupported(text), text);
    }

    #[test]
    fn keep_emojis_skips_the_pass() {
        let text = "raw 🎉 input; untouched";
        assert_eq!(prepare(text, true), text);
    }
}
