/// Sanitize an attribute value for use inside a rewritten title.
///
/// Whitespace runs collapse to single spaces, and a hyphen or dash sitting
/// directly between two word characters becomes a space ("Street-Legal" ->
/// "Street Legal", "AC-DC" -> "AC DC") so downstream parsers that split on
/// '-' do not mistake it for a field boundary.
pub fn sanitize_field(value: &str) -> String {
    if value.is_empty() {
        return String::new();
    }
    let collapsed = collapse_whitespace(value);
    collapse_whitespace(&break_inner_dashes(&collapsed))
}

/// Make a field safe for a hyphen-delimited title template by rewriting the
/// spaced delimiter shape " - " to ": ". Catches the hyphens that
/// `sanitize_field` leaves alone because they are surrounded by spaces, not
/// word characters.
pub fn escape_delimiters(value: &str) -> String {
    value.replace(" - ", ": ")
}

fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn break_inner_dashes(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    let mut out = String::with_capacity(value.len());
    for (index, &c) in chars.iter().enumerate() {
        let between_words = matches!(c, '-' | '\u{2013}' | '\u{2014}')
            && index > 0
            && index + 1 < chars.len()
            && is_word(chars[index - 1])
            && is_word(chars[index + 1]);
        out.push(if between_words { ' ' } else { c });
    }
    out
}

fn is_word(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::{escape_delimiters, sanitize_field};

    #[test]
    fn empty_input_yields_empty_output() {
        assert_eq!(sanitize_field(""), "");
        assert_eq!(sanitize_field("   "), "");
    }

    #[test]
    fn collapses_whitespace_runs() {
        assert_eq!(sanitize_field("  Die   Toten\tHosen "), "Die Toten Hosen");
    }

    #[test]
    fn breaks_hyphens_between_word_characters() {
        assert_eq!(sanitize_field("Street-Legal"), "Street Legal");
        assert_eq!(sanitize_field("AC-DC"), "AC DC");
        assert_eq!(sanitize_field("a-b-c-d"), "a b c d");
    }

    #[test]
    fn breaks_unicode_dashes() {
        assert_eq!(sanitize_field("Krimi\u{2013}Hörspiel"), "Krimi Hörspiel");
    }

    #[test]
    fn keeps_spaced_hyphens() {
        assert_eq!(sanitize_field("Some - Thing"), "Some - Thing");
    }

    #[test]
    fn escape_delimiters_rewrites_spaced_hyphens() {
        assert_eq!(escape_delimiters("Beispiel-Firma GmbH"), "Beispiel-Firma GmbH");
        assert_eq!(escape_delimiters("Some - Thing"), "Some: Thing");
    }
}
