//! Detection of embedded template syntax.

/// Openers that mark template syntax: output, statement and comment blocks.
const DELIMITER_OPENERS: [&str; 3] = ["{{", "{%", "{#"];

/// Returns true if `content` contains any template delimiter opener.
///
/// Content without one of these openers cannot change when rendered, so the
/// processor returns it as-is without repairing or building a context.
pub fn has_template_syntax(content: &str) -> bool {
    DELIMITER_OPENERS
        .iter()
        .any(|opener| content.contains(opener))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_each_opener() {
        assert!(has_template_syntax("Hello {{ name }}"));
        assert!(has_template_syntax("{% if vip %}VIP{% endif %}"));
        assert!(has_template_syntax("{# note #}"));
    }

    #[test]
    fn test_plain_text_has_no_syntax() {
        assert!(!has_template_syntax("Hello {name}, your total is $42"));
        assert!(!has_template_syntax(""));
        assert!(!has_template_syntax("   \n\t"));
        assert!(!has_template_syntax("closing only }} %} #}"));
    }

    #[test]
    fn test_unterminated_opener_still_counts() {
        assert!(has_template_syntax("broken {% if"));
    }
}
