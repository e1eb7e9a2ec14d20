use once_cell::sync::Lazy;
use regex::Regex;

/// Emotion reported when a reply carries no tag, or when tags are disabled.
pub const NEUTRAL: &str = "Neutral";

/// Instruction suffix appended to the system prompt when emotion tags are on.
pub const EMOTION_PROMPT_SUFFIX: &str = "\n\nStart every reply with exactly one emotion tag \
     in square brackets, chosen from [Joy], [Anger], [Surprise] or [Neutral], \
     followed by your reply. Example: [Joy] Of course I can help!";

// A leading bracketed alphanumeric/underscore token, e.g. "[Joy] hello".
// Unknown tags intentionally pass through; the presentation layer decides
// whether to map them onto an expression.
static TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\[([A-Za-z0-9_]+)\]\s*").unwrap());

/// Split a raw reply into its leading emotion tag (if any) and the remainder.
///
/// The remainder always has the tag and surrounding whitespace stripped; when
/// no tag is present the reply comes back unchanged.
pub fn split_emotion_tag(raw: &str) -> (Option<String>, String) {
    match TAG_RE.captures(raw) {
        Some(caps) => {
            let tag = caps[1].to_string();
            let rest = raw[caps.get(0).unwrap().end()..].to_string();
            (Some(tag), rest)
        }
        None => (None, raw.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leading_tag_is_extracted_and_stripped() {
        let (tag, rest) = split_emotion_tag("[Joy] Hello");
        assert_eq!(tag.as_deref(), Some("Joy"));
        assert_eq!(rest, "Hello");
    }

    #[test]
    fn untagged_reply_passes_through() {
        let (tag, rest) = split_emotion_tag("Hello there");
        assert_eq!(tag, None);
        assert_eq!(rest, "Hello there");
    }

    #[test]
    fn unknown_tokens_still_count_as_tags() {
        let (tag, rest) = split_emotion_tag("  [sleepy_2] yawn");
        assert_eq!(tag.as_deref(), Some("sleepy_2"));
        assert_eq!(rest, "yawn");
    }

    #[test]
    fn mid_text_brackets_are_not_tags() {
        let (tag, rest) = split_emotion_tag("I said [Joy] earlier");
        assert_eq!(tag, None);
        assert_eq!(rest, "I said [Joy] earlier");
    }

    #[test]
    fn bracketed_tag_with_spaces_inside_is_ignored() {
        let (tag, _) = split_emotion_tag("[not a tag] text");
        assert_eq!(tag, None);
    }
}
