//! Text preparation for the segmenter: markdown cleaning, separator
//! detection, and token counting.
//!
//! Pure functions, no I/O.

use regex::Regex;
use std::sync::LazyLock;
use tiktoken_rs::CoreBPE;

// Compiled regexes — allocated once, reused across calls.
static RE_TABLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)(?:^|\n)(\|[^\n]+\|(?:\n\|[^\n]+\|)*)").unwrap());
static RE_FENCED_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```.*?```").unwrap());
static RE_INLINE_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`[^`]+`").unwrap());
static RE_HR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[\s]*[-*_]{3,}[\s]*$").unwrap());
static RE_BOLD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*([^*]+)\*\*").unwrap());
static RE_ITALIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*([^*]+)\*").unwrap());
static RE_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#{1,6}\s*").unwrap());
static RE_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]+)\]\([^)]+\)").unwrap());
static RE_BULLET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[\s]*[-*]\s+").unwrap());
static RE_NUMBERED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[\s]*\d+\.\s+").unwrap());
static RE_BLOCKQUOTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[\s]*>[\s]*").unwrap());
static RE_LEADING_DOT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\.\s*").unwrap());
static RE_DOUBLE_DOT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.\s*\.").unwrap());
static RE_MULTI_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s{2,}").unwrap());

/// Strip markdown formatting so text reads naturally when spoken.
///
/// Handles: fenced code blocks, tables, inline code, bold/italic, headings,
/// links, bullets/numbered lists, blockquotes, horizontal rules.
pub fn clean_text_for_tts(text: &str) -> String {
    let mut c = text.to_string();

    // Tables → placeholder (before code blocks, since tables can appear inside fences)
    c = RE_TABLE.replace_all(&c, "\nSee the table in our conversation.\n").into_owned();
    // Fenced code blocks → placeholder
    c = RE_FENCED_CODE.replace_all(&c, " See the code in our conversation. ").into_owned();
    // Inline code → removed
    c = RE_INLINE_CODE.replace_all(&c, "").into_owned();
    // Horizontal rules → removed
    c = RE_HR.replace_all(&c, "").into_owned();
    // Bold → plain
    c = RE_BOLD.replace_all(&c, "$1").into_owned();
    // Italic → plain
    c = RE_ITALIC.replace_all(&c, "$1").into_owned();
    // Headings → pound signs removed
    c = RE_HEADING.replace_all(&c, "").into_owned();
    // Links → text only
    c = RE_LINK.replace_all(&c, "$1").into_owned();
    // Bullets / numbered lists → ". " prefix
    c = RE_BULLET.replace_all(&c, ". ").into_owned();
    c = RE_NUMBERED.replace_all(&c, ". ").into_owned();
    // Blockquote markers removed
    c = RE_BLOCKQUOTE.replace_all(&c, "").into_owned();
    // Clean up leading dot at start of string
    c = RE_LEADING_DOT.replace(&c, "").into_owned();
    // Double periods → single
    c = RE_DOUBLE_DOT.replace_all(&c, ".").into_owned();
    // Collapse whitespace
    c = RE_MULTI_SPACE.replace_all(&c, " ").into_owned();

    c.trim().to_string()
}

// ─── Tokenizer ──────────────────────────────────────────────────────────────

static TOKENIZER: LazyLock<CoreBPE> =
    LazyLock::new(|| tiktoken_rs::cl100k_base().expect("cl100k_base ranks are bundled with tiktoken-rs"));

/// Number of cl100k_base tokens `text` encodes to.
pub fn count_tokens(text: &str) -> usize {
    TOKENIZER.encode_ordinary(text).len()
}

/// Encode `text` to cl100k_base token ids.
pub fn encode(text: &str) -> Vec<usize> {
    TOKENIZER.encode_ordinary(text)
}

/// Decode cl100k_base token ids back to text.
///
/// Only ever called on ids this module itself produced via [`encode`], so a
/// decode failure (which should not happen) falls back to an empty string
/// rather than panicking.
pub fn decode(tokens: &[usize]) -> String {
    TOKENIZER.decode(tokens.to_vec()).unwrap_or_default()
}

// ─── Separator detection ────────────────────────────────────────────────────
//
// Rust's `regex` crate has no lookaround, so Tier-1/Tier-2 separator search is
// a manual char-indexed scan rather than the lookahead-based regex the
// original Python segmenter uses. Each function returns candidate end-offsets
// (byte indices) in left-to-right order; the offset is where the resulting
// segment would end if cut there.

// Full-width CJK terminators are unambiguous sentence enders on their own —
// CJK prose has no space after them — so they cut unconditionally. The ASCII
// `!`/`?` still require trailing whitespace or end-of-buffer, since standalone
// they show up inside quoted/emphasized fragments that aren't sentence ends.
const TIER1_CJK_ENDERS: [char; 4] = ['。', '！', '？', '…'];
const TIER1_ASCII_ENDERS: [char; 2] = ['!', '?'];

/// Tier-1 separators: strong sentence-ending punctuation, consumed at the
/// punctuation mark itself (the original's lookahead doesn't consume the
/// trailing whitespace), plus runs of one or more newlines (consumed in
/// full, since that half of the original pattern is not a lookahead).
pub fn tier1_matches(buf: &str) -> Vec<usize> {
    let chars: Vec<(usize, char)> = buf.char_indices().collect();
    let n = chars.len();
    let byte_len = buf.len();
    let mut out = Vec::new();
    let mut i = 0;

    while i < n {
        let (bi, c) = chars[i];

        if TIER1_CJK_ENDERS.contains(&c) {
            out.push(bi + c.len_utf8());
            i += 1;
            continue;
        }

        if TIER1_ASCII_ENDERS.contains(&c) {
            let end = bi + c.len_utf8();
            let followed_by_ws_or_end = match chars.get(i + 1) {
                None => true,
                Some(&(_, next)) => next.is_whitespace(),
            };
            if followed_by_ws_or_end {
                out.push(end);
            }
            i += 1;
            continue;
        }

        if c == '.' {
            let end = bi + c.len_utf8();
            if i + 1 >= n {
                // `.` at end-of-buffer
                out.push(end);
            } else {
                let mut j = i + 1;
                while j < n && chars[j].1.is_whitespace() {
                    j += 1;
                }
                if j >= n {
                    // only whitespace remains until end-of-buffer
                    out.push(end);
                } else if j > i + 1 && chars[j].1.is_uppercase() {
                    // whitespace run then an uppercase letter
                    out.push(end);
                }
            }
            i += 1;
            continue;
        }

        if c == '\n' {
            let mut j = i;
            while j < n && chars[j].1 == '\n' {
                j += 1;
            }
            let end = if j < n { chars[j].0 } else { byte_len };
            out.push(end);
            i = j;
            continue;
        }

        i += 1;
    }

    out
}

/// Tier-2 separator: a comma followed by one or more whitespace characters,
/// consumed in full (matches the original's `,\s+`, which is not a
/// lookahead).
pub fn tier2_matches(buf: &str) -> Vec<usize> {
    let chars: Vec<(usize, char)> = buf.char_indices().collect();
    let n = chars.len();
    let byte_len = buf.len();
    let mut out = Vec::new();
    let mut i = 0;

    while i < n {
        if chars[i].1 == ',' && i + 1 < n && chars[i + 1].1.is_whitespace() {
            let mut j = i + 1;
            while j < n && chars[j].1.is_whitespace() {
                j += 1;
            }
            let end = if j < n { chars[j].0 } else { byte_len };
            out.push(end);
            i = j;
            continue;
        }
        i += 1;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── clean_text_for_tts ──────────────────────────────────────────

    #[test]
    fn strips_fenced_code_blocks() {
        let input = "before ```rust\nfn main() {}\n``` after";
        assert_eq!(
            clean_text_for_tts(input),
            "before See the code in our conversation. after"
        );
    }

    #[test]
    fn strips_tables() {
        let input = "intro\n| a | b |\n| 1 | 2 |\nafter";
        let result = clean_text_for_tts(input);
        assert!(result.contains("See the table in our conversation."));
        assert!(result.contains("after"));
    }

    #[test]
    fn strips_inline_code() {
        assert_eq!(clean_text_for_tts("use `println!` here"), "use here");
    }

    #[test]
    fn strips_bold() {
        assert_eq!(clean_text_for_tts("this is **bold** text"), "this is bold text");
    }

    #[test]
    fn strips_italic() {
        assert_eq!(clean_text_for_tts("this is *italic* text"), "this is italic text");
    }

    #[test]
    fn strips_headings() {
        assert_eq!(clean_text_for_tts("## Hello World"), "Hello World");
        assert_eq!(clean_text_for_tts("# H1\n## H2"), "H1\nH2");
    }

    #[test]
    fn strips_links() {
        assert_eq!(
            clean_text_for_tts("click [here](https://example.com) now"),
            "click here now"
        );
    }

    #[test]
    fn strips_bullet_lists() {
        let input = "items:\n- first\n- second";
        let result = clean_text_for_tts(input);
        assert!(result.contains(". first"));
        assert!(result.contains(". second"));
    }

    #[test]
    fn strips_numbered_lists() {
        let input = "steps:\n1. first\n2. second";
        let result = clean_text_for_tts(input);
        assert!(result.contains(". first"));
        assert!(result.contains(". second"));
    }

    #[test]
    fn strips_blockquotes() {
        let result = clean_text_for_tts("> quoted line\nplain line");
        assert!(!result.contains('>'));
        assert!(result.contains("quoted line"));
        assert!(result.contains("plain line"));
    }

    #[test]
    fn strips_horizontal_rules() {
        let result = clean_text_for_tts("above\n---\nbelow");
        assert!(!result.contains("---"));
        assert!(result.contains("above"));
        assert!(result.contains("below"));
    }

    #[test]
    fn collapses_whitespace() {
        assert_eq!(clean_text_for_tts("hello    world"), "hello world");
    }

    #[test]
    fn cleans_double_periods() {
        assert_eq!(clean_text_for_tts("end.. start"), "end. start");
    }

    #[test]
    fn empty_input() {
        assert_eq!(clean_text_for_tts(""), "");
    }

    #[test]
    fn plain_text_unchanged() {
        assert_eq!(
            clean_text_for_tts("Hello, how are you today?"),
            "Hello, how are you today?"
        );
    }

    // ── tokenizer ──────────────────────────────────────────────────

    #[test]
    fn count_tokens_nonzero_for_nonempty_text() {
        assert!(count_tokens("Hello, world.") > 0);
    }

    #[test]
    fn count_tokens_zero_for_empty_text() {
        assert_eq!(count_tokens(""), 0);
    }

    #[test]
    fn encode_decode_round_trip() {
        let text = "The quick brown fox jumps over the lazy dog.";
        let tokens = encode(text);
        assert_eq!(decode(&tokens), text);
    }

    // ── tier1_matches ────────────────────────────────────────────────

    #[test]
    fn tier1_matches_period_before_uppercase() {
        let matches = tier1_matches("First sentence. Second sentence.");
        assert_eq!(matches, vec![15, 32]);
    }

    #[test]
    fn tier1_ignores_abbreviation_period() {
        // "Mr. Smith" — period followed by whitespace then uppercase still
        // matches under this simplified rule set; callers that want
        // abbreviation awareness rely on min_tokens gating, not tier
        // selection, to avoid cutting too early.
        let matches = tier1_matches("e.g. value");
        assert!(matches.is_empty());
    }

    #[test]
    fn tier1_matches_cjk_punctuation() {
        let matches = tier1_matches("你好。再见");
        assert_eq!(matches.len(), 1);
    }

    #[test]
    fn tier1_matches_question_and_exclamation() {
        let matches = tier1_matches("Really? Yes! OK.");
        assert_eq!(matches.len(), 3);
    }

    #[test]
    fn tier1_matches_newline_run() {
        let matches = tier1_matches("first\n\n\nsecond");
        assert_eq!(matches, vec![8]);
    }

    #[test]
    fn tier1_matches_period_at_end_of_buffer() {
        let matches = tier1_matches("the end.");
        assert_eq!(matches, vec![8]);
    }

    #[test]
    fn tier1_no_match_mid_sentence_period() {
        // "3.14" — period not followed by whitespace
        let matches = tier1_matches("pi is 3.14 roughly");
        assert!(matches.is_empty());
    }

    // ── tier2_matches ────────────────────────────────────────────────

    #[test]
    fn tier2_matches_comma_whitespace() {
        let matches = tier2_matches("first, second, third");
        assert_eq!(matches.len(), 2);
    }

    #[test]
    fn tier2_no_match_without_trailing_whitespace() {
        let matches = tier2_matches("1,2,3");
        assert!(matches.is_empty());
    }
}
