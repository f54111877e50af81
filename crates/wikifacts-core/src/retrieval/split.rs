//! Fragment splitters. Fragments carry no identity beyond their position.

use regex::Regex;
use std::sync::OnceLock;

/// Paragraphs are blocks separated by a blank (or whitespace-only) line.
pub fn paragraphs(text: &str) -> Vec<String> {
    static BLANK_LINE: OnceLock<Regex> = OnceLock::new();
    let re = BLANK_LINE.get_or_init(|| Regex::new(r"\n[ \t\r]*\n").expect("static regex"));
    re.split(text)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

const TERMINATORS: &[char] = &['.', '!', '?', '…'];
const WIDE_TERMINATORS: &[char] = &['。', '！', '？'];
const CLOSERS: &[char] = &['"', '\'', '”', '’', '»', ')', ']'];

/// Sentence splitter for space-delimited and CJK scripts.
///
/// A sentence ends after a terminator (plus any closing quotes or brackets)
/// followed by whitespace, after a full-width terminator, or at a paragraph
/// break.
pub fn sentences(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    for para in paragraphs(text) {
        let chars: Vec<(usize, char)> = para.char_indices().collect();
        let mut start = 0usize;
        let mut i = 0usize;
        while i < chars.len() {
            let (_, c) = chars[i];
            let wide = WIDE_TERMINATORS.contains(&c);
            if wide || TERMINATORS.contains(&c) {
                let mut j = i + 1;
                while j < chars.len()
                    && (TERMINATORS.contains(&chars[j].1)
                        || WIDE_TERMINATORS.contains(&chars[j].1)
                        || CLOSERS.contains(&chars[j].1))
                {
                    j += 1;
                }
                let at_boundary = j >= chars.len() || chars[j].1.is_whitespace();
                if wide || at_boundary {
                    let end = chars.get(j).map_or(para.len(), |(b, _)| *b);
                    push_trimmed(&mut out, &para[start..end]);
                    start = end;
                }
                i = j;
                continue;
            }
            i += 1;
        }
        push_trimmed(&mut out, &para[start..]);
    }
    out
}

fn push_trimmed(out: &mut Vec<String>, s: &str) {
    let s = s.trim();
    if !s.is_empty() {
        out.push(s.to_string());
    }
}
