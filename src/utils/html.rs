use crate::scoring::{ScoreCard, diff::Tag};

/// Escape plain text for embedding in HTML using the ammonia library.
///
/// Unlike `ammonia::clean`, nothing is kept as markup: every tag the student
/// typed is rendered literally.
pub fn escape_text(input: &str) -> String {
    ammonia::clean_text(input)
}

/// Renders `typed` as HTML with each mistake of `card` marked.
///
/// Replaced and inserted text is wrapped in `<mark>`, reference text the
/// student skipped is shown in `<del>`. The spans come from the same opcodes
/// that produced `card.mistake_count`, so the two always agree.
pub fn highlight_mistakes(reference: &str, typed: &str, card: &ScoreCard) -> String {
    let typed: Vec<char> = typed.chars().collect();
    let compared: Vec<char> = reference.chars().take(typed.len()).collect();
    let text = |chars: &[char]| escape_text(&chars.iter().collect::<String>());

    let mut out = String::new();
    for op in &card.opcodes {
        match op.tag {
            Tag::Equal => out.push_str(&text(&typed[op.b.clone()])),
            Tag::Replace | Tag::Insert => {
                out.push_str("<mark>");
                out.push_str(&text(&typed[op.b.clone()]));
                out.push_str("</mark>");
            }
            Tag::Delete => {
                out.push_str("<del>");
                out.push_str(&text(&compared[op.a.clone()]));
                out.push_str("</del>");
            }
        }
    }
    out
}
