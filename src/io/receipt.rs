use crate::domain::{parse_non_negative_cents, Cents};

/// Find the amount on a receipt.
///
/// A number on a line mentioning "total" wins; otherwise the first number in
/// the text is used. Numbers may carry a leading `$`. Returns `None` when the
/// text holds no number at all.
pub fn extract_receipt_amount(text: &str) -> Option<Cents> {
    text.lines()
        .filter(|line| line.to_lowercase().contains("total"))
        .find_map(first_amount)
        .or_else(|| first_amount(text))
}

fn first_amount(text: &str) -> Option<Cents> {
    let bytes = text.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        if !bytes[i].is_ascii_digit() {
            i += 1;
            continue;
        }

        let start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        // Optional fractional part: a dot followed by digits
        if i + 1 < bytes.len() && bytes[i] == b'.' && bytes[i + 1].is_ascii_digit() {
            i += 1;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
        }

        if let Ok(cents) = parse_non_negative_cents(&text[start..i]) {
            return Some(cents);
        }
    }

    None
}
