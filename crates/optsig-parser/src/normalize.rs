//! Text normalisation applied before shape matching.
//!
//! - Full-width ASCII forms (`：`, `＄`, `１`, `Ａ`) fold to ASCII
//! - Dash variants (`–`, `—`, `~`, `～`) fold to `-`
//! - `。` and `,` between digits become a decimal point, elsewhere a space
//! - Whitespace runs collapse to one space

const FULL_WIDTH_START: u32 = 0xFF01;
const FULL_WIDTH_END: u32 = 0xFF5E;
const FULL_WIDTH_OFFSET: u32 = 0xFEE0;

fn fold_char(c: char) -> char {
    let code = c as u32;
    let c = if (FULL_WIDTH_START..=FULL_WIDTH_END).contains(&code) {
        char::from_u32(code - FULL_WIDTH_OFFSET).unwrap_or(c)
    } else {
        c
    };
    match c {
        '\u{3000}' => ' ',
        '–' | '—' | '−' | '~' => '-',
        other => other,
    }
}

/// Normalise chat text for matching.
pub fn normalize(text: &str) -> String {
    let folded: Vec<char> = text.chars().map(fold_char).collect();

    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;
    for (i, &c) in folded.iter().enumerate() {
        let c = match c {
            '。' | ',' => {
                let prev_digit = i > 0 && folded[i - 1].is_ascii_digit();
                let next_digit = folded.get(i + 1).is_some_and(|n| n.is_ascii_digit());
                if prev_digit && next_digit {
                    '.'
                } else {
                    ' '
                }
            }
            other => other,
        };
        if c.is_whitespace() {
            pending_space = !out.is_empty();
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        out.push(c);
    }
    out
}
