//! Comma splitting for lines of the legacy text export
//!
//! Header and descriptor lines use [`split_line`]: fields are separated by
//! `,` except inside double quotes, and a doubled quote (`""`) inside a
//! quoted span is a literal `"`. Data rows carry no quoting and use
//! [`split_fields`], which keeps every empty field. In both cases each field
//! is trimmed and has internal whitespace runs collapsed to a single space.

/// Collapse whitespace runs and trim both ends
pub fn simplify(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split one line into fields
///
/// ```
/// use recon_plot::tokenizer::split_line;
///
/// let fields = split_line(r#"Ud, "Time, s", "Vol""tage, V", 0"#);
/// assert_eq!(fields, vec!["Ud", "Time, s", "Vol\"tage, V", "0"]);
/// ```
pub fn split_line(line: &str) -> Vec<String> {
    let chars: Vec<char> = line.trim_end_matches(['\r', '\n']).chars().collect();
    let mut fields = Vec::new();
    let mut value = String::new();
    let mut in_quotes = false;

    for (i, &c) in chars.iter().enumerate() {
        match c {
            '"' => {
                if !in_quotes {
                    in_quotes = true;
                } else if i > 1 && chars[i - 1] == '"' {
                    value.push('"');
                }
                // Otherwise a closing quote; the next comma decides
            }
            ',' => {
                let after_escaped_quote = i > 2 && chars[i - 1] == '"' && chars[i - 2] == '"';
                let inside_open_span = in_quotes && chars[i - 1] != '"';

                if after_escaped_quote || inside_open_span {
                    value.push(c);
                } else {
                    fields.push(simplify(&value));
                    value.clear();
                    in_quotes = false;
                }
            }
            _ => value.push(c),
        }
    }

    if !value.is_empty() {
        fields.push(simplify(&value));
    }

    fields
}

/// Split a data row on every `,`, keeping empty fields
///
/// ```
/// use recon_plot::tokenizer::split_fields;
///
/// assert_eq!(split_fields(", s, V,"), vec!["", "s", "V", ""]);
/// ```
pub fn split_fields(line: &str) -> Vec<String> {
    line.trim_end_matches(['\r', '\n'])
        .split(',')
        .map(simplify)
        .collect()
}
