//! Backend log markup.

/// Render backend log markup as plain text.
///
/// Logs carry a small subset of HTML: line breaks, paragraphs, emphasis and
/// character entities. Breaks and block ends become newlines, other tags are
/// dropped, and the common entities are decoded.
#[must_use]
pub fn markup_to_plain(markup: &str) -> String {
    let mut out = String::with_capacity(markup.len());
    let mut rest = markup;

    while let Some(start) = rest.find(['<', '&']) {
        out.push_str(&rest[..start]);
        rest = &rest[start..];

        if rest.starts_with('<') {
            let Some(end) = rest.find('>') else {
                out.push_str(rest);
                return out;
            };
            let tag = rest[1..end].trim().trim_end_matches('/').trim();
            let name = tag
                .split_whitespace()
                .next()
                .unwrap_or_default()
                .to_ascii_lowercase();
            if matches!(name.as_str(), "br" | "/p" | "/div" | "/li" | "/h1" | "/h2" | "/h3") {
                out.push('\n');
            }
            rest = &rest[end + 1..];
        } else {
            let decoded = rest.find(';').and_then(|end| {
                let entity = match &rest[1..end] {
                    "amp" => '&',
                    "lt" => '<',
                    "gt" => '>',
                    "quot" => '"',
                    "#39" | "apos" => '\'',
                    "nbsp" => ' ',
                    _ => return None,
                };
                Some((entity, end))
            });
            match decoded {
                Some((entity, end)) => {
                    out.push(entity);
                    rest = &rest[end + 1..];
                }
                None => {
                    out.push('&');
                    rest = &rest[1..];
                }
            }
        }
    }
    out.push_str(rest);
    out
}
