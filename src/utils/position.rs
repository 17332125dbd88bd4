use tower_lsp::lsp_types::Position;

/// Byte offsets of the first character of every line. A line starts at
/// offset 0 and after every `\n`.
pub fn compute_line_starts(text: &str) -> Vec<usize> {
    let mut starts = vec![0];
    for (i, b) in text.bytes().enumerate() {
        if b == b'\n' {
            starts.push(i + 1);
        }
    }
    starts
}

/// Converts an LSP Position to a byte offset in the text.
/// Position.character counts UTF-16 code units; a character past the end of
/// the line clamps to the line's final column.
pub fn position_to_offset(text: &str, line_starts: &[usize], pos: Position) -> Option<usize> {
    let line = pos.line as usize;
    let line_start = *line_starts.get(line)?;

    let line_end = text[line_start..]
        .find('\n')
        .map(|d| line_start + d)
        .unwrap_or(text.len());

    let mut units = 0usize;
    for (i, ch) in text[line_start..line_end].char_indices() {
        if units >= pos.character as usize {
            return Some(line_start + i);
        }
        units += ch.len_utf16();
    }
    Some(line_end)
}

/// Converts a byte offset back to an LSP Position with UTF-16 columns.
/// Offsets past the end of the text map to the end of the last line.
pub fn offset_to_position(text: &str, line_starts: &[usize], offset: usize) -> Position {
    let offset = offset.min(text.len());
    let line = line_starts.partition_point(|&s| s <= offset).saturating_sub(1);
    let line_start = line_starts[line];

    let character: usize = text[line_start..offset].chars().map(|c| c.len_utf16()).sum();
    Position::new(line as u32, character as u32)
}

/// Walks backward from offset and captures the maximal `[A-Za-z0-9_]*`
/// run ending there as the completion prefix.
pub fn ascii_ident_prefix(text: &str, mut offset: usize) -> String {
    let bytes = text.as_bytes();
    if offset > bytes.len() {
        offset = bytes.len();
    }
    let mut start = offset;
    while start > 0 {
        let c = bytes[start - 1];
        let is_ident = c.is_ascii_alphanumeric() || c == b'_';
        if !is_ident {
            break;
        }
        start -= 1;
    }
    text[start..offset].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_starts_follow_newlines() {
        assert_eq!(compute_line_starts("ab\ncd\n"), vec![0, 3, 6]);
        assert_eq!(compute_line_starts(""), vec![0]);
    }

    #[test]
    fn position_round_trips_through_offset() {
        let text = "variable x;\nprocedure start begin\nend\n";
        let starts = compute_line_starts(text);

        let offset = position_to_offset(text, &starts, Position::new(1, 10)).expect("offset");
        assert_eq!(&text[offset..offset + 5], "start");
        assert_eq!(offset_to_position(text, &starts, offset), Position::new(1, 10));
    }

    #[test]
    fn character_past_line_end_clamps() {
        let text = "ab\ncd\n";
        let starts = compute_line_starts(text);
        assert_eq!(position_to_offset(text, &starts, Position::new(0, 99)), Some(2));
    }

    #[test]
    fn line_past_document_end_is_none() {
        let text = "ab\n";
        let starts = compute_line_starts(text);
        assert_eq!(position_to_offset(text, &starts, Position::new(5, 0)), None);
    }

    #[test]
    fn columns_count_utf16_units() {
        // '𝕏' is a surrogate pair: two UTF-16 units, four UTF-8 bytes.
        let text = "𝕏x\n";
        let starts = compute_line_starts(text);

        assert_eq!(position_to_offset(text, &starts, Position::new(0, 2)), Some(4));
        assert_eq!(offset_to_position(text, &starts, 4), Position::new(0, 2));
    }

    #[test]
    fn ident_prefix_stops_at_non_ident() {
        let text = "    rand";
        assert_eq!(ascii_ident_prefix(text, 8), "rand");
        assert_eq!(ascii_ident_prefix(text, 4), "");
        assert_eq!(ascii_ident_prefix("a.bc", 4), "bc");
    }
}
