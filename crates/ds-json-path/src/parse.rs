/// One step of a parsed path: either an object key or an array index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Key(String),
    Index(usize),
}

/// Parse a dotted/bracketed path string into its segments.
///
/// Examples: `"a.b.c"` → `[Key(a), Key(b), Key(c)]`,
/// `"items[2].name"` → `[Key(items), Index(2), Key(name)]`,
/// `"[0][1]"` → `[Index(0), Index(1)]`.
///
/// An empty string parses to an empty segment list (the path refers to
/// the root value).
pub fn parse(path: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut current = String::new();

    let mut chars = path.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '.' => {
                if !current.is_empty() {
                    segments.push(Segment::Key(std::mem::take(&mut current)));
                }
            }
            '[' => {
                if !current.is_empty() {
                    segments.push(Segment::Key(std::mem::take(&mut current)));
                }
                let mut index_str = String::new();
                for c in chars.by_ref() {
                    if c == ']' {
                        break;
                    }
                    index_str.push(c);
                }
                match index_str.parse::<usize>() {
                    Ok(i) => segments.push(Segment::Index(i)),
                    Err(_) => segments.push(Segment::Key(index_str)),
                }
            }
            other => current.push(other),
        }
    }
    if !current.is_empty() {
        segments.push(Segment::Key(current));
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_dotted_path() {
        assert_eq!(
            parse("a.b.c"),
            vec![
                Segment::Key("a".into()),
                Segment::Key("b".into()),
                Segment::Key("c".into())
            ]
        );
    }

    #[test]
    fn parses_mixed_brackets_and_dots() {
        assert_eq!(
            parse("items[2].name"),
            vec![
                Segment::Key("items".into()),
                Segment::Index(2),
                Segment::Key("name".into())
            ]
        );
    }

    #[test]
    fn parses_leading_bracket_index() {
        assert_eq!(
            parse("[0][1]"),
            vec![Segment::Index(0), Segment::Index(1)]
        );
    }

    #[test]
    fn empty_path_has_no_segments() {
        assert_eq!(parse(""), vec![]);
    }

    #[test]
    fn non_numeric_bracket_contents_become_a_key() {
        assert_eq!(parse("a[b]"), vec![Segment::Key("a".into()), Segment::Key("b".into())]);
    }
}
