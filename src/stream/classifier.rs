/// Represents the type of a line in an M3U8 playlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineType {
    Blank,
    /// `#EXT...` tag.
    Tag,
    Comment,
    /// Segment or sub-playlist reference.
    MediaReference,
}

impl LineType {
    /// Whether the line is emitted byte-identical.
    pub fn is_passthrough(&self) -> bool {
        !matches!(self, Self::MediaReference)
    }
}

/// Classifier for M3U8 lines.
pub struct LineClassifier;

impl LineClassifier {
    /// Classify a line from an M3U8 playlist.
    pub fn classify(line: &str) -> LineType {
        let line = line.trim();

        if line.is_empty() {
            LineType::Blank
        } else if line.starts_with("#EXT") {
            LineType::Tag
        } else if line.starts_with('#') {
            LineType::Comment
        } else {
            LineType::MediaReference
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_tags() {
        assert_eq!(LineClassifier::classify("#EXTM3U"), LineType::Tag);
        assert_eq!(
            LineClassifier::classify("#EXT-X-STREAM-INF:BANDWIDTH=1000000"),
            LineType::Tag
        );
        assert_eq!(
            LineClassifier::classify(r#"#EXT-X-KEY:METHOD=AES-128,URI="key.bin""#),
            LineType::Tag
        );
    }

    #[test]
    fn test_classify_media_reference() {
        assert_eq!(
            LineClassifier::classify("https://example.com/playlist.m3u8"),
            LineType::MediaReference
        );
        assert_eq!(LineClassifier::classify("segment001.ts"), LineType::MediaReference);
        assert_eq!(LineClassifier::classify("  segment001.ts\r"), LineType::MediaReference);
    }

    #[test]
    fn test_classify_comment() {
        assert_eq!(
            LineClassifier::classify("# This is a comment"),
            LineType::Comment
        );
    }

    #[test]
    fn test_classify_blank() {
        assert_eq!(LineClassifier::classify(""), LineType::Blank);
        assert_eq!(LineClassifier::classify("  "), LineType::Blank);
        assert_eq!(LineClassifier::classify("\r"), LineType::Blank);
        assert!(LineType::Blank.is_passthrough());
        assert!(!LineType::MediaReference.is_passthrough());
    }
}
