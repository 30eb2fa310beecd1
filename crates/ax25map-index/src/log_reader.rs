use crate::line_parser::{LineKind, LineParser};
use ax25map_core::FrameRecord;

/// Longest payload excerpt kept per frame.
pub const PAYLOAD_SAMPLE_CHARS: usize = 80;

/// Walks a whole log, pairing each frame header with the first line of
/// readable payload text that follows it.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReader {
    parser: LineParser,
}

impl LogReader {
    pub fn new(parser: LineParser) -> Self {
        Self { parser }
    }

    pub fn read<I, S>(&self, lines: I) -> Vec<FrameRecord>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut frames = Vec::new();
        let mut pending: Option<FrameRecord> = None;

        for line in lines {
            match self.parser.classify(line.as_ref()) {
                LineKind::Frame(frame) => {
                    if let Some(done) = pending.replace(frame) {
                        frames.push(done);
                    }
                }
                LineKind::Text(text) => {
                    if let Some(frame) = pending.as_mut()
                        && frame.payload_sample.is_none()
                    {
                        frame.payload_sample = Some(Self::sample(&text));
                    }
                }
                LineKind::HexDump | LineKind::Blank => {}
            }
        }

        frames.extend(pending);
        frames
    }

    fn sample(text: &str) -> String {
        text.chars().take(PAYLOAD_SAMPLE_CHARS).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attaches_first_payload_line() {
        let log = [
            "fm K6FB to BEACON ctl UI pid=F0(Text) len 48",
            "0000  96 88 64 a8 9e 40 e0 96",
            "K6FB Santa Cruz BBS",
            "second payload line",
            "fm AB6BR to TONY via WOODY ctl UI pid=F0(Text) len 4",
        ];
        let frames = LogReader::default().read(log);

        assert_eq!(frames.len(), 2);
        assert_eq!(
            frames[0].payload_sample.as_deref(),
            Some("K6FB Santa Cruz BBS")
        );
        assert_eq!(frames[1].payload_sample, None);
    }

    #[test]
    fn test_text_before_any_frame_is_dropped() {
        let frames = LogReader::default().read(["hello world", "", "0000  01 02 03"]);
        assert!(frames.is_empty());
    }

    #[test]
    fn test_sample_is_truncated_on_char_boundary() {
        let long = "é".repeat(200);
        let log = vec!["fm K6FB to ID ctl UI".to_string(), long];
        let frames = LogReader::default().read(&log);
        assert_eq!(
            frames[0].payload_sample.as_ref().map(|s| s.chars().count()),
            Some(PAYLOAD_SAMPLE_CHARS)
        );
    }
}
