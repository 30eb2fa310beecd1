//! Single-line recognizer for link-layer monitor output.
//!
//! A frame header looks like
//! `fm K7BBS to BEACON via HMKR* KRDG* KROCK ctl UI pid=F0(Text) len 48`,
//! optionally preceded by a syslog or timestamp prefix. Everything else
//! (payload text, hex dumps, status chatter) is noise.

use ax25map_core::{FrameRecord, PacketKind, PathHop, SsidMode, StationId};
use chrono::NaiveDateTime;
use regex::Regex;
use std::sync::LazyLock;

/// `fm <SRC> to <DST>` anywhere in the line.
static HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bfm\s+(\S+)\s+to\s+(\S+)").unwrap());

/// Everything after `via` up to `ctl`, `pid=`, `len`, or end of line.
static VIA_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*via\b(.*?)(?:\bctl\b|\bpid\s*=|\blen\b|$)").unwrap()
});

static CTL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bctl\s+(\S+)").unwrap());

static PID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bpid\s*=\s*(\S+)").unwrap());

static LEN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\blen\s+(\d+)").unwrap());

static TIMESTAMP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*\[?(\d{4}-\d{2}-\d{2})[ T](\d{2}:\d{2}:\d{2})").unwrap()
});

/// Offset-prefixed hex dump rows, e.g. `0000  96 88 64 a8 ...`.
static HEX_ROW_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*[0-9a-f]{4}:?\s+(?:[0-9a-f]{2}\s+){2,}").unwrap());

/// Upper-case callsign with optional numeric SSID. Monitor output never
/// prints lower-case stations, so this also keeps payload prose out.
static STATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z0-9]{1,6}(?:-\d{1,2})?$").unwrap());

const PATH_PUNCTUATION: &[char] = &[',', ';', ':', '/', '(', ')', '[', ']', '{', '}'];
const USED_MARKER: char = '*';

/// What a single log line turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    Frame(FrameRecord),
    HexDump,
    Text(String),
    Blank,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LineParser {
    ssid_mode: SsidMode,
}

impl LineParser {
    pub fn new(ssid_mode: SsidMode) -> Self {
        Self { ssid_mode }
    }

    pub fn ssid_mode(&self) -> SsidMode {
        self.ssid_mode
    }

    /// Parse one line into a frame header, or `None` for anything else.
    pub fn parse_line(&self, line: &str) -> Option<FrameRecord> {
        match self.classify(line) {
            LineKind::Frame(frame) => Some(frame),
            _ => None,
        }
    }

    pub fn classify(&self, line: &str) -> LineKind {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            return LineKind::Blank;
        }
        if Self::is_hex_dump(line) {
            return LineKind::HexDump;
        }
        match self.parse_header(line) {
            Some(frame) => LineKind::Frame(frame),
            None => LineKind::Text(line.trim().to_string()),
        }
    }

    fn is_hex_dump(line: &str) -> bool {
        line.contains(": 0000 ") || HEX_ROW_RE.is_match(line)
    }

    fn is_station(token: &str) -> bool {
        STATION_RE.is_match(token)
    }

    fn parse_header(&self, line: &str) -> Option<FrameRecord> {
        let header = HEADER_RE.captures(line)?;
        let raw_source = header.get(1)?.as_str();
        let raw_destination = header.get(2)?.as_str();
        if !Self::is_station(raw_source) || !Self::is_station(raw_destination) {
            return None;
        }

        let source = StationId::from_callsign(raw_source, self.ssid_mode);
        let destination = StationId::from_callsign(raw_destination, self.ssid_mode);
        let rest = &line[header.get(0)?.end()..];

        let digipeater_path = VIA_RE
            .captures(rest)
            .and_then(|via| via.get(1))
            .map(|segment| self.parse_path(segment.as_str()))
            .unwrap_or_default();

        let capture = |re: &Regex| {
            re.captures(rest)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string())
        };

        Some(FrameRecord {
            packet_kind: PacketKind::from_destination(destination.as_str()),
            source,
            destination,
            digipeater_path,
            payload_sample: None,
            control: capture(&CTL_RE),
            pid: capture(&PID_RE),
            length: capture(&LEN_RE).and_then(|len| len.parse().ok()),
            heard_at: Self::parse_timestamp(line),
        })
    }

    /// Tokenize a via segment. A trailing `*` marks a used hop; anything
    /// odd about a token demotes it to a plain, unused relay hop.
    fn parse_path(&self, segment: &str) -> Vec<PathHop> {
        segment
            .split_whitespace()
            .filter_map(|raw| {
                let token = raw.trim_matches(PATH_PUNCTUATION);
                if token.is_empty() {
                    return None;
                }

                if let Some(call) = token.strip_suffix(USED_MARKER)
                    && Self::is_station(call)
                {
                    return Some(PathHop::new(
                        StationId::from_callsign(call, self.ssid_mode),
                        true,
                    ));
                }

                let call: String = token.chars().filter(|&c| c != USED_MARKER).collect();
                let station = StationId::from_callsign(&call, self.ssid_mode);
                if station.is_empty() {
                    return None;
                }
                Some(PathHop::new(station, false))
            })
            .collect()
    }

    fn parse_timestamp(line: &str) -> Option<NaiveDateTime> {
        let caps = TIMESTAMP_RE.captures(line)?;
        let stamp = format!("{} {}", caps.get(1)?.as_str(), caps.get(2)?.as_str());
        NaiveDateTime::parse_from_str(&stamp, "%Y-%m-%d %H:%M:%S").ok()
    }
}
