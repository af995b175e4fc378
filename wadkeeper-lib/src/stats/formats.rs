//! Statistics log formats.
//!
//! Each engine family that records statistics has one [`StatsFormat`]
//! describing where the log lives, what launch arguments enable it, and a
//! grammar function turning the full log text into records. The ingestor
//! only ever talks to this table.

use std::sync::LazyLock;

use regex::Regex;
use wadkeeper_core::StatRecord;

/// Where a format's log is written, relative to the port directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsSource {
    /// A single file with a fixed name.
    File(&'static str),
    /// Every file with this extension written during the session.
    Directory { extension: &'static str },
}

/// Result of parsing one log text.
#[derive(Debug, Default)]
pub struct ParsedStats {
    /// Records in the order they appear.
    pub records: Vec<StatRecord>,
    /// One entry per line that could not be understood.
    pub errors: Vec<String>,
}

/// One engine statistics format.
#[derive(Debug)]
pub struct StatsFormat {
    pub name: &'static str,
    pub source: StatsSource,
    /// Appended to the command line so the engine writes the log.
    pub launch_args: &'static [&'static str],
    /// The log is only complete once the engine has closed it.
    pub read_on_close: bool,
    pub parse: fn(&str) -> ParsedStats,
}

/// Chocolate Doom `-statdump` output, written once at exit.
pub static STATDUMP: StatsFormat = StatsFormat {
    name: "statdump",
    source: StatsSource::File("stats.txt"),
    launch_args: &["-statdump", "stats.txt"],
    read_on_close: true,
    parse: parse_statdump,
};

/// PrBoom+ `-levelstat` output, rewritten after every completed level.
pub static LEVELSTAT: StatsFormat = StatsFormat {
    name: "levelstat",
    source: StatsSource::File("levelstat.txt"),
    launch_args: &["-levelstat"],
    read_on_close: false,
    parse: parse_levelstat,
};

/// CnDoom writes a statdump-style text file next to each recorded demo.
pub static CNDOOM_STATS: StatsFormat = StatsFormat {
    name: "cndoom",
    source: StatsSource::Directory { extension: ".txt" },
    launch_args: &[],
    read_on_close: true,
    parse: parse_statdump,
};

/// Parse `h:mm:ss`, `m:ss` or `m:ss.cc` into seconds.
pub fn parse_clock(text: &str) -> Option<f32> {
    let mut total = 0.0f32;
    for part in text.trim().split(':') {
        let value: f32 = part.parse().ok()?;
        total = total * 60.0 + value;
    }
    Some(total)
}

// ── statdump ────────────────────────────────────────────────────────────────

static STATDUMP_COUNTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(Kills|Items|Secrets):\s*(\d+)\s*/\s*(\d+)").expect("static regex")
});
static STATDUMP_TIME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Time:\s*([\d:]+)").expect("static regex"));
static STATDUMP_PLAYER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Player\s+(\d+)").expect("static regex"));

/// Position relative to a `====` / map name / `====` header.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Header {
    Outside,
    Opened,
    Named,
}

/// Grammar for Chocolate Doom statdump blocks:
///
/// ```text
/// ===========================================
/// MAP01
/// ===========================================
///
/// Time: 0:35 (par: 0:30)
///
/// Player 1 (Green):
///     Kills: 5 / 20 (25%)
///     Items: 3 / 14 (21%)
///     Secrets: 0 / 3 (0%)
/// ```
///
/// Only the first player's counters are kept.
pub fn parse_statdump(text: &str) -> ParsedStats {
    let mut out = ParsedStats::default();
    let mut current: Option<StatRecord> = None;
    let mut header = Header::Outside;
    let mut in_first_player = false;

    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        if line.chars().all(|c| c == '=') {
            header = match header {
                Header::Named => Header::Outside,
                _ => Header::Opened,
            };
            continue;
        }
        if header == Header::Opened {
            if let Some(done) = current.take() {
                out.records.push(done);
            }
            current = Some(StatRecord::new(line));
            header = Header::Named;
            in_first_player = false;
            continue;
        }
        header = Header::Outside;
        let Some(record) = current.as_mut() else {
            out.errors.push(format!("Line {}: data before any map header", idx + 1));
            continue;
        };
        if let Some(caps) = STATDUMP_TIME.captures(line) {
            match parse_clock(&caps[1]) {
                Some(secs) => record.level_time = secs,
                None => out
                    .errors
                    .push(format!("Line {}: invalid time '{}'", idx + 1, &caps[1])),
            }
        } else if let Some(caps) = STATDUMP_PLAYER.captures(line) {
            in_first_player = &caps[1] == "1";
        } else if let Some(caps) = STATDUMP_COUNTER.captures(line) {
            if !in_first_player {
                continue;
            }
            let (Ok(value), Ok(total)) = (caps[2].parse::<i32>(), caps[3].parse::<i32>()) else {
                out.errors
                    .push(format!("Line {}: counter out of range", idx + 1));
                continue;
            };
            match &caps[1] {
                "Kills" => (record.kills, record.total_kills) = (value, total),
                "Items" => (record.items, record.total_items) = (value, total),
                _ => (record.secrets, record.total_secrets) = (value, total),
            }
        } else {
            out.errors
                .push(format!("Line {}: unrecognized statistics line '{}'", idx + 1, line));
        }
    }

    if let Some(done) = current {
        out.records.push(done);
    }
    out
}

// ── levelstat ───────────────────────────────────────────────────────────────

static LEVELSTAT_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<map>\S+)\s+-\s+(?P<time>\d+(?::\d{2})+(?:\.\d+)?)\s+\([\d:.]+\)\s+K:\s*(?P<k>\d+)/(?P<tk>\d+)\s+I:\s*(?P<i>\d+)/(?P<ti>\d+)\s+S:\s*(?P<s>\d+)/(?P<ts>\d+)",
    )
    .expect("static regex")
});

/// Grammar for PrBoom+ levelstat lines, one map per line:
///
/// ```text
/// MAP01 - 0:07.11 (0:07)  K: 0/4  I: 0/4  S: 0/0
/// ```
pub fn parse_levelstat(text: &str) -> ParsedStats {
    let mut out = ParsedStats::default();
    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        let Some(caps) = LEVELSTAT_LINE.captures(line) else {
            out.errors
                .push(format!("Line {}: unrecognized levelstat line '{}'", idx + 1, line));
            continue;
        };
        let number = |name: &str| caps[name].parse::<i32>().ok();
        let (Some(k), Some(tk), Some(i), Some(ti), Some(s), Some(ts)) = (
            number("k"),
            number("tk"),
            number("i"),
            number("ti"),
            number("s"),
            number("ts"),
        ) else {
            out.errors
                .push(format!("Line {}: counter out of range", idx + 1));
            continue;
        };
        let mut record = StatRecord::new(&caps["map"]);
        record.level_time = parse_clock(&caps["time"]).unwrap_or_default();
        (record.kills, record.total_kills) = (k, tk);
        (record.items, record.total_items) = (i, ti);
        (record.secrets, record.total_secrets) = (s, ts);
        out.records.push(record);
    }
    out
}
