//! Event generation collaborators.
//!
//! The ledger knows nothing about where records come from. Initial
//! contents are supplied by a [`SeedSource`]; synthetic live traffic by an
//! [`EventGenerator`], which only describes an event and leaves ID and
//! timestamp assignment to the feed service.

use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use feed_types::{EventDraft, EventRecord, Severity};
use rand::Rng;
use uuid::Uuid;

/// Supplies the initial contents of a ledger.
pub trait SeedSource: Send + Sync {
    /// Produces the records to load, with timestamps relative to `now`.
    fn seed(&self, now: DateTime<Utc>) -> Vec<EventRecord>;
}

/// Describes synthetic events for the feed service to stamp and append.
pub trait EventGenerator: Send + Sync {
    /// Describes the `sequence`-th synthetic event.
    fn draft(&self, sequence: u64) -> EventDraft;
}

/// A seed with no records.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptySeed;

impl SeedSource for EmptySeed {
    fn seed(&self, _now: DateTime<Utc>) -> Vec<EventRecord> {
        Vec::new()
    }
}

impl SeedSource for Vec<EventRecord> {
    fn seed(&self, _now: DateTime<Utc>) -> Vec<EventRecord> {
        self.clone()
    }
}

/// One device in the demo catalog.
#[derive(Debug, Clone, Copy)]
struct Device {
    id: &'static str,
    name: &'static str,
    location: &'static str,
}

const DEVICES: [Device; 10] = [
    Device { id: "DEVICE-001", name: "Device - Main Entrance", location: "Main Entrance, Building A" },
    Device { id: "DEVICE-002", name: "Device - Server Room Access", location: "Server Room, Floor 3" },
    Device { id: "DEVICE-003", name: "Device - Executive Floor", location: "Executive Floor, Building B" },
    Device { id: "DEVICE-004", name: "Device - Parking Garage", location: "Parking Garage, Level 2" },
    Device { id: "DEVICE-005", name: "Device - Research Lab", location: "Research Lab, Building C" },
    Device { id: "DEVICE-006", name: "Device - Data Center", location: "Data Center, Basement" },
    Device { id: "DEVICE-007", name: "Device - Warehouse Entrance", location: "Warehouse Entrance, Building D" },
    Device { id: "DEVICE-008", name: "Device - Conference Room", location: "Conference Room, Floor 5" },
    Device { id: "DEVICE-009", name: "Device - IT Office", location: "IT Office, Floor 2" },
    Device { id: "DEVICE-010", name: "Device - Lobby", location: "Lobby, Building A" },
];

/// Event kinds the generated tail cycles through, indexed like [`DEVICES`].
const KINDS: [(&str, Severity, &str); 10] = [
    ("facial_authentication", Severity::Info, "Facial authentication successful"),
    ("tailgating_detection", Severity::Critical, "Tailgating detected"),
    ("access_denied", Severity::Warning, "Access denied - Authentication failure"),
    ("facial_authentication", Severity::Info, "Facial authentication successful"),
    ("facial_authentication", Severity::Info, "Facial authentication successful"),
    ("tailgating_detection", Severity::Critical, "Tailgating detected"),
    ("access_denied", Severity::Warning, "Access denied"),
    ("facial_authentication", Severity::Info, "Facial authentication successful"),
    ("facial_authentication", Severity::Info, "Facial authentication successful"),
    ("tailgating_detection", Severity::Critical, "Tailgating detected"),
];

/// Hand-written head of the demo feed:
/// (device index, type, severity, message, minutes ago, log file slot).
const CURATED: [(usize, &str, Severity, &str, i64, Option<usize>); 15] = [
    (0, "facial_authentication", Severity::Info, "Facial authentication successful", 5, None),
    (1, "facial_authentication", Severity::Warning, "Facial authentication failed", 12, None),
    (0, "tailgating_detection", Severity::Critical, "Tailgating detected - Unauthorized person followed authorized user", 18, Some(1)),
    (2, "facial_authentication", Severity::Info, "Facial authentication successful", 25, None),
    (1, "access_denied", Severity::Warning, "Access denied - Authentication failure after 3 attempts", 32, None),
    (3, "facial_authentication", Severity::Info, "Facial authentication successful", 45, None),
    (0, "tailgating_detection", Severity::Critical, "Tailgating detected - Multiple unauthorized individuals", 60, Some(2)),
    (4, "facial_authentication", Severity::Info, "Facial authentication successful", 45, None),
    (2, "access_denied", Severity::Error, "Access denied - Face mask detected, authentication required", 30, None),
    (5, "facial_authentication", Severity::Info, "Facial authentication successful", 120, None),
    (1, "system", Severity::Error, "System error - Camera calibration required", 100, Some(0)),
    (0, "facial_authentication", Severity::Info, "Facial authentication successful", 180, None),
    (3, "tailgating_detection", Severity::Critical, "Tailgating detected - Vehicle tailgating through gate", 150, Some(3)),
    (6, "facial_authentication", Severity::Warning, "Facial authentication failed - Low confidence match", 240, None),
    (4, "facial_authentication", Severity::Info, "Facial authentication successful", 195, None),
];

/// Lists `system_log_*.txt` files in `dir`, sorted by name.
///
/// A missing or unreadable directory yields an empty list.
pub fn discover_log_files(dir: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<String> = entries
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| name.starts_with("system_log_") && name.ends_with(".txt"))
        .collect();
    files.sort();
    files
}

/// The demo feed: fifteen curated events over the last four hours, then
/// thirty-five generated ones reaching back about a day.
///
/// Some critical and error events link to log files under
/// `/api/files/`, cycling through whatever files are available.
#[derive(Debug, Clone, Default)]
pub struct DemoSeed {
    log_files: Vec<String>,
}

impl DemoSeed {
    pub fn new(log_files: Vec<String>) -> Self {
        Self { log_files }
    }

    /// Builds a demo seed linking to the log files found in `dir`.
    pub fn from_files_dir(dir: &Path) -> Self {
        Self::new(discover_log_files(dir))
    }

    fn log_file_url(&self, slot: usize) -> Option<String> {
        if self.log_files.is_empty() {
            return None;
        }
        let name = &self.log_files[slot % self.log_files.len()];
        Some(format!("/api/files/{name}"))
    }
}

impl SeedSource for DemoSeed {
    fn seed(&self, now: DateTime<Utc>) -> Vec<EventRecord> {
        let mut records = Vec::with_capacity(CURATED.len() + 35);

        for (device, event_type, severity, message, minutes_ago, slot) in CURATED {
            let d = DEVICES[device];
            let draft = EventDraft {
                device_id: d.id.to_string(),
                device_name: d.name.to_string(),
                event_type: event_type.to_string(),
                severity: severity.as_str().to_string(),
                message: message.to_string(),
                location: d.location.to_string(),
                download_url: slot.and_then(|s| self.log_file_url(s)),
            };
            records.push(EventRecord::new(
                Uuid::new_v4().to_string(),
                now - Duration::minutes(minutes_ago),
                draft,
            ));
        }

        for i in 16..=50_usize {
            let idx = i % 10;
            let d = DEVICES[idx];
            let (event_type, base_severity, message) = KINDS[idx];
            let mut severity = base_severity;
            let mut download_url = None;
            if !self.log_files.is_empty() {
                if i % 7 == 0 {
                    severity = Severity::Error;
                    download_url = self.log_file_url(i / 7);
                } else if event_type == "tailgating_detection" && i % 3 == 0 {
                    download_url = self.log_file_url(i / 3);
                }
            }

            let hours_ago = (i / 2) as i64;
            let minutes_offset = (i % 60) as i64;
            let draft = EventDraft {
                device_id: d.id.to_string(),
                device_name: d.name.to_string(),
                event_type: event_type.to_string(),
                severity: severity.as_str().to_string(),
                message: format!("{message} - Event #{i}"),
                location: d.location.to_string(),
                download_url,
            };
            records.push(EventRecord::new(
                Uuid::new_v4().to_string(),
                now - Duration::hours(hours_ago) - Duration::minutes(minutes_offset),
                draft,
            ));
        }

        records
    }
}

/// Random events drawn from the demo device catalog.
#[derive(Debug, Clone, Copy, Default)]
pub struct CatalogGenerator;

impl EventGenerator for CatalogGenerator {
    fn draft(&self, sequence: u64) -> EventDraft {
        let mut rng = rand::thread_rng();
        let d = DEVICES[rng.gen_range(0..DEVICES.len())];
        let (event_type, severity, message) = KINDS[rng.gen_range(0..KINDS.len())];
        EventDraft {
            device_id: d.id.to_string(),
            device_name: d.name.to_string(),
            event_type: event_type.to_string(),
            severity: severity.as_str().to_string(),
            message: format!("{message} - Live #{sequence}"),
            location: d.location.to_string(),
            download_url: None,
        }
    }
}
