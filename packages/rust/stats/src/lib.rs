//! File-backed statistics for paid phone vendors.
//!
//! The [`StatsStore`] keeps one JSON document with per-vendor counters
//! (attempts, phones returned, DACH-valid hits, mobile/landline split,
//! country distribution). Every write is a read-modify-write under a
//! process-wide lock; concurrent processes are last-writer-wins. Writes made
//! through [`StatsSink`] run on the blocking thread pool.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use leadenrich_shared::collab::StatsSink;
use leadenrich_shared::{LeadEnrichError, PhoneAttempt, PhoneSource, PhoneType, Result, phone};

// ---------------------------------------------------------------------------
// File schema
// ---------------------------------------------------------------------------

/// The whole statistics document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsFile {
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub services: BTreeMap<String, ServiceStats>,
}

impl Default for StatsFile {
    fn default() -> Self {
        let now = Utc::now();
        let services = [PhoneSource::Kaspr, PhoneSource::FullEnrich]
            .into_iter()
            .map(|s| (s.as_str().to_string(), ServiceStats::default()))
            .collect();
        Self {
            created_at: now,
            last_updated: now,
            services,
        }
    }
}

/// Counters for one vendor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceStats {
    pub total_attempts: u64,
    /// Calls that returned at least one phone.
    pub returned_phones: u64,
    /// Calls where at least one phone passed the DACH filter.
    pub dach_valid_phones: u64,
    pub mobile_found: u64,
    pub landline_found: u64,
    /// Calls that returned phones, all of them non-DACH.
    pub filtered_out: u64,
    pub no_phone_returned: u64,
    /// Country label → number of phones seen.
    pub phone_countries: BTreeMap<String, u64>,
    pub last_success: Option<DateTime<Utc>>,
    pub last_attempt: Option<DateTime<Utc>>,
}

impl ServiceStats {
    fn apply(&mut self, attempt: &PhoneAttempt, now: DateTime<Utc>) {
        self.total_attempts += 1;
        self.last_attempt = Some(now);

        if attempt.phones_returned.is_empty() {
            self.no_phone_returned += 1;
            return;
        }

        self.returned_phones += 1;
        for number in &attempt.phones_returned {
            if let Some(country) = phone::country_label(number) {
                *self.phone_countries.entry(country).or_default() += 1;
            }
        }

        match attempt.accepted {
            Some(phone_type) => {
                self.dach_valid_phones += 1;
                self.last_success = Some(now);
                match phone_type {
                    PhoneType::Mobile => self.mobile_found += 1,
                    PhoneType::Landline => self.landline_found += 1,
                    PhoneType::Unknown => {}
                }
            }
            None => self.filtered_out += 1,
        }
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Handle on the statistics file. Clones share the lock.
#[derive(Clone)]
pub struct StatsStore {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl StatsStore {
    /// Use the statistics file at `path`. The file is created on first write.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Count one vendor call.
    pub fn record_attempt(&self, attempt: &PhoneAttempt) -> Result<()> {
        let _guard = self.guard()?;
        let mut stats = self.load();
        let now = Utc::now();
        stats
            .services
            .entry(attempt.service.as_str().to_string())
            .or_default()
            .apply(attempt, now);
        stats.last_updated = now;
        self.save(&stats)?;
        debug!(
            service = %attempt.service,
            returned = attempt.phones_returned.len(),
            accepted = attempt.accepted.map(PhoneType::as_str),
            "recorded phone attempt"
        );
        Ok(())
    }

    /// Current counters.
    pub fn snapshot(&self) -> Result<StatsFile> {
        let _guard = self.guard()?;
        Ok(self.load())
    }

    /// Human-readable report of all vendors.
    pub fn summary(&self) -> Result<String> {
        Ok(render_summary(&self.snapshot()?))
    }

    /// Replace the file with empty counters.
    pub fn reset(&self) -> Result<()> {
        let _guard = self.guard()?;
        self.save(&StatsFile::default())?;
        info!(path = %self.path.display(), "statistics reset");
        Ok(())
    }

    fn guard(&self) -> Result<std::sync::MutexGuard<'_, ()>> {
        self.lock
            .lock()
            .map_err(|_| LeadEnrichError::Stats("statistics lock poisoned".into()))
    }

    /// Read the file, falling back to empty counters when missing or corrupt.
    fn load(&self) -> StatsFile {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return StatsFile::default(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "could not read stats file");
                return StatsFile::default();
            }
        };
        serde_json::from_str(&content).unwrap_or_else(|e| {
            warn!(path = %self.path.display(), error = %e, "stats file is corrupt, starting over");
            StatsFile::default()
        })
    }

    fn save(&self, stats: &StatsFile) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| LeadEnrichError::io(parent, e))?;
        }
        let json = serde_json::to_string_pretty(stats)
            .map_err(|e| LeadEnrichError::Stats(format!("serialize stats: {e}")))?;
        std::fs::write(&self.path, json).map_err(|e| LeadEnrichError::io(&self.path, e))
    }
}

#[async_trait]
impl StatsSink for StatsStore {
    async fn record(&self, attempt: &PhoneAttempt) {
        let store = self.clone();
        let attempt = attempt.clone();
        match tokio::task::spawn_blocking(move || store.record_attempt(&attempt)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "failed to record phone statistics"),
            Err(e) => warn!(error = %e, "statistics writer panicked"),
        }
    }
}

// ---------------------------------------------------------------------------
// Summary rendering
// ---------------------------------------------------------------------------

fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

/// Render the report printed by `leadenrich stats show`.
pub fn render_summary(stats: &StatsFile) -> String {
    let rule = "=".repeat(60);
    let mut out = String::new();
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "PHONE VENDOR STATISTICS");
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "Last updated: {}", stats.last_updated.to_rfc3339());
    let _ = writeln!(out);

    for (name, svc) in &stats.services {
        let total = svc.total_attempts;
        let _ = writeln!(out, "--- {} ---", name.to_uppercase());
        let _ = writeln!(out, "  Total attempts:     {total}");
        let _ = writeln!(
            out,
            "  Returned phones:    {} ({:.1}% of attempts)",
            svc.returned_phones,
            percent(svc.returned_phones, total)
        );
        let _ = writeln!(
            out,
            "  DACH valid:         {} ({:.1}% success rate)",
            svc.dach_valid_phones,
            percent(svc.dach_valid_phones, total)
        );
        let _ = writeln!(
            out,
            "  Mobile found:       {} ({:.1}% of valid)",
            svc.mobile_found,
            percent(svc.mobile_found, svc.dach_valid_phones)
        );
        let _ = writeln!(
            out,
            "  Filtered out:       {} ({:.1}% non-DACH)",
            svc.filtered_out,
            percent(svc.filtered_out, svc.returned_phones)
        );
        let _ = writeln!(out, "  No phone returned:  {}", svc.no_phone_returned);
        let last_success = svc
            .last_success
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "never".into());
        let _ = writeln!(out, "  Last success:       {last_success}");
        let _ = writeln!(out);
        let _ = writeln!(out, "  Country distribution:");

        if svc.phone_countries.is_empty() {
            let _ = writeln!(out, "    (no data yet)");
        } else {
            let mut countries: Vec<_> = svc.phone_countries.iter().collect();
            countries.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
            for (country, count) in countries.into_iter().take(10) {
                let _ = writeln!(out, "    {country}: {count}");
            }
        }
        let _ = writeln!(out);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attempt(service: PhoneSource, phones: &[&str], accepted: Option<PhoneType>) -> PhoneAttempt {
        PhoneAttempt {
            service,
            phones_returned: phones.iter().map(|p| p.to_string()).collect(),
            accepted,
        }
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = StatsStore::open(dir.path().join("stats.json"));
        let stats = store.snapshot().unwrap();
        assert_eq!(stats.services.len(), 2);
        assert_eq!(stats.services["kaspr"].total_attempts, 0);
    }

    #[test]
    fn records_all_outcomes() {
        let dir = tempfile::tempdir().unwrap();
        let store = StatsStore::open(dir.path().join("nested").join("stats.json"));

        store
            .record_attempt(&attempt(PhoneSource::Kaspr, &["+49 171 1234567"], Some(PhoneType::Mobile)))
            .unwrap();
        store
            .record_attempt(&attempt(PhoneSource::Kaspr, &["+1 212 555 0100", "+44 20 7946 0958"], None))
            .unwrap();
        store
            .record_attempt(&attempt(PhoneSource::Kaspr, &[], None))
            .unwrap();
        store
            .record_attempt(&attempt(PhoneSource::FullEnrich, &["030 123456"], Some(PhoneType::Landline)))
            .unwrap();

        let stats = store.snapshot().unwrap();
        let kaspr = &stats.services["kaspr"];
        assert_eq!(kaspr.total_attempts, 3);
        assert_eq!(kaspr.returned_phones, 2);
        assert_eq!(kaspr.dach_valid_phones, 1);
        assert_eq!(kaspr.mobile_found, 1);
        assert_eq!(kaspr.filtered_out, 1);
        assert_eq!(kaspr.no_phone_returned, 1);
        assert_eq!(kaspr.phone_countries["DE"], 1);
        assert_eq!(kaspr.phone_countries["US/CA"], 1);
        assert_eq!(kaspr.phone_countries["UK"], 1);
        assert!(kaspr.last_success.is_some());

        let fe = &stats.services["fullenrich"];
        assert_eq!(fe.landline_found, 1);
        assert_eq!(fe.phone_countries["DE (national)"], 1);
    }

    #[tokio::test]
    async fn corrupt_file_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = StatsStore::open(&path);
        store.record(&attempt(PhoneSource::FullEnrich, &[], None)).await;
        let stats = store.snapshot().unwrap();
        assert_eq!(stats.services["fullenrich"].no_phone_returned, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_sink_writes_are_serialized() {
        let dir = tempfile::tempdir().unwrap();
        let store = StatsStore::open(dir.path().join("stats.json"));
        let other = store.clone();

        let mobile = attempt(PhoneSource::Kaspr, &["+49 171 1234567"], Some(PhoneType::Mobile));
        let empty = attempt(PhoneSource::Kaspr, &[], None);
        tokio::join!(store.record(&mobile), other.record(&empty));

        let kaspr = &store.snapshot().unwrap().services["kaspr"];
        assert_eq!(kaspr.total_attempts, 2);
        assert_eq!(kaspr.mobile_found, 1);
        assert_eq!(kaspr.no_phone_returned, 1);
    }

    #[tokio::test]
    async fn reset_clears_counters() {
        let dir = tempfile::tempdir().unwrap();
        let store = StatsStore::open(dir.path().join("stats.json"));
        store.record(&attempt(PhoneSource::Kaspr, &[], None)).await;
        store.reset().unwrap();
        assert_eq!(store.snapshot().unwrap().services["kaspr"].total_attempts, 0);
    }

    #[tokio::test]
    async fn summary_lists_services_and_countries() {
        let dir = tempfile::tempdir().unwrap();
        let store = StatsStore::open(dir.path().join("stats.json"));
        store
            .record(&attempt(PhoneSource::Kaspr, &["+49 171 1234567"], Some(PhoneType::Mobile)))
            .await;

        let summary = store.summary().unwrap();
        assert!(summary.contains("--- KASPR ---"));
        assert!(summary.contains("--- FULLENRICH ---"));
        assert!(summary.contains("DACH valid:         1 (100.0% success rate)"));
        assert!(summary.contains("    DE: 1"));
        assert!(summary.contains("(no data yet)"));
    }
}
