use std::{
    cell::Cell,
    collections::HashMap,
    fmt,
    fs::{self, File},
    io::{BufReader, BufWriter, Write as _},
    path::{Path, PathBuf},
    time::SystemTime,
};

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use crate::error::PriceActionError;

use super::price_series::PriceSeries;

const CACHE_FILE_EXT: &str = "bin";
const CACHE_VERSION: &str = "v1"; // Increment if cache format changes

/// Source of the current time for expiry checks.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Cell<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Cell::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchKind {
    PriceHistory,
    Analysis,
}

impl fmt::Display for FetchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchKind::PriceHistory => write!(f, "price-history"),
            FetchKind::Analysis => write!(f, "analysis"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub ticker: String,
    pub kind: FetchKind,
}

impl CacheKey {
    pub fn new(ticker: &str, kind: FetchKind) -> Self {
        Self {
            ticker: ticker.to_string(),
            kind,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.ticker)
    }
}

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    inserted_at: DateTime<Utc>,
}

/// Key to (value, insertion time) map. Entries older than the TTL are never
/// returned and are dropped on the next insert.
#[derive(Debug, Clone)]
pub struct TtlCache<V> {
    ttl: Duration,
    entries: HashMap<CacheKey, CacheEntry<V>>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the cached value if it was inserted less than `ttl` ago.
    pub fn get(&self, key: &CacheKey, now: DateTime<Utc>) -> Option<V> {
        let entry = self.entries.get(key)?;
        if now - entry.inserted_at < self.ttl {
            Some(entry.value.clone())
        } else {
            debug!("Cache entry {} expired", key);
            None
        }
    }

    /// Stores `value` as of `inserted_at`, evicting every expired entry.
    /// `inserted_at` may lie in the past when the value was produced earlier,
    /// e.g. read back from disk.
    pub fn insert(&mut self, key: CacheKey, value: V, inserted_at: DateTime<Utc>) {
        self.purge_expired(inserted_at);
        self.entries.insert(key, CacheEntry { value, inserted_at });
    }

    /// Drops entries that are no longer fresh at `now`.
    pub fn purge_expired(&mut self, now: DateTime<Utc>) {
        let ttl = self.ttl;
        let before = self.entries.len();
        self.entries.retain(|_, e| now - e.inserted_at < ttl);
        let evicted = before - self.entries.len();
        if evicted > 0 {
            debug!("Evicted {} expired cache entries", evicted);
        }
    }

    /// Returns a fresh cached value or runs `load` and stores its result.
    /// Errors from `load` are returned without touching the cache.
    pub fn get_or_try_insert_with<F>(
        &mut self,
        key: CacheKey,
        now: DateTime<Utc>,
        load: F,
    ) -> Result<V, PriceActionError>
    where
        F: FnOnce() -> Result<V, PriceActionError>,
    {
        if let Some(value) = self.get(&key, now) {
            debug!("Cache hit: {}", key);
            return Ok(value);
        }
        debug!("Cache miss: {}", key);
        let value = load()?;
        self.insert(key, value.clone(), now);
        Ok(value)
    }
}

/// A series read back from disk with the time it was written.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedSeries {
    pub series: PriceSeries,
    pub saved_at: DateTime<Utc>,
}

/// On-disk price history cache, one versioned bincode file per ticker.
#[derive(Debug, Clone)]
pub struct DiskCache {
    dir: PathBuf,
    ttl: Duration,
}

impl DiskCache {
    pub fn new<P: AsRef<Path>>(dir: P, ttl: Duration) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            ttl,
        }
    }

    fn cache_path(&self, ticker: &str) -> PathBuf {
        // Tickers such as "^CNXREALTY" are not filename friendly.
        let sanitized: String = ticker
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
            .collect();
        self.dir
            .join(format!("{}_{}.{}", sanitized, CACHE_VERSION, CACHE_FILE_EXT))
    }

    fn modified_at(path: &Path) -> Result<DateTime<Utc>, PriceActionError> {
        let modified: SystemTime = fs::metadata(path)?.modified()?;
        Ok(modified.into())
    }

    /// Loads a cached series if present, fresh, and readable. Anything else
    /// is a miss. The file's modification time is returned as `saved_at` so
    /// callers can keep counting the TTL from the original fetch.
    pub fn load(&self, ticker: &str, now: DateTime<Utc>) -> Result<Option<CachedSeries>, PriceActionError> {
        let cache_path = self.cache_path(ticker);

        if !cache_path.exists() {
            debug!("Cache miss (file not found): {}", cache_path.display());
            return Ok(None);
        }

        let saved_at = Self::modified_at(&cache_path)?;
        if now - saved_at >= self.ttl {
            info!("Cache miss (expired): {}", cache_path.display());
            return Ok(None);
        }

        debug!("Attempting to load from cache: {}", cache_path.display());
        match File::open(&cache_path) {
            Ok(file) => {
                let mut reader = BufReader::new(file);
                match bincode::serde::decode_from_std_read::<PriceSeries, _, _>(
                    &mut reader,
                    bincode::config::standard(),
                ) {
                    Ok(series) if series.ticker() == ticker => {
                        info!(
                            "Cache hit: loaded {} closes for {} from {}",
                            series.len(),
                            ticker,
                            cache_path.display()
                        );
                        Ok(Some(CachedSeries { series, saved_at }))
                    }
                    Ok(series) => {
                        warn!(
                            "Cache file {} holds {} instead of {}. Ignoring cache.",
                            cache_path.display(),
                            series.ticker(),
                            ticker
                        );
                        Ok(None)
                    }
                    Err(e) => {
                        warn!(
                            "Failed to deserialize cache file {}: {}. Ignoring cache.",
                            cache_path.display(),
                            e
                        );
                        Ok(None)
                    }
                }
            }
            Err(e) => {
                warn!(
                    "Failed to open cache file {}: {}. Ignoring cache.",
                    cache_path.display(),
                    e
                );
                Ok(None)
            }
        }
    }

    /// Writes a series to disk. The file is written under a temporary name
    /// and renamed into place, so a failed write never leaves a truncated
    /// cache file behind.
    pub fn save(&self, series: &PriceSeries) -> Result<(), PriceActionError> {
        let cache_path = self.cache_path(series.ticker());
        let tmp_path = cache_path.with_extension("tmp");
        debug!("Attempting to save to cache: {}", cache_path.display());

        if !self.dir.exists() {
            fs::create_dir_all(&self.dir)?;
        }

        let result = Self::write_file(series, &tmp_path)
            .and_then(|_| fs::rename(&tmp_path, &cache_path).map_err(PriceActionError::from));
        if let Err(e) = result {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }
        debug!(
            "Saved {} closes for {} to {}",
            series.len(),
            series.ticker(),
            cache_path.display()
        );
        Ok(())
    }

    fn write_file(series: &PriceSeries, path: &Path) -> Result<(), PriceActionError> {
        let mut writer = BufWriter::new(File::create(path)?);
        bincode::serde::encode_into_std_write(series, &mut writer, bincode::config::standard())
            .map_err(|e| PriceActionError::CacheError(format!("failed to encode {}: {}", path.display(), e)))?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::price_series::PricePoint;
    use chrono::{NaiveDate, TimeZone};
    use tempfile::tempdir;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_get_respects_ttl() {
        let clock = ManualClock::new(start());
        let mut cache = TtlCache::new(Duration::hours(1));
        let key = CacheKey::new("DLF.NS", FetchKind::Analysis);
        cache.insert(key.clone(), 42, clock.now());

        clock.advance(Duration::minutes(59));
        assert_eq!(cache.get(&key, clock.now()), Some(42));

        clock.advance(Duration::minutes(1));
        assert_eq!(cache.get(&key, clock.now()), None);
    }

    #[test]
    fn test_keys_distinguish_kind() {
        let mut cache = TtlCache::new(Duration::hours(1));
        cache.insert(CacheKey::new("DLF.NS", FetchKind::Analysis), 1, start());
        assert_eq!(
            cache.get(&CacheKey::new("DLF.NS", FetchKind::PriceHistory), start()),
            None
        );
    }

    #[test]
    fn test_get_or_try_insert_with_loads_once() {
        let clock = ManualClock::new(start());
        let mut cache = TtlCache::new(Duration::hours(24));
        let key = CacheKey::new("SOBHA.NS", FetchKind::PriceHistory);
        let mut calls = 0;

        for _ in 0..3 {
            let value = cache
                .get_or_try_insert_with(key.clone(), clock.now(), || {
                    calls += 1;
                    Ok("prices".to_string())
                })
                .unwrap();
            assert_eq!(value, "prices");
            clock.advance(Duration::hours(1));
        }
        assert_eq!(calls, 1);

        clock.advance(Duration::hours(24));
        cache
            .get_or_try_insert_with(key, clock.now(), || {
                calls += 1;
                Ok("fresh".to_string())
            })
            .unwrap();
        assert_eq!(calls, 2);
    }

    #[test]
    fn test_get_or_try_insert_with_does_not_cache_errors() {
        let mut cache: TtlCache<u32> = TtlCache::new(Duration::hours(1));
        let key = CacheKey::new("DLF.NS", FetchKind::PriceHistory);
        let result = cache.get_or_try_insert_with(key.clone(), start(), || {
            Err(PriceActionError::data_unavailable("DLF.NS", "timeout"))
        });
        assert!(result.is_err());
        assert!(cache.is_empty());

        let value = cache.get_or_try_insert_with(key, start(), || Ok(7)).unwrap();
        assert_eq!(value, 7);
    }

    #[test]
    fn test_disk_cache_round_trip_and_expiry() {
        let dir = tempdir().unwrap();
        let disk = DiskCache::new(dir.path().join("prices"), Duration::hours(24));
        let series = PriceSeries::new(
            "^CNXREALTY",
            vec![PricePoint::new(NaiveDate::from_ymd_opt(2024, 3, 28).unwrap(), 900.5)],
        )
        .unwrap();

        disk.save(&series).unwrap();
        let loaded = disk.load("^CNXREALTY", Utc::now()).unwrap().unwrap();
        assert_eq!(loaded.series, series);
        assert!(Utc::now() - loaded.saved_at < Duration::minutes(5));

        let later = Utc::now() + Duration::hours(25);
        assert_eq!(disk.load("^CNXREALTY", later).unwrap(), None);
        assert_eq!(disk.load("DLF.NS", Utc::now()).unwrap(), None);
    }

    #[test]
    fn test_disk_cache_corrupt_file_is_miss() {
        let dir = tempdir().unwrap();
        let disk = DiskCache::new(dir.path(), Duration::hours(24));
        fs::write(disk.cache_path("DLF.NS"), b"\xff\xff\xff").unwrap();
        assert_eq!(disk.load("DLF.NS", Utc::now()).unwrap(), None);
    }

    #[test]
    fn test_insert_evicts_expired_entries() {
        let clock = ManualClock::new(start());
        let mut cache = TtlCache::new(Duration::hours(1));
        for i in 0..1000 {
            cache.insert(
                CacheKey::new(&format!("T{}", i), FetchKind::Analysis),
                i,
                clock.now(),
            );
            clock.advance(Duration::hours(1));
        }
        assert_eq!(cache.len(), 1);

        clock.advance(Duration::minutes(30));
        cache.purge_expired(clock.now());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_insert_keeps_fresh_entries() {
        let mut cache = TtlCache::new(Duration::hours(1));
        cache.insert(CacheKey::new("A", FetchKind::Analysis), 1, start());
        cache.insert(
            CacheKey::new("B", FetchKind::Analysis),
            2,
            start() + Duration::minutes(30),
        );
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_disk_cache_save_replaces_corrupt_file() {
        let dir = tempdir().unwrap();
        let disk = DiskCache::new(dir.path(), Duration::hours(24));
        fs::write(disk.cache_path("DLF.NS"), b"\xff").unwrap();
        let series = PriceSeries::new(
            "DLF.NS",
            vec![PricePoint::new(NaiveDate::from_ymd_opt(2024, 3, 28).unwrap(), 812.0)],
        )
        .unwrap();

        disk.save(&series).unwrap();
        assert_eq!(disk.load("DLF.NS", Utc::now()).unwrap().unwrap().series, series);
        assert!(!disk.cache_path("DLF.NS").with_extension("tmp").exists());
    }

    #[test]
    fn test_disk_cache_save_failure_is_reported_and_cleaned_up() {
        let dir = tempdir().unwrap();
        let disk = DiskCache::new(dir.path(), Duration::hours(24));
        // A directory in the way makes the final rename fail.
        fs::create_dir_all(disk.cache_path("DLF.NS")).unwrap();

        let series = PriceSeries::new(
            "DLF.NS",
            vec![PricePoint::new(NaiveDate::from_ymd_opt(2024, 3, 28).unwrap(), 812.0)],
        )
        .unwrap();
        assert!(disk.save(&series).is_err());
        assert!(!disk.cache_path("DLF.NS").with_extension("tmp").exists());
    }
}
