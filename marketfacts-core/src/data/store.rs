//! Flat-file price store.
//!
//! Layout: `{data_dir}/{CODE}.csv` with a `{CODE}.meta.json` sidecar.
//!
//! - CSV header `timestamp,open,high,low,close,volume,interval`
//! - timestamps in RFC 3339 UTC, missing optionals as empty cells
//! - decimals written in their exact textual form
//! - atomic writes (write to `.tmp`, rename into place), CSV first
//! - loads check the CSV against the sidecar hash when a sidecar exists
//!
//! There is no locking. Two writers on the same code race; the last rename
//! wins.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use super::repository::{
    PriceQuery, PriceReadRepository, PriceStream, QueryError, RepositoryError,
};
use crate::domain::input::normalize_identity;
use crate::domain::{DecimalInput, PriceBarFact, RawPriceBar, TimestampPrecision, ValidationError};

pub const HEADER: [&str; 7] = [
    "timestamp", "open", "high", "low", "close", "volume", "interval",
];

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("metadata error: {0}")]
    Meta(#[from] serde_json::Error),

    #[error("no stored prices for '{code}'")]
    NotFound { code: String },

    #[error("code '{code}' cannot be used as a file name")]
    UnsafeCode { code: String },

    #[error("unexpected header in {}: {found:?}", path.display())]
    Header { path: PathBuf, found: Vec<String> },

    #[error("row {line} of {code}: {error}")]
    InvalidRow {
        code: String,
        line: u64,
        #[source]
        error: ValidationError,
    },

    #[error("{code}.csv does not match its metadata (hash {found}, expected {expected})")]
    HashMismatch {
        code: String,
        expected: String,
        found: String,
    },

    #[error("fact for {found} cannot be stored under {expected}")]
    IdentityMismatch { expected: String, found: String },

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Sidecar describing a stored file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreMeta {
    pub code: String,
    pub rows: usize,
    pub first_ts: Option<DateTime<Utc>>,
    pub last_ts: Option<DateTime<Utc>>,
    /// BLAKE3 of the CSV bytes.
    pub content_hash: String,
    pub written_at: DateTime<Utc>,
}

pub struct CsvFactStore {
    data_dir: PathBuf,
    precision: TimestampPrecision,
}

impl CsvFactStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            precision: TimestampPrecision::default(),
        }
    }

    /// Precision enforced when loaded rows are re-validated.
    pub fn with_precision(mut self, precision: TimestampPrecision) -> Self {
        self.precision = precision;
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn csv_path(&self, code: &str) -> PathBuf {
        self.data_dir.join(format!("{code}.csv"))
    }

    fn meta_path(&self, code: &str) -> PathBuf {
        self.data_dir.join(format!("{code}.meta.json"))
    }

    /// Replace the stored series for `code` with `bars`, in the given order.
    pub fn save(&self, code: &str, bars: &[PriceBarFact]) -> Result<StoreMeta, StoreError> {
        let code = file_code(code)?;
        if let Some(bar) = bars.iter().find(|b| b.code() != code) {
            return Err(StoreError::IdentityMismatch {
                expected: code,
                found: bar.code().to_string(),
            });
        }

        fs::create_dir_all(&self.data_dir).map_err(|source| StoreError::Io {
            path: self.data_dir.clone(),
            source,
        })?;

        let bytes = encode_csv(bars)?;
        let meta = StoreMeta {
            code: code.clone(),
            rows: bars.len(),
            first_ts: bars.iter().map(|b| b.ts()).min(),
            last_ts: bars.iter().map(|b| b.ts()).max(),
            content_hash: blake3::hash(&bytes).to_hex().to_string(),
            written_at: Utc::now(),
        };

        let path = self.csv_path(&code);
        write_atomic(&path, &bytes)?;
        write_atomic(&self.meta_path(&code), &serde_json::to_vec_pretty(&meta)?)?;

        info!(code = %code, rows = meta.rows, path = %path.display(), "stored price facts");
        Ok(meta)
    }

    /// Read and re-validate every stored row for `code`, in file order.
    pub fn load(&self, code: &str) -> Result<Vec<PriceBarFact>, StoreError> {
        let code = file_code(code)?;
        let path = self.csv_path(&code);
        if !path.exists() {
            return Err(StoreError::NotFound { code });
        }

        let bytes = fs::read(&path).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;
        if let Some(meta) = self.meta(&code)? {
            let found = blake3::hash(&bytes).to_hex().to_string();
            if found != meta.content_hash {
                return Err(StoreError::HashMismatch {
                    code,
                    expected: meta.content_hash,
                    found,
                });
            }
        }

        let mut reader = csv::Reader::from_reader(bytes.as_slice());
        let headers = reader.headers()?;
        if headers.iter().ne(HEADER.iter().copied()) {
            return Err(StoreError::Header {
                path,
                found: headers.iter().map(str::to_string).collect(),
            });
        }

        let mut bars = Vec::new();
        for (i, record) in reader.records().enumerate() {
            let record = record?;
            // header is line 1
            let line = i as u64 + 2;
            let bar = decode_row(&code, &record)
                .and_then(|raw| PriceBarFact::with_precision(raw, self.precision))
                .map_err(|error| StoreError::InvalidRow {
                    code: code.clone(),
                    line,
                    error,
                })?;
            bars.push(bar);
        }

        debug!(code = %code, rows = bars.len(), "loaded price facts");
        Ok(bars)
    }

    /// Remove the series and its sidecar. Returns whether anything existed.
    pub fn delete(&self, code: &str) -> Result<bool, StoreError> {
        let code = file_code(code)?;
        let mut removed = false;
        for path in [self.csv_path(&code), self.meta_path(&code)] {
            match fs::remove_file(&path) {
                Ok(()) => removed = true,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(source) => return Err(StoreError::Io { path, source }),
            }
        }
        if removed {
            info!(code = %code, "deleted price facts");
        }
        Ok(removed)
    }

    pub fn meta(&self, code: &str) -> Result<Option<StoreMeta>, StoreError> {
        let code = file_code(code)?;
        let path = self.meta_path(&code);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }

    /// Codes with a stored CSV file, sorted.
    pub fn codes(&self) -> Result<Vec<String>, StoreError> {
        let entries = match fs::read_dir(&self.data_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.data_dir.clone(),
                    source,
                })
            }
        };

        let mut codes = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| StoreError::Io {
                path: self.data_dir.clone(),
                source,
            })?;
            let name = entry.file_name();
            if let Some(code) = name.to_str().and_then(|n| n.strip_suffix(".csv")) {
                codes.push(code.to_string());
            }
        }
        codes.sort();
        Ok(codes)
    }
}

impl PriceReadRepository for CsvFactStore {
    fn name(&self) -> &str {
        "local_csv"
    }

    fn get_prices<'a>(&'a self, query: &PriceQuery) -> Result<PriceStream<'a>, RepositoryError> {
        let mut bars = match self.load(query.code()) {
            Ok(bars) => bars,
            Err(StoreError::NotFound { .. }) => Vec::new(),
            Err(StoreError::UnsafeCode { code }) => {
                return Err(QueryError::UnsupportedIdentity {
                    source_name: self.name().to_string(),
                    identity: code,
                }
                .into())
            }
            Err(StoreError::InvalidRow { error, .. }) | Err(StoreError::Validation(error)) => {
                return Err(RepositoryError::Validation {
                    source_name: self.name().to_string(),
                    error,
                })
            }
            Err(e) => {
                return Err(RepositoryError::SourceUnavailable {
                    source_name: self.name().to_string(),
                    reason: e.to_string(),
                })
            }
        };

        bars.retain(|b| query.matches(b));
        bars.sort_by_key(|b| b.ts());
        Ok(Box::new(bars.into_iter().map(Ok)))
    }
}

fn file_code(raw: &str) -> Result<String, StoreError> {
    let code = normalize_identity("code", raw)?;
    if code.contains(['/', '\\']) || code.starts_with('.') {
        return Err(StoreError::UnsafeCode { code });
    }
    Ok(code)
}

fn encode_csv(bars: &[PriceBarFact]) -> Result<Vec<u8>, StoreError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(HEADER)?;
    let cell = |v: Option<rust_decimal::Decimal>| v.map(|d| d.to_string()).unwrap_or_default();
    for bar in bars {
        wtr.write_record([
            bar.ts().to_rfc3339_opts(SecondsFormat::AutoSi, true),
            cell(bar.open()),
            cell(bar.high()),
            cell(bar.low()),
            bar.close().to_string(),
            bar.volume().map(|v| v.to_string()).unwrap_or_default(),
            bar.interval().label().to_string(),
        ])?;
    }
    wtr.into_inner()
        .map_err(|e| StoreError::Csv(e.into_error().into()))
}

fn decode_row(code: &str, record: &csv::StringRecord) -> Result<RawPriceBar, ValidationError> {
    let field = |i: usize| record.get(i).unwrap_or("").trim();
    let optional = |i: usize| {
        let raw = field(i);
        (!raw.is_empty()).then(|| DecimalInput::Text(raw.to_string()))
    };

    let volume = match field(5) {
        "" => None,
        raw => Some(raw.parse::<i64>().map_err(|_| ValidationError::NotDecimal {
            field: "volume",
            raw: raw.to_string(),
        })?),
    };

    Ok(RawPriceBar {
        code: code.to_string(),
        interval: field(6).to_string(),
        ts: field(0).into(),
        open: optional(1),
        high: optional(2),
        low: optional(3),
        close: DecimalInput::Text(field(4).to_string()),
        volume,
    })
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, bytes).map_err(|source| StoreError::Io {
        path: tmp.clone(),
        source,
    })?;
    fs::rename(&tmp, path).map_err(|source| {
        let _ = fs::remove_file(&tmp);
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    })
}
