//! Storage layer using RocksDB
//!
//! # Column Families
//!
//! - `manifest` - Ballot manifest, written once at creation (single key)
//! - `votes` - Append-only vote log (key: big-endian sequence number)
//!
//! Big-endian keys keep the vote log in acceptance order under RocksDB's
//! default byte-wise comparator, so a forward iteration is a replay.

use crate::{
    error::{Error, Result},
    types::{BallotManifest, VoteRecord},
    Config,
};
use rocksdb::{BoundColumnFamily, ColumnFamilyDescriptor, IteratorMode, Options, DB};
use std::sync::Arc;

/// Column family names
const CF_MANIFEST: &str = "manifest";
const CF_VOTES: &str = "votes";

/// Manifest key (the column family holds exactly one entry)
const MANIFEST_KEY: &[u8] = b"manifest";

/// Storage wrapper for RocksDB
pub struct Storage {
    db: Arc<DB>,
}

impl Storage {
    /// Open or create database
    pub fn open(config: &Config) -> Result<Self> {
        let path = &config.data_dir;

        // Create directory if not exists
        std::fs::create_dir_all(path)?;

        // Database options
        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        // Tuning from config
        db_opts.set_write_buffer_size(config.rocksdb.write_buffer_size_mb * 1024 * 1024);
        db_opts.set_max_write_buffer_number(config.rocksdb.max_write_buffer_number);
        db_opts.set_max_background_jobs(config.rocksdb.max_background_jobs);

        if config.rocksdb.enable_statistics {
            db_opts.enable_statistics();
        }

        // Column family descriptors
        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_MANIFEST, Self::cf_options_manifest()),
            ColumnFamilyDescriptor::new(CF_VOTES, Self::cf_options_votes()),
        ];

        // Open database
        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        tracing::info!("Opened RocksDB at {:?}", path);

        Ok(Self { db: Arc::new(db) })
    }

    // Column family options

    fn cf_options_manifest() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }

    fn cf_options_votes() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Zstd);
        opts.set_bottommost_compression_type(rocksdb::DBCompressionType::Zstd);
        opts
    }

    // Helper: get column family handle

    fn cf_handle(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| Error::Storage(format!("Column family {} not found", name)))
    }

    // Manifest operations

    /// Write the ballot manifest
    ///
    /// Fails if a manifest is already present; the manifest is write-once.
    pub fn put_manifest(&self, manifest: &BallotManifest) -> Result<()> {
        let cf = self.cf_handle(CF_MANIFEST)?;

        if self.db.get_cf(&cf, MANIFEST_KEY)?.is_some() {
            return Err(Error::InvalidConfiguration(
                "Ballot already exists in this data directory".to_string(),
            ));
        }

        let value = bincode::serialize(manifest)?;
        self.db.put_cf(&cf, MANIFEST_KEY, &value)?;

        tracing::info!(
            ballot_id = %manifest.ballot_id,
            proposals = manifest.proposal_names.len(),
            "Ballot manifest written"
        );

        Ok(())
    }

    /// Get the ballot manifest, if any
    pub fn get_manifest(&self) -> Result<Option<BallotManifest>> {
        let cf = self.cf_handle(CF_MANIFEST)?;

        match self.db.get_cf(&cf, MANIFEST_KEY)? {
            Some(value) => {
                let manifest: BallotManifest = bincode::deserialize(&value)?;
                Ok(Some(manifest))
            }
            None => Ok(None),
        }
    }

    // Vote log operations

    /// Append an accepted vote to the log
    pub fn append_vote(&self, record: &VoteRecord) -> Result<()> {
        let cf = self.cf_handle(CF_VOTES)?;
        let key = record.seq.to_be_bytes();
        let value = bincode::serialize(record)?;

        self.db.put_cf(&cf, key, &value)?;

        tracing::debug!(
            seq = record.seq,
            voter = %record.voter,
            proposal_index = record.proposal_index,
            "Vote appended"
        );

        Ok(())
    }

    /// Read the full vote log in acceptance order
    pub fn vote_log(&self) -> Result<Vec<VoteRecord>> {
        let cf = self.cf_handle(CF_VOTES)?;

        let mut records = Vec::new();
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (_, value) = item?;
            let record: VoteRecord = bincode::deserialize(&value)?;
            records.push(record);
        }

        Ok(records)
    }

    /// Number of votes in the log
    pub fn vote_count(&self) -> Result<u64> {
        let cf = self.cf_handle(CF_VOTES)?;

        let mut count = 0u64;
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            item?;
            count += 1;
        }

        Ok(count)
    }

    /// Close database (graceful shutdown)
    pub fn close(self) -> Result<()> {
        drop(self.db);
        tracing::info!("RocksDB closed gracefully");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::VoterId;
    use chrono::Utc;
    use tempfile::TempDir;
    use uuid::Uuid;

    fn test_config() -> (Config, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.data_dir = temp_dir.path().to_path_buf();
        (config, temp_dir)
    }

    fn test_manifest() -> BallotManifest {
        BallotManifest {
            ballot_id: Uuid::now_v7(),
            owner: VoterId::new("0xowner"),
            proposal_names: vec!["A".to_string(), "B".to_string()],
            created_at: Utc::now(),
        }
    }

    fn test_record(seq: u64, voter: &str, proposal_index: usize) -> VoteRecord {
        VoteRecord {
            seq,
            voter: VoterId::new(voter),
            proposal_index,
            cast_at: Utc::now(),
        }
    }

    #[test]
    fn test_storage_open() {
        let (config, _temp) = test_config();
        let storage = Storage::open(&config).unwrap();
        assert!(storage.get_manifest().unwrap().is_none());
    }

    #[test]
    fn test_manifest_roundtrip() {
        let (config, _temp) = test_config();
        let storage = Storage::open(&config).unwrap();

        let manifest = test_manifest();
        storage.put_manifest(&manifest).unwrap();

        let loaded = storage.get_manifest().unwrap().unwrap();
        assert_eq!(loaded, manifest);
    }

    #[test]
    fn test_manifest_is_write_once() {
        let (config, _temp) = test_config();
        let storage = Storage::open(&config).unwrap();

        storage.put_manifest(&test_manifest()).unwrap();
        let result = storage.put_manifest(&test_manifest());
        assert!(matches!(result, Err(Error::InvalidConfiguration(_))));
    }

    #[test]
    fn test_vote_log_preserves_order() {
        let (config, _temp) = test_config();
        let storage = Storage::open(&config).unwrap();

        // More than 256 records so ordering would break with
        // little-endian or textual keys
        for seq in 0..300u64 {
            let record = test_record(seq, &format!("0xvoter{}", seq), 0);
            storage.append_vote(&record).unwrap();
        }

        let log = storage.vote_log().unwrap();
        assert_eq!(log.len(), 300);
        for (i, record) in log.iter().enumerate() {
            assert_eq!(record.seq, i as u64);
        }

        assert_eq!(storage.vote_count().unwrap(), 300);
    }

    #[test]
    fn test_log_survives_reopen() {
        let (config, _temp) = test_config();

        {
            let storage = Storage::open(&config).unwrap();
            storage.put_manifest(&test_manifest()).unwrap();
            storage.append_vote(&test_record(0, "0xvoter1", 1)).unwrap();
            storage.close().unwrap();
        }

        let storage = Storage::open(&config).unwrap();
        assert!(storage.get_manifest().unwrap().is_some());

        let log = storage.vote_log().unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].voter, VoterId::new("0xvoter1"));
        assert_eq!(log[0].proposal_index, 1);
    }
}
