//! Ledger store over sled, with staged write sets committed atomically
use crate::error::{LedgerError, Result};
use crate::model::Role;
use sled::IVec;
use sled::transaction::{ConflictableTransactionError, ConflictableTransactionResult, TransactionError};
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Participant(Role),
    Contract,
    ProductionLot,
    Batch,
    Products,
    Transaction,
}

impl RecordKind {
    /// Key prefix of the record's key-space, without the trailing separator.
    pub fn path(&self) -> String {
        match self {
            RecordKind::Participant(role) => format!("participant/{}", role.as_str()),
            RecordKind::Contract => "contract".into(),
            RecordKind::ProductionLot => "production_lot".into(),
            RecordKind::Batch => "batch".into(),
            RecordKind::Products => "products".into(),
            RecordKind::Transaction => "transaction".into(),
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::Participant(role) => f.write_str(role.as_str()),
            RecordKind::Contract => f.write_str("contract"),
            RecordKind::ProductionLot => f.write_str("production lot"),
            RecordKind::Batch => f.write_str("batch"),
            RecordKind::Products => f.write_str("products"),
            RecordKind::Transaction => f.write_str("transaction"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordKey {
    kind: RecordKind,
    id: String,
}

impl RecordKey {
    pub fn new(kind: RecordKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }
    pub fn kind(&self) -> RecordKind {
        self.kind
    }
    pub fn id(&self) -> &str {
        &self.id
    }
    pub fn to_bytes(&self) -> Vec<u8> {
        format!("{}/{}", self.kind.path(), self.id).into_bytes()
    }
}

/// A record persisted in the ledger. Each record knows its own key.
pub trait Record: minicbor::Encode<()> + for<'b> minicbor::Decode<'b, ()> {
    fn key(&self) -> RecordKey;
}

/// Something a [`Ref`] can point at. Records resolve to themselves, participant
/// role markers resolve to the participant stored under that role.
pub trait Resolve {
    type Target: Record;

    fn kind() -> RecordKind;

    fn key_for(id: &str) -> RecordKey {
        RecordKey::new(Self::kind(), id)
    }
}

/// Typed relationship to another record, stored as the target's id.
pub struct Ref<T> {
    id: String,
    _target: PhantomData<fn() -> T>,
}

impl<T> Ref<T> {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            _target: PhantomData,
        }
    }
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl<T: Resolve> Ref<T> {
    pub fn key(&self) -> RecordKey {
        T::key_for(&self.id)
    }
}

impl<T> Clone for Ref<T> {
    fn clone(&self) -> Self {
        Self::new(self.id.clone())
    }
}

impl<T> PartialEq for Ref<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for Ref<T> {}

impl<T> fmt::Debug for Ref<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Ref").field(&self.id).finish()
    }
}

impl<T> From<&str> for Ref<T> {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl<C, T> minicbor::Encode<C> for Ref<T> {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.str(&self.id)?.ok()
    }
}

impl<'b, C, T> minicbor::Decode<'b, C> for Ref<T> {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        Ok(Ref::new(d.str()?))
    }
}

fn encode_record<T: Record>(record: &T) -> Result<Vec<u8>> {
    minicbor::to_vec(record).map_err(|e| LedgerError::Codec(e.to_string()))
}

fn decode_record<T: Record>(bytes: &[u8]) -> Result<T> {
    minicbor::decode(bytes).map_err(|e| LedgerError::Codec(e.to_string()))
}

#[derive(Clone)]
pub struct LedgerStore {
    instance: Arc<sled::Db>,
}

impl LedgerStore {
    pub fn new(instance: Arc<sled::Db>) -> Self {
        Self { instance }
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = sled::Config::new().path(path).open()?;
        Ok(Self::new(Arc::new(db)))
    }

    /// In-memory store that is discarded on drop.
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self::new(Arc::new(db)))
    }

    pub fn get<R: Resolve>(&self, id: &str) -> Result<R::Target> {
        self.get_raw::<R>(id).map(|(_, record)| record)
    }

    pub fn resolve<R: Resolve>(&self, link: &Ref<R>) -> Result<R::Target> {
        self.get::<R>(link.id())
    }

    /// Every record stored under the key-space of `R`, in key order.
    pub fn all<R: Resolve>(&self) -> Result<Vec<R::Target>> {
        let prefix = format!("{}/", R::kind().path());
        self.instance
            .scan_prefix(prefix.as_bytes())
            .map(|entry| {
                let (_, bytes) = entry?;
                decode_record::<R::Target>(&bytes)
            })
            .collect()
    }

    /// Inserts new records in one commit. Fails on any id collision.
    pub fn put_all<T: Record>(&self, records: &[T]) -> Result<()> {
        let mut write_set = self.write_set();
        for record in records {
            write_set.insert(record)?;
        }
        write_set.commit()
    }

    /// Replaces an existing record. Fails if it does not exist.
    pub fn update<T: Record>(&self, record: &T) -> Result<()> {
        let mut write_set = self.write_set();
        write_set.update(record)?;
        write_set.commit()
    }

    pub fn write_set(&self) -> WriteSet<'_> {
        WriteSet {
            store: self,
            reads: BTreeMap::new(),
            writes: BTreeMap::new(),
        }
    }

    /// Monotonic counter, used to order journal entries.
    pub fn next_sequence(&self) -> Result<u64> {
        Ok(self.instance.generate_id()?)
    }

    pub fn flush(&self) -> Result<()> {
        self.instance.flush()?;
        Ok(())
    }

    fn get_raw<R: Resolve>(&self, id: &str) -> Result<(IVec, R::Target)> {
        let key = R::key_for(id);
        match self.instance.get(key.to_bytes())? {
            Some(bytes) => {
                let record = decode_record(&bytes)?;
                Ok((bytes, record))
            }
            None => Err(LedgerError::NotFound {
                kind: key.kind(),
                id: id.to_owned(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteMode {
    Insert,
    Update,
}

struct StagedWrite {
    key: RecordKey,
    mode: WriteMode,
    bytes: Vec<u8>,
}

/// Working set of one transition. Reads are remembered with the bytes they
/// returned, writes are staged in memory; nothing reaches the store until
/// [`WriteSet::commit`], which applies everything in a single sled
/// transaction or nothing at all.
pub struct WriteSet<'a> {
    store: &'a LedgerStore,
    reads: BTreeMap<Vec<u8>, (RecordKey, IVec)>,
    writes: BTreeMap<Vec<u8>, StagedWrite>,
}

impl<'a> WriteSet<'a> {
    /// Loads a record and pins its current version for the commit check.
    /// A record already staged in this set is returned as staged.
    pub fn load<R: Resolve>(&mut self, id: &str) -> Result<R::Target> {
        let key = R::key_for(id);
        if let Some(staged) = self.writes.get(&key.to_bytes()) {
            return decode_record(&staged.bytes);
        }
        let (bytes, record) = self.store.get_raw::<R>(id)?;
        self.reads.entry(key.to_bytes()).or_insert((key, bytes));
        Ok(record)
    }

    pub fn resolve<R: Resolve>(&mut self, link: &Ref<R>) -> Result<R::Target> {
        self.load::<R>(link.id())
    }

    pub fn insert<T: Record>(&mut self, record: &T) -> Result<()> {
        let key = record.key();
        let raw = key.to_bytes();
        if self.writes.contains_key(&raw) {
            return Err(LedgerError::DuplicateKey {
                kind: key.kind(),
                id: key.id().to_owned(),
            });
        }
        let bytes = encode_record(record)?;
        self.writes.insert(
            raw,
            StagedWrite {
                key,
                mode: WriteMode::Insert,
                bytes,
            },
        );
        Ok(())
    }

    /// Stages a replacement. A later update of the same record overrides an
    /// earlier one; updating a record inserted in this set keeps it an insert.
    pub fn update<T: Record>(&mut self, record: &T) -> Result<()> {
        let key = record.key();
        let bytes = encode_record(record)?;
        let mode = match self.writes.get(&key.to_bytes()) {
            Some(staged) => staged.mode,
            None => WriteMode::Update,
        };
        self.writes.insert(key.to_bytes(), StagedWrite { key, mode, bytes });
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn commit(self) -> Result<()> {
        let WriteSet { store, reads, writes } = self;

        let outcome = store
            .instance
            .transaction(|tx| -> ConflictableTransactionResult<(), LedgerError> {
                for (raw, (key, seen)) in &reads {
                    let current = tx.get(raw.as_slice())?;
                    if current.as_ref() != Some(seen) {
                        return Err(ConflictableTransactionError::Abort(
                            LedgerError::StaleRecord {
                                kind: key.kind(),
                                id: key.id().to_owned(),
                            },
                        ));
                    }
                }
                for (raw, staged) in &writes {
                    let exists = tx.get(raw.as_slice())?.is_some();
                    match staged.mode {
                        WriteMode::Insert if exists => {
                            return Err(ConflictableTransactionError::Abort(
                                LedgerError::DuplicateKey {
                                    kind: staged.key.kind(),
                                    id: staged.key.id().to_owned(),
                                },
                            ));
                        }
                        WriteMode::Update if !exists => {
                            return Err(ConflictableTransactionError::Abort(
                                LedgerError::NotFound {
                                    kind: staged.key.kind(),
                                    id: staged.key.id().to_owned(),
                                },
                            ));
                        }
                        _ => {}
                    }
                    tx.insert(raw.as_slice(), staged.bytes.as_slice())?;
                }
                Ok(())
            });

        match outcome {
            Ok(()) => Ok(()),
            Err(TransactionError::Abort(e)) => Err(e),
            Err(TransactionError::Storage(e)) => Err(LedgerError::Storage(e)),
        }
    }
}
