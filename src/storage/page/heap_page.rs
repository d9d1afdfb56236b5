use std::sync::Arc;

use crate::common::{DbError, PageId, RecordId, Result, SlotId, TransactionId, PAGE_SIZE};
use crate::tuple::{Schema, Tuple};

/// Heap page layout:
///
/// +------------------+
/// | Slot Bitmap      |  ceil(num_slots / 8) bytes
/// +------------------+
/// | [slot 0]         |  tuple_size bytes each
/// | [slot 1]         |
/// | ...              |
/// +------------------+
/// | Zero Padding     |
/// +------------------+
///
/// Slot i is occupied when bit (i % 8) of bitmap byte (i / 8) is set,
/// least significant bit first. The number of slots is the largest n with
/// n * tuple_size bytes of records plus n bits of bitmap fitting in a page.
pub struct HeapPage {
    /// The page this buffer belongs to
    page_id: PageId,
    /// Table layout used to size and decode slots
    schema: Arc<Schema>,
    /// Raw page bytes
    data: Box<[u8; PAGE_SIZE]>,
    /// Transaction that last modified the page, if it has unflushed changes
    dirtier: Option<TransactionId>,
    /// Page bytes as they were before the first uncommitted modification
    before_image: Option<Box<[u8; PAGE_SIZE]>>,
}

impl HeapPage {
    /// Decodes a page from exactly PAGE_SIZE bytes.
    pub fn new(page_id: PageId, schema: Arc<Schema>, data: &[u8]) -> Result<Self> {
        if data.len() != PAGE_SIZE {
            return Err(DbError::Corrupted(format!(
                "page {} is {} bytes, expected {}",
                page_id,
                data.len(),
                PAGE_SIZE
            )));
        }

        let mut buf = Box::new([0u8; PAGE_SIZE]);
        buf.copy_from_slice(data);

        Ok(Self {
            page_id,
            schema,
            data: buf,
            dirtier: None,
            before_image: None,
        })
    }

    /// Creates a page with every slot free.
    pub fn empty(page_id: PageId, schema: Arc<Schema>) -> Self {
        Self {
            page_id,
            schema,
            data: Box::new([0u8; PAGE_SIZE]),
            dirtier: None,
            before_image: None,
        }
    }

    /// Number of tuple slots a page holds for the given schema.
    pub fn slots_per_page(schema: &Schema) -> usize {
        (PAGE_SIZE * 8) / (schema.tuple_size() * 8 + 1)
    }

    /// Size of the slot bitmap in bytes for the given schema.
    pub fn header_size(schema: &Schema) -> usize {
        Self::slots_per_page(schema).div_ceil(8)
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Returns the encoded page bytes.
    pub fn data(&self) -> &[u8] {
        &self.data[..]
    }

    pub fn num_slots(&self) -> usize {
        Self::slots_per_page(&self.schema)
    }

    /// Returns true if the slot holds a tuple.
    pub fn is_slot_used(&self, slot: usize) -> bool {
        slot < self.num_slots() && self.data[slot / 8] & (1 << (slot % 8)) != 0
    }

    fn set_slot_used(&mut self, slot: usize, used: bool) {
        let mask = 1u8 << (slot % 8);
        if used {
            self.data[slot / 8] |= mask;
        } else {
            self.data[slot / 8] &= !mask;
        }
    }

    fn slot_range(&self, slot: usize) -> std::ops::Range<usize> {
        let tuple_size = self.schema.tuple_size();
        let start = Self::header_size(&self.schema) + slot * tuple_size;
        start..start + tuple_size
    }

    /// Returns the number of free slots.
    pub fn empty_slot_count(&self) -> usize {
        (0..self.num_slots())
            .filter(|&slot| !self.is_slot_used(slot))
            .count()
    }

    /// Returns the number of stored tuples.
    pub fn tuple_count(&self) -> usize {
        self.num_slots() - self.empty_slot_count()
    }

    /// Decodes the tuple in the given slot.
    pub fn get_tuple(&self, slot_id: SlotId) -> Result<Tuple> {
        let slot = slot_id.as_usize();
        if slot >= self.num_slots() {
            return Err(DbError::InvalidSlotId(slot_id.as_u16()));
        }
        if !self.is_slot_used(slot) {
            return Err(DbError::EmptySlot(slot_id.as_u16()));
        }

        let mut tuple = Tuple::from_bytes(self.schema.clone(), &self.data[self.slot_range(slot)])?;
        tuple.set_record_id(Some(RecordId::new(self.page_id, slot_id)));
        Ok(tuple)
    }

    /// Decodes every stored tuple in slot order.
    pub fn tuples(&self) -> Result<Vec<Tuple>> {
        (0..self.num_slots())
            .filter(|&slot| self.is_slot_used(slot))
            .map(|slot| self.get_tuple(SlotId::new(slot as u16)))
            .collect()
    }

    /// Stores the tuple in the first free slot and records its new location
    /// on the tuple.
    pub fn insert_tuple(&mut self, tuple: &mut Tuple) -> Result<RecordId> {
        if tuple.schema().as_ref() != self.schema.as_ref() {
            return Err(DbError::SchemaMismatch);
        }

        let slot = (0..self.num_slots())
            .find(|&slot| !self.is_slot_used(slot))
            .ok_or(DbError::PageFull(self.page_id))?;
        let bytes = tuple.to_bytes()?;

        self.capture_before_image();
        let range = self.slot_range(slot);
        self.data[range].copy_from_slice(&bytes);
        self.set_slot_used(slot, true);

        let record_id = RecordId::new(self.page_id, SlotId::new(slot as u16));
        tuple.set_record_id(Some(record_id));
        Ok(record_id)
    }

    /// Removes the tuple from the slot named by its record id and clears
    /// the tuple's record id.
    pub fn delete_tuple(&mut self, tuple: &mut Tuple) -> Result<()> {
        let record_id = tuple.record_id().ok_or(DbError::MissingRecordId)?;
        if record_id.page_id != self.page_id {
            return Err(DbError::TupleNotOnPage);
        }

        let slot = record_id.slot_id.as_usize();
        if slot >= self.num_slots() {
            return Err(DbError::InvalidSlotId(record_id.slot_id.as_u16()));
        }
        if !self.is_slot_used(slot) {
            return Err(DbError::EmptySlot(record_id.slot_id.as_u16()));
        }

        self.capture_before_image();
        let range = self.slot_range(slot);
        self.data[range].fill(0);
        self.set_slot_used(slot, false);

        tuple.set_record_id(None);
        Ok(())
    }

    /// Snapshots the current bytes if no uncommitted change exists yet.
    /// An existing before-image is never replaced.
    fn capture_before_image(&mut self) {
        if self.before_image.is_none() && self.dirtier.is_none() {
            self.before_image = Some(self.data.clone());
        }
    }

    /// Tags the page with the transaction that modified it.
    pub fn mark_dirty(&mut self, tid: TransactionId) {
        self.dirtier = Some(tid);
    }

    /// Returns the transaction holding unflushed changes on this page.
    pub fn dirtier(&self) -> Option<TransactionId> {
        self.dirtier
    }

    pub fn is_dirty(&self) -> bool {
        self.dirtier.is_some()
    }

    /// Returns the retained before-image, if the page has uncommitted changes.
    pub fn before_image(&self) -> Option<HeapPage> {
        self.before_image.as_ref().map(|image| HeapPage {
            page_id: self.page_id,
            schema: self.schema.clone(),
            data: image.clone(),
            dirtier: None,
            before_image: None,
        })
    }

    /// Makes the current bytes the committed state: clears the dirty tag and
    /// drops the before-image.
    pub fn commit_changes(&mut self) {
        self.dirtier = None;
        self.before_image = None;
    }

    /// Restores the before-image, discarding all uncommitted changes.
    pub fn rollback(&mut self) {
        if let Some(image) = self.before_image.take() {
            self.data = image;
        }
        self.dirtier = None;
    }
}

impl std::fmt::Debug for HeapPage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeapPage")
            .field("page_id", &self.page_id)
            .field("tuples", &self.tuple_count())
            .field("dirtier", &self.dirtier)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuple::{DataType, TupleBuilder};

    fn int_schema(columns: usize) -> Arc<Schema> {
        let mut builder = Schema::builder();
        for i in 0..columns {
            builder = builder.column(format!("c{}", i), DataType::Integer);
        }
        builder.build_arc().unwrap()
    }

    fn int_tuple(schema: &Arc<Schema>, v: i32) -> Tuple {
        let mut builder = TupleBuilder::new(schema.clone());
        for _ in 0..schema.column_count() {
            builder = builder.value(v);
        }
        builder.build().unwrap()
    }

    #[test]
    fn test_slot_math() {
        // two ints = 8 bytes/tuple: floor(32768 / 65) = 504 slots, 63 header bytes
        let schema = int_schema(2);
        assert_eq!(HeapPage::slots_per_page(&schema), 504);
        assert_eq!(HeapPage::header_size(&schema), 63);
        assert!(HeapPage::header_size(&schema) + 504 * 8 <= PAGE_SIZE);
    }

    #[test]
    fn test_empty_page() {
        let schema = int_schema(2);
        let page = HeapPage::empty(PageId::new(1, 0), schema);
        assert_eq!(page.empty_slot_count(), 504);
        assert_eq!(page.tuple_count(), 0);
        assert!(!page.is_dirty());
        assert!(page.before_image().is_none());
    }

    #[test]
    fn test_insert_sets_bitmap_and_record_id() {
        let schema = int_schema(1);
        let mut page = HeapPage::empty(PageId::new(3, 2), schema.clone());

        let mut t0 = int_tuple(&schema, 10);
        let mut t1 = int_tuple(&schema, 11);
        let rid0 = page.insert_tuple(&mut t0).unwrap();
        let rid1 = page.insert_tuple(&mut t1).unwrap();

        assert_eq!(rid0, RecordId::new(PageId::new(3, 2), SlotId::new(0)));
        assert_eq!(rid1.slot_id, SlotId::new(1));
        assert_eq!(t0.record_id(), Some(rid0));
        assert_eq!(page.data()[0], 0b0000_0011);

        let read = page.get_tuple(SlotId::new(1)).unwrap();
        assert_eq!(read, t1);
        assert_eq!(read.record_id(), Some(rid1));
    }

    #[test]
    fn test_delete_frees_slot() {
        let schema = int_schema(1);
        let mut page = HeapPage::empty(PageId::new(1, 0), schema.clone());

        let mut t = int_tuple(&schema, 5);
        page.insert_tuple(&mut t).unwrap();
        let before = page.empty_slot_count();

        page.delete_tuple(&mut t).unwrap();
        assert_eq!(page.empty_slot_count(), before + 1);
        assert!(t.record_id().is_none());
        assert!(matches!(
            page.get_tuple(SlotId::new(0)),
            Err(DbError::EmptySlot(0))
        ));
    }

    #[test]
    fn test_delete_errors() {
        let schema = int_schema(1);
        let mut page = HeapPage::empty(PageId::new(1, 0), schema.clone());

        let mut unstored = int_tuple(&schema, 1);
        assert!(matches!(
            page.delete_tuple(&mut unstored),
            Err(DbError::MissingRecordId)
        ));

        let mut elsewhere = int_tuple(&schema, 1);
        elsewhere.set_record_id(Some(RecordId::new(PageId::new(1, 9), SlotId::new(0))));
        assert!(matches!(
            page.delete_tuple(&mut elsewhere),
            Err(DbError::TupleNotOnPage)
        ));

        let mut empty_slot = int_tuple(&schema, 1);
        empty_slot.set_record_id(Some(RecordId::new(PageId::new(1, 0), SlotId::new(4))));
        assert!(matches!(
            page.delete_tuple(&mut empty_slot),
            Err(DbError::EmptySlot(4))
        ));
    }

    #[test]
    fn test_page_full() {
        let schema = int_schema(2);
        let mut page = HeapPage::empty(PageId::new(1, 0), schema.clone());
        for i in 0..504 {
            page.insert_tuple(&mut int_tuple(&schema, i)).unwrap();
        }
        assert_eq!(page.empty_slot_count(), 0);
        assert!(matches!(
            page.insert_tuple(&mut int_tuple(&schema, 0)),
            Err(DbError::PageFull(_))
        ));
    }

    #[test]
    fn test_schema_mismatch() {
        let mut page = HeapPage::empty(PageId::new(1, 0), int_schema(1));
        let other = int_schema(2);
        assert!(matches!(
            page.insert_tuple(&mut int_tuple(&other, 1)),
            Err(DbError::SchemaMismatch)
        ));
    }

    #[test]
    fn test_reload_from_bytes() {
        let schema = int_schema(3);
        let mut page = HeapPage::empty(PageId::new(2, 4), schema.clone());
        for i in 0..10 {
            page.insert_tuple(&mut int_tuple(&schema, i)).unwrap();
        }

        let reloaded = HeapPage::new(PageId::new(2, 4), schema, page.data()).unwrap();
        assert_eq!(reloaded.tuples().unwrap(), page.tuples().unwrap());
        assert!(!reloaded.is_dirty());
    }

    #[test]
    fn test_before_image_taken_once() {
        let schema = int_schema(1);
        let mut page = HeapPage::empty(PageId::new(1, 0), schema.clone());
        let tid = TransactionId::new(1);

        page.insert_tuple(&mut int_tuple(&schema, 1)).unwrap();
        page.mark_dirty(tid);
        page.insert_tuple(&mut int_tuple(&schema, 2)).unwrap();

        let image = page.before_image().unwrap();
        assert_eq!(image.tuple_count(), 0);
        assert_eq!(page.tuple_count(), 2);
    }

    #[test]
    fn test_rollback_restores_before_image() {
        let schema = int_schema(1);
        let mut page = HeapPage::empty(PageId::new(1, 0), schema.clone());
        let mut kept = int_tuple(&schema, 1);
        page.insert_tuple(&mut kept).unwrap();
        page.commit_changes();

        page.delete_tuple(&mut kept).unwrap();
        page.insert_tuple(&mut int_tuple(&schema, 2)).unwrap();
        page.mark_dirty(TransactionId::new(7));

        page.rollback();
        assert!(!page.is_dirty());
        assert!(page.before_image().is_none());
        let tuples = page.tuples().unwrap();
        assert_eq!(tuples.len(), 1);
        assert_eq!(tuples[0].value(0), Some(&crate::tuple::Value::Integer(1)));
    }

    #[test]
    fn test_commit_changes_clears_state() {
        let schema = int_schema(1);
        let mut page = HeapPage::empty(PageId::new(1, 0), schema.clone());
        page.insert_tuple(&mut int_tuple(&schema, 1)).unwrap();
        page.mark_dirty(TransactionId::new(1));

        page.commit_changes();
        assert!(!page.is_dirty());
        assert!(page.before_image().is_none());
        assert_eq!(page.tuple_count(), 1);
    }
}
