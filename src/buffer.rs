//! Growable binary-packed record arrays.
//!
//! Vertex, collision and bookkeeping data is kept in contiguous byte
//! buffers with a fixed per-record layout so buckets can be handed to
//! the upload path as plain byte slices. A record type declares its
//! layout as data (`FIELDS`); offsets, padding and record size are
//! derived from it, and accessors resolve named fields from a record
//! index. The array owns the bytes; an accessor borrows an index and is
//! never a per-record allocation.

use std::marker::PhantomData;

use crate::error::StructArrayError;

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum FieldKind {
    U8,
    I16,
    U16,
    I32,
    U32,
    F32,
}

impl FieldKind {
    /// Byte size, which is also the alignment (1, 2 or 4).
    pub const fn size(self) -> usize {
        match self {
            FieldKind::U8 => 1,
            FieldKind::I16 | FieldKind::U16 => 2,
            FieldKind::I32 | FieldKind::U32 | FieldKind::F32 => 4,
        }
    }
}

#[derive(Copy, Clone, Debug)]
pub struct Field {
    pub name: &'static str,
    pub kind: FieldKind,
}

pub const fn field_offset(fields: &[Field], index: usize) -> usize {
    let mut offset = 0;
    let mut i = 0;
    while i < index {
        offset = align_up(offset, fields[i].kind.size());
        offset += fields[i].kind.size();
        i += 1;
    }
    align_up(offset, fields[index].kind.size())
}

pub const fn record_alignment(fields: &[Field]) -> usize {
    let mut align = 1;
    let mut i = 0;
    while i < fields.len() {
        if fields[i].kind.size() > align {
            align = fields[i].kind.size();
        }
        i += 1;
    }
    align
}

pub const fn record_size(fields: &[Field]) -> usize {
    let last = fields.len() - 1;
    align_up(
        field_offset(fields, last) + fields[last].kind.size(),
        record_alignment(fields),
    )
}

const fn align_up(offset: usize, align: usize) -> usize {
    (offset + align - 1) / align * align
}

/// A fixed-layout record stored in a [`StructArray`].
pub trait StructRecord: Sized {
    const FIELDS: &'static [Field];

    /// Write every field, in declaration order.
    fn pack(&self, w: &mut RecordWriter<'_>);

    /// Read every field, in declaration order.
    fn unpack(r: &mut RecordReader<'_>) -> Self;
}

pub struct RecordWriter<'a> {
    fields: &'static [Field],
    bytes: &'a mut [u8],
    next: usize,
}

macro_rules! writer_field {
    ($fn_name:ident, $ty:ty, $kind:path) => {
        pub fn $fn_name(&mut self, value: $ty) {
            let field = self.fields[self.next];
            assert!(matches!(field.kind, $kind), "field {} written with wrong type", field.name);
            let offset = field_offset(self.fields, self.next);
            self.bytes[offset..offset + field.kind.size()].copy_from_slice(&value.to_le_bytes());
            self.next += 1;
        }
    };
}

impl<'a> RecordWriter<'a> {
    writer_field!(u8, u8, FieldKind::U8);
    writer_field!(i16, i16, FieldKind::I16);
    writer_field!(u16, u16, FieldKind::U16);
    writer_field!(i32, i32, FieldKind::I32);
    writer_field!(u32, u32, FieldKind::U32);
    writer_field!(f32, f32, FieldKind::F32);
}

pub struct RecordReader<'a> {
    fields: &'static [Field],
    bytes: &'a [u8],
    next: usize,
}

macro_rules! reader_field {
    ($fn_name:ident, $ty:ty, $kind:path) => {
        pub fn $fn_name(&mut self) -> $ty {
            let field = self.fields[self.next];
            assert!(matches!(field.kind, $kind), "field {} read with wrong type", field.name);
            let offset = field_offset(self.fields, self.next);
            self.next += 1;
            <$ty>::from_le_bytes(
                self.bytes[offset..offset + field.kind.size()]
                    .try_into()
                    .expect("field width"),
            )
        }
    };
}

impl<'a> RecordReader<'a> {
    reader_field!(u8, u8, FieldKind::U8);
    reader_field!(i16, i16, FieldKind::I16);
    reader_field!(u16, u16, FieldKind::U16);
    reader_field!(i32, i32, FieldKind::I32);
    reader_field!(u32, u32, FieldKind::U32);
    reader_field!(f32, f32, FieldKind::F32);
}

/// Contiguous byte buffer of fixed-size records with a logical length
/// and capacity counted in records.
pub struct StructArray<R: StructRecord> {
    bytes: Vec<u8>,
    len: usize,
    capacity: usize,
    transferred: bool,
    _record: PhantomData<R>,
}

impl<R: StructRecord> Default for StructArray<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: StructRecord> StructArray<R> {
    pub fn new() -> Self {
        Self {
            bytes: Vec::new(),
            len: 0,
            capacity: 0,
            transferred: false,
            _record: PhantomData,
        }
    }

    pub fn with_capacity(records: usize) -> Self {
        let mut array = Self::new();
        array.reserve(records);
        array
    }

    pub const fn record_size() -> usize {
        record_size(R::FIELDS)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Ensure room for at least `records` records in total.
    pub fn reserve(&mut self, records: usize) {
        if records > self.capacity {
            self.grow_to(records);
        }
    }

    /// Change the logical length. Growth zero-fills; shrinking keeps the
    /// bytes of the surviving records untouched.
    pub fn resize(&mut self, records: usize) {
        assert!(!self.transferred, "{}", StructArrayError::Immutable);
        self.reserve(records);
        self.len = records;
    }

    pub fn clear(&mut self) {
        assert!(!self.transferred, "{}", StructArrayError::Immutable);
        self.len = 0;
    }

    pub fn emplace_back(&mut self, record: &R) -> usize {
        assert!(!self.transferred, "{}", StructArrayError::Immutable);
        let index = self.len;
        if index == self.capacity {
            self.grow_to(self.capacity * 2);
        }
        self.len += 1;
        self.write_record(index, record);
        index
    }

    pub fn emplace(&mut self, index: usize, record: &R) {
        self.try_emplace(index, record)
            .unwrap_or_else(|e| panic!("{e}"));
    }

    pub fn try_emplace(&mut self, index: usize, record: &R) -> Result<(), StructArrayError> {
        if self.transferred {
            return Err(StructArrayError::Immutable);
        }
        if index >= self.len {
            return Err(StructArrayError::Bounds {
                index,
                len: self.len,
            });
        }
        self.write_record(index, record);
        Ok(())
    }

    pub fn get(&self, index: usize) -> R {
        self.try_get(index).unwrap_or_else(|e| panic!("{e}"))
    }

    pub fn try_get(&self, index: usize) -> Result<R, StructArrayError> {
        if index >= self.len {
            return Err(StructArrayError::Bounds {
                index,
                len: self.len,
            });
        }
        let size = Self::record_size();
        let mut reader = RecordReader {
            fields: R::FIELDS,
            bytes: &self.bytes[index * size..(index + 1) * size],
            next: 0,
        };
        Ok(R::unpack(&mut reader))
    }

    pub fn accessor(&self, index: usize) -> RecordAccessor<'_, R> {
        assert!(
            index < self.len,
            "{}",
            StructArrayError::Bounds {
                index,
                len: self.len
            }
        );
        RecordAccessor { array: self, index }
    }

    /// The packed bytes of all live records, ready for upload.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len * Self::record_size()]
    }

    /// Hand the buffer over to its consumer. Any later mutation is a
    /// usage error.
    pub fn mark_transferred(&mut self) {
        self.transferred = true;
    }

    pub fn is_transferred(&self) -> bool {
        self.transferred
    }

    fn write_record(&mut self, index: usize, record: &R) {
        let size = Self::record_size();
        let mut writer = RecordWriter {
            fields: R::FIELDS,
            bytes: &mut self.bytes[index * size..(index + 1) * size],
            next: 0,
        };
        record.pack(&mut writer);
        assert_eq!(writer.next, R::FIELDS.len(), "record wrote too few fields");
    }

    /// Grow to at least `records` capacity: at least doubling, with the
    /// byte size an exact multiple of the record alignment by layout
    /// construction.
    fn grow_to(&mut self, records: usize) {
        let minimum = 32;
        let new_capacity = records.max(self.capacity * 2).max(minimum);
        self.bytes.resize(new_capacity * Self::record_size(), 0);
        self.capacity = new_capacity;
    }
}

/// Named-field view of one record; an (array, index) pair.
pub struct RecordAccessor<'a, R: StructRecord> {
    array: &'a StructArray<R>,
    index: usize,
}

impl<'a, R: StructRecord> RecordAccessor<'a, R> {
    pub fn index(&self) -> usize {
        self.index
    }

    /// Byte offset of `name` within the whole buffer.
    pub fn offset_of(&self, name: &str) -> usize {
        let field_index = Self::field_index(name);
        self.index * StructArray::<R>::record_size() + field_offset(R::FIELDS, field_index)
    }

    pub fn f32(&self, name: &str) -> f32 {
        f32::from_le_bytes(self.field_bytes(name).try_into().expect("field width"))
    }

    pub fn i16(&self, name: &str) -> i16 {
        i16::from_le_bytes(self.field_bytes(name).try_into().expect("field width"))
    }

    pub fn u16(&self, name: &str) -> u16 {
        u16::from_le_bytes(self.field_bytes(name).try_into().expect("field width"))
    }

    pub fn u32(&self, name: &str) -> u32 {
        u32::from_le_bytes(self.field_bytes(name).try_into().expect("field width"))
    }

    fn field_bytes(&self, name: &str) -> &'a [u8] {
        let field_index = Self::field_index(name);
        let offset = self.offset_of(name);
        &self.array.bytes[offset..offset + R::FIELDS[field_index].kind.size()]
    }

    fn field_index(name: &str) -> usize {
        R::FIELDS
            .iter()
            .position(|f| f.name == name)
            .unwrap_or_else(|| panic!("no field named {name}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct TestRecord {
        x: i16,
        y: i16,
        weight: f32,
        flags: u8,
    }

    impl StructRecord for TestRecord {
        const FIELDS: &'static [Field] = &[
            Field {
                name: "x",
                kind: FieldKind::I16,
            },
            Field {
                name: "y",
                kind: FieldKind::I16,
            },
            Field {
                name: "weight",
                kind: FieldKind::F32,
            },
            Field {
                name: "flags",
                kind: FieldKind::U8,
            },
        ];

        fn pack(&self, w: &mut RecordWriter<'_>) {
            w.i16(self.x);
            w.i16(self.y);
            w.f32(self.weight);
            w.u8(self.flags);
        }

        fn unpack(r: &mut RecordReader<'_>) -> Self {
            Self {
                x: r.i16(),
                y: r.i16(),
                weight: r.f32(),
                flags: r.u8(),
            }
        }
    }

    #[test]
    fn layout_is_padded_and_aligned() {
        assert_eq!(field_offset(TestRecord::FIELDS, 2), 4);
        assert_eq!(record_alignment(TestRecord::FIELDS), 4);
        // 9 payload bytes round up to 12
        assert_eq!(StructArray::<TestRecord>::record_size(), 12);
    }

    #[test]
    fn emplace_back_counts() {
        let mut array = StructArray::<TestRecord>::new();
        for i in 0..100 {
            let index = array.emplace_back(&TestRecord {
                x: i as i16,
                y: -(i as i16),
                weight: i as f32 / 2.0,
                flags: 1,
            });
            assert_eq!(index, i);
        }
        assert_eq!(array.len(), 100);
        assert_eq!(array.as_bytes().len(), 100 * 12);

        let record = array.get(37);
        assert_eq!(record.x, 37);
        assert_eq!(record.y, -37);
        assert_eq!(record.weight, 18.5);
    }

    #[test]
    fn emplace_overwrites_in_place() {
        let mut array = StructArray::<TestRecord>::new();
        array.resize(4);
        array.emplace(
            2,
            &TestRecord {
                x: 7,
                y: 9,
                weight: 1.5,
                flags: 3,
            },
        );
        let record = array.get(2);
        assert_eq!((record.x, record.y, record.weight, record.flags), (7, 9, 1.5, 3));
    }

    #[test]
    fn shrink_then_grow_preserves_prefix() {
        let mut array = StructArray::<TestRecord>::new();
        for i in 0..10 {
            array.emplace_back(&TestRecord {
                x: i,
                y: i,
                weight: i as f32,
                flags: 0,
            });
        }
        array.resize(3);
        array.resize(8);
        for i in 0..3 {
            assert_eq!(array.get(i as usize).x, i);
        }
    }

    #[test]
    fn bounds_errors() {
        let mut array = StructArray::<TestRecord>::new();
        array.resize(2);
        assert_eq!(
            array.try_get(2).unwrap_err(),
            StructArrayError::Bounds { index: 2, len: 2 }
        );
        assert!(array
            .try_emplace(
                5,
                &TestRecord {
                    x: 0,
                    y: 0,
                    weight: 0.0,
                    flags: 0
                }
            )
            .is_err());
    }

    #[test]
    fn transfer_freezes() {
        let mut array = StructArray::<TestRecord>::new();
        array.resize(1);
        array.mark_transferred();
        assert_eq!(
            array.try_emplace(
                0,
                &TestRecord {
                    x: 0,
                    y: 0,
                    weight: 0.0,
                    flags: 0
                }
            ),
            Err(StructArrayError::Immutable)
        );
    }

    #[test]
    fn named_accessor_offsets() {
        let mut array = StructArray::<TestRecord>::new();
        array.emplace_back(&TestRecord {
            x: 0,
            y: 0,
            weight: 0.0,
            flags: 0,
        });
        array.emplace_back(&TestRecord {
            x: 5,
            y: 6,
            weight: 2.25,
            flags: 9,
        });
        let accessor = array.accessor(1);
        assert_eq!(accessor.offset_of("weight"), 12 + 4);
        assert_eq!(accessor.i16("y"), 6);
        assert_eq!(accessor.f32("weight"), 2.25);
    }
}
