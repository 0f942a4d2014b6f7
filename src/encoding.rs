//! Binary encoding of schemas and records.
//!
//! Every blob starts with a format byte. Strings are a `u32` length followed by
//! UTF-8 bytes, integers are big endian. Records keep a null bitmap over their
//! data entries and skip the payload of null entries.

use bitvec::prelude::*;
use bytes::{Buf, BufMut};

use crate::data_type::DataType;
use crate::record::Record;
use crate::table::{ColumnDef, ForeignKeyTarget, Table};
use crate::value::{Date, Value};

const TABLE_FORMAT: u8 = 1;
const RECORD_FORMAT: u8 = 1;

const TYPE_INT: u8 = 0;
const TYPE_CHAR: u8 = 1;
const TYPE_DATE: u8 = 2;
const TAG_NULL: u8 = 0xFF;

const FLAG_REFERENCING: u8 = 0b01;
const FLAG_REFERENCED: u8 = 0b10;

/// Why a blob could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeError(pub String);

type DecodeResult<T> = Result<T, DecodeError>;

pub fn encode_table(table: &Table) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.put_u8(TABLE_FORMAT);
    put_str(&mut buf, &table.name);

    buf.put_u32(table.columns.len() as u32);
    for col in &table.columns {
        put_str(&mut buf, &col.name);
        put_type(&mut buf, col.data_type);
    }

    put_names(&mut buf, table.not_null.iter());

    match &table.primary_key {
        Some(pk) => {
            buf.put_u8(1);
            put_names(&mut buf, pk.iter());
        }
        None => buf.put_u8(0),
    }

    buf.put_u32(table.foreign_keys.len() as u32);
    for (column, target) in &table.foreign_keys {
        put_str(&mut buf, column);
        put_str(&mut buf, &target.table);
        put_str(&mut buf, &target.column);
    }

    put_names(&mut buf, table.referenced_by.iter());
    buf
}

pub fn decode_table(mut buf: &[u8]) -> DecodeResult<Table> {
    let buf = &mut buf;
    expect_format(buf, TABLE_FORMAT)?;
    let name = get_str(buf)?;

    let column_count = get_u32(buf)?;
    let mut columns = Vec::new();
    for _ in 0..column_count {
        let name = get_str(buf)?;
        let data_type = get_type(buf)?;
        columns.push(ColumnDef { name, data_type });
    }

    let not_null = get_names(buf)?.into_iter().collect();
    let primary_key = match get_u8(buf)? {
        0 => None,
        1 => Some(get_names(buf)?),
        other => return Err(DecodeError(format!("invalid primary key marker {other}"))),
    };

    let fk_count = get_u32(buf)?;
    let mut foreign_keys = std::collections::BTreeMap::new();
    for _ in 0..fk_count {
        let column = get_str(buf)?;
        let table = get_str(buf)?;
        let target_column = get_str(buf)?;
        foreign_keys.insert(
            column,
            ForeignKeyTarget {
                table,
                column: target_column,
            },
        );
    }

    let referenced_by = get_names(buf)?.into_iter().collect();
    expect_end(buf)?;

    Ok(Table {
        name,
        columns,
        not_null,
        primary_key,
        foreign_keys,
        referenced_by,
    })
}

pub fn encode_record(record: &Record) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.put_u8(RECORD_FORMAT);

    let mut flags = 0;
    if record.is_referencing {
        flags |= FLAG_REFERENCING;
    }
    if record.is_referenced {
        flags |= FLAG_REFERENCED;
    }
    buf.put_u8(flags);
    put_str(&mut buf, &record.table_name);

    let nulls: BitVec<u8, Lsb0> = record.data.iter().map(|(_, v)| v.is_null()).collect();
    buf.put_u32(record.data.len() as u32);
    buf.put_u32(nulls.as_raw_slice().len() as u32);
    buf.put_slice(nulls.as_raw_slice());
    for (column, value) in &record.data {
        put_str(&mut buf, column);
        if !value.is_null() {
            put_value(&mut buf, value);
        }
    }

    buf.put_u32(record.primary_value.len() as u32);
    for value in &record.primary_value {
        put_value(&mut buf, value);
    }
    buf
}

pub fn decode_record(mut buf: &[u8]) -> DecodeResult<Record> {
    let buf = &mut buf;
    expect_format(buf, RECORD_FORMAT)?;
    let flags = get_u8(buf)?;
    let table_name = get_str(buf)?;

    let count = get_u32(buf)? as usize;
    let raw_len = get_u32(buf)? as usize;
    let raw = get_bytes(buf, raw_len)?;
    let nulls = BitVec::<u8, Lsb0>::from_slice(&raw);
    if nulls.len() < count {
        return Err(DecodeError("null bitmap shorter than column count".into()));
    }

    let mut data = Vec::with_capacity(count);
    for i in 0..count {
        let column = get_str(buf)?;
        let value = if nulls[i] { Value::Null } else { get_value(buf)? };
        data.push((column, value));
    }

    let pk_count = get_u32(buf)?;
    let mut primary_value = Vec::new();
    for _ in 0..pk_count {
        primary_value.push(get_value(buf)?);
    }
    expect_end(buf)?;

    Ok(Record {
        table_name,
        data,
        primary_value,
        is_referencing: flags & FLAG_REFERENCING != 0,
        is_referenced: flags & FLAG_REFERENCED != 0,
    })
}

// --- writers ---

fn put_str(buf: &mut Vec<u8>, s: &str) {
    buf.put_u32(s.len() as u32);
    buf.put_slice(s.as_bytes());
}

fn put_names<'a>(buf: &mut Vec<u8>, names: impl ExactSizeIterator<Item = &'a String>) {
    buf.put_u32(names.len() as u32);
    for name in names {
        put_str(buf, name);
    }
}

fn put_type(buf: &mut Vec<u8>, data_type: DataType) {
    match data_type {
        DataType::Int => buf.put_u8(TYPE_INT),
        DataType::Char(len) => {
            buf.put_u8(TYPE_CHAR);
            buf.put_u32(len);
        }
        DataType::Date => buf.put_u8(TYPE_DATE),
    }
}

fn put_value(buf: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Null => buf.put_u8(TAG_NULL),
        Value::Int(i) => {
            buf.put_u8(TYPE_INT);
            buf.put_i64(*i);
        }
        Value::Char(s) => {
            buf.put_u8(TYPE_CHAR);
            put_str(buf, s);
        }
        Value::Date(d) => {
            buf.put_u8(TYPE_DATE);
            buf.put_u16(d.year);
            buf.put_u8(d.month);
            buf.put_u8(d.day);
        }
    }
}

// --- readers ---
//
// `Buf` panics when reading past the end, so every read checks first.

fn need(buf: &&[u8], n: usize) -> DecodeResult<()> {
    if buf.remaining() < n {
        return Err(DecodeError(format!(
            "unexpected end of data: need {n} bytes, {} left",
            buf.remaining()
        )));
    }
    Ok(())
}

fn get_u8(buf: &mut &[u8]) -> DecodeResult<u8> {
    need(buf, 1)?;
    Ok(buf.get_u8())
}

fn get_u32(buf: &mut &[u8]) -> DecodeResult<u32> {
    need(buf, 4)?;
    Ok(buf.get_u32())
}

fn get_bytes(buf: &mut &[u8], len: usize) -> DecodeResult<Vec<u8>> {
    need(buf, len)?;
    let out = buf[..len].to_vec();
    buf.advance(len);
    Ok(out)
}

fn get_str(buf: &mut &[u8]) -> DecodeResult<String> {
    let len = get_u32(buf)? as usize;
    let bytes = get_bytes(buf, len)?;
    String::from_utf8(bytes).map_err(|e| DecodeError(e.to_string()))
}

fn get_names(buf: &mut &[u8]) -> DecodeResult<Vec<String>> {
    let count = get_u32(buf)?;
    (0..count).map(|_| get_str(buf)).collect()
}

fn get_type(buf: &mut &[u8]) -> DecodeResult<DataType> {
    match get_u8(buf)? {
        TYPE_INT => Ok(DataType::Int),
        TYPE_CHAR => Ok(DataType::Char(get_u32(buf)?)),
        TYPE_DATE => Ok(DataType::Date),
        other => Err(DecodeError(format!("invalid type tag {other}"))),
    }
}

fn get_value(buf: &mut &[u8]) -> DecodeResult<Value> {
    match get_u8(buf)? {
        TAG_NULL => Ok(Value::Null),
        TYPE_INT => {
            need(buf, 8)?;
            Ok(Value::Int(buf.get_i64()))
        }
        TYPE_CHAR => Ok(Value::Char(get_str(buf)?.into())),
        TYPE_DATE => {
            need(buf, 4)?;
            Ok(Value::Date(Date {
                year: buf.get_u16(),
                month: buf.get_u8(),
                day: buf.get_u8(),
            }))
        }
        other => Err(DecodeError(format!("invalid value tag {other}"))),
    }
}

fn expect_format(buf: &mut &[u8], expected: u8) -> DecodeResult<()> {
    match get_u8(buf)? {
        v if v == expected => Ok(()),
        v => Err(DecodeError(format!("unsupported format version {v}"))),
    }
}

fn expect_end(buf: &&[u8]) -> DecodeResult<()> {
    if buf.has_remaining() {
        return Err(DecodeError(format!("{} trailing bytes", buf.remaining())));
    }
    Ok(())
}
