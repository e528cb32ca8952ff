// src/tag/type5.rs
//! Capability Container + TLV layout shared by Type 5 tags and the Type 1 /
//! Type 2 layouts (which only differ by where the CC starts).

use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::error::{NdefError, Result};
use crate::tag::{NdefArea, TagMemory, read_u8};

pub const CC_MAGIC_SHORT: u8 = 0xE1;
pub const CC_MAGIC_EXTENDED: u8 = 0xE2;

/// Version nibble of a Type 5 CC (mapping version 1.0)
pub const CC_VERSION_T5: u8 = 0x40;
/// Version nibble of a Type 1/2 CC
pub const CC_VERSION_T2: u8 = 0x10;
const CC_VERSION_MASK: u8 = 0xF0;

pub const CC_SHORT_LEN: usize = 4;
pub const CC_EXTENDED_LEN: usize = 8;

/// MLEN is expressed in 8 byte units
pub const MEMORY_UNIT: usize = 8;

pub const TLV_NULL: u8 = 0x00;
pub const TLV_LOCK_CONTROL: u8 = 0x01;
pub const TLV_MEMORY_CONTROL: u8 = 0x02;
pub const TLV_NDEF: u8 = 0x03;
pub const TLV_PROPRIETARY: u8 = 0xFD;
pub const TLV_TERMINATOR: u8 = 0xFE;

/// Marks a 3 byte TLV length
pub const TLV_LONG_LENGTH: u8 = 0xFF;
pub const TLV_MAX_LENGTH: usize = 0xFFFE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CcFile {
    pub magic_number: u8,
    pub version: u8,
    /// Data area size in 8 byte units, zero selects the extended form
    pub memory_size: u8,
    pub tt5_tag: u8,
    pub ext_memory_size: u16,
}

impl CcFile {
    /// CC describing a Type 5 data area of `data_area` bytes, extended form when it
    /// does not fit a byte
    pub fn new(data_area: usize) -> Self {
        let units = data_area / MEMORY_UNIT;
        if units <= 0xFF {
            Self {
                magic_number: CC_MAGIC_SHORT,
                version: CC_VERSION_T5,
                memory_size: units as u8,
                tt5_tag: 0x00,
                ext_memory_size: 0,
            }
        } else {
            Self {
                magic_number: CC_MAGIC_EXTENDED,
                version: CC_VERSION_T5,
                memory_size: 0,
                tt5_tag: 0x00,
                ext_memory_size: units.min(u16::MAX as usize) as u16,
            }
        }
    }

    pub fn is_extended(&self) -> bool {
        self.memory_size == 0
    }

    pub fn len(&self) -> usize {
        if self.is_extended() {
            CC_EXTENDED_LEN
        } else {
            CC_SHORT_LEN
        }
    }

    /// Bytes of the data area following the CC
    pub fn data_area_size(&self) -> usize {
        if self.is_extended() {
            self.ext_memory_size as usize * MEMORY_UNIT
        } else {
            self.memory_size as usize * MEMORY_UNIT
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.magic_number != CC_MAGIC_SHORT && self.magic_number != CC_MAGIC_EXTENDED {
            debug!("unknown CC magic number {:#04x}", self.magic_number);
            return Err(NdefError::NotFormatted);
        }

        let version = self.version & CC_VERSION_MASK;
        if version != CC_VERSION_T5 && version != CC_VERSION_T2 {
            debug!("unknown CC version {:#04x}", self.version);
            return Err(NdefError::NotFormatted);
        }

        Ok(())
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![self.magic_number, self.version, self.memory_size, self.tt5_tag];
        if self.is_extended() {
            out.extend_from_slice(&[0x00, 0x00]);
            out.extend_from_slice(&self.ext_memory_size.to_be_bytes());
        }
        out
    }
}

pub fn read_cc_file<M: TagMemory + ?Sized>(memory: &mut M, offset: usize) -> Result<CcFile> {
    let mut short = [0u8; CC_SHORT_LEN];
    memory.read(offset, &mut short)?;

    let mut cc = CcFile {
        magic_number: short[0],
        version: short[1],
        memory_size: short[2],
        tt5_tag: short[3],
        ext_memory_size: 0,
    };

    if cc.is_extended() {
        let mut extended = [0u8; CC_EXTENDED_LEN - CC_SHORT_LEN];
        memory.read(offset + CC_SHORT_LEN, &mut extended)?;
        cc.ext_memory_size = u16::from_be_bytes([extended[2], extended[3]]);
    }

    trace!("read CC {cc:?} at offset {offset}");
    Ok(cc)
}

pub fn write_cc_file<M: TagMemory + ?Sized>(
    memory: &mut M,
    offset: usize,
    cc: &CcFile,
) -> Result<()> {
    memory.write(offset, &cc.to_bytes())
}

/// Outcome of the TLV walk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TlvScan {
    /// NDEF TLV at `offset`, value starts `header_len` bytes later
    Ndef {
        offset: usize,
        header_len: usize,
        length: usize,
    },
    /// No NDEF TLV, a new one can be placed at `offset`
    Free { offset: usize },
}

fn read_tlv_length<M: TagMemory + ?Sized>(memory: &mut M, offset: usize) -> Result<(usize, usize)> {
    let first = read_u8(memory, offset)?;
    if first != TLV_LONG_LENGTH {
        return Ok((first as usize, 1));
    }

    let mut long = [0u8; 2];
    memory.read(offset + 1, &mut long)?;
    Ok((u16::from_be_bytes(long) as usize, 3))
}

fn tlv_length_field(length: usize) -> Vec<u8> {
    if length < TLV_LONG_LENGTH as usize {
        vec![length as u8]
    } else {
        let [hi, lo] = (length as u16).to_be_bytes();
        vec![TLV_LONG_LENGTH, hi, lo]
    }
}

/// Linear scan of the TLV area in `[start, end)`
fn scan<M: TagMemory + ?Sized>(memory: &mut M, start: usize, end: usize) -> Result<TlvScan> {
    let mut offset = start;
    // first byte after the last control TLV
    let mut free = start;

    while offset < end {
        let tlv_type = read_u8(memory, offset)?;

        match tlv_type {
            TLV_NULL => offset += 1,
            TLV_TERMINATOR => return Ok(TlvScan::Free { offset }),
            _ => {
                let (length, length_len) = read_tlv_length(memory, offset + 1)?;
                let header_len = 1 + length_len;

                if tlv_type == TLV_NDEF {
                    return Ok(TlvScan::Ndef {
                        offset,
                        header_len,
                        length,
                    });
                }

                trace!("skipping TLV {tlv_type:#04x} of {length} bytes at {offset}");
                offset += header_len + length;
                free = offset;
            }
        }
    }

    Ok(TlvScan::Free { offset: free })
}

/// Validated CC and the `[start, end)` bounds of the TLV area it describes
fn tlv_area<M: TagMemory + ?Sized>(
    memory: &mut M,
    cc_offset: usize,
) -> Result<(CcFile, usize, usize)> {
    if memory.capacity() < cc_offset + CC_SHORT_LEN {
        return Err(NdefError::NotFormatted);
    }

    let cc = read_cc_file(memory, cc_offset)?;
    cc.validate()?;

    let start = cc_offset + cc.len();
    let end = (start + cc.data_area_size()).min(memory.capacity());
    Ok((cc, start, end))
}

pub fn area<M: TagMemory + ?Sized>(memory: &mut M, cc_offset: usize) -> Result<NdefArea> {
    let (_, start, end) = tlv_area(memory, cc_offset)?;

    match scan(memory, start, end)? {
        TlvScan::Ndef {
            offset,
            header_len,
            length,
        } => {
            let value = offset + header_len;
            if value + length > end {
                debug!("NDEF TLV of {length} bytes runs past the data area");
                return Err(NdefError::NotFormatted);
            }
            Ok(NdefArea {
                offset: value,
                length,
            })
        }
        TlvScan::Free { .. } => Err(NdefError::NotFormatted),
    }
}

/// Writes the NDEF TLV header, the message and a terminator TLV in one go
pub fn write_ndef<M: TagMemory + ?Sized>(
    memory: &mut M,
    cc_offset: usize,
    data: &[u8],
) -> Result<()> {
    let (_, start, end) = tlv_area(memory, cc_offset)?;

    let offset = match scan(memory, start, end)? {
        TlvScan::Ndef { offset, .. } => offset,
        TlvScan::Free { offset } => offset,
    };

    let length = tlv_length_field(data.len());
    let required = 1 + length.len() + data.len() + 1;
    let available = end.saturating_sub(offset);

    if data.len() > TLV_MAX_LENGTH || required > available {
        return Err(NdefError::MemoryTag {
            required,
            available,
        });
    }

    let mut tlv = Vec::with_capacity(required);
    tlv.push(TLV_NDEF);
    tlv.extend(length);
    tlv.extend_from_slice(data);
    tlv.push(TLV_TERMINATOR);

    debug!("writing NDEF TLV of {} bytes at offset {offset}", data.len());
    memory.write(offset, &tlv)
}

/// CC sized to the memory after it, then an empty NDEF TLV
pub fn format<M: TagMemory + ?Sized>(memory: &mut M, cc_offset: usize) -> Result<()> {
    let available = memory.capacity().saturating_sub(cc_offset + CC_SHORT_LEN);
    let mut cc = CcFile::new(available);
    if cc.is_extended() {
        cc = CcFile::new(available.saturating_sub(CC_EXTENDED_LEN - CC_SHORT_LEN));
    }

    if cc.data_area_size() < 3 {
        return Err(NdefError::MemoryTag {
            required: cc_offset + cc.len() + 3,
            available: memory.capacity(),
        });
    }

    write_cc_file(memory, cc_offset, &cc)?;
    memory.write(cc_offset + cc.len(), &[TLV_NDEF, 0x00, TLV_TERMINATOR])
}
