//! Caller-facing matrix descriptions and their translation into the packed
//! descriptors read by the accelerator.

use crate::{DeviceMatrixDescriptor, TranslateError};

/// Element type of a matrix operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MatrixDataType {
    Fixed8 = 0x1,
    Fixed16 = 0x2,
    Fixed32 = 0x4,
    Float32 = 0x14,
}

impl MatrixDataType {
    pub const fn elem_size(self) -> u32 {
        match self {
            MatrixDataType::Fixed8 => 1,
            MatrixDataType::Fixed16 => 2,
            MatrixDataType::Fixed32 | MatrixDataType::Float32 => 4,
        }
    }
}

/// Location and shape of one matrix in device-visible memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatrixInfo {
    /// Bus address of element (0, 0).
    pub addr: u64,
    pub num_row: u32,
    pub num_col: u32,
    /// Distance between two rows in bytes.
    pub stride: u32,
    pub datatype: MatrixDataType,
}

impl MatrixInfo {
    /// Densely packed matrix at `addr`.
    ///
    /// A row wider than `u32::MAX` bytes saturates the stride, which the
    /// translator then rejects as shorter than the row.
    pub fn new(addr: u64, num_row: u32, num_col: u32, datatype: MatrixDataType) -> Self {
        Self {
            addr,
            num_row,
            num_col,
            stride: num_col.saturating_mul(datatype.elem_size()),
            datatype,
        }
    }

    pub fn row_bytes(&self) -> u64 {
        self.num_col as u64 * self.datatype.elem_size() as u64
    }

    /// Bytes spanned from the first to the last element, `None` if the
    /// matrix runs past the end of the address space.
    pub fn span(&self) -> Option<MemRegion> {
        let len = match self.num_row {
            0 => 0,
            rows => (rows as u64 - 1)
                .checked_mul(self.stride as u64)?
                .checked_add(self.row_bytes())?,
        };
        if len != 0 {
            self.addr.checked_add(len - 1)?;
        }
        Some(MemRegion {
            addr: self.addr,
            len,
        })
    }

    /// Bus address of element (`row`, `col`). Only meaningful for matrices
    /// whose [`span`](Self::span) exists.
    pub fn elem_addr(&self, row: u32, col: u32) -> u64 {
        let row_offset = row as u64 * self.stride as u64;
        let col_offset = col as u64 * self.datatype.elem_size() as u64;
        self.addr.wrapping_add(row_offset).wrapping_add(col_offset)
    }
}

/// A device-visible byte range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemRegion {
    pub addr: u64,
    pub len: u64,
}

/// Converts a [`MatrixInfo`] into the accelerator's descriptor format.
///
/// Implementations must be deterministic and free of side effects.
pub trait DescriptorTranslator {
    fn translate(&self, info: &MatrixInfo) -> Result<DeviceMatrixDescriptor, TranslateError>;
}

/// Translator for DCA descriptors on a bus of `addr_bits` address bits.
#[derive(Debug, Clone, Copy)]
pub struct DcaTranslator {
    addr_bits: u32,
}

impl DcaTranslator {
    pub const fn new(addr_bits: u32) -> Self {
        Self { addr_bits }
    }
}

impl DescriptorTranslator for DcaTranslator {
    fn translate(&self, info: &MatrixInfo) -> Result<DeviceMatrixDescriptor, TranslateError> {
        if info.num_row == 0 || info.num_col == 0 {
            return Err(TranslateError::Empty);
        }
        let bits = self.addr_bits.min(32);
        let out_of_range = TranslateError::AddressOutOfRange {
            addr: info.addr,
            bits,
        };
        let span = info.span().ok_or(out_of_range)?;
        let end = span.addr.checked_add(span.len - 1).ok_or(out_of_range)?;
        if end >> bits != 0 {
            return Err(out_of_range);
        }
        if (info.stride as u64) < info.row_bytes() {
            return Err(TranslateError::StrideTooShort {
                stride: info.stride,
                row_bytes: info.row_bytes(),
            });
        }
        let m1 = |dim: u32| u16::try_from(dim - 1).map_err(|_| TranslateError::DimensionTooLarge(dim));

        Ok(DeviceMatrixDescriptor {
            addr: info.addr as u32,
            stride: info.stride,
            num_row_m1: m1(info.num_row)?,
            num_col_m1: m1(info.num_col)?,
            datatype: info.datatype as u8,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translate_packs_minus_one_dimensions() {
        let info = MatrixInfo::new(0x8000_0000, 32, 16, MatrixDataType::Fixed16);
        let desc = DcaTranslator::new(32).translate(&info).unwrap();

        assert_eq!(desc.addr, 0x8000_0000);
        assert_eq!(desc.num_row_m1, 31);
        assert_eq!(desc.num_col_m1, 15);
        assert_eq!(desc.stride, 32);
        assert_eq!(desc.datatype, MatrixDataType::Fixed16 as u8);
    }

    #[test]
    fn translate_rejects_buffers_beyond_the_address_width() {
        let info = MatrixInfo::new(0xffff_fff0, 4, 4, MatrixDataType::Fixed32);
        assert_eq!(
            DcaTranslator::new(32).translate(&info),
            Err(TranslateError::AddressOutOfRange {
                addr: 0xffff_fff0,
                bits: 32
            })
        );
    }

    #[test]
    fn translate_rejects_bad_shapes() {
        let t = DcaTranslator::new(32);
        let empty = MatrixInfo::new(0x1000, 0, 4, MatrixDataType::Fixed8);
        assert_eq!(t.translate(&empty), Err(TranslateError::Empty));

        let wide = MatrixInfo::new(0x1000, 1, 0x1_0001, MatrixDataType::Fixed8);
        assert_eq!(
            t.translate(&wide),
            Err(TranslateError::DimensionTooLarge(0x1_0001))
        );

        let mut overlapping = MatrixInfo::new(0x1000, 2, 8, MatrixDataType::Fixed32);
        overlapping.stride = 16;
        assert_eq!(
            t.translate(&overlapping),
            Err(TranslateError::StrideTooShort {
                stride: 16,
                row_bytes: 32
            })
        );
    }

    #[test]
    fn span_covers_last_row_only_up_to_its_end() {
        let mut info = MatrixInfo::new(0x100, 3, 2, MatrixDataType::Fixed32);
        info.stride = 64;
        assert_eq!(
            info.span(),
            Some(MemRegion {
                addr: 0x100,
                len: 2 * 64 + 8
            })
        );
    }

    #[test]
    fn translate_rejects_matrix_at_top_of_address_space() {
        let info = MatrixInfo::new(u64::MAX - 2, 1, 1, MatrixDataType::Fixed32);
        assert_eq!(info.span(), None);
        assert_eq!(
            DcaTranslator::new(32).translate(&info),
            Err(TranslateError::AddressOutOfRange {
                addr: u64::MAX - 2,
                bits: 32
            })
        );

        let last_byte = MatrixInfo::new(u64::MAX, 1, 1, MatrixDataType::Fixed8);
        assert!(last_byte.span().is_some());
        assert!(DcaTranslator::new(32).translate(&last_byte).is_err());
    }

    #[test]
    fn huge_shapes_do_not_overflow() {
        let wide = MatrixInfo::new(0x1000, 1, u32::MAX, MatrixDataType::Fixed32);
        assert_eq!(wide.stride, u32::MAX);
        assert_eq!(wide.row_bytes(), u32::MAX as u64 * 4);
        assert!(DcaTranslator::new(32).translate(&wide).is_err());

        let huge = MatrixInfo::new(0x1000, u32::MAX, u32::MAX, MatrixDataType::Fixed32);
        assert_eq!(huge.span(), None);
        assert_eq!(
            huge.elem_addr(2, u32::MAX),
            0x1000 + 2 * u32::MAX as u64 + 4 * u32::MAX as u64
        );
    }
}
