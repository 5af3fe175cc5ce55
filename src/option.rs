//! Convolution option word.
//!
//! Layout of the 32-bit word accepted by the matrix operation API:
//!
//! | bits   | field       | meaning                         |
//! |--------|-------------|---------------------------------|
//! | 0..8   | `STRIDE_M1` | stride minus one (1..=256)      |
//! | 8..16  | `PAD`       | zero padding on every border    |
//! | 16..32 | reserved    | must be zero                    |

use tock_registers::LocalRegisterCopy;

use crate::ConvError;

tock_registers::register_bitfields! {u32,
    pub MCONV_OPTION [
        STRIDE_M1 OFFSET(0) NUMBITS(8) [],
        PAD OFFSET(8) NUMBITS(8) []
    ]
}

pub const MAX_STRIDE: u32 = 1 << 8;
pub const MAX_PAD: u32 = (1 << 8) - 1;
const RESERVED_MASK: u32 = !0xffff;

/// Decoded convolution options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvOptions {
    stride: u32,
    pad: u32,
}

impl ConvOptions {
    pub fn new(stride: u32, pad: u32) -> Result<Self, ConvError> {
        if stride == 0 || stride > MAX_STRIDE || pad > MAX_PAD {
            return Err(ConvError::InvalidOptions {
                stride,
                pad,
                reserved: 0,
            });
        }
        Ok(Self { stride, pad })
    }

    /// Decodes a raw option word. A word with any reserved bit set is
    /// rejected rather than truncated to its low half.
    pub fn try_from_bits(bits: u32) -> Result<Self, ConvError> {
        let word = LocalRegisterCopy::<u32, MCONV_OPTION::Register>::new(bits);
        let stride = word.read(MCONV_OPTION::STRIDE_M1) + 1;
        let pad = word.read(MCONV_OPTION::PAD);
        let reserved = bits & RESERVED_MASK;
        if reserved != 0 {
            warn!("option word {:#x} has reserved bits set", bits);
            return Err(ConvError::InvalidOptions {
                stride,
                pad,
                reserved,
            });
        }
        Ok(Self { stride, pad })
    }

    pub fn bits(&self) -> u32 {
        let mut word = LocalRegisterCopy::<u32, MCONV_OPTION::Register>::new(0);
        word.write(MCONV_OPTION::STRIDE_M1.val(self.stride - 1) + MCONV_OPTION::PAD.val(self.pad));
        word.get()
    }

    pub fn stride(&self) -> u32 {
        self.stride
    }

    pub fn stride_m1(&self) -> u32 {
        self.stride - 1
    }

    pub fn pad(&self) -> u32 {
        self.pad
    }
}

impl Default for ConvOptions {
    fn default() -> Self {
        Self { stride: 1, pad: 0 }
    }
}
