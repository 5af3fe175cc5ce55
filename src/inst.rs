//! Instruction layout consumed by the conv2d core through the MMIOX1
//! instruction FIFO.

/// Words occupied by one [`DeviceMatrixDescriptor`].
pub const DESC_WORDS: usize = 4;

/// Words occupied by one [`InstructionRecord`].
pub const INST_WORDS: usize = 3 * DESC_WORDS + 1;

/// Matrix descriptor in the format read by the accelerator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(C)]
pub struct DeviceMatrixDescriptor {
    pub addr: u32,
    /// Row pitch in bytes.
    pub stride: u32,
    pub num_row_m1: u16,
    pub num_col_m1: u16,
    pub datatype: u8,
}

impl DeviceMatrixDescriptor {
    pub fn to_words(&self) -> [u32; DESC_WORDS] {
        [
            self.addr,
            self.stride,
            ((self.num_col_m1 as u32) << 16) | self.num_row_m1 as u32,
            self.datatype as u32,
        ]
    }
}

/// One convolution request for the accelerator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(C)]
pub struct InstructionRecord {
    pub mi: DeviceMatrixDescriptor,
    pub mk: DeviceMatrixDescriptor,
    pub mo: DeviceMatrixDescriptor,
    pub stride_m1: u16,
    pub pad: u16,
}

impl InstructionRecord {
    /// Serializes the record in FIFO order: input, kernel, output, then the
    /// stride/pad word with `stride_m1` in the low half.
    pub fn to_words(&self) -> [u32; INST_WORDS] {
        let mut words = [0u32; INST_WORDS];
        for (chunk, desc) in words
            .chunks_exact_mut(DESC_WORDS)
            .zip([&self.mi, &self.mk, &self.mo])
        {
            chunk.copy_from_slice(&desc.to_words());
        }
        words[INST_WORDS - 1] = ((self.pad as u32) << 16) | self.stride_m1 as u32;
        words
    }
}
