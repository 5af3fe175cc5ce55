//! Driver for the DCA matrix conv2d accelerator.
//!
//! The accelerator sits behind an MMIOX1 wrapper: the CPU pushes one
//! instruction (three matrix descriptors and the stride/pad word) into its
//! instruction FIFO and polls the wrapper's busy flag until the result has
//! been written back. Applications do not talk to the driver directly; the
//! platform binds either [`DcaMatrixConv2d`] or the [`SoftwareConv2d`]
//! fallback into a [`MopMapping`] at startup and callers go through it.

#![cfg_attr(not(test), no_std)]

extern crate alloc;
#[macro_use]
extern crate log;

mod config;
mod err;
mod inst;
mod matrix;
mod mop;
mod option;
mod osal;
pub mod registers;
mod sw;

pub use config::*;
pub use err::*;
pub use inst::*;
pub use matrix::*;
pub use mop::*;
pub use option::*;
pub use osal::*;
pub use registers::Mmiox1;
pub use sw::*;

use spin::Mutex;

use crate::registers::consts::INST_FLAGS_NONE;

/// Hardware backend for one conv2d instance.
pub struct DcaMatrixConv2d<Q, F = FenceFlush, T = DcaTranslator> {
    hwinfo: HardwareInfo<Q>,
    flush: F,
    translator: T,
    config: DriverConfig,
    submit_lock: Mutex<()>,
}

impl<Q: InstQueue> DcaMatrixConv2d<Q> {
    /// Elaborates `params` around `mmiox` and uses the default translator
    /// and barrier.
    pub fn from_params(params: &HardwareParameters, mmiox: Q) -> Result<Self, ConvError> {
        Ok(Self::new(
            params.elaborate(mmiox)?,
            FenceFlush,
            DcaTranslator::new(params.bw_addr),
            DriverConfig::default(),
        ))
    }
}

impl<Q, F, T> DcaMatrixConv2d<Q, F, T>
where
    Q: InstQueue,
    F: CacheFlush,
    T: DescriptorTranslator,
{
    pub fn new(hwinfo: HardwareInfo<Q>, flush: F, translator: T, config: DriverConfig) -> Self {
        Self {
            hwinfo,
            flush,
            translator,
            config,
            submit_lock: Mutex::new(()),
        }
    }

    pub fn hwinfo(&self) -> &HardwareInfo<Q> {
        &self.hwinfo
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Runs one convolution on the accelerator and blocks until the device
    /// is idle again.
    ///
    /// The padding field of `options` is not supported by the hardware path
    /// yet: the instruction is always issued with `pad = 0`.
    pub fn convolve(
        &self,
        mi: &MatrixInfo,
        mk: &MatrixInfo,
        mo: &mut MatrixInfo,
        options: u32,
    ) -> Result<(), ConvError> {
        let conv_option = ConvOptions::try_from_bits(options)?;
        if conv_option.pad() != 0 {
            warn!(
                "pad={} requested, hardware path runs with pad=0",
                conv_option.pad()
            );
        }

        self.check_limit(Operand::Input, mi, self.hwinfo.input_matrix_size)?;
        self.check_limit(Operand::Kernel, mk, self.hwinfo.kernel_matrix_size)?;
        self.check_limit(Operand::Output, mo, self.hwinfo.output_matrix_size)?;

        let inst = InstructionRecord {
            mi: self.translate(Operand::Input, mi)?,
            mk: self.translate(Operand::Kernel, mk)?,
            mo: self.translate(Operand::Output, mo)?,
            stride_m1: conv_option.stride_m1() as u16,
            pad: 0,
        };

        let regions = [
            Self::region(Operand::Input, mi)?,
            Self::region(Operand::Kernel, mk)?,
            Self::region(Operand::Output, mo)?,
        ];
        self.flush.flush(&regions);

        let _guard = self.submit_lock.lock();
        self.hwinfo
            .mmiox
            .push(core::slice::from_ref(&inst), INST_FLAGS_NONE)?;
        debug!("run @ dca_matrix_conv2d");
        self.hwinfo.mmiox.wait_busy(&self.config)
    }

    fn translate(
        &self,
        operand: Operand,
        info: &MatrixInfo,
    ) -> Result<DeviceMatrixDescriptor, ConvError> {
        self.translator
            .translate(info)
            .map_err(|source| ConvError::Translation { operand, source })
    }

    fn region(operand: Operand, info: &MatrixInfo) -> Result<MemRegion, ConvError> {
        info.span().ok_or(ConvError::Translation {
            operand,
            source: TranslateError::AddressOutOfRange {
                addr: info.addr,
                bits: u64::BITS,
            },
        })
    }

    fn check_limit(&self, operand: Operand, info: &MatrixInfo, limit: u16) -> Result<(), ConvError> {
        if info.num_row > limit as u32 || info.num_col > limit as u32 {
            return Err(ConvError::ExceedsHardwareLimit {
                operand,
                rows: info.num_row,
                cols: info.num_col,
                limit,
            });
        }
        Ok(())
    }
}

impl<Q, F, T> MatrixConv for DcaMatrixConv2d<Q, F, T>
where
    Q: InstQueue,
    F: CacheFlush,
    T: DescriptorTranslator,
{
    fn name(&self) -> &'static str {
        "HW"
    }

    fn conv2d(
        &self,
        input: &MatrixInfo,
        kernel: &MatrixInfo,
        output: &mut MatrixInfo,
        options: u32,
    ) -> Result<(), ConvError> {
        self.convolve(input, kernel, output, options)
    }
}
