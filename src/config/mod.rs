//! Static hardware parameters of a DCA matrix conv2d instance and the runtime
//! record elaborated from them.
//!
//! The parameters mirror the values the SoC generator emits for every IP
//! instance. Only the size limits survive elaboration; the port widths and
//! FIFO depths describe the MMIOX1 wrapper and are handed to the queue through
//! [`MmioxParams`].

use crate::ConvError;

/// Known accelerator instances.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Conv2dVariant {
    /// `i_dca_matrix_conv00` as instantiated on the verification platform.
    Conv00,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HardwareParameters {
    pub bw_addr: u32,
    pub ma_bw_data: u32,
    pub mb_bw_data: u32,
    pub mc_bw_data: u32,
    pub input_matrix_size: u32,
    pub kernel_matrix_size: u32,
    pub output_matrix_size: u32,
    pub tensor_para: u32,
    pub bw_config: u32,
    pub bw_status: u32,
    pub bw_log: u32,
    pub bw_inst: u32,
    pub bw_input: u32,
    pub bw_output: u32,
    /// Cannot hold the full-width default of the config port; not consumed.
    pub config_default_value: u32,
    pub log_fifo_depth: u32,
    pub inst_fifo_depth: u32,
    pub input_fifo_depth: u32,
    pub output_fifo_depth: u32,
}

impl HardwareParameters {
    pub fn preset(variant: Conv2dVariant) -> Self {
        match variant {
            Conv2dVariant::Conv00 => Self::conv00(),
        }
    }

    fn conv00() -> Self {
        Self {
            bw_addr: 32,
            ma_bw_data: 64,
            mb_bw_data: 64,
            mc_bw_data: 64,
            input_matrix_size: 32,
            kernel_matrix_size: 3,
            output_matrix_size: 30,
            tensor_para: 0,
            bw_config: 1,
            bw_status: 10,
            bw_log: 32,
            bw_inst: 512,
            bw_input: 64,
            bw_output: 64,
            config_default_value: 0,
            log_fifo_depth: 0,
            inst_fifo_depth: 2,
            input_fifo_depth: 0,
            output_fifo_depth: 0,
        }
    }

    /// Parameters of the MMIOX1 wrapper in front of the convolution core.
    pub fn mmiox_params(&self) -> MmioxParams {
        MmioxParams {
            bw_config: self.bw_config,
            bw_status: self.bw_status,
            bw_log: self.bw_log,
            bw_inst: self.bw_inst,
            inst_fifo_depth: self.inst_fifo_depth,
            log_fifo_depth: self.log_fifo_depth,
        }
    }

    /// Builds the runtime descriptor for this instance around `mmiox`.
    ///
    /// Size limits must fit the 16-bit fields of [`HardwareInfo`].
    pub fn elaborate<Q>(&self, mmiox: Q) -> Result<HardwareInfo<Q>, ConvError> {
        let narrow = |value: u32, name: &'static str| {
            u16::try_from(value).map_err(|_| ConvError::InvalidHardwareParameters(name))
        };

        Ok(HardwareInfo {
            mmiox,
            input_matrix_size: narrow(self.input_matrix_size, "input_matrix_size")?,
            kernel_matrix_size: narrow(self.kernel_matrix_size, "kernel_matrix_size")?,
            output_matrix_size: narrow(self.output_matrix_size, "output_matrix_size")?,
        })
    }
}

/// Subset of [`HardwareParameters`] describing the MMIOX1 queue ports.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MmioxParams {
    pub bw_config: u32,
    pub bw_status: u32,
    pub bw_log: u32,
    pub bw_inst: u32,
    pub inst_fifo_depth: u32,
    pub log_fifo_depth: u32,
}

impl MmioxParams {
    /// Width of one instruction in 32-bit FIFO words.
    pub const fn inst_words(&self) -> usize {
        self.bw_inst.div_ceil(32) as usize
    }
}

/// Runtime view of one accelerator instance, created once at board init.
#[derive(Debug)]
pub struct HardwareInfo<Q> {
    pub mmiox: Q,
    pub input_matrix_size: u16,
    pub kernel_matrix_size: u16,
    pub output_matrix_size: u16,
}

/// Tunables of the driver itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverConfig {
    /// Busy polls before a submission is reported as timed out.
    pub poll_budget: usize,
    /// Polls between two debug dumps of the queue status.
    pub log_interval: usize,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            poll_budget: 10_000_000,
            log_interval: 100_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elaborate_copies_size_limits() {
        let params = HardwareParameters::preset(Conv2dVariant::Conv00);
        let info = params.elaborate(()).unwrap();

        assert_eq!(info.input_matrix_size, 32);
        assert_eq!(info.kernel_matrix_size, 3);
        assert_eq!(info.output_matrix_size, 30);
    }

    #[test]
    fn elaborate_rejects_limits_wider_than_16_bits() {
        let mut params = HardwareParameters::preset(Conv2dVariant::Conv00);
        params.kernel_matrix_size = 0x1_0000;

        assert_eq!(
            params.elaborate(()).unwrap_err(),
            ConvError::InvalidHardwareParameters("kernel_matrix_size")
        );
    }

    #[test]
    fn inst_words_rounds_up() {
        let mut mmiox = HardwareParameters::preset(Conv2dVariant::Conv00).mmiox_params();
        assert_eq!(mmiox.inst_words(), 16);
        mmiox.bw_inst = 417;
        assert_eq!(mmiox.inst_words(), 14);
    }
}
