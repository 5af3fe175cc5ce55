use crate::MatrixOp;

/// Operand role inside a convolution request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Input,
    Kernel,
    Output,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConvError {
    #[error("invalid convolution options: stride={stride} pad={pad} reserved={reserved:#x}")]
    InvalidOptions { stride: u32, pad: u32, reserved: u32 },
    #[error("no backend bound for {0:?}")]
    Unbound(MatrixOp),
    #[error("device still busy after {polls} polls")]
    DeviceTimeout { polls: usize },
    #[error("instruction fifo did not accept the record")]
    QueueFull,
    #[error("{operand:?} matrix not representable")]
    Translation {
        operand: Operand,
        #[source]
        source: TranslateError,
    },
    #[error("{operand:?} matrix {rows}x{cols} exceeds hardware limit {limit}")]
    ExceedsHardwareLimit {
        operand: Operand,
        rows: u32,
        cols: u32,
        limit: u16,
    },
    #[error("output shape {rows}x{cols} does not match expected {expected_rows}x{expected_cols}")]
    ShapeMismatch {
        rows: u32,
        cols: u32,
        expected_rows: u32,
        expected_cols: u32,
    },
    #[error("invalid hardware parameter `{0}`")]
    InvalidHardwareParameters(&'static str),
}

/// Reasons a [`MatrixInfo`](crate::MatrixInfo) cannot be packed into a device
/// descriptor.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslateError {
    #[error("matrix has no rows or columns")]
    Empty,
    #[error("address {addr:#x} wider than {bits} bits")]
    AddressOutOfRange { addr: u64, bits: u32 },
    #[error("dimension {0} does not fit a 16-bit field")]
    DimensionTooLarge(u32),
    #[error("row stride {stride} shorter than a row of {row_bytes} bytes")]
    StrideTooShort { stride: u32, row_bytes: u64 },
}
