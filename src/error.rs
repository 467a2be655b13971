// error handling and fallable return values stuff
use thiserror::Error;


// errors raised by executing guest instructions. any of these kills the
// offending task; none of them is allowed to take the host down with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ExecError {
    #[error("StackOverflow")]
    StackOverflow,
    #[error("StackUnderflow")]
    StackUnderflow,
    #[error("OutOfMemory")] // any word address outside ram - code, data or jump target
    OutOfMemory,
    #[error("DivideByZero")]
    DivideByZero,
    #[error("unknown opcode {0:#04x}")]
    UnknownOpcode(u8),
    #[error("NotImplemented")]
    NotImplemented,
    #[error("port {0:#x} out of range")] // IN/OUT on a port id nobody registered
    OutOfRange(u32),
}


#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("error in line {line}: {kind}")]
pub struct AssembleError {
    pub line : usize, // one-based source line
    pub kind : AssembleErrorKind,
}


#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssembleErrorKind {
    #[error("OpCode '{0}' not found")]
    OpCodeNotFound(String),
    #[error("{0} exceeds operand size")]
    ExceedsOperandSize(String),
    #[error("unknown operand '{0}'")]
    UnknownOperand(String),
    #[error("syntax error: {0}")]
    Syntax(String),
}


// a bad image is rejected before anything is copied into ram
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("unexpected end of image")]
    UnexpectedEof,
    #[error("image code is not a whole number of words")]
    Misaligned,
    #[error("label name is not valid utf-8")]
    BadLabel,
    #[error("label '{0}' points outside the code region")]
    LabelOutOfRange(String),
    #[error("image of {0} words does not fit in ram")]
    TooLarge(usize),
    #[error("no room for a task stack")]
    NoStackSpace,
}


pub type ExecResult<T> = Result<T, ExecError>;
