use core::fmt;

use block_dev::BlockError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// 读写块设备失败
    Io(BlockError),
    /// 分区参数不合法
    InvalidParams,
    /// 扩展分区等未实现的布局
    Unsupported,
}

impl From<BlockError> for Error {
    fn from(err: BlockError) -> Self {
        Self::Io(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "partition table I/O: {err}"),
            Self::InvalidParams => f.write_str("invalid partition parameters"),
            Self::Unsupported => f.write_str("unsupported partition layout"),
        }
    }
}

impl core::error::Error for Error {}
