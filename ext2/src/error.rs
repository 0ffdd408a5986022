use alloc::collections::TryReserveError;
use core::fmt;

use block_dev::BlockError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// 底层块设备读取失败
    Io(BlockError),
    /// 超级块魔数不符，或根目录不可读
    NotExt2,
    NotFound,
    /// 路径途经非目录，或目标不是目录
    NotADirectory,
    /// 目标不是普通文件
    NotAFile,
    /// 符号链接嵌套过深
    SymlinkLoop,
    /// 三级间接块等未实现的特性
    Unsupported,
    OutOfMemory,
    /// 磁盘上的数据结构自相矛盾
    Corrupted,
    /// 定位到文件开头之前
    InvalidSeek,
}

impl From<BlockError> for Error {
    fn from(err: BlockError) -> Self {
        Self::Io(err)
    }
}

impl From<TryReserveError> for Error {
    fn from(_: TryReserveError) -> Self {
        Self::OutOfMemory
    }
}

impl From<Error> for vfs::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Io(_) => Self::Io,
            Error::NotExt2 | Error::Corrupted => Self::InvalidData,
            Error::NotFound => Self::NotFound,
            Error::NotADirectory => Self::NotADirectory,
            Error::NotAFile => Self::IsADirectory,
            Error::SymlinkLoop => Self::TooManyLinks,
            Error::Unsupported => Self::Unsupported,
            Error::OutOfMemory => Self::OutOfMemory,
            Error::InvalidSeek => Self::InvalidInput,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "ext2: {err}"),
            Self::NotExt2 => f.write_str("ext2: not an ext2 filesystem"),
            Self::NotFound => f.write_str("ext2: file not found"),
            Self::NotADirectory => f.write_str("ext2: not a directory"),
            Self::NotAFile => f.write_str("ext2: not a regular file"),
            Self::SymlinkLoop => f.write_str("ext2: too many levels of symbolic links"),
            Self::Unsupported => f.write_str("ext2: unsupported feature"),
            Self::OutOfMemory => f.write_str("ext2: out of memory"),
            Self::Corrupted => f.write_str("ext2: filesystem is corrupt"),
            Self::InvalidSeek => f.write_str("ext2: invalid seek"),
        }
    }
}

impl core::error::Error for Error {}
