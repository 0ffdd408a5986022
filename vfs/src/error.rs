use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    AlreadyExists,
    NotFound,
    IsADirectory,
    NotADirectory,
    DirectoryNotEmpty,
    /// 符号链接嵌套过深
    TooManyLinks,
    /// 底层设备读写失败
    Io,
    /// 磁盘上的数据结构不合法
    InvalidData,
    OutOfMemory,
    InvalidInput,
    Unsupported,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::AlreadyExists => "entry already exists",
            Self::NotFound => "no such file or directory",
            Self::IsADirectory => "is a directory",
            Self::NotADirectory => "not a directory",
            Self::DirectoryNotEmpty => "directory not empty",
            Self::TooManyLinks => "too many levels of symbolic links",
            Self::Io => "input/output error",
            Self::InvalidData => "invalid on-disk data",
            Self::OutOfMemory => "out of memory",
            Self::InvalidInput => "invalid argument",
            Self::Unsupported => "operation not supported",
        };
        f.write_str(msg)
    }
}

impl core::error::Error for Error {}
