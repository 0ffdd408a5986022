use crate::DirEntryType;

/// 文件属性
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stat {
    pub ino: u64,
    pub mode: DirEntryType,
    /// 文件系统的块大小
    pub block_size: u64,
    /// 以512字节为单位的占用量
    pub blocks: u64,
    pub size: u64,
    /// 硬链接数
    pub nlink: u32,
}
