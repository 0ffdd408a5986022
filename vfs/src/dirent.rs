use alloc::string::String;

/// 目录读取所交换的目录项
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Inode number
    pub inode: u64,
    pub ty: DirEntryType,
    pub name: String,
    /// 目录项所指文件的字节长度
    pub size: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum DirEntryType {
    Block,
    Char,
    Directory,
    Fifo,
    Socket,
    SymLink,
    #[default]
    Regular,
    /// 磁盘上没有记录，也无法从inode推断
    Unknown,
}
