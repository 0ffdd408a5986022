use vfs::DirEntryType;

use super::OnDisk;

/// 目录项的定长头部，名字紧随其后
///
/// `rec_len`是到下一项的距离，含头部、名字与对齐填充；
/// 名字长度为0的项只是填充。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct DirEntryHead {
    inode: u32,
    rec_len: u16,
    name_len: u8,
    file_type: u8,
}

unsafe impl OnDisk for DirEntryHead {}

impl DirEntryHead {
    pub const SIZE: usize = core::mem::size_of::<Self>();

    pub(crate) fn parse(bytes: &[u8]) -> Option<Self> {
        Self::read_from(bytes)
    }

    pub fn inode(&self) -> u32 {
        u32::from_le(self.inode)
    }

    pub fn rec_len(&self) -> u16 {
        u16::from_le(self.rec_len)
    }

    pub fn name_len(&self) -> u8 {
        self.name_len
    }

    pub fn file_type(&self) -> FileTypeTag {
        FileTypeTag(self.file_type)
    }

    /// 头部与名字放得进记录之内
    pub fn is_well_formed(&self) -> bool {
        let rec_len = self.rec_len() as usize;
        rec_len >= Self::SIZE && rec_len >= Self::SIZE + self.name_len as usize
    }
}

/// 目录项中记录的文件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileTypeTag(pub u8);

impl FileTypeTag {
    pub const UNKNOWN: Self = Self(0);
    pub const REGULAR: Self = Self(1);
    pub const DIRECTORY: Self = Self(2);
    pub const CHAR_DEVICE: Self = Self(3);
    pub const BLOCK_DEVICE: Self = Self(4);
    pub const FIFO: Self = Self(5);
    pub const SOCKET: Self = Self(6);
    pub const SYMLINK: Self = Self(7);

    /// 不认识的标记返回`None`，此时须读inode判断
    pub fn kind(self) -> Option<DirEntryType> {
        Some(match self {
            Self::REGULAR => DirEntryType::Regular,
            Self::DIRECTORY => DirEntryType::Directory,
            Self::CHAR_DEVICE => DirEntryType::Char,
            Self::BLOCK_DEVICE => DirEntryType::Block,
            Self::FIFO => DirEntryType::Fifo,
            Self::SOCKET => DirEntryType::Socket,
            Self::SYMLINK => DirEntryType::SymLink,
            _ => return None,
        })
    }
}
