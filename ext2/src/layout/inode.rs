use enumflags2::{BitFlags, bitflags};
use vfs::DirEntryType;

use super::OnDisk;
use crate::BlockId;
use crate::config::{DIRECT_BLOCKS, INLINE_SYMLINK_MAX};

/// 磁盘上的inode，动态版本中可能更长，多出的部分忽略
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct DiskInode {
    mode: u16,
    uid: u16,
    size: u32,
    atime: u32,
    ctime: u32,
    mtime: u32,
    dtime: u32,
    gid: u16,
    links_count: u16,
    /// 以512字节为单位的占用量
    blocks: u32,
    flags: u32,
    _osd1: u32,
    /// 12个直接块、一级、二级、三级间接块；
    /// 或短符号链接的目标
    block: [u32; 15],
    _generation: u32,
    _file_acl: u32,
    _dir_acl: u32,
    _faddr: u32,
    _osd2: [u8; 12],
}

unsafe impl OnDisk for DiskInode {}

impl DiskInode {
    pub(crate) fn parse(bytes: &[u8]) -> Option<Self> {
        Self::read_from(bytes)
    }
}

/// 文件类型，即`mode`的高4位
pub struct FileMode;

impl FileMode {
    pub const TYPE_MASK: u16 = 0o170000;
    pub const SOCKET: u16 = 0o140000;
    pub const SYMLINK: u16 = 0o120000;
    pub const REGULAR: u16 = 0o100000;
    pub const BLOCK_DEVICE: u16 = 0o060000;
    pub const DIRECTORY: u16 = 0o040000;
    pub const CHAR_DEVICE: u16 = 0o020000;
    pub const FIFO: u16 = 0o010000;
}

#[bitflags]
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    OtherExec = 0o0001,
    OtherWrite = 0o0002,
    OtherRead = 0o0004,
    GroupExec = 0o0010,
    GroupWrite = 0o0020,
    GroupRead = 0o0040,
    OwnerExec = 0o0100,
    OwnerWrite = 0o0200,
    OwnerRead = 0o0400,
    Sticky = 0o1000,
    SetGid = 0o2000,
    SetUid = 0o4000,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockPointers {
    Blocks {
        direct: [BlockId; DIRECT_BLOCKS],
        indirect: BlockId,
        double_indirect: BlockId,
        triple_indirect: BlockId,
    },
    /// 不超过60字节的符号链接目标，存放在块指针的位置
    InlineSymlink([u8; INLINE_SYMLINK_MAX]),
}

/// 解码后的inode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inode {
    pub mode: u16,
    pub uid: u16,
    pub gid: u16,
    pub size: u32,
    pub links_count: u16,
    /// 以512字节为单位
    pub blocks: u32,
    pub flags: u32,
    pub atime: u32,
    pub ctime: u32,
    pub mtime: u32,
    pub dtime: u32,
    pub pointers: BlockPointers,
}

impl From<&DiskInode> for Inode {
    fn from(raw: &DiskInode) -> Self {
        let mode = u16::from_le(raw.mode);
        let size = u32::from_le(raw.size);

        let pointers = if mode & FileMode::TYPE_MASK == FileMode::SYMLINK
            && size as usize <= INLINE_SYMLINK_MAX
        {
            let mut target = [0u8; INLINE_SYMLINK_MAX];
            for (chunk, word) in target.chunks_exact_mut(4).zip(raw.block) {
                chunk.copy_from_slice(&word.to_ne_bytes());
            }
            BlockPointers::InlineSymlink(target)
        } else {
            let block = raw.block.map(|id| BlockId::new(u32::from_le(id)));
            let mut direct = [BlockId::HOLE; DIRECT_BLOCKS];
            direct.copy_from_slice(&block[..DIRECT_BLOCKS]);
            BlockPointers::Blocks {
                direct,
                indirect: block[DIRECT_BLOCKS],
                double_indirect: block[DIRECT_BLOCKS + 1],
                triple_indirect: block[DIRECT_BLOCKS + 2],
            }
        };

        Self {
            mode,
            uid: u16::from_le(raw.uid),
            gid: u16::from_le(raw.gid),
            size,
            links_count: u16::from_le(raw.links_count),
            blocks: u32::from_le(raw.blocks),
            flags: u32::from_le(raw.flags),
            atime: u32::from_le(raw.atime),
            ctime: u32::from_le(raw.ctime),
            mtime: u32::from_le(raw.mtime),
            dtime: u32::from_le(raw.dtime),
            pointers,
        }
    }
}

impl Inode {
    pub fn file_type(&self) -> u16 {
        self.mode & FileMode::TYPE_MASK
    }

    pub fn kind(&self) -> DirEntryType {
        match self.file_type() {
            FileMode::REGULAR => DirEntryType::Regular,
            FileMode::DIRECTORY => DirEntryType::Directory,
            FileMode::SYMLINK => DirEntryType::SymLink,
            FileMode::CHAR_DEVICE => DirEntryType::Char,
            FileMode::BLOCK_DEVICE => DirEntryType::Block,
            FileMode::FIFO => DirEntryType::Fifo,
            FileMode::SOCKET => DirEntryType::Socket,
            _ => DirEntryType::Unknown,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.file_type() == FileMode::DIRECTORY
    }

    pub fn is_file(&self) -> bool {
        self.file_type() == FileMode::REGULAR
    }

    pub fn is_symlink(&self) -> bool {
        self.file_type() == FileMode::SYMLINK
    }

    pub fn permissions(&self) -> BitFlags<Permission> {
        BitFlags::from_bits_truncate(self.mode)
    }

    /// 短符号链接的目标
    pub fn inline_target(&self) -> Option<&[u8]> {
        match &self.pointers {
            BlockPointers::InlineSymlink(target) => Some(&target[..self.size as usize]),
            BlockPointers::Blocks { .. } => None,
        }
    }
}
