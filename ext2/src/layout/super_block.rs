use enumflags2::{BitFlags, bitflags};

use super::OnDisk;

/// 超级块，位于卷的第1024字节处，占1024字节
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct SuperBlock {
    inodes_count: u32,
    blocks_count: u32,
    _r_blocks_count: u32,
    free_blocks_count: u32,
    free_inodes_count: u32,
    /// 超级块所在的块：1KiB块为1，更大的块为0
    first_data_block: u32,
    /// 块大小为`1024 << log_block_size`
    log_block_size: u32,
    _log_frag_size: u32,
    blocks_per_group: u32,
    _frags_per_group: u32,
    inodes_per_group: u32,
    _mtime: u32,
    _wtime: u32,
    _mnt_count: u16,
    _max_mnt_count: u16,
    /// 0xEF53
    magic: u16,
    _state: u16,
    _errors: u16,
    _minor_rev_level: u16,
    _lastcheck: u32,
    _checkinterval: u32,
    _creator_os: u32,
    /// 0：旧版，inode固定128字节
    rev_level: u32,
    _def_resuid: u16,
    _def_resgid: u16,

    /*
     * 以下仅在动态版本(rev_level >= 1)中有效
     */
    _first_ino: u32,
    inode_size: u16,
    _block_group_nr: u16,
    _feature_compat: u32,
    feature_incompat: u32,
    _feature_ro_compat: u32,
    _uuid: [u8; 16],
    volume_name: [u8; 16],
    _last_mounted: [u8; 64],
    _algorithm_usage_bitmap: u32,

    _prealloc_blocks: u8,
    _prealloc_dir_blocks: u8,
    _padding1: u16,

    _journal_uuid: [u8; 16],
    _journal_inum: u32,
    _journal_dev: u32,
    _last_orphan: u32,
    _hash_seed: [u32; 4],
    _def_hash_version: u8,
    _reserved_char_pad: u8,
    _reserved_word_pad: u16,
    _default_mount_opts: u32,
    _first_meta_bg: u32,
    _reserved: [u32; 190],
}

unsafe impl OnDisk for SuperBlock {}

/// 不兼容特性：读者不认识其中任何一位时，本不应挂载
#[bitflags]
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncompatFeature {
    Compression = 0x0001,
    /// 目录项记录文件类型
    FileType = 0x0002,
    Recover = 0x0004,
    JournalDev = 0x0008,
    MetaBg = 0x0010,
    Extents = 0x0040,
    Bit64 = 0x0080,
    Mmp = 0x0100,
    FlexBg = 0x0200,
    EaInode = 0x0400,
    DirData = 0x1000,
    CsumSeed = 0x2000,
    LargeDir = 0x4000,
    InlineData = 0x8000,
    Encrypt = 0x10000,
}

impl SuperBlock {
    pub const MAGIC: u16 = 0xEF53;

    /// 旧版文件系统的inode大小
    pub const GOOD_OLD_INODE_SIZE: u16 = 128;

    /// 最大支持64KiB的块
    const MAX_LOG_BLOCK_SIZE: u32 = 6;

    pub fn parse(bytes: &[u8]) -> Option<Self> {
        Self::read_from(bytes)
    }

    pub fn magic(&self) -> u16 {
        u16::from_le(self.magic)
    }

    pub fn is_ext2(&self) -> bool {
        self.magic() == Self::MAGIC
    }

    /// 几何参数能否支撑后续的寻址计算
    pub fn is_sane(&self) -> bool {
        let inode_size = self.inode_size() as u32;
        u32::from_le(self.log_block_size) <= Self::MAX_LOG_BLOCK_SIZE
            && self.inodes_per_group() != 0
            && inode_size >= Self::GOOD_OLD_INODE_SIZE as u32
            && inode_size.is_power_of_two()
            && inode_size <= self.block_size()
    }

    pub fn inodes_count(&self) -> u32 {
        u32::from_le(self.inodes_count)
    }

    pub fn blocks_count(&self) -> u32 {
        u32::from_le(self.blocks_count)
    }

    pub fn free_blocks_count(&self) -> u32 {
        u32::from_le(self.free_blocks_count)
    }

    pub fn free_inodes_count(&self) -> u32 {
        u32::from_le(self.free_inodes_count)
    }

    pub fn first_data_block(&self) -> u32 {
        u32::from_le(self.first_data_block)
    }

    /// 块大小相对1KiB的对数
    pub fn log2_block_size(&self) -> u32 {
        u32::from_le(self.log_block_size)
    }

    pub fn block_size(&self) -> u32 {
        1024 << self.log2_block_size()
    }

    /// 每块扇区数的对数
    pub fn log2_sectors_per_block(&self) -> u32 {
        self.log2_block_size() + 1
    }

    pub fn blocks_per_group(&self) -> u32 {
        u32::from_le(self.blocks_per_group)
    }

    pub fn inodes_per_group(&self) -> u32 {
        u32::from_le(self.inodes_per_group)
    }

    pub fn group_count(&self) -> u32 {
        self.inodes_count().div_ceil(self.inodes_per_group().max(1))
    }

    pub fn revision(&self) -> u32 {
        u32::from_le(self.rev_level)
    }

    pub fn inode_size(&self) -> u16 {
        if self.revision() == 0 {
            Self::GOOD_OLD_INODE_SIZE
        } else {
            u16::from_le(self.inode_size)
        }
    }

    pub fn feature_incompat(&self) -> BitFlags<IncompatFeature> {
        BitFlags::from_bits_truncate(u32::from_le(self.feature_incompat))
    }

    /// 不认识的不兼容特性位
    pub fn unknown_incompat(&self) -> u32 {
        u32::from_le(self.feature_incompat) & !BitFlags::<IncompatFeature>::all().bits()
    }

    /// 卷标，去掉末尾的NUL
    pub fn volume_name(&self) -> &[u8] {
        let len = self
            .volume_name
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(self.volume_name.len());
        &self.volume_name[..len]
    }
}
