use super::OnDisk;

/// 块组描述符
///
/// 描述符表紧跟超级块所在的块之后。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct BlockGroupDescriptor {
    block_bitmap: u32,
    inode_bitmap: u32,
    /// inode表的首块
    inode_table: u32,
    free_blocks_count: u16,
    free_inodes_count: u16,
    used_dirs_count: u16,
    _pad: u16,
    _reserved: [u32; 3],
}

unsafe impl OnDisk for BlockGroupDescriptor {}

impl BlockGroupDescriptor {
    pub const SIZE: usize = core::mem::size_of::<Self>();

    pub(crate) fn parse(bytes: &[u8]) -> Option<Self> {
        Self::read_from(bytes)
    }

    pub fn block_bitmap(&self) -> u32 {
        u32::from_le(self.block_bitmap)
    }

    pub fn inode_bitmap(&self) -> u32 {
        u32::from_le(self.inode_bitmap)
    }

    pub fn inode_table(&self) -> u32 {
        u32::from_le(self.inode_table)
    }

    pub fn free_blocks_count(&self) -> u16 {
        u16::from_le(self.free_blocks_count)
    }

    pub fn free_inodes_count(&self) -> u16 {
        u16::from_le(self.free_inodes_count)
    }

    pub fn used_dirs_count(&self) -> u16 {
        u16::from_le(self.used_dirs_count)
    }
}
