//! ext2在磁盘上的数据结构
//!
//! 所有多字节字段均为小端序。

mod block_group;
mod dir_entry;
mod inode;
mod super_block;

use core::{mem, ptr};

pub use self::block_group::BlockGroupDescriptor;
pub use self::dir_entry::{DirEntryHead, FileTypeTag};
pub use self::inode::{BlockPointers, DiskInode, FileMode, Inode, Permission};
pub use self::super_block::{IncompatFeature, SuperBlock};

/// 可从任意字节序列按位复制得到的磁盘结构
///
/// # Safety
///
/// 实现者必须是`#[repr(C)]`且只含整数与整数数组字段，任意位模式都合法。
pub(crate) unsafe trait OnDisk: Copy {
    fn read_from(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < mem::size_of::<Self>() {
            return None;
        }
        Some(unsafe { ptr::read_unaligned(bytes.as_ptr().cast()) })
    }
}
