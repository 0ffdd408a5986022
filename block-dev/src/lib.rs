//! # 块设备接口层
//!
//! 块设备是以**块**（扇区）为单位存储数据的设备，例如磁盘、SD卡、U盘等；
//! [`BlockDevice`] 就是对读写块设备的抽象，实现了此特质的类型称为**块设备驱动**。
//!
//! 存储栈只通过这个接口访问设备，自身从不进行物理I/O。

#![no_std]

extern crate alloc;

mod mem_disk;

use core::any::Any;
use core::fmt;

pub use self::mem_disk::MemDisk;

/// MBR布局与ext2扇区换算所假定的扇区大小
pub const SECTOR_SIZE: usize = 512;

/// 块设备的几何信息
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    /// 一个块的字节量
    pub block_size: u32,
    /// 块总数
    pub total_blocks: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockError {
    /// 底层设备读写失败
    Io,
    /// 访问超出设备（或分区）的末尾
    OutOfRange,
    /// 缓冲区容纳不下请求的块数
    ShortBuffer,
    /// 设备不可写
    ReadOnly,
}

impl fmt::Display for BlockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io => f.write_str("block device I/O error"),
            Self::OutOfRange => f.write_str("block address out of range"),
            Self::ShortBuffer => f.write_str("buffer too small for request"),
            Self::ReadOnly => f.write_str("block device is read-only"),
        }
    }
}

impl core::error::Error for BlockError {}

/// 块设备驱动特质
///
/// 读写均以块为单位：`count`个块从`lba`开始，缓冲区至少`count * block_size`字节。
/// 返回值为实际完成的块数。
pub trait BlockDevice: Send + Sync + Any {
    fn geometry(&self) -> Geometry;

    fn read_blocks(&self, lba: u32, count: u32, buf: &mut [u8]) -> Result<u32, BlockError>;

    fn write_blocks(&self, lba: u32, count: u32, buf: &[u8]) -> Result<u32, BlockError>;

    fn handle_irq(&self) {}
}

impl fmt::Debug for dyn BlockDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockDevice")
            .field("geometry", &self.geometry())
            .finish()
    }
}
