//! # 卷与分区管理
//!
//! 块设备 → 分区表扫描 → 卷。
//!
//! 每个卷都是块设备上一段区域的视图，读写时把卷内的块号平移到设备上的块号，
//! 所以卷本身也实现了[`BlockDevice`](block_dev::BlockDevice)，文件系统无需关心自己位于分区还是整盘。

#![no_std]

extern crate alloc;

mod error;
mod manager;
pub mod mbr;
pub mod table;
mod volume;

pub use self::{
    error::Error,
    manager::{VolumeManager, enumerate},
    mbr::PartitionEntry,
    volume::{Volume, VolumeKind},
};
