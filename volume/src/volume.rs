use alloc::string::String;
use alloc::sync::Arc;

use block_dev::{BlockDevice, BlockError, Geometry};

use crate::PartitionEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeKind {
    /// 未分区的整个设备
    Whole,
    Partition {
        /// 分区在设备上的起始块
        base_lba: u32,
        sector_count: u32,
    },
}

/// 块设备上一段区域的视图
#[derive(Debug)]
pub struct Volume {
    name: String,
    dev: Arc<dyn BlockDevice>,
    kind: VolumeKind,
}

impl Volume {
    pub fn whole(name: String, dev: Arc<dyn BlockDevice>) -> Self {
        Self {
            name,
            dev,
            kind: VolumeKind::Whole,
        }
    }

    pub fn partition(name: String, dev: Arc<dyn BlockDevice>, entry: &PartitionEntry) -> Self {
        Self {
            name,
            dev,
            kind: VolumeKind::Partition {
                base_lba: entry.start_lba,
                sector_count: entry.sector_count,
            },
        }
    }

    /// 设备文件名，如`mmc0`、`mmc01`
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> VolumeKind {
        self.kind
    }

    pub fn device(&self) -> &Arc<dyn BlockDevice> {
        &self.dev
    }

    /// 卷内块号 → 设备块号
    ///
    /// 分区卷会拒绝越过分区末尾的访问，以免读写到相邻分区。
    fn translate(&self, lba: u32, count: u32) -> Result<u32, BlockError> {
        match self.kind {
            VolumeKind::Whole => Ok(lba),
            VolumeKind::Partition {
                base_lba,
                sector_count,
            } => {
                let end = lba.checked_add(count).ok_or(BlockError::OutOfRange)?;
                if end > sector_count {
                    log::warn!(
                        "{}: access {lba}+{count} beyond partition end {sector_count}",
                        self.name
                    );
                    return Err(BlockError::OutOfRange);
                }
                base_lba.checked_add(lba).ok_or(BlockError::OutOfRange)
            }
        }
    }
}

impl BlockDevice for Volume {
    fn geometry(&self) -> Geometry {
        let geometry = self.dev.geometry();
        match self.kind {
            VolumeKind::Whole => geometry,
            VolumeKind::Partition { sector_count, .. } => Geometry {
                block_size: geometry.block_size,
                total_blocks: sector_count,
            },
        }
    }

    fn read_blocks(&self, lba: u32, count: u32, buf: &mut [u8]) -> Result<u32, BlockError> {
        let lba = self.translate(lba, count)?;
        self.dev.read_blocks(lba, count, buf)
    }

    fn write_blocks(&self, lba: u32, count: u32, buf: &[u8]) -> Result<u32, BlockError> {
        let lba = self.translate(lba, count)?;
        self.dev.write_blocks(lba, count, buf)
    }

    fn handle_irq(&self) {
        self.dev.handle_irq();
    }
}
