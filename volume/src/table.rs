//! 写入新的MBR分区表
//!
//! 只支持至多4个主分区；分区从隐藏扇区之后开始连续排布。
//! 写完后需重新为设备建立卷。

use alloc::vec;
use alloc::vec::Vec;

use block_dev::{BlockDevice, SECTOR_SIZE};

use crate::mbr::{self, PartitionEntry};
use crate::Error;

/// 第一个分区之前至少保留的扇区数
pub const MIN_HIDDEN_SECTORS: u32 = 4096;

/// 新分区的类型ID：FAT32 (CHS/LBA)
pub const DEFAULT_PARTITION_ID: u8 = 0x0B;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SizeUnit {
    /// 按扇区数
    #[default]
    Sectors,
    /// 按可用空间的百分比，总和不超过100
    Percent,
    /// 按配额：各分区按比例瓜分可用空间
    Quota,
}

#[derive(Debug, Clone, Default)]
pub struct PartitionParams {
    /// 各分区的大小，0表示空槽
    pub sizes: Vec<u32>,
    pub unit: SizeUnit,
    /// 第一个分区之前的扇区数，不足[`MIN_HIDDEN_SECTORS`]时取后者
    pub hidden_sectors: u32,
}

/// 计算分区布局，不写盘
pub fn layout(total_sectors: u32, params: &PartitionParams) -> Result<Vec<PartitionEntry>, Error> {
    let mut sizes: Vec<u32> = params.sizes.iter().copied().filter(|&s| s > 0).collect();
    if sizes.len() > mbr::PTBL_ENTRIES {
        // 需要扩展分区
        return Err(Error::Unsupported);
    }
    if sizes.is_empty() {
        sizes.push(match params.unit {
            SizeUnit::Sectors => total_sectors.saturating_sub(params.hidden_sectors.max(MIN_HIDDEN_SECTORS)),
            SizeUnit::Percent | SizeUnit::Quota => 100,
        });
    }

    let hidden = params.hidden_sectors.max(MIN_HIDDEN_SECTORS);
    let available = total_sectors
        .checked_sub(hidden)
        .filter(|&available| available > 0)
        .ok_or(Error::InvalidParams)?;

    let summed: u64 = sizes.iter().map(|&s| s as u64).sum();
    let summed = match params.unit {
        SizeUnit::Quota => summed,
        SizeUnit::Percent if summed > 100 => return Err(Error::InvalidParams),
        SizeUnit::Percent => 100,
        SizeUnit::Sectors if summed > available as u64 => return Err(Error::InvalidParams),
        SizeUnit::Sectors => summed,
    };

    let mut remaining = available;
    let mut lba = hidden;
    Ok(sizes
        .into_iter()
        .map(|size| {
            let sectors = match params.unit {
                SizeUnit::Sectors => size,
                SizeUnit::Percent | SizeUnit::Quota => {
                    (size as u64 * available as u64 / summed) as u32
                }
            }
            .min(remaining);

            let entry = PartitionEntry {
                active: true,
                kind: DEFAULT_PARTITION_ID,
                start_lba: lba,
                sector_count: sectors,
            };
            remaining -= sectors;
            lba += sectors;
            entry
        })
        .collect())
}

/// 按参数重写0号扇区的分区表
pub fn write_table(dev: &dyn BlockDevice, params: &PartitionParams) -> Result<Vec<PartitionEntry>, Error> {
    let geometry = dev.geometry();
    let entries = layout(geometry.total_blocks, params)?;

    let block_size = geometry.block_size as usize;
    let count = SECTOR_SIZE.div_ceil(block_size).max(1);
    let mut sector = vec![0u8; count * block_size];

    sector[..3].copy_from_slice(&[0xEB, 0x00, 0x90]);
    sector[3..13].copy_from_slice(b"BitThunder");

    for (slot, entry) in entries.iter().enumerate() {
        let raw = &mut sector[mbr::PTBL + slot * mbr::PTBL_ENTRY_SIZE..][..mbr::PTBL_ENTRY_SIZE];
        raw[mbr::PTBL_ACTIVE] = if entry.active { mbr::ACTIVE } else { 0 };
        raw[mbr::PTBL_START_HEAD] = 1;
        raw[mbr::PTBL_START_SEC_TRACK] = 1;
        raw[mbr::PTBL_ID] = entry.kind;
        raw[mbr::PTBL_END_HEAD] = 0xFE;
        // CHS结束地址无法表示，按惯例填满，实际以LBA为准
        raw[mbr::PTBL_END_SEC_TRACK..mbr::PTBL_END_SEC_TRACK + 2].fill(0xFF);
        raw[mbr::PTBL_LBA..mbr::PTBL_LBA + 4].copy_from_slice(&entry.start_lba.to_le_bytes());
        raw[mbr::PTBL_SECTORS..mbr::PTBL_SECTORS + 4]
            .copy_from_slice(&entry.sector_count.to_le_bytes());
    }
    sector[mbr::SIGNATURE..mbr::SIGNATURE + 2].copy_from_slice(&mbr::SIGNATURE_WORD);

    dev.write_blocks(0, count as u32, &sector)?;
    log::info!("partition table written: {} partition(s)", entries.len());

    Ok(entries)
}
