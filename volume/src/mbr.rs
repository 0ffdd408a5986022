//! IBM MBR 分区表
//!
//! 引导扇区布局：
//! 引导代码 | 分区表(0x1BE, 4 * 16字节) | 签名(0x1FE, `55 AA`)
//!
//! 没有MBR签名的设备可能是"超级软盘"：整盘就是一个文件系统，引导扇区即其BPB。

use alloc::vec;
use alloc::vec::Vec;

use block_dev::{BlockDevice, SECTOR_SIZE};

use crate::Error;

/// 分区表在引导扇区内的偏移
pub const PTBL: usize = 0x1BE;
/// 一条分区表项的字节量
pub const PTBL_ENTRY_SIZE: usize = 16;
/// 主分区表项数
pub const PTBL_ENTRIES: usize = 4;

pub const PTBL_ACTIVE: usize = 0x000;
pub const PTBL_START_HEAD: usize = 0x001;
pub const PTBL_START_SEC_TRACK: usize = 0x002;
pub const PTBL_ID: usize = 0x004;
pub const PTBL_END_HEAD: usize = 0x005;
pub const PTBL_END_SEC_TRACK: usize = 0x006;
pub const PTBL_LBA: usize = 0x008;
pub const PTBL_SECTORS: usize = 0x00C;

pub const SIGNATURE: usize = 0x1FE;
pub const SIGNATURE_WORD: [u8; 2] = [0x55, 0xAA];

/// 活动（可引导）分区的标志
pub const ACTIVE: u8 = 0x80;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionEntry {
    pub active: bool,
    /// 分区类型ID，超级软盘为0
    pub kind: u8,
    pub start_lba: u32,
    pub sector_count: u32,
}

/// 读取0号扇区并解析分区表
pub fn scan(dev: &dyn BlockDevice) -> Result<Vec<PartitionEntry>, Error> {
    let geometry = dev.geometry();
    let block_size = geometry.block_size as usize;
    let count = SECTOR_SIZE.div_ceil(block_size).max(1);

    let mut sector = vec![0u8; count * block_size];
    if dev.read_blocks(0, count as u32, &mut sector)? != count as u32 {
        return Err(Error::Io(block_dev::BlockError::Io));
    }

    let entries = parse(&sector, geometry.total_blocks);
    log::debug!("mbr: {} partition(s) found", entries.len());
    Ok(entries)
}

/// 解析引导扇区，`total_blocks`用于超级软盘的整盘分区
///
/// 遇到第一条无效表项就停止，其后的表项不再检查。
pub fn parse(sector: &[u8], total_blocks: u32) -> Vec<PartitionEntry> {
    if sector.len() < SECTOR_SIZE {
        return Vec::new();
    }
    if sector[SIGNATURE..SIGNATURE + 2] != SIGNATURE_WORD {
        if is_superfloppy(sector) {
            log::trace!("mbr: no signature, superfloppy boot sector");
            return vec![PartitionEntry {
                active: false,
                kind: 0,
                start_lba: 0,
                sector_count: total_blocks,
            }];
        }
        return Vec::new();
    }

    sector[PTBL..PTBL + PTBL_ENTRY_SIZE * PTBL_ENTRIES]
        .chunks_exact(PTBL_ENTRY_SIZE)
        .map_while(|raw| {
            let active = raw[PTBL_ACTIVE];
            let kind = raw[PTBL_ID];
            if active != ACTIVE && (active != 0 || kind == 0) {
                return None;
            }
            Some(PartitionEntry {
                active: active == ACTIVE,
                kind,
                start_lba: get_u32(raw, PTBL_LBA),
                sector_count: get_u32(raw, PTBL_SECTORS),
            })
        })
        .collect()
}

/// 跳转指令`EB xx 90`且介质描述字节高4位全1
fn is_superfloppy(sector: &[u8]) -> bool {
    sector[0] == 0xEB && sector[2] == 0x90 && (sector[21] & 0xF0) == 0xF0
}

fn get_u32(raw: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([raw[offset], raw[offset + 1], raw[offset + 2], raw[offset + 3]])
}
