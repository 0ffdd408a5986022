use core::mem;

use block_dev::{BlockDevice, BlockError};

use crate::config::{SECTOR_BITS, SECTOR_SIZE};
use crate::{Error, SectorId};

/// 从`sector`起、偏移`byte_offset`字节处读取`buf.len()`字节
///
/// 偏移可以超过一个扇区；首尾不足一扇区的部分经由栈上的扇区缓冲读取，
/// 中间对齐的部分一次读入`buf`。
pub fn devread(
    dev: &dyn BlockDevice,
    sector: SectorId,
    byte_offset: usize,
    buf: &mut [u8],
) -> Result<(), Error> {
    let mut sector = u64::from(sector) + (byte_offset >> SECTOR_BITS) as u64;
    let offset = byte_offset & (SECTOR_SIZE - 1);
    let mut rest = buf;

    if offset != 0 {
        let mut bounce = [0u8; SECTOR_SIZE];
        read_sectors(dev, sector, 1, &mut bounce)?;
        let len = (SECTOR_SIZE - offset).min(rest.len());
        let (head, tail) = mem::take(&mut rest).split_at_mut(len);
        head.copy_from_slice(&bounce[offset..offset + len]);
        rest = tail;
        sector += 1;
    }

    let aligned = rest.len() & !(SECTOR_SIZE - 1);
    if aligned != 0 {
        let (body, tail) = mem::take(&mut rest).split_at_mut(aligned);
        read_sectors(dev, sector, (aligned >> SECTOR_BITS) as u32, body)?;
        rest = tail;
        sector += (aligned >> SECTOR_BITS) as u64;
    }

    if !rest.is_empty() {
        let mut bounce = [0u8; SECTOR_SIZE];
        read_sectors(dev, sector, 1, &mut bounce)?;
        let len = rest.len();
        rest.copy_from_slice(&bounce[..len]);
    }

    Ok(())
}

fn read_sectors(dev: &dyn BlockDevice, sector: u64, count: u32, buf: &mut [u8]) -> Result<(), Error> {
    let lba = u32::try_from(sector).map_err(|_| BlockError::OutOfRange)?;
    let done = dev
        .read_blocks(lba, count, buf)
        .inspect_err(|err| log::error!("ext2: read of {count} sector(s) at {lba} failed: {err}"))?;
    if done != count {
        log::error!("ext2: short read at {lba}: {done}/{count} sector(s)");
        return Err(Error::Io(BlockError::Io));
    }
    Ok(())
}
