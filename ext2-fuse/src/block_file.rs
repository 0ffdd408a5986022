use std::cell::RefCell;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};

use block_dev::{BlockDevice, BlockError, Geometry, SECTOR_SIZE};
use send_wrapper::SendWrapper;

/// 以宿主文件为介质的块设备，块大小固定为一个扇区
#[derive(Debug)]
pub struct BlockFile {
    inner: SendWrapper<RefCell<File>>,
    total_blocks: u32,
}

impl BlockFile {
    pub fn new(fd: File) -> std::io::Result<Self> {
        let len = fd.metadata()?.len();
        Ok(Self {
            inner: SendWrapper::new(RefCell::new(fd)),
            total_blocks: u32::try_from(len / SECTOR_SIZE as u64).unwrap_or(u32::MAX),
        })
    }

    fn check(&self, lba: u32, count: u32, len: usize) -> Result<usize, BlockError> {
        let bytes = count as usize * SECTOR_SIZE;
        if len < bytes {
            return Err(BlockError::ShortBuffer);
        }
        if lba.checked_add(count).is_none_or(|end| end > self.total_blocks) {
            return Err(BlockError::OutOfRange);
        }
        Ok(bytes)
    }
}

impl BlockDevice for BlockFile {
    fn geometry(&self) -> Geometry {
        Geometry {
            block_size: SECTOR_SIZE as u32,
            total_blocks: self.total_blocks,
        }
    }

    fn read_blocks(&self, lba: u32, count: u32, buf: &mut [u8]) -> Result<u32, BlockError> {
        let bytes = self.check(lba, count, buf.len())?;
        let mut file = self.inner.borrow_mut();
        file.seek(SeekFrom::Start(lba as u64 * SECTOR_SIZE as u64))
            .and_then(|_| file.read_exact(&mut buf[..bytes]))
            .map_err(|err| {
                log::error!("image read at sector {lba}: {err}");
                BlockError::Io
            })?;
        Ok(count)
    }

    fn write_blocks(&self, lba: u32, count: u32, buf: &[u8]) -> Result<u32, BlockError> {
        let bytes = self.check(lba, count, buf.len())?;
        let mut file = self.inner.borrow_mut();
        file.seek(SeekFrom::Start(lba as u64 * SECTOR_SIZE as u64))
            .and_then(|_| file.write_all(&buf[..bytes]))
            .map_err(|err| {
                log::error!("image write at sector {lba}: {err}");
                BlockError::Io
            })?;
        Ok(count)
    }
}
