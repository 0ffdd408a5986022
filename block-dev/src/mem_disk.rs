//! 内存中的块设备，供宿主端工具与测试使用。

use alloc::vec;
use alloc::vec::Vec;

use spin::Mutex;

use crate::{BlockDevice, BlockError, Geometry, SECTOR_SIZE};

#[derive(Debug)]
pub struct MemDisk {
    block_size: usize,
    inner: Mutex<MemDiskInner>,
}

#[derive(Debug)]
struct MemDiskInner {
    data: Vec<u8>,
    /// 读到此块时报错，用于模拟坏块
    fail_lba: Option<u32>,
    /// 累计的读请求数
    reads: usize,
}

impl MemDisk {
    /// 创建`total_blocks`个全零扇区的盘
    pub fn new(total_blocks: u32) -> Self {
        Self::from_image(vec![0; total_blocks as usize * SECTOR_SIZE])
    }

    /// 以现成的镜像为内容，不足一个扇区的尾部补零
    pub fn from_image(image: Vec<u8>) -> Self {
        Self::with_block_size(image, SECTOR_SIZE)
    }

    pub fn with_block_size(mut data: Vec<u8>, block_size: usize) -> Self {
        data.resize(data.len().next_multiple_of(block_size), 0);
        Self {
            block_size,
            inner: Mutex::new(MemDiskInner {
                data,
                fail_lba: None,
                reads: 0,
            }),
        }
    }

    pub fn set_fail_lba(&self, lba: Option<u32>) {
        self.inner.lock().fail_lba = lba;
    }

    pub fn reads(&self) -> usize {
        self.inner.lock().reads
    }

    /// 复制出整张盘的内容
    pub fn snapshot(&self) -> Vec<u8> {
        self.inner.lock().data.clone()
    }

    /// 直接改写盘上的字节，不经过块接口
    pub fn patch(&self, offset: usize, bytes: &[u8]) {
        self.inner.lock().data[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    fn range(&self, lba: u32, count: u32, len: usize) -> Result<core::ops::Range<usize>, BlockError> {
        let start = lba as usize * self.block_size;
        let bytes = count as usize * self.block_size;
        if len < bytes {
            return Err(BlockError::ShortBuffer);
        }
        Ok(start..start + bytes)
    }
}

impl BlockDevice for MemDisk {
    fn geometry(&self) -> Geometry {
        Geometry {
            block_size: self.block_size as u32,
            total_blocks: (self.inner.lock().data.len() / self.block_size) as u32,
        }
    }

    fn read_blocks(&self, lba: u32, count: u32, buf: &mut [u8]) -> Result<u32, BlockError> {
        let range = self.range(lba, count, buf.len())?;
        let mut inner = self.inner.lock();
        inner.reads += 1;

        if inner
            .fail_lba
            .is_some_and(|bad| (lba..lba.saturating_add(count)).contains(&bad))
        {
            log::trace!("mem disk: injected failure at lba {lba}+{count}");
            return Err(BlockError::Io);
        }
        if range.end > inner.data.len() {
            return Err(BlockError::OutOfRange);
        }

        buf[..range.len()].copy_from_slice(&inner.data[range]);
        Ok(count)
    }

    fn write_blocks(&self, lba: u32, count: u32, buf: &[u8]) -> Result<u32, BlockError> {
        let range = self.range(lba, count, buf.len())?;
        let mut inner = self.inner.lock();
        if range.end > inner.data.len() {
            return Err(BlockError::OutOfRange);
        }

        let len = range.len();
        inner.data[range].copy_from_slice(&buf[..len]);
        Ok(count)
    }
}
