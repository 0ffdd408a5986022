//! 每个句柄私有的读取缓存
//!
//! - [`DevReadCache`]：按`(扇区, 偏移, 长度)`缓存最近的若干次设备读取，MRU顺序
//! - [`BlockMapCache`]：在前者之上记住最近的一级、二级间接块

use alloc::boxed::Box;
use alloc::vec::Vec;

use block_dev::BlockDevice;

use crate::{BlockId, Error, SectorId, devread};

#[derive(Debug)]
struct CachedRead {
    sector: SectorId,
    byte_offset: usize,
    data: Box<[u8]>,
}

#[derive(Debug)]
pub struct DevReadCache {
    capacity: usize,
    /// 队首为最近使用
    entries: Vec<CachedRead>,
}

impl DevReadCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Vec::new(),
        }
    }

    /// 与[`devread`]相同，但先查缓存；命中的条目移到队首
    pub fn read(
        &mut self,
        dev: &dyn BlockDevice,
        sector: SectorId,
        byte_offset: usize,
        buf: &mut [u8],
    ) -> Result<(), Error> {
        if let Some(pos) = self.entries.iter().position(|entry| {
            entry.sector == sector && entry.byte_offset == byte_offset && entry.data.len() == buf.len()
        }) {
            let entry = self.entries.remove(pos);
            buf.copy_from_slice(&entry.data);
            self.entries.insert(0, entry);
            return Ok(());
        }

        devread(dev, sector, byte_offset, buf)?;
        if self.capacity == 0 {
            return Ok(());
        }

        let mut data = Vec::new();
        data.try_reserve_exact(buf.len())?;
        data.extend_from_slice(buf);
        if self.entries.len() >= self.capacity {
            self.entries.truncate(self.capacity - 1);
        }
        self.entries.insert(
            0,
            CachedRead {
                sector,
                byte_offset,
                data: data.into_boxed_slice(),
            },
        );
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// 间接块的层级
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Level {
    /// 直接指向数据块的间接块
    Single,
    /// 二级间接块的顶层
    Double,
}

/// 已解码的间接块
#[derive(Debug)]
struct IndirectBlock {
    block: BlockId,
    entries: Vec<BlockId>,
}

/// 逻辑块映射用的缓存
#[derive(Debug)]
pub struct BlockMapCache {
    devread: DevReadCache,
    single: Option<IndirectBlock>,
    double: Option<IndirectBlock>,
}

impl BlockMapCache {
    pub fn new(devread_capacity: usize) -> Self {
        Self {
            devread: DevReadCache::new(devread_capacity),
            single: None,
            double: None,
        }
    }

    pub fn devread(&mut self) -> &mut DevReadCache {
        &mut self.devread
    }

    /// 取间接块的全部表项，该层的槽位已缓存同一物理块时不读盘
    pub(crate) fn indirect(
        &mut self,
        level: Level,
        dev: &dyn BlockDevice,
        block: BlockId,
        block_size: usize,
        log2_sectors: u32,
    ) -> Result<&[BlockId], Error> {
        let Self {
            devread,
            single,
            double,
        } = self;
        let slot = match level {
            Level::Single => single,
            Level::Double => double,
        };

        if !matches!(slot.as_ref(), Some(cached) if cached.block == block) {
            log::trace!("ext2: loading {level:?} indirect block {block:?}");
            let mut raw = Vec::new();
            raw.try_reserve_exact(block_size)?;
            raw.resize(block_size, 0);
            devread.read(dev, block.sector(log2_sectors), 0, &mut raw)?;

            let mut entries = Vec::new();
            entries.try_reserve_exact(block_size / 4)?;
            entries.extend(
                raw.chunks_exact(4)
                    .map(|b| BlockId::new(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))),
            );
            *slot = Some(IndirectBlock { block, entries });
        }

        Ok(slot.as_ref().map_or(&[], |cached| cached.entries.as_slice()))
    }

    pub fn clear(&mut self) {
        self.devread.clear();
        self.single = None;
        self.double = None;
    }
}
