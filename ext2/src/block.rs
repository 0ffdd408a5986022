use derive_more::{Add, From, Into};

/// 设备上以512字节为单位的扇区号
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Add, From, Into)]
#[repr(transparent)]
pub struct SectorId(u64);

impl SectorId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

impl core::ops::Add<u64> for SectorId {
    type Output = Self;

    fn add(self, rhs: u64) -> Self::Output {
        self + Self(rhs)
    }
}

/// 文件系统块号，0表示空洞（未分配）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, From, Into)]
#[repr(transparent)]
pub struct BlockId(u32);

impl BlockId {
    pub const HOLE: Self = Self(0);

    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn is_hole(self) -> bool {
        self.0 == 0
    }

    /// 块的首个扇区，`log2_sectors`为每块扇区数的对数
    pub fn sector(self, log2_sectors: u32) -> SectorId {
        SectorId((self.0 as u64) << log2_sectors)
    }
}
