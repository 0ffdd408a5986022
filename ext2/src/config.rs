//! 引擎所用的常量与挂载配置

pub use block_dev::SECTOR_SIZE;

/// 扇区内寻址的位数
pub const SECTOR_BITS: u32 = 9;

/// 超级块相对卷起始的字节偏移
pub const SUPERBLOCK_OFFSET: usize = 1024;

/// 根目录的inode编号
pub const ROOT_INO: u32 = 2;

/// 直接索引块的个数
pub const DIRECT_BLOCKS: usize = 12;

/// 目标不超过此长度的符号链接直接存放在inode内
pub const INLINE_SYMLINK_MAX: usize = 60;

/// 符号链接目标的最大长度
pub const PATH_MAX: usize = 4096;

/// 设备读取缓存的默认条目数
pub const DEVREAD_CACHE_CAPACITY: usize = 5;

/// 一次路径解析中符号链接嵌套的上限
pub const MAX_SYMLINK_NEST: usize = 8;

/// 挂载配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// 每个文件/目录句柄的设备读取缓存条目数，0表示不缓存
    pub devread_cache_capacity: usize,
    /// 跟随到第几层符号链接时判为循环
    pub max_symlink_nest: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            devread_cache_capacity: DEVREAD_CACHE_CAPACITY,
            max_symlink_nest: MAX_SYMLINK_NEST,
        }
    }
}
