use alloc::format;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;

use block_dev::BlockDevice;
use spin::Mutex;

use crate::{Error, Volume, mbr};

/// 为块设备建立卷
///
/// 找不到分区时整个设备作为一个卷，名为`basename`；
/// 否则按分区表槽位顺序（而非LBA顺序）为每个分区建立一个卷，名为`<basename><index>`。
pub fn enumerate(dev: &Arc<dyn BlockDevice>, basename: &str) -> Result<Vec<Arc<Volume>>, Error> {
    let entries = mbr::scan(dev.as_ref())?;

    if entries.is_empty() {
        log::info!("{basename}: unpartitioned, using whole device");
        return Ok(alloc::vec![Arc::new(Volume::whole(
            String::from(basename),
            dev.clone()
        ))]);
    }

    Ok(entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let name = format!("{basename}{i}");
            log::info!(
                "{name}: lba={} sectors={} type={:#04x}{}",
                entry.start_lba,
                entry.sector_count,
                entry.kind,
                if entry.active { " active" } else { "" }
            );
            Arc::new(Volume::partition(name, dev.clone(), entry))
        })
        .collect())
}

/// 已知卷的登记表
#[derive(Debug, Default)]
pub struct VolumeManager {
    volumes: Mutex<Vec<(String, Arc<Volume>)>>,
}

impl VolumeManager {
    pub const fn new() -> Self {
        Self {
            volumes: Mutex::new(Vec::new()),
        }
    }

    /// 扫描设备并登记它的卷，同一`basename`先前登记的卷会被替换
    pub fn enumerate(
        &self,
        dev: &Arc<dyn BlockDevice>,
        basename: &str,
    ) -> Result<Vec<Arc<Volume>>, Error> {
        let found = enumerate(dev, basename)?;

        let mut volumes = self.volumes.lock();
        volumes.retain(|(base, _)| base != basename);
        volumes.extend(
            found
                .iter()
                .map(|volume| (String::from(basename), volume.clone())),
        );

        Ok(found)
    }

    pub fn get(&self, name: &str) -> Option<Arc<Volume>> {
        self.volumes
            .lock()
            .iter()
            .find_map(|(_, volume)| (volume.name() == name).then(|| volume.clone()))
    }

    pub fn volumes(&self) -> Vec<Arc<Volume>> {
        self.volumes
            .lock()
            .iter()
            .map(|(_, volume)| volume.clone())
            .collect()
    }
}
