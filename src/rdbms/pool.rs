use std::collections::{HashMap, VecDeque};
use std::io;
use std::ops::{Index, IndexMut};
use std::sync::Arc;

use log::{debug, trace, warn};
use parking_lot::Mutex;

use super::lru::LruReplacer;
use crate::buffer::{
    entity::{Buffer, Frame, FrameId},
    manager::*,
    replacer::Replacer,
};
use crate::config::Config;
use crate::storage::{entity::PageId, manager::*};

// 監視用のカウンタ
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BufferPoolStats {
    pub fetches: u64,
    pub hits: u64,
    // ストレージから読んだ回数
    pub misses: u64,
    pub evictions: u64,
    // 書き戻したページ数
    pub flushes: u64,
    pub resident_frames: usize,
    pub pinned_frames: usize,
    pub dirty_frames: usize,
}

impl BufferPoolStats {
    pub fn hit_ratio(&self) -> f64 {
        if self.fetches == 0 {
            0.0
        } else {
            self.hits as f64 / self.fetches as f64
        }
    }
}

struct BufferPool {
    frames: Vec<Frame>,
}

impl Index<FrameId> for BufferPool {
    type Output = Frame;
    fn index(&self, index: FrameId) -> &Self::Output {
        &self.frames[index.0]
    }
}

impl IndexMut<FrameId> for BufferPool {
    fn index_mut(&mut self, index: FrameId) -> &mut Self::Output {
        &mut self.frames[index.0]
    }
}

impl BufferPool {
    fn new(pool_size: usize) -> Self {
        let mut frames = vec![];
        frames.resize_with(pool_size, Default::default);
        Self { frames }
    }
}

// プール全体のロックで守られる状態
struct Inner<S, R> {
    storage: S,
    pool: BufferPool,
    page_table: HashMap<PageId, FrameId>,
    free_list: VecDeque<FrameId>,
    replacer: R,
    stats: BufferPoolStats,
}

impl<S: StorageManager, R: Replacer> Inner<S, R> {
    // 空きフレームを優先し、無ければ replacer から追い出し対象を選ぶ。
    // 返したフレームはページテーブルにも空きリストにも replacer にも属さない。
    fn acquire_frame(&mut self) -> Result<FrameId, Error> {
        if let Some(frame_id) = self.free_list.pop_front() {
            return Ok(frame_id);
        }
        let frame_id = self.replacer.victim().ok_or(Error::PoolExhausted)?;
        let evict_page_id = self.pool[frame_id].page_id;
        debug_assert!(!self.pool[frame_id].is_pinned());
        if self.pool[frame_id].is_dirty {
            if let Err(e) = self.flush_frame(frame_id) {
                warn!(
                    "write-back of page {} failed, keeping frame {}: {}",
                    evict_page_id, frame_id, e
                );
                self.replacer.restore(frame_id);
                return Err(e.into());
            }
        }
        self.page_table.remove(&evict_page_id);
        self.pool[frame_id].reset();
        self.stats.evictions += 1;
        debug!("evicted page {} from frame {}", evict_page_id, frame_id);
        Ok(frame_id)
    }

    fn release_frame(&mut self, frame_id: FrameId) {
        self.pool[frame_id].reset();
        self.free_list.push_back(frame_id);
    }

    // unpin 中のフレーム専用。誰もラッチを持たないのでロック下で読んでよい
    fn flush_frame(&mut self, frame_id: FrameId) -> io::Result<()> {
        let frame = &mut self.pool[frame_id];
        {
            let page = frame.buffer.read();
            self.storage.write_page_data(frame.page_id, &page[..])?;
        }
        frame.is_dirty = false;
        self.stats.flushes += 1;
        Ok(())
    }

    // pin 中のフレームを書き戻す前準備。
    // 追加の pin で追い出しと削除を防ぎ、その時点の dirty_version を覚える
    fn begin_flush(&mut self, frame_id: FrameId) -> FlushTicket {
        let frame = &mut self.pool[frame_id];
        frame.pin_count += 1;
        self.replacer.pin(frame_id);
        FlushTicket {
            frame_id,
            page_id: frame.page_id,
            dirty_version: frame.dirty_version,
            buffer: Arc::clone(&frame.buffer),
        }
    }

    // ロックの外で取った複写を書き、begin_flush の pin を外す。
    // 途中で dirty に unpin されていればフラグは残す
    fn finish_flush(&mut self, ticket: FlushTicket, page: &[u8]) -> io::Result<()> {
        let written = self.storage.write_page_data(ticket.page_id, page);
        let frame = &mut self.pool[ticket.frame_id];
        if written.is_ok() {
            if frame.dirty_version == ticket.dirty_version {
                frame.is_dirty = false;
            }
            self.stats.flushes += 1;
        }
        frame.pin_count -= 1;
        if frame.pin_count == 0 {
            self.replacer.unpin(ticket.frame_id);
        }
        written
    }

    fn frame_id_of(&self, page_id: PageId) -> Result<FrameId, Error> {
        self.page_table
            .get(&page_id)
            .copied()
            .ok_or(Error::NotResident(page_id))
    }
}

struct FlushTicket {
    frame_id: FrameId,
    page_id: PageId,
    dirty_version: u64,
    buffer: Arc<Buffer>,
}

// 管理情報とストレージは一つの Mutex で守る。
// ページの中身は各 Buffer のラッチで守り、このロックを持ったまま
// pin 中のページのラッチを待ってはいけない
pub struct PoolManager<S, R = LruReplacer> {
    pool_size: usize,
    inner: Mutex<Inner<S, R>>,
}

impl<S: StorageManager> PoolManager<S, LruReplacer> {
    pub fn new(storage: S, pool_size: usize) -> Self {
        Self::with_replacer(storage, pool_size, LruReplacer::new(pool_size))
    }

    pub fn from_config(storage: S, config: &Config) -> Result<Self, Error> {
        config.validate()?;
        Ok(Self::new(storage, config.pool_size))
    }
}

impl<S: StorageManager, R: Replacer> PoolManager<S, R> {
    pub fn with_replacer(storage: S, pool_size: usize, replacer: R) -> Self {
        let inner = Inner {
            storage,
            pool: BufferPool::new(pool_size),
            page_table: HashMap::with_capacity(pool_size),
            free_list: (0..pool_size).map(FrameId).collect(),
            replacer,
            stats: BufferPoolStats::default(),
        };
        Self {
            pool_size,
            inner: Mutex::new(inner),
        }
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    pub fn contains(&self, page_id: PageId) -> bool {
        self.inner.lock().page_table.contains_key(&page_id)
    }

    pub fn pin_count(&self, page_id: PageId) -> Option<usize> {
        let inner = self.inner.lock();
        let frame_id = inner.page_table.get(&page_id)?;
        Some(inner.pool[*frame_id].pin_count)
    }

    pub fn is_dirty(&self, page_id: PageId) -> Option<bool> {
        let inner = self.inner.lock();
        let frame_id = inner.page_table.get(&page_id)?;
        Some(inner.pool[*frame_id].is_dirty)
    }

    pub fn free_frames(&self) -> usize {
        self.inner.lock().free_list.len()
    }

    pub fn evictable_frames(&self) -> usize {
        self.inner.lock().replacer.size()
    }

    pub fn stats(&self) -> BufferPoolStats {
        let inner = self.inner.lock();
        let mut stats = inner.stats.clone();
        for frame in inner.pool.frames.iter().filter(|frame| !frame.is_free()) {
            stats.resident_frames += 1;
            if frame.is_pinned() {
                stats.pinned_frames += 1;
            }
            if frame.is_dirty {
                stats.dirty_frames += 1;
            }
        }
        stats
    }

    pub fn into_storage(self) -> S {
        self.inner.into_inner().storage
    }

    fn flush_resident(&self, page_id: PageId) -> Result<(), Error> {
        let ticket = {
            let mut inner = self.inner.lock();
            let frame_id = inner.frame_id_of(page_id)?;
            if !inner.pool[frame_id].is_pinned() {
                inner.flush_frame(frame_id)?;
                return Ok(());
            }
            inner.begin_flush(frame_id)
        };
        // プールのロックを放してからラッチを取る
        let page = ticket.buffer.snapshot();
        self.inner.lock().finish_flush(ticket, &page[..])?;
        Ok(())
    }
}

impl<S: StorageManager, R: Replacer> BufferPoolManager for PoolManager<S, R> {
    fn fetch_page(&self, page_id: PageId) -> Result<Arc<Buffer>, Error> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        inner.stats.fetches += 1;
        if let Some(&frame_id) = inner.page_table.get(&page_id) {
            inner.stats.hits += 1;
            let frame = &mut inner.pool[frame_id];
            frame.pin_count += 1;
            inner.replacer.pin(frame_id);
            trace!("page {} hit in frame {}", page_id, frame_id);
            return Ok(Arc::clone(&frame.buffer));
        }
        inner.stats.misses += 1;
        let frame_id = inner.acquire_frame()?;
        let frame = &mut inner.pool[frame_id];
        let loaded = {
            let mut page = frame.buffer.write();
            inner.storage.read_page_data(page_id, &mut page[..])
        };
        if let Err(e) = loaded {
            warn!("failed to read page {}: {}", page_id, e);
            inner.release_frame(frame_id);
            return Err(e.into());
        }
        frame.page_id = page_id;
        frame.pin_count = 1;
        frame.is_dirty = false;
        let buffer = Arc::clone(&frame.buffer);
        inner.page_table.insert(page_id, frame_id);
        debug!("loaded page {} into frame {}", page_id, frame_id);
        Ok(buffer)
    }

    fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> Result<(), Error> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        let frame_id = inner.frame_id_of(page_id)?;
        let frame = &mut inner.pool[frame_id];
        if frame.pin_count == 0 {
            return Err(Error::InvalidUnpin(page_id));
        }
        if is_dirty {
            frame.is_dirty = true;
            frame.dirty_version = frame.dirty_version.wrapping_add(1);
        }
        frame.pin_count -= 1;
        if frame.pin_count == 0 {
            inner.replacer.unpin(frame_id);
        }
        Ok(())
    }

    fn flush_page(&self, page_id: PageId) -> Result<(), Error> {
        self.flush_resident(page_id)?;
        debug!("flushed page {}", page_id);
        Ok(())
    }

    fn flush_all_pages(&self) -> Result<(), Error> {
        let resident: Vec<PageId> = self.inner.lock().page_table.keys().copied().collect();
        let mut first_error = None;
        for page_id in resident {
            match self.flush_resident(page_id) {
                // 途中で追い出されたページは書き戻し済みか clean
                Ok(()) | Err(Error::NotResident(_)) => {}
                Err(e) => {
                    warn!("failed to flush page {}: {}", page_id, e);
                    first_error.get_or_insert(e);
                }
            }
        }
        if let Err(e) = self.inner.lock().storage.sync() {
            warn!("failed to sync storage: {}", e);
            first_error.get_or_insert(e.into());
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn create_page(&self) -> Result<(PageId, Arc<Buffer>), Error> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        let page_id = inner.storage.allocate_page();
        if inner.page_table.contains_key(&page_id) {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("allocated page {} is already resident", page_id),
            )));
        }
        let frame_id = match inner.acquire_frame() {
            Ok(frame_id) => frame_id,
            Err(e) => {
                // 採番したページIDを返却して漏らさない
                if let Err(dealloc) = inner.storage.deallocate_page(page_id) {
                    warn!("failed to deallocate page {}: {}", page_id, dealloc);
                }
                return Err(e);
            }
        };
        let frame = &mut inner.pool[frame_id];
        frame.page_id = page_id;
        frame.pin_count = 1;
        frame.is_dirty = true;
        let buffer = Arc::clone(&frame.buffer);
        inner.page_table.insert(page_id, frame_id);
        debug!("created page {} in frame {}", page_id, frame_id);
        Ok((page_id, buffer))
    }

    fn delete_page(&self, page_id: PageId) -> Result<(), Error> {
        let mut inner = self.inner.lock();
        let frame_id = match inner.page_table.get(&page_id) {
            Some(&frame_id) => frame_id,
            None => return Ok(()),
        };
        if inner.pool[frame_id].is_pinned() {
            return Err(Error::PageInUse(page_id));
        }
        inner.storage.deallocate_page(page_id)?;
        inner.page_table.remove(&page_id);
        inner.replacer.pin(frame_id);
        inner.release_frame(frame_id);
        debug!("deleted page {}, frame {} is free", page_id, frame_id);
        Ok(())
    }
}
