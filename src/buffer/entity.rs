use std::fmt;
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::storage::entity::{Page, PageId, PAGE_SIZE};

// フレーム配列の添字
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct FrameId(pub usize);

impl FrameId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// pin したスレッドとプールで共有するページの中身。
// プールのロックとは別のラッチで守る
pub struct Buffer {
    page: RwLock<Box<Page>>,
}

impl Buffer {
    pub fn read(&self) -> RwLockReadGuard<'_, Box<Page>> {
        self.page.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, Box<Page>> {
        self.page.write()
    }

    // ラッチを取ってページを丸ごと複写する
    pub(crate) fn snapshot(&self) -> Box<Page> {
        Box::new(**self.page.read())
    }

    pub(crate) fn reset(&self) {
        self.page.write().fill(0);
    }
}

impl Default for Buffer {
    fn default() -> Self {
        Self {
            page: RwLock::new(Box::new([0u8; PAGE_SIZE])),
        }
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer").finish_non_exhaustive()
    }
}

// プールのロック下でのみ書き換えるメタデータ
#[derive(Debug, Default)]
pub struct Frame {
    pub page_id: PageId,
    pub pin_count: usize,
    pub is_dirty: bool,
    // dirty で unpin されるたびに進む
    pub dirty_version: u64,
    pub buffer: Arc<Buffer>,
}

impl Frame {
    pub fn is_free(&self) -> bool {
        !self.page_id.is_valid()
    }

    pub fn is_pinned(&self) -> bool {
        self.pin_count > 0
    }

    // 中身をゼロにしてメタデータを初期状態へ戻す
    pub fn reset(&mut self) {
        self.page_id = PageId::INVALID_PAGE_ID;
        self.pin_count = 0;
        self.is_dirty = false;
        self.dirty_version = 0;
        self.buffer.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_reset() {
        let mut frame = Frame::default();
        assert!(frame.is_free());

        frame.page_id = PageId(3);
        frame.pin_count = 2;
        frame.is_dirty = true;
        frame.dirty_version = 4;
        frame.buffer.write()[..5].copy_from_slice(b"hello");
        assert!(!frame.is_free());
        assert!(frame.is_pinned());

        frame.reset();
        assert!(frame.is_free());
        assert!(!frame.is_pinned());
        assert!(!frame.is_dirty);
        assert_eq!(0, frame.dirty_version);
        assert!(frame.buffer.read().iter().all(|&b| b == 0));
    }

    #[test]
    fn snapshot_is_detached_copy() {
        let buffer = Buffer::default();
        buffer.write()[..3].copy_from_slice(b"abc");
        let copy = buffer.snapshot();
        buffer.write()[0] = b'x';
        assert_eq!(b"abc", &copy[..3]);
        assert_eq!(b"xbc", &buffer.read()[..3]);
    }
}
