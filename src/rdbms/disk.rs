use std::fs::{File, OpenOptions};
use std::io::{prelude::*, Error, ErrorKind, Result, SeekFrom};
use std::path::Path;

use log::debug;

use crate::storage::{
    entity::{PageId, PAGE_SIZE},
    manager::*,
};

pub struct DiskManager {
    // ヒープファイルのファイルディスクリプタ
    heap_file: File,
    // 採番するページを決めるカウンタ
    next_page_id: u64,
    // 解放済みで再利用を待つページID (ファイルには永続化しない)
    free_page_ids: Vec<PageId>,
}

impl DiskManager {
    pub fn new(heap_file: File) -> Result<Self> {
        let heap_file_size = heap_file.metadata()?.len();
        let next_page_id = (heap_file_size + PAGE_SIZE as u64 - 1) / PAGE_SIZE as u64;
        Ok(Self {
            heap_file,
            next_page_id,
            free_page_ids: vec![],
        })
    }

    pub fn open(heap_file_path: impl AsRef<Path>) -> Result<Self> {
        let heap_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(heap_file_path)?;
        Self::new(heap_file)
    }

    fn offset(page_id: PageId, len: usize) -> Result<u64> {
        if !page_id.is_valid() {
            return Err(Error::new(ErrorKind::InvalidInput, "invalid page id"));
        }
        if len != PAGE_SIZE {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                format!("buffer must be {} bytes, got {}", PAGE_SIZE, len),
            ));
        }
        page_id
            .to_u64()
            .checked_mul(PAGE_SIZE as u64)
            .ok_or_else(|| Error::new(ErrorKind::InvalidInput, "page offset overflow"))
    }
}

impl StorageManager for DiskManager {
    fn allocate_page(&mut self) -> PageId {
        if let Some(page_id) = self.free_page_ids.pop() {
            return page_id;
        }
        let page_id = self.next_page_id;
        self.next_page_id += 1;
        PageId(page_id)
    }
    fn deallocate_page(&mut self, page_id: PageId) -> Result<()> {
        if !page_id.is_valid() || page_id.to_u64() >= self.next_page_id {
            return Err(Error::new(
                ErrorKind::NotFound,
                format!("page {} was never allocated", page_id),
            ));
        }
        if self.free_page_ids.contains(&page_id) {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                format!("page {} is already deallocated", page_id),
            ));
        }
        // 再利用時に古い内容が見えないようゼロで上書き
        self.write_page_data(page_id, &[0u8; PAGE_SIZE])?;
        self.free_page_ids.push(page_id);
        debug!("deallocated page {}", page_id);
        Ok(())
    }
    fn read_page_data(&mut self, page_id: PageId, data: &mut [u8]) -> Result<()> {
        // オフセットを計算
        let offset = Self::offset(page_id, data.len())?;
        // ファイル末尾より先のページはゼロ埋め
        if offset >= self.heap_file.metadata()?.len() {
            data.fill(0);
            return Ok(());
        }
        // ページ先頭へシーク
        self.heap_file.seek(SeekFrom::Start(offset))?;
        // データを読み出す
        self.heap_file.read_exact(data)
    }
    fn write_page_data(&mut self, page_id: PageId, data: &[u8]) -> Result<()> {
        // オフセットを計算
        let offset = Self::offset(page_id, data.len())?;
        // ページ先頭へシーク
        self.heap_file.seek(SeekFrom::Start(offset))?;
        // データを書きこむ
        self.heap_file.write_all(data)?;
        if page_id.to_u64() >= self.next_page_id {
            self.next_page_id = page_id.to_u64() + 1;
        }
        Ok(())
    }
    fn sync(&mut self) -> Result<()> {
        self.heap_file.flush()?;
        self.heap_file.sync_all()
    }
}
