use super::entity::Buffer;
use crate::storage::entity::PageId;

use std::io;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("no free buffer available in buffer pool")]
    PoolExhausted,
    #[error("page {0} is not resident in buffer pool")]
    NotResident(PageId),
    #[error("page {0} is not pinned")]
    InvalidUnpin(PageId),
    #[error("page {0} is pinned and cannot be deleted")]
    PageInUse(PageId),
    #[error("invalid buffer pool configuration: {0}")]
    Config(String),
}

impl Error {
    // 呼び出し側が時間をおいて再試行すれば成功しうるか
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::PoolExhausted)
    }
}

pub trait BufferPoolManager {
    // ページを取得し pin する
    fn fetch_page(&self, page_id: PageId) -> Result<Arc<Buffer>, Error>;
    // pin を外す。is_dirty が真なら以後 dirty として扱う
    fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> Result<(), Error>;
    // ページをストレージに書き出す
    fn flush_page(&self, page_id: PageId) -> Result<(), Error>;
    // 常駐している全ページをストレージに書き出す
    fn flush_all_pages(&self) -> Result<(), Error>;
    // 新たにページを生成し pin する
    fn create_page(&self) -> Result<(PageId, Arc<Buffer>), Error>;
    // ページを破棄してフレームを空きに戻す
    fn delete_page(&self, page_id: PageId) -> Result<(), Error>;
}
