// ページの識別子とページサイズ
pub mod entity;

// storagemanager の抽象
pub mod manager;

// メモリ上に確保する storagemanager の具体的な実装
pub mod memory;
