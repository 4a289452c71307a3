// Disk を使った storagemanager の具体的な実装
pub mod disk;

// LRU による replacer の具体的な実装
pub mod lru;

// Clock-sweep による replacer の具体的な実装
pub mod clocksweep;

// buffermanager の具体的な実装
pub mod pool;
