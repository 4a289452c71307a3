// フレームとページ内容のハンドル
pub mod entity;

// buffermanager の抽象とエラー
pub mod manager;

// 追い出し候補を選ぶ replacer の抽象
pub mod replacer;
