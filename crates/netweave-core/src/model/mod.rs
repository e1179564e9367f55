//! モデル定義
//!
//! Netweaveで使用されるトポロジー設定モデルを定義します。

mod topology;

// Re-exports
pub use topology::*;
