//! 批量拆分
//!
//! 服务器对单次调用的条目数有上限，读写前按上限切分。
//! 除最后一批外每批恰好 `max_size` 条，顺序保持不变；`max_size = 0` 按 1 处理。

/// 按上限切分为借用切片
pub fn chunks<T>(items: &[T], max_size: usize) -> Vec<&[T]> {
    items.chunks(max_size.max(1)).collect()
}

/// 按上限切分为独立批次
pub fn split<T: Clone>(items: &[T], max_size: usize) -> Vec<Vec<T>> {
    chunks(items, max_size)
        .into_iter()
        .map(<[T]>::to_vec)
        .collect()
}
