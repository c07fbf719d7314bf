//! 历史序列查询
//!
//! 所有算法都是对按时间排序的 `[DataPoint]` 的只读变换，返回对原序列的引用。
//! 质量码阈值为 192（含）。

use chrono::{DateTime, SubsecRound, Utc};
use domain::{DataPoint, Value};

/// 过滤方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    QualityGood,
    ValueNotNull,
    GoodAndNotNull,
}

impl FilterMode {
    pub fn accepts(self, point: &DataPoint) -> bool {
        match self {
            FilterMode::QualityGood => point.is_good(),
            FilterMode::ValueNotNull => point.value.is_some(),
            FilterMode::GoodAndNotNull => point.is_good() && point.value.is_some(),
        }
    }
}

/// 区间内取第一个还是最后一个
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FindType {
    First,
    Last,
}

/// 以 100ns 为单位的时间刻度
fn ticks(timestamp: DateTime<Utc>) -> i128 {
    i128::from(timestamp.timestamp()) * 10_000_000
        + i128::from(timestamp.timestamp_subsec_nanos() / 100)
}

/// 时间戳是否落在 `[start, end]` 内（三者都先截断到整秒）
fn in_window(timestamp: DateTime<Utc>, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
    let timestamp = timestamp.trunc_subsecs(0);
    timestamp >= start.trunc_subsecs(0) && timestamp <= end.trunc_subsecs(0)
}

/// 与目标时间差最小的点；差值相同时保留先出现的点。
pub fn closest<'a>(
    points: impl IntoIterator<Item = &'a DataPoint>,
    target: DateTime<Utc>,
) -> Option<&'a DataPoint> {
    let target = ticks(target);
    let mut best: Option<(&DataPoint, i128)> = None;
    for point in points {
        let distance = (ticks(point.timestamp) - target).abs();
        if best.is_none_or(|(_, min)| distance < min) {
            best = Some((point, distance));
        }
    }
    best.map(|(point, _)| point)
}

/// 历史序列上的查询操作。
pub trait SeriesQuery {
    fn filter(&self, mode: FilterMode) -> Vec<&DataPoint>;

    fn first_good(&self) -> Option<&DataPoint>;

    fn last_good(&self) -> Option<&DataPoint>;

    /// 时间上最接近 `target` 的点
    fn find_closest(&self, target: DateTime<Utc>) -> Option<&DataPoint>;

    /// 质量 Good 且值与 `value` 精确相等的点中，时间上最接近 `target` 的点。
    ///
    /// 浮点值按位比较，不做容差。
    fn find_closest_by_value(&self, value: &Value, target: DateTime<Utc>) -> Option<&DataPoint>;

    /// 截断到整秒后落在 `[start, end]` 内的第一个或最后一个点
    fn get_result(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        find: FindType,
    ) -> Option<&DataPoint>;

    /// 截取区间内的点，可附带区间两侧的边界点。
    ///
    /// 只检查到倒数第二个元素，最后一个元素永远不会被纳入；
    /// 带边界时，窗口内最后一个点会作为右边界再出现一次。
    fn get_range_of_results(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        include_bounds: bool,
    ) -> Vec<&DataPoint>;

    /// 前一个点：不存在返回 `None`，首元素返回自身。按值相等匹配，取第一个匹配。
    fn get_previous(&self, element: &DataPoint) -> Option<&DataPoint>;
}

impl SeriesQuery for [DataPoint] {
    fn filter(&self, mode: FilterMode) -> Vec<&DataPoint> {
        self.iter().filter(|point| mode.accepts(point)).collect()
    }

    fn first_good(&self) -> Option<&DataPoint> {
        self.iter().find(|point| point.is_good())
    }

    fn last_good(&self) -> Option<&DataPoint> {
        self.iter().rev().find(|point| point.is_good())
    }

    fn find_closest(&self, target: DateTime<Utc>) -> Option<&DataPoint> {
        closest(self, target)
    }

    fn find_closest_by_value(&self, value: &Value, target: DateTime<Utc>) -> Option<&DataPoint> {
        closest(
            self.iter()
                .filter(|point| point.is_good() && point.value.as_ref() == Some(value)),
            target,
        )
    }

    fn get_result(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        find: FindType,
    ) -> Option<&DataPoint> {
        let mut matches = self
            .iter()
            .filter(|point| in_window(point.timestamp, start, end));
        match find {
            FindType::First => matches.next(),
            FindType::Last => matches.last(),
        }
    }

    fn get_range_of_results(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        include_bounds: bool,
    ) -> Vec<&DataPoint> {
        let mut range = Vec::new();
        for pair in self.windows(2) {
            let (current, next) = (&pair[0], &pair[1]);
            let inside = in_window(current.timestamp, start, end);
            if inside {
                range.push(current);
            }
            if include_bounds {
                let next_inside = in_window(next.timestamp, start, end);
                // 左边界：窗口外、后继在窗口内
                if !inside && next_inside {
                    range.push(current);
                }
                // 右边界：窗口内、后继在窗口外
                if inside && !next_inside {
                    range.push(current);
                }
            }
        }
        range
    }

    fn get_previous(&self, element: &DataPoint) -> Option<&DataPoint> {
        let index = self.iter().position(|point| point == element)?;
        self.get(index.saturating_sub(1))
    }
}
