use crate::data::DataPoint;
use crate::outcome::{Outcome, ResultId};
use chrono::{DateTime, Utc};

/// 单个标签在请求时间窗内的历史样本（按时间排序）。
///
/// 构造后只读，查询算法都是对 `points` 的只读变换。
#[derive(Debug, Clone, PartialEq)]
pub struct HistorySeries {
    tag: String,
    result_id: ResultId,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    points: Vec<DataPoint>,
}

impl HistorySeries {
    pub fn new(
        tag: impl Into<String>,
        result_id: ResultId,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        points: Vec<DataPoint>,
    ) -> Self {
        Self {
            tag: tag.into(),
            result_id,
            start_time,
            end_time,
            points,
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn end_time(&self) -> DateTime<Utc> {
        self.end_time
    }

    pub fn points(&self) -> &[DataPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl Outcome for HistorySeries {
    fn item_name(&self) -> &str {
        &self.tag
    }

    fn result_id(&self) -> &ResultId {
        &self.result_id
    }
}
